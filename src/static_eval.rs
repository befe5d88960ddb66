//! Static Expression Evaluator
//!
//! Reduces an expression of the compiled module to a literal [`Value`]
//! without running the program. Every construct that cannot be proven
//! constant (reassignable bindings, branches, imports, closures passed as
//! arguments) yields [`EvalError`] rather than a guess.
//!
//! Style interpolations are evaluated the way styled-components calls them:
//! a function in a template slot receives the render props, of which only
//! `theme` is known at build time.

use crate::scope::{single_return, FunctionLike, ScopeAnalyzer};
use crate::value::{format_number, Context, EvalError, EvalResult, Theme, Value};
use indexmap::IndexMap;
use oxc_ast::ast::{
    ArrayExpression, ArrayExpressionElement, BinaryExpression, BindingPattern, CallExpression,
    Expression, FormalParameters, IdentifierReference, ObjectExpression, ObjectPropertyKind,
    PropertyKind, TaggedTemplateExpression, TemplateElement, TemplateLiteral, UnaryExpression,
    VariableDeclarator,
};
use oxc_ast::AstKind;
use oxc_semantic::{Semantic, SymbolId};
use oxc_syntax::operator::{BinaryOperator, UnaryOperator};

pub struct Evaluator<'s, 'a> {
    scope: ScopeAnalyzer<'s, 'a>,
    theme: Option<&'s Theme>,
    css_helper: Option<SymbolId>,
}

/// One step from a destructuring pattern's root to a binding.
enum PathStep<'a> {
    Key(String, Option<&'a Expression<'a>>),
    Index(usize, Option<&'a Expression<'a>>),
    RestFrom(usize),
}

impl<'s, 'a> Evaluator<'s, 'a> {
    /// `css_helper` is the local symbol of the `css` import, if any.
    pub fn new(
        semantic: &'s Semantic<'a>,
        theme: Option<&'s Theme>,
        css_helper: Option<SymbolId>,
    ) -> Self {
        Self {
            scope: ScopeAnalyzer::new(semantic),
            theme,
            css_helper,
        }
    }

    pub fn scope(&self) -> &ScopeAnalyzer<'s, 'a> {
        &self.scope
    }

    pub fn evaluate(&self, expr: &'a Expression<'a>, ctx: &Context) -> EvalResult {
        self.eval(expr, ctx, false)
    }

    /// Evaluates `expr` as the value of a style template slot.
    pub fn evaluate_interpolation(&self, expr: &'a Expression<'a>, ctx: &Context) -> EvalResult {
        self.eval(expr, ctx, true)
    }

    /// Resolves a whole style template to CSS text.
    pub fn evaluate_style(
        &self,
        template: &'a TemplateLiteral<'a>,
        ctx: &Context,
    ) -> Result<String, EvalError> {
        self.concat_template(template, ctx, true)
    }

    fn eval(&self, expr: &'a Expression<'a>, ctx: &Context, in_style: bool) -> EvalResult {
        match expr.get_inner_expression() {
            Expression::StringLiteral(lit) => Ok(Value::string(lit.value.as_str())),
            Expression::NumericLiteral(lit) => Ok(Value::Number(lit.value)),
            Expression::TemplateLiteral(template) => {
                Ok(Value::String(self.concat_template(template, ctx, false)?))
            }
            Expression::UnaryExpression(unary) => self.eval_unary(unary, ctx),
            Expression::BinaryExpression(binary) => self.eval_binary(binary, ctx),
            Expression::Identifier(ident) => self.eval_identifier(ident, ctx, in_style),
            Expression::StaticMemberExpression(member) => {
                let object = self.eval(&member.object, ctx, false)?;
                object
                    .property(member.property.name.as_str())
                    .ok_or(EvalError)
            }
            Expression::ComputedMemberExpression(member) => {
                let object = self.eval(&member.object, ctx, false)?;
                let key = match self.eval(&member.expression, ctx, false)? {
                    Value::String(key) => key,
                    Value::Number(index) => format_number(index).ok_or(EvalError)?,
                    Value::Array(_) | Value::Map(_) => return Err(EvalError),
                };
                object.property(&key).ok_or(EvalError)
            }
            Expression::TaggedTemplateExpression(tagged) => self.eval_css_helper(tagged, ctx),
            Expression::ArrowFunctionExpression(arrow) if in_style => {
                self.eval_style_function(FunctionLike::Arrow(arrow), ctx)
            }
            Expression::FunctionExpression(func) if in_style => {
                self.eval_style_function(FunctionLike::Function(func), ctx)
            }
            Expression::ObjectExpression(object) => self.eval_object(object, ctx),
            Expression::ArrayExpression(array) => self.eval_array(array, ctx),
            Expression::CallExpression(call) => self.eval_call(call, ctx),
            Expression::ConditionalExpression(_) | Expression::LogicalExpression(_) => {
                tracing::trace!("branch selection is never attempted");
                Err(EvalError)
            }
            _ => Err(EvalError),
        }
    }

    fn concat_template(
        &self,
        template: &'a TemplateLiteral<'a>,
        ctx: &Context,
        in_style: bool,
    ) -> Result<String, EvalError> {
        let mut out = String::new();
        for (index, quasi) in template.quasis.iter().enumerate() {
            out.push_str(cooked(quasi)?);
            if let Some(expr) = template.expressions.get(index) {
                let text = if in_style {
                    self.evaluate_interpolation(expr, ctx)?.to_style_fragment()
                } else {
                    self.eval(expr, ctx, false)?.to_js_string()
                };
                out.push_str(&text.ok_or(EvalError)?);
            }
        }
        Ok(out)
    }

    fn eval_unary(&self, unary: &'a UnaryExpression<'a>, ctx: &Context) -> EvalResult {
        let operand = self.eval(&unary.argument, ctx, false)?;
        let number = operand.to_number().ok_or(EvalError)?;
        match unary.operator {
            UnaryOperator::UnaryNegation => Ok(Value::Number(-number)),
            UnaryOperator::UnaryPlus => Ok(Value::Number(number)),
            _ => Err(EvalError),
        }
    }

    /// Left-associative chains are folded iteratively: `a + b + c` is
    /// evaluated as `a`, then `+ b`, then `+ c`.
    fn eval_binary(&self, binary: &'a BinaryExpression<'a>, ctx: &Context) -> EvalResult {
        let mut steps: Vec<(BinaryOperator, &'a Expression<'a>)> = Vec::new();
        let mut head = binary;
        loop {
            steps.push((head.operator, &head.right));
            match head.left.get_inner_expression() {
                Expression::BinaryExpression(left) => head = &**left,
                _ => break,
            }
        }

        let mut acc = self.eval(&head.left, ctx, false)?;
        for (operator, operand) in steps.into_iter().rev() {
            let rhs = self.eval(operand, ctx, false)?;
            acc = fold(operator, acc, rhs)?;
        }
        Ok(acc)
    }

    fn eval_identifier(
        &self,
        ident: &'a IdentifierReference<'a>,
        ctx: &Context,
        in_style: bool,
    ) -> EvalResult {
        let Some((symbol, declaration)) = self.scope.declaration_of(ident) else {
            tracing::trace!(name = ident.name.as_str(), "identifier has no local declaration");
            return Err(EvalError);
        };
        if self.scope.has_mutation_evidence(symbol) {
            return Err(EvalError);
        }

        match declaration {
            AstKind::FormalParameter(_) | AstKind::FormalParameterRest(_) => {
                ctx.get(ident.name.as_str()).cloned().ok_or(EvalError)
            }
            AstKind::VariableDeclarator(decl) if decl.kind.is_const() => {
                let ctx = self.context_for(ident, symbol, ctx);
                self.eval_declarator(decl, symbol, &ctx, in_style)
            }
            AstKind::Function(func) if in_style && func.is_declaration() => {
                let body = func.body.as_deref().ok_or(EvalError)?;
                let returned = single_return(body).ok_or(EvalError)?;
                self.eval(returned, &Context::new(), false)
            }
            _ => {
                tracing::trace!(
                    name = ident.name.as_str(),
                    kind = %declaration.debug_name(),
                    "declaration kind is not evaluable"
                );
                Err(EvalError)
            }
        }
    }

    /// Bindings visible at the reference only carry over when the
    /// declaration lives in the same function.
    fn context_for(&self, ident: &IdentifierReference<'a>, symbol: SymbolId, ctx: &Context) -> Context {
        let reference_fn = self
            .scope
            .reference_node(ident)
            .and_then(|node| self.scope.enclosing_function(node));
        let declaration_fn = self
            .scope
            .enclosing_function(self.scope.declaration_node(symbol));
        if reference_fn == declaration_fn {
            ctx.clone()
        } else {
            Context::new()
        }
    }

    fn eval_declarator(
        &self,
        decl: &'a VariableDeclarator<'a>,
        symbol: SymbolId,
        ctx: &Context,
        in_style: bool,
    ) -> EvalResult {
        let init = decl.init.as_ref().ok_or(EvalError)?;
        if needs_freeze(init) && !is_frozen(init) {
            tracing::trace!("object or array binding is not frozen");
            return Err(EvalError);
        }

        match &decl.id {
            BindingPattern::BindingIdentifier(_) => self.eval(init, ctx, in_style),
            pattern => {
                let path = binding_path(pattern, symbol).ok_or(EvalError)?;
                let source = self.eval(init, ctx, false)?;
                self.walk_path(source, &path, ctx)
            }
        }
    }

    fn walk_path(&self, source: Value, path: &[PathStep<'a>], ctx: &Context) -> EvalResult {
        let mut current = source;
        for step in path {
            current = match step {
                PathStep::Key(key, default) => match current.property(key) {
                    Some(value) => value,
                    None => self.eval(default.ok_or(EvalError)?, ctx, false)?,
                },
                PathStep::Index(index, default) => {
                    let element = match &current {
                        Value::Array(items) => items.get(*index).cloned(),
                        _ => return Err(EvalError),
                    };
                    match element {
                        Some(value) => value,
                        None => self.eval(default.ok_or(EvalError)?, ctx, false)?,
                    }
                }
                PathStep::RestFrom(start) => match &current {
                    Value::Array(items) => {
                        Value::Array(items.get(*start..).unwrap_or_default().to_vec())
                    }
                    _ => return Err(EvalError),
                },
            };
        }
        Ok(current)
    }

    fn render_props(&self) -> Value {
        let theme = self
            .theme
            .map(Theme::to_value)
            .unwrap_or_else(|| Value::Map(IndexMap::new()));
        let mut props = IndexMap::new();
        props.insert("theme".to_string(), theme);
        Value::Map(props)
    }

    /// A value-producer in a style slot. Its first parameter receives the
    /// render props; nested producers layer their bindings on top.
    fn eval_style_function(&self, function: FunctionLike<'a>, ctx: &Context) -> EvalResult {
        if function.is_async_or_generator() {
            return Err(EvalError);
        }
        let scope = match function.params().items.first() {
            Some(first) => ctx.extend(bind_props(&first.pattern, &self.render_props(), Context::new())),
            None => ctx.clone(),
        };

        if let Some(body) = function.expression_body() {
            return self.eval(body, &scope, true);
        }
        let body = function.block_body().ok_or(EvalError)?;
        let returned = single_return(body).ok_or(EvalError)?;
        self.eval(returned, &scope, false)
    }

    fn eval_css_helper(&self, tagged: &'a TaggedTemplateExpression<'a>, ctx: &Context) -> EvalResult {
        let Expression::Identifier(tag) = tagged.tag.get_inner_expression() else {
            return Err(EvalError);
        };
        match self.css_helper {
            Some(css) if self.scope.symbol_of(tag) == Some(css) => {
                Ok(Value::String(self.concat_template(&tagged.quasi, ctx, true)?))
            }
            _ => Err(EvalError),
        }
    }

    fn eval_object(&self, object: &'a ObjectExpression<'a>, ctx: &Context) -> EvalResult {
        let mut map = IndexMap::new();
        for property in &object.properties {
            match property {
                ObjectPropertyKind::ObjectProperty(prop) => {
                    if !matches!(prop.kind, PropertyKind::Init) || prop.method {
                        return Err(EvalError);
                    }
                    let key = match prop.key.static_name() {
                        Some(name) => name.into_owned(),
                        None => {
                            let computed = prop.key.as_expression().ok_or(EvalError)?;
                            match self.eval(computed, ctx, false)? {
                                Value::String(key) => key,
                                Value::Number(n) => format_number(n).ok_or(EvalError)?,
                                Value::Array(_) | Value::Map(_) => return Err(EvalError),
                            }
                        }
                    };
                    let value = self.eval(&prop.value, ctx, false)?;
                    map.insert(key, value);
                }
                ObjectPropertyKind::SpreadProperty(spread) => {
                    match self.eval(&spread.argument, ctx, false)? {
                        Value::Map(entries) => map.extend(entries),
                        _ => return Err(EvalError),
                    }
                }
            }
        }
        Ok(Value::Map(map))
    }

    fn eval_array(&self, array: &'a ArrayExpression<'a>, ctx: &Context) -> EvalResult {
        let mut items = Vec::with_capacity(array.elements.len());
        for element in &array.elements {
            match element {
                ArrayExpressionElement::SpreadElement(spread) => {
                    match self.eval(&spread.argument, ctx, false)? {
                        Value::Array(inner) => items.extend(inner),
                        _ => return Err(EvalError),
                    }
                }
                ArrayExpressionElement::Elision(_) => return Err(EvalError),
                other => {
                    let expr = other.as_expression().ok_or(EvalError)?;
                    items.push(self.eval(expr, ctx, false)?);
                }
            }
        }
        Ok(Value::Array(items))
    }

    fn eval_call(&self, call: &'a CallExpression<'a>, ctx: &Context) -> EvalResult {
        if call.optional {
            return Err(EvalError);
        }
        if self.is_object_freeze(call) {
            if call.arguments.len() != 1 {
                return Err(EvalError);
            }
            let expr = call
                .arguments
                .first()
                .and_then(|argument| argument.as_expression())
                .ok_or(EvalError)?;
            return self.eval(expr, ctx, false);
        }

        let Expression::Identifier(callee) = call.callee.get_inner_expression() else {
            tracing::trace!("only calls to local functions are inlined");
            return Err(EvalError);
        };
        let function = self.scope.local_function(callee).ok_or(EvalError)?;
        if function.is_async_or_generator() {
            return Err(EvalError);
        }

        let mut args = Vec::with_capacity(call.arguments.len());
        for argument in &call.arguments {
            let expr = argument.as_expression().ok_or(EvalError)?;
            if matches!(
                expr.get_inner_expression(),
                Expression::ArrowFunctionExpression(_) | Expression::FunctionExpression(_)
            ) {
                return Err(EvalError);
            }
            args.push(self.eval(expr, &Context::new(), false)?);
        }

        let scope = self.bind_arguments(function.params(), args)?;
        let returned = match function.expression_body() {
            Some(body) => body,
            None => {
                let body = function.block_body().ok_or(EvalError)?;
                single_return(body).ok_or(EvalError)?
            }
        };
        self.eval(returned, &scope, false)
    }

    fn is_object_freeze(&self, call: &CallExpression<'a>) -> bool {
        let Some(member) = call.callee.get_inner_expression().as_member_expression() else {
            return false;
        };
        let Expression::Identifier(object) = member.object().get_inner_expression() else {
            return false;
        };
        object.name.as_str() == "Object"
            && self.scope.symbol_of(object).is_none()
            && member.static_property_name() == Some("freeze")
    }

    fn bind_arguments(
        &self,
        params: &'a FormalParameters<'a>,
        args: Vec<Value>,
    ) -> Result<Context, EvalError> {
        let mut scope = Context::new();
        let mut args = args.into_iter();
        for param in &params.items {
            let value = match args.next() {
                Some(value) => Some(value),
                None => match &param.initializer {
                    Some(default) => Some(self.eval(default, &Context::new(), false)?),
                    None => None,
                },
            };
            if let Some(value) = value {
                scope = self.bind_parameter(&param.pattern, value, scope)?;
            }
        }
        if let Some(rest) = &params.rest {
            let remaining = Value::Array(args.collect());
            scope = self.bind_parameter(&rest.rest.argument, remaining, scope)?;
        }
        Ok(scope)
    }

    /// Binds a call argument to a parameter pattern. Defaults are evaluated
    /// without any surrounding bindings.
    fn bind_parameter(
        &self,
        pattern: &'a BindingPattern<'a>,
        value: Value,
        scope: Context,
    ) -> Result<Context, EvalError> {
        match pattern {
            BindingPattern::BindingIdentifier(id) => Ok(scope.with(id.name.as_str(), value)),
            BindingPattern::AssignmentPattern(assign) => {
                self.bind_parameter(&assign.left, value, scope)
            }
            BindingPattern::ObjectPattern(object) => {
                if object.rest.is_some() {
                    return Err(EvalError);
                }
                let mut scope = scope;
                for property in &object.properties {
                    let key = property.key.static_name().ok_or(EvalError)?;
                    let (inner, default) = split_default(&property.value);
                    let field = match value.property(&key) {
                        Some(field) => Some(field),
                        None => default
                            .map(|expr| self.eval(expr, &Context::new(), false))
                            .transpose()?,
                    };
                    if let Some(field) = field {
                        scope = self.bind_parameter(inner, field, scope)?;
                    }
                }
                Ok(scope)
            }
            BindingPattern::ArrayPattern(array) => {
                let Value::Array(items) = &value else {
                    return Err(EvalError);
                };
                let mut scope = scope;
                for (index, element) in array.elements.iter().enumerate() {
                    let Some(element) = element else { continue };
                    let (inner, default) = split_default(element);
                    let item = match items.get(index) {
                        Some(item) => Some(item.clone()),
                        None => default
                            .map(|expr| self.eval(expr, &Context::new(), false))
                            .transpose()?,
                    };
                    if let Some(item) = item {
                        scope = self.bind_parameter(inner, item, scope)?;
                    }
                }
                if let Some(rest) = &array.rest {
                    let tail = items.get(array.elements.len()..).unwrap_or_default().to_vec();
                    scope = self.bind_parameter(&rest.argument, Value::Array(tail), scope)?;
                }
                Ok(scope)
            }
        }
    }
}

fn cooked<'a>(element: &'a TemplateElement<'a>) -> Result<&'a str, EvalError> {
    element
        .value
        .cooked
        .as_ref()
        .map(|cooked| cooked.as_str())
        .ok_or(EvalError)
}

fn fold(operator: BinaryOperator, left: Value, right: Value) -> EvalResult {
    let number = match operator {
        BinaryOperator::Addition => match (&left, &right) {
            (Value::Number(l), Value::Number(r)) => l + r,
            _ => {
                let l = left.to_js_string().ok_or(EvalError)?;
                let r = right.to_js_string().ok_or(EvalError)?;
                return Ok(Value::String(l + &r));
            }
        },
        BinaryOperator::Subtraction
        | BinaryOperator::Multiplication
        | BinaryOperator::Division
        | BinaryOperator::Remainder
        | BinaryOperator::Exponential => {
            let l = left.to_number().ok_or(EvalError)?;
            let r = right.to_number().ok_or(EvalError)?;
            match operator {
                BinaryOperator::Subtraction => l - r,
                BinaryOperator::Multiplication => l * r,
                BinaryOperator::Division => l / r,
                BinaryOperator::Remainder => l % r,
                _ => l.powf(r),
            }
        }
        _ => return Err(EvalError),
    };
    if number.is_finite() {
        Ok(Value::Number(number))
    } else {
        Err(EvalError)
    }
}

fn needs_freeze(init: &Expression<'_>) -> bool {
    matches!(
        init.get_inner_expression(),
        Expression::ObjectExpression(_) | Expression::ArrayExpression(_)
    ) || matches!(
        init.get_inner_expression(),
        Expression::CallExpression(call) if call.callee.is_specific_member_access("Object", "freeze")
    )
}

/// `{…} as const` (optionally under `satisfies`) or `Object.freeze({…})`.
pub(crate) fn is_frozen(init: &Expression<'_>) -> bool {
    let mut expr = init;
    loop {
        match expr {
            Expression::TSAsExpression(as_expr) => {
                if as_expr.type_annotation.is_const_type_reference() {
                    return true;
                }
                expr = &as_expr.expression;
            }
            Expression::TSSatisfiesExpression(satisfies) => expr = &satisfies.expression,
            Expression::ParenthesizedExpression(paren) => expr = &paren.expression,
            Expression::CallExpression(call) => {
                return call.callee.is_specific_member_access("Object", "freeze");
            }
            _ => return false,
        }
    }
}

fn split_default<'a>(
    pattern: &'a BindingPattern<'a>,
) -> (&'a BindingPattern<'a>, Option<&'a Expression<'a>>) {
    match pattern {
        BindingPattern::AssignmentPattern(assign) => (&assign.left, Some(&assign.right)),
        other => (other, None),
    }
}

fn binding_path<'a>(pattern: &'a BindingPattern<'a>, symbol: SymbolId) -> Option<Vec<PathStep<'a>>> {
    match pattern {
        BindingPattern::BindingIdentifier(id) => (id.symbol_id.get() == Some(symbol)).then(Vec::new),
        BindingPattern::AssignmentPattern(assign) => binding_path(&assign.left, symbol),
        BindingPattern::ObjectPattern(object) => {
            for property in &object.properties {
                let (inner, default) = split_default(&property.value);
                if let Some(mut rest) = binding_path(inner, symbol) {
                    let key = property.key.static_name()?.into_owned();
                    rest.insert(0, PathStep::Key(key, default));
                    return Some(rest);
                }
            }
            None
        }
        BindingPattern::ArrayPattern(array) => {
            for (index, element) in array.elements.iter().enumerate() {
                let Some(element) = element else { continue };
                let (inner, default) = split_default(element);
                if let Some(mut rest) = binding_path(inner, symbol) {
                    rest.insert(0, PathStep::Index(index, default));
                    return Some(rest);
                }
            }
            let tail = array.rest.as_ref()?;
            let mut rest = binding_path(&tail.argument, symbol)?;
            rest.insert(0, PathStep::RestFrom(array.elements.len()));
            Some(rest)
        }
    }
}

/// Matches a style function's parameter against the render props. Only
/// fields present in `value` are bound; defaults are ignored because the
/// runtime props may carry caller-supplied values for them.
fn bind_props<'a>(pattern: &'a BindingPattern<'a>, value: &Value, scope: Context) -> Context {
    match pattern {
        BindingPattern::BindingIdentifier(id) => scope.with(id.name.as_str(), value.clone()),
        BindingPattern::AssignmentPattern(assign) => bind_props(&assign.left, value, scope),
        BindingPattern::ObjectPattern(object) => {
            let Some(fields) = value.as_map() else {
                return scope;
            };
            let mut scope = scope;
            for property in &object.properties {
                let Some(key) = property.key.static_name() else { continue };
                let (inner, _) = split_default(&property.value);
                if let Some(field) = fields.get(&*key) {
                    scope = bind_props(inner, field, scope);
                }
            }
            scope
        }
        BindingPattern::ArrayPattern(_) => scope,
    }
}
