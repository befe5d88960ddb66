//! Binding analysis on top of `oxc_semantic`.
//!
//! The semantic builder gives us the scope tree and symbol table in a single
//! pass. Everything here is a read-only query against it: where a reference
//! was declared, which function encloses a node, and whether a binding shows
//! any sign of being changed after its declaration.

use crate::imports::STYLED_COMPONENTS;
use oxc_ast::ast::{
    ArrowFunctionExpression, BindingPattern, CallExpression, Class, Expression, FormalParameters,
    Function, FunctionBody, IdentifierReference, ReturnStatement, Statement,
};
use oxc_ast::AstKind;
use oxc_ast_visit::Visit;
use oxc_semantic::{NodeId, Semantic, SymbolId};
use oxc_span::{GetSpan, Span};
use oxc_syntax::operator::UnaryOperator;
use oxc_syntax::scope::ScopeFlags;
use std::collections::HashSet;

lazy_static::lazy_static! {
    /// Methods that change their receiver in place.
    pub static ref MUTATING_METHODS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        // Array
        s.insert("push");
        s.insert("pop");
        s.insert("shift");
        s.insert("unshift");
        s.insert("splice");
        s.insert("sort");
        s.insert("reverse");
        s.insert("fill");
        s.insert("copyWithin");
        // Map / Set
        s.insert("set");
        s.insert("delete");
        s.insert("clear");
        s.insert("add");
        s
    };

    static ref OBJECT_MUTATORS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        s.insert("assign");
        s.insert("defineProperty");
        s.insert("defineProperties");
        s.insert("setPrototypeOf");
        s.insert("set");
        s.insert("deleteProperty");
        s
    };

    /// Builtins that only read the object handed to them.
    static ref READ_ONLY_CALLS: HashSet<(&'static str, &'static str)> = {
        let mut s = HashSet::new();
        s.insert(("Object", "keys"));
        s.insert(("Object", "values"));
        s.insert(("Object", "entries"));
        s.insert(("Object", "freeze"));
        s.insert(("Object", "isFrozen"));
        s.insert(("JSON", "stringify"));
        s
    };
}

/// A value-producing function found in the module.
#[derive(Clone, Copy)]
pub enum FunctionLike<'a> {
    Arrow(&'a ArrowFunctionExpression<'a>),
    Function(&'a Function<'a>),
}

impl<'a> FunctionLike<'a> {
    pub fn params(&self) -> &'a FormalParameters<'a> {
        match *self {
            FunctionLike::Arrow(arrow) => &arrow.params,
            FunctionLike::Function(func) => &func.params,
        }
    }

    pub fn is_async_or_generator(&self) -> bool {
        match *self {
            FunctionLike::Arrow(arrow) => arrow.r#async,
            FunctionLike::Function(func) => func.r#async || func.generator,
        }
    }

    /// The expression an arrow with a concise body evaluates to.
    pub fn expression_body(&self) -> Option<&'a Expression<'a>> {
        match *self {
            FunctionLike::Arrow(arrow) => arrow.get_expression(),
            FunctionLike::Function(_) => None,
        }
    }

    /// The block body, for arrows with braces and for all functions.
    pub fn block_body(&self) -> Option<&'a FunctionBody<'a>> {
        match *self {
            FunctionLike::Arrow(arrow) if arrow.expression => None,
            FunctionLike::Arrow(arrow) => Some(&arrow.body),
            FunctionLike::Function(func) => func.body.as_deref(),
        }
    }
}

pub struct ScopeAnalyzer<'s, 'a> {
    semantic: &'s Semantic<'a>,
}

impl<'s, 'a> ScopeAnalyzer<'s, 'a> {
    pub fn new(semantic: &'s Semantic<'a>) -> Self {
        Self { semantic }
    }

    pub fn semantic(&self) -> &'s Semantic<'a> {
        self.semantic
    }

    pub fn symbol_of(&self, ident: &IdentifierReference<'a>) -> Option<SymbolId> {
        let reference_id = ident.reference_id.get()?;
        self.semantic
            .scoping()
            .get_reference(reference_id)
            .symbol_id()
    }

    pub fn reference_node(&self, ident: &IdentifierReference<'a>) -> Option<NodeId> {
        let reference_id = ident.reference_id.get()?;
        Some(self.semantic.scoping().get_reference(reference_id).node_id())
    }

    /// The declaration node for the symbol `ident` resolves to.
    pub fn declaration_of(&self, ident: &IdentifierReference<'a>) -> Option<(SymbolId, AstKind<'a>)> {
        let symbol = self.symbol_of(ident)?;
        let node = self.semantic.scoping().symbol_declaration(symbol);
        Some((symbol, self.semantic.nodes().kind(node)))
    }

    pub fn declaration_node(&self, symbol: SymbolId) -> NodeId {
        self.semantic.scoping().symbol_declaration(symbol)
    }

    /// Nearest function or arrow function strictly above `node`, found by
    /// walking the scope tree rather than the AST.
    pub fn enclosing_function(&self, node: NodeId) -> Option<NodeId> {
        let scoping = self.semantic.scoping();
        let scope = self.semantic.nodes().get_node(node).scope_id();
        scoping
            .scope_ancestors(scope)
            .find(|id| scoping.scope_flags(*id).is_function())
            .map(|id| scoping.get_node_id(id))
    }

    pub fn line_of(&self, span: Span) -> u32 {
        let text = self.semantic.source_text();
        let end = (span.start as usize).min(text.len());
        text[..end].matches('\n').count() as u32 + 1
    }

    /// Resolves `ident` to a function bound immutably in this module: a
    /// function declaration that is never reassigned, or a `const` bound to
    /// an arrow or function expression.
    pub fn local_function(&self, ident: &IdentifierReference<'a>) -> Option<FunctionLike<'a>> {
        let (symbol, kind) = self.declaration_of(ident)?;
        match kind {
            AstKind::Function(func) if func.is_declaration() => {
                let written = self
                    .semantic
                    .scoping()
                    .get_resolved_references(symbol)
                    .any(|r| r.is_write());
                if written {
                    None
                } else {
                    Some(FunctionLike::Function(func))
                }
            }
            AstKind::VariableDeclarator(decl) if decl.kind.is_const() => {
                if !matches!(decl.id, BindingPattern::BindingIdentifier(_)) {
                    return None;
                }
                match decl.init.as_ref()?.get_inner_expression() {
                    Expression::ArrowFunctionExpression(arrow) => Some(FunctionLike::Arrow(arrow)),
                    Expression::FunctionExpression(func) => Some(FunctionLike::Function(func)),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// True when any reference to `symbol` could change what it holds.
    pub fn has_mutation_evidence(&self, symbol: SymbolId) -> bool {
        let mut visited = HashSet::new();
        self.symbol_escapes(symbol, &mut visited)
    }

    fn symbol_escapes(&self, symbol: SymbolId, visited: &mut HashSet<SymbolId>) -> bool {
        if !visited.insert(symbol) || self.holds_primitive(symbol) {
            return false;
        }
        let references: Vec<_> = self
            .semantic
            .scoping()
            .get_resolved_references(symbol)
            .filter(|r| r.is_value())
            .map(|r| (r.is_write(), r.node_id()))
            .collect();
        for (is_write, node) in references {
            if is_write || self.reference_escapes(node, visited) {
                tracing::trace!(
                    symbol = self.semantic.scoping().symbol_name(symbol),
                    "binding has mutation evidence"
                );
                return true;
            }
        }
        false
    }

    /// A `const` whose initializer can only produce a string or number has
    /// nothing that could be written through an alias.
    fn holds_primitive(&self, symbol: SymbolId) -> bool {
        let AstKind::VariableDeclarator(decl) =
            self.semantic.nodes().kind(self.declaration_node(symbol))
        else {
            return false;
        };
        if !decl.kind.is_const() || !matches!(decl.id, BindingPattern::BindingIdentifier(_)) {
            return false;
        }
        matches!(
            decl.init.as_ref().map(Expression::get_inner_expression),
            Some(
                Expression::StringLiteral(_)
                    | Expression::NumericLiteral(_)
                    | Expression::TemplateLiteral(_)
                    | Expression::BinaryExpression(_)
                    | Expression::UnaryExpression(_)
            )
        )
    }

    fn reference_escapes(&self, reference: NodeId, visited: &mut HashSet<SymbolId>) -> bool {
        let nodes = self.semantic.nodes();
        let mut current = reference;
        loop {
            let current_span = nodes.kind(current).span();
            let parent = nodes.parent_id(current);
            if parent == current {
                return false;
            }
            let parent_kind = nodes.kind(parent);
            match parent_kind {
                kind if is_transparent(kind) => current = parent,
                AstKind::StaticMemberExpression(_)
                | AstKind::ComputedMemberExpression(_)
                | AstKind::PrivateFieldExpression(_) => {
                    let Some(member) = parent_kind.as_member_expression_kind() else {
                        return false;
                    };
                    // Used as a computed key, not as the object.
                    if member.object().span() != current_span {
                        return false;
                    }
                    if member.is_assigned_to_in_parent(&nodes.parent_kind(parent)) {
                        return true;
                    }
                    current = parent;
                }
                AstKind::UnaryExpression(unary) => {
                    return unary.operator == UnaryOperator::Delete && current != reference;
                }
                AstKind::CallExpression(call) => {
                    if call.callee.span() == current_span {
                        return self.is_mutating_method(current);
                    }
                    return self.argument_escapes(call, current_span, visited);
                }
                AstKind::VariableDeclarator(decl) => {
                    let is_init = decl
                        .init
                        .as_ref()
                        .is_some_and(|init| init.span() == current_span);
                    if !is_init {
                        return false;
                    }
                    if !decl.kind.is_const() {
                        return true;
                    }
                    return decl
                        .id
                        .get_binding_identifiers()
                        .iter()
                        .filter_map(|id| id.symbol_id.get())
                        .any(|alias| self.symbol_escapes(alias, visited));
                }
                AstKind::AssignmentExpression(assign) => {
                    return assign.right.span() == current_span;
                }
                // Consumers that only test, compare or export the value.
                AstKind::BinaryExpression(_)
                | AstKind::IfStatement(_)
                | AstKind::WhileStatement(_)
                | AstKind::DoWhileStatement(_)
                | AstKind::ForStatement(_)
                | AstKind::ForInStatement(_)
                | AstKind::SwitchStatement(_)
                | AstKind::SwitchCase(_)
                | AstKind::TSTypeQuery(_)
                | AstKind::TSQualifiedName(_)
                | AstKind::ExportSpecifier(_)
                | AstKind::ExportDefaultDeclaration(_) => return false,
                AstKind::ConditionalExpression(conditional) => {
                    return conditional.test.span() != current_span;
                }
                AstKind::ObjectProperty(prop) => {
                    return !(prop.computed && prop.key.span() == current_span);
                }
                AstKind::TemplateLiteral(_) => return !self.template_is_read_only(parent),
                AstKind::ExpressionStatement(_) => {
                    if !self.is_concise_arrow_body(parent) {
                        return false;
                    }
                    return self.function_result_escapes(parent, visited);
                }
                AstKind::ReturnStatement(_) => return self.function_result_escapes(parent, visited),
                // Containers, spreads, branches and anything else may hand
                // out an alias that is written to later.
                _ => return true,
            }
        }
    }

    /// A template literal stringifies its slots, unless a tag other than a
    /// `styled-components` one receives them.
    fn template_is_read_only(&self, template: NodeId) -> bool {
        match self.semantic.nodes().parent_kind(template) {
            AstKind::TaggedTemplateExpression(tagged) => self.is_styled_components_tag(&tagged.tag),
            _ => true,
        }
    }

    fn is_styled_components_tag(&self, tag: &Expression<'a>) -> bool {
        let mut expr = tag.get_inner_expression();
        loop {
            match expr {
                Expression::Identifier(ident) => return self.is_styled_components_import(ident),
                Expression::CallExpression(call) => expr = call.callee.get_inner_expression(),
                _ => match expr.as_member_expression() {
                    Some(member) => expr = member.object().get_inner_expression(),
                    None => return false,
                },
            }
        }
    }

    fn is_styled_components_import(&self, ident: &IdentifierReference<'a>) -> bool {
        let Some(symbol) = self.symbol_of(ident) else {
            return false;
        };
        self.semantic
            .nodes()
            .ancestor_kinds(self.declaration_node(symbol))
            .any(|kind| {
                matches!(kind, AstKind::ImportDeclaration(import)
                    if import.source.value.as_str() == STYLED_COMPONENTS)
            })
    }

    fn is_concise_arrow_body(&self, statement: NodeId) -> bool {
        let nodes = self.semantic.nodes();
        let body = nodes.parent_id(statement);
        if !matches!(nodes.kind(body), AstKind::FunctionBody(_)) {
            return false;
        }
        matches!(nodes.parent_kind(body), AstKind::ArrowFunctionExpression(arrow) if arrow.expression)
    }

    /// True when the value returned by the function around `node` can reach
    /// code that writes to it. Results consumed by a `styled-components`
    /// template are only stringified; results of direct calls are followed
    /// like any other reference.
    fn function_result_escapes(&self, node: NodeId, visited: &mut HashSet<SymbolId>) -> bool {
        let Some(function) = self.enclosing_function(node) else {
            return true;
        };
        let Some(symbol) = self.function_binding(function) else {
            return !self.is_styled_interpolation(function);
        };
        if !visited.insert(symbol) {
            return false;
        }

        let nodes = self.semantic.nodes();
        let references: Vec<_> = self
            .semantic
            .scoping()
            .get_resolved_references(symbol)
            .map(|r| (r.is_write(), r.node_id()))
            .collect();
        for (is_write, reference) in references {
            if is_write {
                return true;
            }
            let mut current = reference;
            let mut parent = nodes.parent_id(current);
            while is_transparent(nodes.kind(parent)) {
                current = parent;
                parent = nodes.parent_id(current);
            }
            let escapes = match nodes.kind(parent) {
                AstKind::CallExpression(call) if call.callee.span() == nodes.kind(current).span() => {
                    self.reference_escapes(parent, visited)
                }
                AstKind::TemplateLiteral(_) => !self.template_is_read_only(parent),
                _ => true,
            };
            if escapes {
                return true;
            }
        }
        false
    }

    /// The symbol a function is bound to: its own name for declarations, or
    /// the `const` it initializes.
    fn function_binding(&self, function: NodeId) -> Option<SymbolId> {
        let nodes = self.semantic.nodes();
        if let AstKind::Function(func) = nodes.kind(function) {
            if func.is_declaration() {
                return func.id.as_ref().and_then(|id| id.symbol_id.get());
            }
        }
        let mut current = function;
        let mut parent = nodes.parent_id(current);
        while is_transparent(nodes.kind(parent)) {
            current = parent;
            parent = nodes.parent_id(current);
        }
        match nodes.kind(parent) {
            AstKind::VariableDeclarator(decl) if decl.kind.is_const() => {
                let is_init = decl
                    .init
                    .as_ref()
                    .is_some_and(|init| init.span() == nodes.kind(current).span());
                match &decl.id {
                    BindingPattern::BindingIdentifier(id) if is_init => id.symbol_id.get(),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// An unbound function written directly into a `styled-components`
    /// template slot.
    fn is_styled_interpolation(&self, function: NodeId) -> bool {
        let nodes = self.semantic.nodes();
        let mut parent = nodes.parent_id(function);
        while is_transparent(nodes.kind(parent)) {
            parent = nodes.parent_id(parent);
        }
        matches!(nodes.kind(parent), AstKind::TemplateLiteral(_)) && self.template_is_read_only(parent)
    }

    fn is_mutating_method(&self, callee: NodeId) -> bool {
        self.semantic
            .nodes()
            .kind(callee)
            .as_member_expression_kind()
            .and_then(|member| member.static_property_name())
            .is_some_and(|name| MUTATING_METHODS.contains(name.as_str()))
    }

    fn argument_escapes(
        &self,
        call: &CallExpression<'a>,
        argument_span: Span,
        visited: &mut HashSet<SymbolId>,
    ) -> bool {
        let Some(index) = call
            .arguments
            .iter()
            .position(|arg| arg.span() == argument_span)
        else {
            return false;
        };

        let callee = call.callee.get_inner_expression();
        if let Some(member) = callee.as_member_expression() {
            let object = member.object().get_inner_expression();
            let property = member.static_property_name().unwrap_or_default();
            if let Expression::Identifier(global) = object {
                let global_name = global.name.as_str();
                if READ_ONLY_CALLS.contains(&(global_name, property)) {
                    return false;
                }
                if matches!(global_name, "Object" | "Reflect") {
                    return index == 0 && OBJECT_MUTATORS.contains(property);
                }
            }
            return true;
        }

        let Expression::Identifier(ident) = callee else {
            return true;
        };
        if self.symbol_of(ident).is_none() && matches!(ident.name.as_str(), "String" | "Number") {
            return false;
        }
        let Some(function) = self.local_function(ident) else {
            return true;
        };
        let params = function.params();
        let receiving = match params.items.get(index) {
            Some(param) => param.pattern.get_binding_identifiers(),
            None => match &params.rest {
                Some(rest) => rest.rest.argument.get_binding_identifiers(),
                None => return false,
            },
        };
        receiving
            .iter()
            .filter_map(|id| id.symbol_id.get())
            .any(|param| self.symbol_escapes(param, visited))
    }
}

/// Wrappers that hand their operand through unchanged.
fn is_transparent(kind: AstKind<'_>) -> bool {
    matches!(
        kind,
        AstKind::ParenthesizedExpression(_)
            | AstKind::TSAsExpression(_)
            | AstKind::TSSatisfiesExpression(_)
            | AstKind::TSNonNullExpression(_)
            | AstKind::TSTypeAssertion(_)
            | AstKind::ChainExpression(_)
    )
}

// ═══════════════════════════════════════════════════════════════════════════════
// RETURN STATEMENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Counts `return` statements of one function body, not of nested functions.
#[derive(Default)]
struct ReturnCounter {
    count: usize,
}

impl<'a> Visit<'a> for ReturnCounter {
    fn visit_return_statement(&mut self, _stmt: &ReturnStatement<'a>) {
        self.count += 1;
    }

    fn visit_function(&mut self, _func: &Function<'a>, _flags: ScopeFlags) {}

    fn visit_arrow_function_expression(&mut self, _arrow: &ArrowFunctionExpression<'a>) {}

    fn visit_class(&mut self, _class: &Class<'a>) {}
}

/// The returned expression of a body with exactly one unconditional
/// `return`. Every other top-level statement must be a declaration.
pub fn single_return<'a>(body: &'a FunctionBody<'a>) -> Option<&'a Expression<'a>> {
    let mut counter = ReturnCounter::default();
    counter.visit_function_body(body);
    if counter.count != 1 {
        return None;
    }

    let mut returned = None;
    for stmt in &body.statements {
        match stmt {
            Statement::ReturnStatement(ret) => returned = ret.argument.as_ref(),
            Statement::VariableDeclaration(_)
            | Statement::FunctionDeclaration(_)
            | Statement::EmptyStatement(_) => {}
            _ => return None,
        }
    }
    returned
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxc_allocator::Allocator;
    use oxc_parser::Parser;
    use oxc_semantic::SemanticBuilder;
    use oxc_span::SourceType;

    fn source_type() -> SourceType {
        SourceType::default()
            .with_module(true)
            .with_typescript(true)
            .with_jsx(true)
    }

    fn mutated(code: &str, name: &str) -> bool {
        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, code, source_type()).parse();
        assert!(ret.errors.is_empty(), "parse errors in {code}");
        let program = &*allocator.alloc(ret.program);
        let semantic = SemanticBuilder::new().build(program).semantic;
        let symbol = semantic
            .scoping()
            .get_root_binding(name)
            .expect("binding exists");
        ScopeAnalyzer::new(&semantic).has_mutation_evidence(symbol)
    }

    fn returns_single(code: &str) -> bool {
        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, code, source_type()).parse();
        let program = &*allocator.alloc(ret.program);
        match &program.body[0] {
            Statement::FunctionDeclaration(func) => {
                single_return(func.body.as_ref().expect("has body")).is_some()
            }
            _ => panic!("expected a function declaration"),
        }
    }

    #[test]
    fn test_plain_reads_are_not_mutation() {
        assert!(!mutated("const a = { x: 1 } as const; const y = a.x;", "a"));
        assert!(!mutated("const a = { x: 1 } as const; const k = Object.keys(a);", "a"));
        assert!(!mutated("const a = [1, 2] as const; const b = a.map((n) => n);", "a"));
    }

    #[test]
    fn test_reassignment_is_mutation() {
        assert!(mutated("let a = 1; a = 2;", "a"));
        assert!(mutated("let a = 1; a++;", "a"));
    }

    #[test]
    fn test_member_writes_are_mutation() {
        assert!(mutated("const a = { x: 1 } as const; a.x = 2;", "a"));
        assert!(mutated("const a = { x: { y: 1 } } as const; a.x.y += 1;", "a"));
        assert!(mutated("const a = { x: 1 } as const; delete a.x;", "a"));
        assert!(mutated("const a = [1] as const; a.push(2);", "a"));
        assert!(mutated("const a = { x: 1 } as const; Object.assign(a, { x: 2 });", "a"));
    }

    #[test]
    fn test_aliases_are_followed() {
        assert!(mutated("const a = { x: 1 } as const; const b = a; b.x = 2;", "a"));
        assert!(mutated("const a = { x: 1 } as const; let b = a;", "a"));
        assert!(!mutated("const a = { x: 1 } as const; const b = a; const c = b.x;", "a"));
    }

    #[test]
    fn test_call_arguments() {
        assert!(mutated("const a = { x: 1 } as const; mutate(a);", "a"));
        assert!(!mutated(
            "const a = { x: 1 } as const; const read = (o) => o.x; read(a);",
            "a"
        ));
        assert!(mutated(
            "const a = { x: 1 } as const; const write = (o) => { o.x = 2; }; write(a);",
            "a"
        ));
    }

    #[test]
    fn test_container_aliases_are_mutation() {
        let base = "const a = { x: { y: 1 } } as const;";
        let cases = [
            "const copy = { ...a } as any; copy.x.y = 2;",
            "const holder = { t: a as any }; holder.t.x.y = 2;",
            "const t: any = Math.random() > 0.5 ? a : a; t.x.y = 2;",
            "const t: any = a || {}; t.x.y = 2;",
            "const list = [a];",
            "const last = (0, a);",
            "for (const v of [a.x]) { v.y = 2; }",
            "const get = () => a; get().x.y = 2;",
            "function get() { return a.x; } get().y = 2;",
            "const id = (o) => o; id(a).x.y = 2;",
            "const el = <div data={a} />;",
            "const q = tag`${a}`;",
        ];
        for case in cases {
            let code = format!("{base} {case}");
            assert!(mutated(&code, "a"), "expected mutation evidence in {code}");
        }
    }

    #[test]
    fn test_read_only_consumers_are_not_mutation() {
        let base = "import styled from 'styled-components'; const a = { x: 1, key: 'k' } as const;";
        let cases = [
            "const s = `${a.x}px`;",
            "if (a.x > 0) { }",
            "const b = a.x ? 'y' : 'n';",
            "const k = { [a.key]: 1 };",
            "export default a;",
            "export type A = typeof a;",
            "const T = styled.p`margin: ${a.x}px;`;",
            "const T = styled.p`margin: ${() => a.x}px;`;",
            "const pick = (o) => o.x; const T = styled.p`margin: ${() => pick(a)}px;`;",
        ];
        for case in cases {
            let code = format!("{base} {case}");
            assert!(!mutated(&code, "a"), "unexpected mutation evidence in {code}");
        }
    }

    #[test]
    fn test_primitive_consts_cannot_be_written_through_aliases() {
        assert!(!mutated("const name = 'coral'; const o = { main: name }; o.main = 'x';", "name"));
        assert!(!mutated("const size = 4 * 2; const list = [size];", "size"));
        assert!(mutated("const o = { main: 'coral' }; const list = [o];", "o"));
    }

    #[test]
    fn test_enclosing_function_uses_scope_tree() {
        let code = "const top = 1; function outer() { if (top) { const inner = () => { const deep = 2; }; } }";
        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, code, source_type()).parse();
        let program = &*allocator.alloc(ret.program);
        let semantic = SemanticBuilder::new().build(program).semantic;
        let analyzer = ScopeAnalyzer::new(&semantic);

        let declarator = |name: &str| {
            semantic
                .nodes()
                .iter()
                .find(|node| match node.kind() {
                    AstKind::VariableDeclarator(decl) => {
                        decl.id.get_identifier_name().is_some_and(|id| id == name)
                    }
                    _ => false,
                })
                .map(|node| node.id())
                .expect("declarator exists")
        };

        assert_eq!(analyzer.enclosing_function(declarator("top")), None);
        let inner_fn = analyzer.enclosing_function(declarator("inner")).expect("inside outer");
        assert!(matches!(semantic.nodes().kind(inner_fn), AstKind::Function(_)));
        let deep_fn = analyzer.enclosing_function(declarator("deep")).expect("inside arrow");
        assert!(matches!(semantic.nodes().kind(deep_fn), AstKind::ArrowFunctionExpression(_)));
        assert_eq!(analyzer.enclosing_function(deep_fn), Some(inner_fn));
    }

    #[test]
    fn test_single_return() {
        assert!(returns_single("function f() { const a = 1; return a; }"));
        assert!(!returns_single("function f() { return 1; return 2; }"));
        assert!(!returns_single("function f(x) { if (x) { return 1; } return 2; }"));
        assert!(!returns_single("function f(x) { if (x) { throw x; } return 2; }"));
        assert!(!returns_single("function f() { const a = 1; }"));
        assert!(returns_single(
            "function f() { const g = () => { return 1; }; return 2; }"
        ));
    }
}
