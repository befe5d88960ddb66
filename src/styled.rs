//! Recognizes styled-components declarations.
//!
//! A candidate is any tagged template. Its tag is peeled from the outside in:
//! `.attrs(...)` calls are collected, and what remains must be one of
//! `styled.tag`, `styled('tag')` or `styled(Component)`.

use crate::error::CompilerError;
use crate::scope::ScopeAnalyzer;
use crate::tags::is_known_tag;
use oxc_ast::ast::{Expression, IdentifierReference, TaggedTemplateExpression, TemplateLiteral};
use oxc_ast::AstKind;
use oxc_semantic::{NodeId, Semantic, SymbolId};
use oxc_span::{GetSpan, Span};

/// Extension chains deeper than this are treated as unresolvable.
const MAX_EXTENSION_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderTarget {
    Tag(String),
    /// A component declared in this module that the styles wrap.
    Component(String),
}

impl RenderTarget {
    pub fn name(&self) -> &str {
        match self {
            RenderTarget::Tag(name) | RenderTarget::Component(name) => name,
        }
    }
}

#[derive(Debug)]
pub struct StyledDeclaration<'a> {
    pub component_name: Option<String>,
    pub target: RenderTarget,
    /// Style templates, base declaration first.
    pub templates: Vec<&'a TemplateLiteral<'a>>,
    /// `.attrs(...)` arguments in declaration order, base declaration first.
    pub attrs: Vec<&'a Expression<'a>>,
}

#[derive(Debug)]
pub enum Classification<'a> {
    NotStyled,
    Rejected(String),
    Styled(StyledDeclaration<'a>),
}

/// The innermost piece of a styled tag.
enum Base<'a> {
    Tag(String),
    Extends(&'a IdentifierReference<'a>),
}

pub struct Classifier<'s, 'a> {
    scope: ScopeAnalyzer<'s, 'a>,
    styled: SymbolId,
}

impl<'s, 'a> Classifier<'s, 'a> {
    pub fn new(semantic: &'s Semantic<'a>, styled: SymbolId) -> Self {
        Self {
            scope: ScopeAnalyzer::new(semantic),
            styled,
        }
    }

    /// Classifies the tagged template at `node`.
    pub fn classify_node(&self, node: NodeId) -> Result<Classification<'a>, CompilerError> {
        let nodes = self.scope.semantic().nodes();
        let AstKind::TaggedTemplateExpression(tagged) = nodes.kind(node) else {
            return Ok(Classification::NotStyled);
        };
        let name = match nodes.parent_kind(node) {
            AstKind::VariableDeclarator(decl) => {
                decl.id.get_identifier_name().map(|name| name.to_string())
            }
            _ => None,
        };
        self.classify(tagged, name, 0)
    }

    fn classify(
        &self,
        tagged: &'a TaggedTemplateExpression<'a>,
        component_name: Option<String>,
        depth: usize,
    ) -> Result<Classification<'a>, CompilerError> {
        if !self.is_rooted_in_styled(&tagged.tag) {
            return Ok(Classification::NotStyled);
        }

        let mut attrs = Vec::new();
        let base = match self.peel(&tagged.tag, &mut attrs)? {
            Ok(base) => base,
            Err(reason) => return Ok(Classification::Rejected(reason)),
        };
        attrs.reverse();

        match base {
            Base::Tag(tag) => {
                if !is_known_tag(&tag) {
                    return Ok(Classification::Rejected(format!("unknown tag `{}`", tag)));
                }
                Ok(Classification::Styled(StyledDeclaration {
                    component_name,
                    target: RenderTarget::Tag(tag),
                    templates: vec![&tagged.quasi],
                    attrs,
                }))
            }
            Base::Extends(ident) => self.extend(ident, tagged, component_name, attrs, depth),
        }
    }

    /// Resolves `styled(Parent)`: composes onto a local styled parent, or
    /// wraps a local component.
    fn extend(
        &self,
        parent: &'a IdentifierReference<'a>,
        tagged: &'a TaggedTemplateExpression<'a>,
        component_name: Option<String>,
        attrs: Vec<&'a Expression<'a>>,
        depth: usize,
    ) -> Result<Classification<'a>, CompilerError> {
        let name = parent.name.as_str();
        if depth >= MAX_EXTENSION_DEPTH {
            return Ok(Classification::Rejected(format!("extension chain through `{}` is too deep", name)));
        }
        let Some((_, declaration)) = self.scope.declaration_of(parent) else {
            return Ok(Classification::Rejected(format!("`{}` is not declared in this module", name)));
        };

        if let AstKind::VariableDeclarator(decl) = declaration {
            let styled_init = decl.init.as_ref().and_then(|init| match init.get_inner_expression() {
                Expression::TaggedTemplateExpression(parent_tagged) => Some(&**parent_tagged),
                _ => None,
            });
            if let (true, Some(parent_tagged)) = (decl.kind.is_const(), styled_init) {
                return match self.classify(parent_tagged, None, depth + 1)? {
                    Classification::Styled(base) => {
                        let mut templates = base.templates;
                        templates.push(&tagged.quasi);
                        let mut composed = base.attrs;
                        composed.extend(attrs);
                        Ok(Classification::Styled(StyledDeclaration {
                            component_name,
                            target: base.target,
                            templates,
                            attrs: composed,
                        }))
                    }
                    Classification::Rejected(reason) => Ok(Classification::Rejected(format!(
                        "base `{}` is not static: {}",
                        name, reason
                    ))),
                    Classification::NotStyled => Ok(Classification::Rejected(format!(
                        "`{}` is not a styled declaration",
                        name
                    ))),
                };
            }
        }

        if self.scope.local_function(parent).is_some() {
            return Ok(Classification::Styled(StyledDeclaration {
                component_name,
                target: RenderTarget::Component(name.to_string()),
                templates: vec![&tagged.quasi],
                attrs,
            }));
        }
        Ok(Classification::Rejected(format!(
            "`{}` cannot be resolved statically",
            name
        )))
    }

    /// Walks the tag down to its base, collecting `.attrs` arguments from
    /// the outermost call inwards. The inner `Err` is a rejection reason.
    fn peel(
        &self,
        tag: &'a Expression<'a>,
        attrs: &mut Vec<&'a Expression<'a>>,
    ) -> Result<Result<Base<'a>, String>, CompilerError> {
        let mut expr = tag.get_inner_expression();
        loop {
            match expr {
                Expression::StaticMemberExpression(member) => {
                    return Ok(if self.is_styled(&member.object) {
                        Ok(Base::Tag(member.property.name.to_string()))
                    } else {
                        Err(format!("unsupported styled member `.{}`", member.property.name))
                    });
                }
                Expression::CallExpression(call) => {
                    if self.is_styled(&call.callee) {
                        let base = match call.arguments.first().and_then(|arg| arg.as_expression()) {
                            Some(Expression::StringLiteral(lit)) => Ok(Base::Tag(lit.value.to_string())),
                            Some(Expression::Identifier(ident)) => Ok(Base::Extends(ident)),
                            _ => Err("styled() needs a tag name or a component".to_string()),
                        };
                        return Ok(base);
                    }
                    let Some(member) = call.callee.get_inner_expression().as_member_expression() else {
                        return Ok(Err("unsupported styled call".to_string()));
                    };
                    if member.static_property_name() != Some("attrs") {
                        let method = member.static_property_name().unwrap_or("?");
                        return Ok(Err(format!("unsupported styled method `.{}`", method)));
                    }
                    attrs.push(self.attrs_argument(call.span, call.arguments.first())?);
                    expr = member.object().get_inner_expression();
                }
                _ => return Ok(Err("unsupported styled expression".to_string())),
            }
        }
    }

    fn attrs_argument(
        &self,
        call_span: Span,
        argument: Option<&'a oxc_ast::ast::Argument<'a>>,
    ) -> Result<&'a Expression<'a>, CompilerError> {
        let expr = argument.and_then(|arg| arg.as_expression());
        match expr {
            Some(expr)
                if matches!(
                    expr.get_inner_expression(),
                    Expression::ArrowFunctionExpression(_) | Expression::ObjectExpression(_)
                ) =>
            {
                Ok(expr)
            }
            _ => {
                let span = argument.map_or(call_span, GetSpan::span);
                let text = self.scope.semantic().source_text();
                let (line, column) = line_column(text, span.start);
                Err(CompilerError::attrs_argument(line, column, span.source_text(text)))
            }
        }
    }

    fn is_styled(&self, expr: &Expression<'a>) -> bool {
        match expr.get_inner_expression() {
            Expression::Identifier(ident) => self.scope.symbol_of(ident) == Some(self.styled),
            _ => false,
        }
    }

    fn is_rooted_in_styled(&self, tag: &Expression<'a>) -> bool {
        let mut expr = tag.get_inner_expression();
        loop {
            expr = match expr {
                Expression::CallExpression(call) => call.callee.get_inner_expression(),
                Expression::StaticMemberExpression(member) => member.object.get_inner_expression(),
                Expression::ComputedMemberExpression(member) => member.object.get_inner_expression(),
                Expression::Identifier(_) => return self.is_styled(expr),
                _ => return false,
            };
        }
    }
}

/// 1-based line and column of a byte offset.
fn line_column(text: &str, offset: u32) -> (u32, u32) {
    let end = (offset as usize).min(text.len());
    let before = &text[..end];
    let line = before.matches('\n').count() as u32 + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let column = before[line_start..].chars().count() as u32 + 1;
    (line, column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ERR_ATTRS_ARGUMENT;
    use oxc_allocator::Allocator;
    use oxc_parser::Parser;
    use oxc_semantic::SemanticBuilder;
    use oxc_span::SourceType;

    /// Summary of the last tagged template in `code`.
    #[derive(Debug, PartialEq)]
    enum Shape {
        NotStyled,
        Rejected,
        Styled {
            name: Option<String>,
            target: RenderTarget,
            templates: usize,
            attrs: Vec<String>,
        },
    }

    fn classify_last(code: &str) -> Result<Shape, CompilerError> {
        let allocator = Allocator::default();
        let source_type = SourceType::default()
            .with_module(true)
            .with_typescript(true)
            .with_jsx(true);
        let ret = Parser::new(&allocator, code, source_type).parse();
        assert!(ret.errors.is_empty(), "parse errors in {code}");
        let program = &*allocator.alloc(ret.program);
        let semantic = SemanticBuilder::new().build(program).semantic;
        let styled = semantic
            .scoping()
            .get_root_binding("styled")
            .expect("styled is imported");
        let node = semantic
            .nodes()
            .iter()
            .filter(|node| matches!(node.kind(), AstKind::TaggedTemplateExpression(_)))
            .map(|node| node.id())
            .last()
            .expect("a tagged template");
        let classifier = Classifier::new(&semantic, styled);
        Ok(match classifier.classify_node(node)? {
            Classification::NotStyled => Shape::NotStyled,
            Classification::Rejected(_) => Shape::Rejected,
            Classification::Styled(decl) => Shape::Styled {
                name: decl.component_name,
                target: decl.target,
                templates: decl.templates.len(),
                attrs: decl
                    .attrs
                    .iter()
                    .map(|expr| expr.span().source_text(code).to_string())
                    .collect(),
            },
        })
    }

    const IMPORT: &str = "import styled from 'styled-components';\n";

    fn styled(name: &str, tag: &str, templates: usize, attrs: &[&str]) -> Shape {
        Shape::Styled {
            name: Some(name.to_string()),
            target: RenderTarget::Tag(tag.to_string()),
            templates,
            attrs: attrs.iter().map(|a| a.to_string()).collect(),
        }
    }

    #[test]
    fn test_member_and_call_forms() {
        let code = format!("{IMPORT}const Text = styled.p``;");
        assert_eq!(classify_last(&code), Ok(styled("Text", "p", 1, &[])));
        let code = format!("{IMPORT}const Text = styled('p')``;");
        assert_eq!(classify_last(&code), Ok(styled("Text", "p", 1, &[])));
    }

    #[test]
    fn test_attrs_are_collected_in_order() {
        let code = format!("{IMPORT}const Text = styled.p.attrs({{}}).attrs(() => ({{}}))``;");
        assert_eq!(
            classify_last(&code),
            Ok(styled("Text", "p", 1, &["{}", "() => ({})"]))
        );
        let code = format!("{IMPORT}const Text = styled('p').attrs({{ className: 'bar' }})``;");
        assert_eq!(
            classify_last(&code),
            Ok(styled("Text", "p", 1, &["{ className: 'bar' }"]))
        );
    }

    #[test]
    fn test_invalid_attrs_argument_is_a_hard_error() {
        let code = format!("{IMPORT}const getAttrs = () => ({{}});\nconst Text = styled.p.attrs(getAttrs)``;");
        let err = classify_last(&code).expect_err("invariant violation");
        assert_eq!(err.code, ERR_ATTRS_ARGUMENT);
        assert_eq!(err.line, 3);
        assert_eq!(err.context.as_deref(), Some("getAttrs"));
    }

    #[test]
    fn test_unknown_tags_and_methods_are_rejected() {
        let code = format!("{IMPORT}const Text = styled.foo``;");
        assert_eq!(classify_last(&code), Ok(Shape::Rejected));
        let code = format!("{IMPORT}const Text = styled('foo')``;");
        assert_eq!(classify_last(&code), Ok(Shape::Rejected));
        let code = format!("{IMPORT}const Text = styled.p.withConfig({{}})``;");
        assert_eq!(classify_last(&code), Ok(Shape::Rejected));
        let code = format!("{IMPORT}const Text = styled()``;");
        assert_eq!(classify_last(&code), Ok(Shape::Rejected));
    }

    #[test]
    fn test_other_tags_are_not_styled() {
        let code = format!("{IMPORT}const Text = css``;");
        assert_eq!(classify_last(&code), Ok(Shape::NotStyled));
        let code = format!("{IMPORT}const Text = other.p``;");
        assert_eq!(classify_last(&code), Ok(Shape::NotStyled));
    }

    #[test]
    fn test_extension_composes_base_first() {
        let code = format!(
            "{IMPORT}const A = styled.p.attrs({{ a: 1 }})``;\nconst B = styled(A)``;\nconst C = styled(B).attrs({{ c: 3 }})``;"
        );
        assert_eq!(
            classify_last(&code),
            Ok(styled("C", "p", 3, &["{ a: 1 }", "{ c: 3 }"]))
        );
    }

    #[test]
    fn test_extension_of_rejected_base_is_rejected() {
        let code = format!("{IMPORT}const A = styled.foo``;\nconst B = styled(A)``;");
        assert_eq!(classify_last(&code), Ok(Shape::Rejected));
    }

    #[test]
    fn test_extension_of_imported_component_is_rejected() {
        let code = format!("{IMPORT}import {{ SomeText }} from './SomeText';\nconst B = styled(SomeText)``;");
        assert_eq!(classify_last(&code), Ok(Shape::Rejected));
        let code = format!("{IMPORT}let A = styled.p``;\nconst B = styled(A)``;");
        assert_eq!(classify_last(&code), Ok(Shape::Rejected));
    }

    #[test]
    fn test_extension_of_local_component() {
        let code = format!("{IMPORT}function Link(props) {{ return <a {{...props}} />; }}\nconst Styled = styled(Link)``;");
        assert_eq!(
            classify_last(&code),
            Ok(Shape::Styled {
                name: Some("Styled".to_string()),
                target: RenderTarget::Component("Link".to_string()),
                templates: 1,
                attrs: vec![],
            })
        );
    }

    #[test]
    fn test_line_column() {
        assert_eq!(line_column("ab\ncd", 0), (1, 1));
        assert_eq!(line_column("ab\ncd", 4), (2, 2));
    }
}
