//! Style extraction pass.
//!
//! Visits every tagged template in source order. A styled declaration whose
//! CSS resolves completely is replaced by a plain rendering arrow function
//! and its rule goes to the sink. Anything else is left as written and flags
//! the module as needing the runtime.

use crate::css::{compile_rule, normalize};
use crate::error::CompilerError;
use crate::hash::class_name_hash;
use crate::sink::StyleSink;
use crate::static_eval::Evaluator;
use crate::styled::{Classification, Classifier, StyledDeclaration};
use crate::value::{Context, EvalError, Theme};
use oxc_ast::ast::Expression;
use oxc_ast::AstKind;
use oxc_semantic::{NodeId, Semantic, SymbolId};
use oxc_span::{GetSpan, Span};

pub const DEFAULT_PREFIX: &str = "ss";

// ═══════════════════════════════════════════════════════════════════════════════
// PASS CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct PassConfig {
    pub dev_mode: bool,
    pub prefix: String,
    /// Path of the module relative to the project root, `/`-separated.
    pub relative_path: String,
    /// File name without extension, used for dev-mode hints.
    pub file_stem: String,
    /// Emit `: any` / `as any` annotations in replacements.
    pub typescript: bool,
}

impl Default for PassConfig {
    fn default() -> Self {
        PassConfig {
            dev_mode: false,
            prefix: DEFAULT_PREFIX.to_string(),
            relative_path: String::new(),
            file_stem: String::new(),
            typescript: true,
        }
    }
}

/// A pending text edit against the original source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub start: u32,
    pub end: u32,
    pub text: String,
}

impl Replacement {
    pub fn new(span: Span, text: impl Into<String>) -> Self {
        Replacement {
            start: span.start,
            end: span.end,
            text: text.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct PassOutcome {
    pub replacements: Vec<Replacement>,
    pub should_use_client: bool,
    pub extracted: usize,
    pub rejected: usize,
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXTRACTION
// ═══════════════════════════════════════════════════════════════════════════════

pub struct ExtractionPass<'s, 'a, 'k> {
    semantic: &'s Semantic<'a>,
    classifier: Classifier<'s, 'a>,
    evaluator: Evaluator<'s, 'a>,
    config: &'s PassConfig,
    sink: &'k mut dyn StyleSink,
    outcome: PassOutcome,
    replaced: Vec<Span>,
}

impl<'s, 'a, 'k> ExtractionPass<'s, 'a, 'k> {
    pub fn new(
        semantic: &'s Semantic<'a>,
        styled: SymbolId,
        css_helper: Option<SymbolId>,
        theme: Option<&'s Theme>,
        config: &'s PassConfig,
        sink: &'k mut dyn StyleSink,
    ) -> Self {
        Self {
            semantic,
            classifier: Classifier::new(semantic, styled),
            evaluator: Evaluator::new(semantic, theme, css_helper),
            config,
            sink,
            outcome: PassOutcome::default(),
            replaced: Vec::new(),
        }
    }

    pub fn run(mut self) -> Result<PassOutcome, CompilerError> {
        let candidates: Vec<(NodeId, Span)> = self
            .semantic
            .nodes()
            .iter()
            .filter_map(|node| match node.kind() {
                AstKind::TaggedTemplateExpression(tagged) => Some((node.id(), tagged.span)),
                _ => None,
            })
            .collect();

        for (node, span) in candidates {
            if self.replaced.iter().any(|outer| outer.start <= span.start && span.end <= outer.end) {
                continue;
            }
            self.visit_candidate(node, span)?;
        }
        Ok(self.outcome)
    }

    fn visit_candidate(&mut self, node: NodeId, span: Span) -> Result<(), CompilerError> {
        let declaration = match self.classifier.classify_node(node)? {
            Classification::NotStyled => return Ok(()),
            Classification::Rejected(reason) => {
                self.reject(span, &reason);
                return Ok(());
            }
            Classification::Styled(declaration) => declaration,
        };

        let css = match self.resolve_css(&declaration) {
            Ok(css) => css,
            Err(EvalError) => {
                self.reject(span, "style template is not statically known");
                return Ok(());
            }
        };

        let line = self.evaluator.scope().line_of(span);
        let hash = class_name_hash(&format!("{}{}{}", self.config.relative_path, line, css));
        let class_name = if self.config.dev_mode {
            format!("{}-{}", self.config.prefix, hash)
        } else {
            hash.clone()
        };
        self.sink.add_rule(&hash, &compile_rule(&css, &class_name));

        let text = self.render_component(&declaration, &class_name);
        self.outcome.replacements.push(Replacement::new(span, text));
        self.replaced.push(span);
        self.outcome.extracted += 1;
        tracing::debug!(
            file = %self.config.relative_path,
            line,
            class_name = %class_name,
            "extracted styled declaration"
        );
        Ok(())
    }

    fn reject(&mut self, span: Span, reason: &str) {
        self.outcome.should_use_client = true;
        self.outcome.rejected += 1;
        tracing::debug!(
            file = %self.config.relative_path,
            line = self.evaluator.scope().line_of(span),
            reason,
            "styled declaration left to the runtime"
        );
    }

    fn resolve_css(&self, declaration: &StyledDeclaration<'a>) -> Result<String, EvalError> {
        let mut css = String::new();
        for template in &declaration.templates {
            css.push_str(&self.evaluator.evaluate_style(template, &Context::new())?);
        }
        Ok(normalize(&css))
    }

    fn hint(&self, component_name: Option<&str>) -> String {
        if !self.config.dev_mode {
            return String::new();
        }
        let parts: Vec<&str> = [Some(self.config.file_stem.as_str()), component_name]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect();
        format!("{}-{}", parts.join("__"), self.config.prefix)
    }

    fn render_component(&self, declaration: &StyledDeclaration<'a>, class_name: &str) -> String {
        let source = self.semantic.source_text();
        let (param, cast) = if self.config.typescript {
            ("props: any", " as any")
        } else {
            ("props", "")
        };

        let mut body = String::new();
        let mut spreads = Vec::with_capacity(declaration.attrs.len());
        for (index, attrs) in declaration.attrs.iter().enumerate() {
            body.push_str(&format!(
                "  const attrs{} = {};\n",
                index,
                attrs.span().source_text(source)
            ));
            if matches!(attrs.get_inner_expression(), Expression::ArrowFunctionExpression(_)) {
                spreads.push(format!("...attrs{}(props)", index));
            } else {
                spreads.push(format!("...attrs{}", index));
            }
        }

        let target = declaration.target.name();
        let hint = self.hint(declaration.component_name.as_deref());

        let attrs_props = if spreads.is_empty() {
            "{}".to_string()
        } else {
            format!("{{ {} }}", spreads.join(", "))
        };
        body.push_str(&format!("  const attrsProps = {}{};\n", attrs_props, cast));
        body.push_str(&format!(
            "  const propsWithAttrs = {{ ...props, ...attrsProps }}{};\n",
            cast
        ));
        body.push_str(&format!(
            "  const joinedClassName = ['{}', '{}', attrsProps.className, props.className].filter(Boolean).join(' ');\n",
            escape_single_quoted(&hint),
            escape_single_quoted(class_name)
        ));
        body.push_str(&format!(
            "  return <{} {{...propsWithAttrs}} className={{joinedClassName}} />;\n",
            target
        ));
        format!("({}) => {{\n{}}}", param, body)
    }
}

fn escape_single_quoted(text: &str) -> String {
    text.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Applies non-overlapping replacements back to front.
pub fn apply_replacements(source: &str, mut replacements: Vec<Replacement>) -> String {
    replacements.sort_by(|a, b| b.start.cmp(&a.start));
    let mut result = source.to_string();
    for Replacement { start, end, text } in replacements {
        result.replace_range((start as usize)..(end as usize), &text);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::StyleSheet;
    use oxc_allocator::Allocator;
    use oxc_parser::Parser;
    use oxc_semantic::SemanticBuilder;
    use oxc_span::SourceType;

    fn run_pass(code: &str, config: &PassConfig, theme: Option<&Theme>) -> (PassOutcome, String, String) {
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
        let css = semantic.scoping().get_root_binding("css");
        let mut sheet = StyleSheet::new();
        let outcome = ExtractionPass::new(&semantic, styled, css, theme, config, &mut sheet)
            .run()
            .expect("no invariant violation");
        let code = apply_replacements(code, outcome.replacements.clone());
        (outcome, code, sheet.drain())
    }

    #[test]
    fn test_static_declaration_is_replaced() {
        let code = "import styled from 'styled-components';\nconst Text = styled.p`color: red;`;\n";
        let config = PassConfig {
            relative_path: "/App.tsx".to_string(),
            ..Default::default()
        };
        let (outcome, rewritten, css) = run_pass(code, &config, None);
        assert_eq!(outcome.extracted, 1);
        assert!(!outcome.should_use_client);
        // "/App.tsx" + line 2 + normalized css
        let hash = class_name_hash("/App.tsx2color: red;");
        assert_eq!(css, format!(".{}{{color:red;}}", hash));
        assert!(rewritten.contains("const Text = (props: any) => {"));
        assert!(rewritten.contains(&format!("['', '{}', attrsProps.className, props.className]", hash)));
        assert!(rewritten.contains("return <p {...propsWithAttrs} className={joinedClassName} />;"));
        assert!(!rewritten.contains("styled.p`"));
    }

    #[test]
    fn test_dynamic_declaration_is_left_alone() {
        let code = "import styled from 'styled-components';\nconst Text = styled.p`color: ${({ color }) => color};`;\n";
        let (outcome, rewritten, css) = run_pass(code, &PassConfig::default(), None);
        assert!(outcome.should_use_client);
        assert_eq!(outcome.rejected, 1);
        assert_eq!(rewritten, code);
        assert_eq!(css, "");
    }

    #[test]
    fn test_use_client_is_monotonic() {
        let code = r#"import styled from 'styled-components';
const A = styled.foo`color: red;`;
const B = styled.p`color: blue;`;
"#;
        let (outcome, rewritten, _) = run_pass(code, &PassConfig::default(), None);
        assert!(outcome.should_use_client);
        assert_eq!(outcome.extracted, 1);
        assert!(rewritten.contains("styled.foo`color: red;`"));
        assert!(!rewritten.contains("styled.p`"));
    }

    #[test]
    fn test_dev_mode_class_name_and_hint() {
        let code = "import styled from 'styled-components';\nconst Title = styled.h1`font-weight: bold;`;\n";
        let config = PassConfig {
            dev_mode: true,
            prefix: "app".to_string(),
            relative_path: "/src/Header.tsx".to_string(),
            file_stem: "Header".to_string(),
            typescript: true,
        };
        let (_, rewritten, css) = run_pass(code, &config, None);
        let hash = class_name_hash("/src/Header.tsx2font-weight: bold;");
        assert!(rewritten.contains(&format!("['Header__Title-app', 'app-{}'", hash)));
        assert_eq!(css, format!(".app-{}{{font-weight:bold;}}", hash));
    }

    #[test]
    fn test_attrs_are_spread_in_order() {
        let code = "import styled from 'styled-components';\nconst Input = styled.input.attrs({ type: 'text' }).attrs((props) => ({ size: props.small ? 5 : 10 }))``;\n";
        let (_, rewritten, _) = run_pass(code, &PassConfig::default(), None);
        assert!(rewritten.contains("const attrs0 = { type: 'text' };"));
        assert!(rewritten.contains("const attrs1 = (props) => ({ size: props.small ? 5 : 10 });"));
        assert!(rewritten.contains("const attrsProps = { ...attrs0, ...attrs1(props) } as any;"));
    }

    #[test]
    fn test_plain_javascript_has_no_annotations() {
        let code = "import styled from 'styled-components';\nconst Text = styled.p`color: red;`;\n";
        let config = PassConfig {
            typescript: false,
            ..Default::default()
        };
        let (_, rewritten, _) = run_pass(code, &config, None);
        assert!(rewritten.contains("const Text = (props) => {"));
        assert!(!rewritten.contains("as any"));
    }

    #[test]
    fn test_theme_interpolation() {
        let code = "import styled from 'styled-components';\nconst Text = styled.p`color: ${({ theme }) => theme.color.main};`;\n";
        let theme: Theme = serde_json::from_str(r#"{"color":{"main":"coral"}}"#).expect("valid");
        let (outcome, _, css) = run_pass(code, &PassConfig::default(), Some(&theme));
        assert_eq!(outcome.extracted, 1);
        assert!(css.ends_with("{color:coral;}"));
    }

    #[test]
    fn test_apply_replacements_back_to_front() {
        let replaced = apply_replacements(
            "aaa bbb ccc",
            vec![
                Replacement { start: 0, end: 3, text: "x".to_string() },
                Replacement { start: 8, end: 11, text: "zzzz".to_string() },
            ],
        );
        assert_eq!(replaced, "x bbb zzzz");
    }

    #[test]
    fn test_escape_single_quoted() {
        assert_eq!(escape_single_quoted("it's"), "it\\'s");
    }
}
