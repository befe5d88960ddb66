//! Theme loading.
//!
//! A theme module must declare a top-level `const theme` initialized with a
//! frozen object literal (`as const`, optionally with `satisfies`, or
//! `Object.freeze`). JSON files are accepted as-is. Any problem degrades to
//! "no theme" rather than failing the build.

use crate::scope::ScopeAnalyzer;
use crate::static_eval::{is_frozen, Evaluator};
use crate::value::{Context, Theme, Value};
use oxc_allocator::Allocator;
use oxc_ast::ast::{BindingPattern, Declaration, Program, Statement, VariableDeclaration};
use oxc_parser::Parser;
use oxc_semantic::SemanticBuilder;
use oxc_span::SourceType;
use std::fs;
use std::path::Path;

const THEME_BINDING: &str = "theme";

pub fn load_theme(path: impl AsRef<Path>) -> Option<Theme> {
    let path = path.as_ref();
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "theme file unreadable");
            return None;
        }
    };

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        return match serde_json::from_str::<Theme>(&source) {
            Ok(theme) => Some(theme),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "theme JSON rejected");
                None
            }
        };
    }

    let source_type = SourceType::from_path(path).unwrap_or_else(|_| SourceType::tsx());
    parse_theme(&source, source_type)
}

/// Extracts the theme object from module source text.
pub fn parse_theme(source: &str, source_type: SourceType) -> Option<Theme> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, source_type).parse();
    if !ret.errors.is_empty() {
        tracing::debug!(errors = ret.errors.len(), "theme module has parse errors");
        return None;
    }
    let program = &*allocator.alloc(ret.program);
    let semantic = SemanticBuilder::new().build(program).semantic;

    let declaration = theme_declaration(program)?;
    let declarator = declaration.declarations.iter().find(|decl| {
        matches!(&decl.id, BindingPattern::BindingIdentifier(id) if id.name == THEME_BINDING)
    })?;
    let init = declarator.init.as_ref()?;
    if !declaration.kind.is_const() || !is_frozen(init) {
        tracing::debug!("theme is not a frozen const object");
        return None;
    }

    let symbol = declarator
        .id
        .get_binding_identifiers()
        .first()
        .and_then(|id| id.symbol_id.get())?;
    if ScopeAnalyzer::new(&semantic).has_mutation_evidence(symbol) {
        tracing::debug!("theme is modified after its declaration");
        return None;
    }

    match Evaluator::new(&semantic, None, None).evaluate(init, &Context::new()) {
        Ok(Value::Map(entries)) => Some(Theme::new(entries)),
        _ => {
            tracing::debug!("theme object is not statically known");
            None
        }
    }
}

fn theme_declaration<'p, 'a>(program: &'p Program<'a>) -> Option<&'p VariableDeclaration<'a>> {
    program.body.iter().find_map(|stmt| {
        let declaration = match stmt {
            Statement::VariableDeclaration(decl) => &**decl,
            Statement::ExportNamedDeclaration(export) => match &export.declaration {
                Some(Declaration::VariableDeclaration(decl)) => &**decl,
                _ => return None,
            },
            _ => return None,
        };
        declaration
            .declarations
            .iter()
            .any(|decl| decl.id.get_identifier_name().is_some_and(|name| name == THEME_BINDING))
            .then_some(declaration)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn ts() -> SourceType {
        SourceType::ts()
    }

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("styled-static-{}-{}", std::process::id(), name));
        fs::write(&path, contents).expect("temp file is writable");
        path
    }

    fn coral() -> Theme {
        serde_json::from_str(r#"{"color":{"main":"coral"},"fontSize":{"m":16}}"#).expect("valid")
    }

    #[test]
    fn test_as_const_theme() {
        let source = "export const theme = { color: { main: 'coral' }, fontSize: { m: 16 } } as const;";
        assert_eq!(parse_theme(source, ts()), Some(coral()));
    }

    #[test]
    fn test_satisfies_and_freeze() {
        let source = r#"
            type Theme = { color: { main: string }; fontSize: { m: number } };
            const theme = { color: { main: 'coral' }, fontSize: { m: 16 } } as const satisfies Theme;
        "#;
        assert_eq!(parse_theme(source, ts()), Some(coral()));

        let source = "const theme = Object.freeze({ color: { main: 'coral' }, fontSize: { m: 16 } });";
        assert_eq!(parse_theme(source, ts()), Some(coral()));
    }

    #[test]
    fn test_theme_may_reference_local_constants() {
        let source = r#"
            const base = 8;
            const main = 'coral';
            export const theme = { color: { main }, fontSize: { m: base * 2 } } as const;
        "#;
        assert_eq!(parse_theme(source, ts()), Some(coral()));
    }

    #[test]
    fn test_rejected_themes() {
        assert_eq!(parse_theme("const theme = { color: 'red' };", ts()), None);
        assert_eq!(parse_theme("let theme = { color: 'red' } as const;", ts()), None);
        assert_eq!(parse_theme("const palette = { color: 'red' } as const;", ts()), None);
        assert_eq!(
            parse_theme("import { red } from './colors';\nconst theme = { color: red } as const;", ts()),
            None
        );
        assert_eq!(
            parse_theme("const theme = { color: 'red' } as const;\n(theme as any).color = 'blue';", ts()),
            None
        );
        assert_eq!(parse_theme("const theme = {", ts()), None);
    }

    #[test]
    fn test_load_from_files() {
        let module = write_temp("theme.ts", "export const theme = { color: { main: 'coral' }, fontSize: { m: 16 } } as const;\n");
        assert_eq!(load_theme(&module), Some(coral()));

        let json = write_temp("theme.json", r#"{"color":{"main":"coral"},"fontSize":{"m":16}}"#);
        assert_eq!(load_theme(&json), Some(coral()));

        let bad_json = write_temp("bad.json", r#"{"dark": true}"#);
        assert_eq!(load_theme(&bad_json), None);

        for path in [module, json, bad_json] {
            fs::remove_file(path).ok();
        }
    }

    #[test]
    fn test_missing_file() {
        assert_eq!(load_theme("/definitely/not/here/theme.ts"), None);
    }
}
