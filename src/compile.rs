//! Compile entry: one source file in, rewritten source and its CSS out.

#[cfg(feature = "napi")]
use napi_derive::napi;
use crate::error::{CompilerError, ERR_PARSE};
use crate::imports::ModuleFacts;
use crate::sink::{StyleSheet, StyleSink};
use crate::transform::{apply_replacements, ExtractionPass, PassConfig, Replacement, DEFAULT_PREFIX};
use crate::value::Theme;
use oxc_allocator::Allocator;
use oxc_parser::Parser;
use oxc_semantic::SemanticBuilder;
use oxc_span::SourceType;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileOptions {
    /// Prefixes class names and adds a readable hint class.
    pub dev_mode: bool,
    pub prefix: Option<String>,
    /// Project root; hashes are seeded with the path relative to it.
    pub root: Option<String>,
    pub theme: Option<Theme>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "napi", napi(object))]
#[serde(rename_all = "camelCase")]
pub struct CompileResult {
    pub code: String,
    pub css: String,
    pub should_use_client: bool,
    pub use_client_extracted: bool,
    pub has_react_import: bool,
}

impl CompileResult {
    fn unchanged(source: &str) -> Self {
        CompileResult {
            code: source.to_string(),
            ..Default::default()
        }
    }

    /// The module text a bundler emits for this result, importing
    /// `css_import` when the file produced CSS.
    pub fn module_code(&self, css_import: Option<&str>) -> String {
        let mut out = String::new();
        if self.use_client_extracted || self.should_use_client {
            out.push_str("\"use client\";\n");
        }
        if !self.css.is_empty() {
            if !self.has_react_import {
                out.push_str("import React from \"react\";\n");
            }
            if let Some(id) = css_import {
                out.push_str(&format!("import \"{}\";\n", id));
            }
        }
        out.push_str(&self.code);
        out
    }
}

pub fn compile(
    source: &str,
    file_path: &str,
    options: &CompileOptions,
) -> Result<CompileResult, CompilerError> {
    let mut sheet = StyleSheet::new();
    let mut result = compile_with_sink(source, file_path, options, &mut sheet)?;
    result.css = sheet.drain();
    Ok(result)
}

/// Like [`compile`], but rules go to `sink` and are left there for the
/// caller to drain. `css` in the result is empty.
pub fn compile_with_sink(
    source: &str,
    file_path: &str,
    options: &CompileOptions,
    sink: &mut dyn StyleSink,
) -> Result<CompileResult, CompilerError> {
    let source_type = source_type_for(file_path);
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, source_type).parse();
    if !ret.errors.is_empty() {
        let messages: Vec<String> = ret.errors.iter().map(|e| e.to_string()).collect();
        return Err(CompilerError::with_details(
            ERR_PARSE,
            &messages[0],
            file_path,
            0,
            0,
            None,
            messages[1..].to_vec(),
        ));
    }

    let program = &*allocator.alloc(ret.program);
    let semantic = SemanticBuilder::new().build(program).semantic;
    let facts = ModuleFacts::collect(program);

    let Some(styled) = facts.styled else {
        return Ok(CompileResult::unchanged(source));
    };

    let config = PassConfig {
        dev_mode: options.dev_mode,
        prefix: options
            .prefix
            .clone()
            .filter(|prefix| !prefix.is_empty())
            .unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
        relative_path: relative_path(file_path, options.root.as_deref()),
        file_stem: Path::new(file_path)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default(),
        typescript: source_type.is_typescript(),
    };

    let outcome = ExtractionPass::new(
        &semantic,
        styled,
        facts.css,
        options.theme.as_ref(),
        &config,
        sink,
    )
    .run()
    .map_err(|err| err.in_file(file_path))?;

    let mut replacements = outcome.replacements;
    if let Some(directive) = facts.use_client {
        replacements.push(Replacement::new(directive, ""));
    }
    let code = apply_replacements(source, replacements);

    tracing::info!(
        file = %config.relative_path,
        extracted = outcome.extracted,
        rejected = outcome.rejected,
        should_use_client = outcome.should_use_client,
        "compiled styled module"
    );

    Ok(CompileResult {
        code,
        css: String::new(),
        should_use_client: outcome.should_use_client,
        use_client_extracted: facts.use_client.is_some(),
        has_react_import: facts.has_react_import,
    })
}

/// TypeScript keeps its extension's JSX setting; JavaScript always allows
/// JSX. Unknown extensions are treated as TSX.
fn source_type_for(file_path: &str) -> SourceType {
    match SourceType::from_path(file_path) {
        Ok(source_type) if source_type.is_typescript() => source_type.with_module(true),
        Ok(source_type) => source_type.with_module(true).with_jsx(true),
        Err(_) => SourceType::tsx(),
    }
}

/// `file_path` relative to `root`, `/`-separated with a leading slash.
fn relative_path(file_path: &str, root: Option<&str>) -> String {
    let normalized = file_path.replace('\\', "/");
    let Some(root) = root else {
        return normalized;
    };
    let root = root.replace('\\', "/");
    let root = root.trim_end_matches('/');
    match normalized.strip_prefix(root) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => {
            format!("/{}", rest.trim_start_matches('/'))
        }
        _ => normalized,
    }
}
