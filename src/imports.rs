//! Facts about a module's header: which local names `styled-components`
//! and React were imported under, and whether it opens with `"use client"`.

use oxc_ast::ast::{ImportDeclarationSpecifier, Program, Statement};
use oxc_semantic::SymbolId;
use oxc_span::Span;

pub const STYLED_COMPONENTS: &str = "styled-components";
const USE_CLIENT: &str = "use client";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleFacts {
    /// Local binding of `import styled from 'styled-components'`.
    pub styled: Option<SymbolId>,
    /// Local binding of `import { css } from 'styled-components'`, renamed or not.
    pub css: Option<SymbolId>,
    pub has_react_import: bool,
    pub use_client: Option<Span>,
}

impl ModuleFacts {
    pub fn collect(program: &Program<'_>) -> Self {
        let mut facts = ModuleFacts {
            use_client: use_client_directive(program),
            ..Default::default()
        };

        for stmt in &program.body {
            let Statement::ImportDeclaration(import) = stmt else { continue };
            if import.import_kind.is_type() {
                continue;
            }
            let Some(specifiers) = &import.specifiers else { continue };
            let source = import.source.value.as_str();

            for specifier in specifiers {
                match (source, specifier) {
                    (STYLED_COMPONENTS, ImportDeclarationSpecifier::ImportDefaultSpecifier(default)) => {
                        if facts.styled.is_none() {
                            facts.styled = default.local.symbol_id.get();
                        }
                    }
                    (STYLED_COMPONENTS, ImportDeclarationSpecifier::ImportSpecifier(named)) => {
                        if named.import_kind.is_value()
                            && named.imported.name().as_str() == "css"
                            && facts.css.is_none()
                        {
                            facts.css = named.local.symbol_id.get();
                        }
                    }
                    ("react", ImportDeclarationSpecifier::ImportDefaultSpecifier(default)) => {
                        if default.local.name.as_str() == "React" {
                            facts.has_react_import = true;
                        }
                    }
                    _ => {}
                }
            }
        }
        facts
    }
}

/// Span of a `'use client'` / `"use client"` directive that opens the module.
pub fn use_client_directive(program: &Program<'_>) -> Option<Span> {
    let first = program.directives.first()?;
    (first.expression.value.as_str() == USE_CLIENT).then_some(first.span)
}
