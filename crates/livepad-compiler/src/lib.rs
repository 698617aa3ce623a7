//! Per-script rewriting: parse, inject a UI-library import for JSX, resolve
//! bare specifiers against a CDN, lower to plain script and print.

pub mod imports;
pub mod jsx;
pub mod lower;
pub mod source;
pub mod specifier;

pub use jsx::UiLibrary;
pub use specifier::{CdnOrigin, DEFAULT_CDN_ORIGIN, InvalidOrigin, SpecifierClass, classify};

use oxc_allocator::Allocator;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RewriteError {
    #[error("parse failed: {0}")]
    Parse(String),
    #[error("transform failed: {0}")]
    Transform(String),
    #[error("import injection failed: {0}")]
    Inject(String),
}

/// Which stages of the pipeline a request runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileMode {
    /// Inline document scripts: inject, rewrite imports, lower.
    Document,
    /// Console commands: rewrite imports and lower, no injected import since
    /// the result is evaluated as a script.
    Command,
    /// Parse and re-print only.
    Format,
}

#[derive(Debug, Clone)]
pub struct CompileRequest<'s> {
    pub source_text: &'s str,
    pub source_id: String,
    pub mode: CompileMode,
}

impl<'s> CompileRequest<'s> {
    pub fn document(source_text: &'s str, source_id: impl Into<String>) -> Self {
        Self {
            source_text,
            source_id: source_id.into(),
            mode: CompileMode::Document,
        }
    }

    pub fn command(source_text: &'s str) -> Self {
        Self {
            source_text,
            source_id: "<command>".to_string(),
            mode: CompileMode::Command,
        }
    }

    pub fn format(source_text: &'s str, source_id: impl Into<String>) -> Self {
        Self {
            source_text,
            source_id: source_id.into(),
            mode: CompileMode::Format,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileMetadata {
    pub injected_ui_import: bool,
    pub rewritten_specifiers: usize,
    /// Set when the pipeline failed and the original text was kept.
    pub fallback: Option<RewriteError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileResult {
    pub javascript: String,
    pub metadata: CompileMetadata,
}

impl CompileResult {
    pub fn is_fallback(&self) -> bool {
        self.metadata.fallback.is_some()
    }
}

/// A per-script rewrite step. Implementations never fail: a script that
/// cannot be processed comes back unchanged with `metadata.fallback` set.
pub trait Compiler {
    fn compile(&self, req: &CompileRequest<'_>) -> CompileResult;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptCompiler {
    pub origin: CdnOrigin,
    pub ui: UiLibrary,
}

impl ScriptCompiler {
    pub fn new(origin: CdnOrigin, ui: UiLibrary) -> Self {
        Self { origin, ui }
    }

    pub fn try_compile(&self, req: &CompileRequest<'_>) -> Result<CompileResult, RewriteError> {
        let allocator = Allocator::default();
        let mut program = source::parse_script(&allocator, req.source_text)?;
        let mut metadata = CompileMetadata::default();

        if req.mode == CompileMode::Document && jsx::needs_injection(&program, &self.ui) {
            jsx::inject(&allocator, &mut program, &self.ui)?;
            metadata.injected_ui_import = true;
        }

        if req.mode != CompileMode::Format {
            metadata.rewritten_specifiers =
                imports::rewrite_imports(&allocator, &mut program, &self.origin);
            lower::lower(&allocator, &mut program, &self.ui)?;
        }

        debug!(
            source_id = %req.source_id,
            injected = metadata.injected_ui_import,
            rewritten = metadata.rewritten_specifiers,
            "script compiled"
        );
        Ok(CompileResult {
            javascript: source::print_program(&program),
            metadata,
        })
    }
}

impl Compiler for ScriptCompiler {
    fn compile(&self, req: &CompileRequest<'_>) -> CompileResult {
        match self.try_compile(req) {
            Ok(result) => result,
            Err(err) => {
                warn!(source_id = %req.source_id, "keeping original script: {err}");
                CompileResult {
                    javascript: req.source_text.to_string(),
                    metadata: CompileMetadata {
                        fallback: Some(err),
                        ..CompileMetadata::default()
                    },
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CdnOrigin, CompileRequest, Compiler, RewriteError, ScriptCompiler, UiLibrary};

    fn compiler() -> ScriptCompiler {
        let origin = CdnOrigin::parse("https://cdn.example/").expect("origin should parse");
        ScriptCompiler::new(origin, UiLibrary::default())
    }

    #[test]
    fn document_script_runs_the_whole_pipeline() {
        let result = compiler().compile(&CompileRequest::document(
            "import { createRoot } from 'react-dom/client';\nconst App = () => <h1>hi</h1>;",
            "inline-0",
        ));
        assert!(!result.is_fallback());
        assert!(result.metadata.injected_ui_import);
        assert_eq!(result.metadata.rewritten_specifiers, 2);

        let js = &result.javascript;
        assert!(
            js.starts_with("import React from \"https://cdn.example/react\";"),
            "{js}"
        );
        assert!(js.contains("https://cdn.example/react-dom/client"), "{js}");
        assert!(js.contains("React.createElement(\"h1\""), "{js}");
    }

    #[test]
    fn injected_import_reuses_versioned_specifier() {
        let result = compiler().compile(&CompileRequest::document(
            "import { useState } from 'react@19';\nconst el = <p />;",
            "inline-0",
        ));
        assert!(
            result
                .javascript
                .starts_with("import React from \"https://cdn.example/react@19\";"),
            "{}",
            result.javascript
        );
    }

    #[test]
    fn malformed_script_is_returned_byte_for_byte() {
        let src = "function broken( {\n  console.log('x'\n";
        let result = compiler().compile(&CompileRequest::document(src, "inline-0"));
        assert_eq!(result.javascript, src);
        assert!(matches!(result.metadata.fallback, Some(RewriteError::Parse(_))));
    }

    #[test]
    fn injection_is_not_repeated() {
        let compiler = compiler();
        let first = compiler
            .try_compile(&CompileRequest::document("const el = <div />;", "inline-0"))
            .expect("compile should work");
        assert!(first.metadata.injected_ui_import);

        let again = compiler
            .try_compile(&CompileRequest::document(&first.javascript, "inline-0"))
            .expect("compile should work");
        assert!(!again.metadata.injected_ui_import);
        assert_eq!(again.javascript.matches("import React").count(), 1);
    }

    #[test]
    fn command_mode_never_injects() {
        let result = compiler().compile(&CompileRequest::command("<b />"));
        assert!(!result.metadata.injected_ui_import);
        assert!(result.javascript.contains("React.createElement(\"b\""));
        assert!(!result.javascript.contains("import React"));
    }

    #[test]
    fn format_mode_keeps_specifiers() {
        let result = compiler().compile(&CompileRequest::format(
            "import x from 'lib'\nconst el = <div/>",
            "inline-0",
        ));
        assert_eq!(result.metadata.rewritten_specifiers, 0);
        assert!(result.javascript.contains("\"lib\""));
        assert!(result.javascript.contains("<div"));
    }

    #[test]
    fn only_relative_and_absolute_imports_keep_their_values() {
        let result = compiler().compile(&CompileRequest::document(
            "import a from './a.js';\nimport b from 'https://x.example/b.js';\nconsole.log(a, b);",
            "inline-0",
        ));
        assert_eq!(result.metadata.rewritten_specifiers, 0);
        assert!(result.javascript.contains("\"./a.js\""));
        assert!(result.javascript.contains("\"https://x.example/b.js\""));
    }
}
