use crate::html::{Document, Element, Node};
use livepad_compiler::{CompileRequest, CompileResult, Compiler, RewriteError};
use livepad_console::BOOTSTRAP_SCRIPT;
use tracing::debug;

/// How a `<script>` is treated, decided from its `type` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptKind {
    Module,
    Classic,
    /// JSX / TypeScript authoring types browsers do not run themselves.
    Authoring(String),
    Other(String),
}

impl ScriptKind {
    pub fn from_type_attr(type_attr: Option<&str>) -> Self {
        let Some(raw) = type_attr.map(str::trim).filter(|t| !t.is_empty()) else {
            return Self::Classic;
        };
        let lowered = raw.to_ascii_lowercase();
        match lowered.as_str() {
            "module" => Self::Module,
            "text/javascript"
            | "application/javascript"
            | "text/ecmascript"
            | "application/ecmascript"
            | "application/x-javascript"
            | "text/x-javascript"
            | "text/jscript"
            | "text/livescript" => Self::Classic,
            "text/babel" | "text/jsx" | "text/typescript" | "text/tsx" => {
                Self::Authoring(lowered)
            }
            _ => Self::Other(raw.to_string()),
        }
    }

    pub fn is_rewritable(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptOutcome {
    Rewritten {
        injected_ui_import: bool,
        rewritten_specifiers: usize,
    },
    /// The pipeline failed and the body was left as written.
    Kept(RewriteError),
    /// Empty body or a non-script type.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptReport {
    pub index: usize,
    pub kind: ScriptKind,
    pub outcome: ScriptOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteReport {
    pub html: String,
    pub scripts: Vec<ScriptReport>,
}

impl RewriteReport {
    pub fn failed(&self) -> impl Iterator<Item = &ScriptReport> {
        self.scripts
            .iter()
            .filter(|s| matches!(s.outcome, ScriptOutcome::Kept(_)))
    }
}

/// Rewrites every inline script, prepends the console bootstrap to the head
/// and prints a complete document. Never fails: a script that cannot be
/// processed keeps its original body.
pub fn rewrite_document<C: Compiler>(html: &str, compiler: &C) -> String {
    rewrite_document_with_report(html, compiler).html
}

pub fn rewrite_document_with_report<C: Compiler>(html: &str, compiler: &C) -> RewriteReport {
    let mut doc = Document::parse(html);
    let scripts = process_scripts(&mut doc, Promotion::ToModule, |body, index| {
        compiler.compile(&CompileRequest::document(body, format!("inline-{index}")))
    });

    let mut bootstrap = Element::new("script");
    bootstrap.set_text(BOOTSTRAP_SCRIPT);
    doc.prepend_to_head(Node::Element(bootstrap));

    debug!(scripts = scripts.len(), "document rewritten");
    RewriteReport {
        html: doc.to_html(),
        scripts,
    }
}

/// Re-prints every inline script through the parser and printer. No import
/// rewriting, no lowering, no bootstrap, and every `type` stays as written.
pub fn format_document<C: Compiler>(html: &str, compiler: &C) -> String {
    let mut doc = Document::parse(html);
    process_scripts(&mut doc, Promotion::KeepType, |body, index| {
        compiler.compile(&CompileRequest::format(body, format!("inline-{index}")))
    });
    doc.to_html()
}

/// Whether a rewritten script may change its `type` to `module`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Promotion {
    ToModule,
    KeepType,
}

impl Promotion {
    /// Lowered authoring scripts are plain JavaScript modules; a classic script
    /// that gained a library import can only run as a module.
    fn applies(self, kind: &ScriptKind, injected_ui_import: bool) -> bool {
        self == Self::ToModule
            && match kind {
                ScriptKind::Authoring(_) => true,
                ScriptKind::Classic => injected_ui_import,
                ScriptKind::Module | ScriptKind::Other(_) => false,
            }
    }
}

fn process_scripts(
    doc: &mut Document,
    promotion: Promotion,
    mut compile: impl FnMut(&str, usize) -> CompileResult,
) -> Vec<ScriptReport> {
    let mut reports = Vec::new();
    doc.html.for_each_element_mut("script", &mut |script: &mut Element| {
        let index = reports.len();
        let kind = ScriptKind::from_type_attr(script.attr("type"));
        let body = script.text();
        if body.is_empty() || !kind.is_rewritable() {
            reports.push(ScriptReport {
                index,
                kind,
                outcome: ScriptOutcome::Skipped,
            });
            return;
        }

        let result = compile(&body, index);
        let outcome = match result.metadata.fallback {
            Some(err) => ScriptOutcome::Kept(err),
            None => {
                script.set_text(escape_script_close(&result.javascript));
                if promotion.applies(&kind, result.metadata.injected_ui_import) {
                    script.set_attr("type", "module");
                }
                ScriptOutcome::Rewritten {
                    injected_ui_import: result.metadata.injected_ui_import,
                    rewritten_specifiers: result.metadata.rewritten_specifiers,
                }
            }
        };
        reports.push(ScriptReport {
            index,
            kind,
            outcome,
        });
    });
    reports
}

/// A printed script must not contain `</script`, or the HTML parser would end
/// the element early.
fn escape_script_close(js: &str) -> String {
    let lower = js.to_ascii_lowercase();
    if !lower.contains("</script") {
        return js.to_string();
    }
    let mut out = String::with_capacity(js.len() + 8);
    let mut last = 0;
    for (pos, _) in lower.match_indices("</script") {
        out.push_str(&js[last..pos]);
        out.push_str("<\\/");
        last = pos + 2;
    }
    out.push_str(&js[last..]);
    out
}
