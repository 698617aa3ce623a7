use livepad_compiler::{
    CdnOrigin, CompileMetadata, CompileRequest, CompileResult, Compiler, RewriteError,
    ScriptCompiler, UiLibrary,
};
use livepad_console::BOOTSTRAP_SCRIPT;
use livepad_core::{
    EXPORT_FILE_NAME, ScriptOutcome, export_document, format_document, rewrite_document,
    rewrite_document_with_report, rewrite_file,
};
use std::cell::RefCell;
use std::fs;
use tempfile::tempdir;

/// Upper-cases every script, fails on any body containing `fail`.
#[derive(Default)]
struct MockCompiler {
    seen: RefCell<Vec<String>>,
}

impl Compiler for MockCompiler {
    fn compile(&self, req: &CompileRequest<'_>) -> CompileResult {
        self.seen.borrow_mut().push(req.source_id.clone());
        if req.source_text.contains("fail") {
            return CompileResult {
                javascript: req.source_text.to_string(),
                metadata: CompileMetadata {
                    fallback: Some(RewriteError::Parse("mock".to_string())),
                    ..CompileMetadata::default()
                },
            };
        }
        CompileResult {
            javascript: req.source_text.to_uppercase(),
            metadata: CompileMetadata::default(),
        }
    }
}

fn real_compiler() -> ScriptCompiler {
    let origin = CdnOrigin::parse("https://cdn.example/").expect("origin should parse");
    ScriptCompiler::new(origin, UiLibrary::default())
}

fn bootstrap_count(html: &str) -> usize {
    html.matches(BOOTSTRAP_SCRIPT).count()
}

#[test]
fn bootstrap_is_injected_once_for_any_script_count() {
    let compiler = MockCompiler::default();
    let shapes: [fn(&str) -> String; 5] = [
        |scripts| format!("<html><head></head><body>{scripts}</body></html>"),
        |scripts| format!("{scripts}<p>fragment</p>"),
        |scripts| format!("{scripts}<head></head><body></body>"),
        |scripts| format!("<html>\n{scripts}<head><title>t</title></head><body></body></html>"),
        |scripts| format!("{scripts}<html><head></head><body></body></html>"),
    ];
    for shape in shapes {
        for count in 0..4 {
            let scripts: String = (0..count)
                .map(|i| format!("<script>run{i}()</script>"))
                .collect();
            let source = shape(&scripts);
            let html = rewrite_document(&source, &compiler);

            assert_eq!(bootstrap_count(&html), 1, "{html}");
            let bootstrap_at = html.find(BOOTSTRAP_SCRIPT).expect("bootstrap should exist");
            for i in 0..count {
                let at = html.find(&format!("RUN{i}()")).expect("script should exist");
                assert!(bootstrap_at < at, "bootstrap after script {i} for {source}");
            }
        }
    }
}

#[test]
fn bootstrap_is_the_first_head_child() {
    let html = rewrite_document(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><script src=\"x.js\"></script></head><body></body></html>",
        &MockCompiler::default(),
    );
    let expected_start = format!("<!DOCTYPE html>\n<html><head><script>{BOOTSTRAP_SCRIPT}</script><meta");
    assert!(html.starts_with(&expected_start), "{html}");
}

#[test]
fn one_failing_script_does_not_stop_the_rest() {
    let compiler = MockCompiler::default();
    let report = rewrite_document_with_report(
        "<script>a()</script><script>fail(</script><script>c()</script>",
        &compiler,
    );
    assert!(report.html.contains("<script>A()</script>"));
    assert!(report.html.contains("<script>fail(</script>"));
    assert!(report.html.contains("<script>C()</script>"));
    assert_eq!(report.failed().count(), 1);
    assert_eq!(
        *compiler.seen.borrow(),
        ["inline-0", "inline-1", "inline-2"]
    );
}

#[test]
fn empty_and_foreign_scripts_are_skipped() {
    let compiler = MockCompiler::default();
    let report = rewrite_document_with_report(
        r#"<script src="a.js"></script><script type="importmap">{"imports":{}}</script><script>go()</script>"#,
        &compiler,
    );
    let outcomes: Vec<_> = report.scripts.iter().map(|s| s.outcome.clone()).collect();
    assert_eq!(outcomes[0], ScriptOutcome::Skipped);
    assert_eq!(outcomes[1], ScriptOutcome::Skipped);
    assert!(matches!(outcomes[2], ScriptOutcome::Rewritten { .. }));
    assert!(report.html.contains(r#"<script type="importmap">{"imports":{}}</script>"#));
    assert_eq!(compiler.seen.borrow().len(), 1);
}

#[test]
fn document_scripts_resolve_bare_imports() {
    let html = rewrite_document(
        r#"<!DOCTYPE html>
<html lang="en">
<head><title>Demo</title></head>
<body>
  <button onclick="showConfetti()">Click me!</button>
</body>
<script type="module">
  import confetti from "canvas-confetti";
  import helper from "./helper.js";
  globalThis.showConfetti = () => { confetti(); helper(); };
</script>
</html>"#,
        &real_compiler(),
    );
    assert!(html.starts_with("<!DOCTYPE html>\n<html lang=\"en\">"), "{html}");
    assert!(html.contains("\"https://cdn.example/canvas-confetti\""), "{html}");
    assert!(html.contains("\"./helper.js\""), "{html}");
    assert!(html.contains("<button onclick=\"showConfetti()\">Click me!</button>"));
}

#[test]
fn jsx_scripts_get_the_library_import_and_are_lowered() {
    let html = rewrite_document(
        r#"<div id="root"></div>
<script type="text/babel">
  import { createRoot } from "react-dom@19/client";
  const App = (props: { name: string }) => <h1>Hello {props.name}</h1>;
  createRoot(document.getElementById("root")).render(<App name="x" />);
</script>"#,
        &real_compiler(),
    );
    assert!(html.contains("<script type=\"module\">"), "{html}");
    assert!(html.contains("import React from \"https://cdn.example/react\""), "{html}");
    assert!(html.contains("https://cdn.example/react-dom@19/client"), "{html}");
    assert!(html.contains("React.createElement(App"), "{html}");
    assert!(!html.contains("name: string"), "{html}");
}

#[test]
fn classic_script_with_injected_import_becomes_a_module() {
    let html = rewrite_document(
        "<script>const el = <div />;</script><script>plain()</script>",
        &real_compiler(),
    );
    assert!(
        html.contains("<script type=\"module\">import React from \"https://cdn.example/react\""),
        "{html}"
    );
    assert!(html.contains("<script>plain();"), "{html}");
}

#[test]
fn malformed_script_survives_byte_for_byte() {
    let broken = "\n  const x = {;\n  console.log(x\n";
    let html = rewrite_document(&format!("<script>{broken}</script>"), &real_compiler());
    assert!(html.contains(&format!("<script>{broken}</script>")), "{html}");
}

#[test]
fn rewriting_is_independent_per_call() {
    let compiler = real_compiler();
    let a = rewrite_document("<script>import a from 'a';</script>", &compiler);
    let b = rewrite_document("<script>import b from 'b';</script>", &compiler);
    let a_again = rewrite_document("<script>import a from 'a';</script>", &compiler);
    assert_eq!(a, a_again);
    assert!(!b.contains("cdn.example/a\""));
}

#[test]
fn formatting_reprints_without_rewriting() {
    let html = format_document(
        "<script type=\"module\">import x from 'lib'\nx( 1,2 )</script>",
        &real_compiler(),
    );
    assert!(html.contains("import x from \"lib\";"), "{html}");
    assert!(html.contains("x(1, 2);"), "{html}");
    assert_eq!(bootstrap_count(&html), 0);
}

#[test]
fn formatting_keeps_authoring_types() {
    let html = format_document(
        "<script type=\"text/babel\">const el = <div/>;</script><script type=\"text/tsx\">let n: number = 1</script>",
        &real_compiler(),
    );
    assert!(html.contains("<script type=\"text/babel\">const el = <div />;"), "{html}");
    assert!(html.contains("<script type=\"text/tsx\">let n: number = 1;"), "{html}");
    assert!(!html.contains("type=\"module\""), "{html}");
}

#[test]
fn export_writes_index_html() {
    let dir = tempdir().expect("tempdir should work");
    let out_dir = dir.path().join("dist");
    let (path, report) =
        export_document(&MockCompiler::default(), "<script>x()</script>", &out_dir)
            .expect("export should work");

    assert_eq!(path, out_dir.join(EXPORT_FILE_NAME));
    let written = fs::read_to_string(&path).expect("read should work");
    assert_eq!(written, report.html);
    assert!(written.contains("<script>X()</script>"));
}

#[test]
fn rewrite_file_reports_missing_files() {
    let dir = tempdir().expect("tempdir should work");
    let err = rewrite_file(&MockCompiler::default(), &dir.path().join("missing.html"))
        .expect_err("read should fail");
    assert!(format!("{err:#}").contains("failed reading document"));
}
