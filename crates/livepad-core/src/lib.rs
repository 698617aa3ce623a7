pub mod fragment;
pub mod html;
pub mod rewrite;
pub mod template;

pub use fragment::{
    FragmentError, Launch, PREVIEW_MARKER, ShareLinks, decode_fragment, encode_fragment,
};
pub use rewrite::{
    RewriteReport, ScriptKind, ScriptOutcome, ScriptReport, format_document, rewrite_document,
    rewrite_document_with_report,
};
pub use template::DEFAULT_DOCUMENT;

use anyhow::{Context, Result};
use livepad_compiler::Compiler;
use std::fs;
use std::path::{Path, PathBuf};

/// File name of a downloaded / exported document.
pub const EXPORT_FILE_NAME: &str = "index.html";
pub const EXPORT_MIME: &str = "text/html";

pub fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed reading document {}", path.display()))
}

pub fn rewrite_file<C: Compiler>(compiler: &C, path: &Path) -> Result<RewriteReport> {
    let source = read_source(path)?;
    Ok(rewrite_document_with_report(&source, compiler))
}

/// Writes the rewritten document to `<out_dir>/index.html`, creating the
/// directory when needed.
pub fn export_document<C: Compiler>(
    compiler: &C,
    source: &str,
    out_dir: &Path,
) -> Result<(PathBuf, RewriteReport)> {
    let report = rewrite_document_with_report(source, compiler);
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed creating output dir {}", out_dir.display()))?;
    let target = out_dir.join(EXPORT_FILE_NAME);
    fs::write(&target, &report.html)
        .with_context(|| format!("failed writing {}", target.display()))?;
    Ok((target, report))
}
