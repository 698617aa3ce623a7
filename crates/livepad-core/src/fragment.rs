use crate::rewrite::rewrite_document;
use crate::template::DEFAULT_DOCUMENT;
use base64::{Engine, engine::general_purpose::STANDARD};
use livepad_compiler::Compiler;
use tracing::warn;

/// Marks a fragment that renders the document directly, with no editor.
pub const PREVIEW_MARKER: char = '~';

#[derive(Debug, thiserror::Error)]
pub enum FragmentError {
    #[error("fragment is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("fragment does not decode to UTF-8 text: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// UTF-8 text to standard base64. Reversible byte for byte with
/// [`decode_fragment`].
pub fn encode_fragment(source: &str) -> String {
    STANDARD.encode(source.as_bytes())
}

pub fn decode_fragment(fragment: &str) -> Result<String, FragmentError> {
    let bytes = STANDARD.decode(fragment.trim())?;
    Ok(String::from_utf8(bytes)?)
}

/// What a page load shows, decided from the location fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launch {
    /// Editor with this source.
    Editor(String),
    /// The rewritten document rendered as the whole page.
    Preview(String),
}

impl Launch {
    pub fn from_fragment<C: Compiler>(hash: &str, compiler: &C) -> Self {
        let hash = hash.strip_prefix('#').unwrap_or(hash);
        if let Some(encoded) = hash.strip_prefix(PREVIEW_MARKER) {
            return match decode_fragment(encoded) {
                Ok(source) => Self::Preview(rewrite_document(&source, compiler)),
                Err(err) => {
                    warn!("ignoring preview fragment: {err}");
                    Self::default_editor()
                }
            };
        }
        if hash.is_empty() {
            return Self::default_editor();
        }
        match decode_fragment(hash) {
            Ok(source) => Self::Editor(source),
            Err(err) => {
                warn!("ignoring editor fragment: {err}");
                Self::default_editor()
            }
        }
    }

    fn default_editor() -> Self {
        Self::Editor(DEFAULT_DOCUMENT.to_string())
    }
}

/// The two shareable links for one source: editable view and preview-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLinks {
    pub view: String,
    pub preview: String,
}

impl ShareLinks {
    pub fn new(base_url: &str, source: &str) -> Self {
        let base = base_url.split('#').next().unwrap_or(base_url);
        let encoded = encode_fragment(source);
        Self {
            view: format!("{base}#{encoded}"),
            preview: format!("{base}#{PREVIEW_MARKER}{encoded}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Launch, ShareLinks, decode_fragment, encode_fragment};
    use crate::template::DEFAULT_DOCUMENT;
    use livepad_compiler::{CdnOrigin, ScriptCompiler, UiLibrary};

    fn compiler() -> ScriptCompiler {
        let origin = CdnOrigin::parse("https://cdn.example").expect("origin should parse");
        ScriptCompiler::new(origin, UiLibrary::default())
    }

    #[test]
    fn codec_is_reversible_for_unicode() {
        let src = "<p>héllo 👋 ~ + / =</p>\r\n";
        assert_eq!(decode_fragment(&encode_fragment(src)).expect("decode should work"), src);
        insta::assert_snapshot!(encode_fragment("<p>hi</p>"), @"PHA+aGk8L3A+");
    }

    #[test]
    fn bad_fragments_are_errors() {
        assert!(decode_fragment("%%%").is_err());
        assert!(decode_fragment("//8=").is_err());
    }

    #[test]
    fn bare_fragment_opens_the_editor() {
        let hash = format!("#{}", encode_fragment("<b>x</b>"));
        assert_eq!(
            Launch::from_fragment(&hash, &compiler()),
            Launch::Editor("<b>x</b>".to_string())
        );
    }

    #[test]
    fn marked_fragment_renders_the_rewritten_document() {
        let src = "<script type=\"module\">import x from 'lib';</script>";
        let hash = format!("~{}", encode_fragment(src));
        match Launch::from_fragment(&hash, &compiler()) {
            Launch::Preview(html) => {
                assert!(html.contains("https://cdn.example/lib"), "{html}");
                assert!(html.contains("postMessage"), "{html}");
            }
            other => panic!("expected preview, got {other:?}"),
        }
    }

    #[test]
    fn empty_or_broken_fragment_falls_back_to_the_default() {
        let default = Launch::Editor(DEFAULT_DOCUMENT.to_string());
        assert_eq!(Launch::from_fragment("", &compiler()), default);
        assert_eq!(Launch::from_fragment("#", &compiler()), default);
        assert_eq!(Launch::from_fragment("#not base64!", &compiler()), default);
        assert_eq!(Launch::from_fragment("~???", &compiler()), default);
    }

    #[test]
    fn share_links_carry_both_modes() {
        let links = ShareLinks::new("http://127.0.0.1:4173/#old", "<p>hi</p>");
        assert_eq!(links.view, "http://127.0.0.1:4173/#PHA+aGk8L3A+");
        assert_eq!(links.preview, "http://127.0.0.1:4173/#~PHA+aGk8L3A+");
    }
}
