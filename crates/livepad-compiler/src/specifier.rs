use std::fmt;
use url::Url;

pub const NPM_PREFIX: &str = "npm:";
pub const DEFAULT_CDN_ORIGIN: &str = "https://esm.sh";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecifierClass {
    Relative,
    AbsoluteUrl,
    Bare,
}

/// Classifies a module specifier. Total over all strings.
///
/// `npm:` would parse as a URL with an `npm` scheme, so it is checked first and
/// always reported as bare; the prefix is handled by [`CdnOrigin::resolve`].
pub fn classify(specifier: &str) -> SpecifierClass {
    if specifier.starts_with(NPM_PREFIX) {
        return SpecifierClass::Bare;
    }
    if specifier.trim_start_matches('.').starts_with('/') {
        return SpecifierClass::Relative;
    }
    if Url::parse(specifier).is_ok() {
        return SpecifierClass::AbsoluteUrl;
    }
    SpecifierClass::Bare
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid CDN origin `{input}`: {reason}")]
pub struct InvalidOrigin {
    pub input: String,
    pub reason: String,
}

/// Base URL that bare specifiers are joined onto. The path always ends with a
/// single `/`, so an origin with or without a trailing slash resolves the same
/// way and an origin with a path behaves like a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdnOrigin {
    base: Url,
}

impl CdnOrigin {
    pub fn parse(input: &str) -> Result<Self, InvalidOrigin> {
        let mut base = Url::parse(input.trim()).map_err(|err| InvalidOrigin {
            input: input.to_string(),
            reason: err.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(InvalidOrigin {
                input: input.to_string(),
                reason: "URL cannot be used as a base".to_string(),
            });
        }
        let path = format!("{}/", base.path().trim_end_matches('/'));
        base.set_path(&path);
        base.set_query(None);
        base.set_fragment(None);
        Ok(Self { base })
    }

    pub fn as_str(&self) -> &str {
        self.base.as_str()
    }

    /// Returns the rewritten specifier, or `None` when it must stay as written.
    pub fn resolve(&self, specifier: &str) -> Option<String> {
        if let Some(rest) = specifier.strip_prefix(NPM_PREFIX) {
            return Some(self.join(rest.trim_start_matches('/')));
        }
        match classify(specifier) {
            SpecifierClass::Bare => Some(self.join(specifier)),
            SpecifierClass::Relative | SpecifierClass::AbsoluteUrl => None,
        }
    }

    fn join(&self, relative: &str) -> String {
        match self.base.join(relative) {
            Ok(url) => url.to_string(),
            Err(_) => format!("{}{}", self.base, relative),
        }
    }
}

impl fmt::Display for CdnOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.base.as_str())
    }
}
