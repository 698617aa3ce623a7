use std::ffi::OsString;

const BUILTIN_COMMANDS: &[&str] = &[
    "rewrite", "export", "fmt", "share", "open", "serve", "console", "help",
];

/// `livepad page.html` is shorthand for `livepad rewrite page.html`.
pub(crate) fn normalize_cli_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut normalized: Vec<OsString> = args.into_iter().collect();
    if normalized.len() < 2 {
        return normalized;
    }

    let first = normalized[1].to_string_lossy();
    let is_builtin = BUILTIN_COMMANDS.contains(&first.as_ref());
    let is_flag = first.starts_with('-');

    if !is_builtin && !is_flag {
        normalized.insert(1, OsString::from("rewrite"));
    }

    normalized
}
