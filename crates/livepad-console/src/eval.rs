use livepad_compiler::{CompileRequest, Compiler};
use serde_json::Value;

pub const DATA_MODULE_PREFIX: &str = "data:text/javascript,";

/// Turns a console command into a loader snippet for the execution context.
///
/// The command gets bare-import rewriting, is escaped as a JSON string and
/// evaluated by `console.log(eval(...))` inside a `data:` module, so it runs
/// against the page globals and its result is logged through the hooked
/// console. Load or evaluation errors go to `console.error`.
pub fn wrap_command<C: Compiler>(command: &str, compiler: &C) -> String {
    let rewritten = compiler.compile(&CompileRequest::command(command)).javascript;
    let escaped = Value::String(rewritten).to_string();
    let module = format!("console.log(eval({escaped}))");
    // `'` survives encodeURIComponent but would end the quoted import URL.
    let url_body = encode_uri_component(&module).replace('\'', "%27");
    format!("import('{DATA_MODULE_PREFIX}{url_body}').catch(console.error)")
}

/// Percent-encodes everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )`, byte by
/// byte over UTF-8.
pub fn encode_uri_component(input: &str) -> String {
    let mut out = String::with_capacity(input.len() * 3);
    for byte in input.bytes() {
        if byte.is_ascii_alphanumeric()
            || matches!(byte, b'-' | b'_' | b'.' | b'!' | b'~' | b'*' | b'\'' | b'(' | b')')
        {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

/// Inverse of [`encode_uri_component`]. Malformed escapes are kept verbatim.
pub fn decode_uri_component(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(byte: u8) -> Option<u8> {
    (byte as char).to_digit(16).map(|d| d as u8)
}

#[cfg(test)]
mod tests {
    use super::{decode_uri_component, encode_uri_component, wrap_command};
    use livepad_compiler::{CdnOrigin, ScriptCompiler, UiLibrary};

    fn compiler() -> ScriptCompiler {
        let origin = CdnOrigin::parse("https://cdn.example").expect("origin should parse");
        ScriptCompiler::new(origin, UiLibrary::default())
    }

    #[test]
    fn encodes_like_encode_uri_component() {
        insta::assert_snapshot!(
            encode_uri_component("console.log(\"a b\");\n'é'"),
            @"console.log(%22a%20b%22)%3B%0A'%C3%A9'"
        );
        assert_eq!(encode_uri_component("-_.!~*'()"), "-_.!~*'()");
    }

    #[test]
    fn decoding_inverts_encoding() {
        let src = "import x from \"https://cdn.example/lib\";\n// ünïcode %41";
        assert_eq!(decode_uri_component(&encode_uri_component(src)), src);
        assert_eq!(decode_uri_component("%zz%4"), "%zz%4");
    }

    #[test]
    fn wraps_command_in_data_module_loader() {
        let wrapped = wrap_command("1 + 1", &compiler());
        assert!(wrapped.starts_with("import('data:text/javascript,"), "{wrapped}");
        assert!(wrapped.ends_with("').catch(console.error)"), "{wrapped}");

        let body = wrapped
            .trim_start_matches("import('data:text/javascript,")
            .trim_end_matches("').catch(console.error)");
        let module = decode_uri_component(body);
        assert!(module.starts_with("console.log(eval(\""), "{module}");
        assert!(module.contains("1 + 1"), "{module}");
    }

    #[test]
    fn command_imports_are_rewritten() {
        let wrapped = wrap_command("import('lodash')", &compiler());
        let module = decode_uri_component(&wrapped);
        assert!(module.contains("https://cdn.example/lodash"), "{module}");
    }

    #[test]
    fn single_quotes_cannot_break_the_loader() {
        let wrapped = wrap_command("'it' + \"'s\"", &compiler());
        let inner = wrapped
            .trim_start_matches("import('")
            .trim_end_matches("').catch(console.error)");
        assert!(!inner.contains('\''), "{wrapped}");
    }

    #[test]
    fn malformed_command_is_wrapped_verbatim() {
        let wrapped = wrap_command("foo(", &compiler());
        let module = decode_uri_component(&wrapped);
        assert!(module.contains(r#"eval("foo(")"#), "{module}");
    }
}
