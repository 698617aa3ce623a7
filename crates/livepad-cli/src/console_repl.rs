use anyhow::{Context, Result};
use livepad_compiler::Compiler;
use livepad_console::{ConsoleSession, Delivery};
use livepad_engine::ExecutionContext;
use std::io::{BufRead, Write};

pub(crate) const BANNER: &str = "livepad console. Type .help for commands, .exit to quit.";
const PROMPT: &str = "livepad> ";

fn print_help(out: &mut impl Write) -> Result<()> {
    writeln!(out, "Console commands:")?;
    writeln!(out, "  .help    - show this help")?;
    writeln!(out, "  .clear   - clear the console log")?;
    writeln!(out, "  .history - list submitted commands")?;
    writeln!(out, "  .reset   - start a fresh execution context")?;
    writeln!(out, "  .exit    - quit")?;
    Ok(())
}

/// Prompt loop against one execution context at a time. `.reset` swaps in a
/// new context from `new_context`; whatever the old one still had queued is
/// routed through the session and dropped as foreign.
pub(crate) fn run_console<E, C, F>(
    mut new_context: F,
    compiler: &C,
    mut input: impl BufRead,
    out: &mut impl Write,
) -> Result<()>
where
    E: ExecutionContext,
    C: Compiler,
    F: FnMut() -> Result<E>,
{
    let mut context = new_context()?;
    let mut session = ConsoleSession::new();
    session.attach(context.id());
    let mut printed = 0;
    let mut line = String::new();

    writeln!(out, "{BANNER}")?;
    loop {
        line.clear();
        write!(out, "{PROMPT}")?;
        out.flush().context("failed flushing stdout")?;

        let bytes = input
            .read_line(&mut line)
            .context("failed reading console input")?;
        if bytes == 0 {
            break;
        }

        match line.trim() {
            "" => continue,
            ".exit" => break,
            ".help" => {
                print_help(out)?;
                continue;
            }
            ".clear" => {
                session.clear();
                printed = 0;
                writeln!(out, "console cleared")?;
                continue;
            }
            ".history" => {
                for (i, entry) in session.history().entries().iter().enumerate() {
                    writeln!(out, "{:>4}  {entry}", i + 1)?;
                }
                continue;
            }
            ".reset" => {
                let fresh = new_context()?;
                let mut stale = std::mem::replace(&mut context, fresh);
                session.attach(context.id());
                printed = 0;
                route_messages(&mut session, &mut stale);
                writeln!(out, "started {}", context.id())?;
                continue;
            }
            _ => {}
        }

        let Some(wrapped) = session.submit(&line, compiler) else {
            continue;
        };
        if let Err(err) = context.run_command(&wrapped) {
            eprintln!("error: {err:#}");
        }
        route_messages(&mut session, &mut context);

        let messages = session.log().messages();
        for message in &messages[printed.min(messages.len())..] {
            writeln!(out, "{}", message.render_line())?;
        }
        printed = messages.len();
    }

    Ok(())
}

fn route_messages<E: ExecutionContext>(session: &mut ConsoleSession, context: &mut E) {
    let source = context.id();
    let payloads = match context.drain_messages() {
        Ok(payloads) => payloads,
        Err(err) => {
            eprintln!("error: failed reading console messages: {err:#}");
            return;
        }
    };
    for payload in payloads {
        if let Delivery::Malformed(err) = session.receive(source, &payload) {
            eprintln!("[livepad] warning: ignored console payload: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BANNER, run_console};
    use anyhow::Result;
    use livepad_compiler::{CdnOrigin, ScriptCompiler, UiLibrary};
    use livepad_console::ContextId;
    use livepad_engine::{BoaContext, EvalOutput, ExecutionContext};
    use serde_json::{Value, json};
    use std::io::Cursor;

    fn compiler() -> ScriptCompiler {
        let origin = CdnOrigin::parse("https://cdn.example").expect("origin should parse");
        ScriptCompiler::new(origin, UiLibrary::default())
    }

    fn transcript<E, F>(new_context: F, input: &str) -> String
    where
        E: ExecutionContext,
        F: FnMut() -> Result<E>,
    {
        let mut out = Vec::new();
        run_console(new_context, &compiler(), Cursor::new(input.to_string()), &mut out)
            .expect("console should run");
        String::from_utf8(out).expect("output should be utf8")
    }

    /// Answers every command with its wrapped length, then a payload that is
    /// not a console record.
    struct EchoContext {
        id: ContextId,
        queued: Vec<Value>,
    }

    impl EchoContext {
        fn new() -> Self {
            Self {
                id: ContextId::fresh(),
                queued: Vec::new(),
            }
        }
    }

    impl ExecutionContext for EchoContext {
        fn id(&self) -> ContextId {
            self.id
        }

        fn eval_script(&mut self, _source: &str, _source_name: &str) -> Result<EvalOutput> {
            Ok(EvalOutput { value: None })
        }

        fn run_command(&mut self, wrapped: &str) -> Result<()> {
            self.queued
                .push(json!([{ "method": "log", "data": [wrapped.len()] }]));
            self.queued.push(json!("not a record"));
            Ok(())
        }

        fn drain_messages(&mut self) -> Result<Vec<Value>> {
            Ok(std::mem::take(&mut self.queued))
        }
    }

    #[test]
    fn evaluates_commands_in_a_boa_context() {
        let out = transcript(
            BoaContext::new,
            "1 + 2\nglobalThis.n = 5\nn * 2\n.history\n.exit\n",
        );
        assert!(out.starts_with(BANNER));
        assert!(out.contains("> 1 + 2\n3\n"), "{out}");
        assert!(out.contains("> n * 2\n10\n"), "{out}");
        assert!(out.contains("   1  1 + 2\n"), "{out}");
        assert!(out.contains("   3  n * 2\n"), "{out}");
    }

    #[test]
    fn clear_restarts_the_visible_log() {
        let out = transcript(BoaContext::new, "'a'\n.clear\n'b'\n");
        assert!(out.contains("console cleared"));
        let after_clear = out.split("console cleared").nth(1).expect("clear output");
        assert!(!after_clear.contains("> 'a'"), "{out}");
        assert!(after_clear.contains("> 'b'\nb\n"), "{out}");
    }

    #[test]
    fn malformed_payloads_are_skipped_and_reset_swaps_context() {
        let out = transcript(|| Ok(EchoContext::new()), "x\n.reset\ny\n");
        let log_lines = out
            .lines()
            .filter(|l| !l.is_empty() && l.chars().all(|c| c.is_ascii_digit()))
            .count();
        assert_eq!(log_lines, 2, "{out}");
        assert!(out.contains("started ctx-"), "{out}");
    }
}
