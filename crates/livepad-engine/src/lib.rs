//! A Boa-backed execution context for the console bridge. The context carries
//! the same console hook the rewritten documents get, and everything it posts
//! to its parent is queued until the host drains it.

use anyhow::{Context as _, Result, anyhow};
use boa_engine::{
    Context, JsError, JsResult, JsString, JsValue, Source,
    context::ContextBuilder,
    js_string,
    module::{Module, ModuleLoader, Referrer},
};
use livepad_console::{BOOTSTRAP_SCRIPT, ContextId, DATA_MODULE_PREFIX, decode_uri_component};
use serde_json::{Value, json};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::debug;

/// Browser-ish globals the bootstrap expects. `parent.postMessage` queues into
/// the outbox instead of crossing a frame boundary.
const PRELUDE: &str = r#"
globalThis.window = globalThis;
globalThis.console = globalThis.console || {};
globalThis.__livepad_outbox = [];
globalThis.parent = {
  postMessage: function (message) { globalThis.__livepad_outbox.push(message); }
};
"#;

const DRAIN_OUTBOX: &str = "JSON.stringify(globalThis.__livepad_outbox.splice(0))";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalOutput {
    pub value: Option<String>,
}

pub trait ExecutionContext {
    /// Identity the host compares message sources against.
    fn id(&self) -> ContextId;
    fn eval_script(&mut self, source: &str, source_name: &str) -> Result<EvalOutput>;
    /// Runs a loader snippet produced by the eval wrapper. A synchronous throw
    /// is queued as a direct `{method: "error"}` record rather than returned.
    fn run_command(&mut self, wrapped: &str) -> Result<()>;
    /// Payloads posted since the last drain, in post order.
    fn drain_messages(&mut self) -> Result<Vec<Value>>;
}

/// Resolves `data:text/javascript,` URLs only. Anything else is a load error
/// the calling `import()` sees as a rejection.
#[derive(Debug, Default)]
pub struct DataUrlModuleLoader;

impl DataUrlModuleLoader {
    fn module_source(specifier: &str) -> Option<String> {
        specifier
            .strip_prefix(DATA_MODULE_PREFIX)
            .map(decode_uri_component)
    }
}

impl ModuleLoader for DataUrlModuleLoader {
    fn load_imported_module(
        self: Rc<Self>,
        _referrer: Referrer,
        specifier: JsString,
        context: &RefCell<&mut Context>,
    ) -> impl std::future::Future<Output = JsResult<Module>> {
        let specifier = specifier.to_std_string_escaped();

        async move {
            let Some(code) = Self::module_source(&specifier) else {
                return Err(JsError::from_opaque(JsValue::from(js_string!(format!(
                    "cannot load module `{specifier}`: only {DATA_MODULE_PREFIX} URLs are available"
                )))));
            };
            let mut ctx = context.borrow_mut();
            Module::parse(Source::from_bytes(code.as_bytes()), None, &mut *ctx)
        }
    }
}

pub struct BoaContext {
    id: ContextId,
    ctx: Context,
    /// Records produced on the host side, ahead of whatever is still queued
    /// in the JS outbox.
    pending: Vec<Value>,
}

impl BoaContext {
    pub fn new() -> Result<Self> {
        let ctx = ContextBuilder::default()
            .module_loader(Rc::new(DataUrlModuleLoader))
            .build()
            .map_err(|err| anyhow!("failed building execution context: {err}"))?;
        let mut context = Self {
            id: ContextId::fresh(),
            ctx,
            pending: Vec::new(),
        };
        context
            .eval_script(PRELUDE, "<prelude>")
            .context("failed installing prelude")?;
        context
            .eval_script(BOOTSTRAP_SCRIPT, "<bootstrap>")
            .context("failed installing console hook")?;
        debug!(context = %context.id, "execution context ready");
        Ok(context)
    }

    fn run_jobs(&mut self) -> Result<()> {
        self.ctx
            .run_jobs()
            .map_err(|err| anyhow!("failed running queued jobs: {err}"))
    }

    fn take_outbox(&mut self) -> Result<Vec<Value>> {
        let raw = self
            .ctx
            .eval(Source::from_bytes(DRAIN_OUTBOX))
            .map_err(|err| anyhow!("failed reading outbox: {err}"))?
            .to_string(&mut self.ctx)
            .map_err(|err| anyhow!("failed reading outbox: {err}"))?
            .to_std_string_escaped();
        serde_json::from_str(&raw).context("outbox is not valid JSON")
    }
}

impl ExecutionContext for BoaContext {
    fn id(&self) -> ContextId {
        self.id
    }

    fn eval_script(&mut self, source: &str, source_name: &str) -> Result<EvalOutput> {
        let result = self
            .ctx
            .eval(Source::from_bytes(source))
            .map_err(|err| anyhow!("failed evaluating {source_name}: {err}"))?;
        self.run_jobs()?;

        if result.is_undefined() {
            return Ok(EvalOutput { value: None });
        }
        let rendered = result
            .to_string(&mut self.ctx)
            .map_err(|err| anyhow!("failed converting JS value to string: {err}"))?
            .to_std_string_escaped();
        Ok(EvalOutput {
            value: Some(rendered),
        })
    }

    fn run_command(&mut self, wrapped: &str) -> Result<()> {
        if let Err(err) = self.ctx.eval(Source::from_bytes(wrapped)) {
            // Keep whatever the command logged before it threw ahead of the
            // error record.
            let earlier = self.take_outbox()?;
            self.pending.extend(earlier);
            self.pending.push(json!({
                "method": "error",
                "data": [err.to_string()],
            }));
        }
        self.run_jobs()
    }

    fn drain_messages(&mut self) -> Result<Vec<Value>> {
        let mut messages = std::mem::take(&mut self.pending);
        messages.extend(self.take_outbox()?);
        Ok(messages)
    }
}
