use crate::eval::wrap_command;
use crate::history::CommandHistory;
use crate::message::{ConsoleMessage, DecodeError};
use livepad_compiler::Compiler;
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Identity of one execution context. Every spawned context gets a fresh id,
/// so a torn-down context can never be mistaken for its replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    pub fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx-{}", self.0)
    }
}

/// The host's listener for exactly one execution context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    owner: ContextId,
}

impl Subscription {
    pub fn new(owner: ContextId) -> Self {
        Self { owner }
    }

    pub fn owner(&self) -> ContextId {
        self.owner
    }

    pub fn accepts(&self, source: ContextId) -> bool {
        self.owner == source
    }
}

/// Messages of one run, in arrival order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsoleLog {
    messages: Vec<ConsoleMessage>,
}

impl ConsoleLog {
    pub fn push(&mut self, message: ConsoleMessage) {
        self.messages.push(message);
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn messages(&self) -> &[ConsoleMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Appended,
    /// From a context this session does not own; dropped.
    Foreign,
    Malformed(DecodeError),
}

/// Host-side console state: the current subscription, the ordered log and the
/// prompt history.
#[derive(Debug, Default)]
pub struct ConsoleSession {
    subscription: Option<Subscription>,
    log: ConsoleLog,
    history: CommandHistory,
}

impl ConsoleSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new run: the previous subscription is dropped and the log is
    /// cleared. History is kept.
    pub fn attach(&mut self, context: ContextId) {
        debug!(%context, "console attached");
        self.subscription = Some(Subscription::new(context));
        self.log.clear();
    }

    pub fn detach(&mut self) {
        self.subscription = None;
    }

    pub fn subscription(&self) -> Option<&Subscription> {
        self.subscription.as_ref()
    }

    pub fn receive(&mut self, source: ContextId, payload: &Value) -> Delivery {
        let owned = self
            .subscription
            .as_ref()
            .is_some_and(|sub| sub.accepts(source));
        if !owned {
            debug!(%source, "dropping message from foreign context");
            return Delivery::Foreign;
        }
        match ConsoleMessage::decode(payload) {
            Ok(message) => {
                self.log.push(message);
                Delivery::Appended
            }
            Err(err) => Delivery::Malformed(err),
        }
    }

    /// Records a prompt line and returns the loader snippet to evaluate in the
    /// context, or `None` for a blank line.
    pub fn submit<C: Compiler>(&mut self, line: &str, compiler: &C) -> Option<String> {
        let command = line.trim();
        if command.is_empty() {
            return None;
        }
        self.history.push(command);
        self.log.push(ConsoleMessage::command(command));
        Some(wrap_command(command, compiler))
    }

    pub fn clear(&mut self) {
        self.log.clear();
    }

    pub fn log(&self) -> &ConsoleLog {
        &self.log
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut CommandHistory {
        &mut self.history
    }
}
