//! Host side of the console bridge: message schema, per-context filtering,
//! ordered log, prompt history and the command eval wrapper.

pub mod bootstrap;
pub mod eval;
pub mod history;
pub mod message;
pub mod session;

pub use bootstrap::BOOTSTRAP_SCRIPT;
pub use eval::{DATA_MODULE_PREFIX, decode_uri_component, encode_uri_component, wrap_command};
pub use history::CommandHistory;
pub use message::{ConsoleMessage, DecodeError, render_value};
pub use session::{ConsoleLog, ConsoleSession, ContextId, Delivery, Subscription};
