//! Application window MCP tools.
//!
//! Stand-ins for open browser tabs: open a window, then read what the
//! worker posted to it.

pub mod messages;
pub mod open;

pub use messages::{ClientMessagesParams, messages_impl};
pub use open::{ClientOpenParams, open_impl};
