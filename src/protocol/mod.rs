//! Text protocol handling.
//!
//! The command parser for the engine main loop and the action notation used
//! by `bestactions` and `play`.

pub mod notation;
pub mod parser;

pub use notation::{format_actions, parse_action, parse_actions, NotationError};
pub use parser::{parse_command, Command, GoParams};
