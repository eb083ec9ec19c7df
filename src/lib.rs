//! SerTerm Library
//!
//! Line-oriented terminal for serial lines and TCP sockets: sends commands,
//! renders and logs responses, in one-shot, interactive or monitor sessions.

pub mod cli;
pub mod core;
pub mod domain;
pub mod infrastructure;

pub use crate::core::format::ByteFormatter;
pub use crate::core::session::{Operator, Session, SessionOutcome, SessionStatus};
pub use crate::domain::config::{SerTermConfig, SessionConfig};
pub use crate::domain::error::{SerTermError, SerTermResult};
