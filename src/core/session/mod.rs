// Session module - Line-oriented device session
pub mod operator;
pub mod session;
pub mod state;

pub use operator::Operator;
pub use session::{Session, SessionOutcome};
pub use state::{SessionState, SessionStatistics, SessionStatus};
