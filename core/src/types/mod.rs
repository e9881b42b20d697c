pub mod id;

pub use id::{BreakId, SessionId, UserId};
