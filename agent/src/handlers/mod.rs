pub mod breaks;
pub mod session;
pub mod status;
