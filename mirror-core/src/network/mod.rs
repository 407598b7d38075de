pub mod acceptor;
pub mod session;

pub use acceptor::Acceptor;
pub use session::{SessionEnd, SessionShared, run_session};
