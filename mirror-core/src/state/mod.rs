pub mod receiver;
pub mod session;

pub use receiver::{ReceiverStatus, SessionId};
pub use session::SessionPhase;
