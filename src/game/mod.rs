//! Defense session simulation

pub mod engagement;
pub mod missile;
pub mod runner;
pub mod session;
pub mod view;

pub use runner::{RunnerError, SessionHandle, SessionRunner};
pub use session::{Outcome, Session};
pub use view::SessionView;
