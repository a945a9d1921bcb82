//! Actor implementations

mod attempt;
pub mod session;

pub use session::{SessionActor, SessionActorArgs};
