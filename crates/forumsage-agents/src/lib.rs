//! forumsage-agents
//!
//! Specialist responders: the shared context handed to every role, the HTTP
//! collaborator that reaches the remote specialists, and the pool that fans
//! a question out to all of them at once.

pub mod client;
pub mod context;
pub mod pool;

pub use client::{RemoteResponder, SpecialistClient};
pub use context::build_context;
pub use pool::ResponderPool;
