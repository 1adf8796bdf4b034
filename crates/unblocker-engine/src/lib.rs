//! Orchestration around the pure decision core: configuration, the engine that owns the
//! plan store, execution against a review host, and fixture scenarios.

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod executor;
pub mod scenario;
pub mod util;

pub use config::*;
pub use context::*;
pub use engine::*;
pub use error::*;
pub use util::*;
