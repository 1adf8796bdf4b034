//! Seams to the systems the core does not own: the code host that receives reviewer
//! requests, and the optional ranker that re-sequences candidates.

pub mod memory;
pub mod types;

pub use memory::*;
pub use types::*;
