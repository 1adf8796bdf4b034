pub mod ledger;
pub mod memory;
pub mod traits;

pub use ledger::*;
pub use memory::*;
pub use traits::*;
