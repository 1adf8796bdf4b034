//! Functional core of the reviewer unblocker: stall detection, the candidate ladder,
//! confidence classification and the policy gate. Nothing in here performs IO; the
//! engine crate feeds evidence in and carries plans out.

pub mod confidence;
pub mod error;
pub mod ids;
pub mod ladder;
pub mod model;
pub mod policy;
pub mod rerank;
pub mod risk;
pub mod stall;
pub mod types;

pub use confidence::*;
pub use error::*;
pub use ids::*;
pub use ladder::*;
pub use model::*;
pub use policy::*;
pub use rerank::*;
pub use risk::*;
pub use stall::*;
pub use types::*;

/// Seconds per hour, used wherever evidence ages are converted.
pub const SECS_PER_HOUR: i64 = 60 * 60;

/// Fractional hours elapsed between `since_unix` and `now_unix`. Saturates instead of
/// overflowing on timestamps at the edge of the `i64` range.
pub fn hours_between(since_unix: i64, now_unix: i64) -> f64 {
    now_unix.saturating_sub(since_unix) as f64 / SECS_PER_HOUR as f64
}
