use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use unblocker_core::{TargetId, SECS_PER_HOUR};

/// Rolling record of action attempts per target, backing the gate's rate limit.
pub struct AttemptLedger {
    window_secs: i64,
    attempts: Mutex<HashMap<TargetId, Vec<i64>>>,
}

impl Default for AttemptLedger {
    fn default() -> Self {
        Self::new(SECS_PER_HOUR)
    }
}

impl AttemptLedger {
    pub fn new(window_secs: i64) -> Self {
        Self { window_secs, attempts: Mutex::new(HashMap::new()) }
    }

    /// Count and record under one lock: succeeds only while fewer than `limit` attempts fall
    /// inside the window. On refusal returns the attempts already counted.
    pub fn try_record(&self, target: &TargetId, now_unix: i64, limit: u32) -> Result<(), u32> {
        let mut map = self.attempts.lock().unwrap_or_else(PoisonError::into_inner);
        let times = map.entry(target.clone()).or_default();
        times.retain(|t| now_unix - *t < self.window_secs);
        let n = times.len() as u32;
        if n >= limit {
            return Err(n);
        }
        times.push(now_unix);
        Ok(())
    }

    /// Give back an attempt taken by [`try_record`](Self::try_record) that never reached the host.
    pub fn release(&self, target: &TargetId, at_unix: i64) {
        let mut map = self.attempts.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(times) = map.get_mut(target) else { return };
        if let Some(pos) = times.iter().rposition(|t| *t == at_unix) {
            times.remove(pos);
        }
        if times.is_empty() {
            map.remove(target);
        }
    }

    /// Attempts inside the window ending at `now_unix`. Older entries are dropped.
    pub fn count_recent(&self, target: &TargetId, now_unix: i64) -> u32 {
        let mut map = self.attempts.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(times) = map.get_mut(target) else { return 0 };
        times.retain(|t| now_unix - *t < self.window_secs);
        let n = times.len() as u32;
        if n == 0 {
            map.remove(target);
        }
        n
    }
}
