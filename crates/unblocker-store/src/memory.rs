use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use unblocker_core::{CorrelationId, Plan, PlanStatus};

use crate::traits::{PlanStore, StoreError};

/// Default plan lifetime: five minutes from creation.
pub const DEFAULT_PLAN_TTL_SECS: i64 = 300;

/// In-memory plan store. Not durable across restarts; each entry only lives for one
/// interaction. One mutex serializes every status change, which is what makes a
/// transition a compare-and-swap.
pub struct InMemoryPlanStore {
    ttl_secs: i64,
    inner: Mutex<HashMap<CorrelationId, Plan>>,
}

impl Default for InMemoryPlanStore {
    fn default() -> Self {
        Self::new(DEFAULT_PLAN_TTL_SECS)
    }
}

impl InMemoryPlanStore {
    pub fn new(ttl_secs: i64) -> Self {
        Self { ttl_secs, inner: Mutex::new(HashMap::new()) }
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CorrelationId, Plan>> {
        // A panic elsewhere cannot leave a half-written plan: every mutation is a single assignment.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_expired(&self, plan: &Plan, now_unix: i64) -> bool {
        now_unix - plan.created_at_unix >= self.ttl_secs
    }

    /// Look up a live entry, dropping it on the way if it has expired.
    fn live<'a>(
        &self,
        map: &'a mut HashMap<CorrelationId, Plan>,
        id: &CorrelationId,
        now_unix: i64,
    ) -> Result<&'a mut Plan, StoreError> {
        let expired = match map.get(id) {
            None => return Err(StoreError::NotFound(id.clone())),
            Some(plan) => self.is_expired(plan, now_unix),
        };
        if expired {
            map.remove(id);
            return Err(StoreError::NotFound(id.clone()));
        }
        map.get_mut(id).ok_or_else(|| StoreError::NotFound(id.clone()))
    }
}

impl PlanStore for InMemoryPlanStore {
    fn put(&self, id: &CorrelationId, plan: Plan, now_unix: i64) -> Result<(), StoreError> {
        let mut map = self.lock();
        if let Some(existing) = map.get(id) {
            if !self.is_expired(existing, now_unix) {
                return Err(StoreError::DuplicateCorrelationId(id.clone()));
            }
        }
        map.insert(id.clone(), plan);
        Ok(())
    }

    fn get(&self, id: &CorrelationId, now_unix: i64) -> Result<Plan, StoreError> {
        let mut map = self.lock();
        self.live(&mut map, id, now_unix).map(|p| p.clone())
    }

    fn transition(&self, id: &CorrelationId, to: PlanStatus, now_unix: i64) -> Result<Plan, StoreError> {
        let mut map = self.lock();
        let plan = self.live(&mut map, id, now_unix)?;
        if !plan.status.can_transition_to(to) {
            return Err(StoreError::InvalidTransition { id: id.clone(), from: plan.status, to });
        }
        plan.status = to;
        Ok(plan.clone())
    }

    fn purge_expired(&self, now_unix: i64) -> usize {
        let mut map = self.lock();
        let before = map.len();
        map.retain(|_, plan| !self.is_expired(plan, now_unix));
        before - map.len()
    }
}
