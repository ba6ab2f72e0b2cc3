//! Duplicate suppression for check-ins

use std::collections::HashSet;

use attsync_common::Result;
use tracing::debug;

use super::host::CheckinStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    Duplicate,
}

/// Rejects a check-in when the store already has one for the same employee
/// and time, or when the same pair was admitted earlier in this batch.
pub struct DuplicateGuard<'a, S: CheckinStore + ?Sized> {
    store: &'a S,
    admitted: HashSet<(String, String)>,
}

impl<'a, S: CheckinStore + ?Sized> DuplicateGuard<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            admitted: HashSet::new(),
        }
    }

    pub async fn admit(&mut self, employee: &str, time: &str) -> Result<Admission> {
        let key = (employee.to_string(), time.to_string());
        if self.admitted.contains(&key) {
            debug!(employee, time, "Repeated event within batch");
            return Ok(Admission::Duplicate);
        }

        if self.store.checkin_exists(employee, time).await? {
            debug!(employee, time, "Check-in already stored");
            return Ok(Admission::Duplicate);
        }

        self.admitted.insert(key);
        Ok(Admission::Admitted)
    }
}
