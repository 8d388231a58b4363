//! Bounded status push policy

use shared::models::ExternalRef;

/// Default push attempt cap per record
pub const DEFAULT_MAX_PUSH_ATTEMPTS: u32 = 3;

/// How many times a record's status may be pushed to the CRM
///
/// Attempts are counted across the record's whole lifetime (take and
/// release share the budget) and are counted before the network call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushPolicy {
    pub max_attempts: u32,
}

impl Default for PushPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_PUSH_ATTEMPTS,
        }
    }
}

impl PushPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    pub fn allows(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts
    }

    /// Count one attempt on the reference
    ///
    /// Returns the attempt number, or `None` when the budget is spent
    /// (the reference is left untouched).
    pub fn begin_attempt(&self, external: &mut ExternalRef) -> Option<u32> {
        if !self.allows(external.sync_attempts) {
            return None;
        }
        external.sync_attempts += 1;
        Some(external.sync_attempts)
    }
}
