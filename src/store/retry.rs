use std::fmt::Display;

use tracing::{debug, warn};

use crate::app::{Result, ThriftError};

pub const DEFAULT_MAX_RETRIES: u32 = 5;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Extra attempts after the first one loses a version race.
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// Outcome of one optimistic read-modify-write attempt.
#[derive(Debug)]
pub enum Attempt<T> {
    Done(T),
    /// The version check failed; re-run from fresh state.
    Conflict,
}

/// Run `attempt` until it commits, re-reading state on every conflict.
///
/// Errors from `attempt` are returned immediately and never retried.
pub fn with_retry<T, F>(
    policy: RetryPolicy,
    entity: &'static str,
    id: impl Display,
    mut attempt: F,
) -> Result<T>
where
    F: FnMut() -> Result<Attempt<T>>,
{
    let mut conflicts = 0;
    loop {
        match attempt()? {
            Attempt::Done(value) => return Ok(value),
            Attempt::Conflict => {
                conflicts += 1;
                if conflicts > policy.max_retries {
                    warn!(
                        "Giving up on {} {} after {} conflicting writes",
                        entity, id, conflicts
                    );
                    return Err(ThriftError::ConcurrentModification {
                        entity,
                        id: id.to_string(),
                    });
                }
                debug!(
                    "Version conflict on {} {}, retry {}/{}",
                    entity, id, conflicts, policy.max_retries
                );
                std::thread::yield_now();
            }
        }
    }
}
