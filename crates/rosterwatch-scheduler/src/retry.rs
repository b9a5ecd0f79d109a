//! Retry policy: requeue with decayed priority, or drop.
//!
//! There is no backoff timer. A retried task loses one priority point per
//! failure and sinks behind fresher work.

use chrono::{DateTime, Utc};

use crate::tasks::Task;

#[derive(Debug, Clone)]
pub enum RetryDecision {
    Requeue(Task),
    /// Retries exhausted.
    Drop(Task),
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 3 }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    pub fn on_failure(&self, task: &Task, now: DateTime<Utc>) -> RetryDecision {
        if task.retries >= self.max_retries {
            return RetryDecision::Drop(task.clone());
        }
        let mut next = task.clone();
        next.retries += 1;
        next.priority -= 1.0;
        next.enqueued_at = now;
        RetryDecision::Requeue(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decay_until_drop() {
        let policy = RetryPolicy::default();
        let mut task = Task::team_update("t1", 10.0);
        let mut seen = Vec::new();

        loop {
            match policy.on_failure(&task, Utc::now()) {
                RetryDecision::Requeue(next) => {
                    seen.push((next.priority, next.retries));
                    task = next;
                }
                RetryDecision::Drop(dropped) => {
                    assert_eq!(dropped.retries, 3);
                    break;
                }
            }
        }

        assert_eq!(seen, vec![(9.0, 1), (8.0, 2), (7.0, 3)]);
    }

    #[test]
    fn test_requeue_keeps_identity_and_refreshes_timestamp() {
        let policy = RetryPolicy::new(1);
        let task = Task::player_earnings("p1", 50.0);
        let later = task.enqueued_at + chrono::Duration::seconds(30);

        let RetryDecision::Requeue(next) = policy.on_failure(&task, later) else {
            panic!("expected requeue");
        };
        assert_eq!(next.id, task.id);
        assert_eq!(next.kind, task.kind);
        assert_eq!(next.enqueued_at, later);
        assert!(matches!(policy.on_failure(&next, later), RetryDecision::Drop(_)));
    }

    #[test]
    fn test_zero_retries_drops_immediately() {
        let policy = RetryPolicy::new(0);
        let task = Task::team_update("t1", 5.0);
        assert!(matches!(policy.on_failure(&task, Utc::now()), RetryDecision::Drop(_)));
    }
}
