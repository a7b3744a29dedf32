//! Run-wide wall-clock deadline and step limit
//!
//! A [`RunBudget`] is cloned into every scope of a run, workers included.
//! Clones share one step counter, so the limit bounds the run as a whole.

use crate::types::{AppError, Result};
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct RunBudget {
    deadline: Instant,
    step_limit: u32,
    steps: Arc<AtomicU32>,
}

impl RunBudget {
    pub fn new(timeout: Duration, step_limit: u32) -> Self {
        Self {
            deadline: Instant::now() + timeout,
            step_limit,
            steps: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Await `fut` until the deadline; an expired deadline drops the call.
    pub async fn guard<T, F>(&self, what: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.guard_with_grace(what, Duration::ZERO, fut).await
    }

    /// Like [`guard`](Self::guard), but allow `grace` past the deadline so
    /// guarded work can still return its own fallback.
    pub async fn guard_with_grace<T, F>(&self, what: &str, grace: Duration, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout_at(self.deadline + grace, fut).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout(format!(
                "{} did not finish before the run deadline",
                what
            ))),
        }
    }

    /// Count one loop step against the limit
    pub fn charge_step(&self, scope: &str) -> Result<u32> {
        let used = self.steps.fetch_add(1, Ordering::SeqCst) + 1;
        if used > self.step_limit {
            return Err(AppError::StepLimit(format!(
                "{} stopped after the run used {} of {} steps",
                scope, self.step_limit, self.step_limit
            )));
        }
        Ok(used)
    }

    pub fn steps_used(&self) -> u32 {
        self.steps.load(Ordering::SeqCst).min(self.step_limit)
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Why the budget ran out, if it did.
    ///
    /// The step limit counts as reached only once a charge was refused.
    pub fn exhaustion(&self) -> Option<String> {
        if self.is_expired() {
            Some("the run deadline passed".to_string())
        } else if self.steps.load(Ordering::SeqCst) > self.step_limit {
            Some(format!("the run used all {} steps", self.step_limit))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_guard_passes_result_through() {
        let budget = RunBudget::new(Duration::from_secs(5), 10);
        let value = budget.guard("noop", async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);

        let err = budget
            .guard::<(), _>("failing", async { Err(AppError::LLM("down".into())) })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::LLM(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_guard_times_out() {
        let budget = RunBudget::new(Duration::from_millis(50), 10);
        let err = budget
            .guard("slow call", async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            })
            .await
            .unwrap_err();
        assert!(err.is_budget_exhausted());
        assert!(budget.is_expired());
        assert_eq!(budget.exhaustion().as_deref(), Some("the run deadline passed"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_grace_lets_late_work_finish() {
        let budget = RunBudget::new(Duration::from_millis(50), 10);
        let value = budget
            .guard_with_grace("fallback", Duration::from_millis(100), async {
                tokio::time::sleep(Duration::from_millis(80)).await;
                Ok("placeholder")
            })
            .await
            .unwrap();
        assert_eq!(value, "placeholder");
        assert!(budget.is_expired());
    }

    #[test]
    fn test_step_limit_shared_across_clones() {
        let budget = RunBudget::new(Duration::from_secs(5), 3);
        let clone = budget.clone();

        assert_eq!(budget.charge_step("supervisor").unwrap(), 1);
        assert_eq!(clone.charge_step("worker").unwrap(), 2);
        assert_eq!(budget.charge_step("worker").unwrap(), 3);
        assert!(budget.exhaustion().is_none());
        assert!(matches!(
            clone.charge_step("worker"),
            Err(AppError::StepLimit(_))
        ));
        assert_eq!(budget.steps_used(), 3);
        assert_eq!(budget.exhaustion().as_deref(), Some("the run used all 3 steps"));
    }
}
