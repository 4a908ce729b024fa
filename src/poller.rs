use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::Notify;

use crate::error::DashboardError;

/// How a polling loop reacts to each outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub retry_on_empty: bool,
    pub retry_on_error: bool,
    /// Cap on consecutive empty/failed polls. `None` retries forever.
    pub max_retries: Option<u32>,
}

impl PollPolicy {
    pub fn every(interval: Duration) -> Self {
        Self {
            interval,
            retry_on_empty: false,
            retry_on_error: false,
            max_retries: None,
        }
    }

    pub fn retry_on_empty(mut self) -> Self {
        self.retry_on_empty = true;
        self
    }

    pub fn retry_on_error(mut self) -> Self {
        self.retry_on_error = true;
        self
    }

    pub fn max_retries(mut self, max: Option<u32>) -> Self {
        self.max_retries = max;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Empty,
    Finished,
}

/// Runs `step` until it finishes or the policy gives up. Returns the number of
/// steps executed.
pub async fn run<F, Fut>(
    name: &'static str,
    policy: PollPolicy,
    kick: Option<Arc<Notify>>,
    mut step: F,
) -> u32
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Step, DashboardError>>,
{
    info!("{} loop started ({:?})", name, policy.interval);
    let mut runs = 0u32;
    let mut misses = 0u32;

    loop {
        runs += 1;
        let again = match step().await {
            Ok(Step::Continue) => {
                misses = 0;
                true
            }
            Ok(Step::Empty) => {
                debug!("{}: empty result", name);
                misses += 1;
                policy.retry_on_empty
            }
            Ok(Step::Finished) => false,
            Err(e) => {
                misses += 1;
                if policy.retry_on_error {
                    warn!("{}: {}", name, e);
                } else {
                    error!("{}: {}", name, e);
                }
                policy.retry_on_error
            }
        };

        let exhausted = policy.max_retries.is_some_and(|max| misses > max);
        if !again || exhausted {
            break;
        }

        match &kick {
            Some(kick) => {
                tokio::select! {
                    _ = tokio::time::sleep(policy.interval) => {}
                    _ = kick.notified() => debug!("{}: woken early", name),
                }
            }
            None => tokio::time::sleep(policy.interval).await,
        }
    }

    info!("{} loop stopped after {} runs", name, runs);
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn failing() -> DashboardError {
        DashboardError::BaseUrl("test".into())
    }

    #[tokio::test(start_paused = true)]
    async fn finished_stops_immediately() {
        let runs = run("test", PollPolicy::every(Duration::from_secs(1)), None, || async {
            Ok(Step::Finished)
        })
        .await;
        assert_eq!(runs, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_retries_on_interval() {
        let start = Instant::now();
        let calls = AtomicU32::new(0);
        let policy = PollPolicy::every(Duration::from_millis(5000)).retry_on_empty();

        let runs = run("test", policy, None, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Ok(Step::Empty)
                } else {
                    Ok(Step::Finished)
                }
            }
        })
        .await;

        assert_eq!(runs, 3);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(10_000));
        assert!(elapsed < Duration::from_millis(11_000));
    }

    #[tokio::test(start_paused = true)]
    async fn error_halts_without_retry_policy() {
        let runs = run("test", PollPolicy::every(Duration::from_secs(1)), None, || async {
            Err(failing())
        })
        .await;
        assert_eq!(runs, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn max_retries_bounds_failures() {
        let policy = PollPolicy::every(Duration::from_secs(1))
            .retry_on_error()
            .max_retries(Some(3));
        let runs = run("test", policy, None, || async { Err(failing()) }).await;
        assert_eq!(runs, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn success_resets_retry_budget() {
        let calls = AtomicU32::new(0);
        let policy = PollPolicy::every(Duration::from_secs(1))
            .retry_on_error()
            .max_retries(Some(1));

        let runs = run("test", policy, None, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                match n {
                    0 | 2 => Err(failing()),
                    1 => Ok(Step::Continue),
                    _ => Ok(Step::Finished),
                }
            }
        })
        .await;
        assert_eq!(runs, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn kick_wakes_before_interval() {
        let kick = Arc::new(Notify::new());
        let calls = Arc::new(AtomicU32::new(0));
        let policy = PollPolicy::every(Duration::from_secs(5));

        let handle = {
            let calls = calls.clone();
            let kick = kick.clone();
            tokio::spawn(async move {
                run("test", policy, Some(kick), || {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if n < 1 {
                            Ok(Step::Continue)
                        } else {
                            Ok(Step::Finished)
                        }
                    }
                })
                .await
            })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let before = Instant::now();
        kick.notify_one();
        assert_eq!(handle.await.unwrap(), 2);
        assert!(before.elapsed() < Duration::from_secs(5));
    }
}
