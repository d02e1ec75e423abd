//! Poll-until-converged loop
//!
//! A refresh function is called after an initial delay and then repeatedly
//! with a growing interval until it reports [`Step::Done`], fails, or the
//! deadline passes. Deadlines are checked between refreshes only, so a
//! refresh that is already running (which may be a write) always completes.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

const BASE_INTERVAL: Duration = Duration::from_millis(100);

/// Result of one refresh round
#[derive(Debug)]
pub enum Step<T, E> {
    /// Target state reached
    Done(T),
    /// Not there yet
    Pending,
    /// Transient failure; keep polling and report it if the deadline passes
    Retry(E),
}

#[derive(Debug)]
pub enum WaitError<E> {
    Timeout { elapsed: Duration, last: Option<E> },
    Failed(E),
}

/// Timing profile for [`wait_for`]
#[derive(Debug, Clone, PartialEq)]
pub struct WaitConfig {
    /// Sleep before the first refresh
    pub delay: Duration,
    /// Overall budget, measured from the start of the wait
    pub timeout: Duration,
    /// Lower bound for the interval between refreshes
    pub min_interval: Duration,
    /// Upper bound for the interval between refreshes
    pub max_interval: Duration,
}

impl WaitConfig {
    /// Metaport and routing group attachments
    pub fn attachment() -> Self {
        Self {
            delay: Duration::from_secs(3),
            timeout: Duration::from_secs(30),
            min_interval: Duration::from_secs(5),
            max_interval: Duration::from_secs(10),
        }
    }

    /// Metaport cluster attachments propagate to every member and take longer
    pub fn cluster_attachment() -> Self {
        Self {
            timeout: Duration::from_secs(5 * 60),
            ..Self::attachment()
        }
    }

    /// Retry budget for writes rejected because the parent is busy
    pub fn busy_retry() -> Self {
        Self {
            delay: Duration::ZERO,
            timeout: Duration::from_secs(5),
            min_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(10),
        }
    }

    /// Interval before refresh number `round + 1`: 100ms doubled `round`
    /// times, clamped to `[min_interval, max_interval]`.
    pub fn interval(&self, round: u32) -> Duration {
        let factor = 2_u32.saturating_pow(round.min(16));
        BASE_INTERVAL
            .saturating_mul(factor)
            .clamp(self.min_interval, self.max_interval.max(self.min_interval))
    }
}

/// Run `refresh` until it is done, errors, or `config.timeout` elapses.
pub async fn wait_for<T, E, F, Fut>(config: &WaitConfig, mut refresh: F) -> Result<T, WaitError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Step<T, E>, E>>,
{
    let started = Instant::now();
    let deadline = started + config.timeout;

    if !config.delay.is_zero() {
        tokio::time::sleep(config.delay.min(config.timeout)).await;
    }

    let mut round = 0;
    let mut last = None;

    loop {
        match refresh().await {
            Ok(Step::Done(value)) => return Ok(value),
            Ok(Step::Pending) => {}
            Ok(Step::Retry(e)) => last = Some(e),
            Err(e) => return Err(WaitError::Failed(e)),
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(WaitError::Timeout {
                elapsed: now - started,
                last,
            });
        }

        round += 1;
        let pause = config.interval(round).min(deadline - now);
        tracing::debug!(
            "Still pending after {:?}, next check in {:?}",
            now - started,
            pause
        );
        tokio::time::sleep(pause).await;
    }
}
