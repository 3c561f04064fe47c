//! # Event consumer
//! Single-worker fetch → dispatch → sleep loop.
//!
//! The offset moves as soon as a batch is fetched, before any event in it is
//! handled. A crash mid-batch therefore loses the rest of that batch; nothing
//! is delivered twice within one run. Failed events are reported, never retried.

use metrics::counter;
use std::future::Future;
use std::time::Duration;

use crate::events::{Event, EventError, Fetcher, Kind, Processor};

#[derive(Clone, Copy, Debug)]
pub struct ConsumerCfg {
    pub batch_size: usize,
    pub idle_sleep: Duration,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
}

impl Default for ConsumerCfg {
    fn default() -> Self {
        Self {
            batch_size: 100,
            idle_sleep: Duration::from_secs(1),
            backoff_base: Duration::from_millis(500),
            backoff_max: Duration::from_secs(30),
        }
    }
}

/// Capped exponential delay between failed fetches.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    failures: u32,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            failures: 0,
        }
    }

    /// Delay after one more failure: `base * 2^(n-1)`, capped at `max`.
    pub fn next_delay(&mut self) -> Duration {
        let shift = self.failures.min(16);
        self.failures = self.failures.saturating_add(1);
        self.base.saturating_mul(1u32 << shift).min(self.max)
    }

    pub fn reset(&mut self) {
        self.failures = 0;
    }
}

#[derive(Debug, thiserror::Error)]
#[error("can't handle event #{index} ({kind}): {error}")]
pub struct DispatchFailure {
    /// Position of the event in its batch.
    pub index: usize,
    pub kind: Kind,
    #[source]
    pub error: EventError,
}

#[derive(Debug, Default)]
pub struct CycleReport {
    pub fetched: usize,
    pub failures: Vec<DispatchFailure>,
}

impl CycleReport {
    pub fn is_idle(&self) -> bool {
        self.fetched == 0
    }
}

pub struct Consumer<F, P> {
    fetcher: F,
    processor: P,
    cfg: ConsumerCfg,
}

impl<F: Fetcher, P: Processor> Consumer<F, P> {
    pub fn new(fetcher: F, processor: P, cfg: ConsumerCfg) -> Self {
        crate::metrics::ensure_metrics_described();
        Self {
            fetcher,
            processor,
            cfg,
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// One fetch plus in-order dispatch of whatever came back.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, EventError> {
        let events = self.fetch().await?;
        Ok(self.dispatch(events).await)
    }

    /// Loop until `shutdown` resolves. A batch that is already being dispatched
    /// is finished before the loop exits.
    pub async fn run(&mut self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        let mut backoff = Backoff::new(self.cfg.backoff_base, self.cfg.backoff_max);

        tracing::info!(target: "consumer", batch_size = self.cfg.batch_size, "consumer started");

        loop {
            let fetched = tokio::select! {
                biased;
                _ = &mut shutdown => break,
                res = self.fetch() => res,
            };

            let pause = match fetched {
                Ok(events) if events.is_empty() => {
                    backoff.reset();
                    self.cfg.idle_sleep
                }
                Ok(events) => {
                    backoff.reset();
                    self.dispatch(events).await;
                    continue;
                }
                Err(e) => {
                    let delay = backoff.next_delay();
                    tracing::error!(
                        target: "consumer",
                        error = %e,
                        retry_in_ms = delay.as_millis() as u64,
                        "fetch failed"
                    );
                    delay
                }
            };

            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }

        tracing::info!(target: "consumer", "consumer stopped");
    }

    async fn fetch(&mut self) -> Result<Vec<Event>, EventError> {
        let res = self.fetcher.fetch(self.cfg.batch_size).await;
        if res.is_err() {
            counter!("consumer_fetch_errors_total").increment(1);
        }
        res
    }

    async fn dispatch(&self, events: Vec<Event>) -> CycleReport {
        let mut report = CycleReport {
            fetched: events.len(),
            failures: Vec::new(),
        };

        for (index, event) in events.iter().enumerate() {
            tracing::debug!(target: "consumer", index, kind = %event.kind, "got new event");
            counter!("consumer_events_total").increment(1);

            if let Err(error) = self.processor.process(event).await {
                counter!("consumer_dispatch_errors_total").increment(1);
                let failure = DispatchFailure {
                    index,
                    kind: event.kind,
                    error,
                };
                tracing::warn!(target: "consumer", error = %failure, "can't handle event");
                report.failures.push(failure);
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_then_caps() {
        let mut b = Backoff::new(Duration::from_millis(500), Duration::from_secs(3));
        let got: Vec<u128> = (0..5).map(|_| b.next_delay().as_millis()).collect();
        assert_eq!(got, vec![500, 1000, 2000, 3000, 3000]);

        b.reset();
        assert_eq!(b.next_delay(), Duration::from_millis(500));
    }

    #[test]
    fn backoff_survives_many_failures() {
        let mut b = Backoff::new(Duration::from_millis(1), Duration::from_secs(60));
        for _ in 0..100 {
            assert!(b.next_delay() <= Duration::from_secs(60));
        }
    }

    #[test]
    fn empty_report_is_idle() {
        assert!(CycleReport::default().is_idle());
    }
}
