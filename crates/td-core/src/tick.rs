//! Periodic elapsed-time reporting for a running timer.

use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::JoinHandle;

use chrono::{DateTime, Duration, Utc};

use crate::clock::Clock;

/// Default cadence of the tick.
pub const TICK_INTERVAL: std::time::Duration = std::time::Duration::from_secs(1);

/// Receives the derived elapsed time on every tick.
pub type TickSink = Arc<dyn Fn(Duration) + Send + Sync>;

/// Where and how often ticks are delivered.
#[derive(Clone)]
pub struct TickConfig {
    pub sink: TickSink,
    pub interval: std::time::Duration,
}

impl TickConfig {
    pub fn new(sink: TickSink) -> Self {
        Self {
            sink,
            interval: TICK_INTERVAL,
        }
    }

    #[must_use]
    pub const fn with_interval(mut self, interval: std::time::Duration) -> Self {
        self.interval = interval;
        self
    }
}

impl std::fmt::Debug for TickConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickConfig")
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

/// A running background ticker. Dropping the handle stops it.
///
/// The ticker only reads; it never changes timer state.
#[derive(Debug)]
pub struct TickHandle {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl TickHandle {
    /// Starts ticking `baseline + (now - segment_start)` into the sink.
    pub(crate) fn spawn(
        config: &TickConfig,
        clock: Arc<dyn Clock>,
        baseline: Duration,
        segment_start: DateTime<Utc>,
    ) -> Self {
        let (stop, stopped) = mpsc::channel::<()>();
        let sink = Arc::clone(&config.sink);
        let interval = config.interval;

        let thread = std::thread::Builder::new()
            .name("td-tick".into())
            .spawn(move || {
                loop {
                    match stopped.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            sink(baseline + (clock.now() - segment_start));
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            });

        let thread = match thread {
            Ok(handle) => Some(handle),
            Err(err) => {
                tracing::warn!(error = %err, "failed to start tick thread");
                None
            }
        };

        Self {
            stop: Some(stop),
            thread,
        }
    }

    /// Stops the ticker and waits for its thread to exit.
    pub fn cancel(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Dropping the sender wakes the thread immediately.
        self.stop.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!("tick thread panicked");
            }
        }
    }
}

impl Drop for TickHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use crate::clock::ManualClock;

    #[test]
    fn reports_baseline_plus_segment() {
        let start = DateTime::parse_from_rfc3339("2024-01-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let clock = Arc::new(ManualClock::new(start + Duration::seconds(30)));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let config = TickConfig::new(Arc::new(move |elapsed| {
            sink_seen.lock().unwrap().push(elapsed);
        }))
        .with_interval(std::time::Duration::from_millis(5));

        let handle = TickHandle::spawn(&config, clock, Duration::minutes(10), start);
        std::thread::sleep(std::time::Duration::from_millis(60));
        handle.cancel();

        let seen = seen.lock().unwrap();
        assert!(!seen.is_empty());
        assert!(
            seen.iter()
                .all(|&e| e == Duration::minutes(10) + Duration::seconds(30))
        );
    }

    #[test]
    fn dropping_stops_the_thread() {
        let start = Utc::now();
        let clock = Arc::new(ManualClock::new(start));
        let count = Arc::new(Mutex::new(0_u32));
        let sink_count = Arc::clone(&count);
        let config = TickConfig::new(Arc::new(move |_| {
            *sink_count.lock().unwrap() += 1;
        }))
        .with_interval(std::time::Duration::from_millis(5));

        drop(TickHandle::spawn(&config, clock, Duration::zero(), start));
        let after_drop = *count.lock().unwrap();
        std::thread::sleep(std::time::Duration::from_millis(30));
        assert_eq!(*count.lock().unwrap(), after_drop);
    }
}
