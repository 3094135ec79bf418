//! The timer state machine.
//!
//! A single tracking session moves through `idle -> running <-> paused ->
//! idle`. Elapsed time is derived, never counted: `elapsed_time` holds the
//! sum of finished running segments and `start_time` marks the beginning of
//! the current one, so a running timer keeps counting across process
//! restarts.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::Clock;
use crate::entry::TimeEntry;
use crate::store::{Gateway, keys, log_failure};
use crate::tick::{TickConfig, TickHandle};
use crate::types::{CategoryId, duration_ms};

/// Where the timer is in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    #[default]
    Idle,
    Running,
    Paused,
}

impl TimerStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
        }
    }
}

impl fmt::Display for TimerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A requested transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    Start,
    Pause,
    Resume,
    Stop,
}

impl fmt::Display for TimerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Start => "start",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Stop => "stop",
        })
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimerError {
    /// The action is not allowed from the current status. Nothing changed.
    #[error("cannot {action} a timer that is {from}")]
    InvalidTransition {
        from: TimerStatus,
        action: TimerAction,
    },
}

/// Persisted timer state.
///
/// `category_id`/`category_name` are set iff the timer is not idle;
/// `start_time` iff running; `paused_time` iff paused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub status: TimerStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    /// Start of the current running segment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused_time: Option<DateTime<Utc>>,
    /// Time accumulated by finished running segments.
    #[serde(with = "duration_ms", default = "Duration::zero")]
    pub elapsed_time: Duration,
    /// When the session began; the start of the resulting entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_start: Option<DateTime<Utc>>,
}

impl Default for TimerState {
    fn default() -> Self {
        Self::idle()
    }
}

impl TimerState {
    pub const fn idle() -> Self {
        Self {
            status: TimerStatus::Idle,
            category_id: None,
            category_name: None,
            start_time: None,
            paused_time: None,
            elapsed_time: Duration::zero(),
            session_start: None,
        }
    }

    /// Total elapsed time at `now`.
    pub fn total_elapsed(&self, now: DateTime<Utc>) -> Duration {
        match (self.status, self.start_time) {
            (TimerStatus::Running, Some(start)) => self.elapsed_time + (now - start),
            _ => self.elapsed_time,
        }
    }

    /// Checks the field-presence rules for the current status.
    pub fn is_consistent(&self) -> bool {
        let has_category = self.category_id.is_some() && self.category_name.is_some();
        match self.status {
            TimerStatus::Idle => *self == Self::idle(),
            TimerStatus::Running => {
                has_category && self.start_time.is_some() && self.paused_time.is_none()
            }
            TimerStatus::Paused => {
                has_category && self.start_time.is_none() && self.paused_time.is_some()
            }
        }
    }
}

/// Owns the [`TimerState`] and applies transitions.
///
/// Every successful transition is persisted under
/// [`keys::CURRENT_TIMER_STATE`]. Rejected transitions change nothing and
/// write nothing.
pub struct TimerEngine {
    state: TimerState,
    clock: Arc<dyn Clock>,
    gateway: Gateway,
    tick: Option<TickConfig>,
    ticker: Option<TickHandle>,
}

impl fmt::Debug for TimerEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerEngine")
            .field("state", &self.state)
            .field("ticking", &self.ticker.is_some())
            .finish_non_exhaustive()
    }
}

impl TimerEngine {
    /// Restores the engine from the gateway.
    ///
    /// A missing, undecodable or inconsistent stored state starts idle.
    pub fn restore(clock: Arc<dyn Clock>, gateway: Gateway) -> Self {
        let state = match gateway.load::<TimerState>(keys::CURRENT_TIMER_STATE) {
            Some(state) if state.is_consistent() => {
                tracing::debug!(status = %state.status, "restored timer state");
                state
            }
            Some(state) => {
                tracing::warn!(status = %state.status, "discarding inconsistent timer state");
                TimerState::idle()
            }
            None => TimerState::idle(),
        };
        Self {
            state,
            clock,
            gateway,
            tick: None,
            ticker: None,
        }
    }

    /// Enables the periodic tick. Starts it right away if the restored timer
    /// is running.
    #[must_use]
    pub fn with_tick(mut self, config: TickConfig) -> Self {
        self.set_tick(config);
        self
    }

    pub fn set_tick(&mut self, config: TickConfig) {
        self.tick = Some(config);
        self.restart_tick();
    }

    pub const fn state(&self) -> &TimerState {
        &self.state
    }

    pub const fn status(&self) -> TimerStatus {
        self.state.status
    }

    /// Total elapsed time right now.
    pub fn current_elapsed(&self) -> Duration {
        self.state.total_elapsed(self.clock.now())
    }

    pub fn start(
        &mut self,
        category_id: CategoryId,
        category_name: impl Into<String>,
    ) -> Result<(), TimerError> {
        self.require(TimerStatus::Idle, TimerAction::Start)?;
        let now = self.clock.now();
        self.state = TimerState {
            status: TimerStatus::Running,
            category_id: Some(category_id),
            category_name: Some(category_name.into()),
            start_time: Some(now),
            paused_time: None,
            elapsed_time: Duration::zero(),
            session_start: Some(now),
        };
        tracing::debug!(category = %category_id, "timer started");
        self.persist();
        self.restart_tick();
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), TimerError> {
        self.require(TimerStatus::Running, TimerAction::Pause)?;
        let now = self.clock.now();
        self.state.elapsed_time = self.state.total_elapsed(now);
        self.state.start_time = None;
        self.state.paused_time = Some(now);
        self.state.status = TimerStatus::Paused;
        tracing::debug!(elapsed_ms = self.state.elapsed_time.num_milliseconds(), "timer paused");
        self.persist();
        self.ticker = None;
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), TimerError> {
        self.require(TimerStatus::Paused, TimerAction::Resume)?;
        self.state.start_time = Some(self.clock.now());
        self.state.paused_time = None;
        self.state.status = TimerStatus::Running;
        tracing::debug!("timer resumed");
        self.persist();
        self.restart_tick();
        Ok(())
    }

    /// Ends the session and returns the entry for it.
    ///
    /// The entry spans the session start to now and carries the active
    /// (pause-excluded) time as its duration. The engine returns to idle.
    pub fn stop(&mut self) -> Result<TimeEntry, TimerError> {
        let entry = self.finish()?;
        self.persist();
        Ok(entry)
    }

    /// Like [`stop`](Self::stop), but leaves the stored state untouched.
    ///
    /// The caller saves the idle state with [`save_state`](Self::save_state)
    /// once the entry itself is safely stored.
    pub(crate) fn finish(&mut self) -> Result<TimeEntry, TimerError> {
        if self.state.status == TimerStatus::Idle {
            return Err(self.reject(TimerAction::Stop));
        }
        let now = self.clock.now();
        let active = self.state.total_elapsed(now);
        let start = self
            .state
            .session_start
            .or(self.state.start_time)
            .unwrap_or(now - active);

        let category_id = self.state.category_id.unwrap_or_default();
        let category_name = self.state.category_name.clone().unwrap_or_default();
        let entry = TimeEntry::from_session(category_id, category_name, start, now, active);

        self.ticker = None;
        self.state = TimerState::idle();
        tracing::debug!(
            entry = %entry.id,
            duration_ms = entry.duration().num_milliseconds(),
            "timer stopped"
        );
        Ok(entry)
    }

    pub(crate) fn save_state(&self) {
        self.persist();
    }

    /// Drops any session without producing an entry.
    pub(crate) fn reset(&mut self) {
        self.ticker = None;
        self.state = TimerState::idle();
    }

    fn require(&self, status: TimerStatus, action: TimerAction) -> Result<(), TimerError> {
        if self.state.status == status {
            Ok(())
        } else {
            Err(self.reject(action))
        }
    }

    fn reject(&self, action: TimerAction) -> TimerError {
        tracing::warn!(from = %self.state.status, %action, "ignoring invalid timer transition");
        TimerError::InvalidTransition {
            from: self.state.status,
            action,
        }
    }

    fn persist(&self) {
        log_failure(self.gateway.save(keys::CURRENT_TIMER_STATE, &self.state));
    }

    fn restart_tick(&mut self) {
        self.ticker = None;
        let (Some(config), TimerStatus::Running, Some(segment_start)) =
            (&self.tick, self.state.status, self.state.start_time)
        else {
            return;
        };
        self.ticker = Some(TickHandle::spawn(
            config,
            Arc::clone(&self.clock),
            self.state.elapsed_time,
            segment_start,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use crate::clock::ManualClock;
    use crate::store::{KeyValueStore, MemoryStore};

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn engine() -> (TimerEngine, Arc<ManualClock>, Gateway) {
        let clock = Arc::new(ManualClock::new(t0()));
        let gateway = Gateway::in_memory();
        let engine = TimerEngine::restore(clock.clone(), gateway.clone());
        (engine, clock, gateway)
    }

    #[test]
    fn pause_resume_scenario() {
        let (mut engine, clock, _) = engine();
        let work = CategoryId::new();

        engine.start(work, "Work").unwrap();
        clock.advance(Duration::minutes(10));
        engine.pause().unwrap();
        clock.advance(Duration::minutes(5));
        engine.resume().unwrap();
        clock.advance(Duration::minutes(10));

        let elapsed_at_stop = engine.current_elapsed();
        let entry = engine.stop().unwrap();

        assert_eq!(entry.duration(), Duration::minutes(20));
        assert_eq!(entry.duration(), elapsed_at_stop);
        assert_eq!(entry.start_time(), t0());
        assert_eq!(entry.end_time(), t0() + Duration::minutes(25));
        assert_eq!(entry.category_id, work);
        assert_eq!(entry.category_name, "Work");
        assert_eq!(engine.state(), &TimerState::idle());
    }

    #[test]
    fn uninterrupted_session_duration_matches_span() {
        let (mut engine, clock, _) = engine();
        engine.start(CategoryId::new(), "Work").unwrap();
        clock.advance(Duration::minutes(30));
        let entry = engine.stop().unwrap();
        assert_eq!(entry.duration(), entry.end_time() - entry.start_time());
    }

    #[test]
    fn paused_elapsed_does_not_grow() {
        let (mut engine, clock, _) = engine();
        engine.start(CategoryId::new(), "Work").unwrap();
        clock.advance(Duration::minutes(3));
        engine.pause().unwrap();
        clock.advance(Duration::hours(2));
        assert_eq!(engine.current_elapsed(), Duration::minutes(3));

        let entry = engine.stop().unwrap();
        assert_eq!(entry.duration(), Duration::minutes(3));
        assert_eq!(entry.end_time(), t0() + Duration::minutes(123));
    }

    #[test]
    fn invalid_transitions_change_nothing() {
        let (mut engine, _, gateway) = engine();

        for (result, action) in [
            (engine.pause(), TimerAction::Pause),
            (engine.resume(), TimerAction::Resume),
        ] {
            assert_eq!(
                result.unwrap_err(),
                TimerError::InvalidTransition {
                    from: TimerStatus::Idle,
                    action
                }
            );
        }
        assert!(engine.stop().is_err());
        // Nothing was ever written.
        assert_eq!(gateway.load::<TimerState>(keys::CURRENT_TIMER_STATE), None);

        engine.start(CategoryId::new(), "Work").unwrap();
        let before = engine.state().clone();
        assert!(engine.start(CategoryId::new(), "Rest").is_err());
        assert!(engine.resume().is_err());
        assert_eq!(engine.state(), &before);

        engine.pause().unwrap();
        let err = engine.pause().unwrap_err();
        assert_eq!(err.to_string(), "cannot pause a timer that is paused");
    }

    #[test]
    fn every_transition_is_persisted() {
        let (mut engine, clock, gateway) = engine();
        let stored = || gateway.load::<TimerState>(keys::CURRENT_TIMER_STATE).unwrap();

        engine.start(CategoryId::new(), "Work").unwrap();
        assert_eq!(stored().status, TimerStatus::Running);

        clock.advance(Duration::minutes(1));
        engine.pause().unwrap();
        let paused = stored();
        assert_eq!(paused.status, TimerStatus::Paused);
        assert_eq!(paused.elapsed_time, Duration::minutes(1));
        assert_eq!(paused.paused_time, Some(t0() + Duration::minutes(1)));
        assert!(paused.is_consistent());

        engine.resume().unwrap();
        assert_eq!(stored().status, TimerStatus::Running);

        engine.stop().unwrap();
        assert_eq!(stored(), TimerState::idle());
    }

    #[test]
    fn running_state_survives_a_restart() {
        let (mut engine, clock, gateway) = engine();
        engine.start(CategoryId::new(), "Work").unwrap();
        clock.advance(Duration::minutes(5));
        let before = engine.current_elapsed();
        drop(engine);

        clock.advance(Duration::hours(1));
        let restored = TimerEngine::restore(clock.clone(), gateway);
        assert_eq!(restored.status(), TimerStatus::Running);
        assert_eq!(restored.current_elapsed(), before + Duration::seconds(3600));
    }

    #[test]
    fn inconsistent_stored_state_restores_idle() {
        let store = Arc::new(MemoryStore::new());
        store
            .put_raw(keys::CURRENT_TIMER_STATE, r#"{"status":"running","elapsedTime":0}"#)
            .unwrap();
        let engine = TimerEngine::restore(Arc::new(ManualClock::new(t0())), Gateway::new(store));
        assert_eq!(engine.status(), TimerStatus::Idle);
    }

    #[test]
    fn idle_state_with_leftovers_is_discarded() {
        let mut leftover = TimerState::idle();
        leftover.elapsed_time = Duration::minutes(7);
        leftover.category_name = Some("Work".into());
        assert!(!leftover.is_consistent());
        assert!(TimerState::idle().is_consistent());

        let gateway = Gateway::in_memory();
        gateway.save(keys::CURRENT_TIMER_STATE, &leftover).unwrap();
        let engine = TimerEngine::restore(Arc::new(ManualClock::new(t0())), gateway);
        assert_eq!(engine.state(), &TimerState::idle());
        assert_eq!(engine.current_elapsed(), Duration::zero());
    }

    #[test]
    fn state_serializes_with_camel_case_fields() {
        let (mut engine, clock, _) = engine();
        engine.start(CategoryId::new(), "Work").unwrap();
        clock.advance(Duration::seconds(90));
        engine.pause().unwrap();

        let value = serde_json::to_value(engine.state()).unwrap();
        assert_eq!(value["status"], "paused");
        assert_eq!(value["elapsedTime"], 90_000);
        assert_eq!(value["categoryName"], "Work");
        assert_eq!(value["sessionStart"], "2024-01-01T09:00:00Z");
        assert!(value.get("startTime").is_none());

        let back: TimerState = serde_json::from_value(value).unwrap();
        assert_eq!(&back, engine.state());
    }

    #[test]
    fn restored_running_timer_ticks_immediately() {
        let (mut engine, clock, gateway) = engine();
        engine.start(CategoryId::new(), "Work").unwrap();
        clock.advance(Duration::seconds(42));
        drop(engine);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let config = TickConfig::new(Arc::new(move |elapsed| {
            sink_seen.lock().unwrap().push(elapsed);
        }))
        .with_interval(std::time::Duration::from_millis(5));

        let engine = TimerEngine::restore(clock, gateway).with_tick(config);
        std::thread::sleep(std::time::Duration::from_millis(50));
        drop(engine);

        let seen = seen.lock().unwrap();
        assert!(!seen.is_empty());
        assert_eq!(seen[0], Duration::seconds(42));
    }

    #[test]
    fn ticks_stop_while_paused() {
        let (engine, clock, _) = engine();
        let count = Arc::new(Mutex::new(0_u32));
        let sink_count = Arc::clone(&count);
        let config = TickConfig::new(Arc::new(move |_| {
            *sink_count.lock().unwrap() += 1;
        }))
        .with_interval(std::time::Duration::from_millis(5));
        let mut engine = engine.with_tick(config);

        engine.start(CategoryId::new(), "Work").unwrap();
        clock.advance(Duration::seconds(1));
        engine.pause().unwrap();
        let after_pause = *count.lock().unwrap();
        std::thread::sleep(std::time::Duration::from_millis(30));
        assert_eq!(*count.lock().unwrap(), after_pause);
    }
}
