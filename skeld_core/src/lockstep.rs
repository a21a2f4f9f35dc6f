//! Lockstep flush and freeze decisions.
//!
//! A pure state machine over runtime time (`Duration` since start). The
//! runtime asks it when to flush and whether game time is currently frozen;
//! it performs no I/O itself.
//!
//! ```text
//!   Running ──(events pending)──► Batching ──(window / priority)──► flush
//!      ▲                                                             │
//!      └──────(response / timeout / link lost)──── Awaiting ◄────────┘
//! ```

use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct LockstepConfig {
    /// How long ordinary events accumulate before a flush.
    pub batch_window: Duration,

    /// Freeze game time after each flush until a response arrives.
    pub lockstep: bool,

    /// Give up waiting after this long and resume the clock.
    pub response_timeout: Option<Duration>,
}

impl Default for LockstepConfig {
    fn default() -> Self {
        Self {
            batch_window: Duration::from_millis(100),
            lockstep: true,
            response_timeout: None,
        }
    }
}

/// Why a flush happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    Priority,
    WindowElapsed,
}

#[derive(Debug, Clone)]
pub struct LockstepClock {
    config: LockstepConfig,
    window_opened: Option<Duration>,
    awaiting_since: Option<Duration>,
    /// Flushes sent in lockstep mode whose response has not arrived yet.
    outstanding: u32,
    link_lost: bool,
    timeouts: u64,
}

impl LockstepClock {
    pub fn new(config: LockstepConfig) -> Self {
        Self {
            config,
            window_opened: None,
            awaiting_since: None,
            outstanding: 0,
            link_lost: false,
            timeouts: 0,
        }
    }

    pub fn config(&self) -> &LockstepConfig {
        &self.config
    }

    /// Opens the batch window on the first pending event.
    pub fn observe_pending(&mut self, now: Duration) {
        if self.window_opened.is_none() {
            self.window_opened = Some(now);
        }
    }

    /// Decides whether the queue should be flushed now.
    ///
    /// Priority events flush even while a response is outstanding; ordinary
    /// events wait for both the window and the response.
    pub fn should_flush(&mut self, now: Duration, pending: usize, priority: bool) -> Option<FlushReason> {
        if pending == 0 {
            return None;
        }
        if priority {
            return Some(FlushReason::Priority);
        }
        self.observe_pending(now);
        if self.is_awaiting() {
            return None;
        }
        let opened = self.window_opened?;
        if now.saturating_sub(opened) >= self.config.batch_window {
            Some(FlushReason::WindowElapsed)
        } else {
            None
        }
    }

    /// Records a completed flush and, in lockstep mode, freezes the clock.
    pub fn on_flushed(&mut self, now: Duration) {
        self.window_opened = None;
        if self.config.lockstep && !self.link_lost {
            self.awaiting_since = Some(now);
            self.outstanding += 1;
        }
    }

    /// A response batch arrived. The clock resumes once every outstanding
    /// flush has been answered, so a reply that straggles in after a
    /// timeout cannot release the freeze of a later flush.
    pub fn on_response(&mut self) {
        self.outstanding = self.outstanding.saturating_sub(1);
        if self.outstanding > 0 {
            if self.awaiting_since.is_some() {
                debug!("Late response absorbed, {} still outstanding", self.outstanding);
            }
            return;
        }
        if self.awaiting_since.take().is_some() {
            debug!("Response received, resuming clock");
        }
    }

    /// Resumes the clock if the response timeout has elapsed. Returns true
    /// when it did.
    pub fn poll_timeout(&mut self, now: Duration) -> bool {
        let (Some(since), Some(timeout)) = (self.awaiting_since, self.config.response_timeout) else {
            return false;
        };
        if now.saturating_sub(since) < timeout {
            return false;
        }
        warn!(
            "No response after {}ms, resuming clock",
            timeout.as_millis()
        );
        self.awaiting_since = None;
        self.timeouts += 1;
        true
    }

    /// The link is gone; stop freezing so the simulation keeps ticking.
    pub fn on_link_lost(&mut self) {
        self.link_lost = true;
        self.awaiting_since = None;
        self.outstanding = 0;
    }

    pub fn is_awaiting(&self) -> bool {
        self.awaiting_since.is_some()
    }

    /// Game time is frozen while awaiting a lockstep response.
    pub fn is_frozen(&self) -> bool {
        self.is_awaiting()
    }

    pub fn is_link_lost(&self) -> bool {
        self.link_lost
    }

    /// Responses still owed for earlier flushes, late ones included.
    pub fn outstanding(&self) -> u32 {
        self.outstanding
    }

    pub fn timeouts(&self) -> u64 {
        self.timeouts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_window_then_freeze_then_resume() {
        let mut clock = LockstepClock::new(LockstepConfig::default());

        assert_eq!(clock.should_flush(ms(0), 0, false), None);
        assert_eq!(clock.should_flush(ms(10), 1, false), None);
        assert_eq!(clock.should_flush(ms(60), 3, false), None);
        assert_eq!(clock.should_flush(ms(110), 3, false), Some(FlushReason::WindowElapsed));

        clock.on_flushed(ms(110));
        assert!(clock.is_frozen());
        // Window elapsed again but a response is still outstanding.
        assert_eq!(clock.should_flush(ms(500), 2, false), None);

        clock.on_response();
        assert!(!clock.is_frozen());
        assert_eq!(clock.should_flush(ms(510), 2, false), Some(FlushReason::WindowElapsed));
    }

    #[test]
    fn test_priority_bypasses_window_and_wait() {
        let mut clock = LockstepClock::new(LockstepConfig::default());
        clock.should_flush(ms(0), 1, false);
        clock.on_flushed(ms(100));
        assert!(clock.is_awaiting());

        assert_eq!(clock.should_flush(ms(101), 1, true), Some(FlushReason::Priority));
    }

    #[test]
    fn test_no_freeze_without_lockstep() {
        let mut clock = LockstepClock::new(LockstepConfig {
            lockstep: false,
            ..LockstepConfig::default()
        });
        clock.should_flush(ms(0), 1, false);
        clock.on_flushed(ms(100));
        assert!(!clock.is_frozen());
    }

    #[test]
    fn test_response_timeout_resumes() {
        let mut clock = LockstepClock::new(LockstepConfig {
            response_timeout: Some(ms(1000)),
            ..LockstepConfig::default()
        });
        clock.on_flushed(ms(0));
        assert!(!clock.poll_timeout(ms(999)));
        assert!(clock.is_frozen());
        assert!(clock.poll_timeout(ms(1000)));
        assert!(!clock.is_frozen());
        assert_eq!(clock.timeouts(), 1);
    }

    #[test]
    fn test_late_response_does_not_release_next_flush() {
        let mut clock = LockstepClock::new(LockstepConfig {
            response_timeout: Some(ms(1000)),
            ..LockstepConfig::default()
        });
        clock.on_flushed(ms(0));
        assert!(clock.poll_timeout(ms(1000)));
        assert_eq!(clock.outstanding(), 1);

        clock.on_flushed(ms(1100));
        assert_eq!(clock.outstanding(), 2);

        // Reply to the first batch finally shows up.
        clock.on_response();
        assert!(clock.is_frozen());

        clock.on_response();
        assert!(!clock.is_frozen());
        assert_eq!(clock.outstanding(), 0);
    }

    #[test]
    fn test_late_response_before_next_flush_is_absorbed() {
        let mut clock = LockstepClock::new(LockstepConfig {
            response_timeout: Some(ms(1000)),
            ..LockstepConfig::default()
        });
        clock.on_flushed(ms(0));
        clock.poll_timeout(ms(1000));
        clock.on_response();
        assert_eq!(clock.outstanding(), 0);

        clock.on_flushed(ms(1200));
        assert!(clock.is_frozen());
        clock.on_response();
        assert!(!clock.is_frozen());
    }

    #[test]
    fn test_link_lost_disables_freezing() {
        let mut clock = LockstepClock::new(LockstepConfig::default());
        clock.on_flushed(ms(0));
        clock.on_link_lost();
        assert!(!clock.is_frozen());

        clock.on_flushed(ms(200));
        assert!(!clock.is_frozen());
        assert!(clock.is_link_lost());
    }
}
