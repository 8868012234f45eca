use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::IntroConfig;

/// Choreography of a freshly mounted book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntroPhase {
    /// Camera and book are snapped to the reading pose; brief hold.
    Laying,
    /// The cover is turning; advances by timer, not by animation state.
    Opening,
    /// Terminal; reading controls are live.
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntroChange {
    pub from: IntroPhase,
    pub to: IntroPhase,
}

#[derive(Debug, Clone)]
pub struct IntroDirector {
    phase: IntroPhase,
    entered_at: Instant,
    laying_hold: Duration,
    opening_duration: Duration,
}

impl IntroDirector {
    pub fn new(cfg: &IntroConfig, now: Instant) -> Self {
        Self {
            phase: IntroPhase::Laying,
            entered_at: now,
            laying_hold: cfg.laying_hold,
            opening_duration: cfg.opening_duration,
        }
    }

    pub fn phase(&self) -> IntroPhase {
        self.phase
    }

    pub fn is_interactive(&self) -> bool {
        self.phase == IntroPhase::Done
    }

    /// Start over from `Laying`, e.g. when another album is mounted.
    pub fn restart(&mut self, now: Instant) -> Option<IntroChange> {
        let from = self.phase;
        self.phase = IntroPhase::Laying;
        self.entered_at = now;
        (from != IntroPhase::Laying).then_some(IntroChange {
            from,
            to: IntroPhase::Laying,
        })
    }

    pub fn on_tick(&mut self, now: Instant) -> Option<IntroChange> {
        let elapsed = now.saturating_duration_since(self.entered_at);
        match self.phase {
            IntroPhase::Laying if elapsed >= self.laying_hold => {
                self.goto(IntroPhase::Opening, now)
            }
            IntroPhase::Opening if elapsed >= self.opening_duration => {
                self.goto(IntroPhase::Done, now)
            }
            _ => None,
        }
    }

    fn goto(&mut self, to: IntroPhase, now: Instant) -> Option<IntroChange> {
        if self.phase == to {
            return None;
        }
        let change = IntroChange {
            from: self.phase,
            to,
        };
        debug!(from = ?change.from, to = ?change.to, "intro phase");
        self.phase = to;
        self.entered_at = now;
        Some(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_advance_by_timer() {
        let t0 = Instant::now();
        let mut intro = IntroDirector::new(&IntroConfig::default(), t0);
        assert!(intro.on_tick(t0 + Duration::from_millis(100)).is_none());
        let ch = intro.on_tick(t0 + Duration::from_millis(150)).unwrap();
        assert_eq!((ch.from, ch.to), (IntroPhase::Laying, IntroPhase::Opening));
        assert!(!intro.is_interactive());
        assert!(intro.on_tick(t0 + Duration::from_millis(1100)).is_none());
        let ch = intro.on_tick(t0 + Duration::from_millis(1150)).unwrap();
        assert_eq!(ch.to, IntroPhase::Done);
        assert!(intro.is_interactive());
        assert!(intro.on_tick(t0 + Duration::from_secs(9)).is_none());
    }

    #[test]
    fn restart_returns_to_laying_and_resets_timer() {
        let t0 = Instant::now();
        let mut intro = IntroDirector::new(&IntroConfig::default(), t0);
        intro.on_tick(t0 + Duration::from_millis(200));
        let t1 = t0 + Duration::from_millis(500);
        assert_eq!(intro.restart(t1).unwrap().from, IntroPhase::Opening);
        assert!(intro.on_tick(t1 + Duration::from_millis(149)).is_none());
        assert!(intro.on_tick(t1 + Duration::from_millis(150)).is_some());
    }
}
