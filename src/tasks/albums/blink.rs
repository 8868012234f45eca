use std::time::{Duration, Instant};

use crate::config::BlinkConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlinkPhase {
    Idle,
    /// Fading to black.
    Closing,
    /// Fully black; the scene swap happens on entry.
    Black,
    /// Fading back in.
    Revealing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlinkChange {
    pub from: BlinkPhase,
    pub to: BlinkPhase,
}

/// Fade-to-black transition that masks instantaneous scene swaps.
#[derive(Debug, Clone)]
pub struct Blink {
    phase: BlinkPhase,
    entered_at: Instant,
    fade_to_black: Duration,
    hold: Duration,
    reveal: Duration,
}

impl Blink {
    pub fn new(cfg: &BlinkConfig, now: Instant) -> Self {
        Self {
            phase: BlinkPhase::Idle,
            entered_at: now,
            fade_to_black: cfg.fade_to_black,
            hold: cfg.hold,
            reveal: cfg.reveal,
        }
    }

    pub fn phase(&self) -> BlinkPhase {
        self.phase
    }

    pub fn is_idle(&self) -> bool {
        self.phase == BlinkPhase::Idle
    }

    /// Begin a blink; ignored unless idle.
    pub fn start(&mut self, now: Instant) -> Option<BlinkChange> {
        if self.phase != BlinkPhase::Idle {
            return None;
        }
        self.goto(BlinkPhase::Closing, now)
    }

    pub fn on_tick(&mut self, now: Instant) -> Option<BlinkChange> {
        let elapsed = now.saturating_duration_since(self.entered_at);
        match self.phase {
            BlinkPhase::Closing if elapsed >= self.fade_to_black => {
                self.goto(BlinkPhase::Black, now)
            }
            BlinkPhase::Black if elapsed >= self.hold => self.goto(BlinkPhase::Revealing, now),
            BlinkPhase::Revealing if elapsed >= self.reveal => self.goto(BlinkPhase::Idle, now),
            _ => None,
        }
    }

    /// Opacity of the black overlay at `now`.
    pub fn opacity(&self, now: Instant) -> f32 {
        let elapsed = now.saturating_duration_since(self.entered_at).as_secs_f32();
        let fraction = |span: Duration| (elapsed / span.as_secs_f32().max(f32::EPSILON)).clamp(0.0, 1.0);
        match self.phase {
            BlinkPhase::Idle => 0.0,
            BlinkPhase::Closing => fraction(self.fade_to_black),
            BlinkPhase::Black => 1.0,
            BlinkPhase::Revealing => 1.0 - fraction(self.reveal),
        }
    }

    fn goto(&mut self, to: BlinkPhase, now: Instant) -> Option<BlinkChange> {
        if self.phase == to {
            return None;
        }
        let change = BlinkChange {
            from: self.phase,
            to,
        };
        self.phase = to;
        self.entered_at = now;
        Some(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_cycle() {
        let t0 = Instant::now();
        let mut blink = Blink::new(&BlinkConfig::default(), t0);
        assert_eq!(blink.opacity(t0), 0.0);
        blink.start(t0).unwrap();
        assert!(blink.start(t0).is_none());
        assert!((blink.opacity(t0 + Duration::from_millis(150)) - 0.5).abs() < 1e-3);

        let t_black = t0 + Duration::from_millis(300);
        assert_eq!(blink.on_tick(t_black).unwrap().to, BlinkPhase::Black);
        assert_eq!(blink.opacity(t_black), 1.0);
        let t_reveal = t_black + Duration::from_millis(100);
        assert_eq!(blink.on_tick(t_reveal).unwrap().to, BlinkPhase::Revealing);
        assert!(blink.on_tick(t_reveal + Duration::from_millis(499)).is_none());
        assert_eq!(
            blink.on_tick(t_reveal + Duration::from_millis(500)).unwrap().to,
            BlinkPhase::Idle
        );
        assert!(blink.is_idle());
    }
}
