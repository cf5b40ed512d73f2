use std::time::{Duration, Instant};

/// Fixed-interval tick source driven by caller-supplied instants.
#[derive(Debug, Clone, Copy)]
pub struct Ticker {
    interval: Duration,
    next_tick: Instant,
}

impl Ticker {
    pub fn new(interval: Duration, now: Instant) -> Self {
        let interval = interval.max(Duration::from_millis(1));
        Self {
            interval,
            next_tick: now + interval,
        }
    }

    pub fn next_tick(&self) -> Instant {
        self.next_tick
    }

    /// Number of whole intervals elapsed since the last call. Late polls
    /// catch up on every missed tick.
    pub fn due(&mut self, now: Instant) -> u32 {
        if now < self.next_tick {
            return 0;
        }
        let behind = now.saturating_duration_since(self.next_tick);
        let ticks = (behind.as_nanos() / self.interval.as_nanos()) as u32 + 1;
        self.next_tick += self.interval * ticks;
        ticks
    }
}

#[cfg(test)]
mod tests {
    use super::Ticker;
    use std::time::{Duration, Instant};

    #[test]
    fn nothing_due_before_first_interval() {
        let start = Instant::now();
        let mut ticker = Ticker::new(Duration::from_millis(100), start);
        assert_eq!(ticker.due(start + Duration::from_millis(99)), 0);
        assert_eq!(ticker.next_tick(), start + Duration::from_millis(100));
    }

    #[test]
    fn late_poll_catches_up() {
        let start = Instant::now();
        let mut ticker = Ticker::new(Duration::from_millis(100), start);
        assert_eq!(ticker.due(start + Duration::from_millis(100)), 1);
        assert_eq!(ticker.due(start + Duration::from_millis(450)), 3);
        assert_eq!(ticker.next_tick(), start + Duration::from_millis(500));
        assert_eq!(ticker.due(start + Duration::from_millis(450)), 0);
    }
}
