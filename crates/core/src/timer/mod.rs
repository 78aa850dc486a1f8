use std::fmt;

/// Milliseconds between two clock ticks.
pub const CLOCK_PERIOD_MS: f64 = 1_000.0;

/// Shortest period a timer is armed with; shorter requests are clamped.
pub const MIN_PERIOD_MS: f64 = 4.0;

/// The two periodic activities owned by the run controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// One-second elapsed time accumulation.
    Clock,
    /// Beat sound trigger, period derived from the current tempo.
    Beat,
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clock => f.write_str("clock"),
            Self::Beat => f.write_str("beat"),
        }
    }
}

/// Handle identifying one arming of a timer. Re-arming yields a fresh id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// A timer firing popped from [`TimerSet::pop_due`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Firing {
    pub kind: TimerKind,
    /// Scheduled time of this firing on the host clock, in milliseconds.
    pub due_ms: f64,
}

#[derive(Debug, Clone, Copy)]
struct PeriodicTimer {
    id: TimerId,
    period_ms: f64,
    next_due_ms: f64,
}

/// At most one periodic timer per [`TimerKind`], expressed on the host's
/// millisecond clock.
///
/// The set never looks at a wall clock itself; the owner decides what "now"
/// is and asks for due firings. Due times advance by exactly one period per
/// firing so a late host does not accumulate drift.
#[derive(Debug, Default)]
pub struct TimerSet {
    clock: Option<PeriodicTimer>,
    beat: Option<PeriodicTimer>,
    next_id: u64,
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms `kind` to fire every `period_ms`, first at `from_ms + period_ms`.
    /// Any timer of the same kind is replaced. Periods below
    /// [`MIN_PERIOD_MS`] (or NaN) are clamped to it.
    pub fn arm(&mut self, kind: TimerKind, period_ms: f64, from_ms: f64) -> TimerId {
        let period_ms = period_ms.max(MIN_PERIOD_MS);
        let id = TimerId(self.next_id);
        self.next_id += 1;
        *self.slot_mut(kind) = Some(PeriodicTimer {
            id,
            period_ms,
            next_due_ms: from_ms + period_ms,
        });
        id
    }

    /// Revokes the timer of `kind`. Returns whether one was armed.
    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        self.slot_mut(kind).take().is_some()
    }

    pub fn cancel_all(&mut self) {
        self.clock = None;
        self.beat = None;
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.slot(kind).is_some()
    }

    pub fn armed_count(&self) -> usize {
        usize::from(self.clock.is_some()) + usize::from(self.beat.is_some())
    }

    pub fn id(&self, kind: TimerKind) -> Option<TimerId> {
        self.slot(kind).map(|t| t.id)
    }

    pub fn period_ms(&self, kind: TimerKind) -> Option<f64> {
        self.slot(kind).map(|t| t.period_ms)
    }

    pub fn next_due_ms(&self, kind: TimerKind) -> Option<f64> {
        self.slot(kind).map(|t| t.next_due_ms)
    }

    /// Pops the earliest firing scheduled at or before `now_ms`.
    ///
    /// Ties go to the clock so that elapsed time is up to date before a beat
    /// scheduled at the same instant looks at the tempo. A timer whose due
    /// time can no longer move forward (the period is lost in the precision
    /// of the host time) fires once more and is then revoked.
    pub fn pop_due(&mut self, now_ms: f64) -> Option<Firing> {
        let kind = match (self.clock, self.beat) {
            (Some(c), Some(b)) if c.next_due_ms <= b.next_due_ms => TimerKind::Clock,
            (Some(_), Some(_)) => TimerKind::Beat,
            (Some(_), None) => TimerKind::Clock,
            (None, Some(_)) => TimerKind::Beat,
            (None, None) => return None,
        };

        let timer = self.slot_mut(kind).as_mut()?;
        if timer.next_due_ms > now_ms {
            return None;
        }
        let firing = Firing {
            kind,
            due_ms: timer.next_due_ms,
        };
        let next_due_ms = timer.next_due_ms + timer.period_ms;
        if next_due_ms > timer.next_due_ms {
            timer.next_due_ms = next_due_ms;
        } else {
            tracing::warn!(%kind, due_ms = firing.due_ms, "timer cannot advance, revoking it");
            self.cancel(kind);
        }
        Some(firing)
    }

    fn slot(&self, kind: TimerKind) -> Option<&PeriodicTimer> {
        match kind {
            TimerKind::Clock => self.clock.as_ref(),
            TimerKind::Beat => self.beat.as_ref(),
        }
    }

    fn slot_mut(&mut self, kind: TimerKind) -> &mut Option<PeriodicTimer> {
        match kind {
            TimerKind::Clock => &mut self.clock,
            TimerKind::Beat => &mut self.beat,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(timers: &mut TimerSet, now_ms: f64) -> Vec<(TimerKind, f64)> {
        std::iter::from_fn(|| timers.pop_due(now_ms))
            .map(|f| (f.kind, f.due_ms))
            .collect()
    }

    #[test]
    fn fires_in_time_order_with_clock_first_on_ties() {
        let mut timers = TimerSet::new();
        timers.arm(TimerKind::Clock, CLOCK_PERIOD_MS, 0.0);
        timers.arm(TimerKind::Beat, 500.0, 0.0);

        let fired = drain(&mut timers, 2_000.0);
        assert_eq!(
            fired,
            vec![
                (TimerKind::Beat, 500.0),
                (TimerKind::Clock, 1_000.0),
                (TimerKind::Beat, 1_000.0),
                (TimerKind::Beat, 1_500.0),
                (TimerKind::Clock, 2_000.0),
                (TimerKind::Beat, 2_000.0),
            ]
        );
        assert!(timers.pop_due(2_000.0).is_none());
    }

    #[test]
    fn nothing_fires_before_the_first_period() {
        let mut timers = TimerSet::new();
        timers.arm(TimerKind::Clock, CLOCK_PERIOD_MS, 250.0);
        assert!(timers.pop_due(1_249.0).is_none());
        assert_eq!(timers.pop_due(1_250.0).map(|f| f.due_ms), Some(1_250.0));
    }

    #[test]
    fn rearming_replaces_the_existing_timer() {
        let mut timers = TimerSet::new();
        let first = timers.arm(TimerKind::Beat, 400.0, 0.0);
        let second = timers.arm(TimerKind::Beat, 250.0, 0.0);

        assert_ne!(first, second);
        assert_eq!(timers.armed_count(), 1);
        assert_eq!(timers.id(TimerKind::Beat), Some(second));
        assert_eq!(timers.period_ms(TimerKind::Beat), Some(250.0));
        assert_eq!(drain(&mut timers, 500.0).len(), 2);
    }

    #[test]
    fn cancelled_timers_never_fire() {
        let mut timers = TimerSet::new();
        timers.arm(TimerKind::Clock, CLOCK_PERIOD_MS, 0.0);
        timers.arm(TimerKind::Beat, 300.0, 0.0);

        assert!(timers.cancel(TimerKind::Beat));
        assert!(!timers.cancel(TimerKind::Beat));
        assert!(!timers.is_armed(TimerKind::Beat));
        assert!(timers.is_armed(TimerKind::Clock));
        assert_eq!(drain(&mut timers, 1_000.0), vec![(TimerKind::Clock, 1_000.0)]);

        timers.cancel_all();
        assert_eq!(timers.armed_count(), 0);
        assert!(drain(&mut timers, 10_000.0).is_empty());
    }

    #[test]
    fn short_periods_are_clamped() {
        let mut timers = TimerSet::new();
        timers.arm(TimerKind::Beat, 60_000.0 / 1e300, 100.0);

        assert_eq!(timers.period_ms(TimerKind::Beat), Some(MIN_PERIOD_MS));
        assert_eq!(timers.next_due_ms(TimerKind::Beat), Some(100.0 + MIN_PERIOD_MS));
        assert_eq!(drain(&mut timers, 200.0).len(), 25);
    }

    #[test]
    fn due_times_strictly_increase() {
        let mut timers = TimerSet::new();
        timers.arm(TimerKind::Beat, 250.0, 0.0);
        let mut previous = timers.next_due_ms(TimerKind::Beat).unwrap();
        for _ in 0..8 {
            timers.pop_due(f64::MAX);
            let next = timers.next_due_ms(TimerKind::Beat).unwrap();
            assert!(next > previous);
            previous = next;
        }
    }

    #[test]
    fn timer_that_cannot_advance_is_revoked() {
        let mut timers = TimerSet::new();
        timers.arm(TimerKind::Beat, MIN_PERIOD_MS, 1e20);

        let fired = drain(&mut timers, 1e20);
        assert_eq!(fired, vec![(TimerKind::Beat, 1e20)]);
        assert!(!timers.is_armed(TimerKind::Beat));
    }

    #[test]
    fn fractional_periods_do_not_drift() {
        let mut timers = TimerSet::new();
        timers.arm(TimerKind::Beat, 60_000.0 / 180.0, 0.0);

        let fired = drain(&mut timers, 60_001.0);
        assert_eq!(fired.len(), 180);
        let last = fired.last().unwrap().1;
        assert!((last - 60_000.0).abs() < 1e-6);
    }
}
