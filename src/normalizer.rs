use chrono::{NaiveDateTime, TimeDelta};

/// Corrects timestamps from layouts that lose AM/PM or the day.
///
/// Assumes the source log was written in non-decreasing time order. When a
/// parsed date is earlier than the previous one it is moved forward by 12
/// hours (at most twice), and the shift is kept for every later date.
#[derive(Debug, Clone)]
pub struct DateNormalizer {
    enabled: bool,
    last: Option<NaiveDateTime>,
    adjustment: TimeDelta,
    unresolved: usize,
}

impl Default for DateNormalizer {
    fn default() -> Self {
        Self::new(true)
    }
}

impl DateNormalizer {
    const STEP_HOURS: i64 = 12;
    const MAX_STEPS: usize = 2;

    pub fn new(enabled: bool) -> Self {
        DateNormalizer {
            enabled,
            last: None,
            adjustment: TimeDelta::zero(),
            unresolved: 0,
        }
    }

    pub fn normalize(&mut self, parsed: NaiveDateTime) -> NaiveDateTime {
        let mut current = parsed + self.adjustment;

        if let Some(last) = self.last {
            if self.enabled {
                let step = TimeDelta::hours(Self::STEP_HOURS);
                let mut corrected = current;
                let mut steps = 0;
                while corrected < last && steps < Self::MAX_STEPS {
                    corrected += step;
                    steps += 1;
                }

                if corrected < last {
                    self.unresolved += 1;
                    log::warn!(
                        "date {} is still before {} after {} hours of correction; keeping it uncorrected",
                        current,
                        last,
                        Self::STEP_HOURS * Self::MAX_STEPS as i64
                    );
                } else if steps > 0 {
                    log::debug!("corrected {} to {}", current, corrected);
                    self.adjustment += step * steps as i32;
                    current = corrected;
                }
            } else if current < last {
                log::debug!("date {} is before {}", current, last);
            }
        }

        self.last = Some(current);
        current
    }

    /// Total shift applied so far.
    pub fn adjustment(&self) -> TimeDelta {
        self.adjustment
    }

    /// Dates that stayed out of order after correction.
    pub fn unresolved(&self) -> usize {
        self.unresolved
    }

    pub fn last(&self) -> Option<NaiveDateTime> {
        self.last
    }
}
