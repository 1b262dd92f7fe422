use chrono::{DateTime, NaiveDate, Utc};

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Hours elapsed from `from` to `to`, negative if `to` is earlier.
pub fn elapsed_hours(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    to.signed_duration_since(from).num_milliseconds() as f64 / MILLIS_PER_HOUR
}

/// `round(part / whole * 100)`, or 0 when `whole` is zero.
pub(crate) fn rounded_percent(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    (part as f64 / whole as f64 * 100.0).round() as u32
}

/// Occupancy of a fixed-capacity pool, clamped to 100.
pub(crate) fn capped_percent(part: usize, capacity: u32) -> u32 {
    rounded_percent(part, capacity as usize).min(100)
}

pub(crate) fn round_hours(value: f64) -> u32 {
    value.round().max(0.0) as u32
}

/// Short chart label, e.g. `Jun 05`.
pub(crate) fn short_label(date: NaiveDate) -> String {
    date.format("%b %d").to_string()
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Mean {
    total: f64,
    count: usize,
}

impl Mean {
    pub(crate) fn push(&mut self, value: f64) {
        self.total += value;
        self.count += 1;
    }

    pub(crate) fn count(&self) -> usize {
        self.count
    }

    pub(crate) fn value(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }

    pub(crate) fn rounded(&self) -> u32 {
        round_hours(self.value())
    }
}
