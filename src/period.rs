//! Month buckets and the comparison of the last two complete months.
use crate::record::Record;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Not enough complete months for a trend comparison: need 2, found {complete}")]
    InsufficientHistory { complete: usize },
}

pub use function::{buckets, complete_buckets};

/// The minimal span in days between the first and the last purchase of a month to consider it complete.
pub const COMPLETE_MONTH_MIN_SPAN_DAYS: f64 = 25.0;

/// All records purchased in one calendar month.
#[derive(Debug, Clone)]
pub struct Bucket<'a> {
    /// The first day of the month.
    pub month: time::Date,
    pub records: Vec<&'a Record>,
}

impl Bucket<'_> {
    /// The days between the earliest and the latest purchase in this month.
    pub fn span_days(&self) -> f64 {
        let mut timestamps = self.records.iter().filter_map(|r| r.purchased_at);
        let Some(first) = timestamps.next() else {
            return 0.0;
        };
        let (min, max) = timestamps.fold((first, first), |(min, max), t| (min.min(t), max.max(t)));
        (max - min).as_seconds_f64() / (60.0 * 60.0 * 24.0)
    }

    pub fn is_complete(&self) -> bool {
        self.span_days() >= COMPLETE_MONTH_MIN_SPAN_DAYS
    }

    /// The month as `YYYY-MM`.
    pub fn label(&self) -> String {
        crate::aggregate::month_label(self.month).unwrap_or_default()
    }
}

/// The change of a metric between two periods.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Delta {
    pub previous: Option<f64>,
    pub current: Option<f64>,
    /// `current - previous`, `None` if either side has no data.
    pub delta: Option<f64>,
    /// `delta / previous * 100`, or 0 if `previous` is zero. `None` if either side has no data.
    pub percent_change: Option<f64>,
}

/// Compare `current` to `previous`.
pub fn period_delta(previous: Option<f64>, current: Option<f64>) -> Delta {
    let delta = previous.zip(current).map(|(previous, current)| current - previous);
    let percent_change = match (previous, delta) {
        (Some(previous), Some(_)) if previous == 0.0 => Some(0.0),
        (Some(previous), Some(delta)) => Some(delta / previous * 100.0),
        _ => None,
    };
    Delta {
        previous,
        current,
        delta,
        percent_change,
    }
}

/// Revenue, review score and delivery time of the last complete month compared to the one before.
#[derive(Debug, Clone, PartialEq)]
pub struct Trend {
    pub previous_month: String,
    pub current_month: String,
    pub revenue: Delta,
    pub review: Delta,
    pub delivery: Delta,
}

pub(crate) mod function {
    use crate::aggregate::{Field, Metric};
    use crate::period::{period_delta, Bucket, Error, Trend};
    use crate::record::Record;
    use std::collections::BTreeMap;

    /// Group `records` by purchase month in chronological order. Records without a valid purchase
    /// timestamp belong to no month.
    pub fn buckets<'a>(records: impl IntoIterator<Item = &'a Record>) -> Vec<Bucket<'a>> {
        let mut months = BTreeMap::<time::Date, Vec<&'a Record>>::new();
        for record in records {
            if let Some(month) = record.purchase_month() {
                months.entry(month).or_default().push(record);
            }
        }
        months
            .into_iter()
            .map(|(month, records)| Bucket { month, records })
            .collect()
    }

    /// Like [`buckets()`], but only months whose purchases span enough days to be complete.
    pub fn complete_buckets<'a>(records: impl IntoIterator<Item = &'a Record>) -> Vec<Bucket<'a>> {
        buckets(records)
            .into_iter()
            .filter(|bucket| {
                let complete = bucket.is_complete();
                if !complete {
                    log::debug!(
                        "month {} spans only {:.1} days and is skipped",
                        bucket.label(),
                        bucket.span_days()
                    );
                }
                complete
            })
            .collect()
    }

    /// Compare the last complete month with the complete month before it.
    pub fn trend<'a>(records: impl IntoIterator<Item = &'a Record>) -> Result<Trend, Error> {
        let mut complete = complete_buckets(records);
        let found = complete.len();
        let (Some(current), Some(previous)) = (complete.pop(), complete.pop()) else {
            log::warn!("Not enough full months for trend comparison");
            return Err(Error::InsufficientHistory { complete: found });
        };

        let compare = |metric: Metric| {
            period_delta(
                metric.compute(&previous.records),
                metric.compute(&current.records),
            )
        };
        Ok(Trend {
            previous_month: previous.label(),
            current_month: current.label(),
            revenue: compare(Metric::Sum(Field::Payment)),
            review: compare(Metric::Mean(Field::Review)),
            delivery: compare(Metric::Mean(Field::DeliveryDays)),
        })
    }
}
