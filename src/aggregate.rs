//! Group records by a key and compute per-group metrics.
use crate::record::Record;
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unknown dimension '{0}', expected one of state, payment-type, category, category-english, status, month")]
    UnknownDimension(String),
}

/// Names of the metrics computed by [`summarize()`](function::summarize()).
pub const REVENUE: &str = "revenue";
pub const REVIEW: &str = "review";
pub const DELIVERY: &str = "delivery";
pub const FREIGHT: &str = "freight";
pub const CANCEL_RATE: &str = "cancel_rate";
/// The group size, available for every set of groups.
pub const COUNT: &str = "count";

/// A numeric quantity of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Field {
    Price,
    Freight,
    Payment,
    Review,
    /// Derived from purchase and delivery timestamps.
    DeliveryDays,
}

impl Field {
    pub fn of(self, record: &Record) -> f64 {
        match self {
            Field::Price => record.price,
            Field::Freight => record.freight_value,
            Field::Payment => record.payment_value,
            Field::Review => record.review_score,
            Field::DeliveryDays => record.delivery_days(),
        }
    }
}

/// A categorical property of a record to group by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Dimension {
    State,
    PaymentType,
    Category,
    /// The translated category name, or the original one if there is no translation.
    CategoryEnglish,
    Status,
    /// The purchase month as `YYYY-MM`.
    Month,
}

impl Dimension {
    /// The key of `record`, or `None` if it has no usable value for this dimension.
    pub fn key(self, record: &Record) -> Option<String> {
        let key = match self {
            Dimension::State => record.customer_state.as_str(),
            Dimension::PaymentType => record.payment_type.as_str(),
            Dimension::Category => record.product_category.as_str(),
            Dimension::CategoryEnglish => record
                .product_category_english
                .as_deref()
                .unwrap_or(&record.product_category),
            Dimension::Status => record.order_status.as_str(),
            Dimension::Month => return record.purchase_month().and_then(month_label),
        };
        (!key.is_empty()).then(|| key.to_owned())
    }

    pub fn name(self) -> &'static str {
        match self {
            Dimension::State => "state",
            Dimension::PaymentType => "payment-type",
            Dimension::Category => "category",
            Dimension::CategoryEnglish => "category-english",
            Dimension::Status => "status",
            Dimension::Month => "month",
        }
    }
}

impl std::str::FromStr for Dimension {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "state" => Dimension::State,
            "payment-type" | "payment_type" => Dimension::PaymentType,
            "category" => Dimension::Category,
            "category-english" | "category_english" => Dimension::CategoryEnglish,
            "status" => Dimension::Status,
            "month" => Dimension::Month,
            _ => return Err(Error::UnknownDimension(s.into())),
        })
    }
}

static MONTH_FORMAT: &[time::format_description::FormatItem<'static>] =
    time::macros::format_description!("[year]-[month]");

pub(crate) fn month_label(month: time::Date) -> Option<String> {
    month.format(MONTH_FORMAT).ok()
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Predicate {
    StatusIs(String),
    StatusIsNot(String),
    PaymentTypeIs(String),
}

impl Predicate {
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Predicate::StatusIs(status) => record.order_status == *status,
            Predicate::StatusIsNot(status) => record.order_status != *status,
            Predicate::PaymentTypeIs(kind) => record.payment_type == *kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Metric {
    /// The sum of all finite values of the field.
    Sum(Field),
    /// The mean of all finite values of the field.
    Mean(Field),
    Count,
    /// The share of rows in the group for which the predicate holds.
    Ratio(Predicate),
}

impl Metric {
    /// Compute the metric over `rows`, returning `None` if no row contributed a valid value.
    pub fn compute(&self, rows: &[&Record]) -> Option<f64> {
        let finite = |field: Field| {
            rows.iter()
                .map(|r| field.of(r))
                .filter(|v| v.is_finite())
                .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1))
        };
        match self {
            Metric::Sum(field) => match finite(*field) {
                (_, 0) => None,
                (sum, _) => Some(sum),
            },
            Metric::Mean(field) => match finite(*field) {
                (_, 0) => None,
                (sum, n) => Some(sum / n as f64),
            },
            Metric::Count => Some(rows.len() as f64),
            Metric::Ratio(predicate) => (!rows.is_empty()).then(|| {
                rows.iter().filter(|r| predicate.matches(r)).count() as f64 / rows.len() as f64
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MetricSpec {
    pub name: String,
    pub metric: Metric,
}

impl MetricSpec {
    pub fn new(name: impl Into<String>, metric: Metric) -> Self {
        MetricSpec {
            name: name.into(),
            metric,
        }
    }
}

/// The metrics of a single group, in the order of [`Groups::metrics`].
#[derive(Debug, Clone, PartialEq)]
pub struct GroupMetrics {
    pub count: usize,
    /// `None` means no row of the group had a valid value for the metric.
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Groups {
    pub metrics: Vec<MetricSpec>,
    /// Ordered by key so results are deterministic.
    pub groups: BTreeMap<String, GroupMetrics>,
}

impl Groups {
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.groups.keys().map(String::as_str)
    }

    /// Return the position of the metric called `name` in [`Groups::metrics`].
    pub fn metric_index(&self, name: &str) -> Option<usize> {
        self.metrics.iter().position(|spec| spec.name == name)
    }

    /// All `(key, value)` pairs of the metric called `name` in key order, or `None` if there is no such metric.
    ///
    /// [`COUNT`] is always available, even if it wasn't requested explicitly.
    pub fn column(&self, name: &str) -> Option<Vec<(&str, Option<f64>)>> {
        let index = self.metric_index(name);
        if index.is_none() && name != COUNT {
            return None;
        }
        Some(
            self.groups
                .iter()
                .map(|(key, group)| {
                    let value = match index {
                        Some(index) => group.values[index],
                        None => Some(group.count as f64),
                    };
                    (key.as_str(), value)
                })
                .collect(),
        )
    }

    /// The value of metric `name` for the group `key`.
    pub fn value(&self, key: &str, name: &str) -> Option<f64> {
        let group = self.groups.get(key)?;
        match self.metric_index(name) {
            Some(index) => group.values[index],
            None if name == COUNT => Some(group.count as f64),
            None => None,
        }
    }

    /// Interpret these groups as produced by [`summarize()`](function::summarize()).
    /// Metrics that weren't computed are `None`.
    pub fn summaries(&self) -> Vec<Group> {
        self.groups
            .keys()
            .map(|key| Group {
                key: key.clone(),
                count: self.groups[key].count,
                total_revenue: self.value(key, REVENUE),
                average_review_score: self.value(key, REVIEW),
                average_delivery_days: self.value(key, DELIVERY),
                average_freight: self.value(key, FREIGHT),
                cancel_rate: self.value(key, CANCEL_RATE),
            })
            .collect()
    }
}

/// The standard summary of a group of orders.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub key: String,
    pub count: usize,
    pub total_revenue: Option<f64>,
    pub average_review_score: Option<f64>,
    pub average_delivery_days: Option<f64>,
    pub average_freight: Option<f64>,
    /// The share of orders that weren't delivered.
    pub cancel_rate: Option<f64>,
}

/// The metrics making up a [`Group`].
pub fn summary_metrics() -> Vec<MetricSpec> {
    vec![
        MetricSpec::new(REVENUE, Metric::Sum(Field::Payment)),
        MetricSpec::new(REVIEW, Metric::Mean(Field::Review)),
        MetricSpec::new(DELIVERY, Metric::Mean(Field::DeliveryDays)),
        MetricSpec::new(FREIGHT, Metric::Mean(Field::Freight)),
        MetricSpec::new(
            CANCEL_RATE,
            Metric::Ratio(Predicate::StatusIsNot("delivered".into())),
        ),
    ]
}

pub(crate) mod function {
    use crate::aggregate::{summary_metrics, Dimension, Group, GroupMetrics, Groups, MetricSpec};
    use crate::record::Record;
    use std::collections::BTreeMap;

    /// Partition `records` by `key_fn` and compute `metrics` for each partition.
    ///
    /// Records for which `key_fn` returns `None` are left out.
    pub fn aggregate<'a, K: Into<String>>(
        records: impl IntoIterator<Item = &'a Record>,
        key_fn: impl Fn(&Record) -> Option<K>,
        metrics: &[MetricSpec],
    ) -> Groups {
        let mut members = BTreeMap::<String, Vec<&Record>>::new();
        let mut excluded = 0usize;
        for record in records {
            match key_fn(record) {
                Some(key) => members.entry(key.into()).or_default().push(record),
                None => excluded += 1,
            }
        }
        if excluded > 0 {
            log::debug!("{excluded} rows had no group key and were left out");
        }

        let groups = members
            .into_iter()
            .map(|(key, rows)| {
                let values = metrics.iter().map(|spec| spec.metric.compute(&rows)).collect();
                (
                    key,
                    GroupMetrics {
                        count: rows.len(),
                        values,
                    },
                )
            })
            .collect();
        Groups {
            metrics: metrics.to_vec(),
            groups,
        }
    }

    /// Group by `dimension` and compute the metrics of a [`Group`].
    pub fn summarize<'a>(
        records: impl IntoIterator<Item = &'a Record>,
        dimension: Dimension,
    ) -> Groups {
        aggregate(records, |r| dimension.key(r), &summary_metrics())
    }

    /// The summary of all `records` as a single group keyed `all`.
    pub fn overall<'a>(records: impl IntoIterator<Item = &'a Record>) -> Group {
        aggregate(records, |_| Some("all"), &summary_metrics())
            .summaries()
            .pop()
            .unwrap_or_else(|| Group {
                key: "all".into(),
                count: 0,
                total_revenue: None,
                average_review_score: None,
                average_delivery_days: None,
                average_freight: None,
                cancel_rate: None,
            })
    }
}
