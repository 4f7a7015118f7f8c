//! The dashboard pages: regional performance, payment behaviour and product categories.
//!
//! Every page is recomputed from scratch out of the records and its [`ViewState`], and yields
//! series and notes for a [`SeriesConsumer`]. Pages fail independently of each other.
use crate::aggregate::{
    self, Dimension, Field, Group, Groups, Metric, MetricSpec, COUNT, DELIVERY, FREIGHT, REVENUE,
    REVIEW,
};
use crate::distribution::{self, PAYMENT_BIN_LABELS, PAYMENT_EDGES};
use crate::format_brl;
use crate::geo;
use crate::period::{self, Delta, Trend};
use crate::rank::{self, Direction, Extreme, Threshold};
use crate::record::Record;
use crate::series::{self, ScatterSeries, Series, SeriesConsumer};
use crate::view::{SortSpec, ViewState};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("The '{view}' view has no data for the current selection")]
    Empty { view: &'static str },
    #[error(transparent)]
    Rank(#[from] rank::Error),
}

/// Everything a page wants to show.
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    pub name: &'static str,
    pub series: Vec<Series>,
    pub scatter: Vec<ScatterSeries>,
    pub notes: Vec<String>,
}

impl View {
    /// An empty page, noting the active filter if there is one.
    fn new(name: &'static str, state: &ViewState) -> Self {
        View {
            name,
            series: Vec::new(),
            scatter: Vec::new(),
            notes: state.filter.iter().map(|_| state.filter_label()).collect(),
        }
    }

    /// Hand all series, scatter plots and notes to `consumer`.
    pub fn emit(&self, consumer: &mut impl SeriesConsumer) -> Result<(), series::Error> {
        for series in &self.series {
            consumer.receive(self.name, series)?;
        }
        for scatter in &self.scatter {
            consumer.receive_points(self.name, scatter)?;
        }
        for note in &self.notes {
            consumer.note(self.name, note)?;
        }
        Ok(())
    }
}

/// The state of each page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardState {
    pub regional: ViewState,
    pub payments: ViewState,
    pub categories: ViewState,
}

impl Default for DashboardState {
    fn default() -> Self {
        DashboardState {
            regional: ViewState::new(Dimension::State),
            payments: ViewState::new(Dimension::PaymentType),
            categories: ViewState::new(Dimension::Category),
        }
    }
}

pub struct Dashboard {
    /// The summary of everything the regional filter lets through.
    pub kpis: Group,
    pub trend: Result<Trend, period::Error>,
    pub regional: Result<View, Error>,
    pub payments: Result<View, Error>,
    pub categories: Result<View, Error>,
}

/// Compute all pages. A page that fails is logged and doesn't keep the others from being computed.
pub fn dashboard(records: &[Record], state: &DashboardState) -> Dashboard {
    let warn_on_error = |result: Result<View, Error>| {
        if let Err(err) = &result {
            log::warn!("{err}");
        }
        result
    };
    Dashboard {
        kpis: crate::overall(state.regional.select(records)),
        trend: crate::trend(state.regional.select(records)),
        regional: warn_on_error(regional(records, &state.regional)),
        payments: warn_on_error(payments(records, &state.payments)),
        categories: warn_on_error(categories(records, &state.categories)),
    }
}

/// The key cards, like `Total revenue: R$ 1.234,56`.
pub fn kpi_notes(kpis: &Group) -> Vec<String> {
    vec![
        format!("Total revenue: {}", format_brl(kpis.total_revenue)),
        format!(
            "Average review: {}",
            kpis.average_review_score
                .map(|v| format!("{v:.2} ★"))
                .unwrap_or_else(|| "no data".into())
        ),
        format!(
            "Average delivery: {}",
            kpis.average_delivery_days
                .map(|v| format!("{v:.1} days"))
                .unwrap_or_else(|| "no data".into())
        ),
        format!("Orders: {}", kpis.count),
    ]
}

fn arrow(delta: f64) -> &'static str {
    if delta > 0.0 {
        "↑"
    } else if delta < 0.0 {
        "↓"
    } else {
        "–"
    }
}

/// Describe the change from the previous to the current month.
pub fn trend_notes(trend: &Trend) -> Vec<String> {
    let Trend {
        previous_month,
        current_month,
        revenue,
        review,
        delivery,
    } = trend;
    let mut notes = vec![format!("Comparing {current_month} to {previous_month}")];
    if let Some(change) = revenue.percent_change {
        notes.push(format!(
            "Revenue {}{:.1}% from last month",
            arrow(change),
            change.abs()
        ));
    }
    if let Delta {
        delta: Some(change),
        ..
    } = review
    {
        notes.push(format!(
            "Review score {}{:.1} from last month",
            arrow(*change),
            change.abs()
        ));
    }
    notes.push(match delivery.delta {
        Some(change) => format!(
            "Delivery time {}{:.1} days {}",
            arrow(change),
            change.abs(),
            if change < 0.0 {
                "improvement"
            } else if change > 0.0 {
                "longer"
            } else {
                "unchanged"
            }
        ),
        None => "Delivery time: no data".into(),
    });
    notes
}

/// Keys in the order given by `sort`, or in key order if the sort metric isn't available.
fn ordered_keys(groups: &Groups, sort: &SortSpec) -> Vec<String> {
    rank::ordered_keys(groups, &sort.metric, sort.direction)
        .unwrap_or_else(|_| groups.keys().map(ToOwned::to_owned).collect())
}

fn series_of(
    name: &str,
    groups: &Groups,
    keys: &[String],
    metric: &str,
    state: &ViewState,
    label: impl Fn(&str) -> String,
) -> Series {
    let mut series = Series::new(
        name,
        keys.iter().map(|key| (key.clone(), groups.value(key, metric))),
    )
    .with_highlight(|key| state.is_highlighted(key));
    series.labels = series.labels.iter().map(|key| label(key)).collect();
    series
}

fn or_no_data<T>(
    result: Result<T, rank::Error>,
    describe: impl FnOnce(T) -> String,
) -> Result<String, Error> {
    match result {
        Ok(value) => Ok(describe(value)),
        Err(rank::Error::InsufficientData { metric }) => {
            Ok(format!("Insufficient data for comparison by {metric}"))
        }
        Err(err) => Err(err.into()),
    }
}

/// Revenue, delivery time, review score and freight per state, along with the map summary.
pub fn regional(records: &[Record], state: &ViewState) -> Result<View, Error> {
    let groups = crate::summarize(state.select(records), Dimension::State);
    if groups.is_empty() {
        return Err(Error::Empty { view: "regional" });
    }
    let keys = ordered_keys(&groups, &state.sort);
    let mut view = View::new("regional", state);
    for (name, metric) in [
        ("Revenue (R$)", REVENUE),
        ("Avg Delivery Time (days)", DELIVERY),
        ("Avg Review Score", REVIEW),
        ("Avg Freight (R$)", FREIGHT),
    ] {
        view.series
            .push(series_of(name, &groups, &keys, metric, state, str::to_owned));
    }

    view.notes.push(or_no_data(
        rank::share_of_total(&groups, REVENUE, 5),
        |share| match share {
            Some(share) => format!("Top 5 states account for {share:.1}% of total revenue"),
            None => "No revenue recorded for any state".into(),
        },
    )?);
    view.notes.push(or_no_data(
        rank::extremum(&groups, REVENUE, Extreme::Max),
        |top| {
            format!(
                "Top performing state: {} with {}",
                geo::full_name(&top.key),
                format_brl(Some(top.value))
            )
        },
    )?);
    view.notes.push(or_no_data(
        rank::extremum(&groups, DELIVERY, Extreme::Min),
        |top| {
            format!(
                "Fastest delivery: {} with {:.1} days avg",
                geo::full_name(&top.key),
                top.value
            )
        },
    )?);
    view.notes.push(or_no_data(
        rank::extremum(&groups, REVIEW, Extreme::Max),
        |top| {
            format!(
                "Highest satisfaction: {} with {:.1} ★",
                geo::full_name(&top.key),
                top.value
            )
        },
    )?);
    Ok(view)
}

/// A readable name for a payment type as found in the data.
pub fn payment_label(kind: &str) -> String {
    match kind {
        "credit_card" => "Credit Card".into(),
        "debit_card" => "Debit Card".into(),
        "boleto" => "Boleto".into(),
        "voucher" => "Voucher".into(),
        "" => "Unknown".into(),
        other => {
            let mut chars = other.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }
    }
}

const AVG_PAYMENT: &str = "avg_payment";
const CREDIT_CARD: &str = "credit_card";

/// Average payment and review per payment type, the distribution of order values, payment types
/// per category and the payment insight cards.
pub fn payments(records: &[Record], state: &ViewState) -> Result<View, Error> {
    let selected: Vec<&Record> = state.select(records).collect();
    let groups = crate::aggregate(
        selected.iter().copied(),
        |r| Dimension::PaymentType.key(r),
        &[
            MetricSpec::new(AVG_PAYMENT, Metric::Mean(Field::Payment)),
            MetricSpec::new(REVIEW, Metric::Mean(Field::Review)),
            MetricSpec::new(COUNT, Metric::Count),
        ],
    );
    if groups.is_empty() {
        return Err(Error::Empty { view: "payments" });
    }
    let keys = ordered_keys(&groups, &state.sort);
    let mut view = View::new("payments", state);
    view.series.push(series_of(
        "Avg Payment Value (R$)",
        &groups,
        &keys,
        AVG_PAYMENT,
        state,
        payment_label,
    ));
    view.series.push(series_of(
        "Avg Review Score",
        &groups,
        &keys,
        REVIEW,
        state,
        payment_label,
    ));
    view.notes.push(or_no_data(
        rank::extremum(&groups, AVG_PAYMENT, Extreme::Min),
        |low| format!("{} payments typically smaller", payment_label(&low.key)),
    )?);
    view.notes.push(or_no_data(
        rank::extremum(&groups, REVIEW, Extreme::Min),
        |low| format!("{} shows lower satisfaction", payment_label(&low.key)),
    )?);

    let histogram = distribution::histogram(
        selected.iter().copied(),
        Dimension::PaymentType,
        Field::Payment,
        &PAYMENT_EDGES,
    );
    for (kind, counts) in &histogram.counts {
        view.series.push(
            Series::new(
                payment_label(kind),
                PAYMENT_BIN_LABELS
                    .iter()
                    .zip(counts)
                    .map(|(label, count)| (label.to_string(), Some(*count as f64))),
            )
            .with_highlight(|_| state.is_highlighted(kind)),
        );
    }
    if let Some(share) = histogram.bin_share(CREDIT_CARD, [2, 3]) {
        view.notes.push(format!(
            "Credit card usage in higher value orders is {:.0}%",
            share * 100.0
        ));
    }

    let by_category = distribution::cross_tab(
        selected.iter().copied(),
        Dimension::Category,
        Dimension::PaymentType,
    );
    let categories: Vec<&String> = by_category.cells.keys().collect();
    for kind in by_category.columns() {
        view.series.push(
            Series::new(
                format!("{} by category", payment_label(kind)),
                categories
                    .iter()
                    .map(|category| ((*category).clone(), Some(by_category.get(category, kind) as f64))),
            )
            .with_highlight(|_| state.is_highlighted(kind)),
        );
    }
    view.notes.push(match by_category.dominant(CREDIT_CARD) {
        Some((category, share)) => format!(
            "{category} dominated by credit cards ({:.0}%)",
            share * 100.0
        ),
        None => "No clear leader by credit card usage".into(),
    });

    let only_one = groups.len() < 2;
    view.notes.push(or_no_data(
        rank::compare_to_average(&groups, AVG_PAYMENT),
        |highest| {
            format!(
                "Highest average payment: {} with {}, {}",
                payment_label(&highest.top.key),
                format_brl(Some(highest.top.value)),
                match highest.deviation_percent {
                    Some(deviation) if !only_one => format!(
                        "{:.0}% {} than average",
                        deviation.abs(),
                        if deviation >= 0.0 { "higher" } else { "lower" }
                    ),
                    _ => "only method shown".into(),
                }
            )
        },
    )?);
    view.notes.push(or_no_data(
        rank::compare_to_average(&groups, REVIEW),
        |best| {
            format!(
                "Best customer feedback: {} with {:.2} ★, {}",
                payment_label(&best.top.key),
                best.top.value,
                match best.deviation_percent {
                    Some(deviation) if !only_one => format!(
                        "{:.0}% {} satisfaction",
                        deviation.abs(),
                        if deviation >= 0.0 { "higher" } else { "lower" }
                    ),
                    _ => "only method shown".into(),
                }
            )
        },
    )?);
    let most_used = rank::extremum(&groups, COUNT, Extreme::Max)?;
    if let Some(share) = rank::share_of_total(&groups, COUNT, 1)? {
        view.notes.push(format!(
            "{} dominance with {share:.1}% of orders",
            payment_label(&most_used.key)
        ));
    }
    Ok(view)
}

const TOP_CATEGORIES: usize = 10;
const QUADRANT_MIN_REVIEW: f64 = 4.0;

/// Revenue, satisfaction and cancellations per product category, their top lists and the category insight cards.
///
/// Categories without positive revenue are left out.
pub fn categories(records: &[Record], state: &ViewState) -> Result<View, Error> {
    let mut groups = crate::summarize(state.select(records), Dimension::Category);
    let revenue = groups.metric_index(REVENUE);
    groups.groups.retain(|key, group| {
        let keep = revenue
            .and_then(|index| group.values[index])
            .map_or(false, |revenue| revenue > 0.0);
        if !keep {
            log::debug!("category '{key}' has no revenue and is left out");
        }
        keep
    });
    if groups.is_empty() {
        return Err(Error::Empty { view: "categories" });
    }
    let mut view = View::new("categories", state);
    let top_series = |name: &str, metric: &str, scale: f64| -> Result<(Series, rank::Ranked), Error> {
        let top = rank::top_n(&groups, metric, TOP_CATEGORIES, Direction::Descending)?;
        let first = top
            .first()
            .cloned()
            .ok_or_else(|| rank::Error::InsufficientData {
                metric: metric.into(),
            })?;
        let series = Series::new(
            name,
            top.into_iter().map(|r| (r.key, Some(r.value * scale))),
        )
        .with_highlight(|key| state.is_highlighted(key));
        Ok((series, first))
    };

    let (series, top_revenue) = top_series("Revenue (R$)", REVENUE, 1.0)?;
    view.series.push(series);
    if let Some(share) = rank::share_of_total(&groups, REVENUE, 1)? {
        view.notes.push(format!(
            "{} accounts for {share:.1}% of total revenue",
            top_revenue.key
        ));
    }

    match top_series("Avg Review Score", REVIEW, 1.0) {
        Ok((series, best)) => {
            view.series.push(series);
            view.notes.push(format!(
                "{} has the highest satisfaction with {:.2} stars",
                best.key, best.value
            ));
        }
        Err(Error::Rank(rank::Error::InsufficientData { .. })) => {
            view.notes.push("No review scores to compare".into());
        }
        Err(err) => return Err(err),
    }

    let points = rank::scatter(&groups, REVIEW, REVENUE)?;
    view.scatter.push(ScatterSeries {
        name: "Revenue vs Avg Review".into(),
        highlighted: points.iter().map(|p| state.is_highlighted(&p.label)).collect(),
        points,
    });
    view.notes.push(
        match rank::quadrant(
            &groups,
            REVIEW,
            Threshold::Fixed(QUADRANT_MIN_REVIEW),
            REVENUE,
            Threshold::MeanPerGroup,
        )? {
            Some(winner) => format!(
                "{} shows strong growth in both revenue and satisfaction",
                winner.label
            ),
            None => "No standout category in both metrics".into(),
        },
    );

    let (series, worst) = top_series("Cancellation Rate (%)", aggregate::CANCEL_RATE, 100.0)?;
    view.series.push(series);
    view.notes.push(format!(
        "{} has the highest return rate at {:.1}%",
        worst.key,
        worst.value * 100.0
    ));

    view.notes.push(or_no_data(
        rank::extremum(&groups, REVENUE, Extreme::Min),
        |low| format!("Lowest revenue category: {}", low.key),
    )?);
    view.notes.push(or_no_data(
        rank::extremum(&groups, REVIEW, Extreme::Min),
        |low| format!("Lowest review score: {:.1}/5 ({})", low.value, low.key),
    )?);
    view.notes.push(or_no_data(
        rank::extremum(&groups, REVIEW, Extreme::Max),
        |best| format!("Highest satisfaction: {:.1}/5 ({})", best.value, best.key),
    )?);
    Ok(view)
}
