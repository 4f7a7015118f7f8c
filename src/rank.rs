//! Ranking groups by a metric and deriving comparisons between them.
//!
//! Groups whose metric is `None` have no data and never take part in a ranking.
use crate::aggregate::Groups;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Insufficient data for comparison by '{metric}'")]
    InsufficientData { metric: String },
    #[error("There is no metric named '{0}'")]
    UnknownMetric(String),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Direction {
    #[default]
    Descending,
    Ascending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extreme {
    Max,
    Min,
}

/// A group key along with the value it was ranked by.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranked {
    pub key: String,
    pub value: f64,
}

/// A group positioned by two of its metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub label: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Threshold {
    Fixed(f64),
    /// The sum of the metric over all groups divided by the number of groups.
    MeanPerGroup,
}

/// How the best group compares to the count-weighted average of all groups.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub top: Ranked,
    pub average: Option<f64>,
    /// `(top - average) / average * 100`, or `None` if there is nothing to compare with.
    pub deviation_percent: Option<f64>,
}

/// The groups with data for `metric`, in key order.
fn with_data(groups: &Groups, metric: &str) -> Result<Vec<Ranked>, Error> {
    Ok(groups
        .column(metric)
        .ok_or_else(|| Error::UnknownMetric(metric.into()))?
        .into_iter()
        .filter_map(|(key, value)| {
            value.filter(|v| v.is_finite()).map(|value| Ranked {
                key: key.to_owned(),
                value,
            })
        })
        .collect())
}

fn insufficient(metric: &str) -> Error {
    Error::InsufficientData {
        metric: metric.into(),
    }
}

/// Sort all groups with data by `metric`, keeping key order among equal values.
pub fn sorted(groups: &Groups, metric: &str, direction: Direction) -> Result<Vec<Ranked>, Error> {
    let mut ranked = with_data(groups, metric)?;
    match direction {
        Direction::Descending => ranked.sort_by(|a, b| b.value.total_cmp(&a.value)),
        Direction::Ascending => ranked.sort_by(|a, b| a.value.total_cmp(&b.value)),
    }
    Ok(ranked)
}

/// All keys sorted by `metric`, followed by the keys of groups without data for it in key order.
pub fn ordered_keys(groups: &Groups, metric: &str, direction: Direction) -> Result<Vec<String>, Error> {
    let mut keys: Vec<String> = sorted(groups, metric, direction)?
        .into_iter()
        .map(|ranked| ranked.key)
        .collect();
    let without_data: Vec<String> = groups
        .keys()
        .filter(|key| !keys.iter().any(|k| k.as_str() == *key))
        .map(ToOwned::to_owned)
        .collect();
    keys.extend(without_data);
    Ok(keys)
}

/// The first `n` groups sorted by `metric` in `direction`. Fails if no group has data.
pub fn top_n(
    groups: &Groups,
    metric: &str,
    n: usize,
    direction: Direction,
) -> Result<Vec<Ranked>, Error> {
    let mut ranked = sorted(groups, metric, direction)?;
    if ranked.is_empty() {
        return Err(insufficient(metric));
    }
    ranked.truncate(n);
    Ok(ranked)
}

/// The group with the highest or lowest value of `metric`. The first key wins on ties.
pub fn extremum(groups: &Groups, metric: &str, extreme: Extreme) -> Result<Ranked, Error> {
    with_data(groups, metric)?
        .into_iter()
        .reduce(|best, next| match extreme {
            Extreme::Max if next.value > best.value => next,
            Extreme::Min if next.value < best.value => next,
            _ => best,
        })
        .ok_or_else(|| insufficient(metric))
}

/// The percentage of the grand total of `metric` held by the `k` largest groups.
///
/// The grand total includes every group with data. It is `Ok(None)` if the grand total is zero.
pub fn share_of_total(groups: &Groups, metric: &str, k: usize) -> Result<Option<f64>, Error> {
    let ranked = sorted(groups, metric, Direction::Descending)?;
    if ranked.is_empty() {
        return Err(insufficient(metric));
    }
    let total: f64 = ranked.iter().map(|r| r.value).sum();
    let top: f64 = ranked.iter().take(k).map(|r| r.value).sum();
    Ok((total != 0.0).then(|| top / total * 100.0))
}

/// Position each group with data for both metrics at `(x, y)`.
pub fn scatter(groups: &Groups, x: &str, y: &str) -> Result<Vec<Point>, Error> {
    let ys = with_data(groups, y)?;
    Ok(with_data(groups, x)?
        .into_iter()
        .filter_map(|xr| {
            let y = ys.iter().find(|yr| yr.key == xr.key)?.value;
            Some(Point {
                label: xr.key,
                x: xr.value,
                y,
            })
        })
        .collect())
}

/// Among the groups satisfying both thresholds, pick the one with the largest sum of `x` and `y`,
/// each normalized by its maximum over all groups. `Ok(None)` means no group stands out.
pub fn quadrant(
    groups: &Groups,
    x: &str,
    x_threshold: Threshold,
    y: &str,
    y_threshold: Threshold,
) -> Result<Option<Point>, Error> {
    let points = scatter(groups, x, y)?;
    let resolve = |threshold: Threshold, metric: &str| -> Result<f64, Error> {
        Ok(match threshold {
            Threshold::Fixed(value) => value,
            Threshold::MeanPerGroup => {
                let total: f64 = with_data(groups, metric)?.iter().map(|r| r.value).sum();
                total / groups.len().max(1) as f64
            }
        })
    };
    let (x_min, y_min) = (resolve(x_threshold, x)?, resolve(y_threshold, y)?);
    let x_max = points.iter().map(|p| p.x).fold(0.0, f64::max);
    let y_max = points.iter().map(|p| p.y).fold(0.0, f64::max);
    let normalize = |value: f64, max: f64| if max > 0.0 { value / max } else { 0.0 };

    let mut best = None::<(f64, Point)>;
    for point in points {
        if point.x < x_min || point.y < y_min {
            continue;
        }
        let score = normalize(point.x, x_max) + normalize(point.y, y_max);
        if best.as_ref().map_or(true, |(top, _)| score > *top) {
            best = Some((score, point));
        }
    }
    Ok(best.map(|(_, point)| point))
}

/// Find the group with the highest `metric` and compare it to the average of all groups weighted by their size.
pub fn compare_to_average(groups: &Groups, metric: &str) -> Result<Comparison, Error> {
    let top = extremum(groups, metric, Extreme::Max)?;
    let contributors: Vec<(f64, f64)> = with_data(groups, metric)?
        .into_iter()
        .filter_map(|r| groups.groups.get(&r.key).map(|g| (r.value, g.count as f64)))
        .collect();
    let weight: f64 = contributors.iter().map(|(_, count)| count).sum();
    let average = (weight > 0.0)
        .then(|| contributors.iter().map(|(value, count)| value * count).sum::<f64>() / weight);
    let deviation_percent = average
        .filter(|average| contributors.len() > 1 && *average != 0.0)
        .map(|average| (top.value - average) / average * 100.0);
    Ok(Comparison {
        top,
        average,
        deviation_percent,
    })
}
