//! Histograms and cross tabulations of record counts.
use crate::aggregate::{Dimension, Field};
use crate::record::Record;
use std::collections::BTreeMap;

/// The bin edges used for payment values.
pub const PAYMENT_EDGES: [f64; 6] = [0.0, 50.0, 100.0, 150.0, 200.0, 1000.0];
pub const PAYMENT_BIN_LABELS: [&str; 5] = ["0–50", "51–100", "101–150", "151–200", "200+"];

/// Counts of rows per key and half-open bin `[edges[i], edges[i + 1])`.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub edges: Vec<f64>,
    /// One count per bin for each key, ordered by key.
    pub counts: BTreeMap<String, Vec<usize>>,
}

impl Histogram {
    pub fn bin_count(&self) -> usize {
        self.edges.len().saturating_sub(1)
    }

    /// The share of `key`'s binned rows that fall into `bins`, or `None` if `key` has no binned rows.
    pub fn bin_share(&self, key: &str, bins: impl IntoIterator<Item = usize>) -> Option<f64> {
        let counts = self.counts.get(key)?;
        let total: usize = counts.iter().sum();
        if total == 0 {
            return None;
        }
        let selected: usize = bins
            .into_iter()
            .filter_map(|bin| counts.get(bin))
            .sum();
        Some(selected as f64 / total as f64)
    }
}

/// Build a histogram of `field` for each key of `dimension`.
///
/// Every key gets a row of counts even if none of its values landed in a bin. Values outside of
/// all bins and invalid values aren't counted.
pub fn histogram<'a>(
    records: impl IntoIterator<Item = &'a Record>,
    dimension: Dimension,
    field: Field,
    edges: &[f64],
) -> Histogram {
    let bins = edges.len().saturating_sub(1);
    let mut counts = BTreeMap::<String, Vec<usize>>::new();
    for record in records {
        let Some(key) = dimension.key(record) else {
            continue;
        };
        let row = counts.entry(key).or_insert_with(|| vec![0; bins]);
        let value = field.of(record);
        if let Some(bin) = edges
            .windows(2)
            .position(|edge| value >= edge[0] && value < edge[1])
        {
            row[bin] += 1;
        }
    }
    Histogram {
        edges: edges.to_vec(),
        counts,
    }
}

/// Counts of rows per row key and column key.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CrossTab {
    pub cells: BTreeMap<String, BTreeMap<String, usize>>,
}

impl CrossTab {
    /// All column keys seen in any row, in order.
    pub fn columns(&self) -> Vec<&str> {
        let mut columns: Vec<&str> = self
            .cells
            .values()
            .flat_map(|row| row.keys().map(String::as_str))
            .collect();
        columns.sort_unstable();
        columns.dedup();
        columns
    }

    pub fn get(&self, row: &str, column: &str) -> usize {
        self.cells
            .get(row)
            .and_then(|row| row.get(column))
            .copied()
            .unwrap_or_default()
    }

    /// The row in which `column` has the highest share of the row's total, along with that share.
    /// The first row wins ties. Returns `None` if no row contains `column` at all.
    pub fn dominant(&self, column: &str) -> Option<(&str, f64)> {
        let mut best = None::<(&str, f64)>;
        for (row, cells) in &self.cells {
            let total: usize = cells.values().sum();
            let share = match cells.get(column) {
                Some(&count) if total > 0 => count as f64 / total as f64,
                _ => continue,
            };
            if share > 0.0 && best.map_or(true, |(_, top)| share > top) {
                best = Some((row.as_str(), share));
            }
        }
        best
    }
}

/// Count rows by the keys of both `rows` and `columns`. Records missing either key are skipped.
pub fn cross_tab<'a>(
    records: impl IntoIterator<Item = &'a Record>,
    rows: Dimension,
    columns: Dimension,
) -> CrossTab {
    let mut out = CrossTab::default();
    for record in records {
        if let (Some(row), Some(column)) = (rows.key(record), columns.key(record)) {
            *out.cells.entry(row).or_default().entry(column).or_default() += 1;
        }
    }
    out
}
