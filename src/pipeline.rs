//! Configurable group-aggregate-sort pipelines, to be loaded from RON files.
use crate::aggregate::{Dimension, MetricSpec};
use crate::view::SortSpec;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Rank(#[from] crate::rank::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Could not decode the pipeline descriptions")]
    DecodePipelines(#[from] ron::de::SpannedError),
}

/// What to group by, what to compute, and how to order the result.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Pipeline {
    pub name: String,
    pub group_by: Dimension,
    pub metrics: Vec<MetricSpec>,
    /// Without it, rows are ordered by key.
    #[serde(default)]
    pub sort: Option<SortSpec>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Engine {
    pub pipelines: Vec<Pipeline>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub key: String,
    pub count: usize,
    pub values: Vec<Option<f64>>,
}

/// The result of running a [`Pipeline`].
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub group_by: Dimension,
    pub metrics: Vec<String>,
    pub rows: Vec<Row>,
}

impl Pipeline {
    /// Aggregate `records` and order the groups.
    ///
    /// When sorting, groups without data for the sort metric follow all others in key order.
    pub fn run(&self, records: &[crate::record::Record]) -> Result<Table, Error> {
        let groups = crate::aggregate(records, |r| self.group_by.key(r), &self.metrics);
        let mut keys: Vec<String> = match &self.sort {
            Some(SortSpec { metric, direction }) => {
                crate::rank::ordered_keys(&groups, metric, *direction)?
            }
            None => groups.keys().map(ToOwned::to_owned).collect(),
        };
        if let Some(limit) = self.limit {
            keys.truncate(limit);
        }
        log::debug!("pipeline '{}' produced {} of {} groups", self.name, keys.len(), groups.len());

        let rows = keys
            .into_iter()
            .filter_map(|key| {
                let group = groups.groups.get(&key)?;
                Some(Row {
                    count: group.count,
                    values: group.values.clone(),
                    key,
                })
            })
            .collect();
        Ok(Table {
            name: self.name.clone(),
            group_by: self.group_by,
            metrics: self.metrics.iter().map(|spec| spec.name.clone()).collect(),
            rows,
        })
    }
}

impl Engine {
    pub fn from_reader(read: impl std::io::Read) -> Result<Self, Error> {
        Ok(ron::de::from_reader(read)?)
    }

    pub fn from_path(path: impl AsRef<std::path::Path>) -> Result<Self, Error> {
        Self::from_reader(std::fs::File::open(path)?)
    }

    /// Run all pipelines. One failing doesn't affect the others.
    pub fn run(&self, records: &[crate::record::Record]) -> Vec<(&str, Result<Table, Error>)> {
        self.pipelines
            .iter()
            .map(|pipeline| (pipeline.name.as_str(), pipeline.run(records)))
            .collect()
    }
}

impl Table {
    /// Write a header with the group dimension, `count` and all metric names, followed by one line per row.
    /// Missing values are left empty.
    pub fn write_csv(&self, out: impl std::io::Write) -> Result<(), Error> {
        let mut out = csv::WriterBuilder::new().delimiter(b',').from_writer(out);
        let mut headers = csv::StringRecord::new();
        headers.push_field(self.group_by.name());
        headers.push_field("count");
        for metric in &self.metrics {
            headers.push_field(metric);
        }
        out.write_record(&headers)?;

        let mut record = csv::StringRecord::new();
        for row in &self.rows {
            record.clear();
            record.push_field(&row.key);
            record.push_field(&row.count.to_string());
            for value in &row.values {
                record.push_field(
                    &value
                        .filter(|v| v.is_finite())
                        .map(|v| v.to_string())
                        .unwrap_or_default(),
                );
            }
            out.write_record(&record)?;
        }
        out.flush()?;
        Ok(())
    }

    /// The values of `metric` as a series, in row order.
    pub fn series(&self, metric: &str) -> Option<crate::series::Series> {
        let index = self.metrics.iter().position(|name| name == metric)?;
        Some(crate::series::Series::new(
            metric,
            self.rows.iter().map(|row| (row.key.clone(), row.values[index])),
        ))
    }
}
