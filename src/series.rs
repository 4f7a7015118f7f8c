//! Chart-ready output and the consumers that receive it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Values of one metric for a list of labels, as for a bar chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub labels: Vec<String>,
    /// `None` is rendered as 'no data'.
    pub values: Vec<Option<f64>>,
    /// Whether the label at the same index is emphasized.
    pub highlighted: Vec<bool>,
}

impl Series {
    /// Create a series with every label emphasized.
    pub fn new(
        name: impl Into<String>,
        points: impl IntoIterator<Item = (String, Option<f64>)>,
    ) -> Self {
        let (labels, values): (Vec<_>, Vec<_>) = points.into_iter().unzip();
        Series {
            name: name.into(),
            highlighted: vec![true; labels.len()],
            labels,
            values,
        }
    }

    /// Emphasize the labels for which `is_highlighted` is true.
    pub fn with_highlight(mut self, is_highlighted: impl Fn(&str) -> bool) -> Self {
        self.highlighted = self.labels.iter().map(|l| is_highlighted(l)).collect();
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScatterSeries {
    pub name: String,
    pub points: Vec<crate::rank::Point>,
    pub highlighted: Vec<bool>,
}

/// Something that turns series and notes into a presentation, like charts or files.
pub trait SeriesConsumer {
    fn receive(&mut self, view: &str, series: &Series) -> Result<(), Error>;
    fn receive_points(&mut self, view: &str, scatter: &ScatterSeries) -> Result<(), Error>;
    /// A sentence summarizing a finding of `view`.
    fn note(&mut self, view: &str, text: &str) -> Result<(), Error>;
}

/// Keeps everything it receives, mostly useful for inspection.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Collect {
    pub series: Vec<(String, Series)>,
    pub scatter: Vec<(String, ScatterSeries)>,
    pub notes: Vec<(String, String)>,
}

impl SeriesConsumer for Collect {
    fn receive(&mut self, view: &str, series: &Series) -> Result<(), Error> {
        self.series.push((view.into(), series.clone()));
        Ok(())
    }

    fn receive_points(&mut self, view: &str, scatter: &ScatterSeries) -> Result<(), Error> {
        self.scatter.push((view.into(), scatter.clone()));
        Ok(())
    }

    fn note(&mut self, view: &str, text: &str) -> Result<(), Error> {
        self.notes.push((view.into(), text.into()));
        Ok(())
    }
}

/// Writes series as `view,series,label,value,highlighted` rows and scatter points as `view,series,label,x;y,highlighted`.
/// Notes go to a separate writer as plain lines.
pub struct CsvConsumer<W: std::io::Write, N: std::io::Write> {
    out: csv::Writer<W>,
    notes: N,
}

impl<W: std::io::Write, N: std::io::Write> CsvConsumer<W, N> {
    pub fn new(out: W, notes: N) -> Result<Self, Error> {
        let mut out = csv::WriterBuilder::new().delimiter(b',').from_writer(out);
        out.write_record(["view", "series", "label", "value", "highlighted"])?;
        Ok(CsvConsumer { out, notes })
    }

    pub fn flush(&mut self) -> Result<(), Error> {
        self.out.flush()?;
        self.notes.flush()?;
        Ok(())
    }
}

fn render(value: Option<f64>) -> String {
    value
        .filter(|v| v.is_finite())
        .map(|v| v.to_string())
        .unwrap_or_default()
}

impl<W: std::io::Write, N: std::io::Write> SeriesConsumer for CsvConsumer<W, N> {
    fn receive(&mut self, view: &str, series: &Series) -> Result<(), Error> {
        for ((label, value), highlighted) in series
            .labels
            .iter()
            .zip(&series.values)
            .zip(&series.highlighted)
        {
            self.out.write_record([
                view,
                series.name.as_str(),
                label.as_str(),
                render(*value).as_str(),
                if *highlighted { "true" } else { "false" },
            ])?;
        }
        Ok(())
    }

    fn receive_points(&mut self, view: &str, scatter: &ScatterSeries) -> Result<(), Error> {
        for (point, highlighted) in scatter.points.iter().zip(&scatter.highlighted) {
            self.out.write_record([
                view,
                scatter.name.as_str(),
                point.label.as_str(),
                format!("{};{}", point.x, point.y).as_str(),
                if *highlighted { "true" } else { "false" },
            ])?;
        }
        Ok(())
    }

    fn note(&mut self, view: &str, text: &str) -> Result<(), Error> {
        writeln!(self.notes, "[{view}] {text}")?;
        Ok(())
    }
}
