//! The state of a dashboard view and how user events change it.
use crate::aggregate::{Dimension, REVENUE};
use crate::rank::Direction;
use crate::record::Record;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SortSpec {
    pub metric: String,
    pub direction: Direction,
}

impl Default for SortSpec {
    fn default() -> Self {
        SortSpec {
            metric: REVENUE.into(),
            direction: Direction::Descending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Show only records with this key, or all of them.
    Filter(Option<String>),
    /// Highlight a group, or remove the highlight if the group is highlighted already.
    Toggle(String),
    Sort(SortSpec),
    Reset,
}

/// Everything a view needs to know about user interaction to be recomputed from scratch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    /// The dimension filter values refer to.
    pub dimension: Dimension,
    pub filter: Option<String>,
    pub highlight: Option<String>,
    pub sort: SortSpec,
}

impl ViewState {
    pub fn new(dimension: Dimension) -> Self {
        ViewState {
            dimension,
            filter: None,
            highlight: None,
            sort: SortSpec::default(),
        }
    }

    /// Return the state after `event`. A new filter clears the highlight.
    pub fn apply(self, event: Event) -> Self {
        match event {
            Event::Filter(filter) => ViewState {
                filter: filter.filter(|key| !key.is_empty()),
                highlight: None,
                ..self
            },
            Event::Toggle(key) => ViewState {
                highlight: (self.highlight.as_deref() != Some(key.as_str())).then_some(key),
                ..self
            },
            Event::Sort(sort) => ViewState { sort, ..self },
            Event::Reset => ViewState::new(self.dimension),
        }
    }

    /// The records that pass the filter.
    pub fn select<'a>(&'a self, records: &'a [Record]) -> impl Iterator<Item = &'a Record> + 'a {
        records.iter().filter(move |record| match &self.filter {
            Some(filter) => self.dimension.key(record).as_deref() == Some(filter.as_str()),
            None => true,
        })
    }

    /// Whether `key` should be drawn emphasized, which is the case for all keys if nothing is highlighted.
    pub fn is_highlighted(&self, key: &str) -> bool {
        self.highlight.as_deref().map_or(true, |highlight| highlight == key)
    }

    /// A human readable description of the active filter.
    pub fn filter_label(&self) -> String {
        match &self.filter {
            Some(filter) => format!("Showing data for: {filter}"),
            None => "Showing all data".into(),
        }
    }
}
