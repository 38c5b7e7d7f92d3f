//! Collaborators the interpreter consults but does not own.

use std::collections::BTreeMap;

use docmux_config::{Config, Policy};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read '{location}': {source}")]
    Read {
        location: String,
        source: std::io::Error,
    },

    #[error("cannot parse '{location}': {message}")]
    Parse { location: String, message: String },

    #[error("no content is available at '{0}'")]
    NotFound(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataRowError {
    #[error("no data row is selected")]
    NoRowSelected,

    #[error("column '{0}' does not exist")]
    ColumnNotFound(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    #[error("transform '{0}' is not defined")]
    Unknown(String),

    #[error("transform '{name}' failed: {message}")]
    Failed { name: String, message: String },
}

/// Maps a fragment id to the locations it may be loaded from, best candidate first.
pub trait FragmentResolver {
    fn locations(&self, frag_id: &str) -> Vec<String>;
}

impl FragmentResolver for Config {
    fn locations(&self, frag_id: &str) -> Vec<String> {
        self.fragment_locations(frag_id).to_vec()
    }
}

pub trait ContentLoader<C> {
    fn load(&self, location: &str) -> Result<C, LoadError>;
}

/// The currently selected data row.
pub trait DataRowProvider {
    fn value(&self, column: &str) -> Result<String, DataRowError>;
}

/// Named value transforms applied by `TRAFO`.
pub trait ValueTransformer {
    fn transform(&self, name: &str, value: &str) -> Result<String, TransformError>;
}

pub trait MessageSink {
    /// Shows a message the user has to acknowledge.
    fn show_blocking_message(&self, title: &str, message: &str);
}

/// Everything a run needs besides the document model.
pub struct Services<'a, C> {
    pub resolver: &'a dyn FragmentResolver,
    pub loader: &'a dyn ContentLoader<C>,
    pub data: &'a dyn DataRowProvider,
    pub transformer: &'a dyn ValueTransformer,
    pub messages: &'a dyn MessageSink,
    pub policy: Policy,
}

/// A data row held in memory. `None` means no row is selected.
#[derive(Debug, Clone, Default)]
pub struct MapDataRow {
    row: Option<BTreeMap<String, String>>,
}

impl MapDataRow {
    pub fn selected(row: BTreeMap<String, String>) -> Self {
        Self { row: Some(row) }
    }

    pub fn none_selected() -> Self {
        Self { row: None }
    }
}

impl DataRowProvider for MapDataRow {
    fn value(&self, column: &str) -> Result<String, DataRowError> {
        let row = self.row.as_ref().ok_or(DataRowError::NoRowSelected)?;
        row.get(column)
            .cloned()
            .ok_or_else(|| DataRowError::ColumnNotFound(column.to_string()))
    }
}

/// Knows no transforms at all: every `TRAFO` fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTransforms;

impl ValueTransformer for NoTransforms {
    fn transform(&self, name: &str, _value: &str) -> Result<String, TransformError> {
        Err(TransformError::Unknown(name.to_string()))
    }
}

/// Writes blocking messages to the log instead of showing them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMessages;

impl MessageSink for LogMessages {
    fn show_blocking_message(&self, title: &str, message: &str) {
        log::warn!("{title}: {message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_map_data_row_reports_missing_column() {
        let row = MapDataRow::selected(BTreeMap::from([("Name".into(), "Ada".into())]));

        assert_eq!(row.value("Name"), Ok("Ada".to_string()));
        assert_eq!(
            row.value("Street"),
            Err(DataRowError::ColumnNotFound("Street".into()))
        );
    }

    #[test]
    fn test_map_data_row_without_selection() {
        assert_eq!(
            MapDataRow::none_selected().value("Name"),
            Err(DataRowError::NoRowSelected)
        );
    }

    #[test]
    fn test_config_resolves_fragment_locations() {
        let mut config = Config::default();
        config
            .fragments
            .insert("Header".into(), vec!["a.toml".into(), "b.toml".into()]);

        assert_eq!(config.locations("Header"), vec!["a.toml", "b.toml"]);
        assert!(config.locations("Missing").is_empty());
    }
}
