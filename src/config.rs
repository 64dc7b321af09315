//! Configuration types for queries and engine telemetry
//!
//! `QueryOptions` is the read-only configuration a pagination engine is
//! constructed with. It can be built in code or loaded from YAML/JSON.

use crate::error::{Error, Result};
use crate::types::{Cursor, FetchCount, Projection};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable that silences the chunk-size advisory
pub const DISABLE_CHUNK_SIZE_WARNING_ENV: &str = "PAGESTREAM_DISABLE_CHUNK_SIZE_WARNING";

// ============================================================================
// Query Options
// ============================================================================

/// Options for one logical query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryOptions {
    /// Leading results the service must skip before real results begin
    #[serde(default)]
    pub offset: usize,

    /// Records requested per continuation round trip
    #[serde(default)]
    pub chunk_size: Option<usize>,

    /// Size of the initial batch (passed through to the remote client)
    #[serde(default)]
    pub prefetch_size: Option<usize>,

    /// Maximum number of records a result stream yields
    #[serde(default)]
    pub limit: Option<usize>,

    /// Resume position for the first page
    #[serde(default)]
    pub start_cursor: Option<Cursor>,

    /// Position past which no results are returned
    #[serde(default)]
    pub end_cursor: Option<Cursor>,

    /// Properties kept on every record (empty keeps whole records)
    #[serde(default)]
    pub projection: Projection,

    /// Ask the service for a compiled query (not interpreted by the engine)
    #[serde(default)]
    pub require_compiled_query: bool,
}

impl QueryOptions {
    /// Create default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the offset
    #[must_use]
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Set the chunk size
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    /// Set the initial batch size
    #[must_use]
    pub fn with_prefetch_size(mut self, prefetch_size: usize) -> Self {
        self.prefetch_size = Some(prefetch_size);
        self
    }

    /// Set the limit
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the start cursor
    #[must_use]
    pub fn with_start_cursor(mut self, cursor: Cursor) -> Self {
        self.start_cursor = Some(cursor);
        self
    }

    /// Set the end cursor
    #[must_use]
    pub fn with_end_cursor(mut self, cursor: Cursor) -> Self {
        self.end_cursor = Some(cursor);
        self
    }

    /// Set the projection
    #[must_use]
    pub fn with_projection<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = properties.into_iter().map(Into::into).collect();
        self
    }

    /// Require a compiled query
    #[must_use]
    pub fn with_compiled_query(mut self, required: bool) -> Self {
        self.require_compiled_query = required;
        self
    }

    /// Count a result stream should ask the engine for per load call
    pub fn fetch_count(&self) -> FetchCount {
        self.chunk_size.map_or(FetchCount::Unbounded, FetchCount::Exactly)
    }

    /// Check option values that deserialization alone cannot catch
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == Some(0) {
            return Err(Error::invalid_value("chunk_size", "must be at least 1"));
        }
        if self.prefetch_size == Some(0) {
            return Err(Error::invalid_value("prefetch_size", "must be at least 1"));
        }
        Ok(())
    }

    /// Parse and validate options from YAML
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let options: Self = serde_yaml::from_str(yaml)?;
        options.validate()?;
        Ok(options)
    }

    /// Parse and validate options from JSON
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Load options from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&contents)
    }
}

// ============================================================================
// Advisor Config
// ============================================================================

/// Settings for the chunk-size advisory log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisorConfig {
    /// Whether the advisory is logged at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Records a single query must emit before the advisory applies
    #[serde(default = "default_threshold")]
    pub threshold: u64,

    /// Minimum time between two advisories, process-wide
    #[serde(default = "default_min_interval", with = "duration_secs")]
    pub min_interval: Duration,
}

fn default_enabled() -> bool {
    true
}

fn default_threshold() -> u64 {
    1000
}

fn default_min_interval() -> Duration {
    Duration::from_secs(5 * 60)
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            threshold: default_threshold(),
            min_interval: default_min_interval(),
        }
    }
}

impl AdvisorConfig {
    /// Default config, disabled when the environment asks for it
    pub fn from_env() -> Self {
        let disabled = std::env::var(DISABLE_CHUNK_SIZE_WARNING_ENV)
            .map(|v| is_truthy(&v))
            .unwrap_or(false);
        Self {
            enabled: !disabled,
            ..Self::default()
        }
    }

    /// Set the threshold
    #[must_use]
    pub fn with_threshold(mut self, threshold: u64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the minimum interval
    #[must_use]
    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    /// Disable the advisory
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_query_options_default() {
        let options = QueryOptions::default();
        assert_eq!(options.offset, 0);
        assert!(options.chunk_size.is_none());
        assert!(options.limit.is_none());
        assert!(options.projection.is_empty());
        assert!(!options.require_compiled_query);
        assert_eq!(options.fetch_count(), FetchCount::Unbounded);
    }

    #[test]
    fn test_query_options_builder() {
        let options = QueryOptions::new()
            .with_offset(5)
            .with_chunk_size(20)
            .with_prefetch_size(50)
            .with_limit(100)
            .with_start_cursor(Cursor::from("start"))
            .with_projection(["id", "name"])
            .with_compiled_query(true);

        assert_eq!(options.offset, 5);
        assert_eq!(options.chunk_size, Some(20));
        assert_eq!(options.prefetch_size, Some(50));
        assert_eq!(options.limit, Some(100));
        assert_eq!(options.start_cursor, Some(Cursor::from("start")));
        assert_eq!(options.projection, vec!["id".to_string(), "name".to_string()]);
        assert!(options.require_compiled_query);
        assert_eq!(options.fetch_count(), FetchCount::Exactly(20));
    }

    #[test]
    fn test_query_options_from_yaml() {
        let yaml = r"
offset: 10
chunk_size: 25
limit: 200
projection: [id, title]
require_compiled_query: true
";
        let options = QueryOptions::from_yaml_str(yaml).unwrap();
        assert_eq!(options.offset, 10);
        assert_eq!(options.chunk_size, Some(25));
        assert_eq!(options.limit, Some(200));
        assert_eq!(options.projection, vec!["id".to_string(), "title".to_string()]);
        assert!(options.require_compiled_query);
    }

    #[test]
    fn test_query_options_cursor_from_json() {
        let cursor = Cursor::from("resume-here");
        let json = format!(r#"{{"start_cursor": "{}"}}"#, cursor.to_websafe_string());
        let options = QueryOptions::from_json_str(&json).unwrap();
        assert_eq!(options.start_cursor, Some(cursor));
    }

    #[test]
    fn test_query_options_rejects_zero_chunk() {
        let err = QueryOptions::from_yaml_str("chunk_size: 0").unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { ref field, .. } if field == "chunk_size"));
    }

    #[test]
    fn test_query_options_rejects_unknown_fields() {
        assert!(QueryOptions::from_yaml_str("batch: 3").is_err());
    }

    #[test]
    fn test_query_options_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "offset: 3\nchunk_size: 7").unwrap();

        let options = QueryOptions::from_yaml_file(file.path()).unwrap();
        assert_eq!(options.offset, 3);
        assert_eq!(options.chunk_size, Some(7));
    }

    #[test]
    fn test_query_options_missing_file() {
        let err = QueryOptions::from_yaml_file("/nonexistent/options.yaml").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_advisor_config_defaults() {
        let config = AdvisorConfig::default();
        assert!(config.enabled);
        assert_eq!(config.threshold, 1000);
        assert_eq!(config.min_interval, Duration::from_secs(300));
    }

    #[test]
    fn test_advisor_config_yaml() {
        let config: AdvisorConfig = serde_yaml::from_str("threshold: 50\nmin_interval: 10").unwrap();
        assert!(config.enabled);
        assert_eq!(config.threshold, 50);
        assert_eq!(config.min_interval, Duration::from_secs(10));
    }

    #[test]
    fn test_truthy_values() {
        assert!(is_truthy("1"));
        assert!(is_truthy("TRUE"));
        assert!(is_truthy(" yes "));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("false"));
        assert!(!is_truthy(""));
    }
}
