//! Typed views of query result rows.

use nrql::templates::TrendMetric;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::de;

/// One result row, column name to cell.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Deserializes every row, skipping the ones that do not fit `T`.
pub fn parse_rows<T: DeserializeOwned>(rows: Vec<Row>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match serde_json::from_value(row.into()) {
            Ok(row) => Some(row),
            Err(err) => {
                warn!(?err, ty = std::any::type_name::<T>(), "skipping malformed row");
                None
            }
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
}

/// Per target aggregate of the overview table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetSummary {
    pub target: String,
    #[serde(default, deserialize_with = "de::opt_f64")]
    pub avg_latency: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64")]
    pub avg_jitter: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64")]
    pub avg_hop_count: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64")]
    pub error_percentage: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64")]
    pub packet_loss_percent: Option<f64>,
    #[serde(default, deserialize_with = "de::count")]
    pub num_locations: u64,
    #[serde(default, deserialize_with = "de::flag")]
    pub last_trace_completed: bool,
}

/// One trace to a target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceSummary {
    #[serde(rename = "traceId")]
    pub trace_id: String,
    #[serde(default, deserialize_with = "de::opt_millis")]
    pub timestamp: Option<i64>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub source_host: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub source_ip: Option<String>,
    #[serde(default, deserialize_with = "de::opt_f64")]
    pub avg_latency: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64")]
    pub min_latency: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64")]
    pub max_latency: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64")]
    pub avg_jitter: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64")]
    pub min_jitter: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64")]
    pub max_jitter: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64")]
    pub reachable_hops: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64")]
    pub hop_count: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64")]
    pub error_percentage: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64")]
    pub packet_loss_percent: Option<f64>,
    #[serde(default, deserialize_with = "de::flag")]
    pub last_trace_completed: bool,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub trace_error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetMetadata {
    #[serde(default, deserialize_with = "de::count")]
    pub unique_paths: u64,
    #[serde(default, deserialize_with = "de::count")]
    pub unique_hosts: u64,
    #[serde(default, deserialize_with = "de::string_list")]
    pub protocols: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub(crate) struct SourceHosts {
    #[serde(default, deserialize_with = "de::string_list")]
    pub hosts: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub(crate) struct Uniques {
    #[serde(default, deserialize_with = "de::string_list")]
    pub values: Vec<String>,
}

/// An attribute reported by `keyset()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterKey {
    pub key: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// One bucket of a per source time series.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub source: String,
    pub begin_time_seconds: i64,
    pub end_time_seconds: i64,
    pub value: Option<f64>,
}

impl TrendPoint {
    /// Reads a `TIMESERIES` bucket, the metric column is named by its alias.
    pub fn from_row(row: &Row, metric: TrendMetric) -> Option<Self> {
        let seconds = |key: &str| {
            row.get(key)
                .and_then(serde_json::Value::as_f64)
                .map(|v| v as i64)
        };
        let source = match row.get("facet").or_else(|| row.get("sourceIp"))? {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Array(parts) => parts
                .iter()
                .filter_map(serde_json::Value::as_str)
                .collect::<Vec<_>>()
                .join(", "),
            other => other.to_string(),
        };
        Some(TrendPoint {
            source,
            begin_time_seconds: seconds("beginTimeSeconds")?,
            end_time_seconds: seconds("endTimeSeconds")?,
            value: row
                .get(metric.alias())
                .and_then(serde_json::Value::as_f64)
                .filter(|v| v.is_finite()),
        })
    }
}
