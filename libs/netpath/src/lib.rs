//! Network path trace exploration.
//!
//! [`Explorer`] drives the overview, trace list and hop map views against a
//! [`QueryService`]; [`layout`] places the hops of a trace on a map.

pub mod cache;
pub mod client;
pub mod config;
mod de;
pub mod error;
pub mod explorer;
pub mod hop;
pub mod layout;
pub mod rows;
pub mod sequence;

pub use client::{NerdGraphClient, QueryService, Region};
pub use config::Config;
pub use error::Error;
pub use explorer::{Explorer, search_accounts};
pub use hop::{GeoPoint, HopKind, HopRecord, PositionedHop};
pub use layout::{HopEdge, HopMap, layout, map_center, path_edges, polyline};
pub use rows::{Account, FilterKey, Row, TargetMetadata, TargetSummary, TraceSummary, TrendPoint};
