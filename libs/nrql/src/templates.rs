//! The fixed set of network path queries.

use crate::{Aggregate, Condition, FilterExpr, Query, TimeWindow, time::DAY_MS};

pub const EVENT_TYPE: &str = "InfrastructureEvent";
pub const PATH_SAMPLE: &str = "NetworkPathSample";
pub const HOP_SAMPLE: &str = "NetworkPathHopSample";

/// Filter keys and values are discovered over a fixed two week window.
pub const DISCOVERY_WINDOW: TimeWindow = TimeWindow::Last {
    duration_ms: 14 * DAY_MS,
};

/// Attributes never offered as filter keys.
pub const FILTER_EXCLUSION_LIST: &[&str] = &[
    "entityGuid",
    "entityName",
    "entityId",
    "entityKey",
    "coreCount",
    "agentName",
    "agentVersion",
    "instanceType",
    "kernelVersion",
    "linuxDistribution",
    "operatingSystem",
    "processorCount",
    "avgJitterMs",
    "avgLatencyMs",
    "maxJitterMs",
    "maxLatencyMs",
    "minJitterMs",
    "minLatencyMs",
    "packetLossPercent",
    "reachableHops",
    "totalHops",
    "traceCompleted",
    "traceDurationMs",
    "timestamp",
];

pub fn is_filterable_key(key: &str) -> bool {
    !FILTER_EXCLUSION_LIST.contains(&key)
}

fn path_samples() -> Query {
    Query::from(EVENT_TYPE)
}

/// Per target aggregate over all traces in the window.
pub fn network_path_summary(window: TimeWindow) -> Query {
    use Aggregate::*;
    path_samples()
        .select(Average("avgLatencyMs".into()), "avg_latency")
        .select(Average("avgJitterMs".into()), "avg_jitter")
        .select(Average("totalHops".into()), "avg_hop_count")
        .select(PercentPresent("error".into()), "error_percentage")
        .select(Average("packetLossPercent".into()), "packet_loss_percent")
        .select(UniqueCount("hostname".into()), "num_locations")
        .select(Latest("traceCompleted".into()), "last_trace_completed")
        .filter(Condition::eq("summary", PATH_SAMPLE))
        .facet_as("targetHost", "target")
        .window(window)
        .limit(500)
}

/// Source hosts that traced to `target`.
pub fn source_hosts(window: TimeWindow, target: &str) -> Query {
    path_samples()
        .select(Aggregate::Uniques("hostname".into()), "hosts")
        .filter(Condition::eq("summary", PATH_SAMPLE))
        .filter(Condition::eq("targetHost", target))
        .window(window)
}

/// Unique paths, hosts and protocols seen for `target`.
pub fn target_metadata(window: TimeWindow, target: &str) -> Query {
    use Aggregate::*;
    path_samples()
        .select(UniqueCount("pathHash".into()), "unique_paths")
        .select(UniqueCount("hostname".into()), "unique_hosts")
        .select(Uniques("protocol".into()), "protocols")
        .filter(Condition::eq("summary", PATH_SAMPLE))
        .filter(Condition::eq("targetHost", target))
        .window(window)
}

/// One row per trace to `target`, narrowed by the user filter.
pub fn traces_for_target(window: TimeWindow, target: &str, filter: &FilterExpr) -> Query {
    use Aggregate::*;
    path_samples()
        .select(Latest("timestamp".into()), "timestamp")
        .select(Latest("hostname".into()), "source_host")
        .select(Latest("sourceIp".into()), "source_ip")
        .select(Latest("avgLatencyMs".into()), "avg_latency")
        .select(Latest("minLatencyMs".into()), "min_latency")
        .select(Latest("maxLatencyMs".into()), "max_latency")
        .select(Latest("avgJitterMs".into()), "avg_jitter")
        .select(Latest("minJitterMs".into()), "min_jitter")
        .select(Latest("maxJitterMs".into()), "max_jitter")
        .select(Latest("reachableHops".into()), "reachable_hops")
        .select(Latest("totalHops".into()), "hop_count")
        .select(PercentPresent("error".into()), "error_percentage")
        .select(Latest("packetLossPercent".into()), "packet_loss_percent")
        .select(Latest("traceCompleted".into()), "last_trace_completed")
        .select(Latest("error".into()), "trace_error")
        .filter_group(filter.clone())
        .filter(Condition::eq("summary", PATH_SAMPLE))
        .filter(Condition::eq("targetHost", target))
        .facet("traceId")
        .window(window)
        .limit(1000)
}

/// One row per hop of a single trace.
pub fn hop_details(window: TimeWindow, target: &str, trace_id: &str) -> Query {
    use Aggregate::Latest;
    path_samples()
        .select(Latest("hopIp".into()), "hop_ip")
        .select(Latest("hopIsPrivate".into()), "hop_is_private")
        .select(Latest("hopAsn".into()), "hop_asn")
        .select(Latest("hopAsName".into()), "hop_asn_name")
        .select(Latest("hopLat".into()), "hop_lat")
        .select(Latest("hopLon".into()), "hop_lon")
        .select(Latest("hopCity".into()), "hop_city")
        .select(Latest("hopRegion".into()), "hop_region")
        .select(Latest("hopCountryCode".into()), "hop_country_code")
        .select(Latest("isDestination".into()), "hop_is_target")
        .select(Latest("isTimeout".into()), "hop_is_timeout")
        .select(Latest("packetLossPercent".into()), "hop_packet_loss")
        .select(Latest("avgLatencyMs".into()), "avg_hop_latency")
        .select(Latest("minLatencyMs".into()), "min_hop_latency")
        .select(Latest("maxLatencyMs".into()), "max_hop_latency")
        .select(Latest("avgJitterMs".into()), "avg_hop_jitter")
        .select(Latest("minJitterMs".into()), "min_hop_jitter")
        .select(Latest("maxJitterMs".into()), "max_hop_jitter")
        .filter(Condition::eq("summary", HOP_SAMPLE))
        .filter(Condition::eq("targetHost", target))
        .filter(Condition::eq("traceId", trace_id))
        .facet("hopNumber")
        .window(window)
        .limit(250)
}

/// Metrics charted per source over time in the trace drilldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendMetric {
    Latency,
    Jitter,
    PacketLoss,
    TotalHops,
}

impl TrendMetric {
    pub fn attribute(self) -> &'static str {
        match self {
            TrendMetric::Latency => "avgLatencyMs",
            TrendMetric::Jitter => "avgJitterMs",
            TrendMetric::PacketLoss => "packetLossPercent",
            TrendMetric::TotalHops => "totalHops",
        }
    }

    pub fn alias(self) -> &'static str {
        match self {
            TrendMetric::Latency => "avg_latency",
            TrendMetric::Jitter => "avg_jitter",
            TrendMetric::PacketLoss => "packet_loss_percent",
            TrendMetric::TotalHops => "total_hops",
        }
    }
}

pub fn trace_trend(
    window: TimeWindow,
    target: &str,
    filter: &FilterExpr,
    metric: TrendMetric,
) -> Query {
    path_samples()
        .select(Aggregate::Latest(metric.attribute().into()), metric.alias())
        .filter_group(filter.clone())
        .filter(Condition::eq("summary", PATH_SAMPLE))
        .filter(Condition::eq("targetHost", target))
        .facet("sourceIp")
        .window(window)
        .timeseries()
}

pub fn filter_keys() -> Query {
    path_samples()
        .select_bare(Aggregate::Keyset)
        .filter(Condition::eq("summary", PATH_SAMPLE))
        .window(DISCOVERY_WINDOW)
}

pub fn filter_values(key: &str) -> Query {
    path_samples()
        .select(Aggregate::Uniques(key.into()), "values")
        .filter(Condition::eq("summary", PATH_SAMPLE))
        .window(DISCOVERY_WINDOW)
}
