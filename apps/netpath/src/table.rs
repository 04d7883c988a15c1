use netpath::{
    Account, FilterKey, HopMap, PositionedHop, TargetMetadata, TargetSummary, TraceSummary,
    TrendPoint,
};
use tabled::Table;
use tabled::builder::Builder;
use tabled::settings::Style;

pub const NO_DATA: &str = "No data";

pub fn ms(value: Option<f64>) -> String {
    value.map_or_else(|| NO_DATA.to_string(), |v| format!("{v:.2} ms"))
}

pub fn percent(value: Option<f64>) -> String {
    value.map_or_else(|| NO_DATA.to_string(), |v| format!("{v:.2}%"))
}

pub fn whole(value: Option<f64>) -> String {
    value.map_or_else(|| NO_DATA.to_string(), |v| format!("{v:.0}"))
}

pub fn yes_no(value: bool) -> &'static str {
    if value { "Yes" } else { "No" }
}

pub fn timestamp(millis: Option<i64>) -> String {
    millis
        .and_then(|ms| jiff::Timestamp::from_millisecond(ms).ok())
        .map(|ts| {
            ts.to_zoned(jiff::tz::TimeZone::system())
                .strftime("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| "N/A".to_string())
}

fn with_header(columns: &[&str]) -> Builder {
    let mut builder = Builder::default();
    builder.push_record(columns.iter().map(|c| c.to_string()));
    builder
}

fn build(builder: Builder) -> Table {
    let mut table = builder.build();
    table.with(Style::rounded());
    table
}

pub fn accounts(accounts: &[&Account]) -> Table {
    let mut builder = with_header(&["ID", "NAME"]);
    for account in accounts {
        builder.push_record([account.id.to_string(), account.name.clone()]);
    }
    build(builder)
}

pub fn summary(rows: &[TargetSummary]) -> Table {
    let mut builder = with_header(&[
        "TARGET",
        "AVG LATENCY",
        "AVG JITTER",
        "AVG HOPS",
        "ERRORS",
        "PACKET LOSS",
        "LOCATIONS",
        "LAST COMPLETED",
    ]);
    for row in rows {
        builder.push_record([
            row.target.clone(),
            ms(row.avg_latency),
            ms(row.avg_jitter),
            whole(row.avg_hop_count),
            // no error samples at all means none failed
            percent(Some(row.error_percentage.unwrap_or(0.0))),
            percent(row.packet_loss_percent),
            row.num_locations.to_string(),
            yes_no(row.last_trace_completed).to_string(),
        ]);
    }
    build(builder)
}

pub fn hosts(hosts: &[String]) -> Table {
    let mut builder = with_header(&["NAME"]);
    for host in hosts {
        builder.push_record([host.clone()]);
    }
    build(builder)
}

pub fn metadata(target: &str, meta: Option<&TargetMetadata>) -> Table {
    let protocols = meta
        .filter(|m| !m.protocols.is_empty())
        .map(|m| m.protocols.join(", "))
        .unwrap_or_else(|| "N/A".to_string());
    let mut builder = with_header(&["TARGET", "PROTOCOLS", "UNIQUE HOSTS", "UNIQUE PATHS"]);
    builder.push_record([
        target.to_string(),
        protocols,
        meta.map_or(0, |m| m.unique_hosts).to_string(),
        meta.map_or(0, |m| m.unique_paths).to_string(),
    ]);
    build(builder)
}

pub fn traces(rows: &[TraceSummary]) -> Table {
    let mut builder = with_header(&[
        "TIMESTAMP",
        "TRACE ID",
        "SOURCE HOST",
        "SOURCE IP",
        "AVG LATENCY",
        "MIN LATENCY",
        "MAX LATENCY",
        "AVG JITTER",
        "MIN JITTER",
        "MAX JITTER",
        "HOPS",
        "REACHABLE",
        "PACKET LOSS",
        "COMPLETED",
        "ERROR",
    ]);
    for row in rows {
        builder.push_record([
            timestamp(row.timestamp),
            row.trace_id.clone(),
            row.source_host.clone().unwrap_or_default(),
            row.source_ip.clone().unwrap_or_default(),
            ms(row.avg_latency),
            ms(row.min_latency),
            ms(row.max_latency),
            ms(row.avg_jitter),
            ms(row.min_jitter),
            ms(row.max_jitter),
            whole(row.hop_count),
            whole(row.reachable_hops),
            percent(row.packet_loss_percent),
            yes_no(row.last_trace_completed).to_string(),
            row.trace_error.clone().unwrap_or_else(|| "None".to_string()),
        ]);
    }
    build(builder)
}

fn location(hop: &PositionedHop) -> String {
    let parts: Vec<&str> = [&hop.hop.city, &hop.hop.region, &hop.hop.country_code]
        .into_iter()
        .filter_map(|p| p.as_deref())
        .collect();
    if parts.is_empty() {
        "Unknown".to_string()
    } else {
        parts.join(", ")
    }
}

fn asn(hop: &PositionedHop) -> String {
    match (&hop.hop.asn, &hop.hop.asn_name) {
        (Some(asn), Some(name)) => format!("AS{asn} {name}"),
        (Some(asn), None) => format!("AS{asn}"),
        (None, Some(name)) => name.clone(),
        (None, None) => "N/A".to_string(),
    }
}

/// Synthetic positions are marked with `~`.
fn position(hop: &PositionedHop) -> String {
    let marker = if hop.has_authoritative_coords { "" } else { "~" };
    format!(
        "{marker}{:.4}, {:.4}",
        hop.resolved_latitude, hop.resolved_longitude
    )
}

pub fn hops(map: &HopMap) -> Table {
    let mut builder = with_header(&[
        "HOP",
        "IP",
        "LOCATION",
        "ASN",
        "AVG LATENCY",
        "MIN LATENCY",
        "MAX LATENCY",
        "AVG JITTER",
        "PACKET LOSS",
        "KIND",
        "POSITION",
        "LATENCY +",
    ]);
    for (i, hop) in map.hops.iter().enumerate() {
        // latency added on the link into this hop
        let added = i
            .checked_sub(1)
            .and_then(|prev| map.edges.get(prev))
            .and_then(|e| e.latency_increase)
            .map(|v| format!("+{v:.2} ms"))
            .unwrap_or_default();
        builder.push_record([
            hop.hop.hop_number.to_string(),
            hop.hop.ip.clone().unwrap_or_else(|| "*".to_string()),
            location(hop),
            asn(hop),
            ms(hop.hop.avg_latency),
            ms(hop.hop.min_latency),
            ms(hop.hop.max_latency),
            ms(hop.hop.avg_jitter),
            percent(hop.hop.packet_loss),
            format!("{} ({})", hop.kind.as_str(), hop.marker_color),
            position(hop),
            added,
        ]);
    }
    build(builder)
}

pub fn trend(points: &[TrendPoint], unit: &str) -> Table {
    let mut builder = with_header(&["SOURCE", "FROM", "TO", "VALUE"]);
    for point in points {
        builder.push_record([
            point.source.clone(),
            timestamp(Some(point.begin_time_seconds * 1000)),
            timestamp(Some(point.end_time_seconds * 1000)),
            point
                .value
                .map_or_else(|| NO_DATA.to_string(), |v| format!("{v:.2}{unit}")),
        ]);
    }
    build(builder)
}

pub fn filter_keys(keys: &[FilterKey]) -> Table {
    let mut builder = with_header(&["KEY", "TYPE"]);
    for key in keys {
        builder.push_record([key.key.clone(), key.kind.clone().unwrap_or_default()]);
    }
    build(builder)
}

pub fn filter_values(values: &[String]) -> Table {
    let mut builder = with_header(&["VALUE"]);
    for value in values {
        builder.push_record([value.clone()]);
    }
    build(builder)
}
