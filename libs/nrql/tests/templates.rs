use nrql::templates::{self, TrendMetric};
use nrql::{Conjunction, FilterExpr, FilterSelection, Operator, TimeWindow, compile};

fn user_filter() -> FilterExpr {
    compile(&[
        FilterSelection::new("hostname", Operator::Equal)
            .value("web-01")
            .then(Conjunction::Or),
        FilterSelection::new("protocol", Operator::In).values(["TCP"]),
    ])
}

#[test]
fn summary_matches_overview_query() {
    let nrql = templates::network_path_summary(TimeWindow::DEFAULT).to_string();
    assert_eq!(
        nrql,
        "FROM InfrastructureEvent SELECT average(avgLatencyMs) AS 'avg_latency', \
         average(avgJitterMs) AS 'avg_jitter', average(totalHops) AS 'avg_hop_count', \
         percentage(count(error), WHERE error IS NOT NULL) AS 'error_percentage', \
         average(packetLossPercent) AS 'packet_loss_percent', \
         uniqueCount(hostname) AS 'num_locations', \
         latest(traceCompleted) AS 'last_trace_completed' \
         WHERE summary = 'NetworkPathSample' FACET targetHost AS 'target' \
         SINCE 30 MINUTES AGO LIMIT 500"
    );
}

#[test]
fn traces_wrap_user_filter_before_template_predicates() {
    let window = TimeWindow::Between { begin: 1, end: 2 };
    let nrql = templates::traces_for_target(window, "example.com", &user_filter()).to_string();
    assert!(
        nrql.contains(
            "WHERE (hostname = 'web-01' OR protocol IN ('TCP')) \
             AND summary = 'NetworkPathSample' AND targetHost = 'example.com' \
             FACET traceId SINCE 1 UNTIL 2 LIMIT 1000"
        ),
        "unexpected trace query: {nrql}"
    );
    assert!(nrql.contains("latest(error) AS 'trace_error'"));
}

#[test]
fn traces_without_filter_have_plain_where() {
    let nrql =
        templates::traces_for_target(TimeWindow::DEFAULT, "example.com", &FilterExpr::default())
            .to_string();
    assert!(nrql.contains(" WHERE summary = 'NetworkPathSample' AND targetHost = 'example.com'"));
}

#[test]
fn single_condition_filter_is_not_parenthesized() {
    let filter = compile(&[FilterSelection::new("sourceIp", Operator::NotEqual).value("10.0.0.1")]);
    let nrql = templates::trace_trend(
        TimeWindow::DEFAULT,
        "example.com",
        &filter,
        TrendMetric::Jitter,
    )
    .to_string();
    assert_eq!(
        nrql,
        "FROM InfrastructureEvent SELECT latest(avgJitterMs) AS 'avg_jitter' \
         WHERE sourceIp != '10.0.0.1' AND summary = 'NetworkPathSample' \
         AND targetHost = 'example.com' FACET sourceIp SINCE 30 MINUTES AGO TIMESERIES AUTO"
    );
}

#[test]
fn hop_details_scope_to_trace() {
    let nrql = templates::hop_details(TimeWindow::DEFAULT, "example.com", "abc-123").to_string();
    assert!(nrql.starts_with("FROM InfrastructureEvent SELECT latest(hopIp) AS 'hop_ip'"));
    assert!(nrql.contains("latest(isDestination) AS 'hop_is_target'"));
    assert!(nrql.ends_with(
        "WHERE summary = 'NetworkPathHopSample' AND targetHost = 'example.com' \
         AND traceId = 'abc-123' FACET hopNumber SINCE 30 MINUTES AGO LIMIT 250"
    ));
}

#[test]
fn user_supplied_values_cannot_escape_literals() {
    let nrql = templates::source_hosts(TimeWindow::DEFAULT, "x' OR 1=1 --").to_string();
    assert!(nrql.contains("targetHost = 'x\\' OR 1=1 --'"));

    let nrql = templates::filter_values("hostname) FROM Transaction --").to_string();
    assert!(nrql.contains("uniques(`hostname) FROM Transaction --`) AS 'values'"));
}

#[test]
fn discovery_queries_use_two_week_window() {
    assert_eq!(
        templates::filter_keys().to_string(),
        "FROM InfrastructureEvent SELECT keyset() WHERE summary = 'NetworkPathSample' \
         SINCE 14 DAYS AGO"
    );
    assert_eq!(
        templates::filter_values("hostname").to_string(),
        "FROM InfrastructureEvent SELECT uniques(hostname) AS 'values' \
         WHERE summary = 'NetworkPathSample' SINCE 14 DAYS AGO"
    );
}

#[test]
fn metadata_selects_paths_hosts_protocols() {
    let nrql = templates::target_metadata(TimeWindow::DEFAULT, "example.com").to_string();
    assert!(nrql.contains(
        "uniqueCount(pathHash) AS 'unique_paths', uniqueCount(hostname) AS 'unique_hosts', \
         uniques(protocol) AS 'protocols'"
    ));
}

#[test]
fn exclusion_list_hides_metric_keys() {
    assert!(!templates::is_filterable_key("avgLatencyMs"));
    assert!(!templates::is_filterable_key("entityGuid"));
    assert!(templates::is_filterable_key("hostname"));
    assert!(templates::is_filterable_key("sourceIp"));
}
