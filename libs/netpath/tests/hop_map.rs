use approx::assert_relative_eq;
use netpath::{HopMap, HopRecord, layout::JITTER_RADIUS};
use serde_json::json;

fn hops(rows: serde_json::Value) -> Vec<HopRecord> {
    serde_json::from_value(rows).unwrap()
}

#[test]
fn private_hops_between_located_ones_are_interpolated() {
    let map = HopMap::new(hops(json!([
        {"hopNumber": "1", "hop_ip": "192.168.1.1", "hop_is_private": true},
        {"hopNumber": "2", "hop_ip": "10.10.0.1", "hop_is_private": true},
        {"hopNumber": "3", "hop_ip": "4.69.0.1", "hop_lat": 40.7128, "hop_lon": -74.006},
        {"hopNumber": "4", "hop_ip": "*", "hop_is_timeout": true},
        {"hopNumber": "5", "hop_ip": "142.250.64.110", "hop_lat": 37.4220, "hop_lon": -122.084,
         "hop_is_target": true}
    ])));

    let h = &map.hops;
    assert_relative_eq!(h[0].resolved_latitude, 40.7128 - 0.6, epsilon = 1e-9);
    assert_relative_eq!(h[1].resolved_longitude, -74.006 - 0.3, epsilon = 1e-9);
    assert_relative_eq!(h[3].resolved_latitude, (40.7128 + 37.422) / 2.0, epsilon = 1e-9);
    assert_relative_eq!(h[3].resolved_longitude, (-74.006 - 122.084) / 2.0, epsilon = 1e-9);
    let authoritative: Vec<_> = h.iter().map(|h| h.has_authoritative_coords).collect();
    assert_eq!(authoritative, [false, false, true, false, true]);

    assert_relative_eq!(map.center.lon, (-74.006 - 122.084) / 2.0, epsilon = 1e-9);
}

#[test]
fn duplicate_positions_are_spread_on_a_circle() {
    let map = HopMap::new(hops(json!([
        {"hopNumber": 1, "hop_lat": 48.8566, "hop_lon": 2.3522},
        {"hopNumber": 2, "hop_lat": 48.8566, "hop_lon": 2.3522},
        {"hopNumber": 3, "hop_lat": 48.8566, "hop_lon": 2.3522},
        {"hopNumber": 4, "hop_lat": 52.52, "hop_lon": 13.405}
    ])));
    for hop in &map.hops[..3] {
        let d_lat = hop.resolved_latitude - 48.8566;
        let d_lon = hop.resolved_longitude - 2.3522;
        assert_relative_eq!(d_lat.hypot(d_lon), JITTER_RADIUS, epsilon = 1e-9);
        assert!(!hop.has_authoritative_coords);
    }
    assert!(map.hops[3].has_authoritative_coords);
}

#[test]
fn map_serializes_for_rendering() {
    let map = HopMap::new(hops(json!([
        {"hopNumber": "1", "hop_ip": "10.0.0.1", "avg_hop_latency": 1.0},
        {"hopNumber": "2", "hop_ip": "10.0.0.2", "avg_hop_latency": 4.5}
    ])));
    let value = serde_json::to_value(&map).unwrap();
    assert_eq!(value["hops"][0]["hopNumber"], 1);
    assert_eq!(value["hops"][0]["ip"], "10.0.0.1");
    assert_eq!(value["hops"][0]["hasAuthoritativeCoords"], false);
    assert_eq!(value["hops"][1]["kind"], "regular");
    assert_eq!(value["hops"][1]["markerColor"], "#3498db");
    assert_eq!(value["edges"][0]["latencyIncrease"], 3.5);
    assert_eq!(value["polyline"].as_array().unwrap().len(), 2);
}
