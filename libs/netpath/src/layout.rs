//! Map placement for trace hops.
//!
//! Hops without geolocation (private addresses, timeouts) still need a marker,
//! so their position is interpolated between the nearest located neighbours,
//! or extrapolated from the one neighbour that exists. Markers that land on
//! the same spot are then fanned out on a small circle.

use std::collections::HashMap;
use std::f64::consts::TAU;

use serde::Serialize;

use crate::hop::{GeoPoint, HopRecord, PositionedHop};

/// Geographic center of the contiguous United States.
pub const DEFAULT_CENTER: GeoPoint = GeoPoint::new(39.8283, -98.5795);
/// Per hop offset used when nothing is located.
pub const DEFAULT_STEP: f64 = 0.5;
/// Per hop offset away from the nearest located neighbour.
pub const EXTRAPOLATION_STEP: f64 = 0.3;
/// Decimal places two positions must share to collide.
pub const COLLISION_PRECISION: i32 = 4;
/// Radius, in degrees, of the circle colliding markers are spread on.
pub const JITTER_RADIUS: f64 = 0.12;

fn default_position(index: usize) -> GeoPoint {
    let offset = index as f64 * DEFAULT_STEP;
    GeoPoint::new(DEFAULT_CENTER.lat + offset, DEFAULT_CENTER.lon + offset)
}

fn collision_key(p: GeoPoint) -> (i64, i64) {
    let scale = 10f64.powi(COLLISION_PRECISION);
    ((p.lat * scale).round() as i64, (p.lon * scale).round() as i64)
}

/// Sorts hops by hop number and gives every one of them a position.
pub fn layout(hops: impl IntoIterator<Item = HopRecord>) -> Vec<PositionedHop> {
    let mut hops: Vec<HopRecord> = hops.into_iter().collect();
    hops.sort_by_key(|h| h.hop_number);

    let known: Vec<Option<GeoPoint>> = hops.iter().map(HopRecord::coordinates).collect();

    let mut positions: Vec<(GeoPoint, bool)> = if known.iter().all(Option::is_none) {
        (0..hops.len()).map(|i| (default_position(i), false)).collect()
    } else {
        (0..hops.len())
            .map(|i| base_position(&known, i))
            .collect()
    };

    let mut groups: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
    for (i, (pos, _)) in positions.iter().enumerate() {
        groups.entry(collision_key(*pos)).or_default().push(i);
    }
    for members in groups.values().filter(|m| m.len() > 1) {
        let n = members.len() as f64;
        for (nth, &i) in members.iter().enumerate() {
            let angle = TAU * nth as f64 / n;
            let (pos, authoritative) = &mut positions[i];
            pos.lat += JITTER_RADIUS * angle.sin();
            pos.lon += JITTER_RADIUS * angle.cos();
            *authoritative = false;
        }
    }

    hops.into_iter()
        .zip(positions)
        .map(|(hop, (pos, authoritative))| {
            let kind = hop.kind();
            PositionedHop {
                hop,
                resolved_latitude: pos.lat,
                resolved_longitude: pos.lon,
                has_authoritative_coords: authoritative,
                kind,
                marker_color: kind.color(),
            }
        })
        .collect()
}

fn base_position(known: &[Option<GeoPoint>], index: usize) -> (GeoPoint, bool) {
    if let Some(p) = known[index] {
        return (p, true);
    }
    let prev = known[..index]
        .iter()
        .enumerate()
        .rev()
        .find_map(|(i, p)| Some((i, (*p)?)));
    let next = known[index + 1..]
        .iter()
        .enumerate()
        .find_map(|(i, p)| Some((index + 1 + i, (*p)?)));

    let pos = match (prev, next) {
        (Some((pi, p)), Some((ni, n))) => {
            let ratio = (index - pi) as f64 / (ni - pi) as f64;
            GeoPoint::new(
                p.lat + (n.lat - p.lat) * ratio,
                p.lon + (n.lon - p.lon) * ratio,
            )
        }
        (Some((pi, p)), None) => {
            let offset = EXTRAPOLATION_STEP * (index - pi) as f64;
            GeoPoint::new(p.lat + offset, p.lon + offset)
        }
        (None, Some((ni, n))) => {
            let offset = EXTRAPOLATION_STEP * (ni - index) as f64;
            GeoPoint::new(n.lat - offset, n.lon - offset)
        }
        (None, None) => default_position(index),
    };
    (pos, false)
}

/// Midpoint of the extents of all drawn positions.
pub fn map_center(hops: &[PositionedHop]) -> GeoPoint {
    if hops.is_empty() {
        return DEFAULT_CENTER;
    }
    let (mut min, mut max) = (
        GeoPoint::new(f64::INFINITY, f64::INFINITY),
        GeoPoint::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
    );
    for p in hops.iter().map(PositionedHop::position) {
        min.lat = min.lat.min(p.lat);
        min.lon = min.lon.min(p.lon);
        max.lat = max.lat.max(p.lat);
        max.lon = max.lon.max(p.lon);
    }
    GeoPoint::new((min.lat + max.lat) / 2.0, (min.lon + max.lon) / 2.0)
}

pub fn polyline(hops: &[PositionedHop]) -> Vec<GeoPoint> {
    hops.iter().map(PositionedHop::position).collect()
}

/// A link between consecutive hops.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HopEdge {
    pub from: u32,
    pub to: u32,
    /// Latency added by the link, when positive.
    pub latency_increase: Option<f64>,
}

pub fn path_edges(hops: &[PositionedHop]) -> Vec<HopEdge> {
    hops.windows(2)
        .map(|pair| {
            let (a, b) = (&pair[0].hop, &pair[1].hop);
            let diff = b.avg_latency.unwrap_or(0.0) - a.avg_latency.unwrap_or(0.0);
            HopEdge {
                from: a.hop_number,
                to: b.hop_number,
                latency_increase: (diff > 0.0).then_some(diff),
            }
        })
        .collect()
}

/// Everything needed to draw one trace on a map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HopMap {
    pub hops: Vec<PositionedHop>,
    pub center: GeoPoint,
    pub polyline: Vec<GeoPoint>,
    pub edges: Vec<HopEdge>,
}

impl HopMap {
    pub fn new(records: impl IntoIterator<Item = HopRecord>) -> Self {
        let hops = layout(records);
        Self {
            center: map_center(&hops),
            polyline: polyline(&hops),
            edges: path_edges(&hops),
            hops,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn positions(hops: &[PositionedHop]) -> Vec<(f64, f64, bool)> {
        hops.iter()
            .map(|h| (h.resolved_latitude, h.resolved_longitude, h.has_authoritative_coords))
            .collect()
    }

    #[test]
    fn test_empty() {
        assert!(layout(Vec::new()).is_empty());
        assert_eq!(map_center(&[]), DEFAULT_CENTER);
        assert!(HopMap::new(Vec::new()).is_empty());
    }

    #[test]
    fn test_located_hops_pass_through() {
        let hops = layout([
            HopRecord::new(2).at(40.0, -74.0),
            HopRecord::new(1).at(37.0, -122.0),
            HopRecord::new(3).at(51.5, -0.1),
        ]);
        assert_eq!(
            hops.iter().map(|h| h.hop.hop_number).collect::<Vec<_>>(),
            [1, 2, 3]
        );
        assert_eq!(
            positions(&hops),
            [(37.0, -122.0, true), (40.0, -74.0, true), (51.5, -0.1, true)]
        );
    }

    #[test]
    fn test_midpoint_interpolation() {
        let hops = layout([
            HopRecord::new(1).at(10.0, 10.0),
            HopRecord::new(2),
            HopRecord::new(3).at(20.0, 20.0),
        ]);
        assert_relative_eq!(hops[1].resolved_latitude, 15.0, epsilon = 1e-9);
        assert_relative_eq!(hops[1].resolved_longitude, 15.0, epsilon = 1e-9);
        assert!(!hops[1].has_authoritative_coords);
        assert!(hops[0].has_authoritative_coords);
        assert!(hops[2].has_authoritative_coords);
    }

    #[test]
    fn test_interpolation_spreads_across_gap() {
        let hops = layout([
            HopRecord::new(1).at(0.0, 0.0),
            HopRecord::new(2),
            HopRecord::new(3),
            HopRecord::new(4).at(30.0, 60.0),
        ]);
        assert_relative_eq!(hops[1].resolved_latitude, 10.0, epsilon = 1e-9);
        assert_relative_eq!(hops[1].resolved_longitude, 20.0, epsilon = 1e-9);
        assert_relative_eq!(hops[2].resolved_latitude, 20.0, epsilon = 1e-9);
        assert_relative_eq!(hops[2].resolved_longitude, 40.0, epsilon = 1e-9);
    }

    #[test]
    fn test_extrapolation() {
        let hops = layout([
            HopRecord::new(1),
            HopRecord::new(2),
            HopRecord::new(3).at(10.0, 20.0),
            HopRecord::new(4),
        ]);
        assert_relative_eq!(hops[0].resolved_latitude, 9.4, epsilon = 1e-9);
        assert_relative_eq!(hops[0].resolved_longitude, 19.4, epsilon = 1e-9);
        assert_relative_eq!(hops[1].resolved_latitude, 9.7, epsilon = 1e-9);
        assert_relative_eq!(hops[1].resolved_longitude, 19.7, epsilon = 1e-9);
        assert_relative_eq!(hops[3].resolved_latitude, 10.3, epsilon = 1e-9);
        assert_relative_eq!(hops[3].resolved_longitude, 20.3, epsilon = 1e-9);
        assert!(hops.iter().filter(|h| h.has_authoritative_coords).count() == 1);
    }

    #[test]
    fn test_no_coordinates_uses_default_center() {
        let hops = layout([HopRecord::new(3), HopRecord::new(1), HopRecord::new(2)]);
        for (i, hop) in hops.iter().enumerate() {
            assert_eq!(hop.hop.hop_number, i as u32 + 1);
            assert_relative_eq!(hop.resolved_latitude, 39.8283 + 0.5 * i as f64, epsilon = 1e-9);
            assert_relative_eq!(hop.resolved_longitude, -98.5795 + 0.5 * i as f64, epsilon = 1e-9);
            assert!(!hop.has_authoritative_coords);
        }
    }

    #[test]
    fn test_collisions_fan_out() {
        let hops = layout([
            HopRecord::new(1).at(5.0, 5.0),
            HopRecord::new(2).at(5.0, 5.0),
        ]);
        // first member sits at angle 0, second at pi
        assert_relative_eq!(hops[0].resolved_latitude, 5.0, epsilon = 1e-9);
        assert_relative_eq!(hops[0].resolved_longitude, 5.12, epsilon = 1e-9);
        assert_relative_eq!(hops[1].resolved_latitude, 5.0, epsilon = 1e-12);
        assert_relative_eq!(hops[1].resolved_longitude, 4.88, epsilon = 1e-9);
        assert!(hops.iter().all(|h| !h.has_authoritative_coords));
    }

    #[test]
    fn test_near_duplicates_collide() {
        let hops = layout([
            HopRecord::new(1).at(5.00001, 5.0),
            HopRecord::new(2).at(5.00002, 5.0),
            HopRecord::new(3).at(5.01, 5.0),
        ]);
        assert!(!hops[0].has_authoritative_coords);
        assert!(!hops[1].has_authoritative_coords);
        assert!(hops[2].has_authoritative_coords);
    }

    #[test]
    fn test_sorted_input_is_stable() {
        let input: Vec<_> = (1..=5)
            .map(|n| HopRecord::new(n).at(n as f64, n as f64 * 2.0))
            .collect();
        let hops = layout(input.clone());
        let order: Vec<_> = hops.iter().map(|h| h.hop.hop_number).collect();
        assert_eq!(order, [1, 2, 3, 4, 5]);
        assert_eq!(hops.into_iter().map(|h| h.hop).collect::<Vec<_>>(), input);
    }

    #[test]
    fn test_center_and_polyline() {
        let hops = layout([
            HopRecord::new(1).at(10.0, -20.0),
            HopRecord::new(2).at(30.0, 40.0),
            HopRecord::new(3).at(20.0, 0.0),
        ]);
        let center = map_center(&hops);
        assert_relative_eq!(center.lat, 20.0, epsilon = 1e-9);
        assert_relative_eq!(center.lon, 10.0, epsilon = 1e-9);
        assert_eq!(
            polyline(&hops),
            [
                GeoPoint::new(10.0, -20.0),
                GeoPoint::new(30.0, 40.0),
                GeoPoint::new(20.0, 0.0)
            ]
        );
    }

    #[test]
    fn test_edges_report_latency_increase() {
        let mut a = HopRecord::new(1);
        a.avg_latency = Some(1.5);
        let mut b = HopRecord::new(2);
        b.avg_latency = Some(10.0);
        let c = HopRecord::new(3);
        let edges = path_edges(&layout([a, b, c]));
        assert_eq!(edges.len(), 2);
        assert_eq!((edges[0].from, edges[0].to), (1, 2));
        assert_relative_eq!(edges[0].latency_increase.unwrap(), 8.5, epsilon = 1e-9);
        assert_eq!(edges[1].latency_increase, None);
    }
}
