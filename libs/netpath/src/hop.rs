use serde::{Deserialize, Serialize};

use crate::de;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// One hop of a trace, as returned by the hop detail query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct HopRecord {
    #[serde(rename(deserialize = "hopNumber"), deserialize_with = "de::hop_number")]
    pub hop_number: u32,
    #[serde(rename(deserialize = "hop_ip"), default, deserialize_with = "de::opt_string")]
    pub ip: Option<String>,
    #[serde(rename(deserialize = "hop_lat"), default, deserialize_with = "de::opt_f64")]
    pub latitude: Option<f64>,
    #[serde(rename(deserialize = "hop_lon"), default, deserialize_with = "de::opt_f64")]
    pub longitude: Option<f64>,
    #[serde(rename(deserialize = "hop_asn"), default, deserialize_with = "de::opt_string")]
    pub asn: Option<String>,
    #[serde(
        rename(deserialize = "hop_asn_name"),
        default,
        deserialize_with = "de::opt_string"
    )]
    pub asn_name: Option<String>,
    #[serde(rename(deserialize = "hop_city"), default, deserialize_with = "de::opt_string")]
    pub city: Option<String>,
    #[serde(rename(deserialize = "hop_region"), default, deserialize_with = "de::opt_string")]
    pub region: Option<String>,
    #[serde(
        rename(deserialize = "hop_country_code"),
        default,
        deserialize_with = "de::opt_string"
    )]
    pub country_code: Option<String>,
    #[serde(rename(deserialize = "hop_is_target"), default, deserialize_with = "de::flag")]
    pub is_target: bool,
    #[serde(rename(deserialize = "hop_is_private"), default, deserialize_with = "de::flag")]
    pub is_private: bool,
    #[serde(rename(deserialize = "hop_is_timeout"), default, deserialize_with = "de::flag")]
    pub is_timeout: bool,
    /// Percent of probes lost at this hop.
    #[serde(rename(deserialize = "hop_packet_loss"), default, deserialize_with = "de::opt_f64")]
    pub packet_loss: Option<f64>,
    #[serde(rename(deserialize = "avg_hop_latency"), default, deserialize_with = "de::opt_f64")]
    pub avg_latency: Option<f64>,
    #[serde(rename(deserialize = "min_hop_latency"), default, deserialize_with = "de::opt_f64")]
    pub min_latency: Option<f64>,
    #[serde(rename(deserialize = "max_hop_latency"), default, deserialize_with = "de::opt_f64")]
    pub max_latency: Option<f64>,
    #[serde(rename(deserialize = "avg_hop_jitter"), default, deserialize_with = "de::opt_f64")]
    pub avg_jitter: Option<f64>,
    #[serde(rename(deserialize = "min_hop_jitter"), default, deserialize_with = "de::opt_f64")]
    pub min_jitter: Option<f64>,
    #[serde(rename(deserialize = "max_hop_jitter"), default, deserialize_with = "de::opt_f64")]
    pub max_jitter: Option<f64>,
}

impl HopRecord {
    pub fn new(hop_number: u32) -> Self {
        Self {
            hop_number,
            ..Default::default()
        }
    }

    pub fn at(mut self, lat: f64, lon: f64) -> Self {
        self.latitude = Some(lat);
        self.longitude = Some(lon);
        self
    }

    /// Measured position, only when both coordinates are present.
    pub fn coordinates(&self) -> Option<GeoPoint> {
        Some(GeoPoint::new(self.latitude?, self.longitude?))
    }

    pub fn kind(&self) -> HopKind {
        if self.is_timeout {
            HopKind::Timeout
        } else if self.is_private {
            HopKind::Private
        } else if self.is_target {
            HopKind::Target
        } else {
            HopKind::Regular
        }
    }
}

/// How a hop marker is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HopKind {
    Regular,
    Target,
    Private,
    Timeout,
}

impl HopKind {
    pub fn as_str(self) -> &'static str {
        match self {
            HopKind::Regular => "regular",
            HopKind::Target => "target",
            HopKind::Private => "private",
            HopKind::Timeout => "timeout",
        }
    }

    /// Marker fill for the map renderer.
    pub fn color(self) -> &'static str {
        match self {
            HopKind::Regular => "#3498db",
            HopKind::Target => "#2ecc71",
            HopKind::Private => "#9b59b6",
            HopKind::Timeout => "#e74c3c",
        }
    }
}

/// A hop with the position it is drawn at.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionedHop {
    #[serde(flatten)]
    pub hop: HopRecord,
    pub resolved_latitude: f64,
    pub resolved_longitude: f64,
    /// The drawn position is the measured one.
    pub has_authoritative_coords: bool,
    pub kind: HopKind,
    pub marker_color: &'static str,
}

impl PositionedHop {
    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.resolved_latitude, self.resolved_longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_hop_row() {
        let hop: HopRecord = serde_json::from_str(
            r#"{
                "facet": "3",
                "hopNumber": "3",
                "hop_ip": "142.250.64.110",
                "hop_is_private": false,
                "hop_asn": 15169,
                "hop_asn_name": "GOOGLE",
                "hop_lat": 37.422,
                "hop_lon": -122.084,
                "hop_city": "Mountain View",
                "hop_region": "CA",
                "hop_country_code": "US",
                "hop_is_target": true,
                "hop_is_timeout": false,
                "hop_packet_loss": 0,
                "avg_hop_latency": 12.5,
                "min_hop_latency": 11.0,
                "max_hop_latency": null,
                "avg_hop_jitter": 0.4
            }"#,
        )
        .unwrap();
        assert_eq!(hop.hop_number, 3);
        assert_eq!(hop.asn.as_deref(), Some("15169"));
        assert_eq!(hop.coordinates(), Some(GeoPoint::new(37.422, -122.084)));
        assert_eq!(hop.packet_loss, Some(0.0));
        assert_eq!(hop.max_latency, None);
        assert_eq!(hop.kind(), HopKind::Target);
    }

    #[test]
    fn test_half_coordinates_are_missing() {
        let hop: HopRecord =
            serde_json::from_str(r#"{"hopNumber": 1, "hop_lat": 10.0, "hop_lon": null}"#).unwrap();
        assert_eq!(hop.coordinates(), None);
    }

    #[test]
    fn test_kind_precedence() {
        let mut hop = HopRecord::new(1);
        hop.is_target = true;
        hop.is_private = true;
        assert_eq!(hop.kind(), HopKind::Private);
        hop.is_timeout = true;
        assert_eq!(hop.kind(), HopKind::Timeout);
        assert_eq!(hop.kind().as_str(), "timeout");
        assert_eq!(hop.kind().color(), "#e74c3c");
    }
}
