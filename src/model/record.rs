use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::LookupError;

/// Top-level keys of a proxycheck.io v3 response that are not per-IP data.
const METADATA_KEYS: [&str; 4] = ["status", "message", "node", "query_time"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Detection {
    Proxy,
    Vpn,
    None,
    /// The lookup failed; no classification available
    Unknown,
}

impl Detection {
    /// VPN is the more specific flag, so it wins over proxy.
    pub fn from_flags(is_proxy: bool, is_vpn: bool) -> Self {
        if is_vpn {
            Detection::Vpn
        } else if is_proxy {
            Detection::Proxy
        } else {
            Detection::None
        }
    }
}

impl fmt::Display for Detection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Detection::Proxy => "proxy",
            Detection::Vpn => "vpn",
            Detection::None => "none",
            Detection::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Outcome of one reputation lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpRecord {
    pub ip: String,
    pub detection: Detection,
    /// 0-100, higher is worse
    pub risk: u8,
    pub country: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub organisation: Option<String>,
    #[serde(default)]
    pub asn: Option<String>,
    #[serde(default)]
    pub network_type: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub is_proxy: bool,
    #[serde(default)]
    pub is_vpn: bool,
    #[serde(default)]
    pub is_tor: bool,
    pub checked_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
}

/// Detections are read strictly; location and network are informational and
/// any field of the wrong type (or a null object) is read as absent.
#[derive(Debug, Default, Deserialize)]
struct IpData {
    #[serde(default)]
    detections: Detections,
    #[serde(default, deserialize_with = "lenient")]
    location: Location,
    #[serde(default, deserialize_with = "lenient")]
    network: Network,
}

#[derive(Debug, Default, Deserialize)]
struct Detections {
    #[serde(default)]
    proxy: bool,
    #[serde(default)]
    vpn: bool,
    #[serde(default)]
    tor: bool,
    #[serde(default)]
    risk: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct Location {
    #[serde(default, deserialize_with = "lenient")]
    country_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    country_code: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    region_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    city_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    longitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    timezone: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Network {
    #[serde(default, deserialize_with = "lenient")]
    provider: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    organisation: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    asn: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "lenient")]
    network_type: Option<String>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

impl IpRecord {
    /// Record for a lookup that never produced a usable answer.
    pub fn unknown(ip: &str, error: &LookupError) -> Self {
        IpRecord {
            ip: ip.to_string(),
            detection: Detection::Unknown,
            risk: 0,
            country: None,
            country_code: None,
            region: None,
            city: None,
            provider: None,
            organisation: None,
            asn: None,
            network_type: None,
            latitude: None,
            longitude: None,
            timezone: None,
            is_proxy: false,
            is_vpn: false,
            is_tor: false,
            checked_at: Utc::now(),
            error: Some(error.to_string()),
            raw: None,
        }
    }

    /// Build a record from a proxycheck.io v3 response body.
    ///
    /// The per-IP object is looked up under the address itself first, then
    /// under the first key that is not response metadata. The full body is
    /// kept in `raw`.
    pub fn from_response(ip: &str, body: Value) -> Result<Self, LookupError> {
        let obj = body
            .as_object()
            .ok_or_else(|| LookupError::InvalidResponse("response is not a JSON object".to_string()))?;

        let ip_value = obj
            .get(ip)
            .or_else(|| {
                obj.iter()
                    .find(|(key, _)| !METADATA_KEYS.contains(&key.as_str()))
                    .map(|(_, value)| value)
            })
            .ok_or_else(|| LookupError::InvalidResponse(format!("no data for {} in response", ip)))?;

        let data: IpData = serde_json::from_value(ip_value.clone())?;
        let risk = data.detections.risk.unwrap_or(0.0).round().clamp(0.0, 100.0) as u8;

        Ok(IpRecord {
            ip: ip.to_string(),
            detection: Detection::from_flags(data.detections.proxy, data.detections.vpn),
            risk,
            country: data.location.country_name,
            country_code: data.location.country_code,
            region: data.location.region_name,
            city: data.location.city_name,
            provider: data.network.provider,
            organisation: data.network.organisation,
            asn: data.network.asn,
            network_type: data.network.network_type,
            latitude: data.location.latitude,
            longitude: data.location.longitude,
            timezone: data.location.timezone,
            is_proxy: data.detections.proxy,
            is_vpn: data.detections.vpn,
            is_tor: data.detections.tor,
            checked_at: Utc::now(),
            error: None,
            raw: Some(body),
        })
    }

    pub fn is_resolved(&self) -> bool {
        self.detection != Detection::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_response() -> Value {
        json!({
            "status": "ok",
            "203.0.113.7": {
                "network": {
                    "asn": "AS64500",
                    "provider": "Example Hosting",
                    "organisation": "Example Org",
                    "type": "Hosting"
                },
                "location": {
                    "country_name": "Japan",
                    "country_code": "JP",
                    "region_name": "Tokyo",
                    "city_name": "Tokyo",
                    "latitude": 35.69,
                    "longitude": 139.69,
                    "timezone": "Asia/Tokyo"
                },
                "detections": {
                    "proxy": true,
                    "vpn": false,
                    "tor": false,
                    "risk": 66
                }
            },
            "query_time": 4
        })
    }

    #[test]
    fn test_from_response() {
        let record = IpRecord::from_response("203.0.113.7", sample_response()).unwrap();
        assert_eq!(record.detection, Detection::Proxy);
        assert_eq!(record.risk, 66);
        assert_eq!(record.country.as_deref(), Some("Japan"));
        assert_eq!(record.country_code.as_deref(), Some("JP"));
        assert_eq!(record.asn.as_deref(), Some("AS64500"));
        assert_eq!(record.network_type.as_deref(), Some("Hosting"));
        assert!(record.is_proxy);
        assert!(record.is_resolved());
        assert!(record.raw.is_some());
    }

    #[test]
    fn test_from_response_falls_back_to_first_data_key() {
        // service may echo a normalised form of the address
        let body = json!({
            "status": "ok",
            "2001:db8::1": { "detections": { "vpn": true, "proxy": true, "risk": 12 } }
        });
        let record = IpRecord::from_response("2001:0db8::1", body).unwrap();
        assert_eq!(record.detection, Detection::Vpn);
        assert_eq!(record.risk, 12);
        assert!(record.country.is_none());
    }

    #[test]
    fn test_risk_is_clamped() {
        let body = json!({ "1.1.1.1": { "detections": { "risk": 250 } } });
        let record = IpRecord::from_response("1.1.1.1", body).unwrap();
        assert_eq!(record.risk, 100);
        assert_eq!(record.detection, Detection::None);
    }

    #[test]
    fn test_from_response_rejects_missing_data() {
        let body = json!({ "status": "ok", "query_time": 1 });
        assert!(matches!(
            IpRecord::from_response("1.1.1.1", body),
            Err(LookupError::InvalidResponse(_))
        ));
        assert!(IpRecord::from_response("1.1.1.1", json!([1, 2])).is_err());
    }

    #[test]
    fn test_informational_fields_of_wrong_type_are_dropped() {
        let body = json!({
            "8.8.8.8": {
                "network": { "asn": 15169, "provider": "Google LLC" },
                "location": null,
                "detections": { "proxy": true, "risk": 80 }
            }
        });
        let record = IpRecord::from_response("8.8.8.8", body).unwrap();
        assert_eq!(record.detection, Detection::Proxy);
        assert_eq!(record.risk, 80);
        assert!(record.asn.is_none());
        assert_eq!(record.provider.as_deref(), Some("Google LLC"));
        assert!(record.country.is_none());

        let body = json!({
            "8.8.4.4": {
                "network": "unavailable",
                "location": { "country_name": "United States", "latitude": "n/a" },
                "detections": { "vpn": true, "risk": 5 }
            }
        });
        let record = IpRecord::from_response("8.8.4.4", body).unwrap();
        assert_eq!(record.detection, Detection::Vpn);
        assert_eq!(record.country.as_deref(), Some("United States"));
        assert!(record.latitude.is_none());
        assert!(record.provider.is_none());
    }

    #[test]
    fn test_malformed_detections_are_rejected() {
        let body = json!({ "1.1.1.1": { "detections": { "proxy": "maybe", "risk": 10 } } });
        assert!(matches!(
            IpRecord::from_response("1.1.1.1", body),
            Err(LookupError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_unknown_record() {
        let record = IpRecord::unknown("198.51.100.1", &LookupError::Timeout);
        assert_eq!(record.detection, Detection::Unknown);
        assert_eq!(record.risk, 0);
        assert_eq!(record.error.as_deref(), Some("Request timed out"));
        assert!(!record.is_resolved());
    }

    #[test]
    fn test_detection_serde() {
        assert_eq!(serde_json::to_string(&Detection::Vpn).unwrap(), "\"vpn\"");
        let d: Detection = serde_json::from_str("\"unknown\"").unwrap();
        assert_eq!(d, Detection::Unknown);
    }
}
