//! Values exchanged with the orchestration layer.

use std::fmt::{self, Display};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ============================================================================
// Volume
// ============================================================================

/// A volume as handed over by the orchestrator. The container is ambient
/// driver configuration, not part of the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub name: String,
    /// Size in GB. Orchestrators send it as a number or a numeric string.
    #[serde(rename = "size", deserialize_with = "size_from_number_or_string")]
    pub size_gb: u64,
}

impl Volume {
    pub fn new(name: impl Into<String>, size_gb: u64) -> Self {
        Self {
            name: name.into(),
            size_gb,
        }
    }
}

fn size_from_number_or_string<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Size {
        Number(u64),
        Text(String),
    }

    match Size::deserialize(deserializer)? {
        Size::Number(n) => Ok(n),
        Size::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid volume size '{}'", s))),
    }
}

// ============================================================================
// Stats
// ============================================================================

/// Capacity figure in GB, or `"unknown"` when the array did not report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CapacityGb {
    Known(u64),
    #[default]
    Unknown,
}

impl CapacityGb {
    pub fn from_bytes(bytes: u64) -> Self {
        CapacityGb::Known(bytes / BYTES_PER_GB)
    }
}

const BYTES_PER_GB: u64 = 1024 * 1024 * 1024;

impl Display for CapacityGb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapacityGb::Known(gb) => write!(f, "{}", gb),
            CapacityGb::Unknown => write!(f, "unknown"),
        }
    }
}

impl Serialize for CapacityGb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CapacityGb::Known(gb) => serializer.serialize_u64(*gb),
            CapacityGb::Unknown => serializer.serialize_str("unknown"),
        }
    }
}

/// Snapshot reported upward to the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeStats {
    pub total_capacity_gb: CapacityGb,
    pub free_capacity_gb: CapacityGb,
    pub volume_backend_name: String,
    pub vendor_name: String,
}

impl Default for VolumeStats {
    fn default() -> Self {
        Self {
            total_capacity_gb: CapacityGb::Unknown,
            free_capacity_gb: CapacityGb::Unknown,
            volume_backend_name: "unknown".to_string(),
            vendor_name: "Violin".to_string(),
        }
    }
}

// ============================================================================
// ExportInfo
// ============================================================================

/// Connection details of an exported volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportInfo {
    /// Target name on the array
    pub target: String,
    pub iqn: String,
    /// LUN number assigned by the array
    pub lun_id: String,
    /// `"<ip>:<port>, <iqn> <lun>"`
    pub provider_location: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_size_number_or_string() {
        let v: Volume = serde_json::from_str(r#"{"name": "vol-01", "size": 10}"#).unwrap();
        assert_eq!(v, Volume::new("vol-01", 10));

        let v: Volume = serde_json::from_str(r#"{"name": "vol-01", "size": "10"}"#).unwrap();
        assert_eq!(v.size_gb, 10);

        assert!(serde_json::from_str::<Volume>(r#"{"name": "vol-01", "size": "ten"}"#).is_err());
    }

    #[test]
    fn test_capacity_from_bytes() {
        assert_eq!(CapacityGb::from_bytes(100 * BYTES_PER_GB), CapacityGb::Known(100));
        assert_eq!(CapacityGb::from_bytes(BYTES_PER_GB - 1), CapacityGb::Known(0));
    }

    #[test]
    fn test_stats_serialization() {
        let json = serde_json::to_value(VolumeStats::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "total_capacity_gb": "unknown",
                "free_capacity_gb": "unknown",
                "volume_backend_name": "unknown",
                "vendor_name": "Violin",
            })
        );

        let stats = VolumeStats {
            total_capacity_gb: CapacityGb::Known(100),
            free_capacity_gb: CapacityGb::Known(40),
            ..VolumeStats::default()
        };
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["total_capacity_gb"], 100);
        assert_eq!(json["free_capacity_gb"], 40);
    }
}
