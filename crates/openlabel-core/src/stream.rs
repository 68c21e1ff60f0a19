//! Sensor streams and their intrinsic parameters.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{OpenLabelError, Result};

/// Sensor category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamType {
    Camera,
    Lidar,
    Radar,
    GpsImu,
    #[default]
    Other,
}

/// A named data source; the name is the key it is stored under.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Stream {
    #[serde(rename = "type")]
    pub stream_type: StreamType,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uri: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "StreamProperties::is_empty")]
    pub stream_properties: StreamProperties,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Stream {
    pub fn new(stream_type: StreamType, uri: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            stream_type,
            uri: uri.into(),
            description: description.into(),
            ..Self::default()
        }
    }
}

// ── Intrinsics ─────────────────────────────────────────────────

/// Pinhole camera model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pinhole {
    pub width_px: u32,
    pub height_px: u32,
    /// Row-major 3x4 projection matrix.
    pub camera_matrix_3x4: [f64; 12],
    /// Empty, or 5 to 14 distortion coefficients.
    #[serde(rename = "distortion_coeffs_1xN", default)]
    pub distortion_coeffs: Vec<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Fisheye camera model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fisheye {
    pub width_px: u32,
    pub height_px: u32,
    pub lens_coeffs_1x4: [f64; 4],
    pub fov_deg: f64,
    pub center_x: f64,
    pub center_y: f64,
    pub radius_x: f64,
    pub radius_y: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Mutually exclusive intrinsic parameter payloads.
#[derive(Debug, Clone, PartialEq)]
pub enum Intrinsics {
    Pinhole(Pinhole),
    Fisheye(Fisheye),
    /// Caller-defined properties.
    Custom(Map<String, Value>),
}

impl Intrinsics {
    pub fn pinhole(
        width_px: u32,
        height_px: u32,
        camera_matrix_3x4: [f64; 12],
        distortion_coeffs: Vec<f64>,
    ) -> Result<Self> {
        let intrinsics = Self::Pinhole(Pinhole {
            width_px,
            height_px,
            camera_matrix_3x4,
            distortion_coeffs,
            extra: Map::new(),
        });
        intrinsics.validate()?;
        Ok(intrinsics)
    }

    pub fn key(&self) -> &'static str {
        match self {
            Self::Pinhole(_) => "intrinsics_pinhole",
            Self::Fisheye(_) => "intrinsics_fisheye",
            Self::Custom(_) => "intrinsics_custom",
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Pinhole(p) => {
                let n = p.distortion_coeffs.len();
                if n != 0 && !(5..=14).contains(&n) {
                    return Err(OpenLabelError::shape(format!(
                        "pinhole distortion takes 5 to 14 coefficients, got {n}"
                    )));
                }
                Ok(())
            }
            Self::Fisheye(f) => {
                if !(f.fov_deg.is_finite() && f.fov_deg > 0.0) {
                    return Err(OpenLabelError::shape("fisheye fov_deg must be positive"));
                }
                Ok(())
            }
            Self::Custom(_) => Ok(()),
        }
    }
}

/// Frame correspondence between a stream and the document's master frames.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StreamSync {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_stream: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_shift: Option<i64>,
}

// ── Stream properties ──────────────────────────────────────────

/// Intrinsics, sync info and any caller-defined properties of a stream.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct StreamProperties {
    pub intrinsics: Option<Intrinsics>,
    pub sync: Option<StreamSync>,
    pub extra: Map<String, Value>,
}

const INTRINSICS_KEYS: [&str; 3] = ["intrinsics_pinhole", "intrinsics_fisheye", "intrinsics_custom"];

impl StreamProperties {
    pub fn is_empty(&self) -> bool {
        self.intrinsics.is_none() && self.sync.is_none() && self.extra.is_empty()
    }

    pub fn with_intrinsics(mut self, intrinsics: Intrinsics) -> Self {
        self.intrinsics = Some(intrinsics);
        self
    }

    pub fn with_sync(mut self, sync: StreamSync) -> Self {
        self.sync = Some(sync);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(i) = &self.intrinsics {
            i.validate()?;
        }
        if let Some(key) = INTRINSICS_KEYS.iter().find(|k| self.extra.contains_key(**k)) {
            return Err(OpenLabelError::shape(format!(
                "`{key}` must be set through the intrinsics slot"
            )));
        }
        Ok(())
    }

    /// Overlay `other` onto `self`: set fields replace, extra keys merge.
    pub fn merge(&mut self, other: StreamProperties) {
        if other.intrinsics.is_some() {
            self.intrinsics = other.intrinsics;
        }
        if other.sync.is_some() {
            self.sync = other.sync;
        }
        self.extra.extend(other.extra);
    }
}

fn decode<T: serde::de::DeserializeOwned>(key: &str, value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| OpenLabelError::shape(format!("stream_properties.{key}: {e}")))
}

impl TryFrom<Map<String, Value>> for StreamProperties {
    type Error = OpenLabelError;

    fn try_from(mut map: Map<String, Value>) -> Result<Self> {
        let present: Vec<&str> = INTRINSICS_KEYS
            .into_iter()
            .filter(|k| map.contains_key(*k))
            .collect();
        if present.len() > 1 {
            return Err(OpenLabelError::shape(format!(
                "stream_properties holds more than one intrinsics model: {}",
                present.join(", ")
            )));
        }

        let intrinsics = match present.first().copied() {
            Some(key) => {
                let value = map.remove(key).unwrap_or(Value::Null);
                Some(match key {
                    "intrinsics_pinhole" => Intrinsics::Pinhole(decode(key, value)?),
                    "intrinsics_fisheye" => Intrinsics::Fisheye(decode(key, value)?),
                    _ => Intrinsics::Custom(decode(key, value)?),
                })
            }
            None => None,
        };
        let sync = match map.remove("sync") {
            Some(v) => Some(decode("sync", v)?),
            None => None,
        };

        let props = Self {
            intrinsics,
            sync,
            extra: map,
        };
        props.validate()?;
        Ok(props)
    }
}

impl From<StreamProperties> for Map<String, Value> {
    fn from(props: StreamProperties) -> Self {
        let mut map = props.extra;
        if let Some(intrinsics) = props.intrinsics {
            let key = intrinsics.key();
            let value = match intrinsics {
                Intrinsics::Pinhole(p) => serde_json::to_value(p),
                Intrinsics::Fisheye(f) => serde_json::to_value(f),
                Intrinsics::Custom(c) => Ok(Value::Object(c)),
            };
            if let Ok(value) = value {
                map.insert(key.to_string(), value);
            }
        }
        if let Some(sync) = props.sync {
            if let Ok(value) = serde_json::to_value(sync) {
                map.insert("sync".to_string(), value);
            }
        }
        map
    }
}
