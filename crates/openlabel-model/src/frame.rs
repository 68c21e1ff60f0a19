//! Per-frame registry of elements and frame-level properties.

use std::collections::{BTreeMap, BTreeSet};

use openlabel_core::{ElementDataSet, OpenLabelError, Result, StreamProperties, Transform, Uid};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::element::ElementKind;

/// Data an element has at one frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameElement {
    pub data: ElementDataSet,
}

/// Frame timestamp, kept in whatever form the producer wrote it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Text(String),
    Number(Number),
}

impl From<&str> for Timestamp {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Timestamp {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<u64> for Timestamp {
    fn from(n: u64) -> Self {
        Self::Number(n.into())
    }
}

/// Stream info that only holds for one frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameStream {
    #[serde(default, skip_serializing_if = "StreamProperties::is_empty")]
    pub stream_properties: StreamProperties,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub streams: BTreeMap<String, FrameStream>,
    /// Keyed `{src}_to_{dst}`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub transforms: BTreeMap<String, Transform>,
    /// Free-form properties, e.g. odometry.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FrameProperties {
    pub fn is_empty(&self) -> bool {
        self.timestamp.is_none()
            && self.streams.is_empty()
            && self.transforms.is_empty()
            && self.extra.is_empty()
    }
}

/// Frame property holding [`Odometry`].
pub const ODOMETRY_KEY: &str = "odometry";

/// Pose of the vehicle's local coordinate system in the world coordinate
/// system at one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Odometry {
    /// Row-major 4x4 matrix.
    pub pose_lcs_wrt_wcs_4x4: [f64; 16],
    /// Further readings such as speed or yaw rate.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Odometry {
    pub fn new(pose_lcs_wrt_wcs_4x4: [f64; 16]) -> Self {
        Self {
            pose_lcs_wrt_wcs_4x4,
            extra: Map::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.pose_lcs_wrt_wcs_4x4.iter().all(|x| x.is_finite()) {
            Ok(())
        } else {
            Err(OpenLabelError::shape("odometry pose contains a non-finite number"))
        }
    }
}

/// One discrete time step.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    pub objects: BTreeMap<Uid, FrameElement>,
    pub actions: BTreeMap<Uid, FrameElement>,
    pub events: BTreeMap<Uid, FrameElement>,
    pub contexts: BTreeMap<Uid, FrameElement>,
    pub relations: BTreeSet<Uid>,
    pub properties: FrameProperties,
}

impl Frame {
    pub fn elements(&self, kind: ElementKind) -> &BTreeMap<Uid, FrameElement> {
        match kind {
            ElementKind::Object => &self.objects,
            ElementKind::Action => &self.actions,
            ElementKind::Event => &self.events,
            ElementKind::Context => &self.contexts,
        }
    }

    pub fn elements_mut(&mut self, kind: ElementKind) -> &mut BTreeMap<Uid, FrameElement> {
        match kind {
            ElementKind::Object => &mut self.objects,
            ElementKind::Action => &mut self.actions,
            ElementKind::Event => &mut self.events,
            ElementKind::Context => &mut self.contexts,
        }
    }

    /// Data of one element at this frame.
    pub fn element_data(&self, kind: ElementKind, uid: &Uid) -> Option<&ElementDataSet> {
        self.elements(kind).get(uid).map(|e| &e.data)
    }

    pub fn is_empty(&self) -> bool {
        ElementKind::ALL
            .into_iter()
            .all(|k| self.elements(k).is_empty())
            && self.relations.is_empty()
            && self.properties.is_empty()
    }
}
