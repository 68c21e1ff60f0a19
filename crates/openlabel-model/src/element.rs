//! Objects, actions, events and contexts.

use std::collections::BTreeMap;
use std::fmt;

use openlabel_core::wire::JsonMap;
use openlabel_core::{DataType, ElementDataSet, FrameInterval, FrameIntervals, Uid};
use serde::{Deserialize, Serialize};

use crate::pointer::DataPointers;

/// Links an element to identifiers inside external resources: resource UID
/// to the id the element has within that resource.
pub type ResourceUid = BTreeMap<Uid, String>;

/// The four primary annotation entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Object,
    Action,
    Event,
    Context,
}

impl ElementKind {
    pub const ALL: [ElementKind; 4] = [Self::Object, Self::Action, Self::Event, Self::Context];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Action => "action",
            Self::Event => "event",
            Self::Context => "context",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }

    /// Top-level map key, e.g. `objects`.
    pub fn plural(self) -> &'static str {
        match self {
            Self::Object => "objects",
            Self::Action => "actions",
            Self::Event => "events",
            Self::Context => "contexts",
        }
    }

    /// Data bucket key, e.g. `object_data`.
    pub fn data_key(self) -> &'static str {
        match self {
            Self::Object => "object_data",
            Self::Action => "action_data",
            Self::Event => "event_data",
            Self::Context => "context_data",
        }
    }

    pub fn pointers_key(self) -> &'static str {
        match self {
            Self::Object => "object_data_pointers",
            Self::Action => "action_data_pointers",
            Self::Event => "event_data_pointers",
            Self::Context => "context_data_pointers",
        }
    }

    /// Whether elements of this kind may carry a payload of `data_type`.
    pub fn accepts(self, data_type: DataType) -> bool {
        match self {
            Self::Object => true,
            _ => data_type.is_generic(),
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An annotated entity. Static when `frame_intervals` is empty.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub name: String,
    /// Semantic (ontology-facing) type.
    pub semantic_type: String,
    pub ontology_uid: Option<Uid>,
    pub resource_uid: ResourceUid,
    /// Objects only.
    pub coordinate_system: Option<String>,
    pub frame_intervals: FrameIntervals,
    /// Frame-less data.
    pub data: ElementDataSet,
    pub data_pointers: DataPointers,
    pub extra: JsonMap,
}

impl Element {
    pub fn new(name: impl Into<String>, semantic_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            semantic_type: semantic_type.into(),
            ..Self::default()
        }
    }

    pub fn is_static(&self) -> bool {
        self.frame_intervals.is_empty()
    }
}

/// Arguments of an element add or upsert.
#[derive(Debug, Clone, Default)]
pub struct NewElement {
    pub name: String,
    pub semantic_type: String,
    pub frame_intervals: FrameIntervals,
    pub uid: Option<Uid>,
    pub ontology_uid: Option<Uid>,
    pub coordinate_system: Option<String>,
    pub resource_uid: ResourceUid,
}

impl NewElement {
    pub fn new(name: impl Into<String>, semantic_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            semantic_type: semantic_type.into(),
            ..Self::default()
        }
    }

    pub fn with_uid(mut self, uid: impl Into<Uid>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    pub fn with_frames(mut self, frames: FrameIntervals) -> Self {
        self.frame_intervals.union(&frames);
        self
    }

    pub fn with_frame_interval(mut self, interval: FrameInterval) -> Self {
        self.frame_intervals.union_interval(interval);
        self
    }

    pub fn with_ontology(mut self, ontology_uid: impl Into<Uid>) -> Self {
        self.ontology_uid = Some(ontology_uid.into());
        self
    }

    pub fn with_coordinate_system(mut self, cs: impl Into<String>) -> Self {
        self.coordinate_system = Some(cs.into());
        self
    }

    pub fn with_resource(mut self, resource: impl Into<Uid>, id: impl Into<String>) -> Self {
        self.resource_uid.insert(resource.into(), id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_keys() {
        assert_eq!(ElementKind::Context.plural(), "contexts");
        assert_eq!(ElementKind::Event.data_key(), "event_data");
        assert_eq!(ElementKind::parse("action"), Some(ElementKind::Action));
        assert_eq!(ElementKind::parse("relation"), None);
    }

    #[test]
    fn test_only_objects_take_geometry() {
        assert!(ElementKind::Object.accepts(DataType::Cuboid));
        assert!(!ElementKind::Action.accepts(DataType::Bbox));
        assert!(ElementKind::Context.accepts(DataType::Vec));
    }

    #[test]
    fn test_builder_collects_intervals() {
        let spec = NewElement::new("car", "Car")
            .with_frame_interval(FrameInterval::new(0, 4).unwrap())
            .with_frame_interval(FrameInterval::new(5, 9).unwrap())
            .with_uid(3);
        assert_eq!(spec.frame_intervals.len(), 1);
        assert_eq!(spec.uid, Some(Uid::Sequential(3)));
    }
}
