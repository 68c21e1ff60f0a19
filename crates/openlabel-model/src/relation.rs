//! Relations between elements, expressed as RDF-like subject/object lists.

use openlabel_core::wire::JsonMap;
use openlabel_core::{FrameInterval, FrameIntervals, Uid};
use serde::{Deserialize, Serialize};

use crate::element::{ElementKind, ResourceUid};

/// Pointer from a relation to an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RdfAgent {
    #[serde(rename = "type")]
    pub kind: ElementKind,
    pub uid: Uid,
}

impl RdfAgent {
    pub fn new(kind: ElementKind, uid: impl Into<Uid>) -> Self {
        Self {
            kind,
            uid: uid.into(),
        }
    }

    pub fn object(uid: impl Into<Uid>) -> Self {
        Self::new(ElementKind::Object, uid)
    }

    pub fn action(uid: impl Into<Uid>) -> Self {
        Self::new(ElementKind::Action, uid)
    }

    pub fn event(uid: impl Into<Uid>) -> Self {
        Self::new(ElementKind::Event, uid)
    }

    pub fn context(uid: impl Into<Uid>) -> Self {
        Self::new(ElementKind::Context, uid)
    }
}

/// Which side of a relation an agent sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RdfRole {
    Subject,
    Object,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Relation {
    pub name: String,
    pub semantic_type: String,
    pub ontology_uid: Option<Uid>,
    pub resource_uid: ResourceUid,
    /// Empty for a static relation; independent of its agents' intervals.
    pub frame_intervals: FrameIntervals,
    pub rdf_subjects: Vec<RdfAgent>,
    pub rdf_objects: Vec<RdfAgent>,
    pub extra: JsonMap,
}

impl Relation {
    pub fn is_static(&self) -> bool {
        self.frame_intervals.is_empty()
    }

    pub fn agents(&self) -> impl Iterator<Item = &RdfAgent> {
        self.rdf_subjects.iter().chain(self.rdf_objects.iter())
    }

    pub fn references(&self, kind: ElementKind, uid: &Uid) -> bool {
        self.agents().any(|a| a.kind == kind && &a.uid == uid)
    }

    /// Append an agent unless it is already on that side.
    pub(crate) fn push_agent(&mut self, role: RdfRole, agent: RdfAgent) {
        let list = match role {
            RdfRole::Subject => &mut self.rdf_subjects,
            RdfRole::Object => &mut self.rdf_objects,
        };
        if !list.contains(&agent) {
            list.push(agent);
        }
    }
}

/// Arguments of a relation add or upsert.
#[derive(Debug, Clone, Default)]
pub struct NewRelation {
    pub name: String,
    pub semantic_type: String,
    pub rdf_subjects: Vec<RdfAgent>,
    pub rdf_objects: Vec<RdfAgent>,
    pub frame_intervals: FrameIntervals,
    pub uid: Option<Uid>,
    pub ontology_uid: Option<Uid>,
    pub resource_uid: ResourceUid,
}

impl NewRelation {
    pub fn new(name: impl Into<String>, semantic_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            semantic_type: semantic_type.into(),
            ..Self::default()
        }
    }

    pub fn subject(mut self, agent: RdfAgent) -> Self {
        self.rdf_subjects.push(agent);
        self
    }

    pub fn object(mut self, agent: RdfAgent) -> Self {
        self.rdf_objects.push(agent);
        self
    }

    pub fn with_uid(mut self, uid: impl Into<Uid>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    pub fn with_frame_interval(mut self, interval: FrameInterval) -> Self {
        self.frame_intervals.union_interval(interval);
        self
    }

    pub fn with_frames(mut self, frames: FrameIntervals) -> Self {
        self.frame_intervals.union(&frames);
        self
    }

    pub fn with_ontology(mut self, ontology_uid: impl Into<Uid>) -> Self {
        self.ontology_uid = Some(ontology_uid.into());
        self
    }

    pub fn with_resource(mut self, resource: impl Into<Uid>, id: impl Into<String>) -> Self {
        self.resource_uid.insert(resource.into(), id.into());
        self
    }
}
