//! The root aggregate: owns every element, relation, frame, stream and
//! coordinate system, and keeps the cross-cutting invariants.
//!
//! Every mutating call validates its arguments before touching any state,
//! so an error leaves the document exactly as it was.

use std::collections::BTreeMap;

use openlabel_core::wire::JsonMap;
use openlabel_core::{
    ElementData, ElementDataSet, FrameInterval, FrameIntervals, OpenLabelError, Result, Stream,
    StreamProperties, Transform, Uid, SCHEMA_VERSION,
};
use serde_json::Value;
use tracing::debug;

use crate::config::DocumentConfig;
use crate::coordinate_system::CoordinateSystem;
use crate::element::{Element, ElementKind, NewElement, ResourceUid};
use crate::frame::{Frame, Odometry, Timestamp, ODOMETRY_KEY};
use crate::ontology::{Metadata, Ontology, Tag};
use crate::pointer::DataPointers;
use crate::relation::{NewRelation, RdfAgent, RdfRole, Relation};

/// UID namespaces. Allocation is per namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum UidSlot {
    Element(ElementKind),
    Relation,
    Tag,
    Ontology,
    Resource,
}

impl UidSlot {
    fn label(self) -> &'static str {
        match self {
            Self::Element(kind) => kind.as_str(),
            Self::Relation => "relation",
            Self::Tag => "tag",
            Self::Ontology => "ontology",
            Self::Resource => "resource",
        }
    }

    /// Ontologies and resources always use sequential UIDs.
    fn follows_mode(self) -> bool {
        !matches!(self, Self::Ontology | Self::Resource)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UidMode {
    Sequential,
    Uuid,
}

/// What a [`Document::remove_element`] or
/// [`Document::remove_element_by_frame`] call took with it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Removal {
    /// Relations deleted because they named the element as an agent.
    pub relations: Vec<Uid>,
    /// Frames dropped because nothing was left in them.
    pub frames: Vec<u64>,
}

/// An OpenLABEL annotation document.
#[derive(Debug, Clone)]
pub struct Document {
    pub(crate) config: DocumentConfig,
    pub(crate) uid_mode: UidMode,
    pub(crate) mode_fixed: bool,
    uid_hints: BTreeMap<UidSlot, u64>,

    pub(crate) metadata: Metadata,
    pub(crate) ontologies: BTreeMap<Uid, Ontology>,
    pub(crate) resources: BTreeMap<Uid, String>,
    pub(crate) tags: BTreeMap<Uid, Tag>,
    pub(crate) streams: BTreeMap<String, Stream>,
    pub(crate) coordinate_systems: BTreeMap<String, CoordinateSystem>,
    pub(crate) objects: BTreeMap<Uid, Element>,
    pub(crate) actions: BTreeMap<Uid, Element>,
    pub(crate) events: BTreeMap<Uid, Element>,
    pub(crate) contexts: BTreeMap<Uid, Element>,
    pub(crate) relations: BTreeMap<Uid, Relation>,
    pub(crate) frames: BTreeMap<u64, Frame>,
    pub(crate) frame_intervals: FrameIntervals,
}

impl Default for Document {
    fn default() -> Self {
        Self::with_config(DocumentConfig::default())
    }
}

impl Document {
    /// Create an empty document with sequential UIDs.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DocumentConfig) -> Self {
        Self {
            config,
            uid_mode: if config.use_uuid {
                UidMode::Uuid
            } else {
                UidMode::Sequential
            },
            mode_fixed: false,
            uid_hints: BTreeMap::new(),
            metadata: Metadata::default(),
            ontologies: BTreeMap::new(),
            resources: BTreeMap::new(),
            tags: BTreeMap::new(),
            streams: BTreeMap::new(),
            coordinate_systems: BTreeMap::new(),
            objects: BTreeMap::new(),
            actions: BTreeMap::new(),
            events: BTreeMap::new(),
            contexts: BTreeMap::new(),
            relations: BTreeMap::new(),
            frames: BTreeMap::new(),
            frame_intervals: FrameIntervals::new(),
        }
    }

    pub fn config(&self) -> &DocumentConfig {
        &self.config
    }

    // ── UID policy ──

    pub fn uid_mode(&self) -> UidMode {
        self.uid_mode
    }

    pub fn uses_uuid(&self) -> bool {
        self.uid_mode == UidMode::Uuid
    }

    /// Choose between sequential and UUID identifiers. Only allowed before
    /// the first element, relation or tag is added.
    pub fn set_use_uuid(&mut self, use_uuid: bool) -> Result<()> {
        if self.mode_fixed {
            return Err(OpenLabelError::ModeAlreadyFixed(format!(
                "cannot switch to {} UIDs after elements were added",
                if use_uuid { "UUID" } else { "sequential" }
            )));
        }
        self.uid_mode = if use_uuid {
            UidMode::Uuid
        } else {
            UidMode::Sequential
        };
        self.config.use_uuid = use_uuid;
        Ok(())
    }

    /// Decide the UID for an add call. Returns the UID and the mode the
    /// document gets fixed to once the call commits.
    fn resolve_uid(
        &self,
        slot: UidSlot,
        explicit: Option<Uid>,
        taken: impl Fn(&Uid) -> bool,
    ) -> Result<(Uid, Option<UidMode>)> {
        if !slot.follows_mode() {
            let uid = match explicit {
                Some(uid) => uid,
                None => Uid::Sequential(self.next_sequential(slot, &taken)),
            };
            return Ok((uid, None));
        }

        match explicit {
            Some(uid) => {
                let wanted = if uid.is_uuid() {
                    UidMode::Uuid
                } else {
                    UidMode::Sequential
                };
                if self.mode_fixed && wanted != self.uid_mode {
                    return Err(OpenLabelError::ModeAlreadyFixed(format!(
                        "{} UID `{uid}` does not match the document's {:?} mode",
                        slot.label(),
                        self.uid_mode
                    )));
                }
                Ok((uid, Some(wanted)))
            }
            None => {
                let uid = match self.uid_mode {
                    UidMode::Uuid => loop {
                        let candidate = Uid::new_uuid();
                        if !taken(&candidate) {
                            break candidate;
                        }
                    },
                    UidMode::Sequential => Uid::Sequential(self.next_sequential(slot, &taken)),
                };
                Ok((uid, Some(self.uid_mode)))
            }
        }
    }

    /// Smallest unused sequential UID in the namespace.
    fn next_sequential(&self, slot: UidSlot, taken: &impl Fn(&Uid) -> bool) -> u64 {
        let mut n = self.uid_hints.get(&slot).copied().unwrap_or(0);
        while taken(&Uid::Sequential(n)) {
            n += 1;
        }
        n
    }

    fn commit_uid(&mut self, slot: UidSlot, uid: &Uid, mode: Option<UidMode>) {
        if let Some(mode) = mode {
            if !self.mode_fixed {
                debug!(?mode, "UID mode fixed");
            }
            self.uid_mode = mode;
            self.mode_fixed = true;
        }
        if let Some(n) = uid.as_sequential() {
            let hint = self.uid_hints.entry(slot).or_insert(0);
            if *hint == n {
                *hint = n + 1;
            }
        }
    }

    fn release_uid(&mut self, slot: UidSlot, uid: &Uid) {
        if let Some(n) = uid.as_sequential() {
            let hint = self.uid_hints.entry(slot).or_insert(0);
            *hint = (*hint).min(n);
        }
    }

    // ── Element maps ──

    pub fn elements(&self, kind: ElementKind) -> &BTreeMap<Uid, Element> {
        match kind {
            ElementKind::Object => &self.objects,
            ElementKind::Action => &self.actions,
            ElementKind::Event => &self.events,
            ElementKind::Context => &self.contexts,
        }
    }

    pub(crate) fn elements_mut(&mut self, kind: ElementKind) -> &mut BTreeMap<Uid, Element> {
        match kind {
            ElementKind::Object => &mut self.objects,
            ElementKind::Action => &mut self.actions,
            ElementKind::Event => &mut self.events,
            ElementKind::Context => &mut self.contexts,
        }
    }

    fn element_or_err(&self, kind: ElementKind, uid: &Uid) -> Result<&Element> {
        self.elements(kind)
            .get(uid)
            .ok_or_else(|| OpenLabelError::unknown(kind.as_str(), uid))
    }

    fn check_ontology(&self, ontology_uid: Option<&Uid>) -> Result<()> {
        match ontology_uid {
            Some(uid) if !self.ontologies.contains_key(uid) => {
                Err(OpenLabelError::UnknownOntology(uid.to_string()))
            }
            _ => Ok(()),
        }
    }

    fn check_resources(&self, resource_uid: &ResourceUid) -> Result<()> {
        match resource_uid.keys().find(|r| !self.resources.contains_key(r)) {
            Some(r) => Err(OpenLabelError::shape(format!("unknown resource {r}"))),
            None => Ok(()),
        }
    }

    fn check_coordinate_system(&self, cs: Option<&str>) -> Result<()> {
        match cs {
            Some(name) if !self.coordinate_systems.contains_key(name) => {
                Err(OpenLabelError::UnknownCoordinateSystem(name.to_string()))
            }
            _ => Ok(()),
        }
    }

    fn check_data(&self, kind: ElementKind, data: &ElementData) -> Result<()> {
        if !kind.accepts(data.data_type()) {
            return Err(OpenLabelError::shape(format!(
                "{kind} data `{}` has type {}; only num, text, boolean and vec are allowed",
                data.name,
                data.data_type()
            )));
        }
        data.value.validate()?;
        for attr in data.attributes.iter() {
            if !attr.data_type().is_generic() || !attr.attributes.is_empty() {
                return Err(OpenLabelError::shape(format!(
                    "`{}` has an invalid attribute `{}`",
                    data.name, attr.name
                )));
            }
        }
        self.check_coordinate_system(data.coordinate_system.as_deref())
    }

    // ── Elements ──

    /// Add an element, or update it when `spec.uid` names an existing one.
    ///
    /// On update the name and type are replaced, optional links are replaced
    /// when given, and the frame intervals are merged.
    pub fn add_element(&mut self, kind: ElementKind, spec: NewElement) -> Result<Uid> {
        self.check_ontology(spec.ontology_uid.as_ref())?;
        self.check_resources(&spec.resource_uid)?;
        if spec.coordinate_system.is_some() && kind != ElementKind::Object {
            return Err(OpenLabelError::shape(format!(
                "only objects carry a coordinate system, not {kind}s"
            )));
        }
        self.check_coordinate_system(spec.coordinate_system.as_deref())?;

        let slot = UidSlot::Element(kind);
        let map = self.elements(kind);
        let (uid, mode) = self.resolve_uid(slot, spec.uid, |u| map.contains_key(u))?;
        let created = !map.contains_key(&uid);
        self.commit_uid(slot, &uid, mode);

        let element = self.elements_mut(kind).entry(uid).or_default();
        element.name = spec.name;
        element.semantic_type = spec.semantic_type;
        if spec.ontology_uid.is_some() {
            element.ontology_uid = spec.ontology_uid;
        }
        if spec.coordinate_system.is_some() {
            element.coordinate_system = spec.coordinate_system;
        }
        element.resource_uid.extend(spec.resource_uid);
        element.frame_intervals.union(&spec.frame_intervals);

        self.register_frames(&spec.frame_intervals, |frame| {
            frame.elements_mut(kind).entry(uid).or_default();
        });
        self.rederive_frame_intervals();

        debug!(kind = %kind, uid = %uid, created, "element added");
        Ok(uid)
    }

    pub fn add_object(&mut self, spec: NewElement) -> Result<Uid> {
        self.add_element(ElementKind::Object, spec)
    }

    pub fn add_action(&mut self, spec: NewElement) -> Result<Uid> {
        self.add_element(ElementKind::Action, spec)
    }

    pub fn add_event(&mut self, spec: NewElement) -> Result<Uid> {
        self.add_element(ElementKind::Event, spec)
    }

    pub fn add_context(&mut self, spec: NewElement) -> Result<Uid> {
        self.add_element(ElementKind::Context, spec)
    }

    /// Attach a payload to an element, statically (`frame = None`) or at one
    /// frame. A frame write grows the element's intervals to cover it.
    pub fn add_element_data(
        &mut self,
        kind: ElementKind,
        uid: &Uid,
        data: ElementData,
        frame: Option<u64>,
    ) -> Result<()> {
        self.element_or_err(kind, uid)?;
        self.check_data(kind, &data)?;
        match frame {
            None => self.write_static(kind, uid, data),
            Some(f) => {
                self.write_dynamic(kind, uid, data, f);
                self.rederive_frame_intervals();
            }
        }
        Ok(())
    }

    /// Write the same payload at every frame of `frames`.
    pub fn add_element_data_over(
        &mut self,
        kind: ElementKind,
        uid: &Uid,
        data: ElementData,
        frames: &FrameIntervals,
    ) -> Result<()> {
        self.element_or_err(kind, uid)?;
        self.check_data(kind, &data)?;
        for f in frames.frames() {
            self.write_dynamic(kind, uid, data.clone(), f);
        }
        self.rederive_frame_intervals();
        Ok(())
    }

    pub fn add_object_data(&mut self, uid: &Uid, data: ElementData, frame: Option<u64>) -> Result<()> {
        self.add_element_data(ElementKind::Object, uid, data, frame)
    }

    pub fn add_action_data(&mut self, uid: &Uid, data: ElementData, frame: Option<u64>) -> Result<()> {
        self.add_element_data(ElementKind::Action, uid, data, frame)
    }

    pub fn add_event_data(&mut self, uid: &Uid, data: ElementData, frame: Option<u64>) -> Result<()> {
        self.add_element_data(ElementKind::Event, uid, data, frame)
    }

    pub fn add_context_data(&mut self, uid: &Uid, data: ElementData, frame: Option<u64>) -> Result<()> {
        self.add_element_data(ElementKind::Context, uid, data, frame)
    }

    fn write_static(&mut self, kind: ElementKind, uid: &Uid, data: ElementData) {
        if let Some(element) = self.elements_mut(kind).get_mut(uid) {
            element.data_pointers.record(&data, None);
            element.data.insert(data);
        }
    }

    fn write_dynamic(&mut self, kind: ElementKind, uid: &Uid, data: ElementData, frame: u64) {
        let Some(element) = self.elements_mut(kind).get_mut(uid) else {
            return;
        };
        element.data_pointers.record(&data, Some(frame));
        element
            .frame_intervals
            .union_interval(FrameInterval::single(frame));
        self.frames
            .entry(frame)
            .or_default()
            .elements_mut(kind)
            .entry(*uid)
            .or_default()
            .data
            .insert(data);
    }

    /// Remove a named payload from an element, statically and at every
    /// frame.
    ///
    /// When the payload had per-frame values the element's intervals shrink
    /// to the frames where it still has data; with no per-frame data left
    /// the element becomes static.
    pub fn remove_element_data(&mut self, kind: ElementKind, uid: &Uid, name: &str) -> Result<bool> {
        let element = self.element_or_err(kind, uid)?;
        let frames: Vec<u64> = element
            .data_pointers
            .get(name)
            .map(|p| p.frame_intervals.frames().collect())
            .unwrap_or_default();
        let dynamic = !frames.is_empty();

        let mut removed = false;
        for f in frames {
            if let Some(entry) = self
                .frames
                .get_mut(&f)
                .and_then(|frame| frame.elements_mut(kind).get_mut(uid))
            {
                removed |= entry.data.remove(name).is_some();
            }
        }
        if let Some(element) = self.elements_mut(kind).get_mut(uid) {
            removed |= element.data.remove(name).is_some();
            element.data_pointers.remove(name);
        }
        if dynamic {
            self.narrow_to_data(kind, uid);
        }
        debug!(kind = %kind, uid = %uid, data = name, removed, "element data removed");
        Ok(removed)
    }

    /// Drop an element's frames that no longer carry any of its data.
    fn narrow_to_data(&mut self, kind: ElementKind, uid: &Uid) {
        let Some(element) = self.elements_mut(kind).get_mut(uid) else {
            return;
        };
        let kept = element.data_pointers.frame_intervals();
        let dropped = element.frame_intervals.difference(&kept);
        element.frame_intervals = element.frame_intervals.intersect(&kept);

        let mut touched = Vec::new();
        for f in dropped.frames() {
            if let Some(frame) = self.frames.get_mut(&f) {
                if frame.elements_mut(kind).remove(uid).is_some() {
                    touched.push(f);
                }
            }
        }
        self.drop_empty_frames(touched);
        self.rederive_frame_intervals();
    }

    /// Take the frames of `interval` away from an element.
    ///
    /// The element's intervals are trimmed, or split when `interval` lies
    /// inside one of them, and its per-frame data in those frames is
    /// dropped. An element left without frames becomes static; it stays in
    /// the document with its static data. Relations are not touched.
    pub fn remove_element_by_frame(
        &mut self,
        kind: ElementKind,
        uid: &Uid,
        interval: FrameInterval,
    ) -> Result<Removal> {
        let element = self.element_or_err(kind, uid)?;
        let cut = FrameIntervals::from_interval(interval);
        let affected = element.frame_intervals.intersect(&cut);

        let mut touched = Vec::new();
        for f in affected.frames() {
            if let Some(frame) = self.frames.get_mut(&f) {
                if frame.elements_mut(kind).remove(uid).is_some() {
                    touched.push(f);
                }
            }
        }
        if let Some(element) = self.elements_mut(kind).get_mut(uid) {
            element.frame_intervals = element.frame_intervals.difference(&cut);
        }
        if let Some(pointers) = self.rebuild_data_pointers(kind, uid) {
            if let Some(element) = self.elements_mut(kind).get_mut(uid) {
                element.data_pointers = pointers;
            }
        }

        let frames = self.drop_empty_frames(touched);
        self.rederive_frame_intervals();

        debug!(
            kind = %kind,
            uid = %uid,
            start = interval.start(),
            end = interval.end(),
            "element frames removed"
        );
        Ok(Removal {
            relations: Vec::new(),
            frames,
        })
    }

    pub fn remove_object_by_frame(&mut self, uid: &Uid, interval: FrameInterval) -> Result<Removal> {
        self.remove_element_by_frame(ElementKind::Object, uid, interval)
    }

    /// Remove an element together with its frame entries and every relation
    /// that names it as an agent.
    pub fn remove_element(&mut self, kind: ElementKind, uid: &Uid) -> Result<Removal> {
        self.element_or_err(kind, uid)?;

        let dependent: Vec<Uid> = self
            .relations
            .iter()
            .filter(|(_, r)| r.references(kind, uid))
            .map(|(ruid, _)| *ruid)
            .collect();

        let mut touched = Vec::new();
        for ruid in &dependent {
            if let Some(rel) = self.relations.remove(ruid) {
                for f in rel.frame_intervals.frames() {
                    if let Some(frame) = self.frames.get_mut(&f) {
                        frame.relations.remove(ruid);
                        touched.push(f);
                    }
                }
            }
            self.release_uid(UidSlot::Relation, ruid);
        }

        if let Some(element) = self.elements_mut(kind).remove(uid) {
            for f in element.frame_intervals.frames() {
                if let Some(frame) = self.frames.get_mut(&f) {
                    frame.elements_mut(kind).remove(uid);
                    touched.push(f);
                }
            }
        }
        self.release_uid(UidSlot::Element(kind), uid);

        let frames = self.drop_empty_frames(touched);
        self.rederive_frame_intervals();

        debug!(kind = %kind, uid = %uid, relations = dependent.len(), "element removed");
        Ok(Removal {
            relations: dependent,
            frames,
        })
    }

    pub fn remove_relation(&mut self, uid: &Uid) -> Result<()> {
        let rel = self
            .relations
            .remove(uid)
            .ok_or_else(|| OpenLabelError::unknown("relation", uid))?;
        let mut touched = Vec::new();
        for f in rel.frame_intervals.frames() {
            if let Some(frame) = self.frames.get_mut(&f) {
                frame.relations.remove(uid);
                touched.push(f);
            }
        }
        self.release_uid(UidSlot::Relation, uid);
        self.drop_empty_frames(touched);
        self.rederive_frame_intervals();
        Ok(())
    }

    fn drop_empty_frames(&mut self, mut touched: Vec<u64>) -> Vec<u64> {
        touched.sort_unstable();
        touched.dedup();
        touched.retain(|f| {
            self.frames
                .get(f)
                .map(Frame::is_empty)
                .unwrap_or(false)
        });
        for f in &touched {
            self.frames.remove(f);
        }
        touched
    }

    // ── Relations ──

    /// Add a relation, or update it when `spec.uid` names an existing one.
    /// Every agent must reference an existing element.
    pub fn add_relation(&mut self, spec: NewRelation) -> Result<Uid> {
        self.check_ontology(spec.ontology_uid.as_ref())?;
        self.check_resources(&spec.resource_uid)?;
        for agent in spec.rdf_subjects.iter().chain(&spec.rdf_objects) {
            self.element_or_err(agent.kind, &agent.uid)?;
        }

        let relations = &self.relations;
        let (uid, mode) =
            self.resolve_uid(UidSlot::Relation, spec.uid, |u| relations.contains_key(u))?;
        self.commit_uid(UidSlot::Relation, &uid, mode);

        let relation = self.relations.entry(uid).or_default();
        relation.name = spec.name;
        relation.semantic_type = spec.semantic_type;
        if spec.ontology_uid.is_some() {
            relation.ontology_uid = spec.ontology_uid;
        }
        relation.resource_uid.extend(spec.resource_uid);
        relation.frame_intervals.union(&spec.frame_intervals);
        for agent in spec.rdf_subjects {
            relation.push_agent(RdfRole::Subject, agent);
        }
        for agent in spec.rdf_objects {
            relation.push_agent(RdfRole::Object, agent);
        }

        self.register_frames(&spec.frame_intervals, |frame| {
            frame.relations.insert(uid);
        });
        self.rederive_frame_intervals();

        debug!(uid = %uid, "relation added");
        Ok(uid)
    }

    /// Add one agent to an existing relation.
    pub fn add_rdf(&mut self, relation_uid: &Uid, role: RdfRole, agent: RdfAgent) -> Result<()> {
        self.element_or_err(agent.kind, &agent.uid)?;
        let relation = self
            .relations
            .get_mut(relation_uid)
            .ok_or_else(|| OpenLabelError::unknown("relation", relation_uid))?;
        relation.push_agent(role, agent);
        Ok(())
    }

    // ── Streams, coordinate systems, transforms ──

    /// Declare (or replace) a stream.
    pub fn add_stream(&mut self, name: impl Into<String>, stream: Stream) -> Result<()> {
        stream.stream_properties.validate()?;
        let name = name.into();
        debug!(stream = %name, "stream added");
        self.streams.insert(name, stream);
        Ok(())
    }

    /// Merge properties into a stream, statically or for one frame.
    pub fn add_stream_properties(
        &mut self,
        stream: &str,
        properties: StreamProperties,
        frame: Option<u64>,
    ) -> Result<()> {
        if !self.streams.contains_key(stream) {
            return Err(OpenLabelError::UnknownStream(stream.to_string()));
        }
        properties.validate()?;
        match frame {
            None => {
                if let Some(s) = self.streams.get_mut(stream) {
                    s.stream_properties.merge(properties);
                }
            }
            Some(f) => {
                self.frames
                    .entry(f)
                    .or_default()
                    .properties
                    .streams
                    .entry(stream.to_string())
                    .or_default()
                    .stream_properties
                    .merge(properties);
                self.rederive_frame_intervals();
            }
        }
        Ok(())
    }

    /// Add a coordinate system under an existing parent (or as a root when
    /// `cs.parent` is empty). Children are filled in as they get added.
    pub fn add_coordinate_system(
        &mut self,
        name: impl Into<String>,
        mut cs: CoordinateSystem,
    ) -> Result<()> {
        let name = name.into();
        if self.coordinate_systems.contains_key(&name) {
            return Err(OpenLabelError::DuplicateUid(format!(
                "coordinate system `{name}`"
            )));
        }
        if !cs.is_root() && !self.coordinate_systems.contains_key(&cs.parent) {
            return Err(OpenLabelError::UnknownCoordinateSystem(cs.parent.clone()));
        }
        if cs.parent == name {
            return Err(OpenLabelError::shape(format!(
                "coordinate system `{name}` cannot be its own parent"
            )));
        }
        if let Some(pose) = &cs.pose_wrt_parent {
            pose.validate()?;
        }

        cs.children.clear();
        if let Some(parent) = self.coordinate_systems.get_mut(&cs.parent) {
            parent.children.push(name.clone());
        }
        debug!(cs = %name, parent = %cs.parent, "coordinate system added");
        self.coordinate_systems.insert(name, cs);
        Ok(())
    }

    /// Store a per-frame transform between two declared coordinate systems.
    pub fn add_transform(&mut self, frame: u64, transform: Transform) -> Result<()> {
        self.check_coordinate_system(Some(&transform.src))?;
        self.check_coordinate_system(Some(&transform.dst))?;
        transform.transform_src_to_dst.validate()?;
        self.frames
            .entry(frame)
            .or_default()
            .properties
            .transforms
            .insert(transform.key(), transform);
        self.rederive_frame_intervals();
        Ok(())
    }

    /// Set the timestamp and merge free-form properties of a frame.
    pub fn add_frame_properties(
        &mut self,
        frame: u64,
        timestamp: Option<Timestamp>,
        properties: JsonMap,
    ) -> Result<()> {
        if let Some(key) = properties
            .keys()
            .find(|k| matches!(k.as_str(), "timestamp" | "streams" | "transforms"))
        {
            return Err(OpenLabelError::shape(format!(
                "frame property `{key}` has a dedicated setter"
            )));
        }
        let props = &mut self.frames.entry(frame).or_default().properties;
        if timestamp.is_some() {
            props.timestamp = timestamp;
        }
        props.extra.extend(properties);
        self.rederive_frame_intervals();
        Ok(())
    }

    /// Store the vehicle odometry of a frame as its `odometry` property.
    pub fn add_odometry(&mut self, frame: u64, odometry: Odometry) -> Result<()> {
        odometry.validate()?;
        let value = serde_json::to_value(&odometry)
            .map_err(|e| OpenLabelError::parse(format!("failed to encode odometry: {e}")))?;
        let mut properties = JsonMap::new();
        properties.insert(ODOMETRY_KEY.into(), value);
        self.add_frame_properties(frame, None, properties)
    }

    /// Odometry of a frame, if it has a well-formed one.
    pub fn odometry(&self, frame: u64) -> Option<Odometry> {
        let value = self.frames.get(&frame)?.properties.extra.get(ODOMETRY_KEY)?;
        serde_json::from_value(value.clone()).ok()
    }

    // ── Ontologies, resources, tags, metadata ──

    pub fn add_ontology(&mut self, ontology: impl Into<Ontology>) -> Uid {
        let ontologies = &self.ontologies;
        let n = self.next_sequential(UidSlot::Ontology, &|u: &Uid| ontologies.contains_key(u));
        let uid = Uid::Sequential(n);
        self.commit_uid(UidSlot::Ontology, &uid, None);
        self.ontologies.insert(uid, ontology.into());
        uid
    }

    pub fn add_resource(&mut self, uri: impl Into<String>) -> Uid {
        let resources = &self.resources;
        let n = self.next_sequential(UidSlot::Resource, &|u: &Uid| resources.contains_key(u));
        let uid = Uid::Sequential(n);
        self.commit_uid(UidSlot::Resource, &uid, None);
        self.resources.insert(uid, uri.into());
        uid
    }

    /// Add a document-level tag. Tag data accepts num, text, boolean and vec.
    pub fn add_tag(&mut self, tag: Tag) -> Result<Uid> {
        self.add_tag_with_uid(tag, None)
    }

    pub fn add_tag_with_uid(&mut self, tag: Tag, uid: Option<Uid>) -> Result<Uid> {
        self.check_ontology(tag.ontology_uid.as_ref())?;
        self.check_resources(&tag.resource_uid)?;
        if let Some(bad) = tag.tag_data.iter().find(|d| !d.data_type().is_generic()) {
            return Err(OpenLabelError::shape(format!(
                "tag data `{}` has type {}; only num, text, boolean and vec are allowed",
                bad.name,
                bad.data_type()
            )));
        }
        let tags = &self.tags;
        let (uid, mode) = self.resolve_uid(UidSlot::Tag, uid, |u| tags.contains_key(u))?;
        self.commit_uid(UidSlot::Tag, &uid, mode);
        self.tags.insert(uid, tag);
        Ok(uid)
    }

    /// Merge free-form metadata. Known string keys (`name`, `annotator`,
    /// `comment`, `file_version`) go to their fields; `schema_version` is
    /// ignored.
    pub fn add_metadata_properties(&mut self, properties: JsonMap) {
        for (key, value) in properties {
            let slot = match key.as_str() {
                "schema_version" => continue,
                "name" => &mut self.metadata.name,
                "annotator" => &mut self.metadata.annotator,
                "comment" => &mut self.metadata.comment,
                "file_version" => &mut self.metadata.file_version,
                _ => {
                    self.metadata.properties.insert(key, value);
                    continue;
                }
            };
            match value {
                Value::String(s) => *slot = Some(s),
                other => {
                    self.metadata.properties.insert(key, other);
                }
            }
        }
        self.metadata.schema_version = SCHEMA_VERSION.to_string();
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.metadata.name = Some(name.into());
    }

    pub fn set_annotator(&mut self, annotator: impl Into<String>) {
        self.metadata.annotator = Some(annotator.into());
    }

    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.metadata.comment = Some(comment.into());
    }

    pub fn set_file_version(&mut self, version: impl Into<String>) {
        self.metadata.file_version = Some(version.into());
    }

    // ── Frame bookkeeping ──

    fn register_frames(&mut self, intervals: &FrameIntervals, mut f: impl FnMut(&mut Frame)) {
        for n in intervals.frames() {
            f(self.frames.entry(n).or_default());
        }
    }

    /// Recompute the global intervals as the union of every element's and
    /// relation's intervals and every frame key.
    pub(crate) fn rederive_frame_intervals(&mut self) {
        let mut keys = self.frames.keys().copied();
        let mut runs = Vec::new();
        if let Some(first) = keys.next() {
            let (mut start, mut end) = (first, first);
            for k in keys {
                if k == end + 1 {
                    end = k;
                } else {
                    runs.push((start, end));
                    start = k;
                    end = k;
                }
            }
            runs.push((start, end));
        }
        let mut global: FrameIntervals = runs
            .into_iter()
            .filter_map(|(s, e)| FrameInterval::new(s, e).ok())
            .collect();

        for kind in ElementKind::ALL {
            for element in self.elements(kind).values() {
                global.union(&element.frame_intervals);
            }
        }
        for relation in self.relations.values() {
            global.union(&relation.frame_intervals);
        }
        self.frame_intervals = global;
    }

    // ── Queries ──

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Global frame intervals.
    pub fn frame_intervals(&self) -> &FrameIntervals {
        &self.frame_intervals
    }

    /// Outer bounds of the global frame intervals.
    pub fn outer_frame_interval(&self) -> Option<FrameInterval> {
        self.frame_intervals.outer()
    }

    pub fn element(&self, kind: ElementKind, uid: &Uid) -> Option<&Element> {
        self.elements(kind).get(uid)
    }

    pub fn object(&self, uid: &Uid) -> Option<&Element> {
        self.objects.get(uid)
    }

    pub fn has_element(&self, kind: ElementKind, uid: &Uid) -> bool {
        self.elements(kind).contains_key(uid)
    }

    pub fn num_elements(&self, kind: ElementKind) -> usize {
        self.elements(kind).len()
    }

    pub fn element_frame_intervals(&self, kind: ElementKind, uid: &Uid) -> Option<&FrameIntervals> {
        self.element(kind, uid).map(|e| &e.frame_intervals)
    }

    /// Current value of a named payload. With a frame, the value written at
    /// that frame wins; otherwise (or when none was) the static value.
    pub fn element_data(
        &self,
        kind: ElementKind,
        uid: &Uid,
        name: &str,
        frame: Option<u64>,
    ) -> Option<&ElementData> {
        let element = self.element(kind, uid)?;
        frame
            .and_then(|f| self.frames.get(&f))
            .and_then(|fr| fr.element_data(kind, uid))
            .and_then(|set| set.get(name))
            .or_else(|| element.data.get(name))
    }

    pub fn object_data(&self, uid: &Uid, name: &str, frame: Option<u64>) -> Option<&ElementData> {
        self.element_data(ElementKind::Object, uid, name, frame)
    }

    /// All data of an element at one frame (dynamic only).
    pub fn element_data_at(&self, kind: ElementKind, uid: &Uid, frame: u64) -> Option<&ElementDataSet> {
        self.frames.get(&frame)?.element_data(kind, uid)
    }

    /// Frames where the named payload has a per-frame value.
    pub fn frames_with_data_name(
        &self,
        kind: ElementKind,
        uid: &Uid,
        name: &str,
    ) -> Option<&FrameIntervals> {
        self.element(kind, uid)?
            .data_pointers
            .get(name)
            .map(|p| &p.frame_intervals)
    }

    pub fn elements_with_data_name(&self, kind: ElementKind, name: &str) -> Vec<Uid> {
        self.elements(kind)
            .iter()
            .filter(|(_, e)| e.data_pointers.get(name).is_some())
            .map(|(uid, _)| *uid)
            .collect()
    }

    pub fn objects_with_data_name(&self, name: &str) -> Vec<Uid> {
        self.elements_with_data_name(ElementKind::Object, name)
    }

    /// First element (in UID order) with the given name.
    pub fn element_uid_by_name(&self, kind: ElementKind, name: &str) -> Option<Uid> {
        self.elements(kind)
            .iter()
            .find(|(_, e)| e.name == name)
            .map(|(uid, _)| *uid)
    }

    pub fn object_uid_by_name(&self, name: &str) -> Option<Uid> {
        self.element_uid_by_name(ElementKind::Object, name)
    }

    pub fn elements_of_type(&self, kind: ElementKind, semantic_type: &str) -> Vec<Uid> {
        self.elements(kind)
            .iter()
            .filter(|(_, e)| e.semantic_type == semantic_type)
            .map(|(uid, _)| *uid)
            .collect()
    }

    /// Rebuild an element's data pointers from its data alone.
    pub fn rebuild_data_pointers(&self, kind: ElementKind, uid: &Uid) -> Option<DataPointers> {
        let element = self.element(kind, uid)?;
        let frames = element.frame_intervals.frames().filter_map(|f| {
            self.frames
                .get(&f)
                .and_then(|fr| fr.element_data(kind, uid))
                .map(|set| (f, set))
        });
        Some(DataPointers::rebuild(&element.data, frames))
    }

    pub fn relation(&self, uid: &Uid) -> Option<&Relation> {
        self.relations.get(uid)
    }

    pub fn relations(&self) -> &BTreeMap<Uid, Relation> {
        &self.relations
    }

    /// Relations naming the element as an agent.
    pub fn relations_of(&self, kind: ElementKind, uid: &Uid) -> Vec<Uid> {
        self.relations
            .iter()
            .filter(|(_, r)| r.references(kind, uid))
            .map(|(ruid, _)| *ruid)
            .collect()
    }

    pub fn frame(&self, frame: u64) -> Option<&Frame> {
        self.frames.get(&frame)
    }

    pub fn frames(&self) -> &BTreeMap<u64, Frame> {
        &self.frames
    }

    pub fn ontology(&self, uid: &Uid) -> Option<&Ontology> {
        self.ontologies.get(uid)
    }

    pub fn ontologies(&self) -> &BTreeMap<Uid, Ontology> {
        &self.ontologies
    }

    pub fn resource(&self, uid: &Uid) -> Option<&str> {
        self.resources.get(uid).map(String::as_str)
    }

    pub fn tag(&self, uid: &Uid) -> Option<&Tag> {
        self.tags.get(uid)
    }

    pub fn tags(&self) -> &BTreeMap<Uid, Tag> {
        &self.tags
    }

    pub fn stream(&self, name: &str) -> Option<&Stream> {
        self.streams.get(name)
    }

    pub fn streams(&self) -> &BTreeMap<String, Stream> {
        &self.streams
    }

    pub fn coordinate_system(&self, name: &str) -> Option<&CoordinateSystem> {
        self.coordinate_systems.get(name)
    }

    pub fn coordinate_systems(&self) -> &BTreeMap<String, CoordinateSystem> {
        &self.coordinate_systems
    }

    // ── Loading support ──

    /// Restore derived state after a typed load: UID mode, data pointers,
    /// frame entries for every interval and the global intervals.
    pub(crate) fn reindex(&mut self) {
        let this: &Self = self;
        let any_uuid = ElementKind::ALL
            .into_iter()
            .flat_map(|k| this.elements(k).keys())
            .chain(this.relations.keys())
            .chain(this.tags.keys())
            .any(Uid::is_uuid);
        let any_entry = ElementKind::ALL
            .into_iter()
            .any(|k| !this.elements(k).is_empty())
            || !this.relations.is_empty()
            || !this.tags.is_empty();
        if any_uuid {
            self.uid_mode = UidMode::Uuid;
            self.mode_fixed = true;
        } else if any_entry {
            self.uid_mode = UidMode::Sequential;
            self.mode_fixed = true;
        }

        for kind in ElementKind::ALL {
            let uids: Vec<Uid> = self.elements(kind).keys().copied().collect();
            for uid in uids {
                let Some(intervals) = self.element(kind, &uid).map(|e| e.frame_intervals.clone())
                else {
                    continue;
                };
                self.register_frames(&intervals, |frame| {
                    frame.elements_mut(kind).entry(uid).or_default();
                });
                if let Some(pointers) = self.rebuild_data_pointers(kind, &uid) {
                    if let Some(element) = self.elements_mut(kind).get_mut(&uid) {
                        element.data_pointers = pointers;
                    }
                }
            }
        }
        let relation_frames: Vec<(Uid, FrameIntervals)> = self
            .relations
            .iter()
            .map(|(uid, r)| (*uid, r.frame_intervals.clone()))
            .collect();
        for (uid, intervals) in relation_frames {
            self.register_frames(&intervals, |frame| {
                frame.relations.insert(uid);
            });
        }
        self.metadata.schema_version = SCHEMA_VERSION.to_string();
        self.rederive_frame_intervals();
    }
}

impl From<&str> for Ontology {
    fn from(uri: &str) -> Self {
        Ontology::Uri(uri.to_string())
    }
}

impl From<String> for Ontology {
    fn from(uri: String) -> Self {
        Ontology::Uri(uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openlabel_core::{ErrorKind, StreamType, TransformData};

    fn fi(s: u64, e: u64) -> FrameInterval {
        FrameInterval::new(s, e).unwrap()
    }

    #[test]
    fn test_sequential_uids_fill_gaps() {
        let mut doc = Document::new();
        let a = doc.add_object(NewElement::new("a", "Car")).unwrap();
        let b = doc.add_object(NewElement::new("b", "Car")).unwrap();
        assert_eq!((a, b), (Uid::Sequential(0), Uid::Sequential(1)));

        doc.add_object(NewElement::new("e", "Car").with_uid(5)).unwrap();
        let c = doc.add_object(NewElement::new("c", "Car")).unwrap();
        assert_eq!(c, Uid::Sequential(2));

        doc.remove_element(ElementKind::Object, &Uid::Sequential(0)).unwrap();
        let d = doc.add_object(NewElement::new("d", "Car")).unwrap();
        assert_eq!(d, Uid::Sequential(0));

        // Each kind has its own counter
        let act = doc.add_action(NewElement::new("walk", "Walking")).unwrap();
        assert_eq!(act, Uid::Sequential(0));
    }

    #[test]
    fn test_upsert_merges_intervals() {
        let mut doc = Document::new();
        let uid = doc
            .add_object(NewElement::new("car", "Car").with_frame_interval(fi(0, 5)).with_uid(3))
            .unwrap();
        doc.add_object(NewElement::new("car2", "Van").with_frame_interval(fi(4, 12)).with_uid(3))
            .unwrap();

        assert_eq!(doc.num_elements(ElementKind::Object), 1);
        let obj = doc.object(&uid).unwrap();
        assert_eq!(obj.name, "car2");
        assert_eq!(obj.semantic_type, "Van");
        assert_eq!(obj.frame_intervals.as_slice(), &[fi(0, 12)]);
        assert!(doc.frame(12).unwrap().objects.contains_key(&uid));
    }

    #[test]
    fn test_mode_fixed_after_first_add() {
        let mut doc = Document::new();
        doc.add_object(NewElement::new("car", "Car")).unwrap();
        let err = doc.set_use_uuid(true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModeAlreadyFixed);

        let uuid: Uid = "ecb83a2b-aee4-4e6e-8c3f-9a6a5a0a1d4e".parse().unwrap();
        let err = doc
            .add_object(NewElement::new("x", "Car").with_uid(uuid))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModeAlreadyFixed);
        assert_eq!(doc.num_elements(ElementKind::Object), 1);
    }

    #[test]
    fn test_explicit_uuid_switches_mode() {
        let mut doc = Document::new();
        let uuid: Uid = "ecb83a2b-aee4-4e6e-8c3f-9a6a5a0a1d4e".parse().unwrap();
        doc.add_object(NewElement::new("car", "Car").with_uid(uuid)).unwrap();
        assert!(doc.uses_uuid());
        let next = doc.add_object(NewElement::new("van", "Van")).unwrap();
        assert!(next.is_uuid());
    }

    #[test]
    fn test_uuid_mode_from_start() {
        let mut doc = Document::new();
        doc.set_use_uuid(true).unwrap();
        let uid = doc.add_event(NewElement::new("start", "Start")).unwrap();
        assert!(uid.is_uuid());
        // Ontologies stay sequential
        assert_eq!(doc.add_ontology("http://example.org"), Uid::Sequential(0));
    }

    #[test]
    fn test_unknown_references_rejected() {
        let mut doc = Document::new();
        let err = doc
            .add_object(NewElement::new("car", "Car").with_ontology(4))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownOntology);

        let err = doc
            .add_object(NewElement::new("car", "Car").with_coordinate_system("lidar"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownCoordinateSystem);
        assert_eq!(doc.num_elements(ElementKind::Object), 0);
        assert!(doc.set_use_uuid(true).is_ok());
    }

    #[test]
    fn test_static_to_dynamic() {
        let mut doc = Document::new();
        let uid = doc.add_object(NewElement::new("Car", "Car")).unwrap();
        assert!(doc.object(&uid).unwrap().is_static());

        let bbox = ElementData::bbox("shape", [10.0, 10.0, 4.0, 2.0]).unwrap();
        doc.add_object_data(&uid, bbox, Some(5)).unwrap();

        let obj = doc.object(&uid).unwrap();
        assert_eq!(obj.frame_intervals.as_slice(), &[fi(5, 5)]);
        assert!(doc.outer_frame_interval().unwrap().contains(5));
        assert!(doc.frame(5).unwrap().objects.contains_key(&uid));
    }

    #[test]
    fn test_static_and_dynamic_values_coexist() {
        let mut doc = Document::new();
        let uid = doc.add_object(NewElement::new("Car", "Car")).unwrap();
        doc.add_object_data(&uid, ElementData::text("color", "red"), None).unwrap();
        doc.add_object_data(&uid, ElementData::text("color", "blue"), Some(2)).unwrap();

        let val = |frame| match &doc.object_data(&uid, "color", frame).unwrap().value {
            openlabel_core::DataValue::Text(s) => s.clone(),
            _ => String::new(),
        };
        assert_eq!(val(None), "red");
        assert_eq!(val(Some(2)), "blue");
        assert_eq!(val(Some(3)), "red");
    }

    #[test]
    fn test_action_rejects_geometry() {
        let mut doc = Document::new();
        let uid = doc.add_action(NewElement::new("walk", "Walking")).unwrap();
        let bbox = ElementData::bbox("shape", [0.0, 0.0, 1.0, 1.0]).unwrap();
        let err = doc
            .add_element_data(ElementKind::Action, &uid, bbox, Some(1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValueShape);
        assert!(doc.frame(1).is_none());
    }

    #[test]
    fn test_data_for_unknown_element() {
        let mut doc = Document::new();
        let err = doc
            .add_object_data(&Uid::Sequential(9), ElementData::boolean("b", true), None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownElement);
    }

    #[test]
    fn test_pointers_match_rebuild() {
        let mut doc = Document::new();
        let uid = doc.add_object(NewElement::new("ped", "Pedestrian")).unwrap();
        doc.add_object_data(&uid, ElementData::text("gender", "f"), None).unwrap();
        for f in [3, 4, 8] {
            let p = ElementData::point2d("head", [f as f64, 1.0]).unwrap();
            doc.add_object_data(&uid, p, Some(f)).unwrap();
        }
        let obj = doc.object(&uid).unwrap();
        let head = obj.data_pointers.get("head").unwrap();
        assert_eq!(head.frame_intervals.as_slice(), &[fi(3, 4), fi(8, 8)]);
        assert_eq!(
            doc.rebuild_data_pointers(ElementKind::Object, &uid).unwrap(),
            obj.data_pointers
        );
        assert_eq!(doc.objects_with_data_name("head"), vec![uid]);
    }

    #[test]
    fn test_relation_frames_follow_own_interval() {
        let mut doc = Document::new();
        let a = doc
            .add_object(NewElement::new("a", "Car").with_frame_interval(fi(0, 10)))
            .unwrap();
        let b = doc
            .add_object(NewElement::new("b", "Car").with_frame_interval(fi(5, 15)))
            .unwrap();
        let rel = doc
            .add_relation(
                NewRelation::new("follows", "isFollowing")
                    .subject(RdfAgent::object(a))
                    .object(RdfAgent::object(b))
                    .with_frame_interval(fi(7, 9)),
            )
            .unwrap();
        for f in 0..=15 {
            let listed = doc.frame(f).unwrap().relations.contains(&rel);
            assert_eq!(listed, (7..=9).contains(&f), "frame {f}");
        }
    }

    #[test]
    fn test_relation_with_missing_agent() {
        let mut doc = Document::new();
        let a = doc.add_object(NewElement::new("a", "Car")).unwrap();
        let err = doc
            .add_relation(
                NewRelation::new("r", "near")
                    .subject(RdfAgent::object(a))
                    .object(RdfAgent::object(42)),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownElement);
        assert!(doc.relations().is_empty());
    }

    #[test]
    fn test_remove_cascades_to_relations() {
        let mut doc = Document::new();
        let a = doc
            .add_object(NewElement::new("a", "Car").with_frame_interval(fi(0, 2)))
            .unwrap();
        let b = doc.add_object(NewElement::new("b", "Car")).unwrap();
        let rel = doc
            .add_relation(
                NewRelation::new("r", "near")
                    .subject(RdfAgent::object(a))
                    .object(RdfAgent::object(b))
                    .with_frame_interval(fi(1, 2)),
            )
            .unwrap();

        let removal = doc.remove_element(ElementKind::Object, &a).unwrap();
        assert_eq!(removal.relations, vec![rel]);
        assert_eq!(removal.frames, vec![0, 1, 2]);
        assert!(doc.relation(&rel).is_none());
        assert!(doc.frame_intervals().is_empty());
        assert!(doc.has_element(ElementKind::Object, &b));
    }

    #[test]
    fn test_removing_last_frame_data_makes_element_static() {
        let mut doc = Document::new();
        let uid = doc.add_object(NewElement::new("Car", "Car")).unwrap();
        doc.add_object_data(&uid, ElementData::text("color", "red"), None).unwrap();
        let bbox = ElementData::bbox("box", [10.0, 10.0, 4.0, 2.0]).unwrap();
        doc.add_object_data(&uid, bbox, Some(5)).unwrap();
        assert!(!doc.object(&uid).unwrap().is_static());

        assert!(doc.remove_element_data(ElementKind::Object, &uid, "box").unwrap());
        let obj = doc.object(&uid).unwrap();
        assert!(obj.is_static());
        assert!(obj.data.get("color").is_some());
        assert!(doc.frame(5).is_none());
        assert!(doc.frame_intervals().is_empty());
    }

    #[test]
    fn test_removing_frame_data_keeps_other_frames() {
        let mut doc = Document::new();
        let uid = doc.add_object(NewElement::new("ped", "Pedestrian")).unwrap();
        for f in 0..6u64 {
            let p = ElementData::point2d("head", [f as f64, 1.0]).unwrap();
            doc.add_object_data(&uid, p, Some(f)).unwrap();
        }
        doc.add_object_data(&uid, ElementData::num("speed", 2.0).unwrap(), Some(4))
            .unwrap();

        doc.remove_element_data(ElementKind::Object, &uid, "head").unwrap();
        let obj = doc.object(&uid).unwrap();
        assert_eq!(obj.frame_intervals.as_slice(), &[fi(4, 4)]);
        assert_eq!(doc.frame_intervals().as_slice(), &[fi(4, 4)]);
        assert!(doc.frame(3).is_none());
        assert!(doc.frame(4).unwrap().objects.contains_key(&uid));
    }

    #[test]
    fn test_remove_by_frame_splits_intervals() {
        let mut doc = Document::new();
        let uid = doc
            .add_object(NewElement::new("car", "Car").with_frame_interval(fi(0, 9)))
            .unwrap();
        for f in 0..10u64 {
            let bbox = ElementData::bbox("box", [f as f64, 0.0, 2.0, 2.0]).unwrap();
            doc.add_object_data(&uid, bbox, Some(f)).unwrap();
        }

        let removal = doc.remove_object_by_frame(&uid, fi(3, 5)).unwrap();
        assert_eq!(removal.frames, vec![3, 4, 5]);
        assert!(removal.relations.is_empty());

        let obj = doc.object(&uid).unwrap();
        assert_eq!(obj.frame_intervals.as_slice(), &[fi(0, 2), fi(6, 9)]);
        assert_eq!(
            obj.data_pointers.get("box").unwrap().frame_intervals.as_slice(),
            &[fi(0, 2), fi(6, 9)]
        );
        assert!(doc.object_data(&uid, "box", Some(4)).is_none());
        assert_eq!(doc.frame_intervals().as_slice(), &[fi(0, 2), fi(6, 9)]);
    }

    #[test]
    fn test_remove_by_frame_over_whole_span() {
        let mut doc = Document::new();
        let a = doc
            .add_object(NewElement::new("a", "Car").with_frame_interval(fi(2, 4)))
            .unwrap();
        let b = doc
            .add_object(NewElement::new("b", "Car").with_frame_interval(fi(4, 6)))
            .unwrap();
        doc.add_object_data(&a, ElementData::text("plate", "X1"), None).unwrap();

        let removal = doc
            .remove_element_by_frame(ElementKind::Object, &a, fi(0, 100))
            .unwrap();
        assert_eq!(removal.frames, vec![2, 3]);

        let obj = doc.object(&a).unwrap();
        assert!(obj.is_static());
        assert!(obj.data.get("plate").is_some());
        assert!(doc.frame(4).unwrap().objects.contains_key(&b));
        assert_eq!(doc.frame_intervals().as_slice(), &[fi(4, 6)]);

        let err = doc
            .remove_object_by_frame(&Uid::Sequential(9), fi(0, 1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownElement);
    }

    #[test]
    fn test_odometry_frame_property() {
        let mut doc = Document::new();
        let mut pose = [0.0; 16];
        for i in [0, 5, 10, 15] {
            pose[i] = 1.0;
        }
        let odo = Odometry::new(pose).with_property("yaw_rate", 0.1);
        doc.add_odometry(7, odo.clone()).unwrap();

        assert_eq!(doc.odometry(7), Some(odo));
        assert!(doc.frame(7).unwrap().properties.extra.contains_key("odometry"));
        assert_eq!(doc.frame_intervals().as_slice(), &[fi(7, 7)]);

        pose[1] = f64::NAN;
        assert!(doc.add_odometry(8, Odometry::new(pose)).is_err());
        assert!(doc.frame(8).is_none());
    }

    #[test]
    fn test_coordinate_systems_and_transforms() {
        let mut doc = Document::new();
        doc.add_coordinate_system("odom", CoordinateSystem::new("scene_cs")).unwrap();
        doc.add_coordinate_system(
            "vehicle",
            CoordinateSystem::new("local_cs").with_parent("odom", TransformData::IDENTITY),
        )
        .unwrap();
        assert_eq!(doc.coordinate_system("odom").unwrap().children, vec!["vehicle"]);

        let err = doc
            .add_coordinate_system("odom", CoordinateSystem::new("scene_cs"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateUid);
        let err = doc
            .add_coordinate_system(
                "cam",
                CoordinateSystem::new("sensor_cs").with_parent("rig", TransformData::IDENTITY),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownCoordinateSystem);

        let t = Transform::new("vehicle", "odom", TransformData::euler([0.1, 0.0, 0.0], [1.0, 0.0, 0.0]));
        doc.add_transform(20, t).unwrap();
        assert!(doc.frame(20).unwrap().properties.transforms.contains_key("vehicle_to_odom"));
        assert_eq!(doc.outer_frame_interval(), Some(fi(20, 20)));

        let bad = Transform::new("vehicle", "gps", TransformData::IDENTITY);
        assert_eq!(doc.add_transform(21, bad).unwrap_err().kind(), ErrorKind::UnknownCoordinateSystem);
        assert!(doc.frame(21).is_none());
    }

    #[test]
    fn test_stream_properties() {
        let mut doc = Document::new();
        let err = doc
            .add_stream_properties("cam", StreamProperties::default(), None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownStream);

        doc.add_stream("cam", Stream::new(StreamType::Camera, "cam.mp4", "front"))
            .unwrap();
        let sync = openlabel_core::StreamSync {
            frame_stream: Some(7),
            ..Default::default()
        };
        doc.add_stream_properties("cam", StreamProperties::default().with_sync(sync), Some(3))
            .unwrap();
        let frame = doc.frame(3).unwrap();
        let props = &frame.properties.streams["cam"].stream_properties;
        assert_eq!(props.sync.as_ref().unwrap().frame_stream, Some(7));
    }

    #[test]
    fn test_tags_and_metadata() {
        let mut doc = Document::new();
        let ont = doc.add_ontology("https://example.org/odd");
        let res = doc.add_resource("../resources/map.xodr");
        let mut tag = Tag::new("motorway");
        tag.ontology_uid = Some(ont);
        tag.resource_uid.insert(res, "road_1".into());
        tag.tag_data.insert(ElementData::num("lanes", 3.0).unwrap());
        let uid = doc.add_tag(tag).unwrap();
        assert_eq!(doc.tag(&uid).unwrap().tag_type, "motorway");

        let mut geo = Tag::new("area");
        geo.tag_data.insert(ElementData::point2d("p", [0.0, 0.0]).unwrap());
        assert!(doc.add_tag(geo).is_err());

        let mut props = JsonMap::new();
        props.insert("annotator".into(), Value::from("lab"));
        props.insert("schema_version".into(), Value::from("9.9.9"));
        props.insert("scenario".into(), Value::from(12));
        doc.add_metadata_properties(props);
        assert_eq!(doc.metadata().annotator.as_deref(), Some("lab"));
        assert_eq!(doc.metadata().schema_version, SCHEMA_VERSION);
        assert_eq!(doc.metadata().properties["scenario"], 12);
    }
}
