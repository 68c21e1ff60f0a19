//! JSON serialization with schema-version checks and legacy migration.
//!
//! The canonical form is a `serde_json::Value` tree rooted at
//! `{"openlabel": {...}}`. Writing goes document → tree → text, reading goes
//! text → tree → migrate → (validate) → typed document → reindex. Derived
//! state (data pointers, global frame intervals, UID mode) is never trusted
//! from input; it is rebuilt after every load.

use std::path::Path;

use openlabel_core::wire::{self, JsonMap};
use openlabel_core::{ElementDataSet, FrameIntervals, OpenLabelError, Result, Uid, SCHEMA_VERSION};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::{DocumentConfig, SerializeOptions};
use crate::document::Document;
use crate::element::{Element, ElementKind, ResourceUid};
use crate::frame::{Frame, FrameElement, FrameProperties};
use crate::relation::{RdfAgent, Relation};
use crate::schema;

/// Root key of the current format.
pub const ROOT_KEY: &str = "openlabel";
/// Root key of legacy VCD files.
pub const LEGACY_ROOT_KEY: &str = "vcd";

const RELATION_KEYS: [&str; 7] = [
    "name",
    "type",
    "frame_intervals",
    "ontology_uid",
    "resource_uid",
    "rdf_subjects",
    "rdf_objects",
];

fn encode<T: Serialize>(value: &T, path: &str) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| OpenLabelError::parse(format!("{path}: {e}")))
}

fn decode<T: DeserializeOwned>(value: &Value, path: &str) -> Result<T> {
    T::deserialize(value).map_err(|e| OpenLabelError::parse(format!("{path}: {e}")))
}

fn put_map<K: ToString, V>(
    out: &mut JsonMap,
    key: &str,
    entries: impl IntoIterator<Item = (K, V)>,
    mut f: impl FnMut(V) -> Result<Value>,
) -> Result<()> {
    let mut map = JsonMap::new();
    for (k, v) in entries {
        map.insert(k.to_string(), f(v)?);
    }
    if !map.is_empty() {
        out.insert(key.to_string(), Value::Object(map));
    }
    Ok(())
}

// ── Writing ───────────────────────────────────────────────────

fn element_value(kind: ElementKind, element: &Element, with_intervals: bool) -> Result<Value> {
    let mut map = element.extra.clone();
    map.insert("name".into(), Value::from(element.name.as_str()));
    map.insert("type".into(), Value::from(element.semantic_type.as_str()));
    if with_intervals && !element.frame_intervals.is_empty() {
        map.insert(
            "frame_intervals".into(),
            encode(&element.frame_intervals, "frame_intervals")?,
        );
    }
    if let Some(ont) = &element.ontology_uid {
        map.insert("ontology_uid".into(), Value::from(ont.to_string()));
    }
    if !element.resource_uid.is_empty() {
        map.insert("resource_uid".into(), encode(&element.resource_uid, "resource_uid")?);
    }
    if let Some(cs) = &element.coordinate_system {
        map.insert("coordinate_system".into(), Value::from(cs.as_str()));
    }
    if !element.data.is_empty() {
        map.insert(kind.data_key().into(), element.data.to_value());
    }
    if !element.data_pointers.is_empty() {
        map.insert(
            kind.pointers_key().into(),
            encode(&element.data_pointers, kind.pointers_key())?,
        );
    }
    Ok(Value::Object(map))
}

fn relation_value(relation: &Relation, with_intervals: bool) -> Result<Value> {
    let mut map = relation.extra.clone();
    map.insert("name".into(), Value::from(relation.name.as_str()));
    map.insert("type".into(), Value::from(relation.semantic_type.as_str()));
    if with_intervals && !relation.frame_intervals.is_empty() {
        map.insert(
            "frame_intervals".into(),
            encode(&relation.frame_intervals, "frame_intervals")?,
        );
    }
    if let Some(ont) = &relation.ontology_uid {
        map.insert("ontology_uid".into(), Value::from(ont.to_string()));
    }
    if !relation.resource_uid.is_empty() {
        map.insert("resource_uid".into(), encode(&relation.resource_uid, "resource_uid")?);
    }
    map.insert("rdf_subjects".into(), encode(&relation.rdf_subjects, "rdf_subjects")?);
    map.insert("rdf_objects".into(), encode(&relation.rdf_objects, "rdf_objects")?);
    Ok(Value::Object(map))
}

fn frame_element_value(kind: ElementKind, entry: &FrameElement) -> Value {
    let mut map = JsonMap::new();
    if !entry.data.is_empty() {
        map.insert(kind.data_key().into(), entry.data.to_value());
    }
    Value::Object(map)
}

fn frame_value(frame: &Frame) -> Result<Value> {
    let mut map = JsonMap::new();
    for kind in ElementKind::ALL {
        put_map(&mut map, kind.plural(), frame.elements(kind), |e| {
            Ok(frame_element_value(kind, e))
        })?;
    }
    put_map(&mut map, "relations", frame.relations.iter().map(|u| (u, ())), |_| {
        Ok(Value::Object(JsonMap::new()))
    })?;
    if !frame.properties.is_empty() {
        map.insert(
            "frame_properties".into(),
            encode(&frame.properties, "frame_properties")?,
        );
    }
    Ok(Value::Object(map))
}

impl Document {
    /// Canonical tree of the whole document.
    pub fn to_value(&self) -> Result<Value> {
        let mut ol = JsonMap::new();
        let mut metadata = self.metadata.clone();
        metadata.schema_version = SCHEMA_VERSION.to_string();
        ol.insert("metadata".into(), encode(&metadata, "metadata")?);

        put_map(&mut ol, "ontologies", &self.ontologies, |o| encode(o, "ontologies"))?;
        put_map(&mut ol, "resources", &self.resources, |r| Ok(Value::from(r.as_str())))?;
        put_map(&mut ol, "tags", &self.tags, |t| encode(t, "tags"))?;
        put_map(&mut ol, "streams", &self.streams, |s| encode(s, "streams"))?;
        put_map(&mut ol, "coordinate_systems", &self.coordinate_systems, |c| {
            encode(c, "coordinate_systems")
        })?;
        for kind in ElementKind::ALL {
            put_map(&mut ol, kind.plural(), self.elements(kind), |e| {
                element_value(kind, e, true)
            })?;
        }
        put_map(&mut ol, "relations", &self.relations, |r| relation_value(r, true))?;
        put_map(&mut ol, "frames", &self.frames, frame_value)?;
        if !self.frame_intervals.is_empty() {
            ol.insert(
                "frame_intervals".into(),
                encode(&self.frame_intervals, "frame_intervals")?,
            );
        }

        let mut root = JsonMap::new();
        root.insert(ROOT_KEY.into(), Value::Object(ol));
        Ok(Value::Object(root))
    }

    /// Serialize to JSON text. Keys are sorted in both forms.
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        self.to_json_with(SerializeOptions {
            pretty,
            ..SerializeOptions::default()
        })
    }

    pub fn to_json_with(&self, options: SerializeOptions) -> Result<String> {
        let value = self.to_value()?;
        if options.validate {
            schema::validate(&value)?;
        }
        let text = if options.pretty {
            serde_json::to_string_pretty(&value)
        } else {
            serde_json::to_string(&value)
        };
        text.map_err(|e| OpenLabelError::parse(format!("failed to write document: {e}")))
    }

    /// Parse JSON text with the default config (validation on).
    pub fn from_json(text: &str) -> Result<Self> {
        Self::from_json_with(text, DocumentConfig::default())
    }

    pub fn from_json_with(text: &str, config: DocumentConfig) -> Result<Self> {
        let raw: Value = serde_json::from_str(text)
            .map_err(|e| OpenLabelError::parse(format!("invalid JSON: {e}")))?;
        Self::from_value(raw, config)
    }

    /// Build a document from a canonical (or legacy) tree.
    pub fn from_value(raw: Value, config: DocumentConfig) -> Result<Self> {
        let value = migrate(raw)?;
        if config.validate_on_load {
            schema::validate(&value)?;
        }
        let mut doc = parse_document(&value, config)?;
        doc.reindex();
        Ok(doc)
    }

    /// Write the document to a JSON file.
    pub fn save(&self, path: &Path, options: SerializeOptions) -> Result<()> {
        let text = self.to_json_with(options)?;
        std::fs::write(path, text)?;
        info!(path = %path.display(), "document saved");
        Ok(())
    }

    /// Load a document from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with(path, DocumentConfig::default())
    }

    pub fn load_with(path: &Path, config: DocumentConfig) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let doc = Self::from_json_with(&text, config)?;
        info!(path = %path.display(), frames = doc.frames.len(), "document loaded");
        Ok(doc)
    }

    /// Tree of one frame. With `dynamic_only == false` the entry also
    /// carries every element's static description and static data, plus the
    /// static elements and relations, which hold over the whole sequence.
    pub fn frame_value(&self, frame_num: u64, dynamic_only: bool) -> Result<Option<Value>> {
        let Some(frame) = self.frames.get(&frame_num) else {
            return Ok(None);
        };
        if dynamic_only {
            return frame_value(frame).map(Some);
        }

        let mut map = JsonMap::new();
        for kind in ElementKind::ALL {
            let mut entries = JsonMap::new();
            for (uid, element) in self.elements(kind) {
                let dynamic = frame.elements(kind).get(uid);
                if dynamic.is_none() && !element.is_static() {
                    continue;
                }
                let mut merged = element.clone();
                if let Some(entry) = dynamic {
                    merged.data.merge(&entry.data);
                }
                entries.insert(uid.to_string(), element_value(kind, &merged, false)?);
            }
            if !entries.is_empty() {
                map.insert(kind.plural().into(), Value::Object(entries));
            }
        }
        put_map(
            &mut map,
            "relations",
            self.relations
                .iter()
                .filter(|(uid, r)| r.is_static() || frame.relations.contains(*uid)),
            |r| relation_value(r, false),
        )?;
        if !frame.properties.is_empty() {
            map.insert(
                "frame_properties".into(),
                encode(&frame.properties, "frame_properties")?,
            );
        }
        Ok(Some(Value::Object(map)))
    }

    /// JSON text of one frame, or `None` when the frame does not exist.
    pub fn stringify_frame(&self, frame_num: u64, dynamic_only: bool, pretty: bool) -> Result<Option<String>> {
        let Some(value) = self.frame_value(frame_num, dynamic_only)? else {
            warn!(frame = frame_num, "no such frame");
            return Ok(None);
        };
        let text = if pretty {
            serde_json::to_string_pretty(&value)
        } else {
            serde_json::to_string(&value)
        };
        text.map(Some)
            .map_err(|e| OpenLabelError::parse(format!("failed to write frame: {e}")))
    }
}

// ── Migration ─────────────────────────────────────────────────

/// Bring a tree to the current format.
///
/// A legacy `{"vcd": {...}}` root is renamed, its `version` moves into
/// `metadata.schema_version` and `metadata.streams` becomes top-level
/// `streams`. A current root with a different schema version is rejected.
pub fn migrate(mut value: Value) -> Result<Value> {
    let Some(root) = value.as_object_mut() else {
        return Err(OpenLabelError::parse("document root must be an object"));
    };

    if !root.contains_key(ROOT_KEY) {
        if let Some(mut legacy) = root.remove(LEGACY_ROOT_KEY) {
            let body = legacy
                .as_object_mut()
                .ok_or_else(|| OpenLabelError::parse("vcd: expected an object"))?;
            let from = body
                .remove("version")
                .and_then(|v| v.as_str().map(str::to_owned))
                .unwrap_or_else(|| "unknown".to_string());
            warn!(from = %from, to = SCHEMA_VERSION, "migrating legacy vcd document");

            let metadata = body
                .entry("metadata")
                .or_insert_with(|| Value::Object(JsonMap::new()));
            let metadata = metadata
                .as_object_mut()
                .ok_or_else(|| OpenLabelError::parse("vcd.metadata: expected an object"))?;
            metadata.remove("vcd_version");
            metadata.insert("schema_version".into(), Value::from(SCHEMA_VERSION));
            let streams = metadata.remove("streams");

            if let Some(streams) = streams {
                body.entry("streams").or_insert(streams);
            }
            // Legacy writers always emitted these, possibly empty.
            for key in ["frames", "frame_intervals"] {
                let empty = match body.get(key) {
                    Some(Value::Object(m)) => m.is_empty(),
                    Some(Value::Array(a)) => a.is_empty(),
                    _ => false,
                };
                if empty {
                    body.remove(key);
                }
            }
            root.insert(ROOT_KEY.into(), legacy);
        }
    }

    if let Some(version) = value
        .pointer("/openlabel/metadata/schema_version")
        .and_then(Value::as_str)
    {
        if version != SCHEMA_VERSION {
            return Err(OpenLabelError::schema(
                "openlabel.metadata.schema_version",
                format!("unsupported schema version {version}, expected {SCHEMA_VERSION}"),
            ));
        }
    }
    Ok(value)
}

// ── Reading ───────────────────────────────────────────────────

fn parse_uid(key: &str, path: &str) -> Result<Uid> {
    key.parse()
        .map_err(|_| OpenLabelError::parse(format!("{path}: `{key}` is not a UID")))
}

fn parse_opt_uid(map: &JsonMap, key: &str, path: &str) -> Result<Option<Uid>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => decode(v, &wire::join(path, key)).map(Some),
    }
}

fn parse_intervals(map: &JsonMap, path: &str) -> Result<FrameIntervals> {
    match map.get("frame_intervals") {
        None | Some(Value::Null) => Ok(FrameIntervals::new()),
        Some(v) => decode(v, &wire::join(path, "frame_intervals")),
    }
}

fn parse_resources(map: &JsonMap, path: &str) -> Result<ResourceUid> {
    match map.get("resource_uid") {
        None | Some(Value::Null) => Ok(ResourceUid::new()),
        Some(v) => decode(v, &wire::join(path, "resource_uid")),
    }
}

fn parse_data(kind: ElementKind, map: &JsonMap, path: &str) -> Result<ElementDataSet> {
    let Some(value) = map.get(kind.data_key()) else {
        return Ok(ElementDataSet::new());
    };
    let data_path = wire::join(path, kind.data_key());
    let set = ElementDataSet::from_value(value, &data_path)?;
    if let Some(t) = set.types().find(|t| !kind.accepts(*t)) {
        return Err(OpenLabelError::parse(format!(
            "{data_path}.{t}: not allowed on {kind}s"
        )));
    }
    Ok(set)
}

fn parse_element(kind: ElementKind, value: &Value, path: &str) -> Result<Element> {
    let map = wire::as_object(value, path)?;
    let known = [
        "name",
        "type",
        "frame_intervals",
        "ontology_uid",
        "resource_uid",
        "coordinate_system",
        kind.data_key(),
        kind.pointers_key(),
    ];
    Ok(Element {
        name: wire::opt_str(map, "name", path)?.unwrap_or_default(),
        semantic_type: wire::opt_str(map, "type", path)?.unwrap_or_default(),
        ontology_uid: parse_opt_uid(map, "ontology_uid", path)?,
        resource_uid: parse_resources(map, path)?,
        coordinate_system: wire::opt_str(map, "coordinate_system", path)?,
        frame_intervals: parse_intervals(map, path)?,
        data: parse_data(kind, map, path)?,
        data_pointers: Default::default(),
        extra: wire::extras(map, &known),
    })
}

// Required keys are enforced by the validator; a typed load also has to
// accept binary input, where empty strings and lists are elided.
fn parse_agents(map: &JsonMap, key: &str, path: &str) -> Result<Vec<RdfAgent>> {
    match map.get(key) {
        None => Ok(Vec::new()),
        Some(v) => decode(v, &wire::join(path, key)),
    }
}

fn parse_relation(value: &Value, path: &str) -> Result<Relation> {
    let map = wire::as_object(value, path)?;
    Ok(Relation {
        name: wire::opt_str(map, "name", path)?.unwrap_or_default(),
        semantic_type: wire::opt_str(map, "type", path)?.unwrap_or_default(),
        ontology_uid: parse_opt_uid(map, "ontology_uid", path)?,
        resource_uid: parse_resources(map, path)?,
        frame_intervals: parse_intervals(map, path)?,
        rdf_subjects: parse_agents(map, "rdf_subjects", path)?,
        rdf_objects: parse_agents(map, "rdf_objects", path)?,
        extra: wire::extras(map, &RELATION_KEYS),
    })
}

fn parse_frame(value: &Value, path: &str) -> Result<Frame> {
    let map = wire::as_object(value, path)?;
    let mut frame = Frame::default();
    for kind in ElementKind::ALL {
        let Some(entries) = map.get(kind.plural()) else {
            continue;
        };
        let kind_path = wire::join(path, kind.plural());
        for (key, entry) in wire::as_object(entries, &kind_path)? {
            let entry_path = wire::join(&kind_path, key);
            let uid = parse_uid(key, &kind_path)?;
            let entry_map = wire::as_object(entry, &entry_path)?;
            let data = parse_data(kind, entry_map, &entry_path)?;
            frame.elements_mut(kind).insert(uid, FrameElement { data });
        }
    }
    if let Some(relations) = map.get("relations") {
        let rel_path = wire::join(path, "relations");
        for key in wire::as_object(relations, &rel_path)?.keys() {
            frame.relations.insert(parse_uid(key, &rel_path)?);
        }
    }
    if let Some(props) = map.get("frame_properties") {
        frame.properties = decode::<FrameProperties>(props, &wire::join(path, "frame_properties"))?;
    }
    Ok(frame)
}

fn each_entry<'a>(
    ol: &'a JsonMap,
    key: &str,
) -> Result<impl Iterator<Item = (&'a String, &'a Value)>> {
    let entries = match ol.get(key) {
        Some(v) => Some(wire::as_object(v, &wire::join(ROOT_KEY, key))?),
        None => None,
    };
    Ok(entries.into_iter().flatten())
}

fn parse_document(value: &Value, config: DocumentConfig) -> Result<Document> {
    let root = wire::as_object(value, "")?;
    let body = root
        .get(ROOT_KEY)
        .ok_or_else(|| OpenLabelError::parse("missing `openlabel` root"))?;
    let ol = wire::as_object(body, ROOT_KEY)?;

    let mut doc = Document::with_config(config);
    if let Some(meta) = ol.get("metadata") {
        doc.metadata = decode(meta, "openlabel.metadata")?;
    }

    for (key, v) in each_entry(ol, "ontologies")? {
        let path = format!("openlabel.ontologies.{key}");
        doc.ontologies.insert(parse_uid(key, &path)?, decode(v, &path)?);
    }
    for (key, v) in each_entry(ol, "resources")? {
        let path = format!("openlabel.resources.{key}");
        doc.resources.insert(parse_uid(key, &path)?, decode(v, &path)?);
    }
    for (key, v) in each_entry(ol, "tags")? {
        let path = format!("openlabel.tags.{key}");
        doc.tags.insert(parse_uid(key, &path)?, decode(v, &path)?);
    }
    for (key, v) in each_entry(ol, "streams")? {
        doc.streams
            .insert(key.clone(), decode(v, &format!("openlabel.streams.{key}"))?);
    }
    for (key, v) in each_entry(ol, "coordinate_systems")? {
        doc.coordinate_systems.insert(
            key.clone(),
            decode(v, &format!("openlabel.coordinate_systems.{key}"))?,
        );
    }
    for kind in ElementKind::ALL {
        for (key, v) in each_entry(ol, kind.plural())? {
            let path = format!("openlabel.{}.{key}", kind.plural());
            let uid = parse_uid(key, &path)?;
            let element = parse_element(kind, v, &path)?;
            doc.elements_mut(kind).insert(uid, element);
        }
    }
    for (key, v) in each_entry(ol, "relations")? {
        let path = format!("openlabel.relations.{key}");
        doc.relations
            .insert(parse_uid(key, &path)?, parse_relation(v, &path)?);
    }
    for (key, v) in each_entry(ol, "frames")? {
        let path = format!("openlabel.frames.{key}");
        let n: u64 = key
            .parse()
            .map_err(|_| OpenLabelError::parse(format!("{path}: frame keys are integers")))?;
        doc.frames.insert(n, parse_frame(v, &path)?);
    }

    for key in ol.keys() {
        if !TOP_LEVEL_KEYS.contains(&key.as_str()) {
            warn!(key = %key, "ignoring unknown top-level key");
        }
    }
    Ok(doc)
}

/// Keys allowed under the `openlabel` root.
pub const TOP_LEVEL_KEYS: [&str; 13] = [
    "metadata",
    "ontologies",
    "resources",
    "tags",
    "streams",
    "coordinate_systems",
    "objects",
    "actions",
    "events",
    "contexts",
    "relations",
    "frames",
    "frame_intervals",
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::NewElement;
    use crate::relation::NewRelation;
    use openlabel_core::{ElementData, ErrorKind, FrameInterval};
    use serde_json::json;

    fn sample() -> Document {
        let mut doc = Document::new();
        doc.set_name("sample");
        let car = doc
            .add_object(NewElement::new("car", "Car").with_frame_interval(FrameInterval::new(0, 2).unwrap()))
            .unwrap();
        let ped = doc.add_object(NewElement::new("ped", "Pedestrian")).unwrap();
        doc.add_object_data(&car, ElementData::bbox("box", [1.0, 2.0, 3.0, 4.0]).unwrap(), Some(1))
            .unwrap();
        doc.add_object_data(&ped, ElementData::text("gender", "f"), None).unwrap();
        doc.add_relation(
            NewRelation::new("near", "isNear")
                .subject(RdfAgent::object(car))
                .object(RdfAgent::object(ped)),
        )
        .unwrap();
        doc
    }

    #[test]
    fn test_document_roundtrip() {
        let doc = sample();
        let json = doc.to_json(true).unwrap();
        let loaded = Document::from_json(&json).unwrap();
        assert_eq!(loaded.to_json(true).unwrap(), json);
        assert_eq!(loaded.metadata().name.as_deref(), Some("sample"));
    }

    #[test]
    fn test_wire_shape() {
        let v = sample().to_value().unwrap();
        let ol = &v["openlabel"];
        assert_eq!(ol["metadata"]["schema_version"], SCHEMA_VERSION);
        assert_eq!(ol["objects"]["0"]["frame_intervals"], json!([{"frame_start": 0, "frame_end": 2}]));
        assert_eq!(ol["objects"]["1"]["object_data"]["text"][0]["val"], "f");
        assert_eq!(ol["frames"]["1"]["objects"]["0"]["object_data"]["bbox"][0]["val"], json!([1, 2, 3, 4]));
        assert_eq!(ol["frames"]["0"]["objects"]["0"], json!({}));
        // Static relation: no intervals, no frame entries
        assert!(ol["relations"]["0"].get("frame_intervals").is_none());
        assert!(ol["frames"]["1"].get("relations").is_none());
    }

    #[test]
    fn test_malformed_json() {
        let err = Document::from_json("{\"openlabel\": ").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseError);
    }

    #[test]
    fn test_future_version_rejected() {
        let raw = json!({"openlabel": {"metadata": {"schema_version": "9.0.0"}}});
        let err = Document::from_value(raw, DocumentConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaViolation);
    }

    #[test]
    fn test_legacy_vcd_migrated() {
        let raw = json!({"vcd": {
            "version": "4.2.1",
            "frame_intervals": [],
            "frames": {},
            "metadata": {"annotator": "lab", "streams": {"cam": {"type": "camera", "uri": "c.mp4"}}},
            "objects": {"0": {"name": "car", "type": "Car", "frame_intervals": []}}
        }});
        let doc = Document::from_value(raw, DocumentConfig::default()).unwrap();
        assert_eq!(doc.metadata().annotator.as_deref(), Some("lab"));
        assert!(doc.stream("cam").is_some());
        assert!(doc.object(&Uid::Sequential(0)).unwrap().is_static());
    }

    #[test]
    fn test_load_rebuilds_derived_state() {
        let raw = json!({"openlabel": {
            "metadata": {"schema_version": SCHEMA_VERSION},
            "objects": {"3": {"name": "car", "type": "Car",
                "frame_intervals": [{"frame_start": 4, "frame_end": 5}]}},
            "frames": {"4": {"objects": {"3": {"object_data": {"num": [{"name": "speed", "val": 2.5}]}}}}}
        }});
        let doc = Document::from_value(raw, DocumentConfig::default()).unwrap();
        assert_eq!(doc.outer_frame_interval(), Some(FrameInterval::new(4, 5).unwrap()));
        assert!(doc.frame(5).unwrap().objects.contains_key(&Uid::Sequential(3)));
        let obj = doc.object(&Uid::Sequential(3)).unwrap();
        assert_eq!(
            obj.data_pointers.get("speed").unwrap().frame_intervals,
            FrameIntervals::from_pairs(&[(4, 4)]).unwrap()
        );
        assert!(!doc.uses_uuid());
    }

    #[test]
    fn test_stringify_frame_with_static() {
        let doc = sample();
        let dynamic = doc.frame_value(1, true).unwrap().unwrap();
        assert!(dynamic["objects"].get("1").is_none());

        let full = doc.frame_value(1, false).unwrap().unwrap();
        assert_eq!(full["objects"]["0"]["name"], "car");
        assert!(full["objects"]["0"].get("frame_intervals").is_none());
        assert_eq!(full["objects"]["1"]["object_data"]["text"][0]["val"], "f");
        assert_eq!(full["relations"]["0"]["type"], "isNear");

        assert!(doc.stringify_frame(99, true, false).unwrap().is_none());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        let doc = sample();
        doc.save(&path, SerializeOptions::pretty()).unwrap();
        let loaded = Document::load(&path).unwrap();
        assert_eq!(loaded.to_json(false).unwrap(), doc.to_json(false).unwrap());
    }
}
