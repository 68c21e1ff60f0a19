//! Schema validation of the canonical JSON tree.
//!
//! The grammar is fixed and encoded directly as a walk over the tree. Each
//! node is either closed (unknown keys rejected) or open (caller-defined keys
//! allowed); that split is part of the wire contract. Failures carry the
//! dotted path of the offending node. Validation never mutates anything.

use std::collections::BTreeMap;

use openlabel_core::wire::{self, JsonMap};
use openlabel_core::{
    DataType, ElementData, OpenLabelError, Result, StreamProperties, TransformData, Uid,
    SCHEMA_VERSION,
};
use serde_json::Value;

use crate::coordinate_system::{check_tree, CoordinateSystem};
use crate::element::ElementKind;
use crate::frame::{Odometry, ODOMETRY_KEY};
use crate::serialization::{ROOT_KEY, TOP_LEVEL_KEYS};

/// Configuration for schema validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatorConfig {
    /// Maximum nesting depth of the tree.
    pub max_depth: usize,
    /// Check cross references: relation agents must name declared elements,
    /// and the coordinate systems must form a tree.
    pub check_references: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_depth: 64,
            check_references: true,
        }
    }
}

/// Validate with the default configuration.
pub fn validate(value: &Value) -> Result<()> {
    SchemaValidator::new().validate(value)
}

#[derive(Debug, Default)]
pub struct SchemaValidator {
    config: ValidatorConfig,
}

fn fail(path: &str, reason: impl Into<String>) -> OpenLabelError {
    OpenLabelError::schema(path, reason)
}

fn object<'v>(value: &'v Value, path: &str) -> Result<&'v JsonMap> {
    value
        .as_object()
        .ok_or_else(|| fail(path, "expected an object"))
}

fn closed(map: &JsonMap, allowed: &[&str], path: &str) -> Result<()> {
    match map.keys().find(|k| !allowed.contains(&k.as_str())) {
        Some(key) => Err(fail(&wire::join(path, key), "unexpected key")),
        None => Ok(()),
    }
}

fn required(map: &JsonMap, keys: &[&str], path: &str) -> Result<()> {
    match keys.iter().find(|k| !map.contains_key(**k)) {
        Some(key) => Err(fail(path, format!("missing required key `{key}`"))),
        None => Ok(()),
    }
}

fn string(map: &JsonMap, key: &str, path: &str) -> Result<()> {
    match map.get(key) {
        None | Some(Value::String(_)) => Ok(()),
        Some(_) => Err(fail(&wire::join(path, key), "expected a string")),
    }
}

fn uid_value(map: &JsonMap, key: &str, path: &str) -> Result<()> {
    match map.get(key) {
        None => Ok(()),
        Some(Value::String(s)) if Uid::is_valid_key(s) => Ok(()),
        Some(_) => Err(fail(&wire::join(path, key), "expected a UID string")),
    }
}

fn uid_keys(map: &JsonMap, path: &str) -> Result<()> {
    match map.keys().find(|k| !Uid::is_valid_key(k)) {
        Some(key) => Err(fail(&wire::join(path, key), "key is not a UID")),
        None => Ok(()),
    }
}

fn depth(value: &Value) -> usize {
    match value {
        Value::Array(items) => 1 + items.iter().map(depth).max().unwrap_or(0),
        Value::Object(map) => 1 + map.values().map(depth).max().unwrap_or(0),
        _ => 0,
    }
}

impl SchemaValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ValidatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Validate a whole document tree.
    pub fn validate(&self, value: &Value) -> Result<()> {
        let d = depth(value);
        if d > self.config.max_depth {
            return Err(fail(
                "",
                format!("nesting depth {d} exceeds {}", self.config.max_depth),
            ));
        }

        let root = object(value, "")?;
        required(root, &[ROOT_KEY], "")?;
        closed(root, &[ROOT_KEY], "")?;
        let path = ROOT_KEY;
        let ol = object(&root[ROOT_KEY], path)?;
        closed(ol, &TOP_LEVEL_KEYS, path)?;
        required(ol, &["metadata"], path)?;

        self.metadata(&ol["metadata"], &wire::join(path, "metadata"))?;
        if let Some(v) = ol.get("ontologies") {
            self.ontologies(v, &wire::join(path, "ontologies"))?;
        }
        if let Some(v) = ol.get("resources") {
            let p = wire::join(path, "resources");
            let map = object(v, &p)?;
            uid_keys(map, &p)?;
            for key in map.keys() {
                string(map, key, &p)?;
            }
        }
        if let Some(v) = ol.get("tags") {
            self.tags(v, &wire::join(path, "tags"))?;
        }
        if let Some(v) = ol.get("streams") {
            let p = wire::join(path, "streams");
            for (name, stream) in object(v, &p)? {
                self.stream(stream, &wire::join(&p, name))?;
            }
        }
        if let Some(v) = ol.get("coordinate_systems") {
            self.coordinate_systems(v, &wire::join(path, "coordinate_systems"))?;
        }
        for kind in ElementKind::ALL {
            if let Some(v) = ol.get(kind.plural()) {
                let p = wire::join(path, kind.plural());
                let map = object(v, &p)?;
                uid_keys(map, &p)?;
                for (uid, entry) in map {
                    self.element(kind, entry, &wire::join(&p, uid))?;
                }
            }
        }
        if let Some(v) = ol.get("relations") {
            let p = wire::join(path, "relations");
            let map = object(v, &p)?;
            uid_keys(map, &p)?;
            for (uid, entry) in map {
                self.relation(ol, entry, &wire::join(&p, uid))?;
            }
        }
        if let Some(v) = ol.get("frames") {
            let p = wire::join(path, "frames");
            for (key, frame) in object(v, &p)? {
                let fp = wire::join(&p, key);
                if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(fail(&fp, "frame keys are non-negative integers"));
                }
                self.frame(frame, &fp)?;
            }
        }
        if let Some(v) = ol.get("frame_intervals") {
            self.frame_intervals(v, &wire::join(path, "frame_intervals"))?;
        }
        Ok(())
    }

    fn metadata(&self, value: &Value, path: &str) -> Result<()> {
        let map = object(value, path)?;
        required(map, &["schema_version"], path)?;
        match map.get("schema_version") {
            Some(Value::String(v)) if v == SCHEMA_VERSION => {}
            _ => {
                return Err(fail(
                    &wire::join(path, "schema_version"),
                    format!("expected \"{SCHEMA_VERSION}\""),
                ))
            }
        }
        for key in ["file_version", "name", "annotator", "comment"] {
            string(map, key, path)?;
        }
        Ok(())
    }

    fn ontologies(&self, value: &Value, path: &str) -> Result<()> {
        let map = object(value, path)?;
        uid_keys(map, path)?;
        for (uid, entry) in map {
            let p = wire::join(path, uid);
            match entry {
                Value::String(_) => {}
                Value::Object(o) => {
                    required(o, &["uri", "boundary_list", "boundary_mode"], &p)?;
                    string(o, "uri", &p)?;
                    let list_ok = o["boundary_list"]
                        .as_array()
                        .is_some_and(|a| a.iter().all(Value::is_string));
                    if !list_ok {
                        return Err(fail(&wire::join(&p, "boundary_list"), "expected an array of strings"));
                    }
                    if !matches!(o["boundary_mode"].as_str(), Some("include" | "exclude")) {
                        return Err(fail(&wire::join(&p, "boundary_mode"), "expected include or exclude"));
                    }
                }
                _ => return Err(fail(&p, "expected a URI string or a bounded ontology")),
            }
        }
        Ok(())
    }

    fn tags(&self, value: &Value, path: &str) -> Result<()> {
        let map = object(value, path)?;
        uid_keys(map, path)?;
        for (uid, entry) in map {
            let p = wire::join(path, uid);
            let tag = object(entry, &p)?;
            required(tag, &["type"], &p)?;
            string(tag, "type", &p)?;
            uid_value(tag, "ontology_uid", &p)?;
            if let Some(r) = tag.get("resource_uid") {
                self.resource_uid(r, &wire::join(&p, "resource_uid"))?;
            }
            if let Some(d) = tag.get("tag_data") {
                self.data_buckets(d, &DataType::GENERIC, &wire::join(&p, "tag_data"))?;
            }
        }
        Ok(())
    }

    fn resource_uid(&self, value: &Value, path: &str) -> Result<()> {
        let map = object(value, path)?;
        uid_keys(map, path)?;
        for key in map.keys() {
            string(map, key, path)?;
        }
        Ok(())
    }

    fn stream(&self, value: &Value, path: &str) -> Result<()> {
        let map = object(value, path)?;
        required(map, &["type"], path)?;
        if !matches!(
            map["type"].as_str(),
            Some("camera" | "lidar" | "radar" | "gps_imu" | "other")
        ) {
            return Err(fail(&wire::join(path, "type"), "unknown stream type"));
        }
        string(map, "uri", path)?;
        string(map, "description", path)?;
        if let Some(sp) = map.get("stream_properties") {
            self.stream_properties(sp, &wire::join(path, "stream_properties"))?;
        }
        Ok(())
    }

    fn stream_properties(&self, value: &Value, path: &str) -> Result<()> {
        let map = object(value, path)?;
        StreamProperties::try_from(map.clone())
            .map(|_| ())
            .map_err(|e| fail(path, e.to_string()))
    }

    fn coordinate_systems(&self, value: &Value, path: &str) -> Result<()> {
        let map = object(value, path)?;
        let mut systems = BTreeMap::new();
        for (name, entry) in map {
            let p = wire::join(path, name);
            let cs = object(entry, &p)?;
            required(cs, &["type", "parent", "children"], &p)?;
            string(cs, "type", &p)?;
            string(cs, "parent", &p)?;
            if !cs["children"]
                .as_array()
                .is_some_and(|a| a.iter().all(Value::is_string))
            {
                return Err(fail(&wire::join(&p, "children"), "expected an array of names"));
            }
            if let Some(pose) = cs.get("pose_wrt_parent") {
                self.transform_data(pose, &wire::join(&p, "pose_wrt_parent"))?;
            }
            let typed: CoordinateSystem = serde_json::from_value(entry.clone())
                .map_err(|e| fail(&p, e.to_string()))?;
            systems.insert(name.clone(), typed);
        }
        if self.config.check_references {
            check_tree(&systems)?;
        }
        Ok(())
    }

    fn transform_data(&self, value: &Value, path: &str) -> Result<()> {
        let data: TransformData = serde_json::from_value(value.clone()).map_err(|_| {
            fail(
                path,
                "expected matrix4x4 (16), quaternion (4) + translation (3) or euler_angles (3) + translation (3)",
            )
        })?;
        data.validate().map_err(|e| fail(path, e.to_string()))
    }

    fn transform(&self, value: &Value, path: &str) -> Result<()> {
        let map = object(value, path)?;
        required(map, &["src", "dst", "transform_src_to_dst"], path)?;
        string(map, "src", path)?;
        string(map, "dst", path)?;
        self.transform_data(
            &map["transform_src_to_dst"],
            &wire::join(path, "transform_src_to_dst"),
        )
    }

    fn frame_intervals(&self, value: &Value, path: &str) -> Result<()> {
        let items = value
            .as_array()
            .ok_or_else(|| fail(path, "expected an array"))?;
        for (i, item) in items.iter().enumerate() {
            let p = wire::join(path, i);
            let fi = object(item, &p)?;
            required(fi, &["frame_start", "frame_end"], &p)?;
            closed(fi, &["frame_start", "frame_end"], &p)?;
            match (fi["frame_start"].as_u64(), fi["frame_end"].as_u64()) {
                (Some(s), Some(e)) if s <= e => {}
                (Some(_), Some(_)) => return Err(fail(&p, "frame_start > frame_end")),
                _ => return Err(fail(&p, "frame bounds are non-negative integers")),
            }
        }
        Ok(())
    }

    /// `{bucket: [entry, ...]}` with buckets limited to `allowed`.
    fn data_buckets(&self, value: &Value, allowed: &[DataType], path: &str) -> Result<()> {
        let map = object(value, path)?;
        for (key, entries) in map {
            let bp = wire::join(path, key);
            let dtype = DataType::from_key(key)
                .filter(|t| allowed.contains(t))
                .ok_or_else(|| fail(&bp, "data type not allowed here"))?;
            let items = entries
                .as_array()
                .ok_or_else(|| fail(&bp, "expected an array"))?;
            for (i, entry) in items.iter().enumerate() {
                let ep = wire::join(&bp, i);
                object(entry, &ep)?;
                ElementData::from_value(dtype, entry, &ep).map_err(|e| fail(&ep, e.to_string()))?;
            }
        }
        Ok(())
    }

    fn allowed_types(kind: ElementKind) -> &'static [DataType] {
        match kind {
            ElementKind::Object => &DataType::ALL,
            _ => &DataType::GENERIC,
        }
    }

    fn element(&self, kind: ElementKind, value: &Value, path: &str) -> Result<()> {
        let map = object(value, path)?;
        required(map, &["name", "type"], path)?;
        string(map, "name", path)?;
        string(map, "type", path)?;
        string(map, "coordinate_system", path)?;
        uid_value(map, "ontology_uid", path)?;
        if let Some(fi) = map.get("frame_intervals") {
            self.frame_intervals(fi, &wire::join(path, "frame_intervals"))?;
        }
        if let Some(r) = map.get("resource_uid") {
            self.resource_uid(r, &wire::join(path, "resource_uid"))?;
        }
        if let Some(d) = map.get(kind.data_key()) {
            self.data_buckets(d, Self::allowed_types(kind), &wire::join(path, kind.data_key()))?;
        }
        if let Some(p) = map.get(kind.pointers_key()) {
            self.pointers(p, &wire::join(path, kind.pointers_key()))?;
        }
        Ok(())
    }

    fn pointers(&self, value: &Value, path: &str) -> Result<()> {
        let map = object(value, path)?;
        for (name, pointer) in map {
            let p = wire::join(path, name);
            let ptr = object(pointer, &p)?;
            required(ptr, &["type", "frame_intervals"], &p)?;
            closed(ptr, &["type", "frame_intervals", "attribute_pointers"], &p)?;
            let known_type = ptr["type"].as_str().and_then(DataType::from_key).is_some();
            if !known_type {
                return Err(fail(&wire::join(&p, "type"), "unknown data type"));
            }
            self.frame_intervals(&ptr["frame_intervals"], &wire::join(&p, "frame_intervals"))?;
            if let Some(attrs) = ptr.get("attribute_pointers") {
                let ap = wire::join(&p, "attribute_pointers");
                for (attr, t) in object(attrs, &ap)? {
                    let generic = t
                        .as_str()
                        .and_then(DataType::from_key)
                        .is_some_and(DataType::is_generic);
                    if !generic {
                        return Err(fail(&wire::join(&ap, attr), "attributes are num, text, boolean or vec"));
                    }
                }
            }
        }
        Ok(())
    }

    fn relation(&self, ol: &JsonMap, value: &Value, path: &str) -> Result<()> {
        let map = object(value, path)?;
        required(map, &["name", "type", "rdf_subjects", "rdf_objects"], path)?;
        string(map, "name", path)?;
        string(map, "type", path)?;
        uid_value(map, "ontology_uid", path)?;
        if let Some(fi) = map.get("frame_intervals") {
            self.frame_intervals(fi, &wire::join(path, "frame_intervals"))?;
        }
        if let Some(r) = map.get("resource_uid") {
            self.resource_uid(r, &wire::join(path, "resource_uid"))?;
        }
        for side in ["rdf_subjects", "rdf_objects"] {
            let sp = wire::join(path, side);
            let agents = map[side]
                .as_array()
                .ok_or_else(|| fail(&sp, "expected an array"))?;
            for (i, agent) in agents.iter().enumerate() {
                self.agent(ol, agent, &wire::join(&sp, i))?;
            }
        }
        Ok(())
    }

    fn agent(&self, ol: &JsonMap, value: &Value, path: &str) -> Result<()> {
        let map = object(value, path)?;
        required(map, &["type", "uid"], path)?;
        closed(map, &["type", "uid"], path)?;
        let kind = map["type"]
            .as_str()
            .and_then(ElementKind::parse)
            .ok_or_else(|| fail(&wire::join(path, "type"), "expected object, action, event or context"))?;
        uid_value(map, "uid", path)?;
        if self.config.check_references {
            let uid = map["uid"].as_str().unwrap_or_default();
            let declared = ol
                .get(kind.plural())
                .and_then(Value::as_object)
                .is_some_and(|m| m.contains_key(uid));
            if !declared {
                return Err(fail(path, format!("{kind} {uid} is not declared")));
            }
        }
        Ok(())
    }

    fn frame(&self, value: &Value, path: &str) -> Result<()> {
        let map = object(value, path)?;
        closed(
            map,
            &["objects", "actions", "events", "contexts", "relations", "frame_properties"],
            path,
        )?;
        for kind in ElementKind::ALL {
            let Some(entries) = map.get(kind.plural()) else {
                continue;
            };
            let kp = wire::join(path, kind.plural());
            let entries = object(entries, &kp)?;
            uid_keys(entries, &kp)?;
            for (uid, entry) in entries {
                let ep = wire::join(&kp, uid);
                let e = object(entry, &ep)?;
                closed(e, &[kind.data_key()], &ep)?;
                if let Some(d) = e.get(kind.data_key()) {
                    self.data_buckets(d, Self::allowed_types(kind), &wire::join(&ep, kind.data_key()))?;
                }
            }
        }
        if let Some(rels) = map.get("relations") {
            let rp = wire::join(path, "relations");
            let rels = object(rels, &rp)?;
            uid_keys(rels, &rp)?;
            for (uid, entry) in rels {
                closed(object(entry, &wire::join(&rp, uid))?, &[], &wire::join(&rp, uid))?;
            }
        }
        if let Some(props) = map.get("frame_properties") {
            self.frame_properties(props, &wire::join(path, "frame_properties"))?;
        }
        Ok(())
    }

    fn frame_properties(&self, value: &Value, path: &str) -> Result<()> {
        let map = object(value, path)?;
        if let Some(ts) = map.get("timestamp") {
            if !(ts.is_string() || ts.is_number()) {
                return Err(fail(&wire::join(path, "timestamp"), "expected a string or a number"));
            }
        }
        if let Some(streams) = map.get("streams") {
            let sp = wire::join(path, "streams");
            for (name, s) in object(streams, &sp)? {
                let p = wire::join(&sp, name);
                let s = object(s, &p)?;
                if let Some(props) = s.get("stream_properties") {
                    self.stream_properties(props, &wire::join(&p, "stream_properties"))?;
                }
            }
        }
        if let Some(transforms) = map.get("transforms") {
            let tp = wire::join(path, "transforms");
            for (key, t) in object(transforms, &tp)? {
                self.transform(t, &wire::join(&tp, key))?;
            }
        }
        if let Some(odometry) = map.get(ODOMETRY_KEY) {
            let op = wire::join(path, ODOMETRY_KEY);
            let typed: Odometry = serde_json::from_value(odometry.clone())
                .map_err(|_| fail(&op, "expected pose_lcs_wrt_wcs_4x4 with 16 numbers"))?;
            typed.validate().map_err(|e| fail(&op, e.to_string()))?;
        }
        Ok(())
    }
}
