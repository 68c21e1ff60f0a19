//! Compact binary transcoding of the canonical JSON tree.
//!
//! Protocol-buffer-like framing: every field starts with a varint tag
//! `(field << 3) | kind`. Keys from the wire vocabulary are written by field
//! number; any other key (UIDs, frame numbers, caller-defined keys) is a map
//! entry on field 1 that carries the key text.
//!
//! The encoding is lossy on purpose. Like proto3 default elision, a
//! vocabulary field holding `""`, `false` or `[]` is not written and does not
//! come back after decoding. Existing binary artifacts depend on this.

use std::path::Path;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use openlabel_core::wire::JsonMap;
use openlabel_core::{OpenLabelError, Result};
use serde_json::{Number, Value};
use tracing::info;

use crate::config::DocumentConfig;
use crate::document::Document;

/// Stream prefix.
pub const MAGIC: &[u8; 4] = b"OLB1";

const MAX_DEPTH: usize = 128;

const KIND_INT: u8 = 0;
const KIND_F64: u8 = 1;
const KIND_STR: u8 = 2;
const KIND_OBJ: u8 = 3;
const KIND_ARR: u8 = 4;
const KIND_BOOL: u8 = 5;
const KIND_UINT: u8 = 6;
const KIND_NULL: u8 = 7;

const FIELD_ITEM: u64 = 0;
const FIELD_MAP_ENTRY: u64 = 1;
const FIELD_FIRST_KNOWN: u64 = 2;

/// Wire vocabulary. Field number of `KEYS[i]` is `i + 2`; append only.
const KEYS: &[&str] = &[
    "openlabel",
    "metadata",
    "schema_version",
    "file_version",
    "name",
    "annotator",
    "comment",
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
    "frame_start",
    "frame_end",
    "type",
    "ontology_uid",
    "resource_uid",
    "coordinate_system",
    "object_data",
    "action_data",
    "event_data",
    "context_data",
    "object_data_pointers",
    "action_data_pointers",
    "event_data_pointers",
    "context_data_pointers",
    "attribute_pointers",
    "rdf_subjects",
    "rdf_objects",
    "uid",
    "val",
    "attributes",
    "bbox",
    "rbbox",
    "num",
    "text",
    "boolean",
    "vec",
    "poly2d",
    "poly3d",
    "cuboid",
    "image",
    "mat",
    "binary",
    "point2d",
    "point3d",
    "mesh",
    "line_reference",
    "area_reference",
    "mode",
    "closed",
    "hierarchy",
    "mime_type",
    "encoding",
    "channels",
    "width",
    "height",
    "data_type",
    "id",
    "reference_type",
    "uri",
    "description",
    "stream_properties",
    "intrinsics_pinhole",
    "intrinsics_fisheye",
    "intrinsics_custom",
    "sync",
    "frame_stream",
    "timestamp",
    "frame_shift",
    "width_px",
    "height_px",
    "camera_matrix_3x4",
    "distortion_coeffs_1xN",
    "lens_coeffs_1x4",
    "fov_deg",
    "center_x",
    "center_y",
    "radius_x",
    "radius_y",
    "parent",
    "children",
    "pose_wrt_parent",
    "src",
    "dst",
    "transform_src_to_dst",
    "matrix4x4",
    "quaternion",
    "translation",
    "euler_angles",
    "sequence",
    "frame_properties",
    "transforms",
    "tag_data",
    "boundary_list",
    "boundary_mode",
];

fn known_field(key: &str) -> Option<u64> {
    KEYS.iter()
        .position(|k| *k == key)
        .map(|i| i as u64 + FIELD_FIRST_KNOWN)
}

fn is_default(value: &Value) -> bool {
    match value {
        Value::String(s) => s.is_empty(),
        Value::Bool(b) => !b,
        Value::Array(a) => a.is_empty(),
        _ => false,
    }
}

fn zigzag(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

fn unzigzag(n: u64) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

// ── Encoding ───────────────────────────────────────────────────

fn put_varint(buf: &mut BytesMut, mut value: u64) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        buf.put_u8(byte);
        if value == 0 {
            break;
        }
    }
}

fn put_bytes(buf: &mut BytesMut, bytes: &[u8]) {
    put_varint(buf, bytes.len() as u64);
    buf.put_slice(bytes);
}

fn kind_of(value: &Value) -> u8 {
    match value {
        Value::Null => KIND_NULL,
        Value::Bool(_) => KIND_BOOL,
        Value::Number(n) if n.is_i64() => KIND_INT,
        Value::Number(n) if n.is_u64() => KIND_UINT,
        Value::Number(_) => KIND_F64,
        Value::String(_) => KIND_STR,
        Value::Array(_) => KIND_ARR,
        Value::Object(_) => KIND_OBJ,
    }
}

fn put_payload(buf: &mut BytesMut, value: &Value) {
    match value {
        Value::Null => {}
        Value::Bool(b) => put_varint(buf, u64::from(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                put_varint(buf, zigzag(i));
            } else if let Some(u) = n.as_u64() {
                put_varint(buf, u);
            } else {
                buf.put_f64_le(n.as_f64().unwrap_or_default());
            }
        }
        Value::String(s) => put_bytes(buf, s.as_bytes()),
        Value::Array(items) => {
            let mut body = BytesMut::new();
            for item in items {
                put_varint(&mut body, (FIELD_ITEM << 3) | u64::from(kind_of(item)));
                put_payload(&mut body, item);
            }
            put_bytes(buf, &body);
        }
        Value::Object(map) => {
            let mut body = BytesMut::new();
            put_fields(&mut body, map);
            put_bytes(buf, &body);
        }
    }
}

fn put_fields(buf: &mut BytesMut, map: &JsonMap) {
    for (key, value) in map {
        let kind = u64::from(kind_of(value));
        match known_field(key) {
            Some(_) if is_default(value) => {}
            Some(field) => {
                put_varint(buf, (field << 3) | kind);
                put_payload(buf, value);
            }
            None => {
                put_varint(buf, (FIELD_MAP_ENTRY << 3) | kind);
                put_bytes(buf, key.as_bytes());
                put_payload(buf, value);
            }
        }
    }
}

/// Encode a tree. The root must be an object.
pub fn encode(value: &Value) -> Result<Bytes> {
    let map = value
        .as_object()
        .ok_or_else(|| OpenLabelError::parse("binary root must be an object"))?;
    let mut buf = BytesMut::with_capacity(1024);
    buf.put_slice(MAGIC);
    put_fields(&mut buf, map);
    Ok(buf.freeze())
}

// ── Decoding ───────────────────────────────────────────────────

fn truncated() -> OpenLabelError {
    OpenLabelError::parse("binary document is truncated")
}

fn get_varint(buf: &mut &[u8]) -> Result<u64> {
    let mut value = 0u64;
    let mut shift = 0;
    while buf.has_remaining() {
        let byte = buf.get_u8();
        value |= u64::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
        if shift >= 64 {
            return Err(OpenLabelError::parse("varint too large"));
        }
    }
    Err(truncated())
}

fn get_slice<'a>(buf: &mut &'a [u8]) -> Result<&'a [u8]> {
    let len = usize::try_from(get_varint(buf)?).map_err(|_| truncated())?;
    if buf.remaining() < len {
        return Err(truncated());
    }
    let slice: &'a [u8] = buf;
    let (head, tail) = slice.split_at(len);
    *buf = tail;
    Ok(head)
}

fn get_string(buf: &mut &[u8]) -> Result<String> {
    let bytes = get_slice(buf)?;
    String::from_utf8(bytes.to_vec()).map_err(|_| OpenLabelError::parse("invalid UTF-8 in binary string"))
}

fn get_payload(buf: &mut &[u8], kind: u8, depth: usize) -> Result<Value> {
    if depth > MAX_DEPTH {
        return Err(OpenLabelError::parse("binary document nests too deep"));
    }
    Ok(match kind {
        KIND_NULL => Value::Null,
        KIND_BOOL => Value::Bool(get_varint(buf)? != 0),
        KIND_INT => Value::from(unzigzag(get_varint(buf)?)),
        KIND_UINT => Value::from(get_varint(buf)?),
        KIND_F64 => {
            if buf.remaining() < 8 {
                return Err(truncated());
            }
            let x = buf.get_f64_le();
            Number::from_f64(x)
                .map(Value::Number)
                .ok_or_else(|| OpenLabelError::parse("non-finite number in binary document"))?
        }
        KIND_STR => Value::String(get_string(buf)?),
        KIND_ARR => {
            let mut body = get_slice(buf)?;
            let mut items = Vec::new();
            while body.has_remaining() {
                let tag = get_varint(&mut body)?;
                if tag >> 3 != FIELD_ITEM {
                    return Err(OpenLabelError::parse("array item with a field number"));
                }
                items.push(get_payload(&mut body, (tag & 7) as u8, depth + 1)?);
            }
            Value::Array(items)
        }
        KIND_OBJ => {
            let mut body = get_slice(buf)?;
            Value::Object(get_fields(&mut body, depth + 1)?)
        }
        other => return Err(OpenLabelError::parse(format!("unknown wire kind {other}"))),
    })
}

fn get_fields(buf: &mut &[u8], depth: usize) -> Result<JsonMap> {
    let mut map = JsonMap::new();
    while buf.has_remaining() {
        let tag = get_varint(buf)?;
        let field = tag >> 3;
        let kind = (tag & 7) as u8;
        let key = match field {
            FIELD_ITEM => return Err(OpenLabelError::parse("object field without a key")),
            FIELD_MAP_ENTRY => get_string(buf)?,
            n => {
                let idx = usize::try_from(n - FIELD_FIRST_KNOWN).unwrap_or(usize::MAX);
                KEYS.get(idx)
                    .ok_or_else(|| OpenLabelError::parse(format!("unknown field number {n}")))?
                    .to_string()
            }
        };
        let value = get_payload(buf, kind, depth)?;
        map.insert(key, value);
    }
    Ok(map)
}

/// Decode a tree written by [`encode`].
pub fn decode(data: &[u8]) -> Result<Value> {
    let mut buf = data;
    if buf.remaining() < MAGIC.len() || &buf[..MAGIC.len()] != MAGIC {
        return Err(OpenLabelError::parse("not an OpenLABEL binary document"));
    }
    buf.advance(MAGIC.len());
    Ok(Value::Object(get_fields(&mut buf, 0)?))
}

impl Document {
    pub fn to_binary(&self) -> Result<Bytes> {
        encode(&self.to_value()?)
    }

    /// Load a binary document. The decoded tree is not schema-validated:
    /// elided fields would make it fail required-key checks.
    pub fn from_binary(data: &[u8]) -> Result<Self> {
        let config = DocumentConfig {
            validate_on_load: false,
            ..DocumentConfig::default()
        };
        Self::from_value(decode(data)?, config)
    }

    pub fn save_binary(&self, path: &Path) -> Result<()> {
        let bytes = self.to_binary()?;
        std::fs::write(path, &bytes)?;
        info!(path = %path.display(), bytes = bytes.len(), "binary document saved");
        Ok(())
    }

    pub fn load_binary(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_binary(&data)
    }
}
