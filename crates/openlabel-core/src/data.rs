//! Typed element-data payloads.
//!
//! Every payload carries a `name` unique within its owning context (an
//! element's static data, or one frame's dynamic data), an optional
//! coordinate system, a kind-specific value and optional attributes.
//! Attributes are restricted to `num`, `text`, `boolean` and `vec` and may
//! not nest further.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::chain_code;
use crate::error::{OpenLabelError, Result};
use crate::mesh::Mesh;
use crate::wire::{self, JsonMap};

// ── Data types ─────────────────────────────────────────────────

/// Discriminant of an element-data payload; also its wire bucket key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Bbox,
    Rbbox,
    Num,
    Text,
    Boolean,
    Vec,
    Poly2d,
    Poly3d,
    Cuboid,
    Image,
    Mat,
    Binary,
    Point2d,
    Point3d,
    Mesh,
    LineReference,
    AreaReference,
}

impl DataType {
    pub const ALL: [DataType; 17] = [
        Self::Bbox,
        Self::Rbbox,
        Self::Num,
        Self::Text,
        Self::Boolean,
        Self::Vec,
        Self::Poly2d,
        Self::Poly3d,
        Self::Cuboid,
        Self::Image,
        Self::Mat,
        Self::Binary,
        Self::Point2d,
        Self::Point3d,
        Self::Mesh,
        Self::LineReference,
        Self::AreaReference,
    ];

    /// Types legal as attributes and as action/event/context/tag data.
    pub const GENERIC: [DataType; 4] = [Self::Num, Self::Text, Self::Boolean, Self::Vec];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bbox => "bbox",
            Self::Rbbox => "rbbox",
            Self::Num => "num",
            Self::Text => "text",
            Self::Boolean => "boolean",
            Self::Vec => "vec",
            Self::Poly2d => "poly2d",
            Self::Poly3d => "poly3d",
            Self::Cuboid => "cuboid",
            Self::Image => "image",
            Self::Mat => "mat",
            Self::Binary => "binary",
            Self::Point2d => "point2d",
            Self::Point3d => "point3d",
            Self::Mesh => "mesh",
            Self::LineReference => "line_reference",
            Self::AreaReference => "area_reference",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == key)
    }

    pub fn is_generic(self) -> bool {
        Self::GENERIC.contains(&self)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Payloads ───────────────────────────────────────────────────

/// Values of a `vec` payload: all numbers or all strings.
#[derive(Debug, Clone, PartialEq)]
pub enum VecValues {
    Numbers(Vec<f64>),
    Strings(Vec<String>),
}

/// Encoding of a `poly2d` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Poly2dMode {
    /// Flat `[x0, y0, x1, y1, ...]` list.
    #[default]
    Absolute,
    /// Chain code with fixed run lengths, see [`crate::chain_code`].
    Srf6dcc,
    /// Chain code carrying its own run lengths.
    Rs6fcc,
}

impl Poly2dMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Absolute => "MODE_POLY2D_ABSOLUTE",
            Self::Srf6dcc => "MODE_POLY2D_SRF6DCC",
            Self::Rs6fcc => "MODE_POLY2D_RS6FCC",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "MODE_POLY2D_ABSOLUTE" => Some(Self::Absolute),
            "MODE_POLY2D_SRF6DCC" => Some(Self::Srf6dcc),
            "MODE_POLY2D_RS6FCC" => Some(Self::Rs6fcc),
            _ => None,
        }
    }
}

/// Kind-specific part of an element-data payload.
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    /// `[x, y, w, h]`
    Bbox([f64; 4]),
    /// `[x, y, w, h, alpha]`
    Rbbox([f64; 5]),
    Num(f64),
    Text(String),
    Boolean(bool),
    Vec(VecValues),
    Poly2d {
        val: VecValues,
        mode: Poly2dMode,
        closed: bool,
        hierarchy: Option<Vec<i64>>,
    },
    Poly3d {
        val: Vec<f64>,
        closed: bool,
    },
    /// 9 values `[x, y, z, rx, ry, rz, sx, sy, sz]` or
    /// 10 values `[x, y, z, qa, qb, qc, qd, sx, sy, sz]`.
    Cuboid(Vec<f64>),
    Image {
        val: String,
        mime_type: String,
        encoding: String,
    },
    Mat {
        val: Vec<f64>,
        channels: u32,
        width: u32,
        height: u32,
        data_type: String,
    },
    Binary {
        val: String,
        data_type: String,
        encoding: String,
    },
    Point2d {
        val: [f64; 2],
        id: Option<i64>,
    },
    Point3d {
        val: [f64; 3],
        id: Option<i64>,
    },
    Mesh(Mesh),
    LineReference {
        val: Vec<f64>,
        reference_type: String,
    },
    AreaReference {
        val: Vec<f64>,
        reference_type: String,
    },
}

fn finite(what: &str, xs: &[f64]) -> Result<()> {
    if xs.iter().all(|x| x.is_finite()) {
        Ok(())
    } else {
        Err(OpenLabelError::shape(format!("{what} contains a non-finite number")))
    }
}

impl DataValue {
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Bbox(_) => DataType::Bbox,
            Self::Rbbox(_) => DataType::Rbbox,
            Self::Num(_) => DataType::Num,
            Self::Text(_) => DataType::Text,
            Self::Boolean(_) => DataType::Boolean,
            Self::Vec(_) => DataType::Vec,
            Self::Poly2d { .. } => DataType::Poly2d,
            Self::Poly3d { .. } => DataType::Poly3d,
            Self::Cuboid(_) => DataType::Cuboid,
            Self::Image { .. } => DataType::Image,
            Self::Mat { .. } => DataType::Mat,
            Self::Binary { .. } => DataType::Binary,
            Self::Point2d { .. } => DataType::Point2d,
            Self::Point3d { .. } => DataType::Point3d,
            Self::Mesh(_) => DataType::Mesh,
            Self::LineReference { .. } => DataType::LineReference,
            Self::AreaReference { .. } => DataType::AreaReference,
        }
    }

    /// Check arity and numeric constraints.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Bbox(v) => finite("bbox", v),
            Self::Rbbox(v) => finite("rbbox", v),
            Self::Num(x) => finite("num", &[*x]),
            Self::Text(_) | Self::Boolean(_) | Self::Image { .. } | Self::Binary { .. } => Ok(()),
            Self::Vec(VecValues::Numbers(v)) => finite("vec", v),
            Self::Vec(VecValues::Strings(_)) => Ok(()),
            Self::Poly2d { val, mode, .. } => match (mode, val) {
                (Poly2dMode::Absolute, VecValues::Numbers(v)) => {
                    if v.len() % 2 != 0 {
                        return Err(OpenLabelError::shape(format!(
                            "poly2d needs an even number of coordinates, got {}",
                            v.len()
                        )));
                    }
                    finite("poly2d", v)
                }
                (Poly2dMode::Absolute, VecValues::Strings(_)) => Err(OpenLabelError::shape(
                    "poly2d in absolute mode needs numeric coordinates",
                )),
                (_, VecValues::Strings(code)) => chain_code::decode(code, *mode).map(|_| ()),
                (_, VecValues::Numbers(_)) => Err(OpenLabelError::shape(
                    "poly2d chain-code modes carry encoded strings",
                )),
            },
            Self::Poly3d { val, .. } => {
                if val.len() % 3 != 0 {
                    return Err(OpenLabelError::shape(format!(
                        "poly3d needs a multiple of 3 coordinates, got {}",
                        val.len()
                    )));
                }
                finite("poly3d", val)
            }
            Self::Cuboid(v) => {
                if v.len() != 9 && v.len() != 10 {
                    return Err(OpenLabelError::shape(format!(
                        "cuboid takes 9 (euler) or 10 (quaternion) values, got {}",
                        v.len()
                    )));
                }
                finite("cuboid", v)
            }
            Self::Mat {
                val,
                channels,
                width,
                height,
                ..
            } => {
                let expected = (*channels as usize) * (*width as usize) * (*height as usize);
                if val.len() != expected {
                    return Err(OpenLabelError::shape(format!(
                        "mat {width}x{height}x{channels} needs {expected} values, got {}",
                        val.len()
                    )));
                }
                finite("mat", val)
            }
            Self::Point2d { val, .. } => finite("point2d", val),
            Self::Point3d { val, .. } => finite("point3d", val),
            Self::Mesh(mesh) => mesh.validate(),
            Self::LineReference { val, .. } => {
                if val.len() != 2 {
                    return Err(OpenLabelError::shape(format!(
                        "line_reference takes 2 values, got {}",
                        val.len()
                    )));
                }
                finite("line_reference", val)
            }
            Self::AreaReference { val, .. } => finite("area_reference", val),
        }
    }
}

// ── Element data ───────────────────────────────────────────────

/// A named, typed payload attached to an element or a tag.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementData {
    pub name: String,
    pub coordinate_system: Option<String>,
    pub value: DataValue,
    pub attributes: ElementDataSet,
    /// Caller-defined keys preserved from the wire form.
    pub extra: JsonMap,
}

impl ElementData {
    /// Create a payload, validating the value shape.
    pub fn new(name: impl Into<String>, value: DataValue) -> Result<Self> {
        value.validate()?;
        Ok(Self::unchecked(name.into(), value))
    }

    fn unchecked(name: String, value: DataValue) -> Self {
        Self {
            name,
            coordinate_system: None,
            value,
            attributes: ElementDataSet::new(),
            extra: JsonMap::new(),
        }
    }

    pub fn bbox(name: impl Into<String>, val: [f64; 4]) -> Result<Self> {
        Self::new(name, DataValue::Bbox(val))
    }

    pub fn rbbox(name: impl Into<String>, val: [f64; 5]) -> Result<Self> {
        Self::new(name, DataValue::Rbbox(val))
    }

    pub fn num(name: impl Into<String>, val: f64) -> Result<Self> {
        Self::new(name, DataValue::Num(val))
    }

    pub fn text(name: impl Into<String>, val: impl Into<String>) -> Self {
        Self::unchecked(name.into(), DataValue::Text(val.into()))
    }

    pub fn boolean(name: impl Into<String>, val: bool) -> Self {
        Self::unchecked(name.into(), DataValue::Boolean(val))
    }

    pub fn vec(name: impl Into<String>, val: Vec<f64>) -> Result<Self> {
        Self::new(name, DataValue::Vec(VecValues::Numbers(val)))
    }

    pub fn vec_strings(name: impl Into<String>, val: Vec<String>) -> Self {
        Self::unchecked(name.into(), DataValue::Vec(VecValues::Strings(val)))
    }

    /// Absolute-mode polyline `[x0, y0, x1, y1, ...]`.
    pub fn poly2d(name: impl Into<String>, val: Vec<f64>, closed: bool) -> Result<Self> {
        Self::new(
            name,
            DataValue::Poly2d {
                val: VecValues::Numbers(val),
                mode: Poly2dMode::Absolute,
                closed,
                hierarchy: None,
            },
        )
    }

    /// Chain-coded polyline built from flat `[x0, y0, x1, y1, ...]`
    /// coordinates. [`Poly2dMode::Absolute`] stores the coordinates as given.
    pub fn poly2d_with_mode(
        name: impl Into<String>,
        points: Vec<f64>,
        mode: Poly2dMode,
        closed: bool,
    ) -> Result<Self> {
        let val = match mode {
            Poly2dMode::Absolute => VecValues::Numbers(points),
            _ => VecValues::Strings(chain_code::encode(&points, mode)?),
        };
        Self::new(
            name,
            DataValue::Poly2d {
                val,
                mode,
                closed,
                hierarchy: None,
            },
        )
    }

    pub fn poly3d(name: impl Into<String>, val: Vec<f64>, closed: bool) -> Result<Self> {
        Self::new(name, DataValue::Poly3d { val, closed })
    }

    pub fn cuboid(name: impl Into<String>, val: &[f64]) -> Result<Self> {
        Self::new(name, DataValue::Cuboid(val.to_vec()))
    }

    pub fn image(
        name: impl Into<String>,
        val: impl Into<String>,
        mime_type: impl Into<String>,
        encoding: impl Into<String>,
    ) -> Self {
        Self::unchecked(
            name.into(),
            DataValue::Image {
                val: val.into(),
                mime_type: mime_type.into(),
                encoding: encoding.into(),
            },
        )
    }

    pub fn mat(
        name: impl Into<String>,
        val: Vec<f64>,
        channels: u32,
        width: u32,
        height: u32,
        data_type: impl Into<String>,
    ) -> Result<Self> {
        Self::new(
            name,
            DataValue::Mat {
                val,
                channels,
                width,
                height,
                data_type: data_type.into(),
            },
        )
    }

    pub fn binary(
        name: impl Into<String>,
        val: impl Into<String>,
        data_type: impl Into<String>,
        encoding: impl Into<String>,
    ) -> Self {
        Self::unchecked(
            name.into(),
            DataValue::Binary {
                val: val.into(),
                data_type: data_type.into(),
                encoding: encoding.into(),
            },
        )
    }

    pub fn point2d(name: impl Into<String>, val: [f64; 2]) -> Result<Self> {
        Self::new(name, DataValue::Point2d { val, id: None })
    }

    pub fn point3d(name: impl Into<String>, val: [f64; 3]) -> Result<Self> {
        Self::new(name, DataValue::Point3d { val, id: None })
    }

    pub fn mesh(name: impl Into<String>, mesh: Mesh) -> Result<Self> {
        Self::new(name, DataValue::Mesh(mesh))
    }

    pub fn line_reference(
        name: impl Into<String>,
        val: [f64; 2],
        reference_type: impl Into<String>,
    ) -> Result<Self> {
        Self::new(
            name,
            DataValue::LineReference {
                val: val.to_vec(),
                reference_type: reference_type.into(),
            },
        )
    }

    pub fn area_reference(
        name: impl Into<String>,
        val: Vec<f64>,
        reference_type: impl Into<String>,
    ) -> Result<Self> {
        Self::new(
            name,
            DataValue::AreaReference {
                val,
                reference_type: reference_type.into(),
            },
        )
    }

    pub fn data_type(&self) -> DataType {
        self.value.data_type()
    }

    /// Flat `[x0, y0, x1, y1, ...]` coordinates of a `poly2d`, decoding
    /// chain-coded modes.
    pub fn poly2d_points(&self) -> Result<Vec<f64>> {
        match &self.value {
            DataValue::Poly2d {
                val: VecValues::Numbers(points),
                mode: Poly2dMode::Absolute,
                ..
            } => Ok(points.clone()),
            DataValue::Poly2d {
                val: VecValues::Strings(code),
                mode,
                ..
            } => chain_code::decode(code, *mode),
            DataValue::Poly2d { .. } => Err(OpenLabelError::shape(format!(
                "poly2d `{}` does not match its mode",
                self.name
            ))),
            other => Err(OpenLabelError::shape(format!(
                "`{}` is {}, not poly2d",
                self.name,
                other.data_type()
            ))),
        }
    }

    /// Builder-style coordinate system.
    pub fn with_coordinate_system(mut self, cs: impl Into<String>) -> Self {
        self.coordinate_system = Some(cs.into());
        self
    }

    /// Builder-style attribute.
    pub fn with_attribute(mut self, attr: ElementData) -> Result<Self> {
        self.add_attribute(attr)?;
        Ok(self)
    }

    /// Attach (or replace by name) an attribute.
    pub fn add_attribute(&mut self, attr: ElementData) -> Result<()> {
        if !attr.data_type().is_generic() {
            return Err(OpenLabelError::shape(format!(
                "attribute `{}` has type {}; only num, text, boolean and vec are allowed",
                attr.name,
                attr.data_type()
            )));
        }
        if !attr.attributes.is_empty() {
            return Err(OpenLabelError::shape(format!(
                "attribute `{}` cannot carry attributes of its own",
                attr.name
            )));
        }
        self.attributes.insert(attr);
        Ok(())
    }

    pub fn attribute(&self, name: &str) -> Option<&ElementData> {
        self.attributes.get(name)
    }

    // ── Wire form ──

    /// Canonical JSON object for this payload (without its bucket key).
    pub fn to_value(&self) -> Value {
        let mut map = JsonMap::new();
        map.insert("name".into(), Value::from(self.name.clone()));
        if let Some(cs) = &self.coordinate_system {
            map.insert("coordinate_system".into(), Value::from(cs.clone()));
        }
        self.write_payload(&mut map);
        if !self.attributes.is_empty() {
            map.insert("attributes".into(), self.attributes.to_value());
        }
        for (k, v) in &self.extra {
            map.entry(k.clone()).or_insert_with(|| v.clone());
        }
        Value::Object(map)
    }

    fn write_payload(&self, map: &mut JsonMap) {
        let mut put = |k: &str, v: Value| {
            map.insert(k.to_string(), v);
        };
        match &self.value {
            DataValue::Bbox(v) => put("val", wire::numbers(v)),
            DataValue::Rbbox(v) => put("val", wire::numbers(v)),
            DataValue::Num(x) => put("val", wire::number(*x)),
            DataValue::Text(s) => put("val", Value::from(s.clone())),
            DataValue::Boolean(b) => put("val", Value::from(*b)),
            DataValue::Vec(v) => put("val", vec_values(v)),
            DataValue::Poly2d {
                val,
                mode,
                closed,
                hierarchy,
            } => {
                put("val", vec_values(val));
                put("mode", Value::from(mode.as_str()));
                put("closed", Value::from(*closed));
                if let Some(h) = hierarchy {
                    put("hierarchy", Value::from(h.clone()));
                }
            }
            DataValue::Poly3d { val, closed } => {
                put("val", wire::numbers(val));
                put("closed", Value::from(*closed));
            }
            DataValue::Cuboid(v) => put("val", wire::numbers(v)),
            DataValue::Image {
                val,
                mime_type,
                encoding,
            } => {
                put("val", Value::from(val.clone()));
                put("mime_type", Value::from(mime_type.clone()));
                put("encoding", Value::from(encoding.clone()));
            }
            DataValue::Mat {
                val,
                channels,
                width,
                height,
                data_type,
            } => {
                put("val", wire::numbers(val));
                put("channels", Value::from(*channels));
                put("width", Value::from(*width));
                put("height", Value::from(*height));
                put("data_type", Value::from(data_type.clone()));
            }
            DataValue::Binary {
                val,
                data_type,
                encoding,
            } => {
                put("val", Value::from(val.clone()));
                put("data_type", Value::from(data_type.clone()));
                put("encoding", Value::from(encoding.clone()));
            }
            DataValue::Point2d { val, id } => {
                put("val", wire::numbers(val));
                if let Some(id) = id {
                    put("id", Value::from(*id));
                }
            }
            DataValue::Point3d { val, id } => {
                put("val", wire::numbers(val));
                if let Some(id) = id {
                    put("id", Value::from(*id));
                }
            }
            DataValue::Mesh(mesh) => {
                for (k, v) in mesh.wire_entries() {
                    put(k, v);
                }
            }
            DataValue::LineReference {
                val,
                reference_type,
            }
            | DataValue::AreaReference {
                val,
                reference_type,
            } => {
                put("val", wire::numbers(val));
                put("reference_type", Value::from(reference_type.clone()));
            }
        }
    }

    /// Parse a payload of a known type from its wire object.
    pub fn from_value(data_type: DataType, value: &Value, path: &str) -> Result<Self> {
        let map = wire::as_object(value, path)?;
        let name = wire::req_str(map, "name", path)?;
        let coordinate_system = wire::opt_str(map, "coordinate_system", path)?;
        let payload = read_payload(data_type, map, path)?;
        payload.validate().map_err(|e| match e {
            OpenLabelError::InvalidValueShape(msg) => {
                OpenLabelError::InvalidValueShape(format!("{path}: {msg}"))
            }
            other => other,
        })?;

        let attributes = match map.get("attributes") {
            Some(v) => {
                let attrs = ElementDataSet::from_value(v, &wire::join(path, "attributes"))?;
                if let Some(bad) = attrs.iter().find(|a| !a.data_type().is_generic()) {
                    return Err(OpenLabelError::shape(format!(
                        "{path}.attributes: `{}` has non-attribute type {}",
                        bad.name,
                        bad.data_type()
                    )));
                }
                if let Some(bad) = attrs.iter().find(|a| !a.attributes.is_empty()) {
                    return Err(OpenLabelError::shape(format!(
                        "{path}.attributes: `{}` carries nested attributes",
                        bad.name
                    )));
                }
                attrs
            }
            None => ElementDataSet::new(),
        };

        let mut known = vec!["name", "coordinate_system", "attributes"];
        known.extend_from_slice(payload_keys(data_type));

        Ok(Self {
            name,
            coordinate_system,
            value: payload,
            attributes,
            extra: wire::extras(map, &known),
        })
    }
}

fn vec_values(v: &VecValues) -> Value {
    match v {
        VecValues::Numbers(xs) => wire::numbers(xs),
        VecValues::Strings(ss) => Value::from(ss.clone()),
    }
}

fn read_vec_values(map: &JsonMap, path: &str) -> Result<VecValues> {
    let all_strings = map
        .get("val")
        .and_then(Value::as_array)
        .map(|a| !a.is_empty() && a.iter().all(Value::is_string))
        .unwrap_or(false);
    if all_strings {
        wire::req_str_array(map, "val", path).map(VecValues::Strings)
    } else {
        wire::req_f64_array(map, "val", path).map(VecValues::Numbers)
    }
}

fn fixed<const N: usize>(v: Vec<f64>, what: &str, path: &str) -> Result<[f64; N]> {
    let len = v.len();
    v.try_into().map_err(|_| {
        OpenLabelError::shape(format!("{path}: {what} takes {N} values, got {len}"))
    })
}

/// Wire keys owned by each payload type.
pub(crate) fn payload_keys(data_type: DataType) -> &'static [&'static str] {
    match data_type {
        DataType::Bbox
        | DataType::Rbbox
        | DataType::Num
        | DataType::Text
        | DataType::Boolean
        | DataType::Vec
        | DataType::Cuboid => &["val"],
        DataType::Poly2d => &["val", "mode", "closed", "hierarchy"],
        DataType::Poly3d => &["val", "closed"],
        DataType::Image => &["val", "mime_type", "encoding"],
        DataType::Mat => &["val", "channels", "width", "height", "data_type"],
        DataType::Binary => &["val", "data_type", "encoding"],
        DataType::Point2d | DataType::Point3d => &["val", "id"],
        DataType::Mesh => &["point3d", "line_reference", "area_reference"],
        DataType::LineReference | DataType::AreaReference => &["val", "reference_type"],
    }
}

fn read_payload(data_type: DataType, map: &JsonMap, path: &str) -> Result<DataValue> {
    let text_or_default = |key: &str| -> Result<String> {
        Ok(wire::opt_str(map, key, path)?.unwrap_or_default())
    };

    Ok(match data_type {
        DataType::Bbox => DataValue::Bbox(fixed(
            wire::req_f64_array(map, "val", path)?,
            "bbox",
            path,
        )?),
        DataType::Rbbox => DataValue::Rbbox(fixed(
            wire::req_f64_array(map, "val", path)?,
            "rbbox",
            path,
        )?),
        DataType::Num => DataValue::Num(wire::req_f64(map, "val", path)?),
        DataType::Text => DataValue::Text(text_or_default("val")?),
        DataType::Boolean => DataValue::Boolean(wire::opt_bool(map, "val", path)?.unwrap_or(false)),
        DataType::Vec => match map.get("val") {
            None => DataValue::Vec(VecValues::Numbers(Vec::new())),
            Some(_) => DataValue::Vec(read_vec_values(map, path)?),
        },
        DataType::Poly2d => {
            let mode = match wire::opt_str(map, "mode", path)? {
                Some(m) => Poly2dMode::parse(&m).ok_or_else(|| {
                    OpenLabelError::shape(format!("{path}.mode: unknown poly2d mode `{m}`"))
                })?,
                None => Poly2dMode::Absolute,
            };
            let hierarchy = match map.get("hierarchy") {
                None | Some(Value::Null) => None,
                Some(v) => Some(
                    v.as_array()
                        .and_then(|a| a.iter().map(Value::as_i64).collect::<Option<Vec<_>>>())
                        .ok_or_else(|| {
                            OpenLabelError::parse(format!(
                                "{path}.hierarchy: expected an array of integers"
                            ))
                        })?,
                ),
            };
            let val = match (map.get("val"), mode) {
                (Some(_), _) => read_vec_values(map, path)?,
                (None, Poly2dMode::Absolute) => VecValues::Numbers(Vec::new()),
                (None, _) => VecValues::Strings(Vec::new()),
            };
            DataValue::Poly2d {
                val,
                mode,
                closed: wire::opt_bool(map, "closed", path)?.unwrap_or(false),
                hierarchy,
            }
        }
        DataType::Poly3d => DataValue::Poly3d {
            val: wire::opt_f64_array(map, "val", path)?.unwrap_or_default(),
            closed: wire::opt_bool(map, "closed", path)?.unwrap_or(false),
        },
        DataType::Cuboid => DataValue::Cuboid(wire::req_f64_array(map, "val", path)?),
        DataType::Image => DataValue::Image {
            val: text_or_default("val")?,
            mime_type: text_or_default("mime_type")?,
            encoding: text_or_default("encoding")?,
        },
        DataType::Mat => {
            let dim = |key: &str| -> Result<u32> {
                let n = wire::opt_u64(map, key, path)?.unwrap_or(0);
                u32::try_from(n)
                    .map_err(|_| OpenLabelError::shape(format!("{path}.{key}: {n} is too large")))
            };
            DataValue::Mat {
                val: wire::opt_f64_array(map, "val", path)?.unwrap_or_default(),
                channels: dim("channels")?,
                width: dim("width")?,
                height: dim("height")?,
                data_type: text_or_default("data_type")?,
            }
        }
        DataType::Binary => DataValue::Binary {
            val: text_or_default("val")?,
            data_type: text_or_default("data_type")?,
            encoding: text_or_default("encoding")?,
        },
        DataType::Point2d => DataValue::Point2d {
            val: fixed(wire::req_f64_array(map, "val", path)?, "point2d", path)?,
            id: wire::opt_i64(map, "id", path)?,
        },
        DataType::Point3d => DataValue::Point3d {
            val: fixed(wire::req_f64_array(map, "val", path)?, "point3d", path)?,
            id: wire::opt_i64(map, "id", path)?,
        },
        DataType::Mesh => DataValue::Mesh(Mesh::read_from(map, path)?),
        DataType::LineReference => DataValue::LineReference {
            val: wire::req_f64_array(map, "val", path)?,
            reference_type: text_or_default("reference_type")?,
        },
        DataType::AreaReference => DataValue::AreaReference {
            val: wire::opt_f64_array(map, "val", path)?.unwrap_or_default(),
            reference_type: text_or_default("reference_type")?,
        },
    })
}

// ── Data sets ──────────────────────────────────────────────────

/// Name-unique collection of payloads grouped by type.
///
/// Inserting a payload replaces any existing payload with the same name,
/// even one of a different type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementDataSet {
    buckets: BTreeMap<DataType, Vec<ElementData>>,
}

impl ElementDataSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.values().all(Vec::is_empty)
    }

    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Insert or replace by name. Returns the replaced payload, if any.
    pub fn insert(&mut self, data: ElementData) -> Option<ElementData> {
        let dtype = data.data_type();
        if let Some(bucket) = self.buckets.get_mut(&dtype) {
            if let Some(slot) = bucket.iter_mut().find(|d| d.name == data.name) {
                return Some(std::mem::replace(slot, data));
            }
        }
        let previous = self.remove(&data.name);
        self.buckets.entry(dtype).or_default().push(data);
        previous
    }

    pub fn remove(&mut self, name: &str) -> Option<ElementData> {
        let mut removed = None;
        for bucket in self.buckets.values_mut() {
            if let Some(pos) = bucket.iter().position(|d| d.name == name) {
                removed = Some(bucket.remove(pos));
                break;
            }
        }
        self.buckets.retain(|_, b| !b.is_empty());
        removed
    }

    pub fn get(&self, name: &str) -> Option<&ElementData> {
        self.iter().find(|d| d.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Payloads of one type, in insertion order.
    pub fn of_type(&self, data_type: DataType) -> &[ElementData] {
        self.buckets
            .get(&data_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ElementData> {
        self.buckets.values().flatten()
    }

    pub fn types(&self) -> impl Iterator<Item = DataType> + '_ {
        self.buckets.keys().copied()
    }

    /// Merge `other` into `self`; entries of `other` win on name collision.
    pub fn merge(&mut self, other: &ElementDataSet) {
        for data in other.iter() {
            self.insert(data.clone());
        }
    }

    /// Wire form: `{bucket: [payload, ...]}`.
    pub fn to_value(&self) -> Value {
        let map: JsonMap = self
            .buckets
            .iter()
            .filter(|(_, b)| !b.is_empty())
            .map(|(t, b)| {
                (
                    t.as_str().to_string(),
                    Value::Array(b.iter().map(ElementData::to_value).collect()),
                )
            })
            .collect();
        Value::Object(map)
    }

    pub fn from_value(value: &Value, path: &str) -> Result<Self> {
        let map = wire::as_object(value, path)?;
        let mut set = Self::new();
        for (key, entries) in map {
            let bucket_path = wire::join(path, key);
            let dtype = DataType::from_key(key).ok_or_else(|| {
                OpenLabelError::parse(format!("{bucket_path}: unknown data type"))
            })?;
            let arr = entries.as_array().ok_or_else(|| {
                OpenLabelError::parse(format!("{bucket_path}: expected an array"))
            })?;
            for (i, entry) in arr.iter().enumerate() {
                set.insert(ElementData::from_value(
                    dtype,
                    entry,
                    &wire::join(&bucket_path, i),
                )?);
            }
        }
        Ok(set)
    }
}

impl Serialize for ElementDataSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ElementDataSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value, "").map_err(serde::de::Error::custom)
    }
}

impl FromIterator<ElementData> for ElementDataSet {
    fn from_iter<I: IntoIterator<Item = ElementData>>(iter: I) -> Self {
        let mut set = Self::new();
        for d in iter {
            set.insert(d);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cuboid_arity() {
        assert!(ElementData::cuboid("box", &[0.0; 9]).is_ok());
        assert!(ElementData::cuboid("box", &[0.0; 10]).is_ok());
        let err = ElementData::cuboid("box", &[0.0; 8]).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidValueShape);
    }

    #[test]
    fn test_poly_and_mat_shapes() {
        assert!(ElementData::poly2d("p", vec![0.0, 1.0, 2.0], true).is_err());
        assert!(ElementData::poly3d("p", vec![0.0; 6], false).is_ok());
        assert!(ElementData::mat("m", vec![1.0; 6], 1, 3, 2, "float").is_ok());
        assert!(ElementData::mat("m", vec![1.0; 5], 1, 3, 2, "float").is_err());
        assert!(ElementData::num("n", f64::NAN).is_err());
    }

    #[test]
    fn test_attributes_one_level_only() {
        let mut bbox = ElementData::bbox("shape", [0.0, 0.0, 10.0, 5.0]).unwrap();
        bbox.add_attribute(ElementData::boolean("occluded", true)).unwrap();
        assert!(bbox.attribute("occluded").is_some());

        let nested = ElementData::text("a", "x")
            .with_attribute(ElementData::num("b", 1.0).unwrap())
            .unwrap();
        assert!(bbox.add_attribute(nested).is_err());

        let point = ElementData::point2d("pt", [1.0, 2.0]).unwrap();
        assert!(bbox.add_attribute(point).is_err());
    }

    #[test]
    fn test_insert_replaces_same_name_across_types() {
        let mut set = ElementDataSet::new();
        set.insert(ElementData::num("speed", 3.0).unwrap());
        set.insert(ElementData::text("speed", "fast"));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("speed").unwrap().data_type(), DataType::Text);
        assert!(set.of_type(DataType::Num).is_empty());
    }

    #[test]
    fn test_wire_form() {
        let data = ElementData::bbox("shape", [10.0, 10.0, 4.0, 2.0])
            .unwrap()
            .with_coordinate_system("camera1");
        let set: ElementDataSet = std::iter::once(data).collect();
        assert_eq!(
            set.to_value(),
            json!({"bbox": [{"name": "shape", "coordinate_system": "camera1", "val": [10, 10, 4, 2]}]})
        );
    }

    #[test]
    fn test_parse_keeps_extra_keys() {
        let v = json!({"name": "n", "val": 1.5, "confidence": 0.9});
        let d = ElementData::from_value(DataType::Num, &v, "num.0").unwrap();
        assert_eq!(d.value, DataValue::Num(1.5));
        assert_eq!(d.extra.get("confidence"), Some(&json!(0.9)));
        assert_eq!(d.to_value(), v);
    }

    #[test]
    fn test_parse_rejects_bad_arity() {
        let v = json!({"name": "b", "val": [1, 2, 3]});
        let err = ElementData::from_value(DataType::Bbox, &v, "bbox.0").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidValueShape);
    }

    #[test]
    fn test_text_without_val_defaults_empty() {
        let v = json!({"name": "label"});
        let d = ElementData::from_value(DataType::Text, &v, "text.0").unwrap();
        assert_eq!(d.value, DataValue::Text(String::new()));
    }

    #[test]
    fn test_polys_without_val_default_empty() {
        let v = json!({"name": "edge", "closed": true});
        let d = ElementData::from_value(DataType::Poly3d, &v, "poly3d.0").unwrap();
        assert_eq!(d, ElementData::poly3d("edge", vec![], true).unwrap());

        let d = ElementData::from_value(DataType::Poly2d, &json!({"name": "p"}), "poly2d.0").unwrap();
        assert_eq!(d.poly2d_points().unwrap(), Vec::<f64>::new());
    }

    #[test]
    fn test_chain_coded_poly2d() {
        let outline = vec![2.0, 2.0, 2.0, 30.0, 12.0, 40.0, 12.0, 2.0];
        let d = ElementData::poly2d_with_mode("contour", outline.clone(), Poly2dMode::Srf6dcc, true)
            .unwrap();
        let value = d.to_value();
        assert_eq!(value["mode"], json!("MODE_POLY2D_SRF6DCC"));
        assert!(value["val"].as_array().unwrap().iter().all(|s| s.is_string()));

        let back = ElementData::from_value(DataType::Poly2d, &value, "poly2d.0").unwrap();
        assert_eq!(back.poly2d_points().unwrap(), outline);

        let plain = ElementData::poly2d_with_mode("p", vec![0.5, 1.5], Poly2dMode::Absolute, false)
            .unwrap();
        assert_eq!(plain.poly2d_points().unwrap(), vec![0.5, 1.5]);
        assert!(ElementData::num("n", 1.0).unwrap().poly2d_points().is_err());
    }

    #[test]
    fn test_garbled_chain_code_rejected() {
        let value = DataValue::Poly2d {
            val: VecValues::Strings(vec!["0".into(), "0".into(), "0".into(), "!!".into()]),
            mode: Poly2dMode::Srf6dcc,
            closed: false,
            hierarchy: None,
        };
        let err = ElementData::new("p", value).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidValueShape);
    }
}
