//! Mesh payloads: vertices, edges and areas keyed by small integer ids.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::data::{DataType, DataValue, ElementData};
use crate::error::{OpenLabelError, Result};
use crate::wire::{self, JsonMap};

/// A mesh built from `point3d` vertices, `line_reference` edges (pairs of
/// vertex ids) and `area_reference` areas (lists of edge ids).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    vertices: BTreeMap<u32, ElementData>,
    edges: BTreeMap<u32, ElementData>,
    areas: BTreeMap<u32, ElementData>,
}

fn next_id(map: &BTreeMap<u32, ElementData>, what: &str) -> Result<u32> {
    match map.keys().next_back() {
        None => Ok(0),
        Some(k) => k
            .checked_add(1)
            .ok_or_else(|| OpenLabelError::shape(format!("no free {what} id after {k}"))),
    }
}

fn expect_type(data: &ElementData, expected: DataType) -> Result<()> {
    if data.data_type() != expected {
        return Err(OpenLabelError::shape(format!(
            "mesh expects {expected} for `{}`, got {}",
            data.name,
            data.data_type()
        )));
    }
    Ok(())
}

fn reference_ids(data: &ElementData) -> &[f64] {
    match &data.value {
        DataValue::LineReference { val, .. } | DataValue::AreaReference { val, .. } => val,
        _ => &[],
    }
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a vertex. With `id = None` the next free id is used; an explicit
    /// id replaces any vertex already stored there.
    pub fn add_vertex(&mut self, point: ElementData, id: Option<u32>) -> Result<u32> {
        expect_type(&point, DataType::Point3d)?;
        let id = match id {
            Some(id) => id,
            None => next_id(&self.vertices, "vertex")?,
        };
        self.vertices.insert(id, point);
        Ok(id)
    }

    /// Add an edge between two existing vertices.
    pub fn add_edge(&mut self, line: ElementData, id: Option<u32>) -> Result<u32> {
        expect_type(&line, DataType::LineReference)?;
        check_refs(&line, &self.vertices, "vertex")?;
        let id = match id {
            Some(id) => id,
            None => next_id(&self.edges, "edge")?,
        };
        self.edges.insert(id, line);
        Ok(id)
    }

    /// Add an area bounded by existing edges.
    pub fn add_area(&mut self, area: ElementData, id: Option<u32>) -> Result<u32> {
        expect_type(&area, DataType::AreaReference)?;
        check_refs(&area, &self.edges, "edge")?;
        let id = match id {
            Some(id) => id,
            None => next_id(&self.areas, "area")?,
        };
        self.areas.insert(id, area);
        Ok(id)
    }

    pub fn vertices(&self) -> &BTreeMap<u32, ElementData> {
        &self.vertices
    }

    pub fn edges(&self) -> &BTreeMap<u32, ElementData> {
        &self.edges
    }

    pub fn areas(&self) -> &BTreeMap<u32, ElementData> {
        &self.areas
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.edges.is_empty() && self.areas.is_empty()
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let groups = [
            (&self.vertices, DataType::Point3d),
            (&self.edges, DataType::LineReference),
            (&self.areas, DataType::AreaReference),
        ];
        for (map, dtype) in groups {
            for data in map.values() {
                expect_type(data, dtype)?;
                data.value.validate()?;
            }
        }
        Ok(())
    }

    pub(crate) fn wire_entries(&self) -> Vec<(&'static str, Value)> {
        let group = |map: &BTreeMap<u32, ElementData>| -> Value {
            Value::Object(
                map.iter()
                    .map(|(id, d)| (id.to_string(), d.to_value()))
                    .collect(),
            )
        };
        let mut out = Vec::with_capacity(3);
        if !self.vertices.is_empty() {
            out.push(("point3d", group(&self.vertices)));
        }
        if !self.edges.is_empty() {
            out.push(("line_reference", group(&self.edges)));
        }
        if !self.areas.is_empty() {
            out.push(("area_reference", group(&self.areas)));
        }
        out
    }

    pub(crate) fn read_from(map: &JsonMap, path: &str) -> Result<Self> {
        let read = |key: &str, dtype: DataType| -> Result<BTreeMap<u32, ElementData>> {
            let mut out = BTreeMap::new();
            let Some(group) = map.get(key) else {
                return Ok(out);
            };
            let group_path = wire::join(path, key);
            for (id, entry) in wire::as_object(group, &group_path)? {
                let entry_path = wire::join(&group_path, id);
                let id: u32 = id.parse().map_err(|_| {
                    OpenLabelError::parse(format!("{entry_path}: mesh ids are small integers"))
                })?;
                out.insert(id, ElementData::from_value(dtype, entry, &entry_path)?);
            }
            Ok(out)
        };

        Ok(Self {
            vertices: read("point3d", DataType::Point3d)?,
            edges: read("line_reference", DataType::LineReference)?,
            areas: read("area_reference", DataType::AreaReference)?,
        })
    }
}

fn check_refs(data: &ElementData, targets: &BTreeMap<u32, ElementData>, what: &str) -> Result<()> {
    for &idx in reference_ids(data) {
        let known = idx >= 0.0 && idx.fract() == 0.0 && targets.contains_key(&(idx as u32));
        if !known {
            return Err(OpenLabelError::shape(format!(
                "`{}` references unknown {what} {idx}",
                data.name
            )));
        }
    }
    Ok(())
}
