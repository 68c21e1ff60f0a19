//! Coordinate systems arranged as a parent/child tree.

use std::collections::{BTreeMap, BTreeSet};

use openlabel_core::{OpenLabelError, Result, TransformData};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CoordinateSystem {
    /// e.g. `scene_cs`, `local_cs`, `sensor_cs`, `geo_utm`.
    #[serde(rename = "type")]
    pub cs_type: String,
    /// Empty for a root.
    #[serde(default)]
    pub parent: String,
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pose_wrt_parent: Option<TransformData>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CoordinateSystem {
    pub fn new(cs_type: impl Into<String>) -> Self {
        Self {
            cs_type: cs_type.into(),
            ..Self::default()
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>, pose: TransformData) -> Self {
        self.parent = parent.into();
        self.pose_wrt_parent = Some(pose);
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_empty()
    }
}

/// Check that every parent exists, children lists agree with parents and
/// no node is its own ancestor.
pub fn check_tree(systems: &BTreeMap<String, CoordinateSystem>) -> Result<()> {
    for (name, cs) in systems {
        if !cs.is_root() {
            let parent = systems.get(&cs.parent).ok_or_else(|| {
                OpenLabelError::schema(
                    format!("coordinate_systems.{name}.parent"),
                    format!("unknown parent `{}`", cs.parent),
                )
            })?;
            if !parent.children.contains(name) {
                return Err(OpenLabelError::schema(
                    format!("coordinate_systems.{}.children", cs.parent),
                    format!("missing child `{name}`"),
                ));
            }
        }
        for child in &cs.children {
            match systems.get(child) {
                Some(c) if c.parent == *name => {}
                Some(_) => {
                    return Err(OpenLabelError::schema(
                        format!("coordinate_systems.{child}.parent"),
                        format!("listed as child of `{name}` but has another parent"),
                    ))
                }
                None => {
                    return Err(OpenLabelError::schema(
                        format!("coordinate_systems.{name}.children"),
                        format!("unknown child `{child}`"),
                    ))
                }
            }
        }
    }

    for start in systems.keys() {
        let mut seen = BTreeSet::new();
        let mut current = start.as_str();
        while let Some(cs) = systems.get(current) {
            if !seen.insert(current) {
                return Err(OpenLabelError::schema(
                    format!("coordinate_systems.{start}"),
                    "parent chain forms a cycle",
                ));
            }
            if cs.is_root() {
                break;
            }
            current = cs.parent.as_str();
        }
    }
    Ok(())
}
