//! Ontologies, tags and document metadata.

use openlabel_core::{ElementData, ElementDataSet, Uid, SCHEMA_VERSION};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::element::ResourceUid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryMode {
    Include,
    Exclude,
}

/// External vocabulary referenced by element types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Ontology {
    Uri(String),
    Bounded {
        uri: String,
        #[serde(default)]
        boundary_list: Vec<String>,
        boundary_mode: BoundaryMode,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
}

impl Ontology {
    pub fn uri(&self) -> &str {
        match self {
            Self::Uri(uri) | Self::Bounded { uri, .. } => uri,
        }
    }

    /// Whether a type term falls inside the ontology's boundary.
    pub fn admits(&self, term: &str) -> bool {
        match self {
            Self::Uri(_) => true,
            Self::Bounded {
                boundary_list,
                boundary_mode,
                ..
            } => {
                let listed = boundary_list.iter().any(|t| t == term);
                match boundary_mode {
                    BoundaryMode::Include => listed,
                    BoundaryMode::Exclude => !listed,
                }
            }
        }
    }
}

/// A document-level tag, e.g. scenario conditions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Tag {
    #[serde(rename = "type", default)]
    pub tag_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ontology_uid: Option<Uid>,
    #[serde(default, skip_serializing_if = "ResourceUid::is_empty")]
    pub resource_uid: ResourceUid,
    #[serde(default, skip_serializing_if = "ElementDataSet::is_empty")]
    pub tag_data: ElementDataSet,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Tag {
    pub fn new(tag_type: impl Into<String>) -> Self {
        Self {
            tag_type: tag_type.into(),
            ..Self::default()
        }
    }

    pub fn with_ontology(mut self, ontology_uid: impl Into<Uid>) -> Self {
        self.ontology_uid = Some(ontology_uid.into());
        self
    }

    pub fn with_data(mut self, data: ElementData) -> Self {
        self.tag_data.insert(data);
        self
    }
}

/// Document metadata. Unknown keys land in `properties`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub schema_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            file_version: None,
            name: None,
            annotator: None,
            comment: None,
            properties: Map::new(),
        }
    }
}
