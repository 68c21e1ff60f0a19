//! OpenLABEL Model - Annotation document object model
//!
//! Implements the time-indexed scene annotation document:
//! - Objects, actions, events and contexts with static and per-frame data
//! - Relations between elements as RDF subject/object lists
//! - Frame registry, streams, coordinate systems and transforms
//! - JSON serialization with legacy `vcd` migration and schema validation
//! - A compact, lossy binary transcoding of the same tree

pub mod binary;
pub mod config;
pub mod coordinate_system;
pub mod document;
pub mod element;
pub mod frame;
pub mod ontology;
pub mod pointer;
pub mod relation;
pub mod schema;
pub mod serialization;

pub use config::{DocumentConfig, SerializeOptions};
pub use coordinate_system::CoordinateSystem;
pub use document::{Document, Removal, UidMode};
pub use element::{Element, ElementKind, NewElement, ResourceUid};
pub use frame::{Frame, FrameElement, FrameProperties, FrameStream, Odometry, Timestamp};
pub use ontology::{BoundaryMode, Metadata, Ontology, Tag};
pub use pointer::{DataPointers, ElementDataPointer};
pub use relation::{NewRelation, RdfAgent, RdfRole, Relation};
pub use schema::{SchemaValidator, ValidatorConfig};
