//! OpenLABEL Core - Value types for annotation documents
//!
//! This crate provides the leaf types used throughout the OpenLABEL crates:
//! - UIDs (sequential integers or UUIDs)
//! - Frame interval algebra (FrameInterval, FrameIntervals)
//! - Typed element-data payloads (bbox, cuboid, poly2d, mesh, ...)
//! - Chain-code compression of poly2d outlines
//! - Coordinate transforms and sensor stream descriptions

pub mod chain_code;
pub mod data;
pub mod error;
pub mod frame_interval;
pub mod mesh;
pub mod stream;
pub mod transform;
pub mod uid;
pub mod wire;

pub use data::{DataType, DataValue, ElementData, ElementDataSet, Poly2dMode, VecValues};
pub use error::{ErrorKind, OpenLabelError, Result};
pub use frame_interval::{FrameInterval, FrameIntervals};
pub use mesh::Mesh;
pub use stream::{Fisheye, Intrinsics, Pinhole, Stream, StreamProperties, StreamSync, StreamType};
pub use transform::{Transform, TransformData};
pub use uid::Uid;

/// OpenLABEL schema version written by this library.
pub const SCHEMA_VERSION: &str = "1.0.0";
