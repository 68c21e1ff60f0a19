//! Rigid transforms between coordinate systems.

use glam::{DMat4, DQuat, DVec3, EulerRot};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{OpenLabelError, Result};

/// Transform payload. Matrices are row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransformData {
    Matrix {
        matrix4x4: [f64; 16],
    },
    /// Quaternion `[x, y, z, w]` plus translation.
    Quaternion {
        quaternion: [f64; 4],
        translation: [f64; 3],
    },
    /// Euler angles in the order given by `sequence` (default `ZYX`).
    Euler {
        euler_angles: [f64; 3],
        translation: [f64; 3],
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sequence: Option<String>,
    },
}

impl TransformData {
    pub const IDENTITY: Self = Self::Matrix {
        matrix4x4: [
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ],
    };

    pub fn matrix(rows: [f64; 16]) -> Self {
        Self::Matrix { matrix4x4: rows }
    }

    pub fn quaternion(quaternion: [f64; 4], translation: [f64; 3]) -> Self {
        Self::Quaternion {
            quaternion,
            translation,
        }
    }

    pub fn euler(euler_angles: [f64; 3], translation: [f64; 3]) -> Self {
        Self::Euler {
            euler_angles,
            translation,
            sequence: None,
        }
    }

    /// Check numeric sanity and that the Euler sequence is known.
    pub fn validate(&self) -> Result<()> {
        let values: Vec<f64> = match self {
            Self::Matrix { matrix4x4 } => matrix4x4.to_vec(),
            Self::Quaternion {
                quaternion,
                translation,
            } => {
                let norm = quaternion.iter().map(|q| q * q).sum::<f64>();
                if norm == 0.0 {
                    return Err(OpenLabelError::shape("zero-length quaternion"));
                }
                quaternion.iter().chain(translation).copied().collect()
            }
            Self::Euler {
                euler_angles,
                translation,
                sequence,
            } => {
                euler_rot(sequence.as_deref())?;
                euler_angles.iter().chain(translation).copied().collect()
            }
        };
        if values.iter().any(|v| !v.is_finite()) {
            return Err(OpenLabelError::shape("transform contains a non-finite number"));
        }
        Ok(())
    }

    /// Row-major homogeneous 4x4 matrix.
    pub fn to_matrix4x4(&self) -> Result<[f64; 16]> {
        self.validate()?;
        let m = match self {
            Self::Matrix { matrix4x4 } => return Ok(*matrix4x4),
            Self::Quaternion {
                quaternion: [x, y, z, w],
                translation,
            } => DMat4::from_rotation_translation(
                DQuat::from_xyzw(*x, *y, *z, *w).normalize(),
                DVec3::from_array(*translation),
            ),
            Self::Euler {
                euler_angles: [a, b, c],
                translation,
                sequence,
            } => DMat4::from_rotation_translation(
                DQuat::from_euler(euler_rot(sequence.as_deref())?, *a, *b, *c),
                DVec3::from_array(*translation),
            ),
        };
        Ok(m.transpose().to_cols_array())
    }
}

fn euler_rot(sequence: Option<&str>) -> Result<EulerRot> {
    match sequence.unwrap_or("ZYX") {
        "ZYX" => Ok(EulerRot::ZYX),
        "ZXY" => Ok(EulerRot::ZXY),
        "YXZ" => Ok(EulerRot::YXZ),
        "YZX" => Ok(EulerRot::YZX),
        "XYZ" => Ok(EulerRot::XYZ),
        "XZY" => Ok(EulerRot::XZY),
        other => Err(OpenLabelError::shape(format!(
            "unsupported euler sequence `{other}`"
        ))),
    }
}

/// Per-frame (or static) transform from `src` to `dst`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub src: String,
    pub dst: String,
    pub transform_src_to_dst: TransformData,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Transform {
    pub fn new(src: impl Into<String>, dst: impl Into<String>, data: TransformData) -> Self {
        Self {
            src: src.into(),
            dst: dst.into(),
            transform_src_to_dst: data,
            extra: Map::new(),
        }
    }

    /// Key under which the transform is stored in frame properties.
    pub fn key(&self) -> String {
        format!("{}_to_{}", self.src, self.dst)
    }
}
