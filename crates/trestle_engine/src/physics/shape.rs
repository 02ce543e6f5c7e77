//! Collision shape descriptors
//!
//! Descriptors are the persisted, backend-independent form of a collision
//! shape. The entity scale is baked into the descriptor once at activation
//! time; physics shapes do not support live rescaling afterwards, so later
//! changes to the entity scale are not reflected in the body (documented
//! limitation).

use crate::foundation::math::Vec3;
use serde::{Deserialize, Serialize};

/// Backend-independent collision shape description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShapeDescriptor {
    /// Axis-aligned box given by half extents
    Box {
        /// Half extents along each local axis
        half_extents: Vec3,
    },

    /// Sphere centered on the body origin
    Sphere {
        /// Sphere radius
        radius: f32,
    },

    /// Capsule aligned with the local Y axis
    Capsule {
        /// Half the length of the cylindrical segment
        half_height: f32,
        /// Capsule radius
        radius: f32,
    },
}

impl ShapeDescriptor {
    /// Unit cube helper
    pub fn unit_box() -> Self {
        Self::Box {
            half_extents: Vec3::new(0.5, 0.5, 0.5),
        }
    }

    /// Bake an entity scale into the descriptor
    ///
    /// Rotationally symmetric shapes take the dominant axis so a uniform
    /// scale behaves intuitively and a non-uniform one degrades predictably.
    pub fn scaled(&self, scale: Vec3) -> Self {
        match *self {
            Self::Box { half_extents } => Self::Box {
                half_extents: half_extents.component_mul(&scale),
            },
            Self::Sphere { radius } => Self::Sphere {
                radius: radius * scale.x.max(scale.y).max(scale.z),
            },
            Self::Capsule {
                half_height,
                radius,
            } => Self::Capsule {
                half_height: half_height * scale.y,
                radius: radius * scale.x.max(scale.z),
            },
        }
    }
}
