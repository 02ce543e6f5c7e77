//! Physics backend capability interface
//!
//! The engine has been run against more than one native rigid-body engine;
//! [`PhysicsBackend`] is the seam that keeps them interchangeable. It
//! exposes exactly the body lifecycle, stepping, and per-body accessor
//! operations the simulation layer needs, and no backend-specific type
//! crosses this boundary: bodies are addressed through generational
//! [`BodyHandle`] keys owned by the backend.

pub mod rapier;

use crate::foundation::math::{Quat, Vec3};
use crate::physics::error::PhysicsError;
use crate::physics::layers::CollisionLayer;
use crate::physics::shape::ShapeDescriptor;

pub use rapier::RapierBackend;

slotmap::new_key_type! {
    /// Generational handle addressing a physics body
    ///
    /// Stale handles (used after `remove_body`) fail lookups instead of
    /// aliasing a different body.
    pub struct BodyHandle;
}

/// Motion class of a physics body
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BodyType {
    /// Never moves, never receives velocity
    Static,
    /// Fully simulated by the solver
    Dynamic,
    /// Moved by the scene, pushes dynamic bodies
    Kinematic,
}

/// World-space position and orientation of a body
///
/// Scale is deliberately absent: it is baked into the shape at creation
/// time and never synchronized afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyPose {
    /// World-space translation
    pub position: Vec3,
    /// World-space rotation
    pub rotation: Quat,
}

impl BodyPose {
    /// Identity pose at the origin
    pub fn identity() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
        }
    }

    /// Pose from a translation only
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::identity(),
        }
    }
}

/// Result of a backend raycast
#[derive(Debug, Clone, Copy)]
pub struct RayHit {
    /// The body that was hit
    pub body: BodyHandle,
    /// World-space hit position
    pub position: Vec3,
    /// World-space surface normal at the hit
    pub normal: Vec3,
    /// Distance along the ray, in units of the ray direction's length
    pub distance: f32,
}

/// Capability interface implemented by each concrete rigid-body engine
///
/// All mutation goes through `&mut self`: the simulation layer guarantees
/// that stepping never overlaps body creation/removal by funneling both
/// through one owner. Accessors taking a handle return `None` once the
/// body has been removed.
pub trait PhysicsBackend: Send {
    /// Create a static body (zero mass) at the given pose
    fn add_static_body(
        &mut self,
        shape: &ShapeDescriptor,
        pose: BodyPose,
        layer: CollisionLayer,
    ) -> Result<BodyHandle, PhysicsError>;

    /// Create a dynamic body; `mass` has already been validated as positive
    fn add_dynamic_body(
        &mut self,
        mass: f32,
        shape: &ShapeDescriptor,
        pose: BodyPose,
        layer: CollisionLayer,
    ) -> Result<BodyHandle, PhysicsError>;

    /// Remove a body; idempotent no-op on stale handles
    fn remove_body(&mut self, handle: BodyHandle);

    /// Advance the world by exactly one fixed timestep
    fn step(&mut self, dt: f32);

    /// Whether the handle still addresses a live body
    fn contains(&self, handle: BodyHandle) -> bool;

    /// Number of live bodies
    fn body_count(&self) -> usize;

    /// Motion class of a body
    fn body_type(&self, handle: BodyHandle) -> Option<BodyType>;

    /// World transform of a body, interpolated where the backend supports
    /// sub-step interpolation; otherwise the last solver pose
    fn pose(&self, handle: BodyHandle) -> Option<BodyPose>;

    /// Overwrite the body's world transform (teleport semantics: velocities
    /// are preserved)
    fn set_pose(&mut self, handle: BodyHandle, pose: BodyPose);

    /// Linear velocity of a body
    fn linear_velocity(&self, handle: BodyHandle) -> Option<Vec3>;

    /// Set the linear velocity of a body
    fn set_linear_velocity(&mut self, handle: BodyHandle, velocity: Vec3);

    /// Angular velocity of a body
    fn angular_velocity(&self, handle: BodyHandle) -> Option<Vec3>;

    /// Set the angular velocity of a body
    fn set_angular_velocity(&mut self, handle: BodyHandle, velocity: Vec3);

    /// Friction coefficient of a body's shape
    fn friction(&self, handle: BodyHandle) -> Option<f32>;

    /// Set the friction coefficient of a body's shape
    fn set_friction(&mut self, handle: BodyHandle, friction: f32);

    /// Restitution coefficient of a body's shape
    fn restitution(&self, handle: BodyHandle) -> Option<f32>;

    /// Set the restitution coefficient of a body's shape
    fn set_restitution(&mut self, handle: BodyHandle, restitution: f32);

    /// Per-axis rotational factor: a zero component freezes future angular
    /// acceleration around that axis. Residual spin on a frozen axis decays
    /// at whatever rate the backend's damping implies.
    fn set_angular_factor(&mut self, handle: BodyHandle, factor: Vec3);

    /// Accumulate a force on a dynamic body for the next step
    fn apply_force(&mut self, handle: BodyHandle, force: Vec3);

    /// Accumulate a torque on a dynamic body for the next step
    fn apply_torque(&mut self, handle: BodyHandle, torque: Vec3);

    /// Store an opaque back-reference on the body (non-owning)
    fn set_user_data(&mut self, handle: BodyHandle, data: u64);

    /// Read the opaque back-reference stored on the body
    fn user_data(&self, handle: BodyHandle) -> Option<u64>;

    /// Number of body pairs with at least one active contact after the
    /// most recent step
    fn active_contact_count(&self) -> usize;

    /// Cast a ray and return the closest hit within `max_distance`
    fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<RayHit>;
}
