//! Rigidbody component binding an entity transform to a physics body
//!
//! The component owns the persisted [`RigidbodySettings`] and, once
//! activated, the handle of the live body. Its lifecycle is a one-way state
//! machine: `Uninitialized -> Active -> Disposed`, with no backward
//! transitions. Accessors work in every state: settings-backed before
//! activation, pass-through to the live body while active.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::ecs::components::TransformComponent;
use crate::ecs::{Component, EntityHooks, EntityId};
use crate::foundation::math::Vec3;
use crate::physics::backend::{BodyHandle, BodyPose, BodyType};
use crate::physics::error::PhysicsError;
use crate::physics::shape::ShapeDescriptor;
use crate::physics::Simulation;

/// Persisted rigidbody description
///
/// Scene data stores settings, never live handles. Mass is the single
/// source of truth for the motion class: `mass == 0` produces a static body
/// regardless of the requested `body_type`. A `Kinematic` request is
/// carried in the data model and simulated as a dynamic body whose pose is
/// driven by the scene each step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RigidbodySettings {
    /// Body mass in kilograms; zero means static
    pub mass: f32,

    /// Collision shape before entity scale is baked in
    pub shape: ShapeDescriptor,

    /// Requested motion class
    pub body_type: BodyType,

    /// Initial linear velocity (dynamic bodies only)
    pub linear_velocity: Vec3,

    /// Initial angular velocity (dynamic bodies only)
    pub angular_velocity: Vec3,

    /// Friction coefficient of the body's surface
    pub friction: f32,

    /// Restitution (bounciness) of the body's surface
    pub restitution: f32,

    /// Freeze rotation around the world X axis
    pub lock_x: bool,

    /// Freeze rotation around the world Y axis
    pub lock_y: bool,

    /// Freeze rotation around the world Z axis
    pub lock_z: bool,
}

impl Default for RigidbodySettings {
    fn default() -> Self {
        Self {
            mass: 1.0,
            shape: ShapeDescriptor::unit_box(),
            body_type: BodyType::Dynamic,
            linear_velocity: Vec3::zeros(),
            angular_velocity: Vec3::zeros(),
            friction: 0.5,
            restitution: 0.0,
            lock_x: false,
            lock_y: false,
            lock_z: false,
        }
    }
}

impl RigidbodySettings {
    /// The motion class the body will actually get
    ///
    /// Mass overrides the requested type: zero mass is always static.
    pub fn effective_body_type(&self) -> BodyType {
        if self.mass <= 0.0 {
            BodyType::Static
        } else {
            self.body_type
        }
    }

    fn angular_factor(&self) -> Vec3 {
        Vec3::new(
            if self.lock_x { 0.0 } else { 1.0 },
            if self.lock_y { 0.0 } else { 1.0 },
            if self.lock_z { 0.0 } else { 1.0 },
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyState {
    Uninitialized,
    Active(BodyHandle),
    Disposed,
}

/// Binds an entity's transform to a physics body across the fixed timestep
#[derive(Debug, Clone)]
pub struct RigidbodyComponent {
    settings: RigidbodySettings,
    state: BodyState,
}

impl RigidbodyComponent {
    /// Create an uninitialized component from settings
    pub fn new(settings: RigidbodySettings) -> Self {
        Self {
            settings,
            state: BodyState::Uninitialized,
        }
    }

    /// The persisted settings
    pub fn settings(&self) -> &RigidbodySettings {
        &self.settings
    }

    /// Handle of the live body, if active
    pub fn handle(&self) -> Option<BodyHandle> {
        match self.state {
            BodyState::Active(handle) => Some(handle),
            _ => None,
        }
    }

    /// Whether the component currently owns a live body
    pub fn is_active(&self) -> bool {
        matches!(self.state, BodyState::Active(_))
    }

    /// Whether the component has been disposed
    pub fn is_disposed(&self) -> bool {
        self.state == BodyState::Disposed
    }

    /// Body mass; static bodies report zero
    pub fn mass(&self) -> f32 {
        match self.settings.effective_body_type() {
            BodyType::Static => 0.0,
            _ => self.settings.mass,
        }
    }

    /// Linear velocity: from the live body while active, settings otherwise
    pub fn linear_velocity(&self, sim: &Simulation) -> Vec3 {
        self.handle()
            .and_then(|h| sim.linear_velocity(h))
            .unwrap_or(self.settings.linear_velocity)
    }

    /// Set the linear velocity on the live body, or stage it in settings
    pub fn set_linear_velocity(&mut self, sim: &mut Simulation, velocity: Vec3) {
        match self.state {
            BodyState::Active(handle) => sim.set_linear_velocity(handle, velocity),
            _ => self.settings.linear_velocity = velocity,
        }
    }

    /// Angular velocity: from the live body while active, settings otherwise
    pub fn angular_velocity(&self, sim: &Simulation) -> Vec3 {
        self.handle()
            .and_then(|h| sim.angular_velocity(h))
            .unwrap_or(self.settings.angular_velocity)
    }

    /// Set the angular velocity on the live body, or stage it in settings
    pub fn set_angular_velocity(&mut self, sim: &mut Simulation, velocity: Vec3) {
        match self.state {
            BodyState::Active(handle) => sim.set_angular_velocity(handle, velocity),
            _ => self.settings.angular_velocity = velocity,
        }
    }

    /// Friction coefficient
    pub fn friction(&self, sim: &Simulation) -> f32 {
        self.handle()
            .and_then(|h| sim.friction(h))
            .unwrap_or(self.settings.friction)
    }

    /// Set the friction coefficient
    pub fn set_friction(&mut self, sim: &mut Simulation, friction: f32) {
        self.settings.friction = friction;
        if let BodyState::Active(handle) = self.state {
            sim.set_friction(handle, friction);
        }
    }

    /// Restitution coefficient
    pub fn restitution(&self, sim: &Simulation) -> f32 {
        self.handle()
            .and_then(|h| sim.restitution(h))
            .unwrap_or(self.settings.restitution)
    }

    /// Set the restitution coefficient
    pub fn set_restitution(&mut self, sim: &mut Simulation, restitution: f32) {
        self.settings.restitution = restitution;
        if let BodyState::Active(handle) = self.state {
            sim.set_restitution(handle, restitution);
        }
    }

    /// Set the per-axis rotation locks
    ///
    /// Applied to the body at the next pre-step push. Locking an axis stops
    /// future angular acceleration around it; residual spin is not zeroed
    /// instantly.
    pub fn set_locks(&mut self, lock_x: bool, lock_y: bool, lock_z: bool) {
        self.settings.lock_x = lock_x;
        self.settings.lock_y = lock_y;
        self.settings.lock_z = lock_z;
    }

    /// Accumulate a force on the live body for the next step
    pub fn apply_force(&self, sim: &mut Simulation, force: Vec3) {
        if let BodyState::Active(handle) = self.state {
            sim.apply_force(handle, force);
        }
    }

    /// Accumulate a torque on the live body for the next step
    pub fn apply_torque(&self, sim: &mut Simulation, torque: Vec3) {
        if let BodyState::Active(handle) = self.state {
            sim.apply_torque(handle, torque);
        }
    }

    fn pose_from(transform: &TransformComponent) -> BodyPose {
        BodyPose {
            position: transform.position,
            rotation: transform.rotation,
        }
    }
}

impl Component for RigidbodySettings {}

impl EntityHooks for RigidbodyComponent {
    /// Create the body from the settings and the entity's current transform
    ///
    /// The entity scale is baked into the shape here; later scale changes
    /// are not reflected in the body. On failure the component stays
    /// uninitialized and the error propagates to the registry.
    fn on_activate(
        &mut self,
        entity: EntityId,
        transform: &TransformComponent,
        sim: &mut Simulation,
    ) -> Result<(), PhysicsError> {
        match self.state {
            BodyState::Uninitialized => {}
            BodyState::Active(_) => {
                warn!("rigidbody already active; ignoring re-activation");
                return Ok(());
            }
            BodyState::Disposed => {
                warn!("rigidbody already disposed; ignoring re-activation");
                return Ok(());
            }
        }

        let shape = self.settings.shape.scaled(transform.scale);
        let pose = Self::pose_from(transform);

        let handle = match self.settings.effective_body_type() {
            BodyType::Static => sim.add_static_body(&shape, pose)?,
            BodyType::Dynamic | BodyType::Kinematic => {
                sim.add_dynamic_body(self.settings.mass, &shape, pose)?
            }
        };

        sim.bind_entity(handle, entity);
        sim.set_friction(handle, self.settings.friction);
        sim.set_restitution(handle, self.settings.restitution);

        if self.settings.effective_body_type() != BodyType::Static {
            sim.set_linear_velocity(handle, self.settings.linear_velocity);
            sim.set_angular_velocity(handle, self.settings.angular_velocity);
            sim.set_angular_factor(handle, self.settings.angular_factor());
        }

        self.state = BodyState::Active(handle);
        Ok(())
    }

    /// Push the scene transform into the body before the step
    ///
    /// The push is unconditional: the scene is authoritative before the
    /// step, which is what makes script teleports and scene-driven
    /// kinematic motion work without a dirty flag.
    fn pre_step(&mut self, transform: &TransformComponent, sim: &mut Simulation) {
        if let BodyState::Active(handle) = self.state {
            if self.settings.effective_body_type() != BodyType::Static {
                sim.set_angular_factor(handle, self.settings.angular_factor());
            }
            sim.set_body_pose(handle, Self::pose_from(transform));
        }
    }

    /// Pull the solved pose back into the scene transform after the step
    ///
    /// Only position and rotation come back; scale is never pulled.
    fn post_step(&mut self, transform: &mut TransformComponent, sim: &Simulation) {
        if let BodyState::Active(handle) = self.state {
            if let Some(pose) = sim.body_pose(handle) {
                transform.position = pose.position;
                transform.rotation = pose.rotation;
            }
        }
    }

    /// Remove the body and seal the component; double-dispose is silent
    fn on_dispose(&mut self, sim: &mut Simulation) {
        match self.state {
            BodyState::Active(handle) => {
                sim.remove_body(handle);
                self.state = BodyState::Disposed;
            }
            BodyState::Uninitialized => self.state = BodyState::Disposed,
            BodyState::Disposed => {}
        }
    }
}
