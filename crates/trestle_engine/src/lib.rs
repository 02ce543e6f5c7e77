//! # Trestle Engine
//!
//! The physics synchronization subsystem of a game engine: a rigid-body
//! simulation behind a backend capability interface, collision-layer
//! filtering, and an entity registry that keeps scene transforms and
//! physics bodies in lockstep across the fixed timestep.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use trestle_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut sim = Simulation::create(SimulationSettings::default())?;
//!     let mut registry = EntityRegistry::new();
//!
//!     let crate_box = registry.spawn(TransformComponent::from_position(
//!         Vec3::new(0.0, 10.0, 0.0),
//!     ));
//!     registry.attach_rigidbody(crate_box, RigidbodySettings::default());
//!     registry.activate(crate_box, &mut sim)?;
//!
//!     // Game loop: the accumulator decides how many fixed steps to run
//!     let dt = 1.0 / 60.0;
//!     for _ in 0..60 {
//!         PhysicsSyncSystem::fixed_update(&mut registry, &mut sim, dt);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod ecs;
pub mod foundation;
pub mod physics;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError},
        ecs::{
            components::{RigidbodyComponent, RigidbodySettings, TransformComponent},
            Component, EntityHooks, EntityId, EntityRecord, EntityRegistry,
        },
        foundation::math::{Mat4, Quat, Transform, Vec3},
        physics::{
            BodyHandle, BodyPose, BodyType, CollisionLayer, LayerConfig, PhysicsError,
            PhysicsSyncSystem, SceneRayHit, ShapeDescriptor, Simulation, SimulationSettings,
        },
    };
}
