//! Physics simulation subsystem
//!
//! [`Simulation`] owns a rigid-body world behind the [`PhysicsBackend`]
//! capability interface, a collision-layer filtering model, and a worker
//! pool. Entities bind to bodies through `RigidbodyComponent`, and the
//! [`sync`] module pumps transforms across the fixed-timestep boundary.

pub mod backend;
pub mod error;
pub mod layers;
pub mod shape;
pub mod simulation;
pub mod sync;

pub use backend::{BodyHandle, BodyPose, BodyType, PhysicsBackend, RapierBackend, RayHit};
pub use error::PhysicsError;
pub use layers::{
    BroadPhaseClassifier, BroadPhaseLayer, CollisionLayer, LayerConfig, LayerMatrix, LayerSpec,
};
pub use shape::ShapeDescriptor;
pub use simulation::{SceneRayHit, Simulation, SimulationSettings};
pub use sync::{Authority, PhysicsSyncSystem, SyncPhase, SyncPolicy};
