//! Entity registry and component lifecycle
//!
//! Entities are generational [`EntityId`] keys into the [`EntityRegistry`];
//! components that talk to the physics simulation implement the
//! [`EntityHooks`] capability interface, and the registry dispatches the
//! lifecycle explicitly.

pub mod component;
pub mod components;
pub mod entity;
pub mod registry;

pub use component::{Component, EntityHooks};
pub use entity::EntityId;
pub use registry::{EntityRecord, EntityRegistry};
