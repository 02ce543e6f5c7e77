//! ECS components

pub mod rigidbody;
pub mod transform;

pub use rigidbody::{RigidbodyComponent, RigidbodySettings};
pub use transform::TransformComponent;
