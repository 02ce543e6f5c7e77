//! Component trait and lifecycle capability interface

use crate::ecs::components::TransformComponent;
use crate::ecs::EntityId;
use crate::physics::error::PhysicsError;
use crate::physics::Simulation;

/// Marker trait for components
pub trait Component: 'static + Send + Sync {}

impl Component for crate::foundation::math::Transform {}
impl Component for TransformComponent {}
impl Component for crate::ecs::components::RigidbodyComponent {}

/// Lifecycle capability interface for components that talk to the physics
/// simulation
///
/// The registry dispatches these hooks explicitly; there are no virtual
/// base-class chains. Every method has a no-op default so components opt
/// into only the phases they care about.
pub trait EntityHooks {
    /// Called once when the owning entity enters the active set
    ///
    /// A failure leaves the entity inactive; the registry propagates it.
    fn on_activate(
        &mut self,
        _entity: EntityId,
        _transform: &TransformComponent,
        _sim: &mut Simulation,
    ) -> Result<(), PhysicsError> {
        Ok(())
    }

    /// Called once per variable-rate frame
    fn on_update(&mut self, _transform: &mut TransformComponent, _dt: f32) {}

    /// Called immediately before each physics step (scene is authoritative)
    fn pre_step(&mut self, _transform: &TransformComponent, _sim: &mut Simulation) {}

    /// Called immediately after each physics step (body is authoritative)
    fn post_step(&mut self, _transform: &mut TransformComponent, _sim: &Simulation) {}

    /// Called when the owning entity is despawned; must be idempotent
    fn on_dispose(&mut self, _sim: &mut Simulation) {}
}
