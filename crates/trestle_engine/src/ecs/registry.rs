//! Entity registry
//!
//! Owns every entity record and dispatches the physics lifecycle hooks.
//! Entities spawn inactive; `activate` runs `on_activate` on the attached
//! components and only then admits the entity to the active set, so a
//! failed activation (for example, body capacity exhausted) leaves the
//! scene unchanged apart from the inactive record.

use log::warn;
use slotmap::SlotMap;

use crate::ecs::components::{RigidbodyComponent, RigidbodySettings, TransformComponent};
use crate::ecs::{EntityHooks, EntityId};
use crate::physics::error::PhysicsError;
use crate::physics::Simulation;

/// Everything the registry stores per entity
#[derive(Debug, Clone)]
pub struct EntityRecord {
    /// World-space transform
    pub transform: TransformComponent,

    /// Physics binding, if the entity has one
    pub rigidbody: Option<RigidbodyComponent>,

    /// Whether the entity is in the active set
    pub active: bool,
}

/// Owner of all entity records
#[derive(Debug, Default)]
pub struct EntityRegistry {
    entities: SlotMap<EntityId, EntityRecord>,
}

impl EntityRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn an inactive entity with the given transform
    pub fn spawn(&mut self, transform: TransformComponent) -> EntityId {
        self.entities.insert(EntityRecord {
            transform,
            rigidbody: None,
            active: false,
        })
    }

    /// Attach a rigidbody to an entity; replaces any previous binding
    ///
    /// Returns `false` if the entity no longer exists.
    pub fn attach_rigidbody(&mut self, entity: EntityId, settings: RigidbodySettings) -> bool {
        match self.entities.get_mut(entity) {
            Some(record) => {
                record.rigidbody = Some(RigidbodyComponent::new(settings));
                true
            }
            None => {
                warn!("attach_rigidbody on unknown entity {entity:?}");
                false
            }
        }
    }

    /// Activate an entity: run component activation hooks and admit it to
    /// the active set
    ///
    /// On failure the entity stays inactive and the error propagates; no
    /// partial state is left in the simulation because the rigidbody hook
    /// only commits its handle on success.
    pub fn activate(&mut self, entity: EntityId, sim: &mut Simulation) -> Result<(), PhysicsError> {
        let Some(record) = self.entities.get_mut(entity) else {
            warn!("activate on unknown entity {entity:?}");
            return Ok(());
        };
        if record.active {
            return Ok(());
        }

        if let Some(rigidbody) = record.rigidbody.as_mut() {
            rigidbody.on_activate(entity, &record.transform, sim)?;
        }
        record.active = true;
        Ok(())
    }

    /// Despawn an entity: dispose its components, then drop the record
    ///
    /// Idempotent; despawning an unknown id is a no-op.
    pub fn despawn(&mut self, entity: EntityId, sim: &mut Simulation) {
        let Some(record) = self.entities.get_mut(entity) else {
            return;
        };
        if let Some(rigidbody) = record.rigidbody.as_mut() {
            rigidbody.on_dispose(sim);
        }
        self.entities.remove(entity);
    }

    /// Resolve an entity id to its record; `None` after despawn
    ///
    /// Stale ids (for example from a raycast that raced a despawn) resolve
    /// to `None` rather than failing.
    pub fn resolve(&self, entity: EntityId) -> Option<&EntityRecord> {
        self.entities.get(entity)
    }

    /// Mutable variant of [`resolve`](Self::resolve)
    pub fn resolve_mut(&mut self, entity: EntityId) -> Option<&mut EntityRecord> {
        self.entities.get_mut(entity)
    }

    /// Whether the id still addresses a live entity
    pub fn contains(&self, entity: EntityId) -> bool {
        self.entities.contains_key(entity)
    }

    /// Number of live entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the registry holds no entities
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterate over all records mutably
    pub fn records_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut EntityRecord)> {
        self.entities.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::physics::SimulationSettings;

    fn simulation() -> Simulation {
        Simulation::create(SimulationSettings::default()).unwrap()
    }

    #[test]
    fn test_spawn_resolve_despawn() {
        let mut sim = simulation();
        let mut registry = EntityRegistry::new();

        let entity = registry.spawn(TransformComponent::from_position(Vec3::new(1.0, 2.0, 3.0)));
        assert!(registry.contains(entity));
        assert!(!registry.resolve(entity).unwrap().active);

        registry.despawn(entity, &mut sim);
        assert!(!registry.contains(entity));
        assert!(registry.resolve(entity).is_none());

        // Stale id again: still a graceful no-op
        registry.despawn(entity, &mut sim);
    }

    #[test]
    fn test_activation_creates_body_and_despawn_removes_it() {
        let mut sim = simulation();
        let mut registry = EntityRegistry::new();

        let entity = registry.spawn(TransformComponent::from_position(Vec3::new(0.0, 5.0, 0.0)));
        assert!(registry.attach_rigidbody(entity, RigidbodySettings::default()));
        registry.activate(entity, &mut sim).unwrap();

        assert!(registry.resolve(entity).unwrap().active);
        assert_eq!(sim.body_count(), 1);

        let handle = registry
            .resolve(entity)
            .and_then(|r| r.rigidbody.as_ref())
            .and_then(|rb| rb.handle())
            .unwrap();
        assert_eq!(sim.entity_of(handle), Some(entity));

        registry.despawn(entity, &mut sim);
        assert_eq!(sim.body_count(), 0);

        // Back-reference resolution is graceful after removal
        assert_eq!(sim.entity_of(handle), None);
    }

    #[test]
    fn test_failed_activation_leaves_entity_inactive() {
        let settings = SimulationSettings {
            max_bodies: 1,
            ..Default::default()
        };
        let mut sim = Simulation::create(settings).unwrap();
        let mut registry = EntityRegistry::new();

        let first = registry.spawn(TransformComponent::identity());
        registry.attach_rigidbody(first, RigidbodySettings::default());
        registry.activate(first, &mut sim).unwrap();

        let second = registry.spawn(TransformComponent::identity());
        registry.attach_rigidbody(second, RigidbodySettings::default());
        let result = registry.activate(second, &mut sim);

        assert!(matches!(result, Err(PhysicsError::CapacityExceeded { .. })));
        assert!(!registry.resolve(second).unwrap().active);
        assert_eq!(sim.body_count(), 1);

        // The record survives, so a retry after freeing capacity works
        registry.despawn(first, &mut sim);
        registry.activate(second, &mut sim).unwrap();
        assert!(registry.resolve(second).unwrap().active);
    }
}
