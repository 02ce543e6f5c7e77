//! Transform synchronization between the scene and the physics world
//!
//! Each fixed step has three phases with a single writer each: before the
//! step the scene owns the transforms and pushes them into the bodies,
//! after the step the bodies own them and the solved poses are pulled back,
//! and during rendering nobody writes — render code reads the last pulled
//! transforms. [`SyncPolicy`] is that rule as data; the pump in
//! [`PhysicsSyncSystem`] enforces the ordering by construction: every push
//! completes before the step starts, every pull starts after it ends.
//!
//! The pre-step push is unconditional, with no dirty flag. That is what
//! makes script teleports and scene-driven kinematic motion work: whatever
//! the scene wrote to a transform since the last step becomes the body's
//! pose. The known consequence is that dynamic bodies nobody scripted also
//! get their solver pose overwritten each step with the value pulled after
//! the previous one, which is lossless as long as nothing else mutates the
//! transform in between. Velocities are never touched by the push.

use crate::ecs::{EntityHooks, EntityRegistry};
use crate::physics::Simulation;

/// Phase of the fixed-step synchronization cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// Before the physics step
    PreStep,
    /// After the physics step
    PostStep,
    /// During rendering
    Render,
}

/// Which side owns the transforms in a given phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authority {
    /// The scene transform is authoritative
    Scene,
    /// The physics body is authoritative
    Body,
}

/// The single-writer rule for entity transforms
pub struct SyncPolicy;

impl SyncPolicy {
    /// The writer allowed in `phase`, or `None` when transforms are
    /// read-only
    pub fn writer(phase: SyncPhase) -> Option<Authority> {
        match phase {
            SyncPhase::PreStep => Some(Authority::Scene),
            SyncPhase::PostStep => Some(Authority::Body),
            SyncPhase::Render => None,
        }
    }
}

/// Fixed-step pump driving the push / step / pull cycle
pub struct PhysicsSyncSystem;

impl PhysicsSyncSystem {
    /// Run one full fixed step over every active entity
    ///
    /// `dt` is the caller's fixed timestep; the surrounding game loop owns
    /// the accumulator and decides how many times per frame to call this.
    pub fn fixed_update(registry: &mut EntityRegistry, sim: &mut Simulation, dt: f32) {
        for (_, record) in registry.records_mut() {
            if !record.active {
                continue;
            }
            if let Some(rigidbody) = record.rigidbody.as_mut() {
                rigidbody.pre_step(&record.transform, sim);
            }
        }

        sim.advance(dt);

        for (_, record) in registry.records_mut() {
            if !record.active {
                continue;
            }
            if let Some(rigidbody) = record.rigidbody.as_mut() {
                rigidbody.post_step(&mut record.transform, sim);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::{RigidbodySettings, TransformComponent};
    use crate::foundation::math::Vec3;
    use crate::physics::{SimulationSettings, Simulation};
    use approx::assert_relative_eq;

    const DT: f32 = 1.0 / 60.0;

    fn simulation() -> Simulation {
        Simulation::create(SimulationSettings::default()).unwrap()
    }

    #[test]
    fn test_writer_per_phase() {
        assert_eq!(SyncPolicy::writer(SyncPhase::PreStep), Some(Authority::Scene));
        assert_eq!(SyncPolicy::writer(SyncPhase::PostStep), Some(Authority::Body));
        assert_eq!(SyncPolicy::writer(SyncPhase::Render), None);
    }

    #[test]
    fn test_pump_pulls_solved_pose_into_transform() {
        let mut sim = simulation();
        let mut registry = EntityRegistry::new();

        let entity = registry.spawn(TransformComponent::from_position(Vec3::new(0.0, 10.0, 0.0)));
        registry.attach_rigidbody(entity, RigidbodySettings::default());
        registry.activate(entity, &mut sim).unwrap();

        let mut last_y = 10.0_f32;
        for _ in 0..60 {
            PhysicsSyncSystem::fixed_update(&mut registry, &mut sim, DT);
            let y = registry.resolve(entity).unwrap().transform.position.y;
            assert!(y < last_y, "transform did not follow the falling body");
            last_y = y;
        }
    }

    #[test]
    fn test_scene_teleport_survives_the_pump() {
        let mut sim = simulation();
        let mut registry = EntityRegistry::new();

        let entity = registry.spawn(TransformComponent::from_position(Vec3::new(0.0, 5.0, 0.0)));
        registry.attach_rigidbody(entity, RigidbodySettings::default());
        registry.activate(entity, &mut sim).unwrap();

        for _ in 0..5 {
            PhysicsSyncSystem::fixed_update(&mut registry, &mut sim, DT);
        }

        // Script teleport between steps
        registry.resolve_mut(entity).unwrap().transform.position = Vec3::new(40.0, 100.0, 0.0);
        PhysicsSyncSystem::fixed_update(&mut registry, &mut sim, DT);

        // One step of gravity from the teleport target, not the old spot
        let position = registry.resolve(entity).unwrap().transform.position;
        assert_relative_eq!(position.x, 40.0, epsilon = 1e-3);
        assert!(position.y > 99.0 && position.y < 100.0);
    }

    #[test]
    fn test_pump_never_writes_scale() {
        let mut sim = simulation();
        let mut registry = EntityRegistry::new();

        let entity = registry.spawn(
            TransformComponent::from_position(Vec3::new(0.0, 10.0, 0.0)).with_uniform_scale(3.0),
        );
        registry.attach_rigidbody(entity, RigidbodySettings::default());
        registry.activate(entity, &mut sim).unwrap();

        for _ in 0..10 {
            PhysicsSyncSystem::fixed_update(&mut registry, &mut sim, DT);
        }

        let transform = &registry.resolve(entity).unwrap().transform;
        assert!(transform.position.y < 10.0);
        assert_eq!(transform.scale, Vec3::new(3.0, 3.0, 3.0));
    }

    #[test]
    fn test_entities_without_rigidbody_are_untouched() {
        let mut sim = simulation();
        let mut registry = EntityRegistry::new();

        let scenery = registry.spawn(TransformComponent::from_position(Vec3::new(7.0, 8.0, 9.0)));
        registry.activate(scenery, &mut sim).unwrap();

        for _ in 0..10 {
            PhysicsSyncSystem::fixed_update(&mut registry, &mut sim, DT);
        }

        let transform = &registry.resolve(scenery).unwrap().transform;
        assert_eq!(transform.position, Vec3::new(7.0, 8.0, 9.0));
    }
}
