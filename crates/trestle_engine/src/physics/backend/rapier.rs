//! Raw `rapier3d` physics backend
//!
//! Implements [`PhysicsBackend`] over the rapier pipeline. The backend owns
//! every piece of rapier state and exposes bodies only through generational
//! [`BodyHandle`] keys; the rapier handle pair for each body lives in a
//! private record map. Broad-phase filtering is expressed through rapier
//! collision groups derived from the [`LayerMatrix`] at body creation, so
//! the static-vs-static exclusion is enforced inside the broad phase
//! itself.

use std::collections::HashMap;

use nalgebra::{Isometry3, Translation3};
use rapier3d::prelude::{
    CCDSolver, ColliderBuilder, ColliderHandle, ColliderSet, DefaultBroadPhase, Group,
    ImpulseJointSet, IntegrationParameters, InteractionGroups, IslandManager, MultibodyJointSet,
    NarrowPhase, PhysicsPipeline, QueryFilter, QueryPipeline, Ray, RigidBodyBuilder,
    RigidBodyHandle, RigidBodySet,
};
use slotmap::SlotMap;

use crate::foundation::math::{Point3, Vec3};
use crate::physics::error::PhysicsError;
use crate::physics::layers::{CollisionLayer, LayerMatrix};
use crate::physics::shape::ShapeDescriptor;

use super::{BodyHandle, BodyPose, BodyType, PhysicsBackend, RayHit};

/// Rapier handles backing one engine body
struct BodyRecord {
    rigid_body: RigidBodyHandle,
    collider: ColliderHandle,
    body_type: BodyType,
}

/// [`PhysicsBackend`] implementation over `rapier3d`
pub struct RapierBackend {
    gravity: Vec3,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,

    layers: LayerMatrix,
    records: SlotMap<BodyHandle, BodyRecord>,
    /// Reverse lookup for raycast hit resolution
    body_handles: HashMap<RigidBodyHandle, BodyHandle>,
}

impl RapierBackend {
    /// Create an empty world with the given gravity and layer table
    pub fn new(gravity: Vec3, layers: LayerMatrix) -> Self {
        Self {
            gravity,
            integration_parameters: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            layers,
            records: SlotMap::with_key(),
            body_handles: HashMap::new(),
        }
    }

    fn groups_for(&self, layer: CollisionLayer) -> Result<InteractionGroups, PhysicsError> {
        let membership = self.layers.membership_bits(layer)?;
        let filter = self.layers.filter_bits(layer)?;
        Ok(InteractionGroups::new(
            Group::from_bits_truncate(membership),
            Group::from_bits_truncate(filter),
        ))
    }

    fn collider_for(
        &self,
        shape: &ShapeDescriptor,
        layer: CollisionLayer,
    ) -> Result<ColliderBuilder, PhysicsError> {
        let builder = match *shape {
            ShapeDescriptor::Box { half_extents } => {
                ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            }
            ShapeDescriptor::Sphere { radius } => ColliderBuilder::ball(radius),
            ShapeDescriptor::Capsule {
                half_height,
                radius,
            } => ColliderBuilder::capsule_y(half_height, radius),
        };
        Ok(builder.collision_groups(self.groups_for(layer)?))
    }

    fn insert_body(
        &mut self,
        rigid_body: rapier3d::prelude::RigidBody,
        collider: rapier3d::prelude::Collider,
        body_type: BodyType,
    ) -> BodyHandle {
        let rb_handle = self.bodies.insert(rigid_body);
        let collider_handle = self
            .colliders
            .insert_with_parent(collider, rb_handle, &mut self.bodies);
        let handle = self.records.insert(BodyRecord {
            rigid_body: rb_handle,
            collider: collider_handle,
            body_type,
        });
        self.body_handles.insert(rb_handle, handle);
        handle
    }

    fn record(&self, handle: BodyHandle) -> Option<&BodyRecord> {
        self.records.get(handle)
    }
}

fn to_isometry(pose: BodyPose) -> Isometry3<f32> {
    Isometry3::from_parts(Translation3::from(pose.position), pose.rotation)
}

fn from_isometry(iso: &Isometry3<f32>) -> BodyPose {
    BodyPose {
        position: iso.translation.vector,
        rotation: iso.rotation,
    }
}

impl PhysicsBackend for RapierBackend {
    fn add_static_body(
        &mut self,
        shape: &ShapeDescriptor,
        pose: BodyPose,
        layer: CollisionLayer,
    ) -> Result<BodyHandle, PhysicsError> {
        let collider = self.collider_for(shape, layer)?.build();
        let body = RigidBodyBuilder::fixed().position(to_isometry(pose)).build();
        Ok(self.insert_body(body, collider, BodyType::Static))
    }

    fn add_dynamic_body(
        &mut self,
        mass: f32,
        shape: &ShapeDescriptor,
        pose: BodyPose,
        layer: CollisionLayer,
    ) -> Result<BodyHandle, PhysicsError> {
        let collider = self.collider_for(shape, layer)?.mass(mass).build();
        let body = RigidBodyBuilder::dynamic()
            .position(to_isometry(pose))
            .build();
        Ok(self.insert_body(body, collider, BodyType::Dynamic))
    }

    fn remove_body(&mut self, handle: BodyHandle) {
        // Stale handles miss the record map and fall through: idempotent.
        if let Some(record) = self.records.remove(handle) {
            self.body_handles.remove(&record.rigid_body);
            self.bodies.remove(
                record.rigid_body,
                &mut self.islands,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            );
        }
    }

    fn step(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );

        // Applied forces/torques cover exactly one step.
        for (_, body) in self.bodies.iter_mut() {
            body.reset_forces(false);
            body.reset_torques(false);
        }
    }

    fn contains(&self, handle: BodyHandle) -> bool {
        self.records.contains_key(handle)
    }

    fn body_count(&self) -> usize {
        self.records.len()
    }

    fn body_type(&self, handle: BodyHandle) -> Option<BodyType> {
        self.record(handle).map(|r| r.body_type)
    }

    fn pose(&self, handle: BodyHandle) -> Option<BodyPose> {
        let record = self.record(handle)?;
        let body = self.bodies.get(record.rigid_body)?;
        Some(from_isometry(body.position()))
    }

    fn set_pose(&mut self, handle: BodyHandle, pose: BodyPose) {
        if let Some(record) = self.records.get(handle) {
            if let Some(body) = self.bodies.get_mut(record.rigid_body) {
                body.set_position(to_isometry(pose), true);
            }
        }
    }

    fn linear_velocity(&self, handle: BodyHandle) -> Option<Vec3> {
        let record = self.record(handle)?;
        self.bodies.get(record.rigid_body).map(|b| *b.linvel())
    }

    fn set_linear_velocity(&mut self, handle: BodyHandle, velocity: Vec3) {
        if let Some(record) = self.records.get(handle) {
            if let Some(body) = self.bodies.get_mut(record.rigid_body) {
                body.set_linvel(velocity, true);
            }
        }
    }

    fn angular_velocity(&self, handle: BodyHandle) -> Option<Vec3> {
        let record = self.record(handle)?;
        self.bodies.get(record.rigid_body).map(|b| *b.angvel())
    }

    fn set_angular_velocity(&mut self, handle: BodyHandle, velocity: Vec3) {
        if let Some(record) = self.records.get(handle) {
            if let Some(body) = self.bodies.get_mut(record.rigid_body) {
                body.set_angvel(velocity, true);
            }
        }
    }

    fn friction(&self, handle: BodyHandle) -> Option<f32> {
        let record = self.record(handle)?;
        self.colliders.get(record.collider).map(|c| c.friction())
    }

    fn set_friction(&mut self, handle: BodyHandle, friction: f32) {
        if let Some(record) = self.records.get(handle) {
            if let Some(collider) = self.colliders.get_mut(record.collider) {
                collider.set_friction(friction);
            }
        }
    }

    fn restitution(&self, handle: BodyHandle) -> Option<f32> {
        let record = self.record(handle)?;
        self.colliders.get(record.collider).map(|c| c.restitution())
    }

    fn set_restitution(&mut self, handle: BodyHandle, restitution: f32) {
        if let Some(record) = self.records.get(handle) {
            if let Some(collider) = self.colliders.get_mut(record.collider) {
                collider.set_restitution(restitution);
            }
        }
    }

    fn set_angular_factor(&mut self, handle: BodyHandle, factor: Vec3) {
        if let Some(record) = self.records.get(handle) {
            if let Some(body) = self.bodies.get_mut(record.rigid_body) {
                // Rapier models the factor as per-axis enable flags; a zero
                // component freezes future angular acceleration only, so
                // residual spin decays at the body's damping rate.
                body.set_enabled_rotations(factor.x > 0.0, factor.y > 0.0, factor.z > 0.0, true);
            }
        }
    }

    fn apply_force(&mut self, handle: BodyHandle, force: Vec3) {
        if let Some(record) = self.records.get(handle) {
            if let Some(body) = self.bodies.get_mut(record.rigid_body) {
                body.add_force(force, true);
            }
        }
    }

    fn apply_torque(&mut self, handle: BodyHandle, torque: Vec3) {
        if let Some(record) = self.records.get(handle) {
            if let Some(body) = self.bodies.get_mut(record.rigid_body) {
                body.add_torque(torque, true);
            }
        }
    }

    fn set_user_data(&mut self, handle: BodyHandle, data: u64) {
        if let Some(record) = self.records.get(handle) {
            if let Some(body) = self.bodies.get_mut(record.rigid_body) {
                body.user_data = u128::from(data);
            }
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn user_data(&self, handle: BodyHandle) -> Option<u64> {
        let record = self.record(handle)?;
        let body = self.bodies.get(record.rigid_body)?;
        Some(body.user_data as u64)
    }

    fn active_contact_count(&self) -> usize {
        self.narrow_phase
            .contact_pairs()
            .filter(|pair| pair.has_any_active_contact)
            .count()
    }

    fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<RayHit> {
        let ray = Ray::new(Point3::from(origin), direction);
        let (collider_handle, intersection) = self.query_pipeline.cast_ray_and_get_normal(
            &self.bodies,
            &self.colliders,
            &ray,
            max_distance,
            true,
            QueryFilter::default(),
        )?;

        let collider = self.colliders.get(collider_handle)?;
        let rb_handle = collider.parent()?;
        let body = *self.body_handles.get(&rb_handle)?;

        Some(RayHit {
            body,
            position: ray.point_at(intersection.time_of_impact).coords,
            normal: intersection.normal,
            distance: intersection.time_of_impact,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::layers::LayerConfig;

    fn backend() -> RapierBackend {
        RapierBackend::new(
            Vec3::new(0.0, -9.81, 0.0),
            LayerMatrix::new(&LayerConfig::two_layer()),
        )
    }

    #[test]
    fn test_step_moves_dynamic_body() {
        let mut backend = backend();
        let handle = backend
            .add_dynamic_body(
                1.0,
                &ShapeDescriptor::Sphere { radius: 0.5 },
                BodyPose::from_position(Vec3::new(0.0, 10.0, 0.0)),
                CollisionLayer::MOVING,
            )
            .unwrap();

        let initial_y = backend.pose(handle).unwrap().position.y;
        for _ in 0..10 {
            backend.step(1.0 / 60.0);
        }
        let final_y = backend.pose(handle).unwrap().position.y;

        assert!(final_y < initial_y);
    }

    #[test]
    fn test_remove_body_is_idempotent() {
        let mut backend = backend();
        let handle = backend
            .add_static_body(
                &ShapeDescriptor::unit_box(),
                BodyPose::identity(),
                CollisionLayer::NON_MOVING,
            )
            .unwrap();

        backend.remove_body(handle);
        assert!(!backend.contains(handle));
        assert_eq!(backend.body_count(), 0);

        // Second removal falls through without touching anything
        backend.remove_body(handle);
        assert_eq!(backend.body_count(), 0);
        assert!(backend.pose(handle).is_none());
    }

    #[test]
    fn test_unknown_layer_rejected_at_creation() {
        let mut backend = backend();
        let result = backend.add_static_body(
            &ShapeDescriptor::unit_box(),
            BodyPose::identity(),
            CollisionLayer(9),
        );
        assert!(matches!(result, Err(PhysicsError::UnknownLayer(_))));
        assert_eq!(backend.body_count(), 0);
    }

    #[test]
    fn test_user_data_roundtrip() {
        let mut backend = backend();
        let handle = backend
            .add_dynamic_body(
                2.0,
                &ShapeDescriptor::Sphere { radius: 0.5 },
                BodyPose::identity(),
                CollisionLayer::MOVING,
            )
            .unwrap();

        backend.set_user_data(handle, 42);
        assert_eq!(backend.user_data(handle), Some(42));

        backend.remove_body(handle);
        assert_eq!(backend.user_data(handle), None);
    }
}
