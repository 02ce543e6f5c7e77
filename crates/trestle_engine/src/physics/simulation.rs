//! Simulation: the owner of the physics world
//!
//! One `Simulation` owns the backend world, the collision filtering
//! objects, and a worker pool sized to hardware concurrency. All body
//! creation/removal and the `advance` step go through `&mut self`, which
//! encodes the single-simulation-thread contract: a step can never overlap
//! a scene mutation for that step. The surrounding game loop owns the
//! fixed-timestep accumulator and spiral-of-death clamping; `advance` knows
//! nothing about wall-clock time.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::ecs::EntityId;
use crate::foundation::math::Vec3;

use super::backend::{BodyHandle, BodyPose, BodyType, PhysicsBackend, RapierBackend};
use super::error::PhysicsError;
use super::layers::{BroadPhaseClassifier, CollisionLayer, LayerConfig, LayerMatrix};
use super::shape::ShapeDescriptor;

/// Capacity and gravity settings handed to [`Simulation::create`]
///
/// An explicit configuration struct owned by the simulation instance —
/// never process-wide state — so independent simulations can coexist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSettings {
    /// World gravity vector
    pub gravity: Vec3,

    /// Hard cap on live bodies; creation beyond it is reported, not fatal
    pub max_bodies: usize,

    /// Sizing hint for broad-phase body pairs
    pub max_body_pairs: usize,

    /// Sizing hint for contact constraints per step
    pub max_contact_constraints: usize,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            max_bodies: 1024,
            max_body_pairs: 1024,
            max_contact_constraints: 1024,
        }
    }
}

impl Config for SimulationSettings {}

/// Result of a scene-level raycast, resolved to the owning entity
#[derive(Debug, Clone, Copy)]
pub struct SceneRayHit {
    /// Owning entity, if the body is still bound to one
    pub entity: Option<EntityId>,
    /// The body that was hit
    pub body: BodyHandle,
    /// World-space hit position
    pub position: Vec3,
    /// World-space surface normal at the hit
    pub normal: Vec3,
    /// Distance along the ray direction
    pub distance: f32,
}

/// Owner of the physics world, filtering objects, and worker pool
pub struct Simulation {
    // Field order is teardown order: the world must be released before the
    // pool that serviced it.
    backend: Box<dyn PhysicsBackend>,
    worker_pool: rayon::ThreadPool,
    classifier: BroadPhaseClassifier,
    layers: LayerMatrix,
    settings: SimulationSettings,
}

impl Simulation {
    /// Create a simulation with the standard two-layer collision setup
    ///
    /// Fails with [`PhysicsError::Setup`] if the backend or worker pool
    /// cannot initialize; this is fatal at startup and not recoverable.
    pub fn create(settings: SimulationSettings) -> Result<Self, PhysicsError> {
        Self::with_layers(settings, LayerConfig::two_layer())
    }

    /// Create a simulation with an explicit layer configuration
    pub fn with_layers(
        settings: SimulationSettings,
        layer_config: LayerConfig,
    ) -> Result<Self, PhysicsError> {
        let layers = LayerMatrix::new(&layer_config);
        let backend = Box::new(RapierBackend::new(settings.gravity, layers.clone()));
        Self::with_backend(settings, layer_config, backend)
    }

    /// Create a simulation over an explicit backend instance
    ///
    /// This is the seam used to run against a different rigid-body engine.
    pub fn with_backend(
        settings: SimulationSettings,
        layer_config: LayerConfig,
        backend: Box<dyn PhysicsBackend>,
    ) -> Result<Self, PhysicsError> {
        if settings.max_bodies == 0
            || settings.max_body_pairs == 0
            || settings.max_contact_constraints == 0
        {
            return Err(PhysicsError::Setup(
                "capacity settings must be non-zero".to_string(),
            ));
        }

        let threads = num_cpus::get();
        let worker_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("physics-worker-{i}"))
            .build()
            .map_err(|e| PhysicsError::Setup(format!("worker pool: {e}")))?;

        info!(
            "physics simulation created: {} max bodies, {} worker threads, {} layers",
            settings.max_bodies,
            threads,
            layer_config.layer_count()
        );

        Ok(Self {
            backend,
            worker_pool,
            classifier: BroadPhaseClassifier::new(&layer_config),
            layers: LayerMatrix::new(&layer_config),
            settings,
        })
    }

    /// The settings this simulation was created with
    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    /// World gravity vector
    pub fn gravity(&self) -> Vec3 {
        self.settings.gravity
    }

    /// The collision compatibility matrix
    pub fn layer_matrix(&self) -> &LayerMatrix {
        &self.layers
    }

    /// The layer-to-bucket classifier
    pub fn classifier(&self) -> &BroadPhaseClassifier {
        &self.classifier
    }

    fn check_capacity(&self) -> Result<(), PhysicsError> {
        if self.backend.body_count() >= self.settings.max_bodies {
            return Err(PhysicsError::CapacityExceeded {
                max_bodies: self.settings.max_bodies,
            });
        }
        Ok(())
    }

    /// Add a static body on the standard `NON_MOVING` layer
    ///
    /// Static bodies have zero mass, never move, and never receive
    /// velocity.
    pub fn add_static_body(
        &mut self,
        shape: &ShapeDescriptor,
        pose: BodyPose,
    ) -> Result<BodyHandle, PhysicsError> {
        self.add_static_body_on(shape, pose, CollisionLayer::NON_MOVING)
    }

    /// Add a static body on an explicit collision layer
    pub fn add_static_body_on(
        &mut self,
        shape: &ShapeDescriptor,
        pose: BodyPose,
        layer: CollisionLayer,
    ) -> Result<BodyHandle, PhysicsError> {
        self.check_capacity()?;
        self.layers.validate(layer)?;
        let handle = self.backend.add_static_body(shape, pose, layer)?;
        debug!("added static body {handle:?} on layer {layer:?}");
        Ok(handle)
    }

    /// Add a dynamic body on the standard `MOVING` layer
    ///
    /// Mass is treated strictly: `mass <= 0` is rejected. Routing zero mass
    /// to a static body is the component layer's policy.
    pub fn add_dynamic_body(
        &mut self,
        mass: f32,
        shape: &ShapeDescriptor,
        pose: BodyPose,
    ) -> Result<BodyHandle, PhysicsError> {
        self.add_dynamic_body_on(mass, shape, pose, CollisionLayer::MOVING)
    }

    /// Add a dynamic body on an explicit collision layer
    pub fn add_dynamic_body_on(
        &mut self,
        mass: f32,
        shape: &ShapeDescriptor,
        pose: BodyPose,
        layer: CollisionLayer,
    ) -> Result<BodyHandle, PhysicsError> {
        if mass <= 0.0 {
            return Err(PhysicsError::InvalidMass(mass));
        }
        self.check_capacity()?;
        self.layers.validate(layer)?;
        let handle = self.backend.add_dynamic_body(mass, shape, pose, layer)?;
        debug!("added dynamic body {handle:?} (mass {mass}) on layer {layer:?}");
        Ok(handle)
    }

    /// Remove a body; idempotent no-op if it was already removed
    ///
    /// The handle is invalid after return and must not be reused.
    pub fn remove_body(&mut self, handle: BodyHandle) {
        if self.backend.contains(handle) {
            debug!("removing body {handle:?}");
        }
        self.backend.remove_body(handle);
    }

    /// Step the world exactly once by the caller's fixed timestep
    ///
    /// Blocking and synchronous: returns only once the step, including all
    /// worker-pool work, has completed. `&mut self` makes it impossible to
    /// interleave with body creation/removal. No clamping is performed; the
    /// external accumulator decides how many catch-up steps to run.
    pub fn advance(&mut self, dt: f32) {
        let backend = &mut self.backend;
        self.worker_pool.install(|| backend.step(dt));
    }

    /// Whether the handle still addresses a live body
    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.backend.contains(handle)
    }

    /// Number of live bodies
    pub fn body_count(&self) -> usize {
        self.backend.body_count()
    }

    /// Motion class of a body
    pub fn body_type(&self, handle: BodyHandle) -> Option<BodyType> {
        self.backend.body_type(handle)
    }

    /// World transform of a body (interpolated where the backend supports
    /// it)
    pub fn body_pose(&self, handle: BodyHandle) -> Option<BodyPose> {
        self.backend.pose(handle)
    }

    /// Overwrite a body's world transform
    pub fn set_body_pose(&mut self, handle: BodyHandle, pose: BodyPose) {
        if self.live_for_write(handle, "set_body_pose") {
            self.backend.set_pose(handle, pose);
        }
    }

    /// Linear velocity of a body
    pub fn linear_velocity(&self, handle: BodyHandle) -> Option<Vec3> {
        self.backend.linear_velocity(handle)
    }

    /// Set the linear velocity of a body
    pub fn set_linear_velocity(&mut self, handle: BodyHandle, velocity: Vec3) {
        if self.live_for_write(handle, "set_linear_velocity") {
            self.backend.set_linear_velocity(handle, velocity);
        }
    }

    /// Angular velocity of a body
    pub fn angular_velocity(&self, handle: BodyHandle) -> Option<Vec3> {
        self.backend.angular_velocity(handle)
    }

    /// Set the angular velocity of a body
    pub fn set_angular_velocity(&mut self, handle: BodyHandle, velocity: Vec3) {
        if self.live_for_write(handle, "set_angular_velocity") {
            self.backend.set_angular_velocity(handle, velocity);
        }
    }

    /// Friction coefficient of a body
    pub fn friction(&self, handle: BodyHandle) -> Option<f32> {
        self.backend.friction(handle)
    }

    /// Set the friction coefficient of a body
    pub fn set_friction(&mut self, handle: BodyHandle, friction: f32) {
        if self.live_for_write(handle, "set_friction") {
            self.backend.set_friction(handle, friction);
        }
    }

    /// Restitution coefficient of a body
    pub fn restitution(&self, handle: BodyHandle) -> Option<f32> {
        self.backend.restitution(handle)
    }

    /// Set the restitution coefficient of a body
    pub fn set_restitution(&mut self, handle: BodyHandle, restitution: f32) {
        if self.live_for_write(handle, "set_restitution") {
            self.backend.set_restitution(handle, restitution);
        }
    }

    /// Set the per-axis angular factor (`0` freezes an axis, `1` frees it)
    pub fn set_angular_factor(&mut self, handle: BodyHandle, factor: Vec3) {
        if self.live_for_write(handle, "set_angular_factor") {
            self.backend.set_angular_factor(handle, factor);
        }
    }

    /// Accumulate a force on a dynamic body for the next step
    pub fn apply_force(&mut self, handle: BodyHandle, force: Vec3) {
        if self.live_for_write(handle, "apply_force") {
            self.backend.apply_force(handle, force);
        }
    }

    /// Accumulate a torque on a dynamic body for the next step
    pub fn apply_torque(&mut self, handle: BodyHandle, torque: Vec3) {
        if self.live_for_write(handle, "apply_torque") {
            self.backend.apply_torque(handle, torque);
        }
    }

    /// Bind the non-owning entity back-reference on a body
    ///
    /// Used only for collision/raycast result resolution, never for
    /// lifetime management.
    pub fn bind_entity(&mut self, handle: BodyHandle, entity: EntityId) {
        use slotmap::Key;
        if self.live_for_write(handle, "bind_entity") {
            self.backend.set_user_data(handle, entity.data().as_ffi());
        }
    }

    /// Resolve the entity owning a body; `None` if the body is gone or was
    /// never bound
    pub fn entity_of(&self, handle: BodyHandle) -> Option<EntityId> {
        use slotmap::Key;
        let data = self.backend.user_data(handle)?;
        if data == 0 {
            return None;
        }
        Some(EntityId::from(slotmap::KeyData::from_ffi(data)))
    }

    /// Number of body pairs with an active contact after the last step
    pub fn active_contact_count(&self) -> usize {
        self.backend.active_contact_count()
    }

    /// Cast a ray and resolve the closest hit to its owning entity
    pub fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<SceneRayHit> {
        let hit = self.backend.raycast(origin, direction, max_distance)?;
        Some(SceneRayHit {
            entity: self.entity_of(hit.body),
            body: hit.body,
            position: hit.position,
            normal: hit.normal,
            distance: hit.distance,
        })
    }

    /// Stale-handle policy for mutating operations: a programmer error in
    /// development, a logged no-op in release.
    fn live_for_write(&self, handle: BodyHandle, op: &str) -> bool {
        let live = self.backend.contains(handle);
        if !live {
            debug_assert!(live, "{op} called with a stale body handle");
            warn!("{op} ignored: stale body handle {handle:?}");
        }
        live
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const DT: f32 = 1.0 / 60.0;

    fn simulation() -> Simulation {
        Simulation::create(SimulationSettings::default()).unwrap()
    }

    #[test]
    fn test_create_with_default_settings() {
        let sim = simulation();
        assert_eq!(sim.body_count(), 0);
        assert_relative_eq!(sim.gravity().y, -9.81);
    }

    #[test]
    fn test_zero_capacity_settings_rejected() {
        let settings = SimulationSettings {
            max_bodies: 0,
            ..Default::default()
        };
        assert!(matches!(
            Simulation::create(settings),
            Err(PhysicsError::Setup(_))
        ));
    }

    #[test]
    fn test_dynamic_body_requires_positive_mass() {
        let mut sim = simulation();
        let result =
            sim.add_dynamic_body(0.0, &ShapeDescriptor::unit_box(), BodyPose::identity());
        assert!(matches!(result, Err(PhysicsError::InvalidMass(_))));
    }

    #[test]
    fn test_remove_body_is_idempotent() {
        let mut sim = simulation();
        let keep = sim
            .add_dynamic_body(
                1.0,
                &ShapeDescriptor::Sphere { radius: 0.5 },
                BodyPose::from_position(Vec3::new(5.0, 0.0, 0.0)),
            )
            .unwrap();
        let gone = sim
            .add_dynamic_body(1.0, &ShapeDescriptor::unit_box(), BodyPose::identity())
            .unwrap();

        sim.remove_body(gone);
        sim.remove_body(gone);

        assert!(!sim.contains(gone));
        assert_eq!(sim.body_count(), 1);

        // The surviving body is untouched
        assert!(sim.contains(keep));
        assert!(sim.body_pose(keep).is_some());
    }

    #[test]
    fn test_capacity_exceeded_is_recoverable() {
        let settings = SimulationSettings {
            max_bodies: 1,
            ..Default::default()
        };
        let mut sim = Simulation::create(settings).unwrap();

        let first = sim
            .add_static_body(&ShapeDescriptor::unit_box(), BodyPose::identity())
            .unwrap();
        let second = sim.add_dynamic_body(
            1.0,
            &ShapeDescriptor::Sphere { radius: 0.5 },
            BodyPose::from_position(Vec3::new(0.0, 3.0, 0.0)),
        );

        assert!(matches!(
            second,
            Err(PhysicsError::CapacityExceeded { max_bodies: 1 })
        ));

        // The first body stays valid and queryable
        assert!(sim.contains(first));
        assert_eq!(sim.body_count(), 1);
        assert!(sim.body_pose(first).is_some());

        // Removing the first frees the slot
        sim.remove_body(first);
        assert!(sim
            .add_static_body(&ShapeDescriptor::unit_box(), BodyPose::identity())
            .is_ok());
    }

    #[test]
    fn test_gravity_drop_is_monotonic_and_finite() {
        let mut sim = simulation();
        let body = sim
            .add_dynamic_body(
                1.0,
                &ShapeDescriptor::unit_box(),
                BodyPose::from_position(Vec3::new(0.0, 10.0, 0.0)),
            )
            .unwrap();

        let mut last_y = 10.0_f32;
        for _ in 0..60 {
            sim.advance(DT);
            let y = sim.body_pose(body).unwrap().position.y;
            assert!(y.is_finite());
            assert!(y < last_y, "y did not decrease: {y} >= {last_y}");
            last_y = y;
        }
        assert!(last_y < 10.0);
    }

    #[test]
    fn test_static_body_never_moves() {
        let mut sim = simulation();
        let pose = BodyPose {
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: crate::foundation::math::Quat::from_axis_angle(
                &Vec3::y_axis(),
                0.7,
            ),
        };
        let body = sim
            .add_static_body(&ShapeDescriptor::unit_box(), pose)
            .unwrap();

        for _ in 0..30 {
            sim.advance(DT);
        }

        let after = sim.body_pose(body).unwrap();
        assert_relative_eq!(after.position, pose.position, epsilon = 1e-6);
        assert_relative_eq!(after.rotation, pose.rotation, epsilon = 1e-6);
        assert_relative_eq!(sim.linear_velocity(body).unwrap(), Vec3::zeros());
    }

    #[test]
    fn test_overlapping_bodies_generate_contact() {
        let mut sim = simulation();
        sim.add_static_body(
            &ShapeDescriptor::Box {
                half_extents: Vec3::new(10.0, 0.5, 10.0),
            },
            BodyPose::identity(),
        )
        .unwrap();
        sim.add_dynamic_body(
            1.0,
            &ShapeDescriptor::Sphere { radius: 0.5 },
            BodyPose::from_position(Vec3::new(0.0, 0.6, 0.0)),
        )
        .unwrap();

        sim.advance(DT);
        assert!(sim.active_contact_count() > 0);
    }

    #[test]
    fn test_angular_factor_locks_future_spin() {
        let mut sim = simulation();
        let body = sim
            .add_dynamic_body(
                1.0,
                &ShapeDescriptor::unit_box(),
                BodyPose::from_position(Vec3::new(0.0, 100.0, 0.0)),
            )
            .unwrap();

        // Freeze Y, keep X/Z free
        sim.set_angular_factor(body, Vec3::new(1.0, 0.0, 1.0));

        for _ in 0..10 {
            sim.apply_torque(body, Vec3::new(0.0, 5.0, 0.0));
            sim.advance(DT);
        }
        let angvel = sim.angular_velocity(body).unwrap();
        assert_relative_eq!(angvel.y, 0.0, epsilon = 1e-6);

        // A free axis still accelerates under torque
        for _ in 0..10 {
            sim.apply_torque(body, Vec3::new(5.0, 0.0, 0.0));
            sim.advance(DT);
        }
        let angvel = sim.angular_velocity(body).unwrap();
        assert!(angvel.x.abs() > 0.0);
        assert_relative_eq!(angvel.y, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_raycast_reports_closest_body() {
        let mut sim = simulation();
        let body = sim
            .add_static_body(
                &ShapeDescriptor::Box {
                    half_extents: Vec3::new(1.0, 1.0, 1.0),
                },
                BodyPose::from_position(Vec3::new(0.0, 0.0, -5.0)),
            )
            .unwrap();

        // Query structures are refreshed by the step
        sim.advance(DT);

        let hit = sim
            .raycast(Vec3::zeros(), Vec3::new(0.0, 0.0, -1.0), 100.0)
            .expect("ray should hit the box");
        assert_eq!(hit.body, body);
        assert!(hit.entity.is_none());
        assert_relative_eq!(hit.position.z, -4.0, epsilon = 1e-3);
    }

    #[test]
    fn test_settings_roundtrip_through_config() {
        let dir = std::env::temp_dir().join("trestle_sim_settings_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("simulation.toml");
        let path = path.to_str().unwrap();

        let settings = SimulationSettings {
            gravity: Vec3::new(0.0, -3.71, 0.0),
            max_bodies: 64,
            max_body_pairs: 128,
            max_contact_constraints: 256,
        };
        settings.save_to_file(path).unwrap();
        let loaded = SimulationSettings::load_from_file(path).unwrap();
        assert_eq!(loaded, settings);
    }
}
