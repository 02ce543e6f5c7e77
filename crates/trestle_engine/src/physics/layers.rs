//! Collision layer system for filtering collision detection
//!
//! Every body carries exactly one [`CollisionLayer`], assigned at creation
//! and immutable for the body's lifetime. Layers map onto coarser
//! [`BroadPhaseLayer`] buckets used only for spatial acceleration; the
//! mapping is a total, deterministic function fixed when the simulation is
//! created. The [`LayerMatrix`] is consulted for every potential collision
//! pair: non-moving layers collide only with buckets that contain at least
//! one moving layer, moving layers collide with every bucket. Two static
//! bodies therefore never collide, no matter how the layer set is extended.
//!
//! All tables are plain read-only data after setup, so the predicates are
//! callable from worker threads without synchronization.

use super::error::PhysicsError;

/// An object's collision class (opaque small integer)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct CollisionLayer(pub u8);

impl CollisionLayer {
    /// Static world geometry: never moves, never receives velocity
    pub const NON_MOVING: CollisionLayer = CollisionLayer(0);

    /// Dynamic and kinematic bodies
    pub const MOVING: CollisionLayer = CollisionLayer(1);

    /// Table index for this layer
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// A coarse broad-phase bucket (used only for spatial acceleration)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BroadPhaseLayer(pub u8);

impl BroadPhaseLayer {
    /// Bucket holding static geometry
    pub const NON_MOVING: BroadPhaseLayer = BroadPhaseLayer(0);

    /// Bucket holding moving bodies
    pub const MOVING: BroadPhaseLayer = BroadPhaseLayer(1);
}

/// One row of the layer configuration
#[derive(Debug, Clone, Copy)]
pub struct LayerSpec {
    /// The collision layer being described
    pub layer: CollisionLayer,

    /// The broad-phase bucket the layer belongs to
    pub bucket: BroadPhaseLayer,

    /// Whether objects on this layer can move
    pub moving: bool,
}

/// The full layer configuration handed to the simulation at creation time
///
/// Owned by the simulation instance rather than stored in process-wide
/// statics, so independent simulations can use independent layer sets.
#[derive(Debug, Clone)]
pub struct LayerConfig {
    specs: Vec<LayerSpec>,
}

impl LayerConfig {
    /// Build a configuration from explicit layer rows
    ///
    /// Layer indices must be dense starting at zero: the table is a total
    /// function and gaps would be silently-defaulted layers.
    pub fn new(specs: Vec<LayerSpec>) -> Result<Self, PhysicsError> {
        for (i, spec) in specs.iter().enumerate() {
            if spec.layer.index() != i {
                return Err(PhysicsError::UnknownLayer(spec.layer));
            }
        }
        Ok(Self { specs })
    }

    /// The standard two-layer setup: `NON_MOVING` and `MOVING`
    pub fn two_layer() -> Self {
        Self {
            specs: vec![
                LayerSpec {
                    layer: CollisionLayer::NON_MOVING,
                    bucket: BroadPhaseLayer::NON_MOVING,
                    moving: false,
                },
                LayerSpec {
                    layer: CollisionLayer::MOVING,
                    bucket: BroadPhaseLayer::MOVING,
                    moving: true,
                },
            ],
        }
    }

    /// Number of configured layers
    pub fn layer_count(&self) -> usize {
        self.specs.len()
    }
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self::two_layer()
    }
}

/// Maps a collision layer to its broad-phase bucket
///
/// The mapping is total and deterministic; consulting it with a layer
/// outside the configured set is an error, never a default.
#[derive(Debug, Clone)]
pub struct BroadPhaseClassifier {
    buckets: Vec<BroadPhaseLayer>,
}

impl BroadPhaseClassifier {
    /// Build the classifier from a layer configuration
    pub fn new(config: &LayerConfig) -> Self {
        Self {
            buckets: config.specs.iter().map(|s| s.bucket).collect(),
        }
    }

    /// Resolve the broad-phase bucket for a collision layer
    pub fn classify(&self, layer: CollisionLayer) -> Result<BroadPhaseLayer, PhysicsError> {
        self.buckets
            .get(layer.index())
            .copied()
            .ok_or(PhysicsError::UnknownLayer(layer))
    }
}

/// Static compatibility table over (CollisionLayer x BroadPhaseLayer)
///
/// Pure data plus a predicate; read-only after construction.
#[derive(Debug, Clone)]
pub struct LayerMatrix {
    /// Whether each layer (by index) is a moving class
    moving: Vec<bool>,

    /// Bucket of each layer (by index)
    buckets: Vec<BroadPhaseLayer>,

    /// Whether each bucket (by raw id) contains at least one moving layer
    bucket_has_moving: Vec<bool>,
}

impl LayerMatrix {
    /// Build the matrix from a layer configuration
    pub fn new(config: &LayerConfig) -> Self {
        let moving: Vec<bool> = config.specs.iter().map(|s| s.moving).collect();
        let buckets: Vec<BroadPhaseLayer> = config.specs.iter().map(|s| s.bucket).collect();

        let max_bucket = buckets.iter().map(|b| b.0 as usize).max().unwrap_or(0);
        let mut bucket_has_moving = vec![false; max_bucket + 1];
        for spec in &config.specs {
            if spec.moving {
                bucket_has_moving[spec.bucket.0 as usize] = true;
            }
        }

        Self {
            moving,
            buckets,
            bucket_has_moving,
        }
    }

    /// Validate that a layer belongs to the configured set
    pub fn validate(&self, layer: CollisionLayer) -> Result<(), PhysicsError> {
        if layer.index() < self.moving.len() {
            Ok(())
        } else {
            Err(PhysicsError::UnknownLayer(layer))
        }
    }

    /// Whether objects on `layer` should be tested against broad-phase
    /// bucket `bucket`
    ///
    /// Pure function over read-only tables; safe to call concurrently from
    /// worker threads. A moving layer collides with every bucket; a
    /// non-moving layer collides only with buckets containing a moving
    /// class. Layers are validated at setup, so an out-of-table layer here
    /// is a programmer error.
    pub fn should_collide(&self, layer: CollisionLayer, bucket: BroadPhaseLayer) -> bool {
        debug_assert!(layer.index() < self.moving.len(), "unvalidated layer {layer:?}");

        match self.moving.get(layer.index()) {
            Some(true) => true,
            Some(false) => self
                .bucket_has_moving
                .get(bucket.0 as usize)
                .copied()
                .unwrap_or(false),
            None => false,
        }
    }

    /// Bitmask with only this layer's bit set (broad-phase group membership)
    pub fn membership_bits(&self, layer: CollisionLayer) -> Result<u32, PhysicsError> {
        self.validate(layer)?;
        Ok(1 << layer.index())
    }

    /// Bitmask of every layer this layer may collide with
    ///
    /// Projection of the matrix into the layer/mask bit model consumed by
    /// backend group filters: bit `i` is set when this layer should collide
    /// with the bucket that layer `i` lives in.
    pub fn filter_bits(&self, layer: CollisionLayer) -> Result<u32, PhysicsError> {
        self.validate(layer)?;

        let mut bits = 0u32;
        for (i, &bucket) in self.buckets.iter().enumerate() {
            if self.should_collide(layer, bucket) {
                bits |= 1 << i;
            }
        }
        Ok(bits)
    }
}
