//! Entity identifier

slotmap::new_key_type! {
    /// Generational entity identifier
    ///
    /// Stale ids (kept across a despawn) fail registry lookups instead of
    /// aliasing a different entity.
    pub struct EntityId;
}
