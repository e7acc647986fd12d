//! Token-checked memo slots.
//!
//! A slot remembers the token it was filled under. Reading with a different
//! token misses, so owners invalidate every slot at once by bumping the
//! token instead of clearing slots one by one.

/// A single memoized value tagged with the token it was computed under.
#[derive(Debug, Clone)]
pub struct VersionedCache<K, T> {
    slot: Option<(K, T)>,
}

impl<K, T> Default for VersionedCache<K, T> {
    fn default() -> Self {
        Self { slot: None }
    }
}

impl<K: PartialEq + Copy, T> VersionedCache<K, T> {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached value, if it was computed under `token`.
    pub fn get(&self, token: K) -> Option<&T> {
        match &self.slot {
            Some((cached, value)) if *cached == token => Some(value),
            _ => None,
        }
    }

    /// Return the cached value or compute, store and return a new one.
    pub fn get_or_try_insert_with<E>(
        &mut self,
        token: K,
        compute: impl FnOnce() -> Result<T, E>,
    ) -> Result<&T, E> {
        let entry = match self.slot.take() {
            Some((cached, value)) if cached == token => (cached, value),
            _ => (token, compute()?),
        };
        let (_, value) = self.slot.insert(entry);
        Ok(value)
    }

    /// Drop the cached value.
    pub fn clear(&mut self) {
        self.slot = None;
    }
}
