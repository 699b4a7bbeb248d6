//! Typed side-channel between the reader and downstream filters.
//!
//! The host creates one [`Registry`] per pipeline output and hands it to every
//! stage that produces or consumes out-of-band metadata.

use crate::sil::Sil;
use std::any::Any;
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A registry entry: the key type selects the value type.
pub trait Key: 'static {
    type Value: Any + Send + Sync;

    /// Name of the entry, for diagnostics.
    const NAME: &'static str;
}

/// Gauss localizations in the flat layout of
/// [`ExportedTinyInfo`](crate::tiny_info::ExportedTinyInfo).
#[derive(Clone, Copy, Debug)]
pub struct GaussData;

impl Key for GaussData {
    type Value = Vec<f64>;
    const NAME: &'static str = "GAUSS_DATA";
}

/// Fields, time steps, groups and families of the reader.
#[derive(Clone, Copy, Debug)]
pub struct MetaData;

impl Key for MetaData {
    type Value = Arc<Sil>;
    const NAME: &'static str = "META_DATA";
}

#[derive(Default)]
pub struct Registry {
    entries: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl Registry {
    pub fn set<K: Key>(&mut self, value: K::Value) {
        tracing::trace!(key = K::NAME, "registry set");
        self.entries.insert(TypeId::of::<K>(), Box::new(value));
    }

    pub fn get<K: Key>(&self) -> Option<&K::Value> {
        self.entries
            .get(&TypeId::of::<K>())
            .and_then(|value| value.downcast_ref::<K::Value>())
    }

    pub fn remove<K: Key>(&mut self) -> Option<K::Value> {
        let value = self.entries.remove(&TypeId::of::<K>())?;
        value.downcast::<K::Value>().ok().map(|value| *value)
    }

    pub fn contains<K: Key>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<K>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_entries() {
        let mut registry = Registry::default();
        assert!(registry.get::<GaussData>().is_none());
        registry.set::<GaussData>(vec![1.0, 2.0]);
        assert_eq!(registry.get::<GaussData>(), Some(&vec![1.0, 2.0]));
        assert!(!registry.contains::<MetaData>());
        registry.set::<GaussData>(vec![3.0]);
        assert_eq!(registry.remove::<GaussData>(), Some(vec![3.0]));
        assert!(!registry.contains::<GaussData>());
    }
}
