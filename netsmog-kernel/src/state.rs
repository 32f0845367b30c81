use crate::secrets::SecretStore;
use netsmog_contracts::Catalogue;
use parking_lot::RwLock;
use std::sync::Arc;

/// Catalogue et secrets issus d'un même chargement : remplacés ensemble,
/// une requête ne voit jamais l'un sans l'autre.
#[derive(Debug, Default)]
pub struct Registry {
    pub catalogue: Catalogue,
    pub secrets: SecretStore,
}

/// Valeur partagée remplacée en bloc : les lecteurs gardent l'`Arc` qu'ils ont
/// chargé, un rechargement n'affecte que les requêtes suivantes.
pub struct Snapshot<T> {
    inner: Arc<RwLock<Arc<T>>>,
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<T> Snapshot<T> {
    pub fn new(value: T) -> Self {
        Self { inner: Arc::new(RwLock::new(Arc::new(value))) }
    }

    pub fn load(&self) -> Arc<T> {
        Arc::clone(&self.inner.read())
    }

    pub fn replace(&self, value: T) {
        *self.inner.write() = Arc::new(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readers_keep_their_snapshot() {
        let snap = Snapshot::new(vec![1, 2]);
        let before = snap.load();
        snap.replace(vec![3]);
        assert_eq!(*before, vec![1, 2]);
        assert_eq!(*snap.load(), vec![3]);
    }

    #[test]
    fn test_clones_share_the_slot() {
        let a = Snapshot::new(0u32);
        let b = a.clone();
        b.replace(7);
        assert_eq!(*a.load(), 7);
    }

    #[test]
    fn test_registry_swaps_as_one() {
        let registry = Snapshot::new(Registry::default());
        let before = registry.load();
        registry.replace(Registry {
            catalogue: Catalogue::default(),
            secrets: [("w1".to_string(), "hunter2".to_string())].into_iter().collect(),
        });
        assert!(before.secrets.is_empty());
        assert_eq!(registry.load().secrets.lookup("w1").as_deref(), Some("hunter2"));
    }
}
