use crate::models::{Assignment, Catalogue};
use std::collections::BTreeMap;

/// Computes the targets `worker` is responsible for.
///
/// Every group of the catalogue appears in the result. A group whose
/// membership excludes the worker is present but empty; a group that admits
/// the worker is copied in full, targets are not filtered individually.
pub fn resolve(catalogue: &Catalogue, worker: &str) -> Assignment {
    catalogue
        .groups()
        .iter()
        .map(|(name, group)| {
            let targets = if group.admits(worker) {
                group.targets.clone()
            } else {
                BTreeMap::new()
            };
            (name.clone(), targets)
        })
        .collect()
}
