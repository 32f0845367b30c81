/*!
Construction rapide de catalogues de cibles pour les tests
*/

use netsmog_contracts::{Catalogue, ProbeKind, Target, TargetGroup};
use std::collections::BTreeMap;

/// Builder de `Catalogue` : groupes d'abord, cibles ensuite.
///
/// Les cibles créées par [`CatalogueBuilder::target`] utilisent une sonde
/// ping, un intervalle d'une seconde et une seule mesure par cycle.
#[derive(Default)]
pub struct CatalogueBuilder {
    groups: BTreeMap<String, TargetGroup>,
}

impl CatalogueBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Déclare un groupe ; `workers` vide = ouvert à tous.
    pub fn group(mut self, name: &str, workers: &[&str]) -> Self {
        self.groups.entry(name.to_string()).or_default().workers =
            workers.iter().map(|w| w.to_string()).collect();
        self
    }

    pub fn target(self, group: &str, name: &str, host: &str) -> Self {
        self.target_with(group, name, ping(host, 1, 1))
    }

    pub fn target_with(mut self, group: &str, name: &str, target: Target) -> Self {
        self.groups
            .entry(group.to_string())
            .or_default()
            .targets
            .insert(name.to_string(), target);
        self
    }

    pub fn build(self) -> Catalogue {
        Catalogue::new(self.groups)
    }
}

/// Cible ping sans titre ni restriction de workers.
pub fn ping(host: &str, interval: u64, count: u32) -> Target {
    Target {
        title: String::new(),
        probe: ProbeKind::Ping,
        interval,
        count,
        host: host.to_string(),
        workers: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_layout() {
        let catalogue = CatalogueBuilder::new()
            .group("eu", &["paris"])
            .target("eu", "ams", "198.51.100.1")
            .target_with("lab", "gw", ping("192.0.2.1", 30, 5))
            .build();

        assert_eq!(catalogue.target_count(), 2);
        assert_eq!(catalogue.group("eu").unwrap().workers, vec!["paris"]);
        let lab = catalogue.group("lab").unwrap();
        assert!(lab.workers.is_empty());
        assert_eq!(lab.targets["gw"].count, 5);
    }
}
