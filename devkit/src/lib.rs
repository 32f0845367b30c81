/*!
# NetSmog DevKit - Doublures et utilitaires de test

Bibliothèque partagée par les tests du kernel et de l'agent:
- Stubs des collaborateurs (stockage, soumission, sonde ICMP)
- Builder de catalogues de cibles
- Harness : fichiers temporaires, tokens, serveur HTTP éphémère
*/

pub mod builders;
pub mod stubs;
pub mod test_utils;

pub use builders::{ping, CatalogueBuilder};
pub use stubs::{MemoryStore, ProbeCall, RecordingSink, ScriptedProber, StoredRow};
pub use test_utils::{TestHarness, TEST_COST};
