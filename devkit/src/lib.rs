/*!
# OWL DevKit - Backend factice et utilitaires de test

Bibliothèque facilitant les tests du dashboard OWL avec:
- Backend HTTP factice (overview, listing flotte, statut par unité)
- Builder de payloads télémétrie, formats legacy et canonique
- Attente active bornée pour les assertions asynchrones
*/

pub mod fake_backend;
pub mod payloads;
pub mod test_utils;

pub use fake_backend::FakeBackend;
pub use payloads::UnitPayload;
pub use test_utils::{eventually, init_test_logging};
