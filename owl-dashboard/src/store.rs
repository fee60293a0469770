/**
 * TELEMETRY STORE - Dernière télémétrie connue par unité OWL
 *
 * RÔLE : Mapping en mémoire UnitId -> TelemetrySnapshot, sans historique.
 * Merge = remplacement inconditionnel, appelé uniquement après un fetch réussi :
 * un fetch en échec ne touche jamais au snapshot existant, il pose seulement
 * le marqueur `last_fetch_failed` que le merge suivant efface.
 *
 * ORDRE : itération stable, dans l'ordre de première apparition des unités.
 */

use crate::models::{TelemetrySnapshot, UnitId};
use indexmap::IndexMap;
use time::OffsetDateTime;

#[derive(Debug, Clone)]
struct StoredTelemetry {
    snapshot: TelemetrySnapshot,
    updated_at: OffsetDateTime,
    last_fetch_failed: bool,
}

/// Vue en lecture d'une entrée du store
#[derive(Debug, Clone, Copy)]
pub struct StoreEntry<'a> {
    pub id: &'a UnitId,
    pub snapshot: &'a TelemetrySnapshot,
    pub updated_at: OffsetDateTime,
    pub last_fetch_failed: bool,
}

#[derive(Debug, Default)]
pub struct TelemetryStore {
    entries: IndexMap<UnitId, StoredTelemetry>,
}

impl TelemetryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remplace le snapshot de l'unité ; aucune validation des plages de valeurs
    pub fn merge(&mut self, id: UnitId, snapshot: TelemetrySnapshot) {
        self.entries.insert(
            id,
            StoredTelemetry {
                snapshot,
                updated_at: OffsetDateTime::now_utc(),
                last_fetch_failed: false,
            },
        );
    }

    /// Marque le dernier fetch de l'unité en échec. Sans snapshot connu : no-op (false).
    pub fn mark_fetch_failed(&mut self, id: &UnitId) -> bool {
        match self.entries.get_mut(id) {
            Some(stored) => {
                stored.last_fetch_failed = true;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &UnitId) -> Option<&TelemetrySnapshot> {
        self.entries.get(id).map(|stored| &stored.snapshot)
    }

    pub fn entry(&self, id: &UnitId) -> Option<StoreEntry<'_>> {
        self.entries.get_key_value(id).map(to_entry)
    }

    /// Horodatage du dernier merge réussi
    pub fn updated_at(&self, id: &UnitId) -> Option<OffsetDateTime> {
        self.entries.get(id).map(|stored| stored.updated_at)
    }

    pub fn last_fetch_failed(&self, id: &UnitId) -> bool {
        self.entries.get(id).is_some_and(|stored| stored.last_fetch_failed)
    }

    pub fn entries(&self) -> impl Iterator<Item = StoreEntry<'_>> {
        self.entries.iter().map(to_entry)
    }

    /// Position de l'unité dans l'ordre d'itération
    pub fn position(&self, id: &UnitId) -> Option<usize> {
        self.entries.get_index_of(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn to_entry<'a>((id, stored): (&'a UnitId, &'a StoredTelemetry)) -> StoreEntry<'a> {
    StoreEntry {
        id,
        snapshot: &stored.snapshot,
        updated_at: stored.updated_at,
        last_fetch_failed: stored.last_fetch_failed,
    }
}
