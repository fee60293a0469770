use crate::models::UnitId;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

pub type Shared<T> = Arc<Mutex<T>>;

pub fn new_state<T>(value: T) -> Shared<T> {
    Arc::new(Mutex::new(value))
}

/// État d'interaction local à la session : jamais persisté, jamais modifié par le polling.
/// Un seul écrivain (le controller), le renderer ne fait que lire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UiState {
    detection_active: bool,
    recording_active: bool,
    selected_unit: Option<UnitId>,
}

impl UiState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn detection_active(&self) -> bool {
        self.detection_active
    }

    pub fn recording_active(&self) -> bool {
        self.recording_active
    }

    pub fn selected_unit(&self) -> Option<&UnitId> {
        self.selected_unit.as_ref()
    }

    /// Bascule la détection, retourne le nouvel état
    pub fn toggle_detection(&mut self) -> bool {
        self.detection_active = !self.detection_active;
        self.detection_active
    }

    /// Indépendant de la détection
    pub fn toggle_recording(&mut self) -> bool {
        self.recording_active = !self.recording_active;
        self.recording_active
    }

    /// Remplace silencieusement la sélection précédente, qui est retournée
    pub fn select_unit(&mut self, id: UnitId) -> Option<UnitId> {
        self.selected_unit.replace(id)
    }

    pub fn clear_selection(&mut self) -> Option<UnitId> {
        self.selected_unit.take()
    }
}
