/**
 * DASHBOARD CONTROLLER - Écrivain unique du store télémétrie et de l'état UI
 *
 * RÔLE :
 * - Côté polling : merge des snapshots réussis dans le store, puis re-rendu
 *   de la grille ; application de l'overview.
 * - Côté utilisateur : transitions UiState (toggles, sélection) puis re-rendu
 *   des seuls noeuds concernés (boutons, panneau vidéo).
 *
 * VERROUS : ordre fixe generations -> store -> document, et ui -> document.
 * Chaque merge est un remplacement atomique sous verrou : une lecture ne voit
 * jamais un snapshot partiel.
 *
 * GÉNÉRATIONS : chaque cycle de polling porte un numéro croissant. Un résultat
 * (succès ou échec) plus ancien que le dernier appliqué pour la même unité, ou
 * une overview plus ancienne que la dernière affichée, est ignoré.
 *
 * ÉPOQUES : le poller capture l'époque au démarrage ; advance_epoch() la change
 * sous le verrou des générations. Une fois advance_epoch() revenu, aucun merge
 * ni rendu issu d'une époque antérieure ne peut plus avoir lieu.
 */

use crate::dom::{actions, Document, HtmlDocument, ATTR_ACTION, ATTR_UNIT};
use crate::health::HealthTracker;
use crate::models::{Overview, TelemetrySnapshot, UnitId};
use crate::render::Renderer;
use crate::state::{new_state, Shared, UiState};
use crate::store::TelemetryStore;
use std::collections::HashMap;
use tracing::{debug, info};

/// Intention utilisateur résolue depuis un élément cliqué
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiAction {
    SelectUnit(UnitId),
    ToggleDetection,
    ToggleRecording,
    ClearSelection,
}

#[derive(Debug, Default)]
struct Generations {
    epoch: u64,
    overview: u64,
    units: HashMap<UnitId, u64>,
}

impl Generations {
    /// Vrai si un résultat (epoch, generation) peut encore être appliqué
    fn admits(&self, epoch: u64, generation: u64, latest: Option<u64>) -> bool {
        epoch == self.epoch && latest.map_or(true, |latest| generation >= latest)
    }
}

#[derive(Clone)]
pub struct DashboardController {
    store: Shared<TelemetryStore>,
    ui: Shared<UiState>,
    document: Shared<HtmlDocument>,
    generations: Shared<Generations>,
    renderer: Renderer,
    health: HealthTracker,
}

impl DashboardController {
    pub fn new(renderer: Renderer, health: HealthTracker) -> Self {
        Self::with_document(HtmlDocument::dashboard(), renderer, health)
    }

    /// Le document est aligné sur l'état UI et le store (vide) dès la construction
    pub fn with_document(document: HtmlDocument, renderer: Renderer, health: HealthTracker) -> Self {
        let controller = Self {
            store: new_state(TelemetryStore::new()),
            ui: new_state(UiState::new()),
            document: new_state(document),
            generations: new_state(Generations::default()),
            renderer,
            health,
        };
        controller.render_ui();
        controller.render_fleet();
        controller
    }

    pub fn health(&self) -> &HealthTracker {
        &self.health
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    // --- côté polling ---

    pub fn epoch(&self) -> u64 {
        self.generations.lock().epoch
    }

    /// Invalide tous les résultats encore en vol ; retourne la nouvelle époque
    pub fn advance_epoch(&self) -> u64 {
        let mut generations = self.generations.lock();
        generations.epoch += 1;
        generations.epoch
    }

    pub fn apply_overview(&self, epoch: u64, generation: u64, overview: &Overview) -> bool {
        let mut generations = self.generations.lock();
        if !generations.admits(epoch, generation, Some(generations.overview)) {
            debug!("dropping overview from cycle {generation} (epoch {epoch})");
            self.health.record_stale_dropped();
            return false;
        }
        generations.overview = generation;

        let mut doc = self.document.lock();
        self.renderer.render_overview(&mut *doc, overview);
        self.health.record_overview_ok();
        true
    }

    /// Retourne false si le résultat est périmé (époque close ou cycle plus ancien)
    pub fn apply_unit_status(&self, epoch: u64, generation: u64, id: UnitId, snapshot: TelemetrySnapshot) -> bool {
        let mut generations = self.generations.lock();
        if !generations.admits(epoch, generation, generations.units.get(&id).copied()) {
            debug!("dropping status of {id} from cycle {generation} (epoch {epoch})");
            self.health.record_stale_dropped();
            return false;
        }
        generations.units.insert(id.clone(), generation);

        let mut store = self.store.lock();
        store.merge(id.clone(), snapshot);
        self.health.record_unit_update();

        let mut doc = self.document.lock();
        self.renderer.render_unit_card(&mut *doc, &store, &id);
        self.health.record_card_render();
        true
    }

    /// Marque l'échec du fetch de `id` pour ce cycle ; le snapshot reste intact
    pub fn mark_unit_failed(&self, epoch: u64, generation: u64, id: &UnitId) -> bool {
        let mut generations = self.generations.lock();
        if !generations.admits(epoch, generation, generations.units.get(id).copied()) {
            debug!("dropping failure of {id} from cycle {generation} (epoch {epoch})");
            return false;
        }
        generations.units.insert(id.clone(), generation);

        let mut store = self.store.lock();
        if !store.mark_fetch_failed(id) {
            return false;
        }
        let mut doc = self.document.lock();
        self.renderer.render_unit_card(&mut *doc, &store, id);
        self.health.record_card_render();
        true
    }

    // --- côté utilisateur ---

    pub fn toggle_detection(&self) -> bool {
        let mut ui = self.ui.lock();
        let active = ui.toggle_detection();
        let mut doc = self.document.lock();
        self.renderer.render_detection_toggle_button(&mut *doc, active);
        info!("detection {}", if active { "on" } else { "off" });
        active
    }

    pub fn toggle_recording(&self) -> bool {
        let mut ui = self.ui.lock();
        let active = ui.toggle_recording();
        let mut doc = self.document.lock();
        self.renderer.render_recording_toggle_button(&mut *doc, active);
        info!("recording {}", if active { "on" } else { "off" });
        active
    }

    pub fn select_unit(&self, id: UnitId) {
        let mut ui = self.ui.lock();
        ui.select_unit(id);
        let mut doc = self.document.lock();
        self.renderer.render_video_panel(&mut *doc, ui.selected_unit());
    }

    pub fn clear_selection(&self) {
        let mut ui = self.ui.lock();
        ui.clear_selection();
        let mut doc = self.document.lock();
        self.renderer.render_video_panel(&mut *doc, None);
    }

    pub fn perform(&self, action: &UiAction) -> UiState {
        match action {
            UiAction::SelectUnit(id) => self.select_unit(id.clone()),
            UiAction::ToggleDetection => {
                self.toggle_detection();
            }
            UiAction::ToggleRecording => {
                self.toggle_recording();
            }
            UiAction::ClearSelection => self.clear_selection(),
        }
        self.ui_state()
    }

    /// Clic sur un élément du document ; None si absent ou sans action
    pub fn click(&self, element_id: &str) -> Option<UiAction> {
        let action = {
            let doc = self.document.lock();
            let element = doc.element(element_id)?;
            match element.attr(ATTR_ACTION)? {
                actions::SELECT_UNIT => UiAction::SelectUnit(element.attr(ATTR_UNIT)?.into()),
                actions::TOGGLE_DETECTION => UiAction::ToggleDetection,
                actions::TOGGLE_RECORDING => UiAction::ToggleRecording,
                actions::CLEAR_SELECTION => UiAction::ClearSelection,
                other => {
                    debug!("unknown action {other} on {element_id}");
                    return None;
                }
            }
        };
        self.perform(&action);
        Some(action)
    }

    // --- lectures ---

    pub fn ui_state(&self) -> UiState {
        self.ui.lock().clone()
    }

    pub fn telemetry(&self, id: &UnitId) -> Option<TelemetrySnapshot> {
        self.store.lock().get(id).cloned()
    }

    pub fn read_store<R>(&self, f: impl FnOnce(&TelemetryStore) -> R) -> R {
        f(&self.store.lock())
    }

    pub fn read_document<R>(&self, f: impl FnOnce(&HtmlDocument) -> R) -> R {
        f(&self.document.lock())
    }

    pub fn document_html(&self) -> String {
        self.document.lock().to_html()
    }

    fn render_fleet(&self) {
        let store = self.store.lock();
        let mut doc = self.document.lock();
        self.renderer.render_grid(&mut *doc, &store);
    }

    fn render_ui(&self) {
        let ui = self.ui.lock();
        let mut doc = self.document.lock();
        self.renderer.render_detection_toggle_button(&mut *doc, ui.detection_active());
        self.renderer.render_recording_toggle_button(&mut *doc, ui.recording_active());
        self.renderer.render_video_panel(&mut *doc, ui.selected_unit());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{anchors, Element};
    use crate::models::UnitStatus;

    fn controller() -> DashboardController {
        DashboardController::new(Renderer::default(), HealthTracker::new())
    }

    fn telemetry(cpu: f64) -> TelemetrySnapshot {
        TelemetrySnapshot {
            cpu_percent: cpu,
            cpu_temp: 45.0,
            detecting: false,
            error: false,
            status: UnitStatus::new("nominal"),
        }
    }

    #[test]
    fn test_initial_render_matches_ui_state() {
        let ctl = controller();
        ctl.read_document(|doc| {
            let btn = doc.element(anchors::DETECTION_BUTTON).unwrap();
            assert!(!btn.has_class("active"));
            assert_eq!(btn.text_content(), "⊕Detection Off");
            assert_eq!(doc.element(anchors::RECORD_BUTTON).unwrap().text_content(), "⏺Record");
            assert!(doc.element(anchors::VIDEO_PANEL).unwrap().has_class("hidden"));
        });
    }

    #[test]
    fn test_toggle_detection_twice_restores_state() {
        let ctl = controller();
        let before = ctl.ui_state();
        let html_before = ctl.document_html();

        assert!(ctl.toggle_detection());
        assert!(ctl.read_document(|d| d.element(anchors::DETECTION_BUTTON).unwrap().has_class("active")));
        assert!(!ctl.toggle_detection());

        assert_eq!(ctl.ui_state(), before);
        assert_eq!(ctl.document_html(), html_before);
    }

    #[test]
    fn test_recording_is_independent_of_detection() {
        let ctl = controller();
        ctl.toggle_recording();
        let ui = ctl.ui_state();
        assert!(ui.recording_active());
        assert!(!ui.detection_active());
        ctl.read_document(|doc| {
            assert!(doc.element(anchors::RECORD_BUTTON).unwrap().has_class("active"));
            assert!(!doc.element(anchors::DETECTION_BUTTON).unwrap().has_class("active"));
        });
    }

    #[test]
    fn test_select_replaces_previous_selection() {
        let ctl = controller();
        ctl.select_unit("0".into());
        ctl.select_unit("1".into());

        assert_eq!(ctl.ui_state().selected_unit(), Some(&UnitId::from("1")));
        ctl.read_document(|doc| {
            let panel = doc.element(anchors::VIDEO_PANEL).unwrap();
            assert!(!panel.has_class("hidden"));
            assert_eq!(panel.attr(ATTR_UNIT), Some("1"));
            assert_eq!(doc.element(anchors::VIDEO_TITLE).unwrap().text(), Some("OWL 2 Video Feed"));
        });

        ctl.clear_selection();
        assert!(ctl.ui_state().selected_unit().is_none());
        assert!(ctl.read_document(|d| d.element(anchors::VIDEO_PANEL).unwrap().has_class("hidden")));
    }

    #[test]
    fn test_click_dispatch() {
        let ctl = controller();
        ctl.apply_unit_status(0, 1, "0".into(), telemetry(10.0));
        ctl.apply_unit_status(0, 1, "1".into(), telemetry(20.0));

        assert_eq!(ctl.click("owl-1"), Some(UiAction::SelectUnit("1".into())));
        assert_eq!(ctl.ui_state().selected_unit(), Some(&UnitId::from("1")));

        assert_eq!(ctl.click(anchors::DETECTION_BUTTON), Some(UiAction::ToggleDetection));
        assert_eq!(ctl.click(anchors::RECORD_BUTTON), Some(UiAction::ToggleRecording));
        assert_eq!(ctl.click(anchors::VIDEO_CLOSE), Some(UiAction::ClearSelection));

        let ui = ctl.ui_state();
        assert!(ui.detection_active());
        assert!(ui.recording_active());
        assert!(ui.selected_unit().is_none());

        // élément sans action, élément absent
        assert_eq!(ctl.click(anchors::GRID), None);
        assert_eq!(ctl.click("owl-42"), None);
        assert_eq!(ctl.ui_state(), ui);
    }

    #[test]
    fn test_polling_never_touches_ui_state() {
        let ctl = controller();
        ctl.select_unit("0".into());
        ctl.toggle_detection();
        let ui = ctl.ui_state();

        ctl.apply_unit_status(0, 1, "0".into(), telemetry(10.0));
        let overview: Overview = [(UnitId::from("0"), telemetry(10.0))].into_iter().collect();
        ctl.apply_overview(0, 1, &overview);

        assert_eq!(ctl.ui_state(), ui);
        assert!(!ctl.read_document(|d| d.element(anchors::VIDEO_PANEL).unwrap().has_class("hidden")));
    }

    #[test]
    fn test_older_generation_is_dropped() {
        let ctl = controller();
        assert!(ctl.apply_unit_status(0, 3, "0".into(), telemetry(30.0)));
        assert!(!ctl.apply_unit_status(0, 2, "0".into(), telemetry(20.0)));
        assert_eq!(ctl.telemetry(&"0".into()).unwrap().cpu_percent, 30.0);

        // même génération ou plus récente : appliquée
        assert!(ctl.apply_unit_status(0, 3, "0".into(), telemetry(31.0)));
        assert!(ctl.apply_unit_status(0, 4, "0".into(), telemetry(40.0)));
        assert_eq!(ctl.telemetry(&"0".into()).unwrap().cpu_percent, 40.0);

        // les générations sont suivies par unité
        assert!(ctl.apply_unit_status(0, 1, "1".into(), telemetry(5.0)));

        let health = ctl.health().get_health(2);
        assert_eq!(health.stale_results_dropped, 1);
        assert_eq!(health.unit_updates, 4);
    }

    #[test]
    fn test_grid_follows_store_after_merge() {
        let ctl = controller();
        ctl.apply_unit_status(0, 1, "0".into(), telemetry(10.0));
        ctl.apply_unit_status(0, 2, "0".into(), telemetry(75.0));

        ctl.read_document(|doc| {
            assert_eq!(doc.element(anchors::GRID).unwrap().children().len(), 1);
            assert_eq!(doc.element("0-cpu").unwrap().text(), Some("CPU: 75%"));
        });
    }

    #[test]
    fn test_document_without_anchors_is_harmless() {
        let ctl = DashboardController::with_document(
            HtmlDocument::new(Element::new("body")),
            Renderer::default(),
            HealthTracker::new(),
        );
        ctl.apply_unit_status(0, 1, "0".into(), telemetry(10.0));
        ctl.toggle_detection();
        ctl.select_unit("0".into());
        assert_eq!(ctl.telemetry(&"0".into()).unwrap().cpu_percent, 10.0);
        assert_eq!(ctl.document_html(), "<!DOCTYPE html><body></body>");
    }

    #[test]
    fn test_advanced_epoch_rejects_late_results() {
        let ctl = controller();
        let epoch = ctl.epoch();
        assert!(ctl.apply_unit_status(epoch, 1, "0".into(), telemetry(10.0)));
        let html = ctl.document_html();

        assert_eq!(ctl.advance_epoch(), epoch + 1);
        assert!(!ctl.apply_unit_status(epoch, 2, "0".into(), telemetry(99.0)));
        assert!(!ctl.mark_unit_failed(epoch, 2, &"0".into()));
        let overview: Overview = [(UnitId::from("0"), telemetry(99.0))].into_iter().collect();
        assert!(!ctl.apply_overview(epoch, 2, &overview));

        assert_eq!(ctl.telemetry(&"0".into()).unwrap().cpu_percent, 10.0);
        assert_eq!(ctl.document_html(), html);

        // la nouvelle époque est acceptée
        assert!(ctl.apply_unit_status(epoch + 1, 3, "0".into(), telemetry(20.0)));
    }

    #[test]
    fn test_older_overview_does_not_replace_newer() {
        let ctl = controller();
        let newer: Overview = [
            (UnitId::from("0"), telemetry(10.0)),
            (UnitId::from("1"), telemetry(20.0)),
        ]
        .into_iter()
        .collect();
        let older: Overview = [(UnitId::from("0"), telemetry(10.0))].into_iter().collect();

        assert!(ctl.apply_overview(0, 2, &newer));
        assert!(!ctl.apply_overview(0, 1, &older));
        assert_eq!(ctl.read_document(|d| d.element(anchors::OVERVIEW).unwrap().children().len()), 2);
        assert_eq!(ctl.health().get_health(0).stale_results_dropped, 1);
    }

    #[test]
    fn test_failed_fetch_marks_card_until_next_success() {
        let ctl = controller();
        ctl.apply_unit_status(0, 2, "1".into(), telemetry(50.0));

        assert!(ctl.mark_unit_failed(0, 3, &"1".into()));
        assert_eq!(ctl.telemetry(&"1".into()).unwrap().cpu_percent, 50.0);
        ctl.read_store(|store| assert!(store.last_fetch_failed(&"1".into())));
        ctl.read_document(|doc| {
            let card = doc.element("owl-1").unwrap();
            assert!(card.has_class("fetch-failed"));
            assert_eq!(doc.element("1-cpu").unwrap().text(), Some("CPU: 50%"));
        });

        // un succès plus ancien que l'échec ne l'efface pas
        assert!(!ctl.apply_unit_status(0, 2, "1".into(), telemetry(45.0)));
        assert!(ctl.apply_unit_status(0, 4, "1".into(), telemetry(55.0)));
        assert!(!ctl.read_document(|d| d.element("owl-1").unwrap().has_class("fetch-failed")));

        // unité jamais vue : rien à marquer
        assert!(!ctl.mark_unit_failed(0, 4, &"9".into()));
        assert!(ctl.read_document(|d| d.element("owl-9").is_none()));
    }
}
