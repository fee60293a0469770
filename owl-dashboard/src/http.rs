/**
 * API HTTP OWL DASHBOARD - Rendu du dashboard et vues JSON
 *
 * RÔLE :
 * Expose le document rendu, la télémétrie du store et l'état UI.
 * Les routes UI passent toutes par le controller (écrivain unique).
 *
 * FONCTIONNEMENT :
 * - GET /            -> HTML du document courant
 * - GET /fleet       -> vues par unité, ordre du store, couleurs de sévérité
 * - GET /ui, POST/PUT/DELETE /ui/... -> transitions UiState
 * - /health, /system/health -> supervision
 *
 * Aucune route n'émet de requête vers le backend OWL.
 */

use crate::controller::DashboardController;
use crate::models::UnitId;
use crate::render::Renderer;
use crate::store::StoreEntry;
use crate::state::UiState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use time::{format_description::well_known::Rfc3339, Duration, OffsetDateTime};

#[derive(serde::Serialize)]
struct UnitView {
    unit_id: UnitId,
    label: String,
    cpu_percent: f64,
    cpu_temp: f64,
    detecting: bool,
    error: bool,
    status: String,
    cpu_color: String,
    temp_color: String,
    updated_at: String,      // RFC3339
    stale: bool,             // true si > stale_after_secs
    stale_for_seconds: i64,  // âge en secondes
    last_fetch_failed: bool, // dernier fetch du statut en échec, valeurs conservées
}

fn to_view(renderer: &Renderer, stale_after_secs: i64, entry: StoreEntry<'_>) -> UnitView {
    let t = entry.snapshot;
    let age = OffsetDateTime::now_utc() - entry.updated_at;
    UnitView {
        unit_id: entry.id.clone(),
        label: entry.id.label(),
        cpu_percent: t.cpu_percent,
        cpu_temp: t.cpu_temp,
        detecting: t.detecting,
        error: t.error,
        status: t.status.as_str().to_string(),
        cpu_color: renderer.cpu_color(t.cpu_percent).to_string(),
        temp_color: renderer.temp_color(t.cpu_temp).to_string(),
        updated_at: entry.updated_at.format(&Rfc3339).unwrap_or_default(),
        stale: age > Duration::seconds(stale_after_secs),
        stale_for_seconds: age.whole_seconds().max(0),
        last_fetch_failed: entry.last_fetch_failed,
    }
}

#[derive(Clone)]
pub struct AppState {
    pub controller: DashboardController,
    pub stale_after_secs: i64,
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/system/health", get(get_system_health))
        .route("/", get(get_dashboard))
        .route("/fleet", get(get_fleet))
        .route("/fleet/{id}", get(get_unit))
        .route("/ui", get(get_ui))
        .route("/ui/detection/toggle", post(toggle_detection))
        .route("/ui/recording/toggle", post(toggle_recording))
        .route("/ui/selection/{id}", put(select_unit))
        .route("/ui/selection", delete(clear_selection))
        .route("/ui/click/{element_id}", post(click))
        .with_state(app_state)
}

// GET /system/health
async fn get_system_health(State(app): State<AppState>) -> Json<crate::health::DashboardHealth> {
    let ctl = &app.controller;
    let units = ctl.read_store(|store| store.len());
    Json(ctl.health().get_health(units))
}

// GET / (document rendu)
async fn get_dashboard(State(app): State<AppState>) -> Html<String> {
    Html(app.controller.document_html())
}

// GET /fleet (liste, ordre de première apparition)
async fn get_fleet(State(app): State<AppState>) -> Json<Vec<UnitView>> {
    let renderer = *app.controller.renderer();
    let list = app.controller.read_store(|store| {
        store
            .entries()
            .map(|entry| to_view(&renderer, app.stale_after_secs, entry))
            .collect()
    });
    Json(list)
}

// GET /fleet/{id} (détail)
async fn get_unit(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UnitView>, StatusCode> {
    let id = UnitId::new(id);
    let renderer = *app.controller.renderer();
    app.controller
        .read_store(|store| {
            store
                .entry(&id)
                .map(|entry| to_view(&renderer, app.stale_after_secs, entry))
        })
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

// GET /ui
async fn get_ui(State(app): State<AppState>) -> Json<UiState> {
    Json(app.controller.ui_state())
}

async fn toggle_detection(State(app): State<AppState>) -> Json<UiState> {
    app.controller.toggle_detection();
    Json(app.controller.ui_state())
}

async fn toggle_recording(State(app): State<AppState>) -> Json<UiState> {
    app.controller.toggle_recording();
    Json(app.controller.ui_state())
}

// PUT /ui/selection/{id} : toute unité, connue du store ou non
async fn select_unit(State(app): State<AppState>, Path(id): Path<String>) -> Json<UiState> {
    app.controller.select_unit(UnitId::new(id));
    Json(app.controller.ui_state())
}

async fn clear_selection(State(app): State<AppState>) -> Json<UiState> {
    app.controller.clear_selection();
    Json(app.controller.ui_state())
}

// POST /ui/click/{element_id} : 404 si l'élément n'existe pas ou n'a pas d'action
async fn click(
    State(app): State<AppState>,
    Path(element_id): Path<String>,
) -> Result<Json<UiState>, StatusCode> {
    match app.controller.click(&element_id) {
        Some(_) => Ok(Json(app.controller.ui_state())),
        None => Err(StatusCode::NOT_FOUND),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::HealthTracker;
    use crate::models::{TelemetrySnapshot, UnitStatus};
    use serde_json::Value;
    use tokio::net::TcpListener;

    fn telemetry(cpu: f64, temp: f64) -> TelemetrySnapshot {
        TelemetrySnapshot {
            cpu_percent: cpu,
            cpu_temp: temp,
            detecting: false,
            error: false,
            status: UnitStatus::new("nominal"),
        }
    }

    async fn json_body(
        response: impl std::future::Future<Output = reqwest::Result<reqwest::Response>>,
    ) -> Value {
        let text = response.await.unwrap().text().await.unwrap();
        serde_json::from_str(&text).unwrap()
    }

    async fn serve(stale_after_secs: i64) -> (String, DashboardController) {
        let controller = DashboardController::new(Renderer::default(), HealthTracker::new());
        let app = build_router(AppState {
            controller: controller.clone(),
            stale_after_secs,
        });
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), controller)
    }

    #[tokio::test]
    async fn test_fleet_views_follow_store() {
        let (base, ctl) = serve(10).await;
        ctl.apply_unit_status(0, 1, "0".into(), telemetry(0.0, 40.0));
        ctl.apply_unit_status(0, 1, "1".into(), telemetry(100.0, 90.0));

        let fleet = json_body(reqwest::get(format!("{base}/fleet"))).await;
        assert_eq!(fleet.as_array().unwrap().len(), 2);
        assert_eq!(fleet[0]["unit_id"], "0");
        assert_eq!(fleet[0]["label"], "OWL 1");
        assert_eq!(fleet[0]["cpu_color"], "hsl(120, 70%, 50%)");
        assert_eq!(fleet[1]["cpu_color"], "hsl(0, 70%, 50%)");
        assert_eq!(fleet[1]["stale"], false);

        let unit = json_body(reqwest::get(format!("{base}/fleet/1"))).await;
        assert_eq!(unit["cpu_percent"], 100.0);
        assert_eq!(unit["last_fetch_failed"], false);

        ctl.mark_unit_failed(0, 2, &"1".into());
        let unit = json_body(reqwest::get(format!("{base}/fleet/1"))).await;
        assert_eq!(unit["last_fetch_failed"], true);
        assert_eq!(unit["cpu_percent"], 100.0);

        let missing = reqwest::get(format!("{base}/fleet/42")).await.unwrap();
        assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_negative_threshold_marks_everything_stale() {
        let (base, ctl) = serve(-1).await;
        ctl.apply_unit_status(0, 1, "0".into(), telemetry(10.0, 40.0));
        let fleet = json_body(reqwest::get(format!("{base}/fleet"))).await;
        assert_eq!(fleet[0]["stale"], true);
    }

    #[tokio::test]
    async fn test_ui_routes_drive_transitions() {
        let (base, ctl) = serve(10).await;
        let client = reqwest::Client::new();

        let ui = json_body(client.post(format!("{base}/ui/detection/toggle")).send()).await;
        assert_eq!(ui["detection_active"], true);
        assert_eq!(ui["recording_active"], false);

        let ui = json_body(client.put(format!("{base}/ui/selection/3")).send()).await;
        assert_eq!(ui["selected_unit"], "3");
        assert!(ctl.document_html().contains("OWL 4 Video Feed"));

        let ui = json_body(client.delete(format!("{base}/ui/selection")).send()).await;
        assert!(ui["selected_unit"].is_null());

        let ui = json_body(client.post(format!("{base}/ui/click/recordButton")).send()).await;
        assert_eq!(ui["recording_active"], true);

        let res = client.post(format!("{base}/ui/click/owlGrid")).send().await.unwrap();
        assert_eq!(res.status(), reqwest::StatusCode::NOT_FOUND);

        let ui = json_body(reqwest::get(format!("{base}/ui"))).await;
        assert_eq!(ui["detection_active"], true);
        assert_eq!(ui["recording_active"], true);
    }

    #[tokio::test]
    async fn test_dashboard_and_health() {
        let (base, ctl) = serve(10).await;
        ctl.apply_unit_status(0, 1, "0".into(), telemetry(10.0, 40.0));

        let html = reqwest::get(format!("{base}/")).await.unwrap().text().await.unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("id=\"owl-0\""));

        assert_eq!(reqwest::get(format!("{base}/health")).await.unwrap().text().await.unwrap(), "ok");
        let health = json_body(reqwest::get(format!("{base}/system/health"))).await;
        assert_eq!(health["units_tracked"], 1);
        assert_eq!(health["card_renders"], 1);
        assert_eq!(health["poller_status"], "idle");
    }
}
