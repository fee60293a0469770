/*!
Backend OWL factice pour tests sans flotte réelle

Serveur axum local (port éphémère) qui expose les trois endpoints lus par le
dashboard. Les unités, les pannes et les réponses bloquées se pilotent depuis
le test pendant que le serveur tourne.
*/

use crate::payloads::UnitPayload;
use anyhow::Result;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

#[derive(Default)]
struct Fleet {
    // ordre d'insertion = ordre des clés JSON servies
    units: Vec<(String, UnitPayload)>,
    failing: HashSet<String>,
    held: HashSet<String>,
}

struct BackendState {
    fleet: Mutex<Fleet>,
    overview_fails: AtomicBool,
    gate: Semaphore,
    requests: AtomicUsize,
    pending: AtomicUsize,
}

pub struct FakeBackend {
    addr: SocketAddr,
    state: Arc<BackendState>,
    server: JoinHandle<()>,
}

impl FakeBackend {
    pub async fn start() -> Result<Self> {
        let state = Arc::new(BackendState {
            fleet: Mutex::new(Fleet::default()),
            overview_fails: AtomicBool::new(false),
            gate: Semaphore::new(0),
            requests: AtomicUsize::new(0),
            pending: AtomicUsize::new(0),
        });
        let app = Router::new()
            .route("/system_stats", get(overview))
            .route("/owls", get(fleet_listing))
            .route("/owl/{id}/status", get(unit_status))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                log::error!("fake backend stopped: {e}");
            }
        });
        log::info!("🦉 fake OWL backend on http://{addr}");

        Ok(Self { addr, state, server })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Ajoute ou remplace une unité (position conservée si déjà présente)
    pub fn set_unit(&self, id: &str, payload: UnitPayload) {
        let mut fleet = self.state.fleet.lock();
        match fleet.units.iter_mut().find(|(unit, _)| unit == id) {
            Some((_, existing)) => *existing = payload,
            None => fleet.units.push((id.to_string(), payload)),
        }
    }

    pub fn remove_unit(&self, id: &str) {
        self.state.fleet.lock().units.retain(|(unit, _)| unit != id);
    }

    /// `/owl/{id}/status` répond 503 tant que l'unité n'est pas restaurée
    pub fn fail_unit(&self, id: &str) {
        self.state.fleet.lock().failing.insert(id.to_string());
    }

    pub fn restore_unit(&self, id: &str) {
        self.state.fleet.lock().failing.remove(id);
    }

    pub fn fail_overview(&self, failing: bool) {
        self.state.overview_fails.store(failing, Ordering::SeqCst);
    }

    /// Les requêtes de statut de cette unité restent en attente jusqu'à `release`
    pub fn hold_unit(&self, id: &str) {
        self.state.fleet.lock().held.insert(id.to_string());
    }

    pub fn release(&self) {
        self.state.fleet.lock().held.clear();
        self.state.gate.add_permits(1024);
    }

    /// Requêtes de statut actuellement bloquées
    pub fn pending(&self) -> usize {
        self.state.pending.load(Ordering::SeqCst)
    }

    /// Total des requêtes reçues, tous endpoints confondus
    pub fn requests(&self) -> usize {
        self.state.requests.load(Ordering::SeqCst)
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// Objet JSON dans l'ordre d'insertion des unités (serde_json `preserve_order`)
fn ordered_object(entries: impl Iterator<Item = (String, Value)>) -> Response {
    let map: Map<String, Value> = entries.collect();
    axum::Json(Value::Object(map)).into_response()
}

async fn overview(State(state): State<Arc<BackendState>>) -> Response {
    state.requests.fetch_add(1, Ordering::SeqCst);
    if state.overview_fails.load(Ordering::SeqCst) {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    let fleet = state.fleet.lock();
    ordered_object(fleet.units.iter().map(|(id, p)| (id.clone(), p.overview_json())))
}

async fn fleet_listing(State(state): State<Arc<BackendState>>) -> Response {
    state.requests.fetch_add(1, Ordering::SeqCst);
    let fleet = state.fleet.lock();
    ordered_object(fleet.units.iter().map(|(id, p)| (id.clone(), p.descriptor_json())))
}

async fn unit_status(State(state): State<Arc<BackendState>>, Path(id): Path<String>) -> Response {
    state.requests.fetch_add(1, Ordering::SeqCst);
    let (payload, failing, held) = {
        let fleet = state.fleet.lock();
        let payload = fleet
            .units
            .iter()
            .find(|(unit, _)| *unit == id)
            .map(|(_, p)| p.canonical_json());
        (payload, fleet.failing.contains(&id), fleet.held.contains(&id))
    };

    if held {
        state.pending.fetch_add(1, Ordering::SeqCst);
        let _ = state.gate.acquire().await;
        state.pending.fetch_sub(1, Ordering::SeqCst);
    }

    let Some(payload) = payload else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if failing {
        log::warn!("🚫 simulated failure for unit {id}");
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    axum::Json(payload).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{eventually, init_test_logging};

    #[tokio::test]
    async fn test_serves_units_in_insertion_order() {
        init_test_logging();
        let backend = FakeBackend::start().await.unwrap();
        backend.set_unit("10", UnitPayload::new(1.0, 2.0));
        backend.set_unit("2", UnitPayload::new(3.0, 4.0));
        backend.set_unit("10", UnitPayload::new(5.0, 6.0));

        let body = reqwest::get(format!("{}/owls", backend.base_url()))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(body.find("\"10\"").unwrap() < body.find("\"2\"").unwrap());

        let stats = reqwest::get(format!("{}/system_stats", backend.base_url()))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        let stats: Value = serde_json::from_str(&stats).unwrap();
        assert_eq!(stats["10"]["cpu"], 5.0);
        assert_eq!(backend.requests(), 2);
    }

    #[tokio::test]
    async fn test_failures_and_removal() {
        let backend = FakeBackend::start().await.unwrap();
        backend.set_unit("0", UnitPayload::new(1.0, 2.0));
        let url = format!("{}/owl/0/status", backend.base_url());

        backend.fail_unit("0");
        assert_eq!(reqwest::get(&url).await.unwrap().status(), 503);
        backend.restore_unit("0");
        assert_eq!(reqwest::get(&url).await.unwrap().status(), 200);

        backend.remove_unit("0");
        assert_eq!(reqwest::get(&url).await.unwrap().status(), 404);

        backend.fail_overview(true);
        let stats = reqwest::get(format!("{}/system_stats", backend.base_url())).await.unwrap();
        assert_eq!(stats.status(), 503);
    }

    #[tokio::test]
    async fn test_held_unit_waits_for_release() {
        let backend = FakeBackend::start().await.unwrap();
        backend.set_unit("0", UnitPayload::new(1.0, 2.0));
        backend.hold_unit("0");

        let url = format!("{}/owl/0/status", backend.base_url());
        let request = tokio::spawn(async move { reqwest::get(url).await.map(|r| r.status()) });

        assert!(eventually(2000, || backend.pending() == 1).await);
        assert!(!request.is_finished());

        backend.release();
        assert_eq!(request.await.unwrap().unwrap(), 200);
        assert_eq!(backend.pending(), 0);
    }
}
