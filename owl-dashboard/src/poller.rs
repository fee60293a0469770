/**
 * POLLER - Cycle de rafraîchissement périodique de la télémétrie
 *
 * RÔLE :
 * Un timer tokio déclenche un cycle par tick. Chaque cycle, dans sa propre task :
 * (a) overview de la flotte -> markers ; (b) listing des unités puis statut de
 * chaque unité, fetchs indépendants -> store + carte de l'unité.
 *
 * ISOLATION DES PANNES :
 * - échec d'un fetch unité : loggé, snapshot existant intact, carte marquée en échec
 * - échec overview : loggé, les markers précédents restent affichés
 * - aucun retry : le tick suivant est le retry
 *
 * CHEVAUCHEMENT : un cycle lent n'empêche pas le suivant de démarrer. Les
 * résultats hors d'ordre sont arbitrés par génération dans le controller.
 *
 * ARRÊT : stop() annule le timer et ferme l'époque du controller ; les requêtes
 * en vol vont au bout mais leurs résultats sont refusés à l'arrivée. Le timer ne
 * garde qu'une référence faible : le dernier handle lâché, il s'arrête aussi.
 */

use crate::client::TelemetrySource;
use crate::controller::DashboardController;
use crate::models::UnitId;
use futures::future::join_all;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

struct PollerInner<S> {
    source: S,
    controller: DashboardController,
    generation: AtomicU64,
    timer: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

pub struct Poller<S> {
    inner: Arc<PollerInner<S>>,
}

impl<S> Clone for Poller<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: TelemetrySource> Poller<S> {
    pub fn new(source: S, controller: DashboardController) -> Self {
        Self {
            inner: Arc::new(PollerInner {
                source,
                controller,
                generation: AtomicU64::new(0),
                timer: parking_lot::Mutex::new(None),
            }),
        }
    }

    pub fn controller(&self) -> &DashboardController {
        &self.inner.controller
    }

    pub fn is_running(&self) -> bool {
        self.inner.timer.lock().is_some()
    }

    /// Démarre le timer (premier cycle immédiat). Doit être appelé dans un runtime tokio.
    pub fn start(&self, interval: Duration) {
        let mut timer = self.inner.timer.lock();
        if timer.is_some() {
            warn!("poller already running, start ignored");
            return;
        }

        let weak: Weak<PollerInner<S>> = Arc::downgrade(&self.inner);
        let epoch = self.inner.controller.epoch();
        *timer = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                if !inner.is_current(epoch) {
                    break;
                }
                tokio::spawn(async move {
                    inner.run_cycle(epoch).await;
                });
            }
        }));

        self.inner.controller.health().mark_poller_running();
        info!("poller started, polling every {} ms", interval.as_millis());
    }

    /// Idempotent. Une fois revenu, plus aucun résultat de cycle déjà lancé n'est appliqué.
    pub fn stop(&self) {
        let mut timer = self.inner.timer.lock();
        self.inner.controller.advance_epoch();
        let Some(handle) = timer.take() else {
            return;
        };
        handle.abort();
        self.inner.controller.health().mark_poller_stopped();
        info!("poller stopped");
    }

    /// Exécute un cycle complet et attend la fin de tous ses fetchs
    pub async fn run_cycle(&self) {
        let epoch = self.inner.controller.epoch();
        self.inner.run_cycle(epoch).await;
    }
}

impl<S: TelemetrySource> PollerInner<S> {
    fn is_current(&self, epoch: u64) -> bool {
        self.controller.epoch() == epoch
    }

    async fn run_cycle(&self, epoch: u64) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.controller.health().record_cycle();
        debug!("cycle {generation} started");

        tokio::join!(self.refresh_overview(epoch, generation), self.refresh_units(epoch, generation));

        debug!("cycle {generation} settled");
    }

    async fn refresh_overview(&self, epoch: u64, generation: u64) {
        match self.source.fetch_overview().await {
            Ok(overview) => {
                self.controller.apply_overview(epoch, generation, &overview);
            }
            Err(e) => {
                warn!("overview fetch failed (cycle {generation}): {e}");
                self.controller.health().record_overview_failure();
            }
        }
    }

    async fn refresh_units(&self, epoch: u64, generation: u64) {
        let fleet = match self.source.fetch_fleet().await {
            Ok(fleet) => fleet,
            Err(e) => {
                warn!("fleet listing fetch failed (cycle {generation}): {e}");
                self.controller.health().record_listing_failure();
                return;
            }
        };
        if !self.is_current(epoch) {
            return;
        }

        join_all(
            fleet
                .keys()
                .map(|id| self.refresh_unit(epoch, generation, id.clone())),
        )
        .await;
    }

    async fn refresh_unit(&self, epoch: u64, generation: u64, id: UnitId) {
        match self.source.fetch_unit_status(&id).await {
            Ok(snapshot) => {
                self.controller.apply_unit_status(epoch, generation, id, snapshot);
            }
            Err(e) => {
                warn!("status fetch for {id} failed (cycle {generation}): {e}");
                self.controller.health().record_unit_failure();
                self.controller.mark_unit_failed(epoch, generation, &id);
            }
        }
    }
}

impl<S> Drop for PollerInner<S> {
    fn drop(&mut self) {
        if let Some(handle) = self.timer.get_mut().take() {
            handle.abort();
            self.controller.health().mark_poller_stopped();
            debug!("poller dropped, timer aborted");
        }
    }
}
