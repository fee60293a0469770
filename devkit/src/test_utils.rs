/*!
Utilitaires d'assertion pour tests asynchrones
*/

use std::time::{Duration, Instant};

/// Init du logging pour tests (idempotent), piloté par RUST_LOG
pub fn init_test_logging() {
    env_logger::builder().is_test(true).try_init().ok();
}

/// Réévalue `condition` toutes les 10 ms jusqu'à ce qu'elle soit vraie ou que
/// `timeout_ms` soit écoulé. Retourne le dernier résultat.
pub async fn eventually(timeout_ms: u64, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            log::warn!("condition still false after {timeout_ms} ms");
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
