pub mod expiry;

use crate::AppState;

pub fn spawn_all(state: AppState) {
    tokio::spawn(expiry::run(state));
    tracing::info!("Background tasks spawned");
}
