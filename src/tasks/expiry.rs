//! Expiry scheduler (spec §4.6): periodically asks every live session actor
//! to check its own deadline, then retires sessions that have sat in a
//! terminal state for longer than the configured grace period.
//!
//! Grounded in the teacher's `tasks/expiry.rs` interval-loop shape; the
//! Postgres/Redis sweep is replaced with in-process calls against the
//! [`SessionManager`].

use std::time::Duration;

use chrono::Utc;
use tokio::time;

use crate::AppState;

pub async fn run(state: AppState) {
    let mut interval = time::interval(Duration::from_secs(state.config.expiry_sweep_interval_secs));

    loop {
        interval.tick().await;
        sweep(&state).await;
    }
}

async fn sweep(state: &AppState) {
    let checked = state.manager.sweep_expired().await;
    if checked == 0 {
        return;
    }

    let now = Utc::now();
    let mut retired = 0usize;

    for handle in state.store.list_active() {
        let Some((status, delete_at)) = state.manager.status(handle.session_id).await else { continue };
        let Some(delete_at) = delete_at else { continue };
        if status.is_terminal() && now >= delete_at {
            state.manager.retire(handle.session_id).await;
            retired += 1;
        }
    }

    if retired > 0 {
        tracing::info!(checked, retired, "expiry: retired terminal sessions past grace period");
        metrics::counter!("sessions_retired_total").increment(retired as u64);
    }
}
