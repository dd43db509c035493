pub mod chain;
pub mod config;
pub mod connstr;
pub mod decoder;
pub mod error;
pub mod manager;
pub mod middleware;
pub mod model;
pub mod routes;
pub mod store;
pub mod tasks;
pub mod transport;
pub mod tunnel;
pub mod verify;

pub use error::{CoreError, CoreResult};

use std::sync::Arc;

use crate::chain::ChainAdapter;
use crate::config::Config;
use crate::manager::SessionManager;
use crate::store::SessionStore;
use crate::tunnel::Tunnel;

/// Shared application state accessible in all handlers and background tasks.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn SessionStore>,
    pub chain: Arc<dyn ChainAdapter>,
    pub tunnel: Arc<dyn Tunnel>,
    pub manager: SessionManager,
}
