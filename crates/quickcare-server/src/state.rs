use std::sync::Arc;

use axum::extract::FromRef;

use quickcare_auth::{AuthState, JwtService};
use quickcare_storage::{AppointmentStore, RecordStore, UserStore};

use crate::config::AppConfig;

/// Shared application state handed to every route.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub jwt: Arc<JwtService>,
    pub users: Arc<dyn UserStore>,
    pub appointments: Arc<dyn AppointmentStore>,
    pub records: Arc<dyn RecordStore>,
}

impl AppState {
    /// Wires the state from config and one storage backend implementing
    /// all three store traits.
    pub fn new<S>(config: AppConfig, storage: Arc<S>) -> Self
    where
        S: UserStore + AppointmentStore + RecordStore + 'static,
    {
        let jwt = Arc::new(JwtService::new(
            &config.auth.jwt_secret,
            config.auth.token_ttl_secs,
        ));
        Self {
            config: Arc::new(config),
            jwt,
            users: storage.clone(),
            appointments: storage.clone(),
            records: storage,
        }
    }
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        AuthState::new(state.jwt.clone(), state.users.clone())
    }
}
