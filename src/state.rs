use crate::{config::Config, services::attempt::AttemptService};
use axum::extract::FromRef;

#[derive(Clone)]
pub struct AppState {
    pub attempts: AttemptService,
    pub config: Config,
}

impl FromRef<AppState> for AttemptService {
    fn from_ref(state: &AppState) -> Self {
        state.attempts.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
