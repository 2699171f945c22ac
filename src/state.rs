// src/state.rs

use std::{sync::Arc, time::Instant};

use axum::extract::FromRef;

use crate::{
    config::Config,
    store::{BlogStore, ContactStore, UserStore},
};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub blogs: Arc<dyn BlogStore>,
    pub contacts: Arc<dyn ContactStore>,
    pub config: Config,
    pub started_at: Instant,
}

impl AppState {
    /// Serves every store seam from one backend.
    pub fn new<S>(store: Arc<S>, config: Config) -> Self
    where
        S: UserStore + BlogStore + ContactStore + 'static,
    {
        Self {
            users: store.clone(),
            blogs: store.clone(),
            contacts: store,
            config,
            started_at: Instant::now(),
        }
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
