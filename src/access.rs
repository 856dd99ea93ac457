use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use crate::api::ApiError;
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Route {
    #[default]
    Login,
    Console,
}

#[derive(Debug, Default)]
struct RouterState {
    current: Route,
    history: Vec<Route>,
}

/// Where the operator currently is. The TUI follows `current()`.
#[derive(Debug, Clone, Default)]
pub struct Router {
    state: Arc<Mutex<RouterState>>,
}

impl Router {
    pub fn navigate(&self, route: Route) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.current = route;
        state.history.push(route);
    }

    pub fn current(&self) -> Route {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).current
    }

    /// Every navigation so far, oldest first.
    #[cfg(test)]
    pub fn history(&self) -> Vec<Route> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .history
            .clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted,
    Redirected,
}

/// Guards the console and owns the one rule for rejected credentials:
/// evict the session and send the operator back to login.
#[derive(Debug, Clone)]
pub struct Gate {
    session: Session,
    router: Router,
}

impl Gate {
    pub fn new(session: Session, router: Router) -> Self {
        Self { session, router }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Check on (re-)entry into the console. Does not contact the server.
    pub fn enter(&self) -> Access {
        if self.session.is_active() {
            Access::Granted
        } else {
            if self.router.current() != Route::Login {
                self.router.navigate(Route::Login);
            }
            Access::Redirected
        }
    }

    /// Pass an authenticated call's result through the eviction rule.
    pub fn settle<T>(&self, result: Result<T, ApiError>) -> Result<T, ApiError> {
        if let Err(ApiError::Unauthorized) = &result {
            self.evict();
        }
        result
    }

    pub fn logout(&self) {
        info!("operator logged out");
        self.session.clear();
        self.router.navigate(Route::Login);
    }

    fn evict(&self) {
        warn!("credential rejected; evicting session");
        self.session.clear();
        self.router.navigate(Route::Login);
    }
}
