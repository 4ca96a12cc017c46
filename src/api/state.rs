//! Application state shared by handlers

use std::sync::Arc;

use crate::domain::task::Broker;
use crate::domain::token::TokenMaker;
use crate::domain::user::UserRepository;
use crate::infrastructure::account::AccountService;

#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountService>,
    /// Verifies bearer credentials on protected routes
    pub tokens: Arc<dyn TokenMaker>,
    pub users: Arc<dyn UserRepository>,
    pub broker: Arc<dyn Broker>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("accounts", &self.accounts)
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}
