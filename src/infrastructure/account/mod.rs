//! Account infrastructure module

mod service;

pub use service::{
    AccountService, AccountServiceDeps, CreateUserRequest, LoginRequest, LoginResponse,
    RenewAccessResponse, TokenDurations, UpdateUserRequest,
};
