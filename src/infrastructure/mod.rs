//! Infrastructure layer - Concrete stores, brokers, token makers and services

pub mod account;
pub mod auth;
pub mod observability;
pub mod session;
pub mod storage;
pub mod task;
pub mod user;
