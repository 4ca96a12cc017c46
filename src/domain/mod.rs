//! Domain layer - Core authentication entities, rules and contracts

pub mod auth;
pub mod clock;
pub mod error;
pub mod session;
pub mod task;
pub mod token;
pub mod user;

pub use auth::{authorize, AuthError, ClientMetadata, RequestContext, RequestMetadata};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::DomainError;
pub use session::{validate_refresh, RefreshRejection, Session, SessionRepository, SessionState};
pub use task::{
    Broker, DispatchError, EnqueueOptions, Job, JobId, JobOutcome, QueueClass,
    SendVerifyEmailPayload, TaskError, TaskHandler, TASK_SEND_VERIFY_EMAIL,
};
pub use token::{TokenError, TokenId, TokenMaker, TokenPayload};
pub use user::{User, UserRepository, UserUpdate};
