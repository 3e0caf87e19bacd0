//! Reference command executors.
//!
//! [`UserService`] and [`ComputerService`] validate commands and persist them
//! in a [`RecordStore`](crate::store::RecordStore). Each `new()` returns the
//! store actor to spawn and the service wired to it.

pub mod computer;
pub mod error;
pub mod user;

pub use computer::ComputerService;
pub use error::ServiceError;
pub use user::UserService;
