//! Pure data structures carried by commands: the [`User`] and [`Computer`] records.

pub mod computer;
pub mod user;

pub use computer::*;
pub use user::*;
