pub mod acquire;
pub mod config;
pub mod error;
pub mod report;
pub mod stage;

pub use error::AcquireError;

pub type Result<T> = std::result::Result<T, AcquireError>;
