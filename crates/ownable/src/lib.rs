pub mod principal;
pub mod ownership;
pub mod authorizer;

pub use principal::*;
pub use ownership::*;
pub use authorizer::*;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OwnershipError {
    #[error("Unauthorized caller")]
    Unauthorized,

    #[error("An ownership transfer is already pending")]
    TransferAlreadyPending,

    #[error("No ownership transfer is pending")]
    NoTransferPending,

    #[error("New owner must not be the empty principal")]
    InvalidNewOwner,

    #[error("Invalid request signature")]
    InvalidSignature,
}

pub type Result<T> = std::result::Result<T, OwnershipError>;
