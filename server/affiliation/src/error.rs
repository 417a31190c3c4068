use thiserror::Error;

pub type AffiliationResult<T> = Result<T, AffiliationError>;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AffiliationError {
    #[error("no destination id given")]
    NoDestination,

    #[error("no free channel available to grant")]
    NoChannel,
}
