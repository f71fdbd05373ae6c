use todo_api::v1::ErrorKind;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("item store lock poisoned")]
    Poisoned,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Caller input is malformed or out of range.
    #[error("{0}")]
    InvalidArgument(String),

    /// The item's lifecycle state does not allow the operation.
    #[error("{0}")]
    InvalidState(String),

    #[error("todo item not found: {0}")]
    NotFound(Uuid),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            ServiceError::InvalidState(_) => ErrorKind::InvalidState,
            ServiceError::NotFound(_) => ErrorKind::NotFound,
            ServiceError::Store(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        ServiceError::InvalidArgument(msg.into())
    }

    pub(crate) fn invalid_state(msg: impl Into<String>) -> Self {
        ServiceError::InvalidState(msg.into())
    }
}

pub type Result<T, E = ServiceError> = std::result::Result<T, E>;
