/// Failures reported by a key store primitive.
///
/// These mirror the status codes of the host registry closely enough that
/// the accessor can tell "insufficient buffer" and "end of enumeration"
/// apart from genuine faults.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The key or value does not exist.
    #[error("not found")]
    NotFound,

    /// The enumeration cursor is past the last item.
    #[error("no more items")]
    NoMoreItems,

    /// The caller's buffer is too small; `required` is in the same unit as
    /// the buffer (UTF-16 code units for names, bytes for data).
    #[error("buffer too small: {required} required")]
    MoreData { required: usize },

    /// The caller lacks the rights for the requested access.
    #[error("access denied")]
    AccessDenied,

    /// A key could not be deleted because it still has child keys.
    #[error("key has child keys")]
    NotEmpty,

    /// The handle is closed or was never issued by this store.
    #[error("invalid handle")]
    InvalidHandle,

    /// The value exists but does not hold string data.
    #[error("value is not a string")]
    TypeMismatch,

    /// Any other native status code.
    #[error("system error code {code}")]
    Os { code: u32 },

    /// Snapshot encoding or decoding failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error while reading or writing a snapshot file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
