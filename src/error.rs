use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClockError>;

/// Errors here are all programmer errors: wrong argument, using a clock
/// before setup, or asking `happens_before` to order incomparable
/// timestamps. Cryptographic integrity failures (a chain that doesn't
/// verify, a malformed signature, tampered wire bytes) are never
/// represented here — they're rejected silently by `update()` returning
/// without mutating state, or by `verify*()` returning `false`. See
/// `primitives`/`hash_clock`/`point_clock` for that distinction in
/// practice.
#[derive(Error, Debug)]
pub enum ClockError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("malformed wire data: {0}")]
    Malformed(String),

    #[error("clock has already been set up")]
    AlreadyInitialized,

    #[error("clock has not been set up")]
    Uninitialized,

    #[error("timestamps are incomparable")]
    Incomparable,
}

impl From<String> for ClockError {
    fn from(s: String) -> Self {
        ClockError::InvalidArgument(s)
    }
}

impl From<&str> for ClockError {
    fn from(s: &str) -> Self {
        ClockError::InvalidArgument(s.to_string())
    }
}
