use thiserror::Error;

/// Errors reported by pool configuration and invariant checks
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("pool capacity must be greater than 0")]
    InvalidCapacity,
    #[error("items out of order below depth {depth}")]
    KeyOrder { depth: usize },
    #[error("child priority exceeds its parent's at depth {depth}")]
    HeapOrder { depth: usize },
}
