use thiserror::Error;

/// The facade's single error type (spec §7): every operation either returns
/// plain data (folding its own failures into [`model::ValidationIssue`]s
/// where the spec calls for that) or one of these variants. Each inner
/// error keeps its own `thiserror` message, so this type only adds "which
/// subsystem" framing, never re-describes the failure.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Load(#[from] sources::SourceError),

    #[error(transparent)]
    Normalize(#[from] normalize::NormalizeError),

    #[error(transparent)]
    Cache(#[from] cache::CacheError),

    #[error(transparent)]
    Validate(#[from] validation::ValidationError),

    /// An invariant the core itself is responsible for upholding was
    /// violated (spec §7: distinguished from a caller/data error).
    #[error("internal invariant broken: {0}")]
    InternalInvariantBroken(String),
}
