use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Batch size cannot be zero.
    #[error("`batch.max_size` cannot be zero")]
    BatchSizeZero,
    /// The poll loop needs at least one attempt.
    #[error("`athena.max_poll_attempts` cannot be zero")]
    MaxPollAttemptsZero,
    /// A table name that would be interpolated into a query is not a plain identifier.
    #[error("Invalid table name `{0}`: only ASCII letters, digits, `_` and `.` are allowed")]
    InvalidTableName(String),
    /// The query result location must point into an object store bucket.
    #[error("Invalid `athena.output_location` `{0}`: expected an `s3://` URI")]
    InvalidOutputLocation(String),
    /// TLS is enabled but no trusted root certificates are provided.
    #[error("Invalid TLS config: `trusted_root_certs` must be set when `enabled` is true")]
    MissingTrustedRootCerts,
    /// A Neon section was given without a project id.
    #[error("Invalid Neon config: `project_id` cannot be empty")]
    MissingNeonProjectId,
}
