use thiserror::Error;

/// Usage errors raised while walking a mapping.
///
/// These describe a malformed question (a selector the mapping cannot
/// answer), not a type mismatch. Mismatches are reported through
/// [`crate::MatchOutcome::Failure`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MappingError {
    #[error("unknown token type \"{0}\"")]
    UnknownTokenType(String),
    #[error("key \"{key}\" is not part of the mapping at \"{at}\"")]
    UnknownKey { key: String, at: String },
    #[error("expected an index at \"{at}\", found key \"{key}\"")]
    ExpectedIndex { key: String, at: String },
    #[error("expected a key at \"{at}\", found index {index}")]
    ExpectedKey { index: usize, at: String },
    #[error("tuple index {index} is out of range (len: {len}) at \"{at}\"")]
    TupleIndexOutOfRange { index: usize, len: usize, at: String },
    #[error("path continues past primitive \"{primitive}\" at \"{at}\"")]
    PathPastPrimitive { primitive: String, at: String },
    #[error("discriminator \"{field}\" is required at \"{at}\" but no lookup was given")]
    MissingDiscriminatorLookup { field: String, at: String },
    #[error("discriminator \"{field}\" is missing at \"{at}\"")]
    MissingDiscriminator { field: String, at: String },
    #[error("discriminator \"{field}\" has unknown value \"{value}\" at \"{at}\"")]
    UnknownDiscriminatorValue {
        field: String,
        value: String,
        at: String,
    },
}
