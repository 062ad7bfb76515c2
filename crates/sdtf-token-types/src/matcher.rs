//! Type compatibility matcher.
//!
//! Answers "which concrete token type is expected at value path P inside a
//! value shaped by this mapping", and whether a candidate type fits there.

use serde_json::Value;

use crate::error::MappingError;
use crate::mapping::{MappingResolver, TokenTypesMapping};
use crate::segment::{format_segments, ValueSegment};

/// Result of a successful match walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    Success,
    Failure { expected_type: String },
}

impl MatchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, MatchOutcome::Success)
    }
}

/// Reads a value from the value being matched, addressed from its root.
///
/// Used to resolve discriminator members such as a color's `model`.
pub type DiscriminatorLookup<'a> = &'a dyn Fn(&[ValueSegment]) -> Option<Value>;

/// Matches `candidate_type` against `mapping` at `value_path`.
///
/// The walk consumes one segment per structural level. A `TokenType` leaf
/// reached with segments left is expanded through `resolver`.
pub fn match_type_against_mapping<R>(
    candidate_type: &str,
    mapping: &TokenTypesMapping,
    value_path: &[ValueSegment],
    resolver: &R,
    lookup: Option<DiscriminatorLookup<'_>>,
) -> Result<MatchOutcome, MappingError>
where
    R: MappingResolver + ?Sized,
{
    let mut walker = Walker {
        candidate: candidate_type,
        resolver,
        lookup,
        consumed: Vec::with_capacity(value_path.len()),
    };
    walker.walk(mapping, value_path)
}

struct Walker<'a, R: ?Sized> {
    candidate: &'a str,
    resolver: &'a R,
    lookup: Option<DiscriminatorLookup<'a>>,
    consumed: Vec<ValueSegment>,
}

impl<R: MappingResolver + ?Sized> Walker<'_, R> {
    fn at(&self) -> String {
        format_segments(&self.consumed)
    }

    fn walk(
        &mut self,
        mapping: &TokenTypesMapping,
        rest: &[ValueSegment],
    ) -> Result<MatchOutcome, MappingError> {
        match mapping {
            TokenTypesMapping::TokenType(name) => {
                if rest.is_empty() {
                    return Ok(if name == self.candidate {
                        MatchOutcome::Success
                    } else {
                        MatchOutcome::Failure {
                            expected_type: name.clone(),
                        }
                    });
                }
                let definition = self
                    .resolver
                    .definition(name)
                    .ok_or_else(|| MappingError::UnknownTokenType(name.clone()))?;
                self.walk(definition, rest)
            }

            TokenTypesMapping::Primitive(p) => {
                if rest.is_empty() {
                    Ok(MatchOutcome::Failure {
                        expected_type: p.type_name(),
                    })
                } else {
                    Err(MappingError::PathPastPrimitive {
                        primitive: p.type_name(),
                        at: self.at(),
                    })
                }
            }

            TokenTypesMapping::ArrayOf(inner) => match rest.first() {
                None => Ok(MatchOutcome::Failure {
                    expected_type: mapping.describe(),
                }),
                Some(ValueSegment::Index(_)) => self.descend(inner, rest),
                Some(ValueSegment::Key(key)) => Err(MappingError::ExpectedIndex {
                    key: key.clone(),
                    at: self.at(),
                }),
            },

            TokenTypesMapping::Tuple(items) => match rest.first() {
                None => Ok(MatchOutcome::Failure {
                    expected_type: mapping.describe(),
                }),
                Some(ValueSegment::Index(i)) => {
                    let item = items.get(*i).ok_or_else(|| MappingError::TupleIndexOutOfRange {
                        index: *i,
                        len: items.len(),
                        at: self.at(),
                    })?;
                    self.descend(item, rest)
                }
                Some(ValueSegment::Key(key)) => Err(MappingError::ExpectedIndex {
                    key: key.clone(),
                    at: self.at(),
                }),
            },

            TokenTypesMapping::MapOf(fields) => match rest.first() {
                None => Ok(MatchOutcome::Failure {
                    expected_type: mapping.describe(),
                }),
                Some(ValueSegment::Key(key)) => {
                    let field = fields.get(key).ok_or_else(|| MappingError::UnknownKey {
                        key: key.clone(),
                        at: self.at(),
                    })?;
                    self.descend(field, rest)
                }
                Some(ValueSegment::Index(index)) => Err(MappingError::ExpectedKey {
                    index: *index,
                    at: self.at(),
                }),
            },

            TokenTypesMapping::UnionOf(branches) => {
                let mut expected = Vec::new();
                let mut first_error = None;
                for branch in branches {
                    let depth = self.consumed.len();
                    let outcome = self.walk(branch, rest);
                    self.consumed.truncate(depth);
                    match outcome {
                        Ok(MatchOutcome::Success) => return Ok(MatchOutcome::Success),
                        Ok(MatchOutcome::Failure { expected_type }) => expected.push(expected_type),
                        Err(e) => {
                            first_error.get_or_insert(e);
                        }
                    }
                }
                if expected.is_empty() {
                    if let Some(e) = first_error {
                        return Err(e);
                    }
                }
                Ok(MatchOutcome::Failure {
                    expected_type: expected.join(" | "),
                })
            }

            TokenTypesMapping::DiscriminatedUnionOf {
                discriminator,
                branches,
            } => {
                if rest.is_empty() {
                    return Ok(MatchOutcome::Failure {
                        expected_type: mapping.describe(),
                    });
                }
                let lookup = self
                    .lookup
                    .ok_or_else(|| MappingError::MissingDiscriminatorLookup {
                        field: discriminator.clone(),
                        at: self.at(),
                    })?;
                let mut field_path = self.consumed.clone();
                field_path.push(ValueSegment::key(discriminator.as_str()));
                let tag = lookup(&field_path)
                    .and_then(|v| v.as_str().map(str::to_owned))
                    .ok_or_else(|| MappingError::MissingDiscriminator {
                        field: discriminator.clone(),
                        at: self.at(),
                    })?;
                let branch = branches.get(&tag).ok_or_else(|| {
                    MappingError::UnknownDiscriminatorValue {
                        field: discriminator.clone(),
                        value: tag.clone(),
                        at: self.at(),
                    }
                })?;
                self.walk(branch, rest)
            }
        }
    }

    fn descend(
        &mut self,
        next: &TokenTypesMapping,
        rest: &[ValueSegment],
    ) -> Result<MatchOutcome, MappingError> {
        self.consumed.push(rest[0].clone());
        self.walk(next, &rest[1..])
    }
}
