//! Defines the `Error` type for the gibbs library

use std::result;

use thiserror::Error;

use crate::variable::{NumericValue, VarId};

pub type Result<T> = result::Result<T, GibbsError>;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum GibbsError {
    /// A factor was constructed over a scope that violates a constraint,
    /// e.g. a variable with a negative outcome value or a duplicate id.
    #[error("invalid factor scope: {0}")]
    InvalidScope(String),

    /// An assignment referenced a variable id that is not in the scope of
    /// the evaluating factor.
    #[error("unknown variable id among arguments: {0}")]
    UnknownVariable(VarId),

    /// A projection (sum-out / max-out) was requested for a variable that
    /// is not in the factor's scope.
    #[error("variable {0} is not in scope of this factor")]
    NotInScope(VarId),

    /// `sumout_vars` was invoked with an empty variable set.
    #[error("elimination variable set must not be empty")]
    EmptyEliminationSet,

    /// A query referenced variables that are not part of the model.
    #[error("query variables must be a subset of the model variables: {0}")]
    QueryNotSubset(VarId),

    /// An evidence entry referenced a variable id unknown to the model.
    #[error("evidence set contains a variable that is not in the model: {0}")]
    UnknownEvidenceVariable(VarId),

    /// A variable was constructed with an empty outcome set.
    #[error("variable {0} must have a non-empty outcome set")]
    EmptyDomain(VarId),

    /// A value was requested of a variable whose domain does not contain it.
    #[error("variable {var} cannot take the value {value}")]
    ValueOutsideDomain { var: VarId, value: NumericValue },

    /// A table-backed factor function was evaluated at an assignment that
    /// was never produced by the originating operation. This is a usage
    /// contract violation, not a recoverable condition.
    #[error("no table entry for assignment {0}")]
    UnmatchedAssignment(String),
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn display() {
        let err = GibbsError::NotInScope(String::from("A"));
        assert_eq!(err.to_string(), "variable A is not in scope of this factor");

        let err = GibbsError::ValueOutsideDomain {
            var: String::from("B"),
            value: NumericValue::from(3.0),
        };
        assert_eq!(err.to_string(), "variable B cannot take the value 3");
    }
}
