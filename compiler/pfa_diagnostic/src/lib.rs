//! Error taxonomy for the PFA scoring engine (§7).
//!
//! Five exception kinds, each attached to a different stage of the
//! document → AST → type-check → evaluate pipeline:
//!
//! - [`PFAError::Syntax`] — the document cannot be parsed into an AST.
//! - [`PFAError::Semantic`] — type check or scope violation; aborts
//!   construction of the engine.
//! - [`PFAError::Runtime`] — well-typed but fails during execution
//!   (overflow, bad index, missing key, bad cast).
//! - [`PFAError::User`] — an explicit `error` AST node fired by user code.
//! - [`PFAError::Timeout`] — the per-action deadline was exceeded.
//!
//! Semantic errors abort engine construction entirely. Runtime errors abort
//! only the current action: per-action local variables are discarded, but
//! any cell/pool writes already committed before the failure remain
//! visible (§5, §7).

use std::fmt;

use pfa_ir::{Interner, Type, TypeRegistry};

/// A location within a PFA document, used where available. The external
/// configuration-ingestion component (out of scope here) is what would
/// normally carry source spans; since we consume an already-parsed JSON
/// tree we instead track a breadcrumb path of AST node descriptions.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Location(pub Vec<String>);

impl Location {
    pub fn root() -> Self {
        Location(Vec::new())
    }

    #[must_use]
    pub fn push(&self, segment: impl Into<String>) -> Self {
        let mut path = self.0.clone();
        path.push(segment.into());
        Location(path)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "<root>")
        } else {
            write!(f, "{}", self.0.join("."))
        }
    }
}

/// User-code defined exit code from an `error` AST node, per §3's `Error`
/// node and §7's `PFAUserException`.
pub type UserCode = Option<i32>;

#[derive(thiserror::Error, Debug, Clone)]
pub enum PFAError {
    #[error("PFASyntaxException at {location}: {message}")]
    Syntax { message: String, location: Location },

    #[error("PFASemanticException at {location}: {message}")]
    Semantic { message: String, location: Location },

    #[error("PFARuntimeException at {location}: {message}")]
    Runtime { message: String, location: Location },

    #[error("PFAUserException: {message}")]
    User { message: String, code: UserCode },

    #[error("PFATimeoutException: action exceeded {limit_ms}ms deadline")]
    Timeout { limit_ms: u64 },
}

impl PFAError {
    pub fn syntax(message: impl Into<String>, location: Location) -> Self {
        PFAError::Syntax {
            message: message.into(),
            location,
        }
    }

    pub fn semantic(message: impl Into<String>, location: Location) -> Self {
        PFAError::Semantic {
            message: message.into(),
            location,
        }
    }

    pub fn runtime(message: impl Into<String>, location: Location) -> Self {
        PFAError::Runtime {
            message: message.into(),
            location,
        }
    }

    pub fn user(message: impl Into<String>, code: UserCode) -> Self {
        PFAError::User {
            message: message.into(),
            code,
        }
    }

    pub fn timeout(limit_ms: u64) -> Self {
        PFAError::Timeout { limit_ms }
    }

    /// Convenience for the common "expected `T`, found `U`" semantic error.
    pub fn type_mismatch(
        expected: &Type,
        found: &Type,
        registry: &TypeRegistry,
        interner: &Interner,
        location: Location,
    ) -> Self {
        PFAError::semantic(
            format!(
                "expected type `{}`, found `{}`",
                expected.display(registry, interner),
                found.display(registry, interner),
            ),
            location,
        )
    }

    /// Semantic and syntax errors abort construction; runtime, user, and
    /// timeout errors abort only the in-flight action.
    pub fn aborts_construction(&self) -> bool {
        matches!(self, PFAError::Syntax { .. } | PFAError::Semantic { .. })
    }
}

pub type PFAResult<T> = Result<T, PFAError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_display_joins_with_dots() {
        let loc = Location::root().push("action").push("0");
        assert_eq!(loc.to_string(), "action.0");
    }

    #[test]
    fn semantic_and_syntax_abort_construction() {
        assert!(PFAError::semantic("x", Location::root()).aborts_construction());
        assert!(PFAError::syntax("x", Location::root()).aborts_construction());
        assert!(!PFAError::runtime("x", Location::root()).aborts_construction());
        assert!(!PFAError::user("x", None).aborts_construction());
        assert!(!PFAError::timeout(1000).aborts_construction());
    }
}
