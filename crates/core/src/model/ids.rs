use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error type for parsing ID from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            #[must_use]
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            /// Returns the underlying u64 value
            #[must_use]
            pub const fn value(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<u64>()
                    .map($name::new)
                    .map_err(|_| ParseIdError {
                        kind: stringify!($name),
                    })
            }
        }
    };
}

define_id!(
    /// Learner identity as yielded by the auth collaborator.
    UserId
);
define_id!(AssessmentId);
define_id!(QuestionId);
define_id!(
    /// Identifier of an answer option. Options are presented sorted by this id.
    OptionId
);
define_id!(AttemptId);
define_id!(
    /// Snapshot row of a question inside one attempt.
    ///
    /// Ids are handed out monotonically, so ordering by id reproduces the
    /// order in which the snapshot was taken.
    AttemptQuestionId
);
define_id!(UserAnswerId);
define_id!(ModuleId);
define_id!(CourseId);
define_id!(LearningPathId);

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempt_id_display() {
        let id = AttemptId::new(42);
        assert_eq!(id.to_string(), "42");
        assert_eq!(format!("{id:?}"), "AttemptId(42)");
    }

    #[test]
    fn option_id_from_str() {
        let id: OptionId = " 123 ".parse().unwrap();
        assert_eq!(id, OptionId::new(123));
    }

    #[test]
    fn module_id_from_str_invalid() {
        let err = "not-a-number".parse::<ModuleId>().unwrap_err();
        assert_eq!(err.to_string(), "failed to parse ModuleId from string");
    }

    #[test]
    fn ids_order_by_value() {
        assert!(AttemptQuestionId::new(2) < AttemptQuestionId::new(10));
    }
}
