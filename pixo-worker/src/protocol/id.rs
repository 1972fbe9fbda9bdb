//! Task identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Opaque task identifier.
///
/// Ids are chosen by the requester; the executor only compares them. Any
/// string is accepted on the wire, [`TaskId::generate`] is what
/// [`DispatchClient`](crate::client::DispatchClient) uses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Wraps an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh, time-ordered identifier.
    pub fn generate() -> Self {
        Self(format!("task-{}", Ulid::new()))
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = TaskId::generate();
        let b = TaskId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("task-"));
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let id = TaskId::new("a");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""a""#);
    }

    #[test]
    fn test_display() {
        assert_eq!(TaskId::from("slider-3").to_string(), "slider-3");
    }
}
