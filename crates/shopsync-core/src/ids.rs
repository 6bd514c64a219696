//! Strongly typed identifiers.
//!
//! Newtype wrappers over `Uuid` prevent accidental misuse of different ID
//! types at compile time. Platform-side and authority-side resource
//! identifiers are opaque strings assigned by the respective systems and
//! are deliberately *not* wrapped here.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Error type for ID parsing failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse.
    pub id_type: &'static str,
    /// The underlying UUID parse error message.
    pub message: String,
}

impl Display for ParseIdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to parse {}: {}", self.id_type, self.message)
    }
}

impl std::error::Error for ParseIdError {}

/// Macro to define a strongly-typed ID type.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random ID using UUID v4.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns a reference to the underlying UUID.
            #[must_use]
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self).map_err(|e| ParseIdError {
                    id_type: stringify!($name),
                    message: e.to_string(),
                })
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Identifier for an onboarded store/account whose catalog is synchronized.
    TenantId
}

define_id! {
    /// Identifier for a synchronization job.
    JobId
}

define_id! {
    /// Identifier for a detected conflict record.
    ConflictId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_distinct_types() {
        fn requires_tenant(id: TenantId) -> String {
            id.to_string()
        }

        let tenant = TenantId::new();
        let rendered = requires_tenant(tenant);
        assert_eq!(rendered.len(), 36);
    }

    #[test]
    fn test_id_roundtrip_via_str() {
        let job = JobId::new();
        let parsed: JobId = job.to_string().parse().unwrap();
        assert_eq!(job, parsed);
    }

    #[test]
    fn test_id_parse_failure() {
        let err = "not-a-uuid".parse::<ConflictId>().unwrap_err();
        assert_eq!(err.id_type, "ConflictId");
    }

    #[test]
    fn test_serde_transparent() {
        let tenant = TenantId::new();
        let json = serde_json::to_string(&tenant).unwrap();
        assert_eq!(json, format!("\"{tenant}\""));
        let back: TenantId = serde_json::from_str(&json).unwrap();
        assert_eq!(tenant, back);
    }
}
