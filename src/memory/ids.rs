//! Conversation identifier.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generate an ID intended to have good DB insert locality.
///
/// With feature `uuid_v7` enabled, this uses `Uuid::now_v7()`.
/// Otherwise it falls back to `Uuid::new_v4()`.
#[inline]
#[must_use]
fn uuid_time_ordered() -> Uuid {
    #[cfg(feature = "uuid_v7")]
    {
        Uuid::now_v7()
    }
    #[cfg(not(feature = "uuid_v7"))]
    {
        Uuid::new_v4()
    }
}

/// Identifier of one wizard conversation and of its memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct ConversationId(Uuid);

impl Default for ConversationId {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationId {
    /// Create a new identifier.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(uuid_time_ordered())
    }

    /// Wrap an existing UUID.
    #[inline]
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Borrow the underlying UUID.
    #[inline]
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ConversationId {
    #[inline]
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl FromStr for ConversationId {
    type Err = uuid::Error;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s.trim())?))
    }
}

// ===== Rusqlite integration ================================================

mod rusqlite_impl {
    use super::ConversationId;

    use rusqlite::types::{
        FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Value, ValueRef,
    };

    impl ToSql for ConversationId {
        fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
            // Stored as TEXT so rows stay readable in the sqlite shell
            Ok(ToSqlOutput::Owned(Value::Text(self.0.to_string())))
        }
    }

    impl FromSql for ConversationId {
        fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
            match value {
                ValueRef::Text(t) => {
                    let s = std::str::from_utf8(t).map_err(|e| FromSqlError::Other(Box::new(e)))?;
                    s.parse().map_err(|e| FromSqlError::Other(Box::new(e)))
                }
                _ => Err(FromSqlError::InvalidType),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let id = ConversationId::new();
        let parsed: ConversationId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-uuid".parse::<ConversationId>().is_err());
    }

    #[test]
    fn test_serde_is_transparent() {
        let id = ConversationId::new();
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(json, serde_json::Value::String(id.to_string()));
    }
}
