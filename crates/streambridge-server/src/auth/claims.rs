//! Session claims structure for `Streambridge` auth.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Privilege level attached to a user record and its sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserLevel {
    Admin,
    Streamer,
}

impl UserLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Streamer => "streamer",
        }
    }

    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for UserLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "streamer" => Ok(Self::Streamer),
            other => Err(format!("unknown user level: {other}")),
        }
    }
}

/// Claims embedded in session tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Username the session was issued to.
    pub user: String,
    /// Level of the user at issue time.
    pub level: UserLevel,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiration (unix timestamp).
    pub exp: i64,
}

impl SessionClaims {
    /// Whether the session is expired at `now` (inclusive bound).
    pub const fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn level_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&UserLevel::Admin).unwrap(), "\"admin\"");
        assert_eq!(
            serde_json::from_str::<UserLevel>("\"streamer\"").unwrap(),
            UserLevel::Streamer
        );
        assert!("root".parse::<UserLevel>().is_err());
    }

    #[test]
    fn expiry_bound_is_inclusive() {
        let claims = SessionClaims {
            user: "alice".into(),
            level: UserLevel::Admin,
            iat: 100,
            exp: 160,
        };
        assert!(!claims.is_expired_at(159));
        assert!(claims.is_expired_at(160));
    }
}
