//! User account rows.

use super::{Database, StoreError};
use rusqlite::types::Type;
use rusqlite::{OptionalExtension, Row, params};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Access tier. Stored as its numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Admin,
    Gratis,
    Basic,
    Pro,
    Premium,
}

impl Tier {
    pub const ALL: [Tier; 5] = [Tier::Admin, Tier::Gratis, Tier::Basic, Tier::Pro, Tier::Premium];

    pub fn code(self) -> i64 {
        match self {
            Tier::Admin => 0,
            Tier::Gratis => 1,
            Tier::Basic => 2,
            Tier::Pro => 3,
            Tier::Premium => 4,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    pub fn name(self) -> &'static str {
        match self {
            Tier::Admin => "admin",
            Tier::Gratis => "gratis",
            Tier::Basic => "basic",
            Tier::Pro => "pro",
            Tier::Premium => "premium",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accepts a numeric code or a tier name (`free` is an alias of `gratis`).
impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        if let Ok(code) = s.parse::<i64>() {
            return Tier::from_code(code).ok_or_else(|| format!("unknown tier code {code}"));
        }
        match s.as_str() {
            "free" => Ok(Tier::Gratis),
            name => Tier::ALL
                .into_iter()
                .find(|t| t.name() == name)
                .ok_or_else(|| format!("unknown tier {name:?}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub tier: Tier,
    pub created_at: String,
}

impl UserRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let code: i64 = row.get(4)?;
        let tier = Tier::from_code(code).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                Type::Integer,
                format!("unknown tier code {code}").into(),
            )
        })?;
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            password_hash: row.get(3)?,
            tier,
            created_at: row.get(5)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub tier: Tier,
}

const USER_COLUMNS: &str = "id, username, email, password_hash, tier, created_at";

impl Database {
    pub fn list_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))?;
            let rows = stmt.query_map([], UserRecord::from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    pub fn find_user(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
                    [username],
                    UserRecord::from_row,
                )
                .optional()?)
        })
    }

    /// Insert an account. An existing username or email is a
    /// [`StoreError::Conflict`].
    pub fn insert_user(&self, user: &NewUser<'_>) -> Result<i64, StoreError> {
        self.transaction(|tx| {
            let taken: Option<(String, String)> = tx
                .query_row(
                    "SELECT username, email FROM users WHERE username = ?1 OR email = ?2 LIMIT 1",
                    params![user.username, user.email],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            if let Some((username, _)) = taken {
                let what = if username == user.username {
                    format!("username {:?}", user.username)
                } else {
                    format!("email {:?}", user.email)
                };
                return Err(StoreError::Conflict(format!("{what} already exists")));
            }

            tx.execute(
                "INSERT INTO users (username, email, password_hash, tier, created_at) VALUES (?1, ?2, ?3, ?4, datetime('now'))",
                params![user.username, user.email, user.password_hash, user.tier.code()],
            )?;
            Ok(tx.last_insert_rowid())
        })
    }

    /// Returns false when no such user existed.
    pub fn delete_user(&self, username: &str) -> Result<bool, StoreError> {
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM users WHERE username = ?1", [username])? > 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user<'a>(username: &'a str, email: &'a str) -> NewUser<'a> {
        NewUser {
            username,
            email,
            password_hash: "pbkdf2:sha256:1$salt$00",
            tier: Tier::Basic,
        }
    }

    #[test]
    fn tier_codes_round_trip() {
        for tier in Tier::ALL {
            assert_eq!(Tier::from_code(tier.code()), Some(tier));
        }
        assert_eq!(Tier::from_code(7), None);
    }

    #[test]
    fn tier_parses_names_and_codes() {
        assert_eq!("0".parse::<Tier>().unwrap(), Tier::Admin);
        assert_eq!("Premium".parse::<Tier>().unwrap(), Tier::Premium);
        assert_eq!("free".parse::<Tier>().unwrap(), Tier::Gratis);
        assert!("9".parse::<Tier>().is_err());
        assert!("gold".parse::<Tier>().is_err());
    }

    #[test]
    fn insert_find_and_list() {
        let db = Database::open_in_memory().unwrap();
        let id = db.insert_user(&new_user("marie", "marie@example.com")).unwrap();

        let user = db.find_user("marie").unwrap().unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.email, "marie@example.com");
        assert_eq!(user.tier, Tier::Basic);
        assert!(!user.created_at.is_empty());

        assert_eq!(db.list_users().unwrap().len(), 1);
        assert_eq!(db.find_user("paul").unwrap(), None);
    }

    #[test]
    fn duplicate_username_is_conflict() {
        let db = Database::open_in_memory().unwrap();
        db.insert_user(&new_user("marie", "marie@example.com")).unwrap();
        let result = db.insert_user(&new_user("marie", "other@example.com"));
        assert!(matches!(result, Err(StoreError::Conflict(msg)) if msg.contains("username")));
    }

    #[test]
    fn duplicate_email_is_conflict() {
        let db = Database::open_in_memory().unwrap();
        db.insert_user(&new_user("marie", "marie@example.com")).unwrap();
        let result = db.insert_user(&new_user("paul", "marie@example.com"));
        assert!(matches!(result, Err(StoreError::Conflict(msg)) if msg.contains("email")));
    }

    #[test]
    fn delete_reports_whether_user_existed() {
        let db = Database::open_in_memory().unwrap();
        db.insert_user(&new_user("marie", "marie@example.com")).unwrap();
        assert!(db.delete_user("marie").unwrap());
        assert!(!db.delete_user("marie").unwrap());
    }

    #[test]
    fn password_hash_not_serialized() {
        let db = Database::open_in_memory().unwrap();
        db.insert_user(&new_user("marie", "marie@example.com")).unwrap();
        let json = serde_json::to_string(&db.find_user("marie").unwrap().unwrap()).unwrap();
        assert!(!json.contains("pbkdf2"));
        assert!(json.contains("\"tier\":\"basic\""));
    }
}
