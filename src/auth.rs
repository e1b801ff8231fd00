//! Password hashing and login sessions.
//!
//! Hashes use the `method$salt$hash` layout:
//!
//! ```text
//! pbkdf2:sha256:600000$Xq3v9LmP0aZr2TkB$5f1c…
//! └─ method ──────────┘└─ salt ────────┘└─ hex digest ─┘
//! ```
//!
//! The salt string's UTF-8 bytes are the PBKDF2 salt, so hashes produced by
//! other tools using the same layout verify here. Only `pbkdf2:sha256` is
//! understood; any other method never verifies.
//!
//! Sessions live in memory and are keyed by a random token carried in a
//! cookie. A session expires [`SESSION_TTL`] after login; expired entries are
//! dropped on lookup and whenever a new session is opened. Restarting the
//! server logs everyone out.

use crate::store::{Tier, UserRecord};
use parking_lot::Mutex;
use rand::Rng;
use rand::distr::Alphanumeric;
use ring::rand::{SecureRandom, SystemRandom};
use ring::{digest, pbkdf2};
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::warn;

const METHOD: &str = "pbkdf2:sha256";
const DEFAULT_ITERATIONS: u32 = 600_000;
const SALT_LEN: usize = 16;
const TOKEN_BYTES: usize = 32;
static ALGORITHM: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA256;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("password must not be empty")]
    EmptyPassword,
    #[error("system random source failed")]
    Random,
}

/// Hash `password` with a fresh salt.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    hash_password_with(password, DEFAULT_ITERATIONS)
}

/// [`hash_password`] with an explicit iteration count.
pub fn hash_password_with(password: &str, iterations: u32) -> Result<String, AuthError> {
    if password.is_empty() {
        return Err(AuthError::EmptyPassword);
    }
    let iterations = NonZeroU32::new(iterations).unwrap_or(NonZeroU32::MIN);
    let salt: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SALT_LEN)
        .map(char::from)
        .collect();

    let mut out = [0u8; digest::SHA256_OUTPUT_LEN];
    pbkdf2::derive(ALGORITHM, iterations, salt.as_bytes(), password.as_bytes(), &mut out);
    Ok(format!("{METHOD}:{iterations}${salt}${}", hex::encode(out)))
}

/// Check `password` against a stored hash. Malformed hashes never match.
pub fn verify_password(stored: &str, password: &str) -> bool {
    let Some((method, salt, digest_hex)) = split_hash(stored) else {
        warn!("malformed password hash");
        return false;
    };
    let Some(iterations) = method
        .strip_prefix(METHOD)
        .and_then(|rest| rest.strip_prefix(':'))
        .and_then(|n| n.parse::<u32>().ok())
        .and_then(NonZeroU32::new)
    else {
        warn!(method, "unsupported password hash method");
        return false;
    };
    let Ok(expected) = hex::decode(digest_hex) else {
        return false;
    };
    pbkdf2::verify(ALGORITHM, iterations, salt.as_bytes(), password.as_bytes(), &expected).is_ok()
}

fn split_hash(stored: &str) -> Option<(&str, &str, &str)> {
    let mut parts = stored.splitn(3, '$');
    Some((parts.next()?, parts.next()?, parts.next()?))
}

// ============================================================================
// Sessions
// ============================================================================

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "frflashy_session";

/// How long a login lasts.
pub const SESSION_TTL: Duration = Duration::from_secs(12 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub username: String,
    pub tier: Tier,
}

struct Entry {
    session: Session,
    issued_at: Instant,
}

/// In-memory session table shared by all requests.
pub struct SessionStore {
    rng: SystemRandom,
    ttl: Duration,
    sessions: Mutex<HashMap<String, Entry>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_ttl(SESSION_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            rng: SystemRandom::new(),
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Open a session for `user`, returning its token.
    pub fn create(&self, user: &UserRecord) -> Result<String, AuthError> {
        let mut bytes = [0u8; TOKEN_BYTES];
        self.rng.fill(&mut bytes).map_err(|_| AuthError::Random)?;
        let token = hex::encode(bytes);
        let now = Instant::now();
        let mut sessions = self.sessions.lock();
        sessions.retain(|_, entry| now.duration_since(entry.issued_at) < self.ttl);
        sessions.insert(
            token.clone(),
            Entry {
                session: Session {
                    username: user.username.clone(),
                    tier: user.tier,
                },
                issued_at: now,
            },
        );
        Ok(token)
    }

    /// The live session for `token`. An expired one is removed.
    pub fn get(&self, token: &str) -> Option<Session> {
        let mut sessions = self.sessions.lock();
        let entry = sessions.get(token)?;
        if entry.issued_at.elapsed() < self.ttl {
            return Some(entry.session.clone());
        }
        sessions.remove(token);
        None
    }

    pub fn remove(&self, token: &str) -> Option<Session> {
        self.sessions.lock().remove(token).map(|entry| entry.session)
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Find the session token in a `Cookie` header value.
pub fn token_from_cookie_header(header: &str) -> Option<&str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}
