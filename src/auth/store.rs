//! SQLite-backed user store.
//!
//! One table: `users (id, username UNIQUE, password_hash, created_at)`.
//! Passwords are hashed with salted PBKDF2-SHA256 before they ever touch the
//! database; the plaintext is dropped at the end of `create_user` /
//! `verify_credentials`.
//!
//! The store holds a single connection behind a `Mutex`. Handlers call it
//! through `web::block` so SQLite's blocking I/O stays off the async workers.

use crate::error::{AppError, AppResult};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use rusqlite::Connection;
use sha2::Sha256;
use std::path::Path;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Salt byte length for password hashing.
const SALT_BYTES: usize = 16;

/// Derived key length.
const HASH_BYTES: usize = 32;

/// PBKDF2 iteration count.
const PBKDF2_ROUNDS: u32 = 100_000;

/// Hash-string prefix, kept in the stored value so the scheme can evolve.
const SCHEME: &str = "pbkdf2-sha256";

/// A registered user.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
}

/// SQLite-backed user store.
pub struct UserStore {
    conn: Mutex<Connection>,
}

impl UserStore {
    /// Open (or create) the user database at the given path.
    pub fn open(db_path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(db_path)?;
        Self::initialize(conn)
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::initialize(conn)
    }

    fn initialize(conn: Connection) -> anyhow::Result<Self> {
        // WAL mode for concurrent reads + crash safety
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Register a new user. Fails with `Conflict` if the username is taken.
    pub fn create_user(&self, username: &str, password: &str) -> AppResult<User> {
        let trimmed = username.trim();
        if trimmed.is_empty() {
            return Err(AppError::ValidationError("Username cannot be empty".into()));
        }
        if trimmed.len() > 80 {
            return Err(AppError::ValidationError(
                "Username too long (max 80 characters)".into(),
            ));
        }
        if password.is_empty() {
            return Err(AppError::ValidationError("Password cannot be empty".into()));
        }

        let password_hash = hash_password(password);
        let now = epoch_secs() as i64;

        let conn = self.conn.lock().unwrap();
        let result = conn.execute(
            "INSERT INTO users (username, password_hash, created_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![trimmed, password_hash, now],
        );

        match result {
            Ok(_) => Ok(User {
                id: conn.last_insert_rowid(),
                username: trimmed.to_string(),
            }),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(AppError::Conflict("User already exists".into()))
            }
            Err(e) => Err(AppError::Internal(format!("User insert failed: {}", e))),
        }
    }

    /// Authenticate by username + password. Fails with `Unauthorized` when
    /// the username is absent or the hash does not match; the two cases are
    /// indistinguishable to the caller.
    pub fn verify_credentials(&self, username: &str, password: &str) -> AppResult<User> {
        let conn = self.conn.lock().unwrap();
        let row: Result<(i64, String), _> = conn.query_row(
            "SELECT id, password_hash FROM users WHERE username = ?1",
            rusqlite::params![username.trim()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        );

        match row {
            Ok((id, stored_hash)) => {
                if !verify_password(password, &stored_hash) {
                    return Err(AppError::Unauthorized("Invalid credentials".into()));
                }
                Ok(User {
                    id,
                    username: username.trim().to_string(),
                })
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                // Dummy hash so unknown usernames cost the same as bad passwords
                let _ = hash_password(password);
                Err(AppError::Unauthorized("Invalid credentials".into()))
            }
            Err(e) => Err(AppError::Internal(format!("User lookup failed: {}", e))),
        }
    }
}

/// Hash a password with a fresh random salt.
/// Stored form: `pbkdf2-sha256$<rounds>$<salt_hex>$<hash_hex>`.
fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut salt);

    let mut derived = [0u8; HASH_BYTES];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, PBKDF2_ROUNDS, &mut derived);

    format!(
        "{}${}${}${}",
        SCHEME,
        PBKDF2_ROUNDS,
        hex::encode(salt),
        hex::encode(derived)
    )
}

/// Recompute the hash with the stored salt and compare in constant time.
fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (scheme, rounds, salt_hex, hash_hex) = match (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) {
        (Some(s), Some(r), Some(salt), Some(hash)) => (s, r, salt, hash),
        _ => return false,
    };

    if scheme != SCHEME {
        return false;
    }
    let rounds: u32 = match rounds.parse() {
        Ok(r) => r,
        Err(_) => return false,
    };
    let salt = match hex::decode(salt_hex) {
        Ok(s) => s,
        Err(_) => return false,
    };
    let expected = match hex::decode(hash_hex) {
        Ok(h) => h,
        Err(_) => return false,
    };

    let mut derived = vec![0u8; expected.len()];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, rounds, &mut derived);

    constant_time_eq(&derived, &expected)
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Current Unix epoch in seconds.
fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_registration_yields_conflict() {
        let store = UserStore::open_in_memory().unwrap();
        store.create_user("alice", "correct horse").unwrap();

        let err = store.create_user("alice", "other password").unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn login_checks_password() {
        let store = UserStore::open_in_memory().unwrap();
        store.create_user("bob", "s3cret").unwrap();

        let user = store.verify_credentials("bob", "s3cret").unwrap();
        assert_eq!(user.username, "bob");

        let err = store.verify_credentials("bob", "wrong").unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn unknown_user_is_unauthorized() {
        let store = UserStore::open_in_memory().unwrap();
        let err = store.verify_credentials("nobody", "anything").unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn plaintext_password_is_never_stored() {
        let store = UserStore::open_in_memory().unwrap();
        store.create_user("carol", "hunter2").unwrap();

        let conn = store.conn.lock().unwrap();
        let stored: String = conn
            .query_row(
                "SELECT password_hash FROM users WHERE username = 'carol'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(!stored.contains("hunter2"));
        assert!(stored.starts_with("pbkdf2-sha256$"));
    }

    #[test]
    fn empty_username_is_rejected() {
        let store = UserStore::open_in_memory().unwrap();
        let err = store.create_user("   ", "password").unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[test]
    fn constant_time_eq_works() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"short", b"longer"));
    }
}
