use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use tracing::{debug, info};

use super::access::Identity;
use super::domain::UserId;
use super::repository::{RecordStore, RepositoryError};

/// Resolves request credentials to a caller identity.
pub trait IdentityProvider: Send + Sync {
    fn identify(&self, token: &str) -> Result<Identity, IdentityError>;
}

/// Error raised while resolving or issuing credentials.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("authentication required")]
    Unauthenticated,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// Issued session for a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub identity: Identity,
}

/// Credentials sign-in backed by the record store's user table.
///
/// Tokens are opaque random strings held in process memory; restarting the service signs
/// everyone out.
pub struct SessionDirectory<S> {
    store: Arc<S>,
    sessions: Mutex<HashMap<String, UserId>>,
}

impl<S> SessionDirectory<S>
where
    S: RecordStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Verify email and password and open a session. Unknown email and a wrong password are
    /// reported identically.
    pub fn sign_in(&self, email: &str, password: &str) -> Result<Session, IdentityError> {
        let user = self
            .store
            .user_by_email(email)?
            .ok_or(IdentityError::Unauthenticated)?;

        if !verify_password(password, &user.password_hash) {
            debug!(user_id = %user.id, "password mismatch");
            return Err(IdentityError::Unauthenticated);
        }

        let token = generate_token();
        self.sessions
            .lock()
            .map_err(|_| lock_poisoned())?
            .insert(token.clone(), user.id);

        info!(user_id = %user.id, role = %user.role, "session opened");
        Ok(Session {
            token,
            identity: Identity {
                user_id: user.id,
                role: user.role,
                tenant_id: user.tenant_id,
            },
        })
    }

    /// Drop a session. Returns whether the token was live.
    pub fn sign_out(&self, token: &str) -> Result<bool, IdentityError> {
        Ok(self
            .sessions
            .lock()
            .map_err(|_| lock_poisoned())?
            .remove(token)
            .is_some())
    }
}

impl<S> IdentityProvider for SessionDirectory<S>
where
    S: RecordStore + 'static,
{
    fn identify(&self, token: &str) -> Result<Identity, IdentityError> {
        let user_id = self
            .sessions
            .lock()
            .map_err(|_| lock_poisoned())?
            .get(token)
            .copied()
            .ok_or(IdentityError::Unauthenticated)?;

        // Role and firm are read fresh so changes apply to open sessions.
        let user = self
            .store
            .user(&user_id)?
            .ok_or(IdentityError::Unauthenticated)?;

        Ok(Identity {
            user_id: user.id,
            role: user.role,
            tenant_id: user.tenant_id,
        })
    }
}

fn lock_poisoned() -> IdentityError {
    IdentityError::Repository(RepositoryError::Unavailable(
        "session table lock poisoned".to_string(),
    ))
}

/// Produce a PHC formatted Argon2 hash.
pub fn hash_password(password: &str) -> Result<String, IdentityError> {
    let salt_bytes: [u8; 16] = rand::random();
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|err| IdentityError::Hashing(err.to_string()))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| IdentityError::Hashing(err.to_string()))
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

fn generate_token() -> String {
    let random_bytes: [u8; 32] = rand::random();
    format!("lf_{}", hex::encode(random_bytes))
}

/// Pull the token out of an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    header_value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
