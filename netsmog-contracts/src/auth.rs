//! Worker authorisation tokens
//!
//! A token is a bcrypt hash of `worker:secret`, base64 (URL-safe alphabet)
//! encoded so it fits in an HTTP header. The secret itself never travels:
//! the kernel looks up the worker's secret and checks the hash against it.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use std::fmt;

/// Work factor used by [`issue`].
pub const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;

/// Cheapest work factor bcrypt accepts.
pub const MIN_COST: u32 = 4;

/// Highest work factor the kernel agrees to verify. The cost is read from
/// the presented token, so anything above is refused before hashing.
pub const MAX_VERIFY_COST: u32 = 14;

/// bcrypt silently ignores input past this length.
const MAX_CREDENTIAL_LEN: usize = 72;

/// Printable authorisation token, as carried in the `Authorisation` header.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for AuthToken {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<&str> for AuthToken {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl fmt::Display for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Tokens are credentials: keep them out of debug logs.
impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(..)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    UnknownWorker,
    Malformed,
    Mismatch,
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            AuthFailure::UnknownWorker => "unknown worker",
            AuthFailure::Malformed => "malformed token",
            AuthFailure::Mismatch => "token mismatch",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("authorisation refused: {reason}")]
pub struct AuthError {
    pub reason: AuthFailure,
}

impl AuthError {
    fn new(reason: AuthFailure) -> Self {
        Self { reason }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IssueError {
    #[error("worker:secret is longer than {MAX_CREDENTIAL_LEN} bytes")]
    CredentialTooLong,
    #[error("cannot hash credential: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

fn credential(identity: &str, secret: &str) -> String {
    format!("{identity}:{secret}")
}

/// Issues a token for `identity` with the default work factor.
pub fn issue(identity: &str, secret: &str) -> Result<AuthToken, IssueError> {
    issue_with_cost(identity, secret, DEFAULT_COST)
}

/// Issues a token for `identity` with an explicit bcrypt cost
/// ([`MIN_COST`]..=[`MAX_VERIFY_COST`] to be accepted by the kernel).
pub fn issue_with_cost(identity: &str, secret: &str, cost: u32) -> Result<AuthToken, IssueError> {
    let credential = credential(identity, secret);
    if credential.len() > MAX_CREDENTIAL_LEN {
        return Err(IssueError::CredentialTooLong);
    }
    let hash = bcrypt::hash(credential, cost)?;
    Ok(AuthToken(URL_SAFE.encode(hash)))
}

/// Checks `token` against the secret registered for `identity`.
///
/// `lookup` resolves a worker identity to its shared secret. An unknown
/// worker still pays for a full bcrypt verification so that it cannot be
/// told apart from a wrong secret by timing.
pub fn verify<F>(identity: &str, lookup: F, token: &AuthToken) -> Result<(), AuthError>
where
    F: FnOnce(&str) -> Option<String>,
{
    let hash = URL_SAFE
        .decode(token.as_str().trim())
        .ok()
        .and_then(|raw| String::from_utf8(raw).ok())
        .ok_or(AuthError::new(AuthFailure::Malformed))?;

    let cost = hash
        .parse::<bcrypt::HashParts>()
        .map(|parts| parts.get_cost())
        .map_err(|_| AuthError::new(AuthFailure::Malformed))?;
    if !(MIN_COST..=MAX_VERIFY_COST).contains(&cost) {
        return Err(AuthError::new(AuthFailure::Malformed));
    }

    let Some(secret) = lookup(identity) else {
        let _ = bcrypt::verify(credential(identity, ""), &hash);
        return Err(AuthError::new(AuthFailure::UnknownWorker));
    };

    let credential = credential(identity, &secret);
    if credential.len() > MAX_CREDENTIAL_LEN {
        let _ = bcrypt::verify(&credential.as_bytes()[..MAX_CREDENTIAL_LEN], &hash);
        return Err(AuthError::new(AuthFailure::Mismatch));
    }

    match bcrypt::verify(credential, &hash) {
        Ok(true) => Ok(()),
        Ok(false) => Err(AuthError::new(AuthFailure::Mismatch)),
        Err(_) => Err(AuthError::new(AuthFailure::Malformed)),
    }
}
