use crate::model::id::{IdGenerator, RandomIdGenerator};
use crate::model::user::Uid;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, PoisonError};

/// Sign-up rejected: malformed email address.
pub const AUTH_INVALID_EMAIL: &str = "auth/invalid-email";
/// Sign-up rejected: password shorter than `MIN_PASSWORD_CHARS`.
pub const AUTH_WEAK_PASSWORD: &str = "auth/weak-password";
/// Sign-up rejected: email already registered.
pub const AUTH_EMAIL_IN_USE: &str = "auth/email-already-in-use";
/// Sign-in rejected: unknown email or wrong password.
pub const AUTH_INVALID_CREDENTIAL: &str = "auth/invalid-credential";

const MIN_PASSWORD_CHARS: usize = 6;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// Authenticated identity returned by the credential service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub uid: Uid,
    pub email: String,
}

/// Credential rejection with the provider's stable code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthError {
    pub code: String,
    pub message: String,
}

impl AuthError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl Display for AuthError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

impl Error for AuthError {}

/// External credential-issuing service.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthError>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError>;
}

/// In-process credential double.
///
/// Mirrors the observable contract of the hosted service. Not a credential
/// store: secrets are kept in memory as given.
pub struct InMemoryCredentialProvider {
    accounts: Mutex<BTreeMap<String, Account>>,
    ids: Box<dyn IdGenerator>,
}

struct Account {
    uid: Uid,
    password: String,
}

impl Default for InMemoryCredentialProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCredentialProvider {
    pub fn new() -> Self {
        Self::with_id_generator(Box::new(RandomIdGenerator))
    }

    pub fn with_id_generator(ids: Box<dyn IdGenerator>) -> Self {
        Self {
            accounts: Mutex::new(BTreeMap::new()),
            ids,
        }
    }

    /// Registers an account with a known uid, bypassing sign-up checks.
    pub fn register(
        &self,
        uid: impl Into<Uid>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) {
        let mut accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
        accounts.insert(
            email.into(),
            Account {
                uid: uid.into(),
                password: password.into(),
            },
        );
    }
}

#[async_trait]
impl CredentialProvider for InMemoryCredentialProvider {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        if !EMAIL_RE.is_match(email) {
            return Err(AuthError::new(AUTH_INVALID_EMAIL, "email address is malformed"));
        }
        if password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(AuthError::new(
                AUTH_WEAK_PASSWORD,
                format!("password must have at least {MIN_PASSWORD_CHARS} characters"),
            ));
        }

        let mut accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
        if accounts.contains_key(email) {
            return Err(AuthError::new(AUTH_EMAIL_IN_USE, "email already registered"));
        }
        let uid = self.ids.generate();
        accounts.insert(
            email.to_string(),
            Account {
                uid: uid.clone(),
                password: password.to_string(),
            },
        );
        Ok(Identity {
            uid,
            email: email.to_string(),
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
        match accounts.get(email) {
            Some(account) if account.password == password => Ok(Identity {
                uid: account.uid.clone(),
                email: email.to_string(),
            }),
            _ => Err(AuthError::new(
                AUTH_INVALID_CREDENTIAL,
                "email or password is incorrect",
            )),
        }
    }
}
