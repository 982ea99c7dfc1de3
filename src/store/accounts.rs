use crate::core::auth::{
    AuthError, AuthProvider, AuthResult, MIN_PASSWORD_LEN, User, validate_email,
};
use crate::core::store::{ExpenseStore, UserProfile};
use anyhow::Context;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use async_trait::async_trait;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use password_hash::SaltString;
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

const ACCOUNTS_PARTITION: &str = "accounts";
const SESSION_PARTITION: &str = "session";
const CURRENT_SESSION_KEY: &str = "current";

#[derive(Debug, Serialize, Deserialize)]
struct Account {
    uid: String,
    email: String,
    password_hash: String,
}

impl From<&Account> for User {
    fn from(account: &Account) -> Self {
        User {
            uid: account.uid.clone(),
            email: account.email.clone(),
        }
    }
}

/// Email/password accounts kept next to the expense data. The signed-in
/// user survives restarts until [`AuthProvider::sign_out`].
pub struct LocalAuthProvider {
    keyspace: Keyspace,
    accounts: PartitionHandle,
    session: PartitionHandle,
    store: Arc<dyn ExpenseStore>,
}

impl LocalAuthProvider {
    pub fn new(keyspace: Keyspace, store: Arc<dyn ExpenseStore>) -> anyhow::Result<Self> {
        let accounts = keyspace
            .open_partition(ACCOUNTS_PARTITION, PartitionCreateOptions::default())
            .context("Failed to open accounts partition")?;
        let session = keyspace
            .open_partition(SESSION_PARTITION, PartitionCreateOptions::default())
            .context("Failed to open session partition")?;
        Ok(Self {
            keyspace,
            accounts,
            session,
            store,
        })
    }

    fn account(&self, email: &str) -> anyhow::Result<Option<Account>> {
        match self.accounts.get(email)? {
            Some(value) => Ok(Some(
                serde_json::from_slice(&value).context("Malformed account record")?,
            )),
            None => Ok(None),
        }
    }

    fn account_by_uid(&self, uid: &str) -> anyhow::Result<Option<Account>> {
        for item in self.accounts.iter() {
            let (_, value) = item?;
            let account: Account =
                serde_json::from_slice(&value).context("Malformed account record")?;
            if account.uid == uid {
                return Ok(Some(account));
            }
        }
        Ok(None)
    }

    fn start_session(&self, uid: &str) -> anyhow::Result<()> {
        self.session.insert(CURRENT_SESSION_KEY, uid)?;
        self.keyspace
            .persist(PersistMode::SyncAll)
            .context("Failed to persist session")
    }
}

fn hash_password(password: &str) -> AuthResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;
    Ok(hash.to_string())
}

fn verify_password(hash: &str, password: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[async_trait]
impl AuthProvider for LocalAuthProvider {
    async fn register(&self, email: &str, password: &str) -> AuthResult<User> {
        let email = validate_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }
        if self.account(&email)?.is_some() {
            return Err(AuthError::EmailInUse(email));
        }

        let account = Account {
            uid: Uuid::new_v4().to_string(),
            email,
            password_hash: hash_password(password)?,
        };
        self.accounts
            .insert(
                account.email.as_str(),
                serde_json::to_vec(&account).context("Failed to encode account")?,
            )
            .context("Failed to store account")?;
        self.store
            .put_profile(&UserProfile {
                uid: account.uid.clone(),
                email: account.email.clone(),
            })
            .await?;
        self.start_session(&account.uid)?;
        info!("Registered account {}", account.email);
        Ok(User::from(&account))
    }

    async fn login(&self, email: &str, password: &str) -> AuthResult<User> {
        let email = validate_email(email)?;
        let account = self.account(&email)?.ok_or(AuthError::InvalidCredentials)?;
        if !verify_password(&account.password_hash, password) {
            debug!("Password mismatch for {email}");
            return Err(AuthError::InvalidCredentials);
        }
        self.start_session(&account.uid)?;
        info!("Signed in as {}", account.email);
        Ok(User::from(&account))
    }

    async fn current_user(&self) -> AuthResult<Option<User>> {
        let Some(uid) = self.session.get(CURRENT_SESSION_KEY).map_err(anyhow::Error::from)? else {
            return Ok(None);
        };
        let uid = String::from_utf8_lossy(&uid).into_owned();
        Ok(self.account_by_uid(&uid)?.as_ref().map(User::from))
    }

    async fn sign_out(&self) -> AuthResult<()> {
        self.session
            .remove(CURRENT_SESSION_KEY)
            .map_err(anyhow::Error::from)?;
        self.keyspace
            .persist(PersistMode::SyncAll)
            .context("Failed to persist session")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryExpenseStore;
    use crate::store::open_keyspace;
    use tempfile::tempdir;

    fn provider(path: &std::path::Path, store: Arc<dyn ExpenseStore>) -> LocalAuthProvider {
        LocalAuthProvider::new(open_keyspace(path).unwrap(), store).unwrap()
    }

    #[tokio::test]
    async fn test_register_signs_in_and_provisions_profile() {
        let dir = tempdir().unwrap();
        let store: Arc<dyn ExpenseStore> = Arc::new(MemoryExpenseStore::new());
        let auth = provider(dir.path(), store.clone());

        let user = auth.register("Ana@Example.com", "secret1").await.unwrap();
        assert_eq!(user.email, "ana@example.com");
        assert_eq!(auth.current_user().await.unwrap(), Some(user.clone()));
        assert_eq!(
            store.profile(&user.uid).await.unwrap(),
            Some(UserProfile {
                uid: user.uid.clone(),
                email: user.email.clone(),
            })
        );
    }

    #[tokio::test]
    async fn test_register_validation() {
        let dir = tempdir().unwrap();
        let auth = provider(dir.path(), Arc::new(MemoryExpenseStore::new()));

        assert!(matches!(
            auth.register("not-an-email", "secret1").await,
            Err(AuthError::InvalidEmail(_))
        ));
        assert!(matches!(
            auth.register("ana@example.com", "12345").await,
            Err(AuthError::WeakPassword)
        ));
        auth.register("ana@example.com", "123456").await.unwrap();
        assert!(matches!(
            auth.register("ANA@example.com", "abcdef").await,
            Err(AuthError::EmailInUse(_))
        ));
    }

    #[tokio::test]
    async fn test_login_and_sign_out() {
        let dir = tempdir().unwrap();
        let auth = provider(dir.path(), Arc::new(MemoryExpenseStore::new()));
        let user = auth.register("ana@example.com", "secret1").await.unwrap();

        auth.sign_out().await.unwrap();
        assert!(auth.current_user().await.unwrap().is_none());
        assert!(matches!(auth.require_user().await, Err(AuthError::NotSignedIn)));

        assert!(matches!(
            auth.login("ana@example.com", "wrong-pass").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("bob@example.com", "secret1").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert_eq!(auth.login("ana@example.com", "secret1").await.unwrap(), user);
        assert_eq!(auth.require_user().await.unwrap(), user);
    }

    #[tokio::test]
    async fn test_session_survives_reopen() {
        let dir = tempdir().unwrap();
        let user = {
            let auth = provider(dir.path(), Arc::new(MemoryExpenseStore::new()));
            auth.register("ana@example.com", "secret1").await.unwrap()
        };
        let auth = provider(dir.path(), Arc::new(MemoryExpenseStore::new()));
        assert_eq!(auth.current_user().await.unwrap(), Some(user));
    }
}
