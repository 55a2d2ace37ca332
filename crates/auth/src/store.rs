use std::{collections::HashMap, sync::Arc};

use {
    async_trait::async_trait,
    secrecy::{ExposeSecret, Secret},
    tracing::debug,
};

use smsrelay_config::AuthConfig;

use crate::{
    basic::Credential,
    error::{Error, Result},
    password::verify_password,
};

/// A resolvable account.
#[derive(Debug, Clone)]
pub struct Account {
    pub username: String,
    pub password_hash: Secret<String>,
}

impl Account {
    #[must_use]
    pub fn verify_password(&self, password: &str) -> bool {
        verify_password(password, self.password_hash.expose_secret())
    }
}

/// Lookup of accounts by username. Accounts are resolved on every request,
/// so implementations backed by an external system see changes immediately.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_account(&self, username: &str) -> Result<Option<Account>>;
}

/// Accounts declared under `[[auth.accounts]]`.
#[derive(Debug, Default)]
pub struct ConfigAccountStore {
    accounts: HashMap<String, Account>,
}

impl ConfigAccountStore {
    #[must_use]
    pub fn from_config(config: &AuthConfig) -> Self {
        let accounts = config
            .accounts
            .iter()
            .map(|a| {
                (a.username.clone(), Account {
                    username: a.username.clone(),
                    password_hash: a.password_hash.clone(),
                })
            })
            .collect();
        Self { accounts }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[async_trait]
impl AccountStore for ConfigAccountStore {
    async fn find_account(&self, username: &str) -> Result<Option<Account>> {
        Ok(self.accounts.get(username).cloned())
    }
}

/// Resolve the credential's account and verify its password.
///
/// Argon2 verification is CPU-bound, so it runs on the blocking pool.
pub async fn authenticate(store: &Arc<dyn AccountStore>, credential: &Credential) -> Result<Account> {
    let Some(account) = store.find_account(&credential.username).await? else {
        debug!(username = %credential.username, "unknown account");
        return Err(Error::UnknownAccount {
            username: credential.username.clone(),
        });
    };

    let password = credential.password.clone();
    let candidate = account.clone();
    let verified =
        tokio::task::spawn_blocking(move || candidate.verify_password(password.expose_secret()))
            .await
            .map_err(|e| Error::store("password verification task", e))?;

    if verified {
        Ok(account)
    } else {
        debug!(username = %credential.username, "password rejected");
        Err(Error::InvalidPassword {
            username: credential.username.clone(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {
        super::*,
        crate::password::hash_password,
        smsrelay_config::AccountConfig,
    };

    fn store_with(username: &str, password: &str) -> Arc<dyn AccountStore> {
        let config = AuthConfig {
            accounts: vec![AccountConfig {
                username: username.into(),
                password_hash: Secret::new(hash_password(password).unwrap()),
            }],
        };
        Arc::new(ConfigAccountStore::from_config(&config))
    }

    fn credential(username: &str, password: &str) -> Credential {
        Credential {
            username: username.into(),
            password: Secret::new(password.into()),
        }
    }

    #[tokio::test]
    async fn valid_credentials_resolve_account() {
        let store = store_with("phone", "s3cret");
        let account = authenticate(&store, &credential("phone", "s3cret"))
            .await
            .unwrap();
        assert_eq!(account.username, "phone");
    }

    #[tokio::test]
    async fn unknown_account_is_rejected() {
        let store = store_with("phone", "s3cret");
        let err = authenticate(&store, &credential("tablet", "s3cret"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownAccount { .. }));
        assert!(err.is_rejection());
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let store = store_with("phone", "s3cret");
        let err = authenticate(&store, &credential("phone", "guess"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPassword { .. }));
    }

    #[tokio::test]
    async fn usernames_are_case_sensitive() {
        let store = store_with("phone", "s3cret");
        assert!(
            authenticate(&store, &credential("Phone", "s3cret"))
                .await
                .is_err()
        );
    }

    #[test]
    fn empty_config_yields_empty_store() {
        let store = ConfigAccountStore::from_config(&AuthConfig::default());
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
    }
}
