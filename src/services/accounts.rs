//! Login-or-register by email and username

use crate::common::types::RequestContext;
use crate::errors::{CasinoError, CasinoResult};
use crate::ledger::{LedgerStore, User};
use tracing::info;

#[derive(Clone)]
pub struct AccountService {
    store: LedgerStore,
}

impl AccountService {
    pub fn new(store: LedgerStore) -> Self {
        Self { store }
    }

    /// Log in with an existing `(email, username)` pair or create the account
    ///
    /// Returns the user and whether it was just created.
    pub async fn login_or_register(&self, email: &str, username: &str) -> CasinoResult<(User, bool)> {
        let email = email.trim();
        let username = username.trim();
        if email.is_empty() || username.is_empty() {
            return Err(CasinoError::validation("Email and username are required"));
        }

        if let Some(user) = self.store.find_user_by_login(email, username).await? {
            info!(user_id = user.id, "User logged in");
            return Ok((user, false));
        }

        if self.store.find_user_by_email(email).await?.is_some() {
            return Err(CasinoError::Integrity(format!(
                "{} is already registered under a different username",
                email
            )));
        }

        let user = self.store.create_user(email, username).await?;
        info!(user_id = user.id, tokens = user.tokens, "User registered");
        Ok((user, true))
    }

    pub async fn profile(&self, ctx: &RequestContext) -> CasinoResult<User> {
        self.store.get_user(ctx.user_id).await
    }

    /// Remove the caller together with their cards, ledger and game history
    pub async fn delete_account(&self, ctx: &RequestContext) -> CasinoResult<()> {
        self.store.delete_user(ctx.user_id).await?;
        info!(user_id = ctx.user_id, request_id = %ctx.request_id, "Account deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn service() -> AccountService {
        AccountService::new(LedgerStore::in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let accounts = service().await;

        let (created, is_new) = accounts.login_or_register("ada@example.com", "ada").await.unwrap();
        assert!(is_new);
        assert_eq!(created.tokens, 100);

        let (again, is_new) = accounts.login_or_register(" ada@example.com ", "ada").await.unwrap();
        assert!(!is_new);
        assert_eq!(again.id, created.id);
    }

    #[tokio::test]
    async fn test_missing_fields_rejected() {
        let accounts = service().await;
        assert!(matches!(
            accounts.login_or_register("", "ada").await,
            Err(CasinoError::Validation(_))
        ));
        assert!(matches!(
            accounts.login_or_register("ada@example.com", "   ").await,
            Err(CasinoError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_email_taken_by_other_username() {
        let accounts = service().await;
        accounts.login_or_register("ada@example.com", "ada").await.unwrap();

        let err = accounts.login_or_register("ada@example.com", "eve").await.unwrap_err();
        assert!(matches!(err, CasinoError::Integrity(_)));
    }

    #[tokio::test]
    async fn test_delete_account() {
        let accounts = service().await;
        let (user, _) = accounts.login_or_register("ada@example.com", "ada").await.unwrap();
        let ctx = RequestContext::new(user.id);

        accounts.delete_account(&ctx).await.unwrap();
        assert!(matches!(accounts.profile(&ctx).await, Err(CasinoError::NotFound(_))));
    }
}
