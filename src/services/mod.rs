//! Service layer over the ledger store
//!
//! [`ServiceBuilder`] wires the store, the reel source and the configuration
//! into a [`CasinoServices`] container that the HTTP layer and the binaries
//! share.

pub mod accounts;
pub mod food;
pub mod slots;
pub mod wallet;

pub use accounts::AccountService;
pub use food::{FoodReceipt, FoodService};
pub use slots::{SlotService, SpinResult};
pub use wallet::{WalletReceipt, WalletService};

use crate::{
    common::config::ConfigLoader,
    config::CasinoConfig,
    errors::CasinoResult,
    games::{ReelSource, SeededReels, SlotMachine, ThreadRngReels},
    ledger::{audit, AuditReport, LedgerStore},
};
use std::sync::Arc;

/// Service container
#[derive(Clone)]
pub struct CasinoServices {
    config: Arc<CasinoConfig>,
    store: LedgerStore,
    pub accounts: AccountService,
    pub wallet: WalletService,
    pub slots: SlotService,
    pub food: FoodService,
}

impl CasinoServices {
    /// Open the configured database and build every service on top of it
    pub async fn new(config: CasinoConfig) -> CasinoResult<Self> {
        let store = LedgerStore::open(&config.database).await?;
        let reels = Self::create_reel_source(&config);
        Ok(Self::assemble(config, store, reels))
    }

    fn assemble(config: CasinoConfig, store: LedgerStore, reels: Arc<dyn ReelSource>) -> Self {
        let machine = SlotMachine::new(config.slots.max_bet);
        Self {
            accounts: AccountService::new(store.clone()),
            wallet: WalletService::new(store.clone(), config.wallet.clone()),
            slots: SlotService::new(store.clone(), machine, reels),
            food: FoodService::new(store.clone()),
            config: Arc::new(config),
            store,
        }
    }

    fn create_reel_source(config: &CasinoConfig) -> Arc<dyn ReelSource> {
        match config.slots.seed {
            Some(seed) => Arc::new(SeededReels::new(seed)),
            None => Arc::new(ThreadRngReels),
        }
    }

    pub fn config(&self) -> &CasinoConfig {
        &self.config
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    /// Check every balance against its ledger
    pub async fn audit(&self) -> CasinoResult<AuditReport> {
        audit(&self.store).await
    }
}

/// Builder for configured service containers
#[derive(Default)]
pub struct ServiceBuilder {
    config_path: Option<String>,
    config: Option<CasinoConfig>,
    store_override: Option<LedgerStore>,
    reels_override: Option<Arc<dyn ReelSource>>,
}

impl ServiceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from this TOML file (plus environment overrides)
    pub fn with_config_path(mut self, path: impl Into<String>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Use an already loaded configuration
    pub fn with_config(mut self, config: CasinoConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use an existing store instead of opening `database.url`
    pub fn with_store(mut self, store: LedgerStore) -> Self {
        self.store_override = Some(store);
        self
    }

    /// Override the reel source (useful for testing)
    pub fn with_reels(mut self, reels: Arc<dyn ReelSource>) -> Self {
        self.reels_override = Some(reels);
        self
    }

    pub async fn build(self) -> CasinoResult<CasinoServices> {
        let config = match (self.config, self.config_path) {
            (Some(config), _) => config,
            (None, Some(path)) => ConfigLoader::new().with_path(path).load()?,
            (None, None) => CasinoConfig::default(),
        };

        let store = match self.store_override {
            Some(store) => store,
            None => LedgerStore::open(&config.database).await?,
        };
        let reels = self
            .reels_override
            .unwrap_or_else(|| CasinoServices::create_reel_source(&config));

        Ok(CasinoServices::assemble(config, store, reels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::RequestContext;
    use crate::games::{FixedReels, Reels, Symbol};

    #[tokio::test]
    async fn test_builder_with_in_memory_config() {
        let services = ServiceBuilder::new()
            .with_config(CasinoConfig::deterministic(9))
            .build()
            .await
            .unwrap();

        assert_eq!(services.config().slots.seed, Some(9));
        assert_eq!(services.food.menu().await.unwrap().len(), 5);
        assert!(services.audit().await.unwrap().is_consistent());
    }

    #[tokio::test]
    async fn test_builder_reel_override_reaches_slots() {
        let jackpot = Reels::new(Symbol::Bell, Symbol::Bell, Symbol::Bell);
        let services = ServiceBuilder::new()
            .with_config(CasinoConfig::in_memory())
            .with_reels(Arc::new(FixedReels::always(jackpot)))
            .build()
            .await
            .unwrap();

        let (user, _) = services
            .accounts
            .login_or_register("ada@example.com", "ada")
            .await
            .unwrap();
        let result = services.slots.spin(&RequestContext::new(user.id), 1).await.unwrap();
        assert_eq!(result.payout, 10);
        assert_eq!(result.new_balance, 109);
    }

    #[tokio::test]
    async fn test_max_bet_from_config() {
        let mut config = CasinoConfig::in_memory();
        config.slots.max_bet = Some(5);
        let services = CasinoServices::new(config).await.unwrap();

        let (user, _) = services
            .accounts
            .login_or_register("ada@example.com", "ada")
            .await
            .unwrap();
        let ctx = RequestContext::new(user.id);
        assert!(services.slots.spin(&ctx, 6).await.is_err());
        assert!(services.slots.spin(&ctx, 5).await.is_ok());
    }
}
