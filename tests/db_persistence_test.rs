//! Ledger behaviour against an on-disk database
//!
//! Reopening keeps balances and ledgers; concurrent debits from one user
//! never overdraw.

use casino_ledger::{
    common::types::RequestContext,
    config::CasinoConfig,
    games::{FixedReels, Reels, Symbol},
    ledger::audit,
    services::ServiceBuilder,
    CasinoError, CasinoServices,
};
use futures::future::join_all;
use std::sync::Arc;
use tempfile::TempDir;

fn file_config(dir: &TempDir) -> CasinoConfig {
    let mut config = CasinoConfig::default();
    config.database.url = format!("sqlite://{}", dir.path().join("casino.db").display());
    config
}

async fn open(dir: &TempDir) -> CasinoServices {
    ServiceBuilder::new()
        .with_config(file_config(dir))
        .build()
        .await
        .expect("open services")
}

#[tokio::test]
async fn test_balances_survive_reopen() {
    let dir = TempDir::new().unwrap();

    let user_id = {
        let services = open(&dir).await;
        let (user, _) = services
            .accounts
            .login_or_register("ada@example.com", "ada")
            .await
            .unwrap();
        let ctx = RequestContext::new(user.id);

        let card = services.wallet.register_card(&ctx, "4242424242424242").await.unwrap();
        services.wallet.purchase_tokens(&ctx, card.id, 5).await.unwrap();
        services.wallet.cash_out(&ctx, 20).await.unwrap();

        services.store().pool().close().await;
        user.id
    };

    let services = open(&dir).await;
    let (user, created) = services
        .accounts
        .login_or_register("ada@example.com", "ada")
        .await
        .unwrap();
    assert!(!created);
    assert_eq!(user.id, user_id);
    assert_eq!(user.tokens, 130);

    let ctx = RequestContext::new(user.id);
    assert_eq!(services.wallet.transactions(&ctx).await.unwrap().len(), 2);
    assert_eq!(services.wallet.list_cards(&ctx).await.unwrap().len(), 1);
    assert_eq!(services.food.menu().await.unwrap().len(), 5);
    assert!(services.audit().await.unwrap().is_consistent());
}

#[tokio::test]
async fn test_concurrent_cash_outs_never_overdraw() {
    let dir = TempDir::new().unwrap();
    let services = open(&dir).await;
    let (user, _) = services
        .accounts
        .login_or_register("ada@example.com", "ada")
        .await
        .unwrap();

    let tasks = (0..10).map(|_| {
        let wallet = services.wallet.clone();
        let ctx = RequestContext::new(user.id);
        tokio::spawn(async move { wallet.cash_out(&ctx, 30).await })
    });

    let mut successes = 0;
    for outcome in join_all(tasks).await {
        match outcome.expect("task panicked") {
            Ok(_) => successes += 1,
            Err(CasinoError::InsufficientFunds { .. }) | Err(CasinoError::Integrity(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    let balance = services.wallet.balance(&RequestContext::new(user.id)).await.unwrap();
    assert!(successes >= 1 && successes <= 3, "{successes} cash-outs succeeded");
    assert_eq!(balance, 100 - 30 * successes);
    assert!(balance >= 0);
    assert!(audit(services.store()).await.unwrap().is_consistent());
}

#[tokio::test]
async fn test_concurrent_mixed_debits_keep_ledger_consistent() {
    let dir = TempDir::new().unwrap();
    let loss = Reels::new(Symbol::Cherry, Symbol::Bar, Symbol::Seven);
    let services = ServiceBuilder::new()
        .with_config(file_config(&dir))
        .with_reels(Arc::new(FixedReels::new([loss, Reels::new(Symbol::Lemon, Symbol::Lemon, Symbol::Lemon)])))
        .build()
        .await
        .unwrap();

    let (user, _) = services
        .accounts
        .login_or_register("ada@example.com", "ada")
        .await
        .unwrap();
    let soda_id = services
        .food
        .menu()
        .await
        .unwrap()
        .into_iter()
        .find(|item| item.name == "Soda")
        .map(|item| item.id)
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..12 {
        let services = services.clone();
        let ctx = RequestContext::new(user.id);
        handles.push(tokio::spawn(async move {
            match i % 3 {
                0 => services.slots.spin(&ctx, 10).await.map(|_| ()),
                1 => services.food.purchase(&ctx, soda_id, 2).await.map(|_| ()),
                _ => services.wallet.cash_out(&ctx, 15).await.map(|_| ()),
            }
        }));
    }

    for outcome in join_all(handles).await {
        match outcome.expect("task panicked") {
            Ok(()) | Err(CasinoError::InsufficientFunds { .. }) | Err(CasinoError::Integrity(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    let report = services.audit().await.unwrap();
    assert_eq!(report.users_checked, 1);
    assert!(report.is_consistent(), "{:?}", report.discrepancies);

    let balance = services.wallet.balance(&RequestContext::new(user.id)).await.unwrap();
    assert!(balance >= 0);
}

#[tokio::test]
async fn test_concurrent_retries_with_one_key_replay_the_first_receipt() {
    let dir = TempDir::new().unwrap();
    let services = open(&dir).await;
    let (user, _) = services
        .accounts
        .login_or_register("ada@example.com", "ada")
        .await
        .unwrap();

    for round in 0..10 {
        let key = format!("cash-{round}");
        let tasks = (0..4).map(|_| {
            let wallet = services.wallet.clone();
            let ctx = RequestContext::new(user.id).with_idempotency_key(key.clone());
            tokio::spawn(async move { wallet.cash_out(&ctx, 1).await })
        });

        let receipts: Vec<_> = join_all(tasks)
            .await
            .into_iter()
            .map(|outcome| outcome.expect("task panicked").expect("retry refused"))
            .collect();

        assert_eq!(receipts.iter().filter(|r| !r.replayed).count(), 1, "round {round}");
        assert!(receipts.iter().all(|r| r.transaction_id == receipts[0].transaction_id));
        assert!(receipts.iter().all(|r| r.new_balance == 99 - round));
    }

    let ctx = RequestContext::new(user.id);
    assert_eq!(services.wallet.balance(&ctx).await.unwrap(), 90);
    assert_eq!(services.wallet.transactions(&ctx).await.unwrap().len(), 10);
    assert!(services.audit().await.unwrap().is_consistent());
}
