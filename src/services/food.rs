//! Food station purchases paid in tokens

use crate::common::types::{MenuItemId, RequestContext, Tokens, TransactionType};
use crate::errors::{CasinoError, CasinoResult};
use crate::ledger::{FoodMenuItem, FoodPurchase, LedgerStore, NewLedgerEntry};
use serde::Serialize;
use tracing::{debug, info};

/// A committed food order and the balance it left
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FoodReceipt {
    pub purchase: FoodPurchase,
    pub new_balance: Tokens,
}

#[derive(Clone)]
pub struct FoodService {
    store: LedgerStore,
}

impl FoodService {
    pub fn new(store: LedgerStore) -> Self {
        Self { store }
    }

    /// Menu ordered by price
    pub async fn menu(&self) -> CasinoResult<Vec<FoodMenuItem>> {
        self.store.list_menu().await
    }

    /// Buy `quantity` of a menu item, debiting `price × quantity`
    pub async fn purchase(
        &self,
        ctx: &RequestContext,
        item_id: MenuItemId,
        quantity: i64,
    ) -> CasinoResult<FoodPurchase> {
        Ok(self.checkout(ctx, item_id, quantity).await?.purchase)
    }

    /// Same as [`purchase`](Self::purchase), also returning the balance
    /// written by the order's own transaction
    pub async fn checkout(
        &self,
        ctx: &RequestContext,
        item_id: MenuItemId,
        quantity: i64,
    ) -> CasinoResult<FoodReceipt> {
        if quantity <= 0 {
            return Err(CasinoError::validation("Quantity must be at least 1"));
        }

        let item = self
            .store
            .get_menu_item(item_id)
            .await?
            .ok_or_else(|| CasinoError::not_found(format!("menu item {}", item_id)))?;

        let total = item
            .price
            .checked_mul(quantity)
            .ok_or_else(|| CasinoError::validation("Order total is too large"))?;

        let mut tx = self.store.begin().await?;
        let new_balance = match tx.debit(ctx.user_id, total).await {
            Ok(balance) => balance,
            Err(e) => {
                debug!(user_id = ctx.user_id, item = %item.name, total, error = %e, "Food purchase refused");
                return Err(e);
            }
        };

        let purchase = tx.insert_food_purchase(ctx.user_id, item.id, quantity, total).await?;
        let description = if quantity == 1 {
            format!("Purchased {}.", item.name)
        } else {
            format!("Purchased {} x {}.", quantity, item.name)
        };
        tx.append_transaction(NewLedgerEntry {
            user_id: ctx.user_id,
            card_id: None,
            transaction_type: TransactionType::FoodPurchase,
            amount: -total,
            description,
        })
        .await?;
        tx.commit().await?;

        info!(
            user_id = ctx.user_id,
            request_id = %ctx.request_id,
            item = %item.name,
            quantity,
            amount = total,
            new_balance,
            "Food purchased"
        );
        Ok(FoodReceipt { purchase, new_balance })
    }

    pub async fn history(&self, ctx: &RequestContext) -> CasinoResult<Vec<FoodPurchase>> {
        self.store.list_food_purchases(ctx.user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::audit;

    async fn setup() -> (FoodService, LedgerStore, RequestContext) {
        let store = LedgerStore::in_memory().await.unwrap();
        let user = store.create_user("ada@example.com", "ada").await.unwrap();
        (FoodService::new(store.clone()), store, RequestContext::new(user.id))
    }

    async fn item_priced(food: &FoodService, price: i64) -> FoodMenuItem {
        food.menu()
            .await
            .unwrap()
            .into_iter()
            .find(|item| item.price == price)
            .unwrap()
    }

    #[tokio::test]
    async fn test_two_hot_dogs_cost_sixteen() {
        let (food, store, ctx) = setup().await;
        let hot_dog = item_priced(&food, 8).await;

        let purchase = food.purchase(&ctx, hot_dog.id, 2).await.unwrap();
        assert_eq!(purchase.total_price, 16);
        assert_eq!(purchase.quantity, 2);
        assert_eq!(store.get_user(ctx.user_id).await.unwrap().tokens, 84);

        let ledger = store.list_transactions(ctx.user_id).await.unwrap();
        assert_eq!(ledger[0].transaction_type, TransactionType::FoodPurchase);
        assert_eq!(ledger[0].amount, -16);
        assert_eq!(food.history(&ctx).await.unwrap(), vec![purchase]);
        assert!(audit(&store).await.unwrap().is_consistent());
    }

    #[tokio::test]
    async fn test_purchase_needs_full_total() {
        let (food, store, ctx) = setup().await;
        let steak = item_priced(&food, 50).await;

        food.purchase(&ctx, steak.id, 2).await.unwrap();
        let err = food.purchase(&ctx, steak.id, 1).await.unwrap_err();
        assert!(matches!(err, CasinoError::InsufficientFunds { required: 50, available: 0 }));
        assert_eq!(food.history(&ctx).await.unwrap().len(), 1);
        assert!(audit(&store).await.unwrap().is_consistent());
    }

    #[tokio::test]
    async fn test_checkout_reports_its_own_balance() {
        let (food, _store, ctx) = setup().await;
        let soda = item_priced(&food, 5).await;

        let receipt = food.checkout(&ctx, soda.id, 3).await.unwrap();
        assert_eq!(receipt.new_balance, 85);
        assert_eq!(receipt.purchase.total_price, 15);

        let receipt = food.checkout(&ctx, soda.id, 1).await.unwrap();
        assert_eq!(receipt.new_balance, 80);
        assert_eq!(food.history(&ctx).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_orders() {
        let (food, _store, ctx) = setup().await;
        let soda = item_priced(&food, 5).await;

        assert!(matches!(food.purchase(&ctx, soda.id, 0).await, Err(CasinoError::Validation(_))));
        assert!(matches!(food.purchase(&ctx, 999, 1).await, Err(CasinoError::NotFound(_))));
        assert!(matches!(
            food.purchase(&ctx, soda.id, i64::MAX).await,
            Err(CasinoError::Validation(_))
        ));
    }
}
