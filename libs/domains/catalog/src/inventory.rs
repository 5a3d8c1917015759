//! Inventory ledger: the only component allowed to change a variant's stock.
//!
//! The decrement path never reads before writing. The repository primitive is
//! a single conditional UPDATE, so concurrent reducers serialize at the store
//! and can never drive the quantity below zero.

use std::sync::Arc;

use tracing::instrument;
use uuid::Uuid;

use crate::error::{CatalogError, CatalogResult};
use crate::repository::VariantRepository;

pub struct InventoryLedger<R: VariantRepository> {
    repository: Arc<R>,
}

impl<R: VariantRepository> InventoryLedger<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Overwrite the quantity. Negative quantities are rejected.
    #[instrument(skip(self))]
    pub async fn set_stock(&self, variant_id: Uuid, quantity: i32) -> CatalogResult<()> {
        if quantity < 0 {
            return Err(CatalogError::InvalidQuantity(quantity));
        }
        if !self.repository.set_stock(variant_id, quantity).await? {
            return Err(CatalogError::VariantNotFound(variant_id));
        }
        tracing::info!(variant_id = %variant_id, quantity, "stock set");
        Ok(())
    }

    /// Increment the quantity. Negative deltas are rejected; `reduce_stock`
    /// is the only decrement path, so the non-negative invariant has a single
    /// enforcement point.
    #[instrument(skip(self))]
    pub async fn add_stock(&self, variant_id: Uuid, delta: i32) -> CatalogResult<()> {
        if delta < 0 {
            return Err(CatalogError::InvalidQuantity(delta));
        }
        if !self.repository.increment_stock(variant_id, delta).await? {
            return Err(CatalogError::VariantNotFound(variant_id));
        }
        tracing::info!(variant_id = %variant_id, delta, "stock added");
        Ok(())
    }

    /// Conditional decrement: succeeds only when the current quantity covers
    /// `delta`, judged atomically by the store.
    #[instrument(skip(self))]
    pub async fn reduce_stock(&self, variant_id: Uuid, delta: i32) -> CatalogResult<()> {
        if delta < 0 {
            return Err(CatalogError::InvalidQuantity(delta));
        }
        if self
            .repository
            .decrement_stock_if_available(variant_id, delta)
            .await?
        {
            tracing::info!(variant_id = %variant_id, delta, "stock reduced");
            return Ok(());
        }

        // Nothing updated: tell a missing variant apart from a shortfall.
        // The read is classification only; the decrement already did not
        // happen.
        match self.repository.get_by_id(variant_id).await? {
            Some(_) => Err(CatalogError::InsufficientStock(variant_id)),
            None => Err(CatalogError::VariantNotFound(variant_id)),
        }
    }
}

impl<R: VariantRepository> Clone for InventoryLedger<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockVariantRepository;
    use mockall::predicate::eq;

    #[tokio::test]
    async fn set_rejects_negative_quantity_without_touching_store() {
        let mock = MockVariantRepository::new();
        // No expectations: the call must not reach the repository.
        let ledger = InventoryLedger::new(Arc::new(mock));

        let result = ledger.set_stock(Uuid::now_v7(), -1).await;
        assert!(matches!(result, Err(CatalogError::InvalidQuantity(-1))));
    }

    #[tokio::test]
    async fn add_rejects_negative_delta() {
        let ledger = InventoryLedger::new(Arc::new(MockVariantRepository::new()));
        let result = ledger.add_stock(Uuid::now_v7(), -5).await;
        assert!(matches!(result, Err(CatalogError::InvalidQuantity(-5))));
    }

    #[tokio::test]
    async fn set_maps_missing_variant() {
        let mut mock = MockVariantRepository::new();
        let id = Uuid::now_v7();
        mock.expect_set_stock()
            .with(eq(id), eq(10))
            .returning(|_, _| Ok(false));
        let ledger = InventoryLedger::new(Arc::new(mock));

        let result = ledger.set_stock(id, 10).await;
        assert!(matches!(result, Err(CatalogError::VariantNotFound(v)) if v == id));
    }

    #[tokio::test]
    async fn reduce_classifies_shortfall_as_insufficient_stock() {
        let mut mock = MockVariantRepository::new();
        let id = Uuid::now_v7();
        mock.expect_decrement_stock_if_available()
            .with(eq(id), eq(100))
            .returning(|_, _| Ok(false));
        mock.expect_get_by_id()
            .with(eq(id))
            .returning(|id| Ok(Some(test_variant(id, 10))));
        let ledger = InventoryLedger::new(Arc::new(mock));

        let result = ledger.reduce_stock(id, 100).await;
        assert!(matches!(result, Err(CatalogError::InsufficientStock(v)) if v == id));
    }

    #[tokio::test]
    async fn reduce_classifies_missing_variant() {
        let mut mock = MockVariantRepository::new();
        let id = Uuid::now_v7();
        mock.expect_decrement_stock_if_available()
            .returning(|_, _| Ok(false));
        mock.expect_get_by_id().returning(|_| Ok(None));
        let ledger = InventoryLedger::new(Arc::new(mock));

        let result = ledger.reduce_stock(id, 1).await;
        assert!(matches!(result, Err(CatalogError::VariantNotFound(v)) if v == id));
    }

    #[tokio::test]
    async fn reduce_succeeds_without_classification_read() {
        let mut mock = MockVariantRepository::new();
        let id = Uuid::now_v7();
        mock.expect_decrement_stock_if_available()
            .with(eq(id), eq(3))
            .returning(|_, _| Ok(true));
        // get_by_id must not be called on the success path.
        let ledger = InventoryLedger::new(Arc::new(mock));

        ledger.reduce_stock(id, 3).await.unwrap();
    }

    fn test_variant(id: Uuid, stock: i32) -> crate::models::Variant {
        crate::models::Variant {
            id,
            product_id: Uuid::now_v7(),
            sku: "SKU-1".into(),
            name: "variant".into(),
            price: None,
            stock_quantity: stock,
            low_stock_threshold: 5,
            weight: None,
            length: None,
            width: None,
            height: None,
            is_active: true,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
            deleted_at: None,
        }
    }
}
