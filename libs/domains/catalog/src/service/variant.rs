use std::sync::Arc;

use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::error::{CatalogError, CatalogResult};
use crate::inventory::InventoryLedger;
use crate::models::{
    BulkOperationSummary, CreateVariant, StockOperation, StockUpdate, UpdateVariant, Variant,
};
use crate::repository::VariantRepository;

/// Service layer for variant business logic. Stock changes are dispatched to
/// the inventory ledger; nothing else in this service touches quantities.
pub struct VariantService<R: VariantRepository> {
    repository: Arc<R>,
    ledger: InventoryLedger<R>,
}

impl<R: VariantRepository> VariantService<R> {
    pub fn new(repository: R) -> Self {
        let repository = Arc::new(repository);
        Self {
            ledger: InventoryLedger::new(Arc::clone(&repository)),
            repository,
        }
    }

    /// Create a variant. The SKU must be new across every variant ever
    /// created. Unknown attribute-value ids are skipped (and logged), not
    /// rejected — existing callers rely on that.
    #[instrument(skip(self, input), fields(sku = %input.sku))]
    pub async fn create_variant(&self, input: CreateVariant) -> CatalogResult<Variant> {
        input
            .validate()
            .map_err(|e| CatalogError::Validation(e.to_string()))?;

        if !self.repository.product_exists(input.product_id).await? {
            return Err(CatalogError::ProductNotFound(input.product_id));
        }
        if self.repository.sku_exists(&input.sku, None).await? {
            return Err(CatalogError::DuplicateSku(input.sku.clone()));
        }

        let known = self
            .resolve_attribute_values(input.attribute_value_ids.clone())
            .await?;
        self.repository.create(input, known).await
    }

    /// Partial update. `attribute_value_ids: Some(_)` (even empty) replaces
    /// the whole association set; `None` leaves it untouched.
    #[instrument(skip(self, input), fields(variant_id = %id))]
    pub async fn update_variant(&self, id: Uuid, input: UpdateVariant) -> CatalogResult<Variant> {
        input
            .validate()
            .map_err(|e| CatalogError::Validation(e.to_string()))?;

        let existing = self
            .repository
            .get_by_id(id)
            .await?
            .ok_or(CatalogError::VariantNotFound(id))?;

        if let Some(new_sku) = &input.sku {
            if new_sku != &existing.sku && self.repository.sku_exists(new_sku, Some(id)).await? {
                return Err(CatalogError::DuplicateSku(new_sku.clone()));
            }
        }

        let replacement = match input.attribute_value_ids.clone() {
            Some(ids) => Some(self.resolve_attribute_values(ids).await?),
            None => None,
        };

        self.repository.update(id, input, replacement).await
    }

    #[instrument(skip(self), fields(variant_id = %id))]
    pub async fn delete_variant(&self, id: Uuid) -> CatalogResult<()> {
        if !self.repository.soft_delete(id).await? {
            return Err(CatalogError::VariantNotFound(id));
        }
        Ok(())
    }

    pub async fn get_variant(&self, id: Uuid) -> CatalogResult<Variant> {
        self.repository
            .get_by_id(id)
            .await?
            .ok_or(CatalogError::VariantNotFound(id))
    }

    /// Apply one stock operation through the ledger and return the variant
    /// as the store now sees it.
    #[instrument(skip(self), fields(variant_id = %id, ?operation))]
    pub async fn update_stock(
        &self,
        id: Uuid,
        quantity: i32,
        operation: StockOperation,
    ) -> CatalogResult<Variant> {
        match operation {
            StockOperation::Set => self.ledger.set_stock(id, quantity).await?,
            StockOperation::Add => self.ledger.add_stock(id, quantity).await?,
            StockOperation::Reduce => self.ledger.reduce_stock(id, quantity).await?,
        }

        self.get_variant(id).await
    }

    /// Apply entries independently: a failing entry is recorded and skipped,
    /// never rolling back its neighbors.
    #[instrument(skip(self, updates), fields(entries = updates.len()))]
    pub async fn bulk_update_stock(&self, updates: Vec<StockUpdate>) -> BulkOperationSummary {
        let mut success_count = 0;
        let mut failed_ids = Vec::new();

        for update in updates {
            match self
                .update_stock(update.variant_id, update.quantity, update.operation)
                .await
            {
                Ok(_) => success_count += 1,
                Err(error) => {
                    tracing::warn!(variant_id = %update.variant_id, %error, "bulk stock entry failed");
                    failed_ids.push(update.variant_id);
                }
            }
        }

        BulkOperationSummary::new(success_count, failed_ids, "variants")
    }

    /// Active variants at or under their low-stock threshold.
    pub async fn low_stock_variants(&self) -> CatalogResult<Vec<Variant>> {
        self.repository.low_stock().await
    }

    async fn resolve_attribute_values(&self, requested: Vec<Uuid>) -> CatalogResult<Vec<Uuid>> {
        if requested.is_empty() {
            return Ok(requested);
        }
        let known = self
            .repository
            .known_attribute_value_ids(requested.clone())
            .await?;
        if known.len() != requested.len() {
            let skipped: Vec<Uuid> = requested
                .iter()
                .filter(|id| !known.contains(id))
                .copied()
                .collect();
            tracing::warn!(?skipped, "skipping unknown attribute values");
        }
        Ok(known)
    }
}

impl<R: VariantRepository> Clone for VariantService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            ledger: self.ledger.clone(),
        }
    }
}
