use std::collections::HashMap;
use std::sync::Arc;

use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::error::{CatalogError, CatalogResult};
use crate::models::{
    Category, CategoryProductCount, CategoryTreeNode, CreateCategory, UpdateCategory,
};
use crate::repository::CategoryRepository;
use crate::slug;

/// Service layer for category business logic: slug generation, tree reads,
/// and delete guarding. Structural tree changes are delegated to the
/// repository, which owns the interval columns.
pub struct CategoryService<R: CategoryRepository> {
    repository: Arc<R>,
}

impl<R: CategoryRepository> CategoryService<R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository: Arc::new(repository),
        }
    }

    /// Create a category. When no slug is supplied one is derived from the
    /// name, probing `-1`, `-2`… on collision against every category ever
    /// created (tombstoned included).
    #[instrument(skip(self, input), fields(category_name = %input.name))]
    pub async fn create_category(&self, input: CreateCategory) -> CatalogResult<Category> {
        input
            .validate()
            .map_err(|e| CatalogError::Validation(e.to_string()))?;

        let slug = match &input.slug {
            Some(explicit) => explicit.clone(),
            None => self.generate_unique_slug(&input.name).await?,
        };

        self.repository.create(input, slug).await
    }

    /// Partial update. A `parent_id` change is validated against circular
    /// references and re-slots the subtree; other fields never touch tree
    /// position.
    #[instrument(skip(self, input), fields(category_id = %id))]
    pub async fn update_category(&self, id: Uuid, input: UpdateCategory) -> CatalogResult<Category> {
        input
            .validate()
            .map_err(|e| CatalogError::Validation(e.to_string()))?;

        self.repository.update(id, input).await
    }

    /// Tombstone the category and its whole subtree. Refused while any
    /// non-deleted product references the category itself (products in
    /// descendant categories do not block).
    #[instrument(skip(self), fields(category_id = %id))]
    pub async fn delete_category(&self, id: Uuid) -> CatalogResult<()> {
        let category = self
            .repository
            .get_by_id(id)
            .await?
            .ok_or(CatalogError::CategoryNotFound(id))?;

        if self.repository.has_undeleted_products(category.id).await? {
            return Err(CatalogError::CategoryHasProducts(category.id));
        }

        self.repository.soft_delete_subtree(category.id).await?;
        Ok(())
    }

    pub async fn get_category(&self, id: Uuid) -> CatalogResult<Category> {
        self.repository
            .get_by_id(id)
            .await?
            .ok_or(CatalogError::CategoryNotFound(id))
    }

    /// Active, non-deleted lookup for public reads.
    pub async fn get_by_slug(&self, slug: &str) -> CatalogResult<Category> {
        self.repository
            .get_by_slug(slug)
            .await?
            .ok_or_else(|| CatalogError::UnknownCategorySlug(slug.to_string()))
    }

    /// Materialize the nested tree, children name-ordered, every node
    /// annotated with the active-product count of its whole subtree.
    #[instrument(skip(self))]
    pub async fn get_tree(&self, include_inactive: bool) -> CatalogResult<Vec<CategoryTreeNode>> {
        let categories = self.repository.list(include_inactive).await?;
        let counts = self.repository.product_counts().await?;
        Ok(build_tree(categories, &counts))
    }

    /// "Root > Child > Grandchild" for the given category.
    pub async fn full_path(&self, id: Uuid) -> CatalogResult<String> {
        let category = self.get_category(id).await?;
        let ancestors = self.repository.ancestors(id).await?;

        let mut names: Vec<String> = ancestors.into_iter().map(|c| c.name).collect();
        names.push(category.name);
        Ok(names.join(" > "))
    }

    async fn generate_unique_slug(&self, name: &str) -> CatalogResult<String> {
        let base = slug::slugify(name);
        let base = if base.is_empty() {
            "category".to_string()
        } else {
            base
        };

        if !self.repository.slug_exists(&base).await? {
            return Ok(base);
        }
        let mut counter = 1;
        loop {
            let candidate = slug::suffixed(&base, counter);
            if !self.repository.slug_exists(&candidate).await? {
                return Ok(candidate);
            }
            counter += 1;
        }
    }
}

impl<R: CategoryRepository> Clone for CategoryService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

/// Assemble the nested tree from the flat, tree-ordered category list.
///
/// Subtree product counts are aggregated over ALL non-deleted categories in
/// each node's interval, so products under an inactive (but live) descendant
/// still count when the tree is rendered without inactive nodes.
fn build_tree(
    categories: Vec<Category>,
    counts: &[CategoryProductCount],
) -> Vec<CategoryTreeNode> {
    let visible: Vec<&Category> = categories.iter().collect();
    let visible_ids: std::collections::HashSet<Uuid> = visible.iter().map(|c| c.id).collect();

    let mut children_of: HashMap<Option<Uuid>, Vec<&Category>> = HashMap::new();
    for category in &visible {
        // A node whose parent is not visible is unreachable, like in any
        // parent-walk rendering.
        let key = match category.parent_id {
            Some(parent_id) if visible_ids.contains(&parent_id) => Some(parent_id),
            Some(_) => continue,
            None => None,
        };
        children_of.entry(key).or_default().push(category);
    }
    for siblings in children_of.values_mut() {
        siblings.sort_by(|a, b| a.name.cmp(&b.name));
    }

    fn subtree_count(category: &Category, counts: &[CategoryProductCount]) -> u64 {
        counts
            .iter()
            .filter(|c| c.tree_left >= category.tree_left && c.tree_right <= category.tree_right)
            .map(|c| c.product_count)
            .sum()
    }

    fn materialize(
        category: &Category,
        children_of: &HashMap<Option<Uuid>, Vec<&Category>>,
        counts: &[CategoryProductCount],
    ) -> CategoryTreeNode {
        let children = children_of
            .get(&Some(category.id))
            .map(|kids| {
                kids.iter()
                    .map(|child| materialize(child, children_of, counts))
                    .collect()
            })
            .unwrap_or_default();

        CategoryTreeNode {
            id: category.id,
            name: category.name.clone(),
            slug: category.slug.clone(),
            description: category.description.clone(),
            image_url: category.image_url.clone(),
            is_active: category.is_active,
            depth: category.depth,
            product_count: subtree_count(category, counts),
            children,
        }
    }

    children_of
        .get(&None)
        .map(|roots| {
            roots
                .iter()
                .map(|root| materialize(root, &children_of, counts))
                .collect()
        })
        .unwrap_or_default()
}
