use async_trait::async_trait;
use bson::doc;
use mongodb::options::IndexOptions;
use mongodb::{Collection, Database, IndexModel};

use crate::db::models::DealModel;
use crate::db::query::{find_page, ModelListQuery, Page};
use crate::error::AppError;

/// Repository trait for deal models. Slugs are unique.
#[async_trait]
pub trait ModelRepository: Send + Sync {
    async fn insert(&self, model: &DealModel) -> Result<(), AppError>;

    /// Returns `false` when no model matched.
    async fn replace(&self, model: &DealModel) -> Result<bool, AppError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<DealModel>, AppError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<DealModel>, AppError>;

    /// Featured models first, then newest first.
    async fn list(&self, query: &ModelListQuery) -> Result<Page<DealModel>, AppError>;

    async fn increment_views(&self, id: &str) -> Result<(), AppError>;

    async fn delete(&self, id: &str) -> Result<bool, AppError>;

    async fn count(&self) -> Result<u64, AppError>;
}

/// MongoDB implementation of the ModelRepository.
pub struct MongoModelRepository {
    collection: Collection<DealModel>,
}

impl MongoModelRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("models"),
        }
    }

    pub async fn ensure_indexes(&self) -> Result<(), AppError> {
        let slug = IndexModel::builder()
            .keys(doc! { "slug": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.collection.create_index(slug).await?;
        Ok(())
    }
}

fn map_write_error(err: mongodb::error::Error) -> AppError {
    AppError::from_mongo(err, "Model", "slug")
}

#[async_trait]
impl ModelRepository for MongoModelRepository {
    async fn insert(&self, model: &DealModel) -> Result<(), AppError> {
        self.collection
            .insert_one(model)
            .await
            .map_err(map_write_error)?;
        Ok(())
    }

    async fn replace(&self, model: &DealModel) -> Result<bool, AppError> {
        let result = self
            .collection
            .replace_one(doc! { "_id": &model.id }, model)
            .await
            .map_err(map_write_error)?;
        Ok(result.matched_count > 0)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<DealModel>, AppError> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<DealModel>, AppError> {
        Ok(self.collection.find_one(doc! { "slug": slug }).await?)
    }

    async fn list(&self, query: &ModelListQuery) -> Result<Page<DealModel>, AppError> {
        find_page(
            &self.collection,
            query.to_filter(),
            doc! { "featured": -1, "created_at": -1 },
            query.pagination(),
        )
        .await
    }

    async fn increment_views(&self, id: &str) -> Result<(), AppError> {
        self.collection
            .update_one(doc! { "_id": id }, doc! { "$inc": { "views": 1 } })
            .await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        let result = self.collection.delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count > 0)
    }

    async fn count(&self) -> Result<u64, AppError> {
        Ok(self.collection.count_documents(doc! {}).await?)
    }
}
