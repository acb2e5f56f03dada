use async_trait::async_trait;
use bson::doc;
use mongodb::options::IndexOptions;
use mongodb::{Collection, Database, IndexModel};

use crate::db::models::BlogPost;
use crate::db::query::{find_page, BlogListQuery, Page};
use crate::error::AppError;

/// Repository trait for blog posts.
///
/// Implementations must reject a second post with an existing slug with
/// [`AppError::Duplicate`].
#[async_trait]
pub trait BlogRepository: Send + Sync {
    async fn insert(&self, post: &BlogPost) -> Result<(), AppError>;

    /// Replace a stored post by id. Returns `false` when no post matched.
    async fn replace(&self, post: &BlogPost) -> Result<bool, AppError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<BlogPost>, AppError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<BlogPost>, AppError>;

    /// Paginated listing, newest first. Unpublished posts are only included
    /// when `include_unpublished` is set.
    async fn list(
        &self,
        query: &BlogListQuery,
        include_unpublished: bool,
    ) -> Result<Page<BlogPost>, AppError>;

    async fn increment_views(&self, id: &str) -> Result<(), AppError>;

    /// Returns `false` when no post matched.
    async fn delete(&self, id: &str) -> Result<bool, AppError>;

    /// Counts as `(total, published)`.
    async fn count(&self) -> Result<(u64, u64), AppError>;
}

/// MongoDB implementation of the BlogRepository.
pub struct MongoBlogRepository {
    collection: Collection<BlogPost>,
}

impl MongoBlogRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("blogs"),
        }
    }

    /// Create the unique slug index and the listing index.
    pub async fn ensure_indexes(&self) -> Result<(), AppError> {
        let slug = IndexModel::builder()
            .keys(doc! { "slug": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        let listing = IndexModel::builder()
            .keys(doc! { "published": 1, "published_at": -1 })
            .build();

        self.collection.create_indexes([slug, listing]).await?;
        Ok(())
    }
}

fn map_write_error(err: mongodb::error::Error) -> AppError {
    AppError::from_mongo(err, "Blog post", "slug")
}

#[async_trait]
impl BlogRepository for MongoBlogRepository {
    async fn insert(&self, post: &BlogPost) -> Result<(), AppError> {
        self.collection
            .insert_one(post)
            .await
            .map_err(map_write_error)?;
        Ok(())
    }

    async fn replace(&self, post: &BlogPost) -> Result<bool, AppError> {
        let result = self
            .collection
            .replace_one(doc! { "_id": &post.id }, post)
            .await
            .map_err(map_write_error)?;
        Ok(result.matched_count > 0)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<BlogPost>, AppError> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<BlogPost>, AppError> {
        Ok(self.collection.find_one(doc! { "slug": slug }).await?)
    }

    async fn list(
        &self,
        query: &BlogListQuery,
        include_unpublished: bool,
    ) -> Result<Page<BlogPost>, AppError> {
        let filter = query.to_filter(include_unpublished)?;
        let sort = if include_unpublished {
            doc! { "created_at": -1 }
        } else {
            doc! { "published_at": -1, "created_at": -1 }
        };
        find_page(&self.collection, filter, sort, query.pagination()).await
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

    async fn count(&self) -> Result<(u64, u64), AppError> {
        let total = self.collection.count_documents(doc! {}).await?;
        let published = self
            .collection
            .count_documents(doc! { "published": true })
            .await?;
        Ok((total, published))
    }
}
