use async_trait::async_trait;
use bson::doc;
use futures::TryStreamExt;
use mongodb::options::FindOptions;
use mongodb::{Collection, Database, IndexModel};

use crate::db::models::{Comment, PostType};
use crate::db::query::{find_page, visible_comments_filter, CommentListQuery, Page};
use crate::error::AppError;

/// Repository trait for comments.
#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn insert(&self, comment: &Comment) -> Result<(), AppError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Comment>, AppError>;

    /// Approved comments under one post, oldest first.
    async fn list_visible(&self, post_id: &str, post_type: PostType)
        -> Result<Vec<Comment>, AppError>;

    /// Moderation listing, newest first.
    async fn list(&self, query: &CommentListQuery) -> Result<Page<Comment>, AppError>;

    /// Returns the updated comment, or `None` when it does not exist.
    async fn set_approved(&self, id: &str, approved: bool) -> Result<Option<Comment>, AppError>;

    /// Returns the new like count, or `None` when the comment does not exist.
    async fn increment_likes(&self, id: &str) -> Result<Option<i64>, AppError>;

    async fn delete(&self, id: &str) -> Result<bool, AppError>;

    /// Comments still waiting for moderation.
    async fn count_pending(&self) -> Result<u64, AppError>;

    async fn count(&self) -> Result<u64, AppError>;
}

/// MongoDB implementation of the CommentRepository.
pub struct MongoCommentRepository {
    collection: Collection<Comment>,
}

impl MongoCommentRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("comments"),
        }
    }

    pub async fn ensure_indexes(&self) -> Result<(), AppError> {
        let by_post = IndexModel::builder()
            .keys(doc! { "post_id": 1, "post_type": 1, "approved": 1 })
            .build();
        self.collection.create_index(by_post).await?;
        Ok(())
    }

    async fn find_and_update(
        &self,
        id: &str,
        update: bson::Document,
    ) -> Result<Option<Comment>, AppError> {
        use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        Ok(self
            .collection
            .find_one_and_update(doc! { "_id": id }, update)
            .with_options(options)
            .await?)
    }
}

#[async_trait]
impl CommentRepository for MongoCommentRepository {
    async fn insert(&self, comment: &Comment) -> Result<(), AppError> {
        self.collection.insert_one(comment).await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Comment>, AppError> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    async fn list_visible(
        &self,
        post_id: &str,
        post_type: PostType,
    ) -> Result<Vec<Comment>, AppError> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": 1 })
            .build();

        let comments = self
            .collection
            .find(visible_comments_filter(post_id, post_type))
            .with_options(options)
            .await?
            .try_collect()
            .await?;
        Ok(comments)
    }

    async fn list(&self, query: &CommentListQuery) -> Result<Page<Comment>, AppError> {
        find_page(
            &self.collection,
            query.to_filter(),
            doc! { "created_at": -1 },
            query.pagination(),
        )
        .await
    }

    async fn set_approved(&self, id: &str, approved: bool) -> Result<Option<Comment>, AppError> {
        self.find_and_update(id, doc! { "$set": { "approved": approved } })
            .await
    }

    async fn increment_likes(&self, id: &str) -> Result<Option<i64>, AppError> {
        let updated = self
            .find_and_update(id, doc! { "$inc": { "likes": 1 } })
            .await?;
        Ok(updated.map(|comment| comment.likes))
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        let result = self.collection.delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count > 0)
    }

    async fn count_pending(&self) -> Result<u64, AppError> {
        Ok(self
            .collection
            .count_documents(doc! { "approved": false })
            .await?)
    }

    async fn count(&self) -> Result<u64, AppError> {
        Ok(self.collection.count_documents(doc! {}).await?)
    }
}
