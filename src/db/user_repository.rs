use async_trait::async_trait;
use bson::doc;
use chrono::{SecondsFormat, Utc};
use mongodb::options::IndexOptions;
use mongodb::{Collection, Database, IndexModel};

use crate::db::models::User;
use crate::db::query::{find_page, Page, Pagination};
use crate::error::AppError;

/// Repository trait for user accounts. Emails are unique and stored
/// lowercased; callers normalize before querying.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert(&self, user: &User) -> Result<(), AppError>;

    /// Returns `false` when no user matched.
    async fn replace(&self, user: &User) -> Result<bool, AppError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn list(&self, pagination: Pagination) -> Result<Page<User>, AppError>;

    async fn delete(&self, id: &str) -> Result<bool, AppError>;

    /// Add a model id to the user's bookmarks (no duplicates). Returns the
    /// updated user, or `None` when the user does not exist.
    async fn add_bookmark(&self, user_id: &str, model_id: &str) -> Result<Option<User>, AppError>;

    async fn remove_bookmark(
        &self,
        user_id: &str,
        model_id: &str,
    ) -> Result<Option<User>, AppError>;

    async fn count(&self) -> Result<u64, AppError>;
}

/// MongoDB implementation of the UserRepository.
pub struct MongoUserRepository {
    collection: Collection<User>,
}

impl MongoUserRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("users"),
        }
    }

    pub async fn ensure_indexes(&self) -> Result<(), AppError> {
        let email = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.collection.create_index(email).await?;
        Ok(())
    }

    async fn update_bookmarks(
        &self,
        user_id: &str,
        update: bson::Document,
    ) -> Result<Option<User>, AppError> {
        use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        Ok(self
            .collection
            .find_one_and_update(doc! { "_id": user_id }, update)
            .with_options(options)
            .await?)
    }
}

fn map_write_error(err: mongodb::error::Error) -> AppError {
    AppError::from_mongo(err, "User", "email")
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    async fn insert(&self, user: &User) -> Result<(), AppError> {
        self.collection
            .insert_one(user)
            .await
            .map_err(map_write_error)?;
        Ok(())
    }

    async fn replace(&self, user: &User) -> Result<bool, AppError> {
        let result = self
            .collection
            .replace_one(doc! { "_id": &user.id }, user)
            .await
            .map_err(map_write_error)?;
        Ok(result.matched_count > 0)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.collection.find_one(doc! { "email": email }).await?)
    }

    async fn list(&self, pagination: Pagination) -> Result<Page<User>, AppError> {
        find_page(
            &self.collection,
            doc! {},
            doc! { "created_at": -1 },
            pagination,
        )
        .await
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        let result = self.collection.delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count > 0)
    }

    async fn add_bookmark(&self, user_id: &str, model_id: &str) -> Result<Option<User>, AppError> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::AutoSi, true);
        self.update_bookmarks(
            user_id,
            doc! {
                "$addToSet": { "bookmarks": model_id },
                "$set": { "updated_at": now },
            },
        )
        .await
    }

    async fn remove_bookmark(
        &self,
        user_id: &str,
        model_id: &str,
    ) -> Result<Option<User>, AppError> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::AutoSi, true);
        self.update_bookmarks(
            user_id,
            doc! {
                "$pull": { "bookmarks": model_id },
                "$set": { "updated_at": now },
            },
        )
        .await
    }

    async fn count(&self) -> Result<u64, AppError> {
        Ok(self.collection.count_documents(doc! {}).await?)
    }
}
