use async_trait::async_trait;
use bson::doc;
use chrono::Utc;
use mongodb::options::IndexOptions;
use mongodb::{Collection, Database, IndexModel};

use crate::db::models::{Settings, SETTINGS_KEY};
use crate::error::{is_duplicate_key, AppError};

/// Repository trait for the site settings singleton.
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Get the global settings, creating the document with defaults on first
    /// access.
    async fn get_or_create(&self) -> Result<Settings, AppError>;

    /// Replace the global settings. The key is forced to `global` and
    /// `updated_at` is stamped.
    async fn update(&self, settings: Settings) -> Result<Settings, AppError>;
}

/// MongoDB implementation of the SettingsRepository.
pub struct MongoSettingsRepository {
    collection: Collection<Settings>,
}

impl MongoSettingsRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("settings"),
        }
    }

    /// Unique `key` so only one `global` document can ever be inserted.
    pub async fn ensure_indexes(&self) -> Result<(), AppError> {
        let key = IndexModel::builder()
            .keys(doc! { "key": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.collection.create_index(key).await?;
        Ok(())
    }
}

#[async_trait]
impl SettingsRepository for MongoSettingsRepository {
    async fn get_or_create(&self) -> Result<Settings, AppError> {
        use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};

        let mut defaults = bson::to_document(&Settings::default())
            .map_err(|e| AppError::Internal(e.to_string()))?;
        defaults.remove("key");

        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();

        let filter = doc! { "key": SETTINGS_KEY };
        let upserted = self
            .collection
            .find_one_and_update(filter.clone(), doc! { "$setOnInsert": defaults })
            .with_options(options)
            .await;

        // A concurrent first access lost the insert race on the unique index.
        let settings = match upserted {
            Ok(settings) => settings,
            Err(e) if is_duplicate_key(&e) => {
                tracing::debug!("Settings created concurrently, reading stored document");
                self.collection.find_one(filter).await?
            }
            Err(e) => return Err(e.into()),
        };

        Ok(settings.unwrap_or_default())
    }

    async fn update(&self, mut settings: Settings) -> Result<Settings, AppError> {
        use mongodb::options::ReplaceOptions;

        settings.key = SETTINGS_KEY.to_string();
        settings.updated_at = Some(Utc::now());

        let options = ReplaceOptions::builder().upsert(true).build();
        self.collection
            .replace_one(doc! { "key": SETTINGS_KEY }, &settings)
            .with_options(options)
            .await?;

        Ok(settings)
    }
}
