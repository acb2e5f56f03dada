use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::models::Role;
use crate::content::html::{excerpt, read_time_minutes, sanitize_html, strip_tags};
use crate::error::AppError;

/// Generate a new document id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// ---------------------------------------------------------------------------
// Blog posts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl PostStatus {
    pub fn from_str_ci(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(PostStatus::Draft),
            "published" => Some(PostStatus::Published),
            "archived" => Some(PostStatus::Archived),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
            PostStatus::Archived => "archived",
        }
    }
}

/// A blog post stored in the `blogs` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogPost {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    /// Unique URL identifier.
    pub slug: String,
    /// Plain text, entity-escaped.
    #[serde(default)]
    pub excerpt: String,
    /// Sanitized HTML body.
    pub content: String,
    #[serde(default)]
    pub status: PostStatus,
    /// Id of the authoring user.
    pub author: String,
    #[serde(default)]
    pub author_name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub featured_image: Option<String>,
    #[serde(default)]
    pub published: bool,
    /// Set on the first save in published state, never changed afterwards.
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub views: i64,
    /// Estimated reading time in minutes.
    #[serde(default)]
    pub read_time: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BlogPost {
    /// Pre-save hook: keeps derived fields consistent with the content.
    pub fn prepare_for_save(&mut self, now: DateTime<Utc>) {
        self.content = sanitize_html(&self.content);
        self.excerpt = if self.excerpt.trim().is_empty() {
            excerpt(&self.content, 200)
        } else {
            strip_tags(&self.excerpt).trim().to_string()
        };
        self.read_time = read_time_minutes(&self.content);
        self.published = self.status == PostStatus::Published;
        if self.published && self.published_at.is_none() {
            self.published_at = Some(now);
        }
        self.updated_at = now;
    }
}

/// Create / update payload for blog posts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlogPostInput {
    pub title: String,
    /// Derived from the title when omitted.
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub excerpt: String,
    pub content: String,
    #[serde(default)]
    pub status: Option<PostStatus>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub featured_image: Option<String>,
}

// ---------------------------------------------------------------------------
// Deal models
// ---------------------------------------------------------------------------

/// One slide of a deal model presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub order: i32,
}

/// A financial "deal model" showcase stored in the `models` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealModel {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    /// Free-form, e.g. `$250M`.
    #[serde(default)]
    pub deal_size: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub deal_type: String,
    #[serde(default)]
    pub completion_date: Option<NaiveDate>,
    /// Always sorted by `order`.
    #[serde(default)]
    pub slides: Vec<Slide>,
    #[serde(default)]
    pub key_metrics: BTreeMap<String, String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DealModel {
    pub fn prepare_for_save(&mut self, now: DateTime<Utc>) {
        self.slides.sort_by_key(|slide| slide.order);
        self.updated_at = now;
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DealModelInput {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub deal_size: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub deal_type: String,
    #[serde(default)]
    pub completion_date: Option<NaiveDate>,
    #[serde(default)]
    pub slides: Vec<Slide>,
    #[serde(default)]
    pub key_metrics: BTreeMap<String, String>,
    #[serde(default)]
    pub featured: bool,
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// A user account. Never serialized to API clients; see [`UserProfile`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    /// Unique, stored lowercased.
    pub email: String,
    /// Argon2 PHC string.
    pub password_hash: String,
    #[serde(default)]
    pub role: Role,
    /// Bookmarked deal model ids.
    #[serde(default)]
    pub bookmarks: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The public shape of a user: everything but the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub bookmarks: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            bookmarks: user.bookmarks.clone(),
            created_at: user.created_at,
        }
    }
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        UserProfile::from(&user)
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Normalize `email` and check it has the `local@domain.tld` shape.
pub fn validate_email(email: &str) -> Result<String, AppError> {
    let email = normalize_email(email);
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(email)
    } else {
        Err(AppError::BadRequest("Invalid email address".into()))
    }
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

/// The kind of entity a comment is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    Blog,
    Model,
}

impl PostType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostType::Blog => "blog",
            PostType::Model => "model",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    /// Plain text; markup is stripped on submission.
    pub content: String,
    pub post_id: String,
    pub post_type: PostType,
    #[serde(default)]
    pub approved: bool,
    #[serde(default)]
    pub likes: i64,
    /// Parent comment for threaded replies.
    #[serde(default)]
    pub parent_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Comment as shown to site visitors (email withheld).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicComment {
    pub id: String,
    pub name: String,
    pub content: String,
    pub likes: i64,
    pub parent_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Comment> for PublicComment {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            name: comment.name,
            content: comment.content,
            likes: comment.likes,
            parent_id: comment.parent_id,
            created_at: comment.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentInput {
    pub name: String,
    pub email: String,
    pub content: String,
    pub post_id: String,
    pub post_type: PostType,
    #[serde(default)]
    pub parent_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

pub const SETTINGS_KEY: &str = "global";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialLinks {
    pub twitter: String,
    pub linkedin: String,
    pub github: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeoDefaults {
    pub meta_title: String,
    pub meta_description: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpSettings {
    pub host: String,
    pub port: i32,
    pub user: String,
    pub password: String,
    pub from: String,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 587,
            user: String::new(),
            password: String::new(),
            from: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecuritySettings {
    /// Hold every new comment for moderation, not only flagged ones.
    pub require_comment_approval: bool,
    /// Login attempts, successful or not, allowed per client and account within
    /// the rate-limit window.
    pub max_login_attempts: i32,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            require_comment_approval: false,
            max_login_attempts: 5,
        }
    }
}

/// Site-wide configuration. Exactly one document exists (key `global`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub key: String,
    pub site_name: String,
    pub site_description: String,
    pub contact_email: String,
    pub social: SocialLinks,
    pub seo: SeoDefaults,
    pub smtp: SmtpSettings,
    pub security: SecuritySettings,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            key: SETTINGS_KEY.to_string(),
            site_name: "Dealroom".to_string(),
            site_description: "M&A insights and deal model showcase".to_string(),
            contact_email: String::new(),
            social: SocialLinks::default(),
            seo: SeoDefaults::default(),
            smtp: SmtpSettings::default(),
            security: SecuritySettings::default(),
            updated_at: None,
        }
    }
}

/// Settings subset exposed to anonymous visitors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicSettings {
    pub site_name: String,
    pub site_description: String,
    pub contact_email: String,
    pub social: SocialLinks,
    pub seo: SeoDefaults,
}

impl From<Settings> for PublicSettings {
    fn from(settings: Settings) -> Self {
        Self {
            site_name: settings.site_name,
            site_description: settings.site_description,
            contact_email: settings.contact_email,
            social: settings.social,
            seo: settings.seo,
        }
    }
}
