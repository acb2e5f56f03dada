//! Pagination and filter construction for list endpoints.

use bson::{doc, Document};
use futures::TryStreamExt;
use mongodb::options::FindOptions;
use mongodb::Collection;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::db::models::{PostStatus, PostType};
use crate::error::AppError;

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 50;
/// Highest page number a query may ask for.
pub const MAX_PAGE: u64 = 100_000;

/// Resolved page window (1-based page number).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
}

impl Pagination {
    /// Clamp raw query values: 1 ≤ page ≤ [`MAX_PAGE`], 1 ≤ limit ≤ [`MAX_PAGE_SIZE`].
    pub fn new(page: Option<u64>, limit: Option<u64>) -> Self {
        Self {
            page: page.unwrap_or(1).clamp(1, MAX_PAGE),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn skip(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of results plus the counts needed to render a pager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, pagination: Pagination) -> Self {
        Self {
            items,
            total,
            page: pagination.page,
            limit: pagination.limit,
            pages: total.div_ceil(pagination.limit),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
            pages: self.pages,
        }
    }
}

/// Run a counted, sorted and paginated `find`.
pub async fn find_page<T>(
    collection: &Collection<T>,
    filter: Document,
    sort: Document,
    pagination: Pagination,
) -> Result<Page<T>, AppError>
where
    T: DeserializeOwned + Unpin + Send + Sync,
{
    let total = collection.count_documents(filter.clone()).await?;

    let options = FindOptions::builder()
        .sort(sort)
        .skip(pagination.skip())
        .limit(pagination.limit as i64)
        .build();

    let items: Vec<T> = collection
        .find(filter)
        .with_options(options)
        .await?
        .try_collect()
        .await?;

    Ok(Page::new(items, total, pagination))
}

/// Query string accepted by the blog list endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlogListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub search: Option<String>,
    pub status: Option<String>,
}

impl BlogListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page, self.limit)
    }

    /// Parsed `status`, rejecting unknown values.
    pub fn status(&self) -> Result<Option<PostStatus>, AppError> {
        non_empty(&self.status)
            .map(|s| {
                PostStatus::from_str_ci(s)
                    .ok_or_else(|| AppError::BadRequest(format!("Invalid status '{s}'")))
            })
            .transpose()
    }

    /// Build the MongoDB filter. Without `include_unpublished` only published
    /// posts match, whatever `status` says.
    pub fn to_filter(&self, include_unpublished: bool) -> Result<Document, AppError> {
        let mut filter = Document::new();

        if include_unpublished {
            if let Some(status) = self.status()? {
                filter.insert("status", status.as_str());
            }
        } else {
            filter.insert("published", true);
        }

        if let Some(category) = non_empty(&self.category) {
            filter.insert("category", category);
        }
        if let Some(tag) = non_empty(&self.tag) {
            filter.insert("tags", tag);
        }
        if let Some(search) = non_empty(&self.search) {
            filter.insert("$or", search_clause(search, &["title", "excerpt", "tags"]));
        }

        Ok(filter)
    }
}

/// Query string accepted by the deal model list endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub industry: Option<String>,
    pub deal_type: Option<String>,
    pub featured: Option<bool>,
    pub search: Option<String>,
}

impl ModelListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page, self.limit)
    }

    pub fn to_filter(&self) -> Document {
        let mut filter = Document::new();

        if let Some(industry) = non_empty(&self.industry) {
            filter.insert("industry", industry);
        }
        if let Some(deal_type) = non_empty(&self.deal_type) {
            filter.insert("deal_type", deal_type);
        }
        if let Some(featured) = self.featured {
            filter.insert("featured", featured);
        }
        if let Some(search) = non_empty(&self.search) {
            filter.insert(
                "$or",
                search_clause(search, &["title", "description", "industry"]),
            );
        }

        filter
    }
}

/// Query string for the moderation list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub approved: Option<bool>,
    pub post_type: Option<PostType>,
    pub post_id: Option<String>,
}

impl CommentListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page, self.limit)
    }

    pub fn to_filter(&self) -> Document {
        let mut filter = Document::new();
        if let Some(approved) = self.approved {
            filter.insert("approved", approved);
        }
        if let Some(post_type) = self.post_type {
            filter.insert("post_type", post_type.as_str());
        }
        if let Some(post_id) = non_empty(&self.post_id) {
            filter.insert("post_id", post_id);
        }
        filter
    }
}

/// Filter for the comments shown under a post.
pub fn visible_comments_filter(post_id: &str, post_type: PostType) -> Document {
    doc! {
        "post_id": post_id,
        "post_type": post_type.as_str(),
        "approved": true,
    }
}

/// Case-insensitive substring match over `fields`. The term is regex-escaped.
pub fn search_clause(term: &str, fields: &[&str]) -> Vec<Document> {
    let pattern = regex::escape(term.trim());
    fields
        .iter()
        .map(|field| {
            let mut clause = Document::new();
            clause.insert(*field, doc! { "$regex": pattern.as_str(), "$options": "i" });
            clause
        })
        .collect()
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
