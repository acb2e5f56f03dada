pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod gate;
pub mod rate_limit;
pub mod api {
    pub mod blogs;
    pub mod comments;
    pub mod errors;
    pub mod models;
    pub mod settings;
    pub mod stats;
    pub mod users;
}
pub mod content {
    pub mod html;
    pub mod slug;
    pub mod spam;
}
pub mod db {
    pub mod blog_repository;
    pub mod comment_repository;
    pub mod model_repository;
    pub mod models;
    pub mod query;
    pub mod settings_repository;
    pub mod user_repository;
}
pub mod web {
    pub mod pages;
    pub mod templates;
}

#[cfg(test)]
mod test_helpers;
