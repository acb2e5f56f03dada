use axum::response::Html;
use tera::{Context, Tera};

use crate::error::AppError;

/// Templates compiled into the binary, registered under their file names.
const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../../templates/base.html")),
    ("home.html", include_str!("../../templates/home.html")),
    ("blog_list.html", include_str!("../../templates/blog_list.html")),
    ("blog_post.html", include_str!("../../templates/blog_post.html")),
    ("model_list.html", include_str!("../../templates/model_list.html")),
    ("model_detail.html", include_str!("../../templates/model_detail.html")),
    ("comments.html", include_str!("../../templates/comments.html")),
    ("admin_login.html", include_str!("../../templates/admin_login.html")),
    ("admin_dashboard.html", include_str!("../../templates/admin_dashboard.html")),
    ("not_found.html", include_str!("../../templates/not_found.html")),
];

pub fn load() -> Result<Tera, AppError> {
    let mut tera = Tera::default();
    tera.add_raw_templates(TEMPLATES.iter().copied())
        .map_err(|e| AppError::Internal(format!("Failed to load templates: {e}")))?;
    Ok(tera)
}

pub fn render(tera: &Tera, name: &str, context: &Context) -> Result<Html<String>, AppError> {
    tera.render(name, context).map(Html).map_err(|e| {
        AppError::Internal(format!("Failed to render template '{name}': {e:?}"))
    })
}
