//! Personality and language catalogs for the selectors

use axum::{Json, Router, routing::get};

use crate::language::{LANGUAGES, Language};
use crate::personality::{PERSONALITIES, Personality};

async fn list_personalities() -> Json<&'static [Personality]> {
    Json(&PERSONALITIES)
}

async fn list_languages() -> Json<&'static [Language]> {
    Json(&LANGUAGES)
}

/// Build catalog router
pub fn router() -> Router {
    Router::new()
        .route("/api/personalities", get(list_personalities))
        .route("/api/languages", get(list_languages))
}
