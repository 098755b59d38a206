use std::sync::{Arc, PoisonError};

use axum::body::Bytes;
use axum::extract::{Form, Path as ReqPath, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use maud::Markup;
use serde::Deserialize;

use crate::backend::BackendError;
use crate::data::*;
use crate::html::{self, components::Notice, Layout};
use crate::thread::{self, ThreadManager};
use crate::AppState;

pub mod admin;
pub mod auth;
pub mod dashboard;
pub mod files;
pub mod pages;
pub mod post;

/// A rendered page, or a rendered error page with its status.
pub type PageResult = Result<Markup, (StatusCode, Markup)>;

pub fn get_cookie<'a>(headers: &'a HeaderMap, key: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookie| cookie.split(';'))
        .find_map(|pair| pair.trim().strip_prefix(key)?.strip_prefix('='))
}

/// The site settings, or the defaults when none are stored or they cannot be read.
async fn site_settings(state: &AppState) -> SiteSettings {
    match state.backend.site_settings().await {
        Ok(settings) => settings.unwrap_or_default(),
        Err(e) => {
            tracing::warn!("could not load site settings: {e}");
            SiteSettings::default()
        }
    }
}

/// The post page with its comment thread.
///
/// A thread holding another post's comments is never shown.
fn post_page(layout: Layout, post: &Post, thread: &ThreadManager, notice: Option<&Notice>) -> PageResult {
    let view = thread.view();
    if view.post_id != post.id {
        tracing::error!("refusing to show the thread of post {} on post {}", view.post_id, post.id);
        let page = html::pages::error(layout, "The comments of this post could not be shown.");
        return Err((StatusCode::INTERNAL_SERVER_ERROR, page));
    }
    Ok(html::pages::post::post(layout, post, &view, notice))
}

fn failure(layout: Layout, e: BackendError) -> (StatusCode, Markup) {
    tracing::error!("backend request failed: {e}");
    let status = match e {
        BackendError::Unauthorized => StatusCode::UNAUTHORIZED,
        BackendError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_GATEWAY,
    };
    (status, html::pages::error(layout, &e.to_string()))
}
