use crate::search;

use super::*;

/// Posts shown on the home page.
const LATEST_POSTS: usize = 6;

pub async fn home(headers: HeaderMap, State(state): State<AppState>) -> PageResult {
    let viewer = auth::get_viewer(&headers, &state);
    let site = site_settings(&state).await;
    let layout = Layout { viewer: viewer.as_ref(), site: &site };

    let mut posts = state.backend.published_posts().await.map_err(|e| failure(layout, e))?;
    posts.truncate(LATEST_POSTS);

    Ok(html::pages::home::home(layout, &posts))
}

#[derive(Deserialize)]
pub struct PostsQuery {
    #[serde(default)]
    q: String,
    page: Option<usize>,
}

pub async fn posts(
    headers: HeaderMap,
    State(state): State<AppState>,
    Query(query): Query<PostsQuery>,
) -> PageResult {
    let viewer = auth::get_viewer(&headers, &state);
    let site = site_settings(&state).await;
    let layout = Layout { viewer: viewer.as_ref(), site: &site };

    let posts = state.backend.published_posts().await.map_err(|e| failure(layout, e))?;
    let found = search::filter_posts(posts, &query.q);
    let page = search::paginate(&found, query.page.unwrap_or(1), search::POSTS_PER_PAGE);

    Ok(html::pages::home::posts(layout, &page, query.q.trim()))
}

pub async fn post(
    headers: HeaderMap,
    State(state): State<AppState>,
    ReqPath(id): ReqPath<String>,
) -> PageResult {
    let viewer = auth::get_viewer(&headers, &state);
    let site = site_settings(&state).await;
    let layout = Layout { viewer: viewer.as_ref(), site: &site };

    let post = published_post(&state, layout, &id).await?;
    let thread = auth::thread_for(&headers, &state, &id).await;
    if let Err(e) = thread.reload(viewer.as_ref()).await {
        tracing::warn!("showing post {id} without fresh comments: {e}");
    }

    post_page(layout, &post, &thread, None)
}

/// A published post, or the page to show instead.
pub(super) async fn published_post(
    state: &AppState,
    layout: Layout<'_>,
    id: &str,
) -> Result<Post, (StatusCode, Markup)> {
    match state.backend.published_post(id).await {
        Ok(Some(post)) => Ok(post),
        Ok(None) => Err((StatusCode::NOT_FOUND, html::pages::not_found(layout, "post"))),
        Err(e) => Err(failure(layout, e)),
    }
}
