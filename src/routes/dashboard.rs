use super::*;

/// The signed-in viewer, or a redirect to the sign-in page.
pub(super) fn require_viewer(headers: &HeaderMap, state: &AppState) -> Result<Viewer, Response> {
    auth::get_viewer(headers, state).ok_or_else(|| Redirect::to("/login").into_response())
}

fn may_edit(viewer: &Viewer, post: &Post) -> bool {
    viewer.is_admin() || (viewer.can_write() && post.author_id == viewer.id)
}

pub async fn dashboard(headers: HeaderMap, State(state): State<AppState>) -> Response {
    let viewer = match require_viewer(&headers, &state) {
        Ok(viewer) => viewer,
        Err(redirect) => return redirect,
    };
    let site = site_settings(&state).await;
    let layout = Layout { viewer: Some(&viewer), site: &site };

    match state.backend.posts(&viewer, Some(&viewer.id)).await {
        Ok(posts) => html::pages::dashboard::dashboard(layout, &viewer, &posts, None).into_response(),
        Err(e) => failure(layout, e).into_response(),
    }
}

pub async fn new_post(headers: HeaderMap, State(state): State<AppState>) -> Response {
    let viewer = match require_viewer(&headers, &state) {
        Ok(viewer) => viewer,
        Err(redirect) => return redirect,
    };
    let site = site_settings(&state).await;
    let layout = Layout { viewer: Some(&viewer), site: &site };

    if !viewer.can_write() {
        return (StatusCode::FORBIDDEN, html::pages::forbidden(layout)).into_response();
    }
    let categories = state.backend.categories().await.unwrap_or_else(|e| {
        tracing::warn!("could not load categories: {e}");
        Vec::new()
    });
    html::pages::dashboard::editor(layout, None, &categories, None).into_response()
}

pub async fn edit_post(
    headers: HeaderMap,
    State(state): State<AppState>,
    ReqPath(id): ReqPath<String>,
) -> Response {
    let viewer = match require_viewer(&headers, &state) {
        Ok(viewer) => viewer,
        Err(redirect) => return redirect,
    };
    let site = site_settings(&state).await;
    let layout = Layout { viewer: Some(&viewer), site: &site };

    let post = match state.backend.post(&viewer, &id).await {
        Ok(Some(post)) => post,
        Ok(None) => return (StatusCode::NOT_FOUND, html::pages::not_found(layout, "post")).into_response(),
        Err(e) => return failure(layout, e).into_response(),
    };
    if !may_edit(&viewer, &post) {
        return (StatusCode::FORBIDDEN, html::pages::forbidden(layout)).into_response();
    }
    let categories = state.backend.categories().await.unwrap_or_else(|e| {
        tracing::warn!("could not load categories: {e}");
        Vec::new()
    });
    html::pages::dashboard::editor(layout, Some(&post), &categories, None).into_response()
}

#[derive(Deserialize)]
pub struct PostForm {
    #[serde(default)]
    id: Option<String>,
    title: String,
    #[serde(default)]
    slug: String,
    #[serde(default)]
    excerpt: String,
    #[serde(default)]
    cover_image: String,
    #[serde(default)]
    category_id: String,
    status: PostStatus,
    content: String,
}

impl PostForm {
    fn into_draft(self, published_at: Option<chrono::DateTime<chrono::Utc>>) -> PostDraft {
        let optional = |value: String| {
            let value = value.trim().to_owned();
            (!value.is_empty()).then_some(value)
        };
        PostDraft {
            id: self.id.and_then(optional),
            title: self.title.trim().to_owned(),
            content: self.content,
            excerpt: optional(self.excerpt),
            slug: create_slug(&self.slug),
            cover_image: optional(self.cover_image),
            status: self.status,
            category_id: optional(self.category_id),
            published_at,
        }
    }
}

pub async fn save_post(
    headers: HeaderMap,
    State(state): State<AppState>,
    Form(form): Form<PostForm>,
) -> Response {
    let viewer = match require_viewer(&headers, &state) {
        Ok(viewer) => viewer,
        Err(redirect) => return redirect,
    };
    let site = site_settings(&state).await;
    let layout = Layout { viewer: Some(&viewer), site: &site };
    if !viewer.can_write() {
        return (StatusCode::FORBIDDEN, html::pages::forbidden(layout)).into_response();
    }

    // Editing keeps the original publication date.
    let mut published_at = None;
    if let Some(id) = form.id.as_deref().filter(|id| !id.is_empty()) {
        match state.backend.post(&viewer, id).await {
            Ok(Some(post)) if may_edit(&viewer, &post) => published_at = post.published_at,
            Ok(Some(_)) => {
                return (StatusCode::FORBIDDEN, html::pages::forbidden(layout)).into_response()
            }
            Ok(None) => {
                return (StatusCode::NOT_FOUND, html::pages::not_found(layout, "post")).into_response()
            }
            Err(e) => return failure(layout, e).into_response(),
        }
    }

    let draft = form.into_draft(published_at);
    if draft.title.is_empty() {
        let categories = state.backend.categories().await.unwrap_or_default();
        let notice = Notice::Error("A post needs a title.".to_owned());
        return html::pages::dashboard::editor(layout, None, &categories, Some(&notice)).into_response();
    }

    match state.backend.save_post(&viewer, draft).await {
        Ok(post) => {
            tracing::info!("{} saved post {} as {}", viewer.username, post.id, post.status.as_str());
            Redirect::to("/dashboard").into_response()
        }
        Err(e) => failure(layout, e).into_response(),
    }
}

pub async fn delete_post(
    headers: HeaderMap,
    State(state): State<AppState>,
    ReqPath(id): ReqPath<String>,
) -> Response {
    let viewer = match require_viewer(&headers, &state) {
        Ok(viewer) => viewer,
        Err(redirect) => return redirect,
    };
    let site = site_settings(&state).await;
    let layout = Layout { viewer: Some(&viewer), site: &site };

    match state.backend.post(&viewer, &id).await {
        Ok(Some(post)) if may_edit(&viewer, &post) => {}
        Ok(Some(_)) => return (StatusCode::FORBIDDEN, html::pages::forbidden(layout)).into_response(),
        Ok(None) => return (StatusCode::NOT_FOUND, html::pages::not_found(layout, "post")).into_response(),
        Err(e) => return failure(layout, e).into_response(),
    }

    match state.backend.delete_post(&viewer, &id).await {
        Ok(()) => {
            tracing::info!("{} deleted post {id}", viewer.username);
            Redirect::to("/dashboard").into_response()
        }
        Err(e) => failure(layout, e).into_response(),
    }
}
