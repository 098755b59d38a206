use crate::html::pages::admin::Overview;

use super::*;

/// The signed-in admin, or the response to send instead.
async fn require_admin(headers: &HeaderMap, state: &AppState) -> Result<Viewer, Response> {
    let viewer = dashboard::require_viewer(headers, state)?;
    if viewer.is_admin() {
        return Ok(viewer);
    }
    tracing::warn!("{} was refused the admin dashboard", viewer.username);
    let site = site_settings(state).await;
    let layout = Layout { viewer: Some(&viewer), site: &site };
    Err((StatusCode::FORBIDDEN, html::pages::forbidden(layout)).into_response())
}

async fn overview(state: &AppState, viewer: &Viewer) -> Result<Overview, BackendError> {
    let backend = state.backend.as_ref();
    let (stats, profiles, comments, posts) = tokio::try_join!(
        backend.stats(viewer),
        backend.profiles(viewer),
        backend.all_comments(viewer),
        backend.posts(viewer, None),
    )?;

    Ok(Overview {
        stats,
        profiles,
        comments,
        posts,
        policy: thread::load_policy(backend).await,
        settings: backend.site_settings().await?.unwrap_or_default(),
    })
}

pub async fn admin(headers: HeaderMap, State(state): State<AppState>) -> Response {
    let viewer = match require_admin(&headers, &state).await {
        Ok(viewer) => viewer,
        Err(response) => return response,
    };
    let site = site_settings(&state).await;
    let layout = Layout { viewer: Some(&viewer), site: &site };

    match overview(&state, &viewer).await {
        Ok(overview) => html::pages::admin::admin(layout, &overview, None).into_response(),
        Err(e) => failure(layout, e).into_response(),
    }
}

/// Back to the dashboard after an action, or the error page when it failed.
async fn finish(state: &AppState, viewer: &Viewer, result: Result<(), BackendError>) -> Response {
    match result {
        Ok(()) => Redirect::to("/admin").into_response(),
        Err(e) => {
            let site = site_settings(state).await;
            let layout = Layout { viewer: Some(viewer), site: &site };
            failure(layout, e).into_response()
        }
    }
}

#[derive(Deserialize)]
pub struct RoleForm {
    role: Role,
}

pub async fn set_role(
    headers: HeaderMap,
    State(state): State<AppState>,
    ReqPath(user_id): ReqPath<String>,
    Form(form): Form<RoleForm>,
) -> Response {
    let viewer = match require_admin(&headers, &state).await {
        Ok(viewer) => viewer,
        Err(response) => return response,
    };

    let result = state.backend.set_role(&viewer, &user_id, form.role).await;
    if result.is_ok() {
        tracing::info!("{} made {user_id} {}", viewer.username, form.role.as_str());
    }
    finish(&state, &viewer, result).await
}

pub async fn moderate_comment(
    headers: HeaderMap,
    State(state): State<AppState>,
    ReqPath((id, action)): ReqPath<(String, String)>,
) -> Response {
    let viewer = match require_admin(&headers, &state).await {
        Ok(viewer) => viewer,
        Err(response) => return response,
    };

    let backend = &state.backend;
    let result = match action.as_str() {
        "approved" => backend.set_comment_status(&viewer, &id, CommentStatus::Approved).await,
        "rejected" => backend.set_comment_status(&viewer, &id, CommentStatus::Rejected).await,
        "pending" => backend.set_comment_status(&viewer, &id, CommentStatus::Pending).await,
        "delete" => backend.delete_comment(&viewer, &id).await,
        _ => return StatusCode::NOT_FOUND.into_response(),
    };
    if result.is_ok() {
        tracing::info!("{} moderated comment {id}: {action}", viewer.username);
    }
    finish(&state, &viewer, result).await
}

pub async fn delete_post(
    headers: HeaderMap,
    State(state): State<AppState>,
    ReqPath(id): ReqPath<String>,
) -> Response {
    let viewer = match require_admin(&headers, &state).await {
        Ok(viewer) => viewer,
        Err(response) => return response,
    };

    let result = state.backend.delete_post(&viewer, &id).await;
    finish(&state, &viewer, result).await
}

/// The comment settings form. Unchecked boxes are simply absent.
#[derive(Deserialize)]
pub struct PolicyForm {
    enabled: Option<String>,
    require_approval: Option<String>,
    allow_anonymous: Option<String>,
    allow_reply: Option<String>,
    min_length: usize,
    max_length: usize,
    #[serde(default)]
    blocked_keywords: String,
}

impl From<PolicyForm> for ModerationPolicy {
    fn from(form: PolicyForm) -> Self {
        let max_length = form.max_length.max(1);
        Self {
            enabled: form.enabled.is_some(),
            require_approval: form.require_approval.is_some(),
            allow_anonymous: form.allow_anonymous.is_some(),
            allow_reply: form.allow_reply.is_some(),
            min_length: form.min_length.min(max_length),
            max_length,
            blocked_keywords: form
                .blocked_keywords
                .split([',', '\n'])
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_owned)
                .collect(),
        }
    }
}

pub async fn save_policy(
    headers: HeaderMap,
    State(state): State<AppState>,
    Form(form): Form<PolicyForm>,
) -> Response {
    let viewer = match require_admin(&headers, &state).await {
        Ok(viewer) => viewer,
        Err(response) => return response,
    };

    let policy = ModerationPolicy::from(form);
    let result = state.backend.save_moderation_policy(&viewer, &policy).await;
    finish(&state, &viewer, result).await
}

#[derive(Deserialize)]
pub struct SiteForm {
    site_name: String,
    #[serde(default)]
    site_description: String,
    #[serde(default)]
    site_url: String,
    #[serde(default)]
    logo_url: String,
    #[serde(default)]
    footer_text: String,
}

impl From<SiteForm> for SiteSettings {
    fn from(form: SiteForm) -> Self {
        let optional = |value: String| {
            let value = value.trim().to_owned();
            (!value.is_empty()).then_some(value)
        };
        Self {
            site_name: form.site_name.trim().to_owned(),
            site_description: form.site_description.trim().to_owned(),
            site_url: optional(form.site_url),
            logo_url: optional(form.logo_url),
            footer_text: form.footer_text.trim().to_owned(),
        }
    }
}

pub async fn save_site(
    headers: HeaderMap,
    State(state): State<AppState>,
    Form(form): Form<SiteForm>,
) -> Response {
    let viewer = match require_admin(&headers, &state).await {
        Ok(viewer) => viewer,
        Err(response) => return response,
    };

    let settings = SiteSettings::from(form);
    let result = state.backend.save_site_settings(&viewer, &settings).await;
    finish(&state, &viewer, result).await
}

#[cfg(test)]
mod tests {
    use super::super::tests::*;
    use super::*;
    use crate::backend::memory::MemoryBackend;
    use crate::backend::Backend;

    async fn admin_session() -> (Arc<MemoryBackend>, AppState, String) {
        let backend = Arc::new(MemoryBackend::new());
        backend.add_account("root@example.com", "pw", "root", Role::Admin);
        backend.add_account("bo@example.com", "pw", "bo", Role::Subscriber);
        let state = state(&backend);
        let cookie = sign_in(&state, "root@example.com", "pw").await;
        (backend, state, cookie)
    }

    #[tokio::test]
    async fn non_admins_are_forbidden() {
        let (backend, state, _) = admin_session().await;
        let cookie = sign_in(&state, "bo@example.com", "pw").await;

        let (status, _, body) = send(&state, get("/admin", Some(&cookie))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body.contains("Access denied"));

        let (status, _, _) = send(&state, form("/admin/role/user-bo", Some(&cookie), "role=admin")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(!backend.calls().contains(&"set_role"));
    }

    #[tokio::test]
    async fn dashboard_shows_stats_and_comments() {
        let (backend, state, cookie) = admin_session().await;
        backend.insert_post("p1", "Tides", PostStatus::Published);
        backend.insert_comment("c1", "p1", None, CommentStatus::Pending);

        let (status, _, body) = send(&state, get("/admin", Some(&cookie))).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<b>2</b> users"));
        assert!(body.contains("comment c1"));
        assert!(body.contains("/admin/comment/c1/approved"));
    }

    #[tokio::test]
    async fn approving_a_comment_publishes_it() {
        let (backend, state, cookie) = admin_session().await;
        backend.insert_post("p1", "Tides", PostStatus::Published);
        backend.insert_comment("c1", "p1", None, CommentStatus::Pending);

        let (status, _, _) = send(&state, form("/admin/comment/c1/approved", Some(&cookie), "")).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(backend.comment("c1").unwrap().status, CommentStatus::Approved);

        let (_, _, page) = send(&state, get("/post/p1", None)).await;
        assert!(page.contains("comment c1"));
    }

    #[tokio::test]
    async fn comment_settings_are_saved() {
        let (backend, state, cookie) = admin_session().await;

        let body = "enabled=on&allow_reply=on&min_length=3&max_length=200&blocked_keywords=spam%2C+scam";
        send(&state, form("/admin/comments", Some(&cookie), body)).await;

        let policy = thread::load_policy(backend.as_ref()).await;
        assert!(policy.enabled);
        assert!(!policy.require_approval);
        assert_eq!(policy.min_length, 3);
        assert_eq!(policy.blocked_keywords, ["spam", "scam"]);
    }

    #[tokio::test]
    async fn roles_can_be_changed() {
        let (backend, state, cookie) = admin_session().await;

        send(&state, form("/admin/role/user-bo", Some(&cookie), "role=editor")).await;

        let root = backend.add_account("x@example.com", "pw", "x", Role::Admin);
        let profiles = backend.profiles(&root).await.unwrap();
        let bo = profiles.iter().find(|p| p.id == "user-bo").unwrap();
        assert_eq!(bo.role, Role::Editor);
    }
}
