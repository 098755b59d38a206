use crate::thread::{LoadState, SubmitOutcome, ThreadError};

use super::*;

/// Make sure the thread holds a tree to validate replies and likes against.
async fn ensure_loaded(thread: &ThreadManager, viewer: Option<&Viewer>) {
    if thread.load_state() == LoadState::Ready {
        return;
    }
    if let Err(e) = thread.reload(viewer).await {
        tracing::warn!("loading comments for post {} failed: {e}", thread.post_id());
    }
}

#[derive(Deserialize)]
pub struct CommentForm {
    body: String,
    #[serde(default)]
    parent: Option<String>,
}

pub async fn comment(
    headers: HeaderMap,
    State(state): State<AppState>,
    ReqPath(id): ReqPath<String>,
    Form(form): Form<CommentForm>,
) -> PageResult {
    let viewer = auth::get_viewer(&headers, &state);
    let site = site_settings(&state).await;
    let layout = Layout { viewer: viewer.as_ref(), site: &site };

    let post = pages::published_post(&state, layout, &id).await?;
    let thread = auth::thread_for(&headers, &state, &id).await;
    ensure_loaded(&thread, viewer.as_ref()).await;

    let parent = form.parent.as_deref().filter(|p| !p.is_empty());
    let notice = match thread.submit(viewer.as_ref(), &form.body, parent).await {
        Ok(SubmitOutcome::Published(_)) => Notice::Info("Your comment was posted.".to_owned()),
        Ok(SubmitOutcome::PendingReview) => {
            Notice::Info("Thanks! Your comment will appear once it has been approved.".to_owned())
        }
        Ok(SubmitOutcome::Disabled) if parent.is_some() => {
            Notice::Error("Replies are turned off.".to_owned())
        }
        Ok(SubmitOutcome::Disabled) => Notice::Error("Comments are closed.".to_owned()),
        Err(ThreadError::Validation(e)) => Notice::Error(capitalize(&e.to_string())),
        Err(ThreadError::Backend(e)) => {
            Notice::Error(format!("Your comment could not be posted: {e}"))
        }
    };

    post_page(layout, &post, &thread, Some(&notice))
}

pub async fn like(
    headers: HeaderMap,
    State(state): State<AppState>,
    ReqPath((id, comment_id)): ReqPath<(String, String)>,
) -> PageResult {
    let viewer = auth::get_viewer(&headers, &state);
    let site = site_settings(&state).await;
    let layout = Layout { viewer: viewer.as_ref(), site: &site };

    let post = pages::published_post(&state, layout, &id).await?;
    let thread = auth::thread_for(&headers, &state, &id).await;
    ensure_loaded(&thread, viewer.as_ref()).await;

    let notice = match &viewer {
        None => Some(Notice::Error("Sign in to like comments.".to_owned())),
        Some(viewer) => match thread.toggle_like(viewer, &comment_id).await {
            Ok(_) => None,
            Err(e) => Some(Notice::Error(format!("Your like could not be saved: {e}"))),
        },
    };

    post_page(layout, &post, &thread, notice.as_ref())
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>() + ".",
        None => String::new(),
    }
}
