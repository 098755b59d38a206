use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;

use super::*;

/// How long a sign-in lasts.
const SESSION_DAYS: i64 = 30;

/// Comment threads a session keeps open at once. The least recently opened goes first.
const MAX_OPEN_THREADS: usize = 8;

/// Server-side state of a signed-in browser.
pub struct Session {
    pub viewer: Viewer,
    pub expires_at: DateTime<Utc>,

    /// One thread per post opened, most recently opened last.
    pub threads: Vec<Arc<ThreadManager>>,
}

impl Session {
    pub fn new(viewer: Viewer) -> Self {
        Self {
            viewer,
            expires_at: Utc::now() + Duration::days(SESSION_DAYS),
            threads: Vec::new(),
        }
    }

    fn expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

fn new_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(40)
        .map(char::from)
        .collect()
}

fn session_cookie(state: &AppState, token: &str, max_age: i64) -> String {
    format!(
        "{}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}",
        state.config.session_cookie
    )
}

/// The live session for a token. An expired session is removed on the way.
fn live_session<'a>(sessions: &'a mut HashMap<String, Session>, token: &str) -> Option<&'a mut Session> {
    if sessions.get(token)?.expired(Utc::now()) {
        if let Some(session) = sessions.remove(token) {
            tracing::info!("session of {} expired", session.viewer.username);
        }
        return None;
    }
    sessions.get_mut(token)
}

/// The viewer signed in on this browser, if any.
pub(super) fn get_viewer(headers: &HeaderMap, state: &AppState) -> Option<Viewer> {
    let token = get_cookie(headers, &state.config.session_cookie)?;
    let mut sessions = state.sessions.lock().unwrap_or_else(PoisonError::into_inner);
    live_session(&mut sessions, token).map(|s| s.viewer.clone())
}

/// The comment thread for a post.
///
/// A signed-in browser keeps one thread per post, so a request for one post
/// never disturbs a submission or load still running on another. Anonymous
/// readers get a fresh thread every time. The moderation policy is fetched
/// fresh on every call.
pub(super) async fn thread_for(
    headers: &HeaderMap,
    state: &AppState,
    post_id: &str,
) -> Arc<ThreadManager> {
    let policy = thread::load_policy(state.backend.as_ref()).await;

    let mut sessions = state.sessions.lock().unwrap_or_else(PoisonError::into_inner);
    let session = match get_cookie(headers, &state.config.session_cookie) {
        Some(token) => live_session(&mut sessions, token),
        None => None,
    };
    let Some(session) = session else {
        return Arc::new(ThreadManager::new(state.backend.clone(), post_id, policy));
    };

    let thread = match session.threads.iter().position(|t| t.post_id() == post_id) {
        Some(position) => {
            let thread = session.threads.remove(position);
            thread.set_policy(policy);
            thread
        }
        None => Arc::new(ThreadManager::new(state.backend.clone(), post_id, policy)),
    };
    session.threads.push(thread.clone());
    if session.threads.len() > MAX_OPEN_THREADS {
        session.threads.remove(0);
    }
    thread
}

pub async fn login_page(headers: HeaderMap, State(state): State<AppState>) -> Response {
    if get_viewer(&headers, &state).is_some() {
        return Redirect::to("/dashboard").into_response();
    }
    let site = site_settings(&state).await;
    html::pages::login(Layout { viewer: None, site: &site }, None).into_response()
}

pub async fn signup_page(headers: HeaderMap, State(state): State<AppState>) -> Response {
    if get_viewer(&headers, &state).is_some() {
        return Redirect::to("/dashboard").into_response();
    }
    let site = site_settings(&state).await;
    html::pages::signup(Layout { viewer: None, site: &site }, None).into_response()
}

#[derive(Deserialize)]
pub struct Credentials {
    email: String,
    password: String,
}

/// Start a session for the viewer and send the browser home.
fn start_session(state: &AppState, viewer: Viewer) -> Response {
    let token = new_token();
    tracing::info!("{} signed in", viewer.username);
    {
        let mut sessions = state.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Utc::now();
        sessions.retain(|_, session| !session.expired(now));
        sessions.insert(token.clone(), Session::new(viewer));
    }

    (
        [(header::SET_COOKIE, session_cookie(state, &token, SESSION_DAYS * 24 * 60 * 60))],
        Redirect::to("/"),
    )
        .into_response()
}

pub async fn login(State(state): State<AppState>, Form(form): Form<Credentials>) -> Response {
    match state.backend.sign_in(form.email.trim(), &form.password).await {
        Ok(viewer) => start_session(&state, viewer),
        Err(e) => {
            let notice = match e {
                BackendError::Unauthorized => Notice::Error("Invalid email or password.".to_owned()),
                e => {
                    tracing::error!("sign in failed: {e}");
                    Notice::Error("Signing in is unavailable right now.".to_owned())
                }
            };
            let site = site_settings(&state).await;
            let page = html::pages::login(Layout { viewer: None, site: &site }, Some(&notice));
            (StatusCode::UNAUTHORIZED, page).into_response()
        }
    }
}

#[derive(Deserialize)]
pub struct Registration {
    email: String,
    password: String,
    username: String,
}

pub async fn signup(State(state): State<AppState>, Form(form): Form<Registration>) -> Response {
    let username = form.username.trim();
    let result = if username.is_empty() {
        None
    } else {
        Some(state.backend.sign_up(form.email.trim(), &form.password, username).await)
    };

    let notice = match result {
        Some(Ok(signup)) => match signup.viewer {
            Some(viewer) => return start_session(&state, viewer),
            None => Notice::Info("Check your email to confirm your account, then sign in.".to_owned()),
        },
        Some(Err(BackendError::Conflict)) => {
            Notice::Error("An account with that email already exists.".to_owned())
        }
        Some(Err(e)) => {
            tracing::error!("sign up failed: {e}");
            Notice::Error(format!("Could not create the account: {e}"))
        }
        None => Notice::Error("Choose a username.".to_owned()),
    };

    let site = site_settings(&state).await;
    html::pages::signup(Layout { viewer: None, site: &site }, Some(&notice)).into_response()
}

pub async fn logout(headers: HeaderMap, State(state): State<AppState>) -> Response {
    let cookie = &state.config.session_cookie;
    let session = get_cookie(&headers, cookie).and_then(|token| {
        state
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(token)
    });

    if let Some(session) = session {
        if let Err(e) = state.backend.sign_out(&session.viewer).await {
            tracing::warn!("could not end the backend session: {e}");
        }
        tracing::info!("{} signed out", session.viewer.username);
    }

    (
        [(header::SET_COOKIE, session_cookie(&state, "", 0))],
        Redirect::to("/"),
    )
        .into_response()
}
