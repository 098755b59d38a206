use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use backend::{Backend, SupabaseBackend};
use config::Config;

mod backend;
mod config;
mod data;
mod html;
mod image;
mod routes;
mod search;
mod thread;

#[derive(Clone)]
pub struct AppState {
    backend: Arc<dyn Backend>,
    config: Arc<Config>,

    /// Signed-in browsers by session token.
    sessions: Arc<Mutex<HashMap<String, routes::auth::Session>>>,
}

impl AppState {
    pub fn new(backend: Arc<dyn Backend>, config: Config) -> Self {
        Self {
            backend,
            config: Arc::new(config),
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::pages::home))
        .route("/admin", get(routes::admin::admin))
        .route("/admin/comment/:id/:action", post(routes::admin::moderate_comment))
        .route("/admin/comments", post(routes::admin::save_policy))
        .route("/admin/post/:id/delete", post(routes::admin::delete_post))
        .route("/admin/role/:user", post(routes::admin::set_role))
        .route("/admin/site", post(routes::admin::save_site))
        .route("/dashboard", get(routes::dashboard::dashboard))
        .route("/dashboard/delete/:id", post(routes::dashboard::delete_post))
        .route("/dashboard/edit/:id", get(routes::dashboard::edit_post))
        .route("/dashboard/new", get(routes::dashboard::new_post))
        .route("/dashboard/save", post(routes::dashboard::save_post))
        .route(
            "/image",
            post(routes::files::upload_image)
                .delete(routes::files::delete_image)
                .layer(DefaultBodyLimit::max(image::MAX_IMAGE_BYTES + 1)),
        )
        .route("/login", get(routes::auth::login_page).post(routes::auth::login))
        .route("/logout", post(routes::auth::logout))
        .route("/post/:id", get(routes::pages::post))
        .route("/post/:id/comment", post(routes::post::comment))
        .route("/post/:id/like/:comment", post(routes::post::like))
        .route("/posts", get(routes::pages::posts))
        .route("/script/:file", get(routes::files::script))
        .route("/signup", get(routes::auth::signup_page).post(routes::auth::signup))
        .route("/style/:file", get(routes::files::style))
        .with_state(state)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let backend = match SupabaseBackend::new(
        &config.supabase_url,
        &config.supabase_anon_key,
        &config.storage_bucket,
    ) {
        Ok(backend) => backend,
        Err(e) => {
            tracing::error!("could not create the backend client: {e}");
            std::process::exit(1);
        }
    };

    let address = format!("0.0.0.0:{}", config.http_port);
    let app = router(AppState::new(Arc::new(backend), config));

    let listener = match TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("could not listen on {address}: {e}");
            std::process::exit(1);
        }
    };
    tracing::info!("listening on {address}");

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server stopped: {e}");
    }
}
