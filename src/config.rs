use envconfig::Envconfig;

/// Server settings, read from the environment (and `.env` when present).
#[derive(Clone, Debug, Envconfig)]
pub struct Config {
    /// Base URL of the Supabase project, e.g. `https://abc.supabase.co`.
    #[envconfig(from = "SUPABASE_URL")]
    pub supabase_url: String,

    #[envconfig(from = "SUPABASE_ANON_KEY")]
    pub supabase_anon_key: String,

    #[envconfig(from = "HTTP_PORT", default = "3000")]
    pub http_port: u16,

    #[envconfig(from = "STORAGE_BUCKET", default = "images")]
    pub storage_bucket: String,

    /// Name of the cookie holding the session token.
    #[envconfig(from = "SESSION_COOKIE", default = "tidepost_session")]
    pub session_cookie: String,
}

impl Config {
    /// Load `.env` if there is one, then read the environment.
    pub fn load() -> Result<Self, envconfig::Error> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!("could not read .env: {e}");
            }
        }
        Self::init_from_env()
    }
}

#[cfg(test)]
impl Config {
    pub fn test() -> Self {
        Self {
            supabase_url: "https://supabase.test".to_owned(),
            supabase_anon_key: "anon".to_owned(),
            http_port: 3000,
            storage_bucket: "images".to_owned(),
            session_cookie: "tidepost_session".to_owned(),
        }
    }
}
