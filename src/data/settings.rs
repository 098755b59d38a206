use serde::{Deserialize, Serialize};

/// The comment moderation policy, one row per deployment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationPolicy {
    /// Whether comments are shown and accepted at all.
    #[serde(rename = "enable_comments")]
    pub enabled: bool,

    /// New comments start out pending until a moderator approves them.
    pub require_approval: bool,

    /// Stored for the admin form. Anonymous posting is never accepted.
    pub allow_anonymous: bool,

    #[serde(rename = "enable_reply")]
    pub allow_reply: bool,

    /// Shortest accepted body in characters. Empty bodies are refused even at 0.
    pub min_length: usize,
    pub max_length: usize,

    /// Bodies containing any of these (case-insensitively) are refused.
    #[serde(default)]
    pub blocked_keywords: Vec<String>,
}

impl Default for ModerationPolicy {
    /// The policy used when no settings row exists.
    fn default() -> Self {
        Self {
            enabled: true,
            require_approval: true,
            allow_anonymous: false,
            allow_reply: true,
            min_length: 1,
            max_length: 1000,
            blocked_keywords: Vec::new(),
        }
    }
}

impl ModerationPolicy {
    /// The first blocked keyword found in the body.
    pub fn blocked_keyword(&self, body: &str) -> Option<&str> {
        let body = body.to_lowercase();
        self.blocked_keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .find(|k| body.contains(&k.to_lowercase()))
    }
}

/// General site presentation settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSettings {
    pub site_name: String,
    #[serde(default)]
    pub site_description: String,
    #[serde(default)]
    pub site_url: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub footer_text: String,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            site_name: "Tidepost".to_owned(),
            site_description: String::new(),
            site_url: None,
            logo_url: None,
            footer_text: "Written by hand, served by Tidepost.".to_owned(),
        }
    }
}
