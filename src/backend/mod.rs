//! The hosted backend the blog runs on: auth, tables and object storage.
//!
//! Everything the application reads or writes goes through [`Backend`], so the
//! pages and the comment thread logic can be exercised against
//! [`memory::MemoryBackend`] in tests.

use async_trait::async_trait;

use crate::data::*;

#[cfg(test)]
pub mod memory;
pub mod supabase;

pub use supabase::SupabaseBackend;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The request never produced a response.
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with an error status.
    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },

    /// A unique constraint rejected an insert.
    #[error("record already exists")]
    Conflict,

    #[error("invalid credentials or expired session")]
    Unauthorized,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("could not decode response: {0}")]
    Decode(String),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// The result of registering a new account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignUp {
    /// `None` when the account must confirm its email before signing in.
    pub viewer: Option<Viewer>,
}

#[async_trait]
pub trait Backend: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> BackendResult<Viewer>;

    async fn sign_up(&self, email: &str, password: &str, username: &str)
        -> BackendResult<SignUp>;

    async fn sign_out(&self, viewer: &Viewer) -> BackendResult<()>;

    async fn profiles(&self, viewer: &Viewer) -> BackendResult<Vec<Profile>>;

    async fn set_role(&self, viewer: &Viewer, user_id: &str, role: Role) -> BackendResult<()>;

    /// Published posts, newest publication first.
    async fn published_posts(&self) -> BackendResult<Vec<Post>>;

    /// A single published post.
    async fn published_post(&self, id: &str) -> BackendResult<Option<Post>>;

    /// Every post regardless of status, newest first. `author` narrows to one author.
    async fn posts(&self, viewer: &Viewer, author: Option<&str>) -> BackendResult<Vec<Post>>;

    async fn post(&self, viewer: &Viewer, id: &str) -> BackendResult<Option<Post>>;

    async fn save_post(&self, viewer: &Viewer, draft: PostDraft) -> BackendResult<Post>;

    async fn delete_post(&self, viewer: &Viewer, id: &str) -> BackendResult<()>;

    async fn categories(&self) -> BackendResult<Vec<Category>>;

    /// Comments of one post with the given status, oldest first.
    ///
    /// Like counts are filled in, and the liked flag too when a viewer is given.
    async fn comments(
        &self,
        post_id: &str,
        status: CommentStatus,
        viewer: Option<&Viewer>,
    ) -> BackendResult<Vec<Comment>>;

    /// Every comment of every post and status, newest first.
    async fn all_comments(&self, viewer: &Viewer) -> BackendResult<Vec<Comment>>;

    async fn create_comment(&self, viewer: &Viewer, comment: NewComment)
        -> BackendResult<Comment>;

    async fn set_comment_status(
        &self,
        viewer: &Viewer,
        id: &str,
        status: CommentStatus,
    ) -> BackendResult<()>;

    async fn delete_comment(&self, viewer: &Viewer, id: &str) -> BackendResult<()>;

    /// Like the comment, or remove the like if the viewer already likes it.
    async fn toggle_like(&self, viewer: &Viewer, comment_id: &str) -> BackendResult<LikeAction>;

    /// The moderation policy row, if one has been configured.
    async fn moderation_policy(&self) -> BackendResult<Option<ModerationPolicy>>;

    async fn save_moderation_policy(
        &self,
        viewer: &Viewer,
        policy: &ModerationPolicy,
    ) -> BackendResult<()>;

    async fn site_settings(&self) -> BackendResult<Option<SiteSettings>>;

    async fn save_site_settings(&self, viewer: &Viewer, settings: &SiteSettings)
        -> BackendResult<()>;

    async fn stats(&self, viewer: &Viewer) -> BackendResult<Stats>;

    /// Store an object in the image bucket.
    async fn upload_image(
        &self,
        viewer: &Viewer,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> BackendResult<()>;

    async fn remove_image(&self, viewer: &Viewer, path: &str) -> BackendResult<()>;

    /// The public URL of an object in the image bucket.
    fn image_url(&self, path: &str) -> String;
}
