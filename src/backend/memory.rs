//! An in-process backend for tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use tokio::sync::Notify;

use super::*;

#[derive(Default)]
struct Tables {
    comments: Vec<Comment>,
    likes: HashSet<(String, String)>,
    posts: Vec<Post>,
    categories: Vec<Category>,
    profiles: Vec<Profile>,
    accounts: Vec<(String, String, Viewer)>,
    policy: Option<ModerationPolicy>,
    site: Option<SiteSettings>,
    images: HashMap<String, Vec<u8>>,
}

/// Backend holding its tables in memory.
///
/// Writes can be made to fail, and comment creation can be held until
/// released, to exercise the failure and in-flight paths of callers.
#[derive(Default)]
pub struct MemoryBackend {
    tables: Mutex<Tables>,
    clock: AtomicI64,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    create_gate: Mutex<Option<Arc<Notify>>>,
    held: AtomicUsize,
    calls: Mutex<Vec<&'static str>>,
}

fn unavailable() -> BackendError {
    BackendError::Status {
        status: 503,
        message: "service unavailable".to_owned(),
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A strictly increasing timestamp.
    pub fn tick(&self) -> DateTime<Utc> {
        let n = self.clock.fetch_add(1, Ordering::SeqCst);
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(n)
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Hold every comment creation until the returned handle is notified.
    pub fn hold_creates(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.create_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// The number of comment creations currently waiting at the gate.
    pub fn held_creates(&self) -> usize {
        self.held.load(Ordering::SeqCst)
    }

    /// The names of the trait methods called so far.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn set_policy(&self, policy: Option<ModerationPolicy>) {
        self.tables.lock().unwrap().policy = policy;
    }

    /// Register an account that can sign in, with its profile row.
    pub fn add_account(&self, email: &str, password: &str, username: &str, role: Role) -> Viewer {
        let viewer = Viewer {
            id: format!("user-{username}"),
            email: email.to_owned(),
            username: username.to_owned(),
            avatar_url: None,
            role,
            access_token: format!("token-{username}"),
        };
        let mut tables = self.tables.lock().unwrap();
        tables.profiles.push(Profile {
            id: viewer.id.clone(),
            username: username.to_owned(),
            avatar_url: None,
            role,
            created_at: self.tick(),
        });
        tables
            .accounts
            .push((email.to_owned(), password.to_owned(), viewer.clone()));
        viewer
    }

    /// Insert a comment row directly, as if written by another client.
    pub fn insert_comment(
        &self,
        id: &str,
        post_id: &str,
        parent_id: Option<&str>,
        status: CommentStatus,
    ) -> Comment {
        let now = self.tick();
        let comment = Comment {
            id: id.to_owned(),
            content: format!("comment {id}"),
            status,
            post_id: post_id.to_owned(),
            user_id: "user-someone".to_owned(),
            parent_id: parent_id.map(str::to_owned),
            created_at: now,
            updated_at: now,
            author: Some(Author {
                name: "someone".to_owned(),
                avatar_url: None,
            }),
            likes: None,
            liked: None,
        };
        self.tables.lock().unwrap().comments.push(comment.clone());
        comment
    }

    /// Insert a post row directly.
    pub fn insert_post(&self, id: &str, title: &str, status: PostStatus) -> Post {
        let now = self.tick();
        let post = Post {
            id: id.to_owned(),
            title: title.to_owned(),
            content: format!("<p>{title}</p>"),
            excerpt: None,
            slug: create_slug(title),
            cover_image: None,
            status,
            author_id: "user-someone".to_owned(),
            category_id: None,
            published_at: (status == PostStatus::Published).then_some(now),
            created_at: now,
            updated_at: now,
            author: None,
            category: None,
        };
        self.tables.lock().unwrap().posts.push(post.clone());
        post
    }

    pub fn comment(&self, id: &str) -> Option<Comment> {
        let tables = self.tables.lock().unwrap();
        tables.comments.iter().find(|c| c.id == id).cloned()
    }

    pub fn image(&self, path: &str) -> Option<Vec<u8>> {
        self.tables.lock().unwrap().images.get(path).cloned()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }

    fn read(&self, call: &'static str) -> BackendResult<std::sync::MutexGuard<'_, Tables>> {
        self.record(call);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(self.tables.lock().unwrap())
    }

    fn write(&self, call: &'static str) -> BackendResult<std::sync::MutexGuard<'_, Tables>> {
        self.record(call);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(self.tables.lock().unwrap())
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn sign_in(&self, email: &str, password: &str) -> BackendResult<Viewer> {
        let tables = self.read("sign_in")?;
        tables
            .accounts
            .iter()
            .find(|(e, p, _)| e == email && p == password)
            .map(|(_, _, viewer)| viewer.clone())
            .ok_or(BackendError::Unauthorized)
    }

    async fn sign_up(&self, email: &str, password: &str, username: &str) -> BackendResult<SignUp> {
        if self.read("sign_up")?.accounts.iter().any(|(e, _, _)| e == email) {
            return Err(BackendError::Conflict);
        }
        let viewer = self.add_account(email, password, username, Role::Subscriber);
        Ok(SignUp {
            viewer: Some(viewer),
        })
    }

    async fn sign_out(&self, _viewer: &Viewer) -> BackendResult<()> {
        self.record("sign_out");
        Ok(())
    }

    async fn profiles(&self, _viewer: &Viewer) -> BackendResult<Vec<Profile>> {
        Ok(self.read("profiles")?.profiles.clone())
    }

    async fn set_role(&self, _viewer: &Viewer, user_id: &str, role: Role) -> BackendResult<()> {
        let mut tables = self.write("set_role")?;
        let profile = tables
            .profiles
            .iter_mut()
            .find(|p| p.id == user_id)
            .ok_or(BackendError::NotFound("profile"))?;
        profile.role = role;
        Ok(())
    }

    async fn published_posts(&self) -> BackendResult<Vec<Post>> {
        let tables = self.read("published_posts")?;
        let mut posts: Vec<_> = tables
            .posts
            .iter()
            .filter(|p| p.status == PostStatus::Published)
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        Ok(posts)
    }

    async fn published_post(&self, id: &str) -> BackendResult<Option<Post>> {
        let tables = self.read("published_post")?;
        Ok(tables
            .posts
            .iter()
            .find(|p| p.id == id && p.status == PostStatus::Published)
            .cloned())
    }

    async fn posts(&self, _viewer: &Viewer, author: Option<&str>) -> BackendResult<Vec<Post>> {
        let tables = self.read("posts")?;
        let mut posts: Vec<_> = tables
            .posts
            .iter()
            .filter(|p| author.map_or(true, |a| p.author_id == a))
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    async fn post(&self, _viewer: &Viewer, id: &str) -> BackendResult<Option<Post>> {
        let tables = self.read("post")?;
        Ok(tables.posts.iter().find(|p| p.id == id).cloned())
    }

    async fn save_post(&self, viewer: &Viewer, draft: PostDraft) -> BackendResult<Post> {
        let now = self.tick();
        let draft = draft.stamp(now);
        let mut tables = self.write("save_post")?;

        if let Some(id) = &draft.id {
            let post = tables
                .posts
                .iter_mut()
                .find(|p| &p.id == id)
                .ok_or(BackendError::NotFound("post"))?;
            post.title = draft.title;
            post.content = draft.content;
            post.excerpt = draft.excerpt;
            post.slug = draft.slug;
            post.cover_image = draft.cover_image;
            post.status = draft.status;
            post.category_id = draft.category_id;
            post.published_at = draft.published_at;
            post.updated_at = now;
            return Ok(post.clone());
        }

        let post = Post {
            id: format!("post-{}", tables.posts.len() + 1),
            title: draft.title,
            content: draft.content,
            excerpt: draft.excerpt,
            slug: draft.slug,
            cover_image: draft.cover_image,
            status: draft.status,
            author_id: viewer.id.clone(),
            category_id: draft.category_id,
            published_at: draft.published_at,
            created_at: now,
            updated_at: now,
            author: None,
            category: None,
        };
        tables.posts.push(post.clone());
        Ok(post)
    }

    async fn delete_post(&self, _viewer: &Viewer, id: &str) -> BackendResult<()> {
        self.write("delete_post")?.posts.retain(|p| p.id != id);
        Ok(())
    }

    async fn categories(&self) -> BackendResult<Vec<Category>> {
        Ok(self.read("categories")?.categories.clone())
    }

    async fn comments(
        &self,
        post_id: &str,
        status: CommentStatus,
        viewer: Option<&Viewer>,
    ) -> BackendResult<Vec<Comment>> {
        let tables = self.read("comments")?;
        let mut comments: Vec<_> = tables
            .comments
            .iter()
            .filter(|c| c.post_id == post_id && c.status == status)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        for comment in &mut comments {
            let likes = tables.likes.iter().filter(|(c, _)| c == &comment.id).count();
            comment.likes = Some(likes as u32);
            comment.liked = viewer.map(|v| tables.likes.contains(&(comment.id.clone(), v.id.clone())));
        }
        Ok(comments)
    }

    async fn all_comments(&self, _viewer: &Viewer) -> BackendResult<Vec<Comment>> {
        let mut comments = self.read("all_comments")?.comments.clone();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(comments)
    }

    async fn create_comment(&self, viewer: &Viewer, comment: NewComment) -> BackendResult<Comment> {
        let gate = self.create_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            self.held.fetch_add(1, Ordering::SeqCst);
            gate.notified().await;
            self.held.fetch_sub(1, Ordering::SeqCst);
        }

        let now = self.tick();
        let mut tables = self.write("create_comment")?;
        let comment = Comment {
            id: format!("c{}", tables.comments.len() + 1),
            content: comment.content,
            status: comment.status,
            post_id: comment.post_id,
            user_id: comment.user_id,
            parent_id: comment.parent_id,
            created_at: now,
            updated_at: now,
            author: Some(Author {
                name: viewer.username.clone(),
                avatar_url: viewer.avatar_url.clone(),
            }),
            likes: None,
            liked: None,
        };
        tables.comments.push(comment.clone());
        Ok(comment)
    }

    async fn set_comment_status(
        &self,
        _viewer: &Viewer,
        id: &str,
        status: CommentStatus,
    ) -> BackendResult<()> {
        let mut tables = self.write("set_comment_status")?;
        let comment = tables
            .comments
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(BackendError::NotFound("comment"))?;
        comment.status = status;
        Ok(())
    }

    async fn delete_comment(&self, _viewer: &Viewer, id: &str) -> BackendResult<()> {
        self.write("delete_comment")?.comments.retain(|c| c.id != id);
        Ok(())
    }

    async fn toggle_like(&self, viewer: &Viewer, comment_id: &str) -> BackendResult<LikeAction> {
        let mut tables = self.write("toggle_like")?;
        let key = (comment_id.to_owned(), viewer.id.clone());
        if tables.likes.remove(&key) {
            Ok(LikeAction::Unliked)
        } else {
            tables.likes.insert(key);
            Ok(LikeAction::Liked)
        }
    }

    async fn moderation_policy(&self) -> BackendResult<Option<ModerationPolicy>> {
        Ok(self.read("moderation_policy")?.policy.clone())
    }

    async fn save_moderation_policy(
        &self,
        _viewer: &Viewer,
        policy: &ModerationPolicy,
    ) -> BackendResult<()> {
        self.write("save_moderation_policy")?.policy = Some(policy.clone());
        Ok(())
    }

    async fn site_settings(&self) -> BackendResult<Option<SiteSettings>> {
        Ok(self.read("site_settings")?.site.clone())
    }

    async fn save_site_settings(
        &self,
        _viewer: &Viewer,
        settings: &SiteSettings,
    ) -> BackendResult<()> {
        self.write("save_site_settings")?.site = Some(settings.clone());
        Ok(())
    }

    async fn stats(&self, _viewer: &Viewer) -> BackendResult<Stats> {
        let tables = self.read("stats")?;
        Ok(Stats {
            users: tables.profiles.len() as u64,
            posts: tables.posts.len() as u64,
            comments: tables.comments.len() as u64,
            published_posts: tables
                .posts
                .iter()
                .filter(|p| p.status == PostStatus::Published)
                .count() as u64,
        })
    }

    async fn upload_image(
        &self,
        _viewer: &Viewer,
        path: &str,
        _content_type: &str,
        bytes: Vec<u8>,
    ) -> BackendResult<()> {
        let mut tables = self.write("upload_image")?;
        if tables.images.contains_key(path) {
            return Err(BackendError::Conflict);
        }
        tables.images.insert(path.to_owned(), bytes);
        Ok(())
    }

    async fn remove_image(&self, _viewer: &Viewer, path: &str) -> BackendResult<()> {
        self.write("remove_image")?.images.remove(path);
        Ok(())
    }

    fn image_url(&self, path: &str) -> String {
        format!("https://storage.test/storage/v1/object/public/images/{path}")
    }
}
