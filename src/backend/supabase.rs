//! Supabase-compatible backend: GoTrue auth, PostgREST tables and Storage.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::*;

const COMMENT_SELECT: &str = "*,profiles:user_id(username,avatar_url)";
const POST_SELECT: &str = "*,profiles:author_id(username),categories:category_id(name,slug)";

pub struct SupabaseBackend {
    client: Client,
    url: String,
    anon_key: String,
    bucket: String,
}

#[derive(Deserialize)]
struct AuthUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: UserMetadata,
}

#[derive(Default, Deserialize)]
struct UserMetadata {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    avatar_url: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    user: AuthUser,
}

#[derive(Deserialize)]
struct SignUpResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    user: Option<AuthUser>,
}

#[derive(Deserialize)]
struct LikeRow {
    comment_id: String,
    user_id: String,
}

#[derive(Serialize)]
struct NewLike<'a> {
    comment_id: &'a str,
    user_id: &'a str,
}

#[derive(Deserialize)]
struct IdRow {
    id: String,
}

impl SupabaseBackend {
    pub fn new(url: &str, anon_key: &str, bucket: &str) -> BackendResult<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            "apikey",
            header::HeaderValue::from_str(anon_key)
                .map_err(|e| BackendError::Decode(e.to_string()))?,
        );

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            url: url.trim_end_matches('/').to_owned(),
            anon_key: anon_key.to_owned(),
            bucket: bucket.to_owned(),
        })
    }

    fn rest(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.url, table)
    }

    fn auth(&self, endpoint: &str) -> String {
        format!("{}/auth/v1/{}", self.url, endpoint)
    }

    fn storage(&self, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.url, self.bucket, path)
    }

    /// Start a request authorized as the viewer, or anonymously.
    fn request(&self, method: Method, url: String, viewer: Option<&Viewer>) -> RequestBuilder {
        let token = viewer.map(|v| v.access_token.as_str()).unwrap_or(&self.anon_key);
        self.client.request(method, url).bearer_auth(token)
    }

    async fn execute(request: RequestBuilder) -> BackendResult<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body);
        tracing::warn!("backend request failed with {status}: {message}");

        Err(match status {
            StatusCode::CONFLICT => BackendError::Conflict,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Unauthorized,
            _ => BackendError::Status {
                status: status.as_u16(),
                message,
            },
        })
    }

    async fn fetch<T: DeserializeOwned>(request: RequestBuilder) -> BackendResult<T> {
        let response = Self::execute(request).await?;
        response
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn first<T: DeserializeOwned>(request: RequestBuilder) -> BackendResult<Option<T>> {
        let rows: Vec<T> = Self::fetch(request.query(&[("limit", "1")])).await?;
        Ok(rows.into_iter().next())
    }

    /// Count the rows matching the filters using the `Content-Range` header.
    async fn count(
        &self,
        viewer: &Viewer,
        table: &str,
        filters: &[(&str, &str)],
    ) -> BackendResult<u64> {
        let request = self
            .request(Method::GET, self.rest(table), Some(viewer))
            .header("Prefer", "count=exact")
            .query(&[("select", "id"), ("limit", "1")])
            .query(filters);
        let response = Self::execute(request).await?;

        response
            .headers()
            .get(header::CONTENT_RANGE)
            .and_then(|range| range.to_str().ok())
            .and_then(|range| range.rsplit('/').next())
            .and_then(|total| total.parse().ok())
            .ok_or_else(|| BackendError::Decode(format!("no row count for {table}")))
    }

    /// Update the single row of a settings table, or insert it if there is none.
    async fn save_singleton(&self, viewer: &Viewer, table: &str, mut row: Value) -> BackendResult<()> {
        let now = Utc::now().to_rfc3339();
        row["updated_at"] = json!(now);

        let existing: Option<IdRow> = Self::first(
            self.request(Method::GET, self.rest(table), Some(viewer))
                .query(&[("select", "id")]),
        )
        .await?;

        let request = match existing {
            Some(IdRow { id }) => self
                .request(Method::PATCH, self.rest(table), Some(viewer))
                .query(&[("id", format!("eq.{id}"))])
                .json(&row),
            None => {
                row["created_at"] = json!(now);
                self.request(Method::POST, self.rest(table), Some(viewer))
                    .json(&row)
            }
        };
        Self::execute(request).await?;

        Ok(())
    }

    async fn like_counts(
        &self,
        comments: &mut [Comment],
        viewer: Option<&Viewer>,
    ) -> BackendResult<()> {
        if comments.is_empty() {
            return Ok(());
        }

        let ids: Vec<_> = comments.iter().map(|c| format!("\"{}\"", c.id)).collect();
        let likes: Vec<LikeRow> = Self::fetch(
            self.request(Method::GET, self.rest("comment_likes"), viewer)
                .query(&[
                    ("select", "comment_id,user_id".to_owned()),
                    ("comment_id", format!("in.({})", ids.join(","))),
                ]),
        )
        .await?;

        let mut counts: HashMap<&str, u32> = HashMap::new();
        let mut liked: HashSet<&str> = HashSet::new();
        for like in &likes {
            *counts.entry(&like.comment_id).or_default() += 1;
            if viewer.is_some_and(|v| v.id == like.user_id) {
                liked.insert(&like.comment_id);
            }
        }

        for comment in comments {
            comment.likes = Some(counts.get(comment.id.as_str()).copied().unwrap_or(0));
            if viewer.is_some() {
                comment.liked = Some(liked.contains(comment.id.as_str()));
            }
        }

        Ok(())
    }

    async fn viewer(&self, token: String, user: AuthUser) -> BackendResult<Viewer> {
        let email = user.email.unwrap_or_default();
        let mut viewer = Viewer {
            username: user
                .user_metadata
                .username
                .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_owned()),
            avatar_url: user.user_metadata.avatar_url,
            id: user.id,
            email,
            role: Role::Subscriber,
            access_token: token,
        };

        // The profile row is authoritative for the role and display fields.
        let profile: Option<Profile> = Self::first(
            self.request(Method::GET, self.rest("profiles"), Some(&viewer))
                .query(&[("select", "*".to_owned()), ("id", format!("eq.{}", viewer.id))]),
        )
        .await?;
        if let Some(profile) = profile {
            viewer.username = profile.username;
            viewer.avatar_url = profile.avatar_url.or(viewer.avatar_url);
            viewer.role = profile.role;
        }

        Ok(viewer)
    }
}

/// Pull the human-readable message out of an error body.
fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return body.to_owned();
    };
    ["message", "msg", "error_description", "error"]
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .map(str::to_owned)
        .unwrap_or_else(|| body.to_owned())
}

#[async_trait]
impl Backend for SupabaseBackend {
    async fn sign_in(&self, email: &str, password: &str) -> BackendResult<Viewer> {
        let request = self
            .client
            .post(self.auth("token"))
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }));

        let session: TokenResponse = match Self::fetch(request).await {
            Err(BackendError::Status { status: 400, .. }) => {
                return Err(BackendError::Unauthorized)
            }
            result => result?,
        };
        tracing::info!("user {} signed in", session.user.id);

        self.viewer(session.access_token, session.user).await
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> BackendResult<SignUp> {
        let request = self.client.post(self.auth("signup")).json(&json!({
            "email": email,
            "password": password,
            "data": { "username": username },
        }));
        let response: SignUpResponse = Self::fetch(request).await?;

        let viewer = match (response.access_token, response.user) {
            (Some(token), Some(user)) => Some(self.viewer(token, user).await?),
            _ => None,
        };
        Ok(SignUp { viewer })
    }

    async fn sign_out(&self, viewer: &Viewer) -> BackendResult<()> {
        Self::execute(self.request(Method::POST, self.auth("logout"), Some(viewer))).await?;
        Ok(())
    }

    async fn profiles(&self, viewer: &Viewer) -> BackendResult<Vec<Profile>> {
        Self::fetch(
            self.request(Method::GET, self.rest("profiles"), Some(viewer))
                .query(&[("select", "*"), ("order", "created_at.desc")]),
        )
        .await
    }

    async fn set_role(&self, viewer: &Viewer, user_id: &str, role: Role) -> BackendResult<()> {
        Self::execute(
            self.request(Method::PATCH, self.rest("profiles"), Some(viewer))
                .query(&[("id", format!("eq.{user_id}"))])
                .json(&json!({ "role": role })),
        )
        .await?;
        Ok(())
    }

    async fn published_posts(&self) -> BackendResult<Vec<Post>> {
        Self::fetch(
            self.request(Method::GET, self.rest("posts"), None)
                .query(&[
                    ("select", POST_SELECT),
                    ("status", "eq.published"),
                    ("order", "published_at.desc"),
                ]),
        )
        .await
    }

    async fn published_post(&self, id: &str) -> BackendResult<Option<Post>> {
        Self::first(
            self.request(Method::GET, self.rest("posts"), None)
                .query(&[
                    ("select", POST_SELECT.to_owned()),
                    ("id", format!("eq.{id}")),
                    ("status", "eq.published".to_owned()),
                ]),
        )
        .await
    }

    async fn posts(&self, viewer: &Viewer, author: Option<&str>) -> BackendResult<Vec<Post>> {
        let mut request = self
            .request(Method::GET, self.rest("posts"), Some(viewer))
            .query(&[("select", POST_SELECT), ("order", "created_at.desc")]);
        if let Some(author) = author {
            request = request.query(&[("author_id", format!("eq.{author}"))]);
        }
        Self::fetch(request).await
    }

    async fn post(&self, viewer: &Viewer, id: &str) -> BackendResult<Option<Post>> {
        Self::first(
            self.request(Method::GET, self.rest("posts"), Some(viewer))
                .query(&[("select", POST_SELECT.to_owned()), ("id", format!("eq.{id}"))]),
        )
        .await
    }

    async fn save_post(&self, viewer: &Viewer, draft: PostDraft) -> BackendResult<Post> {
        let draft = draft.stamp(Utc::now());
        let mut row = serde_json::to_value(&draft).map_err(|e| BackendError::Decode(e.to_string()))?;
        row["updated_at"] = json!(Utc::now().to_rfc3339());

        let request = match &draft.id {
            Some(id) => self
                .request(Method::PATCH, self.rest("posts"), Some(viewer))
                .query(&[("id", format!("eq.{id}"))]),
            None => {
                row["author_id"] = json!(viewer.id);
                self.request(Method::POST, self.rest("posts"), Some(viewer))
            }
        };

        let saved: Vec<Post> = Self::fetch(
            request
                .query(&[("select", POST_SELECT)])
                .header("Prefer", "return=representation")
                .json(&row),
        )
        .await?;
        saved.into_iter().next().ok_or(BackendError::NotFound("post"))
    }

    async fn delete_post(&self, viewer: &Viewer, id: &str) -> BackendResult<()> {
        Self::execute(
            self.request(Method::DELETE, self.rest("posts"), Some(viewer))
                .query(&[("id", format!("eq.{id}"))]),
        )
        .await?;
        Ok(())
    }

    async fn categories(&self) -> BackendResult<Vec<Category>> {
        Self::fetch(
            self.request(Method::GET, self.rest("categories"), None)
                .query(&[("select", "*"), ("order", "name.asc")]),
        )
        .await
    }

    async fn comments(
        &self,
        post_id: &str,
        status: CommentStatus,
        viewer: Option<&Viewer>,
    ) -> BackendResult<Vec<Comment>> {
        let mut comments: Vec<Comment> = Self::fetch(
            self.request(Method::GET, self.rest("comments"), viewer)
                .query(&[
                    ("select", COMMENT_SELECT.to_owned()),
                    ("post_id", format!("eq.{post_id}")),
                    ("status", format!("eq.{}", status.as_str())),
                    ("order", "created_at.asc".to_owned()),
                ]),
        )
        .await?;
        tracing::debug!("fetched {} comments for post {post_id}", comments.len());

        self.like_counts(&mut comments, viewer).await?;
        Ok(comments)
    }

    async fn all_comments(&self, viewer: &Viewer) -> BackendResult<Vec<Comment>> {
        Self::fetch(
            self.request(Method::GET, self.rest("comments"), Some(viewer))
                .query(&[("select", COMMENT_SELECT), ("order", "created_at.desc")]),
        )
        .await
    }

    async fn create_comment(
        &self,
        viewer: &Viewer,
        comment: NewComment,
    ) -> BackendResult<Comment> {
        let created: Vec<Comment> = Self::fetch(
            self.request(Method::POST, self.rest("comments"), Some(viewer))
                .query(&[("select", COMMENT_SELECT)])
                .header("Prefer", "return=representation")
                .json(&[comment]),
        )
        .await?;
        created.into_iter().next().ok_or(BackendError::NotFound("comment"))
    }

    async fn set_comment_status(
        &self,
        viewer: &Viewer,
        id: &str,
        status: CommentStatus,
    ) -> BackendResult<()> {
        Self::execute(
            self.request(Method::PATCH, self.rest("comments"), Some(viewer))
                .query(&[("id", format!("eq.{id}"))])
                .json(&json!({ "status": status, "updated_at": Utc::now().to_rfc3339() })),
        )
        .await?;
        Ok(())
    }

    async fn delete_comment(&self, viewer: &Viewer, id: &str) -> BackendResult<()> {
        Self::execute(
            self.request(Method::DELETE, self.rest("comments"), Some(viewer))
                .query(&[("id", format!("eq.{id}"))]),
        )
        .await?;
        Ok(())
    }

    async fn toggle_like(&self, viewer: &Viewer, comment_id: &str) -> BackendResult<LikeAction> {
        let insert = self
            .request(Method::POST, self.rest("comment_likes"), Some(viewer))
            .header("Prefer", "return=minimal")
            .json(&NewLike {
                comment_id,
                user_id: &viewer.id,
            });

        match Self::execute(insert).await {
            Ok(_) => Ok(LikeAction::Liked),
            Err(BackendError::Conflict) => {
                // The like already exists, so this toggle removes it.
                Self::execute(
                    self.request(Method::DELETE, self.rest("comment_likes"), Some(viewer))
                        .query(&[
                            ("comment_id", format!("eq.{comment_id}")),
                            ("user_id", format!("eq.{}", viewer.id)),
                        ]),
                )
                .await?;
                Ok(LikeAction::Unliked)
            }
            Err(e) => Err(e),
        }
    }

    async fn moderation_policy(&self) -> BackendResult<Option<ModerationPolicy>> {
        Self::first(
            self.request(Method::GET, self.rest("comment_settings"), None)
                .query(&[("select", "*")]),
        )
        .await
    }

    async fn save_moderation_policy(
        &self,
        viewer: &Viewer,
        policy: &ModerationPolicy,
    ) -> BackendResult<()> {
        let row = serde_json::to_value(policy).map_err(|e| BackendError::Decode(e.to_string()))?;
        self.save_singleton(viewer, "comment_settings", row).await
    }

    async fn site_settings(&self) -> BackendResult<Option<SiteSettings>> {
        Self::first(
            self.request(Method::GET, self.rest("site_settings"), None)
                .query(&[("select", "*")]),
        )
        .await
    }

    async fn save_site_settings(
        &self,
        viewer: &Viewer,
        settings: &SiteSettings,
    ) -> BackendResult<()> {
        let row = serde_json::to_value(settings).map_err(|e| BackendError::Decode(e.to_string()))?;
        self.save_singleton(viewer, "site_settings", row).await
    }

    async fn stats(&self, viewer: &Viewer) -> BackendResult<Stats> {
        Ok(Stats {
            users: self.count(viewer, "profiles", &[]).await?,
            posts: self.count(viewer, "posts", &[]).await?,
            comments: self.count(viewer, "comments", &[]).await?,
            published_posts: self
                .count(viewer, "posts", &[("status", "eq.published")])
                .await?,
        })
    }

    async fn upload_image(
        &self,
        viewer: &Viewer,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> BackendResult<()> {
        Self::execute(
            self.request(Method::POST, self.storage(path), Some(viewer))
                .header(header::CONTENT_TYPE, content_type)
                .header(header::CACHE_CONTROL, "max-age=3600")
                .header("x-upsert", "false")
                .body(bytes),
        )
        .await?;
        tracing::info!("uploaded image {path}");
        Ok(())
    }

    async fn remove_image(&self, viewer: &Viewer, path: &str) -> BackendResult<()> {
        let url = format!("{}/storage/v1/object/{}", self.url, self.bucket);
        Self::execute(
            self.request(Method::DELETE, url, Some(viewer))
                .json(&json!({ "prefixes": [path] })),
        )
        .await?;
        Ok(())
    }

    fn image_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.url, self.bucket, path
        )
    }
}
