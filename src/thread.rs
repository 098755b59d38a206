//! Comment threads.
//!
//! [`build`] turns the flat comment list of a post into its reply tree.
//! [`ThreadManager`] owns that tree for one viewer's view of a post: it loads
//! it, applies the moderation policy to new comments, inserts auto-approved
//! comments optimistically and keeps like counts current.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;

use crate::backend::{Backend, BackendError};
use crate::data::*;

/// Toggles between full reloads that re-read the like counts from the backend.
pub const RECONCILE_EVERY: u32 = 5;

/// Assemble comments into a forest of reply trees.
///
/// Roots and replies are ordered by creation time, ties broken by id, so the
/// result does not depend on the order of the input. A reply whose parent is
/// not in the input is dropped together with its own replies.
pub fn build(mut comments: Vec<Comment>) -> Vec<CommentNode> {
    let total = comments.len();
    comments.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut index: HashMap<String, usize> = HashMap::with_capacity(total);
    let mut duplicate = vec![false; total];
    for (i, comment) in comments.iter().enumerate() {
        if index.contains_key(&comment.id) {
            tracing::warn!("ignoring duplicate comment {}", comment.id);
            duplicate[i] = true;
        } else {
            index.insert(comment.id.clone(), i);
        }
    }

    let mut roots = Vec::new();
    let mut replies: Vec<Vec<usize>> = vec![Vec::new(); total];
    for (i, comment) in comments.iter().enumerate() {
        if duplicate[i] {
            continue;
        }
        match &comment.parent_id {
            None => roots.push(i),
            Some(parent) => match index.get(parent) {
                Some(&p) if p != i => replies[p].push(i),
                _ => tracing::debug!(
                    "dropping reply {} to comment {parent}, which is not loaded",
                    comment.id
                ),
            },
        }
    }

    // Parents come before their replies in pre-order, so building in reverse
    // pre-order always finds a node's replies already built.
    let mut order = Vec::with_capacity(total);
    let mut stack: Vec<usize> = roots.iter().rev().copied().collect();
    while let Some(i) = stack.pop() {
        order.push(i);
        stack.extend(replies[i].iter().rev());
    }

    let mut comments: Vec<Option<Comment>> = comments.into_iter().map(Some).collect();
    let mut built: Vec<Option<CommentNode>> = (0..total).map(|_| None).collect();
    for &i in order.iter().rev() {
        let Some(comment) = comments[i].take() else {
            continue;
        };
        let children = replies[i].iter().filter_map(|&r| built[r].take()).collect();
        built[i] = Some(CommentNode {
            comment,
            replies: children,
        });
    }

    let forest: Vec<_> = roots.iter().filter_map(|&r| built[r].take()).collect();
    let shown = count(&forest);
    if shown < total {
        tracing::debug!("{} of {total} comments are not reachable from a root", total - shown);
    }
    forest
}

/// The number of nodes in a forest.
pub fn count(forest: &[CommentNode]) -> usize {
    forest.iter().map(CommentNode::len).sum()
}

/// A comment that was refused before reaching the backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("sign in to comment")]
    NotSignedIn,

    #[error("comment is empty")]
    Empty,

    #[error("comment must be at least {0} characters")]
    TooShort(usize),

    #[error("comment must be at most {0} characters")]
    TooLong(usize),

    #[error("comment contains the blocked word \"{0}\"")]
    Blocked(String),

    #[error("the comment being replied to is no longer shown")]
    UnknownParent(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ThreadError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("the comment service failed: {0}")]
    Backend(#[from] BackendError),
}

/// What became of a submitted comment.
#[derive(Clone, Debug, PartialEq)]
pub enum SubmitOutcome {
    /// Approved and shown in the thread.
    Published(Comment),

    /// Stored, but hidden until a moderator approves it.
    PendingReview,

    /// Comments or replies are switched off; nothing was sent.
    Disabled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,

    /// A later load or a navigation made this result stale, so it was dropped.
    Superseded,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Ready,

    /// The last load failed. The tree still holds the last good result.
    Failed(String),
}

/// Identifies one load so its result can be matched to the current view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    post_id: String,
}

/// A copy of the thread for rendering.
#[derive(Clone, Debug, PartialEq)]
pub struct ThreadView {
    pub post_id: String,
    pub policy: ModerationPolicy,
    pub roots: Vec<CommentNode>,
    pub count: usize,
    pub load: LoadState,
}

struct ThreadState {
    post_id: String,
    policy: ModerationPolicy,
    roots: Vec<CommentNode>,
    count: usize,
    generation: u64,
    load: LoadState,
    provisional: u64,
    toggles_since_reload: u32,
}

impl ThreadState {
    fn contains(&self, id: &str) -> bool {
        self.roots.iter().any(|r| r.find(id).is_some())
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut CommentNode> {
        self.roots.iter_mut().find_map(|r| r.find_mut(id))
    }

    /// Append a node as the last reply of its parent, or as the last root.
    fn insert(&mut self, node: CommentNode) -> bool {
        let added = node.len();
        match node.comment.parent_id.clone() {
            None => self.roots.push(node),
            Some(parent) => match self.find_mut(&parent) {
                Some(parent) => parent.replies.push(node),
                None => return false,
            },
        }
        self.count += added;
        true
    }

    fn remove(&mut self, id: &str) -> Option<CommentNode> {
        let removed = match self.roots.iter().position(|r| r.comment.id == id) {
            Some(position) => Some(self.roots.remove(position)),
            None => self.roots.iter_mut().find_map(|r| r.remove_reply(id)),
        }?;
        self.count -= removed.len();
        Some(removed)
    }
}

/// Fetch the moderation policy, falling back to the default policy when no
/// row is configured or the fetch fails.
pub async fn load_policy(backend: &dyn Backend) -> ModerationPolicy {
    match backend.moderation_policy().await {
        Ok(Some(policy)) => policy,
        Ok(None) => ModerationPolicy::default(),
        Err(e) => {
            tracing::warn!("could not load the moderation policy, using the default: {e}");
            ModerationPolicy::default()
        }
    }
}

/// The comment thread of the post a viewer is looking at.
///
/// The state lock is never held across a backend call. Results that arrive
/// after a newer load or a navigation are recognized by their ticket and
/// dropped.
pub struct ThreadManager {
    backend: Arc<dyn Backend>,
    state: Mutex<ThreadState>,
    toggles: Mutex<HashMap<(String, String), Arc<tokio::sync::Mutex<()>>>>,
    reconcile_every: u32,
}

impl ThreadManager {
    pub fn new(backend: Arc<dyn Backend>, post_id: impl Into<String>, policy: ModerationPolicy) -> Self {
        Self {
            backend,
            state: Mutex::new(ThreadState {
                post_id: post_id.into(),
                policy,
                roots: Vec::new(),
                count: 0,
                generation: 0,
                load: LoadState::Idle,
                provisional: 0,
                toggles_since_reload: 0,
            }),
            toggles: Mutex::new(HashMap::new()),
            reconcile_every: RECONCILE_EVERY,
        }
    }

    /// Reload after every `toggles` like toggles instead of the default.
    pub fn with_reconcile_every(mut self, toggles: u32) -> Self {
        self.reconcile_every = toggles.max(1);
        self
    }

    fn state(&self) -> std::sync::MutexGuard<'_, ThreadState> {
        // A panic while holding the lock cannot leave the tree half-edited, so
        // a poisoned lock is still usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn post_id(&self) -> String {
        self.state().post_id.clone()
    }

    pub fn policy(&self) -> ModerationPolicy {
        self.state().policy.clone()
    }

    /// The number of comments shown, replies included.
    pub fn count(&self) -> usize {
        self.state().count
    }

    pub fn roots(&self) -> Vec<CommentNode> {
        self.state().roots.clone()
    }

    pub fn load_state(&self) -> LoadState {
        self.state().load.clone()
    }

    pub fn view(&self) -> ThreadView {
        let state = self.state();
        ThreadView {
            post_id: state.post_id.clone(),
            policy: state.policy.clone(),
            roots: state.roots.clone(),
            count: state.count,
            load: state.load.clone(),
        }
    }

    /// Switch to another post. Loads still in flight for the old post are dropped.
    pub fn navigate(&self, post_id: impl Into<String>, policy: ModerationPolicy) {
        let mut state = self.state();
        state.post_id = post_id.into();
        state.policy = policy;
        state.roots.clear();
        state.count = 0;
        state.generation += 1;
        state.load = LoadState::Idle;
        state.toggles_since_reload = 0;
        drop(state);
        self.toggles.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    /// Apply a freshly fetched policy to the current post without touching the tree.
    pub fn set_policy(&self, policy: ModerationPolicy) {
        self.state().policy = policy;
    }

    pub(crate) fn begin_load(&self) -> LoadTicket {
        let mut state = self.state();
        state.generation += 1;
        state.load = LoadState::Loading;
        LoadTicket {
            generation: state.generation,
            post_id: state.post_id.clone(),
        }
    }

    pub(crate) fn finish_load(
        &self,
        ticket: LoadTicket,
        result: Result<Vec<Comment>, BackendError>,
    ) -> Result<LoadOutcome, ThreadError> {
        let mut state = self.state();
        if ticket.generation != state.generation || ticket.post_id != state.post_id {
            tracing::debug!("dropping stale comment load for post {}", ticket.post_id);
            return Ok(LoadOutcome::Superseded);
        }

        match result {
            Ok(comments) => {
                state.roots = build(comments);
                state.count = count(&state.roots);
                state.load = LoadState::Ready;
                state.toggles_since_reload = 0;
                Ok(LoadOutcome::Applied)
            }
            Err(e) => {
                tracing::warn!("loading comments for post {} failed: {e}", ticket.post_id);
                state.load = LoadState::Failed(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Fetch the approved comments of the current post and rebuild the tree.
    pub async fn reload(&self, viewer: Option<&Viewer>) -> Result<LoadOutcome, ThreadError> {
        let ticket = self.begin_load();
        let result = self
            .backend
            .comments(&ticket.post_id, CommentStatus::Approved, viewer)
            .await;
        self.finish_load(ticket, result)
    }

    /// Check a submission against the policy and the current tree.
    ///
    /// An empty body is refused even when the policy allows a minimum length of 0.
    fn validate(
        state: &ThreadState,
        body: &str,
        parent: Option<&str>,
    ) -> Result<(), ValidationError> {
        let policy = &state.policy;
        let length = body.chars().count();
        if length == 0 {
            return Err(ValidationError::Empty);
        }
        if length < policy.min_length {
            return Err(ValidationError::TooShort(policy.min_length));
        }
        if length > policy.max_length {
            return Err(ValidationError::TooLong(policy.max_length));
        }
        if let Some(keyword) = policy.blocked_keyword(body) {
            return Err(ValidationError::Blocked(keyword.to_owned()));
        }
        if let Some(parent) = parent {
            if !state.contains(parent) {
                return Err(ValidationError::UnknownParent(parent.to_owned()));
            }
        }
        Ok(())
    }

    /// Submit a new comment, or a reply when `parent` is given.
    ///
    /// When the policy does not require approval, the comment is shown right
    /// away and replaced by the stored record once the backend confirms it. If
    /// the backend refuses it, it is taken out again.
    pub async fn submit(
        &self,
        viewer: Option<&Viewer>,
        body: &str,
        parent: Option<&str>,
    ) -> Result<SubmitOutcome, ThreadError> {
        let body = body.trim();

        let (viewer, new_comment, provisional_id) = {
            let mut state = self.state();
            if !state.policy.enabled || (parent.is_some() && !state.policy.allow_reply) {
                return Ok(SubmitOutcome::Disabled);
            }
            let Some(viewer) = viewer else {
                return Err(ValidationError::NotSignedIn.into());
            };
            Self::validate(&state, body, parent)?;

            let status = if state.policy.require_approval {
                CommentStatus::Pending
            } else {
                CommentStatus::Approved
            };
            let new_comment = NewComment {
                content: body.to_owned(),
                post_id: state.post_id.clone(),
                user_id: viewer.id.clone(),
                parent_id: parent.map(str::to_owned),
                status,
            };

            let provisional_id = (status == CommentStatus::Approved).then(|| {
                state.provisional += 1;
                let id = format!("local-{}", state.provisional);
                let now = Utc::now();
                state.insert(CommentNode::new(Comment {
                    id: id.clone(),
                    content: new_comment.content.clone(),
                    status,
                    post_id: new_comment.post_id.clone(),
                    user_id: viewer.id.clone(),
                    parent_id: new_comment.parent_id.clone(),
                    created_at: now,
                    updated_at: now,
                    author: Some(Author {
                        name: viewer.username.clone(),
                        avatar_url: viewer.avatar_url.clone(),
                    }),
                    likes: Some(0),
                    liked: Some(false),
                }));
                id
            });

            (viewer, new_comment, provisional_id)
        };

        let post_id = new_comment.post_id.clone();
        let result = self.backend.create_comment(viewer, new_comment).await;

        let mut state = self.state();
        let mut comment = match result {
            Ok(comment) => comment,
            Err(e) => {
                if let Some(id) = &provisional_id {
                    state.remove(id);
                }
                tracing::warn!("submitting a comment on post {post_id} failed: {e}");
                return Err(e.into());
            }
        };
        tracing::info!("comment {} submitted on post {post_id} as {}", comment.id, comment.status.as_str());

        if comment.status != CommentStatus::Approved {
            if let Some(id) = &provisional_id {
                state.remove(id);
            }
            return Ok(SubmitOutcome::PendingReview);
        }

        if comment.author.is_none() {
            comment.author = Some(Author {
                name: viewer.username.clone(),
                avatar_url: viewer.avatar_url.clone(),
            });
        }
        comment.likes.get_or_insert(0);
        comment.liked.get_or_insert(false);

        if state.post_id == post_id {
            let replaced = match provisional_id.as_deref().and_then(|id| state.find_mut(id)) {
                Some(node) => {
                    node.comment = comment.clone();
                    true
                }
                None => false,
            };
            // A reload may have replaced the tree while the comment was in flight.
            if !replaced && !state.contains(&comment.id) {
                state.insert(CommentNode::new(comment.clone()));
            }
        }

        Ok(SubmitOutcome::Published(comment))
    }

    /// Like or unlike a comment as the viewer.
    ///
    /// Toggles of the same comment by the same viewer run one at a time, so a
    /// second toggle always undoes the first.
    pub async fn toggle_like(
        &self,
        viewer: &Viewer,
        comment_id: &str,
    ) -> Result<LikeAction, ThreadError> {
        let key = (comment_id.to_owned(), viewer.id.clone());
        let lock = {
            let mut toggles = self.toggles.lock().unwrap_or_else(|e| e.into_inner());
            toggles.entry(key.clone()).or_default().clone()
        };

        let result = {
            let _serialized = lock.lock().await;
            self.apply_toggle(viewer, comment_id).await
        };

        // Forget the lock once no other toggle of this pair is waiting on it.
        let mut toggles = self.toggles.lock().unwrap_or_else(|e| e.into_inner());
        if toggles.get(&key).is_some_and(|l| Arc::ptr_eq(l, &lock) && Arc::strong_count(l) == 2) {
            toggles.remove(&key);
        }

        result
    }

    async fn apply_toggle(&self, viewer: &Viewer, comment_id: &str) -> Result<LikeAction, ThreadError> {
        let post_id = self.post_id();
        let action = self.backend.toggle_like(viewer, comment_id).await?;

        let reconcile = {
            let mut state = self.state();
            if state.post_id != post_id {
                return Ok(action);
            }
            if let Some(node) = state.find_mut(comment_id) {
                let likes = node.comment.likes.unwrap_or(0);
                node.comment.likes = Some(match action {
                    LikeAction::Liked => likes + 1,
                    LikeAction::Unliked => likes.saturating_sub(1),
                });
                node.comment.liked = Some(action == LikeAction::Liked);
            }
            state.toggles_since_reload += 1;
            state.toggles_since_reload >= self.reconcile_every
        };

        if reconcile {
            if let Err(e) = self.reload(Some(viewer)).await {
                tracing::warn!("reconciling like counts failed: {e}");
            }
        }

        Ok(action)
    }
}
