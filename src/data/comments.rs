use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Moderation state of a comment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentStatus {
    Pending,
    Approved,
    Rejected,
}

impl CommentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentStatus::Pending => "pending",
            CommentStatus::Approved => "approved",
            CommentStatus::Rejected => "rejected",
        }
    }
}

/// Display fields of a comment's author, joined in from the profiles table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    #[serde(rename = "username")]
    pub name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// A comment as stored by the backend.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,

    /// The comment body.
    pub content: String,

    pub status: CommentStatus,

    /// The post this comment belongs to.
    pub post_id: String,

    /// The user who wrote this comment.
    pub user_id: String,

    /// The comment this one replies to. `None` for a top-level comment.
    #[serde(default)]
    pub parent_id: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(default, rename = "profiles")]
    pub author: Option<Author>,

    /// Number of likes, when the backend reported it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likes: Option<u32>,

    /// Whether the current viewer likes this comment, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liked: Option<bool>,
}

impl Comment {
    pub fn author_name(&self) -> &str {
        self.author
            .as_ref()
            .map(|a| a.name.as_str())
            .unwrap_or("Anonymous")
    }
}

/// The insert payload for a new comment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NewComment {
    pub content: String,
    pub post_id: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub status: CommentStatus,
}

/// What a like toggle did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LikeAction {
    Liked,
    Unliked,
}

/// A comment together with its direct replies, oldest first.
#[derive(Clone, Debug, PartialEq)]
pub struct CommentNode {
    pub comment: Comment,
    pub replies: Vec<CommentNode>,
}

impl CommentNode {
    pub fn new(comment: Comment) -> Self {
        Self {
            comment,
            replies: Vec::new(),
        }
    }

    /// The number of nodes in this subtree, including this one.
    pub fn len(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.replies.iter());
        }
        count
    }

    /// Find the node with the given comment id in this subtree.
    pub fn find(&self, id: &str) -> Option<&CommentNode> {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if node.comment.id == id {
                return Some(node);
            }
            stack.extend(node.replies.iter());
        }
        None
    }

    /// Find the node with the given comment id in this subtree, mutably.
    pub fn find_mut(&mut self, id: &str) -> Option<&mut CommentNode> {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if node.comment.id == id {
                return Some(node);
            }
            stack.extend(node.replies.iter_mut());
        }
        None
    }

    /// Remove the node with the given id from the replies of this subtree.
    ///
    /// Returns the removed node. This node itself is never removed.
    pub fn remove_reply(&mut self, id: &str) -> Option<CommentNode> {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if let Some(position) = node.replies.iter().position(|r| r.comment.id == id) {
                return Some(node.replies.remove(position));
            }
            stack.extend(node.replies.iter_mut());
        }
        None
    }
}
