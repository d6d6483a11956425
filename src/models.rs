//! Data models for the comment pipeline.
//!
//! This module contains the typed records exchanged with the scraping
//! API and the per-user aggregation state built from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Where a comment sits in a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentKind {
    /// Attached directly to a post.
    Comment,
    /// Nested under another comment, at any depth.
    Reply,
}

impl fmt::Display for CommentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommentKind::Comment => write!(f, "comment"),
            CommentKind::Reply => write!(f, "reply"),
        }
    }
}

/// A single comment or reply as delivered by the scraping API.
///
/// Feeds frequently omit the `replies` key on leaf comments; absence
/// deserializes to an empty list rather than an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentRecord {
    /// Opaque identifier of the comment author.
    pub commenter_id: String,
    /// Display name of the comment author.
    pub commenter_name: String,
    /// Identifier of the comment itself, unique within the feed.
    pub comment_id: String,
    /// Comment body.
    #[serde(default)]
    pub text: String,
    /// Nested replies, if any.
    #[serde(default)]
    pub replies: Vec<CommentRecord>,
}

/// One post from a page feed, with its full comment tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostRecord {
    /// Publication time of the post.
    pub time: DateTime<Utc>,
    /// Top-level comments on the post.
    #[serde(default)]
    pub comments: Vec<CommentRecord>,
}

/// A comment retained for one user, keyed externally by comment id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredComment {
    pub text: String,
    pub kind: CommentKind,
}

/// One distinct commenter and everything counted against them.
///
/// Invariant: `comment_count + reply_count` always equals the number of
/// stored comments, because each comment id is counted at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Opaque commenter identifier, unique key.
    pub id: String,
    /// Display name captured from the first comment seen for this id.
    pub name: String,
    /// Number of distinct top-level comments.
    pub comment_count: usize,
    /// Number of distinct replies.
    pub reply_count: usize,
    /// Stored comments keyed by comment id.
    comments: HashMap<String, StoredComment>,
}

impl User {
    /// Create a user with no comments yet.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            comment_count: 0,
            reply_count: 0,
            comments: HashMap::new(),
        }
    }

    /// Upsert a comment under `comment_id`.
    ///
    /// The matching counter moves only when the id is new for this user;
    /// re-inserting an already-seen id overwrites the stored text and kind
    /// without inflating the counts.
    pub fn add_comment(&mut self, comment_id: &str, text: &str, kind: CommentKind) {
        if !self.comments.contains_key(comment_id) {
            match kind {
                CommentKind::Comment => self.comment_count += 1,
                CommentKind::Reply => self.reply_count += 1,
            }
        }

        self.comments.insert(
            comment_id.to_string(),
            StoredComment {
                text: text.to_string(),
                kind,
            },
        );
    }

    /// Total number of distinct comments and replies.
    pub fn total(&self) -> usize {
        self.comment_count + self.reply_count
    }

    /// Iterate over the stored comments in no particular order.
    pub fn comments(&self) -> impl Iterator<Item = &StoredComment> {
        self.comments.values()
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
