use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Author fields resolved for a comment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentAuthor {
    pub id: i64,
    pub username: String,
    pub name: String,
    pub profile_picture: Option<String>,
}

/// A comment embedded in a blog. Ids are unique within the whole store,
/// so they also address the comment inside its parent blog.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub user: CommentAuthor,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// DTO for creating a new comment.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[serde(default)]
    #[validate(length(
        min = 1,
        max = 1000,
        message = "Comment must be between 1 and 1000 characters"
    ))]
    pub content: String,
}

impl CreateCommentRequest {
    pub fn normalized(self) -> Self {
        Self {
            content: self.content.trim().to_string(),
        }
    }
}

/// Who may decide about a comment: the blog owner and, when the comment
/// exists, its author.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentOwnership {
    pub blog_owner: i64,
    pub comment_author: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_only_comment_is_rejected() {
        let req = CreateCommentRequest { content: "   \n ".into() }.normalized();
        assert!(req.validate().is_err());
    }

    #[test]
    fn comment_length_is_bounded() {
        let ok = CreateCommentRequest { content: "a".repeat(1000) }.normalized();
        assert!(ok.validate().is_ok());
        let too_long = CreateCommentRequest { content: "a".repeat(1001) }.normalized();
        assert!(too_long.validate().is_err());
    }
}
