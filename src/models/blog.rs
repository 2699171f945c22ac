use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::{error::AppError, models::comment::Comment, utils::tags::normalize_tags};

/// Publication state. Any state may be set from any other by an authorized update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "blog_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BlogStatus {
    Draft,
    #[default]
    Published,
    Archived,
}

impl FromStr for BlogStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Ok(BlogStatus::Draft),
            "published" => Ok(BlogStatus::Published),
            "archived" => Ok(BlogStatus::Archived),
            other => Err(AppError::BadRequest(format!(
                "Invalid status '{other}': expected draft, published or archived"
            ))),
        }
    }
}

/// Owner fields resolved for a blog.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogAuthor {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub name: String,
    pub bio: String,
    pub profile_picture: Option<String>,
}

/// A blog post with its owner, likes and comments resolved.
#[derive(Debug, Clone)]
pub struct Blog {
    pub id: i64,
    pub title: String,
    pub summary: String,
    pub content: String,
    pub image: Option<String>,
    pub tags: Vec<String>,
    pub status: BlogStatus,
    pub views: i64,
    pub author: BlogAuthor,
    /// Ids of users who liked the blog, each at most once.
    pub likes: Vec<i64>,
    pub comments: Vec<Comment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Blog {
    pub fn owner_id(&self) -> i64 {
        self.author.id
    }
}

/// JSON shape of a blog. Counts are derived here and nowhere else.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogResponse {
    pub id: i64,
    pub title: String,
    pub summary: String,
    pub content: String,
    pub image: Option<String>,
    pub tags: Vec<String>,
    pub status: BlogStatus,
    pub views: i64,
    pub user: BlogAuthor,
    pub likes: Vec<i64>,
    pub comments: Vec<Comment>,
    pub likes_count: usize,
    pub comments_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Blog> for BlogResponse {
    fn from(blog: Blog) -> Self {
        Self {
            likes_count: blog.likes.len(),
            comments_count: blog.comments.len(),
            id: blog.id,
            title: blog.title,
            summary: blog.summary,
            content: blog.content,
            image: blog.image,
            tags: blog.tags,
            status: blog.status,
            views: blog.views,
            user: blog.author,
            likes: blog.likes,
            comments: blog.comments,
            created_at: blog.created_at,
            updated_at: blog.updated_at,
        }
    }
}

/// DTO for creating a blog.
#[derive(Debug, Deserialize)]
pub struct CreateBlogRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub content: String,
    pub tags: Option<Vec<String>>,
    pub image: Option<String>,
    pub status: Option<String>,
}

/// A validated blog ready to be persisted.
#[derive(Debug, Clone, Validate)]
pub struct NewBlog {
    #[validate(length(min = 1, max = 200, message = "Title is required (max 200 characters)"))]
    pub title: String,
    #[validate(length(min = 1, max = 500, message = "Summary is required (max 500 characters)"))]
    pub summary: String,
    #[validate(custom(function = validate_content))]
    pub content: String,
    pub tags: Vec<String>,
    pub image: Option<String>,
    pub status: BlogStatus,
}

impl CreateBlogRequest {
    /// Trims title and summary, normalizes tags and validates the result.
    /// Content is kept verbatim but must not be blank.
    pub fn into_new_blog(self) -> Result<NewBlog, AppError> {
        let status = match self.status.as_deref() {
            Some(raw) => raw.parse()?,
            None => BlogStatus::default(),
        };

        let blog = NewBlog {
            title: self.title.trim().to_string(),
            summary: self.summary.trim().to_string(),
            content: self.content,
            tags: self.tags.as_deref().map(normalize_tags).unwrap_or_default(),
            image: self.image.filter(|img| !img.trim().is_empty()),
            status,
        };
        blog.validate()?;
        Ok(blog)
    }
}

/// DTO for a partial blog update.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateBlogRequest {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    /// `null` or a blank string clears the image, absence keeps it.
    #[serde(default, deserialize_with = "super::double_option")]
    pub image: Option<Option<String>>,
    pub status: Option<String>,
}

/// Fields to change on an existing blog. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, Validate)]
pub struct BlogChanges {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 500, message = "Summary must be 1 to 500 characters"))]
    pub summary: Option<String>,
    #[validate(custom(function = validate_content))]
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub image: Option<Option<String>>,
    pub status: Option<BlogStatus>,
}

impl UpdateBlogRequest {
    pub fn into_changes(self) -> Result<BlogChanges, AppError> {
        let status = self.status.as_deref().map(BlogStatus::from_str).transpose()?;

        let changes = BlogChanges {
            title: self.title.map(|t| t.trim().to_string()),
            summary: self.summary.map(|s| s.trim().to_string()),
            content: self.content,
            tags: self.tags.as_deref().map(normalize_tags),
            image: self
                .image
                .map(|img| img.filter(|img| !img.trim().is_empty())),
            status,
        };
        changes.validate()?;
        Ok(changes)
    }
}

impl BlogChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.summary.is_none()
            && self.content.is_none()
            && self.tags.is_none()
            && self.image.is_none()
            && self.status.is_none()
    }
}

fn validate_content(content: &str) -> Result<(), validator::ValidationError> {
    if content.trim().is_empty() {
        return Err(validator::ValidationError::new("content_required")
            .with_message("Content is required".into()));
    }
    Ok(())
}

/// Aggregate counters for the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BlogStats {
    pub total_blogs: i64,
    pub published_blogs: i64,
    pub draft_blogs: i64,
    pub total_views: i64,
    pub total_likes: i64,
    pub total_comments: i64,
}

/// Result of a like toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeOutcome {
    pub liked: bool,
    pub likes_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(title: &str, summary: &str, content: &str) -> CreateBlogRequest {
        CreateBlogRequest {
            title: title.into(),
            summary: summary.into(),
            content: content.into(),
            tags: Some(vec!["Tag1".into(), " tag1 ".into(), "  ".into()]),
            image: None,
            status: None,
        }
    }

    #[test]
    fn create_normalizes_and_defaults_to_published() {
        let blog = create(" A ", " B ", "C").into_new_blog().unwrap();
        assert_eq!(blog.title, "A");
        assert_eq!(blog.summary, "B");
        assert_eq!(blog.tags, vec!["tag1", "tag1"]);
        assert_eq!(blog.status, BlogStatus::Published);
    }

    #[test]
    fn create_requires_non_blank_fields() {
        assert!(create("  ", "B", "C").into_new_blog().is_err());
        assert!(create("A", "", "C").into_new_blog().is_err());
        assert!(create("A", "B", " \n ").into_new_blog().is_err());
    }

    #[test]
    fn title_is_limited_to_200_characters() {
        assert!(create(&"t".repeat(200), "B", "C").into_new_blog().is_ok());
        assert!(create(&"t".repeat(201), "B", "C").into_new_blog().is_err());
    }

    #[test]
    fn unknown_status_is_rejected() {
        let mut req = create("A", "B", "C");
        req.status = Some("hidden".into());
        assert!(matches!(req.into_new_blog(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn update_keeps_absent_fields_untouched() {
        let req: UpdateBlogRequest =
            serde_json::from_str(r#"{"tags": [" X "], "status": "archived"}"#).unwrap();
        let changes = req.into_changes().unwrap();
        assert_eq!(changes.title, None);
        assert_eq!(changes.image, None);
        assert_eq!(changes.tags, Some(vec!["x".to_string()]));
        assert_eq!(changes.status, Some(BlogStatus::Archived));
    }

    #[test]
    fn update_can_clear_the_image() {
        let req: UpdateBlogRequest = serde_json::from_str(r#"{"image": null}"#).unwrap();
        assert_eq!(req.into_changes().unwrap().image, Some(None));
    }

    #[test]
    fn blank_image_clears_like_on_create() {
        let req: UpdateBlogRequest = serde_json::from_str(r#"{"image": "  "}"#).unwrap();
        assert_eq!(req.into_changes().unwrap().image, Some(None));

        let mut create = create("A", "B", "C");
        create.image = Some(String::new());
        assert_eq!(create.into_new_blog().unwrap().image, None);
    }

    #[test]
    fn update_rejects_blank_title() {
        let req = UpdateBlogRequest {
            title: Some("   ".into()),
            ..Default::default()
        };
        assert!(req.into_changes().is_err());
    }

    #[test]
    fn response_counts_are_derived() {
        let now = Utc::now();
        let blog = Blog {
            id: 1,
            title: "t".into(),
            summary: "s".into(),
            content: "c".into(),
            image: None,
            tags: vec![],
            status: BlogStatus::Published,
            views: 0,
            author: BlogAuthor {
                id: 7,
                username: "u".into(),
                email: "u@x.io".into(),
                name: "U".into(),
                bio: String::new(),
                profile_picture: None,
            },
            likes: vec![1, 2, 3],
            comments: vec![],
            created_at: now,
            updated_at: now,
        };
        let response = BlogResponse::from(blog);
        assert_eq!(response.likes_count, 3);
        assert_eq!(response.comments_count, 0);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["likesCount"], 3);
        assert_eq!(json["user"]["id"], 7);
        assert_eq!(json["status"], "published");
    }
}
