// src/store/mod.rs

//! Persistence seams.
//!
//! Every method is one atomic unit against a single document (a user, or a
//! blog together with its likes and comments): implementations must not let
//! concurrent calls lose updates on view counters or like sets.

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{
        blog::{Blog, BlogChanges, BlogStats, LikeOutcome, NewBlog},
        comment::{Comment, CommentOwnership},
        contact::{ContactMessage, ContactRequest},
        user::{NewUser, Role, UpdateProfileRequest, User},
    },
    query::{BlogQuery, PageRequest},
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `Conflict` naming the field when username or email is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError>;

    /// Matches the trimmed login against usernames, or its lowercase form against emails.
    async fn find_by_login(&self, login: &str) -> Result<Option<User>, AppError>;

    async fn find_any_admin(&self) -> Result<Option<User>, AppError>;

    async fn update_profile(
        &self,
        id: i64,
        changes: &UpdateProfileRequest,
    ) -> Result<Option<User>, AppError>;

    /// Newest first, with the total number of accounts.
    async fn list_users(&self, page: &PageRequest) -> Result<(Vec<User>, i64), AppError>;

    async fn toggle_active(&self, id: i64) -> Result<Option<User>, AppError>;

    async fn set_role(&self, id: i64, role: Role) -> Result<Option<User>, AppError>;
}

#[async_trait]
pub trait BlogStore: Send + Sync {
    async fn create_blog(&self, owner_id: i64, blog: NewBlog) -> Result<Blog, AppError>;

    async fn find_blog(&self, id: i64) -> Result<Option<Blog>, AppError>;

    /// Increments the view counter by exactly one and returns the updated blog.
    async fn record_view(&self, id: i64) -> Result<Option<Blog>, AppError>;

    async fn blog_owner(&self, id: i64) -> Result<Option<i64>, AppError>;

    async fn update_blog(&self, id: i64, changes: &BlogChanges) -> Result<Option<Blog>, AppError>;

    /// Removes the blog with its likes and comments. Returns whether it existed.
    async fn delete_blog(&self, id: i64) -> Result<bool, AppError>;

    /// One page of matches plus the total number of matches.
    async fn list_blogs(&self, query: &BlogQuery) -> Result<(Vec<Blog>, i64), AppError>;

    /// Distinct tags across all blogs regardless of status, sorted.
    async fn distinct_tags(&self) -> Result<Vec<String>, AppError>;

    /// Totals over all blogs (`owner == None`) or over one owner's blogs.
    async fn stats(&self, owner: Option<i64>) -> Result<BlogStats, AppError>;

    /// Flips the user's membership in the like set. `None` when the blog is absent.
    async fn toggle_like(&self, blog_id: i64, user_id: i64)
    -> Result<Option<LikeOutcome>, AppError>;

    /// Appends a comment. `None` when the blog is absent.
    async fn add_comment(
        &self,
        blog_id: i64,
        user_id: i64,
        content: &str,
    ) -> Result<Option<Comment>, AppError>;

    /// `None` when the blog is absent.
    async fn comment_ownership(
        &self,
        blog_id: i64,
        comment_id: i64,
    ) -> Result<Option<CommentOwnership>, AppError>;

    async fn delete_comment(&self, blog_id: i64, comment_id: i64) -> Result<bool, AppError>;
}

#[async_trait]
pub trait ContactStore: Send + Sync {
    async fn save_message(&self, message: ContactRequest) -> Result<ContactMessage, AppError>;
}
