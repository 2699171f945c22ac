// src/store/memory.rs

//! In-memory store for development and tests.
//!
//! All documents live behind one `RwLock`; each trait method takes the lock
//! once, so every operation is atomic with respect to concurrent callers.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{
    error::AppError,
    models::{
        blog::{Blog, BlogAuthor, BlogChanges, BlogStats, BlogStatus, LikeOutcome, NewBlog},
        comment::{Comment, CommentAuthor, CommentOwnership},
        contact::{ContactMessage, ContactRequest},
        user::{NewUser, Role, UpdateProfileRequest, User},
    },
    query::{BlogQuery, PageRequest},
    store::{BlogStore, ContactStore, UserStore},
};

#[derive(Debug, Clone)]
struct CommentRecord {
    id: i64,
    author_id: i64,
    content: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct BlogRecord {
    id: i64,
    owner_id: i64,
    title: String,
    summary: String,
    content: String,
    image: Option<String>,
    tags: Vec<String>,
    status: BlogStatus,
    views: i64,
    likes: Vec<i64>,
    comments: Vec<CommentRecord>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Inner {
    users: BTreeMap<i64, User>,
    blogs: BTreeMap<i64, BlogRecord>,
    contacts: Vec<ContactMessage>,
    last_user_id: i64,
    last_blog_id: i64,
    last_comment_id: i64,
    last_contact_id: i64,
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

impl Inner {
    fn user(&self, id: i64) -> Result<&User, AppError> {
        self.users
            .get(&id)
            .ok_or_else(|| AppError::InternalServerError(format!("dangling user reference {id}")))
    }

    fn comment(&self, record: &CommentRecord) -> Result<Comment, AppError> {
        let author = self.user(record.author_id)?;
        Ok(Comment {
            id: record.id,
            user: CommentAuthor {
                id: author.id,
                username: author.username.clone(),
                name: author.name.clone(),
                profile_picture: author.profile_picture.clone(),
            },
            content: record.content.clone(),
            created_at: record.created_at,
        })
    }

    fn resolve(&self, record: &BlogRecord) -> Result<Blog, AppError> {
        let owner = self.user(record.owner_id)?;
        let comments = record
            .comments
            .iter()
            .map(|c| self.comment(c))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Blog {
            id: record.id,
            title: record.title.clone(),
            summary: record.summary.clone(),
            content: record.content.clone(),
            image: record.image.clone(),
            tags: record.tags.clone(),
            status: record.status,
            views: record.views,
            author: BlogAuthor {
                id: owner.id,
                username: owner.username.clone(),
                email: owner.email.clone(),
                name: owner.name.clone(),
                bio: owner.bio.clone(),
                profile_picture: owner.profile_picture.clone(),
            },
            likes: record.likes.clone(),
            comments,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        let mut inner = self.inner.write().await;

        if inner.users.values().any(|u| u.username == user.username) {
            return Err(AppError::Conflict("Username already exists".to_string()));
        }
        if inner.users.values().any(|u| u.email == user.email) {
            return Err(AppError::Conflict("Email already exists".to_string()));
        }

        let now = Utc::now();
        let id = next_id(&mut inner.last_user_id);
        let created = User {
            id,
            name: user.name,
            email: user.email,
            username: user.username,
            password: user.password_hash,
            role: user.role,
            is_active: true,
            bio: user.bio,
            profile_picture: None,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(id, created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn find_by_login(&self, login: &str) -> Result<Option<User>, AppError> {
        let login = login.trim();
        let email = login.to_lowercase();
        let inner = self.inner.read().await;

        let by_username = inner.users.values().find(|u| u.username == login);
        let found = by_username.or_else(|| inner.users.values().find(|u| u.email == email));
        Ok(found.cloned())
    }

    async fn find_any_admin(&self) -> Result<Option<User>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.role == Role::Admin).cloned())
    }

    async fn update_profile(
        &self,
        id: i64,
        changes: &UpdateProfileRequest,
    ) -> Result<Option<User>, AppError> {
        let mut inner = self.inner.write().await;
        let Some(user) = inner.users.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(name) = &changes.name {
            user.name = name.clone();
        }
        if let Some(bio) = &changes.bio {
            user.bio = bio.clone();
        }
        if let Some(picture) = &changes.profile_picture {
            user.profile_picture = picture.clone();
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn list_users(&self, page: &PageRequest) -> Result<(Vec<User>, i64), AppError> {
        let inner = self.inner.read().await;
        let mut users: Vec<User> = inner.users.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = users.len() as i64;
        Ok((page.apply(users), total))
    }

    async fn toggle_active(&self, id: i64) -> Result<Option<User>, AppError> {
        let mut inner = self.inner.write().await;
        Ok(inner.users.get_mut(&id).map(|user| {
            user.is_active = !user.is_active;
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn set_role(&self, id: i64, role: Role) -> Result<Option<User>, AppError> {
        let mut inner = self.inner.write().await;
        Ok(inner.users.get_mut(&id).map(|user| {
            user.role = role;
            user.updated_at = Utc::now();
            user.clone()
        }))
    }
}

#[async_trait]
impl BlogStore for MemoryStore {
    async fn create_blog(&self, owner_id: i64, blog: NewBlog) -> Result<Blog, AppError> {
        let mut inner = self.inner.write().await;
        inner.user(owner_id)?;

        let now = Utc::now();
        let id = next_id(&mut inner.last_blog_id);
        let record = BlogRecord {
            id,
            owner_id,
            title: blog.title,
            summary: blog.summary,
            content: blog.content,
            image: blog.image,
            tags: blog.tags,
            status: blog.status,
            views: 0,
            likes: Vec::new(),
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        let resolved = inner.resolve(&record)?;
        inner.blogs.insert(id, record);
        Ok(resolved)
    }

    async fn find_blog(&self, id: i64) -> Result<Option<Blog>, AppError> {
        let inner = self.inner.read().await;
        inner.blogs.get(&id).map(|r| inner.resolve(r)).transpose()
    }

    async fn record_view(&self, id: i64) -> Result<Option<Blog>, AppError> {
        let mut inner = self.inner.write().await;
        let Some(record) = inner.blogs.get_mut(&id) else {
            return Ok(None);
        };
        record.views += 1;
        let record = record.clone();
        inner.resolve(&record).map(Some)
    }

    async fn blog_owner(&self, id: i64) -> Result<Option<i64>, AppError> {
        Ok(self.inner.read().await.blogs.get(&id).map(|r| r.owner_id))
    }

    async fn update_blog(&self, id: i64, changes: &BlogChanges) -> Result<Option<Blog>, AppError> {
        let mut inner = self.inner.write().await;
        let Some(record) = inner.blogs.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(title) = &changes.title {
            record.title = title.clone();
        }
        if let Some(summary) = &changes.summary {
            record.summary = summary.clone();
        }
        if let Some(content) = &changes.content {
            record.content = content.clone();
        }
        if let Some(tags) = &changes.tags {
            record.tags = tags.clone();
        }
        if let Some(image) = &changes.image {
            record.image = image.clone();
        }
        if let Some(status) = changes.status {
            record.status = status;
        }
        record.updated_at = Utc::now();

        let record = record.clone();
        inner.resolve(&record).map(Some)
    }

    async fn delete_blog(&self, id: i64) -> Result<bool, AppError> {
        Ok(self.inner.write().await.blogs.remove(&id).is_some())
    }

    async fn list_blogs(&self, query: &BlogQuery) -> Result<(Vec<Blog>, i64), AppError> {
        let inner = self.inner.read().await;
        let blogs = inner
            .blogs
            .values()
            .map(|r| inner.resolve(r))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(query.run(blogs))
    }

    async fn distinct_tags(&self) -> Result<Vec<String>, AppError> {
        let inner = self.inner.read().await;
        let tags: BTreeSet<String> = inner
            .blogs
            .values()
            .flat_map(|r| r.tags.iter().cloned())
            .collect();
        Ok(tags.into_iter().collect())
    }

    async fn stats(&self, owner: Option<i64>) -> Result<BlogStats, AppError> {
        let inner = self.inner.read().await;
        let stats = inner
            .blogs
            .values()
            .filter(|r| owner.is_none_or(|owner| owner == r.owner_id))
            .fold(BlogStats::default(), |mut acc, r| {
                acc.total_blogs += 1;
                match r.status {
                    BlogStatus::Published => acc.published_blogs += 1,
                    BlogStatus::Draft => acc.draft_blogs += 1,
                    BlogStatus::Archived => {}
                }
                acc.total_views += r.views;
                acc.total_likes += r.likes.len() as i64;
                acc.total_comments += r.comments.len() as i64;
                acc
            });
        Ok(stats)
    }

    async fn toggle_like(
        &self,
        blog_id: i64,
        user_id: i64,
    ) -> Result<Option<LikeOutcome>, AppError> {
        let mut inner = self.inner.write().await;
        let Some(record) = inner.blogs.get_mut(&blog_id) else {
            return Ok(None);
        };

        let liked = match record.likes.iter().position(|id| *id == user_id) {
            Some(index) => {
                record.likes.remove(index);
                false
            }
            None => {
                record.likes.push(user_id);
                true
            }
        };

        Ok(Some(LikeOutcome {
            liked,
            likes_count: record.likes.len() as i64,
        }))
    }

    async fn add_comment(
        &self,
        blog_id: i64,
        user_id: i64,
        content: &str,
    ) -> Result<Option<Comment>, AppError> {
        let mut inner = self.inner.write().await;
        if !inner.blogs.contains_key(&blog_id) {
            return Ok(None);
        }
        inner.user(user_id)?;

        let record = CommentRecord {
            id: next_id(&mut inner.last_comment_id),
            author_id: user_id,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        let comment = inner.comment(&record)?;
        if let Some(blog) = inner.blogs.get_mut(&blog_id) {
            blog.comments.push(record);
        }
        Ok(Some(comment))
    }

    async fn comment_ownership(
        &self,
        blog_id: i64,
        comment_id: i64,
    ) -> Result<Option<CommentOwnership>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner.blogs.get(&blog_id).map(|blog| CommentOwnership {
            blog_owner: blog.owner_id,
            comment_author: blog
                .comments
                .iter()
                .find(|c| c.id == comment_id)
                .map(|c| c.author_id),
        }))
    }

    async fn delete_comment(&self, blog_id: i64, comment_id: i64) -> Result<bool, AppError> {
        let mut inner = self.inner.write().await;
        let Some(blog) = inner.blogs.get_mut(&blog_id) else {
            return Ok(false);
        };
        let before = blog.comments.len();
        blog.comments.retain(|c| c.id != comment_id);
        Ok(blog.comments.len() < before)
    }
}

#[async_trait]
impl ContactStore for MemoryStore {
    async fn save_message(&self, message: ContactRequest) -> Result<ContactMessage, AppError> {
        let mut inner = self.inner.write().await;
        let saved = ContactMessage {
            id: next_id(&mut inner.last_contact_id),
            name: message.name,
            email: message.email,
            message: message.message,
            created_at: Utc::now(),
        };
        inner.contacts.push(saved.clone());
        Ok(saved)
    }
}
