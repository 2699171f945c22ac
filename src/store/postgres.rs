// src/store/postgres.rs

//! Postgres-backed store.
//!
//! Likes and comments live in their own tables keyed by blog; a blog is
//! loaded with its author joined in, its like set aggregated into an array
//! and its comments fetched in one batch per page.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

use crate::{
    error::AppError,
    models::{
        blog::{Blog, BlogAuthor, BlogChanges, BlogStats, BlogStatus, LikeOutcome, NewBlog},
        comment::{Comment, CommentAuthor, CommentOwnership},
        contact::{ContactMessage, ContactRequest},
        user::{NewUser, Role, UpdateProfileRequest, User},
    },
    query::{BlogQuery, PageRequest, SortField},
    store::{BlogStore, ContactStore, UserStore},
};

const USER_COLUMNS: &str = "id, name, email, username, password, role, is_active, bio, \
                            profile_picture, created_at, updated_at";

const BLOG_SELECT: &str = r#"
    SELECT
        b.id, b.user_id, b.title, b.summary, b.content, b.image, b.tags, b.status,
        b.views, b.created_at, b.updated_at,
        u.username AS author_username,
        u.email AS author_email,
        u.name AS author_name,
        u.bio AS author_bio,
        u.profile_picture AS author_profile_picture,
        ARRAY(
            SELECT l.user_id FROM blog_likes l
            WHERE l.blog_id = b.id
            ORDER BY l.created_at, l.user_id
        ) AS likes
    FROM blogs b
    JOIN users u ON u.id = b.user_id
"#;

const COMMENT_SELECT: &str = r#"
    SELECT
        c.id, c.blog_id, c.content, c.created_at,
        u.id AS user_id, u.username, u.name, u.profile_picture
    FROM blog_comments c
    JOIN users u ON u.id = c.user_id
"#;

#[derive(Debug, FromRow)]
struct BlogRow {
    id: i64,
    user_id: i64,
    title: String,
    summary: String,
    content: String,
    image: Option<String>,
    tags: Vec<String>,
    status: BlogStatus,
    views: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    author_username: String,
    author_email: String,
    author_name: String,
    author_bio: String,
    author_profile_picture: Option<String>,
    likes: Vec<i64>,
}

impl BlogRow {
    fn into_blog(self, comments: Vec<Comment>) -> Blog {
        Blog {
            id: self.id,
            title: self.title,
            summary: self.summary,
            content: self.content,
            image: self.image,
            tags: self.tags,
            status: self.status,
            views: self.views,
            author: BlogAuthor {
                id: self.user_id,
                username: self.author_username,
                email: self.author_email,
                name: self.author_name,
                bio: self.author_bio,
                profile_picture: self.author_profile_picture,
            },
            likes: self.likes,
            comments,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct CommentRow {
    id: i64,
    blog_id: i64,
    content: String,
    created_at: DateTime<Utc>,
    user_id: i64,
    username: String,
    name: String,
    profile_picture: Option<String>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: row.id,
            user: CommentAuthor {
                id: row.user_id,
                username: row.username,
                name: row.name,
                profile_picture: row.profile_picture,
            },
            content: row.content,
            created_at: row.created_at,
        }
    }
}

/// Escapes LIKE wildcards so the search term matches literally.
fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn push_blog_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &BlogQuery) {
    builder.push(" WHERE TRUE");

    if let Some(owner) = query.owner {
        builder.push(" AND b.user_id = ");
        builder.push_bind(owner);
    }

    if let Some(status) = query.status {
        builder.push(" AND b.status = ");
        builder.push_bind(status);
    }

    if let Some(tag) = &query.tag {
        builder.push(" AND ");
        builder.push_bind(tag.clone());
        builder.push(" = ANY(b.tags)");
    }

    if let Some(search) = &query.search {
        let pattern = like_pattern(search);
        builder.push(" AND (b.title ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR b.summary ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR b.content ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }
}

/// Titles sort by byte order (`COLLATE "C"`), matching `BlogQuery::compare`
/// rather than the database's locale collation.
fn order_clause(query: &BlogQuery) -> String {
    let direction = query.direction.keyword();
    let column = match query.sort {
        SortField::Title => r#"b.title COLLATE "C""#.to_string(),
        other => format!("b.{}", other.column()),
    };
    format!(" ORDER BY {column} {direction}, b.id {direction}")
}

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attaches comments, oldest first, to already loaded rows.
    async fn attach_comments(&self, rows: Vec<BlogRow>) -> Result<Vec<Blog>, AppError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let sql = format!("{COMMENT_SELECT} WHERE c.blog_id = ANY($1) ORDER BY c.created_at, c.id");
        let comment_rows = sqlx::query_as::<_, CommentRow>(&sql)
            .bind(&ids)
            .fetch_all(&self.pool)
            .await?;

        let mut by_blog: HashMap<i64, Vec<Comment>> = HashMap::new();
        for row in comment_rows {
            by_blog.entry(row.blog_id).or_default().push(row.into());
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let comments = by_blog.remove(&row.id).unwrap_or_default();
                row.into_blog(comments)
            })
            .collect())
    }

    async fn load_blog(&self, id: i64) -> Result<Option<Blog>, AppError> {
        let sql = format!("{BLOG_SELECT} WHERE b.id = $1");
        let row = sqlx::query_as::<_, BlogRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(self.attach_comments(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        let sql = format!(
            "INSERT INTO users (name, email, username, password, role, bio) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(user.role)
            .bind(&user.bio)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                let constraint = e
                    .as_database_error()
                    .and_then(|db| db.constraint())
                    .map(str::to_owned);
                match constraint.as_deref() {
                    Some("users_username_key") => {
                        AppError::Conflict("Username already exists".to_string())
                    }
                    Some("users_email_key") => AppError::Conflict("Email already exists".to_string()),
                    _ => {
                        tracing::error!("Failed to create user: {:?}", e);
                        AppError::from(e)
                    }
                }
            })
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_by_login(&self, login: &str) -> Result<Option<User>, AppError> {
        let login = login.trim();
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 OR email = $2 \
             ORDER BY (username = $1) DESC LIMIT 1"
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(login)
            .bind(login.to_lowercase())
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_any_admin(&self) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE role = $1 ORDER BY id LIMIT 1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(Role::Admin)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_profile(
        &self,
        id: i64,
        changes: &UpdateProfileRequest,
    ) -> Result<Option<User>, AppError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE users SET updated_at = NOW()");

        if let Some(name) = &changes.name {
            builder.push(", name = ");
            builder.push_bind(name.clone());
        }
        if let Some(bio) = &changes.bio {
            builder.push(", bio = ");
            builder.push_bind(bio.clone());
        }
        if let Some(picture) = &changes.profile_picture {
            builder.push(", profile_picture = ");
            builder.push_bind(picture.clone());
        }

        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(format!(" RETURNING {USER_COLUMNS}"));

        Ok(builder
            .build_query_as::<User>()
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_users(&self, page: &PageRequest) -> Result<(Vec<User>, i64), AppError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2"
        );
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok((users, total))
    }

    async fn toggle_active(&self, id: i64) -> Result<Option<User>, AppError> {
        let sql = format!(
            "UPDATE users SET is_active = NOT is_active, updated_at = NOW() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn set_role(&self, id: i64, role: Role) -> Result<Option<User>, AppError> {
        let sql = format!(
            "UPDATE users SET role = $1, updated_at = NOW() WHERE id = $2 RETURNING {USER_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(role)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }
}

#[async_trait]
impl BlogStore for PgStore {
    async fn create_blog(&self, owner_id: i64, blog: NewBlog) -> Result<Blog, AppError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO blogs (user_id, title, summary, content, image, tags, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(owner_id)
        .bind(&blog.title)
        .bind(&blog.summary)
        .bind(&blog.content)
        .bind(&blog.image)
        .bind(&blog.tags)
        .bind(blog.status)
        .fetch_one(&self.pool)
        .await?;

        self.load_blog(id)
            .await?
            .ok_or_else(|| AppError::InternalServerError(format!("blog {id} vanished after insert")))
    }

    async fn find_blog(&self, id: i64) -> Result<Option<Blog>, AppError> {
        self.load_blog(id).await
    }

    async fn record_view(&self, id: i64) -> Result<Option<Blog>, AppError> {
        let updated: Option<i64> =
            sqlx::query_scalar("UPDATE blogs SET views = views + 1 WHERE id = $1 RETURNING id")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        match updated {
            Some(id) => self.load_blog(id).await,
            None => Ok(None),
        }
    }

    async fn blog_owner(&self, id: i64) -> Result<Option<i64>, AppError> {
        Ok(sqlx::query_scalar("SELECT user_id FROM blogs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_blog(&self, id: i64, changes: &BlogChanges) -> Result<Option<Blog>, AppError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE blogs SET updated_at = NOW()");

        if let Some(title) = &changes.title {
            builder.push(", title = ");
            builder.push_bind(title.clone());
        }
        if let Some(summary) = &changes.summary {
            builder.push(", summary = ");
            builder.push_bind(summary.clone());
        }
        if let Some(content) = &changes.content {
            builder.push(", content = ");
            builder.push_bind(content.clone());
        }
        if let Some(tags) = &changes.tags {
            builder.push(", tags = ");
            builder.push_bind(tags.clone());
        }
        if let Some(image) = &changes.image {
            builder.push(", image = ");
            builder.push_bind(image.clone());
        }
        if let Some(status) = changes.status {
            builder.push(", status = ");
            builder.push_bind(status);
        }

        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(" RETURNING id");

        let updated: Option<i64> = builder
            .build_query_scalar()
            .fetch_optional(&self.pool)
            .await?;

        match updated {
            Some(id) => self.load_blog(id).await,
            None => Ok(None),
        }
    }

    async fn delete_blog(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM blogs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_blogs(&self, query: &BlogQuery) -> Result<(Vec<Blog>, i64), AppError> {
        let mut count: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM blogs b");
        push_blog_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(BLOG_SELECT);
        push_blog_filters(&mut builder, query);

        builder.push(order_clause(query));
        builder.push(" LIMIT ");
        builder.push_bind(query.page.limit);
        builder.push(" OFFSET ");
        builder.push_bind(query.page.offset());

        let rows = builder
            .build_query_as::<BlogRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok((self.attach_comments(rows).await?, total))
    }

    async fn distinct_tags(&self) -> Result<Vec<String>, AppError> {
        Ok(sqlx::query_scalar(
            "SELECT DISTINCT tag FROM blogs, UNNEST(blogs.tags) AS tag ORDER BY tag",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn stats(&self, owner: Option<i64>) -> Result<BlogStats, AppError> {
        Ok(sqlx::query_as::<_, BlogStats>(
            r#"
            WITH scoped AS (
                SELECT id, status, views FROM blogs
                WHERE ($1::BIGINT IS NULL OR user_id = $1)
            )
            SELECT
                (SELECT COUNT(*) FROM scoped) AS total_blogs,
                (SELECT COUNT(*) FROM scoped WHERE status = 'published') AS published_blogs,
                (SELECT COUNT(*) FROM scoped WHERE status = 'draft') AS draft_blogs,
                (SELECT COALESCE(SUM(views), 0)::BIGINT FROM scoped) AS total_views,
                (SELECT COUNT(*) FROM blog_likes l JOIN scoped s ON s.id = l.blog_id) AS total_likes,
                (SELECT COUNT(*) FROM blog_comments c JOIN scoped s ON s.id = c.blog_id) AS total_comments
            "#,
        )
        .bind(owner)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn toggle_like(
        &self,
        blog_id: i64,
        user_id: i64,
    ) -> Result<Option<LikeOutcome>, AppError> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes toggles on the same blog.
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM blogs WHERE id = $1 FOR UPDATE")
            .bind(blog_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Ok(None);
        }

        let removed = sqlx::query("DELETE FROM blog_likes WHERE blog_id = $1 AND user_id = $2")
            .bind(blog_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let liked = removed == 0;
        if liked {
            sqlx::query("INSERT INTO blog_likes (blog_id, user_id) VALUES ($1, $2)")
                .bind(blog_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        let likes_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM blog_likes WHERE blog_id = $1")
            .bind(blog_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Some(LikeOutcome { liked, likes_count }))
    }

    async fn add_comment(
        &self,
        blog_id: i64,
        user_id: i64,
        content: &str,
    ) -> Result<Option<Comment>, AppError> {
        let row = sqlx::query_as::<_, CommentRow>(
            r#"
            WITH inserted AS (
                INSERT INTO blog_comments (blog_id, user_id, content)
                SELECT $1::BIGINT, $2::BIGINT, $3::TEXT
                WHERE EXISTS (SELECT 1 FROM blogs WHERE id = $1::BIGINT)
                RETURNING id, blog_id, user_id, content, created_at
            )
            SELECT
                i.id, i.blog_id, i.content, i.created_at,
                u.id AS user_id, u.username, u.name, u.profile_picture
            FROM inserted i
            JOIN users u ON u.id = i.user_id
            "#,
        )
        .bind(blog_id)
        .bind(user_id)
        .bind(content)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Comment::from))
    }

    async fn comment_ownership(
        &self,
        blog_id: i64,
        comment_id: i64,
    ) -> Result<Option<CommentOwnership>, AppError> {
        let row: Option<(i64, Option<i64>)> = sqlx::query_as(
            r#"
            SELECT b.user_id AS blog_owner, c.user_id AS comment_author
            FROM blogs b
            LEFT JOIN blog_comments c ON c.blog_id = b.id AND c.id = $2
            WHERE b.id = $1
            "#,
        )
        .bind(blog_id)
        .bind(comment_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(blog_owner, comment_author)| CommentOwnership {
            blog_owner,
            comment_author,
        }))
    }

    async fn delete_comment(&self, blog_id: i64, comment_id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM blog_comments WHERE blog_id = $1 AND id = $2")
            .bind(blog_id)
            .bind(comment_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ContactStore for PgStore {
    async fn save_message(&self, message: ContactRequest) -> Result<ContactMessage, AppError> {
        Ok(sqlx::query_as::<_, ContactMessage>(
            r#"
            INSERT INTO contact_messages (name, email, message)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, message, created_at
            "#,
        )
        .bind(&message.name)
        .bind(&message.email)
        .bind(&message.message)
        .fetch_one(&self.pool)
        .await?)
    }
}
