// src/query.rs

//! Listing criteria for blogs: filter, search, sort and pagination.
//!
//! Request parameters are parsed leniently into a typed `BlogQuery`, which
//! every store evaluates the same way: `matches` and `compare` are the
//! reference semantics, the Postgres store translates them to SQL.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    models::blog::{Blog, BlogStatus},
    utils::tags::normalize_tag,
};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Title,
    Views,
}

impl SortField {
    /// Unknown or missing fields fall back to creation time.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("updatedAt" | "updated_at") => SortField::UpdatedAt,
            Some("title") => SortField::Title,
            Some("views") => SortField::Views,
            _ => SortField::CreatedAt,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::Title => "title",
            SortField::Views => "views",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    /// Only an explicit "asc" sorts ascending.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some(order) if order.trim().eq_ignore_ascii_case("asc") => SortDirection::Asc,
            _ => SortDirection::Desc,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// A 1-based page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageRequest {
    /// Missing, non-numeric or non-positive values fall back to the defaults.
    pub fn parse(page: Option<&str>, limit: Option<&str>) -> Self {
        let positive = |raw: Option<&str>| {
            raw.and_then(|v| v.trim().parse::<i64>().ok())
                .filter(|v| *v >= 1)
        };
        Self {
            page: positive(page).unwrap_or(DEFAULT_PAGE),
            limit: positive(limit).unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn total_pages(&self, total: i64) -> i64 {
        (total + self.limit - 1) / self.limit
    }

    pub fn has_more(&self, returned: usize, total: i64) -> bool {
        self.offset() + (returned as i64) < total
    }

    /// Slices an already filtered and sorted collection.
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        let offset = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(self.limit).unwrap_or(usize::MAX);
        items.into_iter().skip(offset).take(limit).collect()
    }
}

/// Typed listing criteria.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlogQuery {
    pub owner: Option<i64>,
    pub status: Option<BlogStatus>,
    /// Normalized (trimmed, lowercased) tag.
    pub tag: Option<String>,
    pub search: Option<String>,
    pub sort: SortField,
    pub direction: SortDirection,
    pub page: PageRequest,
}

impl BlogQuery {
    /// status AND tag membership AND (title OR summary OR content contains search).
    pub fn matches(&self, blog: &Blog) -> bool {
        if self.owner.is_some_and(|owner| owner != blog.owner_id()) {
            return false;
        }
        if self.status.is_some_and(|status| status != blog.status) {
            return false;
        }
        if let Some(tag) = &self.tag {
            if !blog.tags.iter().any(|t| t.to_lowercase() == *tag) {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let found = [&blog.title, &blog.summary, &blog.content]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle));
            if !found {
                return false;
            }
        }
        true
    }

    /// Orders by the sort field, then by id in the same direction.
    /// Titles compare bytewise, so uppercase sorts before lowercase.
    pub fn compare(&self, a: &Blog, b: &Blog) -> Ordering {
        let primary = match self.sort {
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            SortField::Title => a.title.cmp(&b.title),
            SortField::Views => a.views.cmp(&b.views),
        };
        let ordering = primary.then_with(|| a.id.cmp(&b.id));
        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }

    /// Filters, sorts and paginates an in-memory collection.
    /// Returns the page and the total number of matches.
    pub fn run(&self, blogs: Vec<Blog>) -> (Vec<Blog>, i64) {
        let mut matching: Vec<Blog> = blogs.into_iter().filter(|b| self.matches(b)).collect();
        matching.sort_by(|a, b| self.compare(a, b));
        let total = matching.len() as i64;
        (self.page.apply(matching), total)
    }
}

fn non_blank(raw: Option<String>) -> Option<String> {
    raw.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Query parameters of `GET /blogs`.
#[derive(Debug, Default, Deserialize)]
pub struct ListBlogsParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub tag: Option<String>,
    pub search: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
    pub order: Option<String>,
}

impl ListBlogsParams {
    /// Status defaults to published.
    pub fn into_query(self) -> Result<BlogQuery, AppError> {
        let status = match non_blank(self.status) {
            Some(raw) => raw.parse()?,
            None => BlogStatus::Published,
        };

        Ok(BlogQuery {
            owner: None,
            status: Some(status),
            tag: self.tag.as_deref().and_then(normalize_tag),
            search: non_blank(self.search),
            sort: SortField::parse(self.sort_by.as_deref()),
            direction: SortDirection::parse(self.order.as_deref()),
            page: PageRequest::parse(self.page.as_deref(), self.limit.as_deref()),
        })
    }
}

/// Query parameters of `GET /blogs/my`.
#[derive(Debug, Default, Deserialize)]
pub struct MyBlogsParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub status: Option<String>,
}

impl MyBlogsParams {
    /// Forced to the owner, newest first; status only when given.
    pub fn into_query(self, owner: i64) -> Result<BlogQuery, AppError> {
        let status = non_blank(self.status)
            .map(|raw| raw.parse::<BlogStatus>())
            .transpose()?;

        Ok(BlogQuery {
            owner: Some(owner),
            status,
            tag: None,
            search: None,
            sort: SortField::CreatedAt,
            direction: SortDirection::Desc,
            page: PageRequest::parse(self.page.as_deref(), self.limit.as_deref()),
        })
    }
}

/// Query parameters of paginated admin listings.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl PageParams {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::parse(self.page.as_deref(), self.limit.as_deref())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPagination {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_blogs: i64,
    pub has_more: bool,
}

impl BlogPagination {
    pub fn new(page: &PageRequest, returned: usize, total: i64) -> Self {
        Self {
            current_page: page.page,
            total_pages: page.total_pages(total),
            total_blogs: total,
            has_more: page.has_more(returned, total),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPagination {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_users: i64,
    pub has_more: bool,
}

impl UserPagination {
    pub fn new(page: &PageRequest, returned: usize, total: i64) -> Self {
        Self {
            current_page: page.page,
            total_pages: page.total_pages(total),
            total_users: total,
            has_more: page.has_more(returned, total),
        }
    }
}

/// Selectable filter options echoed with a listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogFilters {
    pub available_tags: Vec<String>,
    pub current_tag: Option<String>,
    pub current_search: Option<String>,
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::models::blog::BlogAuthor;

    fn blog(id: i64, owner: i64, title: &str, tags: &[&str], status: BlogStatus) -> Blog {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Blog {
            id,
            title: title.to_string(),
            summary: format!("summary {id}"),
            content: format!("content {id}"),
            image: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            status,
            views: id * 10,
            author: BlogAuthor {
                id: owner,
                username: format!("user{owner}"),
                email: format!("user{owner}@example.com"),
                name: format!("User {owner}"),
                bio: String::new(),
                profile_picture: None,
            },
            likes: vec![],
            comments: vec![],
            // ids 1 and 2 share a timestamp to exercise the tie-break
            created_at: base + Duration::minutes(id.max(2)),
            updated_at: base,
        }
    }

    fn dataset() -> Vec<Blog> {
        vec![
            blog(1, 1, "Rust ownership", &["rust", "lang"], BlogStatus::Published),
            blog(2, 1, "Async in practice", &["rust"], BlogStatus::Published),
            blog(3, 2, "Gardening", &["home"], BlogStatus::Draft),
            blog(4, 2, "Borrowing rules", &["lang"], BlogStatus::Published),
            blog(5, 3, "Archive", &[], BlogStatus::Archived),
        ]
    }

    #[test]
    fn page_parsing_is_lenient() {
        assert_eq!(PageRequest::parse(None, None), PageRequest { page: 1, limit: 10 });
        assert_eq!(PageRequest::parse(Some("abc"), Some("0")), PageRequest { page: 1, limit: 10 });
        assert_eq!(PageRequest::parse(Some("-3"), Some("5")), PageRequest { page: 1, limit: 5 });
        assert_eq!(PageRequest::parse(Some("2"), Some("1000")).limit, MAX_LIMIT);
    }

    #[test]
    fn page_maths() {
        let page = PageRequest { page: 2, limit: 3 };
        assert_eq!(page.offset(), 3);
        assert_eq!(page.total_pages(7), 3);
        assert_eq!(page.total_pages(0), 0);
        assert!(page.has_more(3, 7));
        assert!(!page.has_more(1, 4));
    }

    #[test]
    fn sort_field_falls_back_to_created_at() {
        assert_eq!(SortField::parse(Some("views")), SortField::Views);
        assert_eq!(SortField::parse(Some("password")), SortField::CreatedAt);
        assert_eq!(SortField::parse(None), SortField::CreatedAt);
        assert_eq!(SortDirection::parse(Some("ASC")), SortDirection::Asc);
        assert_eq!(SortDirection::parse(Some("sideways")), SortDirection::Desc);
    }

    #[test]
    fn list_defaults_to_published_newest_first() {
        let query = ListBlogsParams::default().into_query().unwrap();
        assert_eq!(query.status, Some(BlogStatus::Published));
        let (items, total) = query.run(dataset());
        assert_eq!(total, 3);
        let ids: Vec<i64> = items.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![4, 2, 1]);
    }

    #[test]
    fn invalid_status_is_a_validation_error() {
        let params = ListBlogsParams {
            status: Some("secret".into()),
            ..Default::default()
        };
        assert!(matches!(params.into_query(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn tag_filter_is_case_insensitive() {
        let params = ListBlogsParams {
            tag: Some(" RUST ".into()),
            ..Default::default()
        };
        let (items, total) = params.into_query().unwrap().run(dataset());
        assert_eq!(total, 2);
        assert!(items.iter().all(|b| b.tags.contains(&"rust".to_string())));
    }

    #[test]
    fn search_matches_title_summary_or_content() {
        let by_title = ListBlogsParams {
            search: Some("BORROW".into()),
            ..Default::default()
        };
        let (items, _) = by_title.into_query().unwrap().run(dataset());
        assert_eq!(items.iter().map(|b| b.id).collect::<Vec<_>>(), vec![4]);

        let by_summary = ListBlogsParams {
            search: Some("summary 2".into()),
            ..Default::default()
        };
        let (items, _) = by_summary.into_query().unwrap().run(dataset());
        assert_eq!(items.iter().map(|b| b.id).collect::<Vec<_>>(), vec![2]);

        let by_content = ListBlogsParams {
            search: Some("CONTENT 1".into()),
            ..Default::default()
        };
        let (items, _) = by_content.into_query().unwrap().run(dataset());
        assert_eq!(items.iter().map(|b| b.id).collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn ties_are_broken_by_id() {
        let asc = ListBlogsParams {
            order: Some("asc".into()),
            ..Default::default()
        };
        let (items, _) = asc.into_query().unwrap().run(dataset());
        assert_eq!(items.iter().map(|b| b.id).collect::<Vec<_>>(), vec![1, 2, 4]);
    }

    #[test]
    fn titles_sort_bytewise() {
        let blogs = vec![
            blog(1, 1, "beta", &[], BlogStatus::Published),
            blog(2, 1, "Zeta", &[], BlogStatus::Published),
            blog(3, 1, "alpha", &[], BlogStatus::Published),
        ];
        let params = ListBlogsParams {
            sort_by: Some("title".into()),
            order: Some("asc".into()),
            ..Default::default()
        };
        let (items, _) = params.into_query().unwrap().run(blogs);
        assert_eq!(items.iter().map(|b| b.id).collect::<Vec<_>>(), vec![2, 3, 1]);
    }

    #[test]
    fn pages_cover_every_match_exactly_once() {
        let mut seen = Vec::new();
        let mut page = 1;
        loop {
            let params = ListBlogsParams {
                page: Some(page.to_string()),
                limit: Some("2".into()),
                sort_by: Some("views".into()),
                ..Default::default()
            };
            let query = params.into_query().unwrap();
            let (items, total) = query.run(dataset());
            let pagination = BlogPagination::new(&query.page, items.len(), total);
            seen.extend(items.iter().map(|b| b.id));
            if !pagination.has_more {
                assert_eq!(pagination.total_pages, page);
                break;
            }
            page += 1;
        }
        assert_eq!(seen, vec![4, 2, 1]);
    }

    #[test]
    fn my_blogs_are_scoped_to_owner() {
        let query = MyBlogsParams::default().into_query(2).unwrap();
        assert_eq!(query.status, None);
        let (items, total) = query.run(dataset());
        assert_eq!(total, 2);
        assert_eq!(items.iter().map(|b| b.id).collect::<Vec<_>>(), vec![4, 3]);

        let drafts = MyBlogsParams {
            status: Some("draft".into()),
            ..Default::default()
        };
        let (items, _) = drafts.into_query(2).unwrap().run(dataset());
        assert_eq!(items.iter().map(|b| b.id).collect::<Vec<_>>(), vec![3]);
    }
}
