// tests/pg_store_tests.rs

//! `PgStore` against a live Postgres. Every test returns early when
//! `DATABASE_URL` is unset, so the suite stays green without a database.
//! Names are uuid-suffixed so runs can share one database.

use std::{sync::Arc, time::Duration};

use blog_backend::{
    config::Config,
    error::AppError,
    models::{
        blog::{BlogStats, BlogStatus, NewBlog},
        user::{NewUser, Role},
    },
    query::{BlogQuery, SortDirection, SortField},
    routes,
    state::AppState,
    store::{BlogStore, PgStore, UserStore},
};
use serde_json::{Value, json};
use sqlx::postgres::PgPoolOptions;

async fn pg_store() -> Option<PgStore> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping Postgres test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&database_url)
        .await
        .expect("Failed to connect to DATABASE_URL");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    Some(PgStore::new(pool))
}

fn unique(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().to_string()[..8])
}

fn new_user(username: &str, email: &str) -> NewUser {
    NewUser {
        name: username.to_string(),
        email: email.to_string(),
        username: username.to_string(),
        password_hash: "not-a-real-hash".to_string(),
        role: Role::User,
        bio: String::new(),
    }
}

async fn user(store: &PgStore, prefix: &str) -> i64 {
    let username = unique(prefix);
    store
        .create_user(new_user(&username, &format!("{}@example.com", username)))
        .await
        .unwrap()
        .id
}

fn new_blog(title: &str, status: BlogStatus) -> NewBlog {
    NewBlog {
        title: title.to_string(),
        summary: "summary".to_string(),
        content: "content".to_string(),
        tags: vec!["pg".to_string()],
        image: None,
        status,
    }
}

#[tokio::test]
async fn like_toggles_on_then_off() {
    let Some(store) = pg_store().await else { return };
    let owner = user(&store, "owner").await;
    let fan = user(&store, "fan").await;
    let blog = store
        .create_blog(owner, new_blog("Liked", BlogStatus::Published))
        .await
        .unwrap();

    let first = store.toggle_like(blog.id, fan).await.unwrap().unwrap();
    let second = store.toggle_like(blog.id, fan).await.unwrap().unwrap();

    assert!(first.liked);
    assert_eq!(first.likes_count, 1);
    assert!(!second.liked);
    assert_eq!(second.likes_count, 0);
    assert!(store.find_blog(blog.id).await.unwrap().unwrap().likes.is_empty());
    assert!(store.toggle_like(i64::MAX, fan).await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_likes_from_two_users_both_land() {
    let Some(store) = pg_store().await else { return };
    let owner = user(&store, "owner").await;
    let a = user(&store, "fan_a").await;
    let b = user(&store, "fan_b").await;
    let blog_id = store
        .create_blog(owner, new_blog("Contended", BlogStatus::Published))
        .await
        .unwrap()
        .id;

    let store = Arc::new(store);
    let handles: Vec<_> = [a, b]
        .into_iter()
        .map(|fan| {
            let store = store.clone();
            tokio::spawn(async move { store.toggle_like(blog_id, fan).await })
        })
        .collect();
    for handle in handles {
        let outcome = handle.await.unwrap().unwrap().unwrap();
        assert!(outcome.liked);
    }

    let mut likes = store.find_blog(blog_id).await.unwrap().unwrap().likes;
    likes.sort();
    let mut expected = vec![a, b];
    expected.sort();
    assert_eq!(likes, expected);
}

#[tokio::test]
async fn stats_are_scoped_to_one_owner() {
    let Some(store) = pg_store().await else { return };
    let owner = user(&store, "owner").await;
    let other = user(&store, "other").await;
    let fan = user(&store, "fan").await;

    let published = store
        .create_blog(owner, new_blog("Published", BlogStatus::Published))
        .await
        .unwrap();
    store
        .create_blog(owner, new_blog("Draft", BlogStatus::Draft))
        .await
        .unwrap();
    store
        .create_blog(other, new_blog("Elsewhere", BlogStatus::Published))
        .await
        .unwrap();
    store.record_view(published.id).await.unwrap();
    store.record_view(published.id).await.unwrap();
    store.toggle_like(published.id, fan).await.unwrap();
    store.add_comment(published.id, fan, "nice").await.unwrap();

    let stats = store.stats(Some(owner)).await.unwrap();

    assert_eq!(
        stats,
        BlogStats {
            total_blogs: 2,
            published_blogs: 1,
            draft_blogs: 1,
            total_views: 2,
            total_likes: 1,
            total_comments: 1,
        }
    );
    let everything = store.stats(None).await.unwrap();
    assert!(everything.total_blogs >= 3);
}

#[tokio::test]
async fn duplicate_username_or_email_is_a_conflict() {
    let Some(store) = pg_store().await else { return };
    let username = unique("taken");
    let email = format!("{}@example.com", username);
    store.create_user(new_user(&username, &email)).await.unwrap();

    let same_username = store
        .create_user(new_user(&username, &format!("other_{}", email)))
        .await;
    let same_email = store.create_user(new_user(&unique("fresh"), &email)).await;

    match same_username {
        Err(AppError::Conflict(msg)) => assert_eq!(msg, "Username already exists"),
        other => panic!("expected a username conflict, got {:?}", other),
    }
    match same_email {
        Err(AppError::Conflict(msg)) => assert_eq!(msg, "Email already exists"),
        other => panic!("expected an email conflict, got {:?}", other),
    }
}

#[tokio::test]
async fn duplicate_signup_over_http_is_409() {
    // Arrange
    let Some(store) = pg_store().await else { return };
    let state = AppState::new(Arc::new(store), Config::with_secret("pg_test_secret"));
    let app = routes::create_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = format!("http://127.0.0.1:{}", listener.local_addr().unwrap().port());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    let client = reqwest::Client::new();
    let username = unique("signup");
    let body = json!({
        "name": "Twice",
        "email": format!("{}@example.com", username),
        "username": username,
        "password": "password123",
    });

    // Act
    let first = client
        .post(format!("{}/api/auth/signup", address))
        .json(&body)
        .send()
        .await
        .unwrap();
    let mut same_username = body.clone();
    same_username["email"] = json!(format!("second_{}@example.com", username));
    let second = client
        .post(format!("{}/api/auth/signup", address))
        .json(&same_username)
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(first.status().as_u16(), 201);
    assert_eq!(second.status().as_u16(), 409);
    let error: Value = second.json().await.unwrap();
    assert_eq!(error["error"], "Username already exists");
}

#[tokio::test]
async fn deleting_a_blog_removes_its_comments_and_likes() {
    let Some(store) = pg_store().await else { return };
    let owner = user(&store, "owner").await;
    let fan = user(&store, "fan").await;
    let blog_id = store
        .create_blog(owner, new_blog("Short lived", BlogStatus::Published))
        .await
        .unwrap()
        .id;
    let comment = store.add_comment(blog_id, fan, "first").await.unwrap().unwrap();
    store.toggle_like(blog_id, fan).await.unwrap();

    assert!(store.delete_blog(blog_id).await.unwrap());

    assert!(store.find_blog(blog_id).await.unwrap().is_none());
    assert!(store.comment_ownership(blog_id, comment.id).await.unwrap().is_none());
    assert!(store.add_comment(blog_id, fan, "late").await.unwrap().is_none());
    assert!(!store.delete_blog(blog_id).await.unwrap());

    let pool = PgPoolOptions::new()
        .connect(&std::env::var("DATABASE_URL").unwrap())
        .await
        .unwrap();
    let comments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM blog_comments WHERE blog_id = $1")
        .bind(blog_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    let likes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM blog_likes WHERE blog_id = $1")
        .bind(blog_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!((comments, likes), (0, 0));
}

#[tokio::test]
async fn titles_sort_bytewise_like_the_memory_store() {
    let Some(store) = pg_store().await else { return };
    let owner = user(&store, "owner").await;
    for title in ["beta", "Zeta", "alpha"] {
        store
            .create_blog(owner, new_blog(title, BlogStatus::Published))
            .await
            .unwrap();
    }
    let query = BlogQuery {
        owner: Some(owner),
        sort: SortField::Title,
        direction: SortDirection::Asc,
        ..Default::default()
    };

    let (blogs, total) = store.list_blogs(&query).await.unwrap();

    assert_eq!(total, 3);
    let titles: Vec<&str> = blogs.iter().map(|b| b.title.as_str()).collect();
    assert_eq!(titles, vec!["Zeta", "alpha", "beta"]);
}
