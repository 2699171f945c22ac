// src/main.rs

use std::{net::SocketAddr, sync::Arc, time::Duration};

use blog_backend::{
    config::Config,
    error::enable_diagnostics,
    models::user::{NewUser, Role},
    routes,
    state::AppState,
    store::{MemoryStore, PgStore, UserStore},
    utils::hash::hash_password,
};
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    enable_diagnostics(config.diagnostics);

    let state = match &config.database_url {
        Some(database_url) => {
            let store = Arc::new(connect_postgres(database_url).await);
            AppState::new(store, config.clone())
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store (data is lost on exit)");
            AppState::new(Arc::new(MemoryStore::new()), config.clone())
        }
    };

    // Seed Admin User
    if let Err(e) = seed_admin_user(state.users.as_ref(), &config).await {
        tracing::error!("Failed to seed admin user: {:?}", e);
    }

    // Create the Axum application router
    let app = routes::create_router(state);

    // Bind to the listening address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind {}: {}", addr, e));
    tracing::info!("Listening on {}", addr);

    // Start the server
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "HTTP server failed");
    }
}

/// Connects with retry and applies pending migrations.
async fn connect_postgres(database_url: &str) -> PgStore {
    let mut retry_count = 0;
    let pool = loop {
        match PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await
        {
            Ok(pool) => break pool,
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    panic!("Failed to connect to database after 5 retries: {}", e);
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    };

    tracing::info!("Database connected...");

    // Run Migrations Automatically
    tracing::info!("Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations applied successfully.");

    PgStore::new(pool)
}

/// Creates the bootstrap admin unless an admin account already exists.
async fn seed_admin_user(
    users: &dyn UserStore,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(admin) = &config.admin else {
        return Ok(());
    };

    if users.find_any_admin().await?.is_some() {
        tracing::info!("Admin account present, skipping seed.");
        return Ok(());
    }

    tracing::info!("Seeding admin user: {}", admin.username);
    let password_hash = hash_password(&admin.password)?;

    users
        .create_user(NewUser {
            name: "Administrator".to_string(),
            email: admin.email.trim().to_lowercase(),
            username: admin.username.trim().to_string(),
            password_hash,
            role: Role::Admin,
            bio: String::new(),
        })
        .await?;
    tracing::info!("Admin user created successfully.");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Received Ctrl+C, shutting down");
}
