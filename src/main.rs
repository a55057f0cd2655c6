// src/main.rs

use cohort_tracker::config::Config;
use cohort_tracker::models::student::normalize_handle;
use cohort_tracker::routes;
use cohort_tracker::state::AppState;
use cohort_tracker::utils::hash::hash_password;
use dotenvy::dotenv;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenv().ok();

    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let connect_options = SqliteConnectOptions::from_str(&config.database_url)
        .expect("DATABASE_URL is not a valid SQLite URL")
        .create_if_missing(true)
        .foreign_keys(true);

    // Initialize Database Pool with Retry
    let mut retry_count = 0;
    let pool = loop {
        match SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect_with(connect_options.clone())
            .await
        {
            Ok(pool) => break pool,
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    panic!("Failed to open database after 5 retries: {}", e);
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    };

    tracing::info!("Database opened at {}", config.database_url);

    tracing::info!("Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations applied successfully.");

    if let Err(e) = seed_admin(&pool, &config).await {
        tracing::error!("Failed to seed admin account: {:?}", e);
    }

    tracing::info!(
        "Weekly battle: {} vs {} (accuracy board needs more than {} questions)",
        config.team_a,
        config.team_b,
        config.accuracy_min_volume
    );

    let state = AppState {
        pool: pool.clone(),
        config: config.clone(),
    };

    let app = routes::create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listening address");

    axum::serve(listener, app).await.expect("Server error");
}

/// Creates the configured admin account on first boot. Existing handles are left untouched.
async fn seed_admin(pool: &SqlitePool, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let (Some(handle), Some(password)) = (&config.admin_handle, &config.admin_password) else {
        return Ok(());
    };

    let handle = normalize_handle(handle);

    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM students WHERE handle = ?")
        .bind(&handle)
        .fetch_optional(pool)
        .await?;

    if exists.is_none() {
        tracing::info!("Seeding admin account: {}", handle);
        let hashed_password = hash_password(password)?;

        sqlx::query(
            r#"
            INSERT INTO students (name, handle, team, password_hash, role, must_change_password)
            VALUES (?, ?, 'unassigned', ?, 'admin', FALSE)
            "#,
        )
        .bind(&handle)
        .bind(&handle)
        .bind(hashed_password)
        .execute(pool)
        .await?;
        tracing::info!("Admin account created successfully.");
    }

    Ok(())
}
