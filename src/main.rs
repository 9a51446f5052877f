use portfolio_cms::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    mailer::{LogMailer, MailerState, SmtpMailer},
    notifier::{HttpJobRunner, NotifierState, QUEUE_CAPACITY, QueueNotifier, RetryPolicy},
    rate_limit::SWEEP_INTERVAL,
    repository::{PostgresRepository, RepositoryState},
    storage::{LocalStorage, S3StorageClient, StorageService, StorageState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, initialises logging, the database, storage, mail and
/// the background job queue, then serves the router.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load().unwrap_or_else(|e| {
        eprintln!("FATAL: invalid configuration: {e}");
        std::process::exit(1);
    });

    // 2. Logging: pretty locally, JSON in production
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "portfolio_cms=debug,tower_http=info,axum=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 3. Database
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("FATAL: Failed to run database migrations.");

    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;

    // 4. Storage: object store when configured, local directory otherwise
    let storage: StorageState = match &config.s3 {
        Some(settings) => {
            let client = S3StorageClient::new(settings);
            if config.env == Env::Local {
                // MinIO in docker starts without the bucket.
                client.ensure_bucket_exists().await;
            }
            tracing::info!(bucket = %settings.bucket, "using S3 storage");
            Arc::new(client)
        }
        None => {
            let local = LocalStorage::new(&config.local_upload_dir);
            local.ensure_bucket_exists().await;
            tracing::warn!(dir = %config.local_upload_dir, "S3 not configured, using local upload directory");
            Arc::new(local)
        }
    };

    // 5. Mail and background jobs
    let mailer: MailerState = match &config.smtp {
        Some(smtp) => match SmtpMailer::new(smtp, &config.mail_from) {
            Ok(mailer) => Arc::new(mailer),
            Err(e) => {
                tracing::error!(error = %e, "invalid SMTP settings, falling back to logging mailer");
                Arc::new(LogMailer::new())
            }
        },
        None => {
            tracing::warn!("SMTP not configured, emails will be logged");
            Arc::new(LogMailer::new())
        }
    };

    let http = reqwest::Client::new();
    let runner = Arc::new(HttpJobRunner::new(
        http.clone(),
        config.webhook_url.clone(),
        mailer.clone(),
    ));
    let (queue, _worker) = QueueNotifier::spawn(runner, RetryPolicy::default(), QUEUE_CAPACITY);
    let notifier = Arc::new(queue) as NotifierState;

    // 6. State, router, server
    let bind_addr = config.bind_addr.clone();
    let mut app_state = AppState::new(repo, storage, notifier, mailer, config);
    app_state.http = http;
    app_state.rate_limiter.spawn_sweeper(SWEEP_INTERVAL);

    let app = create_router(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("FATAL: could not bind {bind_addr}: {e}"));

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at: http://{}/swagger-ui", bind_addr);

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly");
}
