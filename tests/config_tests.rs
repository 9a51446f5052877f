use portfolio_cms::{
    AppConfig,
    config::{ConfigError, Env},
};
use serial_test::serial;
use std::{env, panic, time::Duration};

const VARS: &[&str] = &[
    "APP_ENV",
    "DATABASE_URL",
    "AUTH_SECRET",
    "APP_URL",
    "S3_ACCESS_KEY",
    "S3_SECRET_KEY",
    "S3_BUCKET_NAME",
    "S3_ENDPOINT",
    "S3_PUBLIC_URL",
    "SMTP_HOST",
    "SMTP_USER",
    "SMTP_PASSWORD",
    "SMTP_PORT",
    "N8N_WEBHOOK_URL",
    "WEBHOOK_SECRET",
    "RATE_LIMIT_MAX_REQUESTS",
    "RATE_LIMIT_WINDOW_MS",
    "SESSION_TTL_SECS",
];

// --- Setup/Teardown Utilities ---

/// Runs `test` with exactly `vars` set (every other known variable cleared),
/// restoring the previous environment afterwards.
fn run_with_env<T, R>(vars: &[(&str, &str)], test: T) -> R
where
    T: FnOnce() -> R + panic::UnwindSafe,
{
    let originals: Vec<(&str, Option<String>)> =
        VARS.iter().map(|&var| (var, env::var(var).ok())).collect();

    unsafe {
        for var in VARS {
            env::remove_var(var);
        }
        for (key, value) in vars {
            env::set_var(key, value);
        }
    }

    let result = panic::catch_unwind(test);

    unsafe {
        for (key, original) in originals {
            match original {
                Some(value) => env::set_var(key, value),
                None => env::remove_var(key),
            }
        }
    }

    match result {
        Ok(value) => value,
        Err(e) => panic::resume_unwind(e),
    }
}

// --- Tests ---

#[test]
#[serial]
fn test_local_defaults() {
    let config = run_with_env(&[("DATABASE_URL", "postgres://u:p@h/db")], || {
        AppConfig::load()
    })
    .expect("local config should load");

    assert_eq!(config.env, Env::Local);
    assert!(config.s3.is_none());
    assert!(config.smtp.is_none());
    assert!(config.webhook_url.is_none());
    assert!(!config.auth_secret.is_empty());
    assert_eq!(config.rate_limit_max_requests, 5);
    assert_eq!(config.rate_limit_window, Duration::from_secs(60));
    assert_eq!(config.session_ttl, Duration::from_secs(30 * 24 * 60 * 60));
}

#[test]
#[serial]
fn test_database_url_is_required() {
    let result = run_with_env(&[], AppConfig::load);
    assert!(matches!(result, Err(ConfigError::Missing("DATABASE_URL"))));
}

#[test]
#[serial]
fn test_production_requires_auth_secret() {
    let result = run_with_env(
        &[
            ("APP_ENV", "production"),
            ("DATABASE_URL", "postgres://u:p@h/db"),
            ("S3_ACCESS_KEY", "key"),
            ("S3_SECRET_KEY", "secret"),
            ("S3_BUCKET_NAME", "bucket"),
        ],
        AppConfig::load,
    );
    assert!(matches!(result, Err(ConfigError::Missing("AUTH_SECRET"))));
}

#[test]
#[serial]
fn test_production_requires_object_storage() {
    let result = run_with_env(
        &[
            ("APP_ENV", "production"),
            ("DATABASE_URL", "postgres://u:p@h/db"),
            ("AUTH_SECRET", "prod-secret"),
        ],
        AppConfig::load,
    );
    assert!(matches!(result, Err(ConfigError::StorageRequired)));
}

#[test]
#[serial]
fn test_full_production_config() {
    let config = run_with_env(
        &[
            ("APP_ENV", "production"),
            ("DATABASE_URL", "postgres://u:p@h/db"),
            ("AUTH_SECRET", "prod-secret"),
            ("APP_URL", "https://portfolio.example.com/"),
            ("S3_ACCESS_KEY", "key"),
            ("S3_SECRET_KEY", "secret"),
            ("S3_BUCKET_NAME", "media"),
            ("S3_ENDPOINT", "https://s3.example.com"),
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_USER", "mailer"),
            ("SMTP_PASSWORD", "pw"),
            ("SMTP_PORT", "465"),
            ("N8N_WEBHOOK_URL", "https://automation.example.com/hook"),
            ("WEBHOOK_SECRET", "hook-secret"),
            ("RATE_LIMIT_MAX_REQUESTS", "10"),
            ("RATE_LIMIT_WINDOW_MS", "30000"),
        ],
        AppConfig::load,
    )
    .expect("production config should load");

    assert_eq!(config.env, Env::Production);
    assert_eq!(config.app_url, "https://portfolio.example.com");
    let s3 = config.s3.expect("s3 settings");
    assert_eq!(s3.bucket, "media");
    assert_eq!(s3.public_url, "https://s3.example.com/media");
    assert_eq!(config.smtp.expect("smtp settings").port, 465);
    assert_eq!(config.webhook_secret.as_deref(), Some("hook-secret"));
    assert_eq!(config.rate_limit_max_requests, 10);
    assert_eq!(config.rate_limit_window, Duration::from_secs(30));
}

#[test]
#[serial]
fn test_invalid_numbers_are_reported() {
    let result = run_with_env(
        &[
            ("DATABASE_URL", "postgres://u:p@h/db"),
            ("RATE_LIMIT_MAX_REQUESTS", "lots"),
        ],
        AppConfig::load,
    );
    assert!(matches!(
        result,
        Err(ConfigError::Invalid { name: "RATE_LIMIT_MAX_REQUESTS", .. })
    ));
}
