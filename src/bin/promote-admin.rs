//! promote-admin
//!
//! Grants the admin role to an existing user, looked up by email or id.

use clap::Parser;
use dialoguer::Input;
use portfolio_cms::{
    models::{Role, UserLookup},
    repository::{PostgresRepository, Repository},
};
use sqlx::postgres::PgPoolOptions;

#[derive(Parser, Debug)]
#[command(name = "promote-admin")]
#[command(about = "Grants the admin role to an existing user", long_about = None)]
struct Args {
    /// Email address or user id. Prompted for when omitted.
    #[arg(value_name = "EMAIL|USER_ID")]
    target: Option<String>,

    /// Database connection string
    #[arg(long, env = "DATABASE_URL", value_name = "DATABASE_URL")]
    database_url: String,
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let target = match args.target {
        Some(target) => target,
        None => Input::<String>::new()
            .with_prompt("Email or user id to promote")
            .validate_with(|input: &String| -> Result<(), &str> {
                if input.trim().is_empty() {
                    Err("A value is required")
                } else {
                    Ok(())
                }
            })
            .interact_text()
            .unwrap_or_else(|e| {
                eprintln!("Could not read input: {}", e);
                std::process::exit(1);
            }),
    };
    if target.trim().is_empty() {
        eprintln!("Usage: promote-admin <EMAIL|USER_ID>");
        std::process::exit(1);
    }

    let pool = match PgPoolOptions::new()
        .max_connections(1)
        .connect(&args.database_url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("Error connecting to database: {}", e);
            std::process::exit(1);
        }
    };
    let repo = PostgresRepository::new(pool);

    let lookup = UserLookup::parse(&target);
    match repo.set_user_role(&lookup, Role::Admin).await {
        Ok(Some(user)) => {
            println!("\nPromoted : {} <{}>", user.name, user.email);
            println!("Id       : {}", user.id);
            println!("Role     : {}\n", user.role);
            println!("# The user must refresh their session (POST /api/auth/session) or sign in again.");
        }
        Ok(None) => {
            eprintln!("No user found for {:?}", lookup);
            std::process::exit(2);
        }
        Err(e) => {
            eprintln!("Error updating role: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parses_target_and_database() {
        let args = Args::try_parse_from([
            "promote-admin",
            "owner@example.com",
            "--database-url",
            "postgres://localhost/portfolio",
        ])
        .unwrap();
        assert_eq!(args.target.as_deref(), Some("owner@example.com"));
        assert_eq!(args.database_url, "postgres://localhost/portfolio");

        let prompted = Args::try_parse_from([
            "promote-admin",
            "--database-url",
            "postgres://localhost/portfolio",
        ])
        .unwrap();
        assert!(prompted.target.is_none());
    }
}
