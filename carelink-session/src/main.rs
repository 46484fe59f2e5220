//! carelink-session - drive the session bridge from the command line
//!
//! State lives in `<data_dir>/session.json`.

use anyhow::{Context, Result};
use carelink_common::config::ConfigResolver;
use carelink_common::logging::init_tracing;
use carelink_common::Role;
use carelink_session::store::FileSessionStore;
use carelink_session::{build_bridge, CallbackParams, Route, SESSION_FILE};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "carelink-session")]
#[command(about = "Sign-up, sign-in and onboarding state for CareLink")]
#[command(version)]
struct Args {
    /// Bootstrap configuration file
    #[arg(short, long, env = "CARELINK_CONFIG")]
    config: Option<PathBuf>,

    /// Session file; overrides `<data_dir>/session.json`
    #[arg(long)]
    session_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an account
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Sign in
    Signin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Show the current user, state and next route
    Status,
    /// Choose Parent or Provider
    Role { role: Role },
    /// Redeem a verification token
    Verify { token: String },
    /// Request a password reset token
    Forgot {
        #[arg(long)]
        email: String,
    },
    /// Set a new password with a reset token
    Reset {
        #[arg(long)]
        token: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm: String,
    },
    /// Complete an auth redirect
    Callback {
        #[arg(long)]
        code: Option<String>,
        #[arg(long)]
        code_verifier: Option<String>,
    },
    /// Submit the parent contact profile (JSON object)
    Profile { json: String },
    /// Submit the children list (JSON array)
    Children { json: String },
    /// Submit a provider onboarding step (JSON object)
    Provider { json: String },
    /// Sign out
    Logout,
}

fn parse_json(raw: &str) -> Result<Value> {
    serde_json::from_str(raw).context("Argument is not valid JSON")
}

fn print_route(route: Route) {
    println!("next: {}", route.path());
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let resolved = ConfigResolver::new("session").with_path(args.config).resolve();
    init_tracing(&resolved.config.logging.level);
    info!("carelink-session v{}", env!("CARGO_PKG_VERSION"));
    resolved.log_source();
    let config = resolved.config;

    let session_file = args
        .session_file
        .unwrap_or_else(|| config.data_dir().join(SESSION_FILE));
    let store = Arc::new(FileSessionStore::new(&session_file));
    let bridge = build_bridge(&config, store).context("Failed to set up session bridge")?;

    match args.command {
        Command::Signup { email, password } => {
            let outcome = bridge.sign_up(&email, &password).await?;
            println!("signed up: {} (verified: {})", email, outcome.verified);
            match outcome.verify_token {
                Some(token) => println!("verify token: {}", token),
                None => println!("check {} for a confirmation link", email),
            }
        }
        Command::Signin { email, password } => {
            print_route(bridge.sign_in(&email, &password).await?);
        }
        Command::Status => {
            let state = bridge.sync_remote_session().await?;
            let user = bridge.mirror().current_user()?;
            println!("user: {}", user.as_deref().unwrap_or("-"));
            println!("state: {}", state.as_str());
            print_route(bridge.next_route()?);
        }
        Command::Role { role } => print_route(bridge.select_role(role)?),
        Command::Verify { token } => print_route(bridge.verify_email(&token)?),
        Command::Forgot { email } => {
            let token = bridge.forgot_password(&email)?;
            println!("reset token: {}", token);
        }
        Command::Reset {
            token,
            password,
            confirm,
        } => {
            bridge.reset_password(&token, &password, &confirm)?;
            println!("password updated");
            print_route(Route::Login);
        }
        Command::Callback {
            code,
            code_verifier,
        } => {
            let params = CallbackParams {
                code,
                code_verifier,
            };
            print_route(bridge.handle_callback(&params).await?);
        }
        Command::Profile { json } => {
            print_route(bridge.submit_parent_profile(parse_json(&json)?).await?);
        }
        Command::Children { json } => {
            let children = match parse_json(&json)? {
                Value::Array(items) => items,
                _ => anyhow::bail!("children must be a JSON array"),
            };
            print_route(bridge.submit_children(children).await?);
        }
        Command::Provider { json } => {
            print_route(bridge.submit_provider_profile(parse_json(&json)?).await?);
        }
        Command::Logout => {
            bridge.logout().await?;
            println!("signed out");
        }
    }

    Ok(())
}
