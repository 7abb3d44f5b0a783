//! CrickNet CLI
//!
//! Thin wrapper around `cricknet_lib` for command-line usage. Output is
//! pretty-printed JSON.
//!
//! ## Usage
//!
//! ```bash
//! cricknet signin --email virat@example.com     # password read from stdin
//! cricknet whoami
//! cricknet profiles
//! cricknet profiles --activate p1
//! cricknet create-profile --draft academy.json
//! cricknet search profiles "indoor nets" --type venue
//! cricknet status
//! cricknet signout
//! ```

use std::io::BufRead;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use cricknet_lib::backend::SearchQuery;
use cricknet_lib::config::{config_path, load_config_from};
use cricknet_lib::error::ErrorReport;
use cricknet_lib::forms::ProfileDraft;
use cricknet_lib::{ClientContext, ProfileType};

/// CrickNet - cricket community client
#[derive(Parser)]
#[command(name = "cricknet")]
#[command(version)]
#[command(about = "CrickNet - cricket community client")]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file (default: ~/.cricknet/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with email and password
    Signin {
        #[arg(short, long)]
        email: String,
        /// Password (read from stdin when omitted)
        #[arg(short, long, env = "CRICKNET_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Create an account and sign in
    Signup {
        #[arg(short, long)]
        email: String,
        #[arg(short, long, env = "CRICKNET_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Sign out and forget the cached session
    Signout,

    /// Send a password reset email
    ResetPassword {
        #[arg(short, long)]
        email: String,
    },

    /// Show the signed-in principal and its backend record
    Whoami,

    /// List profiles, optionally switching the active one
    Profiles {
        /// Profile id to make active
        #[arg(long)]
        activate: Option<String>,
    },

    /// Create a page profile from a JSON draft (tagged with "page_type")
    CreateProfile {
        #[arg(long)]
        draft: PathBuf,
    },

    /// Full-text search
    Search {
        target: SearchTarget,
        query: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        per_page: u32,
        /// Restrict profile search to one type
        #[arg(long = "type")]
        profile_type: Option<ProfileType>,
    },

    /// Session and connectivity status
    Status,
}

#[derive(Clone, Copy, ValueEnum)]
enum SearchTarget {
    Profiles,
    Posts,
}

fn setup_logging(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format_timestamp(None)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_password(given: Option<String>) -> Result<String> {
    if let Some(password) = given {
        return Ok(password);
    }
    eprint!("Password: ");
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Print a UI-style error report and exit non-zero.
fn fail(report: ErrorReport) -> Result<()> {
    print_json(&report)?;
    std::process::exit(1);
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let path = match cli.config {
        Some(path) => path,
        None => config_path()?,
    };
    let mut config = load_config_from(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    config.apply_overrides(|key| std::env::var(key).ok());

    let ctx = ClientContext::new(config)?;

    match cli.command {
        Commands::Signin { email, password } => {
            let password = read_password(password)?;
            match ctx.sign_in(&email, &password).await {
                Ok(start) => print_json(&start)?,
                Err(e) => fail(ErrorReport::from(&e))?,
            }
        }

        Commands::Signup { email, password } => {
            let password = read_password(password)?;
            match ctx.sign_up(&email, &password).await {
                Ok(start) => print_json(&start)?,
                Err(e) => fail(ErrorReport::from(&e))?,
            }
        }

        Commands::Signout => {
            ctx.sign_out().await;
            print_json(&serde_json::json!({ "signedOut": true }))?;
        }

        Commands::ResetPassword { email } => match ctx.session.send_password_reset(&email).await {
            Ok(()) => print_json(&serde_json::json!({ "sent": true, "email": email }))?,
            Err(e) => fail(ErrorReport::from(&e))?,
        },

        Commands::Whoami => {
            let Some(principal) = ctx.session.resolve().await else {
                print_json(&serde_json::Value::Null)?;
                return Ok(());
            };
            let backend_user = match ctx.sync.current_user().await {
                Ok(user) => Some(user),
                Err(e) => {
                    log::warn!("Backend user unavailable: {}", e);
                    None
                }
            };
            print_json(&serde_json::json!({
                "principal": principal,
                "backendUser": backend_user,
            }))?;
        }

        Commands::Profiles { activate } => {
            if ctx.resume().await.is_none() {
                anyhow::bail!("Not signed in. Run `cricknet signin` first.");
            }
            if let Some(id) = activate {
                if let Err(e) = ctx.profiles.set_active(&id) {
                    fail(ErrorReport::from(&e))?;
                }
            }
            let profiles: Vec<_> = ctx
                .profiles
                .profiles()
                .into_iter()
                .map(|p| {
                    let color = p.color_token();
                    serde_json::json!({ "profile": p, "color": color })
                })
                .collect();
            print_json(&profiles)?;
        }

        Commands::CreateProfile { draft } => {
            let content = std::fs::read_to_string(&draft)
                .with_context(|| format!("Failed to read {}", draft.display()))?;
            let draft: ProfileDraft =
                serde_json::from_str(&content).context("Draft is not a valid profile draft")?;
            if ctx.session.resolve().await.is_none() {
                anyhow::bail!("Not signed in. Run `cricknet signin` first.");
            }
            match ctx.profiles.create_profile(draft).await {
                Ok(profile) => print_json(&profile)?,
                Err(e) => fail(ErrorReport::from(&e))?,
            }
        }

        Commands::Search {
            target,
            query,
            page,
            per_page,
            profile_type,
        } => {
            let mut query = SearchQuery::new(query).page(page).per_page(per_page);
            if let Some(profile_type) = profile_type {
                query = query.of_type(profile_type);
            }
            match target {
                SearchTarget::Profiles => {
                    let response = ctx.search.search_profiles(&query).await?;
                    print_json(&serde_json::json!({
                        "results": response.results,
                        "pagination": response.pagination,
                    }))?;
                }
                SearchTarget::Posts => {
                    let response = ctx.search.search_posts(&query).await?;
                    print_json(&serde_json::json!({
                        "results": response.results,
                        "pagination": response.pagination,
                    }))?;
                }
            }
        }

        Commands::Status => {
            let principal = ctx.session.resolve().await;
            let connectivity = ctx.connectivity.probe_once().await;
            print_json(&serde_json::json!({
                "apiBaseUrl": ctx.config.api_base_url,
                "principal": principal,
                "connectivity": connectivity,
            }))?;
        }
    }

    Ok(())
}
