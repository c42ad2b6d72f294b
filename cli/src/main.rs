//! Command-line front end for the auth API client.
//!
//! Tokens live only in the process, so `session` runs a whole
//! login → profile → refresh → audit log → logout sequence in one go.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use jwtauth_core::{
    ClientConfig, ComparisonResponse, Credentials, HealthStatus, Mode, RegisterRequest,
    SessionClient,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jwtauth")]
#[command(version)]
#[command(about = "Client for the JWT auth API (SQL and Redis backends)")]
struct Cli {
    /// API base URL (overrides JWTAUTH_BASE_URL)
    #[arg(long, value_name = "URL", global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check server and backend health
    Health,
    /// Create a new account
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Log in and print the issued tokens
    Login {
        #[command(flatten)]
        login: LoginArgs,
    },
    /// Log in, fetch profile, refresh, read the audit log, then log out
    Session {
        #[command(flatten)]
        login: LoginArgs,

        /// Close every session of the user instead of just this one
        #[arg(long)]
        all: bool,
    },
    /// Time a login against both backends
    Compare {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
}

#[derive(Args)]
struct LoginArgs {
    #[arg(long)]
    username: String,
    #[arg(long)]
    password: String,

    /// Backend to authenticate against (sql or redis)
    #[arg(long, default_value = "sql")]
    backend: Mode,
}

impl LoginArgs {
    fn credentials(&self) -> Credentials {
        Credentials::new(&self.username, &self.password)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = ClientConfig::from_env();
    if let Some(url) = cli.base_url {
        config.base_url = url;
    }
    debug!(base_url = %config.base_url, "resolved API base URL");
    let client = SessionClient::from_config(&config).context("failed to build HTTP client")?;

    match cli.command {
        Command::Health => {
            let health = client.check_health().await?;
            print_health(&health);
        }
        Command::Register {
            username,
            email,
            password,
        } => {
            let message = client
                .register(&RegisterRequest {
                    username,
                    email,
                    password,
                })
                .await?;
            println!("{message}");
        }
        Command::Login { login } => {
            let response = client.login(&login.credentials(), login.backend).await?;
            println!("{} (backend: {})", response.message, login.backend);
            println!("user:          {} <{}>", response.user.username, response.user.email);
            println!("access token:  {}", response.access_token);
            println!("refresh token: {}", response.refresh_token);
            if let Some(ms) = response.response_time_ms {
                println!("response time: {ms:.2} ms");
            }
        }
        Command::Session { login, all } => run_session(&client, &login, all).await?,
        Command::Compare { username, password } => {
            let result = client
                .compare_performance(&Credentials::new(&username, &password))
                .await?;
            print_comparison(&result);
        }
    }
    Ok(())
}

async fn run_session(client: &SessionClient, login: &LoginArgs, all: bool) -> Result<()> {
    let mode = login.backend;

    let response = client.login(&login.credentials(), mode).await?;
    println!("login:   {}", response.message);

    let user = client.get_profile().await?;
    println!("profile: #{} {} <{}> active={}", user.id, user.username, user.email, user.is_active);

    let refreshed = client.refresh(mode).await?;
    println!("refresh: {}", refreshed.message);

    let log = client.audit_log(mode, Some(10)).await?;
    println!("audit log ({} entries):", log.entries.len());
    for entry in &log.entries {
        println!(
            "  {:<8} {}",
            entry.action,
            entry.created_at.as_deref().unwrap_or("-")
        );
    }

    let message = if all {
        client.logout_all(mode).await?
    } else {
        client.logout(mode).await?
    };
    println!("logout:  {message}");
    Ok(())
}

fn print_health(health: &HealthStatus) {
    println!("status:   {}", health.status);
    if !health.database.is_empty() {
        println!("database: {}", health.database);
    }
    if !health.redis.is_empty() {
        println!("redis:    {}", health.redis);
    }
    if let Some(error) = &health.error {
        println!("error:    {error}");
    }
}

fn print_comparison(result: &ComparisonResponse) {
    println!("user: {}", result.user.username);
    for mode in Mode::ALL {
        let key = mode.comparison_key();
        match result.comparison.get(key) {
            Some(r) if r.success => println!("  {key:<6} {:.2} ms", r.response_time_ms),
            Some(r) => println!("  {key:<6} failed: {}", r.error.as_deref().unwrap_or("unknown error")),
            None => println!("  {key:<6} no result"),
        }
    }
    if let Some(analysis) = &result.performance_analysis {
        println!(
            "faster: {} by {:.2} ms ({:.1}%)",
            analysis.faster_system,
            analysis.time_difference_ms.abs(),
            analysis.percentage_difference.abs()
        );
        if !analysis.advantage_note.is_empty() {
            println!("{}", analysis.advantage_note);
        }
    }
}
