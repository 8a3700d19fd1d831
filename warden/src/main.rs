use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use warden::{AuthConfig, NewUser, Role, UserId, UserStatus, WardenBuilder};

/// Operator command line interface for Warden
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database connection string
    #[arg(long, env = "WARDEN_DATABASE_URL", default_value = "sqlite://warden.db")]
    database_url: String,

    /// JSON file with an authentication configuration (camelCase keys)
    #[arg(long, env = "WARDEN_CONFIG")]
    config: Option<PathBuf>,

    /// Minutes an issued reset token stays redeemable
    #[arg(long, env = "WARDEN_RESET_TOKEN_TTL_MINUTES")]
    reset_token_ttl_minutes: Option<i64>,

    /// Command to execute
    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Create an account and print a reset token its owner can use to set a password
    CreateUser {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: Option<String>,
        /// Display name, defaults to the username
        #[arg(long)]
        name: Option<String>,
        /// Make the new account an administrator
        #[arg(long)]
        admin: bool,
        /// Administrator issuing the initial reset token. A new administrator
        /// issues its own.
        #[arg(long, required_unless_present = "admin")]
        admin_id: Option<String>,
    },
    /// Issue a password reset token for an existing user
    IssueResetToken {
        #[arg(long)]
        admin_id: String,
        /// Target user id
        #[arg(long)]
        user: String,
    },
    /// Change the administrative status of an account
    SetStatus {
        #[arg(long)]
        user: String,
        /// ACTIVE, DISABLED or LOCKED
        #[arg(long)]
        status: UserStatus,
    },
    /// Print version information
    Version,
}

fn load_config(cli: &Cli) -> Result<AuthConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => AuthConfig::default(),
    };
    if let Some(minutes) = cli.reset_token_ttl_minutes {
        config = config.with_reset_token_ttl_minutes(minutes);
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warden=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if matches!(cli.command, Commands::Version) {
        println!("Warden v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = load_config(&cli)?;
    let warden = WardenBuilder::new()
        .with_sqlite(&cli.database_url)
        .await?
        .with_config(config)
        .apply_migrations(true)
        .build()
        .await?;

    match cli.command {
        Commands::Migrate => {
            println!("Migrations applied to {}", cli.database_url);
        }
        Commands::CreateUser {
            username,
            email,
            name,
            admin,
            admin_id,
        } => {
            let mut builder = NewUser::builder()
                .username(username)
                .email(email)
                .role(if admin { Role::Admin } else { Role::User });
            if let Some(name) = name {
                builder = builder.name(name);
            }
            let user = warden.create_user(builder.build()?).await?;

            let issuer = admin_id
                .map(UserId::from)
                .unwrap_or_else(|| user.id.clone());
            let issued = warden.issue_password_reset(&issuer, &user.id).await?;

            println!("user id:     {}", user.id);
            println!("reset token: {}", issued.raw_token);
            println!("expires at:  {}", issued.expires_at);
        }
        Commands::IssueResetToken { admin_id, user } => {
            let issued = warden
                .issue_password_reset(&UserId::from(admin_id), &UserId::from(user))
                .await?;

            println!("reset token: {}", issued.raw_token);
            println!("expires at:  {}", issued.expires_at);
        }
        Commands::SetStatus { user, status } => {
            let user = warden.set_user_status(&UserId::from(user), status).await?;
            println!("{} is now {}", user.id, user.status);
        }
        Commands::Version => {}
    }

    Ok(())
}
