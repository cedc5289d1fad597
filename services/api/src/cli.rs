use crate::infra::open_repository;
use crate::server;
use clap::{Args, Parser, Subcommand};
use hr_portal::config::AppConfig;
use hr_portal::error::AppError;
use hr_portal::hiring::seed_admin;
use hr_portal::telemetry;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "hr-portal",
    about = "Serve the HR job portal and run its maintenance tasks",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Create the database file if needed and apply pending migrations
    InitDb,
    /// Add an admin account unless one with the same email exists
    CreateAdmin(CreateAdminArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
pub(crate) struct CreateAdminArgs {
    #[arg(long)]
    pub(crate) email: String,
    #[arg(long)]
    pub(crate) password: String,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::InitDb => init_db().await,
        Command::CreateAdmin(args) => create_admin(args).await,
    }
}

async fn init_db() -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    open_repository(&config).await?;
    info!(url = %config.database.url, "database initialized");
    Ok(())
}

async fn create_admin(args: CreateAdminArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    let repository = open_repository(&config).await?;

    if seed_admin(&repository, &args.email, &args.password).await? {
        println!("created admin {}", args.email.trim());
    } else {
        println!("admin {} already exists", args.email.trim());
    }
    Ok(())
}
