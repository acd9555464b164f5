//! survey-web - questionnaire web service
//!
//! Serves the questionnaire pages, or with `add-user` registers an account
//! from the command line and exits.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use survey_common::config::{
    config_file_path, CompiledDefaults, RootFolderInitializer, RootFolderResolver, TomlConfig,
};
use survey_common::db::{create_user, init_database, NewUser};
use survey_common::store::QuestionnaireStore;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use survey_web::{build_router, AppState};

const MODULE_NAME: &str = "survey-web";

/// Command-line arguments for survey-web
#[derive(Parser, Debug)]
#[command(name = "survey-web")]
#[command(about = "Questionnaire web service")]
#[command(version)]
struct Args {
    /// Folder holding survey.db, questionnaire/ and results/
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "SURVEY_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(short, long, env = "SURVEY_BIND")]
    bind: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a user account
    AddUser {
        #[arg(long)]
        email: String,

        #[arg(long)]
        first_name: String,

        #[arg(long)]
        password: String,

        /// Grant access to the administration pages
        #[arg(long)]
        admin: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let toml_config = TomlConfig::load_or_default(MODULE_NAME);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{},tower_http=info", toml_config.logging.level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting survey-web v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("SURVEY_REVISION"),
        env!("SURVEY_BUILT_AT"),
        env!("SURVEY_PROFILE")
    );
    if let Some(path) = config_file_path(MODULE_NAME) {
        info!("Configuration file: {}", path.display());
    }

    let root_folder = RootFolderResolver::new(MODULE_NAME)
        .with_cli_arg(args.root_folder.clone())
        .with_toml(toml_config.clone())
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer.ensure_directory_exists()?;
    info!("Root folder: {}", initializer.root().display());

    let db_path = initializer.database_path();
    if !initializer.database_exists() {
        info!("Creating new database: {}", db_path.display());
    }
    let pool = match init_database(&db_path).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to open database {}: {}", db_path.display(), e);
            return Err(e.into());
        }
    };

    if let Some(Command::AddUser {
        email,
        first_name,
        password,
        admin,
    }) = args.command
    {
        let user = create_user(
            &pool,
            &NewUser {
                email,
                first_name,
                password,
                is_admin: admin,
            },
        )
        .await
        .context("Failed to create user")?;
        info!("Created user {} <{}> (admin: {})", user.id, user.email, user.is_admin);
        return Ok(());
    }

    let store = QuestionnaireStore::new(initializer.root());
    store.ensure_dirs()?;

    let state = AppState::new(pool, store).context("Failed to load page templates")?;
    let app = build_router(state);

    let defaults = CompiledDefaults::for_current_platform();
    let bind = args.bind.or(toml_config.bind).unwrap_or(defaults.bind);
    let port = args.port.or(toml_config.port).unwrap_or(defaults.port);
    let addr = format!("{}:{}", bind, port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("survey-web listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
