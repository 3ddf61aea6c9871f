use clap::Parser;
use iban_issuer::application::orchestrator::VerificationOrchestrator;
use iban_issuer::config::Config;
use iban_issuer::infrastructure::cm_gateway::CmIbanChecker;
use iban_issuer::infrastructure::create_token_store;
use iban_issuer::infrastructure::jwt::IrmaJwtCreator;
use iban_issuer::interfaces::http::{AppState, create_router};
use iban_issuer::logging::{self, LogFormat};
use miette::{IntoDiagnostic, Result, WrapErr};
use std::path::PathBuf;
use tokio::signal;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path for the config.json to use
    #[arg(long, env = "IBAN_ISSUER_CONFIG")]
    config: PathBuf,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init_logging(logging::DEFAULT_FILTER, cli.log_format, cli.log_file.as_deref())
        .into_diagnostic()
        .wrap_err("failed to initialize logging")?;

    tracing::info!(config = %cli.config.display(), "using config");
    let config = Config::load(&cli.config)
        .into_diagnostic()
        .wrap_err("failed to read config file")?;

    let jwt_creator = IrmaJwtCreator::from_key_file(
        &config.jwt_private_key_path,
        config.issuer_id.clone(),
        config.full_credential.clone(),
    )
    .into_diagnostic()
    .wrap_err("failed to instantiate jwt creator")?;

    let iban_checker = CmIbanChecker::new(&config.cm_iban_config)
        .into_diagnostic()
        .wrap_err("failed to instantiate iban checker")?;

    let token_store = create_token_store(&config)
        .await
        .into_diagnostic()
        .wrap_err("failed to instantiate token storage")?;

    let orchestrator = VerificationOrchestrator::new(
        token_store,
        Box::new(iban_checker),
        Box::new(jwt_creator),
    );
    let router = create_router(
        AppState::new(orchestrator),
        config.server_config.static_dir.as_deref(),
    );

    let addr = format!("{}:{}", config.server_config.host, config.server_config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to bind {}", addr))?;
    tracing::info!("hosting on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .into_diagnostic()?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
