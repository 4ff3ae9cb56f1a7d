use std::{process, sync::Arc, time::Duration};

use ecodash::{
    application::{
        crypto::CryptoService,
        dataset::{self, DatasetService},
        error::AppError,
        files::FileBrowser,
        worldbank::WorldBankService,
    },
    config,
    infra::{
        error::InfraError,
        http::{self, AppState},
        providers::{coingecko::CoinGeckoClient, worldbank::WorldBankClient},
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Generate(_) => run_generate(settings),
    }
}

fn run_generate(settings: config::Settings) -> Result<(), AppError> {
    let data = &settings.data;
    let counts = dataset::generate_to(
        &data.directory,
        data.days.get(),
        data.records_per_day.get(),
        data.seed,
    )?;
    info!(
        target = "ecodash::generate",
        directory = %data.directory.display(),
        sales = counts.sales,
        inventory = counts.inventory,
        profit = counts.profit,
        trends = counts.trends,
        "Dataset written"
    );
    Ok(())
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let state = build_state(&settings)?;
    serve_http(&settings, state).await
}

fn build_state(settings: &config::Settings) -> Result<AppState, AppError> {
    let dataset = Arc::new(DatasetService::init(
        settings.data.directory.clone(),
        settings.data.days.get(),
        settings.data.records_per_day.get(),
        settings.data.seed,
    )?);
    let files = Arc::new(FileBrowser::new(settings.data.directory.clone()));

    let crypto = Arc::new(CryptoService::new(
        Arc::new(CoinGeckoClient::new(
            settings.providers.coingecko_base_url.clone(),
        )),
        settings.fetch.crypto.clone(),
    ));
    let worldbank = Arc::new(WorldBankService::new(
        Arc::new(WorldBankClient::new(
            settings.providers.worldbank_base_url.clone(),
        )),
        settings.fetch.worldbank.clone(),
    ));

    let rate_limiter = http::rate_limit::ApiRateLimiter::new(
        Duration::from_secs(settings.api_rate_limit.window_seconds.get().into()),
        settings.api_rate_limit.max_requests.get(),
    );

    Ok(AppState {
        dataset,
        files,
        crypto,
        worldbank,
        rate_limiter,
    })
}

async fn serve_http(settings: &config::Settings, state: AppState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "ecodash::server",
        addr = %settings.server.addr,
        "Listening"
    );

    let grace = settings.server.graceful_shutdown;
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal(grace))
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    info!(target = "ecodash::server", "Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C. Once the signal lands, a watchdog bounds the drain
/// window so a wedged connection cannot hold the process open.
async fn shutdown_signal(grace: Duration) {
    if let Err(error) = tokio::signal::ctrl_c().await {
        error!(%error, "failed to listen for shutdown signal");
        return;
    }

    info!(
        target = "ecodash::server",
        grace_seconds = grace.as_secs(),
        "Shutdown signal received; draining connections"
    );
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        warn!(
            target = "ecodash::server",
            "Drain window elapsed; exiting"
        );
        process::exit(0);
    });
}
