use std::sync::Arc;

use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use wellness_core::auth::{AuthRouteState, AuthStore, auth_routes};
use wellness_core::cli::{self, HELP};
use wellness_core::config::AppConfig;
use wellness_core::onboarding::{OnboardingManager, OnboardingRouteState, onboarding_routes};
use wellness_core::preferences::{PreferencesRouteState, PreferencesStore, preferences_routes};
use wellness_core::store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_tracing(&config);

    eprintln!("🏃 Wellness core v{}", env!("CARGO_PKG_VERSION"));

    // ── Stores ───────────────────────────────────────────────────────────
    if config.in_memory {
        eprintln!("   Stores: in-memory");
    } else {
        eprintln!("   Stores: {}", config.db_path.display());
    }
    let stores = store::open(&config).await?;

    // ── State ────────────────────────────────────────────────────────────
    let auth = Arc::new(AuthStore::rehydrate(Arc::clone(&stores.secure)).await);
    let onboarding = Arc::new(OnboardingManager::rehydrate(stores.clone(), Arc::clone(&auth)).await);
    let preferences = PreferencesStore::new(Arc::clone(&stores.general));

    // ── HTTP ─────────────────────────────────────────────────────────────
    let app = onboarding_routes(OnboardingRouteState {
        manager: Arc::clone(&onboarding),
    })
    .merge(preferences_routes(PreferencesRouteState {
        store: Arc::clone(&preferences),
    }))
    .merge(auth_routes(AuthRouteState {
        auth: Arc::clone(&auth),
    }))
    .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.http_port);
    let listener = TcpListener::bind(&addr).await?;
    eprintln!("   API: http://{}/api/onboarding/status", addr);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("HTTP server stopped: {}", e);
        }
    });

    preferences.wait_hydrated().await;
    if onboarding.is_onboarded().await {
        eprintln!("   Onboarding already completed.");
    }
    eprintln!("{HELP}\n");

    cli::run_repl(onboarding, preferences).await;
    Ok(())
}

fn init_tracing(config: &AppConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "wellness.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter())
                .with(stderr)
                .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(filter()).with(stderr).init();
            None
        }
    }
}
