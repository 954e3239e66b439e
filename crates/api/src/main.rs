use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use giftlock_api::background;
use giftlock_api::config::ServerConfig;
use giftlock_api::router::build_app_router;
use giftlock_api::state::AppState;
use giftlock_db::{GiftStore, PgGiftStore};
use giftlock_events::{
    EmailConfig, EmailProvider, EventBus, EventPersistence, NotificationGateway, SmsProvider,
    SmtpEmail, TwilioConfig, TwilioSms,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    init_tracing();

    // --- Configuration ---
    let config = ServerConfig::from_env().expect("Invalid server configuration");
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = giftlock_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    giftlock_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    giftlock_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    let store: Arc<dyn GiftStore> = Arc::new(PgGiftStore::new(pool));

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());
    let persistence_handle = tokio::spawn(EventPersistence::run(
        Arc::clone(&store),
        event_bus.subscribe(),
    ));

    // --- Notification providers ---
    let gateway = Arc::new(NotificationGateway::new(
        sms_provider(),
        email_provider(),
        Arc::clone(&event_bus),
    ));

    // --- App state ---
    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);
    let sweep_interval = Duration::from_secs(config.expiry_sweep_secs.max(1));
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    let state = AppState::new(store, gateway, Arc::clone(&event_bus), config);

    // --- Background jobs ---
    let expiry_cancel = CancellationToken::new();
    let expiry_handle = tokio::spawn(background::gift_expiry::run(
        state.lifecycle.clone(),
        sweep_interval,
        expiry_cancel.clone(),
    ));

    // --- Start server ---
    let app = build_app_router(state);
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    expiry_cancel.cancel();
    let _ = tokio::time::timeout(shutdown_timeout, expiry_handle).await;
    tracing::info!("Gift expiry job stopped");

    // Persistence exits once the last bus handle is dropped and it drains.
    drop(event_bus);
    let _ = tokio::time::timeout(shutdown_timeout, persistence_handle).await;
    tracing::info!("Event persistence shut down");

    tracing::info!("Graceful shutdown complete");
}

/// Install the global subscriber. `LOG_FORMAT=json` selects JSON output.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "giftlock_api=debug,giftlock_lifecycle=debug,giftlock_events=info,tower_http=debug".into()
    });

    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn sms_provider() -> Option<Arc<dyn SmsProvider>> {
    let Some(config) = TwilioConfig::from_env() else {
        tracing::warn!("TWILIO_* not configured, SMS delivery disabled");
        return None;
    };
    match TwilioSms::new(config) {
        Ok(sms) => {
            tracing::info!("SMS provider configured");
            Some(Arc::new(sms))
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to build SMS provider, SMS delivery disabled");
            None
        }
    }
}

fn email_provider() -> Option<Arc<dyn EmailProvider>> {
    let Some(config) = EmailConfig::from_env() else {
        tracing::warn!("SMTP_HOST not configured, email delivery disabled");
        return None;
    };
    match SmtpEmail::new(config) {
        Ok(email) => {
            tracing::info!("Email provider configured");
            Some(Arc::new(email))
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to build email provider, email delivery disabled");
            None
        }
    }
}

/// Wait for SIGINT or SIGTERM to initiate graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
