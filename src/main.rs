//! Membership billing server.
//!
//! Loads configuration, initializes logging, connects the ledger, and serves
//! the billing router until Ctrl+C or SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use http::{header, HeaderValue, Method};
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use membership_billing::adapters::http::{billing_router, BillingAppState};
use membership_billing::adapters::pagarme::{MockPaymentGateway, PagarmeConfig, PagarmeGateway};
use membership_billing::adapters::postgres::{PostgresLedger, PostgresPlanCatalog};
use membership_billing::adapters::storage::{InMemoryLedger, InMemoryPlanCatalog};
use membership_billing::config::{AppConfig, ConfigError, PaymentProviderKind, ServerConfig};
use membership_billing::domain::billing::Plan;
use membership_billing::domain::foundation::PlanId;
use membership_billing::ports::{
    GatewayError, LedgerReader, LedgerRepository, PaymentGateway, PlanCatalog,
};

#[derive(Debug, Error)]
enum StartupError {
    #[error("Failed to load configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid configuration: {0}")]
    Validation(#[from] membership_billing::config::ValidationError),

    #[error("Database connection failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Payment gateway setup failed: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

struct Ledger {
    repository: Arc<dyn LedgerRepository>,
    reader: Arc<dyn LedgerReader>,
    plans: Arc<dyn PlanCatalog>,
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    let config = AppConfig::load()?;
    init_tracing(&config.server);

    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "Invalid configuration");
        return Err(e.into());
    }

    tracing::info!(
        environment = ?config.server.environment,
        provider = ?config.payment.provider,
        monotonic_payment_status = config.features.monotonic_payment_status,
        "Starting membership billing"
    );

    let ledger = connect_ledger(&config).await?;
    let payment_gateway = build_gateway(&config)?;

    let state = BillingAppState {
        ledger_repository: ledger.repository,
        ledger_reader: ledger.reader,
        plan_catalog: ledger.plans,
        payment_gateway,
        transition_policy: config.transition_policy(),
        provider_timeout: config.payment.timeout(),
        verbose_errors: config.features.verbose_errors,
    };

    let app = with_layers(billing_router().with_state(state), &config.server);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Server ready and accepting connections");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// JSON output in production, human-readable otherwise. `RUST_LOG` wins over
/// the configured level.
fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(server.log_level.as_str()));

    if server.is_production() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn connect_ledger(config: &AppConfig) -> Result<Ledger, StartupError> {
    let Some(url) = config.database.url() else {
        tracing::warn!("No database configured, using in-memory ledger");
        let ledger = Arc::new(InMemoryLedger::new());
        let plan = Plan {
            id: PlanId::new(),
            name: "Monthly".to_string(),
            price_cents: 4990,
            billing_period_days: 30,
            active: true,
        };
        tracing::info!(plan_id = %plan.id, "Seeded in-memory plan catalog");
        return Ok(Ledger {
            repository: ledger.clone(),
            reader: ledger,
            plans: Arc::new(InMemoryPlanCatalog::with_plans([plan])),
        });
    };

    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .max_lifetime(config.database.max_lifetime())
        .connect(url)
        .await?;

    if config.database.run_migrations {
        sqlx::migrate!().run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    let ledger = Arc::new(
        PostgresLedger::new(pool.clone()).with_lock_timeout_ms(config.database.lock_timeout_ms),
    );
    Ok(Ledger {
        repository: ledger.clone(),
        reader: ledger,
        plans: Arc::new(PostgresPlanCatalog::new(pool)),
    })
}

fn build_gateway(config: &AppConfig) -> Result<Arc<dyn PaymentGateway>, StartupError> {
    match config.payment.provider {
        PaymentProviderKind::Mock => {
            tracing::warn!("Using mock payment gateway");
            Ok(Arc::new(MockPaymentGateway::new()))
        }
        PaymentProviderKind::Pagarme => {
            let pagarme = PagarmeConfig::from_payment_config(&config.payment).ok_or(
                membership_billing::config::ValidationError::MissingRequired("PAYMENT__API_KEY"),
            )?;
            if config.payment.is_test_mode() {
                tracing::info!("Pagar.me gateway running with a test key");
            }
            Ok(Arc::new(PagarmeGateway::new(pagarme)?))
        }
    }
}

fn with_layers(router: Router, server: &ServerConfig) -> Router {
    let origins = server.cors_origins_list();
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::HeaderName::from_static("x-user-id")]);
    let cors = if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| HeaderValue::from_str(origin).ok())
            .collect();
        cors.allow_origin(AllowOrigin::list(parsed))
    };

    router
        .layer(TimeoutLayer::new(Duration::from_secs(
            server.request_timeout_secs,
        )))
        .layer(cors)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        _ = terminate => tracing::info!("Received terminate signal"),
    }

    tracing::info!("Shutting down gracefully...");
}
