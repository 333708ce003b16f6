#[tokio::main]
async fn main() {
    use copper_sparrow_flow::{EngineConfig, FlowEngine, NodeDispatcher};
    use copper_sparrow_server::config::ServerConfig;
    use copper_sparrow_server::db::{
        PgChannelDirectory, PgExecutionStore, PgGraphStore, PgMessageRecorder,
    };
    use copper_sparrow_server::{InboundConsumer, RelayGateway, TimerSweeper};
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;
    use std::time::Duration;
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().expect("failed to load configuration");
    tracing::info!("Loaded configuration");

    // Create database connection pool
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("failed to run migrations");

    // Connect to NATS
    let nats = async_nats::connect(&config.nats.url)
        .await
        .expect("failed to connect to NATS");
    tracing::info!(url = %config.nats.url, "Connected to NATS");

    let http = reqwest::Client::new();
    let gateway = Arc::new(RelayGateway::new(
        http.clone(),
        config.relay.base_url.clone(),
        Duration::from_secs(config.relay.timeout_seconds),
    ));
    let recorder = Arc::new(PgMessageRecorder::new(db_pool.clone()));
    let dispatcher = NodeDispatcher::new(gateway, recorder, http);

    let engine = Arc::new(FlowEngine::new(
        Arc::new(PgGraphStore::new(db_pool.clone())),
        Arc::new(PgExecutionStore::new(db_pool.clone())),
        Arc::new(PgChannelDirectory::new(db_pool)),
        dispatcher,
        EngineConfig {
            step_ceiling: config.engine.step_ceiling,
        },
    ));

    // Spawn the due-timer sweep
    let sweeper = TimerSweeper::new(
        engine.clone(),
        Duration::from_secs(config.engine.timer_poll_seconds),
    );
    tokio::spawn(sweeper.run());

    // Consume inbound messages until shutdown
    let consumer = InboundConsumer::new(nats, config.nats.inbound_subject.clone(), engine);
    tokio::select! {
        result = consumer.run() => {
            if let Err(error) = result {
                tracing::error!(%error, "inbound consumer failed");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
        }
    }
}
