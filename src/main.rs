use flag_evaluator::evaluation::FlagEvaluator;
use flag_evaluator::rules::JsonLogic;
use flag_evaluator::store::{CircuitBreakerStore, FlagSource, InMemoryFlagStore, PgFlagStore};
use flag_evaluator::{config, routes, state};
use sqlx::PgPool;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if std::env::args().nth(1).as_deref() == Some("gen-sdk-key") {
        print_sdk_key();
        return;
    }

    if let Err(e) = run().await {
        tracing::error!(error = %e, "Server failed");
        std::process::exit(1);
    }
}

fn print_sdk_key() {
    match routes::sdk_auth::issue_sdk_key() {
        Ok(issued) => {
            println!("SDK key:      {}", issued.key);
            println!("SDK_KEY_HASH={}", issued.hash);
        }
        Err(e) => {
            eprintln!("Failed to hash SDK key: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::Config::from_env()?;

    let source = match (&config.flags_file, &config.database_url) {
        (Some(path), _) => {
            let store = InMemoryFlagStore::load_json_file(path).await?;
            tracing::info!(path = %path.display(), "Serving flags from file");
            FlagSource::Memory(store)
        }
        (None, Some(url)) => {
            let db = PgPool::connect(url).await?;
            sqlx::migrate!("./migrations").run(&db).await?;
            tracing::info!("Serving flags from Postgres");
            FlagSource::Postgres(PgFlagStore::new(db))
        }
        (None, None) => return Err(config::ConfigError::NoFlagSource.into()),
    };

    let store = CircuitBreakerStore::new(source, config.breaker_settings());
    let state = state::AppState::new(
        FlagEvaluator::new(store, JsonLogic),
        config.sdk_key_hash.clone(),
    );
    if state.sdk_key_hash.is_none() {
        tracing::warn!("SDK_KEY_HASH not set, /api is open to any caller");
    }

    let app = routes::routes(state);

    let listener = tokio::net::TcpListener::bind(config.addr()).await?;

    tracing::info!("server is chilling at http://{}", config.addr());

    axum::serve(listener, app).await?;
    Ok(())
}
