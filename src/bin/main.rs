//! Binary entry point: wires `RouterConfig` into the full dependency
//! graph and dispatches to the CLI subcommand (spec §10.3, §6).

use std::sync::Arc;

use clap::Parser;
use routing_brain::auth::{AuthState, InMemoryApiKeyStore};
use routing_brain::budget::{BudgetStore, InMemoryBudgetStore, RedisBudgetStore};
use routing_brain::classifier::{AdvisoryClient, AdvisoryClientConfig, Classifier};
use routing_brain::cli::{Cli, Commands};
use routing_brain::config::{BudgetStoreBackend, RouterConfig};
use routing_brain::executor::Executor;
use routing_brain::observability::{CacheHealthCheck, DatabaseHealthCheck, HealthChecker, ObservabilityStack};
use routing_brain::pipeline::RoutingPipeline;
use routing_brain::policy_engine::{loader as policy_loader, PolicyEngine, PolicyStore};
use routing_brain::providers::{catalog, ProviderRegistry};
use routing_brain::recorder::{DecisionRecorder, InMemorySink, JsonFileSink, PostgresAuditSink};
use routing_brain::{build_router, ApiState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => RouterConfig::from_file(path)?,
        None => RouterConfig::from_env(),
    };

    let _observability = ObservabilityStack::init(&config.observability)
        .map_err(|e| anyhow::anyhow!("failed to initialize observability: {e}"))?;

    match cli.command {
        Commands::Serve { model_catalog } => serve(config, model_catalog).await,
        Commands::Reload { url } => reload(&url).await,
        Commands::Simulate { url, file } => simulate(&url, &file).await,
    }
}

async fn serve(config: RouterConfig, model_catalog: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let catalog_path = model_catalog.unwrap_or_else(|| std::path::PathBuf::from("./models.yaml"));
    let catalog = if catalog_path.exists() {
        catalog::load_file(&catalog_path)?
    } else {
        tracing::warn!(path = ?catalog_path, "model catalog not found, starting with an empty registry");
        catalog::Catalog {
            models: Default::default(),
            virtual_models: Default::default(),
            bindings: Default::default(),
        }
    };
    let providers = ProviderRegistry::from_catalog(catalog);

    let policy_store = PolicyStore::new();
    let policy_dir = std::path::Path::new(&config.policy_store.directory);
    for (key, policy) in policy_loader::load_directory(policy_dir)? {
        policy_store.reload(key, policy);
    }
    let policy_engine = Arc::new(PolicyEngine::new(policy_store, providers.clone()));

    let budget_store: Arc<dyn BudgetStore> = match config.budget_store.backend {
        BudgetStoreBackend::Redis => {
            let url = config
                .budget_store
                .redis_url
                .clone()
                .ok_or_else(|| anyhow::anyhow!("budget_store.backend=redis requires redis_url"))?;
            Arc::new(RedisBudgetStore::new(&url, config.budget_store.daily_cap_usd_cents)?)
        }
        BudgetStoreBackend::InMemory => Arc::new(InMemoryBudgetStore::default()),
    };

    let advisory = config.classifier.endpoint.clone().map(|endpoint| {
        let api_key = config
            .classifier
            .api_key_env
            .as_ref()
            .and_then(|var| std::env::var(var).ok())
            .unwrap_or_default();
        AdvisoryClient::new(AdvisoryClientConfig {
            endpoint,
            api_key,
            model: config.classifier.model.clone(),
            timeout: std::time::Duration::from_millis(config.classifier.timeout_ms),
        })
    });
    let classifier = Arc::new(match advisory {
        Some(client) => Classifier::new(Some(client)),
        None => Classifier::disabled(),
    });

    let executor = Arc::new(Executor::new(providers.clone()));

    let mut sinks: Vec<Arc<dyn routing_brain::recorder::AuditSink>> =
        vec![Arc::new(JsonFileSink::open(std::path::Path::new(&config.audit.file_path)).await?)];
    let recorder = if let Some(database_url) = &config.audit.database_url {
        let pool = sqlx::PgPool::connect(database_url).await?;
        let postgres_sink = Arc::new(PostgresAuditSink::new(pool));
        sinks.push(postgres_sink.clone());
        DecisionRecorder::new(sinks).with_queryable(postgres_sink)
    } else {
        let in_memory = Arc::new(InMemorySink::default());
        sinks.push(in_memory.clone());
        DecisionRecorder::new(sinks).with_queryable(in_memory)
    };
    let recorder = Arc::new(recorder);

    let pipeline = Arc::new(RoutingPipeline::new(
        classifier,
        policy_engine.clone(),
        executor,
        recorder.clone(),
        budget_store.clone(),
        config.long_context_token_threshold,
    ));

    let metrics = Arc::new(
        routing_brain::observability::MetricsRegistry::new(config.observability.metrics.clone())
            .map_err(|e| anyhow::anyhow!("failed to initialize metrics: {e}"))?,
    );

    let health_checker = if config.observability.health.enabled {
        let checker = HealthChecker::new(config.observability.health.clone());
        if config.audit.database_url.is_some() {
            checker
                .register(Arc::new(DatabaseHealthCheck::new("audit_postgres", false)))
                .await;
        }
        if matches!(config.budget_store.backend, BudgetStoreBackend::Redis) {
            checker
                .register(Arc::new(CacheHealthCheck::new("budget_redis", false)))
                .await;
        }
        Some(Arc::new(checker))
    } else {
        None
    };

    let api_state = ApiState {
        pipeline,
        policy_engine,
        providers,
        budget_store,
        recorder,
        metrics,
        idempotency: Arc::new(routing_brain::api::idempotency::IdempotencyCache::new()),
        config: Arc::new(config.clone()),
        health_checker,
    };

    let auth_state = AuthState::new(config.auth.clone(), InMemoryApiKeyStore::new())?;
    let app = build_router(api_state, auth_state);

    let addr = format!("{}:{}", config.server.bind, config.server.port);
    tracing::info!(%addr, "routing-brain listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn reload(url: &str) -> anyhow::Result<()> {
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{url}/internal/routing/policies/reload"))
        .send()
        .await?;
    println!("{}", resp.text().await?);
    Ok(())
}

async fn simulate(url: &str, file: &std::path::Path) -> anyhow::Result<()> {
    let body = std::fs::read_to_string(file)?;
    let request: serde_json::Value = serde_json::from_str(&body)?;
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{url}/internal/routing/simulate"))
        .json(&request)
        .send()
        .await?;
    println!("{}", resp.text().await?);
    Ok(())
}
