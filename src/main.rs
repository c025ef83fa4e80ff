use anyhow::Context;
use solution_analyzer::cli::{Args, Commands, InputLoader};
use solution_analyzer::{AnalysisConfig, ProviderFactory, env};
use std::path::Path;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(env::DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(args.config_path().map(|p| p.as_path()))?;

    match args.command {
        Commands::Analyze {
            problem,
            solution,
            documents,
            parameters,
            ..
        } => {
            let request =
                InputLoader::load_request(&problem, &solution, &documents, parameters.as_deref())?;
            run_analysis(config, request).await
        }
        Commands::Health { .. } => run_health(config).await,
        Commands::ShowConfig { .. } => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AnalysisConfig> {
    let config = match path {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            AnalysisConfig::from_toml_file(path)?
        }
        None => AnalysisConfig::from_env()?,
    };
    Ok(config)
}

async fn run_analysis(
    config: AnalysisConfig,
    request: solution_analyzer::AnalysisRequest,
) -> anyhow::Result<()> {
    let factory = ProviderFactory::new(config);
    let provider = factory
        .get_primary_provider()
        .context("failed to initialize analysis provider")?;

    info!(provider = provider.provider_name(), request_id = %request.id, "Starting analysis");

    match provider.analyze_comprehensively(request).await {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            if let Some(orchestrator) = factory.get_orchestrator()? {
                info!("Provider metrics: {}", serde_json::to_string(&orchestrator.metrics())?);
            }
            Ok(())
        }
        Err(e) => {
            error!(
                kind = %e.kind(),
                status = e.suggested_http_status(),
                "Analysis failed: {}",
                e
            );
            Err(e.into())
        }
    }
}

async fn run_health(config: AnalysisConfig) -> anyhow::Result<()> {
    let factory = ProviderFactory::new(config);
    let provider = factory.get_primary_provider()?;
    let healthy = provider.is_healthy().await;

    let report = serde_json::json!({
        "provider": provider.provider_name(),
        "healthy": healthy,
        "configuration": provider.get_configuration(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !healthy {
        anyhow::bail!("provider {} is unhealthy", provider.provider_name());
    }
    Ok(())
}
