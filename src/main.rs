use anyhow::Context;
use conductor::agents::discover_capabilities;
use conductor::cli::output::Output;
use conductor::cli::{Cli, Commands};
use conductor::llm::LLMClient;
use conductor::supervisor::Supervisor;
use conductor::utils::Config;
use conductor::workflows::WorkflowEngine;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_args();

    let default_filter = if cli.verbose {
        "conductor=debug,info"
    } else {
        "conductor=info,warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let out = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    let config = Config::from_env().context("failed to load configuration")?;

    let index = discover_capabilities(&config.agents.service_urls, config.discovery_timeout())
        .await
        .context("capability discovery failed")?;
    out.info(&format!(
        "Discovered {} capabilities across {} agents",
        index.len(),
        index.registrations().count()
    ));

    if let Some(Commands::Agents) = cli.command {
        out.heading("Discovered agents");
        for registration in index.registrations() {
            out.info(&format!(
                "{} @ {} -> {}",
                registration.name,
                registration.base_url,
                registration.capabilities.join(", ")
            ));
        }
        return Ok(());
    }

    let Some(request) = cli.request else {
        anyhow::bail!("no request given; pass one as an argument or use 'conductor agents'");
    };

    let provider = config.provider()?;
    out.info(&format!(
        "Using {} ({})",
        provider.name(),
        provider.model()
    ));
    let llm: Arc<dyn LLMClient> = Arc::from(
        provider
            .create_client()
            .await
            .context("failed to create LLM client")?,
    );

    let engine =
        WorkflowEngine::from_discovery(Supervisor::new(llm), index, config.invoke_timeout())?;

    let output = engine.run(&request).await?;

    if !output.reasoning_path.is_empty() {
        out.heading("Steps");
        let total = output.reasoning_path.len();
        for (i, step) in output.reasoning_path.iter().enumerate() {
            out.step(
                i + 1,
                total,
                &format!(
                    "{} ({}) in {}ms",
                    step.capability, step.agent_name, step.duration_ms
                ),
            );
        }
    }

    out.final_response(&output.final_response);
    Ok(())
}
