//! Skillflow Server
//!
//! CLI and HTTP surface over the skill orchestration pipeline.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use skillflow_core::config::{
    SkillflowConfig, BASE_URL_ENV, MODEL_ENV, PROVIDER_ENV, SKILLS_BASE_PATH_ENV,
};
use skillflow_core::graph::{PipelineError, PipelineState, SkillGraph};

mod api;

#[derive(Parser, Clone)]
#[command(author, version, about = "Skillflow - route requests to pluggable skills")]
struct Args {
    /// Directory holding one sub-directory per skill
    #[arg(long, global = true)]
    skills_dir: Option<PathBuf>,
    /// LLM provider (openai, azure, openrouter, anthropic, deepseek, grok, ollama)
    #[arg(long, global = true)]
    provider: Option<String>,
    /// Model name (deployment name for Azure)
    #[arg(long, global = true)]
    model: Option<String>,
    /// Base URL override for OpenAI-compatible endpoints
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, env = "SKILLFLOW_LOG", default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Clone)]
enum CliCommand {
    /// List loaded skills
    Skills,
    /// Trigger search without calling the model
    Search {
        query: String,
        /// Extra text matched alongside the query
        #[arg(long)]
        context: Option<String>,
    },
    /// Run the full pipeline once and print the reply
    Ask { query: String },
    /// Start the HTTP API
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },
}

impl Args {
    fn resolve_config(&self) -> Result<SkillflowConfig> {
        self.resolve_config_with(|var| std::env::var(var).ok())
    }

    /// Each flag stands in for its environment variable, so a flag overrides
    /// only the field it names.
    fn resolve_config_with<F>(&self, env: F) -> Result<SkillflowConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |var: &str| match var {
            SKILLS_BASE_PATH_ENV => self
                .skills_dir
                .as_ref()
                .map(|dir| dir.to_string_lossy().into_owned()),
            PROVIDER_ENV => self.provider.clone(),
            MODEL_ENV => self.model.clone(),
            BASE_URL_ENV => self.base_url.clone(),
            _ => None,
        };
        SkillflowConfig::from_lookup(|var| flag(var).or_else(|| env(var)))
            .context("Invalid configuration (environment or flags)")
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_graph(config: &SkillflowConfig) -> Result<SkillGraph> {
    let registry = config.load_registry();
    tracing::info!(
        skills = ?registry.names().collect::<Vec<_>>(),
        dir = %registry.base_path().display(),
        "Skill registry loaded"
    );
    let executor = config.build_executor(registry, config.plugin_loader());
    let model = config
        .chat_model()
        .with_context(|| format!("Failed to configure {} chat model", config.model.provider))?;
    Ok(SkillGraph::new(executor, Arc::new(model)))
}

async fn ask(config: &SkillflowConfig, query: &str) -> Result<()> {
    let graph = build_graph(config)?;

    let state = match graph.run(PipelineState::from_user_message(query)).await {
        Ok(state) => state,
        Err(PipelineError::Model { node, source, .. }) => {
            return Err(anyhow::Error::new(source).context(format!("Model call failed in '{}' node", node)));
        }
        Err(e) => return Err(e.into()),
    };

    println!("{}", state.reply().unwrap_or_default());
    if !state.selected_skills.is_empty() {
        println!();
        println!("Skills used: {}", state.selected_skills.join(", "));
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "execution_results": state.execution_results }))?
        );
    }
    Ok(())
}

async fn serve(config: &SkillflowConfig, port: u16) -> Result<()> {
    let graph = build_graph(config)?;
    let app = api::router(Arc::new(api::AppState { graph }));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    println!("Skillflow API running at http://{}", addr);
    println!("   Skills: /api/v1/skills, /api/v1/skills/search");
    println!("   Chat:   /api/v1/chat");
    println!("   Health: /api/v1/health");

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(&args.log_level);

    let config = args.resolve_config()?;

    match &args.command {
        CliCommand::Skills => {
            let registry = config.load_registry();
            if registry.is_empty() {
                println!("No skills found in {}", registry.base_path().display());
            }
            for skill in registry.list_all() {
                println!("{} v{}", skill.name, skill.version);
                println!("    {}", skill.description);
                if !skill.triggers.is_empty() {
                    println!("    triggers: {}", skill.triggers.join(", "));
                }
            }
        }
        CliCommand::Search { query, context } => {
            let registry = config.load_registry();
            let hits = registry.search_skills(query, context.as_deref().unwrap_or_default());
            println!("{}", serde_json::to_string_pretty(&hits)?);
        }
        CliCommand::Ask { query } => ask(&config, query).await?,
        CliCommand::Serve { port } => serve(&config, *port).await?,
    }

    Ok(())
}
