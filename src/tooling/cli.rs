//! CLI Tooling
//!
//! Command-line interface for running the dispatch service and inspecting
//! its agent catalog.

use crate::agent::{AgentServices, AgentSpec, MemoryKind};
use crate::config::{ConfigLoader, ServiceConfig};
use crate::dispatch::{DispatchRequest, RequestDispatcher};
use crate::error::ApiError;
use crate::logging::LoggingConfig;
use crate::provider::{credentials, EnvModelClientResolver};
use crate::resolver::{AgentResolver, AgentSignals};
use crate::server;
use crate::tools::Toolkit;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// agentd - multi-agent dispatch service
#[derive(Parser)]
#[command(name = "agentd")]
#[command(about = "Route AG-UI requests to lazily constructed, cached agents")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (layered over the global config)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// `base` with the logging flags applied.
    pub fn logging_config(&self, base: &LoggingConfig) -> LoggingConfig {
        let mut config = base.clone();
        if let Some(level) = &self.log_level {
            config.level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.format = format.clone();
        }
        if let Some(output) = &self.log_output {
            config.output = output.clone();
        }
        if let Some(file) = &self.log_file {
            config.file = Some(file.clone());
        }
        config
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the AG-UI endpoints until interrupted
    Serve {
        /// Address to bind (overrides server.bind)
        #[arg(long)]
        bind: Option<String>,
    },
    /// Inspect the agent catalog
    Agents {
        #[command(subcommand)]
        command: AgentCommands,
    },
    /// Show which agent a request with the given signals would reach
    Resolve {
        /// Path segment signal
        #[arg(long)]
        path: Option<String>,
        /// Header signal
        #[arg(long)]
        header: Option<String>,
        /// Body `forwardedProps.agentId` signal
        #[arg(long)]
        body: Option<String>,
    },
    /// Send one message to an agent and print the reply
    Run {
        /// User message
        message: String,
        /// Agent id (defaults to default_agent_id)
        #[arg(long)]
        agent: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum AgentCommands {
    /// List configured agents
    List {
        #[arg(long, value_enum, default_value_t = ListFormat::Text)]
        format: ListFormat,
    },
    /// Print one agent spec
    Show {
        agent_id: String,
        #[arg(long, value_enum, default_value_t = ShowFormat::Toml)]
        format: ShowFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ShowFormat {
    Toml,
    Json,
}

/// CLI context holding the loaded configuration
pub struct CliContext {
    config: ServiceConfig,
}

impl CliContext {
    /// Load configuration, from `config_path` when given.
    pub fn new(config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = ConfigLoader::load(config_path.as_deref())?;
        Ok(Self { config })
    }

    pub fn with_config(config: ServiceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Execute a CLI command
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Serve { bind } => self.serve(bind.as_deref()),
            Commands::Agents { command } => match command {
                AgentCommands::List { format } => self.list_agents(*format),
                AgentCommands::Show { agent_id, format } => self.show_agent(agent_id, *format),
            },
            Commands::Resolve { path, header, body } => self.resolve(AgentSignals {
                path: path.clone(),
                header: header.clone(),
                body: body.clone(),
            }),
            Commands::Run { message, agent } => self.run(message, agent.as_deref()),
        }
    }

    fn services() -> AgentServices {
        AgentServices::new(Arc::new(EnvModelClientResolver::new()), Toolkit::with_builtin_tools())
    }

    fn runtime() -> Result<tokio::runtime::Runtime, ApiError> {
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| ApiError::Server(format!("Failed to start async runtime: {}", e)))
    }

    fn serve(&self, bind: Option<&str>) -> Result<String, ApiError> {
        let specs = self.config.agent_specs();
        credentials::preflight(specs.iter().map(|spec| spec.model.provider))?;

        let dispatcher = RequestDispatcher::from_config(&self.config, Self::services())?;
        let bind = bind.unwrap_or(&self.config.server.bind).to_string();

        Self::runtime()?.block_on(async {
            let mut handle = server::serve(&self.config, dispatcher, &bind).await?;
            let port = handle.port;
            if let Some(trigger) = handle.shutdown_trigger() {
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        let _ = trigger.send(());
                    }
                });
            }
            handle.wait().await?;
            info!(port, "Server stopped");
            Ok(format!("Server on port {} stopped", port))
        })
    }

    fn list_agents(&self, format: ListFormat) -> Result<String, ApiError> {
        let specs = self.config.agent_specs();
        let default_id = self.config.default_agent_id.trim();
        match format {
            ListFormat::Json => {
                let agents: Vec<_> = specs
                    .iter()
                    .map(|spec| {
                        json!({
                            "id": spec.id,
                            "display_name": spec.display_name,
                            "provider": spec.model.provider.slug(),
                            "model": spec.model.model_name,
                            "tools": spec.tools,
                            "max_iterations": spec.max_iterations,
                        })
                    })
                    .collect();
                serde_json::to_string_pretty(&json!({ "default": default_id, "agents": agents }))
                    .map_err(|e| ApiError::ConfigError(e.to_string()))
            }
            ListFormat::Text => Ok(format_agent_table(&specs, default_id)),
        }
    }

    fn show_agent(&self, agent_id: &str, format: ShowFormat) -> Result<String, ApiError> {
        let spec = self
            .config
            .agent_specs()
            .into_iter()
            .find(|spec| spec.id == agent_id)
            .ok_or_else(|| ApiError::UnknownAgent(agent_id.to_string()))?;
        match format {
            ShowFormat::Toml => {
                toml::to_string_pretty(&spec).map_err(|e| ApiError::ConfigError(e.to_string()))
            }
            ShowFormat::Json => {
                serde_json::to_string_pretty(&spec).map_err(|e| ApiError::ConfigError(e.to_string()))
            }
        }
    }

    fn resolve(&self, signals: AgentSignals) -> Result<String, ApiError> {
        let resolver = AgentResolver::new(self.config.default_agent_id.clone())?;
        let (id, source) = resolver.resolve_with_source(&signals);
        let known = self.config.agent_specs().iter().any(|spec| spec.id == id);
        Ok(format!(
            "{} (from {}){}",
            id,
            source,
            if known { "" } else { " [unknown agent]" }
        ))
    }

    fn run(&self, message: &str, agent: Option<&str>) -> Result<String, ApiError> {
        let dispatcher = RequestDispatcher::from_config(&self.config, Self::services())?;
        let signals = AgentSignals {
            path: agent.map(str::to_string),
            ..Default::default()
        };
        let request = DispatchRequest {
            signals,
            input: crate::agent::RunInput::user(message),
        };
        let outcome = Self::runtime()?.block_on(dispatcher.dispatch(request))?;
        Ok(outcome.output.reply)
    }
}

fn format_agent_table(specs: &[AgentSpec], default_id: &str) -> String {
    if specs.is_empty() {
        return "No agents configured.".to_string();
    }
    use comfy_table::Table;
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["ID", "Name", "Model", "Tools", "Memory", "Max Iter"]);
    for spec in specs {
        let id = if spec.id == default_id {
            format!("{} *", spec.id)
        } else {
            spec.id.clone()
        };
        let model = format!("{}/{}", spec.model.provider.slug(), spec.model.model_name);
        let tools = if spec.tools.is_empty() {
            "-".to_string()
        } else {
            spec.tools.iter().cloned().collect::<Vec<_>>().join(", ")
        };
        let memory = match spec.memory {
            MemoryKind::None => "none",
            MemoryKind::InMemoryTranscript => "transcript",
        };
        table.add_row(vec![
            id,
            spec.display_name.clone(),
            model,
            tools,
            memory.to_string(),
            spec.max_iterations.to_string(),
        ]);
    }
    format!("{}\n* default agent", table)
}
