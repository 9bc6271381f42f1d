use crate::error::{to_env_var, ConfigError};
use bridge::engine::claude_cli::{EngineSettings, DEFAULT_COMMAND, DEFAULT_PERMISSION_MODE};
use bridge::iteration::DEFAULT_MAX_ITERATIONS;
use bridge::mcp::McpSettings;
use bridge::orchestrator::{OrchestratorSettings, DEFAULT_MAX_TURNS, DEFAULT_MODE};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::env;
use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;

const CONFIG_FILE: &str = "bridge";

/// Unprefixed variables understood for compatibility with existing deployments.
/// They sit below the config file and `BRIDGE_` variables.
const LEGACY_ENV_VARS: &[(&str, &str)] = &[
    ("MCP_CONFIG_PATH", "mcp.config_path"),
    ("BRAVE_API_KEY", "mcp.brave_api_key"),
    ("TAVILY_API_KEY", "mcp.tavily_api_key"),
    ("MAX_ITERATIONS", "agent.max_iterations"),
];

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            service_name: default_service_name(),
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentSettings {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
    #[serde(default = "default_mode")]
    pub default_mode: String,
    /// Directory whose `<mode>.md` files shadow the built-in prompts
    #[serde(default)]
    pub prompts_dir: Option<PathBuf>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            max_turns: default_max_turns(),
            default_mode: default_mode(),
            prompts_dir: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkspaceSettings {
    #[serde(default = "default_workspace_root")]
    pub root: PathBuf,
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            root: default_workspace_root(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub agent: AgentSettings,
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub mcp: McpSettings,
    #[serde(default)]
    pub workspace: WorkspaceSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate()
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            max_iterations: self.agent.max_iterations,
            max_turns: self.agent.max_turns,
            default_mode: self.agent.default_mode.clone(),
            permission_mode: self.engine.permission_mode.clone(),
        }
    }

    fn load_and_validate() -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            // Server defaults
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            .set_default("server.service_name", default_service_name())?
            // Agent defaults
            .set_default("agent.max_iterations", default_max_iterations() as u64)?
            .set_default("agent.max_turns", default_max_turns())?
            .set_default("agent.default_mode", default_mode())?
            // Engine defaults
            .set_default("engine.command", DEFAULT_COMMAND)?
            .set_default("engine.permission_mode", DEFAULT_PERMISSION_MODE)?
            .set_default(
                "workspace.root",
                default_workspace_root().to_string_lossy().into_owned(),
            )?;

        for (var, key) in LEGACY_ENV_VARS {
            if let Some(value) = env::var(var).ok().filter(|value| !value.is_empty()) {
                builder = builder.set_default(*key, value)?;
            }
        }

        let config = builder
            .add_source(File::with_name(CONFIG_FILE).required(false))
            // Layer on the environment variables
            .add_source(
                Environment::with_prefix("BRIDGE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let result: Result<Self, config::ConfigError> = config.try_deserialize();

        match result {
            Ok(settings) => Ok(settings),
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                let error_str = err.to_string();
                if error_str.starts_with("missing field") {
                    // "missing field `name`"
                    let field = error_str
                        .trim_start_matches("missing field `")
                        .trim_end_matches('`');
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    })
                } else if let config::ConfigError::NotFound(field) = &err {
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    })
                } else {
                    Err(ConfigError::Other(err))
                }
            }
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_service_name() -> String {
    "research-agent-core-runtime".to_string()
}

fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}

fn default_max_turns() -> u32 {
    DEFAULT_MAX_TURNS
}

fn default_mode() -> String {
    DEFAULT_MODE.to_string()
}

fn default_workspace_root() -> PathBuf {
    PathBuf::from("/tmp/ws")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clean_env() {
        for (key, _) in env::vars() {
            if key.starts_with("BRIDGE_") {
                env::remove_var(&key);
            }
        }
        for (var, _) in LEGACY_ENV_VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_default_settings() {
        clean_env();

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.server.service_name, "research-agent-core-runtime");
        assert_eq!(settings.agent.max_iterations, 200);
        assert_eq!(settings.agent.max_turns, 200);
        assert_eq!(settings.agent.default_mode, "technical-research");
        assert_eq!(settings.agent.prompts_dir, None);
        assert_eq!(settings.engine, EngineSettings::default());
        assert_eq!(settings.mcp, McpSettings::default());
        assert_eq!(settings.workspace.root, PathBuf::from("/tmp/ws"));
    }

    #[test]
    #[serial]
    fn test_environment_override() {
        clean_env();
        env::set_var("BRIDGE_SERVER__PORT", "9000");
        env::set_var("BRIDGE_SERVER__SERVICE_NAME", "edge-runtime");
        env::set_var("BRIDGE_AGENT__MAX_ITERATIONS", "25");
        env::set_var("BRIDGE_AGENT__PROMPTS_DIR", "/etc/bridge/prompts");
        env::set_var("BRIDGE_ENGINE__COMMAND", "/usr/local/bin/claude");
        env::set_var("BRIDGE_MCP__CONFIG_PATH", "/etc/bridge/mcp.json");
        env::set_var("BRIDGE_WORKSPACE__ROOT", "/var/tmp/bridge");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.server.service_name, "edge-runtime");
        assert_eq!(settings.agent.max_iterations, 25);
        assert_eq!(
            settings.agent.prompts_dir,
            Some(PathBuf::from("/etc/bridge/prompts"))
        );
        assert_eq!(settings.engine.command, "/usr/local/bin/claude");
        assert_eq!(settings.engine.permission_mode, "default");
        assert_eq!(
            settings.mcp.config_path,
            Some(PathBuf::from("/etc/bridge/mcp.json"))
        );
        assert_eq!(settings.workspace.root, PathBuf::from("/var/tmp/bridge"));

        let orchestrator = settings.orchestrator_settings();
        assert_eq!(orchestrator.max_iterations, 25);
        assert_eq!(orchestrator.max_turns, 200);

        clean_env();
    }

    #[test]
    #[serial]
    fn test_legacy_variables() {
        clean_env();
        env::set_var("MAX_ITERATIONS", "50");
        env::set_var("BRAVE_API_KEY", "brave-secret");
        env::set_var("TAVILY_API_KEY", "tavily-secret");
        env::set_var("MCP_CONFIG_PATH", "/opt/mcp.json");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.agent.max_iterations, 50);
        assert_eq!(settings.mcp.brave_api_key.as_deref(), Some("brave-secret"));
        assert_eq!(settings.mcp.tavily_api_key.as_deref(), Some("tavily-secret"));
        assert_eq!(settings.mcp.config_path, Some(PathBuf::from("/opt/mcp.json")));

        clean_env();
    }

    #[test]
    #[serial]
    fn test_prefixed_variables_win_over_legacy() {
        clean_env();
        env::set_var("MAX_ITERATIONS", "50");
        env::set_var("BRIDGE_AGENT__MAX_ITERATIONS", "75");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.agent.max_iterations, 75);

        clean_env();
    }

    #[test]
    #[serial]
    fn test_invalid_value_is_reported() {
        clean_env();
        env::set_var("BRIDGE_SERVER__PORT", "not-a-port");

        let err = Settings::new().unwrap_err();
        assert!(matches!(err, ConfigError::Other(_)));

        clean_env();
    }

    #[test]
    fn test_socket_addr_conversion() {
        let server_settings = ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 3000,
            ..Default::default()
        };
        let addr = server_settings.socket_addr().unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:3000");

        let invalid = ServerSettings {
            host: "not a host".to_string(),
            ..Default::default()
        };
        assert!(invalid.socket_addr().is_err());
    }
}
