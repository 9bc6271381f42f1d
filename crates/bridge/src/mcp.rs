//! Resolution of the MCP servers made available to the agent engine for one request.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::PathBuf;

use crate::models::request::SessionInfo;

pub const BRAVE_SEARCH: &str = "brave-search";
pub const AWS_KNOWLEDGE: &str = "aws-knowledge-mcp-server";
pub const TIME: &str = "time-mcp-server";
pub const TAVILY_REMOTE: &str = "tavily-remote-mcp";

const AWS_KNOWLEDGE_URL: &str = "https://knowledge-mcp.global.api.aws";
const TAVILY_URL: &str = "https://mcp.tavily.com/mcp/";
const BRAVE_API_KEY_VAR: &str = "BRAVE_API_KEY";
const TAVILY_KEY_PARAM: &str = "tavilyApiKey=";

fn default_transport() -> String {
    "http".to_string()
}

/// A declaratively described MCP server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum McpServerDescriptor {
    Command {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default, skip_serializing_if = "HashMap::is_empty")]
        env: HashMap<String, String>,
    },
    Http {
        url: String,
        #[serde(rename = "type", default = "default_transport")]
        transport: String,
    },
}

impl McpServerDescriptor {
    pub fn command<S: Into<String>>(command: S, args: &[&str]) -> Self {
        McpServerDescriptor::Command {
            command: command.into(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
            env: HashMap::new(),
        }
    }

    pub fn http<S: Into<String>>(url: S) -> Self {
        McpServerDescriptor::Http {
            url: url.into(),
            transport: default_transport(),
        }
    }

    pub fn with_env<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        if let McpServerDescriptor::Command { env, .. } = &mut self {
            env.insert(key.into(), value.into());
        }
        self
    }
}

pub type McpServers = BTreeMap<String, McpServerDescriptor>;

#[derive(Debug, Deserialize)]
struct McpConfigFile {
    #[serde(default, rename = "mcpServers")]
    mcp_servers: McpServers,
}

/// Where server descriptors come from and which provider secrets are available
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct McpSettings {
    #[serde(default)]
    pub config_path: Option<PathBuf>,
    #[serde(default)]
    pub brave_api_key: Option<String>,
    #[serde(default)]
    pub tavily_api_key: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Fill an empty `tavilyApiKey=` query parameter. A parameter that already carries a value is left alone.
fn fill_key_param(arg: &str, key: &str) -> String {
    let mut out = String::with_capacity(arg.len() + key.len());
    let mut rest = arg;
    while let Some(pos) = rest.find(TAVILY_KEY_PARAM) {
        let end = pos + TAVILY_KEY_PARAM.len();
        out.push_str(&rest[..end]);
        rest = &rest[end..];
        if rest.is_empty() || rest.starts_with('&') {
            out.push_str(key);
        }
    }
    out.push_str(rest);
    out
}

#[derive(Debug, Clone, Default)]
pub struct McpResolver {
    settings: McpSettings,
}

impl McpResolver {
    pub fn new(settings: McpSettings) -> Self {
        Self { settings }
    }

    /// Resolve the servers for a request.
    ///
    /// `None` returns every available server, `Some(&[])` returns none, and a
    /// non-empty list keeps only the named servers. Unknown names are ignored.
    pub fn resolve(&self, requested: Option<&[String]>, session: &SessionInfo) -> McpServers {
        if matches!(requested, Some(names) if names.is_empty()) {
            tracing::debug!("MCP servers disabled by request");
            return McpServers::new();
        }

        let mut servers = self.load_base();
        self.inject_secrets(&mut servers);

        if let Some(names) = requested {
            servers.retain(|name, _| names.contains(name));
        }

        tracing::debug!(
            session_id = session.session_id.as_deref().unwrap_or("-"),
            trace_id = session.trace_id.as_deref().unwrap_or("-"),
            servers = ?servers.keys().collect::<Vec<_>>(),
            "Resolved MCP servers"
        );
        servers
    }

    fn load_base(&self) -> McpServers {
        if let Some(path) = self.settings.config_path.as_ref().filter(|p| p.exists()) {
            match fs::read_to_string(path)
                .map_err(|e| e.to_string())
                .and_then(|raw| serde_json::from_str::<McpConfigFile>(&raw).map_err(|e| e.to_string()))
            {
                Ok(file) => return file.mcp_servers,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to load MCP config, using defaults");
                }
            }
        }
        self.defaults()
    }

    fn defaults(&self) -> McpServers {
        let mut servers = McpServers::new();

        if let Some(key) = non_empty(&self.settings.brave_api_key) {
            servers.insert(
                BRAVE_SEARCH.to_string(),
                McpServerDescriptor::command("npx", &["-y", "@brave/brave-search-mcp-server"])
                    .with_env(BRAVE_API_KEY_VAR, key),
            );
        }

        servers.insert(
            AWS_KNOWLEDGE.to_string(),
            McpServerDescriptor::http(AWS_KNOWLEDGE_URL),
        );

        servers.insert(
            TIME.to_string(),
            McpServerDescriptor::command("uvx", &["mcp-server-time"]),
        );

        if non_empty(&self.settings.tavily_api_key).is_some() {
            let url = format!("{}?{}", TAVILY_URL, TAVILY_KEY_PARAM);
            servers.insert(
                TAVILY_REMOTE.to_string(),
                McpServerDescriptor::command("npx", &["-y", "mcp-remote", &url]),
            );
        }

        servers
    }

    fn inject_secrets(&self, servers: &mut McpServers) {
        if let Some(key) = non_empty(&self.settings.brave_api_key) {
            for (_, server) in servers
                .iter_mut()
                .filter(|(name, _)| name.starts_with(BRAVE_SEARCH))
            {
                if let McpServerDescriptor::Command { env, .. } = server {
                    env.insert(BRAVE_API_KEY_VAR.to_string(), key.to_string());
                }
            }
        }

        if let Some(key) = non_empty(&self.settings.tavily_api_key) {
            if let Some(McpServerDescriptor::Command { args, .. }) = servers.get_mut(TAVILY_REMOTE) {
                for arg in args.iter_mut() {
                    *arg = fill_key_param(arg, key);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn settings(brave: Option<&str>, tavily: Option<&str>) -> McpSettings {
        McpSettings {
            config_path: None,
            brave_api_key: brave.map(String::from),
            tavily_api_key: tavily.map(String::from),
        }
    }

    fn names(servers: &McpServers) -> Vec<&str> {
        servers.keys().map(String::as_str).collect()
    }

    #[test]
    fn test_empty_request_disables_everything() {
        let resolver = McpResolver::new(settings(Some("b"), Some("t")));
        let servers = resolver.resolve(Some(&[][..]), &SessionInfo::default());
        assert!(servers.is_empty());
    }

    #[test]
    fn test_defaults_without_secrets() {
        let resolver = McpResolver::new(settings(None, Some("")));
        let servers = resolver.resolve(None, &SessionInfo::default());
        assert_eq!(names(&servers), vec![AWS_KNOWLEDGE, TIME]);
        assert_eq!(servers[AWS_KNOWLEDGE], McpServerDescriptor::http(AWS_KNOWLEDGE_URL));
    }

    #[test]
    fn test_defaults_with_secrets() {
        let resolver = McpResolver::new(settings(Some("brave-key"), Some("tv-key")));
        let servers = resolver.resolve(None, &SessionInfo::default());
        assert_eq!(names(&servers), vec![AWS_KNOWLEDGE, BRAVE_SEARCH, TAVILY_REMOTE, TIME]);

        match &servers[BRAVE_SEARCH] {
            McpServerDescriptor::Command { env, .. } => {
                assert_eq!(env.get(BRAVE_API_KEY_VAR).map(String::as_str), Some("brave-key"));
            }
            other => panic!("Expected command server, got {:?}", other),
        }

        match &servers[TAVILY_REMOTE] {
            McpServerDescriptor::Command { args, .. } => {
                assert_eq!(args[2], "https://mcp.tavily.com/mcp/?tavilyApiKey=tv-key");
            }
            other => panic!("Expected command server, got {:?}", other),
        }
    }

    #[test]
    fn test_filter_by_requested_names() {
        let resolver = McpResolver::new(settings(None, None));
        let requested = vec![TIME.to_string(), "missing-server".to_string()];
        let servers = resolver.resolve(Some(requested.as_slice()), &SessionInfo::default());
        assert_eq!(names(&servers), vec![TIME]);
    }

    #[test]
    fn test_config_file_with_injection() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let config = json!({
            "mcpServers": {
                "brave-search-eu": {"command": "npx", "args": ["brave"], "env": {"OTHER": "1"}},
                "tavily-remote-mcp": {
                    "command": "npx",
                    "args": ["mcp-remote", "https://mcp.tavily.com/mcp/?tavilyApiKey=&mode=x"]
                },
                "docs": {"url": "https://docs.example.com/mcp", "type": "streamable-http"}
            }
        });
        write!(file, "{}", config).unwrap();

        let resolver = McpResolver::new(McpSettings {
            config_path: Some(file.path().to_path_buf()),
            brave_api_key: Some("bk".into()),
            tavily_api_key: Some("tk".into()),
        });
        let servers = resolver.resolve(None, &SessionInfo::default());
        assert_eq!(names(&servers), vec!["brave-search-eu", "docs", TAVILY_REMOTE]);

        assert_eq!(
            servers["brave-search-eu"],
            McpServerDescriptor::command("npx", &["brave"])
                .with_env("OTHER", "1")
                .with_env(BRAVE_API_KEY_VAR, "bk")
        );
        assert_eq!(
            servers[TAVILY_REMOTE],
            McpServerDescriptor::command(
                "npx",
                &["mcp-remote", "https://mcp.tavily.com/mcp/?tavilyApiKey=tk&mode=x"]
            )
        );
        assert_eq!(
            servers["docs"],
            McpServerDescriptor::Http {
                url: "https://docs.example.com/mcp".into(),
                transport: "streamable-http".into(),
            }
        );
    }

    #[test]
    fn test_unreadable_config_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let resolver = McpResolver::new(McpSettings {
            config_path: Some(file.path().to_path_buf()),
            ..Default::default()
        });
        let servers = resolver.resolve(None, &SessionInfo::default());
        assert_eq!(names(&servers), vec![AWS_KNOWLEDGE, TIME]);
    }

    #[test]
    fn test_fill_key_param_keeps_existing_values() {
        assert_eq!(fill_key_param("a?tavilyApiKey=", "k"), "a?tavilyApiKey=k");
        assert_eq!(fill_key_param("a?tavilyApiKey=old", "k"), "a?tavilyApiKey=old");
        assert_eq!(fill_key_param("no placeholder", "k"), "no placeholder");
    }

    #[test]
    fn test_descriptor_serialization() {
        let value = serde_json::to_value(McpServerDescriptor::http("https://x")).unwrap();
        assert_eq!(value, json!({"url": "https://x", "type": "http"}));

        let value = serde_json::to_value(McpServerDescriptor::command("uvx", &["a"])).unwrap();
        assert_eq!(value, json!({"command": "uvx", "args": ["a"]}));
    }
}
