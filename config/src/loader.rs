use crate::{ConfigError, LogLevel, WebshConfig};
use regex::Regex;
use std::path::PathBuf;

pub struct ConfigLoader {
    explicit_file: Option<PathBuf>,
    search_paths: Vec<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        let mut search_paths = Vec::new();

        if let Some(home) = dirs::home_dir() {
            search_paths.push(home.join(".config/websh/websh.yaml"));
        }
        search_paths.push(PathBuf::from("./websh.yaml"));

        #[cfg(unix)]
        search_paths.insert(0, PathBuf::from("/etc/websh/websh.yaml"));

        Self {
            explicit_file: None,
            search_paths,
        }
    }

    pub fn with_file(mut self, path: &str) -> Self {
        self.explicit_file = Some(PathBuf::from(path));
        self
    }

    pub fn with_search_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.search_paths = paths;
        self
    }

    pub fn load(&self) -> Result<WebshConfig, ConfigError> {
        let mut config = WebshConfig::default();

        if let Ok(env_path) = std::env::var("WEBSH_CONFIG") {
            let content =
                std::fs::read_to_string(&env_path).map_err(|e| ConfigError::ReadFile {
                    path: PathBuf::from(&env_path),
                    source: e,
                })?;
            config = self.parse_yaml(&content)?;
        } else if let Some(ref explicit) = self.explicit_file {
            let content = std::fs::read_to_string(explicit).map_err(|e| ConfigError::ReadFile {
                path: explicit.clone(),
                source: e,
            })?;
            config = self.parse_yaml(&content)?;
        } else {
            for path in &self.search_paths {
                if path.exists() {
                    tracing::debug!(path = %path.display(), "merging config file");
                    if let Ok(content) = std::fs::read_to_string(path) {
                        config = self.merge_yaml(&config, &content)?;
                    }
                }
            }
        }

        self.apply_env_overrides(&mut config)?;
        Ok(config)
    }

    fn parse_yaml(&self, content: &str) -> Result<WebshConfig, ConfigError> {
        let expanded = self.expand_env_vars(content);
        Ok(serde_yaml::from_str(&expanded)?)
    }

    fn merge_yaml(&self, base: &WebshConfig, content: &str) -> Result<WebshConfig, ConfigError> {
        let expanded = self.expand_env_vars(content);
        let overlay: WebshConfig = serde_yaml::from_str(&expanded)?;
        Ok(self.merge_configs(base, &overlay))
    }

    fn merge_configs(&self, base: &WebshConfig, overlay: &WebshConfig) -> WebshConfig {
        let defaults = WebshConfig::default();
        let mut result = base.clone();

        if overlay.shell.prompt != defaults.shell.prompt {
            result.shell.prompt = overlay.shell.prompt.clone();
        }
        if overlay.shell.workdir != defaults.shell.workdir {
            result.shell.workdir = overlay.shell.workdir.clone();
        }
        if overlay.shell.script_extension != defaults.shell.script_extension {
            result.shell.script_extension = overlay.shell.script_extension.clone();
        }
        if overlay.shell.history != defaults.shell.history {
            result.shell.history = overlay.shell.history.clone();
        }
        if overlay.engine != defaults.engine {
            result.engine = overlay.engine.clone();
        }
        if overlay.logging != defaults.logging {
            result.logging = overlay.logging.clone();
        }

        result
    }

    fn expand_env_vars(&self, content: &str) -> String {
        let Ok(re) = Regex::new(r"\$\{([^}]+)\}") else {
            return content.to_string();
        };
        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_default()
        })
        .to_string()
    }

    fn apply_env_overrides(&self, config: &mut WebshConfig) -> Result<(), ConfigError> {
        if let Ok(prompt) = std::env::var("WEBSH_PROMPT") {
            config.shell.prompt = prompt;
        }
        if let Ok(workdir) = std::env::var("WEBSH_WORKDIR") {
            if !workdir.is_empty() {
                config.shell.workdir = workdir;
            }
        }
        if let Ok(level) = std::env::var("WEBSH_LOG_LEVEL") {
            if let Ok(l) = serde_yaml::from_str::<LogLevel>(&level) {
                config.logging.level = l;
            }
        }
        if let Ok(limit) = std::env::var("WEBSH_MEMORY_LIMIT") {
            config.engine.memory_limit_bytes =
                limit.parse().map_err(|_| ConfigError::InvalidOverride {
                    var: "WEBSH_MEMORY_LIMIT",
                    value: limit.clone(),
                    reason: "not a byte count",
                })?;
        }
        Ok(())
    }
}

/// Expand a leading `~` and `$VAR` references in a configured path.
pub fn expand_path(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(path).as_ref()),
    }
}
