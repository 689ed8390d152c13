//! Configuration types for the chat application.
//!
//! Settings come from four places, highest precedence first: command-line
//! flags parsed with `arrrg`, the `OPENAI_API_KEY` and `OPENAI_MODEL`
//! environment variables, an optional YAML file, and built-in defaults.

use std::time::Duration;

use arrrg_derive::CommandLine;
use serde::{Deserialize, Serialize};
use url::Url;
use utf8path::Path;

use crate::client::{DEFAULT_ENDPOINT, DEFAULT_MODEL, DEFAULT_TIMEOUT};
use crate::types::Mode;
use crate::{Error, Result};

/// Environment variable holding the API credential.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Environment variable overriding the default model.
pub const MODEL_ENV: &str = "OPENAI_MODEL";

/// Location of the config file, relative to `$HOME`.
const DEFAULT_CONFIG_PATH: &str = ".config/chatline/config.yaml";

/// Command-line arguments for the chatline tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// API credential.
    #[arrrg(optional, "API key (default: $OPENAI_API_KEY)", "KEY")]
    pub api_key: Option<String>,

    /// Model to use for chat.
    #[arrrg(optional, "Model to use (default: gpt-3.5-turbo)", "MODEL")]
    pub model: Option<String>,

    #[arrrg(optional, "Chat completions endpoint URL", "URL")]
    pub endpoint: Option<String>,

    /// Explicit config file; it must exist.
    #[arrrg(optional, "YAML config file (default: ~/.config/chatline/config.yaml)", "PATH")]
    pub config: Option<String>,

    #[arrrg(optional, "Append a JSON line per request and event to PATH", "PATH")]
    pub log_file: Option<String>,

    #[arrrg(optional, "Request timeout in seconds (default: 600)", "SECONDS")]
    pub timeout: Option<u64>,

    /// Start in markdown mode rather than streaming mode.
    #[arrrg(flag, "Start in markdown mode")]
    pub markdown: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

////////////////////////////////////////////// ConfigFile ////////////////////////////////////////////

/// Settings read from the YAML config file.  Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl ConfigFile {
    /// Parses YAML text.  An empty document is an empty config.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Reads and parses the file at `path`.
    pub fn from_file(path: &str) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|err| Error::io(format!("failed to read config file {path}"), err))?;
        Self::from_yaml(&yaml)
            .map_err(|err| Error::configuration(format!("invalid config file {path}: {err}")))
    }

    /// The per-user config path, when `$HOME` is set.
    pub fn default_path() -> Option<String> {
        let home = std::env::var("HOME").ok().filter(|h| !h.is_empty())?;
        let path = Path::from(home.as_str()).join(DEFAULT_CONFIG_PATH);
        Some(path.as_str().to_string())
    }

    /// Loads the explicit file, or the per-user file if one exists.
    ///
    /// An explicit path that cannot be read is an error; a missing per-user
    /// file is not.
    pub fn discover(explicit: Option<&str>) -> Result<Option<Self>> {
        if let Some(path) = explicit {
            return Self::from_file(path).map(Some);
        }
        match Self::default_path() {
            Some(path) if Path::from(path.as_str()).exists() => Self::from_file(&path).map(Some),
            _ => Ok(None),
        }
    }
}

////////////////////////////////////////////// ChatConfig ////////////////////////////////////////////

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after merging every
/// source with the appropriate defaults.
#[derive(Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// The bearer credential; never blank.
    pub api_key: String,

    /// The model identifier sent with every request.
    pub model: String,

    /// The endpoint requests are POSTed to; always a valid URL.
    pub endpoint: String,

    /// The request timeout.
    pub timeout: Duration,

    /// Processed as the first line of input, before the first prompt.
    pub initial_prompt: Option<String>,

    /// The mode of the first session.
    pub mode: Mode,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Where to write the JSON lines request log, if anywhere.
    pub log_file: Option<String>,
}

impl ChatConfig {
    /// Resolves the configuration from parsed flags, free words, an optional
    /// config file and an environment lookup.
    ///
    /// Fails with a configuration error when no non-blank API key is found,
    /// and with a URL error when the endpoint does not parse.
    pub fn resolve<F>(
        args: ChatArgs,
        words: &[String],
        file: Option<ConfigFile>,
        env: F,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = file.unwrap_or_default();
        let lookup = |name: &str| env(name).filter(|v| !v.trim().is_empty());
        let given = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        let api_key = given(args.api_key)
            .or_else(|| lookup(API_KEY_ENV))
            .or_else(|| given(file.api_key))
            .ok_or_else(|| {
                Error::configuration(format!(
                    "no API key: set {API_KEY_ENV}, pass --api-key, or add api_key to the config file"
                ))
            })?;
        let model = given(args.model)
            .or_else(|| lookup(MODEL_ENV))
            .or_else(|| given(file.model))
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let endpoint = given(args.endpoint)
            .or_else(|| given(file.endpoint))
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        Url::parse(&endpoint)?;
        let timeout = args
            .timeout
            .or(file.timeout_secs)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);
        let mode = Mode::from_markdown_flag(args.markdown || file.markdown.unwrap_or(false));

        let initial_prompt = Some(words.join(" ").trim().to_string()).filter(|p| !p.is_empty());

        Ok(ChatConfig {
            api_key: api_key.trim().to_string(),
            model,
            endpoint,
            timeout,
            initial_prompt,
            mode,
            use_color: !args.no_color,
            log_file: args.log_file,
        })
    }

    /// Resolves the configuration against the process environment and the
    /// config file named by `--config` (or the per-user default).
    pub fn load(args: ChatArgs, words: &[String]) -> Result<Self> {
        let file = ConfigFile::discover(args.config.as_deref())?;
        Self::resolve(args, words, file, |name| std::env::var(name).ok())
    }
}

impl std::fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatConfig")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .field("initial_prompt", &self.initial_prompt)
            .field("mode", &self.mode)
            .field("use_color", &self.use_color)
            .field("log_file", &self.log_file)
            .finish_non_exhaustive()
    }
}
