//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory
//! (overridable with `-f/--config`), then applies `FACTBOT_LOG_LEVEL` and
//! `FACTBOT_CORPUS_URL` env overrides.

use std::{env, fs, path::Path, time::Duration};

use serde::Deserialize;

use crate::corpus::CorpusSource;
use crate::error::AppError;

/// PTY (console) channel configuration.
#[derive(Debug, Clone)]
pub struct PtyConfig {
    /// Whether the PTY channel is explicitly enabled.
    pub enabled: bool,
}

/// Telegram channel configuration.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Whether the Telegram channel is explicitly enabled.
    pub enabled: bool,
}

/// HTTP channel configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Whether the HTTP channel is explicitly enabled.
    pub enabled: bool,
    /// Socket address to bind the HTTP listener to.
    pub bind: String,
}

/// Comms subsystem configuration.
#[derive(Debug, Clone)]
pub struct CommsConfig {
    pub pty: PtyConfig,
    pub telegram: TelegramConfig,
    pub http: HttpConfig,
}

/// Where the fact corpus comes from.
#[derive(Debug, Clone)]
pub struct CorpusConfig {
    /// `"bundled"` (data compiled into the binary) or `"remote"` (fetched once).
    pub source: String,
    /// Fetch URL — required when `source = "remote"`.
    pub url: Option<String>,
    /// Per-request timeout for the remote fetch.
    pub fetch_timeout_seconds: u64,
}

impl CorpusConfig {
    pub fn is_remote(&self) -> bool {
        self.source == "remote"
    }

    /// Convert to the loader's source descriptor.
    ///
    /// `url` presence for remote mode is validated at load time, so the
    /// unwrap-free fallback here never triggers in practice.
    pub fn to_source(&self) -> CorpusSource {
        if self.is_remote() {
            CorpusSource::Remote {
                url: self.url.clone().unwrap_or_default(),
                timeout: Duration::from_secs(self.fetch_timeout_seconds),
            }
        } else {
            CorpusSource::Bundled
        }
    }
}

/// Fully-resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_name: String,
    pub log_level: String,
    pub corpus: CorpusConfig,
    pub comms: CommsConfig,
}

impl Config {
    /// Returns `true` if the PTY channel should be loaded.
    pub fn comms_pty_should_load(&self) -> bool {
        self.comms.pty.enabled
    }

    /// Returns `true` if the Telegram channel should be loaded.
    pub fn comms_telegram_should_load(&self) -> bool {
        self.comms.telegram.enabled
    }

    /// Returns `true` if the HTTP channel should be loaded.
    pub fn comms_http_should_load(&self) -> bool {
        self.comms.http.enabled
    }
}

/// Raw TOML shape — `serde` target before resolution.
#[derive(Deserialize)]
struct RawConfig {
    bot: RawBot,
    #[serde(default)]
    corpus: RawCorpus,
    #[serde(default)]
    comms: RawComms,
}

#[derive(Deserialize)]
struct RawBot {
    name: String,
    #[serde(default = "default_log_level")]
    log_level: String,
}

#[derive(Deserialize)]
struct RawCorpus {
    #[serde(default = "default_corpus_source")]
    source: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default = "default_fetch_timeout_seconds")]
    fetch_timeout_seconds: u64,
}

impl Default for RawCorpus {
    fn default() -> Self {
        Self {
            source: default_corpus_source(),
            url: None,
            fetch_timeout_seconds: default_fetch_timeout_seconds(),
        }
    }
}

#[derive(Deserialize, Default)]
struct RawComms {
    #[serde(default)]
    pty: RawPty,
    #[serde(default)]
    telegram: RawTelegram,
    #[serde(default)]
    http: RawHttp,
}

#[derive(Deserialize)]
struct RawPty {
    /// Defaults to `true`: the console auto-enables in interactive runs.
    #[serde(default = "default_true")]
    enabled: bool,
}

#[derive(Deserialize)]
struct RawTelegram {
    /// Defaults to `false`: Telegram must be explicitly enabled.
    #[serde(default = "default_false")]
    enabled: bool,
}

#[derive(Deserialize)]
struct RawHttp {
    /// Defaults to `true`: the REST surface is the primary interface.
    #[serde(default = "default_true")]
    enabled: bool,
    /// Bind address for the HTTP listener.
    #[serde(default = "default_http_bind")]
    bind: String,
}

impl Default for RawPty {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for RawTelegram {
    fn default() -> Self {
        Self { enabled: false }
    }
}

impl Default for RawHttp {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: default_http_bind(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_corpus_source() -> String {
    "bundled".to_string()
}

fn default_fetch_timeout_seconds() -> u64 {
    10
}

fn default_http_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

/// Load config, then apply env-var overrides.
///
/// `path` defaults to `config/default.toml` when not given on the CLI.
pub fn load(path: Option<&str>) -> Result<Config, AppError> {
    let log_level_override = env::var("FACTBOT_LOG_LEVEL").ok();
    let corpus_url_override = env::var("FACTBOT_CORPUS_URL").ok();
    load_from(
        Path::new(path.unwrap_or("config/default.toml")),
        log_level_override.as_deref(),
        corpus_url_override.as_deref(),
    )
}

/// Internal loader — accepts an explicit path and optional overrides.
/// Tests pass overrides directly instead of mutating env vars.
pub fn load_from(
    path: &Path,
    log_level_override: Option<&str>,
    corpus_url_override: Option<&str>,
) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    let log_level = log_level_override
        .unwrap_or(&parsed.bot.log_level)
        .to_string();

    let corpus = CorpusConfig {
        source: parsed.corpus.source,
        url: corpus_url_override
            .map(str::to_string)
            .or(parsed.corpus.url),
        fetch_timeout_seconds: parsed.corpus.fetch_timeout_seconds,
    };

    match corpus.source.as_str() {
        "bundled" => {}
        "remote" => {
            if corpus.url.is_none() {
                return Err(AppError::Config(
                    "corpus.source = \"remote\" requires corpus.url (or FACTBOT_CORPUS_URL)"
                        .to_string(),
                ));
            }
        }
        other => {
            return Err(AppError::Config(format!(
                "unknown corpus.source '{other}' (expected \"bundled\" or \"remote\")"
            )));
        }
    }

    Ok(Config {
        bot_name: parsed.bot.name,
        log_level,
        corpus,
        comms: CommsConfig {
            pty: PtyConfig {
                enabled: parsed.comms.pty.enabled,
            },
            telegram: TelegramConfig {
                enabled: parsed.comms.telegram.enabled,
            },
            http: HttpConfig {
                enabled: parsed.comms.http.enabled,
                bind: parsed.comms.http.bind,
            },
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL_TOML: &str = r#"
[bot]
name = "test-bot"
"#;

    fn write_toml(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn parse_minimal_config() {
        let f = write_toml(MINIMAL_TOML);
        let cfg = load_from(f.path(), None, None).unwrap();
        assert_eq!(cfg.bot_name, "test-bot");
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.corpus.source, "bundled");
        assert!(cfg.comms.pty.enabled);
        assert!(cfg.comms.http.enabled);
        assert!(!cfg.comms.telegram.enabled);
    }

    #[test]
    fn parse_full_config() {
        let f = write_toml(
            r#"
[bot]
name = "factbot"
log_level = "debug"

[corpus]
source = "remote"
url = "https://example.test/facts.json"
fetch_timeout_seconds = 5

[comms.telegram]
enabled = true

[comms.http]
enabled = true
bind = "0.0.0.0:9000"
"#,
        );
        let cfg = load_from(f.path(), None, None).unwrap();
        assert_eq!(cfg.log_level, "debug");
        assert!(cfg.corpus.is_remote());
        assert_eq!(cfg.corpus.fetch_timeout_seconds, 5);
        assert!(cfg.comms.telegram.enabled);
        assert_eq!(cfg.comms.http.bind, "0.0.0.0:9000");
    }

    #[test]
    fn missing_file_errors() {
        let result = load_from(Path::new("/nonexistent/config.toml"), None, None);
        assert!(result.is_err());
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("config error"));
    }

    #[test]
    fn remote_without_url_errors() {
        let f = write_toml(
            r#"
[bot]
name = "test-bot"

[corpus]
source = "remote"
"#,
        );
        let result = load_from(f.path(), None, None);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("corpus.url"));
    }

    #[test]
    fn unknown_source_errors() {
        let f = write_toml(
            r#"
[bot]
name = "test-bot"

[corpus]
source = "sqlite"
"#,
        );
        assert!(load_from(f.path(), None, None).is_err());
    }

    #[test]
    fn env_log_level_override() {
        let f = write_toml(MINIMAL_TOML);
        let cfg = load_from(f.path(), Some("debug"), None).unwrap();
        assert_eq!(cfg.log_level, "debug");
    }

    #[test]
    fn env_corpus_url_override() {
        let f = write_toml(
            r#"
[bot]
name = "test-bot"

[corpus]
source = "remote"
"#,
        );
        let cfg = load_from(f.path(), None, Some("https://override.test/facts.json")).unwrap();
        assert_eq!(
            cfg.corpus.url.as_deref(),
            Some("https://override.test/facts.json")
        );
    }
}
