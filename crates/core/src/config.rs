use crate::extract::DEFAULT_FORWARDED_HEADER;
use crate::identity::Identity;
use crate::record::MAX_TAG_LEN;
use arc_swap::ArcSwap;
use notify::{RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use sha2::Digest;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

// ─── Config ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    // Server
    pub host: String,
    pub port: u16,

    // Logging
    pub logging_to_file: bool,
    pub log_dir: Option<String>,

    // Request capture
    pub request_log: RequestLogConfig,

    // Session cookie
    pub session: SessionConfig,

    // Client auth
    pub api_users: Vec<ApiUser>,
    #[serde(skip)]
    pub api_users_by_key: HashMap<String, Identity>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            logging_to_file: false,
            log_dir: None,
            request_log: RequestLogConfig::default(),
            session: SessionConfig::default(),
            api_users: Vec::new(),
            api_users_by_key: HashMap::new(),
        }
    }
}

impl Config {
    /// Load config from a YAML file, sanitize, and validate.
    pub fn load(path: &str) -> Result<Self, anyhow::Error> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse config from YAML text, sanitize, and validate.
    pub fn from_yaml(contents: &str) -> Result<Self, anyhow::Error> {
        let mut config: Config = serde_yaml_ng::from_str(contents)?;
        config.sanitize();
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration.
    fn validate(&self) -> Result<(), anyhow::Error> {
        let request_log = &self.request_log;
        anyhow::ensure!(
            !request_log.forwarded_header.is_empty(),
            "request-log.forwarded-header must not be empty"
        );
        anyhow::ensure!(
            request_log.category.chars().count() <= MAX_TAG_LEN,
            "request-log.category is longer than {MAX_TAG_LEN} characters"
        );
        anyhow::ensure!(
            request_log.label.chars().count() <= MAX_TAG_LEN,
            "request-log.label is longer than {MAX_TAG_LEN} characters"
        );
        if let StorageConfig::Jsonl { path } = &request_log.storage {
            anyhow::ensure!(!path.is_empty(), "request-log.storage.jsonl.path is empty");
        }
        anyhow::ensure!(
            !self.session.cookie_name.is_empty(),
            "session.cookie-name must not be empty"
        );
        for user in &self.api_users {
            anyhow::ensure!(
                !user.user_id.is_empty() && !user.username.is_empty(),
                "api user entries need both user-id and username"
            );
        }
        Ok(())
    }

    /// Sanitize and normalize configuration.
    fn sanitize(&mut self) {
        self.request_log.forwarded_header =
            self.request_log.forwarded_header.trim().to_ascii_lowercase();
        self.session.cookie_name = self.session.cookie_name.trim().to_string();

        // Remove users without a key, keep the first entry per key
        self.api_users.retain(|u| !u.key.is_empty());
        let mut seen = HashSet::new();
        self.api_users.retain(|u| seen.insert(u.key.clone()));

        // Build HashMap for O(1) API key lookups
        self.api_users_by_key = self
            .api_users
            .iter()
            .map(|u| (u.key.clone(), u.identity()))
            .collect();
    }

    /// Identity registered for an API key, if any.
    pub fn identity_for_key(&self, key: &str) -> Option<&Identity> {
        self.api_users_by_key.get(key)
    }
}

// ─── Sub-configs ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RequestLogConfig {
    /// Attach the capturing middleware. Read once at router construction.
    pub enabled: bool,
    pub category: String,
    pub label: String,
    pub forwarded_header: String,
    pub storage: StorageConfig,
}

impl Default for RequestLogConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            category: String::new(),
            label: String::new(),
            forwarded_header: DEFAULT_FORWARDED_HEADER.to_string(),
            storage: StorageConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StorageConfig {
    #[default]
    Memory,
    Jsonl {
        path: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SessionConfig {
    pub cookie_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "sessionid".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ApiUser {
    pub key: String,
    pub user_id: String,
    pub username: String,
}

impl ApiUser {
    pub fn identity(&self) -> Identity {
        Identity::new(self.user_id.clone(), self.username.clone())
    }
}

// ─── Config Watcher ────────────────────────────────────────────────────────

pub struct ConfigWatcher {
    _watcher: notify::RecommendedWatcher,
}

impl ConfigWatcher {
    /// Start watching a config file. On changes (debounced 150ms, SHA256 dedup),
    /// reload the config and atomically swap it in via ArcSwap.
    pub fn start(
        path: String,
        config: Arc<ArcSwap<Config>>,
        on_reload: impl Fn(&Config) + Send + Sync + 'static,
    ) -> Result<Self, anyhow::Error> {
        let (tx, mut rx) = tokio::sync::mpsc::channel::<()>(16);

        let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
            if let Ok(event) = res
                && (event.kind.is_modify() || event.kind.is_create())
            {
                let _ = tx.blocking_send(());
            }
        })?;
        watcher.watch(Path::new(&path), RecursiveMode::NonRecursive)?;

        tokio::spawn(async move {
            let mut last_hash: Option<[u8; 32]> = None;
            let mut debounce: Option<tokio::time::Instant> = None;

            loop {
                tokio::select! {
                    Some(()) = rx.recv() => {
                        debounce = Some(tokio::time::Instant::now() + Duration::from_millis(150));
                    }
                    _ = async {
                        match debounce {
                            Some(deadline) => tokio::time::sleep_until(deadline).await,
                            None => std::future::pending::<()>().await,
                        }
                    } => {
                        debounce = None;
                        match std::fs::read(&path) {
                            Ok(contents) => {
                                let hash: [u8; 32] = sha2::Sha256::digest(&contents).into();
                                if last_hash.as_ref() == Some(&hash) {
                                    continue;
                                }
                                last_hash = Some(hash);

                                match Config::load(&path) {
                                    Ok(new_cfg) => {
                                        tracing::info!("Configuration reloaded successfully");
                                        on_reload(&new_cfg);
                                        config.store(Arc::new(new_cfg));
                                    }
                                    Err(e) => {
                                        tracing::error!("Config reload failed: {e}");
                                    }
                                }
                            }
                            Err(e) => tracing::error!("Config file read failed: {e}"),
                        }
                    }
                }
            }
        });

        Ok(Self { _watcher: watcher })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.port, 8080);
        assert!(!cfg.request_log.enabled);
        assert_eq!(cfg.request_log.category, "");
        assert_eq!(cfg.request_log.label, "");
        assert_eq!(cfg.request_log.forwarded_header, "x-forwarded-for");
        assert_eq!(cfg.request_log.storage, StorageConfig::Memory);
        assert_eq!(cfg.session.cookie_name, "sessionid");
    }

    #[test]
    fn test_from_yaml() {
        let cfg = Config::from_yaml(
            r#"
port: 9000
request-log:
  enabled: true
  category: debug
  forwarded-header: X-Real-Client
  storage:
    jsonl:
      path: /tmp/requests.jsonl
api-users:
  - key: k1
    user-id: "1"
    username: alice
"#,
        )
        .unwrap();

        assert_eq!(cfg.port, 9000);
        assert!(cfg.request_log.enabled);
        assert_eq!(cfg.request_log.category, "debug");
        assert_eq!(cfg.request_log.label, "");
        assert_eq!(cfg.request_log.forwarded_header, "x-real-client");
        assert_eq!(
            cfg.request_log.storage,
            StorageConfig::Jsonl {
                path: "/tmp/requests.jsonl".to_string()
            }
        );
        assert_eq!(
            cfg.identity_for_key("k1"),
            Some(&Identity::new("1", "alice"))
        );
    }

    #[test]
    fn test_sanitize_api_users() {
        let mut cfg = Config {
            api_users: vec![
                ApiUser {
                    key: "k1".into(),
                    user_id: "1".into(),
                    username: "alice".into(),
                },
                ApiUser {
                    key: "".into(),
                    user_id: "2".into(),
                    username: "bob".into(),
                },
                ApiUser {
                    key: "k1".into(), // duplicate
                    user_id: "3".into(),
                    username: "carol".into(),
                },
            ],
            ..Config::default()
        };
        cfg.sanitize();

        assert_eq!(cfg.api_users.len(), 1);
        assert_eq!(cfg.identity_for_key("k1").unwrap().username, "alice");
        assert!(cfg.identity_for_key("").is_none());
    }

    #[test]
    fn test_validate_rejects_long_category() {
        let yaml = format!("request-log:\n  category: {}\n", "c".repeat(101));
        assert!(Config::from_yaml(&yaml).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "host: 127.0.0.1\nsession:\n  cookie-name: sid\n").unwrap();

        let cfg = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.session.cookie_name, "sid");
    }
}
