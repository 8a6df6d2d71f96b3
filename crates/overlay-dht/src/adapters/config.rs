use crate::domain::{KademliaConfig, NodeAddress, OverlayConfig};
use crate::ports::ConfigProvider;

// ============================================================================
// StaticConfigProvider - Hardcoded config for testing/development
// ============================================================================

/// Static configuration provider with hardcoded values.
///
/// Useful for testing and development. For production, use `TomlConfigProvider`.
#[derive(Debug, Clone, Default)]
pub struct StaticConfigProvider {
    config: OverlayConfig,
}

impl StaticConfigProvider {
    /// Create with default config and no bootstrap nodes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the given bootstrap seeds.
    #[must_use]
    pub fn with_bootstrap_nodes(mut self, nodes: Vec<NodeAddress>) -> Self {
        self.config.seeds = nodes;
        self
    }

    /// Use the given Kademlia parameters.
    #[must_use]
    pub fn with_kademlia(mut self, kademlia: KademliaConfig) -> Self {
        self.config.kademlia = kademlia;
        self
    }

    /// Replace the whole configuration.
    #[must_use]
    pub fn with_config(mut self, config: OverlayConfig) -> Self {
        self.config = config;
        self
    }
}

impl ConfigProvider for StaticConfigProvider {
    fn get_overlay_config(&self) -> OverlayConfig {
        self.config.clone()
    }
}

// ============================================================================
// TomlConfigProvider - Config file loading (requires "config" feature)
// ============================================================================

#[cfg(feature = "config")]
mod toml_config {
    use std::fs;
    use std::path::Path;
    use std::time::Duration;

    use serde::Deserialize;
    use thiserror::Error;
    use tracing::warn;

    use super::*;
    use crate::domain::Transport;

    /// Configuration file structure.
    #[derive(Debug, Deserialize, Default)]
    struct ConfigFile {
        #[serde(default)]
        node: NodeSection,
        #[serde(default)]
        bootstrap: BootstrapSection,
        #[serde(default)]
        kademlia: KademliaSection,
        #[serde(default)]
        cache: CacheSection,
        #[serde(default)]
        service: ServiceSection,
    }

    #[derive(Debug, Deserialize, Default)]
    struct NodeSection {
        listen: Option<String>,
    }

    #[derive(Debug, Deserialize, Default)]
    struct BootstrapSection {
        #[serde(default)]
        nodes: Vec<String>,
    }

    #[derive(Debug, Deserialize, Default)]
    struct KademliaSection {
        k: Option<usize>,
        alpha: Option<usize>,
        max_rounds: Option<usize>,
        rpc_timeout_ms: Option<u64>,
        round_timeout_ms: Option<u64>,
        failure_threshold: Option<u32>,
    }

    #[derive(Debug, Deserialize, Default)]
    struct CacheSection {
        ttl_secs: Option<u64>,
    }

    #[derive(Debug, Deserialize, Default)]
    struct ServiceSection {
        max_choose: Option<usize>,
    }

    /// TOML-based configuration provider.
    ///
    /// Missing keys fall back to the defaults; seeds that do not parse are
    /// skipped with a warning.
    ///
    /// # Config File Format
    ///
    /// ```toml
    /// [node]
    /// listen = "0.0.0.0:7777"
    ///
    /// [bootstrap]
    /// nodes = ["bootstrap.storj.io:8080", "10.0.0.1:7777"]
    ///
    /// [kademlia]
    /// k = 20
    /// alpha = 3
    /// max_rounds = 20
    /// rpc_timeout_ms = 3000
    /// round_timeout_ms = 5000
    /// failure_threshold = 3
    ///
    /// [cache]
    /// ttl_secs = 3600
    ///
    /// [service]
    /// max_choose = 100
    /// ```
    #[derive(Debug, Clone)]
    pub struct TomlConfigProvider {
        config: OverlayConfig,
    }

    impl TomlConfigProvider {
        /// Load configuration from a TOML file.
        ///
        /// # Errors
        ///
        /// Returns error if the file cannot be read or parsed.
        pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
            let content = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
                path: path.as_ref().display().to_string(),
                error: e.to_string(),
            })?;

            Self::parse(&content)
        }

        /// Parse configuration from a TOML string.
        pub fn parse(content: &str) -> Result<Self, ConfigError> {
            let file: ConfigFile =
                toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
            let defaults = OverlayConfig::default();

            let listen = match file.node.listen {
                Some(raw) => NodeAddress::parse(Transport::Tcp, &raw)
                    .map_err(|e| ConfigError::Parse(e.to_string()))?,
                None => defaults.listen,
            };

            let seeds = file
                .bootstrap
                .nodes
                .iter()
                .filter_map(|raw| match NodeAddress::parse(Transport::Tcp, raw) {
                    Ok(address) => Some(address),
                    Err(e) => {
                        warn!(seed = %raw, error = %e, "skipping malformed bootstrap node");
                        None
                    }
                })
                .collect();

            let kc = file.kademlia;
            let base = defaults.kademlia;
            let kademlia = KademliaConfig {
                k: kc.k.unwrap_or(base.k),
                alpha: kc.alpha.unwrap_or(base.alpha),
                max_rounds: kc.max_rounds.unwrap_or(base.max_rounds),
                rpc_timeout: kc
                    .rpc_timeout_ms
                    .map(Duration::from_millis)
                    .unwrap_or(base.rpc_timeout),
                round_timeout: kc
                    .round_timeout_ms
                    .map(Duration::from_millis)
                    .unwrap_or(base.round_timeout),
                failure_threshold: kc.failure_threshold.unwrap_or(base.failure_threshold),
            };

            Ok(Self {
                config: OverlayConfig {
                    listen,
                    seeds,
                    kademlia,
                    cache_ttl_secs: file.cache.ttl_secs.unwrap_or(defaults.cache_ttl_secs),
                    max_choose: file.service.max_choose.unwrap_or(defaults.max_choose),
                },
            })
        }
    }

    impl ConfigProvider for TomlConfigProvider {
        fn get_overlay_config(&self) -> OverlayConfig {
            self.config.clone()
        }
    }

    /// Errors that can occur during config loading.
    #[derive(Debug, Clone, Error)]
    pub enum ConfigError {
        /// File I/O error.
        #[error("failed to read {path}: {error}")]
        Io {
            /// Path of the file that failed to load.
            path: String,
            /// Error message from the I/O operation.
            error: String,
        },
        /// TOML parsing error.
        #[error("failed to parse config: {0}")]
        Parse(String),
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_parse_full_file() {
            let provider = TomlConfigProvider::parse(
                r#"
                [node]
                listen = "10.0.0.5:9000"

                [bootstrap]
                nodes = ["seed.example.org:7777", "not a seed", "[::1]:7000"]

                [kademlia]
                k = 8
                rpc_timeout_ms = 250

                [cache]
                ttl_secs = 60

                [service]
                max_choose = 10
                "#,
            )
            .unwrap();

            let config = provider.get_overlay_config();
            assert_eq!(config.listen, NodeAddress::tcp("10.0.0.5", 9000));
            assert_eq!(
                config.seeds,
                vec![
                    NodeAddress::tcp("seed.example.org", 7777),
                    NodeAddress::tcp("::1", 7000)
                ]
            );
            assert_eq!(config.kademlia.k, 8);
            assert_eq!(config.kademlia.alpha, 3);
            assert_eq!(config.kademlia.rpc_timeout, Duration::from_millis(250));
            assert_eq!(config.cache_ttl_secs, 60);
            assert_eq!(config.max_choose, 10);
        }

        #[test]
        fn test_empty_file_uses_defaults_and_intro_node() {
            let provider = TomlConfigProvider::parse("").unwrap();
            assert_eq!(provider.get_overlay_config(), OverlayConfig::default());
            assert_eq!(
                provider.get_bootstrap_nodes(),
                vec![crate::domain::default_intro_node()]
            );
        }

        #[test]
        fn test_bad_listen_address_is_an_error() {
            let result = TomlConfigProvider::parse("[node]\nlisten = \"nope\"\n");
            assert!(matches!(result, Err(ConfigError::Parse(_))));
        }
    }
}

#[cfg(feature = "config")]
pub use toml_config::{ConfigError, TomlConfigProvider};
