//! Application configuration, read from the environment at startup.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::channels::EmailConfig;
use crate::error::ConfigError;
use crate::llm::LlmConfig;
use crate::pipeline::RequestRegistry;

/// Where processed senders are recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LedgerBackend {
    /// One address per line in a text file.
    #[default]
    File,
    /// A libSQL database file.
    LibSql,
}

impl FromStr for LedgerBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" | "text" => Ok(Self::File),
            "libsql" | "sqlite" => Ok(Self::LibSql),
            other => Err(ConfigError::InvalidValue {
                key: "ATTESTATION_LEDGER_BACKEND".to_string(),
                message: format!("unknown backend '{other}', expected 'file' or 'libsql'"),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    pub backend: LedgerBackend,
    pub path: PathBuf,
}

/// Document and reply settings.
#[derive(Debug, Clone)]
pub struct AttestationConfig {
    pub output_dir: PathBuf,
    /// Footer line of every attestation.
    pub organization: String,
    /// Closing line of every reply.
    pub signature: String,
    /// JSON file of request types; builtin types when unset.
    pub registry_path: Option<PathBuf>,
}

impl Default for AttestationConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./pdfs"),
            organization: "FSTG MARRAKECH".to_string(),
            signature: "The Yam Team".to_string(),
            registry_path: None,
        }
    }
}

impl AttestationConfig {
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            output_dir: var("ATTESTATION_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            organization: var("ATTESTATION_ORGANIZATION").unwrap_or(defaults.organization),
            signature: var("ATTESTATION_SIGNATURE").unwrap_or(defaults.signature),
            registry_path: var("ATTESTATION_REGISTRY_PATH").map(PathBuf::from),
        }
    }

    /// Load the request registry this configuration points at.
    pub fn registry(&self) -> Result<RequestRegistry, ConfigError> {
        match &self.registry_path {
            Some(path) => RequestRegistry::load(path),
            None => Ok(RequestRegistry::builtin()),
        }
    }
}

impl LedgerConfig {
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let backend = match var("ATTESTATION_LEDGER_BACKEND") {
            Some(s) => s.parse()?,
            None => LedgerBackend::default(),
        };
        let path = var("ATTESTATION_LEDGER_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| match backend {
                LedgerBackend::File => PathBuf::from("processed_users.txt"),
                LedgerBackend::LibSql => PathBuf::from("processed_users.db"),
            });
        Ok(Self { backend, path })
    }
}

/// Everything the binary needs.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub email: EmailConfig,
    pub llm: LlmConfig,
    pub attestation: AttestationConfig,
    pub ledger: LedgerConfig,
    /// Directory for daily log files, in addition to stderr.
    pub log_dir: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let var = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        Ok(Self {
            email: EmailConfig::from_env()?,
            llm: LlmConfig::from_env()?,
            attestation: AttestationConfig::from_lookup(var),
            ledger: LedgerConfig::from_lookup(var)?,
            log_dir: var("ATTESTATION_LOG_DIR").map(PathBuf::from),
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.email.poll_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn attestation_defaults() {
        let config = AttestationConfig::from_lookup(lookup(&[]));
        assert_eq!(config.output_dir, PathBuf::from("./pdfs"));
        assert_eq!(config.organization, "FSTG MARRAKECH");
        assert_eq!(config.signature, "The Yam Team");
        assert!(config.registry_path.is_none());
        assert_eq!(config.registry().unwrap().len(), 2);
    }

    #[test]
    fn attestation_overrides() {
        let config = AttestationConfig::from_lookup(lookup(&[
            ("ATTESTATION_OUTPUT_DIR", "/tmp/out"),
            ("ATTESTATION_SIGNATURE", "Registrar"),
        ]));
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.signature, "Registrar");
    }

    #[test]
    fn missing_registry_file_is_an_error() {
        let config = AttestationConfig::from_lookup(lookup(&[(
            "ATTESTATION_REGISTRY_PATH",
            "/nonexistent/types.json",
        )]));
        assert!(config.registry().is_err());
    }

    #[test]
    fn ledger_defaults_to_text_file() {
        let config = LedgerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.backend, LedgerBackend::File);
        assert_eq!(config.path, PathBuf::from("processed_users.txt"));
    }

    #[test]
    fn ledger_libsql_backend() {
        let config =
            LedgerConfig::from_lookup(lookup(&[("ATTESTATION_LEDGER_BACKEND", "LibSQL")])).unwrap();
        assert_eq!(config.backend, LedgerBackend::LibSql);
        assert_eq!(config.path, PathBuf::from("processed_users.db"));
    }

    #[test]
    fn unknown_ledger_backend_rejected() {
        let err = LedgerConfig::from_lookup(lookup(&[("ATTESTATION_LEDGER_BACKEND", "redis")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
