use std::path::PathBuf;
use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_ADDRESS: &str = "localhost:9092";
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_METADATA_TIMEOUT: Duration = Duration::from_secs(10);

pub const CERT_FILE_ENV: &str = "KCLI_CERT_FILE";
pub const KEY_FILE_ENV: &str = "KCLI_KEY_FILE";
pub const CA_CERT_FILE_ENV: &str = "KCLI_CA_CERT_FILE";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Missing required config option: {0}")]
    Builder(String),
    #[error("Invalid client config: {0}")]
    Invalid(String),
    #[error("TLS file {path} from ${var} does not exist")]
    MissingTlsFile { var: &'static str, path: PathBuf },
}

/// Configures how the client reaches the brokers and how long reads may stall
#[derive(Debug, Builder, Clone)]
#[builder(build_fn(private, name = "build_impl"))]
pub struct ClientConfig {
    #[builder(default = "vec![DEFAULT_ADDRESS.to_owned()]", setter(custom))]
    pub addrs: Vec<String>,
    /// Upper bound for a single read attempt, not for a whole consume call
    #[builder(default = "DEFAULT_READ_TIMEOUT")]
    pub read_timeout: Duration,
    #[builder(default = "DEFAULT_METADATA_TIMEOUT")]
    pub metadata_timeout: Duration,
    #[builder(default)]
    pub tls: TlsPolicy,
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Brokers as a single `host:port,host:port` string
    pub fn bootstrap_servers(&self) -> String {
        self.addrs.join(",")
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            addrs: vec![DEFAULT_ADDRESS.to_owned()],
            read_timeout: DEFAULT_READ_TIMEOUT,
            metadata_timeout: DEFAULT_METADATA_TIMEOUT,
            tls: TlsPolicy::Disabled,
        }
    }
}

impl ClientConfigBuilder {
    pub fn build(&self) -> Result<ClientConfig, ConfigError> {
        let config = self
            .build_impl()
            .map_err(|e| ConfigError::Builder(e.to_string()))?;

        if config.addrs.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one broker address is required".to_owned(),
            ));
        }

        if config.read_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "read timeout must be greater than zero".to_owned(),
            ));
        }

        Ok(config)
    }

    /// Adds broker addresses, each entry may itself be a comma separated list
    pub fn addrs<I, S>(&mut self, values: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let addrs = self.addrs.get_or_insert(Vec::new());
        for value in values {
            addrs.extend(
                value
                    .as_ref()
                    .split(',')
                    .map(str::trim)
                    .filter(|addr| !addr.is_empty())
                    .map(str::to_owned),
            );
        }
        self
    }
}

/// Describes whether or not to use TLS and how
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tls_policy")]
pub enum TlsPolicy {
    /// Do not use TLS
    #[default]
    #[serde(rename = "disabled", alias = "disable")]
    Disabled,
    /// Use TLS with a client certificate and a CA to verify the brokers
    #[serde(rename = "verified", alias = "verify")]
    Verified(TlsPaths),
}

impl TlsPolicy {
    /// Reads the certificate paths from the environment.
    ///
    /// TLS is only enabled when all three variables are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |var| lookup(var).filter(|value| !value.is_empty());
        let (Some(cert), Some(key), Some(ca_cert)) = (
            read(CERT_FILE_ENV),
            read(KEY_FILE_ENV),
            read(CA_CERT_FILE_ENV),
        ) else {
            debug!("tls disabled, certificate variables not set");
            return Ok(Self::Disabled);
        };

        let paths = TlsPaths {
            cert: cert.into(),
            key: key.into(),
            ca_cert: ca_cert.into(),
        };
        paths.validate()?;
        Ok(Self::Verified(paths))
    }
}

impl From<TlsPaths> for TlsPolicy {
    fn from(paths: TlsPaths) -> Self {
        Self::Verified(paths)
    }
}

/// TLS config with paths to PEM encoded keys and certs
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct TlsPaths {
    /// Path to client certificate
    pub cert: PathBuf,
    /// Path to client private key
    pub key: PathBuf,
    /// Path to CA certificate used to verify the brokers
    pub ca_cert: PathBuf,
}

impl TlsPaths {
    fn validate(&self) -> Result<(), ConfigError> {
        for (var, path) in [
            (CERT_FILE_ENV, &self.cert),
            (KEY_FILE_ENV, &self.key),
            (CA_CERT_FILE_ENV, &self.ca_cert),
        ] {
            if !path.exists() {
                return Err(ConfigError::MissingTlsFile {
                    var,
                    path: path.clone(),
                });
            }
        }
        Ok(())
    }
}
