use std::{
    collections::HashMap,
    fs::read_to_string,
    net::{IpAddr, Ipv4Addr},
    str::FromStr,
};

use anyhow::{Result, ensure};
use clap::Parser;
use serde::Deserialize;

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct Server {
    ///
    /// bind address
    ///
    /// The address both UDP sockets are bound to. The binding address
    /// supports ipv4; one process serves one address.
    ///
    #[serde(default = "Server::bind")]
    pub bind: IpAddr,
    ///
    /// authentication port
    ///
    /// The UDP port for Access-Request and Status-Server handling.
    ///
    #[serde(default = "Server::auth_port")]
    pub auth_port: u16,
    ///
    /// accounting port
    ///
    /// The UDP port for Accounting-Request handling.
    ///
    #[serde(default = "Server::acct_port")]
    pub acct_port: u16,
}

impl Server {
    fn bind() -> IpAddr {
        IpAddr::V4(Ipv4Addr::UNSPECIFIED)
    }

    fn auth_port() -> u16 {
        1812
    }

    fn acct_port() -> u16 {
        1813
    }
}

impl Default for Server {
    fn default() -> Self {
        Self {
            bind: Self::bind(),
            auth_port: Self::auth_port(),
            acct_port: Self::acct_port(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(match value {
            "trace" => Self::Trace,
            "debug" => Self::Debug,
            "info" => Self::Info,
            "warn" => Self::Warn,
            "error" => Self::Error,
            _ => return Err(format!("unknown log level: {value}")),
        })
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Info
    }
}

impl LogLevel {
    pub fn as_level(&self) -> log::Level {
        match *self {
            Self::Error => log::Level::Error,
            Self::Debug => log::Level::Debug,
            Self::Trace => log::Level::Trace,
            Self::Warn => log::Level::Warn,
            Self::Info => log::Level::Info,
        }
    }
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct Log {
    ///
    /// log level
    ///
    /// An enum representing the available verbosity levels of the logger.
    ///
    #[serde(default)]
    pub level: LogLevel,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct Auth {
    ///
    /// static user password
    ///
    /// This option can be used to specify the static identity
    /// authentication information the built-in observer checks
    /// Access-Requests against. Deployments with an external backend
    /// leave this table empty and register their own handler.
    ///
    #[serde(default)]
    pub static_credentials: HashMap<String, String>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub server: Server,
    ///
    /// client registry
    ///
    /// Source IP address to shared secret. Datagrams from addresses
    /// not in this table are dropped.
    ///
    #[serde(default)]
    pub clients: HashMap<String, String>,
    #[serde(default)]
    pub auth: Auth,
    #[serde(default)]
    pub log: Log,
    ///
    /// extra dictionaries
    ///
    /// Paths of additional dictionary files loaded after the embedded
    /// set, in order.
    ///
    #[serde(default)]
    pub dictionaries: Vec<String>,
}

#[derive(Parser, Debug)]
#[command(
    about = env!("CARGO_PKG_DESCRIPTION"),
    version = env!("CARGO_PKG_VERSION"),
)]
struct Cli {
    ///
    /// Specify the configuration file path
    ///
    /// Example: radius-server --config /etc/radius-server/config.toml
    ///
    #[arg(long, short)]
    config: Option<String>,
}

impl Config {
    ///
    /// Load configure from config file and command line parameters.
    ///
    /// Load command line parameters, if the configuration file path is
    /// specified, the configuration is read from the configuration file,
    /// otherwise the default configuration is used.
    ///
    pub fn load() -> Result<Self> {
        let config = match Cli::parse().config {
            Some(path) => toml::from_str::<Self>(&read_to_string(&path)?)?,
            None => Self::default(),
        };

        ensure!(config.server.auth_port > 0, "auth-port must be in 1..=65535");
        ensure!(config.server.acct_port > 0, "acct-port must be in 1..=65535");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::Config;

    #[test]
    fn test_defaults() {
        let config: Config = toml::from_str("").unwrap();

        assert_eq!(config.server.auth_port, 1812);
        assert_eq!(config.server.acct_port, 1813);
        assert!(config.clients.is_empty());
        assert!(config.auth.static_credentials.is_empty());
        assert!(config.dictionaries.is_empty());
    }

    #[test]
    fn test_full_file() {
        let config: Config = toml::from_str(
            "dictionaries = [\"/etc/radius-server/dictionary.local\"]\n\
             \n\
             [server]\n\
             bind = \"127.0.0.1\"\n\
             auth-port = 11812\n\
             acct-port = 11813\n\
             \n\
             [clients]\n\
             \"10.0.0.1\" = \"testing123\"\n\
             \n\
             [auth.static-credentials]\n\
             alice = \"mypass\"\n\
             \n\
             [log]\n\
             level = \"debug\"\n",
        )
        .unwrap();

        assert_eq!(config.server.bind.to_string(), "127.0.0.1");
        assert_eq!(config.server.auth_port, 11812);
        assert_eq!(config.clients.get("10.0.0.1").map(String::as_str), Some("testing123"));
        assert_eq!(
            config.auth.static_credentials.get("alice").map(String::as_str),
            Some("mypass")
        );
        assert_eq!(config.dictionaries.len(), 1);
    }
}
