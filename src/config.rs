use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "inkpost", about = "A small blog REST backend")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Directory for uploaded avatars (defaults to <data-dir>/uploads)
    #[arg(long)]
    pub uploads_dir: Option<PathBuf>,
}

/// Resolved configuration. File values come from `config.toml` in the data
/// directory; CLI flags win over the file. Paths left unset resolve under
/// the data directory.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,

    #[serde(skip)]
    data_dir: PathBuf,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file; defaults to <data-dir>/inkpost.db
    pub db_file: Option<PathBuf>,
    /// Avatar upload directory; defaults to <data-dir>/uploads
    pub uploads_dir: Option<PathBuf>,
    /// Cache-Control max-age for served avatars, in seconds
    pub cache_max_age_secs: u32,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub cookie_name: String,
    pub session_hours: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_file: None,
            uploads_dir: None,
            cache_max_age_secs: 86_400,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie_name: "inkpost_session".to_string(),
            session_hours: 720,
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli);
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config: Config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };
        config.data_dir = data_dir;

        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }
        if let Some(ref uploads_dir) = cli.uploads_dir {
            config.storage.uploads_dir = Some(uploads_dir.clone());
        }

        Ok(config)
    }

    /// Test constructor: everything defaulted, paths rooted at `data_dir`.
    pub fn for_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    pub fn data_dir(cli: &Cli) -> PathBuf {
        cli.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .expect("Could not determine home directory")
                .join(".inkpost")
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.storage
            .db_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join("inkpost.db"))
    }

    pub fn uploads_path(&self) -> PathBuf {
        self.storage
            .uploads_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("uploads"))
    }
}
