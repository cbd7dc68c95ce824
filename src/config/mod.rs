use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub recycle: RecycleConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecycleConfig {
    /// Tables whose entries may be captured and restored
    pub restorable_tables: Vec<String>,
    pub page_sizes: Vec<i64>,
    pub default_page_size: i64,
    pub preview_length: usize,
    pub backend: StorageBackend,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub enable_cors: bool,
}

impl Default for RecycleConfig {
    fn default() -> Self {
        Self {
            restorable_tables: vec![
                "resolutions".to_string(),
                "ordinances".to_string(),
                "minutes".to_string(),
            ],
            page_sizes: vec![10, 25, 50, 100],
            default_page_size: 10,
            preview_length: 100,
            backend: StorageBackend::Postgres,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Database overrides
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Recycle bin overrides
        if let Ok(v) = env::var("RECYCLE_RESTORABLE_TABLES") {
            self.recycle.restorable_tables = parse_list(&v);
        }
        if let Ok(v) = env::var("RECYCLE_PAGE_SIZES") {
            let sizes: Vec<i64> = parse_list(&v).iter().filter_map(|s| s.parse().ok()).filter(|n| *n > 0).collect();
            if !sizes.is_empty() {
                self.recycle.page_sizes = sizes;
            }
        }
        if let Ok(v) = env::var("RECYCLE_DEFAULT_PAGE_SIZE") {
            self.recycle.default_page_size = v.parse().unwrap_or(self.recycle.default_page_size);
        }
        if let Ok(v) = env::var("RECYCLE_PREVIEW_LENGTH") {
            self.recycle.preview_length = v.parse().unwrap_or(self.recycle.preview_length);
        }
        if let Ok(v) = env::var("RECYCLE_BACKEND") {
            self.recycle.backend = match v.trim().to_ascii_lowercase().as_str() {
                "memory" => StorageBackend::Memory,
                "postgres" | "postgresql" => StorageBackend::Postgres,
                other => {
                    tracing::warn!("Unknown RECYCLE_BACKEND {:?}, keeping {:?}", other, self.recycle.backend);
                    self.recycle.backend
                }
            };
        }

        // API overrides
        if let Some(port) = env::var("RECYCLE_API_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.api.port = port;
        }
        if let Ok(v) = env::var("API_ENABLE_CORS") {
            self.api.enable_cors = v.parse().unwrap_or(self.api.enable_cors);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                max_connections: 10,
                connection_timeout: 30,
            },
            recycle: RecycleConfig::default(),
            api: ApiConfig {
                port: 3000,
                enable_cors: true,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                max_connections: 20,
                connection_timeout: 10,
            },
            recycle: RecycleConfig::default(),
            api: ApiConfig {
                port: 3000,
                enable_cors: true,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                max_connections: 50,
                connection_timeout: 5,
            },
            recycle: RecycleConfig {
                preview_length: 80,
                ..RecycleConfig::default()
            },
            api: ApiConfig {
                port: 3000,
                enable_cors: false,
            },
        }
    }
}

fn parse_list(v: &str) -> Vec<String> {
    v.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
