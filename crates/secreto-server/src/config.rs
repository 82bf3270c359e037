use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, bail};
use secreto_core::DrawStrategy;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Sqlite,
    Memory,
}

#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub name: String,
    pub phone: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub store: StoreKind,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub strategy: DrawStrategy,
    pub admin: Option<AdminSeed>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let jwt_secret = get("SECRETO_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("SECRETO_JWT_SECRET is unset or still a placeholder");
        }

        let host = var("SECRETO_HOST", "0.0.0.0");
        let port: u16 = var("SECRETO_PORT", "3000")
            .parse()
            .context("SECRETO_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", host, port))?;

        let store = match var("SECRETO_STORE", "sqlite").to_ascii_lowercase().as_str() {
            "sqlite" => StoreKind::Sqlite,
            "memory" => StoreKind::Memory,
            other => bail!("unknown SECRETO_STORE '{}' (expected sqlite or memory)", other),
        };

        let strategy: DrawStrategy = var("SECRETO_DRAW_STRATEGY", "cycle")
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))?;

        let admin = match (get("SECRETO_ADMIN_PHONE"), get("SECRETO_ADMIN_PASSWORD")) {
            (Some(phone), Some(password)) => Some(AdminSeed {
                name: var("SECRETO_ADMIN_NAME", "Administrador"),
                phone,
                password,
            }),
            _ => None,
        };

        Ok(Self {
            addr,
            store,
            db_path: var("SECRETO_DB_PATH", "secreto.db").into(),
            jwt_secret,
            strategy,
            admin,
        })
    }
}
