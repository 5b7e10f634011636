// src/config.rs

use dotenvy::dotenv;
use std::env;

/// Total violations that terminate an active session.
pub const MAX_VIOLATIONS: u32 = 5;

/// Tab-switch class violations that terminate an active session.
pub const MAX_TAB_SWITCHES: u32 = 3;

/// Pointer-leave events tolerated before they count as a violation.
pub const POINTER_LEAVE_LIMIT: u32 = 5;

/// How long the on-screen violation warning stays up before auto-dismissing.
pub const WARNING_DISMISS_SECS: u64 = 4;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://testportal.db".to_string());

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Self {
            database_url,
            bind_addr,
            rust_log,
        }
    }
}
