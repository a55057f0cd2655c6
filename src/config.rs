// src/config.rs

use std::{env, fmt::Display, str::FromStr};

use dotenvy::dotenv;

/// Label stored for students who are not on any team.
pub const UNASSIGNED_TEAM: &str = "unassigned";

/// Number of rows returned by the "recent practice logs" feed.
pub const RECENT_LOGS_LIMIT: i64 = 10;

/// Number of rows returned by the "recent exam results" feed.
pub const RECENT_RESULTS_LIMIT: i64 = 15;

/// Longest accepted session lifetime: one year.
pub const MAX_SESSION_SECS: u64 = 366 * 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Session lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub admin_handle: Option<String>,
    pub admin_password: Option<String>,
    /// The two teams competing in the weekly battle.
    pub team_a: String,
    pub team_b: String,
    /// Students need strictly more than this many questions to appear on the weekly accuracy board.
    pub accuracy_min_volume: i64,
    pub leaderboard_limit: usize,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Self {
            database_url,
            jwt_secret,
            jwt_expiration: check_session_lifetime(try_load("JWT_EXPIRATION", "86400"))
                .unwrap_or_else(|e| panic!("Invalid JWT_EXPIRATION value: {e}")),
            rust_log,
            admin_handle: env::var("ADMIN_HANDLE").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
            team_a: try_load("TEAM_A", "Alpha"),
            team_b: try_load("TEAM_B", "Omega"),
            accuracy_min_volume: try_load("ACCURACY_MIN_VOLUME", "20"),
            leaderboard_limit: try_load("LEADERBOARD_LIMIT", "10"),
            port: try_load("PORT", "3000"),
        }
    }

    /// True when `label` is one of the configured teams or the unassigned sentinel.
    pub fn is_valid_team(&self, label: &str) -> bool {
        label == UNASSIGNED_TEAM || label == self.team_a || label == self.team_b
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .unwrap_or_else(|e| panic!("Invalid {key} value: {e}"))
}

/// Session lifetimes must be positive and at most [`MAX_SESSION_SECS`].
pub fn check_session_lifetime(secs: u64) -> Result<u64, String> {
    if secs == 0 {
        return Err("session lifetime must be at least one second".to_string());
    }
    if secs > MAX_SESSION_SECS {
        return Err(format!(
            "session lifetime of {secs}s exceeds the maximum of {MAX_SESSION_SECS}s"
        ));
    }
    Ok(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_lifetime_bounds() {
        assert_eq!(check_session_lifetime(86400), Ok(86400));
        assert_eq!(check_session_lifetime(MAX_SESSION_SECS), Ok(MAX_SESSION_SECS));
        assert!(check_session_lifetime(0).is_err());
        assert!(check_session_lifetime(MAX_SESSION_SECS + 1).is_err());
        assert!(check_session_lifetime(u64::MAX).is_err());
    }
}
