use std::env;

use chrono::FixedOffset;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub postgrest_url: String,
    pub postgrest_api_key: String,
    pub jwt_secret: String,
    /// Process-wide clinic time zone as a UTC offset string, e.g. "-05:00".
    /// Empty or unparsable values degrade to unzoned date handling.
    pub time_zone_offset: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            postgrest_url: env::var("POSTGREST_URL")
                .unwrap_or_else(|_| {
                    warn!("POSTGREST_URL not set, using empty value");
                    String::new()
                }),
            postgrest_api_key: env::var("POSTGREST_API_KEY")
                .unwrap_or_else(|_| {
                    warn!("POSTGREST_API_KEY not set, using empty value");
                    String::new()
                }),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("JWT_SECRET not set, using empty value");
                    String::new()
                }),
            time_zone_offset: env::var("TIME_ZONE_OFFSET")
                .unwrap_or_else(|_| {
                    warn!("TIME_ZONE_OFFSET not set, date windows will be unzoned");
                    String::new()
                }),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.postgrest_url.is_empty()
            && !self.postgrest_api_key.is_empty()
            && !self.jwt_secret.is_empty()
    }

    /// Parse the configured offset. `None` means queries fall back to an
    /// unzoned interpretation of date boundaries.
    pub fn time_zone(&self) -> Option<FixedOffset> {
        parse_offset(&self.time_zone_offset)
    }
}

fn parse_offset(value: &str) -> Option<FixedOffset> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let (sign, rest) = match value.as_bytes()[0] {
        b'+' => (1i32, &value[1..]),
        b'-' => (-1i32, &value[1..]),
        _ => (1i32, value),
    };

    let mut parts = rest.splitn(2, ':');
    let hours: i32 = parts.next()?.parse().ok()?;
    let minutes: i32 = parts.next().unwrap_or("0").parse().ok()?;
    if hours > 14 || minutes > 59 {
        warn!("TIME_ZONE_OFFSET {} is out of range, ignoring", value);
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
