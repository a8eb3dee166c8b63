use std::env;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_jwt_secret: String,
    pub port: u16,
    pub reminder_sweep_interval_seconds: u64,
    pub reminder_event_capacity: usize,
    pub reminder_native_notifications: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_jwt_secret: String::new(),
            port: 3000,
            reminder_sweep_interval_seconds: 900,
            reminder_event_capacity: 256,
            reminder_native_notifications: "default".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let config = Self {
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            port: parse_or_default("PORT", defaults.port),
            reminder_sweep_interval_seconds: parse_or_default(
                "REMINDER_SWEEP_INTERVAL_SECONDS",
                defaults.reminder_sweep_interval_seconds,
            ),
            reminder_event_capacity: parse_or_default(
                "REMINDER_EVENT_CAPACITY",
                defaults.reminder_event_capacity,
            ),
            reminder_native_notifications: env::var("REMINDER_NATIVE_NOTIFICATIONS")
                .unwrap_or_else(|_| {
                    warn!("REMINDER_NATIVE_NOTIFICATIONS not set, using default");
                    defaults.reminder_native_notifications.clone()
                }),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_jwt_secret.is_empty()
    }
}

fn parse_or_default<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", key, raw, default);
            default
        }),
        Err(_) => {
            warn!("{} not set, using default {}", key, default);
            default
        }
    }
}
