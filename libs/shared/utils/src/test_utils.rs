use std::sync::Arc;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;

/// Reminder service settings for tests, with a secret long enough for HS256.
pub struct TestConfig {
    pub jwt_secret: String,
    pub sweep_interval_seconds: u64,
    pub native_notifications: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            sweep_interval_seconds: 900,
            native_notifications: "granted".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_jwt_secret: self.jwt_secret.clone(),
            reminder_sweep_interval_seconds: self.sweep_interval_seconds,
            reminder_native_notifications: self.native_notifications.clone(),
            ..AppConfig::default()
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

/// Caller identity that can mint its own bearer tokens.
pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl TestUser {
    fn with_role(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn patient(email: &str) -> Self {
        Self::with_role(email, "patient")
    }

    pub fn doctor(email: &str) -> Self {
        Self::with_role(email, "doctor")
    }

    /// Pins the id, e.g. to match the `patient_id` of a reminder.
    pub fn with_id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    pub fn token(&self, secret: &str) -> String {
        self.token_expiring_in(secret, Duration::hours(24))
    }

    /// A negative duration yields an already expired token.
    pub fn token_expiring_in(&self, secret: &str, lifetime: Duration) -> String {
        let now = Utc::now();
        sign_claims(
            &json!({
                "sub": self.id,
                "email": self.email,
                "role": self.role,
                "iat": now.timestamp(),
                "exp": (now + lifetime).timestamp()
            }),
            secret,
        )
    }
}

/// Encodes `claims` as an HS256 JWT signed with `secret`.
pub fn sign_claims(claims: &Value, secret: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(json!({ "alg": "HS256", "typ": "JWT" }).to_string());
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    let signing_input = format!("{}.{}", header, payload);

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    format!("{}.{}", signing_input, signature)
}
