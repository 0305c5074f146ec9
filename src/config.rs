//! Environment-driven configuration, read once at start-up.

use std::{collections::HashMap, env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use anyhow::{anyhow, bail, Context};
use rand::Rng;
use tracing::info;

use crate::domain::aggregates::Pricing;

const DEFAULT_PORT: u16 = 8083;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
const PAYFAST_SANDBOX_URL: &str = "https://sandbox.payfast.co.za/eng/process";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend { Postgres, Memory }

impl FromStr for StoreBackend {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(anyhow!("unknown store backend '{other}'")),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct PayFastConfig {
    pub merchant_id: String,
    pub merchant_key: String,
    pub passphrase: String,
    pub process_url: String,
}

impl PayFastConfig {
    pub fn is_configured(&self) -> bool {
        !self.merchant_id.is_empty() && !self.merchant_key.is_empty() && !self.passphrase.is_empty()
    }
}

/// Random delay window for the simulated payment verification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VerificationDelay { pub min: Duration, pub max: Duration }

impl VerificationDelay {
    pub fn sample(&self) -> Duration {
        if self.max <= self.min { return self.min; }
        rand::thread_rng().gen_range(self.min..=self.max)
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub store: StoreBackend,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub nats_url: Option<String>,
    pub mail_subject: String,
    pub store_email: String,
    pub site_url: String,
    pub free_shipping_threshold: i64,
    pub delivery_charge: i64,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub verify_delay_min_secs: u64,
    pub verify_delay_max_secs: u64,
    pub admin_password: String,
    pub jwt_secret: String,
    pub admin_token_ttl_secs: u64,
    pub payfast: PayFastConfig,
    pub notification_queue_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            store: StoreBackend::Postgres,
            database_url: None,
            database_max_connections: 10,
            nats_url: None,
            mail_subject: "storefront.mail".into(),
            store_email: "orders@example.com".into(),
            site_url: "http://localhost:3000".into(),
            free_shipping_threshold: 7000,
            delivery_charge: 250,
            upload_dir: PathBuf::from("./uploads/payments"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            verify_delay_min_secs: 10,
            verify_delay_max_secs: 30,
            admin_password: String::new(),
            jwt_secret: String::new(),
            admin_token_ttl_secs: 24 * 3600,
            payfast: PayFastConfig { process_url: PAYFAST_SANDBOX_URL.into(), ..PayFastConfig::default() },
            notification_queue_capacity: 256,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok().filter(|v| !v.trim().is_empty()))
    }

    pub fn from_map(vars: &HashMap<&str, &str>) -> anyhow::Result<Self> {
        Self::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let d = Self::default();
        let config = Self {
            port: parse_or(&var, "PORT", d.port)?,
            store: parse_or(&var, "STORE", d.store)?,
            database_url: var("DATABASE_URL"),
            database_max_connections: parse_or(&var, "DATABASE_MAX_CONNECTIONS", d.database_max_connections)?,
            nats_url: var("NATS_URL"),
            mail_subject: var("MAIL_SUBJECT").unwrap_or(d.mail_subject),
            store_email: var("STORE_EMAIL").unwrap_or(d.store_email),
            site_url: var("SITE_URL").unwrap_or(d.site_url).trim_end_matches('/').to_string(),
            free_shipping_threshold: parse_or(&var, "FREE_SHIPPING_THRESHOLD", d.free_shipping_threshold)?,
            delivery_charge: parse_or(&var, "DELIVERY_CHARGE", d.delivery_charge)?,
            upload_dir: var("UPLOAD_DIR").map(PathBuf::from).unwrap_or(d.upload_dir),
            max_upload_bytes: parse_or(&var, "MAX_UPLOAD_BYTES", d.max_upload_bytes)?,
            verify_delay_min_secs: parse_or(&var, "VERIFY_DELAY_MIN_SECS", d.verify_delay_min_secs)?,
            verify_delay_max_secs: parse_or(&var, "VERIFY_DELAY_MAX_SECS", d.verify_delay_max_secs)?,
            admin_password: var("ADMIN_PASSWORD").context("ADMIN_PASSWORD must be set")?,
            jwt_secret: var("JWT_SECRET").context("JWT_SECRET must be set")?,
            admin_token_ttl_secs: parse_or(&var, "ADMIN_TOKEN_TTL_SECS", d.admin_token_ttl_secs)?,
            payfast: PayFastConfig {
                merchant_id: var("PAYFAST_MERCHANT_ID").unwrap_or_default(),
                merchant_key: var("PAYFAST_MERCHANT_KEY").unwrap_or_default(),
                passphrase: var("PAYFAST_PASSPHRASE").unwrap_or_default(),
                process_url: var("PAYFAST_PROCESS_URL").unwrap_or(d.payfast.process_url),
            },
            notification_queue_capacity: parse_or(&var, "NOTIFICATION_QUEUE_CAPACITY", d.notification_queue_capacity)?,
        };
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> anyhow::Result<()> {
        if self.store == StoreBackend::Postgres && self.database_url.is_none() {
            bail!("DATABASE_URL must be set when STORE=postgres");
        }
        if self.verify_delay_min_secs > self.verify_delay_max_secs {
            bail!("VERIFY_DELAY_MIN_SECS must not exceed VERIFY_DELAY_MAX_SECS");
        }
        if self.jwt_secret.len() < 32 {
            bail!("JWT_SECRET must be at least 32 characters");
        }
        if self.notification_queue_capacity == 0 {
            bail!("NOTIFICATION_QUEUE_CAPACITY must be positive");
        }
        Ok(())
    }

    pub fn pricing(&self) -> Pricing {
        Pricing { free_shipping_threshold: self.free_shipping_threshold, delivery_charge: self.delivery_charge }
    }

    pub fn verification_delay(&self) -> VerificationDelay {
        VerificationDelay {
            min: Duration::from_secs(self.verify_delay_min_secs),
            max: Duration::from_secs(self.verify_delay_max_secs),
        }
    }
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match var(key) {
        Some(raw) => raw.trim().parse().map_err(|e| anyhow!("invalid {key} value '{raw}': {e}")),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

impl Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self { Self::Postgres => "postgres", Self::Memory => "memory" })
    }
}
