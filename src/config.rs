use std::env;
use std::str::FromStr;

use anyhow::Context;

use crate::club::billing::{FeeSchedule, MAX_BASE_PRICE};

/// Credentials for the SUPER_ADMIN created on first start.
#[derive(Clone)]
pub struct AdminBootstrap {
    pub dni: String,
    pub email: String,
    pub password: String,
}

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub rust_log: String,
    pub bind_addr: String,
    pub fees: FeeSchedule,
    pub cuota_due_day: u32,
    pub notify_webhook_url: Option<String>,
    pub admin: Option<AdminBootstrap>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        // A missing .env is fine; the variables may come from the environment.
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "debug".into());
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

        let defaults = FeeSchedule::default();
        let fees = FeeSchedule {
            base_price: parse_or("BASE_MONTHLY_FEE", defaults.base_price)?,
            family_discount_percent: parse_or(
                "FAMILY_DISCOUNT_PERCENT",
                defaults.family_discount_percent,
            )?,
        };
        anyhow::ensure!(
            (0..=MAX_BASE_PRICE).contains(&fees.base_price),
            "BASE_MONTHLY_FEE must be between 0 and {MAX_BASE_PRICE}"
        );
        anyhow::ensure!(
            fees.family_discount_percent <= 100,
            "FAMILY_DISCOUNT_PERCENT must be between 0 and 100"
        );

        let cuota_due_day = parse_or("CUOTA_DUE_DAY", 10)?;
        anyhow::ensure!(
            (1..=31).contains(&cuota_due_day),
            "CUOTA_DUE_DAY must be between 1 and 31"
        );

        let notify_webhook_url = optional("NOTIFY_WEBHOOK_URL");

        let admin = match (
            optional("ADMIN_DNI"),
            optional("ADMIN_EMAIL"),
            optional("ADMIN_PASSWORD"),
        ) {
            (Some(dni), Some(email), Some(password)) => Some(AdminBootstrap {
                dni,
                email,
                password,
            }),
            (None, None, None) => None,
            _ => anyhow::bail!("ADMIN_DNI, ADMIN_EMAIL and ADMIN_PASSWORD must be set together"),
        };

        Ok(Self {
            database_url,
            rust_log,
            bind_addr,
            fees,
            cuota_due_day,
            notify_webhook_url,
            admin,
        })
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        None => Ok(default),
    }
}
