use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, sqlx::PgPool};
use tracing::info;

use crate::club::{
    ClubError,
    members::{NewMember, find_by_dni, register_member},
};
use crate::config::AdminBootstrap;
use crate::entities::member::{self, Role};

/// Connects and brings the schema up to date.
pub async fn connect(db_url: &str) -> anyhow::Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(db_url);
    options
        .connect_timeout(Duration::from_secs(8))
        .sqlx_logging(false);
    // Every connection to an in-memory SQLite URL opens its own database.
    if db_url.contains(":memory:") {
        options.max_connections(1).min_connections(1);
    }

    let db = Database::connect(options)
        .await
        .context("Cannot connect to db")?;
    Migrator::up(&db, None)
        .await
        .context("Failed to run migrations")?;
    Ok(db)
}

pub async fn setup_database(db_url: &str) -> anyhow::Result<(DatabaseConnection, PgPool)> {
    let db = connect(db_url).await?;
    let pool = PgPool::connect(db_url).await?;
    Ok((db, pool))
}

/// Creates the configured SUPER_ADMIN unless that DNI is already registered.
pub async fn bootstrap_admin(
    db: &DatabaseConnection,
    admin: &AdminBootstrap,
) -> anyhow::Result<Option<member::Model>> {
    if find_by_dni(db, admin.dni.trim()).await?.is_some() {
        return Ok(None);
    }

    let input = NewMember {
        dni: admin.dni.clone(),
        name: "Administrador".to_string(),
        // Only needs to clear the age gate.
        birth_date: Utc::now().date_naive() - chrono::Duration::days(365 * 30),
        email: Some(admin.email.clone()),
        phone: None,
        password: Some(admin.password.clone()),
    };
    match register_member(db, input, Role::SuperAdmin, Utc::now().date_naive()).await {
        Ok(created) => {
            info!(member_id = created.id, "Bootstrapped super admin");
            Ok(Some(created))
        }
        Err(ClubError::DuplicateIdentity { .. }) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
