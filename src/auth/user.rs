use async_session::async_trait;
use axum_login::{AuthUser, AuthnBackend, UserId};
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::Deserialize;
use tokio::task;
use tracing::debug;

use super::password::{PasswordError, verify_password};
use crate::club::{ClubError, members::find_by_login};
use crate::entities::member;

impl AuthUser for member::Model {
    type Id = i32;

    fn id(&self) -> Self::Id {
        self.id
    }

    // Changing the password invalidates existing sessions.
    fn session_auth_hash(&self) -> &[u8] {
        self.password_hash.as_deref().unwrap_or_default().as_bytes()
    }
}

#[derive(Clone, Deserialize)]
pub struct Credentials {
    /// DNI or email
    pub login: String,
    pub password: String,
    pub next: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("next", &self.next)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error(transparent)]
    Seaorm(sea_orm::DbErr),

    #[error(transparent)]
    Club(ClubError),

    #[error(transparent)]
    TaskJoin(#[from] task::JoinError),

    #[error(transparent)]
    Password(#[from] PasswordError),
}

#[derive(Debug, Clone)]
pub struct Backend {
    db: DatabaseConnection,
}

impl Backend {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AuthnBackend for Backend {
    type User = member::Model;
    type Credentials = Credentials;
    type Error = BackendError;

    async fn authenticate(
        &self,
        creds: Self::Credentials,
    ) -> Result<Option<Self::User>, Self::Error> {
        let member = find_by_login(&self.db, &creds.login)
            .await
            .map_err(Self::Error::Club)?;

        // Dependents have no credentials and can never log in.
        let Some((member, hash)) =
            member.and_then(|m| m.password_hash.clone().map(|hash| (m, hash)))
        else {
            debug!("Unknown login");
            return Ok(None);
        };

        // Argon2 verification blocks.
        let password = creds.password;
        let valid = task::spawn_blocking(move || verify_password(&password, &hash)).await??;
        Ok(valid.then_some(member))
    }

    async fn get_user(&self, user_id: &UserId<Self>) -> Result<Option<Self::User>, Self::Error> {
        member::Entity::find_by_id(*user_id)
            .one(&self.db)
            .await
            .map_err(Self::Error::Seaorm)
    }
}

pub type AuthSession = axum_login::AuthSession<Backend>;
