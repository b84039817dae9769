use tracing::{info, warn};

use crate::domain::model::session::{AuthToken, Credentials, Registration, Session};
use crate::domain::repository::{AuthGrant, BookApi, SessionRepository};

use super::error::AppError;

/// セッションの唯一の所有者。読み書き・破棄はすべてここを経由する。
pub struct SessionService<R: SessionRepository> {
    repo: R,
}

impl<R: SessionRepository> SessionService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// 永続ストレージから読み直したスナップショット。
    pub fn snapshot(&self) -> Result<Session, AppError> {
        self.repo
            .load()
            .map_err(|e| AppError::Storage(Box::new(e)))
    }

    /// ルートガード用。読めなければ匿名として扱う。
    pub fn snapshot_or_anonymous(&self) -> Session {
        self.snapshot().unwrap_or_else(|e| {
            warn!(error = %e, "failed to read session; treating as signed out");
            Session::default()
        })
    }

    pub fn token(&self) -> Option<AuthToken> {
        self.snapshot_or_anonymous().token
    }

    pub async fn sign_in<A: BookApi>(
        &self,
        api: &A,
        credentials: &Credentials,
    ) -> Result<Session, AppError> {
        let grant = api.sign_in(credentials).await?;
        let session = self.store(grant)?;
        info!("signed in");
        Ok(session)
    }

    pub async fn sign_up<A: BookApi>(
        &self,
        api: &A,
        registration: &Registration,
    ) -> Result<Session, AppError> {
        let grant = api.sign_up(registration).await?;
        let session = self.store(grant)?;
        info!("signed up");
        Ok(session)
    }

    pub fn sign_out(&self) -> Result<(), AppError> {
        self.repo
            .clear()
            .map_err(|e| AppError::Storage(Box::new(e)))?;
        info!("signed out");
        Ok(())
    }

    // --- private ---

    fn store(&self, grant: AuthGrant) -> Result<Session, AppError> {
        let session = Session::signed_in(grant.token, grant.user);
        self.repo
            .save(&session)
            .map_err(|e| AppError::Storage(Box::new(e)))?;
        Ok(session)
    }
}
