use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::{
    Error,
    repositories::SessionRepository,
    session::{Session, SessionId},
    user::UserId,
};

/// Service for issuing, looking up and ending sessions
pub struct SessionService<S: SessionRepository> {
    repository: Arc<S>,
}

impl<S: SessionRepository> SessionService<S> {
    pub fn new(repository: Arc<S>) -> Self {
        Self { repository }
    }

    /// Issue and persist a session for `user_id` that expires at `now + ttl`
    pub async fn create_session(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Session, Error> {
        let session = Session::issue(user_id.clone(), now, ttl)?;
        self.repository.create(session).await
    }

    /// The session behind `id` if it exists and has not expired at `now`
    pub async fn get_valid_session(
        &self,
        id: &SessionId,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, Error> {
        let Some(session) = self.repository.find_by_id(id).await? else {
            return Ok(None);
        };

        if !session.is_valid_at(now) {
            tracing::debug!(user_id = %session.user_id, "Session expired");
            return Ok(None);
        }

        Ok(Some(session))
    }

    /// End a session. Unknown ids are ignored.
    pub async fn delete_session(&self, id: &SessionId) -> Result<(), Error> {
        self.repository.delete(id).await
    }
}
