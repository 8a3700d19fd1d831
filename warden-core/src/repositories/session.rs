use async_trait::async_trait;

use crate::{
    Error,
    session::{Session, SessionId},
};

/// Repository for session data access
#[async_trait]
pub trait SessionRepository: Send + Sync + 'static {
    /// Create a new session
    async fn create(&self, session: Session) -> Result<Session, Error>;

    /// Find a session by id, expired or not
    async fn find_by_id(&self, id: &SessionId) -> Result<Option<Session>, Error>;

    /// Delete a session by id. Deleting an unknown id is not an error.
    async fn delete(&self, id: &SessionId) -> Result<(), Error>;
}
