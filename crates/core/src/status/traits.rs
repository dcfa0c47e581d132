use async_trait::async_trait;

use super::model::DatabaseHealth;
use crate::errors::Result;

/// Health probe for the persistence layer.
///
/// Implemented by the storage crate. An `Err` is reported as a disconnected
/// database; it never fails the status request.
#[async_trait]
pub trait DatabaseProbe: Send + Sync {
    async fn probe(&self) -> Result<DatabaseHealth>;
}
