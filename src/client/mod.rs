pub mod http;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::MigrationError;

/// Status and decoded body of a create or delete call.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Read capability shared by both environments.
#[async_trait]
pub trait EnvironmentClient: Send + Sync {
    fn name(&self) -> &str;
    /// Fetch one page of a collection. `page` is the token taken from a previous `next_page` cursor.
    async fn list(&self, path: &str, page: Option<&str>) -> Result<Value, MigrationError>;
    async fn get(&self, path: &str) -> Result<Value, MigrationError>;
}

/// Write capability. Only the target environment's client implements this, so
/// the source can never be handed to code that mutates.
#[async_trait]
pub trait MutableEnvironment: EnvironmentClient {
    async fn create(&self, path: &str, body: Value) -> Result<ApiResponse, MigrationError>;
    async fn delete(&self, path: &str) -> Result<ApiResponse, MigrationError>;
}
