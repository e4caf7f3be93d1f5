//! ModelGateway trait definition

use async_trait::async_trait;

use super::{GatewayError, Message, Reply};

/// Contract between the session loop and the inference endpoint
///
/// One call sends the full history plus the static tool catalog and returns
/// the parsed top choice. Implementations never retry; retry policy belongs
/// to the session.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Request the next reply for `history`
    async fn complete(&self, history: &[Message]) -> Result<Reply, GatewayError>;
}
