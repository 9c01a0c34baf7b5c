//! HTTP server bootstrap.

use std::net::SocketAddr;

use crate::api::router::api_router;
use crate::api::types::ApiContext;

/// Bind and serve the API until the process is stopped.
pub async fn serve(ctx: ApiContext, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    tracing::info!(%local, "API server listening");
    axum::serve(listener, api_router(ctx)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::notify::adapter::NotificationChannels;
    use crate::pipeline::provider::{MockModelClient, ModelClient};

    #[tokio::test]
    async fn serves_on_ephemeral_port() {
        let ctx = ApiContext::new(
            open_memory_database().unwrap(),
            ModelClient::Mock(MockModelClient::new()),
            NotificationChannels::simulation(),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, api_router(ctx)).await.unwrap();
        });

        let body: serde_json::Value = reqwest::Client::new()
            .get(format!("http://{addr}/api/health"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "ok");

        server.abort();
    }
}
