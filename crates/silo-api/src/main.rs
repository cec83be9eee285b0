//! silo-api - HTTP API server for silo blob storage.

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    silo_api::server::run().await
}
