#[tokio::main]
async fn main() -> anyhow::Result<()> {
    view_proof_service::server::run().await
}
