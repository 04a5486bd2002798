use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    ai::run().await
}
