#[tokio::main]
async fn main() -> anyhow::Result<()> {
    coinwatch_lib::run().await
}
