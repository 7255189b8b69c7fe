#[tokio::main]
async fn main() -> anyhow::Result<()> {
    origin_gateway_lib::run().await
}
