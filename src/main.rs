#[tokio::main]
async fn main() -> anyhow::Result<()> {
    glucosedidgeridoo_lib::run().await
}
