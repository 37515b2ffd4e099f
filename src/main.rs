#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = prepcast_rust::run().await {
        eprintln!("prepcast-rust fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
