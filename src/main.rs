#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = belay_api::run().await {
        eprintln!("belay-api fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
