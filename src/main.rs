#[tokio::main]
async fn main() {
    if let Err(e) = healthdir::run().await {
        tracing::error!(error = %e, "Server startup failed");
        std::process::exit(1);
    }
}
