use tracing_subscriber::EnvFilter;
use visual_verify::CaptureRunner;

#[tokio::main]
async fn main() -> visual_verify::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    CaptureRunner::new()?.run().await
}
