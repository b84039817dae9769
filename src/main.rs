use std::path::PathBuf;

use bookflow_mcp::config::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdoutはMCPの通信路なのでログはstderrへ
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let session_path = std::env::args().nth(1).map(PathBuf::from);
    let settings = Settings::load(session_path)?;

    bookflow_mcp::interface::mcp::run(settings).await
}
