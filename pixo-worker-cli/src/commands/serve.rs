//! Serve command - JSON-lines worker on stdin/stdout.

use tokio::io::BufReader;
use tracing::info;

use pixo_worker::transport::serve_json_lines;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Run the serve command until stdin closes or Ctrl-C.
pub async fn run(runner: &CliRunner) -> Result<(), CliError> {
    runner.log_startup("serve");
    runner.install_ctrlc_handler();

    let (link, executor) = runner.spawn_executor();
    info!("Reading requests from stdin");

    let session = serve_json_lines(
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        link,
    )
    .await;

    let stats = executor.await.ok();
    if let Some(stats) = stats {
        info!(
            requests = stats.requests,
            succeeded = stats.succeeded,
            failed = stats.failed,
            dropped = stats.dropped,
            "Session finished"
        );
    }

    session.map_err(CliError::from)
}
