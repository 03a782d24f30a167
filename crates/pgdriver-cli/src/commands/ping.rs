use std::time::Instant;

use anyhow::Context;
use pgdriver::{PgClient, PgConfig};

use crate::TRACING_TARGET_COMMAND;

/// Opens a client, performs one round trip and closes it again.
pub async fn ping(database: &PgConfig) -> anyhow::Result<()> {
    let client = PgClient::new(database.clone().with_lazy_connect(true))
        .await
        .context("failed to open database client")?;

    let start = Instant::now();
    let result = client.ping().await;
    let elapsed = start.elapsed();
    let status = client.pool_status();
    client.close();

    result.context("database did not answer")?;

    tracing::info!(
        target: TRACING_TARGET_COMMAND,
        elapsed = ?elapsed,
        pool_size = status.size,
        pool_max_size = status.max_size,
        "Database is reachable"
    );

    Ok(())
}
