//! Postgres client bootstrap for the stream-metadata store.
//!
//! One shared client serves both the credential verifier and the topic
//! resolver; `tokio_postgres::Client` pipelines concurrent queries over a
//! single connection without external locking.

use std::sync::Arc;

use anyhow::Context;
use tokio_postgres::{Client, NoTls};

/// Connect to the metadata store and drive the connection in the background.
pub async fn connect(db_url: &str) -> anyhow::Result<Arc<Client>> {
    let (client, connection) = tokio_postgres::connect(db_url, NoTls)
        .await
        .context("failed to connect to the stream-metadata store")?;

    // The connection future multiplexes all queries issued through the
    // client; if it exits, subsequent queries fail and the readiness gate
    // takes the gateway out of rotation.
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!(error = %e, "metadata store connection terminated");
        }
    });

    Ok(Arc::new(client))
}
