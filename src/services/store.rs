//! Shared document-store plumbing.

use mongodb::{
    bson::doc,
    error::{ErrorKind, WriteFailure},
    Client, Database,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate key")]
    Duplicate,

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("store error: {0}")]
    Backend(String),
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        if is_duplicate_key(&err) {
            StoreError::Duplicate
        } else {
            StoreError::Backend(err.to_string())
        }
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == 11000
    )
}

/// Connect and ping, so a bad URI fails at startup rather than on first use.
pub async fn connect_mongo(uri: &str, database: &str) -> Result<(Client, Database), StoreError> {
    let client = Client::with_uri_str(uri).await?;
    let db = client.database(database);
    db.run_command(doc! { "ping": 1 }).await?;
    tracing::info!(database = %database, "Connected to MongoDB");
    Ok((client, db))
}
