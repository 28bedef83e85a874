use mongodb::{bson::doc, Client, Database};

/// Connects to MongoDB and verifies the server is reachable
pub async fn connect(uri: &str, db_name: &str) -> anyhow::Result<Database> {
    let client = Client::with_uri_str(uri).await?;
    let db = client.database(db_name);

    db.run_command(doc! { "ping": 1 }).await?;
    tracing::info!(database = %db_name, "Connected to MongoDB");

    Ok(db)
}

/// Duplicate key violations (unique index) are reported with this server code
const DUPLICATE_KEY: i32 = 11000;

pub(crate) fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};

    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY,
        _ => false,
    }
}
