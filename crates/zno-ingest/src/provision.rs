//! Destination table provisioning

use crate::error::Result;
use crate::retry::{connect_with_retry, retry, RetryPolicy};
use crate::schema::{Identifier, TableSchema};
use crate::store::{Connector, Store};
use tracing::info;

/// Ensure `table` and its progress row exist
///
/// Safe to run before every load: an existing progress row is left as is, so
/// an interrupted load keeps its position.
pub async fn provision<C: Connector>(
    connector: &C,
    policy: &RetryPolicy,
    table: &Identifier,
    schema: &TableSchema,
    total_rows: u64,
) -> Result<()> {
    retry(policy, "provision", move || async move {
        let mut store = connect_with_retry(connector, policy).await?;
        store.provision(table, schema, total_rows).await
    })
    .await?;

    info!(table = %table, columns = schema.len(), "Table \"{}\" successfully created/connected", table);
    Ok(())
}
