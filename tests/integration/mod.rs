//! Integration tests for shopinsight.

pub mod executor_test;
pub mod pipeline_test;
pub mod postgres_test;
pub mod server_test;

use std::sync::Arc;

use shopinsight::catalog::SchemaCatalog;
use shopinsight::config::DatabaseConfig;
use shopinsight::db::seed::{self, SeedTarget};
use shopinsight::db::{DatabaseClient, SqliteClient};
use shopinsight::llm::LlmClient;
use shopinsight::pipeline::{Pipeline, PipelineSettings};

/// Opens an in-memory SQLite store with the sample tables loaded.
pub async fn seeded_sqlite() -> Arc<SqliteClient> {
    let client = SqliteClient::connect(&DatabaseConfig::from_url("sqlite::memory:"))
        .await
        .unwrap();
    seed::prepare(SeedTarget::Sqlite(client.pool()))
        .await
        .unwrap();
    Arc::new(client)
}

/// Builds a pipeline over the given store and model.
pub fn pipeline_over(db: Arc<dyn DatabaseClient>, llm: impl LlmClient + 'static) -> Pipeline {
    Pipeline::new(
        &SchemaCatalog::ecommerce(),
        db,
        Arc::new(llm),
        PipelineSettings::default(),
    )
}

/// Counts rows in a table through the read-only client.
pub async fn count_rows(db: &dyn DatabaseClient, table: &str) -> i64 {
    let result = db
        .execute_query(&format!("SELECT COUNT(*) AS n FROM {table}"))
        .await
        .unwrap();
    result.rows[0][0].as_i64().unwrap()
}
