//! Aggregate counts and sums over the metrics tables.

use serde::Serialize;
use tracing::debug;

use crate::db::{DatabaseClient, QueryResult, Value};
use crate::error::{InsightError, Result};

/// One statement computes every figure so the numbers come from one snapshot.
pub const STATS_SQL: &str = "SELECT \
    (SELECT COUNT(*) FROM product_eligibility) AS total_items, \
    (SELECT COUNT(*) FROM product_eligibility WHERE eligibility_status = 'eligible') AS eligible_items, \
    (SELECT COUNT(*) FROM ad_sales_metrics) AS ad_records, \
    (SELECT COUNT(*) FROM total_sales_metrics) AS sales_records, \
    (SELECT COALESCE(SUM(total_sales), 0) FROM total_sales_metrics) AS total_sales, \
    (SELECT COALESCE(SUM(ad_sales), 0) FROM ad_sales_metrics) AS total_ad_sales, \
    (SELECT COALESCE(SUM(ad_spend), 0) FROM ad_sales_metrics) AS total_ad_spend, \
    (SELECT COALESCE(SUM(total_units_ordered), 0) FROM total_sales_metrics) AS total_units_ordered";

/// Summary figures for the `/api/stats` endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Stats {
    pub total_items: i64,
    pub eligible_items: i64,
    pub ad_records: i64,
    pub sales_records: i64,
    pub total_sales: f64,
    pub total_ad_sales: f64,
    pub total_ad_spend: f64,
    pub total_units_ordered: i64,
}

impl Stats {
    fn from_result(result: &QueryResult) -> Result<Self> {
        let row = result
            .rows
            .first()
            .ok_or_else(|| InsightError::internal("Stats query returned no rows"))?;
        let keys = result.record_keys();

        let value = |name: &str| -> Result<&Value> {
            keys.iter()
                .position(|k| k == name)
                .and_then(|i| row.get(i))
                .ok_or_else(|| InsightError::internal(format!("Stats column '{name}' missing")))
        };
        let int = |name: &str| -> Result<i64> { Ok(value(name)?.as_i64().unwrap_or(0)) };
        let float = |name: &str| -> Result<f64> { Ok(value(name)?.as_f64().unwrap_or(0.0)) };

        Ok(Self {
            total_items: int("total_items")?,
            eligible_items: int("eligible_items")?,
            ad_records: int("ad_records")?,
            sales_records: int("sales_records")?,
            total_sales: float("total_sales")?,
            total_ad_sales: float("total_ad_sales")?,
            total_ad_spend: float("total_ad_spend")?,
            total_units_ordered: int("total_units_ordered")?,
        })
    }
}

/// Runs the fixed statistics query.
pub async fn collect(db: &dyn DatabaseClient) -> Result<Stats> {
    let result = db.execute_query(STATS_SQL).await?;
    let stats = Stats::from_result(&result)?;
    debug!(?stats, "Collected stats");
    Ok(stats)
}
