//! Schema creation and sample data for the metrics tables.
//!
//! Seeding is the only write path in the crate and goes straight to the
//! concrete pool, never through [`super::DatabaseClient`].

use crate::error::{InsightError, Result};
use sqlx::{PgPool, SqlitePool};
use tracing::info;

use super::DatabaseBackend;

/// The pool to create tables in and seed.
#[derive(Debug, Clone, Copy)]
pub enum SeedTarget<'a> {
    Postgres(&'a PgPool),
    Sqlite(&'a SqlitePool),
}

impl SeedTarget<'_> {
    pub fn backend(&self) -> DatabaseBackend {
        match self {
            Self::Postgres(_) => DatabaseBackend::Postgres,
            Self::Sqlite(_) => DatabaseBackend::Sqlite,
        }
    }
}

/// What `seed_sample_data` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// Rows were inserted into all three tables.
    Seeded { rows: usize },
    /// `product_eligibility` already had rows; nothing was written.
    AlreadyPopulated,
}

struct Eligibility {
    item_id: &'static str,
    status: &'static str,
    evaluated_at: &'static str,
    reason: Option<&'static str>,
}

struct AdSales {
    date: &'static str,
    item_id: &'static str,
    ad_sales: f64,
    impressions: i64,
    ad_spend: f64,
    clicks: i64,
    units_sold_ad: i64,
}

struct TotalSales {
    date: &'static str,
    item_id: &'static str,
    total_sales: f64,
    total_units_ordered: i64,
}

const ELIGIBILITY: &[Eligibility] = &[
    Eligibility { item_id: "P001", status: "eligible", evaluated_at: "2025-06-01 00:00:00", reason: None },
    Eligibility { item_id: "P002", status: "eligible", evaluated_at: "2025-06-01 00:00:00", reason: None },
    Eligibility { item_id: "P003", status: "eligible", evaluated_at: "2025-06-01 00:00:00", reason: None },
    Eligibility { item_id: "P004", status: "eligible", evaluated_at: "2025-06-01 00:00:00", reason: None },
    Eligibility {
        item_id: "P005",
        status: "ineligible",
        evaluated_at: "2025-06-01 00:00:00",
        reason: Some("Category is not approved for sponsored placements"),
    },
    Eligibility { item_id: "P006", status: "eligible", evaluated_at: "2025-06-01 00:00:00", reason: None },
    Eligibility { item_id: "P007", status: "eligible", evaluated_at: "2025-06-01 00:00:00", reason: None },
    Eligibility { item_id: "P008", status: "eligible", evaluated_at: "2025-06-01 00:00:00", reason: None },
];

const AD_SALES: &[AdSales] = &[
    AdSales { date: "2025-06-01", item_id: "P001", ad_sales: 1200.0, impressions: 10000, ad_spend: 500.0, clicks: 250, units_sold_ad: 12 },
    AdSales { date: "2025-06-01", item_id: "P002", ad_sales: 2000.0, impressions: 15000, ad_spend: 800.0, clicks: 400, units_sold_ad: 10 },
    AdSales { date: "2025-06-01", item_id: "P003", ad_sales: 360.0, impressions: 5000, ad_spend: 200.0, clicks: 100, units_sold_ad: 12 },
    AdSales { date: "2025-06-01", item_id: "P004", ad_sales: 1350.0, impressions: 8000, ad_spend: 600.0, clicks: 150, units_sold_ad: 9 },
    AdSales { date: "2025-06-01", item_id: "P006", ad_sales: 900.0, impressions: 6000, ad_spend: 400.0, clicks: 120, units_sold_ad: 3 },
    AdSales { date: "2025-06-01", item_id: "P007", ad_sales: 780.0, impressions: 7000, ad_spend: 350.0, clicks: 140, units_sold_ad: 6 },
    AdSales { date: "2025-06-01", item_id: "P008", ad_sales: 240.0, impressions: 3000, ad_spend: 150.0, clicks: 75, units_sold_ad: 12 },
];

// Totals sum to 12000.
const TOTAL_SALES: &[TotalSales] = &[
    TotalSales { date: "2025-06-01", item_id: "P001", total_sales: 1250.0, total_units_ordered: 13 },
    TotalSales { date: "2025-06-01", item_id: "P002", total_sales: 2000.0, total_units_ordered: 10 },
    TotalSales { date: "2025-06-01", item_id: "P003", total_sales: 375.0, total_units_ordered: 13 },
    TotalSales { date: "2025-06-01", item_id: "P004", total_sales: 1125.0, total_units_ordered: 8 },
    TotalSales { date: "2025-06-01", item_id: "P005", total_sales: 600.0, total_units_ordered: 10 },
    TotalSales { date: "2025-06-01", item_id: "P006", total_sales: 900.0, total_units_ordered: 3 },
    TotalSales { date: "2025-06-01", item_id: "P007", total_sales: 780.0, total_units_ordered: 6 },
    TotalSales { date: "2025-06-01", item_id: "P008", total_sales: 200.0, total_units_ordered: 10 },
    TotalSales { date: "2025-06-02", item_id: "P001", total_sales: 1250.0, total_units_ordered: 12 },
    TotalSales { date: "2025-06-02", item_id: "P002", total_sales: 2000.0, total_units_ordered: 10 },
    TotalSales { date: "2025-06-02", item_id: "P003", total_sales: 375.0, total_units_ordered: 12 },
    TotalSales { date: "2025-06-02", item_id: "P006", total_sales: 900.0, total_units_ordered: 3 },
    TotalSales { date: "2025-06-02", item_id: "P007", total_sales: 245.0, total_units_ordered: 2 },
];

/// Returns the CREATE TABLE statements for a backend.
fn schema_statements(backend: DatabaseBackend) -> Vec<String> {
    let (id, float, timestamp) = match backend {
        DatabaseBackend::Postgres => ("SERIAL PRIMARY KEY", "DOUBLE PRECISION", "TIMESTAMP"),
        DatabaseBackend::Sqlite => ("INTEGER PRIMARY KEY", "REAL", "DATETIME"),
    };

    vec![
        format!(
            "CREATE TABLE IF NOT EXISTS product_eligibility (
                id {id},
                item_id VARCHAR(50) NOT NULL,
                eligibility_status VARCHAR(20) NOT NULL,
                eligibility_datetime_utc {timestamp} NOT NULL,
                reason TEXT
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS ad_sales_metrics (
                id {id},
                date DATE NOT NULL,
                item_id VARCHAR(50) NOT NULL,
                ad_sales {float} DEFAULT 0,
                impressions INTEGER DEFAULT 0,
                ad_spend {float} DEFAULT 0,
                clicks INTEGER DEFAULT 0,
                units_sold_ad INTEGER DEFAULT 0
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS total_sales_metrics (
                id {id},
                date DATE NOT NULL,
                item_id VARCHAR(50) NOT NULL,
                total_sales {float} DEFAULT 0,
                total_units_ordered INTEGER DEFAULT 0
            )"
        ),
    ]
}

/// Returns the INSERT statements for the sample dataset.
///
/// Every value is a compile-time constant, so literals are inlined.
fn sample_statements(backend: DatabaseBackend) -> Vec<String> {
    let date = |d: &str| match backend {
        DatabaseBackend::Postgres => format!("DATE '{d}'"),
        DatabaseBackend::Sqlite => format!("'{d}'"),
    };
    let timestamp = |t: &str| match backend {
        DatabaseBackend::Postgres => format!("TIMESTAMP '{t}'"),
        DatabaseBackend::Sqlite => format!("'{t}'"),
    };

    let eligibility = ELIGIBILITY.iter().map(|e| {
        let reason = e
            .reason
            .map(|r| format!("'{}'", r.replace('\'', "''")))
            .unwrap_or_else(|| "NULL".to_string());
        format!(
            "INSERT INTO product_eligibility (item_id, eligibility_status, eligibility_datetime_utc, reason) \
             VALUES ('{}', '{}', {}, {reason})",
            e.item_id,
            e.status,
            timestamp(e.evaluated_at)
        )
    });

    let ads = AD_SALES.iter().map(|a| {
        format!(
            "INSERT INTO ad_sales_metrics (date, item_id, ad_sales, impressions, ad_spend, clicks, units_sold_ad) \
             VALUES ({}, '{}', {:.2}, {}, {:.2}, {}, {})",
            date(a.date),
            a.item_id,
            a.ad_sales,
            a.impressions,
            a.ad_spend,
            a.clicks,
            a.units_sold_ad
        )
    });

    let totals = TOTAL_SALES.iter().map(|t| {
        format!(
            "INSERT INTO total_sales_metrics (date, item_id, total_sales, total_units_ordered) \
             VALUES ({}, '{}', {:.2}, {})",
            date(t.date),
            t.item_id,
            t.total_sales,
            t.total_units_ordered
        )
    });

    eligibility.chain(ads).chain(totals).collect()
}

/// Creates the three metrics tables if they do not exist.
pub async fn create_schema(target: SeedTarget<'_>) -> Result<()> {
    let statements = schema_statements(target.backend());
    match target {
        SeedTarget::Postgres(pool) => {
            for sql in &statements {
                sqlx::query(sql).execute(pool).await.map_err(schema_error)?;
            }
        }
        SeedTarget::Sqlite(pool) => {
            for sql in &statements {
                sqlx::query(sql).execute(pool).await.map_err(schema_error)?;
            }
        }
    }
    Ok(())
}

/// Inserts the sample dataset in one transaction unless data already exists.
pub async fn seed_sample_data(target: SeedTarget<'_>) -> Result<SeedOutcome> {
    const COUNT_SQL: &str = "SELECT COUNT(*) FROM product_eligibility";
    let statements = sample_statements(target.backend());

    match target {
        SeedTarget::Postgres(pool) => {
            let mut tx = pool.begin().await.map_err(seed_error)?;
            let existing: i64 = sqlx::query_scalar(COUNT_SQL)
                .fetch_one(&mut *tx)
                .await
                .map_err(seed_error)?;
            if existing > 0 {
                info!("Database already has data, skipping sample data");
                return Ok(SeedOutcome::AlreadyPopulated);
            }
            for sql in &statements {
                sqlx::query(sql).execute(&mut *tx).await.map_err(seed_error)?;
            }
            tx.commit().await.map_err(seed_error)?;
        }
        SeedTarget::Sqlite(pool) => {
            let mut tx = pool.begin().await.map_err(seed_error)?;
            let existing: i64 = sqlx::query_scalar(COUNT_SQL)
                .fetch_one(&mut *tx)
                .await
                .map_err(seed_error)?;
            if existing > 0 {
                info!("Database already has data, skipping sample data");
                return Ok(SeedOutcome::AlreadyPopulated);
            }
            for sql in &statements {
                sqlx::query(sql).execute(&mut *tx).await.map_err(seed_error)?;
            }
            tx.commit().await.map_err(seed_error)?;
        }
    }

    info!("Inserted {} sample rows", statements.len());
    Ok(SeedOutcome::Seeded {
        rows: statements.len(),
    })
}

/// Creates the schema and seeds it; the usual startup sequence.
pub async fn prepare(target: SeedTarget<'_>) -> Result<SeedOutcome> {
    create_schema(target).await?;
    seed_sample_data(target).await
}

fn schema_error(e: sqlx::Error) -> InsightError {
    InsightError::query(format!("Failed to create tables: {e}"))
}

fn seed_error(e: sqlx::Error) -> InsightError {
    InsightError::query(format!("Failed to insert sample data: {e}"))
}
