//! Schema catalog for the metrics database.
//!
//! The catalog is the human-authored description of the tables and columns
//! the language model may query. It is built once per process and shared
//! read-only.

use serde::{Deserialize, Serialize};

use crate::error::{InsightError, Result};

/// A described column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescription {
    pub name: String,
    pub description: String,
}

impl ColumnDescription {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// A described table with its columns in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescription {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub columns: Vec<ColumnDescription>,
}

impl TableDescription {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            columns: Vec::new(),
        }
    }

    /// Appends a column (builder style).
    pub fn column(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.columns.push(ColumnDescription::new(name, description));
        self
    }
}

/// Ordered description of every table exposed to the language model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaCatalog {
    pub tables: Vec<TableDescription>,
}

impl SchemaCatalog {
    /// Creates a catalog from tables, rejecting malformed input.
    pub fn new(tables: Vec<TableDescription>) -> Result<Self> {
        let catalog = Self { tables };
        catalog.validate()?;
        Ok(catalog)
    }

    /// The built-in catalog for the e-commerce metrics tables.
    pub fn ecommerce() -> Self {
        Self {
            tables: vec![
                TableDescription::new(
                    "product_eligibility",
                    "Advertising eligibility records, one or more per product",
                )
                .column("item_id", "Product identifier, the join key across all tables")
                .column(
                    "eligibility_status",
                    "Whether the product may be advertised: 'eligible' or 'ineligible'",
                )
                .column(
                    "eligibility_datetime_utc",
                    "UTC timestamp when the eligibility was evaluated",
                )
                .column("reason", "Explanation when the product is not eligible (may be NULL)"),
                TableDescription::new(
                    "ad_sales_metrics",
                    "Daily advertising performance per product",
                )
                .column("date", "Calendar date of the metrics")
                .column("item_id", "Product identifier")
                .column("ad_sales", "Revenue attributed to ads on that date")
                .column("impressions", "Number of ad impressions")
                .column("ad_spend", "Amount spent on advertising")
                .column("clicks", "Number of ad clicks")
                .column("units_sold_ad", "Units sold through ads"),
                TableDescription::new(
                    "total_sales_metrics",
                    "Daily total sales per product, ad-driven and organic combined",
                )
                .column("date", "Calendar date of the metrics")
                .column("item_id", "Product identifier")
                .column("total_sales", "Total revenue on that date")
                .column("total_units_ordered", "Total units ordered on that date"),
            ],
        }
    }

    /// Checks that every table and column has a name and no table repeats.
    pub fn validate(&self) -> Result<()> {
        if self.tables.is_empty() {
            return Err(InsightError::config("catalog must describe at least one table"));
        }

        for (i, table) in self.tables.iter().enumerate() {
            if table.name.trim().is_empty() {
                return Err(InsightError::config(format!(
                    "catalog table #{} has an empty name",
                    i + 1
                )));
            }
            if self.tables[..i].iter().any(|t| t.name == table.name) {
                return Err(InsightError::config(format!(
                    "catalog table '{}' is declared twice",
                    table.name
                )));
            }
            if table.columns.is_empty() {
                return Err(InsightError::config(format!(
                    "catalog table '{}' has no columns",
                    table.name
                )));
            }
            if let Some(col) = table.columns.iter().find(|c| c.name.trim().is_empty()) {
                return Err(InsightError::config(format!(
                    "catalog table '{}' has a column with an empty name ({:?})",
                    table.name, col.description
                )));
            }
        }

        Ok(())
    }

    /// Looks up a table by name.
    pub fn table(&self, name: &str) -> Option<&TableDescription> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Renders the catalog as the schema section of the generation prompt.
    ///
    /// One block per table, in catalog order:
    ///
    /// ```text
    /// Table: ad_sales_metrics
    /// Description: Daily advertising performance per product
    /// Columns:
    /// - date: Calendar date of the metrics
    /// ```
    pub fn render(&self) -> String {
        self.tables
            .iter()
            .map(|table| {
                let columns = table
                    .columns
                    .iter()
                    .map(|c| format!("- {}: {}\n", c.name, c.description))
                    .collect::<String>();
                format!(
                    "Table: {}\nDescription: {}\nColumns:\n{}",
                    table.name, table.description, columns
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for SchemaCatalog {
    fn default() -> Self {
        Self::ecommerce()
    }
}
