//! Statement classification over the `sqlparser` AST.
//!
//! Uses sqlparser-rs with the backend's dialect. A query is classified by
//! walking its CTEs, set operations and derived tables, so a write hidden
//! anywhere in the tree decides the result.

use sqlparser::ast::{Query, Select, SetExpr, Statement, TableFactor, TableWithJoins};
use sqlparser::dialect::{Dialect, PostgreSqlDialect, SQLiteDialect};
use sqlparser::parser::{Parser, ParserError};

use crate::db::DatabaseBackend;

use super::StatementType;

fn dialect_for(backend: DatabaseBackend) -> Box<dyn Dialect> {
    match backend {
        DatabaseBackend::Postgres => Box::new(PostgreSqlDialect {}),
        DatabaseBackend::Sqlite => Box::new(SQLiteDialect {}),
    }
}

/// Parses SQL text into statements using the backend's dialect.
pub fn parse_statements(
    sql: &str,
    backend: DatabaseBackend,
) -> Result<Vec<Statement>, ParserError> {
    let dialect = dialect_for(backend);
    Parser::parse_sql(dialect.as_ref(), sql)
}

/// Classifies SQL text.
///
/// Returns `Multiple(n)` for more than one statement and `Unknown` when the
/// text holds no statement at all.
pub fn classify_sql(sql: &str, backend: DatabaseBackend) -> Result<StatementType, ParserError> {
    let statements = parse_statements(sql, backend)?;

    Ok(match statements.as_slice() {
        [] => StatementType::Unknown,
        [statement] => classify_statement(statement),
        many => StatementType::Multiple(many.len()),
    })
}

/// Maps a statement to its kind; queries are inspected recursively.
pub(super) fn classify_statement(statement: &Statement) -> StatementType {
    match statement {
        Statement::Query(query) => classify_query(query),

        Statement::Explain { .. } => StatementType::Explain,
        Statement::ShowVariable { .. }
        | Statement::ShowTables { .. }
        | Statement::ShowColumns { .. }
        | Statement::ShowCreate { .. } => StatementType::Show,

        Statement::Insert(_) => StatementType::Insert,
        Statement::Update { .. } => StatementType::Update,
        Statement::Merge { .. } => StatementType::Merge,
        Statement::Delete(_) => StatementType::Delete,
        Statement::Drop { .. } => StatementType::Drop,
        Statement::Truncate { .. } => StatementType::Truncate,

        Statement::AlterTable { .. }
        | Statement::AlterIndex { .. }
        | Statement::AlterView { .. }
        | Statement::AlterRole { .. } => StatementType::Alter,

        Statement::CreateTable { .. }
        | Statement::CreateIndex { .. }
        | Statement::CreateView { .. }
        | Statement::CreateSchema { .. }
        | Statement::CreateDatabase { .. }
        | Statement::CreateFunction { .. }
        | Statement::CreateRole { .. }
        | Statement::CreateSequence { .. } => StatementType::Create,

        Statement::Grant { .. } => StatementType::Grant,
        Statement::Revoke { .. } => StatementType::Revoke,

        _ => StatementType::Unknown,
    }
}

/// Returns the first non-read-only finding of a list, else `Select`.
fn first_write(kinds: impl IntoIterator<Item = StatementType>) -> StatementType {
    kinds
        .into_iter()
        .find(|k| !k.is_read_only())
        .unwrap_or(StatementType::Select)
}

/// Classifies a query by recursively inspecting CTEs and the body.
fn classify_query(query: &Query) -> StatementType {
    if !query.locks.is_empty() {
        return StatementType::LockingSelect;
    }

    let ctes = query
        .with
        .iter()
        .flat_map(|with| with.cte_tables.iter())
        .map(|cte| classify_query(&cte.query));

    first_write(ctes.chain(std::iter::once_with(|| classify_set_expr(&query.body))))
}

/// A query body is read-only only if every branch is.
#[allow(unreachable_patterns)]
fn classify_set_expr(set_expr: &SetExpr) -> StatementType {
    match set_expr {
        // Data-modifying CTE bodies
        SetExpr::Update(stmt) | SetExpr::Insert(stmt) => classify_nested_write(stmt),

        SetExpr::Query(query) => classify_query(query),
        SetExpr::Select(select) => classify_select(select),

        SetExpr::SetOperation { left, right, .. } => {
            first_write([classify_set_expr(left), classify_set_expr(right)])
        }

        SetExpr::Values(_) | SetExpr::Table(_) => StatementType::Select,

        _ => StatementType::Unknown,
    }
}

/// A statement embedded in a query body is never read-only.
fn classify_nested_write(statement: &Statement) -> StatementType {
    match classify_statement(statement) {
        StatementType::Select => StatementType::Unknown,
        other => other,
    }
}

/// Classifies a Select by its INTO clause and FROM subqueries.
fn classify_select(select: &Select) -> StatementType {
    if select.into.is_some() {
        return StatementType::SelectInto;
    }

    first_write(select.from.iter().map(classify_table_with_joins))
}

/// Checks the base relation and every joined relation.
fn classify_table_with_joins(twj: &TableWithJoins) -> StatementType {
    first_write(
        std::iter::once(&twj.relation)
            .chain(twj.joins.iter().map(|join| &join.relation))
            .map(classify_table_factor),
    )
}

/// Derived tables and nested joins are classified like top-level queries.
fn classify_table_factor(factor: &TableFactor) -> StatementType {
    match factor {
        TableFactor::Derived { subquery, .. } => classify_query(subquery),
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => classify_table_with_joins(table_with_joins),
        _ => StatementType::Select,
    }
}
