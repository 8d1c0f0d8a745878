use chrono::{NaiveDate, NaiveTime};
use serde_json::Value;
use sqlx::{Executor, MySql};

use crate::error::AppError;

/// How a JSON value must be converted before binding to a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    U64,
    Date,
}

/// A column a partial update is allowed to touch.
#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub nullable: bool,
}

impl Column {
    pub const fn required(name: &'static str, kind: ColumnKind) -> Self {
        Self {
            name,
            kind,
            nullable: false,
        }
    }

    pub const fn nullable(name: &'static str, kind: ColumnKind) -> Self {
        Self {
            name,
            kind,
            nullable: true,
        }
    }
}

/// SQL bindable value
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    U64(u64),
    Date(NaiveDate),
    Null,
}

#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// Accepts `HH:MM` or `HH:MM:SS`.
pub fn parse_clock_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

fn convert(column: &Column, value: &Value) -> Result<SqlValue, AppError> {
    let invalid = || AppError::validation(format!("{} has an invalid value", column.name));

    if value.is_null() {
        return if column.nullable {
            Ok(SqlValue::Null)
        } else {
            Err(AppError::validation(format!("{} cannot be null", column.name)))
        };
    }

    match column.kind {
        ColumnKind::Text => value
            .as_str()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| SqlValue::String(s.to_string()))
            .ok_or_else(invalid),
        ColumnKind::U64 => value.as_u64().map(SqlValue::U64).ok_or_else(invalid),
        ColumnKind::Date => value
            .as_str()
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
            .map(SqlValue::Date)
            .ok_or_else(invalid),
    }
}

/// Builds `UPDATE table SET ... WHERE id_column = ?` from a JSON object.
/// Only keys listed in `allowed` are accepted; anything else is a validation error.
pub fn build_update_sql(
    table: &str,
    payload: &Value,
    allowed: &[Column],
    id_column: &str,
    id_value: u64,
) -> Result<SqlUpdate, AppError> {
    let obj = payload
        .as_object()
        .ok_or_else(|| AppError::validation("Payload must be a JSON object"))?;

    if obj.is_empty() {
        return Err(AppError::validation("No fields provided for update"));
    }

    let mut assignments = Vec::with_capacity(obj.len());
    let mut values = Vec::with_capacity(obj.len() + 1);

    for (key, value) in obj {
        let column = allowed
            .iter()
            .find(|c| c.name == key.as_str())
            .ok_or_else(|| AppError::validation(format!("{key} cannot be updated")))?;

        assignments.push(format!("{} = ?", column.name));
        values.push(convert(column, value)?);
    }

    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        table,
        assignments.join(", "),
        id_column
    );

    // WHERE id = ?
    values.push(SqlValue::U64(id_value));

    Ok(SqlUpdate { sql, values })
}

/// Runs the update on a pool or an open transaction; returns rows matched.
pub async fn execute_update<'e, E>(executor: E, update: SqlUpdate) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = MySql>,
{
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::U64(v) => query.bind(v),
            SqlValue::Date(v) => query.bind(v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }

    let result = query.execute(executor).await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const COLUMNS: &[Column] = &[
        Column::required("first_name", ColumnKind::Text),
        Column::nullable("phone", ColumnKind::Text),
        Column::nullable("work_unit_id", ColumnKind::U64),
        Column::required("hire_date", ColumnKind::Date),
    ];

    #[test]
    fn builds_set_clause_for_allowed_columns() {
        let update = build_update_sql(
            "employees",
            &json!({ "first_name": " Ana ", "phone": null, "hire_date": "2026-01-05" }),
            COLUMNS,
            "id",
            7,
        )
        .unwrap();

        assert!(update.sql.starts_with("UPDATE employees SET "));
        assert!(update.sql.ends_with(" WHERE id = ?"));
        assert!(update.sql.contains("first_name = ?"));
        assert!(update.sql.contains("phone = ?"));
        assert_eq!(update.values.len(), 4);
        assert!(update.values.contains(&SqlValue::String("Ana".into())));
        assert!(update.values.contains(&SqlValue::Null));
        assert_eq!(update.values.last(), Some(&SqlValue::U64(7)));
    }

    #[test]
    fn rejects_columns_outside_the_whitelist() {
        let err = build_update_sql("employees", &json!({ "id": 3 }), COLUMNS, "id", 7).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = build_update_sql(
            "employees",
            &json!({ "first_name = 'x', status": "y" }),
            COLUMNS,
            "id",
            7,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn rejects_wrong_types_and_null_on_required_columns() {
        for payload in [
            json!({ "first_name": null }),
            json!({ "first_name": "" }),
            json!({ "work_unit_id": -1 }),
            json!({ "hire_date": "05/01/2026" }),
            json!({}),
            json!([1, 2]),
        ] {
            assert!(build_update_sql("employees", &payload, COLUMNS, "id", 1).is_err());
        }
    }

    #[test]
    fn clock_times_accept_minutes_or_seconds() {
        assert_eq!(parse_clock_time("08:30"), parse_clock_time(" 08:30:00 "));
        assert!(parse_clock_time("08:30").is_some());
        assert!(parse_clock_time("25:00").is_none());
        assert!(parse_clock_time("8.30").is_none());
    }
}
