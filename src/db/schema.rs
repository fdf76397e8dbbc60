use regex::Regex;

use crate::db::DbError;

pub const SUMMARY_TABLE: &str = "generation_daily_summary";
pub const DETAIL_TABLE: &str = "generation_detail";

pub const SUMMARY_COLUMNS: [&str; 4] = [
    "generation_date",
    "inverter_count",
    "energy_production_watthr",
    "energy_lifetime_watthr",
];

pub const DETAIL_COLUMNS: [&str; 4] = [
    "sample_datetime",
    "generation_date",
    "power_watts",
    "energy_watthr",
];

/// Where the two target tables live. Identifiers are validated once here
/// because they cannot be bound as query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaMapping {
    schema: String,
    summary_table: String,
    detail_table: String,
}

impl SchemaMapping {
    pub fn new(schema: &str, summary_table: &str, detail_table: &str) -> Result<Self, DbError> {
        let identifier = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$")
            .map_err(|e| DbError::InvalidIdentifier(e.to_string()))?;

        for name in [schema, summary_table, detail_table] {
            if !identifier.is_match(name) {
                return Err(DbError::InvalidIdentifier(name.to_string()));
            }
        }

        Ok(Self {
            schema: schema.to_string(),
            summary_table: summary_table.to_string(),
            detail_table: detail_table.to_string(),
        })
    }

    /// Standard table names inside `schema`.
    pub fn in_schema(schema: &str) -> Result<Self, DbError> {
        Self::new(schema, SUMMARY_TABLE, DETAIL_TABLE)
    }

    pub fn summary_table(&self) -> String {
        format!("{}.{}", self.schema, self.summary_table)
    }

    pub fn detail_table(&self) -> String {
        format!("{}.{}", self.schema, self.detail_table)
    }

    pub fn summary_insert_sql(&self) -> String {
        format!(
            "INSERT INTO {} ({}) VALUES ($1, $2, $3, $4)",
            self.summary_table(),
            SUMMARY_COLUMNS.join(", ")
        )
    }

    /// Statement prefix for a multi-row detail insert; the VALUES list is
    /// appended by the query builder.
    pub fn detail_insert_prefix(&self) -> String {
        format!(
            "INSERT INTO {} ({}) ",
            self.detail_table(),
            DETAIL_COLUMNS.join(", ")
        )
    }
}
