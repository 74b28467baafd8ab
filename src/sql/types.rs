//! SQL type name normalization.
//!
//! Two schemas written for different servers spell the same storage type
//! differently (`int4` vs `integer`, `varchar2` vs `varchar`), so column
//! diffing compares normalized names.

use super::Dialect;

/// Map a declared type name to a canonical family name.
pub fn normalize_type(sql_type: &str, dialect: Dialect) -> String {
    let lower = sql_type.to_lowercase();
    let base = lower.split('(').next().unwrap_or(&lower).trim();

    match dialect {
        Dialect::Postgres => normalize_postgres_type(base),
        Dialect::Oracle => normalize_oracle_type(base),
        Dialect::Sqlite => normalize_generic_type(base),
    }
}

/// Whether `sql_type` names a column type any supported server accepts.
pub fn is_known_type(sql_type: &str) -> bool {
    let lower = sql_type.to_lowercase();
    matches!(
        lower.as_str(),
        "int" | "int2" | "int4" | "int8" | "integer" | "smallint" | "bigint"
            | "serial" | "serial2" | "serial4" | "serial8" | "smallserial" | "bigserial"
            | "number" | "decimal" | "numeric" | "real" | "float" | "float4" | "float8"
            | "double" | "binary_double"
            | "varchar" | "varchar2" | "nvarchar2" | "char" | "nchar" | "character" | "text"
            | "clob" | "nclob"
            | "timestamp" | "timestamptz" | "datetime" | "date" | "time" | "interval"
            | "boolean" | "bool"
            | "bytea" | "blob" | "raw"
            | "uuid" | "json" | "jsonb" | "xml"
            | "inet" | "cidr" | "macaddr" | "money" | "bit" | "varbit" | "oid" | "timetz"
            | "double precision" | "character varying"
            | "timestamp with time zone" | "timestamp without time zone"
            | "time with time zone" | "time without time zone"
    )
}

fn normalize_postgres_type(base: &str) -> String {
    match base {
        "int" | "int4" | "integer" | "serial" | "serial4" => "integer".to_string(),
        "bigint" | "int8" | "bigserial" | "serial8" => "bigint".to_string(),
        "smallint" | "int2" | "smallserial" | "serial2" => "smallint".to_string(),

        "real" | "float4" => "float".to_string(),
        "double precision" | "float8" => "double".to_string(),
        "decimal" | "numeric" => "decimal".to_string(),

        "varchar" | "character varying" => "varchar".to_string(),
        "char" | "character" => "char".to_string(),
        "text" => "text".to_string(),

        "timestamp" | "timestamptz" | "timestamp with time zone" | "timestamp without time zone" => {
            "timestamp".to_string()
        }
        "time" | "timetz" | "time with time zone" | "time without time zone" => "time".to_string(),
        "date" => "date".to_string(),

        "boolean" | "bool" => "boolean".to_string(),
        "bytea" => "binary".to_string(),

        _ => base.to_string(),
    }
}

fn normalize_oracle_type(base: &str) -> String {
    match base {
        "integer" | "int" | "number" => "integer".to_string(),
        "varchar" | "varchar2" | "nvarchar2" => "varchar".to_string(),
        "char" | "nchar" => "char".to_string(),
        "clob" | "nclob" => "text".to_string(),
        "blob" | "raw" => "binary".to_string(),
        "timestamp" => "timestamp".to_string(),
        "date" => "date".to_string(),
        "float" | "binary_double" => "double".to_string(),
        _ => base.to_string(),
    }
}

fn normalize_generic_type(base: &str) -> String {
    match base {
        "int" | "integer" => "integer".to_string(),
        "bigint" => "bigint".to_string(),
        "smallint" => "smallint".to_string(),
        "real" | "float" => "float".to_string(),
        "double" => "double".to_string(),
        "varchar" => "varchar".to_string(),
        "char" => "char".to_string(),
        "text" | "clob" => "text".to_string(),
        "timestamp" | "datetime" => "timestamp".to_string(),
        "boolean" | "bool" => "boolean".to_string(),
        "blob" => "binary".to_string(),
        _ => base.to_string(),
    }
}
