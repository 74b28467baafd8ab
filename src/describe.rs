//! Human-readable, column-aligned listing of a compiled schema.

use crate::catalog::{CheckExpr, Column, Constraint, DefaultValue, Schema, Table};
use unicode_width::UnicodeWidthStr;

/// Pad `text` to `width` terminal cells.
fn pad(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(UnicodeWidthStr::width(text));
    format!("{}{}", text, " ".repeat(fill))
}

fn column_names(table: &Table, columns: &[usize]) -> String {
    columns
        .iter()
        .map(|&i| table.columns[i].name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn check_text(table: &Table, expr: &CheckExpr) -> String {
    match expr {
        CheckExpr::Column(i) => table.columns[*i].name.clone(),
        CheckExpr::Constant(value) => value.to_string(),
        CheckExpr::Function { name, args } => {
            let args: Vec<String> = args.iter().map(|a| check_text(table, a)).collect();
            format!("{}({})", name, args.join(", "))
        }
        CheckExpr::Compare { lhs, op, rhs } => {
            format!("{} {} {}", check_text(table, lhs), op, check_text(table, rhs))
        }
    }
}

fn modifiers(schema: &Schema, table: &Table, column: &Column) -> String {
    let mut parts = Vec::new();
    if table.primary_key.as_deref() == Some(&[column.position][..]) {
        parts.push("primary key".to_string());
    }
    if !table.can_be_null(column) {
        parts.push("not null".to_string());
    }
    match &column.default {
        None => {}
        Some(DefaultValue::Null) => parts.push("default null".to_string()),
        Some(DefaultValue::Literal(value)) => parts.push(format!("default {}", value)),
        Some(DefaultValue::Sequence(id)) => {
            parts.push(format!("default nextval('{}')", schema.sequence(*id).name))
        }
        Some(DefaultValue::Procedure(call)) => parts.push(format!("default {}", call)),
    }
    if let Some(target) = column.references {
        parts.push(format!("references {}", schema.table(target).name));
    }
    if let Some(action) = column.delete_action {
        parts.push(format!("on delete {}", action));
    }
    parts.join(" ")
}

fn describe_table(out: &mut String, schema: &Schema, table: &Table) {
    for line in table.comment.lines() {
        out.push_str(line);
        out.push('\n');
    }
    out.push_str(&format!("table {}\n", table.name));

    let types: Vec<String> = table.columns.iter().map(|c| c.sql_type.to_string()).collect();
    let name_width = table
        .columns
        .iter()
        .map(|c| UnicodeWidthStr::width(c.name.as_str()))
        .max()
        .unwrap_or(0);
    let type_width = types
        .iter()
        .map(|t| UnicodeWidthStr::width(t.as_str()))
        .max()
        .unwrap_or(0);

    for (column, sql_type) in table.columns.iter().zip(&types) {
        let line = format!(
            "    {}  {}  {}",
            pad(&column.name, name_width),
            pad(sql_type, type_width),
            modifiers(schema, table, column)
        );
        out.push_str(line.trim_end());
        out.push('\n');
    }

    if let Some(pk) = &table.primary_key {
        if pk.len() > 1 {
            out.push_str(&format!("  primary key ({})\n", column_names(table, pk)));
        }
    }
    for constraint in &table.constraints {
        match constraint {
            Constraint::NotNull { .. } => {}
            Constraint::Unique { name, columns } => {
                let label = name.as_deref().map(|n| format!(" {}", n)).unwrap_or_default();
                out.push_str(&format!("  unique{} ({})\n", label, column_names(table, columns)));
            }
            Constraint::Check(check) => {
                let label = check.name.as_deref().map(|n| format!(" {}", n)).unwrap_or_default();
                out.push_str(&format!(
                    "  check{} ({})\n",
                    label,
                    check_text(table, &check.expression)
                ));
            }
        }
    }
    if !table.schema_rows.is_empty() {
        out.push_str(&format!("  {} seed rows\n", table.schema_rows.len()));
    }
}

/// List tables, then sequences, then indexes.
pub fn describe(schema: &Schema) -> String {
    let mut out = String::new();

    for (i, table) in schema.tables().iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        describe_table(&mut out, schema, table);
    }

    if !schema.sequences().is_empty() {
        out.push('\n');
    }
    for sequence in schema.sequences() {
        let users: Vec<String> = sequence
            .referring_columns
            .iter()
            .map(|&(table, column)| {
                let table = schema.table(table);
                format!("{}.{}", table.name, table.columns[column].name)
            })
            .collect();
        if users.is_empty() {
            out.push_str(&format!("sequence {}\n", sequence.name));
        } else {
            out.push_str(&format!("sequence {} used by {}\n", sequence.name, users.join(", ")));
        }
    }

    if !schema.indexes().is_empty() {
        out.push('\n');
    }
    for index in schema.indexes() {
        let table = schema.table(index.table);
        let method = index
            .method
            .as_deref()
            .map(|m| format!(" using {}", m))
            .unwrap_or_default();
        out.push_str(&format!(
            "{}index {} on {}{} ({})\n",
            if index.unique { "unique " } else { "" },
            index.name,
            table.name,
            method,
            column_names(table, &index.columns)
        ));
    }

    out
}
