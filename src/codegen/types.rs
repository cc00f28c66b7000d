//! Type declarations for the virtual database module

use serde_json::Value;

use crate::schema::{ColumnDef, ColumnKind, TableSet};

/// File name of the generated declarations, relative to the generated-files directory
pub const DB_TYPES_FILE: &str = "db-types.d.ts";

/// TypeScript type of a value of the given kind
pub(crate) fn ts_base_type(kind: ColumnKind) -> &'static str {
    match kind {
        ColumnKind::Text => "string",
        ColumnKind::Number => "number",
        ColumnKind::Boolean => "boolean",
        ColumnKind::Date => "Date",
        ColumnKind::Json => "unknown",
    }
}

fn ts_type(column: &ColumnDef) -> String {
    let base = ts_base_type(column.kind);
    if column.optional && !column.primary_key {
        format!("{} | null", base)
    } else {
        base.to_string()
    }
}

/// Render `declare module` text for the public module and its table exports
pub fn render_type_declarations(module_id: &str, tables: &TableSet) -> String {
    let runtime = Value::String(super::RUNTIME_IMPORT.to_string());
    let mut lines = vec![
        "// Generated by virtdb. Do not edit.".to_string(),
        format!("declare module {} {{", Value::String(module_id.to_string())),
        format!(
            "\texport const {}: import({}).Database;",
            super::DB_EXPORT,
            runtime
        ),
    ];

    for table in tables.iter() {
        let columns = table
            .columns
            .iter()
            .map(|c| format!("{}: {}", Value::String(c.name.clone()), ts_type(c)))
            .collect::<Vec<_>>()
            .join("; ");
        lines.push(format!(
            "\texport const {}: import({}).Table<{}, {{ {} }}>;",
            table.name,
            runtime,
            Value::String(table.name.clone()),
            columns
        ));
    }

    lines.push("}\n".to_string());
    lines.join("\n")
}
