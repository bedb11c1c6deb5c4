use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use serde_json::Value;
use tabled::{builder::Builder, settings::Style};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Pretty,
    Table,
}

pub fn print_output(format: OutputFormat, value: &Value) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Pretty => print_pretty(value, 0)?,
        OutputFormat::Table => println!("{}", render_table(value)?),
    }
    Ok(())
}

fn print_pretty(value: &Value, indent: usize) -> Result<()> {
    let pad = "  ".repeat(indent);
    match value {
        Value::Object(map) => {
            for (key, val) in map {
                let key_colored = key.cyan().bold();
                match val {
                    Value::String(s) => println!("{}{}: {}", pad, key_colored, s.green()),
                    Value::Number(n) => {
                        println!("{}{}: {}", pad, key_colored, n.to_string().yellow())
                    }
                    Value::Bool(b) => {
                        let val_colored = if *b { "true".green() } else { "false".red() };
                        println!("{}{}: {}", pad, key_colored, val_colored);
                    }
                    Value::Null => println!("{}{}: {}", pad, key_colored, "-".dimmed()),
                    nested => {
                        println!("{}{}:", pad, key_colored);
                        print_pretty(nested, indent + 1)?;
                    }
                }
            }
        }
        Value::Array(arr) if arr.is_empty() => println!("{}{}", pad, "(none)".dimmed()),
        Value::Array(arr) => {
            for (i, item) in arr.iter().enumerate() {
                match item {
                    Value::Object(_) | Value::Array(_) => {
                        println!("{}{}{}:", pad, "Item ".cyan(), (i + 1).to_string().yellow());
                        print_pretty(item, indent + 1)?;
                    }
                    scalar => println!("{}{} {}", pad, "-".cyan(), cell(scalar)),
                }
            }
        }
        scalar => println!("{}{}", pad, cell(scalar)),
    }
    Ok(())
}

fn cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Arrays of objects become one row per element; objects become key/value
/// rows. Nested values are rendered inline as JSON.
pub fn render_table(value: &Value) -> Result<String> {
    let mut builder = Builder::default();
    match value {
        Value::Array(rows) if rows.iter().all(Value::is_object) && !rows.is_empty() => {
            let mut columns: Vec<String> = Vec::new();
            for row in rows.iter().filter_map(Value::as_object) {
                for key in row.keys() {
                    if !columns.contains(key) {
                        columns.push(key.clone());
                    }
                }
            }
            builder.push_record(columns.clone());
            for row in rows {
                builder.push_record(columns.iter().map(|c| cell(&row[c.as_str()])));
            }
        }
        Value::Array(items) => {
            builder.push_record(["#", "value"].map(String::from));
            for (i, item) in items.iter().enumerate() {
                builder.push_record([(i + 1).to_string(), cell(item)]);
            }
        }
        Value::Object(map) => {
            builder.push_record(["field", "value"].map(String::from));
            for (key, val) in map {
                builder.push_record([key.clone(), cell(val)]);
            }
        }
        scalar => return Ok(cell(scalar)),
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    Ok(table.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn array_of_objects_uses_union_of_keys() {
        let rendered = render_table(&json!([
            {"id": "api", "type": "component"},
            {"id": "db", "name": "Database"}
        ]))
        .unwrap();
        assert!(rendered.contains("id"));
        assert!(rendered.contains("name"));
        assert!(rendered.contains("Database"));
    }

    #[test]
    fn scalars_and_lists_render() {
        assert_eq!(render_table(&json!("plain")).unwrap(), "plain");
        let list = render_table(&json!(["db", "api"])).unwrap();
        assert!(list.contains("db") && list.contains("api"));
    }
}
