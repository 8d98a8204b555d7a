use colored::*;
use serde_json::Value;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Indented JSON
    Json,
    /// One JSON document per line
    Compact,
    /// Human-readable listing
    Pretty,
}

/// Color mode options
#[derive(Debug, Clone, Copy, PartialEq, clap::ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    pub fn should_colorize(&self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => {
                atty::is(atty::Stream::Stdout)
                    && supports_color::on(supports_color::Stream::Stdout).is_some()
            }
        }
    }
}

/// Format a single value for display
fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(arr) => {
            if arr.is_empty() {
                "[]".to_string()
            } else if arr.len() <= 3 {
                format!(
                    "[{}]",
                    arr.iter()
                        .map(format_value)
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            } else {
                format!("[{} items]", arr.len())
            }
        }
        Value::Object(_) => "{...}".to_string(),
    }
}

/// Format one serialized record: id header, then its fields
pub fn format_record(record: &Value, colorize: bool) -> String {
    let Some(fields) = record.as_object() else {
        return format_value(record);
    };
    let id = fields
        .get("-recid")
        .and_then(Value::as_str)
        .unwrap_or("new");
    let mut lines = vec![if colorize {
        format!("{} {}", "Record".bold(), id.bright_cyan().bold())
    } else {
        format!("Record {}", id)
    }];

    for (field, value) in fields.iter().filter(|(k, _)| !k.starts_with('-')) {
        let value_str = match value {
            Value::Array(rows) if rows.iter().all(Value::is_object) && !rows.is_empty() => {
                format!("{} portal rows", rows.len())
            }
            other => format_value(other),
        };
        if colorize {
            lines.push(format!("  {}: {}", field.bright_yellow(), value_str));
        } else {
            lines.push(format!("  {}: {}", field, value_str));
        }
    }

    lines.join("\n")
}

/// Render any serializable result in `format`
pub fn render(value: &Value, format: OutputFormat, colorize: bool) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Compact => match value {
            Value::Array(items) => items
                .iter()
                .map(serde_json::to_string)
                .collect::<Result<Vec<_>, _>>()?
                .join("\n"),
            other => serde_json::to_string(other)?,
        },
        OutputFormat::Pretty => match value {
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => format_record(other, colorize),
                })
                .collect::<Vec<_>>()
                .join("\n"),
            Value::Object(_) => format_record(value, colorize),
            other => format_value(other),
        },
    })
}

/// Format the summary line of a record listing
pub fn format_counts(shown: usize, found: usize, total: usize, colorize: bool) -> String {
    if colorize {
        format!(
            "{} {} {} {} {}",
            shown.to_string().bold(),
            "of".dimmed(),
            found.to_string().bold(),
            "found, table holds".dimmed(),
            total
        )
    } else {
        format!("{} of {} found, table holds {}", shown, found, total)
    }
}
