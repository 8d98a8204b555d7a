use {
    crate::{
        err::{Error, FileMakerError},
        value::{Formats, Value},
        Result,
    },
    chrono::{NaiveDate, NaiveDateTime, NaiveTime},
    derive_getters::Getters,
    filemaker_sax::Node,
    rust_decimal::Decimal,
    serde::Serialize,
    std::str::FromStr,
};

/// Declared result type of a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    Date,
    Time,
    Timestamp,
    Container,
    Other(String),
}

impl From<&str> for FieldType {
    fn from(result: &str) -> Self {
        match result.to_ascii_lowercase().as_str() {
            "text" => FieldType::Text,
            "number" => FieldType::Number,
            "date" => FieldType::Date,
            "time" => FieldType::Time,
            "timestamp" => FieldType::Timestamp,
            "container" => FieldType::Container,
            other => FieldType::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[default]
    Normal,
    Calculation,
    Summary,
}

impl From<&str> for FieldKind {
    fn from(kind: &str) -> Self {
        match kind.to_ascii_lowercase().as_str() {
            "calculation" => FieldKind::Calculation,
            "summary" => FieldKind::Summary,
            _ => FieldKind::Normal,
        }
    }
}

/// Definition of one field as reported alongside a result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Getters)]
pub struct Field {
    name: String,
    result: FieldType,
    kind: FieldKind,
    max_repeats: usize,
    global: bool,
    auto_enter: bool,
    not_empty: bool,
    numeric_only: bool,
    four_digit_year: bool,
    time_of_day: bool,
}

fn flag(node: &Node, name: &str) -> bool {
    node.attribute(name)
        .map(|v| v.eq_ignore_ascii_case("yes"))
        .unwrap_or(false)
}

impl Field {
    pub fn new(name: impl Into<String>, result: FieldType) -> Self {
        Self {
            name: name.into(),
            result,
            kind: FieldKind::Normal,
            max_repeats: 1,
            global: false,
            auto_enter: false,
            not_empty: false,
            numeric_only: false,
            four_digit_year: false,
            time_of_day: false,
        }
    }

    /// Reads a `field-definition` element.
    pub fn from_definition(node: &Node) -> Self {
        Self {
            name: node.attribute("name").unwrap_or_default().to_string(),
            result: FieldType::from(node.attribute("result").unwrap_or("text")),
            kind: FieldKind::from(node.attribute("type").unwrap_or("normal")),
            max_repeats: node
                .attribute("max_repeat")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(1),
            global: flag(node, "global"),
            auto_enter: flag(node, "auto_enter"),
            not_empty: flag(node, "not_empty"),
            numeric_only: flag(node, "numeric_only"),
            four_digit_year: flag(node, "four_digit_year"),
            time_of_day: flag(node, "time_of_day"),
        }
    }

    /// The name a portal field is stored under: the part after `Table::`.
    pub fn portal_key(&self) -> &str {
        self.name
            .rsplit_once("::")
            .map(|(_, field)| field)
            .unwrap_or(&self.name)
    }

    /// Coerces one wire value. Empty input is null.
    pub fn coerce(&self, raw: &str, formats: &Formats) -> Result<Value> {
        if raw.is_empty() {
            return Ok(Value::Null);
        }
        let bad = |code: u32, pattern: &str| Error::Coercion {
            field: self.name.clone(),
            source: FileMakerError::new(code)
                .with_message(format!("{raw:?} is not a valid {pattern} value")),
        };
        match &self.result {
            FieldType::Text => Ok(Value::Text(raw.to_string())),
            FieldType::Number => parse_number(raw)
                .map(Value::Number)
                .ok_or_else(|| bad(502, "number")),
            FieldType::Date => NaiveDate::parse_from_str(raw, &formats.date)
                .map(Value::Date)
                .map_err(|_| bad(500, &formats.date)),
            FieldType::Time => NaiveTime::parse_from_str(raw, &formats.time)
                .map(Value::Time)
                .map_err(|_| bad(501, &formats.time)),
            FieldType::Timestamp => NaiveDateTime::parse_from_str(raw, &formats.timestamp)
                .map(Value::Timestamp)
                .map_err(|_| bad(500, &formats.timestamp)),
            FieldType::Container => Ok(Value::Container(raw.to_string())),
            FieldType::Other(_) => Ok(Value::Null),
        }
    }

    /// Coerces every repetition of a field. One value stays scalar; several
    /// become [`Value::Repeating`].
    pub fn coerce_all<'a, I>(&self, raws: I, formats: &Formats) -> Result<Value>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut values = raws
            .into_iter()
            .map(|raw| self.coerce(raw, formats))
            .collect::<Result<Vec<_>>>()?;
        Ok(match values.len() {
            0 => Value::Null,
            1 => values.remove(0),
            _ => Value::Repeating(values),
        })
    }
}

fn parse_number(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
}
