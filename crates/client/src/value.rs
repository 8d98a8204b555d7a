//! Typed field values and the date/time formats they are read and written with.

use {
    crate::{http::ParamValue, metadata::FieldType},
    chrono::{NaiveDate, NaiveDateTime, NaiveTime},
    rust_decimal::Decimal,
    serde::Serialize,
    url::Url,
};

/// A coerced field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Text(String),
    Number(Decimal),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    /// Container data: inline text, or a server path when it carries a query.
    Container(String),
    /// All values of a repeating field, in repetition order.
    Repeating(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(text) | Value::Container(text) => Some(text),
            _ => None,
        }
    }

    /// Resolves a container path against the server's base URL.
    ///
    /// Only containers whose data is a server path (it carries a `?query`)
    /// resolve; inline container data yields `None`.
    pub fn container_url(&self, base: &Url) -> Option<Url> {
        let Value::Container(path) = self else {
            return None;
        };
        let (path, query) = path.split_once('?')?;
        let mut url = base.clone();
        url.set_path(path);
        url.set_query(Some(query));
        Some(url)
    }

    /// Converts temporal values to the field's declared result type, so a
    /// timestamp written to a date field is sent as a date.
    ///
    /// Non-temporal values, and temporal values with no sensible conversion,
    /// are returned unchanged.
    pub fn conform_to(self, result: &FieldType) -> Value {
        match (self, result) {
            (Value::Timestamp(stamp), FieldType::Date) => Value::Date(stamp.date()),
            (Value::Timestamp(stamp), FieldType::Time) => Value::Time(stamp.time()),
            (Value::Date(date), FieldType::Timestamp) => {
                Value::Timestamp(date.and_time(NaiveTime::MIN))
            }
            (Value::Repeating(values), result) => Value::Repeating(
                values
                    .into_iter()
                    .map(|value| value.conform_to(result))
                    .collect(),
            ),
            (value, _) => value,
        }
    }

    /// Renders the value as request text using `formats`.
    pub fn to_wire(&self, formats: &Formats) -> ParamValue {
        match self {
            Value::Repeating(values) => ParamValue::Repeated(
                values.iter().map(|value| value.to_wire_text(formats)).collect(),
            ),
            other => ParamValue::Single(other.to_wire_text(formats)),
        }
    }

    fn to_wire_text(&self, formats: &Formats) -> String {
        match self {
            Value::Null => String::new(),
            Value::Text(text) | Value::Container(text) => text.clone(),
            Value::Number(number) => number.normalize().to_string(),
            Value::Date(date) => date.format(&formats.date).to_string(),
            Value::Time(time) => time.format(&formats.time).to_string(),
            Value::Timestamp(stamp) => stamp.format(&formats.timestamp).to_string(),
            Value::Repeating(values) => values
                .first()
                .map(|value| value.to_wire_text(formats))
                .unwrap_or_default(),
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Text(text)
    }
}

impl From<Decimal> for Value {
    fn from(number: Decimal) -> Self {
        Value::Number(number)
    }
}

impl From<i64> for Value {
    fn from(number: i64) -> Self {
        Value::Number(Decimal::from(number))
    }
}

impl From<NaiveDate> for Value {
    fn from(date: NaiveDate) -> Self {
        Value::Date(date)
    }
}

impl From<NaiveTime> for Value {
    fn from(time: NaiveTime) -> Self {
        Value::Time(time)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(stamp: NaiveDateTime) -> Self {
        Value::Timestamp(stamp)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::Repeating(values.into_iter().map(Into::into).collect())
    }
}

pub const DEFAULT_DATE_FORMAT: &str = "%m/%d/%Y";
pub const DEFAULT_TIME_FORMAT: &str = "%H:%M:%S";
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%m/%d/%Y %H:%M:%S";

/// strftime patterns for the three temporal result types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formats {
    pub date: String,
    pub time: String,
    pub timestamp: String,
}

impl Default for Formats {
    fn default() -> Self {
        Self {
            date: DEFAULT_DATE_FORMAT.to_string(),
            time: DEFAULT_TIME_FORMAT.to_string(),
            timestamp: DEFAULT_TIMESTAMP_FORMAT.to_string(),
        }
    }
}

impl Formats {
    /// Builds formats from the patterns a datasource declares
    /// (`MM/dd/yyyy`, `HH:mm:ss`, ...). Missing or unusable patterns fall back
    /// to the defaults.
    pub fn from_filemaker(date: Option<&str>, time: Option<&str>, timestamp: Option<&str>) -> Self {
        Self {
            date: convert(date).unwrap_or_else(|| DEFAULT_DATE_FORMAT.to_string()),
            time: convert(time).unwrap_or_else(|| DEFAULT_TIME_FORMAT.to_string()),
            timestamp: convert(timestamp).unwrap_or_else(|| DEFAULT_TIMESTAMP_FORMAT.to_string()),
        }
    }
}

/// Converts a FileMaker pattern to strftime; `None` when nothing converts.
pub fn convert(pattern: Option<&str>) -> Option<String> {
    let pattern = pattern?.trim();
    if pattern.is_empty() {
        return None;
    }
    let converted = [
        ("yyyy", "%Y"),
        ("MM", "%m"),
        ("dd", "%d"),
        ("HH", "%H"),
        ("mm", "%M"),
        ("ss", "%S"),
    ]
    .iter()
    .fold(pattern.to_string(), |acc, (from, to)| acc.replace(from, to));
    converted.contains('%').then_some(converted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn filemaker_patterns_convert() {
        let formats = Formats::from_filemaker(
            Some("MM/dd/yyyy"),
            Some("HH:mm:ss"),
            Some("MM/dd/yyyy HH:mm:ss"),
        );
        assert_eq!(formats, Formats::default());

        let iso = Formats::from_filemaker(Some("yyyy-MM-dd"), Some(""), Some("garbage"));
        assert_eq!(iso.date, "%Y-%m-%d");
        assert_eq!(iso.time, DEFAULT_TIME_FORMAT);
        assert_eq!(iso.timestamp, DEFAULT_TIMESTAMP_FORMAT);
    }

    #[test]
    fn values_render_with_formats() {
        let formats = Formats::from_filemaker(Some("dd.MM.yyyy"), None, None);
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(Value::from(date).to_wire(&formats), ParamValue::Single("09.03.2024".into()));

        let number: Decimal = "12.500".parse().unwrap();
        assert_eq!(Value::from(number).to_wire(&formats), ParamValue::Single("12.5".into()));
        assert_eq!(
            Value::from(vec!["a", "b"]).to_wire(&formats),
            ParamValue::Repeated(vec!["a".into(), "b".into()])
        );
        assert_eq!(Value::Null.to_wire(&formats), ParamValue::Single(String::new()));
    }

    #[test]
    fn container_paths_resolve_against_base() {
        let base = Url::parse("https://fm.example:443/").unwrap();
        let path = Value::Container("/fmi/xml/cnt/photo.jpg?-db=Contacts&-recid=1".into());
        assert_eq!(
            path.container_url(&base).unwrap().as_str(),
            "https://fm.example/fmi/xml/cnt/photo.jpg?-db=Contacts&-recid=1"
        );
        assert_eq!(Value::Container("inline".into()).container_url(&base), None);
        assert_eq!(Value::Text("a?b".into()).container_url(&base), None);
    }
}
