//! Терпимые десериализаторы для полей сущностей.
//!
//! Backend отдаёт `null` вместо пустой строки, числа вместо строк и даты в
//! нескольких форматах. Одно кривое поле не должно ронять разбор всего списка,
//! поэтому такие значения сводятся к пустым, а сомнительные даты логируются.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

use crate::models::Location;

/// Строка; `null` и не-скаляры дают пустую строку.
pub(crate) fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(optional_text(deserializer)?.unwrap_or_default())
}

/// Необязательная строка; числа и булевы приводятся к тексту.
pub(crate) fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(number)) => Some(number.to_string()),
        Some(Value::Bool(flag)) => Some(flag.to_string()),
        _ => None,
    })
}

/// Флаг; понимает `"true"`/`"false"` и числа, всё остальное считается `false`.
pub(crate) fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(flag)) => flag,
        Some(Value::String(text)) => text.trim().eq_ignore_ascii_case("true"),
        Some(Value::Number(number)) => number.as_f64().is_some_and(|n| n != 0.0),
        _ => false,
    })
}

/// Момент времени: RFC 3339, дата-время без зоны, голая дата или миллисекунды Unix.
pub(crate) fn timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let parsed = match &value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(text)) if text.trim().is_empty() => return Ok(None),
        Some(Value::String(text)) => parse_timestamp(text.trim()),
        Some(Value::Number(number)) => number.as_i64().and_then(DateTime::from_timestamp_millis),
        Some(_) => None,
    };

    if parsed.is_none() {
        warn!(value = ?value, "unparseable timestamp, leaving it empty");
    }
    Ok(parsed)
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(moment) = DateTime::parse_from_rfc3339(text) {
        return Some(moment.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Адрес; строка считается названием города, не-объекты отбрасываются.
pub(crate) fn location<'de, D>(deserializer: D) -> Result<Option<Location>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(city)) if !city.trim().is_empty() => Some(Location {
            city: Some(city),
            ..Location::default()
        }),
        Some(object @ Value::Object(_)) => serde_json::from_value(object).ok(),
        _ => None,
    })
}
