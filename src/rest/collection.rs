//! Answers filter, order and page requests from cached records the way the
//! server answers the equivalent query.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::warn;
use serde_json::Value;

use crate::rest::entity::{ID_FIELD, Record, url_value};
use crate::rest::entitydefinition::EntityDefinition;
use crate::rest::fieldtype::FieldType;
use crate::rest::querybuilder::OrderSpec;

/// Keys starting with this sigil are never equality or membership filters.
pub const RESERVED_PREFIX: char = '$';
pub const ORDER_KEY: &str = "$order";
pub const LIMIT_KEY: &str = "$limit";
pub const OFFSET_KEY: &str = "$offset";

pub fn is_reserved(key: &str) -> bool {
    key.starts_with(RESERVED_PREFIX)
}

/// Copy of `filters` without reserved keys.
pub fn strip_reserved(filters: &Record) -> Record {
    filters
        .iter()
        .filter(|(key, _)| !is_reserved(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// `$order` of a filter map, empty when absent.
pub fn order_of(filters: &Record) -> OrderSpec {
    filters.get(ORDER_KEY).map(OrderSpec::from_value).unwrap_or_default()
}

/// Numeric `$limit` / `$offset` style value; zero counts as absent.
pub fn count_of(filters: &Record, key: &str) -> Option<u64> {
    filters.get(key).and_then(Value::as_u64).filter(|n| *n > 0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// One comparator of a sort chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: Direction,
    pub field_type: FieldType,
}

/// Turn `field:direction` tokens into sort keys. A missing or unknown
/// direction means ascending. Undeclared fields compare as strings, except
/// `id` which compares as a number.
pub fn sort_keys(order: &OrderSpec, definition: &EntityDefinition) -> Vec<SortKey> {
    order
        .0
        .iter()
        .map(|token| {
            let mut parts = token.splitn(2, ':');
            let field = parts.next().unwrap_or_default().to_string();
            let direction = match parts.next() {
                Some("desc") => Direction::Desc,
                _ => Direction::Asc,
            };
            let field_type = definition.field_type(&field).unwrap_or(if field == ID_FIELD {
                FieldType::Number
            } else {
                FieldType::String
            });
            if matches!(field_type, FieldType::Array | FieldType::Object) {
                warn!("No sort comparator for type={:?}, defaulting to string", field_type);
            }
            SortKey {
                field,
                direction,
                field_type,
            }
        })
        .collect()
}

/// True when `record` satisfies every non-reserved filter.
pub fn matches_filters(record: &Record, filters: &Record, definition: &EntityDefinition) -> bool {
    filters
        .iter()
        .filter(|(key, _)| !is_reserved(key))
        .all(|(field, expected)| {
            let actual = record.get(field.as_str());
            if definition.field_type(field) == Some(FieldType::Array) {
                match actual {
                    Some(Value::Array(items)) => items.iter().any(|item| values_equal(item, expected)),
                    _ => false,
                }
            } else if let Value::Array(candidates) = expected {
                actual.is_some_and(|actual| {
                    candidates.iter().any(|candidate| values_equal(candidate, actual))
                })
            } else {
                actual.is_some_and(|actual| values_equal(actual, expected))
            }
        })
}

/// Compare two records by a chain of sort keys; later keys break ties.
pub fn compare_records(a: &Record, b: &Record, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let ordering = compare_values(key.field_type, a.get(&key.field), b.get(&key.field));
        let ordering = match key.direction {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Filter then sort `records` per `filters` (`$order` included).
pub fn get_all<'a, I>(records: I, definition: &EntityDefinition, filters: &Record) -> Vec<Record>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut data: Vec<Record> = records
        .into_iter()
        .filter(|record| matches_filters(record, filters, definition))
        .cloned()
        .collect();

    let order = order_of(filters);
    if !order.is_empty() {
        let keys = sort_keys(&order, definition);
        data.sort_by(|a, b| compare_records(a, b, &keys));
    }

    data
}

/// [`get_all`], then skip `$offset` and take `$limit` when either is set.
pub fn get_page<'a, I>(records: I, definition: &EntityDefinition, filters: &Record) -> Vec<Record>
where
    I: IntoIterator<Item = &'a Record>,
{
    let data = get_all(records, definition, filters);
    let limit = count_of(filters, LIMIT_KEY);
    let offset = count_of(filters, OFFSET_KEY);

    if limit.is_none() && offset.is_none() {
        return data;
    }

    let offset = offset.unwrap_or(0) as usize;
    let limit = limit.map(|limit| limit as usize).unwrap_or(usize::MAX);
    data.into_iter().skip(offset).take(limit).collect()
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Ascending comparison of two field values. Missing values sort first.
fn compare_values(field_type: FieldType, a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|value| !value.is_null());
    let b = b.filter(|value| !value.is_null());

    match field_type {
        FieldType::Number => {
            let x = a.and_then(Value::as_f64);
            let y = b.and_then(Value::as_f64);
            compare_options(x, y, |x, y| x.partial_cmp(&y).unwrap_or(Ordering::Equal))
        }
        FieldType::Date => {
            let x = a.and_then(parse_date);
            let y = b.and_then(parse_date);
            compare_options(x, y, |x, y| x.cmp(&y))
        }
        FieldType::Boolean => truthy(a).cmp(&truthy(b)),
        FieldType::String | FieldType::Array | FieldType::Object => compare_strings(a, b),
    }
}

fn compare_strings(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let x = a.map(|value| url_value(value).to_lowercase());
    let y = b.map(|value| url_value(value).to_lowercase());
    compare_options(x, y, |x, y| x.cmp(&y))
}

fn compare_options<T>(a: Option<T>, b: Option<T>, cmp: impl FnOnce(T, T) -> Ordering) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => cmp(x, y),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

/// Milliseconds since the epoch. Numbers are taken as epoch milliseconds.
fn parse_date(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => {
            if let Ok(datetime) = DateTime::parse_from_rfc3339(s) {
                return Some(datetime.timestamp_millis());
            }
            for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
                if let Ok(datetime) = NaiveDateTime::parse_from_str(s, format) {
                    return Some(datetime.and_utc().timestamp_millis());
                }
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|datetime| datetime.and_utc().timestamp_millis())
        }
        _ => None,
    }
}
