use std::cmp::Ordering;

use regex::{Regex, RegexBuilder};
use serde_json::{Map, Number, Value};

use crate::{document::Document, error::Error};

/// A parsed query, evaluated in memory against materialized documents.
///
/// Top-level fields are AND-ed; `$or` holds alternatives whose own fields are
/// AND-ed. An empty query matches everything.
#[derive(Clone, Debug, Default)]
pub struct Query {
    fields: Vec<FieldCondition>,
    any_of: Option<Vec<Vec<FieldCondition>>>,
}

#[derive(Clone, Debug)]
struct FieldCondition {
    field: String,
    constraint: Constraint,
}

#[derive(Clone, Debug)]
enum Constraint {
    IsNull,
    Equals(Value),
    In(Vec<Value>),
    NotEquals(Value),
    Exists(bool),
    GreaterThan(Value),
    LessThan(Value),
    Matches(Regex),
    /// Object or array literal. Never equal to a stored value.
    Never,
}

impl Query {
    pub fn all() -> Self {
        Self::default()
    }

    /// `null` parses as the empty query; anything else must be an object.
    pub fn parse(query: &Value) -> Result<Self, Error> {
        match query {
            Value::Null => Ok(Self::all()),
            Value::Object(map) => Self::parse_map(map),
            other => Err(Error::InvalidQuery(format!(
                "query must be an object, got {}",
                other
            ))),
        }
    }

    fn parse_map(map: &Map<String, Value>) -> Result<Self, Error> {
        let mut query = Query::default();
        for (field, value) in map {
            if field == "$or" {
                let Value::Array(alternatives) = value else {
                    return Err(Error::InvalidQuery("$or must be an array".to_string()));
                };
                let alternatives = alternatives
                    .iter()
                    .map(|alternative| match alternative {
                        Value::Object(map) => map
                            .iter()
                            .map(|(field, value)| FieldCondition::parse(field, value))
                            .collect::<Result<Vec<_>, _>>(),
                        _ => Err(Error::InvalidQuery(
                            "$or alternatives must be objects".to_string(),
                        )),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                query.any_of = Some(alternatives);
            } else {
                query.fields.push(FieldCondition::parse(field, value)?);
            }
        }
        Ok(query)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.any_of.is_none()
    }

    pub fn matches(&self, document: &Document) -> bool {
        if !self.fields.iter().all(|c| c.matches(document)) {
            return false;
        }
        match &self.any_of {
            Some(alternatives) => alternatives
                .iter()
                .any(|alternative| alternative.iter().all(|c| c.matches(document))),
            None => true,
        }
    }

    pub fn filter(&self, documents: Vec<Document>) -> Vec<Document> {
        if self.is_empty() {
            return documents;
        }
        documents.into_iter().filter(|d| self.matches(d)).collect()
    }
}

impl TryFrom<&Value> for Query {
    type Error = Error;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        Query::parse(value)
    }
}

impl FieldCondition {
    fn parse(field: &str, value: &Value) -> Result<Self, Error> {
        Ok(Self {
            field: field.to_string(),
            constraint: Constraint::parse(value)?,
        })
    }

    fn matches(&self, document: &Document) -> bool {
        let value = document.get(&self.field);
        match &self.constraint {
            Constraint::IsNull => matches!(value, None | Some(Value::Null)),
            Constraint::Equals(expected) => value.is_some_and(|v| loose_eq(v, expected)),
            Constraint::In(candidates) => {
                value.is_some_and(|v| candidates.iter().any(|c| loose_eq(v, c)))
            }
            Constraint::NotEquals(unexpected) => !value.is_some_and(|v| loose_eq(v, unexpected)),
            Constraint::Exists(expected) => is_present(value) == *expected,
            Constraint::GreaterThan(bound) => {
                value.and_then(|v| compare(v, bound)) == Some(Ordering::Greater)
            }
            Constraint::LessThan(bound) => {
                value.and_then(|v| compare(v, bound)) == Some(Ordering::Less)
            }
            Constraint::Matches(regex) => match value {
                Some(v) => regex.is_match(&as_text(v)),
                None => regex.is_match("undefined"),
            },
            Constraint::Never => false,
        }
    }
}

impl Constraint {
    fn parse(value: &Value) -> Result<Self, Error> {
        let operators = match value {
            Value::Null => return Ok(Constraint::IsNull),
            Value::Array(_) => return Ok(Constraint::Never),
            Value::Object(operators) => operators,
            literal => return Ok(Constraint::Equals(literal.clone())),
        };

        if let Some(candidates) = operators.get("$in") {
            let Value::Array(candidates) = candidates else {
                return Err(Error::InvalidQuery("$in must be an array".to_string()));
            };
            return Ok(Constraint::In(candidates.clone()));
        }
        if let Some(unexpected) = operators.get("$ne") {
            return Ok(Constraint::NotEquals(unexpected.clone()));
        }
        if let Some(expected) = operators.get("$exists") {
            return Ok(Constraint::Exists(truthy(expected)));
        }
        if let Some(bound) = operators.get("$gt") {
            return Ok(Constraint::GreaterThan(bound.clone()));
        }
        if let Some(bound) = operators.get("$lt") {
            return Ok(Constraint::LessThan(bound.clone()));
        }
        if let Some(pattern) = operators.get("$regex") {
            let Value::String(pattern) = pattern else {
                return Err(Error::InvalidQuery("$regex must be a string".to_string()));
            };
            let options = match operators.get("$options") {
                None | Some(Value::Null) => "",
                Some(Value::String(options)) => options.as_str(),
                Some(_) => {
                    return Err(Error::InvalidQuery("$options must be a string".to_string()));
                }
            };
            return Ok(Constraint::Matches(build_regex(pattern, options)?));
        }

        // unrecognized operators
        Ok(Constraint::Never)
    }
}

fn build_regex(pattern: &str, options: &str) -> Result<Regex, Error> {
    let mut builder = RegexBuilder::new(pattern);
    for flag in options.chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'x' => builder.ignore_whitespace(true),
            'g' | 'u' | 'y' => &mut builder,
            other => {
                return Err(Error::InvalidQuery(format!("unsupported regex flag `{}`", other)));
            }
        };
    }
    builder
        .build()
        .map_err(|e| Error::InvalidQuery(format!("invalid regex: {}", e)))
}

/// Strict equality on scalars; numbers compare by value. Objects and arrays
/// are never equal.
fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::String(a), Value::String(b)) => a == b,
        _ => false,
    }
}

/// Script-style relational comparison. Two values that are text after
/// conversion compare lexically; anything else compares numerically, and a
/// NaN on either side orders nowhere.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    if is_textual(a) && is_textual(b) {
        return Some(as_text(a).cmp(&as_text(b)));
    }
    as_number(a).partial_cmp(&as_number(b))
}

fn is_textual(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Array(_) | Value::Object(_))
}

fn as_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => parse_number(s),
        Value::Array(_) | Value::Object(_) => parse_number(&as_text(value)),
    }
}

fn parse_number(text: &str) -> f64 {
    let text = text.trim();
    match text {
        "" => return 0.0,
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = text.strip_prefix(prefix) {
            if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
                return f64::NAN;
            }
            return u64::from_str_radix(digits, radix).map_or(f64::NAN, |n| n as f64);
        }
    }
    // rejects "inf" and "nan", which `f64::from_str` would accept
    if text.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
        return f64::NAN;
    }
    text.parse().unwrap_or(f64::NAN)
}

fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// The text a script runtime would produce for `String(value)`.
fn as_text(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number_text(n),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => as_text(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

fn number_text(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f == 0.0 => "0".to_string(),
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e21 => format!("{:.0}", f),
        _ => n.to_string(),
    }
}
