use crate::core::types::Record;
use crate::core::utils::MICROS_PER_SEC;
use crate::query::ast::{BoolGroup, BoolOp, ConditionNode, FieldTest, Predicate};

/// Value of a field as seen by a predicate
#[derive(Debug, Clone, Copy, PartialEq)]
enum FieldValue<'a> {
    Number(i64),
    Text(&'a str),
}

/// Check whether `record` satisfies `node`.
///
/// Pure and deterministic: no state survives between calls. Faults inside a
/// single test (unparseable numbers and the like) resolve to "no match".
pub fn evaluate(node: &ConditionNode, record: &Record) -> bool {
    match node {
        ConditionNode::Predicate(predicate) => matches_predicate(predicate, record),
        ConditionNode::Group(group) => matches_group(group, record),
    }
}

fn matches_group(group: &BoolGroup, record: &Record) -> bool {
    match group.op {
        BoolOp::And => group.children.iter().all(|child| evaluate(child, record)),
        BoolOp::Or => group.children.iter().any(|child| evaluate(child, record)),
        // Children past the first are ignored; an empty NOT never matches
        BoolOp::Not => group
            .children
            .first()
            .map(|child| !evaluate(child, record))
            .unwrap_or(false),
    }
}

fn matches_predicate(predicate: &Predicate, record: &Record) -> bool {
    let value = resolve(record, &predicate.key);

    match &predicate.test {
        FieldTest::Greater(threshold) => matches_greater(&predicate.key, value, *threshold),
        FieldTest::ValuesIn(values) => {
            if values.is_empty() {
                return false;
            }
            value.map_or(false, |v| with_text(v, |s| values.iter().any(|c| c == s)))
        }
        FieldTest::Matches(pattern) => {
            value.map_or(false, |v| with_text(v, |s| pattern.is_match(s)))
        }
        FieldTest::IsNull => is_null(value),
        FieldTest::IsNotNull => !is_null(value),
    }
}

/// Well-known keys map to record attributes; anything else is looked up in
/// the field list, first occurrence wins.
fn resolve<'a>(record: &'a Record, key: &str) -> Option<FieldValue<'a>> {
    match key {
        "timestamp" => Some(FieldValue::Number(clamp_i64(record.timestamp))),
        "msg_len" => Some(FieldValue::Number(clamp_i64(record.msg.len() as u64))),
        "msg" => Some(FieldValue::Text(&record.msg)),
        "service" => Some(FieldValue::Text(&record.service)),
        "hostname" => Some(FieldValue::Text(&record.hostname)),
        "unit" => Some(FieldValue::Text(&record.unit)),
        _ => record.get_field(key).map(FieldValue::Text),
    }
}

fn matches_greater(key: &str, value: Option<FieldValue<'_>>, threshold: i64) -> bool {
    match value {
        Some(FieldValue::Number(n)) => n > threshold,
        // Only custom *TIMESTAMP* fields get numeric coercion
        Some(FieldValue::Text(text)) if key.contains("TIMESTAMP") => {
            parse_seconds_as_micros(text).map_or(false, |us| us > threshold)
        }
        _ => false,
    }
}

/// Fixed-point seconds ("1700000000.250000") to µs
fn parse_seconds_as_micros(text: &str) -> Option<i64> {
    let secs: f64 = text.trim().parse().ok()?;
    let micros = secs * MICROS_PER_SEC as f64;
    if !micros.is_finite() {
        return None;
    }
    Some(micros as i64)
}

fn is_null(value: Option<FieldValue<'_>>) -> bool {
    match value {
        None => true,
        Some(FieldValue::Text(text)) => text.is_empty(),
        Some(FieldValue::Number(_)) => false,
    }
}

fn with_text<F>(value: FieldValue<'_>, f: F) -> bool
where
    F: FnOnce(&str) -> bool,
{
    match value {
        FieldValue::Text(text) => f(text),
        FieldValue::Number(n) => f(&n.to_string()),
    }
}

fn clamp_i64(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}
