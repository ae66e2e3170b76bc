use serde_json::{Map, Value};

use crate::table::Table;

/// Wrapper keys checked on object payloads, highest priority first.
pub const WRAPPER_KEYS: [&str; 7] = [
    "events", "fixtures", "matches", "data", "result", "items", "odds",
];

/// Column used when a record is not an object.
pub const VALUE_COLUMN: &str = "value";

const LIST_MAX_LEVEL: usize = 1;
const WRAPPED_MAX_LEVEL: usize = 2;

/// Turns an arbitrary odds payload into a flat table. Never fails.
pub fn normalize_any(root: &Value) -> Table {
    match root {
        Value::Null => Table::default(),
        Value::Array(items) => flatten_list(items, LIST_MAX_LEVEL),
        Value::Object(obj) => {
            for key in WRAPPER_KEYS {
                if let Some(Value::Array(items)) = obj.get(key) {
                    tracing::debug!(key, rows = items.len(), "normalizing wrapped list");
                    return flatten_list(items, WRAPPED_MAX_LEVEL);
                }
            }
            Table::from_records(vec![flatten_object(obj, WRAPPED_MAX_LEVEL)])
        }
        other => Table::from_records(vec![scalar_record(other)]),
    }
}

/// Which branch of [`normalize_any`] a payload takes, for diagnostics.
pub fn detect_shape(root: &Value) -> &'static str {
    match root {
        Value::Null => "null",
        Value::Array(_) => "list",
        Value::Object(obj) => WRAPPER_KEYS
            .iter()
            .find(|key| matches!(obj.get(**key), Some(Value::Array(_))))
            .copied()
            .unwrap_or("object"),
        _ => "scalar",
    }
}

fn flatten_list(items: &[Value], max_level: usize) -> Table {
    let records = items
        .iter()
        .map(|item| match item {
            Value::Object(obj) => flatten_object(obj, max_level),
            other => scalar_record(other),
        })
        .collect();
    Table::from_records(records)
}

/// Flattens nested objects into dotted keys, expanding at most
/// `max_level` levels. Deeper objects and all arrays stay as values.
pub fn flatten_object(obj: &Map<String, Value>, max_level: usize) -> Map<String, Value> {
    let mut out = Map::new();
    flatten_into(&mut out, None, obj, 0, max_level);
    out
}

fn flatten_into(
    out: &mut Map<String, Value>,
    prefix: Option<&str>,
    obj: &Map<String, Value>,
    level: usize,
    max_level: usize,
) {
    for (key, value) in obj {
        let name = match prefix {
            Some(prefix) => format!("{prefix}.{key}"),
            None => key.clone(),
        };
        match value {
            Value::Object(inner) if level < max_level => {
                flatten_into(out, Some(&name), inner, level + 1, max_level);
            }
            other => {
                out.insert(name, other.clone());
            }
        }
    }
}

fn scalar_record(value: &Value) -> Map<String, Value> {
    let mut out = Map::new();
    out.insert(VALUE_COLUMN.to_string(), value.clone());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_flattens_one_level() {
        let table = normalize_any(&json!([
            {"id": 1, "league": {"sport": {"name": "tennis"}}},
        ]));
        assert_eq!(table.columns, vec!["id", "league.sport"]);
        assert_eq!(table.rows[0][1], json!({"name": "tennis"}));
    }

    #[test]
    fn wrapped_list_flattens_two_levels() {
        let table = normalize_any(&json!({
            "events": [{"league": {"sport": {"name": "tennis", "x": {"y": 1}}}}]
        }));
        assert_eq!(
            table.columns,
            vec!["league.sport.name", "league.sport.x"]
        );
    }

    #[test]
    fn empty_nested_object_drops_column() {
        let flat = flatten_object(json!({"a": {}, "b": 1}).as_object().unwrap(), 2);
        assert_eq!(flat.keys().collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn non_list_wrapper_is_skipped() {
        let root = json!({"events": {"n": 1}, "data": [{"a": 1}, {"a": 2}]});
        assert_eq!(detect_shape(&root), "data");
        assert_eq!(normalize_any(&root).len(), 2);
    }

    #[test]
    fn scalar_becomes_single_value_row() {
        let table = normalize_any(&json!("oops"));
        assert_eq!(table.columns, vec![VALUE_COLUMN]);
        assert_eq!(table.rows, vec![vec![json!("oops")]]);
    }
}
