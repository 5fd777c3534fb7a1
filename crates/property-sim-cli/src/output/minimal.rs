use serde_json::Value;

/// Headline figures, in order of preference.
const PRIORITY_KEYS: [&str; 5] = [
    "IRR（%）",
    "CCR（%）",
    "表面利回り（%）",
    "DSCR（返済余裕率）",
    "debt_service",
];

/// Print just the key answer value from the output.
///
/// Looks inside the simulation envelope for the metrics block (or the first
/// row of a loan schedule), then walks the priority keys, then falls back to
/// the first field.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);
    let target = match result_obj {
        Value::Object(map) => map.get("metrics").unwrap_or(result_obj),
        Value::Array(rows) => rows.first().unwrap_or(result_obj),
        _ => result_obj,
    };

    if let Value::Object(map) = target {
        for key in &PRIORITY_KEYS {
            if let Some(val) = map.get(*key) {
                if !val.is_null() {
                    println!("{}: {}", key, format_minimal(val));
                    return;
                }
            }
        }

        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_minimal(val));
            return;
        }
    }

    println!("{}", format_minimal(target));
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
