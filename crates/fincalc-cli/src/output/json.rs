use serde_json::Value;

/// Pretty-print JSON to stdout.
pub fn print_json(value: &Value) {
    match render_json(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("JSON serialization error: {}", e),
    }
}

fn render_json(value: &Value) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_json_keeps_decimal_strings() {
        let rendered = render_json(&json!({ "result": { "payment": "-926.23" } })).unwrap();
        assert!(rendered.contains("\"payment\": \"-926.23\""));
        assert!(rendered.lines().count() > 1);
    }
}
