use serde_json::Value;
use std::io::{self, Read};

/// Attempt to read parameters from stdin if data is being piped.
/// Returns None if stdin is a TTY (interactive).
///
/// JSON is tried first; anything else is parsed as YAML.
pub fn read_stdin() -> Result<Option<Value>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;

    parse_document(&buffer)
}

fn parse_document(buffer: &str) -> Result<Option<Value>, Box<dyn std::error::Error>> {
    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let value: Value = match serde_json::from_str(trimmed) {
        Ok(value) => value,
        Err(_) => serde_yaml::from_str(trimmed)?,
    };
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_and_yaml_documents() {
        let json = parse_document(r#"{"purchase_price": 3000}"#).unwrap().unwrap();
        assert_eq!(json["purchase_price"], 3000);

        let yaml = parse_document("purchase_price: 3000\nloan_type: 元金均等\n")
            .unwrap()
            .unwrap();
        assert_eq!(yaml["purchase_price"], 3000);
        assert_eq!(yaml["loan_type"], "元金均等");

        assert!(parse_document("   \n").unwrap().is_none());
    }
}
