use serde_json::Value;
use std::io::{self, Read};

/// Attempt to read JSON (or YAML) from stdin if data is being piped.
/// Returns None if stdin is a TTY (interactive).
pub fn read_stdin() -> Result<Option<Value>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;

    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    parse(trimmed).map(Some)
}

fn parse(text: &str) -> Result<Value, Box<dyn std::error::Error>> {
    match serde_json::from_str(text) {
        Ok(v) => Ok(v),
        Err(json_err) => serde_yaml::from_str(text)
            .map_err(|_| format!("stdin is neither JSON nor YAML: {json_err}").into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_and_yaml() {
        let json = parse(r#"{"exit": {"exit_year": 2030}}"#).unwrap();
        let yaml = parse("exit:\n  exit_year: 2030\n").unwrap();
        assert_eq!(json, yaml);
    }
}
