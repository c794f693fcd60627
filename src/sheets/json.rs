//! JSON parsing utilities for the spreadsheet values client.

use anyhow::Result;

/// Attempt to parse JSON and, on failure, include the serde path and a snippet
/// of the line where the error occurred.
pub fn parse_json_with_context<T: serde::de::DeserializeOwned>(body: &str) -> Result<T> {
    let jd = &mut serde_json::Deserializer::from_str(body);
    match serde_path_to_error::deserialize(jd) {
        Ok(value) => Ok(value),
        Err(err) => {
            let inner_err = err.inner();
            let (line, column) = (inner_err.line(), inner_err.column());
            let path = err.path().to_string();

            let msg = inner_err.to_string();
            let loc = format!(" at line {line} column {column}");
            let msg_without_loc = msg.strip_suffix(&loc).unwrap_or(&msg);

            let mut final_err = String::new();
            if !path.is_empty() && path != "." {
                final_err.push_str(&format!("at path '{path}': "));
            }
            final_err.push_str(&format!(
                "{msg_without_loc} (line {line} col {column})\n{}",
                build_error_snippet(body, line, column, 20)
            ));

            Err(anyhow::anyhow!(final_err))
        }
    }
}

fn build_error_snippet(body: &str, line: usize, column: usize, context_len: usize) -> String {
    let target_line = body.lines().nth(line.saturating_sub(1)).unwrap_or("");
    if target_line.is_empty() {
        return "(empty line)".to_string();
    }

    // column is 1-based
    let error_idx = column.saturating_sub(1).min(target_line.len());
    let half_len = context_len / 2;
    let mut start = error_idx.saturating_sub(half_len);
    let mut end = (error_idx + half_len).min(target_line.len());
    while !target_line.is_char_boundary(start) {
        start -= 1;
    }
    while !target_line.is_char_boundary(end) {
        end += 1;
    }

    let indicator = " ".repeat(error_idx - start) + "^";
    format!("...{}...\n   {indicator}", &target_line[start..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct ValueRange {
        #[allow(dead_code)]
        range: String,
        #[allow(dead_code)]
        values: Vec<Vec<String>>,
    }

    #[test]
    fn reports_the_failing_path() {
        let json = r#"{"range": "BONUS!A1:F3", "values": [["Unidade", "Bonus"], ["Centro", 4]]}"#;
        let err = parse_json_with_context::<ValueRange>(json)
            .unwrap_err()
            .to_string();

        assert!(err.contains("values[1][1]"), "{err}");
        assert!(err.contains("invalid type"), "{err}");
    }

    #[test]
    fn parses_valid_payload() {
        let json = r#"{"range": "BONUS!A1:B1", "values": [["Unidade", "Bonus"]]}"#;
        let parsed: ValueRange = parse_json_with_context(json).unwrap();
        assert_eq!(parsed.values[0][1], "Bonus");
    }

    #[test]
    fn snippet_handles_multibyte_text() {
        let json = "{\"range\": \"GESTÃO!A1\", \"values\": [[\"São Paulo\", null]]}";
        let err = parse_json_with_context::<ValueRange>(json)
            .unwrap_err()
            .to_string();
        assert!(err.contains('^'), "{err}");
    }
}
