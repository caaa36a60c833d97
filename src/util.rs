//! Private utility module
use crate::error::{parse_err, Result};

/// Parse a whitespace separated list of non-negative integers, as found in
/// the character data of index elements.
pub(crate) fn read_index_array(text: &str) -> Result<Vec<i64>> {
    let mut ret = Vec::new();
    for token in text.split_whitespace() {
        let value: i64 = match token.parse() {
            Ok(v) => v,
            Err(_) => return parse_err(format!("found noninteger in index array: {}", token)),
        };
        if value < 0 {
            return parse_err(format!("found negative integer in index array: {}", token));
        }
        ret.push(value);
    }
    Ok(ret)
}

/// Join integers with single spaces.
pub(crate) fn join_indices<I>(values: I) -> String
where
    I: IntoIterator,
    I::Item: ToString,
{
    values
        .into_iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Format a floating point value with 7 digits after the decimal point.
pub(crate) fn fmt_float<T: Into<f64>>(value: T) -> String {
    format!("{:.7}", value.into())
}

/// Parse a required integer attribute value.
pub(crate) fn parse_int(value: &str, what: &str) -> Result<i64> {
    value
        .trim()
        .parse()
        .or_else(|_| parse_err(format!("{} must be an integer, found '{}'", what, value)))
}

/// Parse a required floating point attribute value.
pub(crate) fn parse_float(value: &str, what: &str) -> Result<f64> {
    value
        .trim()
        .parse()
        .or_else(|_| parse_err(format!("{} must be a number, found '{}'", what, value)))
}

/// Parse a boolean the way palette and metadata values spell them.
pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim() {
        "true" | "True" | "TRUE" | "1" => Some(true),
        "false" | "False" | "FALSE" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_arrays() {
        assert_eq!(read_index_array(" 1 2\n3\t4 ").unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(read_index_array("").unwrap(), Vec::<i64>::new());
        let err = read_index_array("1 x 3").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cifti XML error: found noninteger in index array: x"
        );
        let err = read_index_array("1 -3").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cifti XML error: found negative integer in index array: -3"
        );
    }

    #[test]
    fn formatting() {
        assert_eq!(fmt_float(1.0f32), "1.0000000");
        assert_eq!(fmt_float(-0.5f64), "-0.5000000");
        assert_eq!(join_indices(vec![3i64, 1, 2]), "3 1 2");
        assert_eq!(join_indices(Vec::<i64>::new()), "");
    }

    #[test]
    fn scalars() {
        assert_eq!(parse_int(" 12 ", "x").unwrap(), 12);
        assert!(parse_int("1.5", "x").is_err());
        assert_eq!(parse_float("1e-3", "x").unwrap(), 0.001);
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
