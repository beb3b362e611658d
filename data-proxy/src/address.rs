use regex::Regex;
use std::sync::LazyLock;

static ZIPCODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{5})(?:-\d{4})?\b").expect("zipcode pattern is valid")
});

/// Extracts the US zipcode from a free-form address.
///
/// The last match wins so a five-digit street number does not shadow the
/// zipcode; ZIP+4 codes are reduced to five digits.
pub fn extract_zipcode(address: &str) -> Option<String> {
    ZIPCODE
        .captures_iter(address)
        .last()
        .map(|caps| caps[1].to_string())
}

/// Canonical form of a user-typed address, used for cache keys.
pub fn normalize(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_zipcode() {
        assert_eq!(
            extract_zipcode("1247 Oak Valley Dr, Austin, TX 78704").as_deref(),
            Some("78704")
        );
        assert_eq!(
            extract_zipcode("12345 Ranch Road 620, Bee Cave, TX 78738-1234").as_deref(),
            Some("78738")
        );
        assert_eq!(extract_zipcode("500 West 2nd St, Austin, TX"), None);
        assert_eq!(extract_zipcode("Unit 123456, Austin"), None);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(
            normalize("  1247 Oak  Valley Dr,\tAustin TX "),
            "1247 oak valley dr, austin tx"
        );
    }
}
