/// Header parsing helpers for provider message payloads.

/// Extracts the bare address from a `From` header value.
///
/// Prefers the bracketed form (`Jane Doe <jane@example.com>`); when no
/// brackets are present the trimmed raw value is returned as-is.
pub fn sender_address(from_header: &str) -> String {
    if let (Some(start), Some(end)) = (from_header.find('<'), from_header.rfind('>')) {
        if start < end {
            return from_header[start + 1..end].trim().to_string();
        }
    }
    from_header.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bracketed_address() {
        assert_eq!(
            sender_address("Jane Doe <jane@example.com>"),
            "jane@example.com"
        );
    }

    #[test]
    fn test_bare_address_fallback() {
        assert_eq!(sender_address("jane@example.com"), "jane@example.com");
        assert_eq!(sender_address("  jane@example.com  "), "jane@example.com");
    }

    #[test]
    fn test_brackets_without_name() {
        assert_eq!(sender_address("<jane@example.com>"), "jane@example.com");
    }

    #[test]
    fn test_malformed_brackets_fall_back_to_raw() {
        assert_eq!(sender_address("jane@example.com>"), "jane@example.com>");
    }

    #[test]
    fn test_empty_header() {
        assert_eq!(sender_address(""), "");
    }
}
