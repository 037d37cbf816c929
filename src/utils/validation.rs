// Helpers for optional string inputs

/// `None` for absent or whitespace-only input, otherwise the trimmed value
pub fn trim_optional_field(field: Option<&String>) -> Option<String> {
    field.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Normalize an email for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_optional_field() {
        assert_eq!(trim_optional_field(None), None);
        assert_eq!(trim_optional_field(Some(&"   ".to_string())), None);
        assert_eq!(
            trim_optional_field(Some(&"  Sofia ".to_string())),
            Some("Sofia".to_string())
        );
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email(" Driver@Example.COM "), "driver@example.com");
    }
}
