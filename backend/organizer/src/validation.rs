use crate::errors::{Result, SantaError};

/// Validates that a string is not blank. Returns the trimmed string.
pub fn non_blank(value: &str, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(SantaError::Validation(format!("{field} cannot be blank")))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Loose email check: exactly one `@` with something on both sides.
/// Returns the trimmed, lower-cased address.
pub fn email(value: &str) -> Result<String> {
    let trimmed = value.trim().to_ascii_lowercase();
    let mut parts = trimmed.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) if !local.is_empty() && !domain.is_empty() => {
            Ok(trimmed)
        }
        _ => Err(SantaError::Validation(format!(
            "'{}' is not a valid email address",
            value.trim()
        ))),
    }
}

/// Optional gift link: blank means none, otherwise it must be http(s).
pub fn optional_link(value: Option<&str>) -> Result<Option<String>> {
    match value.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(link) if link.starts_with("http://") || link.starts_with("https://") => {
            Ok(Some(link.to_string()))
        }
        Some(link) => Err(SantaError::Validation(format!(
            "link '{link}' must start with http:// or https://"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_blank_trims_whitespace() {
        assert_eq!(non_blank("  Office party ", "name").unwrap(), "Office party");
    }

    #[test]
    fn non_blank_rejects_whitespace_only() {
        assert!(non_blank("   ", "name").is_err());
    }

    #[test]
    fn email_is_normalised() {
        assert_eq!(email(" Ann@Example.com ").unwrap(), "ann@example.com");
    }

    #[test]
    fn email_rejects_malformed() {
        for bad in ["", "ann", "@example.com", "ann@", "a@b@c"] {
            assert!(email(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn link_rules() {
        assert_eq!(optional_link(None).unwrap(), None);
        assert_eq!(optional_link(Some("  ")).unwrap(), None);
        assert_eq!(
            optional_link(Some("https://shop.example/item")).unwrap().as_deref(),
            Some("https://shop.example/item")
        );
        assert!(optional_link(Some("javascript:alert(1)")).is_err());
    }
}
