use crate::utils::error::{EnrollError, Result};
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(EnrollError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(EnrollError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(EnrollError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(EnrollError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(EnrollError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

static ACADEMIC_YEAR_RE: OnceLock<Regex> = OnceLock::new();

/// 學年格式:YYYY-YYYY,而且必須是連續的兩年 (例如 "2024-2025")。
pub fn validate_academic_year(field_name: &str, value: &str) -> Result<()> {
    let re = ACADEMIC_YEAR_RE
        .get_or_init(|| Regex::new(r"^(\d{4})-(\d{4})$").expect("academic year pattern is valid"));

    let invalid = |reason: String| EnrollError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: value.to_string(),
        reason,
    };

    let caps = re
        .captures(value)
        .ok_or_else(|| invalid("Expected format YYYY-YYYY, e.g. 2024-2025".to_string()))?;

    let start: u32 = caps[1]
        .parse()
        .map_err(|_| invalid("Start year is not a number".to_string()))?;
    let end: u32 = caps[2]
        .parse()
        .map_err(|_| invalid("End year is not a number".to_string()))?;

    if end != start + 1 {
        return Err(invalid(
            "Academic year must span two consecutive years".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("api.base_url", "https://campus.example.com/api").is_ok());
        assert!(validate_url("api.base_url", "http://localhost:5000").is_ok());
        assert!(validate_url("api.base_url", "").is_err());
        assert!(validate_url("api.base_url", "not-a-url").is_err());
        assert!(validate_url("api.base_url", "ftp://campus.example.com").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("template.semester", 3, 1).is_ok());
        assert!(validate_positive_number("template.semester", 0, 1).is_err());
    }

    #[test]
    fn test_validate_academic_year() {
        assert!(validate_academic_year("template.academic_year", "2024-2025").is_ok());
        assert!(validate_academic_year("template.academic_year", "2024").is_err());
        assert!(validate_academic_year("template.academic_year", "2024-2026").is_err());
        assert!(validate_academic_year("template.academic_year", "2025-2024").is_err());
        assert!(validate_academic_year("template.academic_year", "24-25").is_err());
    }

    #[test]
    fn test_validate_non_empty_string() {
        assert!(validate_non_empty_string("template.program", "prog-ce").is_ok());
        assert!(validate_non_empty_string("template.program", "   ").is_err());
    }
}
