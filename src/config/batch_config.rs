use crate::domain::model::EnrollmentTemplate;
use crate::utils::error::{EnrollError, Result};
use crate::utils::validation::{
    validate_academic_year, validate_non_empty_string, validate_positive_number, validate_url,
    Validate,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// 一次批次註冊的完整描述:API 位置 + 共用模板 + 學生名單。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    pub api: ApiConfig,
    pub template: EnrollmentTemplate,
    pub students: StudentsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_seconds: Option<u64>,
    pub headers: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentsConfig {
    pub ids: Vec<String>,
}

impl BatchConfig {
    /// 從 TOML 檔案載入批次描述。
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        toml::from_str(&content).map_err(|e| EnrollError::ConfigError {
            message: format!("Failed to parse batch config: {}", e),
        })
    }
}

impl Validate for BatchConfig {
    fn validate(&self) -> Result<()> {
        validate_url("api.base_url", &self.api.base_url)?;
        validate_non_empty_string("template.program", &self.template.program)?;
        validate_positive_number("template.semester", self.template.semester as usize, 1)?;
        validate_academic_year("template.academic_year", &self.template.academic_year)?;

        if self.students.ids.is_empty() {
            return Err(EnrollError::MissingConfigError {
                field: "students.ids".to_string(),
            });
        }
        for id in &self.students.ids {
            validate_non_empty_string("students.ids", id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{EnrollmentStatus, EnrollmentType};

    fn parse(toml_str: &str) -> BatchConfig {
        toml::from_str(toml_str).unwrap()
    }

    const VALID: &str = r#"
[api]
base_url = "http://localhost:5000/api"
timeout_seconds = 10

[template]
program = "prog-ee"
semester = 1
academic_year = "2024-2025"
courses = ["c1", "c2"]

[students]
ids = ["stu-1", "stu-2"]
"#;

    #[test]
    fn test_parse_and_validate_batch_config() {
        let config = parse(VALID);
        assert!(config.validate().is_ok());
        assert_eq!(config.template.program, "prog-ee");
        assert_eq!(config.template.courses.len(), 2);
        // 缺省欄位採用預設值
        assert_eq!(config.template.status, EnrollmentStatus::Active);
        assert_eq!(config.template.enrollment_type, EnrollmentType::FullTime);
        assert_eq!(config.students.ids.len(), 2);
    }

    #[test]
    fn test_invalid_academic_year_is_rejected() {
        let mut config = parse(VALID);
        config.template.academic_year = "2024-2027".to_string();
        assert!(matches!(
            config.validate(),
            Err(EnrollError::InvalidConfigValueError { field, .. }) if field == "template.academic_year"
        ));
    }

    #[test]
    fn test_zero_semester_is_rejected() {
        let mut config = parse(VALID);
        config.template.semester = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_student_list_is_rejected() {
        let mut config = parse(VALID);
        config.students.ids.clear();
        assert!(matches!(
            config.validate(),
            Err(EnrollError::MissingConfigError { field }) if field == "students.ids"
        ));
    }
}
