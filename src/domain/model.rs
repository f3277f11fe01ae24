use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// 註冊記錄的生命週期狀態。記錄永遠不會被實體刪除,只會轉換狀態。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    Active,
    Completed,
    Dropped,
    Suspended,
    Graduated,
}

impl EnrollmentStatus {
    /// active/suspended 視為進行中的學程承諾,會阻擋跨學程的新註冊。
    /// completed/dropped/graduated 不會。
    pub fn is_active_commitment(&self) -> bool {
        matches!(self, EnrollmentStatus::Active | EnrollmentStatus::Suspended)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentStatus::Active => "active",
            EnrollmentStatus::Completed => "completed",
            EnrollmentStatus::Dropped => "dropped",
            EnrollmentStatus::Suspended => "suspended",
            EnrollmentStatus::Graduated => "graduated",
        }
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentType {
    FullTime,
    PartTime,
    DistanceLearning,
}

/// 學生只被引用,不被擁有;後端可能只回傳 id,name/email 容許缺省。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRef {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramRef {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// 後端維護的稽核紀錄;客戶端只解碼,不產生。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub action: String,
    pub actor: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub details: Option<String>,
}

/// 一筆註冊:學生 × 學程 × 學期區間的綁定。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    #[serde(alias = "_id")]
    pub id: String,
    pub student: StudentRef,
    pub program: ProgramRef,
    pub semester: u32,
    pub academic_year: String,
    #[serde(default)]
    pub courses: BTreeSet<String>,
    pub status: EnrollmentStatus,
    pub enrollment_type: EnrollmentType,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub audit_trail: Vec<AuditEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Enrollment {
    pub fn period(&self) -> String {
        format!("semester {} / {}", self.semester, self.academic_year)
    }

    fn program_label(&self) -> &str {
        if self.program.name.is_empty() {
            &self.program.id
        } else {
            &self.program.name
        }
    }
}

/// 資格檢查的輸入:只帶判斷所需的欄位。
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateEnrollment {
    pub student_id: String,
    pub program_id: String,
    pub semester: u32,
    pub academic_year: String,
}

/// 資格檢查的結果。Eligible 只是建議性的:快照視窗有界且可能過期,
/// 最終仲裁者是後端的同一套檢查。
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Eligible,
    /// 同一學程已有註冊(任何狀態都算)。
    ConflictSameProgram { existing: Box<Enrollment> },
    /// 其他學程有 active/suspended 的註冊。
    ConflictOtherProgramActive { existing: Vec<Enrollment> },
    /// 同學程同學期同學年的完全重複。
    ConflictDuplicatePeriod { existing: Box<Enrollment> },
}

impl Verdict {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Verdict::Eligible)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Eligible => write!(f, "eligible"),
            Verdict::ConflictSameProgram { existing } => write!(
                f,
                "already enrolled in program {} (status: {}, {})",
                existing.program_label(),
                existing.status,
                existing.period()
            ),
            Verdict::ConflictOtherProgramActive { existing } => {
                let programs: Vec<String> = existing
                    .iter()
                    .map(|e| format!("{} ({})", e.program_label(), e.status))
                    .collect();
                write!(
                    f,
                    "holds an active commitment in another program: {}",
                    programs.join(", ")
                )
            }
            Verdict::ConflictDuplicatePeriod { existing } => write!(
                f,
                "duplicate enrollment for program {} in {}",
                existing.program_label(),
                existing.period()
            ),
        }
    }
}

/// 建立註冊的請求;student/program 在建立後即固定,不存在於 patch 中。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEnrollmentRequest {
    pub student: String,
    pub program: String,
    pub semester: u32,
    pub academic_year: String,
    #[serde(default)]
    pub courses: BTreeSet<String>,
    pub status: EnrollmentStatus,
    pub enrollment_type: EnrollmentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl CreateEnrollmentRequest {
    pub fn candidate(&self) -> CandidateEnrollment {
        CandidateEnrollment {
            student_id: self.student.clone(),
            program_id: self.program.clone(),
            semester: self.semester,
            academic_year: self.academic_year.clone(),
        }
    }
}

/// 批次註冊共用的模板:除了學生以外的所有欄位。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentTemplate {
    pub program: String,
    pub semester: u32,
    pub academic_year: String,
    #[serde(default)]
    pub courses: BTreeSet<String>,
    #[serde(default = "default_status")]
    pub status: EnrollmentStatus,
    #[serde(default = "default_type")]
    pub enrollment_type: EnrollmentType,
    #[serde(default)]
    pub notes: Option<String>,
}

fn default_status() -> EnrollmentStatus {
    EnrollmentStatus::Active
}

fn default_type() -> EnrollmentType {
    EnrollmentType::FullTime
}

impl EnrollmentTemplate {
    /// 模板 + 學生 id = 一筆完整的建立請求。
    pub fn for_student(&self, student_id: &str) -> CreateEnrollmentRequest {
        CreateEnrollmentRequest {
            student: student_id.to_string(),
            program: self.program.clone(),
            semester: self.semester,
            academic_year: self.academic_year.clone(),
            courses: self.courses.clone(),
            status: self.status,
            enrollment_type: self.enrollment_type,
            notes: self.notes.clone(),
        }
    }

    pub fn candidate(&self, student_id: &str) -> CandidateEnrollment {
        CandidateEnrollment {
            student_id: student_id.to_string(),
            program_id: self.program.clone(),
            semester: self.semester,
            academic_year: self.academic_year.clone(),
        }
    }
}

/// 更新 patch:身分欄位 (student/program) 刻意不存在,建立後不可變。
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semester: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub academic_year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrollment_type: Option<EnrollmentType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub courses: Option<BTreeSet<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// 狀態轉換動作;註冊沒有刪除操作,生命週期只透過這些動作離場。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionAction {
    Activate,
    Deactivate,
    Suspend,
    Complete,
}

impl TransitionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionAction::Activate => "activate",
            TransitionAction::Deactivate => "deactivate",
            TransitionAction::Suspend => "suspend",
            TransitionAction::Complete => "complete",
        }
    }
}

impl fmt::Display for TransitionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 列表查詢參數。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub page: u32,
    pub size: u32,
    pub search: Option<String>,
    pub status: Option<EnrollmentStatus>,
    pub program: Option<String>,
    pub student: Option<String>,
}

impl ListQuery {
    /// 最近 N 筆:快照視窗用的查詢。
    pub fn recent(size: u32) -> Self {
        Self {
            page: 1,
            size,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub size: u32,
    pub total: u64,
    pub total_pages: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrollmentPage {
    pub items: Vec<Enrollment>,
    pub pagination: Option<Pagination>,
}
