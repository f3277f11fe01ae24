use crate::domain::model::{CandidateEnrollment, Enrollment, Verdict};

/// 資格檢查:純函數,不做任何 IO,只針對快照視窗判斷。
///
/// 檢查順序固定,第一個命中即回傳:
/// 1. 同學程已有註冊(任何狀態)— 最嚴格的規則,所以最先檢查。
/// 2. 其他學程有 active/suspended 的註冊。
/// 3. (學程, 學期, 學年) 完全重複 — 理論上被 1 涵蓋,但視窗可能不完整,保留作防禦。
///
/// 回傳 Eligible 不是正確性保證:參照集有界且可能過期,後端會再驗一次。
pub fn validate(candidate: &CandidateEnrollment, reference_set: &[Enrollment]) -> Verdict {
    let mine: Vec<&Enrollment> = reference_set
        .iter()
        .filter(|e| e.student.id == candidate.student_id)
        .collect();

    if let Some(existing) = mine.iter().find(|e| e.program.id == candidate.program_id) {
        return Verdict::ConflictSameProgram {
            existing: Box::new((*existing).clone()),
        };
    }

    let committed: Vec<Enrollment> = mine
        .iter()
        .filter(|e| e.status.is_active_commitment())
        .map(|e| (*e).clone())
        .collect();
    if !committed.is_empty() {
        return Verdict::ConflictOtherProgramActive {
            existing: committed,
        };
    }

    if let Some(existing) = mine.iter().find(|e| {
        e.program.id == candidate.program_id
            && e.semester == candidate.semester
            && e.academic_year == candidate.academic_year
    }) {
        return Verdict::ConflictDuplicatePeriod {
            existing: Box::new((*existing).clone()),
        };
    }

    Verdict::Eligible
}
