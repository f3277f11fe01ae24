use crate::core::validator::validate;
use crate::domain::model::{Enrollment, EnrollmentTemplate, Verdict};
use crate::domain::ports::{EnrollmentCache, EnrollmentRepository, InvalidationScope};
use crate::utils::error::{DuplicateKind, EnrollError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 聚合警告最多帶幾個樣本原因。
pub const MAX_SAMPLE_REASONS: usize = 3;

/// 完成報告中逐筆失敗原因的上限。
pub const MAX_REPORTED_FAILURES: usize = 10;

/// 分區階段被拒的候選人,附上具體的衝突原因。
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedCandidate {
    pub student_id: String,
    pub verdict: Verdict,
}

/// 分區結果:合格集 + 被拒集。執行階段只處理合格集;
/// caller 看過 rejection_warning() 之後呼叫 execute() 即視為明確確認。
#[derive(Debug, Clone)]
pub struct BulkPlan {
    pub template: EnrollmentTemplate,
    pub valid: Vec<String>,
    pub rejected: Vec<RejectedCandidate>,
}

impl BulkPlan {
    pub fn is_empty(&self) -> bool {
        self.valid.is_empty()
    }

    /// 被拒人數 + 最多 MAX_SAMPLE_REASONS 個樣本原因。沒有被拒就回 None。
    pub fn rejection_warning(&self) -> Option<String> {
        if self.rejected.is_empty() {
            return None;
        }
        let samples: Vec<String> = self
            .rejected
            .iter()
            .take(MAX_SAMPLE_REASONS)
            .map(|r| format!("{}: {}", r.student_id, r.verdict))
            .collect();
        Some(format!(
            "{} student(s) rejected by local validation, e.g. {}",
            self.rejected.len(),
            samples.join("; ")
        ))
    }
}

/// 整批執行的狀態。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Pending,
    Running,
    Completed,
}

/// 單筆建立失敗的分類:可辨識的重複註冊 vs 其他錯誤。
#[derive(Debug, Clone, PartialEq)]
pub enum ItemFailure {
    Duplicate {
        kind: DuplicateKind,
        message: String,
    },
    Other {
        message: String,
    },
}

impl ItemFailure {
    fn from_error(error: EnrollError) -> Self {
        match error.into_classified() {
            EnrollError::ServerRejectedDuplicate { kind, message } => {
                ItemFailure::Duplicate { kind, message }
            }
            other => ItemFailure::Other {
                message: other.to_string(),
            },
        }
    }
}

impl std::fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemFailure::Duplicate { kind, message } => {
                write!(f, "duplicate enrollment ({}): {}", kind, message)
            }
            ItemFailure::Other { message } => f.write_str(message),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemState {
    Dispatched,
    Succeeded { enrollment: Box<Enrollment> },
    Failed { failure: ItemFailure },
}

#[derive(Debug, Clone)]
pub struct ItemResult {
    pub student_id: String,
    pub state: ItemState,
    pub elapsed: Duration,
}

/// 每批次的狀態機:Pending → Running → (逐筆 Dispatched → Succeeded|Failed)
/// → Completed。部分失敗是一等公民的資料結構,不是藏在控制流裡的副作用。
#[derive(Debug)]
pub struct BatchRun {
    state: BatchState,
    items: Vec<ItemResult>,
}

impl BatchRun {
    pub fn new() -> Self {
        Self {
            state: BatchState::Pending,
            items: Vec::new(),
        }
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn items(&self) -> &[ItemResult] {
        &self.items
    }

    pub fn success_count(&self) -> usize {
        self.items
            .iter()
            .filter(|i| matches!(i.state, ItemState::Succeeded { .. }))
            .count()
    }

    pub fn error_count(&self) -> usize {
        self.items
            .iter()
            .filter(|i| matches!(i.state, ItemState::Failed { .. }))
            .count()
    }

    fn dispatch(&mut self, student_id: &str) -> usize {
        self.state = BatchState::Running;
        self.items.push(ItemResult {
            student_id: student_id.to_string(),
            state: ItemState::Dispatched,
            elapsed: Duration::ZERO,
        });
        self.items.len() - 1
    }

    fn settle(&mut self, index: usize, state: ItemState, elapsed: Duration) {
        if let Some(item) = self.items.get_mut(index) {
            item.state = state;
            item.elapsed = elapsed;
        }
    }

    fn complete(&mut self) {
        self.state = BatchState::Completed;
    }
}

impl Default for BatchRun {
    fn default() -> Self {
        Self::new()
    }
}

/// 批次完成報告。部分成功是這個操作的常態結果,不是例外。
#[derive(Debug)]
pub struct BulkReport {
    pub success_count: usize,
    pub error_count: usize,
    /// 逐筆失敗原因,上限 MAX_REPORTED_FAILURES。
    pub failures: Vec<(String, ItemFailure)>,
    /// 分區階段就被拒、從未發出請求的候選人。
    pub rejected: Vec<RejectedCandidate>,
    pub items: Vec<ItemResult>,
}

impl BulkReport {
    fn from_run(run: BatchRun, rejected: Vec<RejectedCandidate>) -> Self {
        let success_count = run.success_count();
        let error_count = run.error_count();
        let failures: Vec<(String, ItemFailure)> = run
            .items()
            .iter()
            .filter_map(|item| match &item.state {
                ItemState::Failed { failure } => {
                    Some((item.student_id.clone(), failure.clone()))
                }
                _ => None,
            })
            .take(MAX_REPORTED_FAILURES)
            .collect();
        Self {
            success_count,
            error_count,
            failures,
            rejected,
            items: run.items,
        }
    }

    /// 機器可讀的摘要。
    pub fn summary(&self) -> HashMap<String, serde_json::Value> {
        let mut summary = HashMap::new();

        summary.insert(
            "success_count".to_string(),
            serde_json::Value::Number(self.success_count.into()),
        );
        summary.insert(
            "error_count".to_string(),
            serde_json::Value::Number(self.error_count.into()),
        );
        summary.insert(
            "rejected_count".to_string(),
            serde_json::Value::Number(self.rejected.len().into()),
        );

        let total_duration: Duration = self.items.iter().map(|i| i.elapsed).sum();
        summary.insert(
            "total_duration_ms".to_string(),
            serde_json::Value::Number((total_duration.as_millis() as u64).into()),
        );

        let failures: Vec<serde_json::Value> = self
            .failures
            .iter()
            .map(|(student, failure)| {
                serde_json::Value::String(format!("{}: {}", student, failure))
            })
            .collect();
        summary.insert("failures".to_string(), serde_json::Value::Array(failures));

        summary
    }
}

/// 批次註冊協調器:分區 → (確認) → 逐筆循序執行 → 完成報告。
pub struct BulkEnroller<R: EnrollmentRepository, C: EnrollmentCache> {
    repo: Arc<R>,
    cache: Arc<C>,
}

impl<R: EnrollmentRepository, C: EnrollmentCache> BulkEnroller<R, C> {
    pub fn new(repo: Arc<R>, cache: Arc<C>) -> Self {
        Self { repo, cache }
    }

    /// 分區階段:逐一用快照驗證,分出合格集與被拒集。不發出任何建立請求。
    pub async fn prepare(
        &self,
        student_ids: &[String],
        template: EnrollmentTemplate,
    ) -> Result<BulkPlan> {
        let window = self.cache.read().await?;
        let mut valid = Vec::new();
        let mut rejected = Vec::new();

        for student_id in student_ids {
            let verdict = validate(&template.candidate(student_id), &window);
            if verdict.is_eligible() {
                valid.push(student_id.clone());
            } else {
                tracing::debug!("🚫 {} rejected: {}", student_id, verdict);
                rejected.push(RejectedCandidate {
                    student_id: student_id.clone(),
                    verdict,
                });
            }
        }

        tracing::info!(
            "📋 Bulk plan: {} eligible, {} rejected (of {})",
            valid.len(),
            rejected.len(),
            student_ids.len()
        );
        Ok(BulkPlan {
            template,
            valid,
            rejected,
        })
    }

    /// 執行階段:對合格集逐筆循序建立。
    ///
    /// 每筆建立都是獨立的失敗域:一筆失敗不會中止、重試或回滾其他筆。
    /// 循序 await(不併發)換來簡單的逐筆失敗隔離,也避免同一衝突空間
    /// 的併發寫入。整批結束後只失效列表快取一次。
    pub async fn execute(&self, plan: BulkPlan) -> Result<BulkReport> {
        if let Some(warning) = plan.rejection_warning() {
            tracing::warn!("⚠️ {}", warning);
        }
        if plan.is_empty() {
            // 沒有合格學生:零網路請求,直接中止
            return Err(EnrollError::EmptyBatch {
                rejected: plan.rejected.len(),
            });
        }

        let mut run = BatchRun::new();
        for student_id in &plan.valid {
            let index = run.dispatch(student_id);
            let started = Instant::now();
            let request = plan.template.for_student(student_id);

            match self.repo.create(&request).await {
                Ok(created) => {
                    tracing::info!("✅ Enrolled {} (enrollment {})", student_id, created.id);
                    run.settle(
                        index,
                        ItemState::Succeeded {
                            enrollment: Box::new(created),
                        },
                        started.elapsed(),
                    );
                }
                Err(e) => {
                    let failure = ItemFailure::from_error(e);
                    tracing::warn!("❌ Enrollment failed for {}: {}", student_id, failure);
                    run.settle(
                        index,
                        ItemState::Failed { failure },
                        started.elapsed(),
                    );
                }
            }
        }
        run.complete();

        // 整批完成後才失效,逐筆失效會放大重抓成本
        self.cache.invalidate(InvalidationScope::List).await;

        let report = BulkReport::from_run(run, plan.rejected);
        tracing::info!(
            "📊 Bulk enrollment completed: {} succeeded, {} failed, {} rejected locally",
            report.success_count,
            report.error_count,
            report.rejected.len()
        );
        Ok(report)
    }
}
