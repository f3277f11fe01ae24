use crate::core::validator::validate;
use crate::domain::model::{CreateEnrollmentRequest, Enrollment};
use crate::domain::ports::{EnrollmentCache, EnrollmentRepository, InvalidationScope};
use crate::utils::error::{EnrollError, Result};
use std::sync::Arc;

/// 單筆註冊協調器:先用快照做本地驗證,通過才打後端。
pub struct Enroller<R: EnrollmentRepository, C: EnrollmentCache> {
    repo: Arc<R>,
    cache: Arc<C>,
}

impl<R: EnrollmentRepository, C: EnrollmentCache> Enroller<R, C> {
    pub fn new(repo: Arc<R>, cache: Arc<C>) -> Self {
        Self { repo, cache }
    }

    /// 驗證並建立一筆註冊。
    ///
    /// 本地衝突在發出任何網路請求之前就回報;成功後失效列表與該學生的
    /// 快取項目;伺服器拒絕會重新對應回同一套衝突分類(快照可能過期,
    /// 或其他 session 搶先建立了同一筆)。
    pub async fn enroll(&self, request: CreateEnrollmentRequest) -> Result<Enrollment> {
        let window = self.cache.read().await?;
        let verdict = validate(&request.candidate(), &window);
        if !verdict.is_eligible() {
            tracing::info!(
                "🚫 Enrollment blocked locally for student {}: {}",
                request.student,
                verdict
            );
            return Err(EnrollError::LocalConflict { verdict });
        }

        match self.repo.create(&request).await {
            Ok(created) => {
                self.cache.invalidate(InvalidationScope::List).await;
                self.cache
                    .invalidate(InvalidationScope::Student(request.student.clone()))
                    .await;
                tracing::info!(
                    "✅ Enrollment created: {} (student {} → program {})",
                    created.id,
                    request.student,
                    request.program
                );
                Ok(created)
            }
            Err(e) => {
                let classified = e.into_classified();
                if let EnrollError::ServerRejectedDuplicate { kind, .. } = &classified {
                    // 本地判定 Eligible 但後端仍拒絕:快照視窗有界/過期所致
                    tracing::warn!(
                        "⚠️ Server rejected student {} as duplicate ({}) after local Eligible verdict",
                        request.student,
                        kind
                    );
                }
                Err(classified)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{
        EnrollmentPage, EnrollmentPatch, EnrollmentStatus, EnrollmentType, ListQuery, ProgramRef,
        StudentRef, TransitionAction, Verdict,
    };
    use crate::utils::error::{DuplicateKind, DUPLICATE_PROGRAM_CODE};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn enrollment(id: &str, student_id: &str, program_id: &str) -> Enrollment {
        Enrollment {
            id: id.to_string(),
            student: StudentRef {
                id: student_id.to_string(),
                name: String::new(),
                email: String::new(),
            },
            program: ProgramRef {
                id: program_id.to_string(),
                name: String::new(),
            },
            semester: 3,
            academic_year: "2023-2024".to_string(),
            courses: BTreeSet::new(),
            status: EnrollmentStatus::Active,
            enrollment_type: EnrollmentType::FullTime,
            notes: None,
            audit_trail: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn request(student: &str, program: &str) -> CreateEnrollmentRequest {
        CreateEnrollmentRequest {
            student: student.to_string(),
            program: program.to_string(),
            semester: 1,
            academic_year: "2024-2025".to_string(),
            courses: BTreeSet::new(),
            status: EnrollmentStatus::Active,
            enrollment_type: EnrollmentType::FullTime,
            notes: None,
        }
    }

    struct MockRepository {
        create_calls: AtomicUsize,
        create_error: Mutex<Option<EnrollError>>,
    }

    impl MockRepository {
        fn new() -> Self {
            Self {
                create_calls: AtomicUsize::new(0),
                create_error: Mutex::new(None),
            }
        }

        fn failing_with(error: EnrollError) -> Self {
            Self {
                create_calls: AtomicUsize::new(0),
                create_error: Mutex::new(Some(error)),
            }
        }
    }

    #[async_trait]
    impl EnrollmentRepository for MockRepository {
        async fn create(&self, req: &CreateEnrollmentRequest) -> Result<Enrollment> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(error) = self.create_error.lock().unwrap().take() {
                return Err(error);
            }
            Ok(enrollment("created-1", &req.student, &req.program))
        }

        async fn read(&self, _id: &str) -> Result<Enrollment> {
            unimplemented!("not used by these tests")
        }

        async fn list(&self, _query: &ListQuery) -> Result<EnrollmentPage> {
            unimplemented!("not used by these tests")
        }

        async fn update(&self, _id: &str, _patch: &EnrollmentPatch) -> Result<Enrollment> {
            unimplemented!("not used by these tests")
        }

        async fn transition(&self, _id: &str, _action: TransitionAction) -> Result<Enrollment> {
            unimplemented!("not used by these tests")
        }
    }

    struct MockCache {
        window: Vec<Enrollment>,
        invalidations: Mutex<Vec<InvalidationScope>>,
    }

    impl MockCache {
        fn with_window(window: Vec<Enrollment>) -> Self {
            Self {
                window,
                invalidations: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl EnrollmentCache for MockCache {
        async fn read(&self) -> Result<Vec<Enrollment>> {
            Ok(self.window.clone())
        }

        async fn invalidate(&self, scope: InvalidationScope) {
            self.invalidations.lock().unwrap().push(scope);
        }
    }

    #[tokio::test]
    async fn test_local_conflict_makes_zero_network_calls() {
        let repo = Arc::new(MockRepository::new());
        let cache = Arc::new(MockCache::with_window(vec![enrollment(
            "e1", "ali", "prog-ce",
        )]));
        let enroller = Enroller::new(repo.clone(), cache.clone());

        let err = enroller.enroll(request("ali", "prog-ce")).await.unwrap_err();

        assert!(matches!(
            err,
            EnrollError::LocalConflict {
                verdict: Verdict::ConflictSameProgram { .. }
            }
        ));
        assert_eq!(repo.create_calls.load(Ordering::SeqCst), 0);
        assert!(cache.invalidations.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_eligible_creates_once_and_invalidates_cache() {
        let repo = Arc::new(MockRepository::new());
        let cache = Arc::new(MockCache::with_window(Vec::new()));
        let enroller = Enroller::new(repo.clone(), cache.clone());

        let created = enroller.enroll(request("ali", "prog-ee")).await.unwrap();

        assert_eq!(created.id, "created-1");
        assert_eq!(repo.create_calls.load(Ordering::SeqCst), 1);
        let invalidations = cache.invalidations.lock().unwrap();
        assert_eq!(
            invalidations.as_slice(),
            &[
                InvalidationScope::List,
                InvalidationScope::Student("ali".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_server_duplicate_rejection_is_reclassified() {
        // 本地視窗是空的(過期快照),後端靠結構化 code 擋下
        let repo = Arc::new(MockRepository::failing_with(EnrollError::ServerError {
            status: 409,
            code: Some(DUPLICATE_PROGRAM_CODE.to_string()),
            message: "Student is already enrolled in this program".to_string(),
        }));
        let cache = Arc::new(MockCache::with_window(Vec::new()));
        let enroller = Enroller::new(repo.clone(), cache.clone());

        let err = enroller.enroll(request("ali", "prog-ce")).await.unwrap_err();

        assert!(matches!(
            err,
            EnrollError::ServerRejectedDuplicate {
                kind: DuplicateKind::SameProgram,
                ..
            }
        ));
        // 失敗時不碰快取:沒有寫入發生
        assert!(cache.invalidations.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transport_error_passes_through_unchanged() {
        let repo = Arc::new(MockRepository::failing_with(EnrollError::ServerError {
            status: 502,
            code: None,
            message: "bad gateway".to_string(),
        }));
        let cache = Arc::new(MockCache::with_window(Vec::new()));
        let enroller = Enroller::new(repo, cache);

        let err = enroller.enroll(request("ali", "prog-ee")).await.unwrap_err();
        assert!(matches!(err, EnrollError::ServerError { status: 502, .. }));
    }
}
