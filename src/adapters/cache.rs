use crate::domain::model::{Enrollment, ListQuery};
use crate::domain::ports::{EnrollmentCache, EnrollmentRepository, InvalidationScope};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

/// 快照視窗的預設大小:最近 100 筆。
pub const DEFAULT_WINDOW_SIZE: u32 = 100;

#[derive(Debug, Default)]
struct CacheState {
    window: Vec<Enrollment>,
    loaded: bool,
    list_stale: bool,
    stale_records: HashSet<String>,
}

impl CacheState {
    fn is_fresh(&self) -> bool {
        self.loaded && !self.list_stale && self.stale_records.is_empty()
    }
}

/// 有界、可能過期的本地快照。
///
/// Validator 把它當作參照集。視窗只涵蓋最近 N 筆:視窗外的舊記錄可能
/// 漏掉衝突,這是接受的限制,由後端的再驗證補上,而不是無限制地快取。
/// read-after-write 一致性只對同一 session 成立;跨分頁/跨 session 的
/// 過期只能等對方自己重抓。
pub struct CacheSynchronizer<R: EnrollmentRepository> {
    repo: Arc<R>,
    capacity: u32,
    state: RwLock<CacheState>,
}

impl<R: EnrollmentRepository> CacheSynchronizer<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self::with_capacity(repo, DEFAULT_WINDOW_SIZE)
    }

    pub fn with_capacity(repo: Arc<R>, capacity: u32) -> Self {
        Self {
            repo,
            capacity,
            state: RwLock::new(CacheState::default()),
        }
    }
}

#[async_trait]
impl<R: EnrollmentRepository> EnrollmentCache for CacheSynchronizer<R> {
    async fn read(&self) -> Result<Vec<Enrollment>> {
        {
            let state = self.state.read().await;
            if state.is_fresh() {
                return Ok(state.window.clone());
            }
        }

        let mut state = self.state.write().await;
        // 等待寫鎖期間可能已被同 session 的其他工作補抓
        if state.is_fresh() {
            return Ok(state.window.clone());
        }

        if !state.loaded || state.list_stale {
            let page = self.repo.list(&ListQuery::recent(self.capacity)).await?;
            state.window = page.items;
            state.loaded = true;
            state.list_stale = false;
            state.stale_records.clear();
            tracing::debug!("🔄 Enrollment window refetched ({} records)", state.window.len());
        } else {
            // 只有個別記錄過期:逐筆補抓,換掉視窗內的舊版本。
            // 失敗的 id 留在 stale 集合裡,下次 read 再試。
            let ids: Vec<String> = state.stale_records.iter().cloned().collect();
            for id in ids {
                let fresh = self.repo.read(&id).await?;
                if let Some(slot) = state.window.iter_mut().find(|e| e.id == fresh.id) {
                    *slot = fresh;
                } else {
                    state.window.push(fresh);
                }
                state.stale_records.remove(&id);
            }
        }

        Ok(state.window.clone())
    }

    async fn invalidate(&self, scope: InvalidationScope) {
        let mut state = self.state.write().await;
        match scope {
            InvalidationScope::List => state.list_stale = true,
            InvalidationScope::Record(id) => {
                state.stale_records.insert(id);
            }
            InvalidationScope::Student(student_id) => {
                let ids: Vec<String> = state
                    .window
                    .iter()
                    .filter(|e| e.student.id == student_id)
                    .map(|e| e.id.clone())
                    .collect();
                if ids.is_empty() {
                    // 該學生的寫入不在視窗內(例如剛建立的新記錄):整頁重抓
                    state.list_stale = true;
                } else {
                    state.stale_records.extend(ids);
                }
            }
        }
    }
}
