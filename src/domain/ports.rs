use crate::domain::model::{
    CreateEnrollmentRequest, Enrollment, EnrollmentPage, EnrollmentPatch, ListQuery,
    TransitionAction,
};
use crate::utils::error::Result;
use async_trait::async_trait;

/// 對權威存放區的薄介面。沒有刪除操作:註冊只能透過狀態轉換離場。
#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    async fn create(&self, request: &CreateEnrollmentRequest) -> Result<Enrollment>;
    async fn read(&self, id: &str) -> Result<Enrollment>;
    async fn list(&self, query: &ListQuery) -> Result<EnrollmentPage>;
    async fn update(&self, id: &str, patch: &EnrollmentPatch) -> Result<Enrollment>;
    async fn transition(&self, id: &str, action: TransitionAction) -> Result<Enrollment>;
}

/// 快取失效的範圍。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidationScope {
    /// 整個列表視窗。
    List,
    /// 單筆記錄。
    Record(String),
    /// 某個學生在視窗內的所有記錄。
    Student(String),
}

/// 最近註冊的有界快照。Validator 把它當作參照集;每條變更路徑在寫入後
/// 負責呼叫 invalidate。read-after-write 一致性只在同一執行情境內成立。
#[async_trait]
pub trait EnrollmentCache: Send + Sync {
    /// 回傳目前快照;若先前被標記過期,實作會先補抓再回傳。
    async fn read(&self) -> Result<Vec<Enrollment>>;

    /// 標記過期,讓下一次 read() 觸發重抓。
    async fn invalidate(&self, scope: InvalidationScope);
}
