// ==========================================
// 研究生培训档案系统 - 批量操作台账 Repository Trait
// ==========================================
// 红线: 台账只增改, 不删除 (保留策略由外部负责)
// ==========================================

use crate::domain::ledger::OperationLedger;
use crate::repository::error::RepositoryResult;

pub trait OperationLedgerRepository {
    fn insert_ledger(&self, ledger: &OperationLedger) -> RepositoryResult<()>;

    /// 覆写状态、计数、detail 与完成时间
    fn save_ledger(&self, ledger: &OperationLedger) -> RepositoryResult<()>;

    fn find_ledger(&self, id: &str) -> RepositoryResult<Option<OperationLedger>>;

    /// 按执行人列出 (新的在前)
    fn list_ledgers_by_actor(
        &self,
        actor_id: i64,
        limit: usize,
    ) -> RepositoryResult<Vec<OperationLedger>>;
}
