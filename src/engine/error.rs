// ==========================================
// 研究生培训档案系统 - 批量引擎错误类型
// ==========================================
// 对外: Authorization (构造期) / Repository (存储基础设施)
// 内部哨兵: BatchAborted / DryRunRollback, 不逃出引擎
// ==========================================

use crate::domain::ledger::LedgerTransitionError;
use crate::importer::password::PasswordError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BulkError {
    #[error("无权执行批量操作: {0}")]
    Authorization(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("凭据哈希配置无效: {0}")]
    Credential(#[from] PasswordError),

    #[error("台账状态转换失败: {0}")]
    LedgerTransition(#[from] LedgerTransitionError),

    /// 严格提交模式下有行失败, 整批回滚
    #[error("批次中止: {failures} 行失败, 全部写入已回滚")]
    BatchAborted { failures: usize },

    /// 试运行结束, 回滚全部写入
    #[error("试运行回滚")]
    DryRunRollback,
}

pub type BulkResult<T> = Result<T, BulkError>;
