// ==========================================
// 研究生培训档案系统 - 工作单元 (原子作用域)
// ==========================================
// 语义:
// - work 返回 Ok → 提交; 返回 Err → 回滚该作用域内全部写入
// - 可嵌套: 内层失败只回滚内层
// ==========================================

use crate::repository::error::RepositoryError;

pub trait UnitOfWork {
    /// 在原子作用域内执行 work
    ///
    /// 作用域本身的开启/提交失败经由 `E: From<RepositoryError>` 返回
    fn atomic<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<RepositoryError>;
}
