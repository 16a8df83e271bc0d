// ==========================================
// 研究生培训档案系统 - SQLite 存储实现
// ==========================================
// 职责: 以单个 rusqlite::Connection 实现全部仓储 Trait 与工作单元
// 事务模型:
// - 最外层工作单元: BEGIN IMMEDIATE (持有写锁直到提交/回滚)
// - 内层工作单元: SAVEPOINT sp_{depth}
// 约束: 一个请求上下文使用一个 SqliteStore; 跨上下文并发依赖
//       各自连接上的 BEGIN IMMEDIATE 串行化
// ==========================================

use crate::db::{configure_sqlite_connection, init_schema, open_sqlite_connection};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::unit_of_work::UnitOfWork;
use rusqlite::Connection;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

mod ledger;
mod log_entry;
mod person;

#[cfg(test)]
mod tests;

// ==========================================
// SqliteStore
// ==========================================
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    tx_depth: Arc<AtomicUsize>,
}

impl SqliteStore {
    /// 基于已配置的连接创建
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            conn,
            tx_depth: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// 打开数据库文件 (应用统一 PRAGMA, 确保表结构存在)
    pub fn open(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        init_schema(&conn)?;
        Ok(Self::new(Arc::new(Mutex::new(conn))))
    }

    /// 内存库 (测试/预演用)
    pub fn open_in_memory() -> RepositoryResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        configure_sqlite_connection(&conn)?;
        init_schema(&conn)?;
        Ok(Self::new(Arc::new(Mutex::new(conn))))
    }

    /// 共享底层连接 (供 ConfigManager 等复用)
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    /// 获取数据库连接
    pub(super) fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 当前是否处于工作单元内
    pub fn in_unit(&self) -> bool {
        self.tx_depth.load(Ordering::SeqCst) > 0
    }

    fn begin(&self, depth: usize) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let result = if depth == 0 {
            conn.execute_batch("BEGIN IMMEDIATE")
        } else {
            conn.execute_batch(&format!("SAVEPOINT sp_{}", depth))
        };
        result.map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        debug!(depth, "工作单元开启");
        Ok(())
    }

    fn commit(&self, depth: usize) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let result = if depth == 0 {
            conn.execute_batch("COMMIT")
        } else {
            conn.execute_batch(&format!("RELEASE SAVEPOINT sp_{}", depth))
        };
        result.map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))
    }

    fn rollback(&self, depth: usize) {
        let result = self.get_conn().and_then(|conn| {
            let sql = if depth == 0 {
                "ROLLBACK".to_string()
            } else {
                format!("ROLLBACK TO SAVEPOINT sp_{0}; RELEASE SAVEPOINT sp_{0}", depth)
            };
            conn.execute_batch(&sql)
                .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))
        });
        match result {
            Ok(()) => debug!(depth, "工作单元已回滚"),
            Err(e) => warn!(depth, error = %e, "工作单元回滚失败"),
        }
    }
}

impl UnitOfWork for SqliteStore {
    fn atomic<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let depth = self.tx_depth.load(Ordering::SeqCst);
        self.begin(depth).map_err(E::from)?;
        self.tx_depth.store(depth + 1, Ordering::SeqCst);

        let result = work();
        self.tx_depth.store(depth, Ordering::SeqCst);

        match result {
            Ok(value) => {
                if let Err(e) = self.commit(depth) {
                    self.rollback(depth);
                    return Err(E::from(e));
                }
                Ok(value)
            }
            Err(err) => {
                self.rollback(depth);
                Err(err)
            }
        }
    }
}

/// 文本列取值无法识别
pub(super) fn invalid_text(idx: usize, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        format!("无法识别的取值: {}", value).into(),
    )
}
