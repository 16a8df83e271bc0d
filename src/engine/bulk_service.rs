// ==========================================
// 研究生培训档案系统 - 批量操作服务
// ==========================================
// 职责: 权限校验 / 分块 / 三种执行模式 / 行级错误捕获 / 台账定稿
// 流程:
// 1. 构造时校验执行人权限 (admin / supervisor / 超级用户)
// 2. 每次调用先创建 running 台账
// 3. 审核/指派按 id 分块, 每块一个工作单元并锁定记录
// 4. 导入按行处理: 试运行 / 部分提交 / 严格提交
// 5. 定稿台账 (completed | failed) 并返回
// ==========================================

mod import;
mod review;
mod roster;


use crate::config::BulkConfig;
use crate::domain::ledger::OperationLedger;
use crate::domain::person::Principal;
use crate::domain::types::OperationKind;
use crate::engine::accumulator::{BulkAccumulator, RowError, RowErrorKind};
use crate::engine::error::{BulkError, BulkResult};
use crate::importer::entity_resolver::EntityResolver;
use crate::importer::password::{
    generate_deterministic_password, generate_secure_password, CredentialHasher,
    MIN_SECURE_PASSWORD_LEN,
};
use crate::repository::BulkRepository;
use chrono::{Local, NaiveDate};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{info, warn};

// ==========================================
// ImportOptions - 导入执行模式
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOptions {
    /// 只校验不写入
    pub dry_run: bool,
    /// 行失败不影响其他行
    pub allow_partial: bool,
    /// true: 确定性首登口令; false: 随机口令
    pub generate_passwords: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            dry_run: true,
            allow_partial: false,
            generate_passwords: true,
        }
    }
}

impl ImportOptions {
    /// 提交模式 (严格, 确定性口令)
    pub fn commit() -> Self {
        Self {
            dry_run: false,
            ..Default::default()
        }
    }

    pub fn with_allow_partial(mut self, allow_partial: bool) -> Self {
        self.allow_partial = allow_partial;
        self
    }

    pub fn with_random_passwords(mut self) -> Self {
        self.generate_passwords = false;
        self
    }

    /// 严格提交: 任一行失败则整批回滚
    pub fn is_strict_commit(&self) -> bool {
        !self.dry_run && !self.allow_partial
    }
}

// ==========================================
// BulkService
// ==========================================
pub struct BulkService<R: BulkRepository> {
    repo: Arc<R>,
    actor: Principal,
    config: BulkConfig,
    hasher: CredentialHasher,
    today: NaiveDate,
}

impl<R: BulkRepository> BulkService<R> {
    /// 构造服务; 执行人无权限时在任何工作开始前失败 (不创建台账)
    pub fn new(repo: Arc<R>, actor: Principal, config: BulkConfig) -> BulkResult<Self> {
        if !actor.can_run_bulk_operations() {
            warn!(actor = %actor.username, "拒绝批量操作: 权限不足");
            return Err(BulkError::Authorization(format!(
                "批量操作仅限导师与管理员 (执行人: {})",
                actor.username
            )));
        }
        let hasher = CredentialHasher::new(config.hash_memory_kib, config.hash_iterations)?;
        Ok(Self {
            repo,
            actor,
            config,
            hasher,
            today: Local::now().date_naive(),
        })
    }

    /// 固定"今天" (培训年级推断/默认入职日期/未来日期校验)
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn actor(&self) -> &Principal {
        &self.actor
    }

    pub fn config(&self) -> &BulkConfig {
        &self.config
    }

    fn chunk_size(&self) -> usize {
        self.config.chunk_size.max(1)
    }

    fn resolver(&self, options: &ImportOptions) -> EntityResolver<'_, R> {
        EntityResolver::new(
            self.repo.as_ref(),
            &self.config,
            &self.hasher,
            self.actor.id,
            self.today,
            options.generate_passwords,
        )
    }

    /// 首登口令
    fn initial_password(&self, options: &ImportOptions, username: &str, year: Option<&str>) -> String {
        if options.generate_passwords {
            generate_deterministic_password(username, year)
        } else {
            generate_secure_password(MIN_SECURE_PASSWORD_LEN)
        }
    }

    fn store_password(&self, person_id: i64, password: &str) -> Result<(), RowError> {
        let hash = self
            .hasher
            .hash(password)
            .map_err(|e| RowError::new(RowErrorKind::InternalError, e.to_string()))?;
        self.repo.set_password_hash(person_id, &hash)?;
        Ok(())
    }

    // ==========================================
    // 台账生命周期
    // ==========================================

    fn open_ledger(&self, kind: OperationKind) -> BulkResult<OperationLedger> {
        let ledger = OperationLedger::start(&self.actor, kind);
        self.repo.insert_ledger(&ledger)?;
        info!(ledger_id = %ledger.id, kind = %kind, actor = %self.actor.username, "批量操作开始");
        Ok(ledger)
    }

    fn complete_ledger(
        &self,
        mut ledger: OperationLedger,
        total_items: usize,
        acc: BulkAccumulator,
    ) -> BulkResult<OperationLedger> {
        let (successes, failures) = (acc.success_count(), acc.failure_count());
        ledger.mark_completed(total_items, successes, failures, acc.into_detail())?;
        self.repo.save_ledger(&ledger)?;
        info!(
            ledger_id = %ledger.id,
            total = total_items,
            successes,
            failures,
            "批量操作完成"
        );
        Ok(ledger)
    }

    fn fail_ledger(
        &self,
        mut ledger: OperationLedger,
        total_items: usize,
        failure_count: usize,
        detail: JsonValue,
    ) -> BulkResult<OperationLedger> {
        ledger.mark_failed(total_items, failure_count, detail)?;
        self.repo.save_ledger(&ledger)?;
        warn!(
            ledger_id = %ledger.id,
            total = total_items,
            failures = failure_count,
            "批量操作失败"
        );
        Ok(ledger)
    }

    // ==========================================
    // 台账查询
    // ==========================================

    pub fn find_ledger(&self, ledger_id: &str) -> BulkResult<Option<OperationLedger>> {
        Ok(self.repo.find_ledger(ledger_id)?)
    }

    /// 当前执行人的台账 (新的在前)
    pub fn list_ledgers(&self, limit: usize) -> BulkResult<Vec<OperationLedger>> {
        Ok(self.repo.list_ledgers_by_actor(self.actor.id, limit)?)
    }
}
