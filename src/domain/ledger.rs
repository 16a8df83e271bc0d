// ==========================================
// 研究生培训档案系统 - 批量操作台账
// ==========================================
// 职责: 记录一次批量操作调用及其结果
// 生命周期: 调用开始创建 (running) → 结束时定稿一次 (completed | failed)
// 红线: 定稿只能发生一次; 引擎从不删除台账
// ==========================================

use crate::domain::person::Principal;
use crate::domain::types::{OperationKind, OperationStatus};
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

/// 台账重复定稿
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("台账 {ledger_id} 已处于终态 {current}, 不能再转换为 {requested}")]
pub struct LedgerTransitionError {
    pub ledger_id: String,
    pub current: OperationStatus,
    pub requested: OperationStatus,
}

// ==========================================
// OperationLedger - 批量操作台账
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationLedger {
    pub id: String,
    pub actor_id: i64,
    pub actor: String,
    pub kind: OperationKind,
    pub status: OperationStatus,
    pub total_items: i64,
    pub success_count: i64,
    pub failure_count: i64,
    pub detail: JsonValue,
    pub created_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
}

impl OperationLedger {
    /// 新建 running 台账
    pub fn start(actor: &Principal, kind: OperationKind) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            actor_id: actor.id,
            actor: actor.username.clone(),
            kind,
            status: OperationStatus::Running,
            total_items: 0,
            success_count: 0,
            failure_count: 0,
            detail: JsonValue::Object(Default::default()),
            created_at: Utc::now().naive_utc(),
            completed_at: None,
        }
    }

    /// 定稿为 completed
    pub fn mark_completed(
        &mut self,
        total_items: usize,
        success_count: usize,
        failure_count: usize,
        detail: JsonValue,
    ) -> Result<(), LedgerTransitionError> {
        self.finalize(OperationStatus::Completed)?;
        self.total_items = total_items as i64;
        self.success_count = success_count as i64;
        self.failure_count = failure_count as i64;
        self.detail = detail;
        Ok(())
    }

    /// 定稿为 failed (成功数恒为 0)
    pub fn mark_failed(
        &mut self,
        total_items: usize,
        failure_count: usize,
        detail: JsonValue,
    ) -> Result<(), LedgerTransitionError> {
        self.finalize(OperationStatus::Failed)?;
        self.total_items = total_items as i64;
        self.success_count = 0;
        self.failure_count = failure_count as i64;
        self.detail = detail;
        Ok(())
    }

    fn finalize(&mut self, to: OperationStatus) -> Result<(), LedgerTransitionError> {
        if self.status.is_terminal() {
            return Err(LedgerTransitionError {
                ledger_id: self.id.clone(),
                current: self.status,
                requested: to,
            });
        }
        self.status = to;
        self.completed_at = Some(Utc::now().naive_utc());
        Ok(())
    }

    /// detail 中的某个列表 (不存在时为空)
    pub fn detail_list(&self, key: &str) -> &[JsonValue] {
        self.detail
            .get(key)
            .and_then(JsonValue::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
