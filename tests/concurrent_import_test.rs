// ==========================================
// 并发写入冲突测试
// ==========================================
// 测试目标: 用户名探测与插入之间被其他写入方抢先时,
//           行以 duplicate-or-constraint-violation 失败, 台账照常定稿;
//           工作单元本身失败时台账定稿为 failed
// ==========================================


use chrono::NaiveDateTime;
use sims_bulk::domain::{
    LogEntryRecord, LogEntryStatus, NewLogEntry, NewPerson, OperationLedger, OperationStatus,
    PersonFilter, PersonRecord, Role,
};
use sims_bulk::engine::{BulkError, BulkService, ImportOptions};
use sims_bulk::repository::{
    LogEntryRepository, OperationLedgerRepository, PersonRepository, RepositoryError,
    RepositoryResult, SqliteStore, UnitOfWork,
};
use std::sync::Arc;
use test_helpers::{admin, create_test_store, csv_file, fast_config, seed_person, today};

/// 包装存储: 模拟另一写入方
/// - hidden: 探测时看不到的用户名 (对方在探测之后才提交)
/// - refuse_units: 工作单元无法开启 (数据库被占用)
struct ContendedStore {
    inner: Arc<SqliteStore>,
    hidden: Vec<String>,
    refuse_units: bool,
}

impl ContendedStore {
    fn new(inner: &Arc<SqliteStore>) -> Self {
        Self {
            inner: Arc::clone(inner),
            hidden: Vec::new(),
            refuse_units: false,
        }
    }

    fn hiding(mut self, username: &str) -> Self {
        self.hidden.push(username.to_string());
        self
    }

    fn refusing_units(mut self) -> Self {
        self.refuse_units = true;
        self
    }

    fn is_hidden(&self, username: &str) -> bool {
        self.hidden.iter().any(|h| h == username)
    }
}

impl PersonRepository for ContendedStore {
    fn find_person_by_username(&self, username: &str) -> RepositoryResult<Option<PersonRecord>> {
        if self.is_hidden(username) {
            return Ok(None);
        }
        self.inner.find_person_by_username(username)
    }

    fn find_person_by_id(&self, id: i64) -> RepositoryResult<Option<PersonRecord>> {
        self.inner.find_person_by_id(id)
    }

    fn username_exists(&self, username: &str) -> RepositoryResult<bool> {
        if self.is_hidden(username) {
            return Ok(false);
        }
        self.inner.username_exists(username)
    }

    fn filter_persons(&self, filter: &PersonFilter) -> RepositoryResult<Vec<PersonRecord>> {
        let persons = self.inner.filter_persons(filter)?;
        Ok(persons
            .into_iter()
            .filter(|p| !self.is_hidden(&p.username))
            .collect())
    }

    fn create_person(&self, person: &NewPerson) -> RepositoryResult<PersonRecord> {
        self.inner.create_person(person)
    }

    fn update_person(&self, person: &PersonRecord) -> RepositoryResult<()> {
        self.inner.update_person(person)
    }

    fn set_password_hash(&self, person_id: i64, hash: &str) -> RepositoryResult<()> {
        self.inner.set_password_hash(person_id, hash)
    }

    fn find_password_hash(&self, person_id: i64) -> RepositoryResult<Option<String>> {
        self.inner.find_password_hash(person_id)
    }

    fn count_persons(&self) -> RepositoryResult<i64> {
        self.inner.count_persons()
    }
}

impl LogEntryRepository for ContendedStore {
    fn lock_log_entries(&self, ids: &[i64]) -> RepositoryResult<Vec<LogEntryRecord>> {
        self.inner.lock_log_entries(ids)
    }

    fn update_log_entry_status(
        &self,
        id: i64,
        status: LogEntryStatus,
        action_at: NaiveDateTime,
    ) -> RepositoryResult<()> {
        self.inner.update_log_entry_status(id, status, action_at)
    }

    fn update_log_entry_supervisor(&self, id: i64, supervisor_id: i64) -> RepositoryResult<()> {
        self.inner.update_log_entry_supervisor(id, supervisor_id)
    }

    fn create_log_entry(&self, entry: &NewLogEntry) -> RepositoryResult<LogEntryRecord> {
        self.inner.create_log_entry(entry)
    }

    fn find_log_entry(&self, id: i64) -> RepositoryResult<Option<LogEntryRecord>> {
        self.inner.find_log_entry(id)
    }

    fn count_log_entries(&self) -> RepositoryResult<i64> {
        self.inner.count_log_entries()
    }
}

impl OperationLedgerRepository for ContendedStore {
    fn insert_ledger(&self, ledger: &OperationLedger) -> RepositoryResult<()> {
        self.inner.insert_ledger(ledger)
    }

    fn save_ledger(&self, ledger: &OperationLedger) -> RepositoryResult<()> {
        self.inner.save_ledger(ledger)
    }

    fn find_ledger(&self, id: &str) -> RepositoryResult<Option<OperationLedger>> {
        self.inner.find_ledger(id)
    }

    fn list_ledgers_by_actor(
        &self,
        actor_id: i64,
        limit: usize,
    ) -> RepositoryResult<Vec<OperationLedger>> {
        self.inner.list_ledgers_by_actor(actor_id, limit)
    }
}

impl UnitOfWork for ContendedStore {
    fn atomic<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<RepositoryError>,
    {
        if self.refuse_units {
            return Err(E::from(RepositoryError::DatabaseTransactionError(
                "database is locked".to_string(),
            )));
        }
        self.inner.atomic(work)
    }
}

fn contended_service(store: ContendedStore) -> BulkService<ContendedStore> {
    BulkService::new(Arc::new(store), admin(), fast_config())
        .unwrap()
        .with_today(today())
}

#[test]
fn test_username_taken_after_probe_is_row_failure() {
    let (_tmp, store) = create_test_store();
    seed_person(&store, "sara.ahmed", "Sara", "Ahmed", Role::Supervisor);

    let file = csv_file(
        "supervisors.csv",
        &[
            "name,specialty,email",
            "Sara Ahmed,Surgery,sara.new@pmc.edu.pk",
            "Hina Tariq,Pediatrics,",
        ],
    );
    let svc = contended_service(ContendedStore::new(&store).hiding("sara.ahmed"));
    let ledger = svc
        .import_supervisors(&file, ImportOptions::commit().with_allow_partial(true))
        .unwrap();

    assert_eq!(ledger.status, OperationStatus::Completed);
    assert_eq!(ledger.total_items, 2);
    assert_eq!(ledger.success_count, 1);
    assert_eq!(ledger.failure_count, 1);
    let failure = &ledger.detail_list("failures")[0];
    assert_eq!(failure["row"], 2);
    assert_eq!(failure["code"], "duplicate-or-constraint-violation");

    // 已有账号未被改写, 也没有出现重复账号
    assert_eq!(store.count_persons().unwrap(), 2);
    let sara = store.find_person_by_username("sara.ahmed").unwrap().unwrap();
    assert_eq!(sara.email, "sara.ahmed@pmc.edu.pk");

    let stored = store.find_ledger(&ledger.id).unwrap().unwrap();
    assert_eq!(stored.status, OperationStatus::Completed);
}

#[test]
fn test_unit_failure_still_finalizes_ledger() {
    let (_tmp, store) = create_test_store();
    let file = csv_file("supervisors.csv", &["name,specialty", "Sara Ahmed,Surgery"]);

    let svc = contended_service(ContendedStore::new(&store).refusing_units());
    let result = svc.import_supervisors(&file, ImportOptions::commit());
    assert!(matches!(result, Err(BulkError::Repository(_))));

    let ledgers = store.list_ledgers_by_actor(admin().id, 10).unwrap();
    assert_eq!(ledgers.len(), 1);
    assert_eq!(ledgers[0].status, OperationStatus::Failed);
    assert_eq!(ledgers[0].total_items, 1);
    assert!(ledgers[0].detail["error"].as_str().unwrap().contains("database is locked"));
    assert_eq!(store.count_persons().unwrap(), 0);
}
