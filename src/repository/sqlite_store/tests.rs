use super::SqliteStore;
use crate::domain::ledger::OperationLedger;
use crate::domain::log_entry::NewLogEntry;
use crate::domain::person::{NewPerson, PersonFilter, Principal};
use crate::domain::types::{LogEntryStatus, OperationKind, OperationStatus, Role};
use crate::repository::error::RepositoryError;
use crate::repository::{
    LogEntryRepository, OperationLedgerRepository, PersonRepository, UnitOfWork,
};
use chrono::{NaiveDate, Utc};
use serde_json::json;

fn setup_store() -> SqliteStore {
    SqliteStore::open_in_memory().unwrap()
}

fn make_person(username: &str, first: &str, last: &str, role: Role) -> NewPerson {
    NewPerson {
        username: username.to_string(),
        email: format!("{}@pmc.edu.pk", username),
        first_name: first.to_string(),
        last_name: last.to_string(),
        role,
        specialty: Some("urology".to_string()),
        year: None,
        supervisor_id: None,
        registration_number: None,
        phone_number: None,
        date_joined: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        is_active: true,
        created_by: None,
    }
}

fn make_entry(pg_id: i64) -> NewLogEntry {
    NewLogEntry {
        pg_id,
        entry_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        status: LogEntryStatus::Pending,
        case_title: "Cystoscopy".to_string(),
        location_of_activity: "OT-1".to_string(),
        patient_history_summary: "Pending summary".to_string(),
        management_action: "Pending action".to_string(),
        topic_subtopic: "General".to_string(),
        created_by: None,
    }
}

#[test]
fn test_create_and_find_person() {
    let store = setup_store();
    let created = store
        .create_person(&make_person("ali.khan", "Ali", "Khan", Role::Supervisor))
        .unwrap();

    assert!(created.id > 0);
    assert_eq!(created.role, Role::Supervisor);
    assert!(store.username_exists("ali.khan").unwrap());
    assert!(!store.username_exists("ALI.KHAN").unwrap());

    let found = store.find_person_by_username("ali.khan").unwrap().unwrap();
    assert_eq!(found, created);
    assert_eq!(store.count_persons().unwrap(), 1);
}

#[test]
fn test_duplicate_username_is_constraint_violation() {
    let store = setup_store();
    store
        .create_person(&make_person("dup", "A", "B", Role::Admin))
        .unwrap();
    let err = store
        .create_person(&make_person("dup", "C", "D", Role::Admin))
        .unwrap_err();
    assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));
}

#[test]
fn test_filter_is_case_insensitive_and_role_scoped() {
    let store = setup_store();
    store
        .create_person(&make_person("ali.khan", "Ali", "Khan", Role::Supervisor))
        .unwrap();
    store
        .create_person(&make_person("ali.khan.pg", "Ali", "Khan", Role::Pg))
        .unwrap();

    let filter = PersonFilter::with_role(Role::Supervisor)
        .first_name("ALI")
        .last_name("khan");
    let found = store.filter_persons(&filter).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].username, "ali.khan");

    let by_username = store
        .first_person(&PersonFilter::default().username("Ali.Khan.PG"))
        .unwrap()
        .unwrap();
    assert_eq!(by_username.role, Role::Pg);
}

#[test]
fn test_update_person_and_password_hash() {
    let store = setup_store();
    let mut person = store
        .create_person(&make_person("sara", "Sara", "Ahmed", Role::Admin))
        .unwrap();
    person.email = "sara.new@pmc.edu.pk".to_string();
    person.modified_by = Some(99);
    store.update_person(&person).unwrap();
    store.set_password_hash(person.id, "$argon2id$fake").unwrap();

    let reloaded = store.find_person_by_id(person.id).unwrap().unwrap();
    assert_eq!(reloaded.email, "sara.new@pmc.edu.pk");
    assert_eq!(reloaded.modified_by, Some(99));
    assert_eq!(
        store.find_password_hash(person.id).unwrap().as_deref(),
        Some("$argon2id$fake")
    );
    assert!(store.set_password_hash(4242, "x").is_err());
}

#[test]
fn test_atomic_commits_on_ok_and_rolls_back_on_err() {
    let store = setup_store();

    store
        .atomic(|| -> Result<(), RepositoryError> {
            store.create_person(&make_person("kept", "K", "K", Role::Admin))?;
            Ok(())
        })
        .unwrap();

    let result = store.atomic(|| -> Result<(), RepositoryError> {
        store.create_person(&make_person("discarded", "D", "D", Role::Admin))?;
        Err(RepositoryError::ValidationError("abort".to_string()))
    });

    assert!(result.is_err());
    assert!(store.username_exists("kept").unwrap());
    assert!(!store.username_exists("discarded").unwrap());
    assert!(!store.in_unit());
}

#[test]
fn test_nested_unit_rolls_back_only_inner() {
    let store = setup_store();

    store
        .atomic(|| -> Result<(), RepositoryError> {
            store.create_person(&make_person("outer", "O", "O", Role::Admin))?;
            let inner = store.atomic(|| -> Result<(), RepositoryError> {
                store.create_person(&make_person("inner", "I", "I", Role::Admin))?;
                Err(RepositoryError::ValidationError("inner abort".to_string()))
            });
            assert!(inner.is_err());
            Ok(())
        })
        .unwrap();

    assert!(store.username_exists("outer").unwrap());
    assert!(!store.username_exists("inner").unwrap());
}

#[test]
fn test_lock_requires_unit_and_skips_missing_ids() {
    let store = setup_store();
    let pg = store
        .create_person(&make_person("pg1", "P", "G", Role::Pg))
        .unwrap();
    let e1 = store.create_log_entry(&make_entry(pg.id)).unwrap();
    let e2 = store.create_log_entry(&make_entry(pg.id)).unwrap();

    assert!(store.lock_log_entries(&[e1.id]).is_err());

    let locked = store
        .atomic(|| store.lock_log_entries(&[e2.id, 999, e1.id]))
        .unwrap();
    let ids: Vec<i64> = locked.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![e1.id, e2.id]);
}

#[test]
fn test_update_log_entry_status_and_supervisor() {
    let store = setup_store();
    let pg = store
        .create_person(&make_person("pg1", "P", "G", Role::Pg))
        .unwrap();
    let sup = store
        .create_person(&make_person("sup1", "S", "U", Role::Supervisor))
        .unwrap();
    let entry = store.create_log_entry(&make_entry(pg.id)).unwrap();
    let at = Utc::now().naive_utc();

    store
        .update_log_entry_status(entry.id, LogEntryStatus::Approved, at)
        .unwrap();
    store.update_log_entry_supervisor(entry.id, sup.id).unwrap();

    let reloaded = store.find_log_entry(entry.id).unwrap().unwrap();
    assert_eq!(reloaded.status, LogEntryStatus::Approved);
    assert_eq!(reloaded.supervisor_id, Some(sup.id));
    assert!(reloaded.supervisor_action_at.is_some());
    assert!(matches!(
        store.update_log_entry_supervisor(777, sup.id),
        Err(RepositoryError::NotFound { .. })
    ));
}

#[test]
fn test_ledger_insert_save_find_list() {
    let store = setup_store();
    let actor = Principal::new(5, "admin", Some(Role::Admin));

    let mut first = OperationLedger::start(&actor, OperationKind::Review);
    store.insert_ledger(&first).unwrap();
    first
        .mark_completed(2, 1, 1, json!({"successes": [{"id": 1}], "failures": [{"id": 2}]}))
        .unwrap();
    store.save_ledger(&first).unwrap();

    let second = OperationLedger::start(&actor, OperationKind::Import);
    store.insert_ledger(&second).unwrap();

    let loaded = store.find_ledger(&first.id).unwrap().unwrap();
    assert_eq!(loaded.status, OperationStatus::Completed);
    assert_eq!(loaded.success_count, 1);
    assert_eq!(loaded.detail["failures"][0]["id"], 2);

    let listed = store.list_ledgers_by_actor(5, 10).unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, second.id);
    assert!(store.list_ledgers_by_actor(6, 10).unwrap().is_empty());
    assert!(store.find_ledger("missing").unwrap().is_none());
}
