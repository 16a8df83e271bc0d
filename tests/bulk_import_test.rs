// ==========================================
// 表格导入集成测试
// ==========================================
// 测试目标: 三种执行模式的台账结果与存储副作用
// ==========================================


use sims_bulk::domain::{OperationStatus, Role};
use sims_bulk::engine::ImportOptions;
use sims_bulk::importer::CredentialHasher;
use sims_bulk::logging;
use sims_bulk::repository::{LogEntryRepository, PersonRepository};
use test_helpers::{create_test_store, csv_file, fast_config, seed_person, service, xlsx_file};

fn supervisor_roster_with_bad_row() -> sims_bulk::UploadedFile {
    csv_file(
        "supervisors.csv",
        &[
            "name,specialty,email",
            "Sara Ahmed,Surgery,",
            ",Surgery,nobody@pmc.edu.pk",
            "Hina Tariq,Pediatrics,hina@pmc.edu.pk",
        ],
    )
}

#[test]
fn test_dry_run_never_changes_store() {
    logging::init_test();
    let (_tmp, store) = create_test_store();
    let before = store.count_persons().unwrap();

    let ledger = service(&store)
        .import_supervisors(
            &supervisor_roster_with_bad_row(),
            ImportOptions::default().with_allow_partial(true),
        )
        .unwrap();

    assert_eq!(ledger.status, OperationStatus::Completed);
    assert_eq!(ledger.success_count, 2);
    assert_eq!(ledger.failure_count, 1);
    assert_eq!(store.count_persons().unwrap(), before);
}

#[test]
fn test_strict_commit_discards_whole_batch() {
    let (_tmp, store) = create_test_store();

    let ledger = service(&store)
        .import_supervisors(&supervisor_roster_with_bad_row(), ImportOptions::commit())
        .unwrap();

    assert_eq!(ledger.status, OperationStatus::Failed);
    assert_eq!(ledger.success_count, 0);
    assert_eq!(ledger.failure_count, 1);
    assert_eq!(ledger.detail_list("failures")[0]["code"], "missing-field");
    assert_eq!(store.count_persons().unwrap(), 0);

    // 台账本身在回滚后仍然保留
    let stored = service(&store).find_ledger(&ledger.id).unwrap().unwrap();
    assert_eq!(stored.status, OperationStatus::Failed);
}

#[test]
fn test_allow_partial_commit_keeps_valid_rows() {
    let (_tmp, store) = create_test_store();

    let ledger = service(&store)
        .import_supervisors(
            &supervisor_roster_with_bad_row(),
            ImportOptions::commit().with_allow_partial(true),
        )
        .unwrap();

    assert_eq!(ledger.status, OperationStatus::Completed);
    assert_eq!(ledger.total_items, 3);
    assert_eq!(ledger.success_count, 2);
    assert_eq!(ledger.failure_count, 1);
    assert_eq!(ledger.detail_list("failures")[0]["row"], 3);
    assert_eq!(store.count_persons().unwrap(), 2);

    let sara = store.find_person_by_username("sara.ahmed").unwrap().unwrap();
    assert_eq!(sara.role, Role::Supervisor);
    assert_eq!(sara.email, "sara.ahmed.supervisor@pmc.edu.pk");
    let hina = store.find_person_by_username("hina.tariq").unwrap().unwrap();
    assert_eq!(hina.specialty.as_deref(), Some("pediatrics"));
}

#[test]
fn test_supervisor_created_once_across_imports() {
    let (_tmp, store) = create_test_store();
    let svc = service(&store);

    let first = csv_file(
        "residents.csv",
        &["name,specialty,year,supervisor_name", "Bilal Shah,Surgery,1,Dr. Ali Khan"],
    );
    let second = csv_file(
        "residents.csv",
        &["name,specialty,year,supervisor", "Usman Tariq,Surgery,2,Dr. Ali Khan"],
    );

    let ledger = svc.import_residents(&first, ImportOptions::commit()).unwrap();
    assert_eq!(ledger.status, OperationStatus::Completed);
    let ledger = svc.import_residents(&second, ImportOptions::commit()).unwrap();
    assert_eq!(ledger.success_count, 1);

    let ali = store.find_person_by_username("ali.khan").unwrap().unwrap();
    assert_eq!(ali.role, Role::Supervisor);
    assert!(store.find_person_by_username("ali.khan1").unwrap().is_none());

    let bilal = store.find_person_by_username("bilal.shah").unwrap().unwrap();
    let usman = store.find_person_by_username("usman.tariq").unwrap().unwrap();
    assert_eq!(bilal.supervisor_id, Some(ali.id));
    assert_eq!(usman.supervisor_id, Some(ali.id));
    assert_eq!(usman.email, "usman.tariq.pgr@pmc.edu.pk");
    assert_eq!(store.count_persons().unwrap(), 3);

    // 首登口令以 Argon2 哈希保存
    let config = fast_config();
    let hasher = CredentialHasher::new(config.hash_memory_kib, config.hash_iterations).unwrap();
    let hash = store.find_password_hash(usman.id).unwrap().unwrap();
    assert!(hasher.verify("usman.tariq@2!", &hash));
    let hash = store.find_password_hash(ali.id).unwrap().unwrap();
    assert!(hasher.verify("ali.khan@123!", &hash));
}

#[test]
fn test_resident_by_supervisor_username() {
    let (_tmp, store) = create_test_store();
    let sup = seed_person(&store, "s.ahmed", "Sara", "Ahmed", Role::Supervisor);

    let file = csv_file(
        "residents.csv",
        &[
            "first_name,last_name,specialty,year,supervisor_username,date_of_joining",
            "Omar,Farooq,Surgery,3,s.ahmed,15/01/2024",
            "Zain,Malik,Surgery,5,s.ahmed,",
            "Ayesha,Noor,Surgery,1,nobody,",
        ],
    );
    let ledger = service(&store)
        .import_residents(&file, ImportOptions::commit().with_allow_partial(true))
        .unwrap();

    assert_eq!(ledger.success_count, 1);
    let codes: Vec<&str> = ledger
        .detail_list("failures")
        .iter()
        .filter_map(|f| f["code"].as_str())
        .collect();
    // 导师用户名查不到降级为警告, 但无导师不能创建研究生
    assert_eq!(codes, ["invalid-enum-value", "unresolvable-supervisor"]);

    let omar = store.find_person_by_username("omar.farooq").unwrap().unwrap();
    assert_eq!(omar.supervisor_id, Some(sup.id));
    assert_eq!(omar.year.as_deref(), Some("3"));
    assert_eq!(omar.date_joined.to_string(), "2024-01-15");
}

#[test]
fn test_random_passwords_are_not_deterministic() {
    let (_tmp, store) = create_test_store();
    let file = csv_file("supervisors.csv", &["name,specialty", "Sara Ahmed,Surgery"]);

    let ledger = service(&store)
        .import_supervisors(&file, ImportOptions::commit().with_random_passwords())
        .unwrap();

    let password = ledger.detail_list("successes")[0]["password"]
        .as_str()
        .unwrap()
        .to_string();
    assert_ne!(password, "sara.ahmed@123!");
    assert!(password.len() >= 12);
}

#[test]
fn test_logbook_import_from_xlsx() {
    let (_tmp, store) = create_test_store();
    seed_person(&store, "pg.one", "Pg", "One", Role::Pg);

    let file = xlsx_file(
        "entries.xlsx",
        &[
            &["pg_username", "case_title", "date", "status", "location"],
            &["pg.one", "Cystoscopy", "2026-09-01", "Pending", "OT-3"],
            &["", "", "", "", ""],
            &["pg.one", "TURP", "2026-09-02", "", ""],
        ],
    );
    let ledger = service(&store)
        .import_logbook_entries(&file, ImportOptions::commit())
        .unwrap();

    assert_eq!(ledger.status, OperationStatus::Completed);
    assert_eq!(ledger.total_items, 2);
    assert_eq!(ledger.success_count, 2);
    assert_eq!(store.count_log_entries().unwrap(), 2);
    assert_eq!(ledger.detail_list("successes")[1]["row"], 4);
}

#[test]
fn test_unsupported_upload_fails_ledger() {
    let (_tmp, store) = create_test_store();
    let file = sims_bulk::UploadedFile::new("roster.pdf", b"%PDF".to_vec());

    let ledger = service(&store)
        .import_supervisors(&file, ImportOptions::commit())
        .unwrap();

    assert_eq!(ledger.status, OperationStatus::Failed);
    assert_eq!(ledger.failure_count, 0);
    assert!(ledger.detail["error"].as_str().unwrap().contains("roster.pdf"));
}
