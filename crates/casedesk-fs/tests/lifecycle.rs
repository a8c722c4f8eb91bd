use std::fs;
use std::path::Path;

use casedesk_fs::{
    read_marker, write_marker, CaseDeletion, FolderError, FolderLifecycleManager, FolderState,
    MatchKind, Migration, StageRemoval,
};
use casedesk_model::{CaseIdentity, CaseRecord, FolderConfig};
use pretty_assertions::assert_eq;

fn manager(base: &Path) -> FolderLifecycleManager {
    FolderLifecycleManager::new(FolderConfig::default().with_base_dir(base))
}

fn record(case_id: &str, client: &str) -> CaseRecord {
    CaseRecord::new("civil", client)
        .expect("record")
        .with_case_id(case_id)
}

#[test]
fn create_builds_skeleton_and_marker() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let manager = manager(tmp.path());
    let record = record("113001", "張三");

    assert_eq!(manager.state(&record).expect("state"), FolderState::Absent);
    let created = manager.create(&record).expect("create");
    assert!(created.created);
    assert_eq!(created.path, tmp.path().join("civil_cases").join("113001_張三"));
    for sub in ["案件資訊", "進度追蹤", "相關文件"] {
        assert!(created.path.join(sub).is_dir(), "missing {sub}");
    }
    assert_eq!(
        read_marker(&created.path).expect("marker"),
        Some(record.identity())
    );
    assert_eq!(
        manager.state(&record).expect("state"),
        FolderState::SkeletonCreated
    );

    // Creating again reuses the folder.
    let again = manager.create(&record).expect("create again");
    assert!(!again.created);
    assert_eq!(again.path, created.path);

    fs::write(created.path.join("相關文件").join("起訴狀.pdf"), b"%PDF").expect("write");
    assert_eq!(manager.state(&record).expect("state"), FolderState::Populated);
}

#[test]
fn rename_moves_folder_and_keeps_stage_contents() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let manager = manager(tmp.path());
    let record = record("113001", "張三");
    let original = manager.create(&record).expect("create").path;
    let hearing = manager.ensure_stage_folder(&record, "開庭").expect("stage");
    fs::write(hearing.join("筆錄.txt"), "first hearing").expect("write");
    let tagged = original.join("相關文件").join("113001_判決");
    fs::create_dir_all(&tagged).expect("mkdir");

    let renamed = manager.rename(&record, "113001", "113099").expect("rename");

    let bucket = tmp.path().join("civil_cases");
    assert_eq!(renamed, bucket.join("113099_張三"));
    assert!(!original.exists());
    assert_eq!(
        fs::read_to_string(renamed.join("進度追蹤").join("開庭").join("筆錄.txt")).expect("read"),
        "first hearing"
    );
    assert!(renamed.join("相關文件").join("113099_判決").is_dir());
    assert!(!renamed.join("相關文件").join("113001_判決").exists());

    let moved = record.clone().with_case_id("113099");
    assert_eq!(read_marker(&renamed).expect("marker"), Some(moved.identity()));
    let resolved = manager.resolver().resolve(&moved).expect("resolve");
    assert_eq!(resolved.map(|r| r.path), Some(renamed));
}

#[test]
fn rename_refuses_to_overwrite_existing_target() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let manager = manager(tmp.path());
    let first = manager.create(&record("113001", "張三")).expect("create").path;
    let second = manager.create(&record("113099", "張三")).expect("create").path;

    let err = manager
        .rename(&record("113001", "張三"), "113001", "113099")
        .expect_err("target exists");
    assert!(matches!(err, FolderError::TargetExists { ref path } if *path == second));
    assert!(first.is_dir());
    assert!(second.is_dir());
}

#[test]
fn rename_of_missing_folder_is_not_found() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let manager = manager(tmp.path());
    let err = manager
        .rename(&record("113001", "張三"), "113001", "113002")
        .expect_err("nothing to rename");
    assert!(matches!(err, FolderError::NotFound { .. }));
}

#[test]
fn legacy_client_only_folder_is_still_resolved() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let manager = manager(tmp.path());
    let legacy = tmp.path().join("civil_cases").join("張三");
    fs::create_dir_all(legacy.join("進度追蹤")).expect("mkdir");

    let record = record("113001", "張三");
    assert_eq!(
        manager.resolver().derive(&record).expect("derive"),
        tmp.path().join("civil_cases").join("113001_張三")
    );
    let found = manager
        .resolver()
        .resolve(&record)
        .expect("resolve")
        .expect("legacy folder");
    assert_eq!(found.path, legacy);
    assert_eq!(found.match_kind, MatchKind::Legacy);

    // Creating reuses the legacy folder rather than making a second one.
    let created = manager.create(&record).expect("create");
    assert!(!created.created);
    assert_eq!(created.path, legacy);

    match manager.migrate(&record).expect("migrate") {
        Migration::Moved { from, to } => {
            assert_eq!(from, legacy);
            assert_eq!(to, tmp.path().join("civil_cases").join("113001_張三"));
        }
        other => panic!("unexpected migration outcome: {other:?}"),
    }
    let found = manager.resolver().resolve(&record).expect("resolve").expect("found");
    assert_eq!(found.match_kind, MatchKind::Canonical);
}

#[test]
fn fuzzy_scan_finds_renamed_by_hand_folders() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let manager = manager(tmp.path());
    let by_hand = tmp.path().join("civil_cases").join("舊案-113001-張三先生");
    fs::create_dir_all(&by_hand).expect("mkdir");

    let found = manager
        .resolver()
        .resolve(&record("113001", "李四"))
        .expect("resolve")
        .expect("fuzzy hit on case id");
    assert_eq!(found.path, by_hand);
    assert_eq!(found.match_kind, MatchKind::Fuzzy);
    assert!(found.verified);
}

#[test]
fn client_name_only_match_is_never_touched() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let manager = manager(tmp.path());
    let other = tmp.path().join("civil_cases").join("張三豐");
    fs::create_dir_all(other.join("相關文件")).expect("mkdir");
    fs::write(other.join("相關文件").join("判決.pdf"), b"%PDF").expect("write");
    let record = record("113001", "張三");

    let found = manager
        .resolver()
        .resolve(&record)
        .expect("resolve")
        .expect("fuzzy hit on client");
    assert_eq!(found.path, other);
    assert!(!found.verified);

    assert_eq!(
        manager.delete_case(&record, true).expect("delete"),
        CaseDeletion::NotFound
    );
    assert!(matches!(
        manager.rename(&record, "113001", "113099"),
        Err(FolderError::NotFound { .. })
    ));
    assert!(matches!(
        manager.migrate(&record),
        Err(FolderError::UnverifiedMatch { path }) if path == other
    ));
    assert!(matches!(
        manager.ensure_stage_folder(&record, "開庭"),
        Err(FolderError::NotFound { .. })
    ));
    assert_eq!(manager.state(&record).expect("state"), FolderState::Absent);

    let created = manager.create(&record).expect("create");
    assert!(created.created);
    assert_eq!(created.path, tmp.path().join("civil_cases").join("113001_張三"));
    manager.delete_case(&record, true).expect("delete own folder");

    assert!(other.join("相關文件").join("判決.pdf").is_file());
    assert_eq!(read_marker(&other).expect("marker"), None);
}

#[test]
fn colliding_name_of_unrelated_case_gets_suffix() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let manager = manager(tmp.path());
    // Both clients sanitize to `王_小明`.
    let first = manager.create(&record("", "王/小明")).expect("create").path;
    let second = manager.create(&record("", "王:小明")).expect("create").path;

    let bucket = tmp.path().join("civil_cases");
    assert_eq!(first, bucket.join("王_小明"));
    assert_eq!(second, bucket.join("王_小明_1"));
    assert_eq!(
        read_marker(&first).expect("marker").map(|m| m.client),
        Some("王/小明".to_string())
    );

    // Each case resolves to its own folder.
    let resolved = manager
        .resolver()
        .resolve(&record("", "王:小明"))
        .expect("resolve")
        .expect("found");
    assert_eq!(resolved.path, second);
    assert_eq!(resolved.match_kind, MatchKind::Suffixed);
}

#[test]
fn foreign_marked_folder_is_never_reused() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let manager = manager(tmp.path());
    let occupied = tmp.path().join("civil_cases").join("張三");
    fs::create_dir_all(&occupied).expect("mkdir");
    write_marker(
        &occupied,
        &CaseIdentity {
            case_type: "civil".to_string(),
            case_id: "112005".to_string(),
            client: "張三".to_string(),
        },
    )
    .expect("marker");

    let created = manager.create(&record("113001", "張三")).expect("create");
    assert_eq!(created.path, tmp.path().join("civil_cases").join("113001_張三"));
    assert!(created.created);
}

#[test]
fn collision_attempts_are_bounded() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let mut config = FolderConfig::default().with_base_dir(tmp.path());
    config.max_collision_attempts = 2;
    let manager = FolderLifecycleManager::new(config);
    for client in ["王/小明", "王:小明", "王?小明"] {
        manager.create(&record("", client)).expect("create");
    }
    let err = manager
        .create(&record("", "王*小明"))
        .expect_err("out of suffixes");
    assert!(matches!(err, FolderError::CollisionLimit { attempts: 2, .. }));
}

#[test]
fn stage_folders_are_idempotent() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let manager = manager(tmp.path());
    let record = record("113001", "張三");
    let case_dir = manager.create(&record).expect("create").path;

    let first = manager.ensure_stage_folder(&record, "開庭").expect("stage");
    let second = manager.ensure_stage_folder(&record, "開庭").expect("stage again");
    assert_eq!(first, second);
    assert_eq!(first, case_dir.join("進度追蹤").join("開庭"));

    let sanitized = manager
        .ensure_stage_folder(&record, "判決/上訴")
        .expect("stage");
    assert_eq!(sanitized, case_dir.join("進度追蹤").join("判決_上訴"));

    assert!(matches!(
        manager.ensure_stage_folder(&record, "  "),
        Err(FolderError::EmptyStageName)
    ));
    assert!(matches!(
        manager.ensure_stage_folder(&unfiled_record(), "開庭"),
        Err(FolderError::NotFound { .. })
    ));
}

fn unfiled_record() -> CaseRecord {
    record("113777", "無資料")
}

#[test]
fn deleting_stage_folders_reports_outcome() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let manager = manager(tmp.path());
    let record = record("113001", "張三");
    manager.create(&record).expect("create");

    assert_eq!(
        manager.delete_stage_folder(&record, "開庭").expect("delete"),
        StageRemoval::NothingToDelete
    );

    let stage = manager.ensure_stage_folder(&record, "開庭").expect("stage");
    fs::write(stage.join("通知.pdf"), b"12345").expect("write");
    match manager.delete_stage_folder(&record, "開庭").expect("delete") {
        StageRemoval::Removed { path, usage } => {
            assert_eq!(path, stage);
            assert_eq!(usage.file_count, 1);
            assert_eq!(usage.total_bytes, 5);
        }
        other => panic!("unexpected removal outcome: {other:?}"),
    }
    assert!(!stage.exists());
}

#[test]
fn delete_case_requires_confirmation() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let manager = manager(tmp.path());
    let record = record("113001", "張三");
    let case_dir = manager.create(&record).expect("create").path;
    fs::write(case_dir.join("案件資訊").join("摘要.txt"), "abc").expect("write");

    match manager.delete_case(&record, false).expect("preview") {
        CaseDeletion::NeedsConfirmation { path, usage } => {
            assert_eq!(path, case_dir);
            assert_eq!(usage.file_count, 1);
            assert_eq!(usage.total_bytes, 3);
            assert_eq!(usage.dir_count, 3);
        }
        other => panic!("unexpected deletion outcome: {other:?}"),
    }
    assert!(case_dir.is_dir());

    assert!(matches!(
        manager.delete_case(&record, true).expect("delete"),
        CaseDeletion::Deleted { .. }
    ));
    assert!(!case_dir.exists());
    assert_eq!(
        manager.delete_case(&record, true).expect("delete again"),
        CaseDeletion::NotFound
    );
    assert_eq!(manager.state(&record).expect("state"), FolderState::Absent);
}

#[test]
fn unknown_case_type_fails_only_that_operation() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let manager = manager(tmp.path());
    let odd = CaseRecord::new("maritime", "張三").expect("record");
    assert!(matches!(
        manager.create(&odd),
        Err(FolderError::UnknownCaseType { .. })
    ));
    assert!(manager.create(&record("113001", "張三")).is_ok());
}
