#![forbid(unsafe_code)]

use chrono::{DateTime, TimeZone, Utc};
use civic_contracts::directory::{
    AccountRequestInput, AccountRequestStatus, AccountReview, DepartmentInput, DepartmentPatch,
    UserInput, UserPatch, UserRole,
};
use civic_storage::directory::{hash_password, DirectoryStore};
use civic_storage::persistence::InMemoryPersistence;
use civic_storage::snapshot::DirectorySnapshot;
use civic_storage::StorageError;
use uuid::Uuid;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 5, 1, 9, 0, 0).unwrap()
}

fn request_input(email: &str, first_name: &str) -> AccountRequestInput {
    AccountRequestInput {
        first_name: first_name.to_string(),
        last_name: "Doe".to_string(),
        email: email.to_string(),
        department: "Public Works".to_string(),
        job_title: "Engineer".to_string(),
        reason: "Field inventory".to_string(),
    }
}

fn review(by: &str) -> AccountReview {
    AccountReview {
        reviewed_by: by.to_string(),
        review_notes: Some("ok".to_string()),
    }
}

fn user_input(email: &str, password: &str) -> UserInput {
    UserInput {
        email: email.to_string(),
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        department: "IT".to_string(),
        job_title: "Analyst".to_string(),
        role: UserRole::Manager,
        password: password.to_string(),
    }
}

#[test]
fn at_directory_01_duplicate_pending_request_conflicts_and_leaves_first_intact() {
    let mut store = DirectoryStore::new_in_memory();
    let first = store
        .create_account_request(request_input("jane@x.com", "Jane"), now())
        .unwrap();
    assert_eq!(first.status, AccountRequestStatus::Pending);
    assert_eq!(first.request_date, "2023-05-01");

    let err = store
        .create_account_request(request_input(" JANE@x.com ", "Janet"), now())
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict { .. }));
    assert_eq!(store.account_requests(None), vec![&first]);
}

#[test]
fn at_directory_02_reviewed_request_frees_the_email_for_a_new_request() {
    let mut store = DirectoryStore::new_in_memory();
    let first = store
        .create_account_request(request_input("jane@x.com", "Jane"), now())
        .unwrap();
    store
        .reject_account_request(&first.id, review("admin"), now())
        .unwrap();
    store
        .create_account_request(request_input("jane@x.com", "Jane"), now())
        .unwrap();
    assert_eq!(
        store
            .account_requests(Some(AccountRequestStatus::Pending))
            .len(),
        1
    );
    assert_eq!(
        store
            .account_requests(Some(AccountRequestStatus::Rejected))
            .len(),
        1
    );
}

#[test]
fn at_directory_03_approval_creates_active_staff_user_that_can_log_in() {
    let mut store = DirectoryStore::new_in_memory();
    let request = store
        .create_account_request(request_input("jane@x.com", "Jane"), now())
        .unwrap();
    let approved = store
        .approve_account_request(&request.id, review("admin"), now())
        .unwrap();
    assert_eq!(approved.request.status, AccountRequestStatus::Approved);
    assert_eq!(approved.request.reviewed_by.as_deref(), Some("admin"));
    assert_eq!(approved.request.reviewed_date, Some(now()));
    assert_eq!(approved.user.role, UserRole::Staff);
    assert!(approved.user.active);

    let logged_in = store
        .authenticate("jane@x.com", &approved.temporary_password)
        .unwrap();
    assert_eq!(logged_in.id, approved.user.id);

    let again = store
        .approve_account_request(&request.id, review("admin"), now())
        .unwrap_err();
    assert!(matches!(again, StorageError::Conflict { .. }));
}

#[test]
fn at_directory_04_review_of_unknown_request_is_not_found() {
    let mut store = DirectoryStore::new_in_memory();
    let err = store
        .reject_account_request(&Uuid::new_v4(), review("admin"), now())
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound { .. }));
    assert!(!store.delete_account_request(&Uuid::new_v4()).unwrap());
}

#[test]
fn at_directory_05_authentication_rejects_bad_password_and_inactive_users() {
    let mut store = DirectoryStore::new_in_memory();
    let user = store
        .create_user(user_input("ada@x.com", "correct horse"), now())
        .unwrap();
    assert!(store.authenticate("ADA@x.com", "correct horse").is_ok());
    assert_eq!(
        store.authenticate("ada@x.com", "wrong horse").unwrap_err(),
        StorageError::Unauthorized
    );
    assert_eq!(
        store.authenticate("nobody@x.com", "correct horse").unwrap_err(),
        StorageError::Unauthorized
    );

    store
        .update_user(
            &user.id,
            UserPatch {
                active: Some(false),
                ..Default::default()
            },
            now(),
        )
        .unwrap();
    assert_eq!(
        store.authenticate("ada@x.com", "correct horse").unwrap_err(),
        StorageError::Unauthorized
    );
}

#[test]
fn at_directory_06_user_email_is_unique() {
    let mut store = DirectoryStore::new_in_memory();
    store
        .create_user(user_input("ada@x.com", "correct horse"), now())
        .unwrap();
    let err = store
        .create_user(user_input("Ada@X.com", "another pass"), now())
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict { table: "users", .. }));
}

#[test]
fn at_directory_07_seed_admin_only_runs_on_empty_directory() {
    let mut store = DirectoryStore::new_in_memory();
    let admin = store
        .seed_admin("admin@city.gov", "change-me-now", now())
        .unwrap()
        .unwrap();
    assert_eq!(admin.role, UserRole::Admin);
    assert!(store
        .seed_admin("admin@city.gov", "change-me-now", now())
        .unwrap()
        .is_none());
    assert_eq!(store.users().len(), 1);
}

#[test]
fn at_directory_08_department_names_are_unique_case_insensitively() {
    let mut store = DirectoryStore::new_in_memory();
    let parks = store
        .create_department(
            DepartmentInput {
                name: "Parks".to_string(),
                code: "PRK".to_string(),
                description: String::new(),
            },
            now(),
        )
        .unwrap();
    let finance = store
        .create_department(
            DepartmentInput {
                name: "Finance".to_string(),
                code: "FIN".to_string(),
                description: String::new(),
            },
            now(),
        )
        .unwrap();
    assert!(matches!(
        store.create_department(
            DepartmentInput {
                name: " parks ".to_string(),
                code: String::new(),
                description: String::new(),
            },
            now(),
        ),
        Err(StorageError::Conflict { .. })
    ));
    assert!(store
        .update_department(
            &finance.id,
            DepartmentPatch {
                name: Some("PARKS".to_string()),
                ..Default::default()
            }
        )
        .is_err());
    let renamed = store
        .update_department(
            &parks.id,
            DepartmentPatch {
                name: Some("Parks & Recreation".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(renamed.name, "Parks & Recreation");
    assert!(store.delete_department(&finance.id).unwrap());
    assert_eq!(store.departments().len(), 1);
}

#[test]
fn at_directory_09_failed_save_and_reload() {
    let persistence = InMemoryPersistence::default();
    let mut store = DirectoryStore::open(Box::new(persistence.clone()));
    persistence.set_fail_saves(true);
    assert!(matches!(
        store.create_account_request(request_input("jane@x.com", "Jane"), now()),
        Err(StorageError::Persistence { .. })
    ));
    assert!(store.account_requests(None).is_empty());
    assert_eq!(persistence.directory_save_count(), 0);
    persistence.set_fail_saves(false);

    let mut outside = DirectoryStore::new_in_memory();
    outside
        .create_user(user_input("ada@x.com", "correct horse"), now())
        .unwrap();
    persistence.overwrite_directory(DirectorySnapshot {
        users: outside.users().to_vec(),
        ..Default::default()
    });
    assert!(store.reload());
    assert!(store.user_by_email("ada@x.com").is_some());
}

#[test]
fn at_directory_10_password_hash_is_salted_by_user_id() {
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();
    let hash = hash_password(&first, "correct horse");
    assert_eq!(hash.len(), 64);
    assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(hash, hash_password(&first, "correct horse"));
    assert_ne!(hash, hash_password(&second, "correct horse"));
    assert_ne!(hash, hash_password(&first, "correct horse "));

    let mut store = DirectoryStore::new_in_memory();
    let user = store
        .create_user(user_input("ada@x.com", "correct horse"), now())
        .unwrap();
    assert_eq!(user.password_hash, hash_password(&user.id, "correct horse"));
}
