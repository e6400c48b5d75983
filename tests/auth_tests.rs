//! Registration and login paths over the embedded store, including
//! persistence of accounts across re-open.

use std::sync::Arc;

use medplus::error::AppError;
use medplus::identity::{AuthProvider, LocalAuthProvider, LoginRequest, RegisterRequest, Role};
use medplus::storage::SqliteStorage;

fn provider() -> LocalAuthProvider {
    LocalAuthProvider::new(Arc::new(SqliteStorage::open_in_memory().unwrap()))
}

fn register(auth: &LocalAuthProvider, username: &str, password: &str, role: Role) {
    auth.register(&RegisterRequest {
        username: username.into(),
        password: password.into(),
        role,
    })
    .unwrap();
}

#[test]
fn register_then_login() {
    let auth = provider();
    register(&auth, "alice", "s3cret", Role::User);

    let principal = auth
        .login(&LoginRequest { username: "alice".into(), password: "s3cret".into(), role: Role::User })
        .unwrap();
    assert_eq!(principal.username, "alice");
    assert_eq!(principal.role, Role::User);
}

#[test]
fn wrong_password_is_rejected() {
    let auth = provider();
    register(&auth, "alice", "s3cret", Role::User);

    let err = auth
        .login(&LoginRequest { username: "alice".into(), password: "nope".into(), role: Role::User })
        .unwrap_err();
    assert!(matches!(err, AppError::Auth { .. }));
    assert_eq!(err.code_str(), "invalid_credentials");

    // Unknown usernames fail the same way
    let err = auth
        .login(&LoginRequest { username: "mallory".into(), password: "s3cret".into(), role: Role::User })
        .unwrap_err();
    assert_eq!(err.code_str(), "invalid_credentials");
}

#[test]
fn role_must_match_the_registered_role() {
    let auth = provider();
    register(&auth, "alice", "s3cret", Role::User);

    let err = auth
        .login(&LoginRequest { username: "alice".into(), password: "s3cret".into(), role: Role::Admin })
        .unwrap_err();
    assert!(matches!(err, AppError::Auth { .. }));
    assert_eq!(err.code_str(), "role_mismatch");
}

#[test]
fn duplicate_usernames_are_rejected_case_insensitively() {
    let auth = provider();
    register(&auth, "Alice", "pw1", Role::User);

    let err = auth
        .register(&RegisterRequest { username: "alice".into(), password: "pw2".into(), role: Role::Admin })
        .unwrap_err();
    assert!(matches!(err, AppError::Auth { .. }));
    assert_eq!(err.code_str(), "username_taken");
}

#[test]
fn empty_fields_are_rejected() {
    let auth = provider();
    let err = auth
        .register(&RegisterRequest { username: "  ".into(), password: "pw".into(), role: Role::User })
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));

    let err = auth
        .register(&RegisterRequest { username: "alice".into(), password: "".into(), role: Role::User })
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));
}

#[test]
fn accounts_survive_reopen() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("medplus.db");
    {
        let auth = LocalAuthProvider::new(Arc::new(SqliteStorage::open(&path).unwrap()));
        register(&auth, "admin", "hospital", Role::Admin);
    }
    let auth = LocalAuthProvider::new(Arc::new(SqliteStorage::open(&path).unwrap()));
    let principal = auth
        .login(&LoginRequest { username: "admin".into(), password: "hospital".into(), role: Role::Admin })
        .unwrap();
    assert_eq!(principal.role, Role::Admin);
}
