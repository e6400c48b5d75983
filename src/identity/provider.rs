use std::sync::Arc;

use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::storage::Storage;
use crate::tprintln;

use super::password::{hash_password, verify_password};
use super::role::Role;

#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    pub role: Role,
}

/// The authenticated principal returned on successful login.
#[derive(Debug, Clone)]
pub struct LoginResponse {
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub role: Role,
}

pub trait AuthProvider: Send + Sync {
    fn login(&self, req: &LoginRequest) -> AppResult<LoginResponse>;
    fn register(&self, req: &RegisterRequest) -> AppResult<String>;
}

/// Credential store backed by the application's own users table. Passwords
/// are kept as Argon2 PHC strings; the plaintext never touches storage.
pub struct LocalAuthProvider {
    storage: Arc<dyn Storage>,
}

impl LocalAuthProvider {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    fn username_taken(&self, username: &str) -> AppResult<bool> {
        let rows = self.storage.fetch_all(
            "SELECT username FROM users WHERE LOWER(username) = LOWER(?)",
            &[json!(username)],
        )?;
        Ok(!rows.is_empty())
    }
}

impl AuthProvider for LocalAuthProvider {
    fn login(&self, req: &LoginRequest) -> AppResult<LoginResponse> {
        let rows = self.storage.fetch_all(
            "SELECT password_hash, role FROM users WHERE username = ?",
            &[json!(req.username)],
        )?;
        let invalid = || AppError::auth("invalid_credentials", "invalid username or password");
        let row = rows.first().ok_or_else(invalid)?;
        let phc = row.first().and_then(|v| v.as_str()).ok_or_else(invalid)?;
        if !verify_password(phc, &req.password) {
            return Err(invalid());
        }
        let stored_role = row
            .get(1)
            .and_then(|v| v.as_str())
            .and_then(Role::parse)
            .ok_or_else(invalid)?;
        if stored_role != req.role {
            return Err(AppError::auth(
                "role_mismatch",
                format!("user '{}' is not registered as {}", req.username, req.role),
            ));
        }
        tprintln!("auth.login user={} role={}", req.username, stored_role);
        Ok(LoginResponse { username: req.username.clone(), role: stored_role })
    }

    fn register(&self, req: &RegisterRequest) -> AppResult<String> {
        if req.username.trim().is_empty() || req.password.is_empty() {
            return Err(AppError::validation(
                "missing_field",
                "username and password are required",
            ));
        }
        if self.username_taken(&req.username)? {
            return Err(AppError::auth(
                "username_taken",
                format!("username '{}' already exists", req.username),
            ));
        }
        let phc = hash_password(&req.password)?;
        let now_ms = chrono::Utc::now().timestamp_millis();
        self.storage.execute(
            "INSERT INTO users (username, password_hash, role, created_at) VALUES (?, ?, ?, ?)",
            &[json!(req.username), json!(phc), json!(req.role.as_str()), json!(now_ms)],
        )?;
        tprintln!("auth.register user={} role={}", req.username, req.role);
        Ok(format!("account '{}' created", req.username))
    }
}
