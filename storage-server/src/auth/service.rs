//! 账户服务
//!
//! 登录校验、默认账户初始化和用户管理。

use std::sync::Arc;
use std::time::Duration;

use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{LoginResponse, UserCreate, UserResponse, UserRole, UserUpdate};
use shared::util::now_millis;

use super::permissions::{self, get_default_permissions, is_valid_permission};
use crate::auth::JwtService;
use crate::db::{RecordStore, UserAccount};
use crate::security_log;
use crate::utils::validation::{MAX_PASSWORD_LEN, MAX_SHORT_TEXT_LEN, MIN_PASSWORD_LEN};

/// Fixed delay for authentication to prevent timing attacks
const AUTH_FIXED_DELAY_MS: u64 = 500;

/// 初始管理员账户名 (受保护，不可删除或降级)
pub const ADMIN_USERNAME: &str = "admin";

/// 初始普通员工账户名
pub const DEFAULT_USER_USERNAME: &str = "user";

/// 未配置 `ADMIN_INITIAL_PASSWORD` 时使用的密码
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin";

/// 未配置 `USER_INITIAL_PASSWORD` 时使用的密码
pub const DEFAULT_USER_PASSWORD: &str = "user";

#[derive(Debug, Clone)]
pub struct AuthService {
    store: RecordStore,
    jwt: Arc<JwtService>,
    login_delay: Duration,
}

impl AuthService {
    pub fn new(store: RecordStore, jwt: Arc<JwtService>) -> Self {
        Self {
            store,
            jwt,
            login_delay: Duration::from_millis(AUTH_FIXED_DELAY_MS),
        }
    }

    /// Override the fixed login delay (tests run with zero)
    pub fn with_login_delay(mut self, delay: Duration) -> Self {
        self.login_delay = delay;
        self
    }

    /// Verify credentials and issue a token
    ///
    /// Unknown user and wrong password produce the same error after the
    /// same delay.
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<LoginResponse> {
        let account = self.store.get_user(username)?;

        // Fixed delay to prevent timing attacks (before checking result)
        tokio::time::sleep(self.login_delay).await;

        let account = match account {
            Some(account) => {
                let valid = account
                    .verify_password(password)
                    .map_err(|e| AppError::internal(format!("Password verification failed: {}", e)))?;
                if !valid {
                    security_log!("WARN", "login_failed", username = username, reason = "invalid_credentials");
                    return Err(AppError::invalid_credentials());
                }
                account
            }
            None => {
                security_log!("WARN", "login_failed", username = username, reason = "user_not_found");
                return Err(AppError::invalid_credentials());
            }
        };

        let token = self
            .jwt
            .generate_token(&account.username, account.role.as_str(), &account.permissions)
            .map_err(|e| AppError::internal(format!("Failed to generate token: {}", e)))?;

        tracing::info!(
            username = %account.username,
            role = account.role.as_str(),
            "User logged in successfully"
        );

        Ok(LoginResponse {
            token,
            user: UserResponse::from(&account),
        })
    }

    /// Create the default `admin` and `user` accounts when missing
    ///
    /// Existing accounts are left untouched, so passwords changed through
    /// the API survive restarts.
    pub fn seed_default_users(&self, admin_password: &str, user_password: &str) -> AppResult<()> {
        if admin_password == DEFAULT_ADMIN_PASSWORD {
            tracing::warn!("⚠️  ADMIN_INITIAL_PASSWORD not set, seeding admin with the default password");
        }

        let seeds = [
            (ADMIN_USERNAME, admin_password, UserRole::Admin),
            (DEFAULT_USER_USERNAME, user_password, UserRole::User),
        ];
        for (username, password, role) in seeds {
            if self.store.get_user(username)?.is_some() {
                continue;
            }
            let account = UserAccount {
                username: username.to_string(),
                hash_pass: hash(password)?,
                role,
                permissions: get_default_permissions(role.as_str()),
                created_at: now_millis(),
            };
            self.store.create_user(&account)?;
            tracing::info!(username, role = role.as_str(), "Seeded default account");
        }
        Ok(())
    }

    pub fn list_users(&self) -> AppResult<Vec<UserResponse>> {
        let users = self.store.list_users()?;
        Ok(users.iter().map(UserResponse::from).collect())
    }

    pub fn get_user(&self, username: &str) -> AppResult<UserResponse> {
        let account = self
            .store
            .get_user(username)?
            .ok_or_else(|| user_not_found(username))?;
        Ok(UserResponse::from(&account))
    }

    pub fn create_user(&self, payload: UserCreate) -> AppResult<UserResponse> {
        let username = payload.username.trim();
        validate_username(username)?;
        validate_password(&payload.password)?;

        let permissions = match payload.permissions {
            Some(list) => validate_permissions(list)?,
            None => get_default_permissions(payload.role.as_str()),
        };

        let account = UserAccount {
            username: username.to_string(),
            hash_pass: hash(&payload.password)?,
            role: payload.role,
            permissions,
            created_at: now_millis(),
        };
        self.store.create_user(&account)?;

        tracing::info!(username = %account.username, role = account.role.as_str(), "User created");
        Ok(UserResponse::from(&account))
    }

    /// Apply a partial update
    ///
    /// The admin account keeps its role and permissions; only its password
    /// may change.
    pub fn update_user(&self, username: &str, payload: UserUpdate) -> AppResult<UserResponse> {
        let mut account = self
            .store
            .get_user(username)?
            .ok_or_else(|| user_not_found(username))?;

        let changes_access = payload.role.is_some() || payload.permissions.is_some();
        if account.username == ADMIN_USERNAME && changes_access {
            return Err(AppError::new(ErrorCode::CannotModifyAdmin));
        }

        if let Some(password) = payload.password {
            validate_password(&password)?;
            account.hash_pass = hash(&password)?;
        }
        if let Some(role) = payload.role {
            account.role = role;
            if payload.permissions.is_none() {
                account.permissions = get_default_permissions(role.as_str());
            }
        }
        if let Some(list) = payload.permissions {
            account.permissions = validate_permissions(list)?;
        }

        self.store.update_user(&account)?;
        tracing::info!(username = %account.username, "User updated");
        Ok(UserResponse::from(&account))
    }

    pub fn delete_user(&self, username: &str, actor: &str) -> AppResult<()> {
        if username == ADMIN_USERNAME {
            return Err(AppError::new(ErrorCode::CannotDeleteAdmin));
        }
        if username == actor {
            return Err(AppError::new(ErrorCode::UserCannotDeleteSelf));
        }
        self.store.delete_user(username)?;
        security_log!("INFO", "user_deleted", username = username, actor = actor);
        Ok(())
    }
}

fn hash(password: &str) -> AppResult<String> {
    UserAccount::hash_password(password)
        .map_err(|e| AppError::internal(format!("Failed to hash password: {}", e)))
}

fn user_not_found(username: &str) -> AppError {
    AppError::with_message(ErrorCode::UserNotFound, format!("User {} not found", username))
        .with_detail("username", username)
}

fn validate_username(username: &str) -> AppResult<()> {
    if username.is_empty() {
        return Err(AppError::invalid_field("username", "Username is required"));
    }
    if username.chars().count() > MAX_SHORT_TEXT_LEN {
        return Err(AppError::invalid_field(
            "username",
            format!("Username is too long (max {} characters)", MAX_SHORT_TEXT_LEN),
        ));
    }
    Ok(())
}

fn validate_password(password: &str) -> AppResult<()> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err(AppError::with_message(
            ErrorCode::PasswordTooShort,
            format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
        ));
    }
    if len > MAX_PASSWORD_LEN {
        return Err(AppError::invalid_field(
            "password",
            format!("Password is too long (max {} characters)", MAX_PASSWORD_LEN),
        ));
    }
    Ok(())
}

fn validate_permissions(list: Vec<String>) -> AppResult<Vec<String>> {
    if let Some(bad) = list.iter().find(|p| !is_valid_permission(p)) {
        return Err(AppError::invalid_field(
            "permissions",
            format!("Unknown permission: {}", bad),
        )
        .with_detail("allowed", permissions::ALL_PERMISSIONS.to_vec()));
    }
    let mut list = list;
    list.sort();
    list.dedup();
    Ok(list)
}
