//! User account table

use redb::ReadableTable;
use serde::{Deserialize, Serialize};
use shared::models::{UserResponse, UserRole};

use super::{RecordStore, StorageError, StorageResult, USERS_TABLE};

/// Stored login account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub username: String,
    /// argon2 PHC string
    pub hash_pass: String,
    pub role: UserRole,
    pub permissions: Vec<String>,
    pub created_at: i64,
}

impl UserAccount {
    /// Verify password using argon2
    pub fn verify_password(&self, password: &str) -> Result<bool, argon2::password_hash::Error> {
        use argon2::{
            Argon2,
            password_hash::{PasswordHash, PasswordVerifier},
        };

        let parsed_hash = PasswordHash::new(&self.hash_pass)?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Hash password using argon2
    pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
        use argon2::{
            Argon2,
            password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
        };

        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let password_hash = argon2.hash_password(password.as_bytes(), &salt)?;
        Ok(password_hash.to_string())
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

impl From<&UserAccount> for UserResponse {
    fn from(user: &UserAccount) -> Self {
        Self {
            username: user.username.clone(),
            role: user.role,
            permissions: user.permissions.clone(),
            created_at: user.created_at,
        }
    }
}

impl RecordStore {
    pub fn get_user(&self, username: &str) -> StorageResult<Option<UserAccount>> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(USERS_TABLE)?;

        match table.get(username)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn list_users(&self) -> StorageResult<Vec<UserAccount>> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(USERS_TABLE)?;

        let mut users = Vec::new();
        for entry in table.iter()? {
            let (_key, value) = entry?;
            users.push(serde_json::from_slice(value.value())?);
        }
        Ok(users)
    }

    /// Insert a new account, failing if the username is taken
    pub fn create_user(&self, user: &UserAccount) -> StorageResult<()> {
        let txn = self.begin_write()?;
        {
            let mut table = txn.open_table(USERS_TABLE)?;
            if table.get(user.username.as_str())?.is_some() {
                return Err(StorageError::UserExists(user.username.clone()));
            }
            let value = serde_json::to_vec(user)?;
            table.insert(user.username.as_str(), value.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Overwrite an existing account
    pub fn update_user(&self, user: &UserAccount) -> StorageResult<()> {
        let txn = self.begin_write()?;
        {
            let mut table = txn.open_table(USERS_TABLE)?;
            if table.get(user.username.as_str())?.is_none() {
                return Err(StorageError::UserNotFound(user.username.clone()));
            }
            let value = serde_json::to_vec(user)?;
            table.insert(user.username.as_str(), value.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn delete_user(&self, username: &str) -> StorageResult<()> {
        let txn = self.begin_write()?;
        {
            let mut table = txn.open_table(USERS_TABLE)?;
            if table.remove(username)?.is_none() {
                return Err(StorageError::UserNotFound(username.to_string()));
            }
        }
        txn.commit()?;
        Ok(())
    }
}
