// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User repository.
//!
//! Emails are unique; `user_emails` maps the normalised address to the id and
//! is kept in step with `users` inside the same write transaction.

use redb::{ReadableTable, ReadableTableMetadata};
use uuid::Uuid;

use crate::models::User;
use crate::storage::database::{
    get_json, list_json, to_json, Database, StorageError, StorageResult, USERS, USER_EMAILS,
};

pub struct UserRepository<'a> {
    db: &'a Database,
}

impl<'a> UserRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn find_by_id(&self, id: Uuid) -> StorageResult<Option<User>> {
        let key = id.to_string();
        self.db.read("users.find_by_id", |txn| {
            let table = txn.open_table(USERS)?;
            get_json(&table, &key)
        })
    }

    /// Get a user by id, failing with `NotFound`.
    pub fn get(&self, id: Uuid) -> StorageResult<User> {
        self.find_by_id(id)?
            .ok_or_else(|| StorageError::NotFound("User".to_string()))
    }

    /// Look up by (already normalised) email.
    pub fn find_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        self.db.read("users.find_by_email", |txn| {
            let index = txn.open_table(USER_EMAILS)?;
            let Some(id) = index.get(email)?.map(|v| v.value().to_string()) else {
                return Ok(None);
            };
            let table = txn.open_table(USERS)?;
            get_json(&table, &id)
        })
    }

    pub fn create(&self, user: &User) -> StorageResult<()> {
        let key = user.id.to_string();
        let json = to_json(user)?;
        self.db.write("users.create", |txn| {
            let mut index = txn.open_table(USER_EMAILS)?;
            if index.get(user.email.as_str())?.is_some() {
                return Err(StorageError::AlreadyExists("User".to_string()));
            }
            index.insert(user.email.as_str(), key.as_str())?;

            let mut table = txn.open_table(USERS)?;
            table.insert(key.as_str(), json.as_slice())?;
            Ok(())
        })
    }

    /// Replace an existing user, re-indexing the email if it changed.
    pub fn update(&self, user: &User) -> StorageResult<()> {
        let key = user.id.to_string();
        let json = to_json(user)?;
        self.db.write("users.update", |txn| {
            let mut table = txn.open_table(USERS)?;
            let previous: User =
                get_json(&table, &key)?.ok_or_else(|| StorageError::NotFound("User".to_string()))?;

            if previous.email != user.email {
                let mut index = txn.open_table(USER_EMAILS)?;
                if index.get(user.email.as_str())?.is_some() {
                    return Err(StorageError::AlreadyExists("User".to_string()));
                }
                index.remove(previous.email.as_str())?;
                index.insert(user.email.as_str(), key.as_str())?;
            }

            table.insert(key.as_str(), json.as_slice())?;
            Ok(())
        })
    }

    pub fn remove(&self, id: Uuid) -> StorageResult<()> {
        let key = id.to_string();
        self.db.write("users.remove", |txn| {
            let mut table = txn.open_table(USERS)?;
            let user: User =
                get_json(&table, &key)?.ok_or_else(|| StorageError::NotFound("User".to_string()))?;
            table.remove(key.as_str())?;

            let mut index = txn.open_table(USER_EMAILS)?;
            index.remove(user.email.as_str())?;
            Ok(())
        })
    }

    /// All users, newest first.
    pub fn list(&self) -> StorageResult<Vec<User>> {
        let mut users: Vec<User> = self.db.read("users.list", |txn| {
            let table = txn.open_table(USERS)?;
            list_json(&table)
        })?;
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    pub fn count(&self) -> StorageResult<u64> {
        self.db.read("users.count", |txn| {
            let table = txn.open_table(USERS)?;
            Ok(table.len()?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use chrono::{Duration, Utc};

    fn sample_user(email: &str) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            password_hash: "hash".to_string(),
            phone: None,
            role: Role::User,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn create_and_find_by_email() {
        let db = Database::in_memory().unwrap();
        let repo = UserRepository::new(&db);
        let user = sample_user("ada@example.com");
        repo.create(&user).unwrap();

        let found = repo.find_by_email("ada@example.com").unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert!(repo.find_by_email("nobody@example.com").unwrap().is_none());
        assert_eq!(repo.count().unwrap(), 1);
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let db = Database::in_memory().unwrap();
        let repo = UserRepository::new(&db);
        repo.create(&sample_user("ada@example.com")).unwrap();

        let result = repo.create(&sample_user("ada@example.com"));
        assert!(matches!(result, Err(StorageError::AlreadyExists(_))));
        assert_eq!(repo.count().unwrap(), 1);
    }

    #[test]
    fn update_reindexes_email() {
        let db = Database::in_memory().unwrap();
        let repo = UserRepository::new(&db);
        let mut user = sample_user("ada@example.com");
        repo.create(&user).unwrap();

        user.email = "countess@example.com".to_string();
        repo.update(&user).unwrap();

        assert!(repo.find_by_email("ada@example.com").unwrap().is_none());
        assert_eq!(
            repo.find_by_email("countess@example.com").unwrap().unwrap().id,
            user.id
        );
    }

    #[test]
    fn update_to_taken_email_fails() {
        let db = Database::in_memory().unwrap();
        let repo = UserRepository::new(&db);
        let mut first = sample_user("one@example.com");
        repo.create(&first).unwrap();
        repo.create(&sample_user("two@example.com")).unwrap();

        first.email = "two@example.com".to_string();
        assert!(matches!(
            repo.update(&first),
            Err(StorageError::AlreadyExists(_))
        ));
    }

    #[test]
    fn remove_frees_email() {
        let db = Database::in_memory().unwrap();
        let repo = UserRepository::new(&db);
        let user = sample_user("ada@example.com");
        repo.create(&user).unwrap();
        repo.remove(user.id).unwrap();

        assert!(repo.find_by_id(user.id).unwrap().is_none());
        repo.create(&sample_user("ada@example.com")).unwrap();
        assert!(matches!(repo.remove(user.id), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn list_is_newest_first() {
        let db = Database::in_memory().unwrap();
        let repo = UserRepository::new(&db);
        let mut older = sample_user("old@example.com");
        older.created_at = Utc::now() - Duration::days(2);
        let newer = sample_user("new@example.com");
        repo.create(&older).unwrap();
        repo.create(&newer).unwrap();

        let users = repo.list().unwrap();
        assert_eq!(users[0].id, newer.id);
        assert_eq!(users[1].id, older.id);
    }
}
