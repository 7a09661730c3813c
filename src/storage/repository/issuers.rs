// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Issuer repository. Public keys are unique across issuers.

use redb::ReadableTable;
use uuid::Uuid;

use crate::models::{Certificate, Issuer};
use crate::storage::database::{
    get_json, list_json, to_json, Database, StorageError, StorageResult, CERTIFICATES,
    ISSUERS, ISSUER_KEYS,
};

pub struct IssuerRepository<'a> {
    db: &'a Database,
}

impl<'a> IssuerRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn find_by_id(&self, id: Uuid) -> StorageResult<Option<Issuer>> {
        let key = id.to_string();
        self.db.read("issuers.find_by_id", |txn| {
            let table = txn.open_table(ISSUERS)?;
            get_json(&table, &key)
        })
    }

    pub fn get(&self, id: Uuid) -> StorageResult<Issuer> {
        self.find_by_id(id)?
            .ok_or_else(|| StorageError::NotFound("Issuer".to_string()))
    }

    pub fn find_by_public_key(&self, public_key: &str) -> StorageResult<Option<Issuer>> {
        self.db.read("issuers.find_by_public_key", |txn| {
            let index = txn.open_table(ISSUER_KEYS)?;
            let Some(id) = index.get(public_key)?.map(|v| v.value().to_string()) else {
                return Ok(None);
            };
            let table = txn.open_table(ISSUERS)?;
            get_json(&table, &id)
        })
    }

    pub fn create(&self, issuer: &Issuer) -> StorageResult<()> {
        let key = issuer.id.to_string();
        let json = to_json(issuer)?;
        self.db.write("issuers.create", |txn| {
            let mut index = txn.open_table(ISSUER_KEYS)?;
            if index.get(issuer.public_key.as_str())?.is_some() {
                return Err(StorageError::AlreadyExists(
                    "Issuer with this public key".to_string(),
                ));
            }
            index.insert(issuer.public_key.as_str(), key.as_str())?;

            let mut table = txn.open_table(ISSUERS)?;
            table.insert(key.as_str(), json.as_slice())?;
            Ok(())
        })
    }

    pub fn update(&self, issuer: &Issuer) -> StorageResult<()> {
        let key = issuer.id.to_string();
        let json = to_json(issuer)?;
        self.db.write("issuers.update", |txn| {
            let mut table = txn.open_table(ISSUERS)?;
            let previous: Issuer = get_json(&table, &key)?
                .ok_or_else(|| StorageError::NotFound("Issuer".to_string()))?;

            if previous.public_key != issuer.public_key {
                let mut index = txn.open_table(ISSUER_KEYS)?;
                if index.get(issuer.public_key.as_str())?.is_some() {
                    return Err(StorageError::AlreadyExists(
                        "Issuer with this public key".to_string(),
                    ));
                }
                index.remove(previous.public_key.as_str())?;
                index.insert(issuer.public_key.as_str(), key.as_str())?;
            }

            table.insert(key.as_str(), json.as_slice())?;
            Ok(())
        })
    }

    /// Delete an issuer. Fails with `InUse` while certificates reference it.
    pub fn remove(&self, id: Uuid) -> StorageResult<()> {
        let key = id.to_string();
        self.db.write("issuers.remove", |txn| {
            let certificates = txn.open_table(CERTIFICATES)?;
            let referenced = list_json::<Certificate, _>(&certificates)?
                .iter()
                .any(|c| c.issuer_id == Some(id));
            if referenced {
                return Err(StorageError::InUse("Issuer".to_string()));
            }

            let mut table = txn.open_table(ISSUERS)?;
            let issuer: Issuer = get_json(&table, &key)?
                .ok_or_else(|| StorageError::NotFound("Issuer".to_string()))?;
            table.remove(key.as_str())?;

            let mut index = txn.open_table(ISSUER_KEYS)?;
            index.remove(issuer.public_key.as_str())?;
            Ok(())
        })
    }

    /// All issuers ordered by name.
    pub fn list(&self) -> StorageResult<Vec<Issuer>> {
        let mut issuers: Vec<Issuer> = self.db.read("issuers.list", |txn| {
            let table = txn.open_table(ISSUERS)?;
            list_json(&table)
        })?;
        issuers.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(issuers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::repository::CertificateRepository;
    use chrono::Utc;

    const KEY_A: &str = "GAB2CB576PHBBPQ5ODORRZ2LYCMWPZGWGCN2KDK7DXOIMZASKUY3QZ6Q";
    const KEY_B: &str = "GDVEU3DD4KOFECV66VIHWEZOYX4ZKR3WV27L464SIIPOU2IUI3JCZA57";

    fn sample_issuer(name: &str, key: &str) -> Issuer {
        let now = Utc::now();
        Issuer {
            id: Uuid::new_v4(),
            name: name.to_string(),
            public_key: key.to_string(),
            description: None,
            website: None,
            contact_email: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn public_key_is_unique() {
        let db = Database::in_memory().unwrap();
        let repo = IssuerRepository::new(&db);
        repo.create(&sample_issuer("Academy", KEY_A)).unwrap();
        assert!(matches!(
            repo.create(&sample_issuer("Other", KEY_A)),
            Err(StorageError::AlreadyExists(_))
        ));
        assert!(repo.find_by_public_key(KEY_A).unwrap().is_some());
    }

    #[test]
    fn update_moves_public_key_index() {
        let db = Database::in_memory().unwrap();
        let repo = IssuerRepository::new(&db);
        let mut issuer = sample_issuer("Academy", KEY_A);
        repo.create(&issuer).unwrap();

        issuer.public_key = KEY_B.to_string();
        repo.update(&issuer).unwrap();
        assert!(repo.find_by_public_key(KEY_A).unwrap().is_none());
        assert_eq!(repo.find_by_public_key(KEY_B).unwrap().unwrap().id, issuer.id);
    }

    #[test]
    fn list_sorted_by_name() {
        let db = Database::in_memory().unwrap();
        let repo = IssuerRepository::new(&db);
        repo.create(&sample_issuer("zeta", KEY_A)).unwrap();
        repo.create(&sample_issuer("Alpha", KEY_B)).unwrap();
        let names: Vec<String> = repo.list().unwrap().into_iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["Alpha", "zeta"]);
    }

    #[test]
    fn remove_refuses_referenced_issuer() {
        let db = Database::in_memory().unwrap();
        let repo = IssuerRepository::new(&db);
        let issuer = sample_issuer("Academy", KEY_A);
        repo.create(&issuer).unwrap();

        let certs = CertificateRepository::new(&db);
        let mut cert = crate::storage::repository::certificates::tests::sample_certificate("CERT-1");
        cert.issuer_id = Some(issuer.id);
        certs.create(&cert).unwrap();

        assert!(matches!(repo.remove(issuer.id), Err(StorageError::InUse(_))));

        certs.remove(cert.id).unwrap();
        repo.remove(issuer.id).unwrap();
        assert!(repo.find_by_id(issuer.id).unwrap().is_none());
        assert!(repo.find_by_public_key(KEY_A).unwrap().is_none());
    }
}
