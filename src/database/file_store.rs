//! In-memory store mirrored to JSON files.
//!
//! Each collection lives in a `DashMap` and is rewritten in full to
//! `<data_dir>/<collection>.json` after every mutation (write to a temp file, then
//! rename). Files are read once when the store is opened.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    ListingFilter, Store, StoreError, StoreResult, SubmissionFilter, TransactionFilter,
};
use crate::constants::files;
use crate::models::{MarketplaceListing, Submission, Transaction, User, UserRole};

/// Record kept in a file-backed collection
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    fn key(&self) -> Uuid;
    fn created(&self) -> DateTime<Utc>;
}

impl Record for User {
    fn key(&self) -> Uuid {
        self.id
    }
    fn created(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Record for Submission {
    fn key(&self) -> Uuid {
        self.id
    }
    fn created(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Record for MarketplaceListing {
    fn key(&self) -> Uuid {
        self.id
    }
    fn created(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Record for Transaction {
    fn key(&self) -> Uuid {
        self.id
    }
    fn created(&self) -> DateTime<Utc> {
        self.created_at
    }
}

struct Collection<T: Record> {
    name: &'static str,
    path: PathBuf,
    records: DashMap<Uuid, T>,
    // Serializes file rewrites and check-then-insert sequences.
    write_lock: Mutex<()>,
}

impl<T: Record> Collection<T> {
    async fn load(dir: &Path, name: &'static str) -> StoreResult<Self> {
        let path = dir.join(name);
        let records = DashMap::new();

        match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => {}
            Ok(bytes) => {
                let items: Vec<T> = serde_json::from_slice(&bytes)
                    .map_err(|e| StoreError::Corrupt(format!("{}: {}", name, e)))?;
                for item in items {
                    records.insert(item.key(), item);
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        debug!("Loaded {} records from {}", records.len(), name);

        Ok(Self {
            name,
            path,
            records,
            write_lock: Mutex::new(()),
        })
    }

    fn get(&self, id: Uuid) -> Option<T> {
        self.records.get(&id).map(|entry| entry.value().clone())
    }

    fn find(&self, predicate: impl Fn(&T) -> bool) -> Option<T> {
        self.records
            .iter()
            .find(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
    }

    /// Matching records, oldest first.
    fn filter(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
        let mut items: Vec<T> = self
            .records
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        items.sort_by_key(|r| (r.created(), r.key()));
        items
    }

    async fn insert(&self, record: T) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        self.records.insert(record.key(), record);
        self.write_file().await
    }

    /// Insert unless an existing record conflicts with it.
    async fn insert_unique(
        &self,
        record: T,
        conflicts: impl Fn(&T, &T) -> bool,
    ) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let duplicate = self
            .records
            .iter()
            .any(|entry| conflicts(entry.value(), &record));
        if duplicate {
            return Err(StoreError::Duplicate(format!(
                "{} record conflicts with an existing one",
                self.name
            )));
        }
        self.records.insert(record.key(), record);
        self.write_file().await
    }

    async fn replace(&self, record: T) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        if !self.records.contains_key(&record.key()) {
            return Err(StoreError::NotFound(format!(
                "{} record {}",
                self.name,
                record.key()
            )));
        }
        self.records.insert(record.key(), record);
        self.write_file().await
    }

    async fn modify(&self, id: Uuid, apply: impl FnOnce(&mut T)) -> StoreResult<T> {
        let _guard = self.write_lock.lock().await;
        let updated = {
            let mut entry = self
                .records
                .get_mut(&id)
                .ok_or_else(|| StoreError::NotFound(format!("{} record {}", self.name, id)))?;
            apply(entry.value_mut());
            entry.value().clone()
        };
        self.write_file().await?;
        Ok(updated)
    }

    // Caller holds `write_lock`.
    async fn write_file(&self) -> StoreResult<()> {
        let snapshot = self.filter(|_| true);
        let bytes = serde_json::to_vec_pretty(&snapshot)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

/// JSON-file-backed store
pub struct FileStore {
    data_dir: PathBuf,
    users: Collection<User>,
    submissions: Collection<Submission>,
    listings: Collection<MarketplaceListing>,
    transactions: Collection<Transaction>,
}

impl FileStore {
    /// Open (or create) a store rooted at `data_dir`.
    pub async fn open(data_dir: impl AsRef<Path>) -> StoreResult<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&data_dir).await?;

        let store = Self {
            users: Collection::load(&data_dir, files::USERS).await?,
            submissions: Collection::load(&data_dir, files::SUBMISSIONS).await?,
            listings: Collection::load(&data_dir, files::MARKETPLACE).await?,
            transactions: Collection::load(&data_dir, files::TRANSACTIONS).await?,
            data_dir,
        };

        info!(
            users = store.users.records.len(),
            submissions = store.submissions.records.len(),
            listings = store.listings.records.len(),
            transactions = store.transactions.records.len(),
            "File store loaded"
        );

        Ok(store)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

fn newest_first<T: Record>(mut items: Vec<T>) -> Vec<T> {
    items.reverse();
    items
}

fn same_wallet(a: &User, b: &User) -> bool {
    matches!(
        (&a.wallet_address, &b.wallet_address),
        (Some(x), Some(y)) if x.eq_ignore_ascii_case(y)
    ) || matches!(
        (&a.email, &b.email),
        (Some(x), Some(y)) if x.eq_ignore_ascii_case(y)
    )
}

#[async_trait]
impl Store for FileStore {
    fn backend(&self) -> &'static str {
        "file"
    }

    async fn ping(&self) -> StoreResult<()> {
        let metadata = tokio::fs::metadata(&self.data_dir).await?;
        if metadata.is_dir() {
            Ok(())
        } else {
            Err(StoreError::Corrupt(format!(
                "{} is not a directory",
                self.data_dir.display()
            )))
        }
    }

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        self.users.insert_unique(user.clone(), same_wallet).await
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.users.get(id))
    }

    async fn find_user_by_wallet(&self, wallet_address: &str) -> StoreResult<Option<User>> {
        Ok(self.users.find(|u| {
            u.wallet_address
                .as_deref()
                .is_some_and(|w| w.eq_ignore_ascii_case(wallet_address))
        }))
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.users.find(|u| {
            u.email
                .as_deref()
                .is_some_and(|e| e.eq_ignore_ascii_case(email))
        }))
    }

    async fn list_users(&self, role: Option<UserRole>) -> StoreResult<Vec<User>> {
        Ok(self.users.filter(|u| role.map_or(true, |r| u.role == r)))
    }

    async fn adjust_user_credits(&self, id: Uuid, delta: Decimal) -> StoreResult<User> {
        self.users
            .modify(id, |user| {
                user.total_credits += delta;
                user.updated_at = Utc::now();
            })
            .await
    }

    async fn insert_submission(&self, submission: &Submission) -> StoreResult<()> {
        self.submissions.insert(submission.clone()).await
    }

    async fn get_submission(&self, id: Uuid) -> StoreResult<Option<Submission>> {
        Ok(self.submissions.get(id))
    }

    async fn find_submission_by_credit_id(
        &self,
        credit_id: &str,
    ) -> StoreResult<Option<Submission>> {
        Ok(self
            .submissions
            .find(|s| s.credit_id.as_deref() == Some(credit_id)))
    }

    async fn list_submissions(&self, filter: &SubmissionFilter) -> StoreResult<Vec<Submission>> {
        Ok(newest_first(self.submissions.filter(|s| filter.matches(s))))
    }

    async fn update_submission(&self, submission: &Submission) -> StoreResult<()> {
        self.submissions.replace(submission.clone()).await
    }

    async fn insert_listing(&self, listing: &MarketplaceListing) -> StoreResult<()> {
        self.listings.insert(listing.clone()).await
    }

    async fn get_listing(&self, id: Uuid) -> StoreResult<Option<MarketplaceListing>> {
        Ok(self.listings.get(id))
    }

    async fn list_listings(&self, filter: &ListingFilter) -> StoreResult<Vec<MarketplaceListing>> {
        Ok(newest_first(self.listings.filter(|l| filter.matches(l))))
    }

    async fn update_listing(&self, listing: &MarketplaceListing) -> StoreResult<()> {
        self.listings.replace(listing.clone()).await
    }

    async fn insert_transaction(&self, tx: &Transaction) -> StoreResult<()> {
        self.transactions.insert(tx.clone()).await
    }

    async fn list_transactions(&self, filter: &TransactionFilter) -> StoreResult<Vec<Transaction>> {
        Ok(newest_first(self.transactions.filter(|t| filter.matches(t))))
    }
}
