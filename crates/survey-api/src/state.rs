//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! ## Architecture
//!
//! Every collection of the document store is held in an in-memory
//! [`Store`]. When a database pool is configured, writes go through to
//! Postgres (see [`crate::db`]) and the stores are hydrated from it on
//! startup, so reads stay fast and synchronous.
//!
//! | Collection     | Record type        | Document id     |
//! |----------------|--------------------|-----------------|
//! | `users`        | [`User`]           | email           |
//! | `transactions` | [`Transaction`]    | transaction id  |
//! | `packages`     | [`Package`]        | generated       |
//! | `templates`    | [`Template`]       | generated       |
//! | `surveys`      | [`Survey`]         | generated       |
//! | `responses`    | [`SurveyResponse`] | generated       |

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::PgPool;
use survey_core::{Package, Survey, SurveyResponse, Template, Transaction, User};

// -- Collections --------------------------------------------------------------

/// Named document collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Transactions,
    Packages,
    Templates,
    Surveys,
    Responses,
}

impl Collection {
    /// Return the storage name of this collection.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Transactions => "transactions",
            Self::Packages => "packages",
            Self::Templates => "templates",
            Self::Surveys => "surveys",
            Self::Responses => "responses",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record that lives in a document collection.
pub trait Document: Clone + Send + Sync + Serialize + DeserializeOwned {
    /// The collection this record type is stored in.
    const COLLECTION: Collection;

    /// The document id of this record.
    fn doc_id(&self) -> &str;
}

impl Document for User {
    const COLLECTION: Collection = Collection::Users;
    fn doc_id(&self) -> &str {
        &self.email
    }
}

impl Document for Transaction {
    const COLLECTION: Collection = Collection::Transactions;
    fn doc_id(&self) -> &str {
        &self.id
    }
}

impl Document for Package {
    const COLLECTION: Collection = Collection::Packages;
    fn doc_id(&self) -> &str {
        &self.id
    }
}

impl Document for Template {
    const COLLECTION: Collection = Collection::Templates;
    fn doc_id(&self) -> &str {
        &self.id
    }
}

impl Document for Survey {
    const COLLECTION: Collection = Collection::Surveys;
    fn doc_id(&self) -> &str {
        &self.id
    }
}

impl Document for SurveyResponse {
    const COLLECTION: Collection = Collection::Responses;
    fn doc_id(&self) -> &str {
        &self.id
    }
}

// -- Generic In-Memory Store --------------------------------------------------

#[derive(Debug)]
struct Entry<T> {
    seq: u64,
    value: T,
}

#[derive(Debug)]
struct Inner<T> {
    next_seq: u64,
    entries: HashMap<String, Entry<T>>,
}

impl<T: Clone> Inner<T> {
    fn sorted(&self) -> Vec<(&String, &Entry<T>)> {
        let mut all: Vec<_> = self.entries.iter().collect();
        all.sort_by_key(|(_, entry)| entry.seq);
        all
    }
}

/// Thread-safe, cloneable in-memory document collection.
///
/// Documents are keyed by their string id and listed in insertion order.
/// Overwriting an existing id keeps its original position.
///
/// All operations are synchronous (the RwLock is `parking_lot`, not
/// `tokio::sync`) because the lock is never held across `.await` points.
#[derive(Debug)]
pub struct Store<T: Clone + Send + Sync> {
    data: Arc<RwLock<Inner<T>>>,
}

impl<T: Clone + Send + Sync> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<T: Clone + Send + Sync> Store<T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(Inner {
                next_seq: 0,
                entries: HashMap::new(),
            })),
        }
    }

    /// Insert a record, returning the previous value if the id existed.
    pub fn insert(&self, id: impl Into<String>, value: T) -> Option<T> {
        let mut guard = self.data.write();
        let id = id.into();
        if let Some(entry) = guard.entries.get_mut(&id) {
            return Some(std::mem::replace(&mut entry.value, value));
        }
        let seq = guard.next_seq;
        guard.next_seq += 1;
        guard.entries.insert(id, Entry { seq, value });
        None
    }

    /// Insert a record only if the id is free. Returns `false` if it was taken.
    pub fn insert_new(&self, id: impl Into<String>, value: T) -> bool {
        let mut guard = self.data.write();
        let id = id.into();
        if guard.entries.contains_key(&id) {
            return false;
        }
        let seq = guard.next_seq;
        guard.next_seq += 1;
        guard.entries.insert(id, Entry { seq, value });
        true
    }

    /// Retrieve a record by id.
    pub fn get(&self, id: &str) -> Option<T> {
        self.data.read().entries.get(id).map(|e| e.value.clone())
    }

    /// List all records in insertion order.
    pub fn list(&self) -> Vec<T> {
        self.data
            .read()
            .sorted()
            .into_iter()
            .map(|(_, e)| e.value.clone())
            .collect()
    }

    /// List the records matching `pred`, in insertion order.
    pub fn query(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        self.data
            .read()
            .sorted()
            .into_iter()
            .filter(|(_, e)| pred(&e.value))
            .map(|(_, e)| e.value.clone())
            .collect()
    }

    /// Update a record in place. Returns the updated record, or `None` if not found.
    pub fn update(&self, id: &str, f: impl FnOnce(&mut T)) -> Option<T> {
        let mut guard = self.data.write();
        let entry = guard.entries.get_mut(id)?;
        f(&mut entry.value);
        Some(entry.value.clone())
    }

    /// Update every record matching `pred` under one write lock.
    ///
    /// Returns the updated records in insertion order.
    pub fn update_where(&self, pred: impl Fn(&T) -> bool, f: impl Fn(&mut T)) -> Vec<T> {
        let mut guard = self.data.write();
        let mut touched: Vec<(u64, T)> = guard
            .entries
            .values_mut()
            .filter(|e| pred(&e.value))
            .map(|e| {
                f(&mut e.value);
                (e.seq, e.value.clone())
            })
            .collect();
        touched.sort_by_key(|(seq, _)| *seq);
        touched.into_iter().map(|(_, v)| v).collect()
    }

    /// Atomically read-validate-update a record.
    ///
    /// The closure runs under a single write lock. Returns `None` if the
    /// record doesn't exist, or `Some` with the closure's `Result`.
    pub fn try_update<R, E>(
        &self,
        id: &str,
        f: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        self.data
            .write()
            .entries
            .get_mut(id)
            .map(|e| f(&mut e.value))
    }

    /// Remove a record by id.
    pub fn remove(&self, id: &str) -> Option<T> {
        self.data.write().entries.remove(id).map(|e| e.value)
    }

    /// Remove every record matching `pred`, returning `(id, record)` pairs
    /// in insertion order.
    pub fn remove_where(&self, pred: impl Fn(&T) -> bool) -> Vec<(String, T)> {
        let mut guard = self.data.write();
        let ids: Vec<String> = guard
            .sorted()
            .into_iter()
            .filter(|(_, e)| pred(&e.value))
            .map(|(id, _)| id.clone())
            .collect();
        ids.into_iter()
            .filter_map(|id| guard.entries.remove(&id).map(|e| (id, e.value)))
            .collect()
    }

    /// Check if a record exists.
    pub fn contains(&self, id: &str) -> bool {
        self.data.read().entries.contains_key(id)
    }

    /// Return the number of records.
    pub fn len(&self) -> usize {
        self.data.read().entries.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone + Send + Sync> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}

// -- Configuration ------------------------------------------------------------

/// Default port when `PORT` is unset or unparsable.
pub const DEFAULT_PORT: u16 = 3000;

/// Application configuration.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Shared bearer secret. If `None`, authentication is disabled.
    pub auth_token: Option<String>,
}

impl AppConfig {
    /// Build configuration from `PORT` and `AUTH_TOKEN`.
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);
        let auth_token = std::env::var("AUTH_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());
        Self { port, auth_token }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field(
                "auth_token",
                &self.auth_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            auth_token: None,
        }
    }
}

// -- Application State --------------------------------------------------------

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub users: Store<User>,
    pub transactions: Store<Transaction>,
    pub packages: Store<Package>,
    pub templates: Store<Template>,
    pub surveys: Store<Survey>,
    pub responses: Store<SurveyResponse>,

    /// PostgreSQL connection pool for durable persistence.
    /// When `None`, the API operates in in-memory-only mode.
    pub db_pool: Option<PgPool>,

    pub config: AppConfig,
}

impl AppState {
    /// Create an in-memory application state with default configuration.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default(), None)
    }

    /// Create an application state with the given configuration and
    /// optional database pool.
    pub fn with_config(config: AppConfig, db_pool: Option<PgPool>) -> Self {
        Self {
            users: Store::new(),
            transactions: Store::new(),
            packages: Store::new(),
            templates: Store::new(),
            surveys: Store::new(),
            responses: Store::new(),
            db_pool,
            config,
        }
    }

    /// Hydrate in-memory stores from the database.
    ///
    /// Called once on startup when a database pool is available.
    pub async fn hydrate_from_db(&self) -> Result<(), String> {
        let pool = match &self.db_pool {
            Some(pool) => pool,
            None => return Ok(()),
        };

        let users = hydrate(pool, &self.users).await?;
        let transactions = hydrate(pool, &self.transactions).await?;
        let packages = hydrate(pool, &self.packages).await?;
        let templates = hydrate(pool, &self.templates).await?;
        let surveys = hydrate(pool, &self.surveys).await?;
        let responses = hydrate(pool, &self.responses).await?;

        tracing::info!(
            users,
            transactions,
            packages,
            templates,
            surveys,
            responses,
            "Hydrated in-memory stores from database"
        );

        Ok(())
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

async fn hydrate<T: Document>(pool: &PgPool, store: &Store<T>) -> Result<usize, String> {
    let records = crate::db::documents::load_all::<T>(pool)
        .await
        .map_err(|e| format!("failed to load {}: {e}", T::COLLECTION))?;
    let count = records.len();
    for record in records {
        store.insert(record.doc_id().to_string(), record);
    }
    Ok(count)
}
