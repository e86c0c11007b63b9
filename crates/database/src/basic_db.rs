use libmdbx::{Database, DatabaseOptions, TableFlags, WriteFlags, WriteMap};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

const SEQUENCES_TABLE: &str = "sequences";

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("mdbx error: {0}")]
    Mdbx(#[from] libmdbx::Error),

    #[error("database mutex poisoned")]
    Poisoned,

    #[error("corrupt sequence value for {0}")]
    CorruptSequence(String),
}

/// Zero-padded so lexicographic key order matches numeric order.
pub fn numeric_key(id: u64) -> String {
    format!("{id:020}")
}

#[derive(Clone)]
pub struct InnerDatabase {
    db: Arc<Mutex<Database<WriteMap>>>,
}

/// Key/value access over named tables.
///
/// Every call runs in its own transaction while holding the handle's lock,
/// so calls on clones of one handle never interleave.
pub trait SafeDatabase: Clone + Send + Sync + 'static {
    fn new<P: AsRef<Path>>(path: P) -> Result<Self, DbError>
    where
        Self: Sized;

    fn write(&self, key: &str, value: &str, table: &str) -> Result<(), DbError>;

    /// Writes only if `key` is absent. Returns `false` when it already existed.
    fn insert_new(&self, key: &str, value: &str, table: &str) -> Result<bool, DbError>;

    fn read(&self, key: &str, table: &str) -> Result<Option<Vec<u8>>, DbError>;

    /// All entries in key order.
    fn read_all(&self, table: &str) -> Result<BTreeMap<Vec<u8>, Vec<u8>>, DbError>;

    /// Entries whose key starts with `prefix`, in key order.
    fn read_prefix(&self, prefix: &str, table: &str) -> Result<BTreeMap<Vec<u8>, Vec<u8>>, DbError>;

    fn count_prefix(&self, prefix: &str, table: &str) -> Result<usize, DbError>;

    fn delete(&self, key: &str, table: &str) -> Result<bool, DbError>;

    /// Deletes every key in `keys` if the first one is present, otherwise
    /// writes `value` under all of them, in one transaction. Returns `true`
    /// when the keys were inserted.
    fn toggle(&self, keys: &[&str], value: &str, table: &str) -> Result<bool, DbError>;

    /// Next value of a named counter, starting at 1.
    fn next_id(&self, sequence: &str) -> Result<u64, DbError>;
}

impl InnerDatabase {
    fn lock(&self) -> Result<MutexGuard<'_, Database<WriteMap>>, DbError> {
        self.db.lock().map_err(|_| DbError::Poisoned)
    }

    /// Positions the cursor at the first key >= `prefix` and stops at the
    /// first key outside it.
    fn scan_prefix<F>(&self, prefix: &str, table: &str, mut visit: F) -> Result<(), DbError>
    where
        F: FnMut(Vec<u8>, Vec<u8>),
    {
        let db = self.lock()?;
        let transaction = db.begin_ro_txn()?;

        let Ok(table) = transaction.open_table(Some(table)) else {
            return Ok(());
        };
        let mut cursor = transaction.cursor(&table)?;

        let iter = if prefix.is_empty() {
            cursor.iter_start::<Vec<u8>, Vec<u8>>()
        } else {
            cursor.iter_from::<Vec<u8>, Vec<u8>>(prefix.as_bytes())
        };

        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            visit(key, value);
        }

        Ok(())
    }
}

impl SafeDatabase for InnerDatabase {
    fn new<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        let mut options = DatabaseOptions::default();
        options.max_tables = Some(100);
        let db = Database::<WriteMap>::open_with_options(path, options)?;

        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }

    fn write(&self, key: &str, value: &str, table: &str) -> Result<(), DbError> {
        let db = self.lock()?;
        let transaction = db.begin_rw_txn()?;
        let table = transaction.create_table(Some(table), TableFlags::default())?;

        transaction.put(&table, key, value, WriteFlags::default())?;
        transaction.commit()?;
        Ok(())
    }

    fn insert_new(&self, key: &str, value: &str, table: &str) -> Result<bool, DbError> {
        let db = self.lock()?;
        let transaction = db.begin_rw_txn()?;
        let table = transaction.create_table(Some(table), TableFlags::default())?;

        match transaction.put(&table, key, value, WriteFlags::NO_OVERWRITE) {
            Ok(()) => {}
            Err(libmdbx::Error::KeyExist) => return Ok(false),
            Err(e) => return Err(e.into()),
        }
        transaction.commit()?;
        Ok(true)
    }

    fn read(&self, key: &str, table: &str) -> Result<Option<Vec<u8>>, DbError> {
        let db = self.lock()?;
        let transaction = db.begin_ro_txn()?;

        if let Ok(table) = transaction.open_table(Some(table)) {
            let result = transaction.get::<Vec<u8>>(&table, key.as_bytes())?;
            return Ok(result);
        }

        Ok(None)
    }

    fn read_all(&self, table: &str) -> Result<BTreeMap<Vec<u8>, Vec<u8>>, DbError> {
        self.read_prefix("", table)
    }

    fn read_prefix(&self, prefix: &str, table: &str) -> Result<BTreeMap<Vec<u8>, Vec<u8>>, DbError> {
        let mut map = BTreeMap::new();
        self.scan_prefix(prefix, table, |key, value| {
            map.insert(key, value);
        })?;
        Ok(map)
    }

    fn count_prefix(&self, prefix: &str, table: &str) -> Result<usize, DbError> {
        let mut count = 0;
        self.scan_prefix(prefix, table, |_, _| count += 1)?;
        Ok(count)
    }

    fn delete(&self, key: &str, table: &str) -> Result<bool, DbError> {
        let db = self.lock()?;
        let transaction = db.begin_rw_txn()?;
        let table = transaction.create_table(Some(table), TableFlags::default())?;

        let removed = transaction.del(&table, key, None)?;
        transaction.commit()?;
        Ok(removed)
    }

    fn toggle(&self, keys: &[&str], value: &str, table: &str) -> Result<bool, DbError> {
        let Some(first) = keys.first() else {
            return Ok(false);
        };

        let db = self.lock()?;
        let transaction = db.begin_rw_txn()?;
        let table = transaction.create_table(Some(table), TableFlags::default())?;

        let exists = transaction.get::<Vec<u8>>(&table, first.as_bytes())?.is_some();
        for key in keys {
            if exists {
                transaction.del(&table, key, None)?;
            } else {
                transaction.put(&table, key, value, WriteFlags::default())?;
            }
        }

        transaction.commit()?;
        Ok(!exists)
    }

    fn next_id(&self, sequence: &str) -> Result<u64, DbError> {
        let db = self.lock()?;
        let transaction = db.begin_rw_txn()?;
        let table = transaction.create_table(Some(SEQUENCES_TABLE), TableFlags::default())?;

        let current = match transaction.get::<Vec<u8>>(&table, sequence.as_bytes())? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| DbError::CorruptSequence(sequence.to_string()))?;
                u64::from_be_bytes(raw)
            }
            None => 0,
        };

        let next = current + 1;
        transaction.put(&table, sequence, next.to_be_bytes(), WriteFlags::default())?;
        transaction.commit()?;
        Ok(next)
    }
}
