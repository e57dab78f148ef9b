//! Database types and global state
//!
//! One LMDB environment per process, opened once. All tables are named
//! sub-databases; composite keys are big-endian so prefix scans work.

use std::path::Path;
use std::sync::{Mutex, OnceLock};

use heed::types::{Bytes, SerdeBincode, Str, U64};
use heed::{Database, Env, EnvOpenOptions, RoTxn, RwTxn};

use crate::error::{err, Error, Result};
use crate::model::{Account, Content};

// Database type aliases
pub type Db = Database<Bytes, U64<byteorder::BigEndian>>;

/// Create a 16-byte key from two u64 values
#[inline]
pub fn key(a: u64, b: u64) -> [u8; 16] {
    let mut k = [0u8; 16];
    k[..8].copy_from_slice(&a.to_be_bytes());
    k[8..].copy_from_slice(&b.to_be_bytes());
    k
}

/// Bidirectional index: fwd[a,b] and rev[b,a] stay in sync
pub struct BiPair {
    pub fwd: Db,
    pub rev: Db,
}

impl BiPair {
    #[inline]
    pub fn get(&self, tx: &RoTxn, a: u64, b: u64) -> Result<u64> {
        Ok(self.fwd.get(tx, &key(a, b)).map_err(err)?.unwrap_or(0))
    }

    #[inline]
    pub fn put(&self, tx: &mut RwTxn, a: u64, b: u64, v: u64) -> Result<()> {
        self.fwd.put(tx, &key(a, b), &v).map_err(err)?;
        self.rev.put(tx, &key(b, a), &v).map_err(err)
    }

    #[inline]
    pub fn put_or(&self, tx: &mut RwTxn, a: u64, b: u64, v: u64) -> Result<()> {
        let merged = self.get(tx, a, b)? | v;
        self.put(tx, a, b, merged)
    }

    #[inline]
    pub fn del(&self, tx: &mut RwTxn, a: u64, b: u64) -> Result<bool> {
        let r = self.fwd.delete(tx, &key(a, b)).map_err(err)?;
        self.rev.delete(tx, &key(b, a)).map_err(err)?;
        Ok(r)
    }

    pub fn list_fwd(&self, tx: &RoTxn, a: u64) -> Result<Vec<(u64, u64)>> {
        list_pfx(tx, &self.fwd, a)
    }

    pub fn list_rev(&self, tx: &RoTxn, b: u64) -> Result<Vec<(u64, u64)>> {
        list_pfx(tx, &self.rev, b)
    }
}

/// List (second key half, value) pairs under a u64 prefix
pub fn list_pfx(tx: &RoTxn, db: &Db, pfx: u64) -> Result<Vec<(u64, u64)>> {
    let mut r = Vec::new();
    for item in db.prefix_iter(tx, &pfx.to_be_bytes()).map_err(err)? {
        let (k, v) = item.map_err(err)?;
        if k.len() == 16 {
            r.push((u64::from_be_bytes(k[8..16].try_into().unwrap()), v));
        }
    }
    Ok(r)
}

/// All database handles
pub struct Dbs {
    /// id -> Account row
    pub accounts: Database<Bytes, SerdeBincode<Account>>,
    /// slug -> account id
    pub slugs: Database<Str, U64<byteorder::BigEndian>>,
    /// id -> Content row
    pub contents: Database<Bytes, SerdeBincode<Content>>,
    /// Materialized grants for Account targets: [id|perm|role] -> 1
    pub acct_map: Db,
    /// Materialized grants for Content targets: [id|perm|role] -> 1
    pub content_map: Db,
    /// (member, community) -> MEMBER|MANAGER flags, both directions
    pub members: BiPair,
    /// Symmetric approved relation; key(a,b) and key(b,a) always paired
    pub network: Db,
    /// (follower, followed) -> 1, both directions
    pub follows: BiPair,
    /// Counters and bootstrap markers
    pub meta: Database<Str, Str>,
}

// Global state
pub static ENV: OnceLock<Env> = OnceLock::new();
pub static DBS: OnceLock<Dbs> = OnceLock::new();
pub static TEST_LOCK: Mutex<()> = Mutex::new(());
pub static INIT_PATH: OnceLock<String> = OnceLock::new();

/// Get the database handles, or error if not initialized
#[inline]
pub fn dbs() -> Result<&'static Dbs> {
    DBS.get().ok_or_else(|| Error::Store("not initialized".into()))
}

/// Get the environment, or error if not initialized
#[inline]
pub fn env() -> Result<&'static Env> {
    ENV.get().ok_or_else(|| Error::Store("not initialized".into()))
}

/// Execute a read-only operation
#[inline]
pub fn read<T, F: FnOnce(&Dbs, &RoTxn) -> Result<T>>(f: F) -> Result<T> {
    f(dbs()?, &env()?.read_txn().map_err(err)?)
}

/// Execute a write operation in one committed transaction
#[inline]
pub fn write<T, F: FnOnce(&Dbs, &mut RwTxn) -> Result<T>>(f: F) -> Result<T> {
    let mut txn = env()?.write_txn().map_err(err)?;
    let r = f(dbs()?, &mut txn)?;
    txn.commit().map_err(err)?;
    Ok(r)
}

/// Allocate the next object id
pub(crate) fn alloc_id(txn: &mut RwTxn, d: &Dbs) -> Result<u64> {
    let id = d
        .meta
        .get(txn, "next_id")
        .map_err(err)?
        .and_then(|s| s.parse().ok())
        .unwrap_or(crate::constants::FIRST_FREE_ID);
    d.meta
        .put(txn, "next_id", &(id + 1).to_string())
        .map_err(err)?;
    Ok(id)
}

/// Initialize the database
pub fn init(path: &str) -> Result<()> {
    if let Some(p) = INIT_PATH.get() {
        return if p == path {
            Ok(())
        } else {
            Err(Error::Store(format!("already initialized at {}", p)))
        };
    }
    std::fs::create_dir_all(path).map_err(err)?;
    // SAFETY: LMDB requires no other processes access this path concurrently during open.
    let e = unsafe {
        EnvOpenOptions::new()
            .map_size(1 << 30)
            .max_dbs(11)
            .open(Path::new(path))
            .map_err(err)?
    };
    let mut tx = e.write_txn().map_err(err)?;
    let d = Dbs {
        accounts: e.create_database(&mut tx, Some("accounts")).map_err(err)?,
        slugs: e.create_database(&mut tx, Some("slugs")).map_err(err)?,
        contents: e.create_database(&mut tx, Some("contents")).map_err(err)?,
        acct_map: e.create_database(&mut tx, Some("acct_map")).map_err(err)?,
        content_map: e
            .create_database(&mut tx, Some("content_map"))
            .map_err(err)?,
        members: BiPair {
            fwd: e.create_database(&mut tx, Some("members")).map_err(err)?,
            rev: e
                .create_database(&mut tx, Some("members_rev"))
                .map_err(err)?,
        },
        network: e.create_database(&mut tx, Some("network")).map_err(err)?,
        follows: BiPair {
            fwd: e.create_database(&mut tx, Some("follows")).map_err(err)?,
            rev: e
                .create_database(&mut tx, Some("follows_rev"))
                .map_err(err)?,
        },
        meta: e.create_database(&mut tx, Some("meta")).map_err(err)?,
    };
    tx.commit().map_err(err)?;
    let _ = (ENV.set(e), DBS.set(d), INIT_PATH.set(path.to_string()));
    Ok(())
}

/// Clear all databases (for testing)
pub fn clear_all() -> Result<()> {
    write(|d, tx| {
        d.accounts.clear(tx).map_err(err)?;
        d.slugs.clear(tx).map_err(err)?;
        d.contents.clear(tx).map_err(err)?;
        d.acct_map.clear(tx).map_err(err)?;
        d.content_map.clear(tx).map_err(err)?;
        d.members.fwd.clear(tx).map_err(err)?;
        d.members.rev.clear(tx).map_err(err)?;
        d.network.clear(tx).map_err(err)?;
        d.follows.fwd.clear(tx).map_err(err)?;
        d.follows.rev.clear(tx).map_err(err)?;
        d.meta.clear(tx).map_err(err)
    })
}

/// Get the test lock (for single-threaded tests)
pub fn test_lock() -> std::sync::MutexGuard<'static, ()> {
    TEST_LOCK.lock().unwrap_or_else(|p| p.into_inner())
}
