/*
 * Copyright 2006 - 2018, Werner Dittmann
 * Copyright 2026 - Francisco F. Pinochet
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *         http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! Retained-secret (ZID) cache.
//!
//! The cache maps a peer ZID to the secrets retained from the last secure
//! session with that peer, plus trust flags. A cache is opened once and
//! shared by every session of an endpoint; backends serialize concurrent
//! updates internally.

use std::path::Path;
use std::sync::Arc;

use rand_core::{OsRng, RngCore};

mod error;
mod file;
mod memory;
mod record;
mod sqlite;

pub use error::CacheError;
pub use file::{BinaryFileCache, RECORD_LEN};
pub use memory::InMemoryCache;
pub use record::{
    flags, unix_now, Zid, ZidRecord, CONFIRM_EXPIRY_FOREVER, NEVER_EXPIRES, RS_LEN,
};
pub use sqlite::SqliteCache;

/// Storage for retained secrets, keyed by peer ZID.
pub trait ZidCache: Send + Sync {
    /// The local endpoint's ZID, stable for the lifetime of the store.
    fn own_zid(&self) -> Zid;

    /// Looks up the record for a peer.
    fn get_record(&self, zid: &Zid) -> Result<Option<ZidRecord>, CacheError>;

    /// Read-modify-write of a peer record, creating it if missing.
    ///
    /// The closure runs under the cache lock; the updated record is returned.
    fn update_record(
        &self,
        zid: &Zid,
        update: &mut dyn FnMut(&mut ZidRecord),
    ) -> Result<ZidRecord, CacheError>;
}

pub(crate) fn random_zid() -> Zid {
    let mut zid = [0u8; 12];
    OsRng.fill_bytes(&mut zid);
    zid
}

/// Opens a persistent cache by name.
///
/// Names ending in `.db` or `.sqlite` select the SQLite backend, anything
/// else the binary record file.
pub fn open_cache<P: AsRef<Path>>(name: P) -> Result<Arc<dyn ZidCache>, CacheError> {
    let path = name.as_ref();
    let sqlite = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("db") | Some("sqlite")
    );
    log::debug!("opening ZID cache {} ({})", path.display(), if sqlite { "sqlite" } else { "file" });
    if sqlite {
        Ok(Arc::new(SqliteCache::open(path)?))
    } else {
        Ok(Arc::new(BinaryFileCache::open(path)?))
    }
}
