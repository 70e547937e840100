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

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::CacheError;
use crate::record::{Zid, ZidRecord, RS_LEN};
use crate::{random_zid, ZidCache};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS zrtp_own (
        zid BLOB NOT NULL
    );
    CREATE TABLE IF NOT EXISTS zrtp_peers (
        zid BLOB PRIMARY KEY NOT NULL,
        flags INTEGER NOT NULL,
        rs1 BLOB NOT NULL,
        rs1_expires INTEGER NOT NULL,
        rs2 BLOB NOT NULL,
        rs2_expires INTEGER NOT NULL,
        mitm_key BLOB NOT NULL,
        last_use INTEGER NOT NULL
    );";

/// A persistent [`ZidCache`] stored in an SQLite database.
pub struct SqliteCache {
    conn: Mutex<Connection>,
    own_zid: Zid,
}

impl SqliteCache {
    /// Opens or creates the database at `path`.
    ///
    /// A new database gets a random local ZID, an existing one keeps its own.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CacheError> {
        Self::from_connection(Connection::open(path)?)
    }

    /// An in-memory database, mostly useful for tests.
    pub fn open_in_memory() -> Result<Self, CacheError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, CacheError> {
        conn.execute_batch(SCHEMA)?;

        let stored: Option<Vec<u8>> = conn
            .query_row("SELECT zid FROM zrtp_own LIMIT 1", [], |row| row.get(0))
            .optional()?;
        let own_zid = match stored {
            Some(blob) => blob
                .as_slice()
                .try_into()
                .map_err(|_| CacheError::Corrupt("own ZID has wrong length"))?,
            None => {
                let zid = random_zid();
                conn.execute("INSERT INTO zrtp_own (zid) VALUES (?1)", params![zid.as_slice()])?;
                log::info!("created new ZID cache database");
                zid
            }
        };

        Ok(Self {
            conn: Mutex::new(conn),
            own_zid,
        })
    }

    fn read(conn: &Connection, zid: &Zid) -> Result<Option<ZidRecord>, CacheError> {
        let row = conn
            .query_row(
                "SELECT flags, rs1, rs1_expires, rs2, rs2_expires, mitm_key, last_use
                 FROM zrtp_peers WHERE zid = ?1",
                params![zid.as_slice()],
                |row| {
                    Ok((
                        row.get::<_, u8>(0)?,
                        row.get::<_, Vec<u8>>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, Vec<u8>>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, Vec<u8>>(5)?,
                        row.get::<_, i64>(6)?,
                    ))
                },
            )
            .optional()?;

        let Some((flags, rs1, rs1_expires, rs2, rs2_expires, mitm_key, last_use)) = row else {
            return Ok(None);
        };
        let secret = |blob: Vec<u8>| -> Result<[u8; RS_LEN], CacheError> {
            blob.as_slice()
                .try_into()
                .map_err(|_| CacheError::Corrupt("secret has wrong length"))
        };
        Ok(Some(ZidRecord {
            zid: *zid,
            flags,
            rs1: secret(rs1)?,
            rs1_expires,
            rs2: secret(rs2)?,
            rs2_expires,
            mitm_key: secret(mitm_key)?,
            last_use,
        }))
    }
}

impl ZidCache for SqliteCache {
    fn own_zid(&self) -> Zid {
        self.own_zid
    }

    fn get_record(&self, zid: &Zid) -> Result<Option<ZidRecord>, CacheError> {
        Self::read(&self.conn.lock(), zid)
    }

    fn update_record(
        &self,
        zid: &Zid,
        update: &mut dyn FnMut(&mut ZidRecord),
    ) -> Result<ZidRecord, CacheError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let mut record = Self::read(&tx, zid)?.unwrap_or_else(|| ZidRecord::new(*zid));
        update(&mut record);
        tx.execute(
            "INSERT OR REPLACE INTO zrtp_peers
             (zid, flags, rs1, rs1_expires, rs2, rs2_expires, mitm_key, last_use)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                zid.as_slice(),
                record.flags,
                record.rs1.as_slice(),
                record.rs1_expires,
                record.rs2.as_slice(),
                record.rs2_expires,
                record.mitm_key.as_slice(),
                record.last_use,
            ],
        )?;
        tx.commit()?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::CONFIRM_EXPIRY_FOREVER;

    #[test]
    fn test_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zid.db");
        let peer = [0x42; 12];

        let own = {
            let cache = SqliteCache::open(&path).unwrap();
            cache
                .update_record(&peer, &mut |r| {
                    r.set_new_rs1(&[1; 32], CONFIRM_EXPIRY_FOREVER, 10);
                    r.set_sas_verified();
                })
                .unwrap();
            cache.own_zid()
        };

        let cache = SqliteCache::open(&path).unwrap();
        assert_eq!(cache.own_zid(), own);
        let rec = cache.get_record(&peer).unwrap().unwrap();
        assert_eq!(rec.rs1(10), Some(&[1; 32]));
        assert!(rec.is_sas_verified());
    }

    #[test]
    fn test_update_is_read_modify_write() {
        let cache = SqliteCache::open_in_memory().unwrap();
        let peer = [7; 12];
        cache
            .update_record(&peer, &mut |r| r.set_new_rs1(&[1; 32], 100, 0))
            .unwrap();
        let rec = cache
            .update_record(&peer, &mut |r| r.set_new_rs1(&[2; 32], 100, 0))
            .unwrap();
        assert_eq!(rec.rs1(0), Some(&[2; 32]));
        assert_eq!(rec.rs2(0), Some(&[1; 32]));
        assert!(cache.get_record(&[8; 12]).unwrap().is_none());
    }
}
