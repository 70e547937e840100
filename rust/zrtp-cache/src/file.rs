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

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use parking_lot::Mutex;

use crate::error::CacheError;
use crate::record::{flags, Zid, ZidRecord, RS_LEN};
use crate::{random_zid, ZidCache};

/// Size of one record in the binary cache file.
pub const RECORD_LEN: usize = 128;
const RECORD_VERSION: u8 = 2;

/// Record layout, all integers big-endian:
///
/// | offset | len | field |
/// |---|---|---|
/// | 0 | 1 | version (2) |
/// | 1 | 1 | flags |
/// | 2 | 2 | filler |
/// | 4 | 12 | ZID |
/// | 16 | 8 | rs1 expiry |
/// | 24 | 32 | rs1 |
/// | 56 | 8 | rs2 expiry |
/// | 64 | 32 | rs2 |
/// | 96 | 32 | MiTM key |
fn encode(record: &ZidRecord) -> [u8; RECORD_LEN] {
    let mut out = [0u8; RECORD_LEN];
    out[0] = RECORD_VERSION;
    out[1] = record.flags;
    out[4..16].copy_from_slice(&record.zid);
    out[16..24].copy_from_slice(&record.rs1_expires.to_be_bytes());
    out[24..56].copy_from_slice(&record.rs1);
    out[56..64].copy_from_slice(&record.rs2_expires.to_be_bytes());
    out[64..96].copy_from_slice(&record.rs2);
    out[96..128].copy_from_slice(&record.mitm_key);
    out
}

fn decode(buf: &[u8; RECORD_LEN]) -> Result<ZidRecord, CacheError> {
    if buf[0] != RECORD_VERSION {
        return Err(CacheError::Corrupt("unknown record version"));
    }
    let field = |range: std::ops::Range<usize>| -> [u8; RS_LEN] {
        let mut out = [0u8; RS_LEN];
        out.copy_from_slice(&buf[range]);
        out
    };
    let expiry = |at: usize| {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&buf[at..at + 8]);
        i64::from_be_bytes(raw)
    };
    let mut zid = [0u8; 12];
    zid.copy_from_slice(&buf[4..16]);

    Ok(ZidRecord {
        zid,
        flags: buf[1],
        rs1_expires: expiry(16),
        rs1: field(24..56),
        rs2_expires: expiry(56),
        rs2: field(64..96),
        mitm_key: field(96..128),
        last_use: 0,
    })
}

/// A persistent [`ZidCache`] stored as a flat file of 128-byte records.
///
/// The first record holds the local ZID.
pub struct BinaryFileCache {
    file: Mutex<File>,
    own_zid: Zid,
}

impl BinaryFileCache {
    /// Opens or creates a binary ZID cache at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CacheError> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let own_zid = if file.metadata()?.len() < RECORD_LEN as u64 {
            let mut own = ZidRecord::new(random_zid());
            own.flags = flags::OWN_ZID;
            file.set_len(0)?;
            file.write_all(&encode(&own))?;
            file.flush()?;
            log::info!("created new ZID cache file");
            own.zid
        } else {
            let mut buf = [0u8; RECORD_LEN];
            file.seek(SeekFrom::Start(0))?;
            file.read_exact(&mut buf)?;
            let own = decode(&buf)?;
            if own.flags & flags::OWN_ZID == 0 {
                return Err(CacheError::Corrupt("first record is not the own ZID"));
            }
            own.zid
        };

        Ok(Self {
            file: Mutex::new(file),
            own_zid,
        })
    }

    /// Scans peer records, returning the matching record and its offset.
    fn find(file: &mut File, zid: &Zid) -> Result<Option<(ZidRecord, u64)>, CacheError> {
        let len = file.metadata()?.len();
        let mut offset = RECORD_LEN as u64;
        let mut buf = [0u8; RECORD_LEN];

        while offset + RECORD_LEN as u64 <= len {
            file.seek(SeekFrom::Start(offset))?;
            file.read_exact(&mut buf)?;
            if buf[1] & flags::VALID != 0 && buf[1] & flags::OWN_ZID == 0 && &buf[4..16] == zid {
                return Ok(Some((decode(&buf)?, offset)));
            }
            offset += RECORD_LEN as u64;
        }
        Ok(None)
    }
}

impl ZidCache for BinaryFileCache {
    fn own_zid(&self) -> Zid {
        self.own_zid
    }

    fn get_record(&self, zid: &Zid) -> Result<Option<ZidRecord>, CacheError> {
        let mut file = self.file.lock();
        Ok(Self::find(&mut file, zid)?.map(|(record, _)| record))
    }

    fn update_record(
        &self,
        zid: &Zid,
        update: &mut dyn FnMut(&mut ZidRecord),
    ) -> Result<ZidRecord, CacheError> {
        let mut file = self.file.lock();
        let (mut record, offset) = match Self::find(&mut file, zid)? {
            Some(found) => found,
            None => {
                // Append after the last complete record.
                let len = file.metadata()?.len();
                let end = len - len % RECORD_LEN as u64;
                (ZidRecord::new(*zid), end)
            }
        };

        update(&mut record);
        record.flags |= flags::VALID;
        record.flags &= !flags::OWN_ZID;

        file.seek(SeekFrom::Start(offset))?;
        file.write_all(&encode(&record))?;
        file.flush()?;
        Ok(record)
    }
}
