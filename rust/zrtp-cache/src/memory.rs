/*
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

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::error::CacheError;
use crate::record::{Zid, ZidRecord};
use crate::{random_zid, ZidCache};

/// A non-persistent [`ZidCache`] for tests and ephemeral endpoints.
#[derive(Debug)]
pub struct InMemoryCache {
    own_zid: Zid,
    records: Mutex<HashMap<Zid, ZidRecord>>,
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCache {
    /// Creates an empty cache with a random local ZID.
    pub fn new() -> Self {
        Self::with_zid(random_zid())
    }

    /// Creates an empty cache with the given local ZID.
    pub fn with_zid(own_zid: Zid) -> Self {
        Self {
            own_zid,
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Number of peer records.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ZidCache for InMemoryCache {
    fn own_zid(&self) -> Zid {
        self.own_zid
    }

    fn get_record(&self, zid: &Zid) -> Result<Option<ZidRecord>, CacheError> {
        Ok(self.records.lock().get(zid).cloned())
    }

    fn update_record(
        &self,
        zid: &Zid,
        update: &mut dyn FnMut(&mut ZidRecord),
    ) -> Result<ZidRecord, CacheError> {
        let mut records = self.records.lock();
        let record = records.entry(*zid).or_insert_with(|| ZidRecord::new(*zid));
        update(record);
        Ok(record.clone())
    }
}
