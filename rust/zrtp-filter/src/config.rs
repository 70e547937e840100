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

use std::path::PathBuf;

use zrtp_core::ZrtpOptions;

/// Settings of one filter instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterConfig {
    /// With ZRTP disabled the filter passes RTP and RTCP through and drops
    /// ZRTP packets.
    pub enable_zrtp: bool,
    /// SSRC put into ZRTP frames until the real one is seen on an outbound
    /// RTP packet. Zero means unknown.
    pub local_ssrc: u32,
    /// Act as a trusted MiTM (PBX); overrides `options.mitm_mode` when set.
    pub mitm_mode: bool,
    /// ZID cache to open. `None` keeps retained secrets in memory only.
    pub cache_name: Option<PathBuf>,
    /// Start the engine on the first RTP or ZRTP packet in either direction.
    pub auto_start: bool,
    pub options: ZrtpOptions,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            enable_zrtp: true,
            local_ssrc: 0,
            mitm_mode: false,
            cache_name: None,
            auto_start: true,
            options: ZrtpOptions {
                client_id: "zrtp-rs filter".to_string(),
                ..ZrtpOptions::default()
            },
        }
    }
}

impl FilterConfig {
    /// A PBX filter with the given cache.
    pub fn pbx(cache_name: impl Into<PathBuf>) -> Self {
        Self {
            mitm_mode: true,
            cache_name: Some(cache_name.into()),
            options: ZrtpOptions::pbx(),
            ..Self::default()
        }
    }

    /// Engine options with the filter level switches applied.
    pub(crate) fn engine_options(&self) -> ZrtpOptions {
        let mut options = self.options.clone();
        options.mitm_mode |= self.mitm_mode;
        options
    }
}
