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

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::error::SrtpError;
use crate::rtp::{rtcp_ssrc, RtpHeader};
use crate::srtcp::SrtcpContext;
use crate::srtp::SrtpContext;
use crate::SrtpParams;

/// All crypto contexts of one direction.
///
/// Holds template contexts derived once from the master key; each SSRC seen
/// gets its own context forked from the template. On the receive side a
/// context is only kept once a packet for it authenticated.
#[derive(Debug)]
pub struct SrtpStreams {
    rtp_template: SrtpContext,
    rtcp_template: SrtcpContext,
    rtp: HashMap<u32, SrtpContext>,
    rtcp: HashMap<u32, SrtcpContext>,
}

impl SrtpStreams {
    pub fn new(params: &SrtpParams) -> Result<Self, SrtpError> {
        Ok(Self {
            rtp_template: SrtpContext::new(params)?,
            rtcp_template: SrtcpContext::new(params)?,
            rtp: HashMap::new(),
            rtcp: HashMap::new(),
        })
    }

    pub fn protect_rtp(&mut self, packet: &[u8]) -> Result<Vec<u8>, SrtpError> {
        let ssrc = RtpHeader::parse(packet)?.ssrc;
        let ctx = match self.rtp.entry(ssrc) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(v) => {
                log::debug!("new SRTP sender context for SSRC {ssrc:#010x}");
                v.insert(self.rtp_template.fork()?)
            }
        };
        ctx.protect(packet)
    }

    pub fn unprotect_rtp(&mut self, packet: &[u8]) -> Result<Vec<u8>, SrtpError> {
        let ssrc = RtpHeader::parse(packet)?.ssrc;
        if let Some(ctx) = self.rtp.get_mut(&ssrc) {
            return ctx.unprotect(packet);
        }
        let mut ctx = self.rtp_template.fork()?;
        let plain = ctx.unprotect(packet)?;
        log::debug!("new SRTP receiver context for SSRC {ssrc:#010x}");
        self.rtp.insert(ssrc, ctx);
        Ok(plain)
    }

    pub fn protect_rtcp(&mut self, packet: &[u8]) -> Result<Vec<u8>, SrtpError> {
        let ssrc = rtcp_ssrc(packet)?;
        let ctx = match self.rtcp.entry(ssrc) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(v) => v.insert(self.rtcp_template.fork()?),
        };
        ctx.protect(packet)
    }

    pub fn unprotect_rtcp(&mut self, packet: &[u8]) -> Result<Vec<u8>, SrtpError> {
        let ssrc = rtcp_ssrc(packet)?;
        if let Some(ctx) = self.rtcp.get_mut(&ssrc) {
            return ctx.unprotect(packet);
        }
        let mut ctx = self.rtcp_template.fork()?;
        let plain = ctx.unprotect(packet)?;
        self.rtcp.insert(ssrc, ctx);
        Ok(plain)
    }

    /// Number of SSRCs with an RTP context.
    pub fn rtp_stream_count(&self) -> usize {
        self.rtp.len()
    }
}
