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

use crate::traits::Hash;
use ring::digest::{self, SHA256, SHA384};
use ring::hmac;

fn digest_parts(algorithm: &'static digest::Algorithm, parts: &[&[u8]]) -> Vec<u8> {
    let mut ctx = digest::Context::new(algorithm);
    for part in parts {
        ctx.update(part);
    }
    ctx.finish().as_ref().to_vec()
}

fn sign(algorithm: hmac::Algorithm, key: &[u8], data: &[u8]) -> Vec<u8> {
    let hmac_key = hmac::Key::new(algorithm, key);
    hmac::sign(&hmac_key, data).as_ref().to_vec()
}

/// SHA-256 implementation of the [`Hash`] trait using the `ring` crate.
pub struct Sha256;

impl Hash for Sha256 {
    fn digest(&self, data: &[u8]) -> Vec<u8> {
        digest::digest(&SHA256, data).as_ref().to_vec()
    }

    fn digest_parts(&self, parts: &[&[u8]]) -> Vec<u8> {
        digest_parts(&SHA256, parts)
    }

    fn hmac(&self, key: &[u8], data: &[u8]) -> Vec<u8> {
        sign(hmac::HMAC_SHA256, key, data)
    }

    fn name(&self) -> &'static str {
        "SHA256"
    }

    fn output_len(&self) -> usize {
        32
    }
}

/// SHA-384 implementation of the [`Hash`] trait using the `ring` crate.
pub struct Sha384;

impl Hash for Sha384 {
    fn digest(&self, data: &[u8]) -> Vec<u8> {
        digest::digest(&SHA384, data).as_ref().to_vec()
    }

    fn digest_parts(&self, parts: &[&[u8]]) -> Vec<u8> {
        digest_parts(&SHA384, parts)
    }

    fn hmac(&self, key: &[u8], data: &[u8]) -> Vec<u8> {
        sign(hmac::HMAC_SHA384, key, data)
    }

    fn name(&self) -> &'static str {
        "SHA384"
    }

    fn output_len(&self) -> usize {
        48
    }
}
