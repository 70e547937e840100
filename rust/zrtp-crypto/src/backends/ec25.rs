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

use crate::traits::DiffieHellman;
use anyhow::{anyhow, Result};
use p256::ecdh::EphemeralSecret;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::PublicKey;
use rand_core::OsRng;

/// Uncompressed SEC1 point tag, not carried on the ZRTP wire.
const SEC1_UNCOMPRESSED: u8 = 0x04;

/// NIST P-256 ("EC25") implementation of the [`DiffieHellman`] trait.
///
/// The ZRTP public value is the affine x and y coordinates, 32 bytes each;
/// the shared secret is the x coordinate of the product point.
#[derive(Default)]
pub struct EcP256 {
    secret: Option<EphemeralSecret>,
}

impl DiffieHellman for EcP256 {
    fn generate_keypair(&mut self) -> Result<Vec<u8>> {
        let secret = EphemeralSecret::random(&mut OsRng);
        let point = secret.public_key().to_encoded_point(false);
        self.secret = Some(secret);
        Ok(point.as_bytes()[1..].to_vec())
    }

    fn compute_shared_secret(&mut self, peer_public_key: &[u8]) -> Result<Vec<u8>> {
        if peer_public_key.len() != 64 {
            return Err(anyhow!("Invalid public key length"));
        }
        let mut sec1 = Vec::with_capacity(65);
        sec1.push(SEC1_UNCOMPRESSED);
        sec1.extend_from_slice(peer_public_key);
        let peer = PublicKey::from_sec1_bytes(&sec1).map_err(|_| {
            log::warn!("EC25 peer public value rejected");
            anyhow!("Peer public value is not on P-256")
        })?;

        let secret = self.secret.take().ok_or_else(|| anyhow!("Keypair not generated"))?;
        let shared = secret.diffie_hellman(&peer);
        Ok(shared.raw_secret_bytes().to_vec())
    }

    fn name(&self) -> &'static str {
        "EC25"
    }

    fn public_key_len(&self) -> usize {
        64
    }
}
