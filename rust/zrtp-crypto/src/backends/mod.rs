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

//! Concrete implementations of the primitive traits.

mod cfb;
mod ec25;
mod sha;
mod x25519;

pub use self::cfb::{CfbCipher, CfbFamily};
pub use self::ec25::EcP256;
pub use self::sha::{Sha256, Sha384};
pub use self::x25519::X25519;
