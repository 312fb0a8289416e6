// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// medivault-crypto — the crypto unit of the record coordinator.
//
// This crate owns the boundary inside which custody keys exist in plaintext:
// per-record AEAD encryption, wrapping of custody keys to the escrow
// recipient, and content integrity hashing.  Nothing here performs I/O.

pub mod cipher;
pub mod integrity;
pub mod keywrap;

pub use cipher::{RecordCipher, RecordKey};
pub use integrity::{content_id_for, hash_bytes};
pub use keywrap::KeyCustodian;
