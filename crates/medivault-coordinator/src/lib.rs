// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// medivault-coordinator — orchestrates the record lifecycle across the
// crypto unit, the blob store, and the ledger, and drives the delegated
// access workflow.  This crate is the protocol core: it is the only place
// where the three trust domains meet.

pub mod contract;
pub mod coordinator;
pub mod workflow;

pub use coordinator::{CoordinatorConfig, RecordCoordinator};
pub use workflow::AccessWorkflow;
