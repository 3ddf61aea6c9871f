//! Application layer containing the verification flow.
//!
//! This module defines the `VerificationOrchestrator`, which ties the banking gateway,
//! the token store and the credential signer together. It is shared between request
//! handlers behind an `Arc` and holds no mutable state itself.

pub mod orchestrator;
