//! Consolidated test modules.
//!
//! End-to-end tests that drive the HTTP router against in-memory stores.

mod cleanup_e2e;
