//! Core business logic - framework-agnostic engines called by the
//! presentation layer. Each operation validates its inputs, runs as a single
//! database transaction, and returns a typed result; nothing here assumes any
//! particular transport.

/// Teacher role request approval workflow
pub mod admin;
/// Class creation, join requests, and enrollment
pub mod classes;
/// Registration, authentication, and the password/username policies
pub mod identity;
/// Point awards, weekly caps, and account history
pub mod ledger;
/// Reward catalog purchases and coupon redemption
pub mod rewards;
