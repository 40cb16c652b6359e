//! # API Controllers Module
//!
//! Handles HTTP request processing and hands the operations to the submitter.
//!
//! ## Controllers
//!
//! * `boop` - Boop simulation, submission and lookups
//! * `account` - Account creation

pub mod account;
pub mod boop;
