//! # API Module
//!
//! Contains the HTTP API of the submitter service.
//!
//! ## Structure
//!
//! * `controllers` - Request handling
//! * `routes` - API endpoint definitions and routing

pub mod controllers;

pub mod routes;
