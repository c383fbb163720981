//! Form validation server
//!
//! Serves a static site and a `GET /validate` endpoint that checks one form
//! field at a time against a table of rules. Two binaries share this
//! library: the full server and a static-only variant.

pub mod config;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;
pub mod validation;
