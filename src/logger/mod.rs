//! Logger module
//!
//! Startup banner, warnings and errors, and the optional per-request
//! access log. Falls back to stdout/stderr until [`init`] is called.

mod format;
pub mod writer;

pub use format::AccessLogEntry;
pub use writer::LogLevel;

use crate::config::Config;
use std::net::SocketAddr;

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &Config) -> std::io::Result<()> {
    let level = config
        .logging
        .level
        .parse::<LogLevel>()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    writer::init(
        level,
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
    )
}

fn write_info(level: LogLevel, message: &str) {
    match writer::get() {
        Some(w) => w.write_info(level, message),
        None => println!("{message}"),
    }
}

fn write_error(level: LogLevel, message: &str) {
    match writer::get() {
        Some(w) => w.write_error(level, message),
        None => eprintln!("{message}"),
    }
}

fn write_access(message: &str) {
    match writer::get() {
        Some(w) => w.write_access(message),
        None => println!("{message}"),
    }
}

/// The one-line startup banner, plus details at debug level
pub fn log_server_start(addr: &SocketAddr, config: &Config, serves_api: bool) {
    write_info(LogLevel::Info, &format!("Listening on :{}...", addr.port()));
    log_debug(&format!("Bound address: {addr}"));
    log_debug(&format!("Static root: {}", config.static_files.root));
    log_debug(&format!("Validation endpoint enabled: {serves_api}"));
    if let Some(workers) = config.server.workers {
        log_debug(&format!("Worker threads: {workers}"));
    }
    if let Some(ref path) = config.logging.access_log_file {
        log_debug(&format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        log_debug(&format!("Error log: {path}"));
    }
}

pub fn log_shutdown(active_connections: usize) {
    write_info(
        LogLevel::Info,
        &format!("Shutting down ({active_connections} connections still open)"),
    );
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    write_error(
        LogLevel::Error,
        &format!("[ERROR] Failed to serve connection: {err:?}"),
    );
}

pub fn log_error(message: &str) {
    write_error(LogLevel::Error, &format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write_error(LogLevel::Warn, &format!("[WARN] {message}"));
}

pub fn log_debug(message: &str) {
    write_info(LogLevel::Debug, &format!("[DEBUG] {message}"));
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    write_access(&entry.format(format));
}
