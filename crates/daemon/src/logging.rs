// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Logging/Observability (§4.12): `tracing` + `tracing-subscriber` (env-filter)
//! initialized once at startup, writing to a daily-rolling file appender
//! under `<home>/logs/` via `tracing-appender`. The `EnvFilter` directive
//! comes from `env::log_level()`.

use std::path::Path;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Must be kept alive for the process lifetime — dropping it stops the
/// non-blocking writer from flushing.
pub struct LoggingGuard {
    _file_guard: tracing_appender::non_blocking::WorkerGuard,
}

/// Initializes the global `tracing` subscriber with a daily-rolling file
/// layer under `<home>/logs/ojd.log` and the `level` directive (falling back
/// to `info` on a malformed value). Must be called exactly once, before any
/// other component logs.
pub fn init(home: &Path, level: &str) -> std::io::Result<LoggingGuard> {
    let log_dir = home.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "ojd.log");
    let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(LoggingGuard { _file_guard: file_guard })
}
