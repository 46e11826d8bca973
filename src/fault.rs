//! Process-wide uncaught-fault handling.
//!
//! Installed once before any subsystem starts. Two surfaces:
//!
//! - a panic hook covering every thread, the installing one included;
//! - [`handle_task_fault`], the sink subsystem workers report errors into.
//!
//! Classification: a fault whose cause chain carries a [`StorageFault`] at
//! depth two (cause of cause) is a known, recoverable condition from the
//! block-storage engine — logged at reduced severity, message only.
//! Everything else gets full diagnostics (message, concrete fault, chain).
//! This module never terminates the process; that call belongs to whichever
//! caller detects a truly fatal condition.

use std::error::Error;
use std::fmt::Write as _;
use std::sync::Once;

use tracing::{error, warn};

use crate::error::StorageFault;

static INSTALL: Once = Once::new();

/// Install the panic hook. Safe to call more than once; only the first wins.
pub fn install() {
    INSTALL.call_once(|| {
        std::panic::set_hook(Box::new(|info| {
            let thread = std::thread::current();
            let name = thread.name().unwrap_or("unnamed").to_string();
            let location = info
                .location()
                .map(|l| l.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            let payload = payload_message(info.payload());
            let backtrace = std::backtrace::Backtrace::force_capture();
            error!(
                thread = %name,
                location = %location,
                "uncaught panic: {payload}\n{backtrace}"
            );
        }));
    });
}

/// Report an error escaping a subsystem worker.
pub fn handle_task_fault(source: &str, fault: &(dyn Error + 'static)) {
    if is_recoverable_storage_fault(fault) {
        // Known condition from the block-storage engine: no chain dump.
        warn!(source = source, "{fault}");
    } else {
        error!(
            source = source,
            fault = ?fault,
            chain = %render_chain(fault),
            "uncaught fault: {fault}"
        );
    }
}

/// True when the cause of the cause is a [`StorageFault`].
pub fn is_recoverable_storage_fault(fault: &(dyn Error + 'static)) -> bool {
    fault
        .source()
        .and_then(|cause| cause.source())
        .is_some_and(|root| root.is::<StorageFault>())
}

fn render_chain(fault: &(dyn Error + 'static)) -> String {
    let mut out = fault.to_string();
    let mut current = fault.source();
    while let Some(cause) = current {
        let _ = write!(out, " -> {cause}");
        current = cause.source();
    }
    out
}

fn payload_message(payload: &dyn std::any::Any) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
