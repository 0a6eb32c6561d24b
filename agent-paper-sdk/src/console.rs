//! Colored progress lines on stdout
//!
//! Use the `log_info!`, `log_warning!`, `log_file_saved!`, `log_progress!`,
//! `log_phase_start_console!` and `log_phase_complete_console!` macros rather
//! than calling these directly.

const RESET: &str = "\x1b[0m";
const CYAN: &str = "\x1b[36m";
const BOLD_CYAN: &str = "\x1b[1;36m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";

/// ```text
/// ═══ PHASE 2: Outline ═══
/// Design the paper outline
/// ```
pub fn phase_header(phase: usize, title: &str, description: &str) {
    println!("{}═══ PHASE {}: {} ═══{}", BOLD_CYAN, phase, title, RESET);
    println!("{}{}{}", CYAN, description, RESET);
}

pub fn phase_done(phase: usize) {
    println!("{}✓ Phase {} complete{}", GREEN, phase, RESET);
}

pub fn progress(current: usize, total: usize, what: &str) {
    println!("{}Progress: {}/{} {}{}", CYAN, current, total, what, RESET);
}

pub fn info(message: &str) {
    println!("{}ℹ {}{}", CYAN, message, RESET);
}

pub fn warning(message: &str) {
    println!("{}⚠ Warning: {}{}", YELLOW, message, RESET);
}

pub fn saved(path: &str) {
    println!("{}✓ Saved: {}{}", GREEN, path, RESET);
}

#[macro_export]
macro_rules! log_phase_start_console {
    ($phase:expr, $title:expr, $description:expr) => {
        $crate::console::phase_header($phase, &$title.to_string(), &$description.to_string())
    };
}

#[macro_export]
macro_rules! log_phase_complete_console {
    ($phase:expr) => {
        $crate::console::phase_done($phase)
    };
}

#[macro_export]
macro_rules! log_progress {
    ($current:expr, $total:expr, $what:expr) => {
        $crate::console::progress($current, $total, &$what.to_string())
    };
}

/// `log_info!("{} of {} sections to write", pending, total)`
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)+) => {
        $crate::console::info(&format!($($arg)+))
    };
}

#[macro_export]
macro_rules! log_warning {
    ($($arg:tt)+) => {
        $crate::console::warning(&format!($($arg)+))
    };
}

#[macro_export]
macro_rules! log_file_saved {
    ($path:expr) => {
        $crate::console::saved(&$path.to_string())
    };
}
