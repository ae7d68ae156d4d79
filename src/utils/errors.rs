use std::sync::atomic::{AtomicBool, Ordering};

use nu_ansi_term::Color;

use crate::cli::ColorMode;

pub const DEFAULT_EXIT_CODE: i32 = 1;

static USE_COLOR: AtomicBool = AtomicBool::new(true);

pub(crate) fn configure_color(cmode: ColorMode) {
    USE_COLOR.store(matches!(cmode, ColorMode::On), Ordering::Relaxed);
}

fn report(label: &str, color: Color, text: &str) {
    if USE_COLOR.load(Ordering::Relaxed) {
        let style = color.bold();
        let text_style = Color::Default.bold();

        eprintln!("{} {}", style.paint(label), text_style.paint(text));
    } else {
        eprintln!("{} {}", label, text);
    }
}

pub(crate) fn error_internal(text: &str) {
    report("error:", Color::Red, text);
}

pub(crate) fn warn_internal(text: &str) {
    report("warning:", Color::Yellow, text);
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => ({
        let formatted = format!($($arg)*);
        $crate::utils::errors::warn_internal(&formatted);
    })
}

#[macro_export]
macro_rules! die {
    ($($arg:tt)*) => ({
        let formatted = format!($($arg)*);
        $crate::utils::errors::error_internal(&formatted);
        ::std::process::exit($crate::utils::errors::DEFAULT_EXIT_CODE);
    })
}
