use crossterm::{
    cursor::Show,
    event::DisableMouseCapture,
    execute,
    terminal::{LeaveAlternateScreen, disable_raw_mode},
};
use log::error;
use std::io::{self, Write};
use std::panic::{self, PanicHookInfo};

/// Install better-panic and a hook that gives the terminal back before the
/// report is printed, so the backtrace is readable.
pub fn initialize_panic_handler() {
    better_panic::install();

    let report = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        error!("Panic: {}", describe(info));
        restore_terminal();
        report(info);
        std::process::exit(1);
    }));
}

fn describe(info: &PanicHookInfo<'_>) -> String {
    let payload = info
        .payload()
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| info.payload().downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown payload".to_string());
    match info.location() {
        Some(location) => format!("{payload} at {}:{}", location.file(), location.line()),
        None => payload,
    }
}

/// Leave raw mode and the alternate screen, release the mouse and show the
/// cursor. Every step is attempted even if an earlier one fails.
pub fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
    let _ = execute!(io::stderr(), Show);
    let _ = writeln!(io::stderr());
}
