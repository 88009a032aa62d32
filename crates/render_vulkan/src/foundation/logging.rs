//! Logging utilities and the process-level fatal error policy

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system
///
/// Honors `RUST_LOG`; defaults to `info` when it is unset.
pub fn init() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

/// Error text with its chain of causes, one per line
pub fn fatal_message(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();

    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str("\ncaused by: ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }

    message
}

/// Log an unrecoverable error, show it in a blocking dialog, then terminate
/// the process with a failure status
///
/// The library never exits on its own; binaries call this once an error has
/// propagated to `main`.
pub fn fatal(error: &dyn std::error::Error) -> ! {
    let message = fatal_message(error);
    for line in message.lines() {
        log::error!("Fatal error: {line}");
    }

    rfd::MessageDialog::new()
        .set_level(rfd::MessageLevel::Error)
        .set_title("Fatal error")
        .set_description(message)
        .set_buttons(rfd::MessageButtons::Ok)
        .show();

    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use thiserror::Error;

    #[derive(Error, Debug)]
    #[error("Renderer failed")]
    struct Outer(#[source] Inner);

    #[derive(Error, Debug)]
    #[error("No suitable GPU found")]
    struct Inner;

    #[test]
    fn test_fatal_message_includes_causes() {
        let message = fatal_message(&Outer(Inner));

        assert_eq!(message, "Renderer failed\ncaused by: No suitable GPU found");
    }

    #[test]
    fn test_fatal_message_without_cause_is_single_line() {
        assert_eq!(fatal_message(&Inner).lines().count(), 1);
    }
}
