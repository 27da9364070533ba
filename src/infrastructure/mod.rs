pub mod editor;
pub mod error_logging;
pub mod logging;

pub use editor::{
    occurrences_before_line, CommandLineLaunch, DefaultHandlerLaunch, EditorLauncher, JumpTarget,
    KnownEditor, LaunchError, LaunchOutcome, LaunchStrategy, LineJumpSyntax, NoOpFallback,
};
pub use error_logging::{ErrorLogger, ErrorType};
pub use logging::{Logger, LoggerTrait};
