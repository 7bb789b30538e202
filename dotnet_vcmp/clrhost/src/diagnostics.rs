//! Console diagnostics for the plugin host.
//!
//! Every line carries [`MESSAGE_PREFIX`] so it stands out in the server log.
//! Errors and warnings go to stderr, progress messages to stdout.

use env_logger::{Builder, Env, Logger, Target};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::io::{self, Write};

pub const MESSAGE_PREFIX: &str = "[DOTNET] ";

/// Filter directives in `RUST_LOG` syntax. Defaults to `info`.
pub const LOG_FILTER_ENV: &str = "DOTNET_VCMP_LOG";
pub const LOG_STYLE_ENV: &str = "DOTNET_VCMP_LOG_STYLE";

/// Installs the diagnostics logger. Does nothing if the process already has a
/// `log` logger.
pub fn init() {
    let logger = SplitLogger::from_env();
    let max_level = logger.filter();
    if log::set_boxed_logger(Box::new(logger)).is_ok() {
        log::set_max_level(max_level);
    }
}

struct SplitLogger {
    stdout: Logger,
    stderr: Logger,
}

impl SplitLogger {
    fn from_env() -> Self {
        Self {
            stdout: builder(Target::Stdout).build(),
            stderr: builder(Target::Stderr).build(),
        }
    }

    fn filter(&self) -> LevelFilter {
        self.stdout.filter()
    }

    fn target(&self, level: Level) -> &Logger {
        if level <= Level::Warn {
            &self.stderr
        } else {
            &self.stdout
        }
    }
}

fn builder(target: Target) -> Builder {
    let env = Env::new()
        .filter_or(LOG_FILTER_ENV, "info")
        .write_style(LOG_STYLE_ENV);
    let mut builder = Builder::from_env(env);
    builder
        .target(target)
        .format(|buf, record| write_record(buf, record));
    builder
}

fn write_record<W: Write + ?Sized>(buf: &mut W, record: &Record) -> io::Result<()> {
    writeln!(buf, "{}{}", MESSAGE_PREFIX, record.args())
}

impl Log for SplitLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.target(metadata.level()).enabled(metadata)
    }

    fn log(&self, record: &Record) {
        self.target(record.level()).log(record);
    }

    fn flush(&self) {
        self.stdout.flush();
        self.stderr.flush();
    }
}
