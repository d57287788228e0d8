//! Tracing subscriber: console and log file rendering of caravan events.
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write as _;
use std::sync::Mutex;

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

use super::utils::{CLOCK, Channel, DATE_TIME, log_file_path, strip_ansi, utc_now};

/// The `message` field of `event`.
fn message_of(event: &Event<'_>) -> String {
    struct Message(String);

    impl Visit for Message {
        fn record_str(&mut self, field: &Field, value: &str) {
            if field.name() == "message" {
                value.clone_into(&mut self.0);
            }
        }

        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            if field.name() == "message" {
                self.0 = format!("{value:?}");
            }
        }
    }

    let mut message = Message(String::new());
    event.record(&mut message);
    message.0
}

/// One console line.  Script output is indented under a gutter so it reads
/// as part of the `>>>>`/`<<<<` frame.
fn console_line(level: Level, channel: Channel, msg: &str) -> String {
    match (channel, level) {
        (_, Level::ERROR) => format!("\x1b[31mERROR\x1b[0m {msg}"),
        (Channel::Script, Level::WARN) => format!("  \x1b[33m│\x1b[0m {msg}"),
        (_, Level::WARN) => format!("\x1b[33mWARN\x1b[0m  {msg}"),
        (Channel::Stage, _) => format!("\x1b[94m==>\x1b[0m \x1b[1m{msg}\x1b[0m"),
        (Channel::DryRun, _) => format!("  \x1b[33m[DRY RUN]\x1b[0m {msg}"),
        (Channel::Script, _) => format!("  \x1b[2m│\x1b[0m {msg}"),
        (Channel::General, Level::INFO) => format!("  {msg}"),
        (Channel::General, _) => format!("  \x1b[2m{msg}\x1b[0m"),
    }
}

/// One log file line, stamped with `clock` and free of escape codes.
fn file_line(level: Level, channel: Channel, clock: &str, msg: &str) -> String {
    let msg = strip_ansi(msg);
    let tag = match (channel, level) {
        (Channel::Stage, _) => return format!("[{clock}] ==> {msg}"),
        (Channel::Script, Level::WARN) => "! ",
        (Channel::Script, _) => "| ",
        (_, Level::ERROR) => "[error] ",
        (_, Level::WARN) => "[warn] ",
        (Channel::DryRun, _) => "[dry run] ",
        (_, Level::DEBUG | Level::TRACE) => "[debug] ",
        _ => "",
    };
    format!("[{clock}]     {tag}{msg}")
}

/// First lines of a fresh log file.
fn run_header(version: &str, started: &str) -> String {
    let rule = "=".repeat(42);
    format!("{rule}\ncaravan {version} {started}\n{rule}\n")
}

/// Appends every event to the run's log file.
#[derive(Debug)]
struct FileLayer {
    file: Mutex<File>,
}

impl FileLayer {
    /// Truncate the log file for `command` and write the run header.
    ///
    /// Returns `None` if the file cannot be opened or written.
    fn open(command: &str) -> Option<Self> {
        let path = log_file_path(command)?;
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .ok()?;
        let version =
            option_env!("CARAVAN_VERSION").unwrap_or(concat!("dev-", env!("CARGO_PKG_VERSION")));
        file.write_all(run_header(version, &utc_now(DATE_TIME)).as_bytes())
            .ok()?;
        Some(Self {
            file: Mutex::new(file),
        })
    }
}

impl<S: Subscriber> tracing_subscriber::Layer<S> for FileLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        let line = file_line(
            *meta.level(),
            Channel::of(meta.target()),
            &utc_now(CLOCK),
            &message_of(event),
        );
        if let Ok(mut file) = self.file.lock() {
            writeln!(file, "{line}").ok();
        }
    }
}

/// Console formatter for caravan events.
struct ConsoleFormat;

impl<S, N> FormatEvent<S, N> for ConsoleFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();
        let line = console_line(*meta.level(), Channel::of(meta.target()), &message_of(event));
        writeln!(writer, "{line}")
    }
}

/// Initialise the global [`tracing`] subscriber.
///
/// Warnings and errors (including script stderr) go to stderr, everything
/// else to stdout; `debug` reaches the console only when `verbose`.  Every
/// event is also appended to `$XDG_CACHE_HOME/caravan/<command>.log`.  Call
/// once, before any logging.
pub fn init_subscriber(verbose: bool, command: &str) {
    use tracing_subscriber::fmt::writer::MakeWriterExt as _;
    use tracing_subscriber::{
        Layer as _, filter::LevelFilter, layer::SubscriberExt as _, util::SubscriberInitExt as _,
    };

    let console_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let writer = std::io::stderr
        .with_max_level(Level::WARN)
        .and(std::io::stdout.with_min_level(Level::INFO));

    let console = tracing_subscriber::fmt::layer()
        .event_format(ConsoleFormat)
        .with_writer(writer)
        .with_filter(console_level);
    let file = FileLayer::open(command).map(|layer| layer.with_filter(LevelFilter::DEBUG));

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .init();
}
