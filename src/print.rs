//! A `log` implementation that prints colored messages to stderr.

use core::{fmt, marker::PhantomData};
use owo_colors::{colors, Color, OwoColorize};

/// Represents any level of a log message.
trait Level {
    type Color: Color;

    const NAME: &'static str;
}

enum Trace {}
impl Level for Trace {
    type Color = colors::Blue;
    const NAME: &'static str = "Trace";
}

enum Debug {}
impl Level for Debug {
    type Color = colors::Magenta;
    const NAME: &'static str = "Debug";
}

enum Info {}
impl Level for Info {
    type Color = colors::Cyan;
    const NAME: &'static str = "Info";
}

enum Warn {}
impl Level for Warn {
    type Color = colors::Yellow;
    const NAME: &'static str = "Warn";
}

enum Error {}
impl Level for Error {
    type Color = colors::Red;
    const NAME: &'static str = "Error";
}

/// A single formatted log line.
struct Line<'fmt, L> {
    module: &'fmt str,
    args: &'fmt fmt::Arguments<'fmt>,
    _level: PhantomData<L>,
}

impl<L: Level> fmt::Display for Line<'_, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[ {:>5} ] [{}] {}",
            L::NAME.fg::<L::Color>(),
            self.module.dimmed(),
            self.args
        )
    }
}

fn line<'fmt, L: Level>(module: &'fmt str, args: &'fmt fmt::Arguments<'fmt>) -> Line<'fmt, L> {
    Line {
        module,
        args,
        _level: PhantomData,
    }
}

struct Logger;

impl log::Log for Logger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let module = record
            .module_path_static()
            .or_else(|| record.module_path())
            .unwrap_or("<n/a>");
        let args = record.args();

        match record.level() {
            log::Level::Error => eprintln!("{}", line::<Error>(module, args)),
            log::Level::Warn => eprintln!("{}", line::<Warn>(module, args)),
            log::Level::Info => eprintln!("{}", line::<Info>(module, args)),
            log::Level::Debug => eprintln!("{}", line::<Debug>(module, args)),
            log::Level::Trace => eprintln!("{}", line::<Trace>(module, args)),
        }
    }

    fn flush(&self) {}
}

/// Install the logger. Messages above `level` are dropped.
pub fn init_logging(level: log::LevelFilter) {
    if log::set_logger(&Logger).is_ok() {
        log::set_max_level(level);
    }
}
