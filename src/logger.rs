/*
 * Copyright 2026 Oxide Computer Company
 */

use core::fmt::{self, Write};

use log::{LevelFilter, Metadata, Record};

use crate::console;

#[cfg(feature = "log_debug")]
pub const LEVEL: LevelFilter = LevelFilter::Debug;
#[cfg(not(feature = "log_debug"))]
pub const LEVEL: LevelFilter = LevelFilter::Info;

struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;

fn format<W: Write>(w: &mut W, record: &Record<'_>) -> fmt::Result {
	writeln!(w, "[{}]: {}", record.level(), record.args())
}

impl log::Log for ConsoleLogger {
	fn enabled(&self, metadata: &Metadata<'_>) -> bool {
		metadata.level() <= LEVEL
	}

	fn log(&self, record: &Record<'_>) {
		if (self.enabled(record.metadata())) {
			let _ = format(&mut console::stderr(), record);
		}
	}

	fn flush(&self) {}
}

/*
 * Install the console logger.  Only the first call does anything; the
 * console must already be programmed.
 */
pub fn init() {
	if (log::set_logger(&LOGGER).is_ok()) {
		log::set_max_level(LEVEL);
	}
}
