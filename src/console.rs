/*
 * Copyright 2026 Oxide Computer Company
 */

pub use core::fmt::Write as FmtWrite;
use core::fmt;
use core::num::NonZeroU32;

use embedded_hal::serial::Read;
use nb::block;

use crate::reg::Mmio;
use crate::uart::{self, Uart};

macro_rules! console {
	($dev:ident, $baud:expr) => {
		/* The UART carrying the console. */
		pub fn uart() -> &'static Uart<Mmio> {
			&uart::$dev
		}

		pub const DEV_NAME: &str = stringify!($dev);

		pub const BAUD_RATE: NonZeroU32 = match (NonZeroU32::new($baud)) {
			Some(b) => b,
			None => panic!("console baud rate must be nonzero"),
		};
	};
}

include!(concat!(env!("OUT_DIR"), "/condefs.rs"));

/*
 * Cooked output: every line ending leaves as CR LF.  A CR already sitting in
 * front of the LF is folded into it rather than doubled.
 */
fn write_cooked<F: FnMut(&[u8])>(s: &str, mut put: F) {
	let mut lines = s.lines().peekable();
	while let Some(l) = lines.next() {
		put(l.as_bytes());
		if (lines.peek().is_some()) {
			put(b"\r\n");
		}
	}
	if (s.ends_with('\n')) {
		put(b"\r\n");
	}
}

pub struct Console;

impl Console {
	pub fn new() -> Self {
		Console {}
	}

	pub fn _wfmt(
		&mut self,
		args: core::fmt::Arguments<'_>,
	) -> core::fmt::Result {
		self.write_fmt(args)
	}
}

impl Default for Console {
	fn default() -> Self {
		Self::new()
	}
}

impl FmtWrite for Console {
	fn write_str(&mut self, s: &str) -> fmt::Result {
		let u = uart();
		write_cooked(s, |b| b.iter().for_each(|&c| u.tx(c)));

		Ok(())
	}
}

/* Raw byte output; no translation of any kind. */
pub fn putc(c: u8) {
	uart().tx(c)
}

/* Wait for and return the next byte received without error. */
pub fn getc() -> u8 {
	let mut u = uart();
	block!(u.read()).unwrap_or_else(|v| void::unreachable(v))
}

pub fn stdout() -> Console {
	Console::new()
}

pub fn stderr() -> Console {
	Console::new()
}

#[macro_export]
macro_rules! print {
	($($arg:tt)*) =>
	    ($crate::console::stdout()._wfmt(
			core::format_args!($($arg)*)).unwrap());
}

#[macro_export]
macro_rules! println {
	() => ($crate::print!("\n"));
	($($arg:tt)*) => ({
		$crate::console::stdout()._wfmt(
			core::format_args!($($arg)*)).unwrap();
		$crate::print!("\n");
	})
}

#[macro_export]
macro_rules! eprint {
	($($arg:tt)*) =>
	    ($crate::console::stderr()._wfmt(
			core::format_args!($($arg)*)).unwrap());
}

#[macro_export]
macro_rules! eprintln {
	() => ($crate::eprint!("\n"));
	($($arg:tt)*) => ({
		$crate::console::stderr()._wfmt(
			core::format_args!($($arg)*)).unwrap();
		$crate::eprint!("\n");
	})
}
