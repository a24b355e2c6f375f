/*
 * Copyright 2026 Oxide Computer Company
 */

#![cfg_attr(not(test), no_std)]
#![allow(unused_parens)]

pub mod ccm;
pub mod console;
pub mod cpu;
pub mod hooks;
pub mod hwinit;
pub mod logger;
pub mod reg;
pub mod rng;
pub mod soc;
pub mod uart;
pub mod wdog;

pub use rng::get_random_data;
pub use soc::{chip, model, uid};
pub use wdog::reboot;

pub mod prelude {
	pub use crate::eprint;
	pub use crate::eprintln;
	pub use crate::print;
	pub use crate::println;
}
