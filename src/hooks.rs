/*
 * Copyright 2026 Oxide Computer Company
 */

/*
 * The handful of entry points a bare-metal language runtime needs from the
 * board before it can run: byte output, a monotonic clock, early hardware
 * initialisation, and entropy initialisation.  The runtime links against the
 * unmangled C symbols at the bottom of this file.
 */

use core::num::NonZeroU32;
use core::sync::atomic::{AtomicBool, Ordering};

use log::debug;

use crate::cpu::Cpu;
use crate::hwinit;
use crate::reg::Bus;
use crate::rng::{Entropy, Source};
use crate::soc::{self, ChipIdentity};
use crate::uart::Uart;

pub trait RuntimeHooks {
	/*
	 * Emit one byte on the console, blocking until accepted.  Must not
	 * allocate.
	 */
	fn printk(c: u8);
	/* Nanoseconds since the time source was started. */
	fn nanotime() -> i64;
	/* SoC bring-up.  Runs at most once. */
	fn hwinit();
	/* Entropy source selection.  Runs at most once. */
	fn init_rng();
}

pub struct OneShot(AtomicBool);

impl OneShot {
	pub const fn new() -> Self {
		OneShot(AtomicBool::new(false))
	}

	/* True for the first caller only. */
	pub fn fire(&self) -> bool {
		!self.0.swap(true, Ordering::AcqRel)
	}

	pub fn fired(&self) -> bool {
		self.0.load(Ordering::Acquire)
	}
}

impl Default for OneShot {
	fn default() -> Self {
		Self::new()
	}
}

pub fn nanotime<C: Cpu + ?Sized>(cpu: &C) -> i64 {
	cpu.timer().wrapping_mul(cpu.timer_multiplier()) as i64
}

/* Seed for the fallback generator: the low half of the running timer. */
pub fn rng_seed<C: Cpu + ?Sized>(cpu: &C) -> u32 {
	cpu.timer() as u32
}

/*
 * Bring-up behind a one-shot guard.  Only the first caller runs it and gets
 * the identity back; everyone after that gets None and touches nothing.
 */
pub fn hwinit_once<C, B, U>(
	guard: &OneShot,
	cpu: &C,
	bus: &B,
	console: &Uart<U>,
	baud: NonZeroU32,
) -> Option<ChipIdentity>
where
	C: Cpu + ?Sized,
	B: Bus + ?Sized,
	U: Bus,
{
	if (!guard.fire()) {
		return (None);
	}

	Some(hwinit::hwinit(cpu, bus, console, baud))
}

/*
 * Entropy selection behind a one-shot guard.  The identity recorded at
 * bring-up is used when there is one; otherwise the chip is identified
 * afresh from `bus`.
 */
pub fn init_rng_once<C, B, R>(
	guard: &OneShot,
	entropy: &Entropy<R>,
	cpu: &C,
	bus: &B,
	recorded: Option<ChipIdentity>,
) -> Option<Source>
where
	C: Cpu + ?Sized,
	B: Bus + ?Sized,
	R: Bus,
{
	if (!guard.fire()) {
		return (None);
	}

	let id = recorded.unwrap_or_else(|| soc::identify(bus));
	let src = entropy.bind(&id, rng_seed(cpu));
	debug!("entropy source {src:?}");

	Some(src)
}

#[cfg(target_arch = "arm")]
pub mod imx6 {
	use super::*;
	use crate::console;
	use crate::cpu::cortex::Cortex;
	use crate::reg::{Mmio, MMIO};
	use crate::rng;

	pub static CPU: Cortex<Mmio> = Cortex::new(unsafe { Mmio::new() });

	static HWINIT: OneShot = OneShot::new();
	static INIT_RNG: OneShot = OneShot::new();

	pub struct Imx6;

	impl RuntimeHooks for Imx6 {
		fn printk(c: u8) {
			console::putc(c)
		}

		fn nanotime() -> i64 {
			nanotime(&CPU)
		}

		fn hwinit() {
			let id = hwinit_once(
				&HWINIT,
				&CPU,
				&MMIO,
				console::uart(),
				console::BAUD_RATE,
			);

			#[cfg(feature = "bringup_log")]
			if let Some(id) = id {
				crate::logger::init();
				log::info!(
					"{} rev {}.{} ({}), console {} at {}",
					id.model(),
					id.rev_major,
					id.rev_minor,
					if (id.native) { "native" } else { "emulated" },
					console::DEV_NAME,
					console::BAUD_RATE,
				);
			}
			#[cfg(not(feature = "bringup_log"))]
			let _ = id;
		}

		fn init_rng() {
			init_rng_once(
				&INIT_RNG,
				&rng::ENTROPY,
				&CPU,
				&MMIO,
				soc::chip(),
			);
		}
	}

	#[no_mangle]
	pub extern "C" fn imx6_printk(c: u8) {
		Imx6::printk(c)
	}

	#[no_mangle]
	pub extern "C" fn imx6_nanotime() -> i64 {
		Imx6::nanotime()
	}

	#[no_mangle]
	pub extern "C" fn imx6_hwinit() {
		Imx6::hwinit()
	}

	#[no_mangle]
	pub extern "C" fn imx6_init_rng() {
		Imx6::init_rng()
	}
}
