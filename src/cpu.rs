/*
 * Copyright 2026 Oxide Computer Company
 */

use tock_registers::register_bitfields;

use crate::reg::{Bus, Register};

pub const NANOS_PER_SEC: u32 = 1_000_000_000;

/*
 * The processor-side half of bring-up.  Everything here runs before there is
 * a heap and before anything else is running, and none of it can fail in a
 * way we could do anything about.
 */
pub trait Cpu {
	/* Mask interrupts and install the exception vectors. */
	fn init(&self);
	fn enable_vfp(&self);
	fn cache_enable(&self);
	/* Use the Cortex-A9 MPCore global timer as the time source. */
	fn init_global_timers(&self);
	/*
	 * Start the system counter at `base` running at `freq` Hz and use the
	 * architected generic timer as the time source.
	 */
	fn init_generic_timers(&self, base: usize, freq: u32);
	/* Raw ticks of whichever time source was started. */
	fn timer(&self) -> u64;
	/* Nanoseconds per tick. */
	fn timer_multiplier(&self) -> u64;
}

/*
 * System counter, IMX6ULLRM chapter 36.  Only the control block matters to
 * us; the counter is read back through CNTPCT.
 */
pub mod syscnt {
	use super::*;

	pub const CNTCR_OFFSET: usize = 0x00;
	pub const CNTFID0_OFFSET: usize = 0x20;

	register_bitfields! {
		u32,
		pub CNTCR [
			EN OFFSET(0) NUMBITS(1) [],
			HDBG OFFSET(1) NUMBITS(1) [],
			FCR0 OFFSET(8) NUMBITS(1) [],
			FCR1 OFFSET(9) NUMBITS(1) []
		]
	}

	pub fn start<B: Bus + ?Sized>(bus: &B, base: usize, freq: u32) {
		let cntcr: Register<u32, CNTCR::Register> =
			Register::offset(base, CNTCR_OFFSET);
		let cntfid0: Register<u32> = Register::offset(base, CNTFID0_OFFSET);

		// base frequency entry
		cntfid0.write(bus, freq);
		// select it
		cntcr.set(bus, CNTCR::FCR0);
		// halt on debug
		cntcr.set(bus, CNTCR::HDBG);
		cntcr.set(bus, CNTCR::EN);
	}
}

/*
 * Cortex-A9 MPCore global timer (ARM DDI 0407, 4.3), PERIPHBASE + 0x200.
 * PERIPHCLK is half the 792 MHz core clock on i.MX6Q; prescaling by 99
 * leaves an integral 250 ns tick.
 */
pub mod gtimer {
	use super::*;

	pub const PERIPH_OFFSET: usize = 0x200;
	pub const COUNTER_LO: usize = 0x00;
	pub const COUNTER_HI: usize = 0x04;
	pub const CONTROL_OFFSET: usize = 0x08;

	pub const PERIPHCLK: u32 = 396_000_000;
	pub const PRESCALER: u32 = 98;
	pub const FREQ: u32 = PERIPHCLK / (PRESCALER + 1);

	register_bitfields! {
		u32,
		pub CONTROL [
			TIMER_EN OFFSET(0) NUMBITS(1) [],
			COMP_EN OFFSET(1) NUMBITS(1) [],
			IRQ_EN OFFSET(2) NUMBITS(1) [],
			AUTO_INC OFFSET(3) NUMBITS(1) [],
			PRESCALER OFFSET(8) NUMBITS(8) []
		]
	}

	pub fn start<B: Bus + ?Sized>(bus: &B, base: usize) {
		let ctrl: Register<u32, CONTROL::Register> =
			Register::offset(base, CONTROL_OFFSET);

		ctrl.write_fields(
			bus,
			CONTROL::PRESCALER.val(PRESCALER) + CONTROL::TIMER_EN::SET,
		);
	}

	/*
	 * The two halves can't be read atomically; retry if the upper half
	 * moved underneath us.
	 */
	pub fn read<B: Bus + ?Sized>(bus: &B, base: usize) -> u64 {
		let lo: Register<u32> = Register::offset(base, COUNTER_LO);
		let hi: Register<u32> = Register::offset(base, COUNTER_HI);

		loop {
			let h0 = hi.read(bus);
			let l = lo.read(bus);
			if (hi.read(bus) == h0) {
				return (u64::from(h0) << 32 | u64::from(l));
			}
		}
	}
}

pub fn multiplier(freq: u32) -> u64 {
	u64::from(NANOS_PER_SEC / freq.max(1))
}

#[cfg(target_arch = "arm")]
pub mod cortex {
	use core::arch::asm;
	use core::ptr;
	use core::sync::atomic::{AtomicU32, AtomicU8, AtomicUsize, Ordering};

	use super::*;

	extern "C" {
		/*
		 * Exception vector table provided by the hosting runtime; it
		 * must honour the VBAR alignment of 32 bytes.
		 */
		static imx6_exception_vectors: [u32; 8];
	}

	const SRC_NONE: u8 = 0;
	const SRC_GLOBAL: u8 = 1;
	const SRC_GENERIC: u8 = 2;

	/* ARMv7-A core as found in the i.MX6 family. */
	pub struct Cortex<B: Bus> {
		bus: B,
		source: AtomicU8,
		gtimer_base: AtomicUsize,
		multiplier: AtomicU32,
	}

	impl<B: Bus> Cortex<B> {
		pub const fn new(bus: B) -> Self {
			Cortex {
				bus,
				source: AtomicU8::new(SRC_NONE),
				gtimer_base: AtomicUsize::new(0),
				multiplier: AtomicU32::new(0),
			}
		}
	}

	fn read_cbar() -> usize {
		let v: u32;
		unsafe {
			asm!("mrc p15, 4, {0}, c15, c0, 0", out(reg) v);
		}
		v as usize
	}

	fn read_cntpct() -> u64 {
		let (lo, hi): (u32, u32);
		unsafe {
			asm!("mrrc p15, 0, {0}, {1}, c14",
				out(reg) lo, out(reg) hi);
		}
		u64::from(hi) << 32 | u64::from(lo)
	}

	/*
	 * Safety for all of the coprocessor accesses below: this code runs
	 * in a privileged mode on the boot CPU before anything else exists.
	 */
	impl<B: Bus> Cpu for Cortex<B> {
		fn init(&self) {
			unsafe {
				let vbar =
					ptr::addr_of!(imx6_exception_vectors) as u32;
				asm!(
					"cpsid if",
					"mcr p15, 0, {0}, c12, c0, 0",
					"isb",
					in(reg) vbar,
				);
			}
		}

		fn enable_vfp(&self) {
			unsafe {
				asm!(
					".fpu vfpv3",
					// CP10/CP11 full access
					"mrc p15, 0, {0}, c1, c0, 2",
					"orr {0}, {0}, #0x00f00000",
					"mcr p15, 0, {0}, c1, c0, 2",
					"isb",
					// FPEXC.EN
					"mov {0}, #0x40000000",
					"vmsr fpexc, {0}",
					out(reg) _,
				);
			}
		}

		fn cache_enable(&self) {
			unsafe {
				asm!(
					// ICIALLU
					"mov {0}, #0",
					"mcr p15, 0, {0}, c7, c5, 0",
					"dsb",
					// SCTLR.I, SCTLR.Z, SCTLR.C
					"mrc p15, 0, {0}, c1, c0, 0",
					"orr {0}, {0}, #0x1000",
					"orr {0}, {0}, #0x0800",
					"orr {0}, {0}, #0x0004",
					"mcr p15, 0, {0}, c1, c0, 0",
					"isb",
					out(reg) _,
				);
			}
		}

		fn init_global_timers(&self) {
			let base = read_cbar() + gtimer::PERIPH_OFFSET;

			gtimer::start(&self.bus, base);
			self.gtimer_base.store(base, Ordering::Relaxed);
			self.multiplier.store(
				multiplier(gtimer::FREQ) as u32,
				Ordering::Relaxed,
			);
			self.source.store(SRC_GLOBAL, Ordering::Release);
		}

		fn init_generic_timers(&self, base: usize, freq: u32) {
			syscnt::start(&self.bus, base, freq);
			unsafe {
				asm!("mcr p15, 0, {0}, c14, c0, 0", in(reg) freq);
			}
			self.multiplier
				.store(multiplier(freq) as u32, Ordering::Relaxed);
			self.source.store(SRC_GENERIC, Ordering::Release);
		}

		fn timer(&self) -> u64 {
			match (self.source.load(Ordering::Acquire)) {
				SRC_GLOBAL => gtimer::read(
					&self.bus,
					self.gtimer_base.load(Ordering::Relaxed),
				),
				SRC_GENERIC => read_cntpct(),
				_ => 0,
			}
		}

		fn timer_multiplier(&self) -> u64 {
			u64::from(self.multiplier.load(Ordering::Relaxed))
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::reg::mock::MockBus;

	const SYS_CNT: usize = 0x021d_c000;

	#[test]
	fn system_counter_started_at_frequency() {
		let bus = MockBus::new();
		syscnt::start(&bus, SYS_CNT, 8_000_000);

		assert_eq!(bus.peek(SYS_CNT + syscnt::CNTFID0_OFFSET), 8_000_000);
		assert_eq!(bus.peek(SYS_CNT + syscnt::CNTCR_OFFSET), 1 << 8 | 1 << 1 | 1);
		/* frequency programmed before the counter is enabled */
		assert_eq!(bus.writes()[0].0, SYS_CNT + syscnt::CNTFID0_OFFSET);
		assert_eq!(bus.writes().last().unwrap().1 & 1, 1);
	}

	#[test]
	fn global_timer_prescaled() {
		let bus = MockBus::new();
		let base = 0x00a0_0200;
		gtimer::start(&bus, base);

		assert_eq!(bus.peek(base + gtimer::CONTROL_OFFSET), 98 << 8 | 1);
		assert_eq!(gtimer::FREQ, 4_000_000);
		assert_eq!(multiplier(gtimer::FREQ), 250);
	}

	#[test]
	fn global_timer_read_combines_halves() {
		let bus = MockBus::new();
		let base = 0x00a0_0200;
		bus.poke(base + gtimer::COUNTER_LO, 0x89ab_cdef);
		bus.poke(base + gtimer::COUNTER_HI, 0x0123_4567);

		assert_eq!(gtimer::read(&bus, base), 0x0123_4567_89ab_cdef);
	}

	#[test]
	fn multipliers() {
		assert_eq!(multiplier(8_000_000), 125);
		assert_eq!(multiplier(62_500_000), 16);
		assert_eq!(multiplier(0), u64::from(NANOS_PER_SEC));
	}
}
