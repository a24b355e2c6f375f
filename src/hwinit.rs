/*
 * Copyright 2026 Oxide Computer Company
 */

use core::num::NonZeroU32;

use log::debug;

use crate::cpu::Cpu;
use crate::reg::Bus;
use crate::soc::{self, ChipIdentity, Family};
use crate::uart::Uart;

/// System counter, p178, Table 2-3, IMX6ULLRM.
pub const SYS_CNT_BASE: usize = 0x021d_c000;

/// QEMU's fixed CNTFRQ.
pub const EMULATED_CNTFRQ: u32 = 62_500_000;
/// What U-Boot programs for the i.MX6 family.
pub const NATIVE_CNTFRQ: u32 = 8_000_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerSource {
	Global,
	Generic { base: usize, freq: u32 },
}

/*
 * The Cortex-A9 parts (i.MX6Q) have the MPCore global timer; the Cortex-A7
 * parts have the architected timer fed by the system counter.  QEMU doesn't
 * model the 8 MHz oscillator, so emulated parts get its frequency instead.
 */
pub fn timer_source(id: &ChipIdentity) -> TimerSource {
	match (id.family) {
		Family::Imx6UL | Family::Imx6ULL => TimerSource::Generic {
			base: SYS_CNT_BASE,
			freq: if (id.native) {
				NATIVE_CNTFRQ
			} else {
				EMULATED_CNTFRQ
			},
		},
		Family::Imx6Q | Family::Unknown(_) => TimerSource::Global,
	}
}

/*
 * Lower level SoC initialisation, run once, early, with no heap.  Nothing
 * reached from here may allocate.  Each step depends on the ones before it,
 * and none of them reports failure: hardware that doesn't respond leaves us
 * spinning in a register wait, which is the best we can do this early.
 */
pub fn hwinit<C, B, U>(
	cpu: &C,
	bus: &B,
	console: &Uart<U>,
	baud: NonZeroU32,
) -> ChipIdentity
where
	C: Cpu + ?Sized,
	B: Bus + ?Sized,
	U: Bus,
{
	cpu.init();
	cpu.enable_vfp();
	cpu.cache_enable();

	let id = soc::identify(bus);
	soc::record(id);

	console.init(baud);

	let ts = timer_source(&id);
	match (ts) {
		TimerSource::Global => cpu.init_global_timers(),
		TimerSource::Generic { base, freq } => {
			cpu.init_generic_timers(base, freq)
		}
	}

	debug!("hwinit: {id:x?}, timer {ts:x?}");

	id
}
