/*
 * Copyright 2026 Oxide Computer Company
 */

use tock_registers::register_bitfields;

use crate::reg::{Bus, Register, MMIO};

pub const WDOG1_WCR: usize = 0x020b_c000;
pub const SRC_SCR: usize = 0x020d_8000;

register_bitfields! {
	u32,
	pub SCR [
		WARM_RESET_ENABLE OFFSET(0) NUMBITS(1) []
	]
}

/* WCR is 16 bits wide and must never see a 32-bit access */
register_bitfields! {
	u16,
	pub WCR [
		WDZST OFFSET(0) NUMBITS(1) [],
		WDBG OFFSET(1) NUMBITS(1) [],
		WDE OFFSET(2) NUMBITS(1) [],
		WDT OFFSET(3) NUMBITS(1) [],
		SRS OFFSET(4) NUMBITS(1) [],
		WDA OFFSET(5) NUMBITS(1) [],
		SRE OFFSET(6) NUMBITS(1) [],
		WDW OFFSET(7) NUMBITS(1) [],
		WT OFFSET(8) NUMBITS(8) []
	]
}

const SCR_REG: Register<u32, SCR::Register> = Register::at(SRC_SCR);
const WCR_REG: Register<u16, WCR::Register> = Register::at(WDOG1_WCR);

/*
 * Take the warm reset path out of the picture, then zero the watchdog control
 * register: with SRS clear the watchdog asserts a software reset right away.
 * On real hardware the second write never completes from our point of view.
 */
pub fn reset<B: Bus + ?Sized>(bus: &B) {
	SCR_REG.clear(bus, SCR::WARM_RESET_ENABLE);
	WCR_REG.write(bus, 0);
}

pub fn reboot() -> ! {
	reset(&MMIO);

	loop {
		core::hint::spin_loop();
	}
}
