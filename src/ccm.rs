/*
 * Copyright 2026 Oxide Computer Company
 */

use tock_registers::register_bitfields;

use crate::reg::{Bus, Register};

pub const OSC_FREQ: u32 = 24_000_000;
pub const PLL3_FREQ: u32 = 480_000_000;

pub const CCM_CSCDR1: usize = 0x020c_4024;

register_bitfields! {
	u32,
	pub CSCDR1 [
		UART_CLK_PODF OFFSET(0) NUMBITS(6) [],
		UART_CLK_SEL OFFSET(6) NUMBITS(1) [
			Pll3 = 0,
			Osc = 1
		]
	]
}

const CSCDR1_REG: Register<u32, CSCDR1::Register> = Register::at(CCM_CSCDR1);

/*
 * UART_CLK_ROOT before the static /6 divider in front of the UART modules
 * (IMX6ULLRM Figure 17-3).  The clock tree must already be stable; nothing
 * here changes it.
 */
pub fn uart_clock_hz<B: Bus + ?Sized>(bus: &B) -> u32 {
	let r = CSCDR1_REG.extract(bus);

	let freq = match (r.read_as_enum(CSCDR1::UART_CLK_SEL)) {
		Some(CSCDR1::UART_CLK_SEL::Value::Osc) => OSC_FREQ,
		_ => PLL3_FREQ,
	};

	freq / (r.read(CSCDR1::UART_CLK_PODF) + 1)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::reg::mock::MockBus;

	#[test]
	fn pll3_undivided_at_reset() {
		let bus = MockBus::new();
		assert_eq!(uart_clock_hz(&bus), PLL3_FREQ);
	}

	#[test]
	fn selects_oscillator_and_divides() {
		let bus = MockBus::new();

		bus.poke(CCM_CSCDR1, 1 << 6 | 2);
		assert_eq!(uart_clock_hz(&bus), OSC_FREQ / 3);

		bus.poke(CCM_CSCDR1, 0x3f);
		assert_eq!(uart_clock_hz(&bus), PLL3_FREQ / 64);
	}

	#[test]
	fn ignores_unrelated_bits() {
		let bus = MockBus::new();
		bus.poke(CCM_CSCDR1, 0xffff_ff80 | 4);
		assert_eq!(uart_clock_hz(&bus), PLL3_FREQ / 5);
	}
}
