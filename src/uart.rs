/*
 * Copyright 2026 Oxide Computer Company
 */

use core::num::NonZeroU32;
use core::sync::atomic::{AtomicU8, Ordering};

use embedded_hal::blocking::serial as blocking_serial;
use embedded_hal::serial;
use spin::Mutex;
use void::Void;

pub mod regdefs;
use crate::ccm;
use crate::reg::{Bus, Mmio, Register};
use regdefs::*;

pub const UART_DEFAULT_BAUDRATE: u32 = 115_200;
pub const ESC: u32 = 0x1b;

pub mod config {
	use core::fmt::{self, Display};
	use core::num::NonZeroU32;

	/* Fixed UBIR value; see BaudConfig. */
	pub const UBIR: u32 = 15;

	/*
	 * p2299, 45.5 Binary Rate Multiplier (BRM), IMX6ULLRM
	 *
	 *              ref_clk_freq
	 * baudrate = -----------------
	 *                   UBMR + 1
	 *             16 * ----------
	 *                   UBIR + 1
	 *
	 * The module clock is UART_CLK_ROOT behind a static /6 divider, and
	 * ref_clk_freq is the module clock after the UFCR RFDIV /2.  With
	 * UBIR pinned at 15 the fraction collapses and UBMR is a plain integer
	 * quotient; whatever rounding error that leaves is accepted.
	 */
	#[derive(Clone, Copy, Debug, PartialEq, Eq)]
	pub struct BaudConfig {
		pub ubir: u32,
		pub ubmr: u32,
	}

	#[derive(Debug, PartialEq, Eq)]
	#[non_exhaustive]
	pub enum ConfigError {
		/* Requested rate outside [min, max] for the current clock. */
		BaudRate(u32, u32),
	}

	impl Display for ConfigError {
		fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
			match (self) {
				ConfigError::BaudRate(min, max) => write!(
					f,
					"baud rate must be within {min}..={max}"
				),
			}
		}
	}

	const UBMR_MAX: u32 = 0xffff;

	impl BaudConfig {
		/*
		 * Unchecked derivation from UART_CLK_ROOT in Hz.  The divisor is
		 * widened so any nonzero rate is accepted; rates beyond the
		 * clock's reach just bottom out at UBMR 0.
		 */
		pub fn derive(uart_clk: u32, baud: NonZeroU32) -> Self {
			let clk = u64::from(uart_clk / 6);

			BaudConfig {
				ubir: UBIR,
				ubmr: (clk / (2 * u64::from(baud.get()))) as u32,
			}
		}

		/* As derive(), refusing rates UBMR can't represent. */
		pub fn new(uart_clk: u32, baud: u32) -> Result<Self, ConfigError> {
			let clk = uart_clk / 6;
			let min = clk / (2 * (UBMR_MAX + 1)) + 1;
			let max = clk / 2;

			match (NonZeroU32::new(baud)) {
				Some(b) if (min ..= max).contains(&baud) => {
					Ok(Self::derive(uart_clk, b))
				}
				_ => Err(ConfigError::BaudRate(min, max)),
			}
		}

		/* The rate the hardware will actually run at. */
		pub fn actual_baud(&self, uart_clk: u32) -> u32 {
			let ref_clk = u64::from(uart_clk / 6 / 2);
			let num = ref_clk * u64::from(self.ubir + 1);
			let den = 16 * u64::from(self.ubmr + 1);

			(num / den) as u32
		}
	}
}

use config::{BaudConfig, ConfigError};

/*
 * What the rest of the system can see of a UART.  Unknown until the first
 * init(); Configuring for the duration of each init(); Running afterwards.
 * A Running UART may be initialised again, which walks it back through
 * Configuring and reprograms everything from scratch.
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Mode {
	Unknown = 0,
	Configuring = 1,
	Running = 2,
}

impl Mode {
	fn from_u8(v: u8) -> Self {
		match (v) {
			1 => Mode::Configuring,
			2 => Mode::Running,
			_ => Mode::Unknown,
		}
	}
}

struct Registers {
	urxd: Register<u32, URXD::Register>,
	utxd: Register<u32, UTXD::Register>,
	ucr1: Register<u32, UCR1::Register>,
	ucr2: Register<u32, UCR2::Register>,
	ucr3: Register<u32, UCR3::Register>,
	ucr4: Register<u32, UCR4::Register>,
	ufcr: Register<u32, UFCR::Register>,
	usr2: Register<u32, USR2::Register>,
	uesc: Register<u32>,
	utim: Register<u32>,
	ubir: Register<u32>,
	ubmr: Register<u32>,
	uts: Register<u32, UTS::Register>,
}

impl Registers {
	const fn new(base: usize) -> Self {
		Registers {
			urxd: Register::offset(base, offset::URXD),
			utxd: Register::offset(base, offset::UTXD),
			ucr1: Register::offset(base, offset::UCR1),
			ucr2: Register::offset(base, offset::UCR2),
			ucr3: Register::offset(base, offset::UCR3),
			ucr4: Register::offset(base, offset::UCR4),
			ufcr: Register::offset(base, offset::UFCR),
			usr2: Register::offset(base, offset::USR2),
			uesc: Register::offset(base, offset::UESC),
			utim: Register::offset(base, offset::UTIM),
			ubir: Register::offset(base, offset::UBIR),
			ubmr: Register::offset(base, offset::UBMR),
			uts: Register::offset(base, offset::UTS),
		}
	}
}

/*
 * The lock covers init() only.  Transmit and receive take no lock, so
 * reinitialising a UART while someone else is moving bytes through it will
 * corrupt those bytes; don't do that.
 */
pub struct Uart<B: Bus> {
	bus: B,
	base: usize,
	regs: Registers,
	mode: AtomicU8,
	lock: Mutex<()>,
}

impl<B: Bus> Uart<B> {
	pub const fn new(bus: B, base: usize) -> Self {
		Uart {
			bus,
			base,
			regs: Registers::new(base),
			mode: AtomicU8::new(Mode::Unknown as u8),
			lock: Mutex::new(()),
		}
	}

	pub fn base(&self) -> usize {
		self.base
	}

	pub fn mode(&self) -> Mode {
		Mode::from_u8(self.mode.load(Ordering::Acquire))
	}

	/*
	 * Program the UART for RS-232 mode at `baud`, p2312, 45.13.1
	 * Programming the UART in RS-232 mode, IMX6ULLRM.
	 */
	pub fn init(&self, baud: NonZeroU32) {
		let brm = BaudConfig::derive(ccm::uart_clock_hz(&self.bus), baud);
		self.program(brm);
	}

	/* As init(), but rejects rates the clock can't produce. */
	pub fn configure(&self, baud: u32) -> Result<BaudConfig, ConfigError> {
		let brm = BaudConfig::new(ccm::uart_clock_hz(&self.bus), baud)?;
		self.program(brm);
		Ok(brm)
	}

	fn program(&self, brm: BaudConfig) {
		let _guard = self.lock.lock();
		let bus = &self.bus;
		let r = &self.regs;

		self.mode.store(Mode::Configuring as u8, Ordering::Release);

		r.ucr1.write(bus, 0);
		r.ucr2.write(bus, 0);

		// wait for software reset deassertion
		r.ucr2.wait(bus, UCR2::SRST, 1);

		// handshake lines asserted, no autobaud, RXD muxed in
		r.ucr3.write_fields(
			bus,
			UCR3::DSR::SET +
				UCR3::DCD::SET + UCR3::RI::SET +
				UCR3::ADNIMP::SET + UCR3::RXDMUXSEL::SET,
		);

		// 32 characters in the RxFIFO (maximum)
		r.ucr4.modify(bus, UCR4::CTSTL.val(32));

		r.uesc.write(bus, ESC);
		r.utim.write(bus, 0);

		r.ufcr.write_fields(
			bus,
			UFCR::RFDIV::DivideBy2 + UFCR::TXTL.val(2) + UFCR::RXTL.val(1),
		);

		// UBIR must be written first
		r.ubir.write(bus, brm.ubir);
		r.ubmr.write(bus, brm.ubmr);

		// SRST reads back as 0 until the reset it requests completes
		r.ucr2.write_fields(
			bus,
			UCR2::IRTS::SET +
				UCR2::WS::SET + UCR2::TXEN::SET +
				UCR2::RXEN::SET + UCR2::SRST::SET,
		);

		r.ucr1.set(bus, UCR1::UARTEN);

		self.mode.store(Mode::Running as u8, Ordering::Release);
	}

	/* Transmit one character and wait for the TxFIFO to drain. */
	pub fn tx(&self, c: u8) {
		let bus = &self.bus;

		self.regs.utxd.write_fields(bus, UTXD::TX_DATA.val(u32::from(c)));
		self.regs.uts.wait(bus, UTS::TXEMPTY, 1);
	}

	/*
	 * Single poll.  No data and bad data look the same to the caller: a
	 * character received with any of the error bits set is consumed and
	 * dropped.  URXD is read exactly once since reading it pops the FIFO.
	 */
	pub fn rx(&self) -> Option<u8> {
		let bus = &self.bus;

		if (!self.regs.usr2.is_set(bus, USR2::RDR)) {
			return (None);
		}

		let rxd = self.regs.urxd.extract(bus);
		if (rxd.read(URXD::ERRORS) != 0) {
			return (None);
		}

		Some(rxd.read(URXD::RX_DATA) as u8)
	}
}

impl<'a, B: Bus> serial::Read<u8> for &'a Uart<B> {
	type Error = Void;

	fn read(&mut self) -> nb::Result<u8, Void> {
		self.rx().ok_or(nb::Error::WouldBlock)
	}
}

impl<'a, B: Bus> serial::Write<u8> for &'a Uart<B> {
	type Error = Void;

	fn write(&mut self, b: u8) -> nb::Result<(), Void> {
		self.tx(b);
		Ok(())
	}

	/* tx() doesn't return until the FIFO is empty */
	fn flush(&mut self) -> nb::Result<(), Void> {
		Ok(())
	}
}

impl<'a, B: Bus> blocking_serial::write::Default<u8> for &'a Uart<B> {}

macro_rules! uart {
	($n:ident, $base_name:ident, $base:expr) => {
		pub const $base_name: usize = $base;

		pub static $n: Uart<Mmio> =
			Uart::new(unsafe { Mmio::new() }, $base_name);
	};
}

// i.MX 6UltraLite (G0, G1, G2, G3, G4), i.MX 6ULL (Y0, Y1, Y2), i.MX 6ULZ (Z0)
uart!(UART1, UART1_BASE, 0x0202_0000);
uart!(UART2, UART2_BASE, 0x021e_8000);
uart!(UART3, UART3_BASE, 0x021e_c000);
uart!(UART4, UART4_BASE, 0x021f_0000);

// i.MX 6UltraLite (G1, G2, G3, G4), i.MX 6ULL (Y1, Y2)
uart!(UART5, UART5_BASE, 0x021f_4000);
uart!(UART6, UART6_BASE, 0x021f_c000);
uart!(UART7, UART7_BASE, 0x0201_8000);
uart!(UART8, UART8_BASE, 0x0202_4000);

#[cfg(test)]
mod tests {
	use super::*;
	use crate::ccm::{CCM_CSCDR1, OSC_FREQ, PLL3_FREQ};
	use crate::reg::mock::{Access, MockBus};
	use embedded_hal::prelude::*;
	use nb::block;
	use std::vec::Vec;

	const BASE: usize = UART2_BASE;

	fn at(off: usize) -> usize {
		BASE + off
	}

	fn baud(b: u32) -> NonZeroU32 {
		NonZeroU32::new(b).unwrap()
	}

	fn reset_done(bus: &MockBus) {
		bus.force(at(offset::UCR2), 1 << 0);
	}

	#[test]
	fn init_programs_rs232_mode() {
		let bus = MockBus::new();
		reset_done(&bus);
		let uart = Uart::new(&bus, BASE);

		assert_eq!(uart.mode(), Mode::Unknown);
		uart.init(baud(UART_DEFAULT_BAUDRATE));
		assert_eq!(uart.mode(), Mode::Running);

		assert_eq!(bus.peek(at(offset::UCR3)), 0x0784);
		assert_eq!(bus.peek(at(offset::UCR4)), 32 << 10);
		assert_eq!(bus.peek(at(offset::UESC)), 0x1b);
		assert_eq!(bus.peek(at(offset::UTIM)), 0);
		assert_eq!(bus.peek(at(offset::UFCR)), 0b100 << 7 | 2 << 10 | 1);
		assert_eq!(bus.peek(at(offset::UBIR)), 15);
		assert_eq!(bus.peek(at(offset::UBMR)), 80_000_000 / 230_400);
		assert_eq!(bus.peek(at(offset::UCR2)), 0x4027);
		assert_eq!(bus.peek(at(offset::UCR1)), 0x1);
	}

	#[test]
	fn init_ordering() {
		let bus = MockBus::new();
		reset_done(&bus);
		Uart::new(&bus, BASE).init(baud(9600));

		let writes: Vec<usize> =
			bus.writes().iter().map(|(a, _)| *a - BASE).collect();
		assert_eq!(
			writes,
			[
				offset::UCR1,
				offset::UCR2,
				offset::UCR3,
				offset::UCR4,
				offset::UESC,
				offset::UTIM,
				offset::UFCR,
				offset::UBIR,
				offset::UBMR,
				offset::UCR2,
				offset::UCR1,
			]
		);
		assert_eq!(bus.writes()[0].1, 0);
		assert_eq!(bus.writes()[1].1, 0);

		/* the reset wait happens between disabling and UCR3 */
		let log = bus.log();
		let wait = log
			.iter()
			.position(|a| *a == Access::Read32(at(offset::UCR2)))
			.unwrap();
		let ucr3 = log
			.iter()
			.position(|a| matches!(a, Access::Write32(x, _)
				if *x == at(offset::UCR3)))
			.unwrap();
		assert!(wait < ucr3);
	}

	#[test]
	fn init_waits_for_reset_deassertion() {
		let bus = MockBus::new();
		bus.force_after(at(offset::UCR2), 1 << 0, 5);
		Uart::new(&bus, BASE).init(baud(115_200));

		/* five polls see the reset asserted, the sixth doesn't */
		assert_eq!(bus.reads_of(at(offset::UCR2)), 6);
	}

	#[test]
	fn numerator_tracks_clock_and_baud() {
		for (cscdr1, clk) in [
			(0, PLL3_FREQ),
			(3, PLL3_FREQ / 4),
			(1 << 6, OSC_FREQ),
		] {
			for b in [9600, 19_200, 57_600, 115_200, 230_400, 1_000_000] {
				let bus = MockBus::new();
				reset_done(&bus);
				bus.poke(CCM_CSCDR1, cscdr1);

				Uart::new(&bus, BASE).init(baud(b));

				assert_eq!(
					bus.peek(at(offset::UBMR)),
					(clk / 6) / (2 * b)
				);
				assert_eq!(bus.peek(at(offset::UBIR)), 15);
			}
		}
	}

	#[test]
	fn reinit_reprograms_everything() {
		let bus = MockBus::new();
		reset_done(&bus);
		let uart = Uart::new(&bus, BASE);

		uart.init(baud(115_200));
		let first = bus.writes();
		uart.init(baud(115_200));
		let all = bus.writes();

		assert_eq!(&all[first.len() ..], &first[..]);
		assert_eq!(uart.mode(), Mode::Running);
	}

	#[test]
	fn configure_validates_rate() {
		let bus = MockBus::new();
		reset_done(&bus);
		let uart = Uart::new(&bus, BASE);

		assert!(matches!(
			uart.configure(0),
			Err(ConfigError::BaudRate(_, _))
		));
		assert!(matches!(
			uart.configure(1),
			Err(ConfigError::BaudRate(_, _))
		));
		assert!(bus.writes().is_empty());
		assert_eq!(uart.mode(), Mode::Unknown);

		let brm = uart.configure(115_200).unwrap();
		assert_eq!(brm.ubmr, 347);
		assert_eq!(bus.peek(at(offset::UBMR)), 347);
	}

	#[test]
	fn baud_config_limits() {
		let clk = PLL3_FREQ;
		let Err(ConfigError::BaudRate(min, max)) = BaudConfig::new(clk, 0)
		else {
			panic!("zero baud accepted");
		};

		assert!(BaudConfig::new(clk, min).unwrap().ubmr <= 0xffff);
		assert!(BaudConfig::new(clk, min - 1).is_err());
		assert_eq!(BaudConfig::new(clk, max).unwrap().ubmr, 1);
		assert!(BaudConfig::new(clk, max + 1).is_err());
	}

	#[test]
	fn init_survives_out_of_range_rates() {
		for b in [0x8000_0000, u32::MAX, PLL3_FREQ / 6] {
			let bus = MockBus::new();
			reset_done(&bus);
			let uart = Uart::new(&bus, BASE);

			uart.init(baud(b));

			assert_eq!(uart.mode(), Mode::Running);
			assert_eq!(bus.peek(at(offset::UBMR)), 0);
			assert_eq!(bus.peek(at(offset::UBIR)), 15);
		}
		assert_eq!(BaudConfig::derive(PLL3_FREQ, baud(u32::MAX)).ubmr, 0);
	}

	#[test]
	fn actual_baud_is_close() {
		let brm = BaudConfig::derive(PLL3_FREQ, baud(115_200));
		let actual = brm.actual_baud(PLL3_FREQ);

		assert_eq!(actual, 114_942);
		assert!(115_200 - actual < 115_200 / 100);
	}

	#[test]
	fn tx_blocks_until_fifo_empty() {
		let bus = MockBus::new();
		bus.force_after(at(offset::UTS), 1 << 6, 3);
		let uart = Uart::new(&bus, BASE);

		uart.tx(b'A');

		assert_eq!(bus.peek(at(offset::UTXD)), u32::from(b'A'));
		assert_eq!(bus.reads_of(at(offset::UTS)), 4);
		assert_eq!(
			bus.log()[0],
			Access::Write32(at(offset::UTXD), u32::from(b'A'))
		);
	}

	#[test]
	fn rx_gated_by_ready() {
		let bus = MockBus::new();
		let uart = Uart::new(&bus, BASE);

		for urxd in [0, 0x8041, 0xffff_ffff] {
			bus.poke(at(offset::URXD), urxd);
			bus.poke(at(offset::USR2), 0xffff_fffe);
			assert_eq!(uart.rx(), None);
		}
		assert_eq!(bus.reads_of(at(offset::URXD)), 0);
	}

	#[test]
	fn rx_drops_errored_characters() {
		let bus = MockBus::new();
		let uart = Uart::new(&bus, BASE);
		bus.poke(at(offset::USR2), 1);

		for bit in 10 ..= 14 {
			bus.poke(at(offset::URXD), 1 << 15 | 1 << bit | 0x41);
			assert_eq!(uart.rx(), None, "error bit {bit}");
		}
		assert_eq!(bus.reads_of(at(offset::URXD)), 5);
	}

	#[test]
	fn rx_returns_clean_character() {
		let bus = MockBus::new();
		let uart = Uart::new(&bus, BASE);
		bus.poke(at(offset::USR2), 1);
		bus.poke(at(offset::URXD), 1 << 15 | 0x5a);

		assert_eq!(uart.rx(), Some(0x5a));
		assert_eq!(bus.reads_of(at(offset::URXD)), 1);
	}

	#[test]
	fn embedded_hal_traits() {
		let bus = MockBus::new();
		bus.force(at(offset::UTS), 1 << 6);
		let uart = Uart::new(&bus, BASE);
		let mut port = &uart;

		assert!(matches!(port.read(), Err(nb::Error::WouldBlock)));

		bus.poke(at(offset::USR2), 1);
		bus.poke(at(offset::URXD), 0x7e);
		assert!(matches!(block!(port.read()), Ok(0x7e)));

		port.bwrite_all(b"ok").unwrap();
		port.bflush().unwrap();
		let tx: Vec<u32> = bus
			.writes()
			.iter()
			.filter(|(a, _)| *a == at(offset::UTXD))
			.map(|(_, v)| *v)
			.collect();
		assert_eq!(tx, [u32::from(b'o'), u32::from(b'k')]);
	}

	#[test]
	fn instance_addresses() {
		assert_eq!(UART1.base(), 0x0202_0000);
		assert_eq!(UART2.base(), 0x021e_8000);
		assert_eq!(UART8.base(), 0x0202_4000);
		assert_eq!(UART2.regs.uts.addr(), 0x021e_80b4);
		assert_eq!(UART2.mode(), Mode::Unknown);
	}
}
