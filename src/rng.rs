/*
 * Copyright 2026 Oxide Computer Company
 */

use spin::{Mutex, Once};
use tock_registers::register_bitfields;

use crate::reg::{Bus, Mmio, Register};
use crate::soc::{ChipIdentity, Family};

/* True Random Number Generator (RNGB), i.MX6ULL only. */
pub const RNGB_BASE: usize = 0x0228_4000;

pub mod offset {
	pub const CMD: usize = 0x04;
	pub const CR: usize = 0x08;
	pub const SR: usize = 0x0c;
	pub const ESR: usize = 0x10;
	pub const OUT: usize = 0x14;
}

register_bitfields! {
	u32,
	pub CMD [
		ST OFFSET(0) NUMBITS(1) [],
		GS OFFSET(1) NUMBITS(1) [],
		CI OFFSET(4) NUMBITS(1) [],
		CE OFFSET(5) NUMBITS(1) [],
		SR OFFSET(6) NUMBITS(1) []
	],

	pub CR [
		AR OFFSET(4) NUMBITS(1) [],
		MASKDONE OFFSET(5) NUMBITS(1) [],
		MASKERR OFFSET(6) NUMBITS(1) []
	],

	pub SR [
		BUSY OFFSET(1) NUMBITS(1) [],
		STDN OFFSET(4) NUMBITS(1) [],
		SDN OFFSET(5) NUMBITS(1) [],
		FIFO_LVL OFFSET(8) NUMBITS(4) [],
		ERR OFFSET(16) NUMBITS(1) [],
		ST_PF OFFSET(21) NUMBITS(1) []
	]
}

pub struct Rngb<B: Bus> {
	bus: B,
	cmd: Register<u32, CMD::Register>,
	cr: Register<u32, CR::Register>,
	sr: Register<u32, SR::Register>,
	out: Register<u32>,
	lock: Mutex<()>,
}

impl<B: Bus> Rngb<B> {
	pub const fn new(bus: B, base: usize) -> Self {
		Rngb {
			bus,
			cmd: Register::offset(base, offset::CMD),
			cr: Register::offset(base, offset::CR),
			sr: Register::offset(base, offset::SR),
			out: Register::offset(base, offset::OUT),
			lock: Mutex::new(()),
		}
	}

	/*
	 * Reset, self-test and seed the generator, leaving it reseeding
	 * itself automatically.
	 */
	pub fn init(&self) {
		let _guard = self.lock.lock();
		let bus = &self.bus;

		self.cmd.set(bus, CMD::SR);

		self.cmd.set(bus, CMD::ST);
		self.sr.wait(bus, SR::STDN, 1);

		self.cr.set(bus, CR::AR);

		self.cmd.set(bus, CMD::GS);
		self.sr.wait(bus, SR::SDN, 1);

		self.cmd.set(bus, CMD::CI);
	}

	/* Fill `buf` from the output FIFO, waiting for it as needed. */
	pub fn fill(&self, buf: &mut [u8]) {
		let _guard = self.lock.lock();
		let bus = &self.bus;

		for chunk in buf.chunks_mut(4) {
			while (self.sr.get(bus, SR::FIFO_LVL) == 0) {
				core::hint::spin_loop();
			}
			let val = self.out.read(bus).to_le_bytes();
			chunk.copy_from_slice(&val[.. chunk.len()]);
		}
	}
}

/*
 * Numerical Recipes LCG.  This is not random in any sense that matters; it
 * exists so that consumers of entropy have something to call on parts (and
 * emulators) without an RNGB.
 */
pub struct Lcg {
	state: u32,
}

impl Lcg {
	pub const fn new(seed: u32) -> Self {
		Lcg { state: seed }
	}

	pub fn reseed(&mut self, seed: u32) {
		self.state = seed;
	}

	pub fn next_u32(&mut self) -> u32 {
		self.state = self
			.state
			.wrapping_mul(1_664_525)
			.wrapping_add(1_013_904_223);
		self.state
	}

	pub fn fill(&mut self, buf: &mut [u8]) {
		for chunk in buf.chunks_mut(4) {
			let val = self.next_u32().to_le_bytes();
			chunk.copy_from_slice(&val[.. chunk.len()]);
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Source {
	Rngb,
	Lcg,
}

/* The RNGB is only trusted on real i.MX6ULL silicon. */
pub fn select(id: &ChipIdentity) -> Source {
	match (id.family, id.native) {
		(Family::Imx6ULL, true) => Source::Rngb,
		_ => Source::Lcg,
	}
}

/*
 * The entropy source is bound once.  Until it is, and whenever the binding
 * is the LCG, requests are served by the LCG.
 */
pub struct Entropy<B: Bus> {
	rngb: Rngb<B>,
	lcg: Mutex<Lcg>,
	source: Once<Source>,
}

impl<B: Bus> Entropy<B> {
	pub const fn new(rngb: Rngb<B>) -> Self {
		Entropy {
			rngb,
			lcg: Mutex::new(Lcg::new(0)),
			source: Once::new(),
		}
	}

	/*
	 * Choose and start the source for `id`.  Later calls return the
	 * first choice and change nothing.
	 */
	pub fn bind(&self, id: &ChipIdentity, seed: u32) -> Source {
		*self.source.call_once(|| {
			let src = select(id);
			match (src) {
				Source::Rngb => self.rngb.init(),
				Source::Lcg => self.lcg.lock().reseed(seed),
			}
			src
		})
	}

	pub fn source(&self) -> Option<Source> {
		self.source.get().copied()
	}

	pub fn fill(&self, buf: &mut [u8]) {
		match (self.source()) {
			Some(Source::Rngb) => self.rngb.fill(buf),
			_ => self.lcg.lock().fill(buf),
		}
	}
}

pub static ENTROPY: Entropy<Mmio> =
	Entropy::new(Rngb::new(unsafe { Mmio::new() }, RNGB_BASE));

pub fn get_random_data(buf: &mut [u8]) {
	ENTROPY.fill(buf)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::reg::mock::MockBus;

	fn identity(digprog: u32) -> ChipIdentity {
		ChipIdentity::from_digprog(digprog)
	}

	fn ready_rngb(bus: &MockBus) {
		/* self test and seed done, four words in the FIFO */
		bus.force(RNGB_BASE + offset::SR, 1 << 4 | 1 << 5 | 4 << 8);
	}

	#[test]
	fn selection() {
		assert_eq!(select(&identity(0x0065_0102)), Source::Rngb);
		assert_eq!(select(&identity(0x0065_0000)), Source::Lcg);
		assert_eq!(select(&identity(0x0064_0102)), Source::Lcg);
		assert_eq!(select(&identity(0x0063_0102)), Source::Lcg);
		assert_eq!(select(&identity(0x0042_0102)), Source::Lcg);
	}

	#[test]
	fn emulated_imx6ull_binds_fallback() {
		let bus = MockBus::new();
		let e = Entropy::new(Rngb::new(&bus, RNGB_BASE));

		assert_eq!(e.bind(&identity(0x0065_0000), 7), Source::Lcg);
		/* the RNGB is never touched */
		assert!(bus.log().is_empty());

		let mut buf = [0u8; 6];
		e.fill(&mut buf);
		let mut lcg = Lcg::new(7);
		let mut expect = [0u8; 6];
		lcg.fill(&mut expect);
		assert_eq!(buf, expect);
		assert!(bus.log().is_empty());
	}

	#[test]
	fn native_imx6ull_binds_rngb() {
		let bus = MockBus::new();
		ready_rngb(&bus);
		let e = Entropy::new(Rngb::new(&bus, RNGB_BASE));

		assert_eq!(e.source(), None);
		assert_eq!(e.bind(&identity(0x0065_0102), 0), Source::Rngb);
		assert_eq!(e.source(), Some(Source::Rngb));

		let cmd = bus.peek(RNGB_BASE + offset::CMD);
		let want = 1 << 6 | 1 << 1 | 1 << 0;
		assert_eq!(cmd & want, want);
		assert_eq!(bus.peek(RNGB_BASE + offset::CR), 1 << 4);

		bus.poke(RNGB_BASE + offset::OUT, 0xddcc_bbaa);
		let mut buf = [0u8; 7];
		e.fill(&mut buf);
		assert_eq!(buf, [0xaa, 0xbb, 0xcc, 0xdd, 0xaa, 0xbb, 0xcc]);
	}

	#[test]
	fn binding_is_one_time() {
		let bus = MockBus::new();
		ready_rngb(&bus);
		let e = Entropy::new(Rngb::new(&bus, RNGB_BASE));

		assert_eq!(e.bind(&identity(0x0064_0102), 1), Source::Lcg);
		assert_eq!(e.bind(&identity(0x0065_0102), 1), Source::Lcg);
		assert!(bus.log().is_empty());
	}

	#[test]
	fn rngb_waits_for_fifo() {
		let bus = MockBus::new();
		let sr = RNGB_BASE + offset::SR;
		bus.force_after(sr, 1 << 8, 3);
		let rngb = Rngb::new(&bus, RNGB_BASE);

		let mut buf = [0u8; 4];
		rngb.fill(&mut buf);
		assert_eq!(bus.reads_of(sr), 4);
		assert_eq!(bus.reads_of(RNGB_BASE + offset::OUT), 1);
	}

	#[test]
	fn lcg_is_deterministic() {
		let mut a = Lcg::new(42);
		let mut b = Lcg::new(42);
		let (mut x, mut y) = ([0u8; 33], [0u8; 33]);

		a.fill(&mut x);
		b.fill(&mut y);
		assert_eq!(x, y);
		assert_ne!(x, [0u8; 33]);

		let mut c = Lcg::new(0);
		assert_eq!(c.next_u32(), 1_013_904_223);
	}
}
