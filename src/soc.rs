/*
 * Copyright 2026 Oxide Computer Company
 */

/*
 * Identification of the SoC we are running on: family and silicon revision
 * from the analog block's DIGPROG register (IMX6ULLRM 57.4.11), and the
 * 64-bit device unique ID from the OCOTP shadow registers.
 */

use spin::Once;
use tock_registers::register_bitfields;

use crate::reg::{Bus, Register, MMIO};

pub const USB_ANALOG_DIGPROG: usize = 0x020c_8260;
pub const OCOTP_CFG0: usize = 0x021b_c410;
pub const OCOTP_CFG1: usize = 0x021b_c420;

register_bitfields! {
	u32,
	pub DIGPROG [
		MAJOR_UPPER OFFSET(16) NUMBITS(8) [],
		MAJOR_LOWER OFFSET(8) NUMBITS(8) [],
		MINOR OFFSET(0) NUMBITS(8) []
	]
}

const DIGPROG_REG: Register<u32, DIGPROG::Register> =
	Register::at(USB_ANALOG_DIGPROG);
const CFG0: Register<u32> = Register::at(OCOTP_CFG0);
const CFG1: Register<u32> = Register::at(OCOTP_CFG1);

pub const IMX6Q: u8 = 0x63;
pub const IMX6UL: u8 = 0x64;
pub const IMX6ULL: u8 = 0x65;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Family {
	Imx6Q,
	Imx6UL,
	Imx6ULL,
	Unknown(u8),
}

impl Family {
	pub fn from_code(code: u8) -> Self {
		match (code) {
			IMX6Q => Family::Imx6Q,
			IMX6UL => Family::Imx6UL,
			IMX6ULL => Family::Imx6ULL,
			c => Family::Unknown(c),
		}
	}

	pub fn code(&self) -> u8 {
		match (*self) {
			Family::Imx6Q => IMX6Q,
			Family::Imx6UL => IMX6UL,
			Family::Imx6ULL => IMX6ULL,
			Family::Unknown(c) => c,
		}
	}

	pub fn model(&self) -> &'static str {
		match (*self) {
			Family::Imx6Q => "i.MX6Q",
			Family::Imx6UL => "i.MX6UL",
			Family::Imx6ULL => "i.MX6ULL",
			Family::Unknown(_) => "unknown",
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChipIdentity {
	pub family: Family,
	pub rev_major: u8,
	pub rev_minor: u8,
	/// Real silicon.  QEMU reports revision 0.0; no shipped part does.
	pub native: bool,
}

impl ChipIdentity {
	pub fn from_digprog(sv: u32) -> Self {
		let family = DIGPROG::MAJOR_UPPER.read(sv) as u8;
		let rev_major = DIGPROG::MAJOR_LOWER.read(sv) as u8;
		let rev_minor = DIGPROG::MINOR.read(sv) as u8;

		ChipIdentity {
			family: Family::from_code(family),
			rev_major,
			rev_minor,
			native: rev_major != 0 || rev_minor != 0,
		}
	}

	pub fn model(&self) -> &'static str {
		self.family.model()
	}
}

/// Raw chip silicon version word along with its decoding.
pub fn silicon_version<B: Bus + ?Sized>(bus: &B) -> (u32, ChipIdentity) {
	let sv = DIGPROG_REG.read(bus);
	(sv, ChipIdentity::from_digprog(sv))
}

pub fn identify<B: Bus + ?Sized>(bus: &B) -> ChipIdentity {
	silicon_version(bus).1
}

/// The NXP device unique 64-bit ID, CFG0 in the low half, little-endian.
pub fn unique_id<B: Bus + ?Sized>(bus: &B) -> [u8; 8] {
	let mut uid = [0u8; 8];
	uid[0 .. 4].copy_from_slice(&CFG0.read(bus).to_le_bytes());
	uid[4 .. 8].copy_from_slice(&CFG1.read(bus).to_le_bytes());
	uid
}

static CHIP: Once<ChipIdentity> = Once::new();

/*
 * Only the first identity recorded sticks.  Bring-up records it before
 * anything that could read it is running, so readers never race the write.
 */
pub(crate) fn record(id: ChipIdentity) -> ChipIdentity {
	*CHIP.call_once(|| id)
}

/// The identity recorded at bring-up, if bring-up has run.
pub fn chip() -> Option<ChipIdentity> {
	CHIP.get().copied()
}

/// The model name of the running SoC, "unknown" before bring-up.
pub fn model() -> &'static str {
	chip().map_or("unknown", |c| c.model())
}

pub fn uid() -> [u8; 8] {
	unique_id(&MMIO)
}
