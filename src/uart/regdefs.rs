/*
 * Copyright 2026 Oxide Computer Company
 */

/*
 * p2315, 45.15 UART Memory Map/Register Definition, IMX6ULLRM.  Only the
 * registers and fields the driver touches are described.
 */

use tock_registers::register_bitfields;

/// Register offsets from each UART's base address.
pub mod offset {
	use static_assertions::*;

	pub const URXD: usize = 0x00;
	pub const UTXD: usize = 0x40;
	pub const UCR1: usize = 0x80;
	pub const UCR2: usize = 0x84;
	pub const UCR3: usize = 0x88;
	pub const UCR4: usize = 0x8c;
	pub const UFCR: usize = 0x90;
	pub const USR2: usize = 0x98;
	pub const UESC: usize = 0x9c;
	pub const UTIM: usize = 0xa0;
	pub const UBIR: usize = 0xa4;
	pub const UBMR: usize = 0xa8;
	pub const UTS: usize = 0xb4;

	/// Size of each UART's register window.
	pub const BLOCK_SIZE: usize = 0x4000;

	const_assert!(UTS < BLOCK_SIZE);
	const_assert!(URXD % 4 == 0 && UTXD % 4 == 0 && UTS % 4 == 0);
	const_assert!(UBIR + 4 == UBMR);
}

register_bitfields! {
	u32,
	pub URXD [
		RX_DATA OFFSET(0) NUMBITS(8) [],
		/* PRERR, BRK, FRMERR, OVRRUN and ERR as one field */
		ERRORS OFFSET(10) NUMBITS(5) [],
		PRERR OFFSET(10) NUMBITS(1) [],
		BRK OFFSET(11) NUMBITS(1) [],
		FRMERR OFFSET(12) NUMBITS(1) [],
		OVRRUN OFFSET(13) NUMBITS(1) [],
		ERR OFFSET(14) NUMBITS(1) [],
		CHARRDY OFFSET(15) NUMBITS(1) []
	],

	pub UTXD [
		TX_DATA OFFSET(0) NUMBITS(8) []
	],

	pub UCR1 [
		UARTEN OFFSET(0) NUMBITS(1) [],
		DOZE OFFSET(1) NUMBITS(1) [],
		ATDMAEN OFFSET(2) NUMBITS(1) [],
		TXDMAEN OFFSET(3) NUMBITS(1) [],
		SNDBRK OFFSET(4) NUMBITS(1) [],
		RTSDEN OFFSET(5) NUMBITS(1) [],
		TXMPTYEN OFFSET(6) NUMBITS(1) [],
		IREN OFFSET(7) NUMBITS(1) [],
		RXDMAEN OFFSET(8) NUMBITS(1) [],
		RRDYEN OFFSET(9) NUMBITS(1) [],
		ICD OFFSET(10) NUMBITS(2) [],
		IDEN OFFSET(12) NUMBITS(1) [],
		TRDYEN OFFSET(13) NUMBITS(1) [],
		ADBR OFFSET(14) NUMBITS(1) [],
		ADEN OFFSET(15) NUMBITS(1) []
	],

	pub UCR2 [
		SRST OFFSET(0) NUMBITS(1) [],
		RXEN OFFSET(1) NUMBITS(1) [],
		TXEN OFFSET(2) NUMBITS(1) [],
		ATEN OFFSET(3) NUMBITS(1) [],
		RTSEN OFFSET(4) NUMBITS(1) [],
		WS OFFSET(5) NUMBITS(1) [],
		STPB OFFSET(6) NUMBITS(1) [],
		PROE OFFSET(7) NUMBITS(1) [],
		PREN OFFSET(8) NUMBITS(1) [],
		RTEC OFFSET(9) NUMBITS(2) [],
		ESCEN OFFSET(11) NUMBITS(1) [],
		CTS OFFSET(12) NUMBITS(1) [],
		CTSC OFFSET(13) NUMBITS(1) [],
		IRTS OFFSET(14) NUMBITS(1) [],
		ESCI OFFSET(15) NUMBITS(1) []
	],

	pub UCR3 [
		ACIEN OFFSET(0) NUMBITS(1) [],
		INVT OFFSET(1) NUMBITS(1) [],
		RXDMUXSEL OFFSET(2) NUMBITS(1) [],
		DTRDEN OFFSET(3) NUMBITS(1) [],
		AWAKEN OFFSET(4) NUMBITS(1) [],
		AIRINTEN OFFSET(5) NUMBITS(1) [],
		RXDSEN OFFSET(6) NUMBITS(1) [],
		ADNIMP OFFSET(7) NUMBITS(1) [],
		RI OFFSET(8) NUMBITS(1) [],
		DCD OFFSET(9) NUMBITS(1) [],
		DSR OFFSET(10) NUMBITS(1) [],
		FRAERREN OFFSET(11) NUMBITS(1) [],
		PARERREN OFFSET(12) NUMBITS(1) [],
		DTREN OFFSET(13) NUMBITS(1) [],
		DPEC OFFSET(14) NUMBITS(2) []
	],

	pub UCR4 [
		CTSTL OFFSET(10) NUMBITS(6) []
	],

	pub UFCR [
		RXTL OFFSET(0) NUMBITS(6) [],
		DCEDTE OFFSET(6) NUMBITS(1) [],
		RFDIV OFFSET(7) NUMBITS(3) [
			DivideBy6 = 0b000,
			DivideBy5 = 0b001,
			DivideBy4 = 0b010,
			DivideBy3 = 0b011,
			DivideBy2 = 0b100,
			DivideBy1 = 0b101,
			DivideBy7 = 0b110
		],
		TXTL OFFSET(10) NUMBITS(6) []
	],

	pub USR2 [
		RDR OFFSET(0) NUMBITS(1) []
	],

	pub UTS [
		TXEMPTY OFFSET(6) NUMBITS(1) []
	]
}
