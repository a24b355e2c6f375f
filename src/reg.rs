/*
 * Copyright 2026 Oxide Computer Company
 */

use core::marker::PhantomData;
use core::ptr;

use tock_registers::fields::{Field, FieldValue};
use tock_registers::{LocalRegisterCopy, RegisterLongName, UIntLike};

/*
 * Every access to a peripheral goes through a Bus.  The bus knows nothing of
 * register layouts; it moves words of an exact width to and from a physical
 * address.  Nothing we touch on this SoC is 8 or 64 bits wide, so there are
 * no accessors for those widths.
 */
pub trait Bus {
	fn read32(&self, addr: usize) -> u32;
	fn write32(&self, addr: usize, val: u32);
	fn read16(&self, addr: usize) -> u16;
	fn write16(&self, addr: usize, val: u16);
}

impl<B: Bus + ?Sized> Bus for &B {
	fn read32(&self, addr: usize) -> u32 {
		(**self).read32(addr)
	}

	fn write32(&self, addr: usize, val: u32) {
		(**self).write32(addr, val)
	}

	fn read16(&self, addr: usize) -> u16 {
		(**self).read16(addr)
	}

	fn write16(&self, addr: usize, val: u16) {
		(**self).write16(addr, val)
	}
}

/* Direct, uncached, volatile access to physical memory. */
pub struct Mmio {
	_private: (),
}

impl Mmio {
	/// # Safety
	///
	/// The caller asserts that physical addresses are identity mapped
	/// (or the MMU is off) and that every address later handed to this bus
	/// names a device register of the width used to access it.
	pub const unsafe fn new() -> Self {
		Mmio { _private: () }
	}
}

/*
 * Safety: for all four accessors, the contract established by Mmio::new()
 * makes addr a valid, aligned device register of the stated width.
 */
impl Bus for Mmio {
	fn read32(&self, addr: usize) -> u32 {
		unsafe { ptr::read_volatile(addr as *const u32) }
	}

	fn write32(&self, addr: usize, val: u32) {
		unsafe { ptr::write_volatile(addr as *mut u32, val) }
	}

	fn read16(&self, addr: usize) -> u16 {
		unsafe { ptr::read_volatile(addr as *const u16) }
	}

	fn write16(&self, addr: usize, val: u16) {
		unsafe { ptr::write_volatile(addr as *mut u16, val) }
	}
}

/* The shared volatile bus used by every hardware-facing singleton. */
pub static MMIO: Mmio = unsafe { Mmio::new() };

/* Access width of a register, tied to the matching `Bus` accessor. */
pub trait Width: UIntLike {
	fn load<B: Bus + ?Sized>(bus: &B, addr: usize) -> Self;
	fn store<B: Bus + ?Sized>(bus: &B, addr: usize, val: Self);
}

impl Width for u32 {
	fn load<B: Bus + ?Sized>(bus: &B, addr: usize) -> Self {
		bus.read32(addr)
	}

	fn store<B: Bus + ?Sized>(bus: &B, addr: usize, val: Self) {
		bus.write32(addr, val)
	}
}

impl Width for u16 {
	fn load<B: Bus + ?Sized>(bus: &B, addr: usize) -> Self {
		bus.read16(addr)
	}

	fn store<B: Bus + ?Sized>(bus: &B, addr: usize, val: Self) {
		bus.write16(addr, val)
	}
}

/*
 * A register is an address bound to an access width and a bitfield layout.
 * Both are part of the type: a Register<u16, _> can only ever be accessed
 * with read16()/write16(), and fields of one register can't be applied to
 * another.  Registers are plain values computed from a base and an offset;
 * they hold no state of their own.
 */
pub struct Register<T: Width, R: RegisterLongName = ()> {
	addr: usize,
	_layout: PhantomData<(T, R)>,
}

impl<T: Width, R: RegisterLongName> Clone for Register<T, R> {
	fn clone(&self) -> Self {
		*self
	}
}

impl<T: Width, R: RegisterLongName> Copy for Register<T, R> {}

impl<T: Width, R: RegisterLongName> Register<T, R> {
	pub const fn at(addr: usize) -> Self {
		Register {
			addr,
			_layout: PhantomData,
		}
	}

	pub const fn offset(base: usize, off: usize) -> Self {
		Self::at(base + off)
	}

	pub const fn addr(&self) -> usize {
		self.addr
	}

	pub fn read<B: Bus + ?Sized>(&self, bus: &B) -> T {
		T::load(bus, self.addr)
	}

	pub fn write<B: Bus + ?Sized>(&self, bus: &B, val: T) {
		T::store(bus, self.addr, val)
	}

	/*
	 * Snapshot the register so that several fields can be examined
	 * from a single access.
	 */
	pub fn extract<B: Bus + ?Sized>(
		&self,
		bus: &B,
	) -> LocalRegisterCopy<T, R> {
		LocalRegisterCopy::new(self.read(bus))
	}

	pub fn get<B: Bus + ?Sized>(&self, bus: &B, field: Field<T, R>) -> T {
		field.read(self.read(bus))
	}

	pub fn is_set<B: Bus + ?Sized>(&self, bus: &B, field: Field<T, R>) -> bool {
		field.is_set(self.read(bus))
	}

	/* Read-modify-write: only the bits covered by `fv` change. */
	pub fn modify<B: Bus + ?Sized>(&self, bus: &B, fv: FieldValue<T, R>) {
		let mut r = self.extract(bus);
		r.modify(fv);
		self.write(bus, r.get());
	}

	/* Write `fv` with every bit it does not cover cleared. */
	pub fn write_fields<B: Bus + ?Sized>(
		&self,
		bus: &B,
		fv: FieldValue<T, R>,
	) {
		let mut r = LocalRegisterCopy::new(T::zero());
		r.write(fv);
		self.write(bus, r.get());
	}

	pub fn set<B: Bus + ?Sized>(&self, bus: &B, field: Field<T, R>) {
		let v = self.read(bus);
		self.write(bus, v | (field.mask << field.shift));
	}

	pub fn clear<B: Bus + ?Sized>(&self, bus: &B, field: Field<T, R>) {
		let v = self.read(bus);
		self.write(bus, v & !(field.mask << field.shift));
	}

	/*
	 * There is no timeout.  Nothing this early has a timer to measure one
	 * against, and nothing that calls this has anything better to do than
	 * wait; a peripheral that never answers stops the machine here.
	 */
	pub fn wait<B: Bus + ?Sized>(
		&self,
		bus: &B,
		field: Field<T, R>,
		expected: T,
	) {
		while (self.get(bus, field) != expected) {
			core::hint::spin_loop();
		}
	}
}
