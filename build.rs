#![allow(unused_parens)]

use std::env;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

struct Defs {
	console_baud_rate: u32,
	console_dev_name: &'static str,
}

/*
 * On the USB armory Mk II the serial console is UART2, exposed through the
 * USB Type-C receptacle in debug accessory mode.
 */
static DEFS: Defs = Defs {
	console_baud_rate: 115_200,
	console_dev_name: "UART2",
};

/*
 * The fastest UART module clock is PLL3 (480 MHz) behind the fixed /6.  Any
 * rate above half of that leaves UBMR at 0.
 */
const MAX_BAUD_RATE: u32 = 480_000_000 / 6 / 2;

const UART_NAMES: [&str; 8] = [
	"UART1", "UART2", "UART3", "UART4", "UART5", "UART6", "UART7", "UART8",
];

fn main() {
	let out = &PathBuf::from(env::var_os("OUT_DIR").unwrap());
	let mut con_file = File::create(out.join("condefs.rs")).unwrap();

	let baud = env::var("IMX6_CONSOLE_BAUD_RATE")
		.unwrap_or_else(|_| DEFS.console_baud_rate.to_string())
		.parse::<u32>()
		.unwrap_or(DEFS.console_baud_rate);
	assert_ne!(baud, 0, "Console baud rate must be nonzero");
	assert!(
		baud <= MAX_BAUD_RATE,
		"Console baud rate must not exceed {MAX_BAUD_RATE}, not {baud}",
	);

	let dev = env::var("IMX6_CONSOLE_DEV_NAME")
		.unwrap_or_else(|_| DEFS.console_dev_name.to_string());
	assert!(
		UART_NAMES.contains(&dev.as_str()),
		"Console device must be one of {UART_NAMES:?}, not {dev}",
	);

	writeln!(con_file, "const CON_BAUD_RATE: u32 = {baud};").unwrap();
	writeln!(con_file, "console!({dev}, CON_BAUD_RATE);").unwrap();

	println!("cargo:rerun-if-env-changed=IMX6_CONSOLE_BAUD_RATE");
	println!("cargo:rerun-if-env-changed=IMX6_CONSOLE_DEV_NAME");
}
