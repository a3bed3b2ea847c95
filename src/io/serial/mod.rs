// src/io/serial/mod.rs
//
// Serial port transport for desktop platforms.
//
// Features:
// - serialport-backed transport with an exclusive threaded reader
// - port enumeration with USB descriptor details

pub mod reader;

pub use reader::{list_serial_ports, SerialConfig, SerialPortTransport};
