//! CLI implementation for `sketchforge ports`

use crate::cli::output::print_block;
use crate::infra::serial::{DevicePorts, PortLister};

/// List the serial ports attached right now
pub fn execute() {
    print_block("Serial ports", &DevicePorts::system().list_ports());
}
