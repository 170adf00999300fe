// This file is part of mos64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

#[cfg(not(feature = "std"))]
use alloc::prelude::*;

use mos64_core::{Pin, Shared};

/// One device's three output pulls and three input pins onto the IEC
/// serial bus (the C64's CIA2 port A, or a drive's VIA1 port B).
pub struct BusNode {
    pub atn_out: Shared<Pin>,
    pub clk_out: Shared<Pin>,
    pub data_out: Shared<Pin>,
    pub atn_in: Shared<Pin>,
    pub clk_in: Shared<Pin>,
    pub data_in: Shared<Pin>,
}

/// The IEC bus: ATN, CLK and DATA, each a wired-AND of every attached
/// device's pull (any device driving a line low pulls the whole bus low).
/// Recomputed and republished to every device whenever a pull changes.
pub struct SerialBus {
    nodes: Vec<BusNode>,
}

impl SerialBus {
    pub fn new() -> Self {
        SerialBus { nodes: Vec::new() }
    }

    pub fn attach(&mut self, node: BusNode) {
        self.nodes.push(node);
        self.update();
    }

    /// Recomputes the three bus lines from every node's output pull and
    /// pushes the result back out to every node's input pin.
    pub fn update(&mut self) {
        let atn = self.nodes.iter().all(|n| n.atn_out.borrow().is_high());
        let clk = self.nodes.iter().all(|n| n.clk_out.borrow().is_high());
        let data = self.nodes.iter().all(|n| n.data_out.borrow().is_high());
        for node in &self.nodes {
            node.atn_in.borrow_mut().set(atn);
            node.clk_in.borrow_mut().set(clk);
            node.data_in.borrow_mut().set(data);
        }
    }
}

impl Default for SerialBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mos64_core::new_shared;

    fn make_node() -> BusNode {
        BusNode {
            atn_out: new_shared(Pin::new(true)),
            clk_out: new_shared(Pin::new(true)),
            data_out: new_shared(Pin::new(true)),
            atn_in: new_shared(Pin::new(true)),
            clk_in: new_shared(Pin::new(true)),
            data_in: new_shared(Pin::new(true)),
        }
    }

    #[test]
    fn any_device_pulling_low_drags_the_whole_bus_low() {
        let mut bus = SerialBus::new();
        let c64 = make_node();
        let drive = make_node();
        let drive_data_in = drive.data_in.clone();
        bus.attach(c64);
        bus.attach(drive);
        bus.nodes[1].data_out.borrow_mut().set_low();
        bus.update();
        assert!(drive_data_in.borrow().is_low());
    }

    #[test]
    fn all_devices_releasing_restores_the_line_high() {
        let mut bus = SerialBus::new();
        let c64 = make_node();
        let c64_clk_in = c64.clk_in.clone();
        bus.attach(c64);
        bus.nodes[0].clk_out.borrow_mut().set_low();
        bus.update();
        assert!(c64_clk_in.borrow().is_low());
        bus.nodes[0].clk_out.borrow_mut().set_high();
        bus.update();
        assert!(c64_clk_in.borrow().is_high());
    }
}
