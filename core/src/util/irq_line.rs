// This file is part of mos64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use bit_field::BitField;
use log::LogLevel;

/// A wired-OR interrupt line: any source pulling it low asserts the line,
/// and only that source's own `set_low(source, false)` releases it.
pub struct IrqLine {
    #[allow(unused)]
    kind: &'static str,
    signal: u8,
}

impl IrqLine {
    pub fn new(kind: &'static str) -> Self {
        Self { kind, signal: 0 }
    }

    pub fn is_low(&self) -> bool {
        self.signal != 0
    }

    pub fn reset(&mut self) {
        self.signal = 0;
    }

    pub fn set_low(&mut self, source: usize, value: bool) {
        if log_enabled!(LogLevel::Trace) {
            trace!(
                target: "cpu::int", "{}.{} {}",
                self.kind,
                source,
                if value { "set" } else { "cleared" }
            );
        }
        self.signal.set_bit(source, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiple_sources_or_together() {
        let mut line = IrqLine::new("irq");
        line.set_low(0, true);
        line.set_low(1, true);
        assert!(line.is_low());
        line.set_low(0, false);
        assert!(line.is_low());
        line.set_low(1, false);
        assert!(!line.is_low());
    }
}
