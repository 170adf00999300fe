// This file is part of mos64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use core::slice::Iter;

use mos64_core::factory::Cpu;

use super::Condition;

pub struct Breakpoint {
    pub index: u16,
    pub address: u16,
    pub enabled: bool,
    pub condition: Option<Condition>,
    ignore: u16,
    autodelete: bool,
}

#[derive(Default)]
pub struct BreakpointManager {
    breakpoints: Vec<Breakpoint>,
    bp_index: u16,
}

impl BreakpointManager {
    pub fn new() -> Self {
        Self {
            breakpoints: Vec::new(),
            bp_index: 1,
        }
    }

    #[inline]
    pub fn check(&mut self, cpu: &dyn Cpu) -> Option<usize> {
        if self.breakpoints.is_empty() {
            return None;
        }
        let pc = cpu.get_pc();
        let bp_pos = self.breakpoints.iter_mut().position(|bp| {
            if bp.address == pc && bp.enabled {
                if bp.ignore == 0 {
                    bp.condition.as_ref().map_or(true, |cond| cond.eval(cpu))
                } else {
                    bp.ignore -= 1;
                    false
                }
            } else {
                false
            }
        });
        if let Some(pos) = bp_pos {
            if self.breakpoints[pos].autodelete {
                self.breakpoints.remove(pos);
            }
        }
        bp_pos
    }

    pub fn clear(&mut self) {
        self.breakpoints.clear();
    }

    pub fn enable_all(&mut self, enabled: bool) {
        for bp in self.breakpoints.iter_mut() {
            bp.enabled = enabled;
        }
    }

    pub fn get(&self, index: u16) -> Result<&Breakpoint, String> {
        self.breakpoints
            .iter()
            .find(|bp| bp.index == index)
            .ok_or_else(|| format!("Invalid index {}", index))
    }

    pub fn is_bp_present(&self) -> bool {
        self.breakpoints.iter().any(|bp| bp.enabled)
    }

    pub fn ignore(&mut self, index: u16, count: u16) -> Result<(), String> {
        match self.find_mut(index) {
            Some(bp) => {
                bp.ignore = count;
                Ok(())
            }
            None => Err(format!("Invalid index {}", index)),
        }
    }

    pub fn list(&self) -> Iter<Breakpoint> {
        self.breakpoints.iter()
    }

    pub fn remove(&mut self, index: u16) -> Result<(), String> {
        match self.breakpoints.iter().position(|bp| bp.index == index) {
            Some(pos) => {
                self.breakpoints.remove(pos);
                Ok(())
            }
            None => Err(format!("Invalid index {}", index)),
        }
    }

    pub fn set(&mut self, address: u16, autodelete: bool) -> u16 {
        let index = self.bp_index;
        let bp = Breakpoint {
            index,
            address,
            condition: None,
            enabled: true,
            ignore: 0,
            autodelete,
        };
        self.breakpoints.push(bp);
        self.bp_index += 1;
        index
    }

    pub fn set_condition(
        &mut self,
        index: u16,
        expr: &str,
        radix: Option<u32>,
    ) -> Result<(), String> {
        match self.find_mut(index) {
            Some(bp) => {
                let condition = Condition::parse(expr, radix)?;
                bp.condition = Some(condition);
                Ok(())
            }
            None => Err(format!("Invalid index {}", index)),
        }
    }

    pub fn set_enabled(&mut self, index: u16, enabled: bool) -> Result<(), String> {
        match self.find_mut(index) {
            Some(bp) => {
                bp.enabled = enabled;
                Ok(())
            }
            None => Err(format!("Invalid index {}", index)),
        }
    }

    fn find_mut(&mut self, index: u16) -> Option<&mut Breakpoint> {
        self.breakpoints.iter_mut().find(|bp| bp.index == index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeCpu {
        pc: u16,
    }

    impl Cpu for FakeCpu {
        fn get_register(&self, _reg: mos64_core::factory::Register) -> u8 {
            0
        }
        fn set_register(&mut self, _reg: mos64_core::factory::Register, _value: u8) {}
        fn get_pc(&self) -> u16 {
            self.pc
        }
        fn set_pc(&mut self, value: u16) {
            self.pc = value;
        }
        fn get_error_state(&self) -> mos64_core::factory::CpuErrorState {
            mos64_core::factory::CpuErrorState::Ok
        }
        fn clear_error_state(&mut self) {}
        fn set_breakpoint(&mut self, _address: u16, _tag: mos64_core::factory::BreakpointTag) {}
        fn clear_breakpoints(&mut self) {}
        fn clock(&mut self) {}
        fn reset(&mut self) {}
        fn read(&self, _address: u16) -> u8 {
            0
        }
        fn write(&mut self, _address: u16, _value: u8) {}
    }

    #[test]
    fn check_fires_only_at_set_address() {
        let mut bpm = BreakpointManager::new();
        bpm.set(0x1000, false);
        let cpu = FakeCpu { pc: 0x1000 };
        assert!(bpm.check(&cpu).is_some());
        let cpu = FakeCpu { pc: 0x2000 };
        assert!(bpm.check(&cpu).is_none());
    }

    #[test]
    fn autodelete_breakpoint_is_removed_after_hit() {
        let mut bpm = BreakpointManager::new();
        bpm.set(0x1000, true);
        let cpu = FakeCpu { pc: 0x1000 };
        assert!(bpm.check(&cpu).is_some());
        assert!(!bpm.is_bp_present());
    }

    #[test]
    fn ignore_count_suppresses_the_first_n_hits() {
        let mut bpm = BreakpointManager::new();
        let index = bpm.set(0x1000, false);
        bpm.ignore(index, 2).unwrap();
        let cpu = FakeCpu { pc: 0x1000 };
        assert!(bpm.check(&cpu).is_none());
        assert!(bpm.check(&cpu).is_none());
        assert!(bpm.check(&cpu).is_some());
    }
}
