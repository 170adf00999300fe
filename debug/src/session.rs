// This file is part of mos64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use std::sync::mpsc::Sender;

use mos64_core::factory::Register;
use mos64_system::C64;

use super::{Command, CommandResult, RegData, RegOp};

/// Turns `Command`s received over a `Debugger`/`RapServer` connection into
/// actions against a running `C64`, replying on whichever sender the last
/// `Attach` provided. Only one connection is expected to be attached at a
/// time, matching the single debugger console the wire protocols support.
pub struct Session {
    response_tx: Option<Sender<CommandResult>>,
    quit: bool,
}

impl Session {
    pub fn new() -> Self {
        Self {
            response_tx: None,
            quit: false,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub fn execute(&mut self, c64: &mut C64, command: Command) {
        let result = match self.execute_internal(c64, command) {
            Ok(result) => result,
            Err(error) => CommandResult::Error(error),
        };
        if let Some(tx) = &self.response_tx {
            let _ = tx.send(result);
        }
    }

    fn execute_internal(&mut self, c64: &mut C64, command: Command) -> Result<CommandResult, String> {
        match command {
            Command::Attach(tx) => self.attach(tx),
            Command::Detach => self.detach(),
            // Breakpoint
            Command::BpClear => self.bp_clear(c64),
            Command::BpCondition(index, expr, radix) => self.bp_condition(c64, index, &expr, radix),
            Command::BpDisable(index) => self.bp_set_enabled(c64, index, false),
            Command::BpDisableAll => self.bp_enable_all(c64, false),
            Command::BpEnable(index) => self.bp_set_enabled(c64, index, true),
            Command::BpEnableAll => self.bp_enable_all(c64, true),
            Command::BpIgnore(index, count) => self.bp_ignore(c64, index, count),
            Command::BpList => self.bp_list(c64),
            Command::BpRemove(index) => self.bp_remove(c64, index),
            Command::BpSet(address, autodelete) => self.bp_set(c64, address, autodelete),
            // Debugger
            Command::Continue => self.cont(c64),
            Command::RegRead => self.reg_read(c64),
            Command::RegWrite(ops) => self.reg_write(c64, ops),
            Command::Step => self.step(c64),
            // Memory
            Command::MemRead(start, end) => self.mem_read(c64, start, end),
            Command::MemWrite(address, data) => self.mem_write(c64, address, data),
            // System
            Command::SysQuit => self.sys_quit(),
            Command::SysReset(hard) => self.sys_reset(c64, hard),
            Command::SysScreen => self.sys_screen(c64),
            Command::SysStopwatch(reset) => self.sys_stopwatch(c64, reset),
        }
    }

    // -- Session

    fn attach(&mut self, tx: Sender<CommandResult>) -> Result<CommandResult, String> {
        self.response_tx = Some(tx);
        Ok(CommandResult::Unit)
    }

    fn detach(&mut self) -> Result<CommandResult, String> {
        self.response_tx = None;
        Ok(CommandResult::Unit)
    }

    // -- Breakpoint

    fn bp_clear(&mut self, c64: &mut C64) -> Result<CommandResult, String> {
        c64.get_bpm_mut().clear();
        Ok(CommandResult::Unit)
    }

    fn bp_condition(
        &mut self,
        c64: &mut C64,
        index: u16,
        expr: &str,
        radix: u32,
    ) -> Result<CommandResult, String> {
        c64.get_bpm_mut().set_condition(index, expr, Some(radix))?;
        Ok(CommandResult::Text(format!(
            "Bp {}: condition {}\n",
            index, expr
        )))
    }

    fn bp_enable_all(&mut self, c64: &mut C64, enabled: bool) -> Result<CommandResult, String> {
        c64.get_bpm_mut().enable_all(enabled);
        Ok(CommandResult::Unit)
    }

    fn bp_ignore(&mut self, c64: &mut C64, index: u16, count: u16) -> Result<CommandResult, String> {
        c64.get_bpm_mut().ignore(index, count)?;
        Ok(CommandResult::Unit)
    }

    fn bp_list(&mut self, c64: &mut C64) -> Result<CommandResult, String> {
        let mut buffer = String::new();
        for bp in c64.get_bpm().list() {
            buffer.push_str(
                format!(
                    "Bp {}: ${:04x} {}\n",
                    bp.index,
                    bp.address,
                    if bp.enabled { "enabled" } else { "disabled" }
                )
                .as_str(),
            );
        }
        Ok(CommandResult::Text(buffer))
    }

    fn bp_remove(&mut self, c64: &mut C64, index: u16) -> Result<CommandResult, String> {
        c64.get_bpm_mut().remove(index)?;
        Ok(CommandResult::Unit)
    }

    fn bp_set(
        &mut self,
        c64: &mut C64,
        address: u16,
        autodelete: bool,
    ) -> Result<CommandResult, String> {
        let index = c64.get_bpm_mut().set(address, autodelete);
        Ok(CommandResult::Text(format!(
            "Bp {}: ${:04x}\n",
            index, address
        )))
    }

    fn bp_set_enabled(
        &mut self,
        c64: &mut C64,
        index: u16,
        enabled: bool,
    ) -> Result<CommandResult, String> {
        c64.get_bpm_mut().set_enabled(index, enabled)?;
        Ok(CommandResult::Unit)
    }

    // -- Debugger

    fn cont(&mut self, c64: &mut C64) -> Result<CommandResult, String> {
        loop {
            c64.step();
            if c64.check_breakpoints() {
                break;
            }
        }
        Ok(CommandResult::Unit)
    }

    fn reg_read(&mut self, c64: &mut C64) -> Result<CommandResult, String> {
        Ok(CommandResult::Registers(Self::read_regs(c64)))
    }

    fn reg_write(&mut self, c64: &mut C64, ops: Vec<RegOp>) -> Result<CommandResult, String> {
        let cpu = c64.get_cpu_mut();
        for op in ops {
            match op {
                RegOp::SetA(value) => cpu.set_register(Register::A, value),
                RegOp::SetX(value) => cpu.set_register(Register::X, value),
                RegOp::SetY(value) => cpu.set_register(Register::Y, value),
                RegOp::SetP(value) => cpu.set_register(Register::P, value),
                RegOp::SetSP(value) => cpu.set_register(Register::Sp, value),
                RegOp::SetPC(value) => cpu.set_pc(value),
            }
        }
        Ok(CommandResult::Unit)
    }

    fn step(&mut self, c64: &mut C64) -> Result<CommandResult, String> {
        c64.step();
        let bp_hit = if c64.check_breakpoints() { 1 } else { 0 };
        Ok(CommandResult::Number(bp_hit))
    }

    // -- Memory

    fn mem_read(&mut self, c64: &mut C64, start: u16, end: u16) -> Result<CommandResult, String> {
        let cpu = c64.get_cpu();
        let mut buffer = Vec::new();
        let mut address = start;
        while address < end {
            buffer.push(cpu.read(address));
            address = address.wrapping_add(1);
        }
        Ok(CommandResult::Buffer(buffer))
    }

    fn mem_write(
        &mut self,
        c64: &mut C64,
        address: u16,
        data: Vec<u8>,
    ) -> Result<CommandResult, String> {
        let cpu = c64.get_cpu_mut();
        let mut addr = address;
        for byte in data {
            cpu.write(addr, byte);
            addr = addr.wrapping_add(1);
        }
        Ok(CommandResult::Unit)
    }

    // -- System

    fn sys_quit(&mut self) -> Result<CommandResult, String> {
        self.quit = true;
        Ok(CommandResult::Unit)
    }

    fn sys_reset(&mut self, c64: &mut C64, hard: bool) -> Result<CommandResult, String> {
        c64.reset(hard);
        Ok(CommandResult::Unit)
    }

    fn sys_screen(&mut self, c64: &mut C64) -> Result<CommandResult, String> {
        let cia_2_port_a = c64.get_cia_2().borrow_mut().read(0x00);
        let vic_memory_ptr = c64.get_vic().borrow_mut().read(0x18);
        let video_matrix = ((vic_memory_ptr & 0xf0) as u16) << 6;
        let vic_bank = ((!cia_2_port_a & 0x03) as u16) << 14;
        Ok(CommandResult::Number(vic_bank | video_matrix))
    }

    fn sys_stopwatch(&mut self, c64: &mut C64, reset: bool) -> Result<CommandResult, String> {
        let clock = c64.get_clock();
        if reset {
            clock.reset();
        }
        Ok(CommandResult::Buffer(clock.get().to_be_bytes().to_vec()))
    }

    // -- Helpers

    fn read_regs(c64: &mut C64) -> RegData {
        let cpu = c64.get_cpu();
        RegData {
            a: cpu.get_register(Register::A),
            x: cpu.get_register(Register::X),
            y: cpu.get_register(Register::Y),
            p: cpu.get_register(Register::P),
            sp: cpu.get_register(Register::Sp),
            pc: cpu.get_pc(),
            port_00: cpu.read(0x00),
            port_01: cpu.read(0x01),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mos64_core::util::new_shared;
    use mos64_core::factory::{SoundOutput, SystemModel, VideoOutput};
    use mos64_system::{C64Factory, Config};
    use std::rc::Rc;
    use std::sync::Arc;
    use std::sync::mpsc;

    struct NullSound;
    impl SoundOutput for NullSound {
        fn reset(&self) {}
        fn write(&self, _samples: &[i16]) {}
    }

    struct NullVideo;
    impl VideoOutput for NullVideo {
        fn get_dimension(&self) -> (usize, usize) {
            (0, 0)
        }
        fn reset(&mut self) {}
        fn write(&mut self, _index: usize, _color: u8) {}
    }

    fn build_c64() -> C64 {
        let config = Rc::new(Config::new(SystemModel::PAL));
        let factory = Box::new(C64Factory::new(config.clone()));
        C64::build(
            config,
            &*factory,
            new_shared(NullVideo {}),
            Arc::new(NullSound {}),
        )
    }

    #[test]
    fn breakpoint_stops_continue() {
        let mut c64 = build_c64();
        c64.reset(false);
        let mut session = Session::new();
        let (tx, rx) = mpsc::channel();
        session.execute(&mut c64, Command::Attach(tx));
        rx.recv().unwrap();
        session.execute(&mut c64, Command::BpSet(c64.get_cpu().get_pc(), false));
        rx.recv().unwrap();
        session.execute(&mut c64, Command::Continue);
        match rx.recv().unwrap() {
            CommandResult::Unit => {}
            _ => panic!("expected Unit"),
        }
        assert!(c64.check_breakpoints());
    }

    #[test]
    fn reg_write_then_read_round_trips() {
        let mut c64 = build_c64();
        c64.reset(false);
        let mut session = Session::new();
        let (tx, rx) = mpsc::channel();
        session.execute(&mut c64, Command::Attach(tx));
        rx.recv().unwrap();
        session.execute(&mut c64, Command::RegWrite(vec![RegOp::SetA(0x42)]));
        rx.recv().unwrap();
        session.execute(&mut c64, Command::RegRead);
        match rx.recv().unwrap() {
            CommandResult::Registers(regs) => assert_eq!(0x42, regs.a),
            _ => panic!("expected Registers"),
        }
    }
}
