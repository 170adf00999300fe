// This file is part of mos64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use core::fmt;
use log::LogLevel;

use crate::factory::{Addressable, BreakpointTag, Cpu, CpuErrorState, Register};
use crate::util::{IoPort, IrqLine, Pin, Shared};

use super::uops::{decode_opcode, load_program, MicroOp, MicroOpPair, ProgramId};

pub enum Flag {
    Carry = 1,
    Zero = 1 << 1,
    IntDisable = 1 << 2,
    Decimal = 1 << 3,
    Break = 1 << 4,
    Reserved = 1 << 5,
    Overflow = 1 << 6,
    Negative = 1 << 7,
}

pub struct Registers {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub pc: u16,
    pub p: u8,
}

impl Registers {
    pub fn new() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            sp: 0,
            pc: 0,
            p: 0,
        }
    }

    pub fn reset(&mut self) {
        self.a = 0;
        self.x = 0;
        self.y = 0;
        self.sp = 0;
        self.pc = 0;
        self.p = 0;
    }
}

/// Tags every one of the 65,536 addresses with the breakpoint state the
/// debugger has armed for it. Checked once per opcode fetch; a hard
/// breakpoint halts the cycle loop immediately, a soft one lets the
/// instruction complete first (used for "run until this RTS returns").
pub struct BreakpointPlane {
    tags: [BreakpointTag; 0x10000],
}

impl BreakpointPlane {
    pub fn new() -> Self {
        Self {
            tags: [BreakpointTag::None; 0x10000],
        }
    }

    pub fn get(&self, address: u16) -> BreakpointTag {
        self.tags[address as usize]
    }

    pub fn set(&mut self, address: u16, tag: BreakpointTag) {
        self.tags[address as usize] = tag;
    }

    pub fn clear_all(&mut self) {
        self.tags = [BreakpointTag::None; 0x10000];
    }
}

pub struct Cpu6510 {
    // Dependencies
    mem: Shared<dyn Addressable>,
    // Runtime State
    regs: Registers,
    opcode: u8,
    uops: &'static [MicroOpPair],
    cycle: u8,
    address_lo: u8,
    address_hi: u8,
    data: u8,
    page_cross: bool,
    breakpoints: BreakpointPlane,
    error_state: CpuErrorState,
    // I/O
    ba_line: Shared<Pin>,
    io_port: Shared<IoPort>,
    has_processor_port: bool,
    irq_line: Shared<IrqLine>,
    nmi_line: Shared<IrqLine>,
}

impl Cpu6510 {
    pub fn new(
        mem: Shared<dyn Addressable>,
        io_port: Shared<IoPort>,
        ba_line: Shared<Pin>,
        irq_line: Shared<IrqLine>,
        nmi_line: Shared<IrqLine>,
    ) -> Self {
        Self {
            mem,
            regs: Registers::new(),
            opcode: 0,
            uops: load_program(ProgramId::Start),
            cycle: 0,
            address_lo: 0,
            address_hi: 0,
            data: 0,
            page_cross: false,
            breakpoints: BreakpointPlane::new(),
            error_state: CpuErrorState::Ok,
            ba_line,
            io_port,
            has_processor_port: true,
            irq_line,
            nmi_line,
        }
    }

    /// Same micro-op engine with the $0000/$0001 processor-port special
    /// case disabled, for a plain 6502 wired with no I/O port (the VC1541's
    /// CPU: identical silicon family, RAM at those two addresses instead).
    pub fn new_without_processor_port(
        mem: Shared<dyn Addressable>,
        io_port: Shared<IoPort>,
        ba_line: Shared<Pin>,
        irq_line: Shared<IrqLine>,
        nmi_line: Shared<IrqLine>,
    ) -> Self {
        let mut cpu = Self::new(mem, io_port, ba_line, irq_line, nmi_line);
        cpu.has_processor_port = false;
        cpu
    }

    fn clock_inner(&mut self) {
        let pair = self.uops[self.cycle as usize];
        if self.ba_line.borrow().is_low() && !Self::is_write_cycle(pair) {
            return;
        }
        self.execute(pair.0);
        if let Some(op1) = pair.1 {
            self.execute(op1);
        }
        self.cycle += 1;
    }

    /// The VIC can only steal a cycle from the CPU by holding RDY/BA low on
    /// a read: real 6510 hardware has no way to abort a write once it's
    /// started driving the bus, so a write cycle always completes even if
    /// BA drops low the same cycle.
    fn is_write_cycle(pair: MicroOpPair) -> bool {
        fn is_write(op: MicroOp) -> bool {
            match op {
                MicroOp::WriteData => true,
                _ => false,
            }
        }
        is_write(pair.0) || pair.1.map_or(false, is_write)
    }

    fn execute(&mut self, op: MicroOp) {
        if log_enabled!(LogLevel::Trace) {
            trace!(target: "cpu::uop", "0x{:04x}: {:02x} #{} {:<18}; {}", self.regs.pc, self.opcode, self.cycle, format!("{:?}", op), &self);
        }
        match op {
            MicroOp::FetchOpcode => self.load_next_program(),
            MicroOp::FetchOpcodeDiscard => self.fetch_opcode_discard(),
            MicroOp::FetchOperand => self.fetch_operand(),
            MicroOp::FetchAdl => self.fetch_adl(),
            MicroOp::FetchAdh => self.fetch_adh(),
            MicroOp::IncrementAdlX => self.increment_adl_x(),
            MicroOp::IncrementAdlY => self.increment_adl_y(),
            MicroOp::IndirectFetchAdl => self.indirect_fetch_adl(),
            MicroOp::IndirectFetchAdh => self.indirect_fetch_adh(),
            MicroOp::ReadData => self.read_data(),
            MicroOp::ReadDataOrFixAdh => self.read_data_or_fix_adh(),
            MicroOp::FixAdhForWrite => self.fix_adh_for_write(),
            MicroOp::WriteData => self.write_data(),
            MicroOp::OpLDA => self.lda(),
            MicroOp::OpLDX => self.ldx(),
            MicroOp::OpLDY => self.ldy(),
            MicroOp::OpSTA => self.sda(),
            MicroOp::OpSTX => self.sdx(),
            MicroOp::OpSTY => self.sdy(),
            MicroOp::OpTAX => self.tax(),
            MicroOp::OpTXA => self.txa(),
            MicroOp::OpTAY => self.tay(),
            MicroOp::OpTYA => self.tya(),
            MicroOp::OpTSX => self.tsx(),
            MicroOp::OpTXS => self.txs(),
            MicroOp::OpPLA => self.pla(),
            MicroOp::OpPLP => self.plp(),
            MicroOp::OpPHA => self.pha(),
            MicroOp::OpPHP => self.php(),
            MicroOp::OpAND => self.and(),
            MicroOp::OpEOR => self.eor(),
            MicroOp::OpORA => self.ora(),
            MicroOp::OpADC => self.adc(),
            MicroOp::OpSBC => self.sbc(),
            MicroOp::OpBIT => self.bit(),
            MicroOp::OpCMP => self.cmp(),
            MicroOp::OpCPX => self.cpx(),
            MicroOp::OpCPY => self.cpy(),
            MicroOp::OpDEC => self.dec(),
            MicroOp::OpDEX => self.dex(),
            MicroOp::OpDEY => self.dey(),
            MicroOp::OpINC => self.inc(),
            MicroOp::OpINX => self.inx(),
            MicroOp::OpINY => self.iny(),
            MicroOp::OpASL => self.asl(),
            MicroOp::OpASLImplied => self.asl_implied(),
            MicroOp::OpLSR => self.lsr(),
            MicroOp::OpLSRImplied => self.lsr_implied(),
            MicroOp::OpROL => self.rol(),
            MicroOp::OpROLImplied => self.rol_implied(),
            MicroOp::OpROR => self.ror(),
            MicroOp::OpRORImplied => self.ror_implied(),
            MicroOp::OpJMP => self.jmp(),
            MicroOp::OpJSR => self.jsr(),
            MicroOp::OpRTS => self.rts(),
            MicroOp::OpBRK => self.brk(),
            MicroOp::OpRTI => self.rti(),
            MicroOp::OpBCC => self.branch(Flag::Carry, false),
            MicroOp::OpBCS => self.branch(Flag::Carry, true),
            MicroOp::OpBEQ => self.branch(Flag::Zero, true),
            MicroOp::OpBNE => self.branch(Flag::Zero, false),
            MicroOp::OpBMI => self.branch(Flag::Negative, true),
            MicroOp::OpBPL => self.branch(Flag::Negative, false),
            MicroOp::OpBVC => self.branch(Flag::Overflow, false),
            MicroOp::OpBVS => self.branch(Flag::Overflow, true),
            MicroOp::OpCLC => self.clear_flag(Flag::Carry),
            MicroOp::OpCLD => self.clear_flag(Flag::Decimal),
            MicroOp::OpCLI => self.clear_flag(Flag::IntDisable),
            MicroOp::OpCLV => self.clear_flag(Flag::Overflow),
            MicroOp::OpSEC => self.set_flag(Flag::Carry),
            MicroOp::OpSED => self.set_flag(Flag::Decimal),
            MicroOp::OpSEI => self.set_flag(Flag::IntDisable),
            MicroOp::OpNOP => self.nop(),
            MicroOp::OpANE => self.ane(),
            MicroOp::OpLXA => self.lxa(),
            MicroOp::OpALR => self.alr(),
            MicroOp::OpAXS => self.axs(),
            MicroOp::OpLAX => self.lax(),
            MicroOp::OpSAX => self.sax(),
            MicroOp::OpSRE => self.sre(),
            MicroOp::OpSLO => self.slo(),
            MicroOp::OpRLA => self.rla(),
            MicroOp::OpRRA => self.rra(),
            MicroOp::OpDCP => self.dcp(),
            MicroOp::OpISC => self.isc(),
            MicroOp::OpANC => self.anc(),
            MicroOp::OpARR => self.arr(),
            MicroOp::OpLAS => self.las(),
            MicroOp::OpSHA => self.sha(),
            MicroOp::OpSHX => self.shx(),
            MicroOp::OpSHY => self.shy(),
            MicroOp::OpTAS => self.tas(),
            MicroOp::OpIRQ => self.irq(),
            MicroOp::OpNMI => self.nmi(),
            MicroOp::OpRST => self.rst(),
        }
    }

    fn load_next_program(&mut self) {
        if self.nmi_line.borrow().is_low() {
            if log_enabled!(LogLevel::Trace) {
                trace!(target: "cpu::int", "NMI");
            }
            self.uops = load_program(ProgramId::Nmi);
        } else if self.irq_line.borrow().is_low() && !self.test_flag(Flag::IntDisable) {
            if log_enabled!(LogLevel::Trace) {
                trace!(target: "cpu::int", "IRQ");
            }
            self.uops = load_program(ProgramId::Irq);
        } else {
            self.fetch_opcode();
        }
        self.cycle = 0;
    }

    fn fetch_opcode(&mut self) {
        self.opcode = self.read_mem(self.regs.pc);
        match decode_opcode(self.opcode) {
            Some(uops) => self.uops = uops,
            None => {
                self.error_state = CpuErrorState::IllegalInstruction;
                self.uops = load_program(ProgramId::Start);
            }
        }
        if log_enabled!(LogLevel::Trace) {
            trace!(target: "cpu::ins", "0x{:04x}: {:02x}; {}", self.regs.pc, self.opcode, &self);
        }
        self.regs.pc = self.regs.pc.wrapping_add(1);
        match self.breakpoints.get(self.regs.pc.wrapping_sub(1)) {
            BreakpointTag::Hard => self.error_state = CpuErrorState::HardBreakpointReached,
            BreakpointTag::Soft => self.error_state = CpuErrorState::SoftBreakpointReached,
            BreakpointTag::None => {}
        }
    }

    fn fetch_opcode_discard(&mut self) {
        let _ = self.read_mem(self.regs.pc);
    }

    fn fetch_operand(&mut self) {
        self.data = self.read_mem(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
    }

    fn fetch_adl(&mut self) {
        self.address_hi = 0;
        self.address_lo = self.read_mem(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
    }

    fn fetch_adh(&mut self) {
        self.address_hi = self.read_mem(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
    }

    fn increment_adl_x(&mut self) {
        self.page_cross = self.address_lo.checked_add(self.regs.x).is_none();
        self.address_lo = self.address_lo.wrapping_add(self.regs.x);
    }

    fn increment_adl_y(&mut self) {
        self.page_cross = self.address_lo.checked_add(self.regs.y).is_none();
        self.address_lo = self.address_lo.wrapping_add(self.regs.y);
    }

    fn indirect_fetch_adl(&mut self) {
        let address = make_address(self.address_hi, self.address_lo);
        let adl = self.read_mem(address);
        self.data = adl;
        self.address_lo = self.address_lo.wrapping_add(1);
    }

    fn indirect_fetch_adh(&mut self) {
        let address = make_address(self.address_hi, self.address_lo);
        self.address_lo = self.data;
        self.address_hi = self.read_mem(address);
    }

    fn read_data_or_fix_adh(&mut self) {
        if self.page_cross == true {
            self.address_hi = self.address_hi.wrapping_add(1);
        } else {
            let address = make_address(self.address_hi, self.address_lo);
            self.data = self.read_mem(address);
            self.cycle += 1;
        }
    }

    /// Same address fix-up as `read_data_or_fix_adh`, but store instructions
    /// can't skip the dummy cycle on a hit: real hardware has already
    /// started the bus cycle for the (possibly wrong) address before it
    /// knows whether the index crossed a page, so indexed stores always pay
    /// the full cycle count.
    fn fix_adh_for_write(&mut self) {
        if self.page_cross == true {
            self.address_hi = self.address_hi.wrapping_add(1);
        }
    }

    fn read_data(&mut self) {
        let address = make_address(self.address_hi, self.address_lo);
        self.data = self.read_mem(address);
    }

    fn write_data(&mut self) {
        let address = make_address(self.address_hi, self.address_lo);
        self.write_mem(address, self.data);
    }

    fn lda(&mut self) {
        let data = self.data;
        self.regs.a = data;
        self.set_nz(data);
    }

    fn ldx(&mut self) {
        let data = self.data;
        self.regs.x = data;
        self.set_nz(data);
    }

    fn ldy(&mut self) {
        let data = self.data;
        self.regs.y = data;
        self.set_nz(data);
    }

    fn sda(&mut self) {
        self.data = self.regs.a;
    }

    fn sdx(&mut self) {
        self.data = self.regs.x;
    }

    fn sdy(&mut self) {
        self.data = self.regs.y;
    }

    fn tax(&mut self) {
        let data = self.regs.a;
        self.regs.x = data;
        self.set_nz(data);
    }

    fn txa(&mut self) {
        let data = self.regs.x;
        self.regs.a = data;
        self.set_nz(data);
    }

    fn tay(&mut self) {
        let data = self.regs.a;
        self.regs.y = data;
        self.set_nz(data);
    }

    fn tya(&mut self) {
        let data = self.regs.y;
        self.regs.a = data;
        self.set_nz(data);
    }

    fn tsx(&mut self) {
        let data = self.regs.sp;
        self.regs.x = data;
        self.set_nz(data);
    }

    fn txs(&mut self) {
        let data = self.regs.x;
        self.regs.sp = data;
        // NOTE do not set nz
    }

    fn pla(&mut self) {
        match self.cycle {
            2 => {
                self.regs.sp = self.regs.sp.wrapping_add(1);
            }
            3 => {
                let address = make_address(0x01, self.regs.sp);
                let data = self.read_mem(address);
                self.regs.a = data;
                self.set_nz(data);
            }
            _ => panic!("invalid cycle {}", self.cycle),
        }
    }

    fn plp(&mut self) {
        match self.cycle {
            2 => {
                self.regs.sp = self.regs.sp.wrapping_add(1);
            }
            3 => {
                let address = make_address(0x01, self.regs.sp);
                let data = self.read_mem(address);
                self.regs.p = data;
            }
            _ => panic!("invalid cycle {}", self.cycle),
        }
    }

    fn pha(&mut self) {
        match self.cycle {
            2 => {
                self.write_stack(self.regs.a);
            }
            _ => panic!("invalid cycle {}", self.cycle),
        }
    }

    fn php(&mut self) {
        match self.cycle {
            2 => {
                self.write_stack(self.regs.p | (Flag::Break as u8) | (Flag::Reserved as u8));
            }
            _ => panic!("invalid cycle {}", self.cycle),
        }
    }

    fn and(&mut self) {
        let result = self.regs.a & self.data;
        self.regs.a = result;
        self.set_nz(result);
    }

    fn eor(&mut self) {
        let result = self.regs.a ^ self.data;
        self.regs.a = result;
        self.set_nz(result);
    }

    fn ora(&mut self) {
        let result = self.regs.a | self.data;
        self.regs.a = result;
        self.set_nz(result);
    }

    fn adc(&mut self) {
        let result = self.adc_with(self.regs.a, self.data);
        self.regs.a = result;
        self.set_nz(result);
    }

    /// Shared by ADC and the undocumented RRA, which feeds ROR's result
    /// through the same BCD-aware adder before storing into A.
    fn adc_with(&mut self, ac: u8, value: u8) -> u8 {
        let ac = ac as u16;
        let value = value as u16;
        let carry = if self.test_flag(Flag::Carry) { 1 } else { 0 };
        let temp = if !self.test_flag(Flag::Decimal) {
            ac.wrapping_add(value).wrapping_add(carry)
        } else {
            let mut t = (ac & 0x0f) + (value & 0x0f) + carry;
            if t > 0x09 {
                t += 0x06;
            }
            t += (ac & 0xf0) + (value & 0xf0);
            if t & 0x01f0 > 0x90 {
                t += 0x60;
            }
            t
        };
        self.update_flag(
            Flag::Overflow,
            (ac ^ value) & 0x80 == 0 && (ac ^ temp) & 0x80 == 0x80,
        );
        self.update_flag(Flag::Carry, temp > 0xff);
        (temp & 0xff) as u8
    }

    fn sbc(&mut self) {
        let result = self.sbc_with(self.regs.a, self.data);
        self.regs.a = result;
        self.set_nz(result);
    }

    /// Shared by SBC and the undocumented ISC, which feeds INC's result
    /// through the same BCD-aware subtractor before storing into A.
    fn sbc_with(&mut self, ac: u8, value: u8) -> u8 {
        let ac = ac as u16;
        let value = value as u16;
        let carry = if self.test_flag(Flag::Carry) { 0 } else { 1 };
        let temp = if !self.test_flag(Flag::Decimal) {
            ac.wrapping_sub(value).wrapping_sub(carry)
        } else {
            let mut t = (ac & 0x0f).wrapping_sub(value & 0x0f).wrapping_sub(carry);
            if t & 0x10 != 0 {
                t = (t.wrapping_sub(0x06) & 0x0f)
                    | ((ac & 0xf0).wrapping_sub(value & 0xf0).wrapping_sub(0x10));
            } else {
                t = (t & 0x0f) | ((ac & 0xf0).wrapping_sub(value & 0xf0));
            }
            if t & 0x0100 != 0 {
                t -= 0x60;
            }
            t
        };
        self.update_flag(
            Flag::Overflow,
            (ac ^ temp) & 0x80 != 0 && (ac ^ value) & 0x80 == 0x80,
        );
        self.update_flag(Flag::Carry, temp < 0x100);
        (temp & 0xff) as u8
    }

    fn bit(&mut self) {
        let data = self.data;
        let a = self.regs.a;
        self.update_flag(Flag::Negative, data & 0x80 != 0);
        self.update_flag(Flag::Overflow, 0x40 & data != 0);
        self.update_flag(Flag::Zero, data & a == 0);
    }

    fn cmp(&mut self) {
        let result = (u16::from(self.regs.a)).wrapping_sub(u16::from(self.data));
        self.update_flag(Flag::Carry, result < 0x100);
        self.set_nz((result & 0xff) as u8);
    }

    fn cpx(&mut self) {
        let result = (u16::from(self.regs.x)).wrapping_sub(u16::from(self.data));
        self.update_flag(Flag::Carry, result < 0x100);
        self.set_nz((result & 0xff) as u8);
    }

    fn cpy(&mut self) {
        let result = (u16::from(self.regs.y)).wrapping_sub(u16::from(self.data));
        self.update_flag(Flag::Carry, result < 0x100);
        self.set_nz((result & 0xff) as u8);
    }

    fn dec(&mut self) {
        let result = self.data.wrapping_sub(1);
        self.data = result;
        self.set_nz(result);
    }

    fn dex(&mut self) {
        let result = self.regs.x.wrapping_sub(1);
        self.regs.x = result;
        self.set_nz(result);
    }

    fn dey(&mut self) {
        let result = self.regs.y.wrapping_sub(1);
        self.regs.y = result;
        self.set_nz(result);
    }

    fn inc(&mut self) {
        let result = self.data.wrapping_add(1);
        self.data = result;
        self.set_nz(result);
    }

    fn inx(&mut self) {
        let result = self.regs.x.wrapping_add(1);
        self.regs.x = result;
        self.set_nz(result);
    }

    fn iny(&mut self) {
        let result = self.regs.y.wrapping_add(1);
        self.regs.y = result;
        self.set_nz(result);
    }

    fn asl(&mut self) {
        let data = self.data;
        self.update_flag(Flag::Carry, (data & 0x80) != 0);
        let result = data << 1;
        self.data = result;
        self.set_nz(result);
    }

    fn asl_implied(&mut self) {
        let data = self.regs.a;
        self.update_flag(Flag::Carry, (data & 0x80) != 0);
        let result = data << 1;
        self.regs.a = result;
        self.set_nz(result);
    }

    fn lsr(&mut self) {
        let data = self.data;
        self.update_flag(Flag::Carry, (data & 0x01) != 0);
        let result = data >> 1;
        self.data = result;
        self.set_nz(result);
    }

    fn lsr_implied(&mut self) {
        let data = self.regs.a;
        self.update_flag(Flag::Carry, (data & 0x01) != 0);
        let result = data >> 1;
        self.regs.a = result;
        self.set_nz(result);
    }

    fn rol(&mut self) {
        let result = self.rol_value(self.data);
        self.data = result;
        self.set_nz(result);
    }

    fn rol_implied(&mut self) {
        let result = self.rol_value(self.regs.a);
        self.regs.a = result;
        self.set_nz(result);
    }

    fn rol_value(&mut self, data: u8) -> u8 {
        let mut temp = (data as u16) << 1;
        if self.test_flag(Flag::Carry) {
            temp |= 0x01
        };
        self.update_flag(Flag::Carry, temp > 0xff);
        (temp & 0xff) as u8
    }

    fn ror(&mut self) {
        let result = self.ror_value(self.data);
        self.data = result;
        self.set_nz(result);
    }

    fn ror_implied(&mut self) {
        let result = self.ror_value(self.regs.a);
        self.regs.a = result;
        self.set_nz(result);
    }

    fn ror_value(&mut self, data: u8) -> u8 {
        let data = data as u16;
        let mut temp = if self.test_flag(Flag::Carry) {
            data | 0x100
        } else {
            data
        };
        self.update_flag(Flag::Carry, temp & 0x01 != 0);
        temp >>= 1;
        (temp & 0xff) as u8
    }

    fn jmp(&mut self) {
        self.regs.pc = make_address(self.address_hi, self.address_lo);
    }

    fn jsr(&mut self) {
        match self.cycle {
            2 => {
                // SP -> Address Bus
            }
            3 => {
                self.write_stack(hi_byte(self.regs.pc));
            }
            4 => {
                self.write_stack(lo_byte(self.regs.pc));
            }
            5 => {
                self.address_hi = self.read_mem(self.regs.pc);
                // Do not increment pc
            }
            6 => {
                self.regs.pc = make_address(self.address_hi, self.address_lo);
            }
            _ => panic!("invalid cycle {}", self.cycle),
        }
    }

    fn rts(&mut self) {
        match self.cycle {
            2 => {
                self.regs.sp = self.regs.sp.wrapping_add(1);
            }
            3 => {
                let address = make_address(0x01, self.regs.sp);
                let pcl = self.read_mem(address);
                self.regs.pc = u16::from(pcl);
                self.regs.sp = self.regs.sp.wrapping_add(1);
            }
            4 => {
                let address = make_address(0x01, self.regs.sp);
                let pch = self.read_mem(address);
                self.regs.pc = make_address(pch, self.regs.pc as u8);
            }
            5 => {
                self.regs.pc = self.regs.pc.wrapping_add(1);
            }
            _ => panic!("invalid cycle {}", self.cycle),
        }
    }

    fn brk(&mut self) {
        match self.cycle {
            2 => {
                self.write_stack(hi_byte(self.regs.pc));
            }
            3 => {
                self.write_stack(lo_byte(self.regs.pc));
            }
            4 => {
                self.write_stack(self.regs.p | (Flag::Break as u8) | (Flag::Reserved as u8));
            }
            5 => {
                let pcl = self.read_mem(0xfffe);
                self.regs.pc = u16::from(pcl);
            }
            6 => {
                let pch = self.read_mem(0xffff);
                self.regs.pc = make_address(pch, self.regs.pc as u8);
                self.set_flag(Flag::IntDisable);
            }
            _ => panic!("invalid cycle {}", self.cycle),
        }
    }

    fn rti(&mut self) {
        match self.cycle {
            2 => {
                self.regs.sp = self.regs.sp.wrapping_add(1);
            }
            3 => {
                let address = make_address(0x01, self.regs.sp);
                let p = self.read_mem(address);
                self.regs.sp = self.regs.sp.wrapping_add(1);
                self.regs.p = p;
            }
            4 => {
                let address = make_address(0x01, self.regs.sp);
                let pcl = self.read_mem(address);
                self.regs.pc = u16::from(pcl);
                self.regs.sp = self.regs.sp.wrapping_add(1);
            }
            5 => {
                let address = make_address(0x01, self.regs.sp);
                let pch = self.read_mem(address);
                self.regs.pc = make_address(pch, self.regs.pc as u8);
            }
            _ => panic!("invalid cycle {}", self.cycle),
        }
    }

    fn branch(&mut self, flag: Flag, value: bool) {
        match self.cycle {
            2 => {
                let cond = self.test_flag(flag) == value;
                if cond {
                    let offset = self.data as i8;
                    let ea = if offset < 0 {
                        self.regs.pc.wrapping_sub((offset as i16).abs() as u16)
                    } else {
                        self.regs.pc.wrapping_add(offset as u16)
                    };
                    self.regs.pc = ea;
                } else {
                    self.load_next_program();
                }
            }
            _ => panic!("invalid cycle {}", self.cycle),
        }
    }

    fn nop(&mut self) {}

    // -- Undocumented opcodes

    fn ane(&mut self) {
        let result = self.regs.a & self.regs.x & self.data;
        self.regs.a = result;
        self.set_nz(result);
    }

    fn lxa(&mut self) {
        let result = self.regs.a & self.data;
        self.regs.a = result;
        self.regs.x = result;
        self.set_nz(result);
    }

    fn alr(&mut self) {
        let value = self.regs.a & self.data;
        self.update_flag(Flag::Carry, (value & 0x01) != 0);
        let result = value >> 1;
        self.regs.a = result;
        self.set_nz(result);
    }

    fn axs(&mut self) {
        let result = ((self.regs.a & self.regs.x) as u16).wrapping_sub(self.data as u16);
        self.update_flag(Flag::Carry, result < 0x100);
        self.regs.x = (result & 0xff) as u8;
        self.set_nz((result & 0xff) as u8);
    }

    fn lax(&mut self) {
        let data = self.data;
        self.regs.a = data;
        self.regs.x = data;
        self.set_nz(data);
    }

    fn sax(&mut self) {
        self.data = self.regs.a & self.regs.x;
    }

    fn sre(&mut self) {
        let value = self.data;
        self.update_flag(Flag::Carry, (value & 0x01) != 0);
        let shifted = value >> 1;
        let result = self.regs.a ^ shifted;
        self.regs.a = result;
        self.data = shifted;
        self.set_nz(result);
    }

    fn slo(&mut self) {
        let value = self.data;
        self.update_flag(Flag::Carry, (value & 0x80) != 0);
        let shifted = value << 1;
        let result = self.regs.a | shifted;
        self.regs.a = result;
        self.data = shifted;
        self.set_nz(result);
    }

    fn rla(&mut self) {
        let rotated = self.rol_value(self.data);
        let result = self.regs.a & rotated;
        self.regs.a = result;
        self.data = rotated;
        self.set_nz(result);
    }

    fn rra(&mut self) {
        let rotated = self.ror_value(self.data);
        let result = self.adc_with(self.regs.a, rotated);
        self.regs.a = result;
        self.data = rotated;
        self.set_nz(result);
    }

    fn dcp(&mut self) {
        let decremented = self.data.wrapping_sub(1);
        self.data = decremented;
        let result = (u16::from(self.regs.a)).wrapping_sub(u16::from(decremented));
        self.update_flag(Flag::Carry, result < 0x100);
        self.set_nz((result & 0xff) as u8);
    }

    fn isc(&mut self) {
        let incremented = self.data.wrapping_add(1);
        let result = self.sbc_with(self.regs.a, incremented);
        self.regs.a = result;
        self.data = incremented;
        self.set_nz(result);
    }

    fn anc(&mut self) {
        let result = self.regs.a & self.data;
        self.regs.a = result;
        self.set_nz(result);
        self.update_flag(Flag::Carry, (result & 0x80) != 0);
    }

    fn arr(&mut self) {
        let anded = self.regs.a & self.data;
        let result = self.ror_value(anded);
        self.regs.a = result;
        self.update_flag(Flag::Carry, (result & 0x40) != 0);
        self.update_flag(Flag::Overflow, ((result >> 6) ^ (result >> 5)) & 0x01 != 0);
        self.set_nz(result);
    }

    fn las(&mut self) {
        let result = self.data & self.regs.sp;
        self.regs.a = result;
        self.regs.x = result;
        self.regs.sp = result;
        self.set_nz(result);
    }

    /// Unstable on real silicon: stores `A & X & (high byte of the target
    /// address + 1)`. We take the standard approximation and always use the
    /// already page-corrected high byte.
    fn sha(&mut self) {
        self.data = self.regs.a & self.regs.x & self.address_hi.wrapping_add(1);
    }

    fn shx(&mut self) {
        self.data = self.regs.x & self.address_hi.wrapping_add(1);
    }

    fn shy(&mut self) {
        self.data = self.regs.y & self.address_hi.wrapping_add(1);
    }

    /// Also copies `A & X` into `SP` before storing, on top of the `SHX`/`SHY`
    /// high-byte-plus-one quirk.
    fn tas(&mut self) {
        self.regs.sp = self.regs.a & self.regs.x;
        self.data = self.regs.sp & self.address_hi.wrapping_add(1);
    }

    // -- Interrupts

    fn irq(&mut self) {
        match self.cycle {
            2 => {
                self.write_stack(hi_byte(self.regs.pc));
            }
            3 => {
                self.write_stack(lo_byte(self.regs.pc));
            }
            4 => {
                self.write_stack(self.regs.p & 0xef);
            }
            5 => {
                let pcl = self.read_mem(0xfffe);
                self.regs.pc = u16::from(pcl);
            }
            6 => {
                let pch = self.read_mem(0xffff);
                self.regs.pc = make_address(pch, self.regs.pc as u8);
                self.set_flag(Flag::IntDisable);
            }
            _ => panic!("invalid cycle {}", self.cycle),
        }
    }

    fn nmi(&mut self) {
        match self.cycle {
            2 => {
                self.write_stack(hi_byte(self.regs.pc));
            }
            3 => {
                self.write_stack(lo_byte(self.regs.pc));
            }
            4 => {
                self.write_stack(self.regs.p & 0xef);
            }
            5 => {
                let pcl = self.read_mem(0xfffa);
                self.regs.pc = u16::from(pcl);
            }
            6 => {
                let pch = self.read_mem(0xfffb);
                self.regs.pc = make_address(pch, self.regs.pc as u8);
                self.set_flag(Flag::IntDisable);
                self.nmi_line.borrow_mut().reset();
            }
            _ => panic!("invalid cycle {}", self.cycle),
        }
    }

    fn rst(&mut self) {
        match self.cycle {
            2 => {}
            3 => {}
            4 => {
                let pcl = self.read_mem(0xfffc);
                self.regs.pc = u16::from(pcl);
            }
            5 => {
                let pch = self.read_mem(0xfffd);
                self.regs.pc = make_address(pch, self.regs.pc as u8);
            }
            _ => panic!("invalid cycle {}", self.cycle),
        }
    }

    // -- Flag Ops

    #[inline]
    fn clear_flag(&mut self, flag: Flag) {
        self.regs.p &= !(flag as u8);
    }

    #[inline]
    fn set_flag(&mut self, flag: Flag) {
        self.regs.p |= flag as u8;
    }

    #[inline]
    fn set_nz(&mut self, value: u8) {
        self.update_flag(Flag::Negative, value & 0x80 != 0);
        self.update_flag(Flag::Zero, value == 0);
    }

    #[inline]
    fn update_flag(&mut self, flag: Flag, value: bool) {
        if value {
            self.regs.p |= flag as u8;
        } else {
            self.regs.p &= !(flag as u8);
        }
    }

    #[inline]
    fn test_flag(&self, flag: Flag) -> bool {
        (self.regs.p & (flag as u8)) != 0
    }

    // -- Memory Ops

    pub fn read_mem(&self, address: u16) -> u8 {
        match address {
            0x0000 if self.has_processor_port => self.io_port.borrow().get_direction(),
            0x0001 if self.has_processor_port => self.io_port.borrow().get_value() & 0x3f,
            _ => self.mem.borrow().read(address),
        }
    }

    pub fn write_mem(&mut self, address: u16, value: u8) {
        if self.has_processor_port {
            match address {
                0x0000 => self.io_port.borrow_mut().set_direction(value),
                0x0001 => self.io_port.borrow_mut().set_value(value),
                _ => {}
            }
        }
        self.mem.borrow_mut().write(address, value);
    }

    #[inline]
    pub fn write_stack(&mut self, value: u8) {
        let address = make_address(0x01, self.regs.sp);
        self.write_mem(address, value);
        self.regs.sp = self.regs.sp.wrapping_sub(1);
    }
}

impl Cpu for Cpu6510 {
    fn get_register(&self, reg: Register) -> u8 {
        match reg {
            Register::A => self.regs.a,
            Register::X => self.regs.x,
            Register::Y => self.regs.y,
            Register::Sp => self.regs.sp,
            Register::Pc => self.regs.pc as u8,
            Register::P => self.regs.p,
        }
    }

    fn set_register(&mut self, reg: Register, value: u8) {
        match reg {
            Register::A => self.regs.a = value,
            Register::X => self.regs.x = value,
            Register::Y => self.regs.y = value,
            Register::Sp => self.regs.sp = value,
            Register::Pc => self.regs.pc = (self.regs.pc & 0xff00) | u16::from(value),
            Register::P => self.regs.p = value,
        }
    }

    fn get_pc(&self) -> u16 {
        match self.cycle {
            1 => self.regs.pc.wrapping_sub(1),
            _ => self.regs.pc,
        }
    }

    fn set_pc(&mut self, value: u16) {
        self.regs.pc = value;
        self.uops = load_program(ProgramId::Start);
        self.cycle = 0;
    }

    fn get_error_state(&self) -> CpuErrorState {
        self.error_state
    }

    fn clear_error_state(&mut self) {
        self.error_state = CpuErrorState::Ok;
    }

    fn set_breakpoint(&mut self, address: u16, tag: BreakpointTag) {
        self.breakpoints.set(address, tag);
    }

    fn clear_breakpoints(&mut self) {
        self.breakpoints.clear_all();
    }

    fn clock(&mut self) {
        self.clock_inner();
    }

    fn reset(&mut self) {
        self.regs.reset();
        self.address_hi = 0;
        self.address_lo = 0;
        self.data = 0;
        self.page_cross = false;
        self.error_state = CpuErrorState::Ok;
        self.irq_line.borrow_mut().reset();
        self.nmi_line.borrow_mut().reset();
        if self.has_processor_port {
            self.io_port.borrow_mut().set_value(0xff);
            self.write(0x0000, 0b_0010_1111);
            self.write(0x0001, 0b_0001_1111);
        }
        self.opcode = 0;
        self.uops = load_program(ProgramId::Reset);
        self.cycle = 0;
    }

    // -- I/O

    fn read(&self, address: u16) -> u8 {
        self.read_mem(address)
    }

    fn write(&mut self, address: u16, value: u8) {
        self.write_mem(address, value);
    }
}

impl fmt::Display for Cpu6510 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x} {:02x} {:02x} {:02x} {}{}{}{}{}{}{}",
            self.regs.a,
            self.regs.x,
            self.regs.y,
            self.regs.sp,
            if (self.regs.p & Flag::Negative as u8) != 0 {
                "N"
            } else {
                "n"
            },
            if (self.regs.p & Flag::Overflow as u8) != 0 {
                "V"
            } else {
                "v"
            },
            if (self.regs.p & Flag::Break as u8) != 0 {
                "B"
            } else {
                "b"
            },
            if (self.regs.p & Flag::Decimal as u8) != 0 {
                "D"
            } else {
                "d"
            },
            if (self.regs.p & Flag::IntDisable as u8) != 0 {
                "I"
            } else {
                "i"
            },
            if (self.regs.p & Flag::Zero as u8) != 0 {
                "Z"
            } else {
                "z"
            },
            if (self.regs.p & Flag::Carry as u8) != 0 {
                "C"
            } else {
                "c"
            }
        )
    }
}

#[inline]
fn make_address(hi: u8, lo: u8) -> u16 {
    u16::from(hi) << 8 | u16::from(lo)
}

#[inline]
fn lo_byte(data: u16) -> u8 {
    data as u8
}

#[inline]
fn hi_byte(data: u16) -> u8 {
    (data >> 8) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::{new_shared, IoPort, IrqLine, Pin, Ram};

    fn new_cpu() -> (Cpu6510, Shared<Ram>) {
        let ram = new_shared(Ram::new(0x10000));
        let io_port = new_shared(IoPort::new(0, 0xff));
        let ba_line = new_shared(Pin::new(true));
        let irq_line = new_shared(IrqLine::new("irq"));
        let nmi_line = new_shared(IrqLine::new("nmi"));
        let cpu = Cpu6510::new(ram.clone(), io_port, ba_line, irq_line, nmi_line);
        (cpu, ram)
    }

    fn run_one_instruction(cpu: &mut Cpu6510) {
        cpu.clock();
        loop {
            cpu.clock();
            if cpu.cycle == 1 {
                break;
            }
        }
    }

    fn cycles_for_one_instruction(cpu: &mut Cpu6510) -> u32 {
        let mut count = 1;
        cpu.clock();
        loop {
            cpu.clock();
            count += 1;
            if cpu.cycle == 1 {
                break;
            }
        }
        count
    }

    #[test]
    fn lda_immediate_sets_accumulator_and_flags() {
        let (mut cpu, ram) = new_cpu();
        ram.borrow_mut().write(0x0200, 0xa9);
        ram.borrow_mut().write(0x0201, 0x80);
        cpu.set_pc(0x0200);
        run_one_instruction(&mut cpu);
        assert_eq!(0x80, cpu.get_register(Register::A));
        assert!(cpu.test_flag(Flag::Negative));
    }

    #[test]
    fn breakpoint_tag_surfaces_as_error_state() {
        let (mut cpu, ram) = new_cpu();
        ram.borrow_mut().write(0x0200, 0xea);
        cpu.set_pc(0x0200);
        cpu.set_breakpoint(0x0200, BreakpointTag::Hard);
        run_one_instruction(&mut cpu);
        assert_eq!(CpuErrorState::HardBreakpointReached, cpu.get_error_state());
    }

    #[test]
    fn jam_opcode_raises_illegal_instruction() {
        let (mut cpu, ram) = new_cpu();
        ram.borrow_mut().write(0x0200, 0x02);
        cpu.set_pc(0x0200);
        run_one_instruction(&mut cpu);
        assert_eq!(CpuErrorState::IllegalInstruction, cpu.get_error_state());
    }

    #[test]
    fn ba_line_low_stalls_mid_instruction() {
        let (mut cpu, ram) = new_cpu();
        ram.borrow_mut().write(0x0200, 0xad); // LDA absolute
        ram.borrow_mut().write(0x0201, 0x34);
        ram.borrow_mut().write(0x0202, 0x12);
        ram.borrow_mut().write(0x1234, 0x42);
        cpu.set_pc(0x0200);
        cpu.clock();
        cpu.ba_line.borrow_mut().set_low();
        let cycle_before = cpu.cycle;
        cpu.clock();
        assert_eq!(cycle_before, cpu.cycle);
        cpu.ba_line.borrow_mut().set_high();
        loop {
            cpu.clock();
            if cpu.cycle == 1 {
                break;
            }
        }
        assert_eq!(0x42, cpu.get_register(Register::A));
    }

    #[test]
    fn ba_line_low_does_not_stall_a_write_cycle() {
        let (mut cpu, _ram) = new_cpu();
        cpu.write_mem(0x0200, 0x8d); // STA absolute
        cpu.write_mem(0x0201, 0x34);
        cpu.write_mem(0x0202, 0x12);
        cpu.set_register(Register::A, 0x42);
        cpu.set_pc(0x0200);
        cpu.clock(); // FetchOpcode
        cpu.clock(); // FetchAdl
        cpu.clock(); // FetchAdh
        cpu.ba_line.borrow_mut().set_low();
        let cycle_before = cpu.cycle;
        cpu.clock(); // write cycle: completes even with BA held low
        assert_eq!(cycle_before + 1, cpu.cycle);
        assert_eq!(0x42, cpu.read_mem(0x1234));
    }

    #[test]
    fn without_processor_port_zero_page_is_plain_ram() {
        let ram = new_shared(Ram::new(0x10000));
        let io_port = new_shared(IoPort::new(0, 0xff));
        let ba_line = new_shared(Pin::new(true));
        let irq_line = new_shared(IrqLine::new("irq"));
        let nmi_line = new_shared(IrqLine::new("nmi"));
        let mut cpu =
            Cpu6510::new_without_processor_port(ram.clone(), io_port, ba_line, irq_line, nmi_line);
        cpu.write_mem(0x0000, 0x42);
        cpu.write_mem(0x0001, 0x37);
        assert_eq!(0x42, cpu.read_mem(0x0000));
        assert_eq!(0x37, cpu.read_mem(0x0001));
        assert_eq!(0x42, ram.borrow().read(0x0000));
    }

    #[test]
    fn dcp_decrements_memory_and_compares() {
        let (mut cpu, ram) = new_cpu();
        ram.borrow_mut().write(0x0200, 0xc7); // DCP zeropage
        ram.borrow_mut().write(0x0201, 0x10);
        ram.borrow_mut().write(0x0010, 0x05);
        cpu.set_register(Register::A, 0x05);
        cpu.set_pc(0x0200);
        run_one_instruction(&mut cpu);
        assert_eq!(0x04, ram.borrow().read(0x0010));
        assert!(cpu.test_flag(Flag::Carry));
    }

    #[test]
    fn undocumented_immediate_nop_consumes_its_operand_byte() {
        let (mut cpu, ram) = new_cpu();
        ram.borrow_mut().write(0x0200, 0xc2); // undocumented NOP #imm
        ram.borrow_mut().write(0x0201, 0xff);
        ram.borrow_mut().write(0x0202, 0xea); // NOP implied, proves PC landed here
        cpu.set_pc(0x0200);
        run_one_instruction(&mut cpu);
        assert_eq!(0x0202, cpu.get_pc());
    }

    #[test]
    fn sha_absolute_y_stores_a_and_x_and_high_byte_plus_one() {
        let (mut cpu, ram) = new_cpu();
        ram.borrow_mut().write(0x0200, 0x9f); // SHA absolute,Y
        ram.borrow_mut().write(0x0201, 0x00);
        ram.borrow_mut().write(0x0202, 0x12);
        cpu.set_register(Register::Y, 0x04);
        cpu.set_register(Register::A, 0xff);
        cpu.set_register(Register::X, 0xff);
        cpu.set_pc(0x0200);
        run_one_instruction(&mut cpu);
        // target address is $1204; high byte $12, so A & X & ($12 + 1) = $13.
        assert_eq!(0x13, ram.borrow().read(0x1204));
    }

    #[test]
    fn sha_indirect_y_and_shx_and_shy_and_tas_reach_the_real_opcode() {
        let (mut cpu, ram) = new_cpu();
        ram.borrow_mut().write(0x0200, 0x93); // SHA (indirect),Y
        ram.borrow_mut().write(0x0201, 0x10);
        ram.borrow_mut().write(0x0010, 0x00);
        ram.borrow_mut().write(0x0011, 0x20);
        cpu.set_register(Register::Y, 0x01);
        cpu.set_register(Register::A, 0xff);
        cpu.set_register(Register::X, 0xff);
        cpu.set_pc(0x0200);
        run_one_instruction(&mut cpu);
        assert_eq!(0x21, ram.borrow().read(0x2001));
        assert_eq!(0x0202, cpu.get_pc());
    }

    #[test]
    fn tas_copies_a_and_x_into_sp_before_storing() {
        let (mut cpu, ram) = new_cpu();
        ram.borrow_mut().write(0x0200, 0x9b); // TAS absolute,Y
        ram.borrow_mut().write(0x0201, 0x00);
        ram.borrow_mut().write(0x0202, 0x30);
        cpu.set_register(Register::Y, 0x02);
        cpu.set_register(Register::A, 0x0f);
        cpu.set_register(Register::X, 0x3c);
        cpu.set_pc(0x0200);
        run_one_instruction(&mut cpu);
        assert_eq!(0x0c, cpu.get_register(Register::Sp));
        // SP ($0c) & (high byte $30 + 1) = $0c & $31 = $00.
        assert_eq!(0x00, ram.borrow().read(0x3002));
    }

    #[test]
    fn lda_absolute_x_costs_one_extra_cycle_on_page_cross() {
        let (mut cpu, _ram) = new_cpu();
        cpu.write_mem(0x0200, 0xbd); // LDA $0010,X, X=1 -> $0011, no page cross
        cpu.write_mem(0x0201, 0x10);
        cpu.write_mem(0x0202, 0x00);
        cpu.set_register(Register::X, 1);
        cpu.set_pc(0x0200);
        let cycles_no_cross = cycles_for_one_instruction(&mut cpu);

        let (mut cpu2, _ram2) = new_cpu();
        cpu2.write_mem(0x0200, 0xbd); // LDA $00ff,X, X=1 -> $0100, page cross
        cpu2.write_mem(0x0201, 0xff);
        cpu2.write_mem(0x0202, 0x00);
        cpu2.set_register(Register::X, 1);
        cpu2.set_pc(0x0200);
        let cycles_cross = cycles_for_one_instruction(&mut cpu2);

        assert_eq!(cycles_no_cross + 1, cycles_cross);
    }

    #[test]
    fn sta_absolute_x_cost_is_independent_of_page_cross() {
        let (mut cpu, _ram) = new_cpu();
        cpu.write_mem(0x0200, 0x9d); // STA $0010,X, X=1 -> $0011, no page cross
        cpu.write_mem(0x0201, 0x10);
        cpu.write_mem(0x0202, 0x00);
        cpu.set_register(Register::A, 0x42);
        cpu.set_register(Register::X, 1);
        cpu.set_pc(0x0200);
        let cycles_no_cross = cycles_for_one_instruction(&mut cpu);

        let (mut cpu2, _ram2) = new_cpu();
        cpu2.write_mem(0x0200, 0x9d); // STA $00ff,X, X=1 -> $0100, page cross
        cpu2.write_mem(0x0201, 0xff);
        cpu2.write_mem(0x0202, 0x00);
        cpu2.set_register(Register::A, 0x42);
        cpu2.set_register(Register::X, 1);
        cpu2.set_pc(0x0200);
        let cycles_cross = cycles_for_one_instruction(&mut cpu2);

        assert_eq!(cycles_no_cross, cycles_cross);
        assert_eq!(0x42, cpu.read_mem(0x0011));
        assert_eq!(0x42, cpu2.read_mem(0x0100));
    }
}
