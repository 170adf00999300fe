// This file is part of mos64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

#![cfg_attr(feature = "cargo-clippy", allow(clippy::cast_lossless))]

#[cfg(not(feature = "std"))]
use alloc::prelude::*;
#[cfg(not(feature = "std"))]
use alloc::rc::Rc;
#[cfg(not(feature = "std"))]
use alloc::sync::Arc;
#[cfg(feature = "std")]
use std::rc::Rc;
#[cfg(feature = "std")]
use std::sync::Arc;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use mos64_core::factory::*;
use mos64_core::util::*;
use mos64_emu::device::{Cartridge, Datassette, Joystick, Keyboard};
use mos64_emu::drive::Vc1541;
use mos64_emu::mem::{ExpansionPort, Pla};

use super::breakpoint::BreakpointManager;
use super::snapshot::{SnapshotError, SNAPSHOT_VERSION};
use super::{Autostart, Config};

// Design:
//   C64 represents the machine itself and all of its components. Connections between different
//   components are managed as component dependencies. Cycle dispatch is explicit: every clocked
//   chip exposes `clock()`, and `step_internal` calls them in the order a real C64's bus arbiter
//   would resolve them for a single cycle.

#[allow(dead_code)]
#[derive(Copy, Clone)]
enum BaseAddr {
    Basic = 0xa000,
    BootComplete = 0xa65c,
    Charset = 0xd000,
    Kernal = 0xe000,
}

impl BaseAddr {
    pub fn addr(self) -> u16 {
        self as u16
    }
}

pub(super) const MEMORY_SIZE: usize = 0x10000;
pub(super) const COLOR_RAM_SIZE: usize = 0x0400;

/// Bits of CIA 2 port A used by the serial (IEC) bus, alongside the VIC
/// bank-select bits (0-1) that port already carries. Output bits read back
/// as 1 when this side is pulling the matching line low; input bits read
/// back as 1 when the line is released/high and 0 when some device (this
/// side included) is holding it down. Bit 2 (RS-232 TXD on real hardware)
/// is left alone.
mod iec_bit {
    pub const ATN_OUT: u8 = 0x08;
    pub const CLK_OUT: u8 = 0x10;
    pub const DATA_OUT: u8 = 0x20;
    pub const CLK_IN: usize = 6;
    pub const DATA_IN: usize = 7;
}

pub struct C64 {
    // Dependencies
    config: Rc<Config>,
    // Chipset
    cpu: Box<dyn Cpu>,
    cia_1: Shared<dyn Chip>,
    cia_2: Shared<dyn Chip>,
    sid: Shared<dyn Chip>,
    vic: Shared<dyn Chip>,
    // Memory
    color_ram: Shared<Ram>,
    expansion_port: Shared<ExpansionPort>,
    mmu: Shared<Pla>,
    ram: Shared<Ram>,
    // Peripherals
    datassette: Shared<Datassette>,
    joystick_1: Option<Joystick>,
    joystick_2: Option<Joystick>,
    joystick_1_state: SharedCell<u8>,
    joystick_2_state: SharedCell<u8>,
    keyboard: Keyboard,
    drives: Vec<Vc1541>,
    cia_2_port_a: Shared<IoPort>,
    // Buffers
    frame_buffer: Shared<dyn VideoOutput>,
    sound_buffer: Arc<dyn SoundOutput>,
    // Runtime State
    autostart: Option<Autostart>,
    breakpoints: BreakpointManager,
    clock: Rc<Clock>,
    frame_count: u32,
    last_pc: u16,
    vsync_flag: SharedCell<bool>,
}

impl C64 {
    pub fn build(
        config: Rc<Config>,
        factory: &dyn ChipFactory,
        frame_buffer: Shared<dyn VideoOutput>,
        sound_buffer: Arc<dyn SoundOutput>,
    ) -> C64 {
        info!(target: "c64", "Initializing system");
        // Buffers
        let clock = Rc::new(Clock::default());
        let joystick_1_state = new_shared_cell(0u8);
        let joystick_2_state = new_shared_cell(0u8);
        let keyboard_matrix = new_shared([0; 16]);
        let vsync_flag = new_shared_cell(false);
        let vic_base_address = new_shared_cell(0u16);

        // I/O Lines
        let ba_line = new_shared(Pin::new(true));
        let cpu_io_port = new_shared(IoPort::new(0x00, 0xff));
        let cia_1_flag_pin = new_shared(Pin::new(false));
        let cia_1_port_a = new_shared(IoPort::new(0x00, 0xff));
        let cia_1_port_b = new_shared(IoPort::new(0x00, 0xff));
        let cia_2_flag_pin = new_shared(Pin::new(false));
        let cia_2_port_a = new_shared(IoPort::new(0x00, 0xff));
        let cia_2_port_b = new_shared(IoPort::new(0x00, 0xff));
        let exp_io_line = new_shared(IoPort::new(0xff, 0xff));
        let irq_line = new_shared(IrqLine::new("irq"));
        let nmi_line = new_shared(IrqLine::new("nmi"));

        // Memory
        let color_ram = factory.new_ram(COLOR_RAM_SIZE);
        let ram = factory.new_ram(MEMORY_SIZE);
        let rom_basic = factory.new_rom(config.roms.basic.as_slice(), BaseAddr::Basic.addr());
        let rom_charset = factory.new_rom(config.roms.charset.as_slice(), 0);
        let rom_kernal = factory.new_rom(config.roms.kernal.as_slice(), BaseAddr::Kernal.addr());

        // Chipset
        let cia_1 = factory.new_cia_1(
            joystick_1_state.clone(),
            joystick_2_state.clone(),
            keyboard_matrix.clone(),
            cia_1_port_a.clone(),
            cia_1_port_b.clone(),
            cia_1_flag_pin.clone(),
            irq_line.clone(),
        );
        let cia_2 = factory.new_cia_2(
            cia_2_port_a.clone(),
            cia_2_port_b.clone(),
            cia_2_flag_pin.clone(),
            nmi_line.clone(),
        );
        let sid = factory.new_sid(config.sound.sid_model, clock.clone(), sound_buffer.clone());
        let vic = factory.new_vic(
            config.model.vic_model,
            color_ram.clone(),
            ram.clone(),
            rom_charset.clone(),
            vic_base_address.clone(),
            frame_buffer.clone(),
            vsync_flag.clone(),
            ba_line.clone(),
            irq_line.clone(),
        );

        // Memory Controller and Processor
        let expansion_port = new_shared(ExpansionPort::new(exp_io_line.clone()));
        let mmu = new_shared(Pla::new());
        let mem = factory.new_memory(
            mmu.clone(),
            cia_1.clone(),
            cia_2.clone(),
            color_ram.clone(),
            expansion_port.clone(),
            ram.clone(),
            rom_basic.clone(),
            rom_charset.clone(),
            rom_kernal.clone(),
            sid.clone(),
            vic.clone(),
        );
        let cpu = factory.new_cpu(
            mem.clone(),
            cpu_io_port.clone(),
            ba_line.clone(),
            irq_line.clone(),
            nmi_line.clone(),
        );

        // Peripherals
        let datassette = new_shared(Datassette::new(cpu_io_port.clone(), cia_1_flag_pin.clone()));
        let joystick_1 = if config.joystick.port_1_connected {
            Some(Joystick::new())
        } else {
            None
        };
        let joystick_2 = if config.joystick.port_2_connected {
            Some(Joystick::new())
        } else {
            None
        };
        let keyboard = Keyboard::new(keyboard_matrix.clone());

        // Observers
        let exp_io_line_clone_1 = exp_io_line.clone();
        let mmu_clone_1 = mmu.clone();
        cpu_io_port
            .borrow_mut()
            .set_observer(Box::new(move |cpu_port| {
                let expansion_port_io = exp_io_line_clone_1.borrow().get_value();
                let mode = cpu_port & 0x07 | expansion_port_io & 0x18;
                mmu_clone_1.borrow_mut().switch_banks(mode);
            }));

        let cpu_io_port_clone_2 = cpu_io_port.clone();
        let mmu_clone_2 = mmu.clone();
        exp_io_line
            .borrow_mut()
            .set_observer(Box::new(move |expansion_port_io| {
                let cpu_port_io = cpu_io_port_clone_2.borrow().get_value();
                let mode = cpu_port_io & 0x07 | expansion_port_io & 0x18;
                mmu_clone_2.borrow_mut().switch_banks(mode);
            }));
        let vic_base_address_clone = vic_base_address.clone();
        cia_2_port_a
            .borrow_mut()
            .set_observer(Box::new(move |value| {
                let base_address = ((!value & 0x03) as u16) << 14;
                vic_base_address_clone.set(base_address);
            }));

        C64 {
            config,
            cpu,
            cia_1: cia_1.clone(),
            cia_2: cia_2.clone(),
            sid: sid.clone(),
            vic: vic.clone(),
            color_ram: color_ram.clone(),
            expansion_port: expansion_port.clone(),
            mmu,
            ram: ram.clone(),
            datassette,
            joystick_1,
            joystick_2,
            joystick_1_state,
            joystick_2_state,
            keyboard,
            drives: Vec::new(),
            cia_2_port_a,
            frame_buffer: frame_buffer.clone(),
            sound_buffer: sound_buffer.clone(),
            autostart: None,
            breakpoints: BreakpointManager::default(),
            clock,
            frame_count: 0,
            last_pc: 0,
            vsync_flag,
        }
    }

    pub fn get_bpm(&self) -> &BreakpointManager {
        &self.breakpoints
    }

    pub fn get_bpm_mut(&mut self) -> &mut BreakpointManager {
        &mut self.breakpoints
    }

    pub fn get_clock(&self) -> Rc<Clock> {
        self.clock.clone()
    }

    pub fn get_config(&self) -> &Config {
        &self.config
    }

    pub fn get_cpu(&self) -> &dyn Cpu {
        &*self.cpu
    }

    pub fn get_cpu_mut(&mut self) -> &mut dyn Cpu {
        &mut *self.cpu
    }

    pub fn get_cycles(&self) -> u64 {
        self.clock.get()
    }

    pub fn get_cia_1(&self) -> Shared<dyn Chip> {
        self.cia_1.clone()
    }

    pub fn get_cia_2(&self) -> Shared<dyn Chip> {
        self.cia_2.clone()
    }

    pub fn get_datasette(&self) -> Shared<Datassette> {
        self.datassette.clone()
    }

    pub fn get_frame_count(&self) -> u32 {
        self.frame_count
    }

    pub fn get_joystick1(&self) -> &Option<Joystick> {
        &self.joystick_1
    }

    pub fn get_joystick1_mut(&mut self) -> &mut Option<Joystick> {
        &mut self.joystick_1
    }

    pub fn get_joystick2(&self) -> &Option<Joystick> {
        &self.joystick_2
    }

    pub fn get_joystick2_mut(&mut self) -> &mut Option<Joystick> {
        &mut self.joystick_2
    }

    pub fn get_keyboard(&mut self) -> &mut Keyboard {
        &mut self.keyboard
    }

    pub fn get_sid(&self) -> Shared<dyn Chip> {
        self.sid.clone()
    }

    pub fn get_vic(&self) -> Shared<dyn Chip> {
        self.vic.clone()
    }

    pub fn get_vsync(&self) -> bool {
        self.vsync_flag.get()
    }

    pub fn is_cpu_jam(&self) -> bool {
        self.last_pc == self.cpu.get_pc()
    }

    pub fn set_autostart(&mut self, autostart: Option<Autostart>) {
        self.autostart = autostart;
    }

    pub fn reset_vsync(&self) {
        self.vsync_flag.set(false)
    }

    pub fn check_breakpoints(&mut self) -> bool {
        self.breakpoints.check(&*self.cpu).is_some()
    }

    pub fn load(&mut self, data: &[u8], offset: u16) {
        let mut mem = self.ram.borrow_mut();
        let mut address = offset;
        for byte in data {
            mem.write(address, *byte);
            address = address.wrapping_add(1);
        }
    }

    pub fn reset(&mut self, hard: bool) {
        info!(target: "c64", "Resetting system");
        self.clock.reset();
        // Memory
        if hard {
            for i in 0..MEMORY_SIZE as u32 {
                self.ram.borrow_mut().write(i as u16, 0x00);
            }
            for i in 0..COLOR_RAM_SIZE as u32 {
                self.color_ram.borrow_mut().write(i as u16, 0x00);
            }
        }
        // Chipset
        self.cpu.reset();
        self.cia_1.borrow_mut().reset();
        self.cia_2.borrow_mut().reset();
        self.sid.borrow_mut().reset();
        self.vic.borrow_mut().reset();
        // I/O
        self.expansion_port.borrow_mut().reset();
        // Peripherals
        self.datassette.borrow_mut().reset();
        if let Some(ref mut joystick) = self.joystick_1 {
            joystick.reset();
        }
        if let Some(ref mut joystick) = self.joystick_2 {
            joystick.reset();
        }
        self.keyboard.reset();
        for drive in self.drives.iter_mut() {
            drive.reset();
        }
        self.frame_buffer.borrow_mut().reset();
        self.sound_buffer.reset();
        // Runtime State
        self.frame_count = 0;
        self.last_pc = 0;
        self.vsync_flag.set(false);
    }

    pub fn run_frame(&mut self) -> bool {
        let bp_present = self.breakpoints.is_bp_present();
        while !self.vsync_flag.get() {
            self.step_internal();
            if bp_present && self.check_breakpoints() {
                break;
            }
        }
        if self.vsync_flag.get() {
            self.sid.borrow_mut().process_vsync();
            self.cia_1.borrow_mut().process_vsync();
            self.cia_2.borrow_mut().process_vsync();
            self.frame_count = self.frame_count.wrapping_add(1);
        }
        self.vsync_flag.get()
    }

    pub fn step(&mut self) {
        self.step_internal();
        if self.vsync_flag.get() {
            self.sid.borrow_mut().process_vsync();
            self.cia_1.borrow_mut().process_vsync();
            self.cia_2.borrow_mut().process_vsync();
            self.frame_count = self.frame_count.wrapping_add(1);
        }
    }

    /// Advances every clocked component by one master cycle, in the order a
    /// real bus arbiter resolves them: joystick state is latched first so
    /// CIA 1 sees this cycle's reading, then both CIAs run (producing the
    /// IRQ/NMI state the CPU will see), then VIC (which may pull BA/RDY low
    /// before the CPU's turn), then the CPU itself (stalling on a low BA),
    /// then the attached cartridge's own clock hook, then every VC1541
    /// drive, then the serial bus recompute those drives' clocking may have
    /// changed, and finally the datassette.
    #[inline]
    fn step_internal(&mut self) {
        self.last_pc = self.cpu.get_pc();
        if let Some(ref joystick) = self.joystick_1 {
            self.joystick_1_state.set(joystick.port_value());
        }
        if let Some(ref joystick) = self.joystick_2 {
            self.joystick_2_state.set(joystick.port_value());
        }
        self.cia_1.borrow_mut().clock();
        self.cia_2.borrow_mut().clock();
        self.vic.borrow_mut().clock();
        self.cpu.clock();
        self.expansion_port.borrow_mut().execute(1);
        let overrides = self.expansion_port.borrow().peek_poke_overrides();
        self.mmu.borrow_mut().apply_overrides(&overrides);
        for drive in self.drives.iter_mut() {
            drive.clock();
        }
        self.update_serial_bus();
        self.datassette.borrow_mut().clock();
        self.clock.tick();
        if self.autostart.is_some() && self.cpu.get_pc() == BaseAddr::BootComplete.addr() {
            if let Some(mut autostart) = self.autostart.take() {
                autostart.execute(self);
            }
        }
    }

    /// Resolves the wired-AND IEC bus for this cycle: the C64's own CIA 2
    /// port A pulls and every attached drive's VIA 1 pulls are ORed
    /// together, then the result is latched back onto both sides. ATN is
    /// only ever driven by the C64.
    fn update_serial_bus(&mut self) {
        let c64_out = self.cia_2_port_a.borrow().get_value();
        let atn_low = c64_out & iec_bit::ATN_OUT != 0;
        let mut clk_low = c64_out & iec_bit::CLK_OUT != 0;
        let mut data_low = c64_out & iec_bit::DATA_OUT != 0;
        for drive in &self.drives {
            let (drive_clk_low, drive_data_low) = drive.serial_out();
            clk_low |= drive_clk_low;
            data_low |= drive_data_low;
        }
        self.cia_2_port_a
            .borrow_mut()
            .set_input_bit(iec_bit::CLK_IN, !clk_low);
        self.cia_2_port_a
            .borrow_mut()
            .set_input_bit(iec_bit::DATA_IN, !data_low);
        for drive in self.drives.iter_mut() {
            drive.apply_serial_bus(atn_low, clk_low, data_low);
        }
    }

    // -- Peripherals Ops

    pub fn attach_cartridge(&mut self, cartridge: Cartridge) {
        self.expansion_port.borrow_mut().attach(cartridge);
    }

    pub fn attach_tape(&mut self, tape: Box<dyn Tape>) {
        self.datassette.borrow_mut().attach(tape);
    }

    pub fn detach_cartridge(&mut self) {
        self.expansion_port.borrow_mut().detach();
        self.reset(false);
    }

    pub fn detach_tape(&mut self) {
        self.datassette.borrow_mut().detach();
    }

    /// Attaches a VC1541 drive with the given ROM image at device number
    /// `device_number` (8-11); the drive then shares the serial bus with
    /// the C64 and every other attached drive.
    pub fn attach_drive(&mut self, device_number: u8, rom_data: &[u8]) {
        self.drives
            .push(Vc1541::new(rom_data, device_number.saturating_sub(8)));
    }

    pub fn drives(&mut self) -> &mut [Vc1541] {
        &mut self.drives
    }

    // -- Snapshot

    /// Serializes CPU registers, main RAM and color RAM into a versioned
    /// byte stream. Chip register state (CIA, SID, VIC) is deliberately
    /// left out: their `Chip::read` is side-effecting by design (an ICR or
    /// SID envelope read clears/advances real state), so there's no
    /// non-destructive way to peek it without adding a second introspection
    /// surface to every chip. Reloading a snapshot therefore resumes
    /// execution with the CPU/memory image exactly as saved, while CIA/SID/
    /// VIC start back up from their last natural state.
    pub fn save_snapshot(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(3 + MEMORY_SIZE + COLOR_RAM_SIZE + 8);
        buf.push(SNAPSHOT_VERSION.0);
        buf.push(SNAPSHOT_VERSION.1);
        buf.push(SNAPSHOT_VERSION.2);
        buf.extend_from_slice(self.ram.borrow().as_slice());
        buf.extend_from_slice(self.color_ram.borrow().as_slice());
        buf.push(self.cpu.get_register(Register::A));
        buf.push(self.cpu.get_register(Register::X));
        buf.push(self.cpu.get_register(Register::Y));
        buf.push(self.cpu.get_register(Register::Sp));
        buf.push(self.cpu.get_register(Register::P));
        buf.write_u16::<LittleEndian>(self.cpu.get_pc())
            .expect("writing to a Vec never fails");
        buf.push(self.cpu.read(0x0001));
        buf
    }

    /// Restores state written by `save_snapshot`. Writing the saved
    /// processor-port byte back through `Cpu::write` (rather than poking it
    /// directly into RAM) re-triggers the same bank-switch observer normal
    /// execution uses, so $A000/$D000/$E000 visibility comes back correct.
    pub fn load_snapshot(&mut self, data: &[u8]) -> Result<(), SnapshotError> {
        let header_len = 3;
        let trailer_len = 8;
        let total_len = header_len + MEMORY_SIZE + COLOR_RAM_SIZE + trailer_len;
        if data.len() != total_len {
            return Err(SnapshotError::Corrupt);
        }
        if (data[0], data[1], data[2]) != SNAPSHOT_VERSION {
            return Err(SnapshotError::VersionMismatch);
        }
        let ram_start = header_len;
        let ram_end = ram_start + MEMORY_SIZE;
        let color_end = ram_end + COLOR_RAM_SIZE;
        self.ram.borrow_mut().load(&data[ram_start..ram_end], 0);
        self.color_ram
            .borrow_mut()
            .load(&data[ram_end..color_end], 0);
        let trailer = &data[color_end..];
        self.cpu.set_register(Register::A, trailer[0]);
        self.cpu.set_register(Register::X, trailer[1]);
        self.cpu.set_register(Register::Y, trailer[2]);
        self.cpu.set_register(Register::Sp, trailer[3]);
        self.cpu.set_register(Register::P, trailer[4]);
        let pc = (&trailer[5..7])
            .read_u16::<LittleEndian>()
            .map_err(|_| SnapshotError::Corrupt)?;
        self.cpu.set_pc(pc);
        self.cpu.write(0x0001, trailer[7]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::C64Factory;
    use super::*;
    use mos64_core::factory::SystemModel;

    fn synthetic_rom(fill: u8, len: usize) -> Vec<u8> {
        vec![fill; len]
    }

    fn build_c64() -> C64 {
        let config = Rc::new(Config::new_with_roms(
            SystemModel::PAL,
            &synthetic_rom(0x94, 0x2000),
            &synthetic_rom(0x00, 0x1000),
            &synthetic_rom(0x60, 0x2000),
        ));
        let factory = Box::new(C64Factory::new(config.clone()));
        let video_output = new_shared(NullVideo {});
        let sound_output = Arc::new(NullSound {});
        C64::build(config, &*factory, video_output, sound_output)
    }

    #[test]
    fn verify_mem_layout() {
        let mut c64 = build_c64();
        c64.reset(false);
        let cpu = c64.get_cpu();
        assert_eq!(0x94, cpu.read(0xa000));
        assert_eq!(0x60, cpu.read(0xe000));
    }

    #[test]
    fn attached_drive_shares_the_serial_bus() {
        let mut c64 = build_c64();
        c64.reset(false);
        c64.attach_drive(8, &synthetic_rom(0xea, 0x4000));
        assert_eq!(1, c64.drives().len());
        for _ in 0..10 {
            c64.step();
        }
    }

    #[test]
    fn snapshot_round_trip_restores_ram_registers_and_pc() {
        let mut c64 = build_c64();
        c64.reset(false);
        c64.get_cpu_mut().write(0x0002, 0x42);
        c64.get_cpu_mut().write(0xa000, 0x77); // writes fall through to RAM under the mapped ROM
        c64.get_cpu_mut().set_register(Register::A, 0x11);
        c64.get_cpu_mut().set_register(Register::X, 0x22);
        c64.get_cpu_mut().set_register(Register::Y, 0x33);
        c64.get_cpu_mut().set_pc(0x1234);

        let saved = c64.save_snapshot();

        c64.get_cpu_mut().write(0x0002, 0x99);
        c64.get_cpu_mut().set_register(Register::A, 0xff);
        c64.get_cpu_mut().set_pc(0x5678);
        c64.reset(true); // hard reset, clears RAM too

        c64.load_snapshot(&saved).unwrap();

        assert_eq!(0x42, c64.get_cpu().read(0x0002));
        assert_eq!(0x11, c64.get_cpu().get_register(Register::A));
        assert_eq!(0x22, c64.get_cpu().get_register(Register::X));
        assert_eq!(0x33, c64.get_cpu().get_register(Register::Y));
        assert_eq!(0x1234, c64.get_cpu().get_pc());
        assert_eq!(0x94, c64.get_cpu().read(0xa000)); // ROM still mapped in, unaffected by the RAM write
    }

    #[test]
    fn snapshot_round_trip_restores_bank_switch_state() {
        let mut c64 = build_c64();
        c64.reset(false);
        c64.get_cpu_mut().write(0x0001, 0b110); // LORAM=0: $a000 reads RAM, not BASIC
        assert_ne!(0x94, c64.get_cpu().read(0xa000));

        let saved = c64.save_snapshot();

        c64.get_cpu_mut().write(0x0001, 0b111); // LORAM=1 again: BASIC visible
        assert_eq!(0x94, c64.get_cpu().read(0xa000));

        c64.load_snapshot(&saved).unwrap();
        assert_ne!(0x94, c64.get_cpu().read(0xa000));
    }

    #[test]
    fn snapshot_rejects_wrong_version_and_truncated_data() {
        let mut c64 = build_c64();
        c64.reset(false);
        let mut saved = c64.save_snapshot();
        saved[0] = SNAPSHOT_VERSION.0.wrapping_add(1);
        assert_eq!(Err(SnapshotError::VersionMismatch), c64.load_snapshot(&saved));

        let truncated = vec![SNAPSHOT_VERSION.0, SNAPSHOT_VERSION.1, SNAPSHOT_VERSION.2];
        assert_eq!(Err(SnapshotError::Corrupt), c64.load_snapshot(&truncated));
    }

    #[test]
    fn bank_switch_via_processor_port_moves_basic_rom_in_and_out() {
        let mut c64 = build_c64();
        c64.reset(false);
        assert_eq!(0x94, c64.get_cpu().read(0xa000));

        // LORAM=0 maps RAM under BASIC; HIRAM/CHAREN stay set.
        c64.get_cpu_mut().write(0x0001, 0b110);
        assert_ne!(0x94, c64.get_cpu().read(0xa000));

        // Restore LORAM, BASIC ROM becomes visible again.
        c64.get_cpu_mut().write(0x0001, 0b111);
        assert_eq!(0x94, c64.get_cpu().read(0xa000));
    }

    #[test]
    fn cia_1_timer_a_irq_stops_the_cpu_at_the_interrupt_vector() {
        let mut c64 = build_c64();
        c64.reset(false);
        // Map every bank to RAM so the IRQ vector we write at $fffe/$ffff
        // is actually visible instead of being shadowed by the KERNAL ROM.
        c64.get_cpu_mut().write(0x0001, 0x00);
        // Main program spins in place at $0200 so the only way PC ever
        // reaches $0300 is via the CIA's hardware IRQ, not a fall-through.
        c64.get_cpu_mut().write(0x0200, 0x4c); // JMP $0200
        c64.get_cpu_mut().write(0x0201, 0x00);
        c64.get_cpu_mut().write(0x0202, 0x02);
        // IRQ/BRK vector at $fffe/$ffff points into a tight idle loop at $0300.
        c64.get_cpu_mut().write(0xfffe, 0x00);
        c64.get_cpu_mut().write(0xffff, 0x03);
        c64.get_cpu_mut().write(0x0300, 0x4c); // JMP $0300
        c64.get_cpu_mut().write(0x0301, 0x00);
        c64.get_cpu_mut().write(0x0302, 0x03);
        c64.get_cpu_mut().set_pc(0x0200);

        {
            use mos64_core::io::cia::reg;
            let cia_1 = c64.get_cia_1();
            let mut cia_1 = cia_1.borrow_mut();
            cia_1.write(reg::TALO, 100);
            cia_1.write(reg::TAHI, 0x00);
            cia_1.write(reg::CRA, 0b0000_0001); // start, one-shot off, phi2
            cia_1.write(reg::ICR, 0b1000_0001); // unmask timer A underflow
        }

        for _ in 0..2_000 {
            c64.step();
            if c64.get_cpu().get_pc() == 0x0300 {
                break;
            }
        }
        assert_eq!(0x0300, c64.get_cpu().get_pc());
    }

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
}
