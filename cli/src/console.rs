// This file is part of mos64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use std::net::SocketAddr;
use std::sync::mpsc;
use std::thread;

use mos64_debug::{Command, Debugger, RapServer, Session};
use mos64_system::C64;

/// Headless frame-stepping run loop. Optionally accepts a debugger console
/// and/or a radare2 remote protocol server on their own threads, draining
/// whatever `Command`s they queued between frames.
pub struct ConsoleApp {
    c64: C64,
    session: Session,
    command_tx: Option<mpsc::Sender<Command>>,
    command_rx: Option<mpsc::Receiver<Command>>,
}

impl ConsoleApp {
    pub fn new(c64: C64) -> Self {
        Self {
            c64,
            session: Session::new(),
            command_tx: None,
            command_rx: None,
        }
    }

    pub fn start_debugger(&mut self, addr: SocketAddr) {
        let command_tx = self.attach_command_channel();
        thread::spawn(move || {
            let debugger = Debugger::new(command_tx);
            if let Err(error) = debugger.start(addr) {
                error!(target: "main", "debugger console failed - {}", error);
            }
        });
    }

    pub fn start_rap_server(&mut self, addr: SocketAddr) {
        let command_tx = self.attach_command_channel();
        thread::spawn(move || {
            let rap_server = RapServer::new(command_tx);
            if let Err(error) = rap_server.start(addr) {
                error!(target: "main", "rap server failed - {}", error);
            }
        });
    }

    pub fn run(&mut self) {
        loop {
            if let Some(rx) = &self.command_rx {
                while let Ok(command) = rx.try_recv() {
                    self.session.execute(&mut self.c64, command);
                }
                if self.session.should_quit() {
                    break;
                }
            }
            let running = self.c64.run_frame();
            self.c64.reset_vsync();
            if self.c64.is_cpu_jam() {
                warn!(target: "main", "CPU JAM detected at 0x{:04x}", self.c64.get_cpu().get_pc());
                break;
            }
            if !running {
                break;
            }
        }
    }

    /// Both the debugger and the rap server clone the same sender, since
    /// only one connection is ever attached to the `Session` at a time.
    fn attach_command_channel(&mut self) -> mpsc::Sender<Command> {
        match &self.command_tx {
            Some(tx) => tx.clone(),
            None => {
                let (tx, rx) = mpsc::channel();
                self.command_tx = Some(tx.clone());
                self.command_rx = Some(rx);
                tx
            }
        }
    }
}
