// This file is part of mos64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

#[macro_use]
extern crate log;

mod cli;
mod console;
mod logger;
mod sink;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::process;
use std::rc::Rc;
use std::sync::Arc;

use structopt::StructOpt;

use mos64_core::util::new_shared;
use mos64_loader::Loaders;
use mos64_system::{C64Factory, C64};

use crate::cli::Opt;
use crate::console::ConsoleApp;
use crate::logger::Logger;
use crate::sink::{NullSound, NullVideo};

static NAME: &str = "mos64";

fn main() {
    let opt = Opt::from_args();
    match run(&opt) {
        Ok(()) => process::exit(0),
        Err(err) => {
            eprintln!("Error: {}", err);
            process::exit(1)
        }
    }
}

fn run(opt: &Opt) -> Result<(), String> {
    let logger = Logger::build(&opt.log_level, &opt.log_target_level)?;
    Logger::enable(logger)?;
    info!("Starting {}", NAME);
    let config = Rc::new(cli::build_emu_config(opt)?);
    let chip_factory = Box::new(C64Factory::new(config.clone()));
    let mut c64 = C64::build(
        config,
        &*chip_factory,
        new_shared(NullVideo {}),
        Arc::new(NullSound {}),
    );
    c64.reset(true);
    for bp in &opt.bp {
        c64.get_bpm_mut().set(*bp, false);
    }
    if let Some(image_path) = &opt.image {
        load_image(&mut c64, Path::new(image_path))?;
    }
    let mut app = ConsoleApp::new(c64);
    if opt.debug {
        app.start_debugger(opt.dbg_address);
    }
    if opt.rap {
        app.start_rap_server(opt.rap_address);
    }
    app.run();
    Ok(())
}

fn load_image(c64: &mut C64, path: &Path) -> Result<(), String> {
    let ext = path.extension().and_then(|s| s.to_str());
    let loader = Loaders::from_ext(ext);
    let file = File::open(path).map_err(|err| format!("{}", err))?;
    let mut reader = BufReader::new(file);
    let mut autostart = loader.autostart(&mut reader)?;
    autostart.execute(c64);
    Ok(())
}
