// This file is part of mos64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use std::error::Error;
use std::fs::File;
use std::io::{self, Read};
use std::net::SocketAddr;
use std::path::PathBuf;

use structopt::StructOpt;

use mos64_core::factory::{SidModel, SystemModel};
use mos64_system::Config;

#[derive(StructOpt, Debug)]
#[structopt(name = "mos64")]
pub struct Opt {
    /// attach and autostart image (.d64, .g64, .tap, .crt, .prg, .p00)
    #[structopt(parse(from_os_str))]
    pub image: Option<PathBuf>,

    /// set NTSC or PAL variants
    #[structopt(long, default_value = "pal")]
    pub model: String,

    // -- Devices
    /// disable joystick port 1
    #[structopt(long = "no-joy1")]
    pub no_joy1: bool,
    /// enable joystick port 2
    #[structopt(long = "joy2")]
    pub joy2: bool,

    // -- Roms
    /// filename of the basic ROM
    #[structopt(long, parse(from_os_str))]
    pub basic: Option<PathBuf>,
    /// filename of the character generator ROM
    #[structopt(long, parse(from_os_str))]
    pub charset: Option<PathBuf>,
    /// filename of the kernal ROM
    #[structopt(long, parse(from_os_str))]
    pub kernal: Option<PathBuf>,

    // -- Sound
    /// disable sound synthesis
    #[structopt(long = "nosound")]
    pub no_sound: bool,
    /// disable SID filters
    #[structopt(long = "nosidfilters")]
    pub no_sid_filters: bool,
    /// SID chip revision to emulate
    #[structopt(long = "sid-model", default_value = "6581", parse(try_from_str = parse_sid_model))]
    pub sid_model: SidModel,
    /// set sound sample rate in Hz
    #[structopt(long = "sound-rate", default_value = "44100")]
    pub sound_rate: u32,
    /// set sound buffer size in samples
    #[structopt(long = "sound-samples", default_value = "4096")]
    pub sound_samples: u32,

    // -- Debug
    /// set breakpoint at this address
    #[structopt(long)]
    pub bp: Vec<u16>,
    /// start the line-oriented debugger console
    #[structopt(long)]
    pub debug: bool,
    /// address the debugger console binds to
    #[structopt(
        long = "dbg-address",
        default_value = "127.0.0.1:6510",
        parse(try_from_str = parse_socket_addr)
    )]
    pub dbg_address: SocketAddr,
    /// start the radare2 remote protocol server
    #[structopt(long)]
    pub rap: bool,
    /// address the rap server binds to
    #[structopt(
        long = "rap-address",
        default_value = "127.0.0.1:9999",
        parse(try_from_str = parse_socket_addr)
    )]
    pub rap_address: SocketAddr,

    // -- Logging
    /// set log level
    #[structopt(long = "loglevel", default_value = "info")]
    pub log_level: String,
    /// set log level for a target, as target=level
    #[structopt(long = "log", parse(try_from_str = parse_key_val))]
    pub log_target_level: Vec<(String, String)>,
}

pub fn build_emu_config(opt: &Opt) -> Result<Config, String> {
    let model = SystemModel::from_str(&opt.model)
        .ok_or_else(|| format!("invalid model {}", opt.model))?;
    let mut config = Config::new(model);
    config.joystick.port_1_connected = !opt.no_joy1;
    config.joystick.port_2_connected = opt.joy2;
    if let Some(path) = &opt.basic {
        config.roms.basic = load_file(path).map_err(|_| "invalid rom: basic".to_string())?;
    }
    if let Some(path) = &opt.charset {
        config.roms.charset = load_file(path).map_err(|_| "invalid rom: charset".to_string())?;
    }
    if let Some(path) = &opt.kernal {
        config.roms.kernal = load_file(path).map_err(|_| "invalid rom: kernal".to_string())?;
    }
    config.sound.enable = !opt.no_sound;
    config.sound.buffer_size = opt.sound_samples as usize;
    config.sound.sample_rate = opt.sound_rate;
    config.sound.sid_filters = !opt.no_sid_filters;
    config.sound.sid_model = opt.sid_model;
    Ok(config)
}

fn load_file(path: &PathBuf) -> Result<Vec<u8>, io::Error> {
    let mut data = Vec::new();
    let mut file = File::open(path)?;
    file.read_to_end(&mut data)?;
    Ok(data)
}

fn parse_key_val(s: &str) -> Result<(String, String), Box<dyn Error>> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid target=level pair: no `=` found in `{}`", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

fn parse_sid_model(s: &str) -> Result<SidModel, Box<dyn Error>> {
    match s {
        "6581" => Ok(SidModel::Mos6581),
        "8580" => Ok(SidModel::Mos8580),
        _ => Err(Box::<dyn Error>::from("invalid sid model".to_string())),
    }
}

fn parse_socket_addr(s: &str) -> Result<SocketAddr, Box<dyn Error>> {
    s.parse::<SocketAddr>()
        .map_err(|_| Box::<dyn Error>::from("invalid address".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_build_a_pal_config_with_joystick_1_only() {
        let opt = Opt::from_iter(vec!["mos64"]);
        let config = build_emu_config(&opt).unwrap();
        assert_eq!(SystemModel::PAL, config.model);
        assert!(config.joystick.port_1_connected);
        assert!(!config.joystick.port_2_connected);
        assert!(config.sound.enable);
    }

    #[test]
    fn ntsc_and_device_overrides_are_applied() {
        let opt = Opt::from_iter(vec!["mos64", "--model", "ntsc", "--no-joy1", "--joy2"]);
        let config = build_emu_config(&opt).unwrap();
        assert_eq!(SystemModel::NTSC, config.model);
        assert!(!config.joystick.port_1_connected);
        assert!(config.joystick.port_2_connected);
    }

    #[test]
    fn invalid_model_is_rejected() {
        let opt = Opt::from_iter(vec!["mos64", "--model", "bogus"]);
        assert!(build_emu_config(&opt).is_err());
    }

    #[test]
    fn nosound_disables_sound_config() {
        let opt = Opt::from_iter(vec!["mos64", "--nosound", "--nosidfilters"]);
        let config = build_emu_config(&opt).unwrap();
        assert!(!config.sound.enable);
        assert!(!config.sound.sid_filters);
    }

    #[test]
    fn key_val_parser_rejects_missing_equals() {
        assert!(parse_key_val("loglevel").is_err());
        assert_eq!(
            ("debugger".to_string(), "trace".to_string()),
            parse_key_val("debugger=trace").unwrap()
        );
    }
}
