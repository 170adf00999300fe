// This file is part of mos64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use std::collections::HashMap;
use std::str::FromStr;

use log::{LogLevel, LogMetadata, LogRecord, SetLoggerError};

pub struct Logger {
    level: LogLevel,
    targets: HashMap<String, LogLevel>,
}

impl Logger {
    pub fn build(level: &str, target_levels: &[(String, String)]) -> Result<Logger, String> {
        let level =
            LogLevel::from_str(level).map_err(|_| format!("invalid log level {}", level))?;
        let mut logger = Logger {
            level,
            targets: HashMap::new(),
        };
        for (target, level) in target_levels {
            logger.add_target(target.clone(), level.clone())?;
        }
        Ok(logger)
    }

    pub fn enable(logger: Logger) -> Result<(), String> {
        log::set_logger(|max_log_level| {
            max_log_level.set(logger.get_level().to_log_level_filter());
            Box::new(logger)
        })
        .map_err(|_: SetLoggerError| "cannot initialize logging".to_string())
    }

    fn add_target(&mut self, target: String, level: String) -> Result<(), String> {
        let loglevel = LogLevel::from_str(&level)
            .map_err(|_| format!("invalid log level {} for target {}", level, target))?;
        self.targets.insert(target, loglevel);
        Ok(())
    }

    fn get_level(&self) -> LogLevel {
        self.level
    }
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &LogMetadata) -> bool {
        self.targets
            .get(metadata.target())
            .map_or(metadata.level() <= self.level, |target_level| {
                metadata.level() <= *target_level
            })
    }

    fn log(&self, record: &LogRecord) {
        if self.enabled(record.metadata()) {
            println!("{} [{}] - {}", record.level(), record.target(), record.args());
        }
    }
}
