// This file is part of mos64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

/// A CIA's time-of-day clock: BCD hours/minutes/seconds/tenths with a 12-hour
/// AM/PM rollover, as read and written through the TOD register bank.
pub struct Rtc {
    enabled: bool,
    hours: u8,
    minutes: u8,
    seconds: u8,
    tenth: u8,
    pm: bool,
}

impl Rtc {
    pub fn new() -> Self {
        Rtc {
            enabled: true,
            hours: 0,
            minutes: 0,
            seconds: 0,
            tenth: 0,
            pm: false,
        }
    }

    pub fn get_hours(&self) -> u8 {
        self.hours
    }

    pub fn get_minutes(&self) -> u8 {
        self.minutes
    }

    pub fn get_seconds(&self) -> u8 {
        self.seconds
    }

    pub fn get_tenth(&self) -> u8 {
        self.tenth
    }

    pub fn is_pm(&self) -> bool {
        self.pm
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn set_hours(&mut self, hours: u8) {
        self.hours = hours;
    }

    pub fn set_minutes(&mut self, minutes: u8) {
        self.minutes = minutes;
    }

    pub fn set_seconds(&mut self, seconds: u8) {
        self.seconds = seconds;
    }

    pub fn set_tenth(&mut self, tenth: u8) {
        self.tenth = tenth;
    }

    pub fn set_pm(&mut self, pm: bool) {
        self.pm = pm;
    }

    pub fn tick(&mut self) {
        if !self.enabled {
            return;
        }
        self.tenth += 1;
        if self.tenth == 10 {
            self.tenth = 0;
            self.seconds += 1;
            if self.seconds == 60 {
                self.seconds = 0;
                self.minutes += 1;
                if self.minutes == 60 {
                    self.minutes = 0;
                    if self.hours == 11 {
                        self.pm = !self.pm;
                    }
                    self.hours = if self.hours == 12 { 1 } else { self.hours + 1 };
                }
            }
        }
    }
}

impl PartialEq for Rtc {
    fn eq(&self, other: &Rtc) -> bool {
        self.hours == other.hours
            && self.minutes == other.minutes
            && self.seconds == other.seconds
            && self.tenth == other.tenth
            && self.pm == other.pm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_rolls_over_seconds_into_minutes() {
        let mut rtc = Rtc::new();
        rtc.set_seconds(59);
        rtc.set_tenth(9);
        rtc.tick();
        assert_eq!(0, rtc.get_seconds());
        assert_eq!(1, rtc.get_minutes());
    }

    #[test]
    fn tick_flips_am_pm_at_noon_rollover() {
        let mut rtc = Rtc::new();
        rtc.set_hours(11);
        rtc.set_minutes(59);
        rtc.set_seconds(59);
        rtc.set_tenth(9);
        rtc.set_pm(false);
        rtc.tick();
        assert_eq!(12, rtc.get_hours());
        assert_eq!(true, rtc.is_pm());
    }

    #[test]
    fn disabled_clock_does_not_tick() {
        let mut rtc = Rtc::new();
        rtc.set_enabled(false);
        rtc.tick();
        assert_eq!(0, rtc.get_tenth());
    }
}
