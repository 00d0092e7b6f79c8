use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::warn;
use parking_lot::Mutex;
use serde::Serialize;

use crate::config::{Polarity, Topology};
use crate::error::HardwareFault;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RelayState {
    On,
    Off,
}

impl RelayState {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("ON") {
            Some(RelayState::On)
        } else if raw.eq_ignore_ascii_case("OFF") {
            Some(RelayState::Off)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RelayState::On => "ON",
            RelayState::Off => "OFF",
        }
    }
}

pub trait GpioBackend: Send + Sync {
    fn drive(&self, level: u8) -> Result<(), HardwareFault>;
    fn release(&self) -> Result<(), HardwareFault>;
    fn read_level(&self) -> Result<u8, HardwareFault>;
    fn close(&self) -> Result<(), HardwareFault>;
}

pub struct RelayDriver<B: GpioBackend> {
    topology: Topology,
    polarity: Polarity,
    backend: Arc<B>,
    // actuation is a physical side effect, concurrent requests must not
    // interleave on the line
    op_lock: Mutex<()>,
    closed: AtomicBool,
}

impl<B: GpioBackend> RelayDriver<B> {
    pub fn new(topology: Topology, polarity: Polarity, backend: Arc<B>) -> Self {
        Self {
            topology,
            polarity,
            backend,
            op_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
        }
    }

    fn on_level(&self) -> u8 {
        match (self.topology, self.polarity) {
            (Topology::OpenDrain, _) => 0,
            (Topology::PushPull, Polarity::ActiveLow) => 0,
            (Topology::PushPull, Polarity::ActiveHigh) => 1,
        }
    }

    fn apply_on(&self) -> Result<(), HardwareFault> {
        self.backend.drive(self.on_level())
    }

    fn apply_off(&self) -> Result<(), HardwareFault> {
        match (self.topology, self.polarity) {
            // OFF releases the line, whatever the trigger polarity
            (Topology::OpenDrain, _) => self.backend.release(),
            (Topology::PushPull, Polarity::ActiveLow) => self.backend.drive(1),
            (Topology::PushPull, Polarity::ActiveHigh) => self.backend.drive(0),
        }
    }

    pub fn init_safe(&self) -> Result<(), HardwareFault> {
        let _op = self.op_lock.lock();
        self.apply_off()
    }

    pub fn turn_on(&self) -> Result<(), HardwareFault> {
        let _op = self.op_lock.lock();
        self.apply_on()
    }

    pub fn turn_off(&self) -> Result<(), HardwareFault> {
        let _op = self.op_lock.lock();
        self.apply_off()
    }

    pub fn read_state(&self) -> Result<RelayState, HardwareFault> {
        let _op = self.op_lock.lock();
        let raw = self.backend.read_level()?;

        Ok(if raw == self.on_level() {
            RelayState::On
        } else {
            RelayState::Off
        })
    }

    // best-effort: teardown must never be blocked by a failing line
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _op = self.op_lock.lock();

        if let Err(e) = self.apply_off() {
            warn!("could not force relay off during shutdown: {e}");
        }
        if let Err(e) = self.backend.close() {
            warn!("could not release GPIO line during shutdown: {e}");
        }
    }
}

impl<B: GpioBackend> Drop for RelayDriver<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockGpioBackend;

    const COMBOS: [(Topology, Polarity); 4] = [
        (Topology::OpenDrain, Polarity::ActiveLow),
        (Topology::OpenDrain, Polarity::ActiveHigh),
        (Topology::PushPull, Polarity::ActiveLow),
        (Topology::PushPull, Polarity::ActiveHigh),
    ];

    fn rig(
        topology: Topology,
        polarity: Polarity,
    ) -> (RelayDriver<MockGpioBackend>, Arc<MockGpioBackend>) {
        let backend = Arc::new(MockGpioBackend::default());
        (
            RelayDriver::new(topology, polarity, backend.clone()),
            backend,
        )
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(RelayState::parse("ON"), Some(RelayState::On));
        assert_eq!(RelayState::parse("on"), Some(RelayState::On));
        assert_eq!(RelayState::parse(" Off "), Some(RelayState::Off));
        assert_eq!(RelayState::parse("TOGGLE"), None);
        assert_eq!(RelayState::parse(""), None);
    }

    #[test]
    fn init_safe_reads_off_for_every_wiring() {
        for (topology, polarity) in COMBOS {
            let (driver, _) = rig(topology, polarity);

            driver.init_safe().unwrap();
            assert_eq!(
                driver.read_state().unwrap(),
                RelayState::Off,
                "{topology:?}/{polarity:?}"
            );

            // re-applying the safe state must not flip anything
            driver.init_safe().unwrap();
            assert_eq!(
                driver.read_state().unwrap(),
                RelayState::Off,
                "{topology:?}/{polarity:?}"
            );
        }
    }

    #[test]
    fn readback_follows_actuation_for_every_wiring() {
        for (topology, polarity) in COMBOS {
            let (driver, _) = rig(topology, polarity);
            driver.init_safe().unwrap();

            driver.turn_on().unwrap();
            assert_eq!(
                driver.read_state().unwrap(),
                RelayState::On,
                "{topology:?}/{polarity:?}"
            );

            driver.turn_off().unwrap();
            assert_eq!(
                driver.read_state().unwrap(),
                RelayState::Off,
                "{topology:?}/{polarity:?}"
            );
        }
    }

    #[test]
    fn repeated_actuation_is_idempotent() {
        for (topology, polarity) in COMBOS {
            let (driver, backend) = rig(topology, polarity);
            driver.init_safe().unwrap();

            driver.turn_on().unwrap();
            let once = backend.driven_level();
            driver.turn_on().unwrap();
            assert_eq!(backend.driven_level(), once);
            assert_eq!(driver.read_state().unwrap(), RelayState::On);
        }
    }

    #[test]
    fn round_trip_matches_single_actuation() {
        for (topology, polarity) in COMBOS {
            let (driver, backend) = rig(topology, polarity);
            driver.init_safe().unwrap();

            driver.turn_on().unwrap();
            let single = backend.driven_level();

            driver.turn_off().unwrap();
            driver.turn_on().unwrap();
            assert_eq!(backend.driven_level(), single, "{topology:?}/{polarity:?}");
        }
    }

    #[test]
    fn open_drain_off_releases_the_line() {
        let (driver, backend) = rig(Topology::OpenDrain, Polarity::ActiveLow);

        driver.init_safe().unwrap();
        assert_eq!(backend.driven_level(), None);

        driver.turn_on().unwrap();
        assert_eq!(backend.driven_level(), Some(0));

        driver.turn_off().unwrap();
        assert_eq!(backend.driven_level(), None);
    }

    #[test]
    fn push_pull_levels_follow_polarity() {
        let (driver, backend) = rig(Topology::PushPull, Polarity::ActiveLow);
        driver.turn_on().unwrap();
        assert_eq!(backend.driven_level(), Some(0));
        driver.turn_off().unwrap();
        assert_eq!(backend.driven_level(), Some(1));

        let (driver, backend) = rig(Topology::PushPull, Polarity::ActiveHigh);
        driver.turn_on().unwrap();
        assert_eq!(backend.driven_level(), Some(1));
        driver.turn_off().unwrap();
        assert_eq!(backend.driven_level(), Some(0));
    }

    #[test]
    fn shutdown_forces_off_and_is_idempotent() {
        let (driver, backend) = rig(Topology::PushPull, Polarity::ActiveHigh);
        driver.init_safe().unwrap();
        driver.turn_on().unwrap();

        driver.shutdown();
        assert_eq!(backend.driven_level(), Some(0));
        assert!(backend.is_closed());

        driver.shutdown();
        assert!(backend.is_closed());
    }

    #[test]
    fn shutdown_swallows_backend_faults() {
        let (driver, backend) = rig(Topology::OpenDrain, Polarity::ActiveLow);
        driver.init_safe().unwrap();
        driver.turn_on().unwrap();

        backend.set_failing(true);
        driver.shutdown();
    }
}
