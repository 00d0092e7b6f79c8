use parking_lot::Mutex;

use crate::error::HardwareFault;
use crate::relay::GpioBackend;

// a released line floats high through the relay module's pull-up
const IDLE_LEVEL: u8 = 1;

#[derive(Default)]
pub struct MockGpioBackend {
    line: Mutex<MockLineState>,
}

#[derive(Default)]
struct MockLineState {
    driven: Option<u8>, // None while released (high impedance)
    closed: bool,
    failing: bool,
}

impl MockGpioBackend {
    /// Make every subsequent platform call fail, as if the GPIO syscall
    /// were rejected by the kernel.
    pub fn set_failing(&self, failing: bool) {
        self.line.lock().failing = failing;
    }

    pub fn driven_level(&self) -> Option<u8> {
        self.line.lock().driven
    }

    pub fn is_closed(&self) -> bool {
        self.line.lock().closed
    }

    fn check(state: &MockLineState) -> Result<(), HardwareFault> {
        if state.failing {
            return Err(HardwareFault("injected fault".into()));
        }
        if state.closed {
            return Err(HardwareFault("line already released".into()));
        }
        Ok(())
    }
}

impl GpioBackend for MockGpioBackend {
    fn drive(&self, level: u8) -> Result<(), HardwareFault> {
        let mut state = self.line.lock();
        Self::check(&state)?;

        state.driven = Some(if level == 0 { 0 } else { 1 });
        Ok(())
    }

    fn release(&self) -> Result<(), HardwareFault> {
        let mut state = self.line.lock();
        Self::check(&state)?;

        state.driven = None;
        Ok(())
    }

    fn read_level(&self) -> Result<u8, HardwareFault> {
        let state = self.line.lock();
        Self::check(&state)?;

        Ok(state.driven.unwrap_or(IDLE_LEVEL))
    }

    fn close(&self) -> Result<(), HardwareFault> {
        let mut state = self.line.lock();
        if state.failing {
            return Err(HardwareFault("injected fault".into()));
        }

        state.closed = true;
        Ok(())
    }
}
