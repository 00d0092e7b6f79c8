use std::path::PathBuf;

use libgpiod::{chip::Chip, line, request};
use parking_lot::FairMutex;

use crate::error::HardwareFault;
use crate::relay::GpioBackend;

pub struct LibgpiodBackend {
    offset: u32,
    handle: FairMutex<Option<GpiodHandle>>,
}

struct GpiodHandle {
    request: request::Request,
}

impl GpiodHandle {
    fn new(chip: &str, line_cfg: &line::Config) -> Result<Self, HardwareFault> {
        let chip = Self::open_chip(chip)?;
        let request = Self::request_lines(&chip, line_cfg)?;
        Ok(Self { request })
    }

    fn open_chip(path: &str) -> Result<Chip, HardwareFault> {
        let p = PathBuf::from(path);
        Chip::open(&p).map_err(|e| HardwareFault(format!("open chip {path}: {e}")))
    }

    fn request_lines(
        chip: &Chip,
        line_cfg: &line::Config,
    ) -> Result<request::Request, HardwareFault> {
        let mut req_cfg =
            request::Config::new().map_err(|e| HardwareFault(format!("request config: {e}")))?;
        req_cfg
            .set_consumer(env!("CARGO_PKG_NAME"))
            .map_err(|e| HardwareFault(format!("request consumer: {e}")))?;
        chip.request_lines(Some(&req_cfg), line_cfg)
            .map_err(|e| HardwareFault(format!("request lines: {e}")))
    }
}

impl LibgpiodBackend {
    pub fn new(chip: &str, offset: u32) -> Result<Self, HardwareFault> {
        // request the line as a floating input so nothing is driven before
        // the first explicit state change
        let settings = Self::input_settings()?;
        let line_cfg = Self::make_line_config(offset, settings)?;
        let handle = GpiodHandle::new(chip, &line_cfg)?;

        Ok(Self {
            offset,
            handle: FairMutex::new(Some(handle)),
        })
    }

    fn input_settings() -> Result<line::Settings, HardwareFault> {
        let mut ls =
            line::Settings::new().map_err(|e| HardwareFault(format!("libgpiod settings: {e}")))?;
        ls.set_direction(line::Direction::Input)
            .map_err(|e| HardwareFault(format!("set direction: {e}")))?;
        ls.set_bias(None)
            .map_err(|e| HardwareFault(format!("set bias: {e}")))?;
        Ok(ls)
    }

    fn output_settings(level: u8) -> Result<line::Settings, HardwareFault> {
        let mut ls =
            line::Settings::new().map_err(|e| HardwareFault(format!("libgpiod settings: {e}")))?;
        ls.set_direction(line::Direction::Output)
            .map_err(|e| HardwareFault(format!("set direction: {e}")))?;
        ls.set_drive(line::Drive::PushPull)
            .map_err(|e| HardwareFault(format!("set drive: {e}")))?;
        ls.set_output_value(level_to_value(level))
            .map_err(|e| HardwareFault(format!("set output value: {e}")))?;
        Ok(ls)
    }

    fn make_line_config(
        offset: u32,
        settings: line::Settings,
    ) -> Result<line::Config, HardwareFault> {
        let mut cfg = line::Config::new().map_err(|e| HardwareFault(format!("line config: {e}")))?;
        cfg.add_line_settings(&[offset], settings)
            .map_err(|e| HardwareFault(format!("line config add settings: {e}")))?;
        Ok(cfg)
    }

    fn reconfigure(&self, settings: line::Settings) -> Result<(), HardwareFault> {
        let line_cfg = Self::make_line_config(self.offset, settings)?;
        let handle = self.handle.lock();
        let handle = handle
            .as_ref()
            .ok_or_else(|| HardwareFault("GPIO line already released".into()))?;

        handle
            .request
            .reconfigure_lines(&line_cfg)
            .map_err(|e| HardwareFault(format!("reconfigure lines: {e}")))
    }
}

impl GpioBackend for LibgpiodBackend {
    fn drive(&self, level: u8) -> Result<(), HardwareFault> {
        self.reconfigure(Self::output_settings(level)?)
    }

    fn release(&self) -> Result<(), HardwareFault> {
        self.reconfigure(Self::input_settings()?)
    }

    fn read_level(&self) -> Result<u8, HardwareFault> {
        let handle = self.handle.lock();
        let handle = handle
            .as_ref()
            .ok_or_else(|| HardwareFault("GPIO line already released".into()))?;

        let value = handle
            .request
            .value(self.offset)
            .map_err(|e| HardwareFault(format!("get value: {e}")))?;
        Ok(match value {
            line::Value::InActive => 0,
            line::Value::Active => 1,
        })
    }

    fn close(&self) -> Result<(), HardwareFault> {
        // dropping the request hands the line back to the kernel
        self.handle.lock().take();
        Ok(())
    }
}

fn level_to_value(level: u8) -> line::Value {
    match level {
        0 => line::Value::InActive,
        _ => line::Value::Active,
    }
}
