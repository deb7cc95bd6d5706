//! Optional JSON file with line settings that rarely change between runs.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use blocksend_core::{ForwardConfig, DEFAULT_TIMEOUT};
use log::debug;
use serde::Deserialize;

const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParitySetting {
    None,
    Odd,
    Even,
}

impl From<ParitySetting> for serialport::Parity {
    fn from(p: ParitySetting) -> Self {
        match p {
            ParitySetting::None => Self::None,
            ParitySetting::Odd => Self::Odd,
            ParitySetting::Even => Self::Even,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowControlSetting {
    None,
    Software,
    Hardware,
}

impl From<FlowControlSetting> for serialport::FlowControl {
    fn from(f: FlowControlSetting) -> Self {
        match f {
            FlowControlSetting::None => Self::None,
            FlowControlSetting::Software => Self::Software,
            FlowControlSetting::Hardware => Self::Hardware,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub data_bits: Option<u8>,
    pub parity: Option<ParitySetting>,
    pub stop_bits: Option<u8>,
    pub flow_control: Option<FlowControlSetting>,
    pub timeout_ms: Option<u64>,
    pub settle_ms: Option<u64>,
}

impl Settings {
    /// Loads `path` if given, else the per-user file if it exists, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match default_path() {
                Some(path) if path.is_file() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        let settings: Settings = serde_json::from_str(&text)
            .with_context(|| format!("parsing settings in {}", path.display()))?;
        debug!("loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn apply(&self, cfg: &mut ForwardConfig) -> Result<()> {
        if let Some(bits) = self.data_bits {
            cfg.serial.data_bits = match bits {
                5 => serialport::DataBits::Five,
                6 => serialport::DataBits::Six,
                7 => serialport::DataBits::Seven,
                8 => serialport::DataBits::Eight,
                other => bail!("data_bits must be 5, 6, 7 or 8, not {other}"),
            };
        }
        if let Some(bits) = self.stop_bits {
            cfg.serial.stop_bits = match bits {
                1 => serialport::StopBits::One,
                2 => serialport::StopBits::Two,
                other => bail!("stop_bits must be 1 or 2, not {other}"),
            };
        }
        if let Some(parity) = self.parity {
            cfg.serial.parity = parity.into();
        }
        if let Some(flow) = self.flow_control {
            cfg.serial.flow_control = flow.into();
        }
        if let Some(ms) = self.timeout_ms {
            let limit = Duration::from_millis(ms);
            cfg.write_timeout = Some(limit);
            cfg.serial.timeout = limit.min(DEFAULT_TIMEOUT);
        }
        if let Some(ms) = self.settle_ms {
            cfg.settle = Duration::from_millis(ms);
        }
        Ok(())
    }
}

fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("blocksend").join(CONFIG_FILE))
}
