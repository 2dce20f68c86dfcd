//! Monitor configuration
//!
//! Every field has a default, so an empty document (or no file at all) gives
//! the settings the reference firmware expects:
//!
//! ```yaml
//! serial:
//!   baud_rate: 460800
//!   data_bits: 8
//!   stop_bits: 1
//!   parity: none
//!   flow_control: none
//! display:
//!   width: 128
//!   height: 64
//!   reset_on_clear: false
//! ack_byte: 7
//! read_buffer_size: 4096
//! event_capacity: 1024
//! replay:
//!   chunk_size: 64
//!   interval_ms: 0
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::display::{CELL_HEIGHT, CELL_WIDTH, DisplayGeometry};
use crate::protocol::ACK_BYTE;
use crate::{LcdError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Even,
    Odd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowControl {
    #[default]
    None,
    Hardware,
    Software,
}

/// Serial line settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub baud_rate: u32,
    pub data_bits: u8,
    pub stop_bits: u8,
    pub parity: Parity,
    pub flow_control: FlowControl,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 460_800,
            data_bits: 8,
            stop_bits: 1,
            parity: Parity::None,
            flow_control: FlowControl::None,
        }
    }
}

impl SerialConfig {
    pub fn validate(&self) -> Result<()> {
        if self.baud_rate == 0 {
            return Err(LcdError::config_error("serial.baud_rate must be positive"));
        }
        if !(5..=8).contains(&self.data_bits) {
            return Err(LcdError::config_error(format!(
                "serial.data_bits must be 5..=8, got {}",
                self.data_bits
            )));
        }
        if !(1..=2).contains(&self.stop_bits) {
            return Err(LcdError::config_error(format!(
                "serial.stop_bits must be 1 or 2, got {}",
                self.stop_bits
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub width: usize,
    pub height: usize,
    /// Treat "clear display" as a full reset, zeroing the command counter
    pub reset_on_clear: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        let geometry = DisplayGeometry::REFERENCE;
        Self { width: geometry.width, height: geometry.height, reset_on_clear: false }
    }
}

impl DisplayConfig {
    pub fn geometry(&self) -> DisplayGeometry {
        DisplayGeometry::new(self.width, self.height)
    }
}

/// How a captured stream is fed back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Bytes per chunk handed to the decoder
    pub chunk_size: usize,
    /// Delay between chunks, 0 = as fast as possible
    pub interval_ms: u64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self { chunk_size: 64, interval_ms: 0 }
    }
}

impl ReplayConfig {
    pub fn interval(&self) -> Option<Duration> {
        (self.interval_ms > 0).then(|| Duration::from_millis(self.interval_ms))
    }
}

/// Top-level settings for a monitoring session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub serial: SerialConfig,
    pub display: DisplayConfig,
    /// Written back after every received chunk
    pub ack_byte: u8,
    pub read_buffer_size: usize,
    /// Events buffered per subscriber before it starts missing them
    pub event_capacity: usize,
    pub replay: ReplayConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            serial: SerialConfig::default(),
            display: DisplayConfig::default(),
            ack_byte: ACK_BYTE,
            read_buffer_size: 4096,
            event_capacity: 1024,
            replay: ReplayConfig::default(),
        }
    }
}

impl MonitorConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: MonitorConfig = serde_yaml_ng::from_str(yaml)
            .map_err(|e| LcdError::config_error(format!("YAML parse error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| LcdError::file_error(path.to_path_buf(), e))?;
        debug!("Loaded config from {} ({} bytes)", path.display(), yaml.len());
        Self::from_yaml_str(&yaml)
    }

    pub fn validate(&self) -> Result<()> {
        self.serial.validate()?;

        let DisplayConfig { width, height, .. } = self.display;
        if width < CELL_WIDTH || height < CELL_HEIGHT {
            return Err(LcdError::config_error(format!(
                "display {}x{} is smaller than one {}x{} cell",
                width, height, CELL_WIDTH, CELL_HEIGHT
            )));
        }
        if height % CELL_HEIGHT != 0 {
            return Err(LcdError::config_error(format!(
                "display.height {} is not a multiple of {}",
                height, CELL_HEIGHT
            )));
        }
        if self.read_buffer_size == 0 {
            return Err(LcdError::config_error("read_buffer_size must be positive"));
        }
        if self.event_capacity == 0 {
            return Err(LcdError::config_error("event_capacity must be positive"));
        }
        if self.replay.chunk_size == 0 {
            return Err(LcdError::config_error("replay.chunk_size must be positive"));
        }
        Ok(())
    }
}
