//! Display sysex encoding
//!
//! Builds `[0xF0, vendor(3), device, command, payload.., 0xF7]` frames for
//! scribble-strip text and strip colours. Independent of the bank logic; the
//! bridge only uses it to push bank labels when a display is configured.

use serde::{Deserialize, Serialize};

const SYSEX_START: u8 = 0xF0;
const SYSEX_END: u8 = 0xF7;

/// Characters per strip cell
pub const CELL_WIDTH: usize = 7;

/// 8-bit RGB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Identity bytes and command codes of the display protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct DisplayConfig {
    #[serde(default = "default_vendor_id")]
    pub vendor_id: [u8; 3],
    #[serde(default = "default_device_id")]
    pub device_id: u8,
    #[serde(default = "default_text_command")]
    pub text_command: u8,
    #[serde(default = "default_color_command")]
    pub color_command: u8,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            vendor_id: default_vendor_id(),
            device_id: default_device_id(),
            text_command: default_text_command(),
            color_command: default_color_command(),
        }
    }
}

impl DisplayConfig {
    fn frame(&self, command: u8, payload: impl IntoIterator<Item = u8>) -> Vec<u8> {
        let mut data = vec![SYSEX_START];
        data.extend(self.vendor_id.iter().map(|b| b & 0x7F));
        data.push(self.device_id & 0x7F);
        data.push(command & 0x7F);
        data.extend(payload.into_iter().map(|b| b & 0x7F));
        data.push(SYSEX_END);
        data
    }

    /// Text at character `offset`. Non-ASCII characters become `?`.
    pub fn encode_text(&self, offset: u8, text: &str) -> Vec<u8> {
        let payload = std::iter::once(offset).chain(text.chars().map(|c| {
            if c.is_ascii() && !c.is_ascii_control() {
                c as u8
            } else {
                b'?'
            }
        }));
        self.frame(self.text_command, payload)
    }

    /// One strip cell, truncated or space-padded to [`CELL_WIDTH`]
    pub fn encode_cell(&self, column: u8, line: u8, text: &str) -> Vec<u8> {
        let offset = column as usize * CELL_WIDTH + line as usize * CELL_WIDTH * 8;
        let cell: String = format!("{:<width$}", text, width = CELL_WIDTH)
            .chars()
            .take(CELL_WIDTH)
            .collect();
        self.encode_text(offset.min(0x7F) as u8, &cell)
    }

    /// Colours as 7-bit RGB triples
    pub fn encode_colors(&self, colors: &[Rgb]) -> Vec<u8> {
        let payload = colors.iter().flat_map(|c| [c.r >> 1, c.g >> 1, c.b >> 1]);
        self.frame(self.color_command, payload)
    }
}

fn default_vendor_id() -> [u8; 3] { [0x00, 0x00, 0x66] }
fn default_device_id() -> u8 { 0x14 }
fn default_text_command() -> u8 { 0x12 }
fn default_color_command() -> u8 { 0x72 }
