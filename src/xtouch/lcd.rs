//! Scribble-strip manager
//!
//! Each unit has two rows of eight 7-character cells. A cell is only written
//! when its formatted content differs from what was last sent.

use tracing::warn;

use super::ports::PortPair;
use crate::context::Context;
use crate::state::ContextStateVariable;
use crate::text::{format_cell, CELL_WIDTH};

pub const LCD_ROWS: usize = 2;
pub const LCD_CHANNELS: usize = 8;

/// SysEx command byte for scribble-strip text
const LCD_COMMAND: u8 = 0x12;

/// Characters per row of one unit
const ROW_LENGTH: usize = LCD_CHANNELS * CELL_WIDTH;

#[derive(Debug, Clone)]
pub struct LcdManager {
    ports: PortPair,
    cells: Vec<ContextStateVariable<Option<String>>>,
}

impl LcdManager {
    pub fn new(ports: PortPair) -> Self {
        let cells = (0..LCD_ROWS * LCD_CHANNELS)
            .map(|_| ContextStateVariable::named("lcd", None))
            .collect();
        Self { ports, cells }
    }

    /// Current content of a cell as last written
    pub fn cell_text(&self, ctx: &Context<'_>, row: usize, channel: usize) -> Option<String> {
        self.cells
            .get(row * LCD_CHANNELS + channel)
            .and_then(|cell| cell.get(ctx))
    }

    /// Format `text` for one cell and write it if it changed
    pub fn set_channel_text(&self, ctx: &mut Context<'_>, row: usize, channel: usize, text: &str) {
        if row >= LCD_ROWS || channel >= LCD_CHANNELS {
            warn!("LCD cell {}/{} out of range", row, channel);
            return;
        }

        let formatted = format_cell(text);
        let cell = &self.cells[row * LCD_CHANNELS + channel];
        if cell.get(ctx).as_deref() == Some(formatted.as_str()) {
            return;
        }
        cell.set(ctx, &Some(formatted.clone()));

        let offset = (row * ROW_LENGTH + channel * CELL_WIDTH) as u8;
        let mut body = Vec::with_capacity(2 + CELL_WIDTH);
        body.push(LCD_COMMAND);
        body.push(offset);
        body.extend(formatted.bytes());
        self.ports.send_sysex(ctx, &body);
    }

    /// Blank every cell
    pub fn clear(&self, ctx: &mut Context<'_>) {
        for row in 0..LCD_ROWS {
            for channel in 0..LCD_CHANNELS {
                self.set_channel_text(ctx, row, channel, "");
            }
        }
    }
}
