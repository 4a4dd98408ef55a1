//! 7-segment display manager
//!
//! The main unit has 12 cells: 10 for the transport time (cell 0 is the
//! rightmost digit) and 2 for the assignment display. Every cell remembers the
//! byte last written and only changed bytes go out. Extenders have no segment
//! display and never receive these writes.

use tracing::{debug, warn};

use super::notes::{cc, BEATS_LED, SMPTE_LED};
use super::ports::PortPair;
use crate::context::Context;
use crate::state::ContextStateVariable;

pub const SEGMENT_CELLS: usize = 12;
pub const TIME_CELLS: usize = 10;
pub const ASSIGNMENT_CELLS: usize = SEGMENT_CELLS - TIME_CELLS;

const DOT: u8 = 0x40;

/// Content of one cell, not counting its dot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentGlyph {
    Digit(u8),
    Blank,
    Char(char),
}

impl SegmentGlyph {
    pub fn from_char(c: char) -> Self {
        match c {
            '0'..='9' => Self::Digit(c as u8 - b'0'),
            ' ' => Self::Blank,
            _ => Self::Char(c),
        }
    }

    /// Mackie 7-segment character code
    pub fn code(self) -> u8 {
        match self {
            Self::Digit(d) => 0x30 + d.min(9),
            Self::Blank => 0x20,
            Self::Char(c) => {
                if !c.is_ascii() {
                    return 0x20;
                }
                let c = c.to_ascii_uppercase() as u8;
                match c {
                    b'@'..=b'`' => c - 0x40,
                    b' '..=b'?' => c,
                    _ => 0x20,
                }
            }
        }
    }
}

fn is_dot(c: char) -> bool {
    c == '.' || c == ':'
}

/// Left-pad the last three time groups to 2, 2 and 3 digits and the whole
/// rendering to the time cells
fn pad_time(time: &str) -> String {
    let mut groups = vec![String::new()];
    let mut separators = Vec::new();
    for c in time.chars() {
        if is_dot(c) {
            separators.push(c);
            groups.push(String::new());
        } else if let Some(group) = groups.last_mut() {
            group.push(c);
        }
    }

    let count = groups.len();
    for (from_end, width) in [(3, 2), (2, 2), (1, 3)] {
        if let Some(group) = count.checked_sub(from_end).and_then(|i| groups.get_mut(i)) {
            *group = format!("{:>width$}", group, width = width);
        }
    }

    let mut rendered = String::new();
    for (i, group) in groups.iter().enumerate() {
        rendered.push_str(group);
        if let Some(&separator) = separators.get(i) {
            rendered.push(separator);
        }
    }

    let digits = rendered.chars().filter(|&c| !is_dot(c)).count();
    if digits < TIME_CELLS {
        rendered.insert_str(0, &" ".repeat(TIME_CELLS - digits));
    }
    rendered
}

#[derive(Debug, Clone)]
pub struct SegmentDisplayManager {
    outputs: Vec<PortPair>,
    cells: Vec<ContextStateVariable<Option<u8>>>,
    time_format: ContextStateVariable<Option<String>>,
}

impl SegmentDisplayManager {
    /// Manage the display of every unit in `ports` that has one
    pub fn new<I>(ports: I) -> Self
    where
        I: IntoIterator<Item = PortPair>,
    {
        let outputs = ports
            .into_iter()
            .filter(|p| p.kind().has_segment_display())
            .collect();
        let cells = (0..SEGMENT_CELLS)
            .map(|_| ContextStateVariable::named("segment", None))
            .collect();

        Self {
            outputs,
            cells,
            time_format: ContextStateVariable::named("time-format", None),
        }
    }

    /// Byte last written to a cell
    pub fn cell_byte(&self, ctx: &Context<'_>, cell: usize) -> Option<u8> {
        self.cells.get(cell).and_then(|c| c.get(ctx))
    }

    pub fn update_segment(&self, ctx: &mut Context<'_>, cell: usize, glyph: SegmentGlyph, has_dot: bool) {
        let Some(state) = self.cells.get(cell) else {
            warn!("Segment cell {} out of range", cell);
            return;
        };

        let byte = glyph.code() + if has_dot { DOT } else { 0 };
        if state.get(ctx) == Some(byte) {
            return;
        }
        state.set(ctx, &Some(byte));

        for ports in &self.outputs {
            ports.send_control_change(ctx, cc::SEGMENT + cell as u8, byte);
        }
    }

    /// Render `text` right-aligned from cell `start` upwards
    ///
    /// `.` and `:` light the dot of the character before them instead of
    /// taking a cell of their own.
    pub fn update_segments_by_string(&self, ctx: &mut Context<'_>, start: usize, text: &str) {
        self.render(ctx, start, SEGMENT_CELLS, text);
    }

    fn render(&self, ctx: &mut Context<'_>, start: usize, end: usize, text: &str) {
        let mut cell = start;
        let mut dot = false;
        for c in text.chars().rev() {
            if is_dot(c) {
                dot = true;
                continue;
            }
            if cell >= end {
                break;
            }
            self.update_segment(ctx, cell, SegmentGlyph::from_char(c), dot);
            dot = false;
            cell += 1;
        }
    }

    /// Show a transport time such as `"1.01.04.120"` or `"00:01:02:10"`
    ///
    /// The SMPTE and BEATS LEDs follow `format` and are only resent when the
    /// format changes.
    pub fn update_time(&self, ctx: &mut Context<'_>, time: &str, format: &str) {
        if self.time_format.get(ctx).as_deref() != Some(format) {
            self.time_format.set(ctx, &Some(format.to_string()));

            let smpte = format.split(':').count() == 4;
            let beats = format.split('.').count() == 4;
            debug!("Time format '{}' (smpte: {}, beats: {})", format, smpte, beats);
            for ports in &self.outputs {
                ports.send_note_on(ctx, SMPTE_LED, smpte as u8);
                ports.send_note_on(ctx, BEATS_LED, beats as u8);
            }
        }

        self.render(ctx, 0, TIME_CELLS, &pad_time(time));
    }

    /// Blank the time cells and forget the time format
    pub fn clear_time(&self, ctx: &mut Context<'_>) {
        for cell in 0..TIME_CELLS {
            self.update_segment(ctx, cell, SegmentGlyph::Blank, false);
        }
        self.time_format.set(ctx, &None);
    }

    /// Show up to two characters on the assignment display
    pub fn set_assignment(&self, ctx: &mut Context<'_>, text: &str) {
        let padded = format!("{:>width$}", text, width = ASSIGNMENT_CELLS);
        self.render(ctx, TIME_CELLS, SEGMENT_CELLS, &padded);
    }

    pub fn clear_assignment(&self, ctx: &mut Context<'_>) {
        for cell in TIME_CELLS..SEGMENT_CELLS {
            self.update_segment(ctx, cell, SegmentGlyph::Blank, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{MemoryStore, Outbox};
    use crate::xtouch::device::DeviceKind;

    fn display() -> (SegmentDisplayManager, PortPair) {
        let main = PortPair::new(DeviceKind::Main, None, None);
        let ext = PortPair::new(DeviceKind::Extender, None, None);
        (SegmentDisplayManager::new([main.clone(), ext]), main)
    }

    #[test]
    fn test_glyph_codes() {
        assert_eq!(SegmentGlyph::Digit(7).code(), 0x37);
        assert_eq!(SegmentGlyph::Blank.code(), 0x20);
        assert_eq!(SegmentGlyph::Char('A').code(), 0x01);
        assert_eq!(SegmentGlyph::Char('e').code(), 0x05);
        assert_eq!(SegmentGlyph::Char('-').code(), b'-');
        assert_eq!(SegmentGlyph::Char('ß').code(), 0x20);
    }

    #[test]
    fn test_same_digit_written_once_to_main_units() {
        let mut store = MemoryStore::new();
        let mut outbox = Outbox::new();
        let mut ctx = Context::new(&mut store, &mut outbox);

        let (display, main) = display();
        display.update_segment(&mut ctx, 3, SegmentGlyph::Digit(5), true);
        display.update_segment(&mut ctx, 3, SegmentGlyph::Digit(5), true);

        assert_eq!(ctx.frames().len(), 1);
        assert_eq!(ctx.frames()[0].port, main.id());
        assert_eq!(ctx.frames()[0].bytes, vec![0xB0, 0x43, 0x75]);

        display.update_segment(&mut ctx, 3, SegmentGlyph::Digit(5), false);
        assert_eq!(ctx.frames().len(), 2);
    }

    #[test]
    fn test_dot_belongs_to_preceding_character() {
        let mut store = MemoryStore::new();
        let mut outbox = Outbox::new();
        let mut ctx = Context::new(&mut store, &mut outbox);

        let (display, _) = display();
        display.update_segments_by_string(&mut ctx, 0, "1.2");

        assert_eq!(display.cell_byte(&ctx, 0), Some(0x32));
        assert_eq!(display.cell_byte(&ctx, 1), Some(0x31 + 0x40));
        assert_eq!(display.cell_byte(&ctx, 2), None);
    }

    #[test]
    fn test_colon_lights_dot() {
        let mut store = MemoryStore::new();
        let mut outbox = Outbox::new();
        let mut ctx = Context::new(&mut store, &mut outbox);

        let (display, _) = display();
        display.update_segments_by_string(&mut ctx, 0, "4:2");

        assert_eq!(display.cell_byte(&ctx, 0), Some(0x32));
        assert_eq!(display.cell_byte(&ctx, 1), Some(0x34 + 0x40));
    }

    #[test]
    fn test_text_past_last_cell_is_dropped() {
        let mut store = MemoryStore::new();
        let mut outbox = Outbox::new();
        let mut ctx = Context::new(&mut store, &mut outbox);

        let (display, _) = display();
        display.update_segments_by_string(&mut ctx, 9, "1234");

        assert_eq!(display.cell_byte(&ctx, 9), Some(0x34));
        assert_eq!(display.cell_byte(&ctx, 10), Some(0x33));
        assert_eq!(display.cell_byte(&ctx, 11), Some(0x32));
        assert_eq!(ctx.frames().len(), 3);
    }

    #[test]
    fn test_time_longer_than_time_cells_keeps_assignment() {
        let mut store = MemoryStore::new();
        let mut outbox = Outbox::new();
        let mut ctx = Context::new(&mut store, &mut outbox);

        let (display, _) = display();
        display.set_assignment(&mut ctx, "12");
        display.update_time(&mut ctx, "123456:78:90:123", "000000:00:00:000");

        assert_eq!(display.cell_byte(&ctx, 10), Some(0x32));
        assert_eq!(display.cell_byte(&ctx, 11), Some(0x31));
    }

    #[test]
    fn test_pad_time_groups() {
        assert_eq!(pad_time("1.1.1.0"), "  1. 1. 1.  0");
        assert_eq!(pad_time("00:01:02:10"), " 00:01:02: 10");
        assert_eq!(pad_time("123:45:12:100"), "123:45:12:100");
    }

    #[test]
    fn test_time_leds_follow_format_changes() {
        let mut store = MemoryStore::new();
        let mut outbox = Outbox::new();
        let mut ctx = Context::new(&mut store, &mut outbox);

        let (display, _) = display();
        let led_frames = |ctx: &Context<'_>| {
            ctx.frames()
                .iter()
                .filter(|f| f.bytes[0] == 0x90)
                .map(|f| f.bytes.clone())
                .collect::<Vec<_>>()
        };

        display.update_time(&mut ctx, "00:00:01:00", "hh:mm:ss:ff");
        display.update_time(&mut ctx, "00:00:01:01", "hh:mm:ss:ff");
        assert_eq!(
            led_frames(&ctx),
            vec![vec![0x90, SMPTE_LED, 0x7F], vec![0x90, BEATS_LED, 0x00]]
        );

        display.update_time(&mut ctx, "1.1.1.000", "bars.beats.sub.ticks");
        assert_eq!(led_frames(&ctx).len(), 4);
        assert_eq!(led_frames(&ctx)[2], vec![0x90, SMPTE_LED, 0x00]);
        assert_eq!(led_frames(&ctx)[3], vec![0x90, BEATS_LED, 0x7F]);
    }

    #[test]
    fn test_time_rendering() {
        let mut store = MemoryStore::new();
        let mut outbox = Outbox::new();
        let mut ctx = Context::new(&mut store, &mut outbox);

        let (display, _) = display();
        display.update_time(&mut ctx, "2.3.4.120", "b.b.s.t");

        // Ticks in cells 0..3, sub-division with dot in 3..5
        assert_eq!(display.cell_byte(&ctx, 0), Some(0x30));
        assert_eq!(display.cell_byte(&ctx, 1), Some(0x32));
        assert_eq!(display.cell_byte(&ctx, 2), Some(0x31));
        assert_eq!(display.cell_byte(&ctx, 3), Some(0x34 + 0x40));
        assert_eq!(display.cell_byte(&ctx, 4), Some(0x20));
        assert_eq!(display.cell_byte(&ctx, 9), Some(0x20));
        assert_eq!(display.cell_byte(&ctx, TIME_CELLS), None);
    }

    #[test]
    fn test_regions_clear_independently() {
        let mut store = MemoryStore::new();
        let mut outbox = Outbox::new();
        let mut ctx = Context::new(&mut store, &mut outbox);

        let (display, _) = display();
        display.set_assignment(&mut ctx, "23");
        display.update_time(&mut ctx, "1.1.1.000", "b.b.s.t");

        display.clear_time(&mut ctx);
        assert_eq!(display.cell_byte(&ctx, 10), Some(0x33));
        assert_eq!(display.cell_byte(&ctx, 11), Some(0x32));
        assert_eq!(display.cell_byte(&ctx, 0), Some(0x20));

        display.clear_assignment(&mut ctx);
        assert_eq!(display.cell_byte(&ctx, 11), Some(0x20));
    }
}
