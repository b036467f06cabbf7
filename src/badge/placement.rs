//! Nine-cell badge positioning and stacking.

use serde::{Deserialize, Serialize};

/// One of the nine fixed anchor cells inside a container.
///
/// Numbered row-major: 1-3 top row, 4-6 middle row, 7-9 bottom row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position(u8);

impl Default for Position {
    fn default() -> Self {
        Position(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Row {
    Top,
    Middle,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Left,
    Center,
    Right,
}

impl Position {
    /// Returns `None` outside 1..=9.
    pub fn new(cell: u8) -> Option<Self> {
        (1..=9).contains(&cell).then_some(Position(cell))
    }

    /// Like [`Position::new`] but falls back to the top-left cell.
    pub fn or_default(cell: u8) -> Self {
        Self::new(cell).unwrap_or_default()
    }

    pub fn cell(&self) -> u8 {
        self.0
    }

    pub fn row(&self) -> Row {
        match (self.0 - 1) / 3 {
            0 => Row::Top,
            1 => Row::Middle,
            _ => Row::Bottom,
        }
    }

    pub fn column(&self) -> Column {
        match (self.0 - 1) % 3 {
            0 => Column::Left,
            1 => Column::Center,
            _ => Column::Right,
        }
    }

    pub fn name(&self) -> &'static str {
        match self.0 {
            1 => "top-left",
            2 => "top-center",
            3 => "top-right",
            4 => "middle-left",
            5 => "center",
            6 => "middle-right",
            7 => "bottom-left",
            8 => "bottom-center",
            _ => "bottom-right",
        }
    }
}

/// Where a badge sits: its cell plus its slot within that cell's stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub position: Position,
    /// 0 for the first badge admitted at this position
    pub stack_index: usize,
}

impl Placement {
    pub fn new(position: Position, stack_index: usize) -> Self {
        Self { position, stack_index }
    }

    /// Stacking offset in pixels.
    pub fn offset_px(&self, spacing_px: u32) -> u32 {
        self.stack_index as u32 * spacing_px
    }

    /// Inline CSS declarations anchoring the badge.
    ///
    /// Stacks grow away from the anchored edge: downward for the top and
    /// middle rows, upward for the bottom row.
    pub fn css(&self, inset_px: u32, spacing_px: u32) -> String {
        let offset = self.offset_px(spacing_px);
        let mut declarations = Vec::with_capacity(4);

        match self.position.row() {
            Row::Top => declarations.push(format!("top:{}px", inset_px + offset)),
            Row::Middle => declarations.push(format!("top:calc(50% + {}px)", offset)),
            Row::Bottom => declarations.push(format!("bottom:{}px", inset_px + offset)),
        }

        match self.position.column() {
            Column::Left => declarations.push(format!("left:{}px", inset_px)),
            Column::Center => declarations.push("left:50%".to_string()),
            Column::Right => declarations.push(format!("right:{}px", inset_px)),
        }

        let transform = match (self.position.row(), self.position.column()) {
            (Row::Middle, Column::Center) => Some("translate(-50%,-50%)"),
            (Row::Middle, _) => Some("translateY(-50%)"),
            (_, Column::Center) => Some("translateX(-50%)"),
            _ => None,
        };
        if let Some(transform) = transform {
            declarations.push(format!("transform:{}", transform));
        }

        declarations.join(";")
    }
}
