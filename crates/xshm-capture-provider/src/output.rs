use core::fmt::Display;

use crate::{BYTES_PER_PIXEL, CursorPosition};

/// The desktop rectangle covered by one output, in global screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutputRect {
    /// The position of the top left corner of the output in pixels.
    pub position: [i32; 2],

    /// The size of the output in pixels.
    pub size: [u32; 2],
}

impl OutputRect {
    /// Create a rect from its top left corner and size.
    pub const fn new(position: [i32; 2], size: [u32; 2]) -> Self {
        Self { position, size }
    }

    /// The output width in pixels.
    pub const fn width(&self) -> u32 {
        self.size[0]
    }

    /// The output height in pixels.
    pub const fn height(&self) -> u32 {
        self.size[1]
    }

    /// The exclusive right edge.
    fn right(&self) -> i64 {
        i64::from(self.position[0]) + i64::from(self.size[0])
    }

    /// The exclusive bottom edge.
    fn bottom(&self) -> i64 {
        i64::from(self.position[1]) + i64::from(self.size[1])
    }

    /// Returns whether a global point lies inside the output. The right and bottom edges are
    /// exclusive.
    pub fn contains(&self, point: [i32; 2]) -> bool {
        let [x, y] = point.map(i64::from);

        x >= i64::from(self.position[0])
            && x < self.right()
            && y >= i64::from(self.position[1])
            && y < self.bottom()
    }

    /// The cursor position relative to the top left corner of the output, or `None` if the
    /// cursor is on another output.
    pub fn relative_cursor(&self, cursor: CursorPosition) -> Option<[u32; 2]> {
        if !self.contains([cursor.x, cursor.y]) {
            return None;
        }

        let x = i64::from(cursor.x) - i64::from(self.position[0]);
        let y = i64::from(cursor.y) - i64::from(self.position[1]);

        Some([x as u32, y as u32])
    }

    /// The smallest rect that covers both `self` and `other`.
    pub fn union(&self, other: &Self) -> Self {
        let left = self.position[0].min(other.position[0]);
        let top = self.position[1].min(other.position[1]);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());

        Self {
            position: [left, top],
            size: [
                (right - i64::from(left)) as u32,
                (bottom - i64::from(top)) as u32,
            ],
        }
    }

    /// The number of bytes a BGRA8 frame of this output occupies.
    pub fn expected_frame_length(&self) -> usize {
        self.size[0] as usize * self.size[1] as usize * BYTES_PER_PIXEL
    }
}

impl Display for OutputRect {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{}x{}{:+}{:+}",
            self.size[0], self.size[1], self.position[0], self.position[1]
        )
    }
}
