use std::fmt;
use std::sync::Arc;

/// Which of the two alternating stimulus images is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Board {
    A,
    B,
}

impl Board {
    /// Board shown after the `k`-th half-period boundary (boundary 0 is the onset).
    pub fn for_boundary(k: u64) -> Self {
        if k % 2 == 0 { Board::A } else { Board::B }
    }
}

/// Immutable RGBA8 image sized to the display.
#[derive(Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    data: Arc<[u8]>,
}

impl FrameBuffer {
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(4)?;
        if data.len() != expected {
            return None;
        }
        Some(Self {
            width,
            height,
            data: data.into(),
        })
    }

    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let data: Vec<u8> = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            width,
            height,
            data: data.into(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let px = &self.data[i..i + 4];
        Some([px[0], px[1], px[2], px[3]])
    }

    /// True when both buffers share the same allocation.
    pub fn shares_storage(&self, other: &FrameBuffer) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// A board ready for display, already adjusted for the trial's brightness.
#[derive(Debug, Clone)]
pub struct PresentationFrame {
    pub board: Board,
    pub brightness: f64,
    pub buffer: FrameBuffer,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boards_alternate_from_a() {
        let seq: Vec<Board> = (0..4).map(Board::for_boundary).collect();
        assert_eq!(seq, vec![Board::A, Board::B, Board::A, Board::B]);
    }

    #[test]
    fn frame_buffer_checks_length() {
        assert!(FrameBuffer::from_rgba(2, 2, vec![0; 16]).is_some());
        assert!(FrameBuffer::from_rgba(2, 2, vec![0; 15]).is_none());
        let solid = FrameBuffer::solid(3, 2, [10, 20, 30, 255]);
        assert_eq!(solid.pixel(2, 1), Some([10, 20, 30, 255]));
        assert_eq!(solid.pixel(3, 0), None);
    }
}
