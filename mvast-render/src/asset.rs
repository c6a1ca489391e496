use crate::brightness::adjust_brightness;
use image::imageops::FilterType;
use mvast_cache::{VariantCache, VariantKey};
use mvast_core::{AssetError, Board, FrameBuffer};
use std::path::Path;
use tracing::{debug, info};

/// The two stimulus boards, pre-scaled to the display, plus the per-trial
/// cache of brightness-adjusted variants.
pub struct StimulusAssets {
    names: [String; 2],
    boards: [FrameBuffer; 2],
    variants: VariantCache<FrameBuffer>,
}

impl StimulusAssets {
    /// Decodes both images and scales them to exactly `size`.
    pub fn load(path_a: &Path, path_b: &Path, size: (u32, u32)) -> Result<Self, AssetError> {
        if size.0 == 0 || size.1 == 0 {
            return Err(AssetError::EmptyTarget(size.0, size.1));
        }
        let a = load_scaled(path_a, size)?;
        let b = load_scaled(path_b, size)?;
        info!(
            "loaded stimulus boards {} and {} at {}x{}",
            path_a.display(),
            path_b.display(),
            size.0,
            size.1
        );
        Self::from_frames(file_name(path_a), a, file_name(path_b), b)
    }

    pub fn from_frames(
        name_a: impl Into<String>,
        a: FrameBuffer,
        name_b: impl Into<String>,
        b: FrameBuffer,
    ) -> Result<Self, AssetError> {
        if a.size() != b.size() {
            return Err(AssetError::SizeMismatch {
                a: a.size(),
                b: b.size(),
            });
        }
        if a.width() == 0 || a.height() == 0 {
            return Err(AssetError::EmptyTarget(a.width(), a.height()));
        }
        let (name_a, name_b) = (name_a.into(), name_b.into());
        // Distinct cache keys even when both boards share a file name.
        let names = if name_a == name_b {
            [format!("{name_a}#a"), format!("{name_b}#b")]
        } else {
            [name_a, name_b]
        };
        Ok(Self {
            names,
            boards: [a, b],
            variants: VariantCache::new(),
        })
    }

    pub fn size(&self) -> (u32, u32) {
        self.boards[0].size()
    }

    /// File name of the board as given, without the disambiguating suffix.
    pub fn name(&self, board: Board) -> &str {
        let name = &self.names[index(board)];
        name.strip_suffix("#a")
            .or_else(|| name.strip_suffix("#b"))
            .unwrap_or(name)
    }

    pub fn original(&self, board: Board) -> &FrameBuffer {
        &self.boards[index(board)]
    }

    /// Brightness-adjusted board, computed at most once per factor until
    /// `release_variants` is called.
    pub fn variant(&mut self, board: Board, factor: f64) -> FrameBuffer {
        let i = index(board);
        let source = &self.boards[i];
        self.variants
            .get_or_insert_with(VariantKey::new(&self.names[i], factor), |f| {
                debug!("computing {:?} at brightness {:.2}", board, f);
                adjust_brightness(source, f)
            })
    }

    pub fn pair(&mut self, factor: f64) -> (FrameBuffer, FrameBuffer) {
        (self.variant(Board::A, factor), self.variant(Board::B, factor))
    }

    /// Drops cached variants at the end of a trial.
    pub fn release_variants(&mut self) {
        self.variants.clear();
    }

    pub fn cached_variants(&self) -> usize {
        self.variants.len()
    }

    pub fn variant_misses(&self) -> u64 {
        self.variants.misses()
    }
}

fn index(board: Board) -> usize {
    match board {
        Board::A => 0,
        Board::B => 1,
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn load_scaled(path: &Path, (width, height): (u32, u32)) -> Result<FrameBuffer, AssetError> {
    if !path.is_file() {
        return Err(AssetError::Missing(path.to_path_buf()));
    }
    let decoded = image::open(path).map_err(|e| AssetError::Decode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let mut rgba = decoded
        .resize_exact(width, height, FilterType::Triangle)
        .into_rgba8();
    // Boards are shown on black, fully opaque.
    for px in rgba.pixels_mut() {
        px.0[3] = 255;
    }
    FrameBuffer::from_rgba(width, height, rgba.into_raw()).ok_or_else(|| AssetError::Decode {
        path: path.to_path_buf(),
        message: "scaled image has an unexpected length".into(),
    })
}
