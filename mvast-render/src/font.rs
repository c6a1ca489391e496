use ab_glyph::FontVec;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Loads the UI font: the explicit path if given, otherwise the first
/// well-known system font that parses. `None` means text is not drawn.
pub fn load_font(explicit: Option<&Path>) -> Option<FontVec> {
    let candidates = explicit
        .map(Path::to_path_buf)
        .into_iter()
        .chain(SYSTEM_FONTS.iter().map(PathBuf::from));

    for path in candidates {
        let Ok(bytes) = std::fs::read(&path) else {
            if explicit == Some(path.as_path()) {
                warn!("font {} could not be read, trying system fonts", path.display());
            }
            continue;
        };
        match FontVec::try_from_vec(bytes) {
            Ok(font) => {
                info!("using font {}", path.display());
                return Some(font);
            }
            Err(e) => warn!("font {} is not usable: {}", path.display(), e),
        }
    }
    warn!("no usable font found; on-screen text will not be drawn");
    None
}
