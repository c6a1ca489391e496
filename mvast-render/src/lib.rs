pub mod asset;
pub mod brightness;
pub mod font;
pub mod render;

pub use asset::StimulusAssets;
pub use brightness::{adjust_brightness, brightness_lut};
pub use font::load_font;
pub use render::{render_text_pixmap, SkiaRenderer};
