pub mod text;
pub mod variant;

pub use string_cache::DefaultAtom as Atom;
pub use text::{get_text, intern_text, text_count};
pub use variant::{VariantCache, VariantKey};
