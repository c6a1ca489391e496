use lazy_static::lazy_static;
use std::sync::RwLock;
use string_cache::DefaultAtom as Atom;

lazy_static! {
    static ref TEXT_INTERNER: RwLock<Vec<Atom>> = RwLock::new(Vec::new());
}

/// Intern a UI string and return a stable id for it.
///
/// Ids index into a process-wide table and are used as keys for
/// rasterised text, so identical labels are rendered once.
pub fn intern_text(s: &str) -> usize {
    let atom = Atom::from(s);
    let mut v = TEXT_INTERNER.write().unwrap_or_else(|e| e.into_inner());
    match v.iter().position(|a| *a == atom) {
        Some(idx) => idx,
        None => {
            v.push(atom);
            v.len() - 1
        }
    }
}

/// Current count of unique texts
pub fn text_count() -> usize {
    TEXT_INTERNER.read().unwrap_or_else(|e| e.into_inner()).len()
}

pub fn get_text(id: usize) -> Option<String> {
    TEXT_INTERNER
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .get(id)
        .map(|a| a.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let a = intern_text("Confirm");
        let b = intern_text("Confirm");
        let c = intern_text("Not at all unpleasant");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(get_text(c).as_deref(), Some("Not at all unpleasant"));
        assert!(text_count() >= 2);
        assert_eq!(get_text(usize::MAX), None);
    }
}
