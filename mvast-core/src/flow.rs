/// Result of any suspension point that the operator can interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow<T = ()> {
    Completed(T),
    Cancelled,
}

impl<T> Flow<T> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Flow::Cancelled)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Flow<U> {
        match self {
            Flow::Completed(v) => Flow::Completed(f(v)),
            Flow::Cancelled => Flow::Cancelled,
        }
    }

    pub fn completed(self) -> Option<T> {
        match self {
            Flow::Completed(v) => Some(v),
            Flow::Cancelled => None,
        }
    }
}
