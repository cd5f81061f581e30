use std::fmt;

/// A tracked counter.
pub struct Counter {
    pub value: u64,
}

impl Counter {
    pub fn bump(&mut self) {
        self.value += 1;
    }
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}
