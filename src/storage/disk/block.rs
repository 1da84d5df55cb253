use std::fmt;

/// BlockId names one fixed-size region of a file: the pair of the file name
/// and a zero-based block number.
///
/// Equality and hashing are structural. Both the buffer pool lookup and the
/// lock table key on this type, so two independently constructed ids for the
/// same block must compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlockId {
    filename: String,
    number: i32,
}

impl BlockId {
    pub fn new(filename: impl Into<String>, number: i32) -> Self {
        Self {
            filename: filename.into(),
            number,
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn number(&self) -> i32 {
        self.number
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[file {}, block {}]", self.filename, self.number)
    }
}
