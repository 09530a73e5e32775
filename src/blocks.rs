use std::ops::Range;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassBlocks {
    offsets: Vec<usize>,
}

impl ClassBlocks {
    pub fn new(class_counts: &[usize]) -> Self {
        let mut offsets = Vec::with_capacity(class_counts.len() + 1);
        offsets.push(0);
        for count in class_counts {
            offsets.push(offsets[offsets.len() - 1] + count);
        }
        Self { offsets }
    }

    pub fn class_amount(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn row_amount(&self) -> usize {
        self.offsets[self.offsets.len() - 1]
    }

    pub fn class_range(&self, class: usize) -> Result<Range<usize>> {
        if class >= self.class_amount() {
            return Err(Error::UnknownClass(class));
        }
        Ok(self.offsets[class]..self.offsets[class + 1])
    }

    /// The rows of a group of classes, which must have consecutive ids.
    pub fn group_range(&self, classes: &[usize]) -> Result<Range<usize>> {
        let mut sorted = classes.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let (Some(first), Some(last)) = (sorted.first(), sorted.last()) else {
            return Err(Error::NonContiguousGroup(classes.to_vec()));
        };
        if last - first + 1 != sorted.len() {
            return Err(Error::NonContiguousGroup(classes.to_vec()));
        }

        let start = self.class_range(*first)?.start;
        let end = self.class_range(*last)?.end;
        Ok(start..end)
    }
}
