use super::stack::StackTrace;
use crate::tags::TagSet;

/// A captured stack together with the tags that were in effect for its thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub stack: StackTrace,
    pub tags: TagSet,
}

impl Sample {
    pub fn new(stack: StackTrace, tags: TagSet) -> Self {
        Self { stack, tags }
    }

    #[must_use]
    pub fn thread_id(&self) -> u64 {
        self.stack.thread_id
    }
}
