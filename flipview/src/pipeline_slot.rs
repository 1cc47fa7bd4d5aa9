/// Single owner of the live pipeline.
///
/// Replacement hands the previous occupant back to the caller only after the
/// new one has been stored, so a valid pipeline is available at every point a
/// caller can observe. Destroying the returned value is the caller's job.
#[derive(Debug)]
pub struct PipelineSlot<P> {
    current: Option<P>,
    generation: u64,
}

impl<P> Default for PipelineSlot<P> {
    fn default() -> Self {
        Self {
            current: None,
            generation: 0,
        }
    }
}

impl<P> PipelineSlot<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<&P> {
        self.current.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }

    /// Number of pipelines that have been stored so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use = "the previous pipeline must be destroyed by the caller"]
    pub fn replace(&mut self, pipeline: P) -> Option<P> {
        self.generation += 1;
        self.current.replace(pipeline)
    }

    pub fn take(&mut self) -> Option<P> {
        self.current.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let slot = PipelineSlot::<u32>::new();
        assert!(slot.is_empty());
        assert_eq!(slot.get(), None);
        assert_eq!(slot.generation(), 0);
    }

    #[test]
    fn replace_returns_previous_after_storing_new() {
        let mut slot = PipelineSlot::new();
        assert_eq!(slot.replace("first"), None);
        assert_eq!(slot.replace("second"), Some("first"));
        assert_eq!(slot.get(), Some(&"second"));
        assert_eq!(slot.generation(), 2);
    }

    #[test]
    fn take_empties_the_slot() {
        let mut slot = PipelineSlot::new();
        let _ = slot.replace(7);
        assert_eq!(slot.take(), Some(7));
        assert!(slot.is_empty());
    }
}
