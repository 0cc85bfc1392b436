use anyhow::Result;

/// The model with the highest dev F1 seen so far.
pub struct Best<M> {
    pub f1: f64,
    pub model: M,
}

/// Holds at most one best snapshot; an empty slot counts as F1 = 0.
pub struct Selection<M> {
    best: Option<Best<M>>,
}

impl<M> Selection<M> {
    pub fn new() -> Self {
        Self { best: None }
    }

    pub fn best_f1(&self) -> f64 {
        self.best.as_ref().map_or(0.0, |b| b.f1)
    }

    /// Replaces the held snapshot with `snapshot()` iff `f1` strictly exceeds
    /// the current best. Returns whether a replacement happened.
    pub fn consider<F>(&mut self, f1: f64, snapshot: F) -> Result<bool>
    where
        F: FnOnce() -> Result<M>,
    {
        if !(f1 > self.best_f1()) {
            return Ok(false);
        }
        let model = snapshot()?;
        self.best = Some(Best { f1, model });
        Ok(true)
    }

    pub fn best(&self) -> Option<&Best<M>> {
        self.best.as_ref()
    }

    pub fn into_best(self) -> Option<Best<M>> {
        self.best
    }
}

impl<M> Default for Selection<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_f1_never_selects() {
        let mut selection: Selection<u32> = Selection::new();
        assert!(!selection.consider(0.0, || Ok(1)).unwrap());
        assert!(selection.best().is_none());
    }

    #[test]
    fn replaces_only_on_strict_improvement() {
        let mut selection = Selection::new();
        let mut history = Vec::new();
        let mut taken = Vec::new();

        for (i, f1) in [10.0, 30.0, 30.0, 20.0, 45.5, f64::NAN].into_iter().enumerate() {
            taken.push(selection.consider(f1, || Ok(i)).unwrap());
            history.push(selection.best_f1());
        }

        assert_eq!(taken, vec![true, true, false, false, true, false]);
        assert!(history.windows(2).all(|w| w[0] <= w[1]));
        let best = selection.into_best().unwrap();
        assert_eq!((best.f1, best.model), (45.5, 4));
    }

    #[test]
    fn tie_keeps_earlier_snapshot() {
        let mut selection = Selection::new();
        selection.consider(50.0, || Ok("first")).unwrap();
        selection.consider(50.0, || Ok("second")).unwrap();
        assert_eq!(selection.best().unwrap().model, "first");
    }

    #[test]
    fn snapshot_is_not_taken_without_improvement() {
        let mut selection = Selection::new();
        selection.consider(50.0, || Ok(0)).unwrap();
        let replaced = selection
            .consider(40.0, || -> Result<i32> { panic!("snapshot must not be taken") })
            .unwrap();
        assert!(!replaced);
    }
}
