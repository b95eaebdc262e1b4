use crate::schedule::model::SchedulePeriod;

/// Editable open-period list backing the schedule stage. It is never empty.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ScheduleList {
    periods: Vec<SchedulePeriod>,
}

impl Default for ScheduleList {
    fn default() -> Self {
        Self::new()
    }
}

impl ScheduleList {
    pub fn new() -> Self {
        Self {
            periods: vec![SchedulePeriod::default()],
        }
    }

    /// Appends a default period and returns its index.
    pub fn add_period(&mut self) -> usize {
        self.periods.push(SchedulePeriod::default());
        self.periods.len() - 1
    }

    /// Removes the period at `index`. Returns `false` without touching the
    /// list when it holds a single period.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn remove_period(&mut self, index: usize) -> bool {
        assert!(
            index < self.periods.len(),
            "schedule index {index} out of bounds (len {})",
            self.periods.len()
        );
        if !self.can_remove() {
            return false;
        }
        self.periods.remove(index);
        true
    }

    pub fn can_remove(&self) -> bool {
        self.periods.len() > 1
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn periods(&self) -> &[SchedulePeriod] {
        &self.periods
    }

    pub fn period_mut(&mut self, index: usize) -> Option<&mut SchedulePeriod> {
        self.periods.get_mut(index)
    }

    pub fn to_periods(&self) -> Vec<SchedulePeriod> {
        self.periods.clone()
    }
}
