//! Index-stride partition of tasks into ordered groups.

/// Ordered partition of a task slice into fixed-size groups; the last group
/// may be short. Borrowed view, nothing is copied.
#[derive(Debug)]
pub struct BatchPlan<'a, T> {
    groups: Vec<&'a [T]>,
}

impl<'a, T> BatchPlan<'a, T> {
    /// `None` or `Some(0)` puts every task into a single group.
    pub fn new(tasks: &'a [T], batch_size: Option<usize>) -> Self {
        if tasks.is_empty() {
            return Self { groups: Vec::new() };
        }
        let size = match batch_size {
            Some(n) if n > 0 => n,
            _ => tasks.len(),
        };
        Self {
            groups: tasks.chunks(size).collect(),
        }
    }

    pub fn groups(&self) -> &[&'a [T]] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_tasks_in_pairs() {
        let tasks = [1, 2, 3, 4, 5];
        let plan = BatchPlan::new(&tasks, Some(2));
        assert_eq!(plan.groups(), &[&[1, 2][..], &[3, 4][..], &[5][..]]);
    }

    #[test]
    fn unbounded_is_one_group() {
        let tasks = [1, 2, 3];
        let plan = BatchPlan::new(&tasks, None);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.groups()[0], &tasks[..]);
        assert_eq!(BatchPlan::new(&tasks, Some(0)).len(), 1);
    }

    #[test]
    fn batch_larger_than_input() {
        let tasks = [1, 2, 3];
        assert_eq!(BatchPlan::new(&tasks, Some(10)).groups(), &[&tasks[..]]);
    }

    #[test]
    fn empty_input_has_no_groups() {
        let tasks: [u8; 0] = [];
        assert!(BatchPlan::new(&tasks, Some(2)).is_empty());
    }
}
