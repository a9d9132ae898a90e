use super::stack::StackKind;

/// Classification of a single property difference between a deployed
/// template and a freshly synthesized one.
#[derive(Debug, Clone, PartialEq)]
pub enum DiffKind {
    Added,
    Removed,
    Modified {
        old_value: String,
        new_value: String,
    },
}

/// One entry in a stack comparison, keyed by the flattened property
/// path (`resources.service.cpu`).
#[derive(Debug, Clone, PartialEq)]
pub struct DiffEntry {
    pub path: String,
    pub kind: DiffKind,
}

/// What would happen to one stack if the current synthesis were
/// deployed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackChange {
    Create,
    Update,
    Destroy,
    Unchanged,
}

/// Per-stack comparison. `entries` is populated for updates; creates
/// and destroys are whole-template changes.
#[derive(Debug, Clone, PartialEq)]
pub struct StackDiff {
    pub name: String,
    pub kind: StackKind,
    pub change: StackChange,
    pub entries: Vec<DiffEntry>,
}

/// Result of comparing an environment's synthesis against its recorded
/// deployment state.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffResult {
    pub environment: String,
    pub stacks: Vec<StackDiff>,
}

impl DiffResult {
    /// Returns true if deploying now would change nothing.
    pub fn is_empty(&self) -> bool {
        self.stacks
            .iter()
            .all(|stack| stack.change == StackChange::Unchanged)
    }

    /// (create, update, destroy) counts for the summary line.
    pub fn counts(&self) -> (usize, usize, usize) {
        let mut counts = (0, 0, 0);
        for stack in &self.stacks {
            match stack.change {
                StackChange::Create => counts.0 += 1,
                StackChange::Update => counts.1 += 1,
                StackChange::Destroy => counts.2 += 1,
                StackChange::Unchanged => {}
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack_diff(name: &str, change: StackChange) -> StackDiff {
        StackDiff {
            name: name.to_string(),
            kind: StackKind::Service,
            change,
            entries: vec![],
        }
    }

    #[test]
    fn all_unchanged_is_empty() {
        let result = DiffResult {
            environment: "dev".to_string(),
            stacks: vec![
                stack_diff("a", StackChange::Unchanged),
                stack_diff("b", StackChange::Unchanged),
            ],
        };
        assert!(result.is_empty());
    }

    #[test]
    fn any_change_is_not_empty() {
        let result = DiffResult {
            environment: "dev".to_string(),
            stacks: vec![
                stack_diff("a", StackChange::Unchanged),
                stack_diff("b", StackChange::Update),
            ],
        };
        assert!(!result.is_empty());
        assert_eq!(result.counts(), (0, 1, 0));
    }

    #[test]
    fn counts_split_by_change() {
        let result = DiffResult {
            environment: "dev".to_string(),
            stacks: vec![
                stack_diff("a", StackChange::Create),
                stack_diff("b", StackChange::Create),
                stack_diff("c", StackChange::Destroy),
            ],
        };
        assert_eq!(result.counts(), (2, 0, 1));
    }
}
