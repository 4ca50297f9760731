//! Deferred jump targets
//!
//! A [`Label`] names a program position that may not exist yet. Jumps are
//! emitted holding the label; the table maps each label to its final
//! instruction index when the program is finished.

use lumo_bytecode::JumpTarget;

use crate::error::{CompileError, CompileResult};

/// Handle to a slot in a [`LabelTable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(u32);

impl Label {
    /// Slot index of this label
    #[inline]
    pub fn id(self) -> u32 {
        self.0
    }
}

/// Label slots, each either unbound or bound to an instruction index
#[derive(Debug, Default)]
pub struct LabelTable {
    slots: Vec<Option<u32>>,
}

impl LabelTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an unbound label
    pub fn create(&mut self) -> Label {
        let label = Label(self.slots.len() as u32);
        self.slots.push(None);
        label
    }

    /// Create a label bound to `pc`
    pub fn create_at(&mut self, pc: u32) -> Label {
        let label = self.create();
        self.bind(label, pc);
        label
    }

    /// Bind (or rebind) a label. Only the last binding is observed.
    pub fn bind(&mut self, label: Label, pc: u32) {
        self.slots[label.0 as usize] = Some(pc);
    }

    /// Has this label been bound
    pub fn is_bound(&self, label: Label) -> bool {
        matches!(self.slots.get(label.0 as usize), Some(Some(_)))
    }

    /// Final target of a label
    pub fn resolve(&self, label: Label) -> CompileResult<JumpTarget> {
        match self.slots.get(label.0 as usize) {
            Some(Some(pc)) => Ok(JumpTarget(*pc)),
            _ => Err(CompileError::UnresolvedLabel(label)),
        }
    }

    /// Number of labels created
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if no labels were created
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_binding_wins() {
        let mut labels = LabelTable::new();
        let label = labels.create_at(2);
        labels.bind(label, 5);
        labels.bind(label, 9);

        assert_eq!(labels.resolve(label).unwrap(), JumpTarget(9));
    }

    #[test]
    fn test_unbound_label_fails() {
        let mut labels = LabelTable::new();
        let bound = labels.create_at(0);
        let unbound = labels.create();

        assert!(labels.is_bound(bound));
        assert!(!labels.is_bound(unbound));
        assert!(matches!(
            labels.resolve(unbound),
            Err(CompileError::UnresolvedLabel(l)) if l == unbound
        ));
    }
}
