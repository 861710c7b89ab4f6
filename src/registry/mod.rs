//! Named instruction-types and the built-in id space.

use std::collections::HashSet;
use std::fmt;

use crate::value::{SharedStack, Stack, StackElem};

/// The fixed built-ins, in id order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Set,
    Unwrap,
    If,
}

impl Builtin {
    pub const ALL: [Builtin; 3] = [Builtin::Set, Builtin::Unwrap, Builtin::If];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Set => "SET",
            Builtin::Unwrap => "UNWRAP",
            Builtin::If => "IF",
        }
    }

    fn index(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Instruction id. Registry entries are `0..`, built-ins are `-1, -2, -3`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstrId(i32);

impl InstrId {
    pub fn named(index: usize) -> Self {
        InstrId(index as i32)
    }

    pub fn from_builtin(builtin: Builtin) -> Self {
        InstrId(-builtin.index() - 1)
    }

    pub fn is_builtin(self) -> bool {
        self.0 < 0
    }

    pub fn to_builtin(self) -> Option<Builtin> {
        if !self.is_builtin() {
            return None;
        }
        Builtin::ALL.get((-self.0 - 1) as usize).copied()
    }

    /// Index into the registry, for non-built-in ids.
    pub fn index(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }

    pub fn raw(self) -> i32 {
        self.0
    }
}

impl fmt::Debug for InstrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_builtin() {
            Some(b) => write!(f, "({b})"),
            None => write!(f, "#{}", self.0),
        }
    }
}

#[derive(Debug)]
pub struct InstructionType {
    pub name: String,
    /// `None` until the first `SET`.
    pub value: Option<SharedStack>,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("instruction '{name}' is already registered")]
    Duplicate { name: String },
}

/// Every instruction-type of a program, indexed by [`InstrId`].
#[derive(Debug, Default)]
pub struct Registry {
    types: Vec<InstructionType>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    pub fn register(&mut self, name: &str) -> Result<InstrId, RegistryError> {
        if self.contains(name) {
            return Err(RegistryError::Duplicate { name: name.to_string() });
        }
        self.types.push(InstructionType { name: name.to_string(), value: None });
        Ok(InstrId::named(self.types.len() - 1))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup_id(name).is_some()
    }

    pub fn lookup_id(&self, name: &str) -> Option<InstrId> {
        self.types.iter().position(|t| t.name == name).map(InstrId::named)
    }

    pub fn lookup_name(&self, id: InstrId) -> Option<&str> {
        self.get(id).map(|t| t.name.as_str())
    }

    pub fn get(&self, id: InstrId) -> Option<&InstructionType> {
        self.types.get(id.index()?)
    }

    pub fn get_mut(&mut self, id: InstrId) -> Option<&mut InstructionType> {
        self.types.get_mut(id.index()?)
    }

    /// Handle to the current value of `id`, if registered and initialized.
    pub fn value(&self, id: InstrId) -> Option<SharedStack> {
        self.get(id)?.value.clone()
    }

    /// Installs `value`, releasing whatever `id` held before.
    pub fn set_value(&mut self, id: InstrId, value: SharedStack) -> Option<SharedStack> {
        self.get_mut(id).and_then(|t| t.value.replace(value))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (InstrId, &InstructionType)> {
        self.types.iter().enumerate().map(|(i, t)| (InstrId::named(i), t))
    }

    /// Gives the registered built-in `builtin` a one-element value holding
    /// its own built-in id, so it can be invoked like any named instruction.
    pub fn install_builtin(&mut self, builtin: Builtin) -> bool {
        let Some(id) = self.lookup_id(builtin.name()) else {
            return false;
        };
        let stack = Stack::from_elems(vec![StackElem::instr(InstrId::from_builtin(builtin), 0)]);
        self.set_value(id, SharedStack::new(stack));
        true
    }
}

/// Values may reference each other in cycles (`SET`/`UNWRAP` can alias a
/// stack into itself). Empty every reachable stack so those cycles are freed
/// with the registry instead of leaking.
impl Drop for Registry {
    fn drop(&mut self) {
        let mut seen = HashSet::new();
        let mut reachable = Vec::new();
        let mut pending: Vec<SharedStack> = self.types.iter_mut().filter_map(|t| t.value.take()).collect();

        while let Some(stack) = pending.pop() {
            if !seen.insert(stack.as_ptr()) {
                continue;
            }
            let Ok(mut inner) = stack.try_borrow_mut() else {
                continue;
            };
            let elems = inner.take_elems();
            drop(inner);
            pending.extend(elems.iter().filter_map(|e| e.stack().cloned()));
            reachable.push((stack, elems));
        }
        // `reachable` still holds a handle to every stack, so the elements
        // dropped here release counts without ever reaching zero recursively.
        for (_, elems) in reachable.iter_mut() {
            elems.clear();
        }
    }
}
