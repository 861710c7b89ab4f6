//! Nested, reference-counted stacks.
//!
//! A [`Stack`] stores its elements bottom-first: the top of the stack is the
//! last element of the backing vector. Program text is reversed once by the
//! builder so that popping from the top walks the source left to right.
//!
//! Shared ownership is an `Rc<RefCell<Stack>>` behind [`SharedStack`].
//! Storing a `SharedStack` anywhere retains it, dropping it releases it, and
//! the last release frees the stack and recursively releases its children.

use std::cell::{BorrowMutError, Ref, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::registry::InstrId;

/// Capacity given to every fresh stack.
const MIN_CAPACITY: usize = 2;

/// One slot of a [`Stack`].
#[derive(Clone, PartialEq)]
pub enum StackElem {
    /// A named instruction-type or a built-in.
    Instr { id: InstrId, indirection: usize },
    /// A stack literal. Copied by value when assigned, shared otherwise.
    Substack { stack: SharedStack, indirection: usize },
    /// An explicit alias of another stack's storage. Never copied.
    StackRef { stack: SharedStack, indirection: usize },
}

impl StackElem {
    pub fn instr(id: InstrId, indirection: usize) -> Self {
        StackElem::Instr { id, indirection }
    }

    pub fn substack(stack: SharedStack, indirection: usize) -> Self {
        StackElem::Substack { stack, indirection }
    }

    pub fn stack_ref(stack: SharedStack, indirection: usize) -> Self {
        StackElem::StackRef { stack, indirection }
    }

    pub fn indirection(&self) -> usize {
        match self {
            StackElem::Instr { indirection, .. }
            | StackElem::Substack { indirection, .. }
            | StackElem::StackRef { indirection, .. } => *indirection,
        }
    }

    /// Same element, other indirection level. Shares the payload.
    pub fn with_indirection(&self, level: usize) -> Self {
        let mut elem = self.clone();
        match &mut elem {
            StackElem::Instr { indirection, .. }
            | StackElem::Substack { indirection, .. }
            | StackElem::StackRef { indirection, .. } => *indirection = level,
        }
        elem
    }

    /// The stack carried by a `Substack` or `StackRef`.
    pub fn stack(&self) -> Option<&SharedStack> {
        match self {
            StackElem::Substack { stack, .. } | StackElem::StackRef { stack, .. } => Some(stack),
            StackElem::Instr { .. } => None,
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, StackElem::Instr { id, .. } if id.is_builtin())
    }

    fn deep_copy(&self) -> Self {
        match self {
            StackElem::Substack { stack, indirection } => StackElem::Substack {
                stack: stack.deep_copy(),
                indirection: *indirection,
            },
            // References alias on purpose: copy the handle, not the storage.
            other => other.clone(),
        }
    }
}

impl fmt::Debug for StackElem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dots = ".".repeat(self.indirection());
        match self {
            StackElem::Instr { id, .. } => write!(f, "{id:?}{dots}"),
            StackElem::Substack { stack, .. } => write!(f, "{stack:?}{dots}"),
            StackElem::StackRef { stack, .. } => write!(f, "&{:p}{dots}", stack.as_ptr()),
        }
    }
}

/// An ordered, growable sequence of [`StackElem`]s.
#[derive(Clone, PartialEq)]
pub struct Stack {
    elems: Vec<StackElem>,
}

impl Default for Stack {
    fn default() -> Self {
        Stack::new()
    }
}

impl Stack {
    pub fn new() -> Self {
        Stack { elems: Vec::with_capacity(MIN_CAPACITY) }
    }

    /// Builds a stack whose top is the last element of `elems`.
    pub fn from_elems(elems: Vec<StackElem>) -> Self {
        Stack { elems }
    }

    pub fn len(&self) -> usize {
        self.elems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.elems.capacity()
    }

    pub fn push(&mut self, elem: StackElem) {
        self.elems.push(elem);
    }

    /// Removes the top element. Its references are released when the
    /// returned value is dropped. Capacity is kept.
    pub fn pop(&mut self) -> Option<StackElem> {
        self.elems.pop()
    }

    /// Element `idx` positions below the top (`0` is the top).
    pub fn peek(&self, idx: usize) -> Option<&StackElem> {
        let pos = self.elems.len().checked_sub(idx + 1)?;
        self.elems.get(pos)
    }

    /// Reverses the top-level order only.
    pub fn reverse(&mut self) {
        self.elems.reverse();
    }

    /// A fully independent copy: nested literals get new storage, references
    /// keep pointing at their targets.
    pub fn deep_copy(&self) -> Stack {
        let mut elems = Vec::with_capacity(self.elems.capacity().max(MIN_CAPACITY));
        elems.extend(self.elems.iter().map(StackElem::deep_copy));
        Stack { elems }
    }

    /// Top first, i.e. source order.
    pub fn iter_from_top(&self) -> impl Iterator<Item = &StackElem> {
        self.elems.iter().rev()
    }

    pub(crate) fn take_elems(&mut self) -> Vec<StackElem> {
        std::mem::take(&mut self.elems)
    }
}

impl fmt::Debug for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter_from_top()).finish()
    }
}

/// Reference-counted handle to a [`Stack`].
///
/// `Clone` is retain, `Drop` is release.
#[derive(Clone)]
pub struct SharedStack(Rc<RefCell<Stack>>);

impl SharedStack {
    pub fn new(stack: Stack) -> Self {
        SharedStack(Rc::new(RefCell::new(stack)))
    }

    pub fn empty() -> Self {
        SharedStack::new(Stack::new())
    }

    /// Another owner of the same storage.
    pub fn retain(&self) -> Self {
        self.clone()
    }

    pub fn ref_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    pub fn borrow(&self) -> Ref<'_, Stack> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Stack> {
        self.0.borrow_mut()
    }

    pub(crate) fn try_borrow_mut(&self) -> Result<RefMut<'_, Stack>, BorrowMutError> {
        self.0.try_borrow_mut()
    }

    /// Observes the storage without keeping it alive.
    pub fn downgrade(&self) -> Weak<RefCell<Stack>> {
        Rc::downgrade(&self.0)
    }

    /// New storage with a count of one.
    pub fn deep_copy(&self) -> Self {
        SharedStack::new(self.borrow().deep_copy())
    }

    pub fn ptr_eq(&self, other: &SharedStack) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn as_ptr(&self) -> *const RefCell<Stack> {
        Rc::as_ptr(&self.0)
    }

    pub fn len(&self) -> usize {
        self.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.borrow().is_empty()
    }

    pub fn push(&self, elem: StackElem) {
        self.borrow_mut().push(elem);
    }

    /// Pops and drops the top element. The popped value is dropped after
    /// the borrow ends, so releasing it may safely touch this stack again.
    pub fn pop(&self) -> bool {
        let popped = self.borrow_mut().pop();
        popped.is_some()
    }

    /// Clone of the element `idx` below the top.
    pub fn peek(&self, idx: usize) -> Option<StackElem> {
        self.borrow().peek(idx).cloned()
    }
}

/// Structural equality; identical handles compare equal without a walk.
impl PartialEq for SharedStack {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.borrow() == *other.borrow()
    }
}

impl fmt::Debug for SharedStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(stack) => write!(f, "{stack:?}"),
            Err(_) => write!(f, "[<borrowed>]"),
        }
    }
}
