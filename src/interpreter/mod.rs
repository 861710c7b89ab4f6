//! Execution engine.
//!
//! Execution state lives entirely in the registry: the program runs from the
//! value of `IS` and works on the value of `DS`. Either can be rebound with
//! `SET`, so both are looked up again on every step.

use tracing::{info, trace, warn};

use crate::config::Language;
use crate::registry::{Builtin, InstrId, Registry};
use crate::value::{SharedStack, StackElem};

mod builtins;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("{builtin} needs {required} element(s) on the data stack, found {found}")]
    Underflow { builtin: Builtin, required: usize, found: usize },
    #[error("first argument of SET must be an instruction")]
    SetTargetNotInstruction,
    #[error("first argument of SET cannot carry indirection (has {level})")]
    SetTargetIndirection { level: usize },
    #[error("cannot SET built-in {builtin}")]
    SetTargetBuiltin { builtin: Builtin },
    #[error("{builtin} cannot take built-in {arg} as an argument")]
    BuiltinArgument { builtin: Builtin, arg: Builtin },
    #[error("cannot execute uninitialized instruction \"{name}\"")]
    Uninitialized { name: String },
    #[error("{builtin} argument \"{name}\" is uninitialized")]
    UninitializedArgument { builtin: Builtin, name: String },
    #[error("top of the instruction stack is not a sub-stack")]
    MalformedFrame,
    #[error("unknown instruction id {id}")]
    UnknownInstruction { id: i32 },
    #[error("\"{name}\" is not registered")]
    MissingStack { name: String },
}

impl RuntimeError {
    pub fn code(&self) -> &'static str {
        match self {
            RuntimeError::Underflow { .. } => "MM-R001",
            RuntimeError::SetTargetNotInstruction => "MM-R002",
            RuntimeError::SetTargetIndirection { .. } => "MM-R003",
            RuntimeError::SetTargetBuiltin { .. } => "MM-R004",
            RuntimeError::BuiltinArgument { .. } => "MM-R005",
            RuntimeError::Uninitialized { .. } => "MM-R006",
            RuntimeError::UninitializedArgument { .. } => "MM-R007",
            RuntimeError::MalformedFrame => "MM-R008",
            RuntimeError::UnknownInstruction { .. } => "MM-R009",
            RuntimeError::MissingStack { .. } => "MM-R010",
        }
    }
}

type Result<T> = std::result::Result<T, RuntimeError>;

/// Result of a step that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Unfinished,
    Success,
}

/// Current value of `id`, which must be initialized.
fn stack_value(registry: &Registry, id: InstrId) -> Result<SharedStack> {
    let itype = registry.get(id).ok_or(RuntimeError::UnknownInstruction { id: id.raw() })?;
    itype
        .value
        .clone()
        .ok_or_else(|| RuntimeError::Uninitialized { name: itype.name.clone() })
}

/// Consumes the element just executed from `frame`. An already empty frame
/// is itself removed from the instruction stack.
fn pop_from_frame(instr_stack: &SharedStack, frame: &SharedStack) {
    if frame.is_empty() {
        instr_stack.pop();
    } else {
        frame.pop();
    }
}

pub struct Interpreter {
    registry: Registry,
    instr_stack: InstrId,
    data_stack: InstrId,
    steps: u64,
}

impl Interpreter {
    pub fn new(registry: Registry, lang: &Language) -> Result<Self> {
        let id = |name: &str| {
            registry
                .lookup_id(name)
                .ok_or_else(|| RuntimeError::MissingStack { name: name.to_string() })
        };
        let instr_stack = id(&lang.instr_stack)?;
        let data_stack = id(&lang.data_stack)?;
        Ok(Interpreter { registry, instr_stack, data_stack, steps: 0 })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn into_registry(self) -> Registry {
        self.registry
    }

    /// Steps executed so far, not counting the final one that found `IS` empty.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn step(&mut self) -> Result<Outcome> {
        let instr_stack = stack_value(&self.registry, self.instr_stack)?;
        let Some(top) = instr_stack.peek(0) else {
            return Ok(Outcome::Success);
        };
        let StackElem::Substack { stack: frame, .. } = &top else {
            return Err(RuntimeError::MalformedFrame);
        };
        let frame = frame.retain();
        self.steps += 1;

        let Some(elem) = frame.peek(0) else {
            trace!(step = self.steps, "frame exhausted");
            instr_stack.pop();
            return Ok(Outcome::Unfinished);
        };
        trace!(step = self.steps, "{elem:?}");

        let level = elem.indirection();
        if level > 0 {
            let data_stack = stack_value(&self.registry, self.data_stack)?;
            data_stack.push(elem.with_indirection(level - 1));
            pop_from_frame(&instr_stack, &frame);
            return Ok(Outcome::Unfinished);
        }

        match &elem {
            StackElem::Substack { stack, .. } => {
                instr_stack.push(StackElem::substack(stack.retain(), 0));
                pop_from_frame(&instr_stack, &frame);
            }
            // Pushed as a reference, so the next step rejects it as a frame.
            StackElem::StackRef { stack, .. } => {
                instr_stack.push(StackElem::stack_ref(stack.retain(), 0));
                pop_from_frame(&instr_stack, &frame);
            }
            StackElem::Instr { id, .. } => match id.to_builtin() {
                Some(builtin) => {
                    pop_from_frame(&instr_stack, &frame);
                    drop((top, frame, instr_stack));
                    builtins::dispatch(builtin, &mut self.registry, self.data_stack, self.instr_stack)?;
                }
                None => {
                    let body = stack_value(&self.registry, *id)?.deep_copy();
                    instr_stack.push(StackElem::substack(body, 0));
                    pop_from_frame(&instr_stack, &frame);
                }
            },
        }
        Ok(Outcome::Unfinished)
    }

    pub fn run(&mut self) -> Result<()> {
        self.run_with(|_| {})
    }

    /// Runs to termination, calling `before_step` ahead of every step.
    pub fn run_with(&mut self, mut before_step: impl FnMut(&Interpreter)) -> Result<()> {
        info!("Running program");
        loop {
            before_step(self);
            match self.step() {
                Ok(Outcome::Unfinished) => {}
                Ok(Outcome::Success) => {
                    info!(steps = self.steps, "Program finished");
                    return Ok(());
                }
                Err(e) => {
                    warn!(steps = self.steps, "Program failed: {e}");
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{Lexeme, lex};
    use crate::parser::parse;
    use crate::source::SourceMap;
    use std::path::Path;
    use std::rc::Rc;

    fn interpreter(source: &str) -> Interpreter {
        let file: Rc<Path> = Rc::from(Path::new("test.(m)m"));
        let map = SourceMap::new(source);
        let lexemes: Vec<Lexeme> = lex(source)
            .unwrap()
            .into_iter()
            .map(|(token, range)| Lexeme { token, location: map.locate(&file, range.into()) })
            .collect();
        let lang = Language::default();
        Interpreter::new(parse(&lexemes, &lang).unwrap(), &lang).unwrap()
    }

    fn value(interp: &Interpreter, name: &str) -> Option<SharedStack> {
        let reg = interp.registry();
        reg.value(reg.lookup_id(name)?)
    }

    fn id(interp: &Interpreter, name: &str) -> InstrId {
        interp.registry().lookup_id(name).unwrap()
    }

    #[test]
    fn empty_program_succeeds() {
        let mut interp = interpreter("");
        assert_eq!(interp.step().unwrap(), Outcome::Unfinished);
        assert_eq!(interp.step().unwrap(), Outcome::Success);
        assert_eq!(interp.step().unwrap(), Outcome::Success);
        assert!(value(&interp, "IS").unwrap().is_empty());
        assert!(value(&interp, "DS").unwrap().is_empty());
        assert_eq!(interp.steps(), 1);
    }

    #[test]
    fn indirection_pushes_lowered_copy() {
        let mut interp = interpreter("A.. [B].");
        interp.run().unwrap();
        let ds = value(&interp, "DS").unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.peek(1), Some(StackElem::instr(id(&interp, "A"), 1)));
        let top = ds.peek(0).unwrap();
        assert!(matches!(top, StackElem::Substack { indirection: 0, .. }));
    }

    #[test]
    fn uninitialized_instruction_fails_with_its_name() {
        let mut interp = interpreter("A. X");
        let err = interp.run().unwrap_err();
        assert!(matches!(err, RuntimeError::Uninitialized { ref name } if name == "X"));
        assert_eq!(err.code(), "MM-R006");
        // Effects of earlier steps persist.
        assert_eq!(value(&interp, "DS").unwrap().len(), 1);
    }

    #[test]
    fn set_then_invoke() {
        let mut interp = interpreter("[A.]. X. SET X X");
        interp.run().unwrap();
        let a = id(&interp, "A");
        let ds = value(&interp, "DS").unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.peek(0), Some(StackElem::instr(a, 0)));
        // Invocation runs a copy; the definition is untouched.
        let x = value(&interp, "X").unwrap();
        assert_eq!(x.peek(0), Some(StackElem::instr(a, 1)));
    }

    #[test]
    fn set_copies_program_literal() {
        let mut interp = interpreter("[A B]. X. SET");
        let program = value(&interp, "IS").unwrap().peek(0).and_then(|e| e.stack().cloned()).unwrap();
        let literal = program.peek(0).and_then(|e| e.stack().cloned()).unwrap();
        interp.run().unwrap();

        let x = value(&interp, "X").unwrap();
        assert_eq!(x, literal);
        assert!(!x.ptr_eq(&literal));
        literal.pop();
        assert_eq!(x.len(), 2);
    }

    #[test]
    fn redefinition_while_running() {
        let mut interp = interpreter("[[B]. X. SET A.]. X. SET X");
        interp.run().unwrap();
        let x = value(&interp, "X").unwrap();
        assert_eq!(x.len(), 1);
        assert_eq!(x.peek(0), Some(StackElem::instr(id(&interp, "B"), 0)));
        let ds = value(&interp, "DS").unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.peek(0), Some(StackElem::instr(id(&interp, "A"), 0)));
    }

    #[test]
    fn named_values_alias() {
        let mut interp = interpreter("[A]. X. SET X. Y. SET");
        interp.run().unwrap();
        assert!(value(&interp, "X").unwrap().ptr_eq(&value(&interp, "Y").unwrap()));
    }

    #[test]
    fn if_skips_on_empty_condition() {
        let mut interp = interpreter("[A]. []. IF");
        interp.run().unwrap();
        assert!(value(&interp, "DS").unwrap().is_empty());

        let mut interp = interpreter("[A]. [B]. IF");
        interp.run().unwrap();
        let ds = value(&interp, "DS").unwrap();
        assert_eq!(ds.len(), 1);
        let kept = ds.peek(0).unwrap();
        assert_eq!(kept.stack().unwrap().peek(0), Some(StackElem::instr(id(&interp, "A"), 0)));
    }

    #[test]
    fn unwrap_leaves_reference() {
        let mut interp = interpreter("[A B]. UNWRAP");
        interp.run().unwrap();
        let ds = value(&interp, "DS").unwrap();
        let top = ds.peek(0).unwrap();
        assert!(matches!(top, StackElem::StackRef { indirection: 0, .. }));
        assert_eq!(top.stack().unwrap().len(), 2);
    }

    #[test]
    fn reference_frame_is_malformed() {
        let mut interp = interpreter("");
        let target = SharedStack::empty();
        let is = id(&interp, "IS");
        target.push(StackElem::instr(is, 1));
        let frame = value(&interp, "IS").unwrap().peek(0).and_then(|e| e.stack().cloned()).unwrap();
        frame.push(StackElem::stack_ref(target.retain(), 0));

        assert_eq!(interp.step().unwrap(), Outcome::Unfinished);
        let top = value(&interp, "IS").unwrap().peek(0).unwrap();
        assert!(matches!(top, StackElem::StackRef { .. }));
        let err = interp.step().unwrap_err();
        assert!(matches!(err, RuntimeError::MalformedFrame));
        assert_eq!(err.code(), "MM-R008");
        assert_eq!(target.len(), 1);
        assert!(value(&interp, "DS").unwrap().is_empty());
    }

    #[test]
    fn running_unwrapped_definition_fails() {
        let mut interp = interpreter("[A.]. UNWRAP DS. X. SET X");
        let err = interp.run().unwrap_err();
        assert!(matches!(err, RuntimeError::MalformedFrame));
        assert!(!value(&interp, "IS").unwrap().is_empty());
    }

    #[test]
    fn rebinding_instruction_stack_to_non_frame_fails() {
        let mut interp = interpreter("[A]. IS. SET");
        let err = interp.run().unwrap_err();
        assert!(matches!(err, RuntimeError::MalformedFrame));
        let is = value(&interp, "IS").unwrap();
        assert_eq!(is.peek(0), Some(StackElem::instr(id(&interp, "A"), 0)));
    }

    #[test]
    fn builtin_underflow_is_failure() {
        let mut interp = interpreter("A. SET");
        let err = interp.run().unwrap_err();
        assert!(matches!(err, RuntimeError::Underflow { builtin: Builtin::Set, required: 2, found: 1 }));
    }

    #[test]
    fn data_stack_may_contain_itself() {
        let mut interp = interpreter("DS. UNWRAP");
        interp.run().unwrap();
        let ds = value(&interp, "DS").unwrap();
        assert_eq!(ds.len(), 1);
        assert!(ds.peek(0).unwrap().stack().unwrap().ptr_eq(&ds));

        let probe = ds.downgrade();
        drop(ds);
        drop(interp);
        assert!(probe.upgrade().is_none());
    }

    #[test]
    fn run_with_sees_every_step() {
        let mut interp = interpreter("A. B.");
        let mut seen = 0;
        interp.run_with(|_| seen += 1).unwrap();
        // Two elements, the exhausted frame, then the final check.
        assert_eq!(seen, 4);
        assert_eq!(interp.steps(), 3);
    }

    #[test]
    fn missing_reserved_stack() {
        let err = Interpreter::new(Registry::new(), &Language::default()).err().unwrap();
        assert!(matches!(err, RuntimeError::MissingStack { ref name } if name == "IS"));
    }
}
