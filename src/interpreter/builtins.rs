use super::{Result, RuntimeError};
use crate::registry::{Builtin, InstrId, Registry};
use crate::value::{SharedStack, StackElem};

/// Built-in handlers get the registry and the ids of the data and
/// instruction stacks, looked up fresh because either may have been `SET`.
type Handler = fn(&mut Registry, InstrId, InstrId) -> Result<()>;

fn handler(builtin: Builtin) -> Handler {
    match builtin {
        Builtin::Set => set,
        Builtin::Unwrap => unwrap,
        Builtin::If => if_empty,
    }
}

pub(super) fn dispatch(
    builtin: Builtin,
    registry: &mut Registry,
    data_stack: InstrId,
    instr_stack: InstrId,
) -> Result<()> {
    handler(builtin)(registry, data_stack, instr_stack)
}

/// The data stack, checked to hold at least `required` elements.
fn arguments(registry: &Registry, data_stack: InstrId, builtin: Builtin, required: usize) -> Result<SharedStack> {
    let stack = super::stack_value(registry, data_stack)?;
    let found = stack.len();
    if found < required {
        return Err(RuntimeError::Underflow { builtin, required, found });
    }
    Ok(stack)
}

/// The stack an argument denotes, shared.
fn referenced(registry: &Registry, builtin: Builtin, arg: &StackElem) -> Result<SharedStack> {
    match arg {
        StackElem::Substack { stack, .. } | StackElem::StackRef { stack, .. } => Ok(stack.retain()),
        StackElem::Instr { id, .. } => {
            if let Some(arg) = id.to_builtin() {
                return Err(RuntimeError::BuiltinArgument { builtin, arg });
            }
            let itype = registry.get(*id).ok_or(RuntimeError::UnknownInstruction { id: id.raw() })?;
            itype.value.clone().ok_or_else(|| RuntimeError::UninitializedArgument {
                builtin,
                name: itype.name.clone(),
            })
        }
    }
}

/// The value an argument contributes when stored: literals are copied,
/// named values and references are shared.
fn assigned(registry: &Registry, builtin: Builtin, arg: &StackElem) -> Result<SharedStack> {
    let value = referenced(registry, builtin, arg)?;
    Ok(match arg {
        StackElem::Substack { .. } => value.deep_copy(),
        _ => value,
    })
}

/// `value target SET` stores `value` as the new definition of `target`.
fn set(registry: &mut Registry, data_stack: InstrId, _instr_stack: InstrId) -> Result<()> {
    let args = arguments(registry, data_stack, Builtin::Set, 2)?;
    let (Some(target), Some(source)) = (args.peek(0), args.peek(1)) else {
        return Err(RuntimeError::Underflow { builtin: Builtin::Set, required: 2, found: args.len() });
    };

    let id = match target {
        StackElem::Instr { indirection, .. } if indirection != 0 => {
            return Err(RuntimeError::SetTargetIndirection { level: indirection });
        }
        StackElem::Instr { id, .. } => match id.to_builtin() {
            Some(builtin) => return Err(RuntimeError::SetTargetBuiltin { builtin }),
            None => id,
        },
        _ => return Err(RuntimeError::SetTargetNotInstruction),
    };

    let value = assigned(registry, Builtin::Set, &source)?;

    // Pop before storing: the target may be the data stack itself.
    args.pop();
    args.pop();

    let previous = registry.set_value(id, value);
    drop(previous);
    Ok(())
}

/// Replaces the top of the data stack with a reference to the stack it denotes.
fn unwrap(registry: &mut Registry, data_stack: InstrId, _instr_stack: InstrId) -> Result<()> {
    let args = arguments(registry, data_stack, Builtin::Unwrap, 1)?;
    let Some(arg) = args.peek(0) else {
        return Err(RuntimeError::Underflow { builtin: Builtin::Unwrap, required: 1, found: 0 });
    };

    let value = assigned(registry, Builtin::Unwrap, &arg)?;
    args.pop();
    args.push(StackElem::stack_ref(value, arg.indirection()));
    Ok(())
}

/// Consumes the condition, and also the element under it when the
/// condition's stack is empty.
fn if_empty(registry: &mut Registry, data_stack: InstrId, _instr_stack: InstrId) -> Result<()> {
    let args = arguments(registry, data_stack, Builtin::If, 1)?;
    let Some(arg) = args.peek(0) else {
        return Err(RuntimeError::Underflow { builtin: Builtin::If, required: 1, found: 0 });
    };

    if referenced(registry, Builtin::If, &arg)?.is_empty() {
        let found = args.len();
        if found < 2 {
            return Err(RuntimeError::Underflow { builtin: Builtin::If, required: 2, found });
        }
        args.pop();
    }
    args.pop();
    Ok(())
}
