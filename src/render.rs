//! Text rendering of stacks and the final-state dump.
//!
//! Stacks print top first, which for program literals is source order.
//! Built-ins print as `(SET)`, references get a leading `&`, and each level
//! of indirection is a trailing `.`.

use std::cell::RefCell;

use serde::Serialize;

use crate::config::Language;
use crate::lexer::{INDIRECTION, STACK_CLOSE, STACK_OPEN};
use crate::registry::Registry;
use crate::value::{SharedStack, Stack, StackElem};

/// Printed in place of a stack that is already being printed further out,
/// or that sits deeper than `MAX_DEPTH`.
const ELIDED: &str = "[...]";

const MAX_DEPTH: usize = 1024;

pub fn render_stack(stack: &SharedStack, registry: &Registry) -> String {
    let mut out = String::new();
    write_stack(&mut out, stack, registry, &mut Vec::new());
    out
}

fn write_stack(out: &mut String, stack: &SharedStack, registry: &Registry, open: &mut Vec<*const RefCell<Stack>>) {
    let ptr = stack.as_ptr();
    if open.len() >= MAX_DEPTH || open.contains(&ptr) {
        out.push_str(ELIDED);
        return;
    }
    open.push(ptr);
    out.push(STACK_OPEN);
    for (i, elem) in stack.borrow().iter_from_top().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        write_elem(out, elem, registry, open);
    }
    out.push(STACK_CLOSE);
    open.pop();
}

fn write_elem(out: &mut String, elem: &StackElem, registry: &Registry, open: &mut Vec<*const RefCell<Stack>>) {
    match elem {
        StackElem::Instr { id, .. } => match (id.to_builtin(), registry.lookup_name(*id)) {
            (Some(builtin), _) => out.push_str(&format!("({builtin})")),
            (None, Some(name)) => out.push_str(name),
            (None, None) => out.push_str(&format!("#{}", id.raw())),
        },
        StackElem::Substack { stack, .. } => write_stack(out, stack, registry, open),
        StackElem::StackRef { stack, .. } => {
            out.push('&');
            write_stack(out, stack, registry, open);
        }
    }
    out.extend(std::iter::repeat_n(INDIRECTION, elem.indirection()));
}

/// One line per loggable instruction-type, `NAME: [...]`.
pub fn render_registry(registry: &Registry, lang: &Language) -> String {
    Snapshot::entries(registry, lang)
        .into_iter()
        .map(|entry| match entry.value {
            Some(value) => format!("{}: {value}", entry.name),
            None => format!("{}: (uninitialized)", entry.name),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Failure,
}

#[derive(Debug, Clone, Serialize)]
pub struct Entry {
    pub name: String,
    pub value: Option<String>,
}

/// Serializable final state of a run.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub status: Status,
    pub steps: u64,
    pub stacks: Vec<Entry>,
}

impl Snapshot {
    pub fn capture(registry: &Registry, lang: &Language, status: Status, steps: u64) -> Self {
        Snapshot { status, steps, stacks: Snapshot::entries(registry, lang) }
    }

    fn entries(registry: &Registry, lang: &Language) -> Vec<Entry> {
        registry
            .iter()
            .filter(|(_, itype)| lang.is_loggable(&itype.name))
            .map(|(_, itype)| Entry {
                name: itype.name.clone(),
                value: itype.value.as_ref().map(|v| render_stack(v, registry)),
            })
            .collect()
    }
}
