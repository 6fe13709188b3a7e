//! Cursor matcher over an [`InsnList`].
//!
//! A [`Matcher`] holds a cursor and a table of variable bindings. Every `next_is*` primitive
//! consumes the matcher, moves the cursor to the next instruction that has an opcode, and
//! returns the matcher with the cursor either on that instruction (it matched) or set to
//! [`Cursor::NoMatch`]. A matcher that no longer matches stays that way, so a recognizer can
//! chain many expectations and inspect the outcome once:
//!
//! ```rust,ignore
//! let m = Matcher::new(&method.instructions)
//!     .next_is_var(Opcode::ALOAD, "this")
//!     .next_is(Opcode::GETFIELD)
//!     .next_is(Opcode::TABLESWITCH);
//! let Some(switch) = m.position() else { return };
//! ```
//!
//! Since the state lives in the value, independent attempts are just clones and never share
//! anything mutable.

use crate::insn::{Constant, Insn, InsnList, LabelId};
use crate::opcode::Opcode;
use std::collections::HashMap;

/// Position of a matcher within an instruction list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    /// Nothing consumed yet; the next primitive examines `index` itself.
    Before(usize),
    /// The last matched node; the next primitive examines what follows it.
    At(usize),
    /// The pattern is absent.
    NoMatch,
}

/// Returns the first node at or after `index` that is not a label, line number or frame.
pub fn skip_non_opcodes(insns: &InsnList, index: usize) -> Option<usize> {
    let mut current = index;
    loop {
        if !insns.get(current)?.is_structural() {
            return Some(current);
        }
        current = insns.next(current)?;
    }
}

/// Resolves `label` to the first real instruction it leads to.
pub fn label_target(insns: &InsnList, label: LabelId) -> Option<usize> {
    skip_non_opcodes(insns, insns.label_index(label)?)
}

/// Cursor plus binding table for one matching attempt.
#[derive(Debug, Clone)]
pub struct Matcher<'a> {
    insns: &'a InsnList,
    cursor: Cursor,
    vars: HashMap<&'static str, u16>,
}

impl<'a> Matcher<'a> {
    /// Starts before the first node of `insns`.
    pub fn new(insns: &'a InsnList) -> Self {
        Self {
            insns,
            cursor: Cursor::Before(0),
            vars: HashMap::new(),
        }
    }

    /// Moves the cursor onto `index`, keeping the bindings recorded so far. The next
    /// primitive examines the instructions that follow `index`.
    pub fn at(mut self, index: usize) -> Self {
        self.cursor = if index < self.insns.len() {
            Cursor::At(index)
        } else {
            Cursor::NoMatch
        };
        self
    }

    pub const fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Index of the last matched node, or `None` once the match failed.
    pub const fn position(&self) -> Option<usize> {
        match self.cursor {
            Cursor::At(index) => Some(index),
            Cursor::Before(_) | Cursor::NoMatch => None,
        }
    }

    /// The last matched node.
    pub fn insn(&self) -> Option<&'a Insn> {
        self.insns.get(self.position()?)
    }

    pub const fn is_match(&self) -> bool {
        !matches!(self.cursor, Cursor::NoMatch)
    }

    /// Index of the next node carrying an opcode after the cursor.
    fn peek(&self) -> Option<usize> {
        match self.cursor {
            Cursor::Before(index) => skip_non_opcodes(self.insns, index),
            Cursor::At(index) => skip_non_opcodes(self.insns, self.insns.next(index)?),
            Cursor::NoMatch => None,
        }
    }

    /// Advances to the next instruction if `accept` agrees, invalidates otherwise.
    fn advance<F>(mut self, accept: F) -> Self
    where
        F: FnOnce(&Insn, &mut HashMap<&'static str, u16>) -> bool,
    {
        self.cursor = match self.peek() {
            Some(index) => match self.insns.get(index) {
                Some(insn) if accept(insn, &mut self.vars) => Cursor::At(index),
                _ => Cursor::NoMatch,
            },
            None => Cursor::NoMatch,
        };
        self
    }

    /// Expects the next instruction to have `opcode`.
    pub fn next_is(self, opcode: Opcode) -> Self {
        self.advance(|insn, _| insn.opcode() == Some(opcode))
    }

    /// Expects a variable instruction with `opcode` whose slot is bound to `name`. The first
    /// use of `name` records the slot; later uses require the same slot.
    pub fn next_is_var(self, opcode: Opcode, name: &'static str) -> Self {
        self.advance(|insn, vars| match insn {
            Insn::Var { opcode: op, slot } if *op == opcode => {
                *vars.entry(name).or_insert(*slot) == *slot
            }
            _ => false,
        })
    }

    /// Expects a type instruction (`NEW`, `CHECKCAST`, `INSTANCEOF`, ...) on `descriptor`.
    pub fn next_is_type(self, opcode: Opcode, descriptor: &str) -> Self {
        self.advance(|insn, _| {
            matches!(insn, Insn::Type { opcode: op, descriptor: d } if *op == opcode && d == descriptor)
        })
    }

    /// Expects `INVOKESTATIC owner.name`, any descriptor.
    pub fn next_is_invoke_static(self, owner: &str, name: &str) -> Self {
        self.advance(|insn, _| {
            matches!(
                insn,
                Insn::Method { opcode: Opcode::INVOKESTATIC, owner: o, name: n, .. }
                    if o == owner && n == name
            )
        })
    }

    /// Expects a constructor call `INVOKESPECIAL owner.<init> descriptor`.
    pub fn next_is_invoke_super(self, owner: &str, descriptor: &str) -> Self {
        self.advance(|insn, _| {
            matches!(
                insn,
                Insn::Method { opcode: Opcode::INVOKESPECIAL, owner: o, name, descriptor: d }
                    if o == owner && name == "<init>" && d == descriptor
            )
        })
    }

    /// Expects `LDC` of exactly the string `value`.
    pub fn next_is_ldc_string(self, value: &str) -> Self {
        self.advance(|insn, _| matches!(insn, Insn::Ldc(Constant::String(s)) if s == value))
    }
}
