//! Abstract instruction model for one decoded method body.
//!
//! A method body is an ordered list of [`Insn`] nodes. Most nodes carry an opcode and its
//! operand; labels, line numbers and stack-map frames are structural markers that have no
//! opcode and are skipped by the matchers in [`crate::filter`]. Instructions are addressed by
//! their index in the owning [`InsnList`], and traversal is always bounds checked: walking off
//! either end yields `None` rather than a panic.

use crate::opcode::Opcode;
use std::collections::HashMap;
use std::fmt;

/// Identifier of a label placed in a method body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabelId(pub u32);

impl fmt::Display for LabelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// A constant pool literal loaded by `LDC`.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    /// A class literal, held as its type descriptor (e.g. `Ljava/lang/String;`).
    Type(String),
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Int(v) => write!(f, "{v}"),
            Constant::Long(v) => write!(f, "{v}L"),
            Constant::Float(v) if v.is_finite() => write!(f, "{v:?}F"),
            Constant::Float(v) => write!(f, "{}F", non_finite(f64::from(*v))),
            Constant::Double(v) if v.is_finite() => write!(f, "{v:?}"),
            Constant::Double(v) => f.write_str(non_finite(*v)),
            Constant::Type(desc) => write!(f, "{desc}.class"),
            Constant::String(s) => {
                f.write_str("\"")?;
                for c in s.chars() {
                    match c {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        '\t' => f.write_str("\\t")?,
                        c => write!(f, "{c}")?,
                    }
                }
                f.write_str("\"")
            }
        }
    }
}

/// Spelling of NaN and the infinities in listings, as Java prints them.
fn non_finite(v: f64) -> &'static str {
    if v.is_nan() {
        "NaN"
    } else if v > 0.0 {
        "Infinity"
    } else {
        "-Infinity"
    }
}

/// A single node of a method body.
///
/// Each variant holds exactly the operand shape its opcodes take (see
/// [`crate::opcode::OperandKind`]). `Label`, `LineNumber` and `Frame` are structural and have
/// no opcode.
#[derive(Debug, Clone, PartialEq)]
pub enum Insn {
    /// A jump target or range boundary.
    Label(LabelId),
    /// Source line marker attached to a label.
    LineNumber { line: u32, start: LabelId },
    /// Stack map frame; the text is kept only for display.
    Frame(String),
    /// An instruction without operand.
    Simple(Opcode),
    /// `BIPUSH`, `SIPUSH`, `NEWARRAY`.
    Int { opcode: Opcode, operand: i32 },
    /// Loads, stores and `RET`.
    Var { opcode: Opcode, slot: u16 },
    Iinc { slot: u16, increment: i16 },
    /// `NEW`, `ANEWARRAY`, `CHECKCAST`, `INSTANCEOF`; the operand is an internal name.
    Type { opcode: Opcode, descriptor: String },
    Field {
        opcode: Opcode,
        owner: String,
        name: String,
        descriptor: String,
    },
    Method {
        opcode: Opcode,
        owner: String,
        name: String,
        descriptor: String,
    },
    InvokeDynamic { name: String, descriptor: String },
    /// Conditional and unconditional branches.
    Jump { opcode: Opcode, target: LabelId },
    Ldc(Constant),
    /// Dense jump table: `labels[k]` is the target for key `min + k`.
    TableSwitch {
        min: i32,
        max: i32,
        default: LabelId,
        labels: Vec<LabelId>,
    },
    LookupSwitch {
        default: LabelId,
        keys: Vec<i32>,
        labels: Vec<LabelId>,
    },
    MultiANewArray { descriptor: String, dims: u8 },
}

impl Insn {
    pub fn var(opcode: Opcode, slot: u16) -> Self {
        Insn::Var { opcode, slot }
    }

    pub fn type_insn(opcode: Opcode, descriptor: &str) -> Self {
        Insn::Type {
            opcode,
            descriptor: descriptor.to_string(),
        }
    }

    pub fn field(opcode: Opcode, owner: &str, name: &str, descriptor: &str) -> Self {
        Insn::Field {
            opcode,
            owner: owner.to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        }
    }

    pub fn method(opcode: Opcode, owner: &str, name: &str, descriptor: &str) -> Self {
        Insn::Method {
            opcode,
            owner: owner.to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        }
    }

    pub const fn jump(opcode: Opcode, target: LabelId) -> Self {
        Insn::Jump { opcode, target }
    }

    /// Returns the opcode, or `None` for structural markers.
    pub const fn opcode(&self) -> Option<Opcode> {
        match self {
            Insn::Label(_) | Insn::LineNumber { .. } | Insn::Frame(_) => None,
            Insn::Simple(opcode)
            | Insn::Int { opcode, .. }
            | Insn::Var { opcode, .. }
            | Insn::Type { opcode, .. }
            | Insn::Field { opcode, .. }
            | Insn::Method { opcode, .. }
            | Insn::Jump { opcode, .. } => Some(*opcode),
            Insn::Iinc { .. } => Some(Opcode::IINC),
            Insn::InvokeDynamic { .. } => Some(Opcode::INVOKEDYNAMIC),
            Insn::Ldc(_) => Some(Opcode::LDC),
            Insn::TableSwitch { .. } => Some(Opcode::TABLESWITCH),
            Insn::LookupSwitch { .. } => Some(Opcode::LOOKUPSWITCH),
            Insn::MultiANewArray { .. } => Some(Opcode::MULTIANEWARRAY),
        }
    }

    /// True for labels, line numbers and frames.
    pub const fn is_structural(&self) -> bool {
        self.opcode().is_none()
    }
}

impl fmt::Display for Insn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Insn::Label(label) => write!(f, "{label}"),
            Insn::LineNumber { line, start } => write!(f, "LINENUMBER {line} {start}"),
            Insn::Frame(kind) => write!(f, "FRAME {kind}"),
            Insn::Simple(opcode) => write!(f, "{opcode}"),
            Insn::Int { opcode, operand } => write!(f, "{opcode} {operand}"),
            Insn::Var { opcode, slot } => write!(f, "{opcode} {slot}"),
            Insn::Iinc { slot, increment } => write!(f, "IINC {slot} {increment}"),
            Insn::Type { opcode, descriptor } => write!(f, "{opcode} {descriptor}"),
            Insn::Field {
                opcode,
                owner,
                name,
                descriptor,
            } => write!(f, "{opcode} {owner}.{name} : {descriptor}"),
            Insn::Method {
                opcode,
                owner,
                name,
                descriptor,
            } => write!(f, "{opcode} {owner}.{name} {descriptor}"),
            Insn::InvokeDynamic { name, descriptor } => {
                write!(f, "INVOKEDYNAMIC {name} {descriptor}")
            }
            Insn::Jump { opcode, target } => write!(f, "{opcode} {target}"),
            Insn::Ldc(constant) => write!(f, "LDC {constant}"),
            Insn::TableSwitch {
                min,
                default,
                labels,
                ..
            } => {
                f.write_str("TABLESWITCH")?;
                for (key, label) in (*min..).zip(labels) {
                    write!(f, "\n    {key}: {label}")?;
                }
                write!(f, "\n    default: {default}")
            }
            Insn::LookupSwitch {
                default,
                keys,
                labels,
            } => {
                f.write_str("LOOKUPSWITCH")?;
                for (key, label) in keys.iter().zip(labels) {
                    write!(f, "\n    {key}: {label}")?;
                }
                write!(f, "\n    default: {default}")
            }
            Insn::MultiANewArray { descriptor, dims } => {
                write!(f, "MULTIANEWARRAY {descriptor} {dims}")
            }
        }
    }
}

/// Immutable, index-addressed instruction sequence of one method.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InsnList {
    insns: Vec<Insn>,
    labels: HashMap<LabelId, usize>,
}

impl InsnList {
    /// Builds the list and indexes label positions. If a label is placed twice the first
    /// placement wins.
    pub fn new(insns: Vec<Insn>) -> Self {
        let mut labels = HashMap::new();
        for (index, insn) in insns.iter().enumerate() {
            if let Insn::Label(label) = insn {
                labels.entry(*label).or_insert(index);
            }
        }
        Self { insns, labels }
    }

    pub fn len(&self) -> usize {
        self.insns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insns.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Insn> {
        self.insns.get(index)
    }

    /// Index of the first node, if any.
    pub fn first(&self) -> Option<usize> {
        (!self.insns.is_empty()).then_some(0)
    }

    /// Index of the node following `index`, or `None` at the end.
    pub fn next(&self, index: usize) -> Option<usize> {
        let next = index.checked_add(1)?;
        (next < self.insns.len()).then_some(next)
    }

    /// Position of the node that places `label`.
    pub fn label_index(&self, label: LabelId) -> Option<usize> {
        self.labels.get(&label).copied()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Insn> {
        self.insns.iter()
    }
}

impl From<Vec<Insn>> for InsnList {
    fn from(insns: Vec<Insn>) -> Self {
        Self::new(insns)
    }
}

impl FromIterator<Insn> for InsnList {
    fn from_iter<I: IntoIterator<Item = Insn>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a InsnList {
    type Item = &'a Insn;
    type IntoIter = std::slice::Iter<'a, Insn>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// A decoded method: name, JVM descriptor and body.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodNode {
    pub name: String,
    /// Method descriptor, e.g. `(Ljava/lang/Object;)Ljava/lang/Object;`
    pub descriptor: String,
    pub instructions: InsnList,
}

impl MethodNode {
    pub fn new(name: &str, descriptor: &str, instructions: impl Into<InsnList>) -> Self {
        Self {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            instructions: instructions.into(),
        }
    }
}

/// A decoded class: internal name, annotation descriptors and methods.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassListing {
    /// Internal name, e.g. `com/example/Foo$bar$1`
    pub name: String,
    /// Annotation type descriptors, e.g. `Lkotlin/Metadata;`
    pub annotations: Vec<String>,
    pub methods: Vec<MethodNode>,
}
