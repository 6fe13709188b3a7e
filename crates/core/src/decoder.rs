//! chaff's entry point for turning textual instruction listings into [`ClassListing`]s.
//!
//! The listing syntax follows the assembler mnemonics of the JVM and the layout used by
//! bytecode printers:
//!
//! ```text
//! // comment
//! class com/example/Foo$bar$1
//! annotation Lkotlin/Metadata;
//! method invokeSuspend (Ljava/lang/Object;Lkotlin/coroutines/Continuation;)Ljava/lang/Object;
//!   L0
//!   LINENUMBER 12 L0
//!   ALOAD 0
//!   GETFIELD com/example/Foo$bar$1.label : I
//!   TABLESWITCH
//!     0: L1
//!     default: L2
//!   LDC "text"
//!   FRAME SAME
//! end
//! ```
//!
//! Label names are local to a method and numbered in order of first appearance.

use crate::insn::{ClassListing, Constant, Insn, LabelId, MethodNode};
use crate::opcode::{Opcode, OperandKind};
use chaff_utils::errors::ParseError;
use std::collections::{HashMap, HashSet};
use std::{fs, path::Path};

/// Reads and parses a listing file.
pub fn read_listing(path: impl AsRef<Path>) -> Result<ClassListing, ParseError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| ParseError::FileRead {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_listing(&text)
}

/// Parses a listing held in memory.
pub fn parse_listing(text: &str) -> Result<ClassListing, ParseError> {
    let mut class: Option<ClassListing> = None;
    let mut method: Option<MethodBuilder> = None;
    let mut lines = text.lines().enumerate();

    while let Some((line_no, raw)) = lines.next() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }
        let (keyword, rest) = split_first(line);

        match keyword {
            "class" => {
                if class.is_some() {
                    return Err(ParseError::syntax(line_no, "duplicate class", raw));
                }
                let name = single_token(rest, line_no, raw)?;
                class = Some(ClassListing {
                    name: name.to_string(),
                    ..Default::default()
                });
            }
            "annotation" => {
                let class = class
                    .as_mut()
                    .ok_or_else(|| ParseError::syntax(line_no, "annotation before class", raw))?;
                class
                    .annotations
                    .push(single_token(rest, line_no, raw)?.to_string());
            }
            "method" => {
                if class.is_none() {
                    return Err(ParseError::syntax(line_no, "method before class", raw));
                }
                if let Some(open) = &method {
                    return Err(ParseError::UnterminatedMethod(open.name.clone()));
                }
                let (name, descriptor) = split_first(rest);
                if name.is_empty() || descriptor.is_empty() {
                    return Err(ParseError::syntax(
                        line_no,
                        "expected `method <name> <descriptor>`",
                        raw,
                    ));
                }
                method = Some(MethodBuilder::new(name, descriptor));
            }
            "end" => {
                let builder = method
                    .take()
                    .ok_or_else(|| ParseError::syntax(line_no, "`end` outside of a method", raw))?;
                let node = builder.finish()?;
                tracing::debug!(
                    "Parsed method {}{} with {} nodes",
                    node.name,
                    node.descriptor,
                    node.instructions.len()
                );
                if let Some(class) = class.as_mut() {
                    class.methods.push(node);
                }
            }
            _ => {
                let builder = method.as_mut().ok_or_else(|| {
                    ParseError::syntax(line_no, "instruction outside of a method", raw)
                })?;
                let insn = builder.parse_insn(keyword, rest, line_no, raw, &mut lines)?;
                builder.insns.push(insn);
            }
        }
    }

    if let Some(open) = method {
        return Err(ParseError::UnterminatedMethod(open.name));
    }
    let class = class.ok_or(ParseError::MissingClass)?;
    tracing::debug!(
        "Parsed class {} with {} methods",
        class.name,
        class.methods.len()
    );
    Ok(class)
}

/// Splits off the first whitespace-separated token.
fn split_first(line: &str) -> (&str, &str) {
    match line.split_once(char::is_whitespace) {
        Some((first, rest)) => (first, rest.trim()),
        None => (line, ""),
    }
}

fn single_token<'a>(rest: &'a str, line_no: usize, raw: &str) -> Result<&'a str, ParseError> {
    match rest.split_whitespace().collect::<Vec<_>>()[..] {
        [token] => Ok(token),
        _ => Err(ParseError::syntax(line_no, "expected exactly one operand", raw)),
    }
}

fn parse_num<T: std::str::FromStr>(token: &str, line_no: usize, raw: &str) -> Result<T, ParseError> {
    token
        .parse()
        .map_err(|_| ParseError::syntax(line_no, format!("invalid number `{token}`"), raw))
}

fn is_label_name(token: &str) -> bool {
    token
        .strip_prefix('L')
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// `NEWARRAY` element type codes.
fn array_type_code(token: &str) -> Option<i32> {
    Some(match token {
        "T_BOOLEAN" => 4,
        "T_CHAR" => 5,
        "T_FLOAT" => 6,
        "T_DOUBLE" => 7,
        "T_BYTE" => 8,
        "T_SHORT" => 9,
        "T_INT" => 10,
        "T_LONG" => 11,
        _ => return None,
    })
}

/// Parses the operand of `LDC`.
fn parse_constant(text: &str, line_no: usize, raw: &str) -> Result<Constant, ParseError> {
    if let Some(body) = text.strip_prefix('"') {
        let body = body
            .strip_suffix('"')
            .ok_or_else(|| ParseError::syntax(line_no, "unterminated string", raw))?;
        let mut value = String::with_capacity(body.len());
        let mut chars = body.chars();
        while let Some(c) = chars.next() {
            if c != '\\' {
                value.push(c);
                continue;
            }
            match chars.next() {
                Some('"') => value.push('"'),
                Some('\\') => value.push('\\'),
                Some('n') => value.push('\n'),
                Some('t') => value.push('\t'),
                Some(other) => {
                    return Err(ParseError::syntax(
                        line_no,
                        format!("unknown escape `\\{other}`"),
                        raw,
                    ));
                }
                None => return Err(ParseError::syntax(line_no, "dangling escape", raw)),
            }
        }
        return Ok(Constant::String(value));
    }
    if let Some(desc) = text.strip_suffix(".class") {
        return Ok(Constant::Type(desc.to_string()));
    }
    if let Some(long) = text.strip_suffix('L') {
        return parse_num(long, line_no, raw).map(Constant::Long);
    }
    if let Some(float) = text.strip_suffix('F') {
        return parse_num(float, line_no, raw).map(Constant::Float);
    }
    if text.contains(['.', 'E', 'e']) || text == "NaN" || text.ends_with("Infinity") {
        return parse_num(text, line_no, raw).map(Constant::Double);
    }
    parse_num(text, line_no, raw).map(Constant::Int)
}

/// Instructions and label bookkeeping of the method being parsed.
struct MethodBuilder {
    name: String,
    descriptor: String,
    insns: Vec<Insn>,
    labels: HashMap<String, LabelId>,
    placed: HashSet<LabelId>,
}

impl MethodBuilder {
    fn new(name: &str, descriptor: &str) -> Self {
        Self {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            insns: Vec::new(),
            labels: HashMap::new(),
            placed: HashSet::new(),
        }
    }

    fn label(&mut self, token: &str, line_no: usize, raw: &str) -> Result<LabelId, ParseError> {
        if !is_label_name(token) {
            return Err(ParseError::syntax(
                line_no,
                format!("expected a label, found `{token}`"),
                raw,
            ));
        }
        let next = LabelId(self.labels.len() as u32);
        Ok(*self.labels.entry(token.to_string()).or_insert(next))
    }

    fn parse_insn<'a, I>(
        &mut self,
        mnemonic: &str,
        rest: &str,
        line_no: usize,
        raw: &str,
        lines: &mut I,
    ) -> Result<Insn, ParseError>
    where
        I: Iterator<Item = (usize, &'a str)>,
    {
        if is_label_name(mnemonic) && rest.is_empty() {
            let label = self.label(mnemonic, line_no, raw)?;
            if !self.placed.insert(label) {
                return Err(ParseError::syntax(line_no, "label placed twice", raw));
            }
            return Ok(Insn::Label(label));
        }
        match mnemonic {
            "LINENUMBER" => {
                let (line, start) = split_first(rest);
                return Ok(Insn::LineNumber {
                    line: parse_num(line, line_no, raw)?,
                    start: self.label(start, line_no, raw)?,
                });
            }
            "FRAME" => return Ok(Insn::Frame(rest.to_string())),
            _ => {}
        }

        let opcode = Opcode::from_mnemonic(mnemonic).ok_or_else(|| ParseError::UnknownOpcode {
            line: line_no + 1,
            mnemonic: mnemonic.to_string(),
        })?;
        let operands: Vec<&str> = rest.split_whitespace().collect();

        let insn = match opcode.operand_kind() {
            OperandKind::None => {
                if !operands.is_empty() {
                    return Err(ParseError::syntax(line_no, "unexpected operand", raw));
                }
                Insn::Simple(opcode)
            }
            OperandKind::Int => {
                let token = single_token(rest, line_no, raw)?;
                let operand = match (opcode, array_type_code(token)) {
                    (Opcode::NEWARRAY, Some(code)) => code,
                    _ => parse_num(token, line_no, raw)?,
                };
                Insn::Int { opcode, operand }
            }
            OperandKind::Ldc => Insn::Ldc(parse_constant(rest, line_no, raw)?),
            OperandKind::Var => Insn::Var {
                opcode,
                slot: parse_num(single_token(rest, line_no, raw)?, line_no, raw)?,
            },
            OperandKind::Iinc => match operands[..] {
                [slot, increment] => Insn::Iinc {
                    slot: parse_num(slot, line_no, raw)?,
                    increment: parse_num(increment, line_no, raw)?,
                },
                _ => return Err(ParseError::syntax(line_no, "expected `IINC <slot> <n>`", raw)),
            },
            OperandKind::Jump => Insn::Jump {
                opcode,
                target: self.label(single_token(rest, line_no, raw)?, line_no, raw)?,
            },
            OperandKind::TableSwitch | OperandKind::LookupSwitch => {
                if !operands.is_empty() {
                    return Err(ParseError::syntax(line_no, "switch cases go on their own lines", raw));
                }
                self.parse_switch(opcode, line_no, raw, lines)?
            }
            OperandKind::Field => {
                let (reference, descriptor) = rest
                    .split_once(" : ")
                    .ok_or_else(|| ParseError::syntax(line_no, "expected `owner.name : desc`", raw))?;
                let (owner, name) = reference
                    .trim()
                    .rsplit_once('.')
                    .ok_or_else(|| ParseError::syntax(line_no, "expected `owner.name`", raw))?;
                Insn::field(opcode, owner, name, descriptor.trim())
            }
            OperandKind::Method => match operands[..] {
                // INVOKEINTERFACE may carry a trailing `(itf)` marker
                [reference, descriptor, ..] => {
                    let (owner, name) = reference
                        .rsplit_once('.')
                        .ok_or_else(|| ParseError::syntax(line_no, "expected `owner.name`", raw))?;
                    Insn::method(opcode, owner, name, descriptor)
                }
                _ => return Err(ParseError::syntax(line_no, "expected `owner.name desc`", raw)),
            },
            OperandKind::InvokeDynamic => match operands[..] {
                [name, descriptor, ..] => Insn::InvokeDynamic {
                    name: name.to_string(),
                    descriptor: descriptor.to_string(),
                },
                _ => return Err(ParseError::syntax(line_no, "expected `name desc`", raw)),
            },
            OperandKind::Type => Insn::type_insn(opcode, single_token(rest, line_no, raw)?),
            OperandKind::MultiANewArray => match operands[..] {
                [descriptor, dims] => Insn::MultiANewArray {
                    descriptor: descriptor.to_string(),
                    dims: parse_num(dims, line_no, raw)?,
                },
                _ => return Err(ParseError::syntax(line_no, "expected `desc dims`", raw)),
            },
        };
        Ok(insn)
    }

    /// Consumes the `key: label` lines that follow a switch, up to and including `default:`.
    fn parse_switch<'a, I>(
        &mut self,
        opcode: Opcode,
        line_no: usize,
        raw: &str,
        lines: &mut I,
    ) -> Result<Insn, ParseError>
    where
        I: Iterator<Item = (usize, &'a str)>,
    {
        let mut keys = Vec::new();
        let mut labels = Vec::new();
        let default = loop {
            let Some((case_no, case_raw)) = lines.next() else {
                return Err(ParseError::syntax(line_no, "switch without `default:`", raw));
            };
            let (key, target) = case_raw
                .trim()
                .split_once(':')
                .ok_or_else(|| ParseError::syntax(case_no, "expected `key: label`", case_raw))?;
            let target = self.label(target.trim(), case_no, case_raw)?;
            if key.trim() == "default" {
                break target;
            }
            keys.push(parse_num::<i32>(key.trim(), case_no, case_raw)?);
            labels.push(target);
        };

        if opcode == Opcode::LOOKUPSWITCH {
            return Ok(Insn::LookupSwitch {
                default,
                keys,
                labels,
            });
        }
        let (Some(&min), Some(&max)) = (keys.first(), keys.last()) else {
            return Err(ParseError::syntax(line_no, "TABLESWITCH without cases", raw));
        };
        if keys.iter().zip(min..).any(|(key, expected)| *key != expected) {
            return Err(ParseError::syntax(
                line_no,
                "TABLESWITCH keys must be consecutive",
                raw,
            ));
        }
        Ok(Insn::TableSwitch {
            min,
            max,
            default,
            labels,
        })
    }

    fn finish(self) -> Result<MethodNode, ParseError> {
        let mut names: Vec<(&String, &LabelId)> = self.labels.iter().collect();
        names.sort_by_key(|(_, id)| **id);
        if let Some((name, _)) = names.iter().find(|(_, id)| !self.placed.contains(*id)) {
            let label = name.to_string();
            return Err(ParseError::UndefinedLabel {
                method: self.name,
                label,
            });
        }
        Ok(MethodNode::new(&self.name, &self.descriptor, self.insns))
    }
}
