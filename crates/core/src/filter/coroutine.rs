//! Recognizer for the state machine the Kotlin compiler generates for suspending lambdas
//! and continuations.
//!
//! `invokeSuspend` of such a class has the following skeleton:
//!
//! ```text
//!     INVOKESTATIC kotlin/coroutines/intrinsics/IntrinsicsKt.getCOROUTINE_SUSPENDED
//!     ASTORE s
//!     ALOAD 0
//!     GETFIELD label
//!     TABLESWITCH 0: C0, 1: C1, ..., default: D
//! C0: ALOAD result; DUP; INSTANCEOF Result$Failure; IFEQ; CHECKCAST; GETFIELD; ATHROW; POP
//!     ...
//!     <suspending call>
//!     DUP; ALOAD s; IF_ACMPNE K1
//!     ALOAD s; ARETURN
//! C1: ALOAD result; DUP; INSTANCEOF Result$Failure; IFEQ; CHECKCAST; GETFIELD; ATHROW; POP
//!     ALOAD result
//! K1: ...
//! D:  NEW IllegalStateException; DUP; LDC "call to 'resume' before 'invoke' with coroutine"
//!     INVOKESPECIAL IllegalStateException.<init>; ATHROW
//! ```
//!
//! None of these branches exist in the source, so every one of them is reported. The match is
//! all or nothing: if any part of the skeleton is missing, no range is reported for the method.

use super::matcher::{Matcher, label_target, skip_non_opcodes};
use super::{Filter, FilterContext, FilterOutput, IgnoreRange, is_kotlin_class};
use crate::descriptor::last_argument_is;
use crate::insn::{Insn, InsnList, MethodNode};
use crate::opcode::Opcode;
use tracing::debug;

const INVOKE_SUSPEND: &str = "invokeSuspend";
const CONTINUATION: &str = "kotlin.coroutines.Continuation";
const INTRINSICS: &str = "kotlin/coroutines/intrinsics/IntrinsicsKt";
const GET_SUSPENDED: &str = "getCOROUTINE_SUSPENDED";
const RESULT_FAILURE: &str = "kotlin/Result$Failure";
const ILLEGAL_STATE: &str = "java/lang/IllegalStateException";
const STRING_CTOR: &str = "(Ljava/lang/String;)V";

/// Message of the exception thrown by the default branch of the dispatch table.
pub const RESUME_BEFORE_INVOKE: &str = "call to 'resume' before 'invoke' with coroutine";

/// Binding name of the local holding the `COROUTINE_SUSPENDED` marker.
const SUSPENDED: &str = "COROUTINE_SUSPENDED";

/// Filters the dispatch branches of Kotlin coroutine state machines.
#[derive(Debug, Clone, Copy, Default)]
pub struct KotlinCoroutineFilter;

impl Filter for KotlinCoroutineFilter {
    fn name(&self) -> &'static str {
        "KotlinCoroutine"
    }

    fn filter(&self, method: &MethodNode, ctx: &dyn FilterContext, output: &mut dyn FilterOutput) {
        if !is_kotlin_class(ctx) || method.name != INVOKE_SUSPEND {
            return;
        }
        if !last_argument_is(&method.descriptor, CONTINUATION) {
            debug!(
                "{}.{}{} does not take a continuation last",
                ctx.class_name(),
                method.name,
                method.descriptor
            );
            return;
        }

        match match_state_machine(&method.instructions) {
            Some(ranges) => {
                debug!(
                    "Recognized coroutine state machine in {} with {} ranges",
                    ctx.class_name(),
                    ranges.len()
                );
                for range in ranges {
                    output.ignore(range.first, range.last);
                }
            }
            None => debug!("No coroutine state machine in {}", ctx.class_name()),
        }
    }
}

/// Matches the whole state machine skeleton of `insns`.
///
/// Returns the default branch range first, then the range from the dispatch table through
/// the initial result check, then one range per suspension point. Returns `None` unless every
/// part matched.
pub fn match_state_machine(insns: &InsnList) -> Option<Vec<IgnoreRange>> {
    let m = Matcher::new(insns)
        .next_is_invoke_static(INTRINSICS, GET_SUSPENDED)
        .next_is_var(Opcode::ASTORE, SUSPENDED)
        .next_is_var(Opcode::ALOAD, "this")
        .next_is(Opcode::GETFIELD)
        .next_is(Opcode::TABLESWITCH);
    let switch = m.position()?;
    let Some(Insn::TableSwitch {
        default, labels, ..
    }) = insns.get(switch)
    else {
        return None;
    };

    let m = next_is_result_check(m);
    let Some(initial_end) = m.position() else {
        debug!("Dispatch table at {switch} is not followed by a result check");
        return None;
    };

    let mut ranges = Vec::with_capacity(labels.len() + 1);
    ranges.push(IgnoreRange::new(switch, initial_end));

    let mut suspension_point = 1;
    let mut scan = Some(initial_end);
    while suspension_point < labels.len() {
        let Some(i) = scan else {
            debug!("Suspension point {suspension_point} not found");
            return None;
        };
        scan = insns.next(i);

        let check = m
            .clone()
            .at(i)
            .next_is_var(Opcode::ALOAD, SUSPENDED)
            .next_is(Opcode::IF_ACMPNE);
        let Some(Insn::Jump { target, .. }) = check.insn() else {
            continue;
        };
        let Some(continuation) = label_target(insns, *target) else {
            continue;
        };

        let suspend = check
            .next_is_var(Opcode::ALOAD, SUSPENDED)
            .next_is(Opcode::ARETURN);
        let Some(ret) = suspend.position() else {
            continue;
        };
        let resumed = insns.next(ret).and_then(|after| skip_non_opcodes(insns, after));
        if resumed.is_none() || resumed != label_target(insns, labels[suspension_point]) {
            continue;
        }

        let Some(end) = find_resumed_result_check(insns, &m, i, continuation) else {
            debug!("Suspension point {suspension_point} at {i} has no matching result check");
            return None;
        };
        ranges.push(IgnoreRange::new(i, end));
        suspension_point += 1;
    }

    let start = insns.label_index(*default)?;
    let fault = Matcher::new(insns)
        .at(start)
        .next_is_type(Opcode::NEW, ILLEGAL_STATE)
        .next_is(Opcode::DUP)
        .next_is_ldc_string(RESUME_BEFORE_INVOKE)
        .next_is_invoke_super(ILLEGAL_STATE, STRING_CTOR)
        .next_is(Opcode::ATHROW);
    let Some(fault_end) = fault.position() else {
        debug!("Default branch of dispatch table at {switch} is not the resume fault");
        return None;
    };

    ranges.insert(0, IgnoreRange::new(start, fault_end));
    Some(ranges)
}

/// `ALOAD; DUP; INSTANCEOF Result$Failure; IFEQ; CHECKCAST Result$Failure; GETFIELD; ATHROW; POP`
fn next_is_result_check(m: Matcher<'_>) -> Matcher<'_> {
    m.next_is(Opcode::ALOAD)
        .next_is(Opcode::DUP)
        .next_is_type(Opcode::INSTANCEOF, RESULT_FAILURE)
        .next_is(Opcode::IFEQ)
        .next_is_type(Opcode::CHECKCAST, RESULT_FAILURE)
        .next_is(Opcode::GETFIELD)
        .next_is(Opcode::ATHROW)
        .next_is(Opcode::POP)
}

/// Scans forward from `from` for a result check followed by the reload of the result that
/// falls through into `continuation`. Returns the index of that reload.
fn find_resumed_result_check(
    insns: &InsnList,
    m: &Matcher<'_>,
    from: usize,
    continuation: usize,
) -> Option<usize> {
    (from..insns.len()).find_map(|j| {
        let end = next_is_result_check(m.clone().at(j))
            .next_is(Opcode::ALOAD)
            .position()?;
        let next = insns.next(end).and_then(|after| skip_non_opcodes(insns, after));
        (next == Some(continuation)).then_some(end)
    })
}
