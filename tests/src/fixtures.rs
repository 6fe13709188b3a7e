//! Builders for synthetic method bodies.

use chaff_core::Opcode;
use chaff_core::filter::coroutine::RESUME_BEFORE_INVOKE;
use chaff_core::filter::{IgnoreRange, KOTLIN_METADATA};
use chaff_core::insn::{ClassListing, Constant, Insn, LabelId, MethodNode};

pub const OWNER: &str = "demo/FetchKt$main$1";
pub const INVOKE_SUSPEND_DESC: &str = "(Ljava/lang/Object;Lkotlin/coroutines/Continuation;)Ljava/lang/Object;";

const RESULT_FAILURE: &str = "kotlin/Result$Failure";
const SUSPENDED_SLOT: u16 = 3;
const RESULT_SLOT: u16 = 1;

/// Installs a debug subscriber once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Wraps `methods` in a class carrying the Kotlin metadata annotation.
pub fn kotlin_class(methods: Vec<MethodNode>) -> ClassListing {
    ClassListing {
        name: OWNER.to_string(),
        annotations: vec![KOTLIN_METADATA.to_string()],
        methods,
    }
}

/// Rebuilds `method` after applying `edit` to a copy of its instructions.
pub fn mutate(method: &MethodNode, edit: impl FnOnce(&mut Vec<Insn>)) -> MethodNode {
    let mut insns: Vec<Insn> = method.instructions.iter().cloned().collect();
    edit(&mut insns);
    MethodNode::new(&method.name, &method.descriptor, insns)
}

/// Generates the `invokeSuspend` body kotlinc emits for a lambda with a number of
/// sequential suspending calls, together with the ranges a recognizer should report.
#[derive(Debug, Clone)]
pub struct StateMachine {
    suspension_points: usize,
    fault_message: String,
    corrupt_instanceof: Option<usize>,
    markers: bool,
    descriptor: String,
}

impl StateMachine {
    pub fn new(suspension_points: usize) -> Self {
        Self {
            suspension_points,
            fault_message: RESUME_BEFORE_INVOKE.to_string(),
            corrupt_instanceof: None,
            markers: false,
            descriptor: INVOKE_SUSPEND_DESC.to_string(),
        }
    }

    /// Replaces the message of the default branch exception.
    pub fn fault_message(mut self, message: &str) -> Self {
        self.fault_message = message.to_string();
        self
    }

    /// Makes the result check of `block` test for `kotlin/Result` instead of its failure
    /// subclass. Block 0 is the check after the dispatch table, block k the check on resume of
    /// suspension point k.
    pub fn corrupt_instanceof(mut self, block: usize) -> Self {
        self.corrupt_instanceof = Some(block);
        self
    }

    /// Puts a fresh label and line number in front of every instruction.
    pub fn with_markers(mut self) -> Self {
        self.markers = true;
        self
    }

    pub fn descriptor(mut self, descriptor: &str) -> Self {
        self.descriptor = descriptor.to_string();
        self
    }

    /// Emits the method and the ranges in the order the recognizer reports them: default
    /// branch first, then the dispatch table, then each suspension point.
    pub fn build(&self) -> (MethodNode, Vec<IgnoreRange>) {
        let n = self.suspension_points;
        let mut e = Emitter::new(self.markers);

        let start = e.fresh();
        let cases: Vec<LabelId> = (0..=n).map(|_| e.fresh()).collect();
        let default = e.fresh();

        e.place(start);
        e.emit(Insn::method(
            Opcode::INVOKESTATIC,
            "kotlin/coroutines/intrinsics/IntrinsicsKt",
            "getCOROUTINE_SUSPENDED",
            "()Ljava/lang/Object;",
        ));
        e.emit(Insn::var(Opcode::ASTORE, SUSPENDED_SLOT));
        e.emit(Insn::var(Opcode::ALOAD, 0));
        e.emit(Insn::field(Opcode::GETFIELD, OWNER, "label", "I"));
        let switch = e.emit(Insn::TableSwitch {
            min: 0,
            max: n as i32,
            default,
            labels: cases.clone(),
        });

        let mut table_ranges = Vec::with_capacity(n + 1);
        e.place(cases[0]);
        e.emit(Insn::Frame("SAME".to_string()));
        let initial_end = self.result_check(&mut e, 0);
        table_ranges.push(IgnoreRange::new(switch, initial_end));

        for (k, case) in cases.iter().enumerate().skip(1) {
            let continuation = e.fresh();
            e.emit(Insn::var(Opcode::ALOAD, 0));
            e.emit(Insn::var(Opcode::ALOAD, 0));
            e.emit(Insn::Int {
                opcode: Opcode::BIPUSH,
                operand: k as i32,
            });
            e.emit(Insn::field(Opcode::PUTFIELD, OWNER, "label", "I"));
            e.emit(Insn::method(
                Opcode::INVOKESTATIC,
                "demo/FetchKt",
                "fetch",
                "(Lkotlin/coroutines/Continuation;)Ljava/lang/Object;",
            ));
            let first = e.emit(Insn::Simple(Opcode::DUP));
            e.emit(Insn::var(Opcode::ALOAD, SUSPENDED_SLOT));
            e.emit(Insn::jump(Opcode::IF_ACMPNE, continuation));
            e.emit(Insn::var(Opcode::ALOAD, SUSPENDED_SLOT));
            e.emit(Insn::Simple(Opcode::ARETURN));

            e.place(*case);
            e.emit(Insn::Frame("SAME".to_string()));
            self.result_check(&mut e, k);
            let last = e.emit(Insn::var(Opcode::ALOAD, RESULT_SLOT));
            table_ranges.push(IgnoreRange::new(first, last));

            e.place(continuation);
            e.emit(Insn::Frame("SAME1 java/lang/Object".to_string()));
            e.emit(Insn::var(Opcode::ASTORE, 2));
        }

        e.emit(Insn::field(
            Opcode::GETSTATIC,
            "kotlin/Unit",
            "INSTANCE",
            "Lkotlin/Unit;",
        ));
        e.emit(Insn::Simple(Opcode::ARETURN));

        let fault_start = e.place(default);
        e.emit(Insn::Frame("SAME".to_string()));
        e.emit(Insn::type_insn(Opcode::NEW, "java/lang/IllegalStateException"));
        e.emit(Insn::Simple(Opcode::DUP));
        e.emit(Insn::Ldc(Constant::String(self.fault_message.clone())));
        e.emit(Insn::method(
            Opcode::INVOKESPECIAL,
            "java/lang/IllegalStateException",
            "<init>",
            "(Ljava/lang/String;)V",
        ));
        let fault_end = e.emit(Insn::Simple(Opcode::ATHROW));
        let end = e.fresh();
        e.place(end);

        let mut expected = vec![IgnoreRange::new(fault_start, fault_end)];
        expected.extend(table_ranges);
        (
            MethodNode::new("invokeSuspend", &self.descriptor, e.insns),
            expected,
        )
    }

    /// Emits the rethrow of a failed result and returns the index of its final `POP`.
    fn result_check(&self, e: &mut Emitter, block: usize) -> usize {
        let instance_type = if self.corrupt_instanceof == Some(block) {
            "kotlin/Result"
        } else {
            RESULT_FAILURE
        };
        let success = e.fresh();
        e.emit(Insn::var(Opcode::ALOAD, RESULT_SLOT));
        e.emit(Insn::Simple(Opcode::DUP));
        e.emit(Insn::type_insn(Opcode::INSTANCEOF, instance_type));
        e.emit(Insn::jump(Opcode::IFEQ, success));
        e.emit(Insn::type_insn(Opcode::CHECKCAST, RESULT_FAILURE));
        e.emit(Insn::field(
            Opcode::GETFIELD,
            RESULT_FAILURE,
            "exception",
            "Ljava/lang/Throwable;",
        ));
        e.emit(Insn::Simple(Opcode::ATHROW));
        e.place(success);
        e.emit(Insn::Frame("SAME1 java/lang/Object".to_string()));
        e.emit(Insn::Simple(Opcode::POP))
    }
}

struct Emitter {
    insns: Vec<Insn>,
    next_label: u32,
    next_line: u32,
    markers: bool,
}

impl Emitter {
    fn new(markers: bool) -> Self {
        Self {
            insns: Vec::new(),
            next_label: 0,
            next_line: 1,
            markers,
        }
    }

    fn fresh(&mut self) -> LabelId {
        let label = LabelId(self.next_label);
        self.next_label += 1;
        label
    }

    fn place(&mut self, label: LabelId) -> usize {
        self.insns.push(Insn::Label(label));
        self.insns.len() - 1
    }

    fn emit(&mut self, insn: Insn) -> usize {
        if self.markers && !insn.is_structural() {
            let marker = self.fresh();
            self.place(marker);
            self.insns.push(Insn::LineNumber {
                line: self.next_line,
                start: marker,
            });
            self.next_line += 1;
        }
        self.insns.push(insn);
        self.insns.len() - 1
    }
}

/// Listing of a lambda with a single suspending call, as printed by the `decode` command.
///
/// The recognizer reports `57..=63`, `6..=18` and `26..=44` for `invokeSuspend`.
pub const FETCH_LISTING: &str = r#"// suspend { println(fetch()) }
class demo/FetchKt$main$1
annotation Lkotlin/Metadata;

method invokeSuspend (Ljava/lang/Object;Lkotlin/coroutines/Continuation;)Ljava/lang/Object;
  L0
  LINENUMBER 3 L0
  INVOKESTATIC kotlin/coroutines/intrinsics/IntrinsicsKt.getCOROUTINE_SUSPENDED ()Ljava/lang/Object;
  ASTORE 3
  ALOAD 0
  GETFIELD demo/FetchKt$main$1.label : I
  TABLESWITCH
    0: L1
    1: L2
    default: L3
  L1
  FRAME SAME
  ALOAD 1
  DUP
  INSTANCEOF kotlin/Result$Failure
  IFEQ L4
  CHECKCAST kotlin/Result$Failure
  GETFIELD kotlin/Result$Failure.exception : Ljava/lang/Throwable;
  ATHROW
  L4
  FRAME SAME1 java/lang/Object
  POP
  L5
  LINENUMBER 5 L5
  ALOAD 0
  ALOAD 0
  ICONST_1
  PUTFIELD demo/FetchKt$main$1.label : I
  INVOKESTATIC demo/FetchKt.fetch (Lkotlin/coroutines/Continuation;)Ljava/lang/Object;
  DUP
  ALOAD 3
  IF_ACMPNE L6
  L7
  ALOAD 3
  ARETURN
  L2
  FRAME SAME
  ALOAD 1
  DUP
  INSTANCEOF kotlin/Result$Failure
  IFEQ L8
  CHECKCAST kotlin/Result$Failure
  GETFIELD kotlin/Result$Failure.exception : Ljava/lang/Throwable;
  ATHROW
  L8
  FRAME SAME1 java/lang/Object
  POP
  ALOAD 1
  L6
  FRAME SAME1 java/lang/Object
  ASTORE 2
  L9
  LINENUMBER 6 L9
  GETSTATIC java/lang/System.out : Ljava/io/PrintStream;
  ALOAD 2
  INVOKEVIRTUAL java/io/PrintStream.println (Ljava/lang/Object;)V
  L10
  LINENUMBER 7 L10
  GETSTATIC kotlin/Unit.INSTANCE : Lkotlin/Unit;
  ARETURN
  L3
  FRAME SAME
  NEW java/lang/IllegalStateException
  DUP
  LDC "call to 'resume' before 'invoke' with coroutine"
  INVOKESPECIAL java/lang/IllegalStateException.<init> (Ljava/lang/String;)V
  ATHROW
  L11
end

method <init> (Lkotlin/coroutines/Continuation;)V
  L0
  ALOAD 0
  ICONST_2
  ALOAD 1
  INVOKESPECIAL kotlin/coroutines/jvm/internal/SuspendLambda.<init> (ILkotlin/coroutines/Continuation;)V
  RETURN
end
"#;
