//! Module defining the JVM opcode enumeration used by the instruction model.
//!
//! The set mirrors the canonical opcodes that survive class-file decoding: the short forms
//! (`ILOAD_0`, `LDC_W`, `GOTO_W`, ...) are folded into their general opcode by the decoder, so
//! they never appear here. Each opcode carries its byte value, its mnemonic, and the
//! `OperandKind` that decides which `Insn` variant holds it.

use std::fmt;

/// Shape of the operand an opcode takes, which selects the `Insn` variant that carries it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    /// No operand (`DUP`, `ATHROW`, `ARETURN`, ...).
    None,
    /// Immediate integer (`BIPUSH`, `SIPUSH`, `NEWARRAY`).
    Int,
    /// Constant pool literal (`LDC`).
    Ldc,
    /// Local variable slot (`ALOAD`, `ASTORE`, `RET`, ...).
    Var,
    /// Local variable slot plus increment (`IINC`).
    Iinc,
    /// Branch to a label (`IFEQ`, `GOTO`, `IF_ACMPNE`, ...).
    Jump,
    /// Dense jump table.
    TableSwitch,
    /// Sparse jump table.
    LookupSwitch,
    /// Field reference (`GETFIELD`, `PUTSTATIC`, ...).
    Field,
    /// Method reference (`INVOKESTATIC`, `INVOKESPECIAL`, ...).
    Method,
    /// Call site (`INVOKEDYNAMIC`).
    InvokeDynamic,
    /// Internal type name (`NEW`, `CHECKCAST`, `INSTANCEOF`, `ANEWARRAY`).
    Type,
    /// Array descriptor plus dimensions.
    MultiANewArray,
}

macro_rules! opcodes {
    ($($name:ident = $byte:literal => $kind:ident,)*) => {
        /// Enumeration of JVM opcodes.
        ///
        /// The discriminant is the opcode's byte in a class file.
        #[allow(non_camel_case_types, clippy::upper_case_acronyms)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum Opcode {
            $($name = $byte,)*
        }

        impl Opcode {
            /// Every opcode, in byte order.
            pub const ALL: &'static [Opcode] = &[$(Opcode::$name,)*];

            /// The assembler mnemonic, e.g. `"IF_ACMPNE"`.
            pub const fn mnemonic(self) -> &'static str {
                match self {
                    $(Opcode::$name => stringify!($name),)*
                }
            }

            /// The operand shape this opcode takes.
            pub const fn operand_kind(self) -> OperandKind {
                match self {
                    $(Opcode::$name => OperandKind::$kind,)*
                }
            }
        }
    };
}

opcodes! {
    NOP = 0 => None,
    ACONST_NULL = 1 => None,
    ICONST_M1 = 2 => None,
    ICONST_0 = 3 => None,
    ICONST_1 = 4 => None,
    ICONST_2 = 5 => None,
    ICONST_3 = 6 => None,
    ICONST_4 = 7 => None,
    ICONST_5 = 8 => None,
    LCONST_0 = 9 => None,
    LCONST_1 = 10 => None,
    FCONST_0 = 11 => None,
    FCONST_1 = 12 => None,
    FCONST_2 = 13 => None,
    DCONST_0 = 14 => None,
    DCONST_1 = 15 => None,
    BIPUSH = 16 => Int,
    SIPUSH = 17 => Int,
    LDC = 18 => Ldc,
    ILOAD = 21 => Var,
    LLOAD = 22 => Var,
    FLOAD = 23 => Var,
    DLOAD = 24 => Var,
    ALOAD = 25 => Var,
    IALOAD = 46 => None,
    LALOAD = 47 => None,
    FALOAD = 48 => None,
    DALOAD = 49 => None,
    AALOAD = 50 => None,
    BALOAD = 51 => None,
    CALOAD = 52 => None,
    SALOAD = 53 => None,
    ISTORE = 54 => Var,
    LSTORE = 55 => Var,
    FSTORE = 56 => Var,
    DSTORE = 57 => Var,
    ASTORE = 58 => Var,
    IASTORE = 79 => None,
    LASTORE = 80 => None,
    FASTORE = 81 => None,
    DASTORE = 82 => None,
    AASTORE = 83 => None,
    BASTORE = 84 => None,
    CASTORE = 85 => None,
    SASTORE = 86 => None,
    POP = 87 => None,
    POP2 = 88 => None,
    DUP = 89 => None,
    DUP_X1 = 90 => None,
    DUP_X2 = 91 => None,
    DUP2 = 92 => None,
    DUP2_X1 = 93 => None,
    DUP2_X2 = 94 => None,
    SWAP = 95 => None,
    IADD = 96 => None,
    LADD = 97 => None,
    FADD = 98 => None,
    DADD = 99 => None,
    ISUB = 100 => None,
    LSUB = 101 => None,
    FSUB = 102 => None,
    DSUB = 103 => None,
    IMUL = 104 => None,
    LMUL = 105 => None,
    FMUL = 106 => None,
    DMUL = 107 => None,
    IDIV = 108 => None,
    LDIV = 109 => None,
    FDIV = 110 => None,
    DDIV = 111 => None,
    IREM = 112 => None,
    LREM = 113 => None,
    FREM = 114 => None,
    DREM = 115 => None,
    INEG = 116 => None,
    LNEG = 117 => None,
    FNEG = 118 => None,
    DNEG = 119 => None,
    ISHL = 120 => None,
    LSHL = 121 => None,
    ISHR = 122 => None,
    LSHR = 123 => None,
    IUSHR = 124 => None,
    LUSHR = 125 => None,
    IAND = 126 => None,
    LAND = 127 => None,
    IOR = 128 => None,
    LOR = 129 => None,
    IXOR = 130 => None,
    LXOR = 131 => None,
    IINC = 132 => Iinc,
    I2L = 133 => None,
    I2F = 134 => None,
    I2D = 135 => None,
    L2I = 136 => None,
    L2F = 137 => None,
    L2D = 138 => None,
    F2I = 139 => None,
    F2L = 140 => None,
    F2D = 141 => None,
    D2I = 142 => None,
    D2L = 143 => None,
    D2F = 144 => None,
    I2B = 145 => None,
    I2C = 146 => None,
    I2S = 147 => None,
    LCMP = 148 => None,
    FCMPL = 149 => None,
    FCMPG = 150 => None,
    DCMPL = 151 => None,
    DCMPG = 152 => None,
    IFEQ = 153 => Jump,
    IFNE = 154 => Jump,
    IFLT = 155 => Jump,
    IFGE = 156 => Jump,
    IFGT = 157 => Jump,
    IFLE = 158 => Jump,
    IF_ICMPEQ = 159 => Jump,
    IF_ICMPNE = 160 => Jump,
    IF_ICMPLT = 161 => Jump,
    IF_ICMPGE = 162 => Jump,
    IF_ICMPGT = 163 => Jump,
    IF_ICMPLE = 164 => Jump,
    IF_ACMPEQ = 165 => Jump,
    IF_ACMPNE = 166 => Jump,
    GOTO = 167 => Jump,
    JSR = 168 => Jump,
    RET = 169 => Var,
    TABLESWITCH = 170 => TableSwitch,
    LOOKUPSWITCH = 171 => LookupSwitch,
    IRETURN = 172 => None,
    LRETURN = 173 => None,
    FRETURN = 174 => None,
    DRETURN = 175 => None,
    ARETURN = 176 => None,
    RETURN = 177 => None,
    GETSTATIC = 178 => Field,
    PUTSTATIC = 179 => Field,
    GETFIELD = 180 => Field,
    PUTFIELD = 181 => Field,
    INVOKEVIRTUAL = 182 => Method,
    INVOKESPECIAL = 183 => Method,
    INVOKESTATIC = 184 => Method,
    INVOKEINTERFACE = 185 => Method,
    INVOKEDYNAMIC = 186 => InvokeDynamic,
    NEW = 187 => Type,
    NEWARRAY = 188 => Int,
    ANEWARRAY = 189 => Type,
    ARRAYLENGTH = 190 => None,
    ATHROW = 191 => None,
    CHECKCAST = 192 => Type,
    INSTANCEOF = 193 => Type,
    MONITORENTER = 194 => None,
    MONITOREXIT = 195 => None,
    MULTIANEWARRAY = 197 => MultiANewArray,
    IFNULL = 198 => Jump,
    IFNONNULL = 199 => Jump,
}

impl Opcode {
    /// Looks an opcode up by its assembler mnemonic.
    ///
    /// # Examples
    /// ```rust,ignore
    /// assert_eq!(Opcode::from_mnemonic("ARETURN"), Some(Opcode::ARETURN));
    /// assert_eq!(Opcode::from_mnemonic("ILOAD_0"), None);
    /// ```
    pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.mnemonic() == mnemonic)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}
