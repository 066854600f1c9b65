//! Fluent construction of instruction streams.
//!
//! [`InstructionAssembler`] lays out instructions at their encoded offsets and
//! resolves symbolic labels to absolute branch targets when the stream is
//! finished. It is what tests, benchmarks and tools use in place of a binary
//! reader.
//!
//! # Examples
//!
//! ```rust
//! use cilflow::assembly::InstructionAssembler;
//!
//! // if (a0) x = 1 else x = 2; return x
//! let code = InstructionAssembler::new()
//!     .ldarg(0)
//!     .brfalse("else")
//!     .ldc_i4(1)
//!     .br("join")
//!     .label("else")
//!     .ldc_i4(2)
//!     .label("join")
//!     .ret_value()
//!     .finish()?;
//!
//! assert_eq!(code.len(), 6);
//! assert_eq!(code[1].branch_targets, vec![code[4].offset]);
//! # Ok::<(), cilflow::Error>(())
//! ```

use std::collections::HashMap;

use crate::{
    assembly::{
        instruction::{FlowControl, Immediate, Instruction, Operand, ResultType, StackBehavior},
        opcodes,
    },
    ir::IrType,
    metadata::token::Token,
    Error, Result,
};

/// Branch operand awaiting label resolution.
#[derive(Debug)]
struct Fixup {
    /// Index of the branching instruction
    instruction: usize,
    /// Label names, one per target
    labels: Vec<String>,
}

/// Fluent builder for a method's instruction stream.
#[derive(Debug, Default)]
pub struct InstructionAssembler {
    instructions: Vec<Instruction>,
    labels: HashMap<String, u64>,
    fixups: Vec<Fixup>,
    offset: u64,
    error: Option<Error>,
}

impl InstructionAssembler {
    /// Creates an empty assembler positioned at offset 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current offset, i.e. where the next instruction will be placed.
    #[must_use]
    pub fn current_offset(&self) -> u64 {
        self.offset
    }

    /// Defines `name` at the current offset.
    ///
    /// Redefining a label is reported by [`finish`](Self::finish).
    #[must_use]
    pub fn label(mut self, name: &str) -> Self {
        if self.labels.insert(name.to_string(), self.offset).is_some() && self.error.is_none() {
            self.error = Some(malformed_error!("Label '{}' defined twice", name));
        }
        self
    }

    /// Appends an arbitrary instruction at the current offset.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn raw(
        mut self,
        opcode: u8,
        size: u64,
        mnemonic: &'static str,
        flow: FlowControl,
        operand: Operand,
        stack: StackBehavior,
    ) -> Self {
        self.instructions.push(Instruction::new(
            self.offset,
            size,
            opcode,
            mnemonic,
            flow,
            operand,
            stack,
        ));
        self.offset += size;
        self
    }

    fn emit_prefixed(
        mut self,
        opcode: u8,
        size: u64,
        mnemonic: &'static str,
        operand: Operand,
        stack: StackBehavior,
    ) -> Self {
        self.instructions.push(
            Instruction::new(
                self.offset,
                size,
                opcode,
                mnemonic,
                FlowControl::Next,
                operand,
                stack,
            )
            .with_prefix(),
        );
        self.offset += size;
        self
    }

    fn simple(self, opcode: u8, mnemonic: &'static str, pops: u8, pushes: u8) -> Self {
        self.raw(
            opcode,
            1,
            mnemonic,
            FlowControl::Next,
            Operand::None,
            StackBehavior::new(pops, pushes),
        )
    }

    fn typed(mut self, result: ResultType) -> Self {
        if let Some(last) = self.instructions.last_mut() {
            last.result = result;
        }
        self
    }

    /// Types the values pushed by the previous instruction, e.g. a call's
    /// return value.
    #[must_use]
    pub fn with_result(self, ty: IrType) -> Self {
        self.typed(ResultType::Fixed(ty))
    }

    fn branch(self, opcode: u8, mnemonic: &'static str, flow: FlowControl, pops: u8, label: &str) -> Self {
        let mut this = self.raw(
            opcode,
            5,
            mnemonic,
            flow,
            Operand::Target(0),
            StackBehavior::new(pops, 0),
        );
        this.fixups.push(Fixup {
            instruction: this.instructions.len() - 1,
            labels: vec![label.to_string()],
        });
        this
    }

    /// `nop`
    #[must_use]
    pub fn nop(self) -> Self {
        self.simple(opcodes::NOP, "nop", 0, 0)
    }

    /// `break`
    #[must_use]
    pub fn break_(self) -> Self {
        self.raw(
            opcodes::BREAK,
            1,
            "break",
            FlowControl::Break,
            Operand::None,
            StackBehavior::new(0, 0),
        )
    }

    /// `ldarg` in its shortest encoding.
    #[must_use]
    pub fn ldarg(self, index: u16) -> Self {
        let operand = Operand::Argument(index);
        let stack = StackBehavior::new(0, 1);
        match index {
            0..=3 => self.raw(
                opcodes::LDARG_0 + index as u8,
                1,
                ["ldarg.0", "ldarg.1", "ldarg.2", "ldarg.3"][usize::from(index)],
                FlowControl::Next,
                operand,
                stack,
            ),
            4..=255 => self.raw(opcodes::LDARG_S, 2, "ldarg.s", FlowControl::Next, operand, stack),
            _ => self.emit_prefixed(opcodes::FE_LDARG, 4, "ldarg", operand, stack),
        }
    }

    /// `starg` in its shortest encoding.
    #[must_use]
    pub fn starg(self, index: u16) -> Self {
        let operand = Operand::Argument(index);
        let stack = StackBehavior::new(1, 0);
        if index <= 255 {
            self.raw(opcodes::STARG_S, 2, "starg.s", FlowControl::Next, operand, stack)
        } else {
            self.emit_prefixed(opcodes::FE_STARG, 4, "starg", operand, stack)
        }
    }

    /// `ldloc` in its shortest encoding.
    #[must_use]
    pub fn ldloc(self, index: u16) -> Self {
        let operand = Operand::Local(index);
        let stack = StackBehavior::new(0, 1);
        match index {
            0..=3 => self.raw(
                opcodes::LDLOC_0 + index as u8,
                1,
                ["ldloc.0", "ldloc.1", "ldloc.2", "ldloc.3"][usize::from(index)],
                FlowControl::Next,
                operand,
                stack,
            ),
            4..=255 => self.raw(opcodes::LDLOC_S, 2, "ldloc.s", FlowControl::Next, operand, stack),
            _ => self.emit_prefixed(opcodes::FE_LDLOC, 4, "ldloc", operand, stack),
        }
    }

    /// `stloc` in its shortest encoding.
    #[must_use]
    pub fn stloc(self, index: u16) -> Self {
        let operand = Operand::Local(index);
        let stack = StackBehavior::new(1, 0);
        match index {
            0..=3 => self.raw(
                opcodes::STLOC_0 + index as u8,
                1,
                ["stloc.0", "stloc.1", "stloc.2", "stloc.3"][usize::from(index)],
                FlowControl::Next,
                operand,
                stack,
            ),
            4..=255 => self.raw(opcodes::STLOC_S, 2, "stloc.s", FlowControl::Next, operand, stack),
            _ => self.emit_prefixed(opcodes::FE_STLOC, 4, "stloc", operand, stack),
        }
    }

    /// `ldc.i4` in its shortest encoding.
    #[must_use]
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    pub fn ldc_i4(self, value: i32) -> Self {
        const SHORT: [&str; 10] = [
            "ldc.i4.m1", "ldc.i4.0", "ldc.i4.1", "ldc.i4.2", "ldc.i4.3", "ldc.i4.4", "ldc.i4.5",
            "ldc.i4.6", "ldc.i4.7", "ldc.i4.8",
        ];
        let operand = Operand::Immediate(Immediate::Int32(value));
        let stack = StackBehavior::new(0, 1);
        match value {
            -1..=8 => {
                let slot = (value + 1) as usize;
                self.raw(
                    opcodes::LDC_I4_M1 + slot as u8,
                    1,
                    SHORT[slot],
                    FlowControl::Next,
                    operand,
                    stack,
                )
            }
            -128..=127 => self.raw(opcodes::LDC_I4_S, 2, "ldc.i4.s", FlowControl::Next, operand, stack),
            _ => self.raw(opcodes::LDC_I4, 5, "ldc.i4", FlowControl::Next, operand, stack),
        }
    }

    /// `ldc.i8`
    #[must_use]
    pub fn ldc_i8(self, value: i64) -> Self {
        self.raw(
            opcodes::LDC_I8,
            9,
            "ldc.i8",
            FlowControl::Next,
            Operand::Immediate(Immediate::Int64(value)),
            StackBehavior::new(0, 1),
        )
    }

    /// `ldc.r8`
    #[must_use]
    pub fn ldc_r8(self, value: f64) -> Self {
        self.raw(
            opcodes::LDC_R8,
            9,
            "ldc.r8",
            FlowControl::Next,
            Operand::Immediate(Immediate::Float64(value)),
            StackBehavior::new(0, 1),
        )
    }

    /// `ldnull`
    #[must_use]
    pub fn ldnull(self) -> Self {
        self.simple(opcodes::LDNULL, "ldnull", 0, 1)
            .typed(ResultType::Fixed(IrType::Pointer))
    }

    /// `dup`
    #[must_use]
    pub fn dup(self) -> Self {
        self.simple(opcodes::DUP, "dup", 1, 2)
    }

    /// `pop`
    #[must_use]
    pub fn pop(self) -> Self {
        self.simple(opcodes::POP, "pop", 1, 0)
    }

    /// `add`
    #[must_use]
    pub fn add(self) -> Self {
        self.simple(opcodes::ADD, "add", 2, 1)
            .typed(ResultType::FromOperand)
    }

    /// `sub`
    #[must_use]
    pub fn sub(self) -> Self {
        self.simple(opcodes::SUB, "sub", 2, 1)
            .typed(ResultType::FromOperand)
    }

    /// `mul`
    #[must_use]
    pub fn mul(self) -> Self {
        self.simple(opcodes::MUL, "mul", 2, 1)
            .typed(ResultType::FromOperand)
    }

    /// `conv.i4`
    #[must_use]
    pub fn conv_i4(self) -> Self {
        self.simple(opcodes::CONV_I4, "conv.i4", 1, 1)
            .typed(ResultType::Fixed(IrType::I32))
    }

    /// `conv.i8`
    #[must_use]
    pub fn conv_i8(self) -> Self {
        self.simple(opcodes::CONV_I8, "conv.i8", 1, 1)
            .typed(ResultType::Fixed(IrType::Int(64)))
    }

    /// `conv.r8`
    #[must_use]
    pub fn conv_r8(self) -> Self {
        self.simple(opcodes::CONV_R8, "conv.r8", 1, 1)
            .typed(ResultType::Fixed(IrType::F64))
    }

    /// `ldfld field`, loading a field of type `ty` from the object on the stack.
    #[must_use]
    pub fn ldfld(self, field: Token, ty: IrType) -> Self {
        self.raw(
            opcodes::LDFLD,
            5,
            "ldfld",
            FlowControl::Next,
            Operand::Token(field),
            StackBehavior::new(1, 1),
        )
        .typed(ResultType::Fixed(ty))
    }

    /// `ceq`
    #[must_use]
    pub fn ceq(self) -> Self {
        self.emit_prefixed(opcodes::FE_CEQ, 2, "ceq", Operand::None, StackBehavior::new(2, 1))
    }

    /// `clt`
    #[must_use]
    pub fn clt(self) -> Self {
        self.emit_prefixed(opcodes::FE_CLT, 2, "clt", Operand::None, StackBehavior::new(2, 1))
    }

    /// `br label`
    #[must_use]
    pub fn br(self, label: &str) -> Self {
        self.branch(opcodes::BR, "br", FlowControl::Branch, 0, label)
    }

    /// `brtrue label`
    #[must_use]
    pub fn brtrue(self, label: &str) -> Self {
        self.branch(opcodes::BRTRUE, "brtrue", FlowControl::CondBranch, 1, label)
    }

    /// `brfalse label`
    #[must_use]
    pub fn brfalse(self, label: &str) -> Self {
        self.branch(opcodes::BRFALSE, "brfalse", FlowControl::CondBranch, 1, label)
    }

    /// `beq label`
    #[must_use]
    pub fn beq(self, label: &str) -> Self {
        self.branch(opcodes::BEQ, "beq", FlowControl::CondBranch, 2, label)
    }

    /// `blt label`
    #[must_use]
    pub fn blt(self, label: &str) -> Self {
        self.branch(opcodes::BLT, "blt", FlowControl::CondBranch, 2, label)
    }

    /// `switch (labels...)`
    #[must_use]
    pub fn switch(self, labels: &[&str]) -> Self {
        let size = 5 + 4 * labels.len() as u64;
        let mut this = self.raw(
            opcodes::SWITCH,
            size,
            "switch",
            FlowControl::CondBranch,
            Operand::Switch(vec![0; labels.len()]),
            StackBehavior::new(1, 0),
        );
        if labels.is_empty() && this.error.is_none() {
            this.error = Some(malformed_error!("switch must have at least one target"));
        }
        this.fixups.push(Fixup {
            instruction: this.instructions.len() - 1,
            labels: labels.iter().map(|l| (*l).to_string()).collect(),
        });
        this
    }

    /// `call method`, popping `args` values and pushing `returns` values.
    #[must_use]
    pub fn call(self, method: Token, args: u8, returns: u8) -> Self {
        self.raw(
            opcodes::CALL,
            5,
            "call",
            FlowControl::Call,
            Operand::Token(method),
            StackBehavior::new(args, returns),
        )
    }

    /// `callvirt method`, where `args` includes the receiver.
    #[must_use]
    pub fn callvirt(self, method: Token, args: u8, returns: u8) -> Self {
        self.raw(
            opcodes::CALLVIRT,
            5,
            "callvirt",
            FlowControl::Call,
            Operand::Token(method),
            StackBehavior::new(args, returns),
        )
    }

    /// `newobj ctor`, popping the constructor arguments and pushing the object.
    #[must_use]
    pub fn newobj(self, ctor: Token, args: u8) -> Self {
        self.raw(
            opcodes::NEWOBJ,
            5,
            "newobj",
            FlowControl::Call,
            Operand::Token(ctor),
            StackBehavior::new(args, 1),
        )
        .typed(ResultType::Fixed(IrType::Pointer))
    }

    /// `newarr type`
    #[must_use]
    pub fn newarr(self, element: Token) -> Self {
        self.raw(
            opcodes::NEWARR,
            5,
            "newarr",
            FlowControl::Next,
            Operand::Token(element),
            StackBehavior::new(1, 1),
        )
        .typed(ResultType::Fixed(IrType::Pointer))
    }

    /// `tail.` prefix
    #[must_use]
    pub fn tail(self) -> Self {
        let mut this = self.emit_prefixed(
            opcodes::FE_TAIL,
            2,
            "tail.",
            Operand::None,
            StackBehavior::new(0, 0),
        );
        if let Some(last) = this.instructions.last_mut() {
            last.flow = FlowControl::Meta;
        }
        this
    }

    /// `ret` from a `void` method.
    #[must_use]
    pub fn ret(self) -> Self {
        self.raw(
            opcodes::RET,
            1,
            "ret",
            FlowControl::Return,
            Operand::None,
            StackBehavior::new(0, 0),
        )
    }

    /// `ret` returning the value on top of the stack.
    #[must_use]
    pub fn ret_value(self) -> Self {
        self.raw(
            opcodes::RET,
            1,
            "ret",
            FlowControl::Return,
            Operand::None,
            StackBehavior::new(1, 0),
        )
    }

    /// `throw`
    #[must_use]
    pub fn throw(self) -> Self {
        self.raw(
            opcodes::THROW,
            1,
            "throw",
            FlowControl::Throw,
            Operand::None,
            StackBehavior::new(1, 0),
        )
    }

    /// Resolves labels and returns the instruction stream.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] for undefined or duplicate labels and for an
    /// empty `switch`.
    pub fn finish(mut self) -> Result<Vec<Instruction>> {
        if let Some(error) = self.error.take() {
            return Err(error);
        }

        for fixup in &self.fixups {
            let targets = fixup
                .labels
                .iter()
                .map(|label| {
                    self.labels
                        .get(label)
                        .copied()
                        .ok_or_else(|| malformed_error!("Undefined label '{}'", label))
                })
                .collect::<Result<Vec<u64>>>()?;

            let instruction = &mut self.instructions[fixup.instruction];
            instruction.operand = match instruction.operand {
                Operand::Switch(_) => Operand::Switch(targets.clone()),
                _ => Operand::Target(targets[0]),
            };
            instruction.branch_targets = targets;
        }

        Ok(self.instructions)
    }
}
