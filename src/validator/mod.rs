//! Function-body type checking
//!
//! The validator is an abstract interpreter over a function body or init
//! expression: a value stack of type entries, a control stack of frames,
//! and Wasm's stack-polymorphic treatment of code after `unreachable`,
//! `br`, `br_table`, and `return`. It reads instructions (immediates
//! included) straight from a cursor and checks every index against a
//! frozen [`ModuleContext`].

use crate::error::{ParseError, Result, ValidationError};
use crate::parser::cursor::Cursor;
use crate::parser::module::ModuleContext;
use crate::parser::opcode::Opcode;
use crate::parser::types::{BlockType, BrTable as BrTableImmediate, FunctionType, MemArg, ValueType};
use std::sync::atomic::{AtomicBool, Ordering};

/// One entry on the value stack. `Unknown` stands for any type made
/// polymorphic by a preceding stack-polymorphic instruction; it satisfies
/// every constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackEntry {
    Known(ValueType),
    Unknown,
}

impl StackEntry {
    pub fn is_numeric(self) -> bool {
        match self {
            StackEntry::Known(ty) => ty.is_numeric(),
            StackEntry::Unknown => true,
        }
    }

    pub fn is_reference(self) -> bool {
        match self {
            StackEntry::Known(ty) => ty.is_reference(),
            StackEntry::Unknown => true,
        }
    }

    pub fn is_vector(self) -> bool {
        match self {
            StackEntry::Known(ty) => ty == ValueType::V128,
            StackEntry::Unknown => true,
        }
    }
}

/// Kind of a control frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Block,
    Loop,
    If,
    Else,
    Function,
}

/// A control frame: the block signature, the value-stack floor at entry,
/// and whether the rest of the frame is unreachable
#[derive(Debug, Clone)]
struct Frame {
    ty: FunctionType,
    kind: FrameKind,
    init_height: usize,
    unreachable: bool,
}

impl Frame {
    /// Types a branch to this frame must provide: a branch into a loop
    /// re-enters it with its parameters, a branch to anything else leaves
    /// with its results
    fn label_types(&self) -> &[ValueType] {
        if self.kind == FrameKind::Loop {
            &self.ty.params
        } else {
            &self.ty.results
        }
    }
}

/// Locals stored as (cumulative end index, type) runs, so a group count
/// near u32::MAX never materializes
#[derive(Debug, Default)]
struct Locals {
    runs: Vec<(u32, ValueType)>,
    count: u32,
}

impl Locals {
    fn declare(&mut self, count: u32, ty: ValueType) -> Result<()> {
        let end = self
            .count
            .checked_add(count)
            .ok_or(ValidationError::TooManyLocals)?;
        if count > 0 {
            self.runs.push((end, ty));
            self.count = end;
        }
        Ok(())
    }

    fn get(&self, index: u32) -> Option<ValueType> {
        if index >= self.count {
            return None;
        }
        let run = self.runs.partition_point(|&(end, _)| end <= index);
        Some(self.runs[run].1)
    }
}

/// Stateful validator for one function body or init expression
pub struct CodeValidator<'a> {
    ctx: &'a ModuleContext,
    locals: Locals,
    stack: Vec<StackEntry>,
    frames: Vec<Frame>,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> CodeValidator<'a> {
    pub fn new(ctx: &'a ModuleContext) -> Self {
        CodeValidator {
            ctx,
            locals: Locals::default(),
            stack: Vec::new(),
            frames: Vec::new(),
            cancel: None,
        }
    }

    /// Validator that aborts between instructions once `cancel` is set
    pub fn with_cancel(ctx: &'a ModuleContext, cancel: &'a AtomicBool) -> Self {
        CodeValidator {
            cancel: Some(cancel),
            ..Self::new(ctx)
        }
    }

    /// Type check a complete function body against its declared type
    pub fn validate_function(
        mut self,
        ty: &FunctionType,
        locals: &[(u32, ValueType)],
        body: Vec<u8>,
    ) -> Result<()> {
        for &param in &ty.params {
            self.locals.declare(1, param)?;
        }
        for &(count, local_ty) in locals {
            self.locals.declare(count, local_ty)?;
        }
        self.push_frame(FrameKind::Function, ty.clone());

        let mut cursor = Cursor::with_bytes(body);
        while !self.frames.is_empty() {
            self.step(&mut cursor, false)?;
        }
        if !cursor.is_at_eof() {
            return Err(ParseError::SectionSizeMismatch { id: 10 }.into());
        }
        Ok(())
    }

    /// Validate a constant expression producing `expected`, reading from the
    /// caller's cursor. The caller measures the bytes consumed through the
    /// cursor position.
    pub fn validate_init_expr(mut self, expected: ValueType, cursor: &mut Cursor) -> Result<()> {
        self.push_frame(
            FrameKind::Function,
            FunctionType {
                params: Vec::new(),
                results: vec![expected],
            },
        );
        while !self.frames.is_empty() {
            self.step(cursor, true)?;
        }
        Ok(())
    }

    /// Validate and apply a single instruction
    fn step(&mut self, cursor: &mut Cursor, const_only: bool) -> Result<()> {
        if let Some(cancel) = self.cancel {
            if cancel.load(Ordering::Relaxed) {
                return Err(ValidationError::Cancelled.into());
            }
        }
        let ctx = self.ctx;
        let op = Opcode::read(cursor)?;
        if const_only && op != Opcode::End && !op.is_constant() {
            return Err(ValidationError::InvalidInitExprInstruction(op).into());
        }

        use Opcode::*;
        use ValueType::{FuncRef, F32, F64, I32, I64};
        match op {
            Unreachable => self.mark_unreachable()?,
            Nop => {}

            Block | Loop | If => {
                let ty = self.resolve_block_type(BlockType::read(cursor)?)?;
                let kind = match op {
                    Block => FrameKind::Block,
                    Loop => FrameKind::Loop,
                    _ => FrameKind::If,
                };
                if kind == FrameKind::If {
                    self.pop_expect(I32)?;
                }
                for &param in ty.params.iter().rev() {
                    self.pop_expect(param)?;
                }
                self.push_frame(kind, ty);
            }
            Else => {
                let frame = self.pop_frame()?;
                if frame.kind != FrameKind::If {
                    return Err(ValidationError::HangingElse.into());
                }
                self.push_frame(FrameKind::Else, frame.ty);
            }
            End => {
                let frame = self.pop_frame()?;
                if frame.kind != FrameKind::Function {
                    for &result in &frame.ty.results {
                        self.push_known(result);
                    }
                }
            }

            Br => {
                let label = cursor.read_u32_leb128()?;
                let types = self.label(label)?.label_types().to_vec();
                for &ty in types.iter().rev() {
                    self.pop_expect(ty)?;
                }
                self.mark_unreachable()?;
            }
            BrIf => {
                let label = cursor.read_u32_leb128()?;
                let types = self.label(label)?.label_types().to_vec();
                self.pop_expect(I32)?;
                let mut popped = Vec::with_capacity(types.len());
                for &ty in types.iter().rev() {
                    popped.push(self.pop_expect(ty)?);
                }
                for entry in popped.into_iter().rev() {
                    self.push(entry);
                }
            }
            Opcode::BrTable => {
                let table = BrTableImmediate::read(cursor)?;
                self.pop_expect(I32)?;
                let default_types = self.label(table.default)?.label_types().to_vec();
                for &label in &table.labels {
                    let types = self.label(label)?.label_types().to_vec();
                    if types.len() != default_types.len() {
                        return Err(ValidationError::BrTableArityMismatch {
                            label,
                            expected: default_types.len(),
                            got: types.len(),
                        }
                        .into());
                    }
                    let mut popped = Vec::with_capacity(types.len());
                    for &ty in types.iter().rev() {
                        popped.push(self.pop_expect(ty)?);
                    }
                    for entry in popped.into_iter().rev() {
                        self.push(entry);
                    }
                }
                for &ty in default_types.iter().rev() {
                    self.pop_expect(ty)?;
                }
                self.mark_unreachable()?;
            }
            Return => {
                let types = self
                    .frames
                    .first()
                    .ok_or(ValidationError::NoFramesLeft)?
                    .ty
                    .results
                    .clone();
                for &ty in types.iter().rev() {
                    self.pop_expect(ty)?;
                }
                self.mark_unreachable()?;
            }
            Call => {
                let index = cursor.read_u32_leb128()?;
                let ty = ctx.function_type(index)?;
                for &param in ty.params.iter().rev() {
                    self.pop_expect(param)?;
                }
                for &result in &ty.results {
                    self.push_known(result);
                }
            }
            CallIndirect => {
                let type_index = cursor.read_u32_leb128()?;
                let table_index = cursor.read_u32_leb128()?;
                let table = ctx.table(table_index)?;
                if table.element_type != FuncRef {
                    return Err(ValidationError::CanOnlyCallFuncref.into());
                }
                let ty = ctx.type_at(type_index)?;
                self.pop_expect(I32)?;
                for &param in ty.params.iter().rev() {
                    self.pop_expect(param)?;
                }
                for &result in &ty.results {
                    self.push_known(result);
                }
            }

            Drop => {
                self.pop()?;
            }
            Select => {
                self.pop_expect(I32)?;
                let first = self.pop()?;
                let second = self.pop()?;
                for entry in [first, second] {
                    // Unknown satisfies is_reference too, but only a known
                    // reference is a violation here
                    if entry.is_reference() {
                        if let StackEntry::Known(ty) = entry {
                            return Err(ValidationError::ExpectedNonReference { got: ty }.into());
                        }
                    }
                }
                let merged = match (first, second) {
                    (StackEntry::Unknown, other) => other,
                    (known, StackEntry::Unknown) => known,
                    (StackEntry::Known(a), StackEntry::Known(b)) => {
                        if a != b {
                            return Err(ValidationError::unexpected_type(b, a).into());
                        }
                        StackEntry::Known(a)
                    }
                };
                self.push(merged);
            }
            SelectT => {
                let count = cursor.read_u32_leb128()?;
                if count != 1 {
                    return Err(ValidationError::InvalidSelectType.into());
                }
                let ty = ValueType::read(cursor)?;
                self.pop_expect(I32)?;
                self.pop_expect(ty)?;
                self.pop_expect(ty)?;
                self.push_known(ty);
            }

            LocalGet => {
                let ty = self.local(cursor.read_u32_leb128()?)?;
                self.push_known(ty);
            }
            LocalSet => {
                let ty = self.local(cursor.read_u32_leb128()?)?;
                self.pop_expect(ty)?;
            }
            LocalTee => {
                let ty = self.local(cursor.read_u32_leb128()?)?;
                self.pop_expect(ty)?;
                self.push_known(ty);
            }
            GlobalGet => {
                let global = ctx.global(cursor.read_u32_leb128()?)?;
                self.push_known(global.value_type);
            }
            GlobalSet => {
                let index = cursor.read_u32_leb128()?;
                let global = ctx.global(index)?;
                if !global.mutable {
                    return Err(ValidationError::InvalidGlobalSet { index }.into());
                }
                self.pop_expect(global.value_type)?;
            }

            TableGet => {
                let table = ctx.table(cursor.read_u32_leb128()?)?;
                self.pop_expect(I32)?;
                self.push_known(table.element_type);
            }
            TableSet => {
                let table = ctx.table(cursor.read_u32_leb128()?)?;
                self.pop_expect(table.element_type)?;
                self.pop_expect(I32)?;
            }
            TableSize => {
                ctx.table(cursor.read_u32_leb128()?)?;
                self.push_known(I32);
            }
            TableGrow => {
                let table = ctx.table(cursor.read_u32_leb128()?)?;
                self.pop_expect(I32)?;
                self.pop_expect(table.element_type)?;
                self.push_known(I32);
            }
            TableFill => {
                let table = ctx.table(cursor.read_u32_leb128()?)?;
                self.pop_expect(I32)?;
                self.pop_expect(table.element_type)?;
                self.pop_expect(I32)?;
            }
            TableCopy => {
                let dst = *ctx.table(cursor.read_u32_leb128()?)?;
                let src = *ctx.table(cursor.read_u32_leb128()?)?;
                if dst.element_type != src.element_type {
                    return Err(ValidationError::TableValueTypeMismatch {
                        expected: dst.element_type,
                        got: src.element_type,
                    }
                    .into());
                }
                self.pop_expect(I32)?;
                self.pop_expect(I32)?;
                self.pop_expect(I32)?;
            }
            TableInit => {
                let element_type = ctx.element_type(cursor.read_u32_leb128()?)?;
                let table = ctx.table(cursor.read_u32_leb128()?)?;
                if element_type != table.element_type {
                    return Err(ValidationError::TableValueTypeMismatch {
                        expected: table.element_type,
                        got: element_type,
                    }
                    .into());
                }
                self.pop_expect(I32)?;
                self.pop_expect(I32)?;
                self.pop_expect(I32)?;
            }
            ElemDrop => {
                ctx.element_type(cursor.read_u32_leb128()?)?;
            }

            I32Load => self.load(cursor, I32, 32)?,
            I64Load => self.load(cursor, I64, 64)?,
            F32Load => self.load(cursor, F32, 32)?,
            F64Load => self.load(cursor, F64, 64)?,
            I32Load8S | I32Load8U => self.load(cursor, I32, 8)?,
            I32Load16S | I32Load16U => self.load(cursor, I32, 16)?,
            I64Load8S | I64Load8U => self.load(cursor, I64, 8)?,
            I64Load16S | I64Load16U => self.load(cursor, I64, 16)?,
            I64Load32S | I64Load32U => self.load(cursor, I64, 32)?,
            I32Store => self.store(cursor, I32, 32)?,
            I64Store => self.store(cursor, I64, 64)?,
            F32Store => self.store(cursor, F32, 32)?,
            F64Store => self.store(cursor, F64, 64)?,
            I32Store8 => self.store(cursor, I32, 8)?,
            I32Store16 => self.store(cursor, I32, 16)?,
            I64Store8 => self.store(cursor, I64, 8)?,
            I64Store16 => self.store(cursor, I64, 16)?,
            I64Store32 => self.store(cursor, I64, 32)?,
            MemorySize => {
                ctx.check_memory(cursor.read_u32_leb128()?)?;
                self.push_known(I32);
            }
            MemoryGrow => {
                ctx.check_memory(cursor.read_u32_leb128()?)?;
                self.pop_expect(I32)?;
                self.push_known(I32);
            }
            MemoryFill => {
                ctx.check_memory(cursor.read_u32_leb128()?)?;
                self.pop_expect(I32)?;
                self.pop_expect(I32)?;
                self.pop_expect(I32)?;
            }
            MemoryCopy => {
                ctx.check_memory(cursor.read_u32_leb128()?)?;
                ctx.check_memory(cursor.read_u32_leb128()?)?;
                self.pop_expect(I32)?;
                self.pop_expect(I32)?;
                self.pop_expect(I32)?;
            }
            MemoryInit => {
                ctx.check_data(cursor.read_u32_leb128()?)?;
                ctx.check_memory(cursor.read_u32_leb128()?)?;
                self.pop_expect(I32)?;
                self.pop_expect(I32)?;
                self.pop_expect(I32)?;
            }
            DataDrop => {
                ctx.check_data(cursor.read_u32_leb128()?)?;
            }

            I32Const => {
                cursor.read_i32_leb128()?;
                self.push_known(I32);
            }
            I64Const => {
                cursor.read_i64_leb128()?;
                self.push_known(I64);
            }
            F32Const => {
                cursor.read_exact(4)?;
                self.push_known(F32);
            }
            F64Const => {
                cursor.read_exact(8)?;
                self.push_known(F64);
            }

            RefNull => {
                let ty = ValueType::read_reference(cursor)?;
                self.push_known(ty);
            }
            RefIsNull => {
                let entry = self.pop()?;
                if let StackEntry::Known(ty) = entry {
                    if !ty.is_reference() {
                        return Err(ValidationError::ExpectedReference { got: ty }.into());
                    }
                }
                self.push_known(I32);
            }
            RefFunc => {
                ctx.check_function(cursor.read_u32_leb128()?)?;
                self.push_known(FuncRef);
            }

            I32Eqz => self.testop(I32)?,
            I64Eqz => self.testop(I64)?,
            I32Eq | I32Ne | I32LtS | I32LtU | I32GtS | I32GtU | I32LeS | I32LeU | I32GeS
            | I32GeU => self.relop(I32)?,
            I64Eq | I64Ne | I64LtS | I64LtU | I64GtS | I64GtU | I64LeS | I64LeU | I64GeS
            | I64GeU => self.relop(I64)?,
            F32Eq | F32Ne | F32Lt | F32Gt | F32Le | F32Ge => self.relop(F32)?,
            F64Eq | F64Ne | F64Lt | F64Gt | F64Le | F64Ge => self.relop(F64)?,

            I32Clz | I32Ctz | I32Popcnt | I32Extend8S | I32Extend16S => self.unop(I32)?,
            I64Clz | I64Ctz | I64Popcnt | I64Extend8S | I64Extend16S | I64Extend32S => {
                self.unop(I64)?
            }
            I32Add | I32Sub | I32Mul | I32DivS | I32DivU | I32RemS | I32RemU | I32And | I32Or
            | I32Xor | I32Shl | I32ShrS | I32ShrU | I32Rotl | I32Rotr => self.binop(I32)?,
            I64Add | I64Sub | I64Mul | I64DivS | I64DivU | I64RemS | I64RemU | I64And | I64Or
            | I64Xor | I64Shl | I64ShrS | I64ShrU | I64Rotl | I64Rotr => self.binop(I64)?,
            F32Abs | F32Neg | F32Ceil | F32Floor | F32Trunc | F32Nearest | F32Sqrt => {
                self.unop(F32)?
            }
            F64Abs | F64Neg | F64Ceil | F64Floor | F64Trunc | F64Nearest | F64Sqrt => {
                self.unop(F64)?
            }
            F32Add | F32Sub | F32Mul | F32Div | F32Min | F32Max | F32Copysign => {
                self.binop(F32)?
            }
            F64Add | F64Sub | F64Mul | F64Div | F64Min | F64Max | F64Copysign => {
                self.binop(F64)?
            }

            I32WrapI64 => self.cvtop(I64, I32)?,
            I32TruncF32S | I32TruncF32U | I32TruncSatF32S | I32TruncSatF32U
            | I32ReinterpretF32 => self.cvtop(F32, I32)?,
            I32TruncF64S | I32TruncF64U | I32TruncSatF64S | I32TruncSatF64U => {
                self.cvtop(F64, I32)?
            }
            I64ExtendI32S | I64ExtendI32U => self.cvtop(I32, I64)?,
            I64TruncF32S | I64TruncF32U | I64TruncSatF32S | I64TruncSatF32U => {
                self.cvtop(F32, I64)?
            }
            I64TruncF64S | I64TruncF64U | I64TruncSatF64S | I64TruncSatF64U
            | I64ReinterpretF64 => self.cvtop(F64, I64)?,
            F32ConvertI32S | F32ConvertI32U | F32ReinterpretI32 => self.cvtop(I32, F32)?,
            F32ConvertI64S | F32ConvertI64U => self.cvtop(I64, F32)?,
            F32DemoteF64 => self.cvtop(F64, F32)?,
            F64ConvertI32S | F64ConvertI32U => self.cvtop(I32, F64)?,
            F64ConvertI64S | F64ConvertI64U | F64ReinterpretI64 => self.cvtop(I64, F64)?,
            F64PromoteF32 => self.cvtop(F32, F64)?,
        }
        Ok(())
    }

    fn push(&mut self, entry: StackEntry) {
        self.stack.push(entry);
    }

    fn push_known(&mut self, ty: ValueType) {
        self.stack.push(StackEntry::Known(ty));
    }

    /// Pop one entry, honoring the current frame's floor and its
    /// unreachable bit
    fn pop(&mut self) -> Result<StackEntry> {
        let frame = self.frames.last().ok_or(ValidationError::NoFramesLeft)?;
        if self.stack.len() == frame.init_height {
            if frame.unreachable {
                return Ok(StackEntry::Unknown);
            }
            return Err(ValidationError::StackEmpty.into());
        }
        self.stack
            .pop()
            .ok_or_else(|| ValidationError::StackEmpty.into())
    }

    /// Pop one entry and require it to match `expected`; `Unknown` always
    /// matches. Returns the actual entry popped.
    fn pop_expect(&mut self, expected: ValueType) -> Result<StackEntry> {
        let entry = self.pop()?;
        if let StackEntry::Known(got) = entry {
            if got != expected {
                return Err(ValidationError::unexpected_type(expected, got).into());
            }
        }
        Ok(entry)
    }

    /// Enter a control frame; parameters become visible inside every kind
    /// but the function frame, whose parameters live in the locals
    fn push_frame(&mut self, kind: FrameKind, ty: FunctionType) {
        let init_height = self.stack.len();
        if kind != FrameKind::Function {
            for &param in &ty.params {
                self.push_known(param);
            }
        }
        self.frames.push(Frame {
            ty,
            kind,
            init_height,
            unreachable: false,
        });
    }

    /// Exit the current frame: pop its results and require the stack to be
    /// back at the frame's floor
    fn pop_frame(&mut self) -> Result<Frame> {
        let results = self
            .frames
            .last()
            .ok_or(ValidationError::NoFramesLeft)?
            .ty
            .results
            .clone();
        for &result in results.iter().rev() {
            self.pop_expect(result)?;
        }
        let frame = self.frames.pop().ok_or(ValidationError::NoFramesLeft)?;
        if self.stack.len() != frame.init_height {
            return Err(ValidationError::stack_height_mismatch(
                frame.init_height,
                self.stack.len(),
            )
            .into());
        }
        Ok(frame)
    }

    /// The rest of the current frame cannot be reached: drop its operands
    /// and let subsequent pops produce `Unknown`
    fn mark_unreachable(&mut self) -> Result<()> {
        let frame = self
            .frames
            .last_mut()
            .ok_or(ValidationError::NoFramesLeft)?;
        self.stack.truncate(frame.init_height);
        frame.unreachable = true;
        Ok(())
    }

    fn label(&self, label: u32) -> Result<&Frame> {
        let depth = label as usize;
        if depth >= self.frames.len() {
            return Err(ValidationError::InvalidLabelIndex { label }.into());
        }
        Ok(&self.frames[self.frames.len() - 1 - depth])
    }

    fn local(&self, index: u32) -> Result<ValueType> {
        self.locals
            .get(index)
            .ok_or_else(|| ValidationError::InvalidLocalIndex { index }.into())
    }

    fn resolve_block_type(&self, block_type: BlockType) -> Result<FunctionType> {
        match block_type {
            BlockType::Empty => Ok(FunctionType::default()),
            BlockType::Single(ty) => Ok(FunctionType {
                params: Vec::new(),
                results: vec![ty],
            }),
            BlockType::TypeIndex(index) => Ok(self.ctx.type_at(index)?.clone()),
        }
    }

    fn load(&mut self, cursor: &mut Cursor, ty: ValueType, width_bits: u32) -> Result<()> {
        let arg = MemArg::read(cursor)?;
        self.ctx.check_memory(arg.memory_index)?;
        check_alignment(arg.align, width_bits)?;
        self.pop_expect(ValueType::I32)?;
        self.push_known(ty);
        Ok(())
    }

    fn store(&mut self, cursor: &mut Cursor, ty: ValueType, width_bits: u32) -> Result<()> {
        let arg = MemArg::read(cursor)?;
        self.ctx.check_memory(arg.memory_index)?;
        check_alignment(arg.align, width_bits)?;
        self.pop_expect(ty)?;
        self.pop_expect(ValueType::I32)?;
        Ok(())
    }

    fn testop(&mut self, ty: ValueType) -> Result<()> {
        self.pop_expect(ty)?;
        self.push_known(ValueType::I32);
        Ok(())
    }

    fn relop(&mut self, ty: ValueType) -> Result<()> {
        self.pop_expect(ty)?;
        self.pop_expect(ty)?;
        self.push_known(ValueType::I32);
        Ok(())
    }

    fn unop(&mut self, ty: ValueType) -> Result<()> {
        self.pop_expect(ty)?;
        self.push_known(ty);
        Ok(())
    }

    fn binop(&mut self, ty: ValueType) -> Result<()> {
        self.pop_expect(ty)?;
        self.pop_expect(ty)?;
        self.push_known(ty);
        Ok(())
    }

    fn cvtop(&mut self, from: ValueType, to: ValueType) -> Result<()> {
        self.pop_expect(from)?;
        self.push_known(to);
        Ok(())
    }
}

/// The alignment exponent must not exceed the instruction's natural
/// alignment: `1 << align <= width / 8`
fn check_alignment(align: u32, width_bits: u32) -> Result<()> {
    let natural = width_bits / 8;
    if align >= 32 || (1u64 << align) > natural as u64 {
        return Err(ValidationError::InvalidAlignment { align, natural }.into());
    }
    Ok(())
}
