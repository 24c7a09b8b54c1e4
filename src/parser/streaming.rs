//! Streaming module parser
//!
//! A state machine fed by `push` with arbitrary-sized chunks. Every state
//! transition is restartable: a transition that runs out of bytes fails
//! with `UnexpectedEof`, the cursor rewinds to the transition's start, and
//! the outer loop resumes on the next `push`. Function bodies are handed
//! to the validation pool as they are sliced; init expressions are
//! validated inline because only validated constant sequences may enter
//! the module.

use super::cursor::Cursor;
use super::module::{
    DataSegment, ElementItems, ElementMode, ElementSegment, FunctionBody, Global, Module,
    ModuleContext,
};
use super::pool::{CancelToken, ValidationJob, ValidationPool};
use super::types::{
    Export, ExportDesc, FunctionType, GlobalType, Import, ImportDesc, MemoryType, TableType,
    ValueType,
};
use crate::debug_println;
use crate::error::{ParseError, ReadError, Result, ValidationError};
use crate::validator::CodeValidator;
use std::sync::Arc;

const WASM_MAGIC_BYTES: [u8; 4] = [0x00, 0x61, 0x73, 0x6D];
const WASM_VERSION_BYTES: [u8; 4] = [0x01, 0x00, 0x00, 0x00];
const CODE_SECTION_ID: u8 = 10;

/// Parser state between transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Magic,
    Version,
    SectionStart,
    /// Section id read, size pending
    Section(u8),
    /// Size read and the payload is buffered
    SectionWithSize { id: u8, size: u32 },
    /// Inside the Code section, before the next body's size
    FuncBody { current: u32, max: u32 },
    /// Inside the Code section with the next body fully buffered
    FuncBodyWithSize { current: u32, max: u32, size: u32 },
}

/// Push-style parser and validator for one module
pub struct ModuleParser {
    cursor: Cursor,
    state: State,
    module: Module,
    pool: ValidationPool,
    /// Frozen snapshot shared with body validators, built when the Code
    /// section begins
    ctx: Option<Arc<ModuleContext>>,
}

impl Default for ModuleParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleParser {
    /// Parser with one validation worker per available core
    pub fn new() -> Self {
        Self::with_pool(ValidationPool::with_default_workers())
    }

    /// Parser with an explicit validation worker count
    pub fn with_workers(workers: usize) -> Self {
        Self::with_pool(ValidationPool::new(workers))
    }

    fn with_pool(pool: ValidationPool) -> Self {
        ModuleParser {
            cursor: Cursor::new(),
            state: State::Magic,
            module: Module::new(),
            pool,
            ctx: None,
        }
    }

    /// Handle for cancelling in-flight validation
    pub fn cancel_token(&self) -> CancelToken {
        self.pool.cancel_token()
    }

    /// Feed the next chunk and parse as far as the buffered bytes allow
    pub fn push(&mut self, bytes: &[u8]) -> Result<()> {
        self.cursor.push(bytes);
        self.advance_all()
    }

    /// Consume transitions until the buffer runs dry. On `UnexpectedEof`
    /// the bytes read by the failed transition count as not-read.
    fn advance_all(&mut self) -> Result<()> {
        loop {
            let checkpoint = self.cursor.pos();
            match self.advance() {
                Ok(()) => {}
                Err(err) if err.is_eof() => {
                    self.cursor.seek(checkpoint);
                    return Ok(());
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Finish parsing: no more bytes are coming, every pending validation
    /// must settle, and the module must have ended cleanly.
    pub fn finish(mut self) -> Result<Module> {
        if self.state != State::SectionStart || !self.cursor.is_at_eof() {
            return Err(ReadError::UnexpectedEof.into());
        }
        if self.module.codes.len() != self.module.functions.len() {
            return Err(ValidationError::CodeCountMismatch {
                functions: self.module.functions.len(),
                codes: self.module.codes.len(),
            }
            .into());
        }
        if let Some(declared) = self.module.data_count {
            if self.module.datas.len() != declared as usize {
                return Err(ValidationError::DataCountMismatch {
                    declared,
                    actual: self.module.datas.len(),
                }
                .into());
            }
        }
        self.pool.finish()?;
        debug_println!(
            "module complete: {} types, {} functions, {} codes",
            self.module.types.len(),
            self.module.total_functions(),
            self.module.codes.len()
        );
        Ok(self.module)
    }

    /// Run exactly one state transition
    fn advance(&mut self) -> Result<()> {
        match self.state {
            State::Magic => {
                let magic = self.cursor.read_exact(4)?;
                if magic != WASM_MAGIC_BYTES {
                    return Err(ParseError::InvalidModuleMagic.into());
                }
                self.state = State::Version;
            }
            State::Version => {
                let version = self.cursor.read_exact(4)?;
                if version != WASM_VERSION_BYTES {
                    return Err(ParseError::InvalidVersion.into());
                }
                self.state = State::SectionStart;
            }
            State::SectionStart => {
                let id = self.cursor.read_byte()?;
                if id > 12 {
                    return Err(ParseError::InvalidSectionId { id }.into());
                }
                self.state = State::Section(id);
            }
            State::Section(id) => {
                let size = self.cursor.read_u32_leb128()?;
                // Gate on the full payload so the section decoder never
                // stops halfway. The Code section is gated per body instead.
                if id != CODE_SECTION_ID && (self.cursor.remaining() as u64) < size as u64 {
                    return Err(ReadError::UnexpectedEof.into());
                }
                self.state = State::SectionWithSize { id, size };
            }
            State::SectionWithSize { id, size } => {
                self.parse_section(id, size)?;
            }
            State::FuncBody { current, max } => {
                if current == max {
                    if self.module.codes.len() != self.module.functions.len() {
                        return Err(ValidationError::CodeCountMismatch {
                            functions: self.module.functions.len(),
                            codes: self.module.codes.len(),
                        }
                        .into());
                    }
                    self.state = State::SectionStart;
                } else {
                    let size = self.cursor.read_u32_leb128()?;
                    self.state = State::FuncBodyWithSize { current, max, size };
                }
            }
            State::FuncBodyWithSize { current, max, size } => {
                if (self.cursor.remaining() as u64) < size as u64 {
                    return Err(ReadError::UnexpectedEof.into());
                }
                self.parse_func_body(size)?;
                self.state = State::FuncBody {
                    current: current + 1,
                    max,
                };
            }
        }
        Ok(())
    }

    /// Dispatch a fully buffered section payload
    fn parse_section(&mut self, id: u8, size: u32) -> Result<()> {
        debug_println!("section {} ({} bytes)", id, size);
        let start = self.cursor.pos();
        match id {
            0 => {
                // Custom section: may appear anywhere, any number of times
                self.cursor.skip(size as usize)?;
            }
            1 => self.parse_type_section()?,
            2 => self.parse_import_section()?,
            3 => self.parse_function_section()?,
            4 => self.parse_table_section()?,
            5 => self.parse_memory_section()?,
            6 => self.parse_global_section()?,
            7 => self.parse_export_section()?,
            8 => self.parse_start_section()?,
            9 => self.parse_element_section()?,
            10 => {
                let count = self.cursor.read_u32_leb128()?;
                // Everything a body can reference is final now; freeze the
                // snapshot the workers will share
                self.ctx = Some(Arc::new(self.module.snapshot()));
                self.state = State::FuncBody {
                    current: 0,
                    max: count,
                };
                return Ok(());
            }
            11 => self.parse_data_section()?,
            12 => {
                self.module.data_count = Some(self.cursor.read_u32_leb128()?);
            }
            _ => return Err(ParseError::InvalidSectionId { id }.into()),
        }
        if self.cursor.pos() - start != size as usize {
            return Err(ParseError::SectionSizeMismatch { id }.into());
        }
        self.state = State::SectionStart;
        Ok(())
    }

    fn parse_type_section(&mut self) -> Result<()> {
        let count = self.cursor.read_u32_leb128()?;
        for _ in 0..count {
            let ty = FunctionType::read(&mut self.cursor)?;
            self.module.types.push(ty);
        }
        Ok(())
    }

    fn parse_import_section(&mut self) -> Result<()> {
        let count = self.cursor.read_u32_leb128()?;
        for _ in 0..count {
            let import = Import::read(&mut self.cursor)?;
            if let ImportDesc::Function(index) = import.desc {
                if index as usize >= self.module.types.len() {
                    return Err(ValidationError::InvalidTypeIndex { index }.into());
                }
            }
            self.module.imports.push(import);
        }
        // Index-space arithmetic needs the per-kind counts from here on
        self.module.finalize_imports();
        Ok(())
    }

    fn parse_function_section(&mut self) -> Result<()> {
        let count = self.cursor.read_u32_leb128()?;
        for _ in 0..count {
            let index = self.cursor.read_u32_leb128()?;
            if index as usize >= self.module.types.len() {
                return Err(ValidationError::InvalidTypeIndex { index }.into());
            }
            self.module.functions.push(index);
        }
        Ok(())
    }

    fn parse_table_section(&mut self) -> Result<()> {
        let count = self.cursor.read_u32_leb128()?;
        for _ in 0..count {
            let ty = TableType::read(&mut self.cursor)?;
            self.module.tables.push(ty);
        }
        Ok(())
    }

    fn parse_memory_section(&mut self) -> Result<()> {
        let count = self.cursor.read_u32_leb128()?;
        for _ in 0..count {
            let ty = MemoryType::read(&mut self.cursor)?;
            self.module.memories.push(ty);
        }
        Ok(())
    }

    fn parse_global_section(&mut self) -> Result<()> {
        let count = self.cursor.read_u32_leb128()?;
        // Globals declared in this very section are not visible to the
        // initializers that follow them
        let snapshot = self.module.snapshot();
        for _ in 0..count {
            let ty = GlobalType::read(&mut self.cursor)?;
            let init_expr = self.read_init_expr(&snapshot, ty.value_type)?;
            self.module.globals.push(Global { ty, init_expr });
        }
        Ok(())
    }

    fn parse_export_section(&mut self) -> Result<()> {
        let count = self.cursor.read_u32_leb128()?;
        for _ in 0..count {
            let export = Export::read(&mut self.cursor)?;
            match export.desc {
                ExportDesc::Function(index) => {
                    if index >= self.module.total_functions() {
                        return Err(ValidationError::InvalidFunctionIndex { index }.into());
                    }
                }
                ExportDesc::Table(index) => {
                    if index >= self.module.total_tables() {
                        return Err(ValidationError::InvalidTableIndex { index }.into());
                    }
                }
                ExportDesc::Memory(index) => {
                    if index >= self.module.total_memories() {
                        return Err(ValidationError::InvalidMemoryIndex { index }.into());
                    }
                }
                ExportDesc::Global(index) => {
                    if index >= self.module.total_globals() {
                        return Err(ValidationError::InvalidGlobalIndex { index }.into());
                    }
                }
            }
            self.module.exports.push(export);
        }
        Ok(())
    }

    fn parse_start_section(&mut self) -> Result<()> {
        let index = self.cursor.read_u32_leb128()?;
        if index >= self.module.total_functions() {
            return Err(ValidationError::InvalidFunctionIndex { index }.into());
        }
        self.module.start = Some(index);
        Ok(())
    }

    fn parse_element_section(&mut self) -> Result<()> {
        let count = self.cursor.read_u32_leb128()?;
        let snapshot = self.module.snapshot();
        for _ in 0..count {
            let flags = self.cursor.read_u32_leb128()?;
            if flags > 7 {
                return Err(ParseError::InvalidElementTag { tag: flags }.into());
            }
            let mode = if flags & 0x01 == 0 {
                let table_index = if flags & 0x02 != 0 {
                    self.cursor.read_u32_leb128()?
                } else {
                    0
                };
                let offset_expr = self.read_init_expr(&snapshot, ValueType::I32)?;
                ElementMode::Active {
                    table_index,
                    offset_expr,
                }
            } else if flags & 0x02 != 0 {
                ElementMode::Declarative
            } else {
                ElementMode::Passive
            };

            let uses_exprs = flags & 0x04 != 0;
            let element_type = if flags == 0 || flags == 4 {
                ValueType::FuncRef
            } else if uses_exprs {
                ValueType::read_reference(&mut self.cursor)?
            } else {
                // Element kind byte; only funcref (0x00) exists
                let kind = self.cursor.read_byte()?;
                if kind != 0x00 {
                    return Err(ParseError::InvalidElementTag { tag: kind as u32 }.into());
                }
                ValueType::FuncRef
            };

            let item_count = self.cursor.read_u32_leb128()?;
            let items = if uses_exprs {
                let mut exprs = Vec::with_capacity((item_count as usize).min(1024));
                for _ in 0..item_count {
                    exprs.push(self.read_init_expr(&snapshot, element_type)?);
                }
                ElementItems::Expressions(exprs)
            } else {
                let mut funcs = Vec::with_capacity((item_count as usize).min(1024));
                for _ in 0..item_count {
                    let index = self.cursor.read_u32_leb128()?;
                    if index >= self.module.total_functions() {
                        return Err(ValidationError::InvalidFunctionIndex { index }.into());
                    }
                    funcs.push(index);
                }
                ElementItems::Functions(funcs)
            };

            if let ElementMode::Active { table_index, .. } = &mode {
                let table_index = *table_index;
                let table = self
                    .module
                    .table_type(table_index)
                    .ok_or(ValidationError::InvalidTableIndex { index: table_index })?;
                if table.element_type != element_type {
                    return Err(ValidationError::TableValueTypeMismatch {
                        expected: table.element_type,
                        got: element_type,
                    }
                    .into());
                }
            }

            self.module.elements.push(ElementSegment {
                element_type,
                items,
                mode,
            });
        }
        Ok(())
    }

    fn parse_data_section(&mut self) -> Result<()> {
        let count = self.cursor.read_u32_leb128()?;
        let snapshot = self.module.snapshot();
        for _ in 0..count {
            let flags = self.cursor.read_u32_leb128()?;
            let segment = match flags {
                0 | 2 => {
                    let memory_index = if flags == 2 {
                        self.cursor.read_u32_leb128()?
                    } else {
                        0
                    };
                    if memory_index >= self.module.total_memories() {
                        return Err(ValidationError::InvalidMemoryIndex {
                            index: memory_index,
                        }
                        .into());
                    }
                    let offset_expr = self.read_init_expr(&snapshot, ValueType::I32)?;
                    let bytes = self.read_data_bytes()?;
                    DataSegment {
                        bytes,
                        memory_index: Some(memory_index),
                        offset_expr: Some(offset_expr),
                    }
                }
                1 => DataSegment {
                    bytes: self.read_data_bytes()?,
                    memory_index: None,
                    offset_expr: None,
                },
                _ => return Err(ParseError::InvalidDataTag { tag: flags }.into()),
            };
            self.module.datas.push(segment);
        }
        if let Some(declared) = self.module.data_count {
            if self.module.datas.len() != declared as usize {
                return Err(ValidationError::DataCountMismatch {
                    declared,
                    actual: self.module.datas.len(),
                }
                .into());
            }
        }
        Ok(())
    }

    fn read_data_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.cursor.read_u32_leb128()? as usize;
        Ok(self.cursor.read_exact(len)?.to_vec())
    }

    /// Validate a constant expression in place and slice exactly the bytes
    /// it consumed
    fn read_init_expr(&mut self, ctx: &ModuleContext, expected: ValueType) -> Result<Vec<u8>> {
        let start = self.cursor.pos();
        CodeValidator::new(ctx).validate_init_expr(expected, &mut self.cursor)?;
        Ok(self.cursor.view(start..self.cursor.pos()).to_vec())
    }

    /// The shared snapshot for body validation, normally frozen when the
    /// Code section began
    fn context(&mut self) -> Arc<ModuleContext> {
        if let Some(ctx) = &self.ctx {
            return Arc::clone(ctx);
        }
        let ctx = Arc::new(self.module.snapshot());
        self.ctx = Some(Arc::clone(&ctx));
        ctx
    }

    /// Slice one code entry and enqueue it for validation
    fn parse_func_body(&mut self, declared_size: u32) -> Result<()> {
        let start = self.cursor.pos();
        let group_count = self.cursor.read_u32_leb128()?;
        let mut locals = Vec::with_capacity((group_count as usize).min(64));
        for _ in 0..group_count {
            let count = self.cursor.read_u32_leb128()?;
            let ty = ValueType::read(&mut self.cursor)?;
            locals.push((count, ty));
        }
        let locals_bytes = self.cursor.pos() - start;
        let body_size = (declared_size as usize)
            .checked_sub(locals_bytes)
            .ok_or(ParseError::SectionSizeMismatch {
                id: CODE_SECTION_ID,
            })?;
        let body = self.cursor.read_exact(body_size)?.to_vec();

        let local_index = self.module.codes.len();
        let type_index = self.module.functions.get(local_index).copied().ok_or(
            ValidationError::CodeCountMismatch {
                functions: self.module.functions.len(),
                codes: local_index + 1,
            },
        )?;
        let ctx = self.context();
        let ty = ctx.type_at(type_index)?.clone();
        let func_index = self.module.imported_functions() + local_index as u32;

        self.pool.submit(ValidationJob {
            func_index,
            ty,
            locals: locals.clone(),
            body: body.clone(),
            ctx,
        });
        self.module.codes.push(FunctionBody {
            declared_size,
            locals,
            body,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WasmvetError;

    fn uleb(mut value: u32) -> Vec<u8> {
        let mut out = Vec::new();
        loop {
            let byte = (value & 0x7F) as u8;
            value >>= 7;
            if value == 0 {
                out.push(byte);
                return out;
            }
            out.push(byte | 0x80);
        }
    }

    fn section(id: u8, payload: &[u8]) -> Vec<u8> {
        let mut out = vec![id];
        out.extend(uleb(payload.len() as u32));
        out.extend_from_slice(payload);
        out
    }

    fn header() -> Vec<u8> {
        vec![0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00]
    }

    /// Module with one `[i32] -> [i32]` function whose body is
    /// `local.get 0; end`
    fn identity_module() -> Vec<u8> {
        let mut bytes = header();
        bytes.extend(section(1, &[0x01, 0x60, 0x01, 0x7F, 0x01, 0x7F]));
        bytes.extend(section(3, &[0x01, 0x00]));
        bytes.extend(section(10, &[0x01, 0x04, 0x00, 0x20, 0x00, 0x0B]));
        bytes
    }

    fn parse(bytes: &[u8]) -> Result<Module> {
        let mut parser = ModuleParser::with_workers(2);
        parser.push(bytes)?;
        parser.finish()
    }

    fn parse_chunked(bytes: &[u8], chunk: usize) -> Result<Module> {
        let mut parser = ModuleParser::with_workers(2);
        for piece in bytes.chunks(chunk) {
            parser.push(piece)?;
        }
        parser.finish()
    }

    #[test]
    fn test_empty_module() {
        let module = parse(&header()).unwrap();
        assert!(module.types.is_empty());
        assert!(module.imports.is_empty());
        assert!(module.codes.is_empty());
        assert_eq!(module.data_count, None);
    }

    #[test]
    fn test_invalid_magic() {
        let result = parse(&[0x00, 0x61, 0x73, 0x6E, 0x01, 0x00, 0x00, 0x00]);
        assert!(matches!(
            result,
            Err(WasmvetError::Parse(ParseError::InvalidModuleMagic))
        ));
    }

    #[test]
    fn test_invalid_version() {
        let result = parse(&[0x00, 0x61, 0x73, 0x6D, 0x02, 0x00, 0x00, 0x00]);
        assert!(matches!(
            result,
            Err(WasmvetError::Parse(ParseError::InvalidVersion))
        ));
    }

    #[test]
    fn test_invalid_section_id() {
        let mut bytes = header();
        bytes.extend([13, 0x00]);
        assert!(matches!(
            parse(&bytes),
            Err(WasmvetError::Parse(ParseError::InvalidSectionId { id: 13 }))
        ));
    }

    #[test]
    fn test_identity_function_module() {
        let module = parse(&identity_module()).unwrap();
        assert_eq!(module.types.len(), 1);
        assert_eq!(module.functions, vec![0]);
        assert_eq!(module.codes.len(), 1);
        assert_eq!(module.codes[0].body, vec![0x20, 0x00, 0x0B]);
    }

    #[test]
    fn test_chunk_size_invariance() {
        let bytes = identity_module();
        for chunk in [1, 2, 3, 5, 7, bytes.len()] {
            let module = parse_chunked(&bytes, chunk).unwrap();
            assert_eq!(module.types.len(), 1, "chunk size {chunk}");
            assert_eq!(module.codes.len(), 1, "chunk size {chunk}");
        }
    }

    #[test]
    fn test_body_type_mismatch_surfaces_at_finish() {
        let mut bytes = header();
        bytes.extend(section(1, &[0x01, 0x60, 0x01, 0x7F, 0x01, 0x7F]));
        bytes.extend(section(3, &[0x01, 0x00]));
        // body is i64.const 0; end
        bytes.extend(section(10, &[0x01, 0x04, 0x00, 0x42, 0x00, 0x0B]));

        let mut parser = ModuleParser::with_workers(1);
        parser.push(&bytes).unwrap();
        let err = parser.finish().unwrap_err();
        assert!(matches!(
            err,
            WasmvetError::Validation(ValidationError::UnexpectedType { .. })
        ));
    }

    #[test]
    fn test_code_count_mismatch_with_empty_code_section() {
        let mut bytes = header();
        bytes.extend(section(1, &[0x01, 0x60, 0x00, 0x00]));
        bytes.extend(section(3, &[0x01, 0x00]));
        bytes.extend(section(10, &[0x00]));
        assert!(matches!(
            parse(&bytes),
            Err(WasmvetError::Validation(
                ValidationError::CodeCountMismatch { functions: 1, codes: 0 }
            ))
        ));
    }

    #[test]
    fn test_missing_code_section_is_a_count_mismatch() {
        let mut bytes = header();
        bytes.extend(section(1, &[0x01, 0x60, 0x00, 0x00]));
        bytes.extend(section(3, &[0x01, 0x00]));
        assert!(matches!(
            parse(&bytes),
            Err(WasmvetError::Validation(
                ValidationError::CodeCountMismatch { .. }
            ))
        ));
    }

    #[test]
    fn test_data_count_without_data_section() {
        let mut bytes = header();
        bytes.extend(section(12, &[0x01]));
        assert!(matches!(
            parse(&bytes),
            Err(WasmvetError::Validation(ValidationError::DataCountMismatch {
                declared: 1,
                actual: 0,
            }))
        ));
    }

    #[test]
    fn test_memory_init_without_data_count() {
        let mut bytes = header();
        bytes.extend(section(1, &[0x01, 0x60, 0x00, 0x00]));
        bytes.extend(section(3, &[0x01, 0x00]));
        bytes.extend(section(5, &[0x01, 0x00, 0x00]));
        let body = [
            0x00, 0x41, 0x00, 0x41, 0x00, 0x41, 0x00, 0xFC, 0x08, 0x00, 0x00, 0x0B,
        ];
        let mut payload = vec![0x01, body.len() as u8];
        payload.extend_from_slice(&body);
        bytes.extend(section(10, &payload));

        let mut parser = ModuleParser::with_workers(1);
        parser.push(&bytes).unwrap();
        assert!(matches!(
            parser.finish(),
            Err(WasmvetError::Validation(ValidationError::MissingDataCount))
        ));
    }

    #[test]
    fn test_global_section_stores_validated_init_expr() {
        let mut bytes = header();
        bytes.extend(section(6, &[0x01, 0x7F, 0x00, 0x41, 0x05, 0x0B]));
        let module = parse(&bytes).unwrap();
        assert_eq!(module.globals.len(), 1);
        assert_eq!(module.globals[0].ty.value_type, ValueType::I32);
        assert!(!module.globals[0].ty.mutable);
        assert_eq!(module.globals[0].init_expr, vec![0x41, 0x05, 0x0B]);
    }

    #[test]
    fn test_global_init_expr_type_mismatch() {
        // i32 global initialized with an i64 constant
        let mut bytes = header();
        bytes.extend(section(6, &[0x01, 0x7F, 0x00, 0x42, 0x05, 0x0B]));
        assert!(matches!(
            parse(&bytes),
            Err(WasmvetError::Validation(ValidationError::UnexpectedType { .. }))
        ));
    }

    #[test]
    fn test_global_init_expr_rejects_non_constant() {
        let mut bytes = header();
        bytes.extend(section(6, &[0x01, 0x7F, 0x00, 0x41, 0x01, 0x41, 0x01, 0x6A, 0x0B]));
        assert!(matches!(
            parse(&bytes),
            Err(WasmvetError::Validation(
                ValidationError::InvalidInitExprInstruction(_)
            ))
        ));
    }

    #[test]
    fn test_export_index_bounds() {
        let mut bytes = header();
        // export "e" as function 0, but there are no functions
        bytes.extend(section(7, &[0x01, 0x01, 0x65, 0x00, 0x00]));
        assert!(matches!(
            parse(&bytes),
            Err(WasmvetError::Validation(
                ValidationError::InvalidFunctionIndex { index: 0 }
            ))
        ));
    }

    #[test]
    fn test_import_function_type_bounds() {
        let mut bytes = header();
        // import env.f as function with type index 3, but no types exist
        bytes.extend(section(
            2,
            &[0x01, 0x03, 0x65, 0x6E, 0x76, 0x01, 0x66, 0x00, 0x03],
        ));
        assert!(matches!(
            parse(&bytes),
            Err(WasmvetError::Validation(ValidationError::InvalidTypeIndex {
                index: 3
            }))
        ));
    }

    #[test]
    fn test_start_section() {
        let mut bytes = header();
        bytes.extend(section(1, &[0x01, 0x60, 0x00, 0x00]));
        bytes.extend(section(3, &[0x01, 0x00]));
        bytes.extend(section(8, &[0x00]));
        bytes.extend(section(10, &[0x01, 0x02, 0x00, 0x0B]));
        let module = parse(&bytes).unwrap();
        assert_eq!(module.start, Some(0));
    }

    #[test]
    fn test_start_section_bounds() {
        let mut bytes = header();
        bytes.extend(section(8, &[0x04]));
        assert!(matches!(
            parse(&bytes),
            Err(WasmvetError::Validation(
                ValidationError::InvalidFunctionIndex { index: 4 }
            ))
        ));
    }

    #[test]
    fn test_custom_sections_are_skipped() {
        let mut bytes = header();
        bytes.extend(section(0, &[0x04, 0x74, 0x65, 0x73, 0x74, 0xAA, 0xBB]));
        bytes.extend(section(1, &[0x01, 0x60, 0x00, 0x00]));
        bytes.extend(section(0, &[0x01, 0x78]));
        let module = parse(&bytes).unwrap();
        assert_eq!(module.types.len(), 1);
    }

    #[test]
    fn test_active_element_segment() {
        let mut bytes = header();
        bytes.extend(section(1, &[0x01, 0x60, 0x00, 0x00]));
        bytes.extend(section(3, &[0x01, 0x00]));
        bytes.extend(section(4, &[0x01, 0x70, 0x00, 0x01]));
        // flags 0: offset (i32.const 0), one function index
        bytes.extend(section(9, &[0x01, 0x00, 0x41, 0x00, 0x0B, 0x01, 0x00]));
        bytes.extend(section(10, &[0x01, 0x02, 0x00, 0x0B]));

        let module = parse(&bytes).unwrap();
        assert_eq!(module.elements.len(), 1);
        assert_eq!(module.elements[0].element_type, ValueType::FuncRef);
        assert!(matches!(
            module.elements[0].mode,
            ElementMode::Active { table_index: 0, .. }
        ));
        assert!(matches!(
            &module.elements[0].items,
            ElementItems::Functions(items) if items == &vec![0]
        ));
    }

    #[test]
    fn test_element_function_index_bounds() {
        let mut bytes = header();
        bytes.extend(section(4, &[0x01, 0x70, 0x00, 0x01]));
        bytes.extend(section(9, &[0x01, 0x00, 0x41, 0x00, 0x0B, 0x01, 0x07]));
        assert!(matches!(
            parse(&bytes),
            Err(WasmvetError::Validation(
                ValidationError::InvalidFunctionIndex { index: 7 }
            ))
        ));
    }

    #[test]
    fn test_element_invalid_tag() {
        let mut bytes = header();
        bytes.extend(section(9, &[0x01, 0x08]));
        assert!(matches!(
            parse(&bytes),
            Err(WasmvetError::Parse(ParseError::InvalidElementTag { tag: 8 }))
        ));
    }

    #[test]
    fn test_data_section_with_count() {
        let mut bytes = header();
        bytes.extend(section(5, &[0x01, 0x00, 0x01]));
        bytes.extend(section(12, &[0x01]));
        // active segment: offset i32.const 0, bytes "hi"
        bytes.extend(section(11, &[0x01, 0x00, 0x41, 0x00, 0x0B, 0x02, 0x68, 0x69]));
        let module = parse(&bytes).unwrap();
        assert_eq!(module.data_count, Some(1));
        assert_eq!(module.datas.len(), 1);
        assert_eq!(module.datas[0].bytes, b"hi");
        assert_eq!(module.datas[0].memory_index, Some(0));
    }

    #[test]
    fn test_data_count_disagreement() {
        let mut bytes = header();
        bytes.extend(section(5, &[0x01, 0x00, 0x01]));
        bytes.extend(section(12, &[0x02]));
        bytes.extend(section(11, &[0x01, 0x00, 0x41, 0x00, 0x0B, 0x00]));
        assert!(matches!(
            parse(&bytes),
            Err(WasmvetError::Validation(ValidationError::DataCountMismatch {
                declared: 2,
                actual: 1,
            }))
        ));
    }

    #[test]
    fn test_passive_data_segment() {
        let mut bytes = header();
        bytes.extend(section(12, &[0x01]));
        bytes.extend(section(11, &[0x01, 0x01, 0x03, 0x61, 0x62, 0x63]));
        let module = parse(&bytes).unwrap();
        assert_eq!(module.datas[0].memory_index, None);
        assert_eq!(module.datas[0].offset_expr, None);
        assert_eq!(module.datas[0].bytes, b"abc");
    }

    #[test]
    fn test_section_size_mismatch() {
        let mut bytes = header();
        // type section claims 5 bytes but its one type only spans 4
        bytes.extend([1, 0x05, 0x01, 0x60, 0x00, 0x00, 0xAA]);
        assert!(matches!(
            parse(&bytes),
            Err(WasmvetError::Parse(ParseError::SectionSizeMismatch { id: 1 }))
        ));
    }

    #[test]
    fn test_truncated_input_is_fatal_at_finish() {
        let bytes = identity_module();
        let truncated = &bytes[..bytes.len() - 1];
        let mut parser = ModuleParser::with_workers(1);
        parser.push(truncated).unwrap();
        let err = parser.finish().unwrap_err();
        assert!(err.is_eof());
    }

    #[test]
    fn test_imported_function_shifts_index_space() {
        let mut bytes = header();
        // type 0: [] -> [], type 1: [i32] -> [i32]
        bytes.extend(section(
            1,
            &[0x02, 0x60, 0x00, 0x00, 0x60, 0x01, 0x7F, 0x01, 0x7F],
        ));
        // import env.f of type 1
        bytes.extend(section(
            2,
            &[0x01, 0x03, 0x65, 0x6E, 0x76, 0x01, 0x66, 0x00, 0x01],
        ));
        bytes.extend(section(3, &[0x01, 0x00]));
        // body: call the import with 42, drop the result
        let body = [0x00, 0x41, 0x2A, 0x10, 0x00, 0x1A, 0x0B];
        let mut payload = vec![0x01, body.len() as u8];
        payload.extend_from_slice(&body);
        bytes.extend(section(10, &payload));

        let module = parse(&bytes).unwrap();
        assert_eq!(module.imported_functions(), 1);
        assert_eq!(module.total_functions(), 2);
        assert_eq!(module.function_type_index(0), Some(1));
        assert_eq!(module.function_type_index(1), Some(0));
    }
}
