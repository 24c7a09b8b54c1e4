use crate::parser::opcode::Opcode;
use crate::parser::types::ValueType;
use thiserror::Error;

/// The main error type for wasmvet operations
#[derive(Error, Debug)]
pub enum WasmvetError {
    /// I/O related errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed binary input
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Well-formed but structurally or type-wise invalid input
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Low-level byte reader errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadError {
    /// Ran out of buffered bytes mid-read. During `push` this is the signal
    /// to rewind and wait for the next chunk; at `finish` it is fatal.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// LEB128 continuation bit still set on the last byte the width allows
    #[error("LEB128 integer exceeds its bit width")]
    Leb128TooLarge,

    /// LEB128 final byte carries value bits beyond the width
    #[error("LEB128 integer has trailing bits beyond its bit width")]
    Leb128TooLong,
}

/// Errors for byte sequences that cannot be decoded at all
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid module magic bytes")]
    InvalidModuleMagic,

    #[error("unsupported module version")]
    InvalidVersion,

    #[error("invalid section id: {id}")]
    InvalidSectionId { id: u8 },

    #[error("invalid function type tag: 0x{tag:02x}")]
    InvalidFunctionTypeTag { tag: u8 },

    #[error("invalid value type tag: 0x{tag:02x}")]
    InvalidValueTypeTag { tag: u8 },

    #[error("invalid UTF-8 in name")]
    InvalidUtf8,

    #[error("invalid extern kind tag: 0x{tag:02x}")]
    InvalidExternTag { tag: u8 },

    #[error("expected a reference type, found tag 0x{tag:02x}")]
    ExpectedReferenceType { tag: u8 },

    #[error("invalid limits flag: 0x{flag:02x}")]
    InvalidLimitsFlag { flag: u8 },

    #[error("invalid mutability flag: 0x{flag:02x}")]
    InvalidMutabilityFlag { flag: u8 },

    #[error("invalid element segment tag: {tag}")]
    InvalidElementTag { tag: u32 },

    #[error("invalid data segment tag: {tag}")]
    InvalidDataTag { tag: u32 },

    /// A section decoder consumed more or fewer bytes than the declared size
    #[error("section {id} payload does not match its declared size")]
    SectionSizeMismatch { id: u8 },

    #[error("unknown opcode: byte 0x{byte:02x}, extension {extension:?}")]
    UnknownOpcode { byte: u8, extension: Option<u32> },

    #[error(transparent)]
    Read(#[from] ReadError),
}

/// Errors for modules that decode fine but violate validation rules
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid limits (min {min}, max {max})")]
    InvalidLimits { min: u64, max: u64 },

    #[error("invalid function index: {index}")]
    InvalidFunctionIndex { index: u32 },

    #[error("invalid table index: {index}")]
    InvalidTableIndex { index: u32 },

    #[error("invalid memory index: {index}")]
    InvalidMemoryIndex { index: u32 },

    #[error("invalid global index: {index}")]
    InvalidGlobalIndex { index: u32 },

    #[error("invalid type index: {index}")]
    InvalidTypeIndex { index: u32 },

    #[error("invalid data index: {index}")]
    InvalidDataIndex { index: u32 },

    #[error("invalid element index: {index}")]
    InvalidElementIndex { index: u32 },

    #[error("data segment count {actual} does not match declared data count {declared}")]
    DataCountMismatch { declared: u32, actual: usize },

    #[error("code entry count {codes} does not match function count {functions}")]
    CodeCountMismatch { functions: usize, codes: usize },

    #[error("stack height mismatch: expected {expected}, got {got}")]
    StackHeightMismatch { expected: usize, got: usize },

    #[error("type mismatch: expected {expected}, got {got}")]
    UnexpectedType {
        expected: ValueType,
        got: ValueType,
    },

    #[error("value stack is empty")]
    StackEmpty,

    #[error("no control frames left")]
    NoFramesLeft,

    #[error("invalid select instruction")]
    InvalidSelectType,

    #[error("else without a matching if")]
    HangingElse,

    #[error("invalid label index: {label}")]
    InvalidLabelIndex { label: u32 },

    #[error("br_table label {label} arity {got} does not match default arity {expected}")]
    BrTableArityMismatch {
        label: u32,
        expected: usize,
        got: usize,
    },

    #[error("invalid local index: {index}")]
    InvalidLocalIndex { index: u32 },

    #[error("global {index} is immutable")]
    InvalidGlobalSet { index: u32 },

    #[error("memory.init or data.drop used without a data count section")]
    MissingDataCount,

    #[error("alignment 2^{align} exceeds natural alignment of {natural} bytes")]
    InvalidAlignment { align: u32, natural: u32 },

    #[error("call_indirect requires a funcref table")]
    CanOnlyCallFuncref,

    #[error("expected a reference type, got {got}")]
    ExpectedReference { got: ValueType },

    #[error("table element type mismatch: expected {expected}, got {got}")]
    TableValueTypeMismatch {
        expected: ValueType,
        got: ValueType,
    },

    #[error("reference types are not allowed in untyped select, got {got}")]
    ExpectedNonReference { got: ValueType },

    #[error("instruction {0:?} is not allowed in a constant expression")]
    InvalidInitExprInstruction(Opcode),

    #[error("function declares more locals than fit in a 32-bit counter")]
    TooManyLocals,

    #[error("validation was cancelled")]
    Cancelled,
}

/// Result type alias for wasmvet operations
pub type Result<T> = std::result::Result<T, WasmvetError>;

impl WasmvetError {
    /// True when the error is the cursor running dry, which the streaming
    /// parser treats as "rewind and wait for more bytes" rather than failure.
    pub fn is_eof(&self) -> bool {
        matches!(
            self,
            WasmvetError::Parse(ParseError::Read(ReadError::UnexpectedEof))
        )
    }
}

impl From<ReadError> for WasmvetError {
    fn from(err: ReadError) -> Self {
        WasmvetError::Parse(ParseError::Read(err))
    }
}

impl ValidationError {
    /// Type mismatch between an expected and an observed stack entry
    pub fn unexpected_type(expected: ValueType, got: ValueType) -> Self {
        Self::UnexpectedType { expected, got }
    }

    /// Stack not at the control frame's floor on block exit
    pub fn stack_height_mismatch(expected: usize, got: usize) -> Self {
        Self::StackHeightMismatch { expected, got }
    }
}

impl ParseError {
    pub fn unknown_opcode(byte: u8) -> Self {
        Self::UnknownOpcode {
            byte,
            extension: None,
        }
    }

    pub fn unknown_extended_opcode(ext: u32) -> Self {
        Self::UnknownOpcode {
            byte: 0xFC,
            extension: Some(ext),
        }
    }
}
