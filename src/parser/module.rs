//! In-memory representation of a decoded module
//!
//! Index spaces number imported entities before locally declared ones, so
//! every lookup goes through the cached per-kind import counts. Workers get
//! a frozen [`ModuleContext`] snapshot instead of the module itself.

use super::types::{
    Export, FunctionType, GlobalType, Import, ImportDesc, MemoryType, TableType, ValueType,
};
use crate::error::{Result, ValidationError};

/// A global declaration: its type and the constant initializer bytes
#[derive(Debug, Clone)]
pub struct Global {
    pub ty: GlobalType,
    pub init_expr: Vec<u8>,
}

/// Where an element segment applies
#[derive(Debug, Clone)]
pub enum ElementMode {
    Active { table_index: u32, offset_expr: Vec<u8> },
    Passive,
    Declarative,
}

/// Element segment payload: plain function indices or full init expressions
#[derive(Debug, Clone)]
pub enum ElementItems {
    Functions(Vec<u32>),
    Expressions(Vec<Vec<u8>>),
}

impl ElementItems {
    pub fn len(&self) -> usize {
        match self {
            ElementItems::Functions(items) => items.len(),
            ElementItems::Expressions(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Element segment for table initialization
#[derive(Debug, Clone)]
pub struct ElementSegment {
    pub element_type: ValueType,
    pub items: ElementItems,
    pub mode: ElementMode,
}

/// Data segment for memory initialization; passive segments have neither a
/// memory index nor an offset
#[derive(Debug, Clone)]
pub struct DataSegment {
    pub bytes: Vec<u8>,
    pub memory_index: Option<u32>,
    pub offset_expr: Option<Vec<u8>>,
}

/// A code entry: declared body size, locals groups, and the body bytes
/// after the locals vector
#[derive(Debug, Clone)]
pub struct FunctionBody {
    pub declared_size: u32,
    pub locals: Vec<(u32, ValueType)>,
    pub body: Vec<u8>,
}

/// Per-kind import counts, computed once when the Import section finishes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportTotals {
    pub functions: u32,
    pub tables: u32,
    pub memories: u32,
    pub globals: u32,
}

impl ImportTotals {
    pub fn count(imports: &[Import]) -> Self {
        let mut totals = ImportTotals::default();
        for import in imports {
            match import.desc {
                ImportDesc::Function(_) => totals.functions += 1,
                ImportDesc::Table(_) => totals.tables += 1,
                ImportDesc::Memory(_) => totals.memories += 1,
                ImportDesc::Global(_) => totals.globals += 1,
            }
        }
        totals
    }
}

/// Fully parsed module
#[derive(Debug, Default)]
pub struct Module {
    pub types: Vec<FunctionType>,
    pub imports: Vec<Import>,
    /// Type index of each locally declared function
    pub functions: Vec<u32>,
    pub tables: Vec<TableType>,
    pub memories: Vec<MemoryType>,
    pub globals: Vec<Global>,
    pub exports: Vec<Export>,
    pub start: Option<u32>,
    pub elements: Vec<ElementSegment>,
    /// Value of the Data Count section, when present
    pub data_count: Option<u32>,
    pub codes: Vec<FunctionBody>,
    pub datas: Vec<DataSegment>,
    import_totals: ImportTotals,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute the cached per-kind import counts. The parser calls this
    /// once, when the Import section is complete.
    pub(crate) fn finalize_imports(&mut self) {
        self.import_totals = ImportTotals::count(&self.imports);
    }

    pub fn imported_functions(&self) -> u32 {
        self.import_totals.functions
    }

    pub fn imported_tables(&self) -> u32 {
        self.import_totals.tables
    }

    pub fn imported_memories(&self) -> u32 {
        self.import_totals.memories
    }

    pub fn imported_globals(&self) -> u32 {
        self.import_totals.globals
    }

    pub fn total_functions(&self) -> u32 {
        self.import_totals.functions + self.functions.len() as u32
    }

    pub fn total_tables(&self) -> u32 {
        self.import_totals.tables + self.tables.len() as u32
    }

    pub fn total_memories(&self) -> u32 {
        self.import_totals.memories + self.memories.len() as u32
    }

    pub fn total_globals(&self) -> u32 {
        self.import_totals.globals + self.globals.len() as u32
    }

    /// Type index of the `index`-th imported function, in declaration order
    pub fn get_imported_function(&self, index: u32) -> Option<u32> {
        self.imports
            .iter()
            .filter_map(|import| match import.desc {
                ImportDesc::Function(type_index) => Some(type_index),
                _ => None,
            })
            .nth(index as usize)
    }

    pub fn get_imported_table(&self, index: u32) -> Option<TableType> {
        self.imports
            .iter()
            .filter_map(|import| match import.desc {
                ImportDesc::Table(ty) => Some(ty),
                _ => None,
            })
            .nth(index as usize)
    }

    pub fn get_imported_memory(&self, index: u32) -> Option<MemoryType> {
        self.imports
            .iter()
            .filter_map(|import| match import.desc {
                ImportDesc::Memory(ty) => Some(ty),
                _ => None,
            })
            .nth(index as usize)
    }

    pub fn get_imported_global(&self, index: u32) -> Option<GlobalType> {
        self.imports
            .iter()
            .filter_map(|import| match import.desc {
                ImportDesc::Global(ty) => Some(ty),
                _ => None,
            })
            .nth(index as usize)
    }

    /// Type index of a function in the combined index space
    pub fn function_type_index(&self, index: u32) -> Option<u32> {
        if index < self.import_totals.functions {
            self.get_imported_function(index)
        } else {
            self.functions
                .get((index - self.import_totals.functions) as usize)
                .copied()
        }
    }

    pub fn table_type(&self, index: u32) -> Option<TableType> {
        if index < self.import_totals.tables {
            self.get_imported_table(index)
        } else {
            self.tables
                .get((index - self.import_totals.tables) as usize)
                .copied()
        }
    }

    pub fn global_type(&self, index: u32) -> Option<GlobalType> {
        if index < self.import_totals.globals {
            self.get_imported_global(index)
        } else {
            self.globals
                .get((index - self.import_totals.globals) as usize)
                .map(|g| g.ty)
        }
    }

    /// Frozen read-only view for validation. Index spaces are flattened so
    /// lookups are plain slice accesses.
    pub fn snapshot(&self) -> ModuleContext {
        let mut functions = Vec::with_capacity(self.total_functions() as usize);
        let mut tables = Vec::with_capacity(self.total_tables() as usize);
        let mut memories = Vec::with_capacity(self.total_memories() as usize);
        let mut globals = Vec::with_capacity(self.total_globals() as usize);
        for import in &self.imports {
            match import.desc {
                ImportDesc::Function(type_index) => functions.push(type_index),
                ImportDesc::Table(ty) => tables.push(ty),
                ImportDesc::Memory(ty) => memories.push(ty),
                ImportDesc::Global(ty) => globals.push(ty),
            }
        }
        functions.extend_from_slice(&self.functions);
        tables.extend_from_slice(&self.tables);
        memories.extend_from_slice(&self.memories);
        globals.extend(self.globals.iter().map(|g| g.ty));
        ModuleContext {
            types: self.types.clone(),
            functions,
            tables,
            memories,
            globals,
            elements: self.elements.iter().map(|e| e.element_type).collect(),
            data_count: self.data_count,
        }
    }
}

/// Immutable snapshot of everything a function body can reference.
/// Shared with validation workers; never mutated after construction.
#[derive(Debug, Clone)]
pub struct ModuleContext {
    pub types: Vec<FunctionType>,
    /// Type index per function, imports first
    pub functions: Vec<u32>,
    pub tables: Vec<TableType>,
    pub memories: Vec<MemoryType>,
    pub globals: Vec<GlobalType>,
    /// Element type per element segment
    pub elements: Vec<ValueType>,
    pub data_count: Option<u32>,
}

impl ModuleContext {
    pub fn type_at(&self, index: u32) -> Result<&FunctionType> {
        self.types
            .get(index as usize)
            .ok_or_else(|| ValidationError::InvalidTypeIndex { index }.into())
    }

    pub fn function_type(&self, index: u32) -> Result<&FunctionType> {
        let type_index = self
            .functions
            .get(index as usize)
            .copied()
            .ok_or(ValidationError::InvalidFunctionIndex { index })?;
        self.type_at(type_index)
    }

    pub fn check_function(&self, index: u32) -> Result<()> {
        if (index as usize) < self.functions.len() {
            Ok(())
        } else {
            Err(ValidationError::InvalidFunctionIndex { index }.into())
        }
    }

    pub fn table(&self, index: u32) -> Result<&TableType> {
        self.tables
            .get(index as usize)
            .ok_or_else(|| ValidationError::InvalidTableIndex { index }.into())
    }

    pub fn check_memory(&self, index: u32) -> Result<()> {
        if (index as usize) < self.memories.len() {
            Ok(())
        } else {
            Err(ValidationError::InvalidMemoryIndex { index }.into())
        }
    }

    pub fn global(&self, index: u32) -> Result<GlobalType> {
        self.globals
            .get(index as usize)
            .copied()
            .ok_or_else(|| ValidationError::InvalidGlobalIndex { index }.into())
    }

    pub fn element_type(&self, index: u32) -> Result<ValueType> {
        self.elements
            .get(index as usize)
            .copied()
            .ok_or_else(|| ValidationError::InvalidElementIndex { index }.into())
    }

    /// Bounds check against the declared data count. Any use of a data index
    /// requires the Data Count section.
    pub fn check_data(&self, index: u32) -> Result<()> {
        let count = self.data_count.ok_or(ValidationError::MissingDataCount)?;
        if index < count {
            Ok(())
        } else {
            Err(ValidationError::InvalidDataIndex { index }.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::types::Limits;

    fn func_import(type_index: u32) -> Import {
        Import {
            module: "env".to_string(),
            name: "f".to_string(),
            desc: ImportDesc::Function(type_index),
        }
    }

    fn global_import(mutable: bool) -> Import {
        Import {
            module: "env".to_string(),
            name: "g".to_string(),
            desc: ImportDesc::Global(GlobalType {
                value_type: ValueType::I64,
                mutable,
            }),
        }
    }

    #[test]
    fn test_import_totals_by_kind() {
        let imports = vec![func_import(0), global_import(false), func_import(1)];
        let totals = ImportTotals::count(&imports);
        assert_eq!(totals.functions, 2);
        assert_eq!(totals.globals, 1);
        assert_eq!(totals.tables, 0);
        assert_eq!(totals.memories, 0);
    }

    #[test]
    fn test_function_index_space_orders_imports_first() {
        let mut module = Module::new();
        module.types = vec![
            FunctionType::default(),
            FunctionType {
                params: vec![ValueType::I32],
                results: vec![],
            },
        ];
        module.imports = vec![func_import(1), global_import(true)];
        module.functions = vec![0];
        module.finalize_imports();

        assert_eq!(module.total_functions(), 2);
        assert_eq!(module.function_type_index(0), Some(1));
        assert_eq!(module.function_type_index(1), Some(0));
        assert_eq!(module.function_type_index(2), None);
    }

    #[test]
    fn test_snapshot_flattens_index_spaces() {
        let mut module = Module::new();
        module.types = vec![FunctionType::default()];
        module.imports = vec![func_import(0), global_import(false)];
        module.functions = vec![0];
        module.globals = vec![Global {
            ty: GlobalType {
                value_type: ValueType::F32,
                mutable: true,
            },
            init_expr: vec![0x0B],
        }];
        module.tables = vec![TableType {
            element_type: ValueType::FuncRef,
            limits: Limits { min: 1, max: None },
        }];
        module.data_count = Some(2);
        module.finalize_imports();

        let ctx = module.snapshot();
        assert_eq!(ctx.functions, vec![0, 0]);
        assert_eq!(ctx.globals.len(), 2);
        assert_eq!(ctx.globals[0].value_type, ValueType::I64);
        assert_eq!(ctx.globals[1].value_type, ValueType::F32);
        assert_eq!(ctx.tables.len(), 1);
        assert!(ctx.check_data(1).is_ok());
        assert!(ctx.check_data(2).is_err());
    }

    #[test]
    fn test_context_missing_data_count() {
        let ctx = Module::new().snapshot();
        assert!(matches!(
            ctx.check_data(0),
            Err(crate::error::WasmvetError::Validation(
                ValidationError::MissingDataCount
            ))
        ));
    }
}
