//! Serializable projection of a validated module, for embedders that want
//! to report what they just accepted

use crate::parser::module::Module;
use serde::Serialize;

/// Counts and entry points of a validated module
#[derive(Debug, Serialize)]
pub struct ModuleSummary {
    pub types: usize,
    pub imports: usize,
    pub functions: u32,
    pub imported_functions: u32,
    pub tables: u32,
    pub memories: u32,
    pub globals: u32,
    pub exports: Vec<String>,
    pub start: Option<u32>,
    pub element_segments: usize,
    pub data_segments: usize,
    pub data_count: Option<u32>,
}

impl From<&Module> for ModuleSummary {
    fn from(module: &Module) -> Self {
        ModuleSummary {
            types: module.types.len(),
            imports: module.imports.len(),
            functions: module.total_functions(),
            imported_functions: module.imported_functions(),
            tables: module.total_tables(),
            memories: module.total_memories(),
            globals: module.total_globals(),
            exports: module.exports.iter().map(|e| e.name.clone()).collect(),
            start: module.start,
            element_segments: module.elements.len(),
            data_segments: module.datas.len(),
            data_count: module.data_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_of_empty_module() {
        let summary = ModuleSummary::from(&Module::new());
        assert_eq!(summary.functions, 0);
        assert_eq!(summary.exports.len(), 0);
        assert_eq!(summary.start, None);

        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"functions\":0"));
    }
}
