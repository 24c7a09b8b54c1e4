//! End-to-end tests for streaming validation through the public API

use wasmvet::{
    validate_bytes, validate_file, Module, ModuleParser, ParseError, Result, ValidationError,
    WasmvetError,
};

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

fn identity_module() -> Vec<u8> {
    let mut bytes = header();
    bytes.extend(section(1, &[0x01, 0x60, 0x01, 0x7F, 0x01, 0x7F]));
    bytes.extend(section(3, &[0x01, 0x00]));
    bytes.extend(section(10, &[0x01, 0x04, 0x00, 0x20, 0x00, 0x0B]));
    bytes
}

/// A module exercising every section kind: an imported function and global,
/// a table, a memory, a defined global, exports, a start function, an
/// active element segment, a data count, bulk memory in a body, and an
/// active data segment.
fn full_module() -> Vec<u8> {
    let mut bytes = header();
    // type 0: [] -> [], type 1: [i32] -> [i32]
    bytes.extend(section(
        1,
        &[0x02, 0x60, 0x00, 0x00, 0x60, 0x01, 0x7F, 0x01, 0x7F],
    ));
    // import env.f (func type 1) and env.g (const i32 global)
    bytes.extend(section(
        2,
        &[
            0x02, 0x03, 0x65, 0x6E, 0x76, 0x01, 0x66, 0x00, 0x01, 0x03, 0x65, 0x6E, 0x76, 0x01,
            0x67, 0x03, 0x7F, 0x00,
        ],
    ));
    bytes.extend(section(3, &[0x02, 0x00, 0x01]));
    bytes.extend(section(4, &[0x01, 0x70, 0x00, 0x01]));
    bytes.extend(section(5, &[0x01, 0x00, 0x01]));
    // one mutable i32 global initialized to 0
    bytes.extend(section(6, &[0x01, 0x7F, 0x01, 0x41, 0x00, 0x0B]));
    // export "run" (function 1) and "mem" (memory 0)
    bytes.extend(section(
        7,
        &[
            0x02, 0x03, 0x72, 0x75, 0x6E, 0x00, 0x01, 0x03, 0x6D, 0x65, 0x6D, 0x02, 0x00,
        ],
    ));
    bytes.extend(section(8, &[0x01]));
    // active element segment: table 0, offset 0, function 1
    bytes.extend(section(9, &[0x01, 0x00, 0x41, 0x00, 0x0B, 0x01, 0x01]));
    bytes.extend(section(12, &[0x01]));
    // body 0 ([] -> []): i32.const 0 x3; memory.init 0 0; end
    let body0 = [
        0x00, 0x41, 0x00, 0x41, 0x00, 0x41, 0x00, 0xFC, 0x08, 0x00, 0x00, 0x0B,
    ];
    // body 1 ([i32] -> [i32]) with an i64 local: local.get 0; end
    let body1 = [0x01, 0x01, 0x7E, 0x20, 0x00, 0x0B];
    let mut code = vec![0x02];
    code.push(body0.len() as u8);
    code.extend_from_slice(&body0);
    code.push(body1.len() as u8);
    code.extend_from_slice(&body1);
    bytes.extend(section(10, &code));
    // active data segment "hi" at offset 0
    bytes.extend(section(
        11,
        &[0x01, 0x00, 0x41, 0x00, 0x0B, 0x02, 0x68, 0x69],
    ));
    bytes
}

fn parse_chunked(bytes: &[u8], chunk: usize) -> Result<Module> {
    let mut parser = ModuleParser::with_workers(2);
    for piece in bytes.chunks(chunk) {
        parser.push(piece)?;
    }
    parser.finish()
}

#[test]
fn test_empty_module_is_valid() {
    let module = validate_bytes(&header()).unwrap();
    assert_eq!(module.types.len(), 0);
    assert_eq!(module.total_functions(), 0);
}

#[test]
fn test_bad_magic() {
    let result = validate_bytes(&[0x00, 0x61, 0x73, 0x6E, 0x01, 0x00, 0x00, 0x00]);
    assert!(matches!(
        result,
        Err(WasmvetError::Parse(ParseError::InvalidModuleMagic))
    ));
}

#[test]
fn test_bad_version() {
    let result = validate_bytes(&[0x00, 0x61, 0x73, 0x6D, 0x02, 0x00, 0x00, 0x00]);
    assert!(matches!(
        result,
        Err(WasmvetError::Parse(ParseError::InvalidVersion))
    ));
}

#[test]
fn test_identity_function_module() {
    let module = validate_bytes(&identity_module()).unwrap();
    assert_eq!(module.types.len(), 1);
    assert_eq!(module.total_functions(), 1);
    assert_eq!(module.codes.len(), 1);
}

#[test]
fn test_type_mismatch_in_body() {
    let mut bytes = header();
    bytes.extend(section(1, &[0x01, 0x60, 0x01, 0x7F, 0x01, 0x7F]));
    bytes.extend(section(3, &[0x01, 0x00]));
    bytes.extend(section(10, &[0x01, 0x04, 0x00, 0x42, 0x00, 0x0B]));

    let err = validate_bytes(&bytes).unwrap_err();
    match err {
        WasmvetError::Validation(ValidationError::UnexpectedType { expected, got }) => {
            assert_eq!(expected.to_string(), "i32");
            assert_eq!(got.to_string(), "i64");
        }
        other => panic!("expected a type mismatch, got {other:?}"),
    }
}

#[test]
fn test_hanging_else_in_body() {
    let mut bytes = header();
    bytes.extend(section(1, &[0x01, 0x60, 0x00, 0x00]));
    bytes.extend(section(3, &[0x01, 0x00]));
    // body: else; end
    bytes.extend(section(10, &[0x01, 0x03, 0x00, 0x05, 0x0B]));

    assert!(matches!(
        validate_bytes(&bytes),
        Err(WasmvetError::Validation(ValidationError::HangingElse))
    ));
}

#[test]
fn test_memory_init_without_data_count_section() {
    let mut bytes = header();
    bytes.extend(section(1, &[0x01, 0x60, 0x00, 0x00]));
    bytes.extend(section(3, &[0x01, 0x00]));
    bytes.extend(section(5, &[0x01, 0x00, 0x00]));
    let body = [
        0x00, 0x41, 0x00, 0x41, 0x00, 0x41, 0x00, 0xFC, 0x08, 0x00, 0x00, 0x0B,
    ];
    let mut code = vec![0x01, body.len() as u8];
    code.extend_from_slice(&body);
    bytes.extend(section(10, &code));

    assert!(matches!(
        validate_bytes(&bytes),
        Err(WasmvetError::Validation(ValidationError::MissingDataCount))
    ));
}

#[test]
fn test_full_module_accepted() {
    let module = validate_bytes(&full_module()).unwrap();
    assert_eq!(module.types.len(), 2);
    assert_eq!(module.imports.len(), 2);
    assert_eq!(module.imported_functions(), 1);
    assert_eq!(module.total_functions(), 3);
    assert_eq!(module.total_tables(), 1);
    assert_eq!(module.total_memories(), 1);
    assert_eq!(module.total_globals(), 2);
    assert_eq!(module.exports.len(), 2);
    assert_eq!(module.start, Some(1));
    assert_eq!(module.elements.len(), 1);
    assert_eq!(module.data_count, Some(1));
    assert_eq!(module.datas.len(), 1);
    assert_eq!(module.codes.len(), 2);
}

#[test]
fn test_chunk_size_invariance_on_full_module() {
    let bytes = full_module();
    for chunk in [1, 2, 3, 4, 5, 8, 13, bytes.len()] {
        let module = parse_chunked(&bytes, chunk)
            .unwrap_or_else(|err| panic!("chunk size {chunk} failed: {err}"));
        assert_eq!(module.total_functions(), 3, "chunk size {chunk}");
        assert_eq!(module.codes.len(), 2, "chunk size {chunk}");
        assert_eq!(module.datas.len(), 1, "chunk size {chunk}");
    }
}

#[test]
fn test_chunk_size_invariance_on_invalid_module() {
    let mut bytes = header();
    bytes.extend(section(1, &[0x01, 0x60, 0x01, 0x7F, 0x01, 0x7F]));
    bytes.extend(section(3, &[0x01, 0x00]));
    bytes.extend(section(10, &[0x01, 0x04, 0x00, 0x42, 0x00, 0x0B]));

    for chunk in [1, bytes.len()] {
        let err = parse_chunked(&bytes, chunk).unwrap_err();
        assert!(
            matches!(
                err,
                WasmvetError::Validation(ValidationError::UnexpectedType { .. })
            ),
            "chunk size {chunk} gave {err:?}"
        );
    }
}

#[test]
fn test_truncated_module_fails_only_at_finish() {
    let bytes = identity_module();
    let mut parser = ModuleParser::with_workers(1);
    parser.push(&bytes[..bytes.len() - 2]).unwrap();
    let err = parser.finish().unwrap_err();
    assert!(err.is_eof());
}

#[test]
fn test_cancellation_from_the_caller() {
    let mut parser = ModuleParser::with_workers(1);
    parser.cancel_token().cancel();
    parser.push(&identity_module()).unwrap();
    assert!(matches!(
        parser.finish(),
        Err(WasmvetError::Validation(ValidationError::Cancelled))
    ));
}

#[test]
fn test_validate_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("identity.wasm");
    std::fs::write(&path, identity_module()).unwrap();

    let module = validate_file(&path).unwrap();
    assert_eq!(module.total_functions(), 1);

    std::fs::write(&path, [0xDE, 0xAD, 0xBE, 0xEF]).unwrap();
    assert!(validate_file(&path).is_err());
}
