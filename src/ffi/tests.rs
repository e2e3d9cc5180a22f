//! FFI Module Tests

use std::ffi::c_char;
use std::path::PathBuf;

use tempfile::TempDir;

use super::*;

fn fixture_locator(family: LibraryFamily) -> LibraryLocator {
    let _ = env_logger::builder().is_test(true).try_init();
    LibraryLocator::for_family(family)
        .with_dir(env!("POLYCALC_NATIVE_DIR"))
        .without_system_default()
}

#[test]
fn test_ffi_type_parsing() {
    assert_eq!(FfiType::from_c("int32_t"), Some(FfiType::I32));
    assert_eq!(FfiType::from_c("int"), Some(FfiType::I32));
    assert_eq!(FfiType::from_c("CalculatorError"), Some(FfiType::I32));
    assert_eq!(FfiType::from_c("uint64_t"), Some(FfiType::U64));
    assert_eq!(FfiType::from_c("double"), Some(FfiType::F64));
    assert_eq!(FfiType::from_c("size_t"), Some(FfiType::Size));
    assert_eq!(FfiType::from_c("const char*"), Some(FfiType::CStr));
    assert_eq!(FfiType::from_c("const  char *"), Some(FfiType::CStr));
    assert_eq!(FfiType::from_c("char*"), Some(FfiType::CharBuf));
    assert_eq!(FfiType::from_c("const int32_t*"), Some(FfiType::I32Array));
    assert_eq!(FfiType::from_c("double*"), Some(FfiType::F64Out));
    assert_eq!(FfiType::from_c("AdvancedCalculatorHandle*"), Some(FfiType::Handle));
    assert_eq!(FfiType::from_c("float"), None);
}

#[test]
fn test_ffi_type_properties() {
    assert!(FfiType::U64.is_integer());
    assert!(FfiType::Size.is_integer());
    assert!(!FfiType::F64.is_integer());

    assert!(FfiType::CStr.is_pointer());
    assert!(FfiType::Handle.is_pointer());
    assert!(!FfiType::I64.is_pointer());

    assert!(FfiType::I32Array.is_array());
    assert!(!FfiType::I32Out.is_array());

    assert_eq!(FfiType::I32.size(), 4);
    assert_eq!(FfiType::U64.size(), 8);
    assert_eq!(FfiType::Void.size(), 0);
}

#[test]
fn test_native_fn_signature() {
    type SumFn = unsafe extern "C" fn(*const i32, usize) -> i64;
    assert_eq!(
        <SumFn as NativeFn>::params(),
        vec![FfiType::I32Array, FfiType::Size]
    );
    assert_eq!(<SumFn as NativeFn>::return_type(), FfiType::I64);

    type CopyFn = unsafe extern "C" fn(*mut c_char, *const c_char, usize);
    assert_eq!(<CopyFn as NativeFn>::return_type(), FfiType::Void);

    type CreateFn = unsafe extern "C" fn() -> *mut CalculatorHandle;
    assert!(<CreateFn as NativeFn>::params().is_empty());
    assert_eq!(<CreateFn as NativeFn>::return_type(), FfiType::Handle);
}

#[test]
fn test_signature_parsing() {
    let sig = FfiSignature::parse("int32_t add_int(int32_t, int32_t)").unwrap();
    assert_eq!(sig.name, "add_int");
    assert_eq!(sig.return_type, FfiType::I32);
    assert_eq!(sig.params, vec![FfiType::I32, FfiType::I32]);

    // Void return
    let sig = FfiSignature::parse("void string_copy(char*, const char*, size_t);").unwrap();
    assert_eq!(sig.name, "string_copy");
    assert_eq!(sig.return_type, FfiType::Void);
    assert_eq!(
        sig.params,
        vec![FfiType::CharBuf, FfiType::CStr, FfiType::Size]
    );

    // Pointer return glued to the type
    let sig = FfiSignature::parse("CalculatorHandle* calculator_create(void)").unwrap();
    assert_eq!(sig.name, "calculator_create");
    assert_eq!(sig.return_type, FfiType::Handle);
    assert!(sig.params.is_empty());

    let sig = FfiSignature::parse("const char *calculator_error_to_string(CalculatorError)").unwrap();
    assert_eq!(sig.name, "calculator_error_to_string");
    assert_eq!(sig.return_type, FfiType::CStr);
}

#[test]
fn test_signature_parse_errors() {
    for bad in [
        "add_int(int32_t, int32_t)",
        "int32_t add_int int32_t, int32_t",
        "int32_t add_int(int32_t, float)",
        "int32_t add_int(int32_t a, int32_t b)",
        "int32_t add_int(void, int32_t)",
        "quux add_int(int32_t)",
    ] {
        assert!(
            matches!(
                FfiSignature::parse(bad),
                Err(FfiError::InvalidDeclaration { .. })
            ),
            "accepted {:?}",
            bad
        );
    }
}

#[test]
fn test_signature_display() {
    let sig = FfiSignature::new("add_int", vec![FfiType::I32, FfiType::I32], FfiType::I32);
    assert_eq!(sig.to_string(), "i32 add_int(i32, i32)");

    let sig = FfiSignature::parse("int64_t sum_array(const int32_t*, size_t)").unwrap();
    assert_eq!(sig.to_string(), "i64 sum_array(const i32*, usize)");
}

#[test]
fn test_signature_shape() {
    let ok = FfiSignature::parse("int64_t sum_array(const int32_t*, size_t)").unwrap();
    assert!(ok.check_shape().is_ok());

    let ok = FfiSignature::parse("void string_copy(char*, const char*, size_t)").unwrap();
    assert!(ok.check_shape().is_ok());

    let bare_array = FfiSignature::parse("int64_t sum_array(const int32_t*)").unwrap();
    assert!(matches!(
        bare_array.check_shape(),
        Err(FfiError::MalformedSignature { .. })
    ));

    let swapped = FfiSignature::parse("int64_t sum_array(size_t, const int32_t*)").unwrap();
    assert!(swapped.check_shape().is_err());

    let no_capacity = FfiSignature::parse("void string_copy(const char*, char*)").unwrap();
    assert!(no_capacity.check_shape().is_err());
}

#[test]
fn test_library_filename() {
    let name = library_filename("math_ops");
    let name = name.to_string_lossy();
    assert!(name.contains("math_ops"));
    assert!(name.ends_with(std::env::consts::DLL_SUFFIX));

    let already = format!(
        "{}math_ops{}",
        std::env::consts::DLL_PREFIX,
        std::env::consts::DLL_SUFFIX
    );
    assert_eq!(library_filename(&already).to_string_lossy(), already);
}

#[test]
fn test_family_search_order() {
    let root = PathBuf::from("/project");
    let locator = LibraryLocator::for_family_at(LibraryFamily::Integer, &root);
    let dirs = locator.search_dirs();
    assert_eq!(dirs[0], root.join("build/libs/c"));
    assert_eq!(dirs[1], root.join("build/lib"));
    #[cfg(unix)]
    {
        assert_eq!(dirs[2], PathBuf::from("/usr/local/lib"));
        assert_eq!(dirs[3], PathBuf::from("/usr/lib"));
    }
    assert_eq!(
        locator.strategies().last(),
        Some(&ResolutionStrategy::SystemDefault)
    );

    let calc = LibraryLocator::for_family_at(LibraryFamily::Calculator, &root);
    assert!(calc.search_dirs().iter().all(|d| d.starts_with(&root)));
}

#[test]
fn test_locate_first_match_wins() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    let file_name = library_filename("sample");
    std::fs::write(second.path().join(&file_name), b"").unwrap();

    let locator = LibraryLocator::new(
        "sample",
        vec![
            ResolutionStrategy::SearchDir(first.path().to_path_buf()),
            ResolutionStrategy::SearchDir(second.path().to_path_buf()),
            ResolutionStrategy::SystemDefault,
        ],
    );
    assert_eq!(
        locator.locate(),
        Some(Located::Path(second.path().join(&file_name)))
    );

    // Once present in the earlier directory, it wins.
    std::fs::write(first.path().join(&file_name), b"").unwrap();
    assert_eq!(
        locator.locate(),
        Some(Located::Path(first.path().join(&file_name)))
    );
    assert_eq!(locator.candidates().len(), 2);
}

#[test]
fn test_locate_falls_back_to_system_default() {
    let empty = TempDir::new().unwrap();
    let locator = LibraryLocator::new(
        "sample",
        vec![
            ResolutionStrategy::SearchDir(empty.path().to_path_buf()),
            ResolutionStrategy::SystemDefault,
        ],
    );
    assert_eq!(
        locator.locate(),
        Some(Located::System(library_filename("sample")))
    );
    assert_eq!(locator.clone().without_system_default().locate(), None);
}

#[test]
fn test_load_missing_library_reports_search_dirs() {
    let empty = TempDir::new().unwrap();
    let locator = LibraryLocator::new(
        "polycalc_missing",
        vec![ResolutionStrategy::SearchDir(empty.path().to_path_buf())],
    );

    let err = DynamicLibrary::load(&locator).unwrap_err();
    match &err {
        FfiError::LibraryNotFound { name, searched } => {
            assert!(name.contains("polycalc_missing"));
            assert_eq!(searched, &vec![empty.path().to_path_buf()]);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(err.to_string().contains("not found"));
}

#[test]
fn test_load_rejects_non_library_file() {
    let dir = TempDir::new().unwrap();
    let file_name = library_filename("not_a_library");
    std::fs::write(dir.path().join(&file_name), b"plain text").unwrap();

    let locator = LibraryLocator::new("not_a_library", Vec::new()).with_dir(dir.path());
    assert!(matches!(
        DynamicLibrary::load(&locator),
        Err(FfiError::LoadError { .. })
    ));
    assert!(DynamicLibrary::load_first_loadable(&locator).is_err());
}

#[test]
fn test_loaded_handles_are_shared() {
    let locator = fixture_locator(LibraryFamily::Integer);
    let a = DynamicLibrary::load(&locator).unwrap();
    let b = DynamicLibrary::load(&locator).unwrap();
    assert!(std::sync::Arc::ptr_eq(a.library(), b.library()));
    assert!(loaded_library_count() >= 1);
}

#[test]
fn test_bind_and_call() {
    let library = DynamicLibrary::load(&fixture_locator(LibraryFamily::Integer)).unwrap();
    let mut binder = SignatureBinder::new(&library);

    let add: unsafe extern "C" fn(i32, i32) -> i32 =
        binder.bind("int32_t add_int(int32_t, int32_t)").unwrap();
    let sum: unsafe extern "C" fn(*const i32, usize) -> i64 =
        binder.bind("int64_t sum_array(const int32_t*, size_t)").unwrap();

    let values = [i32::MAX, i32::MAX];
    unsafe {
        assert_eq!(add(2, 3), 5);
        assert_eq!(sum(values.as_ptr(), values.len()), 2 * i32::MAX as i64);
    }

    let bound = binder.finish();
    assert_eq!(bound.len(), 2);
    assert_eq!(bound[1].to_string(), "i64 sum_array(const i32*, usize)");
}

#[test]
fn test_bind_rejects_width_skew() {
    let library = DynamicLibrary::load(&fixture_locator(LibraryFamily::Integer)).unwrap();
    let mut binder = SignatureBinder::new(&library);

    // A 64-bit accumulator called through a 32-bit return type.
    let result =
        binder.bind::<unsafe extern "C" fn(*const i32, usize) -> i32>("int64_t sum_array(const int32_t*, size_t)");
    match result {
        Err(FfiError::SignatureMismatch { symbol, declared, bound }) => {
            assert_eq!(symbol, "sum_array");
            assert!(declared.starts_with("i64"));
            assert!(bound.starts_with("i32"));
        }
        Err(other) => panic!("unexpected {:?}", other),
        Ok(_) => panic!("width skew was accepted"),
    }
    assert!(binder.finish().is_empty());
}

#[test]
fn test_bind_missing_symbol() {
    let library = DynamicLibrary::load(&fixture_locator(LibraryFamily::Numeric)).unwrap();
    let mut binder = SignatureBinder::new(&library);
    let result = binder.bind::<unsafe extern "C" fn(i64, i64) -> i64>("int64_t asm_divide(int64_t, int64_t)");
    assert!(matches!(result, Err(FfiError::SymbolNotFound { .. })));
}

#[test]
fn test_bind_checks_shape_before_lookup() {
    let library = DynamicLibrary::load(&fixture_locator(LibraryFamily::Integer)).unwrap();
    let mut binder = SignatureBinder::new(&library);
    let result = binder.bind::<unsafe extern "C" fn(*const i32) -> i64>("int64_t sum_array(const int32_t*)");
    assert!(matches!(result, Err(FfiError::MalformedSignature { .. })));
}
