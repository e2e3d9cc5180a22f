//! Build script for the native fixture libraries
//!
//! Compiles the reference implementations under `native/` into shared
//! libraries in `$OUT_DIR/native` using the host C compiler, and exports that
//! directory to the crate's tests as `POLYCALC_NATIVE_DIR`.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let lib_dir = out_dir.join("native");
    let target = env::var("TARGET").unwrap_or_else(|_| "x86_64-unknown-linux-gnu".to_string());
    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_else(|_| "linux".to_string());

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=native/");
    println!("cargo:rustc-env=POLYCALC_NATIVE_DIR={}", lib_dir.display());

    let suffix = match target_os.as_str() {
        "macos" | "ios" => "dylib",
        "windows" => {
            println!("cargo:warning=native fixtures are not built for windows targets");
            return;
        }
        _ => "so",
    };

    if let Err(e) = fs::create_dir_all(&lib_dir) {
        println!("cargo:warning=failed to create {}: {}", lib_dir.display(), e);
        return;
    }

    // The hand-written routines only cover the System V AMD64 ELF ABI.
    let asm_source = if target.starts_with("x86_64") && target_os == "linux" {
        "native/asm/math_ops_x86_64.S"
    } else {
        "native/asm/math_ops_portable.c"
    };

    let libraries: [(&str, &[&str], &[&str]); 3] = [
        ("math_ops", &["native/c/math_ops.c"], &[]),
        ("asm_math_ops", &[asm_source], &[]),
        ("cpp_calculator", &["native/calculator/calculator.c"], &["-lm"]),
    ];

    for (name, sources, link_args) in libraries {
        let output = lib_dir.join(format!("lib{}.{}", name, suffix));
        build_shared_library(&output, sources, link_args);
    }
}

/// Compile and link one shared library, warning instead of failing the build.
fn build_shared_library(output: &Path, sources: &[&str], link_args: &[&str]) {
    let compiler = cc::Build::new()
        .pic(true)
        .opt_level(2)
        .warnings(false)
        .get_compiler();

    let mut cmd: Command = compiler.to_command();
    cmd.arg("-shared").arg("-o").arg(output);
    for source in sources {
        cmd.arg(source);
    }
    cmd.args(link_args);

    match cmd.status() {
        Ok(s) if s.success() => {}
        Ok(s) => println!(
            "cargo:warning=failed to build {} ({}), facade tests will not find it",
            output.display(),
            s
        ),
        Err(e) => println!(
            "cargo:warning=could not run C compiler for {}: {}",
            output.display(),
            e
        ),
    }
}
