use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;

fn workspace_root() -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest_dir.parent().unwrap().parent().unwrap().to_path_buf()
}

fn write_source(dir: &tempfile::TempDir, name: &str, src: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, src).unwrap();
    path
}

#[test]
fn garteri_runs_fib_demo() {
    let root = workspace_root();
    let mut cmd = Command::cargo_bin("garteri").unwrap();
    cmd.arg(root.join("demos/fib.garter"));
    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("0 0 0\n1 1 1\n2 1 1\n"))
        .stdout(predicate::str::ends_with("10 55 55\n"));
}

#[test]
fn garteri_runs_arith_demo() {
    let root = workspace_root();
    let mut cmd = Command::cargo_bin("garteri").unwrap();
    cmd.arg(root.join("demos/arith.garter"));
    cmd.assert()
        .success()
        .stdout(predicate::str::diff("3 -3 1 1024\n1 0 1 0\n1\n"));
}

#[test]
fn garteri_reads_stdin_and_keeps_state() {
    let mut cmd = Command::cargo_bin("garteri").unwrap();
    cmd.write_stdin("x = 5;\nprint x;\nx = x * 2;\nprint x;\n");
    cmd.assert()
        .success()
        .stdout(predicate::str::diff("5\n10\n"))
        .stdout(predicate::str::contains("garter>").not());
}

#[test]
fn garteri_continues_after_compile_and_runtime_errors() {
    let mut cmd = Command::cargo_bin("garteri").unwrap();
    cmd.write_stdin("print nosuch(1);\nprint 1 / 0;\nprint 42;\n");
    cmd.assert()
        .success()
        .stdout(predicate::str::diff("42\n"))
        .stderr(predicate::str::contains("Compile error"))
        .stderr(predicate::str::contains("Division by zero"));
}

#[test]
fn garteri_parse_error_is_nonzero() {
    let mut cmd = Command::cargo_bin("garteri").unwrap();
    cmd.write_stdin("print 1;\nprint (;\nprint 2;\n");
    cmd.assert()
        .failure()
        .code(1)
        .stdout(predicate::str::diff("1\n"))
        .stderr(predicate::str::contains("Parse error"));
}

#[test]
fn garterc_emits_ir_next_to_source() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let src = write_source(&tmp_dir, "prog.garter", "def inc(a): return a + 1; enddef print inc(1);\n");

    let mut cmd = Command::cargo_bin("garterc").unwrap();
    cmd.arg(&src).args(["--emit", "ir"]);
    cmd.assert().success();

    let ir = std::fs::read_to_string(tmp_dir.path().join("prog.ll")).unwrap();
    assert!(ir.contains("define internal i32 @inc("), "{ir}");
    assert!(ir.contains("@main()"), "{ir}");
}

#[test]
fn garterc_emits_ast() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let src = write_source(&tmp_dir, "prog.garter", "x = 1 + 2 * 3;\nprint x;\n");
    let out = tmp_dir.path().join("tree.txt");

    let mut cmd = Command::cargo_bin("garterc").unwrap();
    cmd.arg(&src).args(["--emit", "ast", "-o"]).arg(&out);
    cmd.assert().success();

    let ast = std::fs::read_to_string(out).unwrap();
    assert_eq!(ast, "(= x (+ 1 (* 2 3)))\n(print x)\n");
}

#[test]
fn garterc_emits_assembly_for_each_target() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let src = write_source(&tmp_dir, "prog.garter", "print 2 ** 8;\n");

    let linux = tmp_dir.path().join("linux.s");
    let mut cmd = Command::cargo_bin("garterc").unwrap();
    cmd.arg(&src).args(["--emit", "asm", "--target", "x86_64_linux", "-o"]).arg(&linux);
    cmd.assert().success();
    let asm = std::fs::read_to_string(linux).unwrap();
    assert!(asm.contains(".globl main"), "{asm}");
    assert!(asm.contains("call __garter_exponentiate@PLT"), "{asm}");

    let darwin = tmp_dir.path().join("darwin.s");
    let mut cmd = Command::cargo_bin("garterc").unwrap();
    cmd.arg(&src).args(["--emit", "asm", "--target", "x86_64_darwin", "-o"]).arg(&darwin);
    cmd.assert().success();
    let asm = std::fs::read_to_string(darwin).unwrap();
    assert!(asm.contains(".globl _main"), "{asm}");
}

#[test]
fn garterc_verbose_reports_phases() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let src = write_source(&tmp_dir, "prog.garter", "print 1;\n");

    let mut cmd = Command::cargo_bin("garterc").unwrap();
    cmd.arg(&src).args(["--emit", "ir", "--verbose"]);
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("parsed 1 top-level items"))
        .stderr(predicate::str::contains("prog.ll"));
}

#[test]
fn garterc_parse_error_shows_source_line() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let src = write_source(&tmp_dir, "bad.garter", "x = 1;\nprint (2 + ;\n");

    let mut cmd = Command::cargo_bin("garterc").unwrap();
    cmd.arg(&src).args(["--emit", "ir"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Parse error"))
        .stderr(predicate::str::contains("line 2"))
        .stderr(predicate::str::contains("print (2 + ;"));
    assert!(!tmp_dir.path().join("bad.ll").exists());
}

#[test]
fn garterc_duplicate_definition_writes_nothing() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let src = write_source(&tmp_dir, "dup.garter", "def f(): enddef\ndef f(): enddef\n");

    let mut cmd = Command::cargo_bin("garterc").unwrap();
    cmd.arg(&src).args(["--emit", "asm", "--target", "x86_64_linux"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Duplicate definition of function 'f'"))
        .stderr(predicate::str::contains("help:"));
    assert!(!tmp_dir.path().join("dup.s").exists());
}

#[test]
fn garterc_requires_output_for_extensionless_input() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let src = write_source(&tmp_dir, "prog", "print 1;\n");

    let mut cmd = Command::cargo_bin("garterc").unwrap();
    cmd.arg(&src).args(["--emit", "ir"]);
    cmd.assert().failure().stderr(predicate::str::contains("pass -o"));
}

#[test]
fn garterc_missing_file_is_io_error() {
    let mut cmd = Command::cargo_bin("garterc").unwrap();
    cmd.arg("does/not/exist.garter");
    cmd.assert().failure().stderr(predicate::str::contains("I/O error"));
}

#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
#[test]
fn garterc_emits_object_file() {
    if std::process::Command::new("cc").arg("--version").output().is_err() {
        eprintln!("skipping: no system compiler");
        return;
    }
    let tmp_dir = tempfile::tempdir().unwrap();
    let src = write_source(&tmp_dir, "prog.garter", "x = 3; print x * x;\n");

    let mut cmd = Command::cargo_bin("garterc").unwrap();
    cmd.arg(&src);
    cmd.assert().success();

    let obj = std::fs::read(tmp_dir.path().join("prog.o")).unwrap();
    assert_eq!(&obj[..4], b"\x7fELF");
}
