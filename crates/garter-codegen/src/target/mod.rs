//! Native code emission for x86_64 targets.

use std::ffi::OsString;
use std::io::{self, Write};
use std::path::Path;
use std::process::Command;

use garter_ir::Module;
use garter_syntax::error::{error, ErrorKind, Result};

mod x86_64;
mod x86_64_env;

use x86_64::Generator;

/// Environment variable naming the C compiler used to assemble objects.
pub const CC_ENV: &str = "GARTER_CC";

/// Writes `module` as assembly for `target`.
pub fn generate<W>(writer: W, target: Target, module: &Module) -> io::Result<()>
where
    W: io::Write,
{
    type DarwinGenerator<'a, W> = Generator<'a, W, x86_64_env::Darwin>;
    type LinuxGenerator<'a, W> = Generator<'a, W, x86_64_env::Linux>;

    match target {
        Target::x86_64_darwin => DarwinGenerator::new(writer, module).generate(),
        Target::x86_64_linux => LinuxGenerator::new(writer, module).generate(),
    }
}

/// Assembles `asm` into the object file at `output` with the system C
/// compiler (`cc`, or whatever [`CC_ENV`] names).
///
/// A partially written object is removed when assembly fails.
pub fn assemble(asm: &str, output: &Path, target: Target) -> Result<()> {
    let backend = |msg: String| error(ErrorKind::Backend, msg);

    let mut source = match tempfile::Builder::new().prefix("garter").suffix(".s").tempfile() {
        Ok(file) => file,
        Err(e) => return backend(format!("Could not create temporary assembly file: {}", e)),
    };
    if let Err(e) = source.write_all(asm.as_bytes()).and_then(|()| source.flush()) {
        return backend(format!("Could not write temporary assembly file: {}", e));
    }

    let cc = std::env::var_os(CC_ENV).unwrap_or_else(|| OsString::from("cc"));
    let mut cmd = Command::new(&cc);
    if Target::host() != Some(target) {
        cmd.arg(format!("--target={}", target.triple()));
    }
    cmd.arg("-c").arg("-x").arg("assembler").arg(source.path()).arg("-o").arg(output);

    let result = match cmd.output() {
        Err(e) => backend(format!("Could not run '{}': {}", cc.to_string_lossy(), e)),
        Ok(out) if !out.status.success() => backend(format!(
            "'{}' failed to assemble the module ({}):\n{}",
            cc.to_string_lossy(),
            out.status,
            String::from_utf8_lossy(&out.stderr).trim_end()
        )),
        Ok(_) => Ok(()),
    };
    if result.is_err() {
        let _ = std::fs::remove_file(output);
    }
    result
}

#[allow(non_camel_case_types)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Target {
    x86_64_darwin,
    x86_64_linux,
}

impl Target {
    pub const ALL: &'static [Target] = &[Target::x86_64_darwin, Target::x86_64_linux];

    pub const fn triple(&self) -> &'static str {
        match self {
            Target::x86_64_darwin => "x86_64-apple-darwin",
            Target::x86_64_linux => "x86_64-unknown-linux-gnu",
        }
    }

    /// The target matching the machine the compiler runs on, if supported.
    pub const fn host() -> Option<Target> {
        HOST_TARGET
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::x86_64_darwin => f.write_str("x86_64_darwin"),
            Target::x86_64_linux => f.write_str("x86_64_linux"),
        }
    }
}

cfg_if::cfg_if! {
    if #[cfg(all(target_arch = "x86_64", target_os = "macos"))] {
        const HOST_TARGET: Option<Target> = Some(Target::x86_64_darwin);
    } else if #[cfg(all(target_arch = "x86_64", target_os = "linux"))] {
        const HOST_TARGET: Option<Target> = Some(Target::x86_64_linux);
    } else {
        const HOST_TARGET: Option<Target> = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use garter_ir::{BinOp, Builder, CmpPred, Function, Linkage, Type, Value};

    fn emit(module: &Module, target: Target) -> String {
        let mut buf = Vec::new();
        generate(&mut buf, target, module).unwrap();
        String::from_utf8(buf).unwrap()
    }

    /// A module touching every instruction kind.
    fn sample() -> Module {
        let mut m = Module::new("sample");
        let print = m.get_or_insert_declaration("__garter_print", 1, true);
        let ext = m.add_function(Function::new("ext", 0, Linkage::ExternWeak)).unwrap();
        let x = m.global_cell("x", 0);

        let wide = m.add_function(Function::new("wide", 8, Linkage::Internal)).unwrap();
        let mut b = Builder::new(&mut m, wide);
        let entry = b.append_block("entry");
        b.position_at_end(entry);
        let q = b.build_binary(BinOp::SDiv, Value::Param(0), Value::Param(7));
        let r = b.build_binary(BinOp::SRem, q, Value::Param(6));
        b.build_ret(r);

        let main = m.add_function(Function::new("main", 0, Linkage::External).synthetic()).unwrap();
        let mut b = Builder::new(&mut m, main);
        let entry = b.append_block("entry");
        let zero = b.append_block("zero");
        let nonzero = b.append_block("nonzero");
        let cont = b.append_block("cont");
        b.position_at_end(entry);
        let v = b.build_load(Value::Global(x));
        let c = b.build_icmp(CmpPred::Eq, Value::Int(0), v);
        b.build_cond_br(c, zero, nonzero);
        for blk in [zero, nonzero] {
            b.position_at_end(blk);
            b.build_br(cont);
        }
        b.position_at_end(cont);
        let phi = b.build_phi(Type::I1, vec![(Value::Bool(false), zero), (Value::Bool(true), nonzero)]);
        let z = b.build_zext(phi);
        let args = (1..=8).map(Value::Int).collect();
        let w = b.build_call(wide, args);
        b.build_call(ext, vec![]);
        b.build_call(print, vec![Value::Int(2), z, w]);
        b.build_store(w, Value::Global(x));
        b.build_ret(Value::Int(0));
        m
    }

    #[test]
    fn test_linux_output() {
        let asm = emit(&sample(), Target::x86_64_linux);
        assert!(asm.starts_with(".att_syntax\n.section .note.GNU-stack"));
        assert!(asm.contains(".weak ext\n"));
        assert!(asm.contains(".globl main\n"));
        assert!(!asm.contains(".globl wide"));
        assert!(asm.contains("\nwide:\n"));
        assert!(asm.contains("call __garter_print@PLT"));
        assert!(asm.contains("call ext@PLT"));
        assert!(asm.contains("call wide\n"));
        assert!(asm.contains("movl .Lvar_x(%rip), %eax"));
        assert!(asm.contains(".Lvar_x:\n    .long 0\n"));
        // Seventh and eighth arguments travel on the stack.
        assert!(asm.contains("movl $8, %eax\n    pushq %rax\n    movl $7, %eax\n    pushq %rax\n"));
        assert!(asm.contains("addq $16, %rsp"));
        assert!(asm.contains("movl 24(%rbp), %ecx"));
        assert!(asm.contains("cltd\n    idivl %ecx\n"));
        assert!(asm.contains("sete %al"));
        assert!(asm.contains("xorl %eax, %eax\n    call __garter_print@PLT"));
    }

    #[test]
    fn test_darwin_output() {
        let asm = emit(&sample(), Target::x86_64_darwin);
        assert!(asm.starts_with(".att_syntax\n"));
        assert!(!asm.contains("GNU-stack"));
        assert!(asm.contains(".weak_reference _ext\n"));
        assert!(asm.contains(".globl _main\n"));
        assert!(asm.contains("call ___garter_print\n"));
        assert!(asm.contains("Lvar_x(%rip)"));
        assert!(!asm.contains(".Lvar_x"));
    }

    #[test]
    fn test_phi_copies_on_edges() {
        let asm = emit(&sample(), Target::x86_64_linux);
        // The false edge stores 0 into the phi slot, the true edge 1.
        let zero = asm.find(".LBB3_1:").unwrap();
        let nonzero = asm.find(".LBB3_2:").unwrap();
        assert!(asm[zero..nonzero].contains("movl $0, %eax"));
        assert!(asm[nonzero..].contains("movl $1, %eax"));
    }

    #[test]
    fn test_unreachable_blocks_are_skipped() {
        let mut m = Module::new("dead");
        let f = m.add_function(Function::new("f", 0, Linkage::Internal)).unwrap();
        let mut b = Builder::new(&mut m, f);
        let entry = b.append_block("entry");
        let dead = b.append_block("dead");
        b.position_at_end(entry);
        b.build_ret(Value::Int(1));
        b.position_at_end(dead);
        b.build_ret(Value::Int(2));
        let asm = emit(&m, Target::x86_64_linux);
        assert!(asm.contains(".LBB0_0:"));
        assert!(!asm.contains(".LBB0_1:"));
        assert!(!asm.contains("$2"));
    }

    #[test]
    fn test_target_names() {
        assert_eq!(Target::ALL.len(), 2);
        assert_eq!(Target::x86_64_linux.to_string(), "x86_64_linux");
        assert_eq!(Target::x86_64_darwin.triple(), "x86_64-apple-darwin");
    }

    #[cfg(all(target_arch = "x86_64", target_os = "linux"))]
    #[test]
    fn test_assembles_with_system_compiler() {
        if Command::new("cc").arg("--version").output().is_err() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let object = dir.path().join("sample.o");
        let asm = emit(&sample(), Target::x86_64_linux);
        assemble(&asm, &object, Target::x86_64_linux).unwrap();
        assert!(object.metadata().unwrap().len() > 0);
    }

    #[test]
    fn test_assembler_failure_is_backend_error() {
        if Command::new("cc").arg("--version").output().is_err() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let object = dir.path().join("bad.o");
        let host = Target::host().unwrap_or(Target::x86_64_linux);
        let err = assemble("this is not assembly\n", &object, host).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Backend);
        assert!(!object.exists());
    }
}
