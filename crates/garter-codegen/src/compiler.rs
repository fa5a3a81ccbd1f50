//! Code generator driving both compilation modes.

use std::fs;
use std::path::Path;

use garter_engine::Engine;
use garter_ir::{FuncId, Function, Linkage, Module};
use garter_syntax::ast::*;
use garter_syntax::error::{error, ErrorKind, Result};

use crate::builder::{FuncBuilder, Scope};
use crate::target::{self, Target};

/// Name of the function holding a program's top-level statements.
pub const ENTRY_POINT: &str = "main";

/// Prefix of every symbol the compiler and its runtime own. User
/// functions may not use it.
pub const RESERVED_PREFIX: &str = "__garter_";

/// Prefix of the transient functions wrapping REPL statements.
pub const ANONYMOUS_PREFIX: &str = "__garter_anonymous";

/// Lowers garter programs into one IR [`Module`].
///
/// Ahead of time, [`compile_program`](Self::compile_program) builds the
/// whole module which one of the `finalize_*` methods then writes out. In
/// a REPL, [`execute_top_level_item`](Self::execute_top_level_item) grows
/// the module one item at a time and runs statements immediately.
pub struct CodeGenerator {
    module: Module,
    statement_number: u64,
    engine: Option<Engine>,
}

impl CodeGenerator {
    pub fn new(module_name: &str) -> Self {
        Self { module: Module::new(module_name), statement_number: 0, engine: None }
    }

    /// Executes statements with `engine` instead of one printing to stdout.
    pub fn with_engine(mut self, mut engine: Engine) -> Self {
        engine.map_runtime();
        self.engine = Some(engine);
        self
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    /// Declares one function per definition. Fails on the first name that
    /// is already taken.
    pub fn generate_prototypes<'p>(&mut self, defs: impl IntoIterator<Item = &'p FunctionDef>) -> Result<Vec<(FuncId, &'p FunctionDef)>> {
        let mut prototypes = Vec::new();
        for def in defs {
            prototypes.push((self.generate_prototype(def)?, def));
        }
        Ok(prototypes)
    }

    fn generate_prototype(&mut self, def: &FunctionDef) -> Result<FuncId> {
        if def.name.starts_with(RESERVED_PREFIX) {
            return error(
                ErrorKind::Semantic,
                format!("Function name '{}' is reserved for the runtime", def.name),
            );
        }
        let linkage = if def.is_declaration() {
            Linkage::ExternWeak
        } else if def.is_extern {
            Linkage::External
        } else {
            Linkage::Internal
        };
        self.module.add_function(Function::new(def.name.clone(), def.params.len() as u32, linkage))
    }

    /// Generates the body of a defined function. Declarations stay bodiless.
    pub fn generate_body(&mut self, id: FuncId, def: &FunctionDef) -> Result<()> {
        if def.is_declaration() {
            return Ok(());
        }
        FuncBuilder::new(&mut self.module, id, &def.params, Scope::Local).finish(&def.body)
    }

    /// Generates a whole program: every function, then [`ENTRY_POINT`]
    /// running the top-level statements in source order.
    pub fn compile_program(&mut self, program: &Program) -> Result<()> {
        let functions = self.generate_prototypes(program.functions())?;
        let main = self.module.add_function(Function::new(ENTRY_POINT, 0, Linkage::External).synthetic())?;
        for (id, def) in functions {
            self.generate_body(id, def)?;
        }
        FuncBuilder::new(&mut self.module, main, &[], Scope::Global).finish(program.statements())?;
        self.module.verify()
    }

    /// Writes the module as textual IR.
    pub fn finalize_to_text(&self, path: &Path) -> Result<()> {
        write_output(path, self.module.to_string().as_bytes())
    }

    pub fn emit_assembly(&self, target: Target) -> Result<String> {
        let mut buf = Vec::new();
        if let Err(e) = target::generate(&mut buf, target, &self.module) {
            return error(ErrorKind::Backend, format!("Could not generate code for {}: {}", target, e));
        }
        match String::from_utf8(buf) {
            Ok(asm) => Ok(asm),
            Err(e) => error(ErrorKind::Backend, format!("Generated assembly is not UTF-8: {}", e)),
        }
    }

    pub fn finalize_to_assembly(&self, path: &Path, target: Target) -> Result<()> {
        let asm = self.emit_assembly(target)?;
        write_output(path, asm.as_bytes())
    }

    /// Emits a relocatable object file through the system assembler.
    pub fn finalize_to_object(&self, path: &Path, target: Target) -> Result<()> {
        let asm = self.emit_assembly(target)?;
        target::assemble(&asm, path, target)
    }

    /// Defines a function, or runs a statement at once.
    ///
    /// A statement is wrapped in a fresh zero-argument function that reads
    /// and writes module globals, executed, and erased again whether or not
    /// it succeeded. A function whose body fails to generate is erased too,
    /// so a failed item leaves no trace besides globals it created.
    pub fn execute_top_level_item(&mut self, item: &Item) -> Result<()> {
        match item {
            Item::Function(def) => {
                let id = self.generate_prototype(def)?;
                let result = self.generate_body(id, def);
                if result.is_err() {
                    self.module.erase_function(id);
                }
                result
            }
            Item::Stmt(stmt) => {
                self.statement_number += 1;
                let name = format!("{}{}", ANONYMOUS_PREFIX, self.statement_number);
                let id = self.module.add_function(Function::new(name, 0, Linkage::Internal).synthetic())?;
                let result = self.run_statement(id, stmt);
                self.module.erase_function(id);
                result.map(|_| ())
            }
        }
    }

    fn run_statement(&mut self, id: FuncId, stmt: &Stmt) -> Result<i32> {
        FuncBuilder::new(&mut self.module, id, &[], Scope::Global).finish([stmt])?;
        self.module.verify()?;
        let engine = self.engine.get_or_insert_with(default_engine);
        engine.run_function(&self.module, id, &[])
    }

    /// Runs a generated function by name, such as [`ENTRY_POINT`] after
    /// [`compile_program`](Self::compile_program).
    pub fn run_function(&mut self, name: &str, args: &[i32]) -> Result<i32> {
        let Some(id) = self.module.get_function(name) else {
            return error(ErrorKind::Runtime, format!("Unknown function '{}'", name));
        };
        let engine = self.engine.get_or_insert_with(default_engine);
        engine.run_function(&self.module, id, args)
    }

    /// Current value of a module global, as seen by executed code.
    pub fn global_value(&mut self, name: &str) -> Option<i32> {
        let engine = self.engine.get_or_insert_with(default_engine);
        engine.global_value(&self.module, name)
    }
}

/// Engine printing to stdout, created on first execution.
fn default_engine() -> Engine {
    let mut engine = Engine::new();
    engine.map_runtime();
    engine
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    match fs::write(path, bytes) {
        Ok(()) => Ok(()),
        Err(e) => error(ErrorKind::Backend, format!("Could not write '{}': {}", path.display(), e)),
    }
}
