/// Object-format conventions of an x86_64 platform.
pub trait Env {
    /// Prefix the C compiler adds to every external symbol.
    const SYMBOL_PREFIX: &'static str;
    /// Prefix of assembler-local labels, which never reach the symbol table.
    const PRIVATE_PREFIX: &'static str;
    /// Suffix for calls to functions defined outside the module.
    const EXTERN_CALL_SUFFIX: &'static str;

    const GLOBAL_PROLOGUE: &'static str;

    const SECTION_TEXT: &'static str;
    const SECTION_DATA: &'static str;

    /// Directive marking a declared-only symbol as a weak reference.
    const WEAK_REFERENCE: &'static str;
}

impl Env for Darwin {
    const SYMBOL_PREFIX: &'static str = "_";
    const PRIVATE_PREFIX: &'static str = "L";
    const EXTERN_CALL_SUFFIX: &'static str = "";

    const GLOBAL_PROLOGUE: &'static str = ".att_syntax\n";

    const SECTION_TEXT: &'static str = "__TEXT,__text,regular,pure_instructions";
    const SECTION_DATA: &'static str = "__DATA,__data";

    const WEAK_REFERENCE: &'static str = ".weak_reference";
}

impl Env for Linux {
    const SYMBOL_PREFIX: &'static str = "";
    const PRIVATE_PREFIX: &'static str = ".L";
    const EXTERN_CALL_SUFFIX: &'static str = "@PLT";

    const GLOBAL_PROLOGUE: &'static str = concat!(
        ".att_syntax\n",
        ".section .note.GNU-stack,\"\",@progbits\n",
    );

    const SECTION_TEXT: &'static str = ".text";
    const SECTION_DATA: &'static str = ".data";

    const WEAK_REFERENCE: &'static str = ".weak";
}

pub struct Darwin;

pub struct Linux;
