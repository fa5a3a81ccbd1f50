#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
#[clap(rename_all = "snake_case")]
pub enum Target {
    x86_64_darwin,
    x86_64_linux,
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&garter_codegen::Target::from(*self), f)
    }
}

impl From<Target> for garter_codegen::Target {
    fn from(value: Target) -> Self {
        match value {
            Target::x86_64_darwin => garter_codegen::Target::x86_64_darwin,
            Target::x86_64_linux => garter_codegen::Target::x86_64_linux,
        }
    }
}
