use color_print::cprintln;
use hla::config::Config;
use hla::cpu::CpuKind;
use hla::symbols::Symbol;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{bin} {version}
  {about}

{usage-heading}
{tab}{usage}

{all-args}{after-help}";

#[derive(Debug, clap::Parser)]
#[clap(version, about, help_template = HELP_TEMPLATE)]
struct Args {
    /// Source file
    input: PathBuf,

    /// Directory searched by #include and #incbin
    #[clap(short = 'I', long = "include")]
    include: Vec<PathBuf>,

    /// Define a macro as NAME or NAME=VALUE
    #[clap(short = 'D', long = "define")]
    define: Vec<String>,

    /// Target CPU family
    #[clap(long, value_enum, default_value_t = CpuKind::Mos6502)]
    cpu: CpuKind,

    /// Write the memory layout as JSON
    #[clap(long)]
    layout: Option<PathBuf>,

    /// More log output, repeat for debug messages
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    use clap::Parser;

    let args = Args::parse();
    let level = match args.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut config = Config::new();
    config.search_paths = args.include.clone();
    for define in &args.define {
        config.define_arg(define);
    }

    let cpu = args.cpu.cpu();
    let unit = match hla::compile::compile(&args.input, &config, cpu.as_ref()) {
        Ok(unit) => unit,
        Err(e) => {
            e.print_diag();
            std::process::exit(1);
        }
    };

    let ctx = &unit.ctx;
    cprintln!("<green,bold>Parsed</> {} for {}", args.input.display(), cpu.name());
    for (name, ty) in ctx.types.user_types() {
        cprintln!("  <cyan>type</>     {}: {}", name, ty);
    }
    for (name, symbol) in ctx.symbols.iter() {
        match symbol {
            Symbol::Variable(var) => cprintln!("  <cyan>variable</> {}: {}", name, var.ty),
            other => cprintln!("  <cyan>{:<8}</> {}", other.kind(), name),
        }
    }
    for (idx, region) in ctx.memory.regions().iter().enumerate() {
        cprintln!("  <cyan>region</>   {}: {} {} byte(s)", idx, region.kind, region.len());
    }

    if let Some(path) = &args.layout {
        let written = ctx
            .memory
            .to_json()
            .map_err(|e| e.to_string())
            .and_then(|json| std::fs::write(path, json).map_err(|e| e.to_string()));
        if let Err(e) = written {
            cprintln!("<red,bold>error</>: cannot write {}: {}", path.display(), e);
            std::process::exit(1);
        }
        println!("  > {}", path.display());
    }
}
