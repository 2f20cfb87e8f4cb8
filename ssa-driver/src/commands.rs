//! Subcommand implementations

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use log::info;
use ssa_backend::{generate, CodegenOptions};
use ssa_ir::analysis::{print_values, Cfg, DominatorTree, Graph};
use ssa_ir::test_helpers::demo_module;
use ssa_ir::{validate, Module, PassList};

use crate::{DemoArgs, GraphFormat};

pub fn demo(args: &DemoArgs) -> Result<()> {
    let mut module = demo_module();

    // No optimisations ship yet; running the empty list still validates
    let passes = PassList::new();
    passes.run(&mut module)?;

    if args.print_ir {
        println!("{}", module);
    }
    if args.print_values {
        print_values(&module, &mut io::stdout().lock())?;
    }
    if let Some(dir) = &args.graphs {
        write_graphs(&module, dir, args.graph_format)?;
    }

    let options = codegen_options(args)?;
    let mut asm = Vec::new();
    generate(&mut asm, &module, &options)?;

    match &args.output {
        Some(path) => {
            fs::write(path, &asm).with_context(|| format!("cannot write {}", path.display()))?;
            println!("Assembly written to: {}", path.display());
        }
        None => io::stdout().lock().write_all(&asm)?,
    }
    Ok(())
}

pub fn check() -> Result<()> {
    let module = demo_module();
    let functions = module.functions().len();
    let blocks: usize = module.functions().iter().map(|&f| module.function(f).blocks().len()).sum();

    match validate(&module) {
        Ok(()) => {
            println!(
                "Module '{}' is valid ({} functions, {} blocks, {} globals)",
                module.module_name(),
                functions,
                blocks,
                module.globals().len()
            );
            Ok(())
        }
        Err(e) => bail!("module '{}' is invalid: {}", module.module_name(), e),
    }
}

fn codegen_options(args: &DemoArgs) -> Result<CodegenOptions> {
    let mut options = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("invalid options in {}", path.display()))?
        }
        None => CodegenOptions::default(),
    };
    if let Some(platform) = args.platform {
        options.platform = platform;
    }
    if args.no_comments {
        options.ir_comments = false;
    }
    Ok(options)
}

/// One CFG and one dominator tree file per function with a body
fn write_graphs(module: &Module, dir: &Path, format: GraphFormat) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;

    for &func in module.functions() {
        if module.function(func).is_prototype() {
            continue;
        }
        let cfg = Cfg::compute(module, func);
        let tree = DominatorTree::compute(&cfg);
        for graph in [Graph::from_cfg(module, &cfg), Graph::from_dominator_tree(module, &tree)] {
            let text = match format {
                GraphFormat::Dot => graph.to_dot(),
                GraphFormat::Json => graph.to_json()?,
            };
            let path = dir.join(format!("{}.{}", graph.name, format.extension()));
            fs::write(&path, text).with_context(|| format!("cannot write {}", path.display()))?;
            info!("driver: wrote {}", path.display());
        }
    }
    Ok(())
}
