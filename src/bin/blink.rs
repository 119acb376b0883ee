use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context as AnyhowContext, anyhow};
use blink::compiler::{CompileOptions, Compiler};
use blink::meta::loader;
use blink::meta::registry::NodeRegistry;
use blink::meta::{AssetLibrary, BlueprintAsset, BlueprintMeta};
use blink::runtime::blueprint::{BlueprintHost, RuntimeBlueprint};
use blink::runtime::factory::BlueprintFactory;
use clap::{Parser, Subcommand};
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a graph file and print its link table
    Compile {
        /// Path to the graph YAML file
        file: PathBuf,
        /// Asset to compile; defaults to the last one in the file
        #[arg(long)]
        asset: Option<String>,
        /// Print the link table as JSON
        #[arg(long)]
        json: bool,
        /// Skip graph validation
        #[arg(long)]
        no_validate: bool,
    },
    /// Compile a graph file and drive it through its lifecycle
    Run {
        /// Path to the graph YAML file
        file: PathBuf,
        /// Asset to run; defaults to the last one in the file
        #[arg(long)]
        asset: Option<String>,
        /// Skip graph validation
        #[arg(long)]
        no_validate: bool,
    },
}

struct CliHost {
    name: String,
}

impl BlueprintHost for CliHost {
    fn name(&self) -> &str {
        &self.name
    }
}

fn select_asset(library: &AssetLibrary, asset: Option<&str>) -> anyhow::Result<Rc<BlueprintAsset>> {
    match asset {
        Some(id) => library.get(id).ok_or_else(|| anyhow!("Asset '{}' not found", id)),
        None => library.root().ok_or_else(|| anyhow!("Graph file declares no assets")),
    }
}

fn compile(file: &Path, asset: Option<&str>, validate: bool) -> anyhow::Result<RuntimeBlueprint> {
    info!("Loading graph from: {:?}", file);
    let registry = NodeRegistry::with_builtin();
    let library = loader::load_assets_from_yaml(&file.to_string_lossy(), &registry)?;
    let asset = select_asset(&library, asset)?;

    let compiler = Compiler::with_options(CompileOptions {
        validate,
        ..CompileOptions::default()
    });
    let factory = BlueprintFactory::shared();
    let blueprint = compiler
        .compile(&*asset, &factory)
        .with_context(|| format!("Failed to compile asset '{}'", asset.id()))?;
    Ok(blueprint)
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Compile {
            file,
            asset,
            json,
            no_validate,
        } => {
            let blueprint = compile(file, asset.as_deref(), !no_validate)?;
            let table = blueprint.link_storage().to_table();

            if *json {
                println!("{}", serde_json::to_string_pretty(&table)?);
            } else {
                println!("blueprint {} ({} nodes)", blueprint.id(), blueprint.node_count());
                for entry in table {
                    let targets: Vec<String> = entry.links.iter().map(ToString::to_string).collect();
                    println!("  {} -> {}", entry.port, targets.join(", "));
                }
            }
            blueprint.destroy();
        }
        Commands::Run {
            file,
            asset,
            no_validate,
        } => {
            let blueprint = compile(file, asset.as_deref(), !no_validate)?;
            let host = Rc::new(CliHost {
                name: format!("cli:{}", blueprint.id()),
            });

            blueprint.initialize(host);
            blueprint.set_enabled(true);
            blueprint.start();
            blueprint.deinitialize();
            info!("Finished blueprint: {}", blueprint.id());
            blueprint.destroy();
        }
    }

    Ok(())
}
