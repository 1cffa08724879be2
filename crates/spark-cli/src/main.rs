use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use indexmap::IndexMap;
use spark_core::{
    compile_module, detect_color_mode, ColorMode, DesignModule, FeatureConfig, SparkConfig, StyleRegistry,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sparkc", version, about = "Compile design modules into CSS")]
struct Cli {
    /// Increase log output (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile modules, in order, into one stylesheet.
    Build(BuildArgs),
    /// Print the class trees of one module as JSON.
    Classes(ClassesArgs),
    /// Print the custom properties of one module, resolved for a color mode.
    Tokens(TokensArgs),
}

#[derive(Parser, Debug)]
struct BuildArgs {
    /// Design module YAML files.
    #[arg(required = true)]
    modules: Vec<PathBuf>,

    /// Engine configuration YAML.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output CSS path. Writes to stdout when omitted.
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Write every module's class trees as JSON to this path.
    #[arg(long)]
    classes: Option<PathBuf>,

    /// Drop optional whitespace from the output.
    #[arg(long, default_value_t = false)]
    minify: bool,
}

#[derive(Parser, Debug)]
struct ClassesArgs {
    /// Design module YAML file.
    module: PathBuf,

    /// Engine configuration YAML.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct TokensArgs {
    /// Design module YAML file.
    module: PathBuf,

    /// Engine configuration YAML.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Color mode to resolve. `auto` follows the OS preference.
    #[arg(long, value_enum, default_value_t = ModeArg::Auto)]
    mode: ModeArg,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Auto,
    Light,
    Dark,
}

impl ModeArg {
    fn resolve(self) -> ColorMode {
        match self {
            ModeArg::Auto => detect_color_mode(),
            ModeArg::Light => ColorMode::Light,
            ModeArg::Dark => ColorMode::Dark,
        }
    }
}

#[derive(Debug)]
struct Build {
    css: String,
    classes: IndexMap<String, serde_json::Value>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Build(args) => cmd_build(args),
        Command::Classes(args) => cmd_classes(args),
        Command::Tokens(args) => cmd_tokens(args),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_build(args: BuildArgs) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if args.minify {
        config.emit.minify = true;
    }
    let build = compile(&args.modules, config)?;

    match &args.out {
        Some(path) => write_file(path, &build.css)?,
        None => print!("{}", build.css),
    }
    if let Some(path) = &args.classes {
        let json = serde_json::to_string_pretty(&build.classes).context("serialize class trees")?;
        write_file(path, &json)?;
    }
    Ok(())
}

fn cmd_classes(args: ClassesArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    let build = compile(std::slice::from_ref(&args.module), config)?;
    let classes = build.classes.into_values().next().unwrap_or_default();
    println!(
        "{}",
        serde_json::to_string_pretty(&classes).context("serialize class trees")?
    );
    Ok(())
}

fn cmd_tokens(args: TokensArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    let mode = args.mode.resolve();
    let table = resolve_tokens(&args.module, config, mode)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&table).context("serialize custom properties")?
    );
    Ok(())
}

fn resolve_tokens(
    path: &Path,
    config: SparkConfig,
    mode: ColorMode,
) -> anyhow::Result<IndexMap<String, String>> {
    let mut registry = StyleRegistry::with_config(config).context("invalid configuration")?;
    let feature = compile_one(&mut registry, path)?;
    info!(module = %feature.name, %mode, "resolving custom properties");

    let Some(token) = feature.tokens(mode) else {
        return Ok(IndexMap::new());
    };
    let table = registry
        .token_table(token)
        .with_context(|| format!("resolve custom properties of '{}'", feature.name))?;
    Ok(table
        .into_iter()
        .map(|(name, value)| (name, value.to_string()))
        .collect())
}

fn compile_one(registry: &mut StyleRegistry, path: &Path) -> anyhow::Result<FeatureConfig> {
    let module = DesignModule::from_file(path)
        .with_context(|| format!("load module '{}'", path.display()))?;
    compile_module(registry, &module).with_context(|| format!("compile module '{}'", path.display()))
}

fn load_config(path: Option<&Path>) -> anyhow::Result<SparkConfig> {
    match path {
        Some(path) => SparkConfig::from_file(path)
            .with_context(|| format!("load config '{}'", path.display())),
        None => Ok(SparkConfig::default()),
    }
}

fn compile(modules: &[PathBuf], config: SparkConfig) -> anyhow::Result<Build> {
    let mut registry = StyleRegistry::with_config(config).context("invalid configuration")?;
    let mut classes = IndexMap::new();

    for path in modules {
        let feature = compile_one(&mut registry, path)?;
        if classes.contains_key(&feature.name) {
            bail!("module name '{}' is used twice", feature.name);
        }
        let trees = serde_json::to_value(feature.classes()).context("serialize class trees")?;
        info!(module = %feature.name, "compiled");
        classes.insert(feature.name.clone(), trees);
    }

    Ok(Build {
        css: registry.to_css(),
        classes,
    })
}

fn write_file(path: &Path, content: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(path, content).with_context(|| format!("write '{}'", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CARD: &str = "
prefix: spark-card
properties:
  gap: 4px
component:
  styles:
    gap: var(--spark-card-gap)
    base:
      padding: 2px
";

    const CHIP: &str = "
name: chip
prefix: spark-chip
component:
  styles:
    label:
      color: gray
  variants:
    active:
      label:
        color: blue
";

    fn module(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_cli_parses_build() {
        let cli = Cli::try_parse_from([
            "sparkc", "-vv", "build", "a.yaml", "b.yaml", "-o", "out.css", "--minify",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.cmd {
            Command::Build(args) => {
                assert_eq!(args.modules.len(), 2);
                assert_eq!(args.out, Some(PathBuf::from("out.css")));
                assert!(args.minify);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_cli_requires_modules() {
        assert!(Cli::try_parse_from(["sparkc", "build"]).is_err());
    }

    #[test]
    fn test_compile_modules_in_order() {
        let dir = TempDir::new().unwrap();
        let card = module(&dir, "card.yaml", CARD);
        let chip = module(&dir, "chip.yaml", CHIP);

        let build = compile(&[card, chip], SparkConfig::default()).unwrap();
        assert!(build.css.find(".spark-card-base").unwrap() < build.css.find(".spark-chip-label").unwrap());
        assert_eq!(build.classes["card"]["component"]["base"]["$"], "spark-card-base");
        assert_eq!(build.classes["chip"]["variants"]["active"]["label"]["$"], "spark-chip-label");
    }

    #[test]
    fn test_same_module_twice_collides() {
        let dir = TempDir::new().unwrap();
        let card = module(&dir, "card.yaml", CARD);
        let err = compile(&[card.clone(), card], SparkConfig::default()).unwrap_err();
        assert!(format!("{:#}", err).contains("already owned"));
    }

    #[test]
    fn test_duplicate_module_names() {
        let dir = TempDir::new().unwrap();
        let first = module(&dir, "first.yaml", "name: shared\nprefix: one\n");
        let second = module(&dir, "second.yaml", "name: shared\nprefix: two\n");
        let err = compile(&[first, second], SparkConfig::default()).unwrap_err();
        assert!(err.to_string().contains("used twice"));
    }

    #[test]
    fn test_build_writes_outputs() {
        let dir = TempDir::new().unwrap();
        let card = module(&dir, "card.yaml", CARD);
        let out = dir.path().join("dist/app.css");
        let classes = dir.path().join("dist/classes.json");

        cmd_build(BuildArgs {
            modules: vec![card],
            config: None,
            out: Some(out.clone()),
            classes: Some(classes.clone()),
            minify: true,
        })
        .unwrap();

        let css = std::fs::read_to_string(out).unwrap();
        assert_eq!(
            css,
            ":root{--spark-card-gap:4px}.spark-card{gap:var(--spark-card-gap)}.spark-card-base{padding:2px}"
        );
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(classes).unwrap()).unwrap();
        assert_eq!(json["card"]["component"]["$"], "spark-card");
    }

    #[test]
    fn test_cli_parses_tokens_mode() {
        let cli = Cli::try_parse_from(["sparkc", "tokens", "a.yaml", "--mode", "dark"]).unwrap();
        match cli.cmd {
            Command::Tokens(args) => assert_eq!(args.mode, ModeArg::Dark),
            other => panic!("unexpected {:?}", other),
        }
        let cli = Cli::try_parse_from(["sparkc", "tokens", "a.yaml"]).unwrap();
        match cli.cmd {
            Command::Tokens(args) => assert_eq!(args.mode, ModeArg::Auto),
            other => panic!("unexpected {:?}", other),
        }
        assert!(Cli::try_parse_from(["sparkc", "tokens", "a.yaml", "--mode", "dim"]).is_err());
    }

    #[test]
    fn test_auto_mode_uses_detector() {
        spark_core::set_theme_detector(|| ColorMode::Dark);
        assert_eq!(ModeArg::Auto.resolve(), ColorMode::Dark);
        spark_core::set_theme_detector(|| ColorMode::Light);
        assert_eq!(ModeArg::Auto.resolve(), ColorMode::Light);
        assert_eq!(ModeArg::Dark.resolve(), ColorMode::Dark);
    }

    #[test]
    fn test_resolve_tokens_per_mode() {
        let dir = TempDir::new().unwrap();
        let path = module(
            &dir,
            "drawer.yaml",
            "prefix: drawer\nproperties:\n  width: 320px\n  bg: white\nmodes:\n  dark:\n    bg: black\n",
        );
        let dark = resolve_tokens(&path, SparkConfig::default(), ColorMode::Dark).unwrap();
        assert_eq!(dark["--drawer-bg"], "black");
        assert_eq!(dark["--drawer-width"], "320px");
        let light = resolve_tokens(&path, SparkConfig::default(), ColorMode::Light).unwrap();
        assert_eq!(light["--drawer-bg"], "white");

        let bare = module(&dir, "bare.yaml", "prefix: bare\n");
        assert!(resolve_tokens(&bare, SparkConfig::default(), ColorMode::Dark)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_config_error_names_file() {
        let dir = TempDir::new().unwrap();
        let config = module(&dir, "spark.yaml", "mode_attribute: 'bad attr'\n");
        let err = load_config(Some(config.as_path())).unwrap_err();
        assert!(format!("{:#}", err).contains("spark.yaml"));
    }
}
