use anyhow::{Context, Result, bail};
use markdown_weaver_config::Config;
use markdown_weaver_engine::{CommandKernel, ConverterBuilder};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

const USAGE: &str = "[--config PATH] [--out-dir DIR] [--write-config PATH] [FILE...]";

#[derive(Debug, Default, PartialEq, Eq)]
struct Args {
    config: Option<PathBuf>,
    out_dir: Option<PathBuf>,
    files: Vec<PathBuf>,
    write_config: Option<PathBuf>,
    help: bool,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Args> {
    let mut parsed = Args::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => parsed.help = true,
            "--config" => {
                let Some(path) = args.next() else {
                    bail!("--config requires a path");
                };
                parsed.config = Some(PathBuf::from(path));
            }
            "--out-dir" => {
                let Some(dir) = args.next() else {
                    bail!("--out-dir requires a directory");
                };
                parsed.out_dir = Some(PathBuf::from(dir));
            }
            "--write-config" => {
                let Some(path) = args.next() else {
                    bail!("--write-config requires a path");
                };
                parsed.write_config = Some(PathBuf::from(path));
            }
            flag if flag.starts_with("--") => bail!("Unknown option '{flag}'"),
            file => parsed.files.push(PathBuf::from(file)),
        }
    }
    Ok(parsed)
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from_path(path)?
            .with_context(|| format!("Config file not found: {}", path.display())),
        None => {
            log::debug!("Config path: {}", Config::config_path().display());
            Ok(Config::load()?.unwrap_or_default())
        }
    }
}

fn kernel(config: &Config) -> CommandKernel {
    config
        .renderer("jupyter")
        .and_then(|table| table.get("kernel_name"))
        .and_then(toml::Value::as_table)
        .map(CommandKernel::from_table)
        .unwrap_or_default()
}

fn run(args: Args) -> Result<()> {
    let config = load_config(args.config.as_deref())?;

    if let Some(target) = &args.write_config {
        config
            .save_to_path(target)
            .with_context(|| format!("Failed to write config {}", target.display()))?;
        log::info!("Wrote config {}", target.display());
        return Ok(());
    }

    let files = if args.files.is_empty() {
        let root = env::current_dir()?;
        config.source_files(&root)?
    } else {
        args.files
    };
    if files.is_empty() {
        bail!("No input files given and no sources configured");
    }

    let out_dir = args.out_dir.or_else(|| config.output_dir.clone());
    if let Some(dir) = &out_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    }

    let mut converter = ConverterBuilder::standard(Box::new(kernel(&config)))?.build(&config)?;
    for path in &files {
        let converted = converter
            .convert_from_file(path, None)
            .with_context(|| format!("Failed to convert {}", path.display()))?;
        match &out_dir {
            Some(dir) => {
                let name = path
                    .file_name()
                    .with_context(|| format!("Not a file: {}", path.display()))?;
                let target = dir.join(name);
                fs::write(&target, converted.output())?;
                log::info!("Wrote {}", target.display());
            }
            None => print!("{}", converted.output()),
        }
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let mut args = env::args();
    let program_name = args
        .next()
        .unwrap_or_else(|| "markdown-weaver".to_string());

    let args = match parse_args(args) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Usage: {program_name} {USAGE}");
            process::exit(2);
        }
    };
    if args.help {
        println!("Usage: {program_name} {USAGE}");
        return;
    }

    if let Err(e) = run(args) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
