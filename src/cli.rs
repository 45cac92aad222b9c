use crate::config::{Config, load_config};
use crate::ir::parse_mindmap;
use crate::layout::FontMetrics;
use crate::layout_dump::write_layout_dump;
use crate::render::{render_svg, write_output_svg};
use crate::surface::{FixedContainer, MindMap};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mindsvg", version, about = "Mind-map renderer in Rust")]
pub struct Args {
    /// Input mind-map JSON file or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file (svg/png). Defaults to stdout for SVG if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON5 file (theme, themeVariables, configs)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Container width
    #[arg(short = 'w', long = "width")]
    pub width: Option<f32>,

    /// Container height
    #[arg(short = 'H', long = "height")]
    pub height: Option<f32>,

    /// Fold every topic at this depth or deeper
    #[arg(long = "fold-level", default_value_t = 0)]
    pub fold_level: i32,

    /// Extra class name put on the content group
    #[arg(long = "theme")]
    pub theme: Option<String>,

    /// Measure text with system fonts instead of the built-in width table
    #[arg(long = "font-metrics")]
    pub font_metrics: bool,

    /// Write the computed layout as JSON to this path
    #[arg(long = "dump-layout")]
    pub dump_layout: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Svg,
    Png,
}

pub fn run() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;
    if let Some(width) = args.width {
        config.render.width = width;
    }
    if let Some(height) = args.height {
        config.render.height = height;
    }

    let input = read_input(args.input.as_deref())?;
    let data = parse_mindmap(&input)?;
    let mut map = build_surface(&config, &args);
    map.show(&data);
    if args.fold_level > 0 {
        map.fold(args.fold_level);
        map.to_center(None);
    }
    tracing::debug!(topics = map.topics().count(), "rendering");

    if let Some(path) = &args.dump_layout {
        write_layout_dump(path, &map)?;
    }

    let svg = render_svg(&map, &config.theme);
    map.release();
    match args.output_format {
        OutputFormat::Svg => {
            write_output_svg(&svg, args.output.as_deref())?;
        }
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            write_png(&svg, &output, &config)?;
        }
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn build_surface(config: &Config, args: &Args) -> MindMap {
    let container = FixedContainer::new(config.render.width, config.render.height);
    let mut map = MindMap::new(Rc::new(container));
    map.set_configs(config.configs.iter().map(|(key, value)| (key.as_str(), Some(*value))));
    map.set_theme(args.theme.as_deref());
    if args.font_metrics {
        map.set_measure(Box::new(FontMetrics::new(&config.theme.font_family)));
    }
    map
}

#[cfg(feature = "png")]
fn write_png(svg: &str, output: &Path, config: &Config) -> Result<()> {
    crate::render::write_output_png(svg, output, &config.render, &config.theme)
}

#[cfg(not(feature = "png"))]
fn write_png(_svg: &str, _output: &Path, _config: &Config) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path != Path::new("-") {
            return Ok(std::fs::read_to_string(path)?);
        }
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_flags() {
        let args = Args::try_parse_from([
            "mindsvg", "-i", "map.json", "-e", "png", "-o", "out.png", "-w", "640", "-H", "480",
            "--fold-level", "2", "--theme", "dark",
        ])
        .unwrap();
        assert_eq!(args.input, Some(PathBuf::from("map.json")));
        assert!(matches!(args.output_format, OutputFormat::Png));
        assert_eq!(args.width, Some(640.0));
        assert_eq!(args.fold_level, 2);
        assert_eq!(args.theme.as_deref(), Some("dark"));
    }

    #[test]
    fn png_needs_an_output_path() {
        assert!(ensure_output(&None, "png").is_err());
        assert_eq!(
            ensure_output(&Some(PathBuf::from("a.png")), "png").unwrap(),
            PathBuf::from("a.png")
        );
    }
}
