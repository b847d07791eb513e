use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use photomark::config::{default_config_path, Config};
use photomark::export::{overwrites_source, Execution, ExportPipeline};
use photomark::import::{collect_sources, list_importable_extensions};
use photomark::preview::PreviewSession;
use photomark::settings::{Color, NamingRule, OutputFormat, WatermarkMode, WatermarkSettings};
use photomark::store::{LoadStatus, TemplateStore};
use photomark::watermark::{AssetCache, FontBook, WatermarkCompositor};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// photomark - batch photo watermarking
#[derive(Parser, Debug)]
#[command(name = "photomark")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (default: <user config dir>/photomark/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List importable file extensions
    Formats,

    /// List installed font families usable with --font
    Fonts,

    /// Watermark one image and write the result as PNG
    Preview {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// Watermark files and folders into an output directory
    Export {
        #[arg(short = 'o', long)]
        output_dir: PathBuf,

        /// Process files one at a time
        #[arg(long)]
        sequential: bool,

        /// Allow exporting into a folder that holds source images
        #[arg(long)]
        allow_overwrite: bool,

        /// Image files or folders
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// Manage saved templates
    Template {
        #[command(subcommand)]
        action: TemplateAction,
    },
}

#[derive(Subcommand, Debug)]
enum TemplateAction {
    /// List template names
    List,

    /// Print a template as JSON
    Show { name: String },

    /// Save the resolved settings under a name
    Save {
        name: String,

        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// Delete a template
    Delete { name: String },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum ModeArg {
    Text,
    Image,
}

/// Settings source and per-field overrides.
#[derive(Args, Debug)]
struct SettingsArgs {
    /// Start from a saved template instead of the last-used settings
    #[arg(short, long)]
    template: Option<String>,

    /// Ignore the last-used settings and start from defaults
    #[arg(long)]
    defaults: bool,

    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Text to draw (selects text mode)
    #[arg(long)]
    text: Option<String>,

    #[arg(long)]
    font: Option<String>,

    /// Font size in points
    #[arg(long)]
    size: Option<u32>,

    #[arg(long)]
    bold: Option<bool>,

    #[arg(long)]
    italic: Option<bool>,

    /// Text colour as #RGB or #RRGGBB
    #[arg(long)]
    color: Option<Color>,

    #[arg(long)]
    shadow: Option<bool>,

    #[arg(long)]
    shadow_color: Option<Color>,

    /// Watermark image (selects image mode)
    #[arg(long)]
    image: Option<PathBuf>,

    /// Watermark image scale factor
    #[arg(long)]
    scale: Option<f32>,

    /// Opacity of the active mode, 0.0 to 1.0
    #[arg(long)]
    opacity: Option<f32>,

    /// Horizontal position, 0 (left) to 100 (right)
    #[arg(long)]
    position_x: Option<u8>,

    /// Vertical position, 0 (top) to 100 (bottom)
    #[arg(long)]
    position_y: Option<u8>,

    /// Clockwise rotation in degrees
    #[arg(long)]
    rotation: Option<u16>,

    /// Output format: jpeg or png
    #[arg(long)]
    format: Option<OutputFormat>,

    /// JPEG quality, 0.0 to 1.0
    #[arg(long)]
    quality: Option<f32>,

    /// Naming rule: original, prefix or suffix
    #[arg(long)]
    naming: Option<NamingRule>,

    /// Text used by the prefix and suffix naming rules
    #[arg(long)]
    custom_text: Option<String>,
}

impl SettingsArgs {
    /// Resolve the starting settings and apply the overrides.
    fn resolve(&self, store: &TemplateStore) -> Result<WatermarkSettings> {
        let mut settings = match &self.template {
            Some(name) => store
                .load(name)
                .with_context(|| format!("No template named '{}'", name))?,
            None if self.defaults => WatermarkSettings::default(),
            None => store.load_last_used().unwrap_or_default(),
        };

        if let Some(text) = &self.text {
            settings.mode = WatermarkMode::Text;
            settings.text.content = text.clone();
        }
        if let Some(image) = &self.image {
            settings.mode = WatermarkMode::Image;
            settings.image.path = Some(image.clone());
        }
        if let Some(mode) = self.mode {
            settings.mode = match mode {
                ModeArg::Text => WatermarkMode::Text,
                ModeArg::Image => WatermarkMode::Image,
            };
        }

        let text = &mut settings.text;
        apply(&mut text.font_family, self.font.clone());
        apply(&mut text.font_size_pt, self.size);
        apply(&mut text.bold, self.bold);
        apply(&mut text.italic, self.italic);
        apply(&mut text.color, self.color);
        apply(&mut text.shadow_enabled, self.shadow);
        apply(&mut text.shadow_color, self.shadow_color);

        apply(&mut settings.image.scale, self.scale);
        if let Some(opacity) = self.opacity {
            match settings.mode {
                WatermarkMode::Text => settings.text.opacity = opacity,
                WatermarkMode::Image => settings.image.opacity = opacity,
            }
        }

        let placement = &mut settings.placement;
        apply(&mut placement.position_x, self.position_x);
        apply(&mut placement.position_y, self.position_y);
        apply(&mut placement.rotation_deg, self.rotation);

        let export = &mut settings.export;
        apply(&mut export.output_format, self.format);
        apply(&mut export.jpeg_quality, self.quality);
        apply(&mut export.naming_rule, self.naming);
        apply(&mut export.custom_text, self.custom_text.clone());

        Ok(settings.normalized()?)
    }
}

fn apply<T>(field: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *field = value;
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let config = Config::load_or_default(&config_path)
        .with_context(|| format!("Failed to load configuration {}", config_path.display()))?;

    if let Err(e) = photomark::logging::init_subscriber(&config.logging) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    tracing::debug!(
        config_file = %config_path.display(),
        store_dir = %config.store_dir().display(),
        font_dirs = config.fonts.dirs.len(),
        "Configuration loaded"
    );

    let store = TemplateStore::open_dir(config.store_dir());
    if store.load_status() == LoadStatus::Reset {
        eprintln!(
            "warning: saved settings in {} were unreadable and have been reset",
            config.store_dir().display()
        );
    }

    match cli.command {
        Command::Formats => {
            for ext in list_importable_extensions() {
                println!("{}", ext);
            }
            Ok(())
        }
        Command::Fonts => {
            for family in build_font_book(&config).family_names() {
                println!("{}", family);
            }
            Ok(())
        }
        Command::Preview {
            input,
            output,
            settings,
        } => {
            let settings = settings.resolve(&store)?;
            run_preview(&config, &input, &output, settings)
        }
        Command::Export {
            output_dir,
            sequential,
            allow_overwrite,
            inputs,
            settings,
        } => {
            let settings = settings.resolve(&store)?;
            let options = ExportOptions {
                output_dir,
                sequential,
                allow_overwrite,
            };
            run_export(&config, &store, &inputs, options, settings)
        }
        Command::Template { action } => run_template(&store, action),
    }
}

fn build_font_book(config: &Config) -> Arc<FontBook> {
    if config.fonts.dirs.is_empty() {
        FontBook::system()
    } else {
        Arc::new(FontBook::with_dirs(&config.fonts.dirs))
    }
}

fn build_compositor(config: &Config) -> WatermarkCompositor {
    WatermarkCompositor::new(build_font_book(config), Arc::new(AssetCache::default()))
}

fn run_preview(
    config: &Config,
    input: &Path,
    output: &Path,
    settings: WatermarkSettings,
) -> Result<()> {
    let mut session = PreviewSession::open(build_compositor(config), input)?;
    let frame = session.apply_settings(settings);
    if let Some(diagnostic) = session.diagnostics() {
        eprintln!("warning: {}", diagnostic);
    }

    let mut png = WatermarkSettings::default();
    png.export.output_format = OutputFormat::Png;
    ExportPipeline::new(session.compositor().clone(), ".")
        .encode_to_path(&frame, &png, output)?;

    println!("{}", output.display());
    Ok(())
}

struct ExportOptions {
    output_dir: PathBuf,
    sequential: bool,
    allow_overwrite: bool,
}

fn run_export(
    config: &Config,
    store: &TemplateStore,
    inputs: &[PathBuf],
    options: ExportOptions,
    settings: WatermarkSettings,
) -> Result<()> {
    let sources = collect_sources(inputs)?;
    if sources.is_empty() {
        bail!("No importable images found");
    }
    if !options.allow_overwrite && overwrites_source(&sources, &options.output_dir) {
        bail!(
            "{} contains source images and may overwrite them; pass --allow-overwrite to continue",
            options.output_dir.display()
        );
    }

    let compositor = build_compositor(config);
    if let Err(diagnostic) = compositor.check_asset(&settings) {
        eprintln!("warning: {}", diagnostic);
    }

    let pipeline = ExportPipeline::new(compositor, &options.output_dir)
        .with_background(config.export.jpeg_background)
        .with_threads(config.export.threads);
    let execution = if options.sequential || !config.export.parallel {
        Execution::Sequential
    } else {
        Execution::Parallel
    };

    let report = pipeline.export_batch(&sources, &settings, execution);

    if let Err(e) = store.save_last_used(&settings) {
        eprintln!("warning: could not remember these settings: {}", e);
    }

    for (_, output) in report.succeeded() {
        println!("{}", output.display());
    }
    for (source, error) in report.failed() {
        eprintln!("error: {}: {}", source.display(), error);
    }

    if !report.is_success() {
        bail!(
            "{} of {} files failed",
            report.failure_count(),
            report.len()
        );
    }
    Ok(())
}

fn run_template(store: &TemplateStore, action: TemplateAction) -> Result<()> {
    match action {
        TemplateAction::List => {
            for name in store.list_names() {
                println!("{}", name);
            }
        }
        TemplateAction::Show { name } => {
            let settings = store
                .load(&name)
                .with_context(|| format!("No template named '{}'", name))?;
            println!("{}", settings.to_json()?);
        }
        TemplateAction::Save { name, settings } => {
            let settings = settings.resolve(store)?;
            store.save(&name, &settings)?;
        }
        TemplateAction::Delete { name } => {
            if !store.delete(&name)? {
                bail!("No template named '{}'", name);
            }
        }
    }
    Ok(())
}
