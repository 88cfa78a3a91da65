use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{ArgAction, Args, Parser, Subcommand};
use globset::{Glob, GlobSetBuilder};
use glyph_sheet_core::prelude::*;
use handlebars::Handlebars;
use image::RgbaImage;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(
    name = "glyph-sheet",
    about = "Detect characters on drawn sheets and turn them into bitmap fonts",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Show progress bars (disable with --progress false or --quiet)
    #[arg(long, default_value_t = true, action=ArgAction::Set, global=true, help_heading = "Logging/UX")]
    progress: bool,
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action=ArgAction::Count, global=true, help_heading = "Logging/UX")]
    verbose: u8,
    /// Quiet mode (overrides verbose)
    #[arg(
        short,
        long,
        default_value_t = false,
        global = true,
        help_heading = "Logging/UX"
    )]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Detect glyphs on one sheet or a directory of sheets and write metadata
    Detect(DetectArgs),
    /// Repack an existing glyph set (.fnt or .json) from its source image
    Pack(PackArgs),
    /// Detect, pack and write atlas + metadata in one go
    Build(BuildArgs),
    /// Simple timing bench (detect + pack once per sheet)
    Bench(BenchArgs),
}

#[derive(Args, Debug, Clone)]
struct DetectFlags {
    /// Ink threshold (alpha on transparent sheets, RGB distance otherwise)
    #[arg(long, default_value_t = DEFAULT_TOLERANCE, help_heading = "Detection")]
    tolerance: u32,
    /// Skip merging of multi-part characters
    #[arg(long, default_value_t = false, help_heading = "Detection")]
    no_merge: bool,
    /// Vertical overlap still treated as a gap between parts
    #[arg(long, default_value_t = 5, help_heading = "Detection")]
    vertical_overlap: u32,
    /// Minimum allowed gap between parts
    #[arg(long, default_value_t = 5, help_heading = "Detection")]
    min_gap: u32,
    /// Allowed gap relative to the taller part
    #[arg(long, default_value_t = 0.5, help_heading = "Detection")]
    gap_ratio: f64,
    /// Y bucket size for reading order
    #[arg(long, default_value_t = 20, help_heading = "Detection")]
    row_bucket: u32,
    /// Row join reach is max(h, row_h) / divisor
    #[arg(long, default_value_t = 1.5, help_heading = "Detection")]
    row_join_divisor: f64,
}

impl DetectFlags {
    fn to_config(&self) -> DetectConfig {
        DetectConfig::builder()
            .tolerance(self.tolerance)
            .merge(!self.no_merge)
            .vertical_overlap(self.vertical_overlap)
            .min_gap(self.min_gap)
            .gap_ratio(self.gap_ratio)
            .row_bucket(self.row_bucket)
            .row_join_divisor(self.row_join_divisor)
            .build()
    }
}

#[derive(Args, Debug, Clone)]
struct PackFlags {
    /// Padding around the atlas border and between glyphs
    #[arg(long, default_value_t = 2, help_heading = "Packing")]
    padding: u32,
    /// Smallest atlas width (power of two)
    #[arg(long, default_value_t = 128, help_heading = "Packing")]
    min_width: u32,
    /// Multiplier on summed glyph area when sizing the atlas
    #[arg(long, default_value_t = 1.1, help_heading = "Packing")]
    area_slack: f64,
    /// Draw red outlines (debug)
    #[arg(long, default_value_t = false, help_heading = "Packing")]
    outlines: bool,
}

impl PackFlags {
    fn to_config(&self) -> PackConfig {
        PackConfig::builder()
            .padding(self.padding)
            .min_width(self.min_width)
            .area_slack(self.area_slack)
            .outlines(self.outlines)
            .build()
    }
}

#[derive(Args, Debug, Clone)]
struct FontFlags {
    /// Font face name
    #[arg(long, help_heading = "Font")]
    face: Option<String>,
    /// Nominal font size
    #[arg(long, help_heading = "Font")]
    size: Option<u32>,
    #[arg(long, default_value_t = false, help_heading = "Font")]
    bold: bool,
    #[arg(long, default_value_t = false, help_heading = "Font")]
    italic: bool,
    /// Line height (derived from glyphs when omitted)
    #[arg(long, help_heading = "Font")]
    line_height: Option<u32>,
    /// Baseline (defaults to the line height)
    #[arg(long, help_heading = "Font")]
    base: Option<u32>,
    /// Extra advance per glyph, may be negative
    #[arg(long, allow_hyphen_values = true, help_heading = "Font")]
    tracking: Option<i32>,
}

impl FontFlags {
    fn apply(&self, mut info: FontInfo) -> FontInfo {
        if let Some(v) = &self.face {
            info.face = v.clone();
        }
        if let Some(v) = self.size {
            info.size = v;
        }
        if self.bold {
            info.bold = true;
        }
        if self.italic {
            info.italic = true;
        }
        if let Some(v) = self.line_height {
            info.line_height = v;
        }
        if let Some(v) = self.base {
            info.base = v;
        }
        if let Some(v) = self.tracking {
            info.tracking = v;
        }
        info
    }
}

#[derive(Args, Debug, Clone)]
struct LabelFlags {
    /// Characters to assign in reading order (whitespace skipped)
    #[arg(long, help_heading = "Labels")]
    chars: Option<String>,
    /// Read the character sequence from a UTF-8 file
    #[arg(long, conflicts_with = "chars", help_heading = "Labels")]
    chars_file: Option<PathBuf>,
    /// Copy labels from a previous .fnt/.json when the glyph count matches
    #[arg(long, help_heading = "Labels")]
    carry_labels: Option<PathBuf>,
    /// Recognizer command; receives batch PNG paths as arguments and prints
    /// a JSON array of {"index", "character"} on stdout
    #[arg(long, help_heading = "Labels")]
    identify_cmd: Option<String>,
    /// Images per recognizer call
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE, help_heading = "Labels")]
    batch_size: usize,
}

impl LabelFlags {
    fn sequence(&self) -> anyhow::Result<Option<String>> {
        if let Some(text) = &self.chars {
            return Ok(Some(text.clone()));
        }
        match &self.chars_file {
            Some(path) => Ok(Some(
                fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?,
            )),
            None => Ok(None),
        }
    }
}

#[derive(Args, Debug, Clone)]
struct OutputFlags {
    /// Output directory
    #[arg(short, long, default_value = "out", help_heading = "Input/Output")]
    out_dir: PathBuf,
    /// Base name for written files (defaults to the sheet's file stem)
    #[arg(short, long, help_heading = "Input/Output")]
    name: Option<String>,
    /// YAML config file path (overrides detection/packing/font options)
    #[arg(long, help_heading = "Input/Output")]
    config: Option<PathBuf>,
    /// Metadata format: fnt | json | template
    #[arg(long, default_value = "fnt", value_parser = ["fnt", "json", "template"], help_heading = "Export")]
    metadata: String,
    /// External template file (handlebars), used when --metadata template
    #[arg(long, help_heading = "Export")]
    template: Option<PathBuf>,
    /// Print the merged configuration (after CLI/YAML) and exit
    #[arg(long, default_value_t = false, help_heading = "Export")]
    print_config: bool,
    /// Output format for --print-config: json|yaml
    #[arg(long, default_value = "json", value_parser = ["json", "yaml"], help_heading = "Export")]
    print_config_format: String,
    /// Dry run: compute glyphs and stats but do not write files
    #[arg(long, default_value_t = false, help_heading = "Export")]
    dry_run: bool,
}

#[derive(Parser, Debug, Clone)]
struct DetectArgs {
    /// Input sheet or directory of sheets
    #[arg(help_heading = "Input/Output")]
    input: PathBuf,
    /// Include patterns (glob). If set, only files matching any pattern are considered
    #[arg(long, help_heading = "Input/Output")]
    include: Vec<String>,
    /// Exclude patterns (glob). Files matching any pattern will be ignored
    #[arg(long, help_heading = "Input/Output")]
    exclude: Vec<String>,
    #[command(flatten)]
    detect: DetectFlags,
    #[command(flatten)]
    labels: LabelFlags,
    #[command(flatten)]
    font: FontFlags,
    #[command(flatten)]
    output: OutputFlags,
}

#[derive(Parser, Debug, Clone)]
struct PackArgs {
    /// Image the glyph rectangles refer to
    #[arg(help_heading = "Input/Output")]
    image: PathBuf,
    /// Glyph set to repack (.fnt or .json)
    #[arg(long, help_heading = "Input/Output")]
    glyphs: PathBuf,
    #[command(flatten)]
    pack: PackFlags,
    #[command(flatten)]
    font: FontFlags,
    #[command(flatten)]
    output: OutputFlags,
}

#[derive(Parser, Debug, Clone)]
struct BuildArgs {
    /// Input sheet
    #[arg(help_heading = "Input/Output")]
    image: PathBuf,
    #[command(flatten)]
    detect: DetectFlags,
    #[command(flatten)]
    pack: PackFlags,
    #[command(flatten)]
    labels: LabelFlags,
    #[command(flatten)]
    font: FontFlags,
    #[command(flatten)]
    output: OutputFlags,
}

#[derive(Parser, Debug, Clone)]
struct BenchArgs {
    /// Input sheet or directory
    input: PathBuf,
    /// Skip the merge pass
    #[arg(long, default_value_t = false)]
    no_merge: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing_with_level(cli.quiet, cli.verbose);
    let show_progress = cli.progress && !cli.quiet;
    match &cli.command {
        Commands::Detect(args) => run_detect(args, show_progress),
        Commands::Pack(args) => run_pack(args),
        Commands::Build(args) => run_build(args),
        Commands::Bench(b) => run_bench(b, show_progress),
    }
}

// ---------------- Settings ----------------

#[derive(Debug, Clone, Serialize)]
struct Settings {
    detect: DetectConfig,
    pack: PackConfig,
    font: FontInfo,
}

impl Settings {
    fn resolve(
        detect: DetectConfig,
        pack: PackConfig,
        font: FontInfo,
        config: Option<&Path>,
    ) -> anyhow::Result<Self> {
        let mut settings = Settings { detect, pack, font };
        if let Some(path) = config {
            let file =
                fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
            let y: YamlConfig = serde_yaml::from_str(&file)
                .with_context(|| format!("parse {}", path.display()))?;
            y.apply(&mut settings);
        }
        settings.detect.validate()?;
        settings.pack.validate()?;
        Ok(settings)
    }

    /// Prints the settings when requested; returns true if the caller should stop.
    fn print_if_requested(&self, output: &OutputFlags) -> anyhow::Result<bool> {
        if !output.print_config {
            return Ok(false);
        }
        match output.print_config_format.as_str() {
            "yaml" => println!("{}", serde_yaml::to_string(self)?),
            _ => println!("{}", serde_json::to_string_pretty(self)?),
        }
        Ok(true)
    }
}

#[derive(Debug, Default, Deserialize)]
struct YamlConfig {
    detect: Option<YamlDetect>,
    pack: Option<YamlPack>,
    font: Option<YamlFont>,
}

#[derive(Debug, Default, Deserialize)]
struct YamlDetect {
    tolerance: Option<u32>,
    merge: Option<bool>,
    vertical_overlap: Option<u32>,
    min_gap: Option<u32>,
    gap_ratio: Option<f64>,
    row_bucket: Option<u32>,
    row_join_divisor: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct YamlPack {
    padding: Option<u32>,
    min_width: Option<u32>,
    area_slack: Option<f64>,
    outlines: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct YamlFont {
    face: Option<String>,
    size: Option<u32>,
    bold: Option<bool>,
    italic: Option<bool>,
    line_height: Option<u32>,
    base: Option<u32>,
    tracking: Option<i32>,
}

impl YamlConfig {
    fn apply(self, s: &mut Settings) {
        if let Some(d) = self.detect {
            let cfg = &mut s.detect;
            if let Some(v) = d.tolerance {
                cfg.tolerance = v;
            }
            if let Some(v) = d.merge {
                cfg.merge = v;
            }
            if let Some(v) = d.vertical_overlap {
                cfg.vertical_overlap = v;
            }
            if let Some(v) = d.min_gap {
                cfg.min_gap = v;
            }
            if let Some(v) = d.gap_ratio {
                cfg.gap_ratio = v;
            }
            if let Some(v) = d.row_bucket {
                cfg.row_bucket = v;
            }
            if let Some(v) = d.row_join_divisor {
                cfg.row_join_divisor = v;
            }
        }
        if let Some(p) = self.pack {
            let cfg = &mut s.pack;
            if let Some(v) = p.padding {
                cfg.padding = v;
            }
            if let Some(v) = p.min_width {
                cfg.min_width = v;
            }
            if let Some(v) = p.area_slack {
                cfg.area_slack = v;
            }
            if let Some(v) = p.outlines {
                cfg.outlines = v;
            }
        }
        if let Some(f) = self.font {
            let info = &mut s.font;
            if let Some(v) = f.face {
                info.face = v;
            }
            if let Some(v) = f.size {
                info.size = v;
            }
            if let Some(v) = f.bold {
                info.bold = v;
            }
            if let Some(v) = f.italic {
                info.italic = v;
            }
            if let Some(v) = f.line_height {
                info.line_height = v;
            }
            if let Some(v) = f.base {
                info.base = v;
            }
            if let Some(v) = f.tracking {
                info.tracking = v;
            }
        }
    }
}

// ---------------- Commands ----------------

fn run_detect(args: &DetectArgs, show_progress: bool) -> anyhow::Result<()> {
    let settings = Settings::resolve(
        args.detect.to_config(),
        PackConfig::default(),
        args.font.apply(FontInfo::default()),
        args.output.config.as_deref(),
    )?;
    if settings.print_if_requested(&args.output)? {
        return Ok(());
    }

    let paths = gather_paths(&args.input, &args.include, &args.exclude)?;
    if paths.is_empty() {
        warn!(input = ?args.input, "no sheets found");
        return Ok(());
    }
    if !args.output.dry_run {
        fs::create_dir_all(&args.output.out_dir)
            .with_context(|| format!("create out_dir {}", args.output.out_dir.display()))?;
    }
    info!(count = paths.len(), "detecting sheets");

    let single = paths.len() == 1;
    let bar = progress_bar(paths.len(), show_progress, "detect")?;
    let mut failed = 0usize;
    for p in &paths {
        if let Some(b) = &bar {
            b.set_message(file_label(p));
        }
        let name = output_name(&args.output, p, single);
        match detect_sheet(p, &name, args, &settings) {
            Ok(count) => info!(sheet = ?p, glyphs = count, "sheet done"),
            Err(e) if single => return Err(e),
            Err(e) => {
                failed += 1;
                error!(sheet = ?p, error = %e, "skip sheet");
            }
        }
        if let Some(b) = &bar {
            b.inc(1);
        }
    }
    if let Some(b) = &bar {
        b.finish_and_clear();
    }
    if failed == paths.len() {
        anyhow::bail!("all {} sheets failed", failed);
    }
    Ok(())
}

fn detect_sheet(
    path: &Path,
    name: &str,
    args: &DetectArgs,
    settings: &Settings,
) -> anyhow::Result<usize> {
    let grid = PixelGrid::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut glyphs = detect_glyphs(&grid, &settings.detect)?;
    label_glyphs(&grid, &mut glyphs, &args.labels, &args.output.out_dir.join(name))?;

    let mut info = settings.font.clone();
    info.page_file = file_label(path);
    let info = info.derive_metrics(&glyphs);
    let (w, h) = grid.dimensions();
    write_metadata(&args.output, name, &glyphs, &info, w, h)?;
    Ok(glyphs.len())
}

fn run_pack(args: &PackArgs) -> anyhow::Result<()> {
    let loaded = read_glyph_file(&args.glyphs)?;
    let settings = Settings::resolve(
        DetectConfig::default(),
        args.pack.to_config(),
        args.font.apply(loaded.info.unwrap_or_default()),
        args.output.config.as_deref(),
    )?;
    if settings.print_if_requested(&args.output)? {
        return Ok(());
    }
    let grid =
        PixelGrid::open(&args.image).with_context(|| format!("open {}", args.image.display()))?;
    validate_glyphs(&grid, &loaded.glyphs).with_context(|| {
        format!(
            "{} does not match {}",
            args.glyphs.display(),
            args.image.display()
        )
    })?;
    let name = output_name(&args.output, &args.glyphs, true);
    write_atlas(&grid, &loaded.glyphs, &name, &args.output, &settings)
}

fn run_build(args: &BuildArgs) -> anyhow::Result<()> {
    let settings = Settings::resolve(
        args.detect.to_config(),
        args.pack.to_config(),
        args.font.apply(FontInfo::default()),
        args.output.config.as_deref(),
    )?;
    if settings.print_if_requested(&args.output)? {
        return Ok(());
    }
    let grid =
        PixelGrid::open(&args.image).with_context(|| format!("open {}", args.image.display()))?;
    let name = output_name(&args.output, &args.image, true);
    let mut glyphs = detect_glyphs(&grid, &settings.detect)?;
    info!(glyphs = glyphs.len(), "detected");
    label_glyphs(&grid, &mut glyphs, &args.labels, &args.output.out_dir.join(&name))?;
    write_atlas(&grid, &glyphs, &name, &args.output, &settings)
}

fn write_atlas(
    grid: &PixelGrid,
    glyphs: &[Glyph],
    name: &str,
    output: &OutputFlags,
    settings: &Settings,
) -> anyhow::Result<()> {
    let out = pack_glyphs(grid, glyphs, &settings.pack)?;
    let mut info = settings.font.clone();
    info.page_file = format!("{}.png", name);
    let info = info.derive_metrics(&out.atlas.glyphs);

    if output.dry_run {
        println!("{}", out.stats().summary());
    } else {
        fs::create_dir_all(&output.out_dir)
            .with_context(|| format!("create out_dir {}", output.out_dir.display()))?;
        let png_path = output.out_dir.join(&info.page_file);
        out.rgba
            .save(&png_path)
            .with_context(|| format!("write {}", png_path.display()))?;
        info!(?png_path, width = out.atlas.width, height = out.atlas.height, "atlas written");
    }
    write_metadata(
        output,
        name,
        &out.atlas.glyphs,
        &info,
        out.atlas.width,
        out.atlas.height,
    )
}

fn run_bench(b: &BenchArgs, show_progress: bool) -> anyhow::Result<()> {
    let paths = gather_paths(&b.input, &[], &[])?;
    let detect_cfg = DetectConfig::builder().merge(!b.no_merge).build();
    let pack_cfg = PackConfig::default();
    let bar = progress_bar(paths.len(), show_progress, "bench")?;
    for p in &paths {
        if let Some(bar) = &bar {
            bar.set_message(file_label(p));
            bar.inc(1);
        }
        let grid = match PixelGrid::open(p) {
            Ok(g) => g,
            Err(e) => {
                error!(sheet = ?p, error = %e, "skip sheet");
                continue;
            }
        };
        let start = Instant::now();
        let glyphs = detect_glyphs(&grid, &detect_cfg)?;
        let detect_time = start.elapsed();
        if glyphs.is_empty() {
            println!("{} glyphs=0 detect={}", file_label(p), bench_fmt_dur(detect_time));
            continue;
        }
        let start = Instant::now();
        let out = pack_glyphs(&grid, &glyphs, &pack_cfg)?;
        let pack_time = start.elapsed();
        let stats = out.stats();
        println!(
            "{} glyphs={} detect={} pack={} atlas={}x{} occupancy={:.2}%",
            file_label(p),
            glyphs.len(),
            bench_fmt_dur(detect_time),
            bench_fmt_dur(pack_time),
            out.atlas.width,
            out.atlas.height,
            stats.occupancy * 100.0
        );
    }
    if let Some(bar) = &bar {
        bar.finish_and_clear();
    }
    Ok(())
}

fn bench_fmt_dur(d: Duration) -> String {
    let ms = d.as_secs_f64() * 1000.0;
    if ms >= 1.0 {
        format!("{:.1}ms", ms)
    } else {
        format!("{}us", d.as_micros())
    }
}

// ---------------- Labels ----------------

fn label_glyphs(
    grid: &PixelGrid,
    glyphs: &mut [Glyph],
    labels: &LabelFlags,
    scratch: &Path,
) -> anyhow::Result<()> {
    if let Some(prev) = &labels.carry_labels {
        let previous = read_glyph_file(prev)?;
        if carry_over_labels(&previous.glyphs, glyphs) {
            info!(from = ?prev, "labels carried over");
        } else {
            warn!(
                from = ?prev,
                previous = previous.glyphs.len(),
                detected = glyphs.len(),
                "glyph count changed; labels not carried over"
            );
        }
    }
    if let Some(text) = labels.sequence()? {
        let labeled = assign_sequence(glyphs, &text);
        if labeled < glyphs.len() {
            warn!(labeled, glyphs = glyphs.len(), "character sequence shorter than glyph list");
        }
    }
    if let Some(cmd) = &labels.identify_cmd {
        let report = run_identify_command(grid, glyphs, cmd, labels.batch_size, scratch)?;
        match &report.error {
            None => info!(labeled = report.labeled, batches = report.batches_done, "identified"),
            Some(e) => warn!(
                labeled = report.labeled,
                batches_done = report.batches_done,
                batches_total = report.batches_total,
                error = %e,
                "identification stopped early; keeping partial labels"
            ),
        }
    }
    Ok(())
}

fn run_identify_command(
    grid: &PixelGrid,
    glyphs: &mut [Glyph],
    cmd: &str,
    batch_size: usize,
    scratch: &Path,
) -> anyhow::Result<IdentifyReport> {
    let mut parts = cmd.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| anyhow::anyhow!("empty --identify-cmd"))?;
    let extra: Vec<&str> = parts.collect();
    fs::create_dir_all(scratch).with_context(|| format!("create {}", scratch.display()))?;

    let mut batch_no = 0usize;
    let mut identifier = JsonResponseIdentifier::new(|images: &[RgbaImage]| {
        let mut paths = Vec::with_capacity(images.len());
        for (i, img) in images.iter().enumerate() {
            let path = scratch.join(format!("batch{:03}_{:03}.png", batch_no, i));
            img.save(&path)?;
            paths.push(path);
        }
        batch_no += 1;
        let out = Command::new(program).args(&extra).args(&paths).output()?;
        if !out.status.success() {
            return Err(GlyphSheetError::Identify(format!(
                "`{}` exited with {}",
                program, out.status
            )));
        }
        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    });
    Ok(identify_glyphs(grid, glyphs, &mut identifier, batch_size)?)
}

// ---------------- Metadata ----------------

struct LoadedGlyphs {
    info: Option<FontInfo>,
    glyphs: Vec<Glyph>,
}

fn read_glyph_file(path: &Path) -> anyhow::Result<LoadedGlyphs> {
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_ascii_lowercase());
    match ext.as_deref() {
        Some("json") => {
            let value: serde_json::Value =
                serde_json::from_str(&text).with_context(|| format!("parse {}", path.display()))?;
            let info = match value.get("info") {
                Some(v) => Some(serde_json::from_value(v.clone())?),
                None => None,
            };
            let glyphs =
                glyphs_from_json(&value).with_context(|| format!("parse {}", path.display()))?;
            Ok(LoadedGlyphs { info, glyphs })
        }
        _ => {
            let parsed = parse_fnt_text(&text).with_context(|| format!("parse {}", path.display()))?;
            Ok(LoadedGlyphs {
                info: Some(parsed.info),
                glyphs: parsed.glyphs,
            })
        }
    }
}

fn write_metadata(
    output: &OutputFlags,
    name: &str,
    glyphs: &[Glyph],
    info: &FontInfo,
    scale_w: u32,
    scale_h: u32,
) -> anyhow::Result<()> {
    let (path, contents) = match output.metadata.as_str() {
        "fnt" => (
            output.out_dir.join(format!("{}.fnt", name)),
            to_fnt_text(glyphs, info, scale_w, scale_h),
        ),
        "json" => (
            output.out_dir.join(format!("{}.json", name)),
            serde_json::to_string_pretty(&to_json(glyphs, info, scale_w, scale_h))?,
        ),
        "template" => {
            let ctx = build_template_context(glyphs, info, scale_w, scale_h);
            let (source, ext) = match &output.template {
                Some(path) => (
                    fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?,
                    template_extension(path),
                ),
                None => (
                    include_str!("templates/bmfont_xml.hbs").to_string(),
                    "xml".to_string(),
                ),
            };
            let mut reg = Handlebars::new();
            reg.set_strict_mode(true);
            reg.register_template_string("tpl", source)?;
            let rendered = reg.render("tpl", &ctx)?;
            (output.out_dir.join(format!("{}.{}", name, ext)), rendered)
        }
        other => anyhow::bail!("unknown metadata format: {}", other),
    };

    if output.dry_run {
        println!(
            "{}: {} glyphs, {}x{} (not written: {})",
            name,
            glyphs.len(),
            scale_w,
            scale_h,
            path.display()
        );
        return Ok(());
    }
    fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
    info!(?path, glyphs = glyphs.len(), "metadata written");
    Ok(())
}

/// `font.xml.hbs` renders to `.xml`; anything else falls back to `.txt`.
fn template_extension(path: &Path) -> String {
    path.file_stem()
        .map(Path::new)
        .and_then(|stem| stem.extension())
        .and_then(|e| e.to_str())
        .unwrap_or("txt")
        .to_string()
}

#[derive(Serialize)]
struct TemplateInfo {
    face: String,
    size: u32,
    bold: u8,
    italic: u8,
    tracking: i32,
    page_file: String,
}

#[derive(Serialize)]
struct TemplateCommon {
    line_height: u32,
    base: u32,
    scale_w: u32,
    scale_h: u32,
}

#[derive(Serialize)]
struct TemplateGlyph {
    id: u32,
    character: String,
    code_point: i64,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    xoffset: i32,
    yoffset: i32,
    xadvance: i32,
}

#[derive(Serialize)]
struct TemplateContext {
    info: TemplateInfo,
    common: TemplateCommon,
    count: usize,
    glyphs: Vec<TemplateGlyph>,
}

fn build_template_context(
    glyphs: &[Glyph],
    info: &FontInfo,
    scale_w: u32,
    scale_h: u32,
) -> TemplateContext {
    let glyphs = glyphs
        .iter()
        .map(|g| TemplateGlyph {
            id: g.id,
            character: g.character.map(String::from).unwrap_or_default(),
            code_point: g.code_point(),
            x: g.x,
            y: g.y,
            width: g.width,
            height: g.height,
            xoffset: g.xoffset,
            yoffset: g.yoffset,
            xadvance: (g.xadvance + info.tracking).max(0),
        })
        .collect::<Vec<_>>();
    TemplateContext {
        info: TemplateInfo {
            face: info.face.clone(),
            size: info.size,
            bold: info.bold as u8,
            italic: info.italic as u8,
            tracking: info.tracking,
            page_file: info.page_file.clone(),
        },
        common: TemplateCommon {
            line_height: info.line_height,
            base: info.base,
            scale_w,
            scale_h,
        },
        count: glyphs.len(),
        glyphs,
    }
}

// ---------------- Inputs ----------------

fn output_name(output: &OutputFlags, path: &Path, single: bool) -> String {
    match &output.name {
        Some(n) if single => n.clone(),
        _ => path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("sheet")
            .to_string(),
    }
}

fn file_label(p: &Path) -> String {
    p.file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_string()
}

fn gather_paths(
    path: &Path,
    include: &[String],
    exclude: &[String],
) -> anyhow::Result<Vec<PathBuf>> {
    let mut inc_set = None;
    if !include.is_empty() {
        let mut b = GlobSetBuilder::new();
        for pat in include {
            b.add(Glob::new(pat)?);
        }
        inc_set = Some(b.build()?);
    }
    let mut exc_set = None;
    if !exclude.is_empty() {
        let mut b = GlobSetBuilder::new();
        for pat in exclude {
            b.add(Glob::new(pat)?);
        }
        exc_set = Some(b.build()?);
    }
    let mut list: Vec<PathBuf> = Vec::new();
    if path.is_file() {
        if !should_skip(path, inc_set.as_ref(), exc_set.as_ref()) && is_sheet(path) {
            list.push(path.to_path_buf());
        }
    } else {
        for entry in WalkDir::new(path).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && !should_skip(p, inc_set.as_ref(), exc_set.as_ref()) && is_sheet(p) {
                list.push(p.to_path_buf());
            }
        }
    }
    Ok(list)
}

fn should_skip(
    p: &Path,
    include: Option<&globset::GlobSet>,
    exclude: Option<&globset::GlobSet>,
) -> bool {
    let s = p.to_string_lossy().replace('\\', "/");
    if let Some(ex) = exclude {
        if ex.is_match(&s) {
            return true;
        }
    }
    if let Some(inc) = include {
        if !inc.is_match(&s) {
            return true;
        }
    }
    false
}

fn is_sheet(p: &Path) -> bool {
    matches!(
        p.extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_ascii_lowercase()),
        Some(ext) if matches!(ext.as_str(), "png" | "jpg" | "jpeg")
    )
}

fn progress_bar(len: usize, enabled: bool, verb: &str) -> anyhow::Result<Option<ProgressBar>> {
    if !enabled || len < 2 {
        return Ok(None);
    }
    let b = ProgressBar::new(len as u64);
    b.set_style(ProgressStyle::with_template(&format!(
        "{{spinner:.green}} {} {{pos}}/{{len}} [{{elapsed_precise}}] {{wide_msg}}",
        verb
    ))?);
    Ok(Some(b))
}

fn init_tracing_with_level(quiet: bool, verbose: u8) {
    let level = if quiet {
        "error".to_string()
    } else {
        match verbose {
            0 => "info".into(),
            1 => "debug".into(),
            _ => "trace".into(),
        }
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_target(false)
        .try_init();
}
