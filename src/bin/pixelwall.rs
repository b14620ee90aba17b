use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{ArgAction, Parser, Subcommand};
use pixelwall::{
    Bitmap, Compositor, CompositorMode, Engine, EngineOpts, FsImageLoader, MapSize, Palette,
    PixelBuffer, PixelwallError, RasterSurface, Surface, Viewport,
};

#[derive(Parser, Debug)]
#[command(name = "pixelwall", version)]
struct Cli {
    /// Log verbosity on stderr (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a command script headlessly and write the canvases as PNG.
    Replay(ReplayArgs),
    /// Paint a map from a colour-code string and write it as PNG.
    Paint(PaintArgs),
}

#[derive(Parser, Debug)]
struct ReplayArgs {
    /// Command script, one wire line per line. Blank lines and `#` comments are skipped.
    #[arg(long)]
    script: PathBuf,

    /// Root directory for snapshot image URLs. Defaults to the script's directory.
    #[arg(long)]
    assets: Option<PathBuf>,

    /// Engine options JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output PNG of the main canvas.
    #[arg(long)]
    out: PathBuf,

    /// Output PNG of the minimap.
    #[arg(long)]
    minimap_out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct PaintArgs {
    #[arg(long)]
    width: u32,

    #[arg(long)]
    height: u32,

    /// Comma-separated hex colours; index is the colour code.
    #[arg(long)]
    palette: String,

    /// One colour-code character per pixel, row-major.
    #[arg(long)]
    colors: String,

    /// Output pixels per map pixel.
    #[arg(long, default_value_t = 1)]
    scale: u32,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Replay(args) => cmd_replay(args),
        Command::Paint(args) => cmd_paint(args),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

/// Surface handle the CLI keeps after giving a clone to the engine.
#[derive(Clone, Default)]
struct SharedSurface(Rc<RefCell<RasterSurface>>);

impl Surface for SharedSurface {
    fn configure(&mut self, viewport: &Viewport) {
        self.0.borrow_mut().configure(viewport);
    }

    fn clear(&mut self) {
        self.0.borrow_mut().clear();
    }

    fn draw_bitmap(&mut self, bitmap: &Bitmap, dst_w: f64, dst_h: f64) {
        self.0.borrow_mut().draw_bitmap(bitmap, dst_w, dst_h);
    }
}

fn cmd_replay(args: ReplayArgs) -> anyhow::Result<()> {
    let opts = match &args.config {
        Some(path) => {
            let f = std::fs::File::open(path)
                .with_context(|| format!("open config '{}'", path.display()))?;
            serde_json::from_reader::<_, EngineOpts>(f)
                .with_context(|| format!("parse config '{}'", path.display()))?
        }
        None => EngineOpts::default(),
    };
    let script = std::fs::read_to_string(&args.script)
        .with_context(|| format!("read script '{}'", args.script.display()))?;
    let assets_root = args.assets.clone().unwrap_or_else(|| {
        args.script
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf()
    });

    let main = SharedSurface::default();
    let minimap = SharedSurface::default();
    let mut engine = Engine::new(
        opts,
        Box::new(main.clone()),
        Box::new(minimap.clone()),
        Arc::new(FsImageLoader::new(assets_root)),
    )?;

    // virtual clock: every command is followed by one regen interval
    let mut now = 0.0;
    for (n, line) in script.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        engine
            .dispatch_line(line)
            .with_context(|| format!("script line {}: '{line}'", n + 1))?;
        engine.settle()?;
        engine.frame(now)?;
        engine.settle()?;
        now += engine.regen_interval_ms();
        print_acks(&mut engine);
    }

    // flush the last requested regen; the first frame after start only sets the baseline
    for _ in 0..3 {
        if !engine.needs_regen() && !engine.needs_redraw() {
            break;
        }
        engine.frame(now)?;
        engine.settle()?;
        now += engine.regen_interval_ms();
    }
    print_acks(&mut engine);
    engine.shutdown();

    save_png(main.0.borrow().image(), &args.out)?;
    if let Some(path) = &args.minimap_out {
        save_png(minimap.0.borrow().image(), path)?;
    }
    Ok(())
}

fn print_acks(engine: &mut Engine) {
    for ack in engine.drain_acks() {
        println!("{ack}");
    }
}

fn cmd_paint(args: PaintArgs) -> anyhow::Result<()> {
    let size = MapSize::new(args.width, args.height)?;
    let palette = Palette::from_hex_codes(args.palette.split(','))?;
    let pixels = PixelBuffer::from_color_codes(size, &palette, &args.colors)?;

    let mut compositor = Compositor::new(CompositorMode::Inline)?;
    compositor.submit(&pixels)?;
    let bitmap = compositor
        .wait()
        .context("compositor returned no bitmap")??;

    let scale = args.scale.max(1);
    let (out_w, out_h) = args
        .width
        .checked_mul(scale)
        .zip(args.height.checked_mul(scale))
        .ok_or_else(|| {
            PixelwallError::validation(format!(
                "--scale {scale} overflows the output size for a {}x{} map",
                args.width, args.height
            ))
        })?;
    let viewport = Viewport {
        scale: f64::from(scale),
        ..Viewport::fixed(out_w, out_h)
    };
    let mut surface = RasterSurface::new(&viewport);
    surface.draw_bitmap(&bitmap, f64::from(args.width), f64::from(args.height));
    save_png(surface.image(), &args.out)
}

fn save_png(image: &image::RgbaImage, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", path.display()))?;
    eprintln!("wrote {}", path.display());
    Ok(())
}
