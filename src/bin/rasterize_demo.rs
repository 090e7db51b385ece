//! Headless smoke-test binary for the rasterizer core: builds a small
//! hand-coded outline (or a `--square`), runs it through the full
//! Path → Draw pipeline, and writes a PNG. No GUI, no GPU, synchronous,
//! CPU-only — mirrors the teacher's own `--input`/headless CLI mode in
//! spirit without pulling in any of its GUI/GPU/scripting stack.

use clap::Parser;
use image::{Rgba, RgbaImage};
use raster_core::compositor::{draw, ColorRun, DestSurface, DrawParams, PixelFormat, Rect};
use raster_core::{PathBuilder, Rasterizer};

/// Render a single vector outline through the subtitle rasterizer core and
/// write the composited result to a PNG.
#[derive(Parser, Debug)]
#[command(name = "rasterize_demo")]
struct Args {
    /// Render an axis-aligned WxH square instead of the built-in glyph, in
    /// whole pixels (e.g. "40x40").
    #[arg(long)]
    square: Option<String>,

    /// Widen the filled region by this many pixels on both axes (border).
    #[arg(long, default_value_t = 0)]
    border: i32,

    /// Gaussian blur sigma; <= 0.1 disables it.
    #[arg(long, default_value_t = 0.0)]
    blur_sigma: f64,

    /// Number of [1 2 1]^2 box-blur passes.
    #[arg(long, default_value_t = 0)]
    box_blur_passes: u32,

    /// Fill color as "AARRGGBB" hex.
    #[arg(long, default_value = "FFFFFFFF")]
    color: String,

    /// Output PNG path.
    #[arg(long, default_value = "rasterize_demo.png")]
    out: String,

    /// Output canvas size, "WxH".
    #[arg(long, default_value = "128x128")]
    canvas: String,
}

fn parse_wh(s: &str) -> (i32, i32) {
    let mut parts = s.split('x');
    let w = parts.next().unwrap_or("128").parse().unwrap_or(128);
    let h = parts.next().unwrap_or("128").parse().unwrap_or(128);
    (w, h)
}

fn built_in_glyph() -> raster_core::Path {
    // A simple rounded-corner-free "A"-ish triangle-with-hole outline, in
    // 1/8-pixel units, picked to exercise both a straight-line subpath and
    // a cubic Bézier subpath in one path.
    let mut pb = PathBuilder::new();
    pb.move_to(40 * 8, 8 * 8)
        .bezier_to(70 * 8, 8 * 8, 95 * 8, 30 * 8, 95 * 8, 60 * 8)
        .bezier_to(95 * 8, 90 * 8, 70 * 8, 112 * 8, 40 * 8, 112 * 8)
        .line_to(20 * 8, 60 * 8)
        .close_figure();
    pb.build()
}

fn square_glyph(w: i32, h: i32) -> raster_core::Path {
    let mut pb = PathBuilder::new();
    let (x0, y0) = (16 * 8, 16 * 8);
    let (x1, y1) = (x0 + w * 8, y0 + h * 8);
    pb.move_to(x0, y0).line_to(x1, y0).line_to(x1, y1).line_to(x0, y1).close_figure();
    pb.build()
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let path = match &args.square {
        Some(spec) => {
            let (w, h) = parse_wh(spec);
            square_glyph(w, h)
        }
        None => built_in_glyph(),
    };

    let mut rasterizer = Rasterizer::new();
    *rasterizer.path_mut() = path;
    rasterizer.scan_convert();
    if args.border > 0 {
        rasterizer.create_widened_region(args.border * 8, args.border * 8);
    }

    let overlay = rasterizer
        .rasterize(0, 0, args.box_blur_passes, args.blur_sigma)
        .expect("rasterize never fails on a well-formed path");

    let (canvas_w, canvas_h) = parse_wh(&args.canvas);
    let mut bits = vec![0u8; (canvas_w * canvas_h * 4) as usize];
    let color = u32::from_str_radix(&args.color, 16).unwrap_or(0xFFFFFFFF);
    let colors = ColorRun::single(color);

    {
        let mut surface = DestSurface {
            bits: &mut bits,
            pitch: canvas_w * 4,
            width: canvas_w,
            height: canvas_h,
            bytes_per_pixel: 4,
            format: PixelFormat::PackedBgra8888,
        };
        let params = DrawParams {
            overlay: &overlay,
            clip: Rect { left: 0, top: 0, right: canvas_w, bottom: canvas_h },
            clip_mask: None,
            xsub: 0,
            ysub: 0,
            colors: &colors,
            body: true,
            border: args.border > 0,
            use_sse2: true,
        };
        let bbox = draw(&mut surface, &params);
        log::info!("drew into bbox {bbox:?}");
    }

    let mut img = RgbaImage::new(canvas_w as u32, canvas_h as u32);
    for y in 0..canvas_h {
        for x in 0..canvas_w {
            let idx = ((y * canvas_w + x) * 4) as usize;
            let b = bits[idx];
            let g = bits[idx + 1];
            let r = bits[idx + 2];
            let a = bits[idx + 3];
            img.put_pixel(x as u32, y as u32, Rgba([r, g, b, a]));
        }
    }
    img.save(&args.out).expect("failed to write PNG");
    println!("wrote {}", args.out);
}
