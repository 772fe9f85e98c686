use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use hgt::Heightmap;
use image::{imageops::FilterType, RgbaImage};
use log::info;
use rayon::prelude::*;
use std::{path::PathBuf, time::Instant};

/// Which part of each pixel becomes the height.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Channel {
    /// Rec. 709 luminance.
    Luma,
    Alpha,
    /// Luminance times alpha.
    Both,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Channel::Luma => "luma",
            Channel::Alpha => "alpha",
            Channel::Both => "both",
        };

        f.write_str(s)
    }
}

/// Converts an equirectangular raster into an HGT1 heightmap.
#[derive(Parser, Debug, Clone)]
#[command(name = "img2hgt", version)]
struct Args {
    /// Source image (png or jpeg), longitude -180..180 left to right.
    input: PathBuf,

    /// Destination `.hgt` file.
    output: PathBuf,

    /// Grid columns; the image is resampled when it differs.
    #[arg(long, default_value_t = 360)]
    width: u32,

    /// Grid rows.
    #[arg(long, default_value_t = 180)]
    height: u32,

    #[arg(long, value_enum, default_value_t = Channel::Luma)]
    channel: Channel,

    /// Heights below this become 0 (sea).
    #[arg(long, default_value_t = 0.0)]
    threshold: f32,

    /// Use `1 - value`, for maps that draw land dark.
    #[arg(long, default_value_t = false)]
    invert: bool,

    /// Payload characters per line.
    #[arg(long, default_value_t = 120)]
    line_width: usize,

    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

fn pixel_height(p: &image::Rgba<u8>, channel: Channel) -> f32 {
    let luma = (0.2126 * p[0] as f32 + 0.7152 * p[1] as f32 + 0.0722 * p[2] as f32) / 255.0;
    let alpha = p[3] as f32 / 255.0;
    match channel {
        Channel::Luma => luma,
        Channel::Alpha => alpha,
        Channel::Both => luma * alpha,
    }
}

/// Row-major heights for every pixel of `rgba`.
fn heights(rgba: &RgbaImage, args: &Args) -> Vec<f32> {
    let width = rgba.width() as usize;
    let mut data = vec![0.0f32; width * rgba.height() as usize];
    data.par_chunks_mut(width)
        .enumerate()
        .for_each(|(row, out)| {
            for (col, h) in out.iter_mut().enumerate() {
                let mut v = pixel_height(rgba.get_pixel(col as u32, row as u32), args.channel);
                if args.invert {
                    v = 1.0 - v;
                }
                *h = if v < args.threshold { 0.0 } else { v.clamp(0.0, 1.0) };
            }
        });
    data
}

fn convert(args: &Args) -> Result<Heightmap> {
    let img = image::open(&args.input)
        .with_context(|| format!("opening {}", args.input.display()))?;
    info!(
        "{}: {}x{}, {} channel",
        args.input.display(),
        img.width(),
        img.height(),
        args.channel
    );

    let rgba = if (img.width(), img.height()) == (args.width, args.height) {
        img.to_rgba8()
    } else {
        img.resize_exact(args.width, args.height, FilterType::Triangle)
            .to_rgba8()
    };

    let data = heights(&rgba, args);
    Ok(Heightmap::new(args.width as usize, args.height as usize, data)?)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if args.width == 0 || args.height == 0 {
        bail!("grid size must be non-zero");
    }
    if args.output.exists() && !args.overwrite {
        bail!(
            "{} exists (pass --overwrite to replace it)",
            args.output.display()
        );
    }

    let started = Instant::now();
    let map = convert(&args)?;
    hgt::write_file(&args.output, &map, args.line_width)
        .with_context(|| format!("writing {}", args.output.display()))?;

    let land = map.data.iter().filter(|&&h| h > 0.0).count();
    info!(
        "wrote {} ({}x{}, {:.1}% land) in {:.2?}",
        args.output.display(),
        map.width,
        map.height,
        100.0 * land as f64 / map.data.len() as f64,
        started.elapsed()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn args(channel: Channel) -> Args {
        Args::parse_from(["img2hgt", "in.png", "out.hgt", "--channel", &channel.to_string()])
    }

    #[test]
    fn channels_select_the_height_source() {
        let px = Rgba([255, 255, 255, 128]);
        assert!((pixel_height(&px, Channel::Luma) - 1.0).abs() < 1e-6);
        assert!((pixel_height(&px, Channel::Alpha) - 128.0 / 255.0).abs() < 1e-6);
        assert!((pixel_height(&px, Channel::Both) - 128.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn threshold_and_invert() {
        let mut img = RgbaImage::from_pixel(2, 1, Rgba([0, 0, 0, 255]));
        img.put_pixel(1, 0, Rgba([255, 255, 255, 255]));

        let mut a = args(Channel::Luma);
        a.threshold = 0.5;
        assert_eq!(heights(&img, &a), vec![0.0, 1.0]);

        a.invert = true;
        assert_eq!(heights(&img, &a), vec![1.0, 0.0]);
    }
}
