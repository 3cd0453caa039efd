//! Command-line front end: open a series, pick a slice, window and ROI, then
//! report the ROI statistics and write the rendered images

use crate::{
    enums::{Processor, SortBy},
    gpu_windowing::{GpuWindowing, WGPU},
    roi::{self, RoiRect},
    stats::DEFAULT_HISTOGRAM_BINS,
    viewer::ViewerSession,
    windowing::Window,
};

use anyhow::{Context, Result};
use clap::Parser;
use image::{DynamicImage, RgbImage};
use std::path::PathBuf;

pub const DEFAULT_OUTPUT: &str = "slice.png";
pub const HISTOGRAM_SIZE: (u32, u32) = (400, 300);

#[derive(Parser, Debug)]
#[command(name = "ct-viewer")]
#[command(author, version, about = "Browse a DICOM series and measure a rectangular ROI")]
pub struct Cli {
    /// Directory containing the DICOM files of one series
    #[arg(value_name = "DIR")]
    pub directory: PathBuf,

    /// How to order the slices
    #[arg(long, value_enum, default_value_t = SortBy::Auto)]
    pub sort: SortBy,

    /// Slice to display, counted from 0
    #[arg(short, long, default_value_t = 0)]
    pub slice: usize,

    /// Window center (defaults to the volume mean)
    #[arg(short, long, allow_negative_numbers = true)]
    pub center: Option<f32>,

    /// Window width (defaults to the volume standard deviation)
    #[arg(short, long)]
    pub width: Option<f32>,

    /// Rectangular ROI as two corners "x1,y1,x2,y2"
    #[arg(short, long, value_name = "X1,Y1,X2,Y2")]
    pub roi: Option<RoiRect>,

    /// Number of histogram bins
    #[arg(short, long, default_value_t = DEFAULT_HISTOGRAM_BINS)]
    pub bins: usize,

    /// Where to write the rendered slice
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,

    /// Where to write the ROI histogram plot
    #[arg(long)]
    pub histogram_output: Option<PathBuf>,

    /// Run the windowing transform on the CPU or the GPU
    #[arg(long, value_enum, default_value_t = Processor::CPU)]
    pub processor: Processor,
}

impl Cli {
    /// Window from the flags, falling back to the volume's default for
    /// whichever value is missing.
    pub fn window(&self, default: Window) -> Window {
        Window::new(
            self.center.unwrap_or(default.center()),
            self.width.unwrap_or(default.width()),
        )
    }
}

/// Run one viewing session as described by the command line.
///
/// # Errors
///
/// Returns an error if loading, ROI selection or writing an output fails.
pub async fn run(cli: Cli) -> Result<()> {
    let mut session = ViewerSession::open(&cli.directory, cli.sort)
        .with_context(|| format!("failed to load DICOM files from {}", cli.directory.display()))?
        .with_histogram_bins(cli.bins);

    session.set_slice(cli.slice)?;
    session.set_window(cli.window(session.window()));
    let window = session.window();
    println!(
        "Slice {}/{}  window center {:.1} width {:.1}",
        session.current_slice(),
        session.slice_count(),
        window.center(),
        window.width()
    );

    if let Some(rect) = cli.roi {
        let summary = session.select_roi(rect).context("failed to measure ROI")?;
        println!("ROI statistics:\n{}", summary.stats);
        if let Some(path) = &cli.histogram_output {
            let (width, height) = HISTOGRAM_SIZE;
            summary
                .histogram
                .render(width, height)
                .save(path)
                .with_context(|| format!("failed to write histogram to {}", path.display()))?;
            log::info!("wrote histogram to {}", path.display());
        }
    }

    let image = match cli.processor {
        Processor::CPU => session.render(),
        Processor::GPU => render_on_gpu(&session).await?,
    };
    image
        .save(&cli.output)
        .with_context(|| format!("failed to write {}", cli.output.display()))?;
    log::info!("wrote slice to {}", cli.output.display());

    Ok(())
}

async fn render_on_gpu(session: &ViewerSession) -> Result<RgbImage> {
    let wgpu = WGPU::request().await.context("GPU windowing unavailable")?;
    let slice = session
        .volume()
        .slice(session.current_slice())
        .context("no slice to render")?;
    let gray = GpuWindowing::new(wgpu)
        .apply(&slice, session.window())
        .await?;
    Ok(match session.roi_mask() {
        Some(mask) => roi::overlay(&gray, mask),
        None => DynamicImage::ImageLuma8(gray).to_rgb8(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_command_line() {
        let cli = Cli::try_parse_from([
            "ct-viewer",
            "series",
            "--sort",
            "instance-number",
            "--slice",
            "3",
            "--center",
            "-600",
            "--width",
            "1500",
            "--roi",
            "10,20,30,40",
            "--histogram-output",
            "hist.png",
            "--processor",
            "gpu",
        ])
        .unwrap();

        assert_eq!(cli.directory, PathBuf::from("series"));
        assert_eq!(cli.sort, SortBy::InstanceNumber);
        assert_eq!(cli.slice, 3);
        assert_eq!(cli.center, Some(-600.0));
        assert_eq!(cli.width, Some(1500.0));
        assert_eq!(cli.roi, Some(RoiRect::new((10, 20), (30, 40))));
        assert_eq!(cli.bins, DEFAULT_HISTOGRAM_BINS);
        assert_eq!(cli.output, PathBuf::from(DEFAULT_OUTPUT));
        assert_eq!(cli.histogram_output, Some(PathBuf::from("hist.png")));
        assert_eq!(cli.processor, Processor::GPU);
    }

    #[test]
    fn rejects_malformed_roi() {
        assert!(Cli::try_parse_from(["ct-viewer", "series", "--roi", "1,2,3"]).is_err());
    }

    #[test]
    fn missing_window_values_use_default() {
        let cli = Cli::try_parse_from(["ct-viewer", "series", "--width", "80"]).unwrap();
        let window = cli.window(Window::new(35.0, 500.0));
        assert_eq!(window, Window::new(35.0, 80.0));
    }
}
