use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use palmbox::{anchors::AnchorTable, nn::TractEngine, DetectorConfig, PalmDetector};

/// Detects hands in a photo and prints their bounding boxes.
///
/// Each detected hand is printed as one line of `x y width height confidence`, in pixels of the
/// input image.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Palm detection network in ONNX format.
    #[arg(long, value_name = "MODEL")]
    model: PathBuf,
    /// Image to run detection on.
    #[arg(long, value_name = "IMAGE")]
    image: PathBuf,
    /// Anchor file with one `x,y` pair per line. Defaults to the anchors of the 192x192 network.
    #[arg(long, value_name = "ANCHORS")]
    anchors: Option<PathBuf>,
    /// Write a copy of the image with everything outside of the detected hands blacked out.
    #[arg(long, value_name = "OUTPUT")]
    mask: Option<PathBuf>,
    /// Write a copy of the image with the detected hands outlined.
    #[arg(long, value_name = "OUTPUT")]
    annotate: Option<PathBuf>,
    /// Minimum confidence of a detection.
    #[arg(long, default_value_t = 0.5)]
    threshold: f32,
    /// Overlap above which less confident detections are suppressed.
    #[arg(long, default_value_t = 0.3)]
    iou_threshold: f32,
    /// Maximum number of hands to report.
    #[arg(long, default_value_t = 1)]
    max_detections: usize,
}

fn main() -> Result<()> {
    palmbox::init_logger!();

    let args = Args::parse();

    let anchors = match &args.anchors {
        Some(path) => AnchorTable::load(path)?,
        None => AnchorTable::palm_192(),
    };
    let engine = TractEngine::load(&args.model)
        .with_context(|| format!("failed to load model from `{}`", args.model.display()))?;
    let config = DetectorConfig::default()
        .with_threshold(args.threshold)
        .with_iou_threshold(args.iou_threshold)
        .with_max_detections(args.max_detections);
    let detector = PalmDetector::new(engine, anchors, config)?;

    let image = image::open(&args.image)
        .with_context(|| format!("failed to open image `{}`", args.image.display()))?
        .to_rgb8();
    log::info!(
        "running detection on {}x{} image `{}`",
        image.width(),
        image.height(),
        args.image.display()
    );

    let boxes = detector.detect(&image)?;
    if let Some(path) = &args.mask {
        palmbox::mask::mask_outside(&image, &boxes)
            .save(path)
            .with_context(|| format!("failed to write `{}`", path.display()))?;
    }
    if let Some(path) = &args.annotate {
        let stroke = palmbox::mask::default_stroke(&image);
        palmbox::mask::draw_boxes(&image, &boxes, stroke)
            .save(path)
            .with_context(|| format!("failed to write `{}`", path.display()))?;
    }

    if boxes.is_empty() {
        log::info!("no hands found");
    }
    for bb in &boxes {
        println!(
            "{:.1} {:.1} {:.1} {:.1} {:.4}",
            bb.x, bb.y, bb.width, bb.height, bb.confidence
        );
    }

    Ok(())
}
