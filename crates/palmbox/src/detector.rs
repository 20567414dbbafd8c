//! The end-to-end palm detection pipeline.

use image::RgbImage;

use crate::{
    anchors::AnchorTable,
    detection::{DecodeObserver, LogObserver},
    mask,
    nn::InferenceEngine,
    preprocess::preprocess,
    timer::Timer,
    BoundingBox, ConfigError, DetectorConfig, Error, HandRegion,
};

/// Detects hands in images using a palm detection network.
///
/// All detection methods take `&self`, so a single detector can be shared between threads as long
/// as its [`InferenceEngine`] allows that.
pub struct PalmDetector<E> {
    engine: E,
    anchors: AnchorTable,
    config: DetectorConfig,
    observer: Box<dyn DecodeObserver>,
    t_preprocess: Timer,
    t_infer: Timer,
    t_decode: Timer,
    t_nms: Timer,
    t_region: Timer,
}

impl<E: InferenceEngine> PalmDetector<E> {
    /// Creates a detector running `engine`, whose predictions refer to `anchors`.
    ///
    /// Returns an error if `config` is invalid. Whether `anchors` matches the network output is
    /// checked on every detection.
    pub fn new(
        engine: E,
        anchors: AnchorTable,
        config: DetectorConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            engine,
            anchors,
            config,
            observer: Box::new(LogObserver::new()),
            t_preprocess: Timer::new("preprocess"),
            t_infer: Timer::new("infer"),
            t_decode: Timer::new("decode"),
            t_nms: Timer::new("nms"),
            t_region: Timer::new("region"),
        })
    }

    /// Replaces the default [`LogObserver`] that receives decoding diagnostics.
    pub fn with_observer<O: DecodeObserver + 'static>(mut self, observer: O) -> Self {
        self.observer = Box::new(observer);
        self
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn anchors(&self) -> &AnchorTable {
        &self.anchors
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Detects hands in `image`, returning their boxes ordered by descending confidence.
    ///
    /// Finding no hands is not an error and results in an empty list.
    pub fn detect(&self, image: &RgbImage) -> Result<Vec<BoundingBox>, Error> {
        let regions = self.detect_regions(image)?;
        Ok(regions.iter().map(|r| *r.bounding_box()).collect())
    }

    /// Detects hands in `image`, returning their oriented regions.
    ///
    /// At most [`DetectorConfig::max_detections`] regions are returned. If clipping is enabled,
    /// a region whose box lies completely outside of the image is not reported.
    pub fn detect_regions(&self, image: &RgbImage) -> Result<Vec<HandRegion>, Error> {
        let (input, letterbox) = self.t_preprocess.time(|| preprocess(image, &self.engine))?;
        let output = self.t_infer.time(|| self.engine.infer(&input))?;

        let decoder = self.config.decoder(self.engine.input_size());
        let candidates = self
            .t_decode
            .time(|| decoder.decode(&output, &self.anchors, &*self.observer))?;

        let survivors = self.t_nms.time(|| self.config.nms().process(&candidates));

        let regions = self.t_region.time(|| {
            let estimator = self.config.region_estimator();
            let bounds = letterbox.source_bounds();

            let mut regions = Vec::new();
            for &index in survivors.iter().take(self.config.max_detections()) {
                let region = estimator.estimate(&candidates[index], &letterbox)?;
                if !self.config.clip_to_image() {
                    regions.push(region);
                    continue;
                }

                match region.clipped(&bounds) {
                    Some(region) => regions.push(region),
                    None => log::debug!(
                        "dropping hand region outside of the {}x{} image",
                        image.width(),
                        image.height()
                    ),
                }
            }
            Ok::<_, Error>(regions)
        })?;

        log::debug!(
            "{} candidates, {} after nms, {} regions; {} {} {} {} {}",
            candidates.len(),
            survivors.len(),
            regions.len(),
            self.t_preprocess,
            self.t_infer,
            self.t_decode,
            self.t_nms,
            self.t_region,
        );

        Ok(regions)
    }

    /// Detects hands and returns a copy of `image` with everything outside of them blacked out.
    pub fn detect_and_mask(
        &self,
        image: &RgbImage,
    ) -> Result<(Vec<BoundingBox>, RgbImage), Error> {
        let boxes = self.detect(image)?;
        let masked = mask::mask_outside(image, &boxes);
        Ok((boxes, masked))
    }

    /// Detects hands and returns a copy of `image` with their boxes outlined.
    pub fn detect_and_annotate(
        &self,
        image: &RgbImage,
    ) -> Result<(Vec<BoundingBox>, RgbImage), Error> {
        let boxes = self.detect(image)?;
        let annotated = mask::draw_boxes(image, &boxes, mask::default_stroke(image));
        Ok((boxes, annotated))
    }
}
