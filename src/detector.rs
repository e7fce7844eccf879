//! Screen detection with an adaptive OCR scale search.
//!
//! OCR accuracy on installer screens depends heavily on how the screenshot is
//! scaled before recognition. The detector remembers the scale that produced
//! the most confident recognition and, on the next call, searches only a narrow
//! band around it. A weak result there (fallback screen or no screen at all)
//! falls back to the full band derived from the image width.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ConfigError, OcrError};
use crate::ocr::preprocess::image_width;
use crate::ocr::{select_backend, OcrBackend, OcrLibrary, Recognition};
use crate::screen::ScreenRegistry;

/// Bounds of the scale search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleSearch {
    /// Half-width of the band searched around the reference scale.
    pub reference_band: f32,
    pub step: f32,
    /// Smallest scaled image width tried by the full search.
    pub min_width_px: u32,
    /// Largest scaled image width tried by the full search.
    pub max_width_px: u32,
}

impl Default for ScaleSearch {
    fn default() -> Self {
        Self {
            reference_band: 0.05,
            step: 0.01,
            min_width_px: 1000,
            max_width_px: 2000,
        }
    }
}

impl ScaleSearch {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.step > 0.0) {
            return Err(ConfigError::InvalidScaleSearch(format!(
                "step must be positive, got {}",
                self.step
            )));
        }
        if !(self.reference_band > 0.0) {
            return Err(ConfigError::InvalidScaleSearch(format!(
                "reference_band must be positive, got {}",
                self.reference_band
            )));
        }
        if self.min_width_px == 0 || self.min_width_px >= self.max_width_px {
            return Err(ConfigError::InvalidScaleSearch(format!(
                "need 0 < min_width_px < max_width_px, got {}..{}",
                self.min_width_px, self.max_width_px
            )));
        }
        Ok(())
    }

    pub fn reference_band(&self, reference: f32) -> ScaleBand {
        ScaleBand {
            begin: reference - self.reference_band,
            end: reference + self.reference_band,
            step: self.step,
        }
    }

    pub fn full_band(&self, image_width: u32) -> ScaleBand {
        let width = image_width.max(1) as f32;
        ScaleBand {
            begin: self.min_width_px as f32 / width,
            end: self.max_width_px as f32 / width,
            step: self.step,
        }
    }
}

/// Half-open range of scale factors `[begin, end)` walked in `step`s.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleBand {
    pub begin: f32,
    pub end: f32,
    pub step: f32,
}

impl ScaleBand {
    /// Scale factors to try. Never empty and never below one step.
    ///
    /// A band without a positive step tries `begin` alone.
    pub fn scales(&self) -> Vec<f32> {
        if !(self.step > 0.0) || !(self.end - self.begin).is_finite() {
            return vec![self.begin];
        }
        let begin = self.begin.max(self.step);
        let count = (((self.end - begin) / self.step) - 1e-4).ceil().max(1.0) as usize;
        (0..count).map(|i| begin + i as f32 * self.step).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    TryReferenceScale,
    TryFullRangeScale,
    Done,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectionResult {
    /// `None` when no screen matched and the registry has no fallback.
    pub screen_name: Option<String>,
    pub recognized_text: String,
    /// Scale of the winning recognition; 0.0 if nothing was recognized.
    pub scale_factor_used: f32,
    pub confidence: f32,
    /// Number of bands searched (1 or 2).
    pub ocr_batches: u32,
}

/// Settings for building a [`ScreenDetector`] and pacing detections.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub ocr_library: OcrLibrary,
    pub tesseract_prescale: bool,
    pub scale_search: ScaleSearch,
    /// Minimum delay between the starts of two detection ticks.
    pub poll_interval: Duration,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            ocr_library: OcrLibrary::default(),
            tesseract_prescale: false,
            scale_search: ScaleSearch::default(),
            poll_interval: Duration::from_secs(1),
        }
    }
}

pub struct ScreenDetector {
    backend: Box<dyn OcrBackend>,
    search: ScaleSearch,
    reference_scale: Option<f32>,
}

impl ScreenDetector {
    pub fn new(backend: Box<dyn OcrBackend>, search: ScaleSearch) -> Self {
        Self {
            backend,
            search,
            reference_scale: None,
        }
    }

    pub fn from_config(config: &DetectorConfig) -> Self {
        Self::new(
            select_backend(config.ocr_library, config.tesseract_prescale),
            config.scale_search,
        )
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn scale_search(&self) -> &ScaleSearch {
        &self.search
    }

    /// Scale that won the previous detection, if any.
    pub fn reference_scale(&self) -> Option<f32> {
        self.reference_scale
    }

    /// Recognizes the screenshot at `image` and classifies it against `registry`.
    pub fn detect(
        &mut self,
        image: &Path,
        registry: &ScreenRegistry,
    ) -> Result<DetectionResult, OcrError> {
        if !self.backend.supports_scaling() {
            let recognition = self.backend.recognize(image, 1.0)?;
            return Ok(self.finish(recognition, 1.0, 1, registry));
        }

        let mut phase = match self.reference_scale {
            Some(_) => SearchPhase::TryReferenceScale,
            None => SearchPhase::TryFullRangeScale,
        };
        let mut best: Option<(Recognition, f32)> = None;
        let mut batches = 0;

        loop {
            phase = match phase {
                SearchPhase::TryReferenceScale => {
                    let reference = self.reference_scale.unwrap_or(1.0);
                    let band = self.search.reference_band(reference);
                    debug!("Searching reference band around {:.2}", reference);
                    let candidate = self.scan(image, &band)?;
                    batches += 1;
                    let weak = registry
                        .classify(&candidate.0.text)
                        .is_none_or(|s| s.is_empty_screen());
                    best = Some(pick_better(best, candidate));
                    if weak {
                        debug!("Reference scale gave a weak match, searching full range");
                        self.reference_scale = None;
                        SearchPhase::TryFullRangeScale
                    } else {
                        SearchPhase::Done
                    }
                }
                SearchPhase::TryFullRangeScale => {
                    let band = self.search.full_band(image_width(image)?);
                    debug!(
                        "Searching full band {:.2}..{:.2}",
                        band.begin, band.end
                    );
                    let candidate = self.scan(image, &band)?;
                    batches += 1;
                    best = Some(pick_better(best, candidate));
                    SearchPhase::Done
                }
                SearchPhase::Done => break,
            };
        }

        let (recognition, scale) = best.unwrap_or_default();
        Ok(self.finish(recognition, scale, batches, registry))
    }

    /// Runs OCR at every scale of `band`, keeping the most confident result.
    fn scan(&self, image: &Path, band: &ScaleBand) -> Result<(Recognition, f32), OcrError> {
        let mut best = (Recognition::default(), 0.0);
        for scale in band.scales() {
            let recognition = self.backend.recognize(image, scale)?;
            if recognition.confidence > best.0.confidence {
                best = (recognition, scale);
            }
        }
        Ok(best)
    }

    fn finish(
        &mut self,
        recognition: Recognition,
        scale: f32,
        ocr_batches: u32,
        registry: &ScreenRegistry,
    ) -> DetectionResult {
        if self.backend.supports_scaling() {
            self.reference_scale = (scale > 0.0).then_some(scale);
        }
        if !recognition.text.is_empty() {
            info!("Best detected text: {}", recognition.text);
        }
        let screen_name = registry.classify(&recognition.text).map(|s| s.name.clone());
        debug!(
            "Detected screen {:?} at scale {:.2} (confidence {:.2}, {} batch(es))",
            screen_name, scale, recognition.confidence, ocr_batches
        );
        DetectionResult {
            screen_name,
            recognized_text: recognition.text,
            scale_factor_used: scale,
            confidence: recognition.confidence,
            ocr_batches,
        }
    }
}

fn pick_better(
    current: Option<(Recognition, f32)>,
    candidate: (Recognition, f32),
) -> (Recognition, f32) {
    match current {
        Some(current) if current.0.confidence >= candidate.0.confidence => current,
        _ => candidate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screen::ScreenDefinition;
    use image::{ImageBuffer, Rgba};
    use std::cell::RefCell;
    use std::rc::Rc;
    use tempfile::NamedTempFile;

    /// Backend whose output is a pure function of the scale.
    struct FnOcr<F> {
        respond: F,
        scaling: bool,
        calls: Rc<RefCell<Vec<f32>>>,
    }

    impl<F: Fn(f32) -> Recognition> OcrBackend for FnOcr<F> {
        fn name(&self) -> &'static str {
            "fn"
        }

        fn supports_scaling(&self) -> bool {
            self.scaling
        }

        fn recognize(&self, _image: &Path, scale: f32) -> Result<Recognition, OcrError> {
            self.calls.borrow_mut().push(scale);
            Ok((self.respond)(scale))
        }
    }

    fn detector<F: Fn(f32) -> Recognition + 'static>(
        scaling: bool,
        respond: F,
    ) -> (ScreenDetector, Rc<RefCell<Vec<f32>>>) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let backend = FnOcr {
            respond,
            scaling,
            calls: calls.clone(),
        };
        (
            ScreenDetector::new(Box::new(backend), ScaleSearch::default()),
            calls,
        )
    }

    fn recognition(text: &str, confidence: f32) -> Recognition {
        Recognition {
            text: text.to_string(),
            confidence,
        }
    }

    fn screenshot(width: u32) -> NamedTempFile {
        let img: ImageBuffer<Rgba<u8>, Vec<u8>> = ImageBuffer::new(width, 10);
        let file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        img.save(file.path()).unwrap();
        file
    }

    fn registry() -> ScreenRegistry {
        ScreenRegistry::from_definitions([
            ScreenDefinition::new("login", ["login"]),
            ScreenDefinition::new("boot", Vec::<String>::new()),
        ])
        .unwrap()
    }

    #[test]
    fn test_scale_band_counts() {
        let search = ScaleSearch::default();
        let band = search.reference_band(1.0);
        let scales = band.scales();
        assert_eq!(scales.len(), 10);
        assert!((scales[0] - 0.95).abs() < 1e-4);

        // 2000 px wide: widths 1000..2000 are scales 0.5..1.0
        let scales = search.full_band(2000).scales();
        assert_eq!(scales.len(), 50);
        assert!((scales[0] - 0.5).abs() < 1e-4);
        assert!(*scales.last().unwrap() < 1.0);
    }

    #[test]
    fn test_scale_band_never_empty_or_non_positive() {
        let band = ScaleBand {
            begin: -0.5,
            end: -0.1,
            step: 0.01,
        };
        let scales = band.scales();
        assert_eq!(scales.len(), 1);
        assert!(scales[0] > 0.0);
    }

    #[test]
    fn test_scale_band_without_step_tries_begin_only() {
        let band = ScaleSearch {
            step: 0.0,
            ..ScaleSearch::default()
        }
        .full_band(2000);
        assert_eq!(band.scales(), vec![0.5f32]);
    }

    #[test]
    fn test_validate_scale_search() {
        assert!(ScaleSearch::default().validate().is_ok());
        let bad = ScaleSearch {
            step: 0.0,
            ..ScaleSearch::default()
        };
        assert!(matches!(
            bad.validate(),
            Err(ConfigError::InvalidScaleSearch(_))
        ));
        let bad = ScaleSearch {
            min_width_px: 2000,
            max_width_px: 1000,
            ..ScaleSearch::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_non_scaling_backend_called_once() {
        let (mut detector, calls) = detector(false, |_| recognition("Please LOGIN", 0.9));
        let result = detector
            .detect(Path::new("unused.png"), &registry())
            .unwrap();

        assert_eq!(result.screen_name.as_deref(), Some("login"));
        assert_eq!(*calls.borrow(), vec![1.0f32]);
        assert_eq!(detector.reference_scale(), None);
    }

    #[test]
    fn test_first_detection_searches_full_band_and_keeps_best() {
        let shot = screenshot(2000);
        // Confidence peaks at 0.8.
        let (mut detector, calls) = detector(true, |s| {
            recognition("login", 1.0 - (s - 0.8).abs())
        });
        let result = detector.detect(shot.path(), &registry()).unwrap();

        assert_eq!(calls.borrow().len(), 50);
        assert_eq!(result.ocr_batches, 1);
        assert!((result.scale_factor_used - 0.8).abs() < 1e-3);
        assert_eq!(detector.reference_scale(), Some(result.scale_factor_used));
    }

    #[test]
    fn test_strong_reference_match_skips_full_band() {
        let shot = screenshot(2000);
        let (mut detector, calls) = detector(true, |_| recognition("login", 1.0));
        detector.detect(shot.path(), &registry()).unwrap();
        calls.borrow_mut().clear();

        let result = detector.detect(shot.path(), &registry()).unwrap();
        assert_eq!(result.screen_name.as_deref(), Some("login"));
        assert_eq!(result.ocr_batches, 1);
        assert_eq!(calls.borrow().len(), 10);
    }

    #[test]
    fn test_fallback_at_reference_triggers_full_band() {
        let shot = screenshot(2000);
        // "login" is only readable at small scales.
        let (mut detector, calls) = detector(true, |s| {
            if s < 0.6 {
                recognition("login", 2.0)
            } else {
                recognition("booting", 1.0)
            }
        });
        detector.reference_scale = Some(0.9);

        let result = detector.detect(shot.path(), &registry()).unwrap();
        assert_eq!(result.ocr_batches, 2);
        assert_eq!(calls.borrow().len(), 10 + 50);
        assert_eq!(result.screen_name.as_deref(), Some("login"));
        assert!(result.scale_factor_used < 0.6);
    }

    #[test]
    fn test_unmatched_reference_without_fallback_triggers_full_band() {
        let shot = screenshot(2000);
        let registry = ScreenRegistry::from_definitions([ScreenDefinition::new("login", ["login"])])
            .unwrap();
        let (mut detector, calls) = detector(true, |s| {
            if s < 0.6 {
                recognition("login", 2.0)
            } else {
                recognition("unrelated text", 1.0)
            }
        });
        detector.reference_scale = Some(0.9);

        let result = detector.detect(shot.path(), &registry).unwrap();
        assert_eq!(result.ocr_batches, 2);
        assert_eq!(calls.borrow().len(), 10 + 50);
        assert_eq!(result.screen_name.as_deref(), Some("login"));
    }

    #[test]
    fn test_nothing_recognized_clears_reference() {
        let shot = screenshot(2000);
        let (mut detector, _) = detector(true, |_| Recognition::default());
        detector.reference_scale = Some(0.9);

        let result = detector.detect(shot.path(), &registry()).unwrap();
        assert_eq!(result.scale_factor_used, 0.0);
        assert_eq!(result.screen_name.as_deref(), Some("boot"));
        assert_eq!(detector.reference_scale(), None);
    }

    #[test]
    fn test_backend_error_propagates() {
        let mut detector = ScreenDetector::new(
            Box::new(crate::ocr::UnavailableOcr::new("none")),
            ScaleSearch::default(),
        );
        let err = detector
            .detect(Path::new("unused.png"), &registry())
            .unwrap_err();
        assert!(matches!(err, OcrError::Unavailable(_)));
    }
}
