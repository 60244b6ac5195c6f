//! Batch JPEG Resizer Library
//!
//! Core logic for bringing JPEGs up to a minimum resolution and under a byte
//! budget. Shared between the CLI and any caller holding image bytes.
//!
//! Every image goes through two phases, always in this order: an upscale-only
//! Lanczos3 resample to the minimum dimensions, then repeated JPEG encodes at
//! falling quality until the output fits the budget or the quality floor is hit.

use image::imageops::{self, FilterType};
use image::RgbImage;
use std::borrow::Cow;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

/// JPEG quality of the first encode attempt
pub const INITIAL_QUALITY: u8 = 85;

/// Quality drop between two encode attempts
pub const QUALITY_STEP: u8 = 5;

/// Lowest quality the encoder drops to unless configured otherwise
pub const DEFAULT_QUALITY_FLOOR: u8 = 10;

/// Largest width or height a baseline JPEG can carry
pub const MAX_JPEG_DIMENSION: u32 = u16::MAX as u32;

/// Constraints applied to every image of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeConstraints {
    /// Minimum output width in pixels
    pub min_width: u32,
    /// Minimum output height in pixels
    pub min_height: u32,
    /// Encoded size budget in bytes (best effort, see `quality_floor`)
    pub max_size_bytes: u64,
    /// Lowest JPEG quality used while shrinking towards the budget
    pub quality_floor: u8,
}

impl Default for ResizeConstraints {
    fn default() -> Self {
        Self::with_max_size_kb(560, 740, 500)
    }
}

impl ResizeConstraints {
    /// Build constraints from a budget in kilobytes, where 1 KB is 1000 bytes.
    pub fn with_max_size_kb(min_width: u32, min_height: u32, max_size_kb: u64) -> Self {
        Self {
            min_width,
            min_height,
            max_size_bytes: max_size_kb.saturating_mul(1000),
            quality_floor: DEFAULT_QUALITY_FLOOR,
        }
    }

    /// Reject a quality floor outside `1..=85`. A zero minimum or budget is allowed.
    pub fn validate(&self) -> Result<(), ResizeError> {
        if self.quality_floor == 0 || self.quality_floor > INITIAL_QUALITY {
            return Err(ResizeError::InvalidConstraints(format!(
                "quality floor must be between 1 and {}",
                INITIAL_QUALITY
            )));
        }
        Ok(())
    }

    /// Upper bound on encode attempts made by [`reconcile`].
    ///
    /// 16 for the default floor: qualities 85, 80, ..., 15, 10.
    pub fn max_attempts(&self) -> u32 {
        let span = (INITIAL_QUALITY - self.effective_floor()) as u32;
        span.div_ceil(QUALITY_STEP as u32) + 1
    }

    fn effective_floor(&self) -> u8 {
        self.quality_floor.clamp(1, INITIAL_QUALITY)
    }
}

/// Error type for resize operations
#[derive(Debug, Error)]
pub enum ResizeError {
    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("invalid constraints: {0}")]
    InvalidConstraints(String),

    #[error("failed to read image: {0}")]
    Read(#[source] std::io::Error),

    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("failed to encode JPEG: {0}")]
    Encoding(String),

    #[error("failed to write output: {0}")]
    Write(#[source] std::io::Error),

    #[error(transparent)]
    File(Box<FileFailure>),
}

/// A per-file error tagged with the source path it came from
#[derive(Debug, Error)]
#[error("failed to process image {}: {error}", .path.display())]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: ResizeError,
}

impl From<FileFailure> for ResizeError {
    fn from(failure: FileFailure) -> Self {
        ResizeError::File(Box::new(failure))
    }
}

/// Encoded output of one reconciled image
#[derive(Debug, Clone)]
pub struct EncodedResult {
    /// JPEG bytes
    pub bytes: Vec<u8>,
    /// Quality the bytes were encoded at
    pub quality: u8,
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
    /// Whether phase 1 enlarged the image
    pub upscaled: bool,
    /// Number of encodes performed
    pub attempts: u32,
}

impl EncodedResult {
    /// True when the encoded bytes fit `max_size_bytes`
    pub fn within_budget(&self, constraints: &ResizeConstraints) -> bool {
        self.bytes.len() as u64 <= constraints.max_size_bytes
    }
}

/// Scale factor that brings `width`x`height` up to the minimum dimensions.
///
/// Never below 1.0: images are only ever enlarged.
pub fn upscale_factor(width: u32, height: u32, min_width: u32, min_height: u32) -> f64 {
    let scale_w = min_width as f64 / width as f64;
    let scale_h = min_height as f64 / height as f64;
    scale_w.max(scale_h).max(1.0)
}

/// Output dimensions after phase 1, rounded half up.
pub fn target_dimensions(width: u32, height: u32, constraints: &ResizeConstraints) -> (u32, u32) {
    let scale = upscale_factor(width, height, constraints.min_width, constraints.min_height);
    if scale <= 1.0 {
        return (width, height);
    }

    let new_w = (width as f64 * scale).round() as u32;
    let new_h = (height as f64 * scale).round() as u32;
    (new_w.max(1), new_h.max(1))
}

fn check_jpeg_dimensions(width: u32, height: u32) -> Result<(), ResizeError> {
    if width == 0 || height == 0 {
        return Err(ResizeError::Encoding("image has no pixels".to_string()));
    }
    if width > MAX_JPEG_DIMENSION || height > MAX_JPEG_DIMENSION {
        return Err(ResizeError::Encoding(format!(
            "{}x{} exceeds the JPEG limit of {} pixels per side",
            width, height, MAX_JPEG_DIMENSION
        )));
    }
    Ok(())
}

/// Encode an RGB image as a baseline JPEG
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, ResizeError> {
    let (width, height) = image.dimensions();
    check_jpeg_dimensions(width, height)?;

    let mut jpeg_bytes = Vec::new();
    let mut encoder = jpeg_encoder::Encoder::new(&mut jpeg_bytes, quality.clamp(1, 100));
    encoder.set_sampling_factor(jpeg_encoder::SamplingFactor::R_4_2_0);
    encoder
        .encode(
            image.as_raw(),
            width as u16,
            height as u16,
            jpeg_encoder::ColorType::Rgb,
        )
        .map_err(|e| ResizeError::Encoding(e.to_string()))?;

    Ok(jpeg_bytes)
}

/// Decode any supported image and flatten it to 8-bit RGB.
///
/// Alpha is dropped and palettes are expanded.
pub fn decode_rgb(bytes: &[u8]) -> Result<RgbImage, ResizeError> {
    let img = image::load_from_memory(bytes).map_err(ResizeError::Decode)?;
    Ok(img.to_rgb8())
}

/// Bring an image up to the minimum resolution and fit it under the byte budget.
pub fn reconcile(
    image: &RgbImage,
    constraints: &ResizeConstraints,
) -> Result<EncodedResult, ResizeError> {
    reconcile_with(image, constraints, encode_jpeg)
}

/// [`reconcile`] with a caller-supplied encoder.
///
/// `encode` receives the (possibly upscaled) image and a quality in
/// `quality_floor..=85` and must return the encoded bytes.
pub fn reconcile_with<E>(
    image: &RgbImage,
    constraints: &ResizeConstraints,
    mut encode: E,
) -> Result<EncodedResult, ResizeError>
where
    E: FnMut(&RgbImage, u8) -> Result<Vec<u8>, ResizeError>,
{
    let (orig_w, orig_h) = image.dimensions();
    check_jpeg_dimensions(orig_w, orig_h)?;

    // Phase 1: upscale only
    let (width, height) = target_dimensions(orig_w, orig_h, constraints);
    check_jpeg_dimensions(width, height)?;
    let upscaled = (width, height) != (orig_w, orig_h);

    let pixels: Cow<'_, RgbImage> = if upscaled {
        debug!(orig_w, orig_h, width, height, "upscaling to minimum resolution");
        Cow::Owned(imageops::resize(image, width, height, FilterType::Lanczos3))
    } else {
        Cow::Borrowed(image)
    };

    // Phase 2: lower quality until the budget fits or the floor is reached
    let floor = constraints.effective_floor();
    let mut quality = INITIAL_QUALITY;
    let mut bytes = encode(&*pixels, quality)?;
    let mut attempts = 1;
    debug!(quality, size = bytes.len(), "encoded");

    while bytes.len() as u64 > constraints.max_size_bytes && quality > floor {
        quality = quality.saturating_sub(QUALITY_STEP).max(floor);
        bytes = encode(&*pixels, quality)?;
        attempts += 1;
        debug!(quality, size = bytes.len(), "re-encoded");
    }

    Ok(EncodedResult {
        bytes,
        quality,
        width,
        height,
        upscaled,
        attempts,
    })
}

/// Decode image bytes and reconcile them in one step
pub fn reconcile_bytes(
    input_bytes: &[u8],
    constraints: &ResizeConstraints,
) -> Result<EncodedResult, ResizeError> {
    let image = decode_rgb(input_bytes)?;
    reconcile(&image, constraints)
}

pub mod file_ops {
    //! Directory traversal, candidate selection and output writing.

    use super::*;
    use std::fs;
    use std::io;
    use std::path::Path;
    use tracing::{error, info, warn};
    use walkdir::WalkDir;

    /// What the walker does when a single file fails
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum ErrorPolicy {
        /// Abort the batch on the first failure
        #[default]
        Stop,
        /// Record the failure and keep going
        Continue,
    }

    /// Options for a batch run
    #[derive(Debug, Clone)]
    pub struct WalkOptions {
        pub constraints: ResizeConstraints,
        /// Appended to the stem of every output, after an underscore
        pub suffix: String,
        pub on_error: ErrorPolicy,
    }

    impl Default for WalkOptions {
        fn default() -> Self {
            Self {
                constraints: ResizeConstraints::default(),
                suffix: "resized".to_string(),
                on_error: ErrorPolicy::Stop,
            }
        }
    }

    impl WalkOptions {
        pub fn validate(&self) -> Result<(), ResizeError> {
            self.constraints.validate()?;
            if self.suffix.is_empty() {
                return Err(ResizeError::InvalidConstraints(
                    "suffix must not be empty".to_string(),
                ));
            }
            if self.suffix.contains(['/', '\\', '.']) {
                return Err(ResizeError::InvalidConstraints(format!(
                    "suffix {:?} must not contain path separators or dots",
                    self.suffix
                )));
            }
            Ok(())
        }
    }

    /// Result of a batch run
    #[derive(Debug, Default)]
    pub struct WalkSummary {
        pub candidates: usize,
        pub processed: usize,
        pub upscaled: usize,
        /// Written at the quality floor while still over the byte budget
        pub over_budget: usize,
        pub failures: Vec<FileFailure>,
    }

    /// A processed file
    #[derive(Debug, Clone)]
    pub struct FileOutcome {
        pub input: PathBuf,
        pub output: PathBuf,
        pub width: u32,
        pub height: u32,
        pub quality: u8,
        pub size_bytes: usize,
        pub upscaled: bool,
        pub within_budget: bool,
    }

    /// A candidate and the path it would be written to
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct PlannedFile {
        pub input: PathBuf,
        pub output: PathBuf,
    }

    /// Name-based part of the candidate predicate.
    ///
    /// True for `.jpg`/`.jpeg` (any case) whose stem does not already contain
    /// `_<suffix>`. Does not touch the filesystem.
    pub fn is_candidate_name(path: &Path, suffix: &str) -> bool {
        let is_jpeg = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"))
            .unwrap_or(false);
        if !is_jpeg {
            return false;
        }

        let marker = format!("_{}", suffix);
        path.file_stem()
            .map(|stem| !stem.to_string_lossy().contains(&marker))
            .unwrap_or(false)
    }

    /// `dir/name.ext` becomes `dir/name_<suffix>.ext`, keeping the extension's case
    pub fn output_path(path: &Path, suffix: &str) -> Option<PathBuf> {
        let stem = path.file_stem()?;
        let ext = path.extension()?;

        let mut name = stem.to_os_string();
        name.push("_");
        name.push(suffix);
        name.push(".");
        name.push(ext);
        Some(path.with_file_name(name))
    }

    /// Snapshot every candidate under `root`, sorted by path.
    ///
    /// Unreadable entries are logged and skipped.
    pub fn collect_candidates(root: &Path, suffix: &str) -> Result<Vec<PathBuf>, ResizeError> {
        if !root.is_dir() {
            return Err(ResizeError::NotADirectory(root.to_path_buf()));
        }

        let mut out = Vec::new();
        for entry in WalkDir::new(root) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(error = %err, "skipping unreadable entry");
                    continue;
                }
            };
            // follows symlinks to files, directory symlinks are not descended
            if !entry.path().is_file() {
                continue;
            }
            if is_candidate_name(entry.path(), suffix) {
                out.push(entry.into_path());
            }
        }
        out.sort();
        Ok(out)
    }

    /// List what a run would do without writing anything
    pub fn plan(root: &Path, options: &WalkOptions) -> Result<Vec<PlannedFile>, ResizeError> {
        options.validate()?;
        let candidates = collect_candidates(root, &options.suffix)?;
        Ok(candidates
            .into_iter()
            .filter_map(|input| {
                let output = output_path(&input, &options.suffix)?;
                Some(PlannedFile { input, output })
            })
            .collect())
    }

    /// Read, reconcile and write one file
    pub fn process_file(
        path: &Path,
        constraints: &ResizeConstraints,
        suffix: &str,
    ) -> Result<FileOutcome, FileFailure> {
        let fail = |error: ResizeError| FileFailure {
            path: path.to_path_buf(),
            error,
        };

        let output = output_path(path, suffix).ok_or_else(|| {
            fail(ResizeError::Write(io::Error::new(
                io::ErrorKind::InvalidInput,
                "cannot derive an output name",
            )))
        })?;

        let input_bytes = fs::read(path).map_err(|e| fail(ResizeError::Read(e)))?;
        let result = reconcile_bytes(&input_bytes, constraints).map_err(fail)?;

        // latest run wins: an existing output is replaced
        fs::write(&output, &result.bytes).map_err(|e| fail(ResizeError::Write(e)))?;

        info!(
            input = %path.display(),
            output = %output.display(),
            width = result.width,
            height = result.height,
            quality = result.quality,
            size = result.bytes.len(),
            "wrote image"
        );

        Ok(FileOutcome {
            input: path.to_path_buf(),
            output,
            width: result.width,
            height: result.height,
            quality: result.quality,
            size_bytes: result.bytes.len(),
            upscaled: result.upscaled,
            within_budget: result.within_budget(constraints),
        })
    }

    /// Process every candidate under `root`.
    ///
    /// Under [`ErrorPolicy::Stop`] the first failure is returned as
    /// [`ResizeError::File`]; files written before it stay on disk.
    pub fn walk(root: &Path, options: &WalkOptions) -> Result<WalkSummary, ResizeError> {
        options.validate()?;
        let candidates = collect_candidates(root, &options.suffix)?;

        let mut summary = WalkSummary {
            candidates: candidates.len(),
            ..Default::default()
        };

        for path in candidates {
            match process_file(&path, &options.constraints, &options.suffix) {
                Ok(outcome) => {
                    summary.processed += 1;
                    if outcome.upscaled {
                        summary.upscaled += 1;
                    }
                    if !outcome.within_budget {
                        summary.over_budget += 1;
                        warn!(
                            input = %outcome.input.display(),
                            size = outcome.size_bytes,
                            max_size = options.constraints.max_size_bytes,
                            "over budget at the quality floor"
                        );
                    }
                }
                Err(failure) => match options.on_error {
                    ErrorPolicy::Stop => return Err(failure.into()),
                    ErrorPolicy::Continue => {
                        error!(
                            input = %failure.path.display(),
                            error = %failure.error,
                            "skipping image"
                        );
                        summary.failures.push(failure);
                    }
                },
            }
        }

        Ok(summary)
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgb, Rgba, RgbaImage};
    use std::io::Cursor;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        })
    }

    fn noise(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            let mut h = x.wrapping_mul(0x9E37_79B1) ^ y.wrapping_mul(0x85EB_CA77);
            h ^= h >> 15;
            h = h.wrapping_mul(0x2C1B_3C6D);
            h ^= h >> 12;
            Rgb([h as u8, (h >> 8) as u8, (h >> 16) as u8])
        })
    }

    /// Fake encoder whose output grows linearly with quality
    fn sized_by_quality(per_step: usize) -> impl FnMut(&RgbImage, u8) -> Result<Vec<u8>, ResizeError> {
        move |_: &RgbImage, quality: u8| Ok(vec![0u8; quality as usize * per_step])
    }

    #[test]
    fn test_upscale_factor_never_below_one() {
        assert_eq!(upscale_factor(2000, 3000, 560, 740), 1.0);
        assert_eq!(upscale_factor(560, 740, 560, 740), 1.0);
        assert!((upscale_factor(100, 100, 560, 740) - 7.4).abs() < 1e-12);
        assert!((upscale_factor(280, 740, 560, 740) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_target_dimensions() {
        let c = ResizeConstraints::default();

        assert_eq!(target_dimensions(100, 100, &c), (740, 740));
        // width drives: 560/300, height 400 * 1.8667 = 746.67 rounds up
        assert_eq!(target_dimensions(300, 400, &c), (560, 747));
        // height drives a wide image
        assert_eq!(target_dimensions(1000, 100, &c), (7400, 740));
        assert_eq!(target_dimensions(2000, 3000, &c), (2000, 3000));
        assert_eq!(target_dimensions(560, 740, &c), (560, 740));
        // tall enough but too narrow
        assert_eq!(target_dimensions(280, 1000, &c), (560, 2000));
    }

    #[test]
    fn test_target_dimensions_meet_minimum_and_keep_aspect() {
        let c = ResizeConstraints::default();
        for &(w, h) in &[(3, 7), (17, 1), (123, 457), (559, 739), (1, 1), (640, 10)] {
            let (nw, nh) = target_dimensions(w, h, &c);
            assert!(nw >= c.min_width, "{}x{} -> {}x{}", w, h, nw, nh);
            assert!(nh >= c.min_height, "{}x{} -> {}x{}", w, h, nw, nh);

            let scale = upscale_factor(w, h, c.min_width, c.min_height);
            assert!((nw as f64 - w as f64 * scale).abs() <= 0.5);
            assert!((nh as f64 - h as f64 * scale).abs() <= 0.5);
        }
    }

    #[test]
    fn test_max_attempts() {
        assert_eq!(ResizeConstraints::default().max_attempts(), 16);

        let mut c = ResizeConstraints::default();
        c.quality_floor = 85;
        assert_eq!(c.max_attempts(), 1);
        c.quality_floor = 12;
        assert_eq!(c.max_attempts(), 16);
    }

    #[test]
    fn test_validate() {
        assert!(ResizeConstraints::default().validate().is_ok());

        let mut c = ResizeConstraints::default();
        c.quality_floor = 0;
        assert!(c.validate().is_err());
        c.quality_floor = 90;
        assert!(c.validate().is_err());

        // a zero minimum means no floor on that side
        let mut c = ResizeConstraints::default();
        c.min_width = 0;
        c.min_height = 0;
        assert!(c.validate().is_ok());

        let c = ResizeConstraints::with_max_size_kb(16, 16, 0);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_zero_minimum_leaves_that_side_alone() {
        let c = ResizeConstraints::with_max_size_kb(0, 740, 500);
        assert_eq!(target_dimensions(100, 100, &c), (740, 740));

        let c = ResizeConstraints::with_max_size_kb(0, 0, 500);
        assert_eq!(target_dimensions(30, 20, &c), (30, 20));
    }

    #[test]
    fn test_zero_budget_ends_at_floor() {
        let c = ResizeConstraints::with_max_size_kb(16, 16, 0);
        let result = reconcile(&gradient(16, 16), &c).unwrap();
        assert_eq!(result.quality, DEFAULT_QUALITY_FLOOR);
        assert_eq!(result.attempts, 16);
        assert!(!result.within_budget(&c));
    }

    #[test]
    fn test_first_encode_fits() {
        let img = gradient(600, 800);
        let c = ResizeConstraints::default();

        let result = reconcile_with(&img, &c, sized_by_quality(10)).unwrap();
        assert_eq!(result.quality, INITIAL_QUALITY);
        assert_eq!(result.attempts, 1);
        assert!(!result.upscaled);
        assert_eq!((result.width, result.height), (600, 800));
    }

    #[test]
    fn test_quality_steps_down_to_budget() {
        let img = gradient(600, 800);
        let mut c = ResizeConstraints::default();
        c.max_size_bytes = 50_000;

        let mut seen = Vec::new();
        let result = reconcile_with(&img, &c, |pixels, quality| {
            assert_eq!(pixels.dimensions(), (600, 800));
            seen.push(quality);
            Ok(vec![0u8; quality as usize * 1000])
        })
        .unwrap();

        assert_eq!(result.quality, 50);
        assert_eq!(result.bytes.len(), 50_000);
        assert_eq!(seen, vec![85, 80, 75, 70, 65, 60, 55, 50]);
        assert_eq!(result.attempts, 8);
    }

    #[test]
    fn test_floor_is_best_effort() {
        let img = gradient(600, 800);
        let mut c = ResizeConstraints::default();
        c.max_size_bytes = 1;

        let result = reconcile_with(&img, &c, sized_by_quality(1000)).unwrap();
        assert_eq!(result.quality, DEFAULT_QUALITY_FLOOR);
        assert_eq!(result.attempts, c.max_attempts());
        assert_eq!(result.attempts, 16);
        assert!(!result.within_budget(&c));
    }

    #[test]
    fn test_unaligned_floor_is_hit_exactly() {
        let img = gradient(600, 800);
        let mut c = ResizeConstraints::default();
        c.max_size_bytes = 1;
        c.quality_floor = 12;

        let mut seen = Vec::new();
        let result = reconcile_with(&img, &c, |_, quality| {
            seen.push(quality);
            Ok(vec![0u8; 100])
        })
        .unwrap();

        assert_eq!(result.quality, 12);
        assert_eq!(seen.last(), Some(&12));
        assert_eq!(seen[seen.len() - 2], 15);
    }

    #[test]
    fn test_encoder_error_propagates() {
        let img = gradient(600, 800);
        let err = reconcile_with(&img, &ResizeConstraints::default(), |_, _| {
            Err(ResizeError::Encoding("boom".to_string()))
        })
        .unwrap_err();
        assert!(matches!(err, ResizeError::Encoding(msg) if msg == "boom"));
    }

    #[test]
    fn test_input_is_not_mutated() {
        let img = gradient(50, 60);
        let before = img.clone();
        let result = reconcile(&img, &ResizeConstraints::default()).unwrap();
        assert!(result.upscaled);
        assert_eq!(img, before);
    }

    #[test]
    fn test_upscales_small_image() {
        let img = gradient(100, 100);
        let c = ResizeConstraints::default();

        let result = reconcile(&img, &c).unwrap();
        assert_eq!((result.width, result.height), (740, 740));
        assert!(result.upscaled);
        assert!(result.within_budget(&c));

        let decoded = decode_rgb(&result.bytes).unwrap();
        assert_eq!(decoded.dimensions(), (740, 740));
    }

    #[test]
    fn test_large_image_keeps_dimensions_and_drops_quality() {
        let img = noise(400, 400);
        let first = encode_jpeg(&img, INITIAL_QUALITY).unwrap();

        let mut c = ResizeConstraints::default();
        c.min_width = 64;
        c.min_height = 64;
        c.max_size_bytes = first.len() as u64 - 1;

        let result = reconcile(&img, &c).unwrap();
        assert_eq!((result.width, result.height), (400, 400));
        assert!(!result.upscaled);
        assert!(result.quality < INITIAL_QUALITY);
        assert!(result.within_budget(&c) || result.quality == c.quality_floor);
        assert!(result.attempts <= c.max_attempts());
    }

    #[test]
    fn test_oversized_target_is_rejected() {
        let img = gradient(1, 1);
        let mut c = ResizeConstraints::default();
        c.min_width = 70_000;
        c.min_height = 1;

        let err = reconcile(&img, &c).unwrap_err();
        assert!(matches!(err, ResizeError::Encoding(_)));
    }

    #[test]
    fn test_encode_jpeg() {
        let data = encode_jpeg(&gradient(10, 10), 80).unwrap();
        // SOI marker
        assert_eq!(&data[0..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_reconcile_bytes_rejects_garbage() {
        let err = reconcile_bytes(b"not an image", &ResizeConstraints::default()).unwrap_err();
        assert!(matches!(err, ResizeError::Decode(_)));
    }

    #[test]
    fn test_reconcile_bytes_flattens_alpha() {
        let rgba = RgbaImage::from_pixel(20, 30, Rgba([200, 100, 50, 0]));
        let mut png = Vec::new();
        DynamicImage::ImageRgba8(rgba)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();

        let mut c = ResizeConstraints::default();
        c.min_width = 40;
        c.min_height = 40;

        let result = reconcile_bytes(&png, &c).unwrap();
        // width drives: 40/20
        assert_eq!((result.width, result.height), (40, 60));
        assert_eq!(&result.bytes[0..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_file_failure_names_path() {
        let failure = FileFailure {
            path: PathBuf::from("photos/a.jpg"),
            error: ResizeError::Encoding("boom".to_string()),
        };
        let msg = ResizeError::from(failure).to_string();
        assert!(msg.contains("photos/a.jpg"));
        assert!(msg.contains("boom"));
    }
}
