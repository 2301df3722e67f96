//! End-to-end pipeline runs against real files in a scratch directory.
//!
//! Run with: `cargo test -p grainlut-core --test pipeline_scenarios`

use std::path::{Path, PathBuf};
use std::sync::Arc;

use grainlut_core::lut::ColorCube;
use grainlut_core::raster;
use grainlut_core::{
    ApplyLutRequest, FilterCache, GrainConfig, LutError, LutPipeline, PipelineConfig,
    PipelineError, RasterImage, SharedGrainConfig, Stage,
};

struct Scratch {
    dir: tempfile::TempDir,
}

impl Scratch {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create scratch dir"),
        }
    }

    fn out_dir(&self) -> PathBuf {
        self.dir.path().join("cache")
    }

    fn pipeline(&self) -> LutPipeline {
        LutPipeline::new(PipelineConfig::with_cache_dir(self.out_dir()))
    }

    /// Write `image` as an 8-bit PNG and return its locator.
    fn save(&self, name: &str, image: &RasterImage) -> String {
        let path = self.dir.path().join(name);
        let buf = image::RgbaImage::from_raw(image.width, image.height, image.to_rgba8_bytes())
            .expect("buffer matches extent");
        buf.save(&path).expect("write fixture");
        path.to_string_lossy().into_owned()
    }

    fn artifacts(&self) -> usize {
        count_files(&self.out_dir())
    }
}

fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

/// A cube that maps `c` to `1 − c`.
fn inverting_cube(dimension: u32) -> ColorCube {
    let mut source = ColorCube::identity(dimension).to_tiled_raster(dimension);
    for px in source.pixels.iter_mut() {
        *px = [1.0 - px[0], 1.0 - px[1], 1.0 - px[2], 1.0];
    }
    ColorCube::build(&source, dimension).expect("valid cube")
}

fn photo(width: u32, height: u32) -> RasterImage {
    let mut pixels = Vec::new();
    for y in 0..height {
        for x in 0..width {
            pixels.push([
                x as f32 / (width - 1) as f32,
                y as f32 / (height - 1) as f32,
                0.5,
                1.0,
            ]);
        }
    }
    RasterImage::new(width, height, pixels).expect("pixel count")
}

fn decode(locator: &str) -> Vec<u8> {
    raster::load(locator).expect("decode output").to_rgba8_bytes()
}

#[test]
fn test_identity_cube_preserves_solid_blue() {
    let scratch = Scratch::new();
    let pipeline = scratch.pipeline();

    let input = RasterImage::solid(2, 2, [0.0, 0.0, 1.0, 1.0]);
    let input_loc = scratch.save("blue.png", &input);
    let lut_loc = scratch.save("identity2.png", &ColorCube::identity(2).to_tiled_raster(2));

    let request = ApplyLutRequest::new(&input_loc, "identity-2", &lut_loc)
        .lut_dimension(2)
        .compression_quality(1.0);
    let output = pipeline.apply_lut_blocking(&request).expect("pipeline run");

    assert!(output.starts_with("file://"));
    assert_eq!(decode(&output), input.to_rgba8_bytes());
    assert_eq!(scratch.artifacts(), 1);
}

#[test]
fn test_zero_opacity_grain_contributes_nothing() {
    let scratch = Scratch::new();
    let pipeline = scratch.pipeline();

    let input_loc = scratch.save("photo.png", &photo(6, 4));
    let lut_loc = scratch.save("invert4.png", &inverting_cube(4).to_tiled_raster(4));
    let grain_loc = scratch.save("grain.png", &photo(3, 9));

    pipeline.set_grain_opacity(0.0);
    pipeline.set_grain_image_blocking(&grain_loc).expect("grain loads");

    let plain = ApplyLutRequest::new(&input_loc, "invert", &lut_loc)
        .lut_dimension(4)
        .compression_quality(1.0);
    let grained = plain.clone().with_grain(true);

    let without = pipeline.apply_lut_blocking(&plain).expect("plain run");
    let with = pipeline.apply_lut_blocking(&grained).expect("grain run");

    assert_ne!(without, with, "every run writes its own artifact");
    assert_eq!(decode(&without), decode(&with));
}

#[test]
fn test_unaligned_lut_fails_without_artifact() {
    let scratch = Scratch::new();
    let pipeline = scratch.pipeline();

    let input_loc = scratch.save("photo.png", &photo(4, 4));
    let lut_loc = scratch.save("bad.png", &RasterImage::solid(5, 3, [0.5, 0.5, 0.5, 1.0]));

    let request = ApplyLutRequest::new(&input_loc, "bad", &lut_loc).lut_dimension(2);
    let err = pipeline.apply_lut_blocking(&request).unwrap_err();

    assert!(matches!(err, PipelineError::InvalidLut(_)), "{err}");
    assert_eq!(err.stage(), Stage::ResolvingFilter);
    assert_eq!(scratch.artifacts(), 0);
    assert!(!pipeline.filter_cache().contains("bad"));
}

#[test]
fn test_unreadable_lut_source_is_invalid_lut() {
    let scratch = Scratch::new();
    let pipeline = scratch.pipeline();

    let input_loc = scratch.save("photo.png", &photo(4, 4));
    let missing = scratch.dir.path().join("missing.png");
    let garbage = scratch.dir.path().join("garbage.png");
    std::fs::write(&garbage, b"not an image").unwrap();

    for (id, lut) in [("missing", &missing), ("garbage", &garbage)] {
        let lut_loc = lut.to_string_lossy().into_owned();
        let request = ApplyLutRequest::new(&input_loc, id, &lut_loc).lut_dimension(2);
        let err = pipeline.apply_lut_blocking(&request).unwrap_err();

        assert!(
            matches!(
                err,
                PipelineError::InvalidLut(LutError::SourceLoad { ref locator, .. })
                    if *locator == lut_loc
            ),
            "{err}"
        );
        assert_eq!(err.stage(), Stage::ResolvingFilter);
        assert!(!pipeline.filter_cache().contains(id));
    }
    assert_eq!(scratch.artifacts(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_runs_build_once() {
    let scratch = Scratch::new();
    let pipeline = scratch.pipeline();

    let input_loc = scratch.save("photo.png", &photo(8, 8));
    let lut_loc = scratch.save("invert8.png", &inverting_cube(8).to_tiled_raster(8));

    let request = ApplyLutRequest::new(&input_loc, "fresh", &lut_loc)
        .lut_dimension(8)
        .compression_quality(1.0);

    let (a, b) = tokio::join!(
        pipeline.apply_lut(request.clone()),
        pipeline.apply_lut(request.clone()),
    );
    let (a, b) = (a.expect("first run"), b.expect("second run"));

    assert_eq!(pipeline.filter_cache().builds(), 1);
    assert_eq!(decode(&a), decode(&b));
    assert_eq!(scratch.artifacts(), 2);
}

#[test]
fn test_unset_grain_texture_passes_image_through() {
    let scratch = Scratch::new();
    let pipeline = scratch.pipeline();

    let input_loc = scratch.save("photo.png", &photo(5, 5));
    let lut_loc = scratch.save("identity8.png", &ColorCube::identity(8).to_tiled_raster(8));

    let plain = ApplyLutRequest::new(&input_loc, "id8", &lut_loc).compression_quality(1.0);
    let without = pipeline.apply_lut_blocking(&plain).unwrap();
    let with = pipeline
        .apply_lut_blocking(&plain.clone().with_grain(true))
        .unwrap();
    assert_eq!(decode(&without), decode(&with));
}

#[test]
fn test_grain_override_wins_over_shared_config() {
    let scratch = Scratch::new();
    let pipeline = scratch.pipeline();

    let input_loc = scratch.save("dark.png", &RasterImage::solid(4, 4, [0.2, 0.2, 0.2, 1.0]));
    let lut_loc = scratch.save("identity2.png", &ColorCube::identity(2).to_tiled_raster(2));

    // Shared config would be a no-op; the override screens in white at full opacity.
    pipeline.set_grain_opacity(0.0);
    let grain = GrainConfig::default()
        .with_image(RasterImage::solid(2, 2, [1.0, 1.0, 1.0, 1.0]))
        .with_opacity(1.0)
        .with_blend_mode("CIScreenBlendMode");

    let request = ApplyLutRequest::new(&input_loc, "identity-2", &lut_loc)
        .lut_dimension(2)
        .compression_quality(1.0)
        .grain_override(grain);
    let output = pipeline.apply_lut_blocking(&request).unwrap();

    assert!(decode(&output).iter().all(|&v| v == 255));
}

#[test]
fn test_filter_stays_cached_after_a_later_stage_fails() {
    let scratch = Scratch::new();
    let blocker = scratch.dir.path().join("blocker");
    std::fs::write(&blocker, b"not a directory").unwrap();

    let pipeline = LutPipeline::new(PipelineConfig::with_cache_dir(blocker.join("out")));
    let input_loc = scratch.save("photo.png", &photo(3, 3));
    let lut_loc = scratch.save("identity2.png", &ColorCube::identity(2).to_tiled_raster(2));

    let request = ApplyLutRequest::new(&input_loc, "kept", &lut_loc).lut_dimension(2);
    let err = pipeline.apply_lut_blocking(&request).unwrap_err();

    assert!(matches!(err, PipelineError::Persist { .. }), "{err}");
    assert!(pipeline.filter_cache().contains("kept"));
}

#[test]
fn test_reusing_a_filter_id_for_another_lut_is_rejected() {
    let scratch = Scratch::new();
    let pipeline = scratch.pipeline();

    let input_loc = scratch.save("photo.png", &photo(3, 3));
    let first = scratch.save("a.png", &ColorCube::identity(2).to_tiled_raster(2));
    let second = scratch.save("b.png", &inverting_cube(2).to_tiled_raster(2));

    let request = ApplyLutRequest::new(&input_loc, "look", &first).lut_dimension(2);
    pipeline.apply_lut_blocking(&request).unwrap();

    let reuse = ApplyLutRequest::new(&input_loc, "look", &second).lut_dimension(2);
    let err = pipeline.apply_lut_blocking(&reuse).unwrap_err();
    assert!(matches!(err, PipelineError::InvalidLut(_)), "{err}");
    assert_eq!(pipeline.filter_cache().builds(), 1);
}

#[test]
fn test_pipelines_can_share_injected_state() {
    let scratch = Scratch::new();
    let cache = Arc::new(FilterCache::default());
    let grain = SharedGrainConfig::default();

    let a = LutPipeline::with_shared(
        PipelineConfig::with_cache_dir(scratch.out_dir()),
        Arc::clone(&cache),
        grain.clone(),
    );
    let b = LutPipeline::with_shared(
        PipelineConfig::with_cache_dir(scratch.out_dir()),
        Arc::clone(&cache),
        grain.clone(),
    );

    let input_loc = scratch.save("photo.png", &photo(3, 3));
    let lut_loc = scratch.save("identity2.png", &ColorCube::identity(2).to_tiled_raster(2));
    let request = ApplyLutRequest::new(&input_loc, "shared", &lut_loc).lut_dimension(2);

    a.apply_lut_blocking(&request).unwrap();
    b.apply_lut_blocking(&request).unwrap();
    assert_eq!(cache.builds(), 1);

    a.set_grain_blend_mode("multiply");
    assert_eq!(b.grain_config().snapshot().blend_mode, "multiply");
}
