mod common;

use std::sync::Arc;

use colonycount::detection::{colonies, contours, preprocessing, qc};
use colonycount::{
    AnalysisConfig, AnalysisError, ColonyPipeline, MaskStep, PipelineContext, analyze_image,
};
use common::*;
use image::{GrayImage, Rgb};

fn scale_sq(config: &AnalysisConfig) -> f64 {
    config.pixel_scale_um * config.pixel_scale_um
}

#[test]
fn test_flat_plate_has_no_colonies() -> anyhow::Result<()> {
    let img = uniform_plate(100, 100, BACKGROUND);
    for base in [AnalysisConfig::unstained(), AnalysisConfig::stained()] {
        let config = base.with_working_size(100, 100);
        let result = analyze_image(&img, &config)?;
        assert_eq!(result.count, 0);
        assert_eq!(result.avg_area, 0.0);
        assert!(result.areas.is_empty());
        assert_eq!(result.std_dev(), 0.0);
    }
    Ok(())
}

#[test]
fn test_black_plate_has_no_colonies() -> anyhow::Result<()> {
    let img = uniform_plate(100, 100, 0);
    let config = AnalysisConfig::unstained().with_working_size(100, 100);
    let result = analyze_image(&img, &config)?;
    assert_eq!(result.count, 0);
    Ok(())
}

#[test]
fn test_single_disc_measured_before_morphology() -> anyhow::Result<()> {
    let colony = disc(150, 100, 25);
    let img = plate_with_discs(&[colony]);
    let config = plate_config(AnalysisConfig::unstained());

    let (_, mask) = preprocessing::correct(
        &img,
        config.gradient_resolution,
        config.median_radius,
        config.significance_multiplier,
    )?;
    let found = contours::find_outer_contours(&mask);
    let outcome = colonies::filter(&found, 1.0, 100.0, false);

    assert_eq!(outcome.count, 1);
    assert_close(outcome.areas[0], colony.area(), 0.08);
    Ok(())
}

#[test]
fn test_single_disc_unstained() -> anyhow::Result<()> {
    let colony = disc(150, 100, 25);
    let config = plate_config(AnalysisConfig::unstained());
    let result = analyze_image(&plate_with_discs(&[colony]), &config)?;

    assert_eq!(result.count, 1);
    // Closing plus dilation grows the region outward.
    let disc_um2 = colony.area() * scale_sq(&config);
    assert!(result.areas[0] > disc_um2);
    assert!(result.areas[0] < disc_um2 * 2.5);
    Ok(())
}

#[test]
fn test_single_disc_stained() -> anyhow::Result<()> {
    let colony = disc(150, 100, 25);
    let config = plate_config(AnalysisConfig::stained());
    let result = analyze_image(&plate_with_discs(&[colony]), &config)?;

    assert_eq!(result.count, 1);
    assert_close(result.areas[0], colony.area() * scale_sq(&config), 0.12);
    Ok(())
}

#[test]
fn test_two_discs_counted_separately() -> anyhow::Result<()> {
    let img = plate_with_discs(&[disc(80, 100, 25), disc(220, 100, 25)]);
    for base in [AnalysisConfig::unstained(), AnalysisConfig::stained()] {
        let result = analyze_image(&img, &plate_config(base))?;
        assert_eq!(result.count, 2);
        assert_close(result.areas[0], result.areas[1], 0.05);
    }
    Ok(())
}

#[test]
fn test_two_discs_of_different_size_measured_end_to_end() -> anyhow::Result<()> {
    let discs = [disc(90, 100, 30), disc(210, 100, 20)];
    let config = AnalysisConfig {
        pixel_scale_um: 1.0,
        min_colony_size_um2: 50.0,
        ..plate_config(AnalysisConfig::stained())
    };
    let result = analyze_image(&plate_with_discs(&discs), &config)?;
    assert_eq!(result.count, 2);

    let expected_sum: f64 = discs.iter().map(|d| d.area()).sum();
    assert_close(result.sum_area(), expected_sum, 0.05);

    let mut measured = result.areas.clone();
    measured.sort_by(f64::total_cmp);
    let mut expected: Vec<f64> = discs.iter().map(|d| d.area()).collect();
    expected.sort_by(f64::total_cmp);
    for (area, want) in measured.iter().zip(&expected) {
        assert_close(*area, *want, 0.06);
    }
    Ok(())
}

#[test]
fn test_single_disc_measured_end_to_end_at_unit_scale() -> anyhow::Result<()> {
    let colony = disc(150, 100, 25);
    let config = AnalysisConfig {
        pixel_scale_um: 1.0,
        min_colony_size_um2: 50.0,
        ..plate_config(AnalysisConfig::stained())
    };
    let result = analyze_image(&plate_with_discs(&[colony]), &config)?;
    assert_eq!(result.count, 1);
    assert_close(result.areas[0], colony.area(), 0.06);
    Ok(())
}

#[test]
fn test_gradient_background_is_corrected() -> anyhow::Result<()> {
    let img = gradient_plate_with_discs(&[disc(60, 60, 18), disc(150, 140, 20), disc(240, 70, 18)]);
    for base in [AnalysisConfig::unstained(), AnalysisConfig::stained()] {
        let result = analyze_image(&img, &plate_config(base))?;
        assert_eq!(result.count, 3);
    }
    Ok(())
}

#[test]
fn test_result_fields_are_consistent() -> anyhow::Result<()> {
    let img = plate_with_discs(&[disc(60, 60, 18), disc(150, 140, 22), disc(240, 70, 20)]);
    let config = plate_config(AnalysisConfig::unstained());
    let result = analyze_image(&img, &config)?;

    assert_eq!(result.areas.len(), result.count);
    assert_eq!(result.accepted.len(), result.count);
    assert!(result.areas.iter().all(|&a| a > config.min_colony_size_um2));
    let mean = result.sum_area() / result.count as f64;
    assert!((result.avg_area - mean).abs() < 1e-9);
    assert!(result.std_dev() > 0.0);
    Ok(())
}

#[test]
fn test_refiltering_accepted_contours_is_stable() -> anyhow::Result<()> {
    let img = plate_with_discs(&[disc(80, 100, 25), disc(220, 100, 20)]);
    for base in [AnalysisConfig::unstained(), AnalysisConfig::stained()] {
        let config = plate_config(base);
        let result = analyze_image(&img, &config)?;
        let again = colonies::filter(
            &result.accepted,
            config.pixel_scale_um,
            config.min_colony_size_um2,
            config.variant.smooths_contours(),
        );
        assert_eq!(again.count, result.count);
        assert_eq!(again.areas, result.areas);
    }
    Ok(())
}

#[test]
fn test_hull_smoothing_never_shrinks_colonies() -> anyhow::Result<()> {
    let img = plate_with_discs(&[disc(80, 100, 25), disc(220, 100, 20)]);
    let config = plate_config(AnalysisConfig::stained());

    let smoothed = ColonyPipeline::new(config.clone())?.analyze(&img)?;
    let raw = ColonyPipeline::new(config)?.with_smoothing(false).analyze(&img)?;

    assert_eq!(smoothed.count, raw.count);
    for (hull, area) in smoothed.areas.iter().zip(&raw.areas) {
        assert!(hull >= area, "hull {} smaller than raw {}", hull, area);
    }
    Ok(())
}

#[test]
fn test_qc_image_shows_contours_and_gauge() -> anyhow::Result<()> {
    let config = plate_config(AnalysisConfig::unstained());
    let result = analyze_image(&plate_with_discs(&[disc(150, 100, 25)]), &config)?;

    assert_eq!(result.qc_image.dimensions(), (PLATE_WIDTH, PLATE_HEIGHT));
    assert!(result.qc_image.pixels().any(|p| *p == Rgb([0, 255, 255])));

    let radius = qc::gauge_radius_px(config.min_colony_size_um2, config.pixel_scale_um);
    assert_eq!(radius, 3);
    assert_eq!(*result.qc_image.get_pixel(radius as u32, 0), Rgb([255, 255, 255]));
    Ok(())
}

#[test]
fn test_input_image_is_not_modified() -> anyhow::Result<()> {
    let img = plate_with_discs(&[disc(150, 100, 25)]);
    let before = img.clone();
    analyze_image(&img, &plate_config(AnalysisConfig::stained()))?;
    assert_eq!(img, before);
    Ok(())
}

#[test]
fn test_large_input_is_resized_to_working_resolution() -> anyhow::Result<()> {
    let small = plate_with_discs(&[disc(150, 100, 25)]);
    let large = image::imageops::resize(
        &small,
        PLATE_WIDTH * 2,
        PLATE_HEIGHT * 2,
        image::imageops::FilterType::Nearest,
    );
    let result = analyze_image(&large, &plate_config(AnalysisConfig::unstained()))?;
    assert_eq!(result.qc_image.dimensions(), (PLATE_WIDTH, PLATE_HEIGHT));
    assert_eq!(result.count, 1);
    Ok(())
}

#[test]
fn test_gradient_cells_cover_every_pixel() -> anyhow::Result<()> {
    let img = uniform_plate(1500, 1000, BACKGROUND);
    let map = preprocessing::gradient_map(&img, 0.03, 3)?;
    assert_eq!((map.width(), map.height()), (45, 30));
    assert_eq!(map.cell_of(0, 0), (0, 0));
    assert_eq!(map.cell_of(1499, 999), (44, 29));
    assert_eq!(map.cell_of(34, 33), (1, 0));
    assert_eq!(map.value_at(700, 500), BACKGROUND);
    Ok(())
}

#[test]
fn test_empty_image_is_rejected() {
    let err = analyze_image(&GrayImage::new(0, 0), &AnalysisConfig::unstained()).unwrap_err();
    assert!(matches!(err, AnalysisError::EmptyImage));
}

#[test]
fn test_image_below_one_gradient_cell_is_rejected() {
    let img = uniform_plate(20, 200, BACKGROUND);
    let config = AnalysisConfig::unstained().with_working_size(20, 200);
    let err = analyze_image(&img, &config).unwrap_err();
    assert!(matches!(err, AnalysisError::ImageTooSmall { width: 20, height: 200, .. }));
}

#[test]
fn test_invalid_config_is_rejected_before_analysis() {
    let mut config = AnalysisConfig::unstained();
    config.gradient_resolution = 0.0;
    let err = analyze_image(&uniform_plate(100, 100, BACKGROUND), &config).unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidConfig { field: "gradient_resolution", .. }));
}

#[test]
fn test_variant_selects_mask_steps() -> anyhow::Result<()> {
    let stained = ColonyPipeline::new(AnalysisConfig::stained())?;
    let unstained = ColonyPipeline::new(AnalysisConfig::unstained())?;
    assert_eq!(stained.step_names(), vec!["Edge Augmentation"]);
    assert_eq!(unstained.step_names(), vec!["Denoise"]);
    Ok(())
}

struct ClearMask;

impl MaskStep for ClearMask {
    fn process(
        &self,
        mask: GrayImage,
        _original: &GrayImage,
        _context: &PipelineContext,
    ) -> colonycount::error::Result<GrayImage> {
        Ok(GrayImage::new(mask.width(), mask.height()))
    }

    fn name(&self) -> &str {
        "Clear"
    }
}

#[test]
fn test_custom_step_runs_after_variant_steps() -> anyhow::Result<()> {
    let pipeline = ColonyPipeline::new(plate_config(AnalysisConfig::unstained()))?.add_step(Arc::new(ClearMask));
    assert_eq!(pipeline.step_names(), vec!["Denoise", "Clear"]);

    let result = pipeline.analyze(&plate_with_discs(&[disc(150, 100, 25)]))?;
    assert_eq!(result.count, 0);
    Ok(())
}

#[test]
fn test_debug_mode_saves_every_stage() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let debug_dir = dir.path().join("debug");
    let pipeline = ColonyPipeline::new(plate_config(AnalysisConfig::unstained()))?.with_debug(debug_dir.clone())?;

    pipeline.analyze_labeled(&plate_with_discs(&[disc(150, 100, 25)]), "plate")?;

    for step in ["00_input", "01_gradient_map", "02_corrected", "03_denoise", "04_qc"] {
        let path = debug_dir.join(step).join("plate.png");
        assert!(path.exists(), "missing {}", path.display());
    }
    Ok(())
}

#[test]
fn test_debug_dir_must_be_empty() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    std::fs::write(dir.path().join("leftover.txt"), "x")?;
    let pipeline = ColonyPipeline::new(AnalysisConfig::unstained())?;
    assert!(pipeline.with_debug(dir.path().to_path_buf()).is_err());
    Ok(())
}
