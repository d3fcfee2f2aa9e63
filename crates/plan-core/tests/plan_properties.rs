use hudclip_common::error::HudclipError;
use hudclip_job_model::job::QualityTier;
use hudclip_job_model::resolution::SourceResolution;
use hudclip_plan_core::bitrate::{BitrateBudgetEstimator, SourceFacts, MIN_VIDEO_KBPS};
use hudclip_plan_core::overlay::{OverlayGeometryResolver, CANVAS_HEIGHT, CANVAS_WIDTH};
use hudclip_plan_core::speed::{tempo_chain, MAX_TEMPO, MIN_TEMPO};
use hudclip_plan_core::trim::TrimWindowPlanner;
use proptest::prelude::*;

proptest! {
    #[test]
    fn tempo_chain_product_matches_speed(speed in 0.01f64..64.0) {
        let chain = tempo_chain(speed);
        let product: f64 = chain.iter().product();
        prop_assert!((product - speed).abs() < 1e-3, "product {product} for speed {speed}");
        for factor in &chain {
            prop_assert!((MIN_TEMPO..=MAX_TEMPO).contains(factor), "factor {factor} out of range");
        }
    }

    #[test]
    fn trim_window_stays_inside_source(
        start in 0.0f64..500.0,
        length in 0.05f64..300.0,
        extra in 0.0f64..200.0,
        fades in any::<bool>(),
        speed in 0.25f64..4.0,
    ) {
        let end = start + length;
        let total = end + extra;
        let window = TrimWindowPlanner::with_defaults()
            .plan(start, end, total, fades, speed)
            .unwrap();

        prop_assert!(window.seek_start_secs >= 0.0);
        prop_assert!(window.seek_length_secs > 0.0);
        prop_assert!(window.seek_start_secs + window.seek_length_secs <= total + 1e-9);
        prop_assert!(window.fade_in_secs >= 0.0);
        prop_assert!(window.fade_out_secs >= 0.0);
        prop_assert!(window.fade_out_start_secs >= 0.0);
        prop_assert!(
            window.fade_out_start_secs + window.fade_out_secs <= window.output_duration_secs + 1e-9
        );
        prop_assert!((window.output_duration_secs - window.seek_length_secs / speed).abs() < 1e-9);
    }

    #[test]
    fn video_bitrate_never_below_floor(
        tier in 0u8..=4,
        duration in 0.5f64..900.0,
        size_mb in 0.0f64..500.0,
    ) {
        let tier = QualityTier::try_from(tier).unwrap();
        let facts = SourceFacts::new((size_mb * 1024.0 * 1024.0) as u64);
        match BitrateBudgetEstimator::with_defaults().estimate(tier, duration, &facts) {
            Ok(budget) => prop_assert!(budget.video_kbps >= MIN_VIDEO_KBPS),
            Err(HudclipError::InsufficientSizeBudget { .. }) => {
                prop_assert!(tier != QualityTier::Source);
            }
            Err(other) => prop_assert!(false, "unexpected error {other}"),
        }
    }

    #[test]
    fn generic_overlays_fit_frame_and_canvas(width in 640u32..7680, height in 360u32..4320) {
        let resolution = SourceResolution::Other { width, height };
        let layout = OverlayGeometryResolver::new().resolve(&resolution, true);
        for region in &layout.regions {
            prop_assert!(region.crop.fits_within(width, height), "{:?} in {}x{}", region.crop, width, height);
            prop_assert!(region.placement.fits_within(CANVAS_WIDTH, CANVAS_HEIGHT));
        }
    }
}

#[test]
fn tier_targets_are_fixed() {
    let targets: Vec<_> = QualityTier::ALL.iter().map(|t| t.target_mb()).collect();
    assert_eq!(
        targets,
        vec![Some(15.0), Some(25.0), Some(45.0), Some(90.0), None]
    );
}
