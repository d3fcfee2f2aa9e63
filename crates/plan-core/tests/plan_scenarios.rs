use hudclip_job_model::geometry::PixelRect;
use hudclip_job_model::job::{JobSpec, QualityTier};
use hudclip_job_model::resolution::SourceResolution;
use hudclip_plan_core::bitrate::{SizeTarget, SourceFacts};
use hudclip_plan_core::overlay::HudElement;
use hudclip_plan_core::plan::EncodePlan;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn standard_tier_with_fades_pads_both_sides() {
    let mut spec = JobSpec::new("/clips/session.mp4", 10.0, 40.0);
    spec.quality = QualityTier::Standard;
    spec.total_duration_secs = 120.0;

    let plan = EncodePlan::derive(&spec, &SourceFacts::new(0), None).unwrap();

    assert!(plan.intro.is_none());
    assert!(close(plan.window.seek_start_secs, 8.5));
    assert!(close(plan.window.seek_length_secs, 33.0));
    assert!(close(plan.effective_duration_secs(), 33.0));

    let target_bits: f64 = 45.0 * 8.0 * 1024.0 * 1024.0;
    let audio_bits = 128.0 * 1024.0 * 33.0;
    let expected = ((target_bits - audio_bits) / (1024.0 * 33.0)).floor() as u32;
    assert_eq!(plan.budget.video_kbps, expected);
    assert_eq!(plan.budget.audio_kbps, 128);
    assert_eq!(plan.budget.target, SizeTarget::FixedMb { mb: 45.0 });
}

#[test]
fn source_tier_mobile_1080_with_intro() {
    let mut spec = JobSpec::new("/clips/session.mp4", 10.0, 40.0);
    spec.quality = QualityTier::Source;
    spec.mobile = true;
    spec.resolution = SourceResolution::Hd1080;
    spec.total_duration_secs = 120.0;
    spec.intro.still_secs = 2.0;
    spec.intro.from_midpoint = true;

    let facts = SourceFacts {
        size_bytes: Ok(600 * 1024 * 1024),
        audio_kbps: Some(160),
        music_available: false,
    };
    let plan = EncodePlan::derive(&spec, &facts, None).unwrap();

    assert_eq!(plan.stage_count(), 3);
    assert!(close(plan.core_progress_weight(), 0.8));
    assert!(matches!(plan.budget.target, SizeTarget::MatchSource { .. }));
    assert_eq!(plan.budget.audio_kbps, 160);
    assert!(close(plan.effective_duration_secs(), 35.0));

    let layout = plan.layout.as_ref().unwrap();
    assert!(close(layout.scale, 0.75));
    assert_eq!(
        layout.region(HudElement::Health).unwrap().crop,
        PixelRect::new(278, 49, 45, 988)
    );
    assert_eq!(
        layout.region(HudElement::Stats).unwrap().crop,
        PixelRect::new(210, 23, 1698, 203)
    );
    assert!(plan.core_filter_graph.starts_with("[0:v]split=4[main][lootbar][healthbar][stats];"));

    let intro = plan.intro.as_ref().unwrap();
    assert!(intro.filter_graph.contains("[vintro]"));
    assert!(intro.filter_graph.contains("[aintro]"));
}

#[test]
fn start_near_zero_suppresses_start_padding() {
    let mut spec = JobSpec::new("/clips/session.mp4", 0.5, 20.0);
    spec.total_duration_secs = 120.0;

    let plan = EncodePlan::derive(&spec, &SourceFacts::new(0), None).unwrap();

    assert!(close(plan.window.seek_start_secs, 0.5));
    assert!(!plan.window.has_fade_in());
    assert!(plan.window.has_fade_out());
    assert!(!plan.core_filter_graph.contains("fade=t=in"));
    assert!(plan.core_filter_graph.contains("fade=t=out"));
}

#[test]
fn plan_serializes_for_dry_runs() {
    let spec = JobSpec::new("/clips/session.mp4", 5.0, 15.0);
    let plan = EncodePlan::derive(&spec, &SourceFacts::new(0), None).unwrap();
    let json = serde_json::to_value(&plan).unwrap();
    assert_eq!(json["budget"]["target"]["kind"], "fixed_mb");
    assert!(json["core_filter_graph"].as_str().unwrap().ends_with("[acore]"));
}
