//! HUD overlay geometry for the mobile portrait layout.
//!
//! Crop rectangles are tuned at 2560x1440. Other recognized resolutions
//! either scale that table uniformly or carry their own hand-tuned table;
//! unlisted `WxH` sources re-project the base table assuming the HUD is
//! anchored to a centred 16:9 safe area.

use hudclip_job_model::geometry::{PixelRect, PixelSize};
use hudclip_job_model::resolution::SourceResolution;
use serde::{Deserialize, Serialize};

/// Portrait canvas width.
pub const CANVAS_WIDTH: u32 = 1150;
/// Portrait canvas height.
pub const CANVAS_HEIGHT: u32 = 1920;

const BASE_WIDTH: u32 = 2560;
const BASE_HEIGHT: u32 = 1440;

const BASE_HEALTH: PixelRect = PixelRect::new(370, 65, 60, 1317);
const BASE_LOOT: PixelRect = PixelRect::new(440, 133, 2160, 1288);
const BASE_STATS: PixelRect = PixelRect::new(280, 31, 2264, 270);
const BASE_TEAM: PixelRect = PixelRect::new(160, 190, 74, 26);

const LOOT_RIGHT_MARGIN: i64 = 85;
const HEALTH_LIFT_1440: f64 = 14.0;
const STATS_GAP_1440: f64 = 8.0;

/// A HUD element that can be lifted into the portrait canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HudElement {
    Health,
    Loot,
    Stats,
    Team,
}

impl HudElement {
    /// Filter-graph label of the split branch.
    pub fn branch_label(self) -> &'static str {
        match self {
            Self::Health => "healthbar",
            Self::Loot => "lootbar",
            Self::Stats => "stats",
            Self::Team => "team",
        }
    }

    /// Enlargement relative to the element's size at 2560x1440.
    pub fn magnification(self) -> f64 {
        match self {
            Self::Health => 1.87,
            Self::Loot => 1.5912,
            Self::Stats => 1.8,
            Self::Team => 1.32,
        }
    }

    pub fn alpha(self) -> f64 {
        match self {
            Self::Stats => 0.7,
            _ => 0.8,
        }
    }

    fn base_rect(self) -> PixelRect {
        match self {
            Self::Health => BASE_HEALTH,
            Self::Loot => BASE_LOOT,
            Self::Stats => BASE_STATS,
            Self::Team => BASE_TEAM,
        }
    }
}

/// One HUD element: where it is cut from and where it lands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HudRegion {
    pub element: HudElement,
    /// Crop rectangle in source pixels.
    pub crop: PixelRect,
    /// Destination rectangle in the portrait canvas.
    pub placement: PixelRect,
    pub alpha: f64,
}

/// Resolved layout for one source resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayLayout {
    /// Layout scale `s` relative to 1440p.
    pub scale: f64,
    /// Regions in composition order (loot, health, stats, then team).
    pub regions: Vec<HudRegion>,
}

impl OverlayLayout {
    pub fn region(&self, element: HudElement) -> Option<&HudRegion> {
        self.regions.iter().find(|r| r.element == element)
    }
}

#[derive(Debug, Clone, Copy)]
struct CropTable {
    health: PixelRect,
    loot: PixelRect,
    stats: PixelRect,
    team: PixelRect,
    scale: f64,
    /// Hand-tuned destination sizes; `None` derives them from magnification.
    sizes: Option<[PixelSize; 4]>,
}

impl CropTable {
    fn uniform(scale: f64) -> Self {
        Self {
            health: BASE_HEALTH.scaled(scale),
            loot: BASE_LOOT.scaled(scale),
            stats: BASE_STATS.scaled(scale),
            team: BASE_TEAM.scaled(scale),
            scale,
            sizes: None,
        }
    }

    fn crop(&self, element: HudElement) -> PixelRect {
        match element {
            HudElement::Health => self.health,
            HudElement::Loot => self.loot,
            HudElement::Stats => self.stats,
            HudElement::Team => self.team,
        }
    }

    fn size(&self, element: HudElement) -> PixelSize {
        if let Some(sizes) = self.sizes {
            return match element {
                HudElement::Health => sizes[0],
                HudElement::Loot => sizes[1],
                HudElement::Stats => sizes[2],
                HudElement::Team => sizes[3],
            };
        }
        let base = element.base_rect();
        let factor = element.magnification() * self.scale;
        PixelSize::new(
            ((base.width as f64 * factor).round() as u32).min(CANVAS_WIDTH),
            ((base.height as f64 * factor).round() as u32).min(CANVAS_HEIGHT),
        )
    }
}

/// Re-project a base-table rectangle into a `frame_w` x `frame_h` frame.
pub fn project_base_rect(rect: PixelRect, frame_w: u32, frame_h: u32) -> PixelRect {
    let mut x = rect.x;
    let mut y = rect.y;
    if x + rect.width > BASE_WIDTH {
        x = BASE_WIDTH.saturating_sub(rect.width);
    }
    if y + rect.height > BASE_HEIGHT {
        y = BASE_HEIGHT.saturating_sub(rect.height);
    }

    let v = frame_h as f64 / BASE_HEIGHT as f64;
    let pad_x = ((frame_w as f64 - BASE_WIDTH as f64 * v) / 2.0).max(0.0);

    let width = ((rect.width as f64 * v).round() as i64).min(frame_w as i64);
    let height = ((rect.height as f64 * v).round() as i64).min(frame_h as i64);
    let x = (pad_x + x as f64 * v).round() as i64;
    let y = (y as f64 * v).round() as i64;

    let max_x = (frame_w as i64 - width).max(0);
    let max_y = (frame_h as i64 - height).max(0);
    PixelRect::new(
        width.max(0) as u32,
        height.max(0) as u32,
        x.clamp(0, max_x) as u32,
        y.clamp(0, max_y) as u32,
    )
}

fn crop_table(resolution: &SourceResolution) -> CropTable {
    match resolution {
        SourceResolution::Hd1080 => CropTable::uniform(0.75),
        SourceResolution::Qhd1440 => CropTable::uniform(1.0),
        SourceResolution::Uhd2160 => CropTable::uniform(1.5),
        SourceResolution::Ultrawide1440 => CropTable {
            health: PixelRect::new(350, 130, 720, 1260),
            loot: PixelRect::new(664, 135, 2890, 1205),
            stats: PixelRect::new(360, 31, 3030, 440),
            team: PixelRect::new(260, 290, 110, 26),
            scale: 1.0,
            sizes: Some([
                PixelSize::new(520, 125),
                PixelSize::new(715, 140),
                PixelSize::new(500, 50),
                PixelSize::new(211, 280),
            ]),
        },
        SourceResolution::Other { width, height } => {
            let (w, h) = (*width, *height);
            CropTable {
                health: project_base_rect(BASE_HEALTH, w, h),
                loot: project_base_rect(BASE_LOOT, w, h),
                stats: project_base_rect(BASE_STATS, w, h),
                team: project_base_rect(BASE_TEAM, w, h),
                scale: h as f64 / BASE_HEIGHT as f64,
                sizes: None,
            }
        }
        SourceResolution::Unknown(_) => CropTable::uniform(1.0),
    }
}

/// Maps a source resolution to an [`OverlayLayout`].
#[derive(Debug, Default)]
pub struct OverlayGeometryResolver;

impl OverlayGeometryResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve(&self, resolution: &SourceResolution, include_team: bool) -> OverlayLayout {
        let table = crop_table(resolution);
        let s = table.scale;
        let canvas_w = CANVAS_WIDTH as i64;
        let canvas_h = CANVAS_HEIGHT as i64;

        let health = table.size(HudElement::Health);
        let loot = table.size(HudElement::Loot);
        let stats = table.size(HudElement::Stats);
        let team = table.size(HudElement::Team);

        let health_at = health.place_clamped(
            0,
            canvas_h - health.height as i64 - (HEALTH_LIFT_1440 * s).round() as i64,
            CANVAS_WIDTH,
            CANVAS_HEIGHT,
        );
        let loot_at = loot.place_clamped(
            canvas_w - loot.width as i64 - LOOT_RIGHT_MARGIN,
            canvas_h - loot.height as i64,
            CANVAS_WIDTH,
            CANVAS_HEIGHT,
        );
        let stats_base_y = health_at.y.min(loot_at.y) as i64;
        let stats_at = stats.place_clamped(
            ((canvas_w - stats.width as i64) as f64 / 2.0).round() as i64,
            stats_base_y - stats.height as i64 - (STATS_GAP_1440 * s).round() as i64,
            CANVAS_WIDTH,
            CANVAS_HEIGHT,
        );
        let team_at = team.place_clamped(0, 0, CANVAS_WIDTH, CANVAS_HEIGHT);

        let mut regions = vec![
            region(&table, HudElement::Loot, loot_at),
            region(&table, HudElement::Health, health_at),
            region(&table, HudElement::Stats, stats_at),
        ];
        if include_team {
            regions.push(region(&table, HudElement::Team, team_at));
        }

        tracing::debug!(
            resolution = %resolution,
            scale = s,
            regions = regions.len(),
            "Resolved HUD overlay layout"
        );

        OverlayLayout { scale: s, regions }
    }
}

fn region(table: &CropTable, element: HudElement, placement: PixelRect) -> HudRegion {
    HudRegion {
        element,
        crop: table.crop(element),
        placement,
        alpha: element.alpha(),
    }
}
