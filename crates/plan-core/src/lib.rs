//! HudClip Plan Core
//!
//! Converts a render request into exact encoder parameters:
//! - **Trim:** Seek window and fade timings around the selection
//! - **Bitrate:** Video bitrate that fits the tier's size target
//! - **Overlay:** HUD crop and placement rectangles for the portrait layout
//! - **Speed:** `setpts` retiming and bounded `atempo` chains
//! - **Filter graph:** The `-filter_complex` strings for each stage
//!
//! This crate is pure computation: it never touches the filesystem or spawns processes.
//! Everything that touches the filesystem arrives as [`SourceFacts`].

pub mod bitrate;
pub mod filter_graph;
pub mod overlay;
pub mod plan;
pub mod speed;
pub mod trim;

pub use bitrate::{BitrateBudget, BitrateBudgetEstimator, SizeTarget, SourceFacts};
pub use filter_graph::{FilterGraphBuilder, ScaleCap};
pub use overlay::{HudElement, OverlayGeometryResolver, OverlayLayout};
pub use plan::{EncodePlan, IntroPlan, MusicPlan};
pub use speed::SpeedAdjuster;
pub use trim::{TrimWindow, TrimWindowPlanner};
