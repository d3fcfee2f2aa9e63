//! HudClip Job Model
//!
//! Defines the data contracts shared by the planner and the render engine:
//! - **Job:** The immutable, caller-supplied render request
//! - **Resolution:** The enumerated set of recognized source resolutions
//! - **Geometry:** Pixel rectangles used for HUD crops and placements
//! - **Result:** The terminal outcome reported to the caller
//!
//! Times are in seconds of the source timeline unless a field says otherwise.

pub mod geometry;
pub mod job;
pub mod resolution;
pub mod result;

pub use geometry::*;
pub use job::*;
pub use resolution::*;
pub use result::*;
