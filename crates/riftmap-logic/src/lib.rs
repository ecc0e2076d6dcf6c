//! Pure sector generation logic for riftmap.
//!
//! Turns a seed and a declarative [`config::SectorSpec`] into a finished
//! sector map: candidate sites ("signals") scattered in ring zones, each with
//! a size class, a content category and an optional quirk, overlaid with a
//! network of non-crossing rifts that splits the map into rip zones.
//!
//! Everything runs single-threaded inside one [`context::GenContext`]. All
//! randomness comes from named streams of [`rng::RngFactory`], so a seed
//! always yields the same map.
//!
//! ```
//! use riftmap_logic::config::SectorSpec;
//! use riftmap_logic::generate::generate;
//!
//! let spec = SectorSpec::default();
//! let a = generate(&spec, 7).unwrap();
//! let b = generate(&spec, 7).unwrap();
//! assert_eq!(a, b);
//! ```
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`balance`] | Greedy link-value balancer, outermost zone first |
//! | [`category`] | Size classes, the category enum, extension catalog, quirks |
//! | [`classify`] | Size and category picks with isolation and monotony rules |
//! | [`config`] | Sector spec, defaults, validation, resolved tables |
//! | [`context`] | Per-attempt generation state threaded through every pass |
//! | [`counts`] | Zone planet-count correction |
//! | [`curve`] | `CurveEquation` trait and the Catmull-Rom spline |
//! | [`error`] | Config and generation errors, diagnostics |
//! | [`generate`] | Attempt loop and the finished [`generate::Sector`] |
//! | [`geometry`] | Points, segment distances, polyline side tests |
//! | [`link`] | Link-value model with line-of-sight neighbors |
//! | [`loops`] | Short planet cycle from the origin zone |
//! | [`pipeline`] | Priority-ordered refinement passes |
//! | [`quirks`] | Per-category quirk markers |
//! | [`retry`] | Bounded retry combinator |
//! | [`rift`] | Rift growth, acceptance, joints, evacuation |
//! | [`rng`] | Seeded random streams keyed by task name |
//! | [`signal`] | Signals and the signal store |
//! | [`spatial`] | R-tree broad phase for shapes and points |
//! | [`structures`] | Required unique structures, start-zone check |
//! | [`topology`] | Rip zones and region assignment |
//! | [`zone`] | Ring zones and candidate scatter |

pub mod balance;
pub mod category;
pub mod classify;
pub mod config;
pub mod context;
pub mod counts;
pub mod curve;
pub mod error;
pub mod generate;
pub mod geometry;
pub mod link;
pub mod loops;
pub mod pipeline;
pub mod quirks;
pub mod retry;
pub mod rift;
pub mod rng;
pub mod signal;
pub mod spatial;
pub mod structures;
pub mod topology;
pub mod zone;
