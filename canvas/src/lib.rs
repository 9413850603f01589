//! Picture-matching test core.
//!
//! Authors build a test by drawing rectangular regions over an uploaded
//! image, naming each region's expected word, and optionally drawing arrows
//! from a region to a point of interest. Students take the test by dragging
//! word labels onto regions; the result is scored by exact word match.
//!
//! The crate is platform-free. Hosts feed it pointer input and image decode
//! results, draw through a [`render::Renderer`], and persist through a
//! [`session::TestStore`]. With the `web` feature it also compiles to
//! WebAssembly and draws to a browser canvas.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`authoring`] | Authoring reducer and testable [`authoring::AuthoringCore`] |
//! | [`placement`] | Student runtime: label flow, drag-and-drop, progress |
//! | [`scoring`] | Exact-text scoring of a placement map |
//! | [`persist`] | Persisted test format and the on-save conversion |
//! | [`session`] | Persistence collaborator, save and single-flight submit |
//! | [`doc`] | Region, label and connector store |
//! | [`transform`] | Image fit and display/original coordinate conversion |
//! | [`snap`] | Nearest-region snapping and hit-testing |
//! | [`input`] | Tools and the gesture state machine |
//! | [`render`] | Scene assembly over a minimal renderer trait |
//! | [`geom`] | Points, sizes and rectangles |
//! | [`config`] | Runtime configuration from the environment |
//! | [`error`] | Stable error codes |
//! | [`consts`] | Shared numeric constants (snap radius, label metrics, etc.) |

pub mod authoring;
pub mod config;
pub mod consts;
pub mod doc;
pub mod error;
pub mod geom;
pub mod input;
pub mod persist;
pub mod placement;
pub mod render;
pub mod scoring;
pub mod session;
pub mod snap;
pub mod transform;
#[cfg(feature = "web")]
pub mod web;
