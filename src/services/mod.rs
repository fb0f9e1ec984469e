//! Services module - the workflow's side-effecting boundaries.
//!
//! - [`DetectionClient`]: the remote floorplan detection service. The
//!   production implementation, [`HttpDetectionClient`], posts the image as
//!   multipart form data with `reqwest` and parses the JSON body into a
//!   validated [`DetectionResult`](crate::models::DetectionResult).
//! - [`Clipboard`]: where "copy JSON" goes. [`CommandClipboard`] pipes the
//!   text into a platform tool such as `pbcopy` or `xclip`.
//!
//! Both are traits so the controller and viewer can be driven by fakes in
//! tests. Neither knows about workflow state or notifications.

pub mod clipboard;
pub mod detection;

pub use clipboard::{Clipboard, ClipboardError, CommandClipboard};
pub use detection::{DetectionClient, DetectionError, HttpDetectionClient};
