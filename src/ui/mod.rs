// UI module - workflow logic behind the upload screen
//
// This module contains:
// - UploadController: drives the upload/processing/result state machine
// - ResultViewer: derived views and export/copy/download actions over the result

pub mod controller;
pub mod viewer;

pub use controller::{UploadController, UploadError};
pub use viewer::{RankedRow, ResultViewer, ViewerError, confidence_percent};
