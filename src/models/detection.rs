use serde::{Deserialize, Serialize};
use std::fmt;

/// Architectural element category reported by the detection service.
///
/// The declaration order is the canonical display and tie-break order:
/// walls, then windows, then doors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElementCategory {
    Wall,
    Window,
    Door,
}

impl ElementCategory {
    /// All categories in canonical order
    pub const ALL: [ElementCategory; 3] = [Self::Wall, Self::Window, Self::Door];

    /// Singular display label ("Wall", "Window", "Door")
    pub fn label(self) -> &'static str {
        match self {
            Self::Wall => "Wall",
            Self::Window => "Window",
            Self::Door => "Door",
        }
    }

    /// Name of the JSON sequence holding this category
    pub fn field_name(self) -> &'static str {
        match self {
            Self::Wall => "walls",
            Self::Window => "windows",
            Self::Door => "doors",
        }
    }
}

impl fmt::Display for ElementCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single detected element.
///
/// `bbox` is `[x_min, y_min, x_max, y_max]`; `contour` is the outline as
/// `[x, y]` pairs. Fixed-size arrays make a wrong arity a parse error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedElement {
    #[serde(rename = "type")]
    pub kind: String,
    pub confidence: f64,
    pub bbox: [f64; 4],
    pub contour: Vec<[f64; 2]>,
}

/// The three element sequences of a detection result.
///
/// All three are required on the wire, even when empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectedElements {
    pub walls: Vec<DetectedElement>,
    pub windows: Vec<DetectedElement>,
    pub doors: Vec<DetectedElement>,
}

impl DetectedElements {
    /// Elements of one category, in server order
    pub fn of(&self, category: ElementCategory) -> &[DetectedElement] {
        match category {
            ElementCategory::Wall => &self.walls,
            ElementCategory::Window => &self.windows,
            ElementCategory::Door => &self.doors,
        }
    }

    /// Total number of elements across all categories
    pub fn total(&self) -> usize {
        self.walls.len() + self.windows.len() + self.doors.len()
    }
}

/// Detection response body.
///
/// Immutable once received. The workflow store only ever holds a complete,
/// validated value (see [`DetectionResult::from_json`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub id: String,
    pub filename: String,
    pub elements: DetectedElements,
    pub image_url: String,
}

/// Reason a response body was rejected
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResultValidationError {
    #[error("{category} #{index}: confidence {value} outside [0, 1]")]
    ConfidenceOutOfRange {
        category: ElementCategory,
        index: usize,
        value: f64,
    },

    #[error("{category} #{index}: non-finite bounding box component")]
    NonFiniteBbox {
        category: ElementCategory,
        index: usize,
    },

    #[error("{category} #{index}: non-finite contour point")]
    NonFiniteContour {
        category: ElementCategory,
        index: usize,
    },
}

impl DetectionResult {
    /// Parse and validate a response body.
    ///
    /// Shape errors (missing fields, wrong bbox arity, non-numeric values) come
    /// back from serde; range errors from [`validate`](Self::validate). Either
    /// way no partial value escapes.
    pub fn from_json(body: &[u8]) -> Result<Self, String> {
        let result: Self = serde_json::from_slice(body).map_err(|e| e.to_string())?;
        result.validate().map_err(|e| e.to_string())?;
        Ok(result)
    }

    /// Check numeric invariants on every element
    pub fn validate(&self) -> Result<(), ResultValidationError> {
        for category in ElementCategory::ALL {
            for (index, element) in self.elements.of(category).iter().enumerate() {
                let value = element.confidence;
                if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                    return Err(ResultValidationError::ConfidenceOutOfRange {
                        category,
                        index,
                        value,
                    });
                }
                if element.bbox.iter().any(|c| !c.is_finite()) {
                    return Err(ResultValidationError::NonFiniteBbox { category, index });
                }
                if element.contour.iter().flatten().any(|c| !c.is_finite()) {
                    return Err(ResultValidationError::NonFiniteContour { category, index });
                }
            }
        }
        Ok(())
    }

    /// Pretty-printed JSON used for both export and clipboard.
    ///
    /// Field order follows the struct declaration, so repeated calls on the
    /// same value produce identical bytes.
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// `{filename}_results.json`
    pub fn export_file_name(&self) -> String {
        format!("{}_results.json", self.filename)
    }

    /// `{filename}_detected.jpg`
    pub fn annotated_image_file_name(&self) -> String {
        format!("{}_detected.jpg", self.filename)
    }

    /// Number of elements in one category
    pub fn count(&self, category: ElementCategory) -> usize {
        self.elements.of(category).len()
    }

    /// Arithmetic mean of confidence over one category; `0.0` when empty
    pub fn mean_confidence(&self, category: ElementCategory) -> f64 {
        mean_confidence(self.elements.of(category))
    }

    /// All elements tagged with their category, highest confidence first.
    ///
    /// The sort is stable: equal confidences keep walls before windows before
    /// doors, and each category's own order.
    pub fn ranked(&self) -> Vec<RankedElement<'_>> {
        let mut ranked: Vec<RankedElement<'_>> = ElementCategory::ALL
            .iter()
            .flat_map(|&category| {
                self.elements
                    .of(category)
                    .iter()
                    .map(move |element| RankedElement { category, element })
            })
            .collect();

        ranked.sort_by(|a, b| b.element.confidence.total_cmp(&a.element.confidence));
        ranked
    }
}

/// Mean confidence of a slice; empty slices yield exactly `0.0`
pub fn mean_confidence(elements: &[DetectedElement]) -> f64 {
    if elements.is_empty() {
        return 0.0;
    }
    let sum: f64 = elements.iter().map(|e| e.confidence).sum();
    sum / elements.len() as f64
}

/// Element borrowed from a result, tagged with its source category
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedElement<'a> {
    pub category: ElementCategory,
    pub element: &'a DetectedElement,
}

/// Count and mean confidence for one category
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategorySummary {
    pub category: ElementCategory,
    pub count: usize,
    pub mean_confidence: f64,
}

/// Per-category element counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryCounts {
    pub walls: usize,
    pub windows: usize,
    pub doors: usize,
}

impl From<&DetectionResult> for CategoryCounts {
    fn from(result: &DetectionResult) -> Self {
        Self {
            walls: result.elements.walls.len(),
            windows: result.elements.windows.len(),
            doors: result.elements.doors.len(),
        }
    }
}
