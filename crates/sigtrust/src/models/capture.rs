/*
 *  Copyright 2025-2026 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Handwritten-signature capture data and quality requirements.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One sampled point of a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapturePoint {
    pub x: f64,
    pub y: f64,
    /// Milliseconds since capture started
    pub t_ms: u64,
    /// Normalised pressure in `0.0..=1.0`, when the device reports it
    pub pressure: Option<f32>,
}

impl CapturePoint {
    pub fn new(x: f64, y: f64, t_ms: u64) -> Self {
        Self {
            x,
            y,
            t_ms,
            pressure: None,
        }
    }

    pub fn with_pressure(mut self, pressure: f32) -> Self {
        self.pressure = Some(pressure);
        self
    }
}

/// A single pen-down to pen-up stroke.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub points: Vec<CapturePoint>,
}

impl Stroke {
    pub fn new(points: Vec<CapturePoint>) -> Self {
        Self { points }
    }

    fn segment_count(&self) -> usize {
        self.points.len().saturating_sub(1)
    }

    /// Count interior points where the path reverses along either axis.
    fn direction_changes(&self) -> usize {
        self.points
            .windows(3)
            .filter(|w| {
                let (dx1, dy1) = (w[1].x - w[0].x, w[1].y - w[0].y);
                let (dx2, dy2) = (w[2].x - w[1].x, w[2].y - w[1].y);
                dx1 * dx2 < 0.0 || dy1 * dy2 < 0.0
            })
            .count()
    }
}

/// How the capture was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMethod {
    Mouse,
    Touch,
    Pen,
}

/// Raw capture collected from the signer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureCapture {
    pub strokes: Vec<Stroke>,
    pub duration_ms: u64,
    pub input_method: InputMethod,
}

impl SignatureCapture {
    pub fn new(strokes: Vec<Stroke>, duration_ms: u64, input_method: InputMethod) -> Self {
        Self {
            strokes,
            duration_ms,
            input_method,
        }
    }

    pub fn stroke_count(&self) -> usize {
        self.strokes.iter().filter(|s| !s.points.is_empty()).count()
    }

    /// Complexity score: one point per drawn segment plus two per direction
    /// reversal. Straight lines score low; real handwriting scores high.
    pub fn complexity_score(&self) -> u32 {
        let score: usize = self
            .strokes
            .iter()
            .map(|s| s.segment_count() + 2 * s.direction_changes())
            .sum();
        u32::try_from(score).unwrap_or(u32::MAX)
    }

    pub fn has_pressure_data(&self) -> bool {
        self.strokes
            .iter()
            .flat_map(|s| s.points.iter())
            .any(|p| p.pressure.is_some_and(|v| v > 0.0))
    }
}

/// Minimum quality a capture must reach. Defaults are applied on construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureRequirements {
    pub min_strokes: usize,
    pub min_duration_ms: u64,
    pub min_complexity: u32,
    pub touch_required: bool,
    pub pressure_required: bool,
}

impl Default for CaptureRequirements {
    fn default() -> Self {
        Self {
            min_strokes: 5,
            min_duration_ms: 1000,
            min_complexity: 20,
            touch_required: false,
            pressure_required: false,
        }
    }
}

impl CaptureRequirements {
    pub fn with_min_strokes(mut self, min_strokes: usize) -> Self {
        self.min_strokes = min_strokes;
        self
    }

    pub fn with_min_duration_ms(mut self, min_duration_ms: u64) -> Self {
        self.min_duration_ms = min_duration_ms;
        self
    }

    pub fn with_min_complexity(mut self, min_complexity: u32) -> Self {
        self.min_complexity = min_complexity;
        self
    }

    pub fn require_touch(mut self) -> Self {
        self.touch_required = true;
        self
    }

    pub fn require_pressure(mut self) -> Self {
        self.pressure_required = true;
        self
    }
}

/// A threshold a capture did not meet.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "threshold", rename_all = "snake_case")]
pub enum CaptureFailure {
    #[error("too few strokes: {actual} captured, {required} required")]
    TooFewStrokes { required: usize, actual: usize },

    #[error("capture too short: {actual_ms}ms captured, {required_ms}ms required")]
    TooShort { required_ms: u64, actual_ms: u64 },

    #[error("signature too simple: complexity {actual}, {required} required")]
    TooSimple { required: u32, actual: u32 },

    #[error("touch input required")]
    TouchRequired,

    #[error("pressure data required")]
    PressureRequired,
}

/// Structured outcome of validating a capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureValidation {
    pub passed: bool,
    pub stroke_count: usize,
    pub duration_ms: u64,
    pub complexity: u32,
    pub failures: Vec<CaptureFailure>,
}
