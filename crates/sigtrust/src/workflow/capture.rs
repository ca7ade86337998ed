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

use crate::models::{CaptureFailure, CaptureRequirements, CaptureValidation, InputMethod, SignatureCapture};

/// Check a capture against `requirements`, reporting every failed threshold.
///
/// Touch and pressure are only enforced when the requirements ask for them.
pub fn validate_signature_capture(
    capture: &SignatureCapture,
    requirements: &CaptureRequirements,
) -> CaptureValidation {
    let stroke_count = capture.stroke_count();
    let complexity = capture.complexity_score();
    let mut failures = Vec::new();

    if stroke_count < requirements.min_strokes {
        failures.push(CaptureFailure::TooFewStrokes {
            required: requirements.min_strokes,
            actual: stroke_count,
        });
    }
    if capture.duration_ms < requirements.min_duration_ms {
        failures.push(CaptureFailure::TooShort {
            required_ms: requirements.min_duration_ms,
            actual_ms: capture.duration_ms,
        });
    }
    if complexity < requirements.min_complexity {
        failures.push(CaptureFailure::TooSimple {
            required: requirements.min_complexity,
            actual: complexity,
        });
    }
    if requirements.touch_required && capture.input_method == InputMethod::Mouse {
        failures.push(CaptureFailure::TouchRequired);
    }
    if requirements.pressure_required && !capture.has_pressure_data() {
        failures.push(CaptureFailure::PressureRequired);
    }

    CaptureValidation {
        passed: failures.is_empty(),
        stroke_count,
        duration_ms: capture.duration_ms,
        complexity,
        failures,
    }
}
