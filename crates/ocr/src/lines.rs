use std::cmp::Ordering;

use crate::types::TextObservation;

/// Observations that sit on the same printed row, joined left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub text: String,
    /// Mean vertical centre of the members; `None` for box-less input.
    pub mid_y: Option<f32>,
    /// Lowest member confidence.
    pub confidence: f32,
}

/// Groups boxed observations into visual rows: sorted top to bottom, a box
/// joins the current row while its centre is within `y_tolerance` of the
/// row's running mean. Box-less observations become one line each, after
/// the boxed rows, in input order. Blank observations are dropped.
pub fn group_into_lines(observations: &[TextObservation], y_tolerance: f32) -> Vec<Line> {
    let mut boxed: Vec<(&TextObservation, f32, f32)> = Vec::new();
    let mut unboxed: Vec<&TextObservation> = Vec::new();
    for obs in observations.iter().filter(|o| !o.text.trim().is_empty()) {
        match obs.bounding_box {
            Some(b) if b.mid_y().is_finite() && b.x.is_finite() => boxed.push((obs, b.mid_y(), b.x)),
            _ => unboxed.push(obs),
        }
    }
    boxed.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

    let mut lines = Vec::new();
    let mut row: Vec<(&TextObservation, f32, f32)> = Vec::new();
    let mut row_y = 0.0f32;

    for item in boxed {
        if !row.is_empty() && (item.1 - row_y).abs() > y_tolerance {
            lines.push(finish_row(std::mem::take(&mut row)));
        }
        row.push(item);
        row_y = row.iter().map(|r| r.1).sum::<f32>() / row.len() as f32;
    }
    if !row.is_empty() {
        lines.push(finish_row(row));
    }

    lines.extend(unboxed.into_iter().map(|obs| Line {
        text: obs.text.trim().to_string(),
        mid_y: None,
        confidence: obs.confidence,
    }));
    lines
}

fn finish_row(mut row: Vec<(&TextObservation, f32, f32)>) -> Line {
    row.sort_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(Ordering::Equal));
    let text = row
        .iter()
        .map(|r| r.0.text.trim())
        .collect::<Vec<_>>()
        .join(" ");
    let mid_y = row.iter().map(|r| r.1).sum::<f32>() / row.len() as f32;
    let confidence = row.iter().map(|r| r.0.confidence).fold(1.0f32, f32::min);
    Line { text, mid_y: Some(mid_y), confidence }
}
