//! Recognition ranking and the inference-engine seam.
//!
//! The model itself is an opaque collaborator behind [`Classifier`]; this
//! module owns what happens on either side of it: the label table and the
//! top-K selection over the returned confidence vector.

use crate::vision::Tensor;
use anyhow::{Context, Result};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Keep at most this many recognitions per frame.
pub const MAX_BEST_RESULTS: usize = 3;

/// Scores at or below this are noise and never reported.
pub const CONFIDENCE_THRESHOLD: f32 = 0.1;

/// One ranked classification result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recognition {
    /// Class identifier (the index into the model's output vector).
    pub id: String,
    /// Display name from the label table.
    pub title: String,
    /// Confidence in `[0, 1]`, higher is better.
    pub confidence: f32,
}

impl fmt::Display for Recognition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({:.1}%)",
            self.id,
            self.title,
            self.confidence * 100.0
        )
    }
}

/// Opaque inference engine: fixed-shape tensor in, one confidence per class
/// out. Implementations must be deterministic for identical input and must
/// report failure as an error, never as a silent zero vector.
pub trait Classifier: Send {
    fn classify(&self, tensor: &Tensor) -> Result<Vec<f32>>;
}

/// Load the ordered label table, index-aligned with the model's classes.
///
/// Lines are kept verbatim (including any blanks): alignment with the score
/// vector is the contract. Failure here is fatal to startup.
pub fn read_labels(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path)
        .with_context(|| format!("cannot read labels from {}", path.display()))?;
    let mut labels = Vec::new();
    for line in BufReader::new(file).lines() {
        let line =
            line.with_context(|| format!("cannot read labels from {}", path.display()))?;
        labels.push(line);
    }
    Ok(labels)
}

/// Heap entry ordered so the best recognition surfaces first: higher
/// confidence wins, equal confidences fall back to the lower original index.
struct Candidate {
    index: usize,
    confidence: f32,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.confidence
            .total_cmp(&other.confidence)
            .then_with(|| other.index.cmp(&self.index))
    }
}

/// Rank confidence scores into the best recognitions, highest first.
///
/// Entries at or below [`CONFIDENCE_THRESHOLD`] are filtered out, at most
/// [`MAX_BEST_RESULTS`] survive, and equal confidences keep their original
/// index order. The label table and score vector come from the same model
/// artifact, so a table shorter than the scores is a programming error.
pub fn rank(scores: &[f32], labels: &[String]) -> Vec<Recognition> {
    if labels.is_empty() {
        return Vec::new();
    }
    assert!(
        labels.len() >= scores.len(),
        "label table ({} entries) shorter than score vector ({})",
        labels.len(),
        scores.len()
    );

    let mut heap = BinaryHeap::new();
    for (index, &confidence) in scores.iter().enumerate() {
        if confidence > CONFIDENCE_THRESHOLD {
            heap.push(Candidate { index, confidence });
        }
    }

    let mut recognitions = Vec::with_capacity(MAX_BEST_RESULTS.min(heap.len()));
    while recognitions.len() < MAX_BEST_RESULTS {
        let Some(best) = heap.pop() else { break };
        recognitions.push(Recognition {
            id: best.index.to_string(),
            title: labels[best.index].clone(),
            confidence: best.confidence,
        });
    }
    recognitions
}
