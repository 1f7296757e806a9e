use crate::internal::*;
use crate::ops::nn::softmax_in_place;
use ndarray::ArrayViewMut1;

/// Outcome of one forward pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Index of the winning class, in `[0, num_classes)`.
    pub class: usize,
    /// Raw score of the winning class.
    pub score: f32,
    /// Probability of the winning class (see `probabilities`).
    pub confidence: f32,
    pub label: Option<String>,
    /// Full score vector, when asked for.
    pub scores: Option<Vec<f32>>,
}

impl Prediction {
    /// Build a prediction from a final score vector.
    ///
    /// Ties go to the lowest index. Any NaN in `scores` is an error.
    pub fn from_scores(scores: &[f32], labels: Option<&[String]>) -> PaddyResult<Prediction> {
        let class = argmax(scores)?;
        let probabilities = probabilities(scores);
        Ok(Prediction {
            class,
            score: scores[class],
            confidence: probabilities[class],
            label: labels.and_then(|l| l.get(class)).cloned(),
            scores: None,
        })
    }

    pub fn with_scores(self, scores: Vec<f32>) -> Prediction {
        Prediction { scores: Some(scores), ..self }
    }

    pub fn probabilities(&self) -> Option<Vec<f32>> {
        self.scores.as_deref().map(probabilities)
    }
}

/// Index of the largest score, lowest index on ties.
pub fn argmax(scores: &[f32]) -> PaddyResult<usize> {
    ensure!(!scores.is_empty(), "Can not pick a class in an empty score vector");
    ensure!(!scores.iter().any(|s| s.is_nan()), "Score vector contains NaN: {:?}", scores);
    let mut best = 0;
    for (ix, &s) in scores.iter().enumerate().skip(1) {
        if s > scores[best] {
            best = ix;
        }
    }
    Ok(best)
}

/// Scores as a probability distribution.
///
/// Vectors that already are one (e.g. after a softmax layer) are returned
/// as is, anything else goes through a softmax.
pub fn probabilities(scores: &[f32]) -> Vec<f32> {
    let sum: f32 = scores.iter().sum();
    if scores.iter().all(|s| (0.0..=1.0).contains(s)) && (sum - 1.0).abs() < 1e-4 {
        return scores.to_vec();
    }
    let mut probs = scores.to_vec();
    softmax_in_place(ArrayViewMut1::from(&mut *probs));
    probs
}
