use crate::internal::*;

/// Runs the forward pass of a shared, immutable model.
///
/// The runner holds no mutable state: it can be cloned freely and used from
/// as many threads as needed.
#[derive(Debug, Clone)]
pub struct InferenceRunner {
    model: Arc<ModelArtifact>,
}

impl InferenceRunner {
    pub fn new(model: Arc<ModelArtifact>) -> InferenceRunner {
        InferenceRunner { model }
    }

    pub fn model(&self) -> &Arc<ModelArtifact> {
        &self.model
    }

    /// Forward pass, returning the final `(1, num_classes)` score tensor.
    pub fn run(&self, input: &Tensor) -> PaddyResult<Tensor> {
        forward(&self.model, input)
    }

    /// Predicted class, with its label and confidence.
    pub fn infer(&self, input: &Tensor) -> PaddyResult<Prediction> {
        let scores = self.run(input)?;
        Prediction::from_scores(scores.as_slice(), self.model.labels())
    }

    /// Same as `infer`, also keeping the whole score vector.
    pub fn infer_with_scores(&self, input: &Tensor) -> PaddyResult<Prediction> {
        let scores = self.run(input)?;
        let prediction = Prediction::from_scores(scores.as_slice(), self.model.labels())?;
        Ok(prediction.with_scores(scores.as_slice().to_vec()))
    }
}

/// One-shot inference against a model.
pub fn infer(model: &ModelArtifact, input: &Tensor) -> PaddyResult<Prediction> {
    let scores = forward(model, input)?;
    Prediction::from_scores(scores.as_slice(), model.labels())
}

fn forward(model: &ModelArtifact, input: &Tensor) -> PaddyResult<Tensor> {
    input.ensure_shape("model input", &model.input_shape())?;
    let mut value = input.clone();
    for (ix, layer) in model.layers().iter().enumerate() {
        trace!("Running layer #{} {} on {:?}", ix, layer.name(), value.shape());
        value = layer
            .apply(value)
            .with_context(|| format!("Evaluating layer #{} ({})", ix, layer.name()))?;
        debug!("Layer #{} {} -> {:?}", ix, layer.name(), value.shape());
    }
    Ok(value)
}
