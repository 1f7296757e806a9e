//! The trained network, as loaded once at startup and shared read-only.
use crate::internal::*;
use paddy_data::itertools::Itertools;
use std::fmt;

/// Immutable trained network: input contract, ordered layers and labels.
///
/// A `ModelArtifact` can only be obtained through its builder, which
/// type-checks the whole layer chain from `contract.input_shape()` down to a
/// `(1, num_classes)` score output.
#[derive(Debug, Clone)]
pub struct ModelArtifact {
    name: String,
    version: Option<String>,
    contract: InputContract,
    layers: Vec<Layer>,
    labels: Option<Vec<String>>,
    /// output shape of each layer, computed at build time
    shapes: Vec<TVec<usize>>,
}

impl ModelArtifact {
    pub fn builder(name: impl Into<String>, contract: InputContract) -> ModelArtifactBuilder {
        ModelArtifactBuilder {
            name: name.into(),
            version: None,
            contract,
            layers: vec![],
            labels: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn contract(&self) -> &InputContract {
        &self.contract
    }

    pub fn input_shape(&self) -> TVec<usize> {
        self.contract.input_shape()
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn labels(&self) -> Option<&[String]> {
        self.labels.as_deref()
    }

    pub fn label(&self, class: usize) -> Option<&str> {
        self.labels.as_ref().and_then(|l| l.get(class)).map(|s| s.as_str())
    }

    /// Output shape of layer `ix`.
    pub fn layer_output_shape(&self, ix: usize) -> Option<&[usize]> {
        self.shapes.get(ix).map(|s| &**s)
    }

    pub fn output_shape(&self) -> TVec<usize> {
        self.shapes.last().cloned().unwrap_or_else(|| self.input_shape())
    }

    pub fn num_classes(&self) -> usize {
        self.output_shape()[1]
    }

    /// Total number of scalar parameters across all layers.
    pub fn parameter_count(&self) -> usize {
        self.layers.iter().flat_map(|l| l.as_op().params()).map(|(_, t)| t.len()).sum()
    }

    /// One line per layer: index, name, output shape and op details.
    pub fn summary(&self) -> Vec<String> {
        self.layers
            .iter()
            .zip(self.shapes.iter())
            .enumerate()
            .map(|(ix, (layer, shape))| {
                let info = layer.as_op().info();
                if info.is_empty() {
                    format!("#{ix} {} -> {}", layer.name(), shape.iter().join("x"))
                } else {
                    format!(
                        "#{ix} {} -> {} ({})",
                        layer.name(),
                        shape.iter().join("x"),
                        info.join("; ")
                    )
                }
            })
            .collect()
    }
}

impl fmt::Display for ModelArtifact {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(v) = &self.version {
            write!(f, " ({v})")?;
        }
        write!(
            f,
            ": {} -> {} in {} layers",
            self.input_shape().iter().join("x"),
            self.output_shape().iter().join("x"),
            self.layers.len()
        )
    }
}

#[derive(Debug, Clone)]
pub struct ModelArtifactBuilder {
    name: String,
    version: Option<String>,
    contract: InputContract,
    layers: Vec<Layer>,
    labels: Option<Vec<String>>,
}

impl ModelArtifactBuilder {
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn layer(mut self, layer: impl Into<Layer>) -> Self {
        self.layers.push(layer.into());
        self
    }

    pub fn layers(mut self, layers: impl IntoIterator<Item = Layer>) -> Self {
        self.layers.extend(layers);
        self
    }

    pub fn labels<S: Into<String>>(mut self, labels: impl IntoIterator<Item = S>) -> Self {
        self.labels = Some(labels.into_iter().map(|s| s.into()).collect());
        self
    }

    /// Validate the layer chain and freeze the artifact.
    pub fn build(self) -> PaddyResult<ModelArtifact> {
        self.contract.validate()?;
        let mut shape = self.contract.input_shape();
        let mut shapes = Vec::with_capacity(self.layers.len());
        for (ix, layer) in self.layers.iter().enumerate() {
            shape = layer
                .output_shape(&shape)
                .with_context(|| format!("Typing layer #{} ({})", ix, layer.name()))?;
            shapes.push(shape.clone());
        }
        ensure!(
            shape.len() == 2 && shape[0] == 1 && shape[1] > 0,
            "Model must end with a (1, num_classes) score output, found {:?}",
            shape
        );
        if let Some(labels) = &self.labels {
            ensure!(
                labels.len() == shape[1],
                "Model has {} classes but {} labels",
                shape[1],
                labels.len()
            );
        }
        let model = ModelArtifact {
            name: self.name,
            version: self.version,
            contract: self.contract,
            layers: self.layers,
            labels: self.labels,
            shapes,
        };
        info!("Model ready: {model}");
        Ok(model)
    }
}
