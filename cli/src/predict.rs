use paddy_core::internal::*;
use paddy_core::paddy_data::itertools::Itertools;
use std::io::Write;
use std::path::Path;

/// Classify image files, one line per image.
pub fn predict(
    model: ModelArtifact,
    images: &[impl AsRef<Path>],
    with_scores: bool,
    out: &mut impl Write,
) -> PaddyResult<()> {
    let runner = InferenceRunner::new(Arc::new(model));
    for path in images {
        let path = path.as_ref();
        let bytes = std::fs::read(path).with_context(|| format!("Reading {path:?}"))?;
        let input = paddy_vision::preprocess(&bytes, runner.model().contract())
            .with_context(|| format!("Preprocessing {path:?}"))?;
        let prediction = if with_scores {
            runner.infer_with_scores(&input)?
        } else {
            runner.infer(&input)?
        };
        write!(out, "{}\t{}", path.display(), prediction.class)?;
        if let Some(label) = &prediction.label {
            write!(out, "\t{label}")?;
        }
        write!(out, "\t{:.4}", prediction.confidence)?;
        if let Some(scores) = &prediction.scores {
            write!(out, "\t[{}]", scores.iter().map(|s| format!("{s:.4}")).join(", "))?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Human-readable description of a model.
pub fn inspect(model: &ModelArtifact, out: &mut impl Write) -> PaddyResult<()> {
    writeln!(out, "{model}")?;
    let contract = model.contract();
    writeln!(
        out,
        "Input: {}x{} {:?}, {:?} resize, {:?}",
        contract.width,
        contract.height,
        contract.channel_order,
        contract.interpolation,
        contract.normalization
    )?;
    match model.labels() {
        Some(labels) => writeln!(out, "Labels: {}", labels.iter().join(", "))?,
        None => writeln!(out, "Labels: none, {} classes", model.num_classes())?,
    }
    writeln!(out, "Parameters: {}", model.parameter_count())?;
    for line in model.summary() {
        writeln!(out, "  {line}")?;
    }
    Ok(())
}
