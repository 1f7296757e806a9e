//! # Paddy archive
//!
//! Loads and saves model artifacts. An artifact is a tar archive (optionally
//! gzipped) or a directory containing:
//!
//! * `model.json`: the manifest (name, version, input contract, labels and
//!   layers),
//! * one `<tensor name>.npy` file per parameter tensor.
//!
//! ```no_run
//! let model = paddy_archive::load("leafnet.tgz").unwrap();
//! println!("{model}");
//! ```
#[macro_use]
extern crate log;

pub mod deser;
pub mod proto;
pub mod ser;
pub mod tensors;

use paddy_core::internal::*;
use std::collections::HashMap;
use std::fmt;
use std::io::Read;
#[cfg(target_family = "unix")]
use std::os::unix::prelude::OsStrExt;
use std::path::{Path, PathBuf};

use crate::proto::{MANIFEST_FILENAME, Manifest};

/// The model artifact could not be loaded. Fatal at startup.
#[derive(Debug)]
pub struct ArtifactLoadError {
    pub location: String,
    pub cause: PaddyError,
}

impl fmt::Display for ArtifactLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failed to load model artifact from {}: {:#}", self.location, self.cause)
    }
}

impl std::error::Error for ArtifactLoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.cause.as_ref())
    }
}

fn load_error(location: impl Into<String>, cause: PaddyError) -> PaddyError {
    ArtifactLoadError { location: location.into(), cause }.into()
}

#[derive(Default)]
struct Resources {
    manifest: Option<Manifest>,
    tensors: HashMap<String, Arc<Tensor>>,
}

impl Resources {
    fn read_stream(&mut self, path: &Path, reader: &mut impl Read) -> PaddyResult<()> {
        // ignore path with any component starting with "." (because OSX's tar is weird)
        #[cfg(target_family = "unix")]
        if path.components().any(|name| name.as_os_str().as_bytes().first() == Some(&b'.')) {
            return Ok(());
        }
        if path == Path::new(MANIFEST_FILENAME) {
            ensure!(self.manifest.is_none(), "Duplicate {MANIFEST_FILENAME}");
            let mut json = String::new();
            reader.read_to_string(&mut json)?;
            let manifest = serde_json::from_str(&json)
                .with_context(|| format!("Parsing {MANIFEST_FILENAME}"))?;
            self.manifest = Some(manifest);
        } else if path.extension().is_some_and(|ext| ext == tensors::TENSOR_EXTENSION) {
            let id = path
                .with_extension("")
                .to_str()
                .with_context(|| format!("Non UTF-8 tensor path {path:?}"))?
                .to_string();
            let tensor = tensors::read_tensor(reader)
                .with_context(|| format!("Reading tensor {path:?}"))?;
            trace!("Loaded tensor {id:?} {:?}", tensor.shape());
            ensure!(self.tensors.insert(id.clone(), Arc::new(tensor)).is_none(), "Duplicate {id:?}");
        } else {
            debug!("Ignoring {path:?} in artifact");
        }
        Ok(())
    }

    fn into_model(self) -> PaddyResult<ModelArtifact> {
        let Some(manifest) = self.manifest else { bail!("Could not find {MANIFEST_FILENAME}") };
        deser::from_proto_model(&manifest, &self.tensors)
    }
}

/// Load an artifact from a tar, tar.gz or directory path.
pub fn load(path: impl AsRef<Path>) -> PaddyResult<ModelArtifact> {
    let path = path.as_ref();
    info!("Loading model artifact from {path:?}");
    load_path(path).map_err(|e| load_error(path.display().to_string(), e))
}

fn load_path(path: &Path) -> PaddyResult<ModelArtifact> {
    if path.is_file() {
        let mut f = std::fs::File::open(path)?;
        return read_archive(&mut f);
    }
    ensure!(path.is_dir(), "No such file or directory");
    let mut resources = Resources::default();
    // walkdir yields the root itself at depth 0, only load its descendants
    for entry in walkdir::WalkDir::new(path).min_depth(1) {
        let entry = entry.map_err(|e| format_err!("Can not walk directory {:?}: {:?}", path, e))?;
        if entry.path().is_dir() {
            continue;
        }
        let subpath = entry
            .path()
            .components()
            .skip(path.components().count())
            .collect::<PathBuf>();
        let mut stream = std::fs::File::open(entry.path())?;
        resources.read_stream(&subpath, &mut stream)?;
    }
    resources.into_model()
}

/// Load an artifact from a tar or tar.gz stream.
pub fn load_from_read(reader: &mut dyn Read) -> PaddyResult<ModelArtifact> {
    read_archive(reader).map_err(|e| load_error("stream", e))
}

fn read_archive(reader: &mut dyn Read) -> PaddyResult<ModelArtifact> {
    let mut buffer = vec![0u8; 2];
    reader.read_exact(&mut buffer).context("Reading archive header")?;
    let header = std::io::Cursor::new(buffer.clone());
    let stream = header.chain(reader);
    let mut tar = if buffer == [0x1f, 0x8b] {
        let f = flate2::read::GzDecoder::new(stream);
        tar::Archive::new(Box::new(f) as Box<dyn Read + '_>)
    } else {
        tar::Archive::new(Box::new(stream) as Box<dyn Read + '_>)
    };
    let mut resources = Resources::default();
    for entry in tar.entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let path = entry.path()?.to_path_buf();
        resources.read_stream(&path, &mut entry)?;
    }
    resources.into_model()
}

/// Write the artifact as an (uncompressed) tar archive.
pub fn write_to_tar<W: std::io::Write>(model: &ModelArtifact, w: W) -> PaddyResult<W> {
    let proto = ser::to_proto_model(model);
    let mut ar = tar::Builder::new(w);
    let now =
        std::time::SystemTime::now().duration_since(std::time::SystemTime::UNIX_EPOCH)?.as_secs();

    let manifest = serde_json::to_vec_pretty(&proto.manifest)?;
    let mut header = tar::Header::new_gnu();
    header.set_path(MANIFEST_FILENAME).context("Setting model.json path")?;
    header.set_size(manifest.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(now);
    header.set_cksum();
    ar.append(&header, &mut &*manifest).context("Appending model.json")?;

    for (name, t) in &proto.tensors {
        let filename = PathBuf::from(format!("{name}.{}", tensors::TENSOR_EXTENSION));
        let mut data = vec![];
        tensors::write_tensor(&mut data, t)
            .with_context(|| format!("Serializing tensor {filename:?}: {t:?}"))?;

        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(now);
        header.set_cksum();
        ar.append_data(&mut header, &filename, &mut &*data)
            .with_context(|| format!("Appending tensor {filename:?}"))?;
    }
    ar.into_inner().context("Finalizing tar")
}

/// Write the artifact as a directory. Refuses to overwrite.
pub fn write_to_dir(model: &ModelArtifact, path: impl AsRef<Path>) -> PaddyResult<()> {
    let path = path.as_ref();
    if path.exists() {
        bail!("{:?} already exists. Won't overwrite.", path);
    }
    let proto = ser::to_proto_model(model);
    std::fs::create_dir_all(path).with_context(|| format!("Creating dir {path:?}"))?;
    let manifest = std::fs::File::create(path.join(MANIFEST_FILENAME))?;
    serde_json::to_writer_pretty(manifest, &proto.manifest)?;
    for (name, t) in &proto.tensors {
        let filename = path.join(format!("{name}.{}", tensors::TENSOR_EXTENSION));
        let file = std::fs::File::create(&filename)
            .with_context(|| format!("Creating file {filename:?}"))?;
        tensors::write_tensor(std::io::BufWriter::new(file), t)?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use paddy_core::ops::array::Flatten;
    use paddy_core::ops::cnn::{Conv2d, MaxPool, PaddingSpec, PoolSpec};
    use paddy_core::ops::nn::{Activation, Dense, Dropout};

    fn leafnet() -> ModelArtifact {
        let kernel: Vec<f32> = (0..3 * 3 * 3 * 2).map(|i| i as f32 / 54.0 - 0.5).collect();
        let dense: Vec<f32> = (0..2 * 2 * 2 * 3).map(|i| (i % 5) as f32 / 5.0 - 0.4).collect();
        ModelArtifact::builder("leafnet", InputContract::new(4, 4))
            .version("2")
            .layer(Conv2d::new(
                Arc::new(Tensor::from_shape(&[3, 3, 3, 2], &kernel).unwrap()),
                Some(rctensor1(&[0.1, -0.1])),
                tvec!(1, 1),
                PaddingSpec::SameUpper,
            ))
            .layer(Activation::LeakyRelu { alpha: 0.01 })
            .layer(MaxPool::new(PoolSpec::new(tvec!(2, 2), PaddingSpec::Valid, None)))
            .layer(Flatten::default())
            .layer(Dropout::new(0.25))
            .layer(Dense::new(Arc::new(Tensor::from_shape(&[8, 3], &dense).unwrap()), None))
            .layer(Activation::Softmax)
            .labels(["healthy", "blast", "tungro"])
            .build()
            .unwrap()
    }

    fn input() -> Tensor {
        let data: Vec<f32> = (0..48).map(|i| (i % 7) as f32 / 7.0).collect();
        Tensor::from_shape(&[1, 4, 4, 3], &data).unwrap()
    }

    fn assert_same_model(a: &ModelArtifact, b: &ModelArtifact) -> PaddyResult<()> {
        assert_eq!(a.name(), b.name());
        assert_eq!(a.version(), b.version());
        assert_eq!(a.contract(), b.contract());
        assert_eq!(a.labels(), b.labels());
        assert_eq!(a.summary(), b.summary());
        let runner_a = InferenceRunner::new(Arc::new(a.clone()));
        let runner_b = InferenceRunner::new(Arc::new(b.clone()));
        runner_a.run(&input())?.close_enough(&runner_b.run(&input())?, false)
    }

    #[test]
    fn tar_stream() -> PaddyResult<()> {
        let model = leafnet();
        let buffer = write_to_tar(&model, vec![])?;
        let reloaded = load_from_read(&mut &*buffer)?;
        assert_same_model(&model, &reloaded)
    }

    #[test]
    fn gzipped_tar_file() -> PaddyResult<()> {
        let model = leafnet();
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("leafnet.tgz");
        let gz = flate2::write::GzEncoder::new(
            std::fs::File::create(&path)?,
            flate2::Compression::default(),
        );
        write_to_tar(&model, gz)?.finish()?;
        assert_same_model(&model, &load(&path)?)
    }

    #[test]
    fn directory() -> PaddyResult<()> {
        let model = leafnet();
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("leafnet");
        write_to_dir(&model, &path)?;
        assert!(path.join("model.json").is_file());
        assert!(path.join("layer0.kernel.npy").is_file());
        // hidden files are skipped
        std::fs::write(path.join(".DS_Store"), b"junk")?;
        assert_same_model(&model, &load(&path)?)?;
        assert!(write_to_dir(&model, &path).is_err());
        Ok(())
    }

    #[test]
    fn missing_tensor() -> PaddyResult<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("leafnet");
        write_to_dir(&leafnet(), &path)?;
        std::fs::remove_file(path.join("layer5.weights.npy"))?;
        let err = load(&path).unwrap_err();
        assert!(err.downcast_ref::<ArtifactLoadError>().is_some());
        assert!(format!("{err}").contains("layer5.weights"));
        Ok(())
    }

    #[test]
    fn missing_manifest() {
        let err = load_from_read(&mut &b"\0\0 not a tar at all"[..]).unwrap_err();
        assert!(err.downcast_ref::<ArtifactLoadError>().is_some());
    }

    #[test]
    fn missing_path() {
        let err = load("/definitely/not/here.tgz").unwrap_err();
        assert!(err.downcast_ref::<ArtifactLoadError>().is_some());
    }

    #[test]
    fn inconsistent_labels() -> PaddyResult<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("leafnet");
        write_to_dir(&leafnet(), &path)?;
        let json = std::fs::read_to_string(path.join("model.json"))?;
        let mut manifest: Manifest = serde_json::from_str(&json)?;
        manifest.labels = Some(vec!["healthy".into()]);
        std::fs::write(path.join("model.json"), serde_json::to_string(&manifest)?)?;
        let err = load(&path).unwrap_err();
        assert!(format!("{err}").contains("3 classes but 1 labels"));
        Ok(())
    }
}
