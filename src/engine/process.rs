// src/engine/process.rs

//! Single-file fan-out: read once, hand the bytes to every applicable
//! processor, write each processor's output.

use std::path::Path;

use futures::future::join_all;
use tracing::debug;

use crate::errors::{PipelineError, Result};
use crate::fs::FileSystem;
use crate::path_utils::{join_relative, output_relative, parent_dir, relative_str};
use crate::processor::{ProcessorSpec, Transformed};

/// One manifest line produced for one processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Source path relative to the entry root.
    pub source: String,
    /// Output path relative to the processor's output root.
    pub output: String,
}

/// Process `file` for every `Some` processor slot.
///
/// The result has one slot per input slot, in the same order. `None` input
/// slots are echoed back untouched, and when every slot is `None` the file is
/// not even read. A processor whose transform returns [`Transformed::Skip`]
/// yields `None` and performs no directory creation or write.
///
/// Processors run concurrently and independently: a failing processor does
/// not cut short the others. Once all have settled, the first failure in
/// processor order is returned.
pub async fn process_file(
    fs: &dyn FileSystem,
    file: &Path,
    entry_root: &Path,
    processors: &[Option<&ProcessorSpec>],
) -> Result<Vec<Option<ManifestEntry>>> {
    if processors.iter().all(Option::is_none) {
        return Ok(vec![None; processors.len()]);
    }

    let rel_source = relative_to_root(entry_root, file)?;
    let rel_dir = relative_to_root(entry_root, &parent_dir(file))?;

    let contents = fs.read(file).await?;
    debug!(file = %rel_source, bytes = contents.len(), "read source file");

    let tasks = processors.iter().enumerate().map(|(index, slot)| {
        let contents = contents.as_slice();
        let rel_source = rel_source.as_str();
        let rel_dir = rel_dir.as_str();
        async move {
            match slot {
                Some(processor) => {
                    process_one(fs, index, processor, contents, rel_source, rel_dir).await
                }
                None => Ok(None),
            }
        }
    });

    join_all(tasks).await.into_iter().collect()
}

async fn process_one(
    fs: &dyn FileSystem,
    index: usize,
    processor: &ProcessorSpec,
    contents: &[u8],
    rel_source: &str,
    rel_dir: &str,
) -> Result<Option<ManifestEntry>> {
    let transformed = processor
        .apply_transform(contents, rel_source)
        .await
        .map_err(|source| PipelineError::Transform {
            processor: index,
            path: rel_source.to_string(),
            source,
        })?;

    let bytes = match transformed {
        Transformed::Keep(bytes) => bytes,
        Transformed::Skip => {
            debug!(processor = index, file = %rel_source, "transform skipped file");
            return Ok(None);
        }
    };

    let name = processor
        .output_name(rel_source, &bytes)
        .await
        .map_err(|source| PipelineError::Rename {
            processor: index,
            path: rel_source.to_string(),
            source,
        })?;

    let out_dir = join_relative(processor.out_root(), rel_dir);
    fs.create_dir_all(&out_dir).await?;
    fs.write(&out_dir.join(&name), &bytes).await?;

    let output = output_relative(rel_dir, &name);
    debug!(processor = index, source = %rel_source, output = %output, "wrote output file");

    Ok(Some(ManifestEntry {
        source: rel_source.to_string(),
        output,
    }))
}

pub(crate) fn relative_to_root(root: &Path, path: &Path) -> Result<String> {
    relative_str(root, path).ok_or_else(|| {
        PipelineError::Other(anyhow::anyhow!(
            "{:?} is not inside entry root {:?}",
            path,
            root
        ))
    })
}
