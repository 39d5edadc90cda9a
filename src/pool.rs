//src/pool.rs

use std::path::{Path, PathBuf};

use indicatif::ProgressBar;
use parking_lot::Mutex;

use crate::analysis::file_key;
use crate::error::{AnalysisError, Result};

/// Run `f` over every path on a bounded rayon pool of `workers` threads.
///
/// Each path is an independent task; results are gathered as tasks finish
/// and returned sorted by file name (then full path), so output order does
/// not depend on scheduling. Returns only after every task has finished.
pub fn parallel_map_files<T, F>(
    paths: &[PathBuf],
    workers: usize,
    progress: Option<&ProgressBar>,
    f: F,
) -> Result<Vec<(PathBuf, T)>>
where
    T: Send,
    F: Fn(&Path) -> T + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()
        .map_err(|e| AnalysisError::Config(format!("cannot build worker pool: {e}")))?;

    let total = paths.len();
    let completed: Mutex<Vec<(PathBuf, T)>> = Mutex::new(Vec::with_capacity(total));
    let f = &f;
    let completed_ref = &completed;

    pool.scope(|s| {
        for path in paths {
            s.spawn(move |_| {
                let out = f(path);
                let n = {
                    let mut done = completed_ref.lock();
                    done.push((path.clone(), out));
                    done.len()
                };
                log::info!("[{}/{}] done {}", n, total, path.display());
                if let Some(pb) = progress {
                    pb.inc(1);
                }
            });
        }
    });

    let mut results = completed.into_inner();
    results.sort_by(|a, b| {
        file_key(&a.0)
            .cmp(&file_key(&b.0))
            .then_with(|| a.0.cmp(&b.0))
    });
    Ok(results)
}
