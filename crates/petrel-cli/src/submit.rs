//! Cluster fan-out: pair each batch file with an API key and submit one
//! scheduler job per pairing.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};

/// Job name segment derived from a batch filename: the piece of the stem
/// after the first `-`, or the whole stem if there is none.
/// `"xml-bees.dat"` → `"bees"`.
pub fn run_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("batch");
    stem.split('-').nth(1).unwrap_or(stem).to_string()
}

/// Parse the API key list: one key per row, fourth column, skipping the
/// `api_key` header row.
pub fn read_keys(path: &Path) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("failed to read API key list: {}", path.display()))?;

    let mut keys = Vec::new();
    for row in reader.records() {
        let row = row.context("bad row in API key list")?;
        if let Some(key) = row.get(3) {
            let key = key.trim();
            if !key.is_empty() && key != "api_key" {
                keys.push(key.to_string());
            }
        }
    }
    Ok(keys)
}

/// List the `.dat` batch files in a directory, sorted by name so that
/// batch/key pairing is deterministic.
pub fn list_batches(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("batch directory not readable: {}", dir.display()))?;

    let mut batches: Vec<PathBuf> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "dat"))
        .collect();
    batches.sort();
    Ok(batches)
}

/// Render the shell submission script for one (batch, key) pairing.
pub fn build_script(harvester: &str, batch: &Path, api_key: &str, name: &str) -> String {
    format!(
        "#!/bin/sh\n#PBS -N Scan-{name}\n{harvester} harvest --urls {} --api-key {api_key}\n",
        batch.display()
    )
}

/// Write a submission script per (batch, key) pairing and hand each one
/// to the scheduler. Batches and keys are paired positionally.
pub fn cmd_submit(keys_path: &Path, batch_dir: &Path, scheduler: &str) -> Result<()> {
    let keys = read_keys(keys_path)?;
    let batches = list_batches(batch_dir)?;

    if keys.is_empty() {
        bail!("no API keys found in {}", keys_path.display());
    }
    if batches.is_empty() {
        bail!("no .dat batch files found in {}", batch_dir.display());
    }
    if keys.len() < batches.len() {
        tracing::warn!(
            keys = keys.len(),
            batches = batches.len(),
            "Fewer keys than batches; trailing batches will not be submitted"
        );
    }

    let harvester = std::env::current_exe().context("cannot locate harvester binary")?;
    let harvester = harvester.display().to_string();

    for (batch, key) in batches.iter().zip(&keys) {
        let name = run_name(batch);
        let script = build_script(&harvester, batch, key, &name);

        let script_path = Path::new("script.sh");
        std::fs::write(script_path, &script)
            .with_context(|| format!("failed to write {}", script_path.display()))?;
        std::fs::set_permissions(script_path, std::fs::Permissions::from_mode(0o755))
            .context("failed to mark submission script executable")?;

        tracing::info!(job = %format!("Scan-{name}"), batch = %batch.display(), "Submitting");
        let status = Command::new(scheduler)
            .arg(script_path)
            .status()
            .with_context(|| format!("failed to run scheduler command '{scheduler}'"))?;
        if !status.success() {
            bail!("scheduler rejected job Scan-{name} (exit {status})");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_name_takes_segment_after_first_dash() {
        assert_eq!(run_name(Path::new("data/xml-bees.dat")), "bees");
        assert_eq!(run_name(Path::new("xml-north-2019.dat")), "north");
    }

    #[test]
    fn run_name_falls_back_to_whole_stem() {
        assert_eq!(run_name(Path::new("bees.dat")), "bees");
    }

    #[test]
    fn build_script_names_job_and_invokes_harvest() {
        let script = build_script("/opt/petrel", Path::new("data/xml-bees.dat"), "K123", "bees");
        assert!(script.starts_with("#!/bin/sh\n"));
        assert!(script.contains("#PBS -N Scan-bees\n"));
        assert!(
            script.contains("/opt/petrel harvest --urls data/xml-bees.dat --api-key K123\n")
        );
    }

    #[test]
    fn read_keys_skips_header_and_takes_fourth_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.csv");
        std::fs::write(
            &path,
            "name,email,org,api_key\nalice,a@x.org,lab,KEY_A\nbob,b@x.org,lab,KEY_B \n",
        )
        .unwrap();

        let keys = read_keys(&path).unwrap();
        assert_eq!(keys, vec!["KEY_A", "KEY_B"]);
    }

    #[test]
    fn read_keys_skips_short_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.csv");
        std::fs::write(&path, "only,three,columns\na,b,c,KEY_A\n").unwrap();

        let keys = read_keys(&path).unwrap();
        assert_eq!(keys, vec!["KEY_A"]);
    }

    #[test]
    fn list_batches_filters_and_sorts_dat_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["xml-b.dat", "xml-a.dat", "notes.txt", "xml-c.csv"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }

        let batches = list_batches(dir.path()).unwrap();
        let names: Vec<String> = batches
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["xml-a.dat", "xml-b.dat"]);
    }
}
