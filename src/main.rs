//! `xia [DOCUMENTS_DIR]`: normalize every annotation file in a directory and
//! rewrite the ones that needed repairs.

use std::path::PathBuf;
use std::process::ExitCode;

use xia::{DocumentStore, XiaConfig};

fn main() -> ExitCode {
    let config = XiaConfig::load_from_default_path().unwrap_or_default();

    env_logger::Builder::new()
        .filter_level(config.preferences.log_level.to_level_filter())
        .parse_default_env()
        .init();

    let Some(dir) = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| config.preferences.documents_dir.clone())
    else {
        eprintln!("Usage: xia [DOCUMENTS_DIR]");
        return ExitCode::FAILURE;
    };

    let store = DocumentStore::new(&dir);
    let ids = match store.ids() {
        Ok(ids) => ids,
        Err(e) => {
            eprintln!("Cannot read {}: {}", dir.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let mut repaired = 0;
    let mut failed = 0;
    for id in &ids {
        let (document, repairs) = match store.load_with_repairs(id) {
            Ok(loaded) => loaded,
            Err(e) => {
                log::error!("Document {}: {}", id, e);
                failed += 1;
                continue;
            }
        };
        if repairs.is_empty() {
            continue;
        }
        for repair in &repairs {
            log::info!("Document {}: {}", id, repair);
        }
        match store.save(id, &document) {
            Ok(()) => repaired += 1,
            Err(e) => {
                log::error!("Document {}: {}", id, e);
                failed += 1;
            }
        }
    }

    match store.orphans() {
        Ok(orphans) if !orphans.is_empty() => {
            log::warn!("{} photos have no annotation file", orphans.len());
        }
        Ok(_) => {}
        Err(e) => log::warn!("Could not look for orphan photos: {}", e),
    }

    println!(
        "{} documents checked, {} repaired, {} failed",
        ids.len(),
        repaired,
        failed
    );
    if failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
