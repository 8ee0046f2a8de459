use std::path::{Path, PathBuf};

use log::{info, warn};
use walkdir::DirEntry;

use super::DocSession;
use crate::document::{is_supported, UploadedDocument};
use crate::session::ReplyKind;

pub async fn process_paths(
    session: &mut DocSession,
    paths: &[PathBuf],
    recursive: bool,
) -> anyhow::Result<()> {
    let docs = collect_documents(paths, recursive)?;
    println!("Processing {} documents...", docs.len());

    let reply = session.process(&docs).await?;
    match reply.kind {
        ReplyKind::Warning => println!("warning: {}", reply.message),
        _ => println!("{}", reply.message),
    }
    Ok(())
}

pub async fn reset(session: &mut DocSession) -> anyhow::Result<()> {
    if session.reset().await? {
        println!("Index removed");
    } else {
        println!("Nothing to remove");
    }
    Ok(())
}

/// Loads the given files, and the supported files inside the given directories.
pub fn collect_documents(paths: &[PathBuf], recursive: bool) -> anyhow::Result<Vec<UploadedDocument>> {
    let mut docs = Vec::new();

    for path in paths {
        if path.is_dir() {
            for entry in get_entries(path, recursive) {
                let entry_path = entry.path();
                if !entry_path.is_file() {
                    continue;
                }
                if is_supported(entry_path) {
                    docs.push(UploadedDocument::from_path(entry_path)?);
                } else {
                    warn!("Skipping unsupported file type: {}", entry_path.display());
                }
            }
        } else {
            info!("Reading {}", path.display());
            docs.push(UploadedDocument::from_path(path)?);
        }
    }

    Ok(docs)
}

fn get_entries(path: &Path, recursive: bool) -> impl Iterator<Item = DirEntry> {
    let iter = if recursive {
        walkdir::WalkDir::new(path)
    } else {
        walkdir::WalkDir::new(path).max_depth(1)
    };
    iter.sort_by_file_name().into_iter().filter_map(|e| e.ok())
}
