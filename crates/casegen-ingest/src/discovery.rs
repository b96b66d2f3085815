//! Template discovery.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use casegen_model::{
    MACRO_TEMPLATE, SIM_TEMPLATE, TEMPLATE_PREFIX, Template, TemplateKind, TemplateRole,
    TemplateSet,
};

use crate::error::{IngestError, Result};

/// Lists all `template_*` files in a directory.
///
/// Returns files sorted by filename.
pub fn list_template_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(IngestError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }

    let entries = std::fs::read_dir(dir).map_err(|e| IngestError::DirectoryRead {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut files = Vec::new();
    for entry_result in entries {
        let entry = entry_result.map_err(|e| IngestError::DirectoryRead {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let is_template = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| {
                name.starts_with(TEMPLATE_PREFIX) && name.len() > TEMPLATE_PREFIX.len()
            });
        if is_template {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Loads every template in `dir`.
///
/// `template_Macro.java` and `template_Case.sim` become the required
/// templates; the simulation file is copied verbatim. Every other
/// `template_*` file is a custom text template.
pub fn discover_templates(dir: &Path) -> Result<TemplateSet> {
    let mut set = TemplateSet::default();
    for path in list_template_files(dir)? {
        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        let file_name = file_name.to_string();
        let content = std::fs::read(&path).map_err(|source| IngestError::TemplateRead {
            path: path.clone(),
            source,
        })?;
        let logical = file_name[TEMPLATE_PREFIX.len()..].to_string();
        match file_name.as_str() {
            MACRO_TEMPLATE => {
                debug!(path = %path.display(), "found macro template");
                set.macro_template = Some(
                    Template::new(logical, TemplateRole::Required, TemplateKind::Text, content)
                        .with_source(path),
                );
            }
            SIM_TEMPLATE => {
                debug!(path = %path.display(), "found simulation template");
                set.sim_template = Some(
                    Template::new(
                        logical,
                        TemplateRole::Required,
                        TemplateKind::Verbatim,
                        content,
                    )
                    .with_source(path),
                );
            }
            _ => {
                info!(template = %logical, "found custom template");
                set.custom.push(
                    Template::new(logical, TemplateRole::Custom, TemplateKind::Text, content)
                        .with_source(path),
                );
            }
        }
    }
    Ok(set)
}
