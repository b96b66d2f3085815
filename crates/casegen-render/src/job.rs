//! Per-case job preparation.
//!
//! A [`CaseJob`] carries everything a worker needs: the rendered bytes of each
//! template and the paths the builder will be pointed at. Preparation is pure;
//! nothing touches the file system until [`CaseJob::write_files`].

use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, warn};

use casegen_map::{SAVE_PATH_LITERAL, SubstitutionMap, SubstitutionPlanner};
use casegen_model::{
    BatchStages, CaseId, CaseNaming, ParamTable, RenderError, Row, RowError, Template,
    TemplateKind, TemplateRole, TemplateSet,
};

use crate::layout::{OutputLayout, to_forward_slashes};
use crate::renderer::render;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    pub file_name: String,
    pub role: TemplateRole,
    pub content: Vec<u8>,
}

/// Files handed to the external builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInputs {
    pub sim_file: PathBuf,
    pub macro_file: PathBuf,
}

#[derive(Debug, Clone)]
pub struct CaseJob {
    pub case: CaseId,
    pub row: Row,
    pub case_dir: PathBuf,
    pub files: Vec<RenderedFile>,
    /// Present when the batch invokes the builder.
    pub build_inputs: Option<BuildInputs>,
}

impl CaseJob {
    /// Whether the case directory already holds any entry.
    pub fn has_existing_outputs(&self) -> bool {
        std::fs::read_dir(&self.case_dir)
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false)
    }

    /// Where the builder appends its console output.
    pub fn log_path(&self) -> PathBuf {
        self.case_dir.join(OutputLayout::log_file_name(&self.case))
    }

    pub fn output_paths(&self) -> Vec<PathBuf> {
        self.files
            .iter()
            .map(|file| self.case_dir.join(&file.file_name))
            .collect()
    }

    /// Write every rendered file into the case directory, overwriting existing files.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Write`] when the directory or a file cannot be written.
    pub fn write_files(&self) -> Result<Vec<PathBuf>, RenderError> {
        std::fs::create_dir_all(&self.case_dir)
            .map_err(|source| RenderError::write(&self.case_dir, source))?;
        let mut written = Vec::with_capacity(self.files.len());
        for file in &self.files {
            let path = self.case_dir.join(&file.file_name);
            std::fs::write(&path, &file.content)
                .map_err(|source| RenderError::write(&path, source))?;
            debug!(case = %self.case, path = %path.display(), bytes = file.content.len(), "wrote case file");
            written.push(path);
        }
        Ok(written)
    }
}

#[derive(Debug, Error)]
pub enum PrepareError {
    #[error(transparent)]
    Row(#[from] RowError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// A job ready for dispatch, or a row that failed preparation.
#[derive(Debug)]
pub enum PreparedJob {
    Ready(Box<CaseJob>),
    Rejected { case: CaseId, reason: String },
}

impl PreparedJob {
    pub fn case(&self) -> &CaseId {
        match self {
            Self::Ready(job) => &job.case,
            Self::Rejected { case, .. } => case,
        }
    }
}

/// Turns parameter rows into case jobs for one batch.
pub struct JobFactory<'a> {
    planner: &'a SubstitutionPlanner,
    templates: &'a TemplateSet,
    layout: &'a OutputLayout,
    stages: BatchStages,
    naming: CaseNaming,
}

impl<'a> JobFactory<'a> {
    pub fn new(
        planner: &'a SubstitutionPlanner,
        templates: &'a TemplateSet,
        layout: &'a OutputLayout,
        stages: BatchStages,
        naming: CaseNaming,
    ) -> Self {
        Self {
            planner,
            templates,
            layout,
            stages,
            naming,
        }
    }

    pub fn naming(&self) -> &CaseNaming {
        &self.naming
    }

    /// Plan and render every enabled template for `row`.
    ///
    /// # Errors
    ///
    /// Returns a [`PrepareError`] when planning or rendering fails for this row.
    pub fn prepare(&self, row: &Row) -> Result<CaseJob, PrepareError> {
        let case = self.naming.case_id(row.position());
        let case_dir = self.layout.case_dir(&case);
        let base = self.planner.plan(row, &case)?;
        let sim_name = OutputLayout::sim_file_name(&case);

        let mut files = Vec::new();
        if self.stages.apply_required_templates {
            if let Some(sim) = &self.templates.sim_template {
                files.push(render_file(sim, sim_name.clone(), &base)?);
            }
            if let Some(macro_template) = &self.templates.macro_template {
                let mut map = base.clone();
                map.insert_rule(
                    macro_template.self_reference(),
                    OutputLayout::rendered_stem(macro_template, &case),
                )?;
                map.insert_rule(
                    SAVE_PATH_LITERAL,
                    to_forward_slashes(&case_dir.join(&sim_name)),
                )?;
                let name = OutputLayout::rendered_file_name(macro_template, &case);
                files.push(render_file(macro_template, name, &map)?);
            }
        }
        if self.stages.apply_custom_templates {
            for template in &self.templates.custom {
                let mut map = base.clone();
                map.insert_rule(
                    template.self_reference(),
                    OutputLayout::rendered_stem(template, &case),
                )?;
                let name = OutputLayout::rendered_file_name(template, &case);
                files.push(render_file(template, name, &map)?);
            }
        }

        let build_inputs = if self.stages.invoke_builder {
            self.templates
                .macro_template
                .as_ref()
                .map(|macro_template| BuildInputs {
                    sim_file: case_dir.join(&sim_name),
                    macro_file: case_dir
                        .join(OutputLayout::rendered_file_name(macro_template, &case)),
                })
        } else {
            None
        };

        Ok(CaseJob {
            case,
            row: row.clone(),
            case_dir,
            files,
            build_inputs,
        })
    }

    /// Prepare a job for every row, in row order.
    ///
    /// Rows that fail preparation are kept as [`PreparedJob::Rejected`] so they
    /// are reported at their place in the dispatch order.
    pub fn prepare_all(&self, table: &ParamTable) -> Vec<PreparedJob> {
        table
            .rows()
            .iter()
            .map(|row| match self.prepare(row) {
                Ok(job) => PreparedJob::Ready(Box::new(job)),
                Err(error) => {
                    let case = self.naming.case_id(row.position());
                    warn!(case = %case, %error, "case rejected during preparation");
                    PreparedJob::Rejected {
                        case,
                        reason: error.to_string(),
                    }
                }
            })
            .collect()
    }
}

fn render_file(
    template: &Template,
    file_name: String,
    map: &SubstitutionMap,
) -> Result<RenderedFile, RenderError> {
    let content = match template.kind() {
        TemplateKind::Verbatim => template.content().to_vec(),
        TemplateKind::Text => render(template.content(), map)?,
    };
    Ok(RenderedFile {
        file_name,
        role: template.role(),
        content,
    })
}
