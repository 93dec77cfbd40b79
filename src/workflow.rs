use anyhow::{Context, Result};
use colored::*;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::batch::BatchPlan;
use crate::cli::parse_profile_spec;
use crate::level::{LevelTable, Standard};
use crate::profile::Resolution;
use crate::render::{Template, output_file_name, save_setting};
use crate::tuning::Generator;

/// Everything a generation run needs, resolved from the command line.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub generators: Vec<Generator>,
    pub template_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Replaces the stock resolution grid when non-empty.
    pub resolutions: Vec<Resolution>,
    /// Replaces the stock frame rates when non-empty.
    pub frame_rates: Vec<f64>,
    pub thread_count: Option<u8>,
    pub profile_specs: Vec<String>,
    pub include_defaults: bool,
    pub dry_run: bool,
    pub verbose: bool,
}

impl GeneratorConfig {
    pub fn plan_for(&self, standard: Standard) -> Result<BatchPlan> {
        let mut plan = if self.include_defaults {
            BatchPlan::default_for(standard)
        } else {
            BatchPlan::empty()
        };
        if !self.resolutions.is_empty() {
            plan.resolutions.clone_from(&self.resolutions);
        }
        if !self.frame_rates.is_empty() {
            plan.frame_rates.clone_from(&self.frame_rates);
        }
        plan.thread_count = self.thread_count;
        for spec in &self.profile_specs {
            let mut request = parse_profile_spec(spec, standard)
                .with_context(|| format!("Invalid profile spec '{}'", spec))?;
            request.thread_count = request.thread_count.or(self.thread_count);
            plan.named.push(request);
        }
        Ok(plan)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub generated: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Generates presets for every configured encoder, one profile at a time.
///
/// A failing profile is reported and the batch moves on. A missing template
/// skips that encoder only.
pub fn run_generation_workflow(
    config: &GeneratorConfig,
    sigterm: &AtomicBool,
) -> Result<BatchSummary> {
    if !config.dry_run {
        fs::create_dir_all(&config.output_dir).with_context(|| {
            format!(
                "Failed to create output directory {}",
                config.output_dir.display()
            )
        })?;
    }

    let mut summary = BatchSummary::default();
    for generator in &config.generators {
        if !generate_presets(*generator, config, sigterm, &mut summary)? {
            eprintln!(
                "{} Generation interrupted by signal",
                "[Info]".blue().bold()
            );
            break;
        }
    }
    Ok(summary)
}

/// Returns `false` when interrupted.
fn generate_presets(
    generator: Generator,
    config: &GeneratorConfig,
    sigterm: &AtomicBool,
    summary: &mut BatchSummary,
) -> Result<bool> {
    let standard = generator.standard();
    let table = LevelTable::for_standard(standard);
    table.validate()?;
    let requests = config.plan_for(standard)?.requests(standard);

    if requests.is_empty() {
        eprintln!(
            "{} No {} profiles requested",
            "[Warning]".yellow().bold(),
            generator
        );
        return Ok(true);
    }

    let template = if config.dry_run {
        None
    } else {
        match Template::load_for(&config.template_dir, standard) {
            Ok(template) => Some(template),
            Err(err) => {
                eprintln!(
                    "{} Skipping {}: {}",
                    "[Error]".red().bold(),
                    generator.to_string().red(),
                    format!("{:#}", err).red()
                );
                summary.skipped += requests.len();
                return Ok(true);
            }
        }
    };

    eprintln!(
        "{} Generating {} {} profile(s)",
        "[Info]".blue().bold(),
        requests.len().to_string().blue().bold(),
        generator
    );

    for request in requests {
        if sigterm.load(Ordering::Relaxed) {
            return Ok(false);
        }

        let params = generator.assemble(&table, &request);
        if config.verbose {
            eprintln!("{} {}: {}", "[Info]".blue().bold(), params.name, params);
        }

        let Some(template) = template.as_ref() else {
            println!("{}", output_file_name(&params));
            summary.generated += 1;
            continue;
        };

        match save_setting(template, &params, &config.output_dir) {
            Ok(path) => {
                summary.generated += 1;
                if config.verbose {
                    eprintln!(
                        "{} Wrote {}",
                        "[Success]".green().bold(),
                        path.display().to_string().green()
                    );
                }
            }
            Err(err) => {
                summary.failed += 1;
                eprintln!(
                    "{} Failed generating {}: {}",
                    "[Error]".red().bold(),
                    params.name.red(),
                    format!("{:#}", err).red()
                );
            }
        }
    }

    Ok(true)
}
