mod batch;
mod cli;
mod level;
mod profile;
mod render;
mod tuning;
mod workflow;

use std::{
    path::PathBuf,
    process::ExitCode,
    sync::{Arc, atomic::AtomicBool},
};

use anyhow::Result;
use clap::{Parser, ValueEnum};
use colored::*;
use signal_hook::consts::{SIGINT, SIGTERM};

use crate::{
    profile::{Resolution, parse_frame_rate},
    tuning::{Generator, HevcVariant},
    workflow::{GeneratorConfig, run_generation_workflow},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StandardArg {
    Avc,
    Hevc,
    All,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Which encoder presets to generate
    #[arg(short, long, value_enum, default_value_t = StandardArg::All)]
    standard: StandardArg,

    /// x265 preset family [options: classic, revised]
    #[arg(long, default_value_t = HevcVariant::default())]
    hevc_variant: HevcVariant,

    /// Directory containing the x264.xml and x265.xml templates
    #[arg(long, value_name = "DIR", default_value = "presets")]
    template_dir: PathBuf,

    /// Directory the generated presets are written to
    #[arg(
        short,
        long,
        value_name = "DIR",
        env = "PROFILEGEN_OUTPUT_PATH",
        default_value = "."
    )]
    output: PathBuf,

    /// Thread count for profiles that don't set their own
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..))]
    threads: Option<u8>,

    /// Replace the stock resolution grid, e.g. 1280x720,1920x1080
    #[arg(long, value_delimiter = ',')]
    resolutions: Vec<Resolution>,

    /// Replace the stock frame rates, e.g. 23.976,29.97
    #[arg(long, value_delimiter = ',', value_parser = parse_frame_rate)]
    frame_rates: Vec<f64>,

    /// Add a hand-specified profile.
    ///
    /// Filters are comma separated:
    /// - name=str: Profile name [default: WxH@fps-quality]
    /// - res=#x#: Resolution (required)
    /// - fps=#: Frame rate (required)
    /// - q=#: Rate factor [default: the standard's medium quality]
    /// - quality=low/medium/high: Rate factor preset
    /// - threads=#: Thread count
    #[arg(short, long = "profile", value_name = "SPEC", verbatim_doc_comment)]
    profiles: Vec<String>,

    /// Only generate the profiles given with --profile
    #[arg(long)]
    no_defaults: bool,

    /// Print the presets that would be written without writing them
    #[arg(long)]
    dry_run: bool,

    /// Print every derived parameter set
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn generators(&self) -> Vec<Generator> {
        match self.standard {
            StandardArg::Avc => vec![Generator::X264],
            StandardArg::Hevc => vec![Generator::X265(self.hevc_variant)],
            StandardArg::All => vec![Generator::X264, Generator::X265(self.hevc_variant)],
        }
    }

    fn into_config(self) -> GeneratorConfig {
        GeneratorConfig {
            generators: self.generators(),
            template_dir: path_clean::clean(&self.template_dir),
            output_dir: path_clean::clean(&self.output),
            resolutions: self.resolutions,
            frame_rates: self.frame_rates,
            thread_count: self.threads,
            profile_specs: self.profiles,
            include_defaults: !self.no_defaults,
            dry_run: self.dry_run,
            verbose: self.verbose,
        }
    }
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let config = args.into_config();

    let sigterm = Arc::new(AtomicBool::new(false));
    for signal in [SIGTERM, SIGINT] {
        signal_hook::flag::register(signal, Arc::clone(&sigterm))?;
    }

    let summary = run_generation_workflow(&config, &sigterm)?;

    if summary.failed > 0 || summary.skipped > 0 {
        eprintln!(
            "{} Generated {} profile(s), {} failed, {} skipped",
            "[Warning]".yellow().bold(),
            summary.generated.to_string().yellow().bold(),
            summary.failed.to_string().red().bold(),
            summary.skipped.to_string().red().bold()
        );
        return Ok(ExitCode::FAILURE);
    }

    eprintln!(
        "{} Generated {} profile(s)",
        "[Success]".green().bold(),
        summary.generated.to_string().green().bold()
    );
    Ok(ExitCode::SUCCESS)
}
