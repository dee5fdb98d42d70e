use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use pwc2arxiv::files::{expand_explicit, find_in_directory, OutputMode};
use pwc2arxiv::report::{print_batch_summary, print_file_summary};
use pwc2arxiv::{load_index, run_batch, ConvertSettings, IndexSource, DEFAULT_BACKUP};
use pwc_core::persist::{save_snapshot, SnapshotMeta, SnapshotPaths, SNAPSHOT_VERSION};
use pwc_core::{parse_source_url, BuildOptions, DuplicatePolicy, TargetSelection};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "pwc2arxiv")]
#[command(about = "Rewrite Papers with Code paper links to arXiv links using the offline backup", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DatasetArgs {
    /// Papers with Code backup JSON (links-between-papers-and-code.json) or a slug -> arXiv id table
    #[arg(long, short = 'j', env = "PWC_BACKUP_JSON", default_value = DEFAULT_BACKUP)]
    json_file: PathBuf,
    /// Compiled snapshot directory; takes precedence over --json-file
    #[arg(long)]
    index: Option<PathBuf>,
    /// Policy for one slug mapping to different papers: last-wins, first-wins, reject
    #[arg(long, default_value_t = DuplicatePolicy::LastWins)]
    duplicates: DuplicatePolicy,
    /// Which arXiv id to use when a record lists several: first, latest-version, unversioned, reject-ambiguous
    #[arg(long, default_value_t = TargetSelection::First)]
    select: TargetSelection,
}

impl DatasetArgs {
    fn source(&self) -> IndexSource {
        match &self.index {
            Some(dir) => IndexSource::Snapshot(dir.clone()),
            None => IndexSource::Json(self.json_file.clone()),
        }
    }

    fn options(&self) -> BuildOptions {
        BuildOptions { selection: self.select, duplicates: self.duplicates }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Convert links in files given explicitly or found in a directory
    Convert {
        /// Files to convert
        #[arg(conflicts_with = "directory")]
        files: Vec<PathBuf>,
        /// Directory containing files to convert
        #[arg(long, short = 'd')]
        directory: Option<PathBuf>,
        /// File name pattern used with --directory
        #[arg(long, short = 'p', default_value = "*.md")]
        pattern: String,
        /// Descend into subdirectories of --directory
        #[arg(long, default_value_t = false)]
        recursive: bool,
        /// Output path (single input only)
        #[arg(long, short = 'o', conflicts_with = "in_place")]
        output: Option<PathBuf>,
        /// Suffix appended to the file stem for outputs
        #[arg(long, default_value = "_arxiv")]
        suffix: String,
        /// Overwrite inputs instead of writing new files
        #[arg(long, default_value_t = false)]
        in_place: bool,
        /// Report what would change without writing anything
        #[arg(long, default_value_t = false)]
        dry_run: bool,
        /// Keep going after a file fails
        #[arg(long, default_value_t = false)]
        continue_on_error: bool,
        /// Write a JSON report of the batch
        #[arg(long)]
        report_json: Option<PathBuf>,
        #[command(flatten)]
        dataset: DatasetArgs,
    },
    /// Build the mapping once and save it as a snapshot directory
    Compile {
        /// Snapshot directory to write
        #[arg(long)]
        output: PathBuf,
        #[command(flatten)]
        dataset: DatasetArgs,
    },
    /// Print the arXiv link for slugs or Papers with Code URLs
    Lookup {
        #[arg(required = true)]
        slugs: Vec<String>,
        #[command(flatten)]
        dataset: DatasetArgs,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Convert {
            files,
            directory,
            pattern,
            recursive,
            output,
            suffix,
            in_place,
            dry_run,
            continue_on_error,
            report_json,
            dataset,
        } => {
            let output_mode = match (output, in_place) {
                (Some(path), _) => OutputMode::Explicit(path),
                (None, true) => OutputMode::InPlace,
                (None, false) => OutputMode::Suffix(suffix),
            };
            let inputs = match &directory {
                Some(dir) => {
                    let skip = match &output_mode {
                        OutputMode::Suffix(s) => Some(s.as_str()),
                        _ => None,
                    };
                    find_in_directory(dir, &pattern, recursive, skip)?
                }
                None => expand_explicit(&files)?,
            };
            if inputs.is_empty() {
                bail!("no files to process");
            }
            if matches!(output_mode, OutputMode::Explicit(_)) && inputs.len() > 1 {
                bail!("--output needs exactly one input file, got {}", inputs.len());
            }

            let index = load_index(&dataset.source(), &dataset.options())?;
            println!("Loaded {} URL mappings", index.len());
            if dry_run {
                println!("Dry run mode - no files will be modified");
            }

            let settings = ConvertSettings { output: output_mode, dry_run };
            let batch = run_batch(&inputs, &index, &settings, continue_on_error);
            for file in &batch.files {
                print_file_summary(file);
            }
            print_batch_summary(&batch);
            if let Some(path) = report_json {
                batch.write_json(&path)?;
            }
            if batch.failed() > 0 {
                bail!("{} file(s) failed to convert", batch.failed());
            }
            Ok(())
        }
        Commands::Compile { output, dataset } => {
            let options = dataset.options();
            let index = load_index(&IndexSource::Json(dataset.json_file.clone()), &options)?;
            let meta = SnapshotMeta {
                entries: index.len(),
                created_at: time::OffsetDateTime::now_utc()
                    .format(&time::format_description::well_known::Rfc3339)
                    .unwrap_or_else(|_| "".into()),
                version: SNAPSHOT_VERSION,
                source: Some(dataset.json_file.display().to_string()),
                selection: options.selection.to_string(),
                duplicates: options.duplicates.to_string(),
            };
            save_snapshot(&SnapshotPaths::new(&output), &index, &meta)?;
            tracing::info!(output = %output.display(), entries = meta.entries, "snapshot written");
            println!("Compiled {} mappings into {}", meta.entries, output.display());
            Ok(())
        }
        Commands::Lookup { slugs, dataset } => {
            let index = load_index(&dataset.source(), &dataset.options())?;
            for arg in &slugs {
                let slug = parse_source_url(arg).map(|m| m.slug).unwrap_or(arg.as_str());
                match index.lookup(slug) {
                    Some(entry) => println!("{arg}\t{}", entry.url),
                    None => println!("{arg}\tnot found"),
                }
            }
            Ok(())
        }
    }
}
