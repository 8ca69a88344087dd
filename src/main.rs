use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use start_sarek::charon::client::CharonSession;
use start_sarek::config::{load_ngi_config, locate_ngi_config, read_sample_list, CharonSettings};
use start_sarek::db::job::load::load_orphans;
use start_sarek::db::job::update::resolve_orphans;
use start_sarek::db::ledger::Ledger;
use start_sarek::launch::{FailurePolicy, LaunchOptions, Launcher};
use start_sarek::layout::ProjectLayout;
use start_sarek::reference::{Genome, SexTag};
use start_sarek::slurm::submit::Sbatch;
use start_sarek::slurm::template::ScriptTemplate;

/// Given a project ID, launch Sarek analysis for all samples in that project with analysis status
/// set to 'TO_ANALYZE' in Charon.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Project ID, e.g. P10001
    project_id: String,

    /// Run Sarek with GRCh37 or GRCh38
    #[arg(long, value_enum)]
    genome: Genome,

    /// Sex of the samples written to the Sarek input TSV
    #[arg(long, value_enum, default_value_t = SexTag::ZZ)]
    sex: SexTag,

    /// Optional list of sample ids to include in the analysis run, one per line
    #[arg(long, value_name = "FILE")]
    sample_list: Option<PathBuf>,

    /// Only generate the tsv files and sbatch scripts, don't submit the jobs
    #[arg(long = "no-submit-jobs", visible_alias = "dry-run")]
    dry_run: bool,

    /// Stop at the first failed submission instead of carrying on with the other samples
    #[arg(long)]
    fail_fast: bool,

    /// List jobs that were submitted but never confirmed in Charon, then exit
    #[arg(long, conflicts_with = "resolve_orphan")]
    show_orphans: bool,

    /// Mark a sample's orphaned jobs as handled after fixing its status in Charon by hand, then exit
    #[arg(long, value_name = "SAMPLE")]
    resolve_orphan: Option<String>,

    /// NGI config file, defaults to $NGI_CONFIG or ~/.ngipipeline/ngi_config.yaml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    info!("start-sarek starting up");

    match run(args) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            error!("{err:#}");
            ExitCode::from(2)
        }
    }
}

fn run(args: Args) -> Result<u8> {
    let env = |key: &str| std::env::var(key).ok();
    let config_path = locate_ngi_config(args.config.as_deref(), env)?;
    let config = load_ngi_config(&config_path)?.start_sarek;
    let layout = ProjectLayout::new(&config.project_base_path, &config.workflow);
    let ledger_path = config.ledger.clone().unwrap_or_else(|| layout.ledger_path(&args.project_id));

    if args.show_orphans {
        return show_orphans(&ledger_path, &args.project_id);
    }
    if let Some(sample_id) = &args.resolve_orphan {
        return resolve_orphan(&ledger_path, &args.project_id, sample_id);
    }

    let charon = CharonSettings::from_env(env)?;
    let session = CharonSession::new(charon.base_url, charon.api_token).context("Can't set up charon session")?;
    let template = ScriptTemplate::load(&config.sbatch_template)?;
    let sample_list = args.sample_list.as_deref().map(read_sample_list).transpose()?;

    let options = LaunchOptions {
        genome: args.genome,
        sex: args.sex,
        dry_run: args.dry_run,
        policy: match args.fail_fast {
            true => FailurePolicy::FailFast,
            false => FailurePolicy::BestEffort,
        },
        sample_list,
    };
    info!(
        "Launching project {} with {} using template {}",
        args.project_id,
        options.genome,
        template.path().display()
    );

    let ledger = Ledger::at(&ledger_path, args.dry_run);
    let launcher = Launcher::new(session, Sbatch::new(&config.sbatch), layout, template, &ledger, options);
    let summary = launcher.run(&args.project_id)?;
    ledger.close().context("Can't close launch ledger")?;

    summary.log();
    print!("{summary}");
    Ok(summary.exit_code())
}

fn show_orphans(ledger_path: &Path, project_id: &str) -> Result<u8> {
    let ledger = Ledger::at(ledger_path, true);
    let Some(conn) = ledger.existing().context("Can't open launch ledger")? else {
        println!("No launch ledger at {}", ledger_path.display());
        return Ok(0);
    };
    let orphans = load_orphans(conn, project_id).context("Can't read launch ledger")?;
    ledger.close().context("Can't close launch ledger")?;

    if orphans.is_empty() {
        println!("No orphaned jobs for project {project_id}");
        return Ok(0);
    }
    println!("Jobs submitted for project {project_id} but never confirmed in charon:");
    for orphan in &orphans {
        println!("  {}  job {}  submitted {}", orphan.sample_id, orphan.slurm_id, orphan.submitted_at);
    }
    Ok(1)
}

fn resolve_orphan(ledger_path: &Path, project_id: &str, sample_id: &str) -> Result<u8> {
    let ledger = Ledger::at(ledger_path, false);
    let Some(conn) = ledger.existing().context("Can't open launch ledger")? else {
        println!("No launch ledger at {}", ledger_path.display());
        return Ok(1);
    };
    let resolved = resolve_orphans(conn, project_id, sample_id).context("Can't update launch ledger")?;
    if resolved == 0 {
        println!("No orphaned jobs for sample {sample_id} of project {project_id}");
        return Ok(1);
    }
    info!("Marked {resolved} orphaned jobs of {sample_id} as resolved");
    println!("Resolved {resolved} orphaned jobs for sample {sample_id} of project {project_id}");
    Ok(0)
}
