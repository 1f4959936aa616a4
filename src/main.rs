use clap::{Parser, Subcommand};
use colored::Colorize;
use scholarsync::config::Config;
use scholarsync::{dataset, report, sitemap, Pipeline, SourceToggles};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "scholarsync")]
#[command(version = "0.1.0")]
#[command(about = "Fetch, reconcile, and publish academic publication data", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch all sources, reconcile, and update the fallback dataset
    Update(UpdateArgs),

    /// Crawl the site directory and regenerate the sitemap
    Sitemap(SitemapArgs),
}

#[derive(Parser, Debug)]
struct UpdateArgs {
    /// Credentials/config file
    #[arg(long, default_value = "keys.json")]
    keys: PathBuf,

    /// Persisted dataset path
    #[arg(long, short, default_value = "fallback-data.json")]
    output: PathBuf,

    /// Skip the GitHub repositories fetch
    #[arg(long)]
    no_github: bool,

    /// Skip the Google Scholar fetch
    #[arg(long)]
    no_scholar: bool,

    /// Skip the Scopus fetch
    #[arg(long)]
    no_scopus: bool,

    /// Skip the Web of Science fetch
    #[arg(long)]
    no_wos: bool,

    /// Skip the ORCID fetch
    #[arg(long)]
    no_orcid: bool,

    /// Fetch and report changes without writing the dataset
    #[arg(long)]
    dry_run: bool,
}

#[derive(Parser, Debug)]
struct SitemapArgs {
    /// Root directory of the built site
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Base URL the site is served from
    #[arg(long)]
    base_url: String,

    /// Output path for the XML sitemap
    #[arg(long, default_value = "sitemap.xml")]
    output: PathBuf,

    /// Also write a plain-text URL list next to the XML sitemap
    #[arg(long)]
    txt: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("scholarsync=debug")
            .init();
    }

    match args.command {
        Command::Update(update) => run_update(update).await,
        Command::Sitemap(sm) => run_sitemap(sm),
    }
}

async fn run_update(args: UpdateArgs) -> ExitCode {
    let config = match Config::load(&args.keys) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    let toggles = SourceToggles {
        use_github: !args.no_github,
        use_scholar: !args.no_scholar,
        use_scopus: !args.no_scopus,
        use_wos: !args.no_wos,
        use_orcid: !args.no_orcid,
    };

    println!(
        "Updating {} ...",
        args.output.display().to_string().cyan()
    );

    let pipeline = Pipeline::new(&config, &toggles);
    let new_dataset = pipeline.run().await;

    let old_dataset = dataset::load_previous(&args.output);
    let change = report::diff(old_dataset.as_ref(), &new_dataset);
    change.print();

    if args.dry_run {
        println!("{}", "Dry run: dataset not written.".yellow());
        return ExitCode::SUCCESS;
    }

    match dataset::write_atomic(&new_dataset, &args.output) {
        Ok(()) => {
            println!(
                "{} Dataset written to {}",
                "✓".green(),
                args.output.display()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!(
                "{} Failed to write dataset, previous file left intact: {}",
                "Error:".red().bold(),
                e
            );
            ExitCode::FAILURE
        }
    }
}

fn run_sitemap(args: SitemapArgs) -> ExitCode {
    let pages = match sitemap::collect_pages(&args.root, &args.base_url) {
        Ok(pages) => pages,
        Err(e) => {
            eprintln!("{} Failed to crawl site: {}", "Error:".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    if pages.is_empty() {
        println!("{}", "No HTML pages found.".yellow());
        return ExitCode::SUCCESS;
    }

    if let Err(e) = sitemap::write_sitemap(&pages, &args.output) {
        eprintln!("{} Failed to write sitemap: {}", "Error:".red().bold(), e);
        return ExitCode::FAILURE;
    }

    if args.txt {
        let txt_path = args.output.with_extension("txt");
        if let Err(e) = sitemap::write_url_list(&pages, &txt_path) {
            eprintln!("{} Failed to write URL list: {}", "Error:".red().bold(), e);
            return ExitCode::FAILURE;
        }
    }

    println!(
        "{} Sitemap with {} URLs written to {}",
        "✓".green(),
        pages.len(),
        args.output.display()
    );
    ExitCode::SUCCESS
}
