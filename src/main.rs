use crate::options::{Args, Page, Subcommands};
use anyhow::Context;
use clap::Parser;
use shoptool::report::{self, DashboardState};
use shoptool::view::Event;
use std::path::PathBuf;

mod options {
    use shoptool::aggregate::Dimension;
    use std::path::PathBuf;

    #[derive(Debug, clap::Parser)]
    #[clap(name = "shoptool", about = "Aggregate, rank and compare e-commerce order exports")]
    pub struct Args {
        /// Print debug information about rows read, excluded and aggregated.
        #[clap(long, short = 'v', global = true)]
        pub verbose: bool,
        /// The delimiter used in the CSV input files.
        #[clap(long, short = 'd', default_value = ",", global = true)]
        pub delimiter: char,
        #[clap(subcommand)]
        pub cmd: Subcommands,
    }

    #[derive(Debug, clap::Subcommand)]
    pub enum Subcommands {
        /// Print the key figures of all orders and how the last complete month compares to the one before.
        Summary {
            /// One or more CSV exports with a header line.
            #[clap(required = true)]
            csv_file: Vec<PathBuf>,
        },
        /// Write revenue, review, delivery, freight and cancellation figures per group as CSV.
        Rollup {
            /// One of state, payment-type, category, category-english, status or month.
            #[clap(long, short = 'g', default_value = "state")]
            group_by: Dimension,
            /// The metric to order groups by, like revenue, review, delivery, freight, cancel_rate or count.
            #[clap(long, short = 's')]
            sort: Option<String>,
            /// Sort from smallest to largest instead.
            #[clap(long, requires = "sort")]
            ascending: bool,
            /// Only write this many groups.
            #[clap(long, short = 'n')]
            top: Option<usize>,
            #[clap(required = true)]
            csv_file: Vec<PathBuf>,
        },
        /// Write the chart series of dashboard pages as CSV to stdout and their notes to stderr.
        Report {
            /// Only compute this page. Without it, all pages are computed.
            #[clap(long, value_enum)]
            view: Option<Page>,
            /// Only use records with this key, like `SP` on the regional page.
            #[clap(long, short = 'f', requires = "view")]
            filter: Option<String>,
            /// Emphasize the group with this key.
            #[clap(long, requires = "view")]
            highlight: Option<String>,
            #[clap(required = true)]
            csv_file: Vec<PathBuf>,
        },
        /// Run the pipelines described in a RON file and write each result as CSV.
        Run {
            /// A RON file with an `Engine` of pipelines.
            #[clap(long, short = 'p')]
            pipelines: PathBuf,
            #[clap(required = true)]
            csv_file: Vec<PathBuf>,
        },
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
    pub enum Page {
        Regional,
        Payments,
        Categories,
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logger(args.verbose);
    let options = shoptool::record::Options {
        delimiter: args.delimiter,
    };
    let mut out = std::io::BufWriter::new(std::io::stdout());
    match args.cmd {
        Subcommands::Summary { csv_file } => {
            use std::io::Write;
            let records = load(csv_file, options)?;
            let kpis = shoptool::overall(&records);
            for line in report::kpi_notes(&kpis) {
                writeln!(out, "{line}")?;
            }
            match shoptool::trend(&records) {
                Ok(trend) => {
                    for line in report::trend_notes(&trend) {
                        writeln!(out, "{line}")?;
                    }
                }
                Err(err) => writeln!(out, "No trend: {err}")?,
            }
        }
        Subcommands::Rollup {
            group_by,
            sort,
            ascending,
            top,
            csv_file,
        } => {
            let records = load(csv_file, options)?;
            let pipeline = shoptool::pipeline::Pipeline {
                name: "rollup".into(),
                group_by,
                metrics: shoptool::aggregate::summary_metrics(),
                sort: sort.map(|metric| shoptool::view::SortSpec {
                    metric,
                    direction: if ascending {
                        shoptool::rank::Direction::Ascending
                    } else {
                        shoptool::rank::Direction::Descending
                    },
                }),
                limit: top,
            };
            pipeline.run(&records)?.write_csv(out)?;
        }
        Subcommands::Report {
            view,
            filter,
            highlight,
            csv_file,
        } => {
            let records = load(csv_file, options)?;
            let mut state = DashboardState::default();
            if let Some(page) = view {
                let page_state = match page {
                    Page::Regional => &mut state.regional,
                    Page::Payments => &mut state.payments,
                    Page::Categories => &mut state.categories,
                };
                let mut updated = page_state.clone().apply(Event::Filter(filter));
                if let Some(key) = highlight {
                    updated = updated.apply(Event::Toggle(key));
                }
                *page_state = updated;
            }

            let mut consumer = shoptool::series::CsvConsumer::new(out, std::io::stderr())?;
            let pages = match view {
                None => vec![
                    report::regional(&records, &state.regional),
                    report::payments(&records, &state.payments),
                    report::categories(&records, &state.categories),
                ],
                Some(Page::Regional) => vec![report::regional(&records, &state.regional)],
                Some(Page::Payments) => vec![report::payments(&records, &state.payments)],
                Some(Page::Categories) => vec![report::categories(&records, &state.categories)],
            };
            for page in pages {
                match page {
                    Ok(page) => page.emit(&mut consumer)?,
                    Err(err) => log::warn!("{err}"),
                }
            }
            consumer.flush()?;
        }
        Subcommands::Run {
            pipelines,
            csv_file,
        } => {
            use std::io::Write;
            let records = load(csv_file, options)?;
            let engine = shoptool::pipeline::Engine::from_path(&pipelines).with_context(|| {
                format!(
                    "Could not load pipelines from '{}'",
                    pipelines.display()
                )
            })?;
            for (name, table) in engine.run(&records) {
                match table {
                    Ok(table) => {
                        writeln!(out, "# {name}")?;
                        table.write_csv(&mut out)?;
                    }
                    Err(err) => log::warn!("Pipeline '{name}' failed: {err}"),
                }
            }
        }
    };
    Ok(())
}

fn init_logger(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.format_timestamp(None).format_target(false).init();
}

fn load(
    file_paths: Vec<PathBuf>,
    options: shoptool::record::Options,
) -> anyhow::Result<Vec<shoptool::record::Record>> {
    let raw = shoptool::read(into_read(file_paths)?, options)?;
    Ok(shoptool::normalize(raw))
}

fn into_read(file_paths: Vec<PathBuf>) -> anyhow::Result<impl Iterator<Item = impl std::io::Read>> {
    Ok(file_paths
        .iter()
        .map(|p| {
            std::fs::read(p)
                .with_context(|| format!("Could not read from CSV file at '{}'", p.display()))
        })
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(std::io::Cursor::new))
}
