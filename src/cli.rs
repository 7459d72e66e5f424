use clap::{ArgAction, Parser, ValueEnum};
use log::LevelFilter;

use crate::analyzer::{
    Analyzer, DedupFilter, ErrorSummary, IndentFormatter, MethodCallSummary, MethodIsolation,
    Probe, Target, Timeline, Timer, TokenFilter, Trender,
};
use crate::error::{Error, Result};
use crate::layout::DEFAULT_LAYOUT;
use crate::pipeline::PipelineConfig;

#[derive(Parser, Debug)]
#[clap(name = "ringcount")]
#[clap(about = "Reassembles layout-pattern logs and rebuilds call stacks from trace messages", long_about = None)]
#[clap(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
    /// Log files, directories or wildcard names (reads stdin when omitted)
    pub files: Vec<String>,

    /// Layout pattern the log was written with
    #[clap(short = 'p', long, default_value = DEFAULT_LAYOUT)]
    pub layout: String,

    /// Analyzer to run; repeat for several (default: join)
    #[clap(short, long = "analyzer", value_enum)]
    pub analyzers: Vec<AnalyzerKind>,

    /// Trend time slice in milliseconds
    #[clap(long, default_value = "3600000", value_parser = clap::value_parser!(i64).range(1..))]
    pub slice: i64,

    /// Class (category) of the method to isolate or summarize
    #[clap(long)]
    pub class: Option<String>,

    /// Method to isolate or summarize
    #[clap(long)]
    pub method: Option<String>,

    /// Token filter (format: TOKEN=REGEX)
    #[clap(long = "filter", short = 'f', number_of_values = 1)]
    pub filters: Vec<String>,

    /// Keep events the filters do NOT match
    #[clap(long)]
    pub exclude: bool,

    /// Truncate long events before analysis
    #[clap(long)]
    pub fast: bool,

    /// Characters kept per event in fast mode
    #[clap(long, default_value = "250")]
    pub fast_limit: usize,

    /// Do not move out-of-order timestamps forward by 12 hours
    #[clap(long)]
    pub no_date_correction: bool,

    /// Write output to a file instead of stdout
    #[clap(short, long)]
    pub out: Option<String>,

    /// Output summaries in JSON format
    #[clap(long)]
    pub json: bool,

    /// More diagnostics on stderr (-v, -vv, -vvv)
    #[clap(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnalyzerKind {
    /// Call durations per thread and method
    Timer,
    /// Method exits per time slice
    Trender,
    /// ERROR events and thrown exceptions with their call stacks
    Errors,
    /// Events inside calls to --method
    Isolate,
    /// Arguments, stack and exit of each call to --method
    Calls,
    /// Events matching the --filter expressions
    Filter,
    /// Drop consecutive duplicate events
    Dedup,
    /// Events indented by call depth
    Indent,
    /// Events sorted by timestamp
    Timeline,
    /// Parse the first few events and stop
    Probe,
    /// Echo every event, merged across files
    Join,
}

impl Args {
    fn selected(&self) -> &[AnalyzerKind] {
        if self.analyzers.is_empty() {
            &[AnalyzerKind::Join]
        } else {
            &self.analyzers
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        let selected = self.selected();
        PipelineConfig {
            layout: self.layout.clone(),
            correct_dates: !self.no_date_correction,
            fast_limit: self.fast.then_some(self.fast_limit),
            join: selected.contains(&AnalyzerKind::Join) || selected.contains(&AnalyzerKind::Probe),
            join_summary: self.json,
        }
    }

    pub fn build_analyzers(&self) -> Result<Vec<Box<dyn Analyzer>>> {
        let mut analyzers: Vec<Box<dyn Analyzer>> = Vec::new();
        for kind in self.selected() {
            let analyzer: Box<dyn Analyzer> = match kind {
                AnalyzerKind::Timer => Box::new(Timer::new()),
                AnalyzerKind::Trender => Box::new(Trender::new(self.slice)),
                AnalyzerKind::Errors => Box::new(ErrorSummary::new()),
                AnalyzerKind::Isolate => Box::new(MethodIsolation::new(self.target("isolate")?)),
                AnalyzerKind::Calls => Box::new(MethodCallSummary::new(self.target("calls")?)),
                AnalyzerKind::Filter => {
                    if self.filters.is_empty() {
                        return Err(Error::MissingOption {
                            analyzer: "filter",
                            option: "filter",
                        });
                    }
                    let filters = self
                        .filters
                        .iter()
                        .map(|spec| TokenFilter::parse_filter(spec))
                        .collect::<Result<Vec<_>>>()?;
                    Box::new(TokenFilter::new(filters, self.exclude))
                }
                AnalyzerKind::Dedup => Box::new(DedupFilter::new()),
                AnalyzerKind::Indent => Box::new(IndentFormatter::new()),
                AnalyzerKind::Timeline => Box::new(Timeline::new()),
                AnalyzerKind::Probe => Box::new(Probe::new()),
                AnalyzerKind::Join => continue,
            };
            analyzers.push(analyzer);
        }
        Ok(analyzers)
    }

    fn target(&self, analyzer: &'static str) -> Result<Target> {
        let method = self.method.clone().ok_or(Error::MissingOption {
            analyzer,
            option: "method",
        })?;
        Ok(Target::new(self.class.clone(), method))
    }
}
