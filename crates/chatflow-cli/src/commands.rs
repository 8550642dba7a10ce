//! Subcommand implementations

use anyhow::{Context, Result};
use chatflow_enhance::{
    AlignmentOracle, ChatflowConfig, ConfigError, EnhanceError, EnhancedModelView, Enhancer, EventLog,
    LabelMatchOracle, LogError, LogStatistics, PassReport, PrecomputedOracle,
};
use chatflow_graph::{ActivityIdentity, ConstructionError, ConversationGraph, NameMap};
use chatflow_process::{compile as compile_dfg, name_map_for, Dfg, ModelSynthesizer, SynthesisError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

fn open(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    Ok(BufReader::new(file))
}

fn read_graph(path: &Path) -> Result<ConversationGraph> {
    ConversationGraph::from_reader(open(path)?).with_context(|| format!("invalid bot model {}", path.display()))
}

fn read_log(path: &Path) -> Result<EventLog> {
    EventLog::from_json_reader(open(path)?).with_context(|| format!("invalid event log {}", path.display()))
}

/// Malformed per-activity confidence input
#[derive(Debug, thiserror::Error)]
pub(crate) enum ConfidenceError {
    #[error("invalid confidence json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("confidence {value} of activity '{activity}' is outside [0, 1]")]
    OutOfRange { activity: String, value: f64 },
}

/// Activity name to mean intent-recognition confidence
fn parse_confidence(reader: impl Read) -> Result<BTreeMap<String, f64>, ConfidenceError> {
    let confidence: BTreeMap<String, f64> = serde_json::from_reader(reader)?;
    if let Some((activity, &value)) = confidence.iter().find(|(_, v)| !(0.0..=1.0).contains(*v)) {
        return Err(ConfidenceError::OutOfRange {
            activity: activity.clone(),
            value,
        });
    }
    Ok(confidence)
}

fn read_confidence(path: &Path) -> Result<BTreeMap<String, f64>> {
    parse_confidence(open(path)?).with_context(|| format!("invalid confidence map {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value).context("cannot encode output")?;
    writeln!(stdout).context("cannot write output")?;
    Ok(())
}

/// Exit status: 2 for malformed input, 1 for everything else
pub(crate) fn exit_code(err: &anyhow::Error) -> u8 {
    let user_error = err.chain().any(|cause| {
        cause.is::<ConstructionError>()
            || cause.is::<SynthesisError>()
            || cause.is::<LogError>()
            || cause.is::<ConfigError>()
            || cause.is::<ConfidenceError>()
            || cause
                .downcast_ref::<EnhanceError>()
                .is_some_and(EnhanceError::is_user_error)
    });
    if user_error {
        2
    } else {
        1
    }
}

pub(crate) fn compile(model: &Path) -> Result<()> {
    let graph = read_graph(model)?;
    let identity = ActivityIdentity::resolve(&graph);
    let dfg = compile_dfg(&graph);
    let names = name_map_for(&dfg, &identity);

    #[derive(Serialize)]
    struct Output<'a> {
        bot: &'a str,
        dfg: &'a Dfg,
        names: &'a NameMap,
    }
    print_json(&Output {
        bot: graph.bot_name(),
        dfg: &dfg,
        names: &names,
    })
}

pub(crate) fn net(model: &Path, reduce: bool) -> Result<()> {
    let graph = read_graph(model)?;
    let identity = ActivityIdentity::resolve(&graph);
    let dfg = compile_dfg(&graph);
    let names = name_map_for(&dfg, &identity);
    let process = ModelSynthesizer::new()
        .with_reduction(reduce)
        .synthesize(&dfg, &names)
        .with_context(|| format!("cannot synthesize a process model for {}", graph.bot_name()))?;
    print_json(&process)
}

pub(crate) struct EnhanceInputs<'a> {
    pub(crate) model: &'a Path,
    pub(crate) log: &'a Path,
    pub(crate) alignments: Option<&'a Path>,
    pub(crate) config: Option<&'a Path>,
    pub(crate) confidence: Option<&'a Path>,
}

pub(crate) fn enhance(inputs: &EnhanceInputs<'_>) -> Result<()> {
    let config = match inputs.config {
        Some(path) => ChatflowConfig::load(path).context("cannot load configuration")?,
        None => ChatflowConfig::default(),
    };
    let confidence = match inputs.confidence {
        Some(path) => read_confidence(path)?,
        None => BTreeMap::new(),
    };
    let cache = config.cache.build();

    let graph = read_graph(inputs.model)?;
    let identity = cache.get_or_resolve(&graph);
    let log = read_log(inputs.log)?.for_analysis();

    let oracle: Box<dyn AlignmentOracle> = match inputs.alignments {
        Some(path) => {
            let oracle = PrecomputedOracle::from_json_reader(open(path)?)
                .with_context(|| format!("invalid alignments {}", path.display()))?;
            tracing::info!(traces = oracle.len(), "loaded precomputed alignments");
            Box::new(oracle)
        }
        None => {
            tracing::info!("no alignments given, aligning by activity label");
            Box::new(LabelMatchOracle)
        }
    };

    let mut enhancer = Enhancer::from_graph(&graph, &identity, oracle).with_config(config.enhancer);
    let passes = [
        ("frequency", enhancer.add_edge_frequency(&log).context("frequency pass failed")?),
        ("performance", enhancer.add_edge_performance(&log).context("performance pass failed")?),
        (
            "service subprocesses",
            enhancer
                .discover_service_subprocesses(&log)
                .context("service subprocess pass failed")?,
        ),
    ];
    report_partial(&passes);

    let (dfg, names, performance) = enhancer.into_parts();
    let view = EnhancedModelView::build(&dfg, &names, &performance, &confidence);
    print_json(&view)
}

fn report_partial(passes: &[(&str, PassReport)]) {
    for (pass, report) in passes {
        if report.is_partial() {
            tracing::warn!(
                pass,
                skipped = report.skipped.len(),
                aligned = report.variants_aligned,
                "pass ran on a partial log"
            );
        }
    }
}

pub(crate) fn stats(log: &Path, cases: bool) -> Result<()> {
    let log = read_log(log)?.for_analysis();
    if cases {
        print_json(&log.case_summaries())
    } else {
        print_json(&LogStatistics::compute(&log))
    }
}
