//! crisk - concentration risk diagnosis from the command line.
//!
//! Thin glue over the cr-core library:
//! - `diagnose` runs evidence assembly, inference and optional what-if ranking
//! - `feedback` commits one learning update
//! - `params` shows the learned Beta parameters
//! - `check` validates configuration and builds both networks
//! - `map` exposes the continuous evidence mapping
//!
//! Payloads go to stdout; logs and errors go to stderr.

use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use cr_common::{Error, OutputFormat, Result, StructuredError};
use cr_core::config::{load_config, PathOverrides, ResolvedConfig};
use cr_core::diagnosis::{diagnose, Diagnosis, DiagnosisRequest};
use cr_core::evidence::{map_continuous, survival_probability};
use cr_core::exit_codes::ExitCode;
use cr_core::learning::LearningStore;
use cr_core::logging::{
    event_names, generate_run_id, get_host_id, init_logging, LogConfig, LogContext, LogFormat,
    LogLevel, Stage,
};
use cr_core::model::build_reference_network;
use cr_core::snapshot::NetworkCache;
use serde::Serialize;

/// Version of the JSON envelope printed on stdout.
const OUTPUT_SCHEMA_VERSION: &str = "1.0.0";

/// Concentration risk estimator
#[derive(Parser)]
#[command(name = "crisk")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Directory holding model.json and/or policy.json
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Path to model.json
    #[arg(long, global = true)]
    model: Option<PathBuf>,

    /// Path to policy.json
    #[arg(long, global = true)]
    policy: Option<PathBuf>,

    /// Path to the learning state file
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "json")]
    format: OutputFormat,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Log format on stderr (human, jsonl)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate the probability of a concentration drop
    Diagnose(DiagnoseArgs),

    /// Record whether the last diagnosis was correct
    Feedback(FeedbackArgs),

    /// Show the learned parameters
    Params,

    /// Validate configuration and build both networks
    Check,

    /// Map a continuous measurement to a boolean observation
    Map(MapArgs),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Diagnose(_) => "diagnose",
            Commands::Feedback(_) => "feedback",
            Commands::Params => "params",
            Commands::Check => "check",
            Commands::Map(_) => "map",
        }
    }
}

#[derive(Args, Debug)]
struct DiagnoseArgs {
    /// Observation as Name=true|false (repeatable)
    #[arg(long = "evidence", short = 'e', value_parser = parse_observation)]
    evidence: Vec<(String, bool)>,

    /// Continuous measurement as name=value (repeatable)
    #[arg(long = "measure", short = 'm', value_parser = parse_measurement, allow_hyphen_values = true)]
    measure: Vec<(String, f64)>,

    /// Read a JSON request body from a file ("-" for stdin)
    #[arg(long)]
    request: Option<PathBuf>,

    /// Use the configured tables instead of the learned network
    #[arg(long)]
    reference: bool,

    /// Rank improvement suggestions for observed factors
    #[arg(long)]
    what_if: bool,

    /// Query variable (defaults to the model target)
    #[arg(long)]
    target: Option<String>,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct FeedbackArgs {
    /// The diagnosis matched reality
    #[arg(long)]
    correct: bool,

    /// The diagnosis did not match reality
    #[arg(long)]
    incorrect: bool,
}

#[derive(Args, Debug)]
struct MapArgs {
    /// Measured value
    #[arg(long, allow_hyphen_values = true)]
    value: f64,

    /// Reference mean
    #[arg(long, allow_hyphen_values = true)]
    mean: f64,

    /// Reference standard deviation
    #[arg(long)]
    std: f64,
}

fn parse_observation(s: &str) -> std::result::Result<(String, bool), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected Name=true|false, got '{}'", s))?;
    let value = match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => true,
        "false" | "no" | "0" => false,
        other => return Err(format!("invalid state '{}' for {}", other, name)),
    };
    Ok((name.trim().to_string(), value))
}

fn parse_measurement(s: &str) -> std::result::Result<(String, f64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", s))?;
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid number '{}' for {}", value, name))?;
    Ok((name.trim().to_string(), value))
}

/// Stdout envelope shared by every command.
#[derive(Serialize)]
struct Envelope<T: Serialize> {
    schema_version: &'static str,
    run_id: String,
    generated_at: String,
    command: &'static str,
    #[serde(flatten)]
    payload: T,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            let code = if err.use_stderr() {
                ExitCode::ArgsError
            } else {
                ExitCode::Ok
            };
            std::process::exit(code.as_i32());
        }
    };

    let mut log_config = LogConfig::from_env(cli.global.log_level, cli.global.log_format);
    if cli.global.quiet {
        log_config.level = LogLevel::Error;
    }
    for _ in 0..cli.global.verbose {
        log_config.level = log_config.level.more_verbose();
    }
    init_logging(&log_config);

    let ctx = LogContext::new(generate_run_id(), get_host_id());
    let command = cli.command.name();
    cr_core::log_event!(
        ctx,
        DEBUG,
        event_names::RUN_STARTED,
        Stage::Init,
        "run started",
        command = command
    );

    let outcome = match &cli.command {
        Commands::Diagnose(args) => run_diagnose(&cli.global, &ctx, args),
        Commands::Feedback(args) => run_feedback(&cli.global, &ctx, args),
        Commands::Params => run_params(&cli.global, &ctx),
        Commands::Check => run_check(&cli.global, &ctx),
        Commands::Map(args) => run_map(&cli.global, &ctx, args),
    };

    let exit_code = match outcome {
        Ok(()) => ExitCode::Ok,
        Err(err) => output_error(&cli.global, &ctx, &err),
    };

    cr_core::log_event!(
        ctx,
        DEBUG,
        event_names::RUN_FINISHED,
        Stage::Init,
        "run finished",
        command = command,
        exit_code = exit_code.as_i32()
    );
    std::process::exit(exit_code.as_i32());
}

// ============================================================================
// Shared plumbing
// ============================================================================

fn load(global: &GlobalOpts, ctx: &LogContext) -> Result<ResolvedConfig> {
    let options = PathOverrides {
        config_dir: global.config_dir.clone(),
        model: global.model.clone(),
        policy: global.policy.clone(),
        state: global.state.clone(),
    };
    let config = match load_config(&options) {
        Ok(config) => config,
        Err(err) => {
            cr_core::log_event!(
                ctx,
                ERROR,
                event_names::CONFIG_ERROR,
                Stage::Init,
                "configuration rejected",
                error = %err
            );
            return Err(err.into());
        }
    };

    if config.paths.model.is_default() || config.paths.policy.is_default() {
        cr_core::log_event!(
            ctx,
            DEBUG,
            event_names::CONFIG_DEFAULT_USED,
            Stage::Init,
            "builtin defaults in use",
            model_source = %config.paths.model.source,
            policy_source = %config.paths.policy.source
        );
    }
    cr_core::log_event!(
        ctx,
        INFO,
        event_names::CONFIG_LOADED,
        Stage::Init,
        "configuration loaded",
        config_id = config.snapshot().short_id(),
        state = %config.paths.state.display()
    );
    Ok(config)
}

fn open_store(config: &ResolvedConfig) -> Result<LearningStore> {
    let prior = config.prior()?;
    LearningStore::open(&config.paths.state, prior)
}

fn emit<T: Serialize>(
    ctx: &LogContext,
    command: &'static str,
    payload: T,
    format: OutputFormat,
    md: impl FnOnce(&T) -> String,
    summary: impl FnOnce(&T) -> String,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let envelope = Envelope {
                schema_version: OUTPUT_SCHEMA_VERSION,
                run_id: ctx.run_id.clone(),
                generated_at: chrono::Utc::now().to_rfc3339(),
                command,
                payload,
            };
            println!("{}", serde_json::to_string_pretty(&envelope)?);
        }
        OutputFormat::Md => println!("{}", md(&payload)),
        OutputFormat::Summary => println!("[{}] {}: {}", ctx.run_id, command, summary(&payload)),
    }
    Ok(())
}

fn output_error(global: &GlobalOpts, ctx: &LogContext, err: &Error) -> ExitCode {
    let exit_code = ExitCode::from(err);
    cr_core::log_event!(
        ctx,
        WARN,
        event_names::INTERNAL_ERROR,
        Stage::Init,
        "command failed",
        code = err.code(),
        exit_code = exit_code.as_i32(),
        error = %err
    );

    match global.format {
        OutputFormat::Json => {
            let structured = StructuredError::from(err)
                .with_context("run_id", &ctx.run_id)
                .with_context("exit_code", exit_code.code_name());
            eprintln!("{}", structured.to_json());
        }
        OutputFormat::Md | OutputFormat::Summary => {
            let use_color = !global.no_color && std::io::stderr().is_terminal();
            eprintln!("{}", cr_common::error::format_error_human(err, use_color));
        }
    }
    exit_code
}

// ============================================================================
// diagnose
// ============================================================================

fn read_request(path: &Path) -> Result<DiagnosisRequest> {
    let raw = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(path)?
    };
    serde_json::from_str(&raw)
        .map_err(|e| Error::evidence(format!("invalid request body {}: {}", path.display(), e)))
}

fn build_request(args: &DiagnoseArgs) -> Result<DiagnosisRequest> {
    let mut request = match &args.request {
        Some(path) => read_request(path)?,
        None => DiagnosisRequest::default(),
    };
    for (name, value) in &args.evidence {
        if request.observations.insert(name.clone(), *value).is_some() {
            return Err(Error::evidence(format!("duplicate observation for '{}'", name)));
        }
    }
    for (name, value) in &args.measure {
        if request.measurements.insert(name.clone(), *value).is_some() {
            return Err(Error::evidence(format!("duplicate measurement '{}'", name)));
        }
    }
    request.what_if |= args.what_if;
    Ok(request)
}

fn run_diagnose(global: &GlobalOpts, ctx: &LogContext, args: &DiagnoseArgs) -> Result<()> {
    let config = load(global, ctx)?;
    let request = build_request(args)?;
    let target = args.target.as_deref().unwrap_or(&config.model.target);

    cr_core::log_event!(
        ctx,
        DEBUG,
        event_names::INFER_STARTED,
        Stage::Infer,
        "diagnosis started",
        observations = request.observations.len(),
        measurements = request.measurements.len(),
        reference = args.reference
    );

    let result = if args.reference {
        let network = build_reference_network(&config.model)?;
        diagnose(&network, &request, &config.policy, target)
    } else {
        let store = open_store(&config)?;
        let cache = NetworkCache::new(config.model.clone());
        let snapshot = cache.snapshot(&store)?;
        diagnose(&snapshot.network, &request, &config.policy, target)
            .map(|d| d.with_parameters(snapshot.params))
    };

    let diagnosis = match result {
        Ok(d) => d,
        Err(err) => {
            cr_core::log_event!(
                ctx,
                WARN,
                event_names::EVIDENCE_REJECTED,
                Stage::Evidence,
                "diagnosis rejected",
                error = %err
            );
            return Err(err);
        }
    };

    cr_core::log_event!(
        ctx,
        INFO,
        event_names::INFER_FINISHED,
        Stage::Infer,
        "diagnosis complete",
        risk_score = diagnosis.risk_score,
        risk_level = diagnosis.risk_level.as_str()
    );
    if let Some(suggestions) = &diagnosis.suggestions {
        cr_core::log_event!(
            ctx,
            DEBUG,
            event_names::EXPLAIN_FINISHED,
            Stage::Explain,
            "what-if ranking complete",
            suggestions = suggestions.len()
        );
    }

    emit(
        ctx,
        "diagnose",
        diagnosis,
        global.format,
        render_diagnosis_md,
        |d| format!("{} {:.4}", d.risk_level, d.risk_score),
    )
}

fn render_diagnosis_md(d: &Diagnosis) -> String {
    let mut out = String::new();
    out.push_str("# Concentration risk\n\n");
    out.push_str(&format!(
        "**{}**: P({}=Yes) = {:.4}\n\n",
        d.risk_level, d.target, d.risk_score
    ));
    out.push_str(&format!("{}\n", d.advice));

    if !d.evidence.is_empty() {
        out.push_str("\n## Evidence\n\n");
        for (name, state) in d.evidence.iter() {
            let label = if state == 1 { "yes" } else { "no" };
            out.push_str(&format!("- {}: {}\n", name, label));
        }
    }
    for m in &d.measurements {
        out.push_str(&format!(
            "- {} = {} -> {} (p = {:.3})\n",
            m.name, m.value, m.variable, m.probability
        ));
    }

    if let Some(suggestions) = &d.suggestions {
        out.push_str("\n## What if\n\n");
        if suggestions.is_empty() {
            out.push_str("No actionable factor lowers the risk.\n");
        }
        for (rank, s) in suggestions.iter().enumerate() {
            out.push_str(&format!(
                "{}. {} (-{:.1} points): {}\n",
                rank + 1,
                s.factor,
                s.reduction * 100.0,
                s.advice
            ));
        }
    }

    if let Some(params) = &d.parameters {
        out.push_str(&format!(
            "\nLearned parameters: alpha = {}, beta = {}\n",
            params.alpha, params.beta
        ));
    }
    out
}

// ============================================================================
// feedback / params
// ============================================================================

#[derive(Serialize)]
struct ParamsView {
    alpha: f64,
    beta: f64,
    mean: f64,
    variance: f64,
    state_path: String,
}

impl ParamsView {
    fn new(params: cr_math::BetaParams, store: &LearningStore) -> Self {
        ParamsView {
            alpha: params.alpha,
            beta: params.beta,
            mean: params.mean(),
            variance: params.variance(),
            state_path: store.path().display().to_string(),
        }
    }
}

fn render_params_md(p: &ParamsView) -> String {
    format!(
        "# Learned parameters\n\n- alpha: {}\n- beta: {}\n- mean: {:.4}\n- variance: {:.6}\n- state: {}\n",
        p.alpha, p.beta, p.mean, p.variance, p.state_path
    )
}

fn run_feedback(global: &GlobalOpts, ctx: &LogContext, args: &FeedbackArgs) -> Result<()> {
    let config = load(global, ctx)?;
    let store = open_store(&config)?;
    let is_correct = args.correct && !args.incorrect;

    let params = match store.update(is_correct) {
        Ok(params) => params,
        Err(err) => {
            cr_core::log_event!(
                ctx,
                ERROR,
                event_names::PERSIST_FAILED,
                Stage::Persist,
                "learning update not committed",
                error = %err
            );
            return Err(err);
        }
    };
    cr_core::log_event!(
        ctx,
        INFO,
        event_names::LEARN_UPDATED,
        Stage::Learn,
        "feedback committed",
        correct = is_correct,
        alpha = params.alpha,
        beta = params.beta
    );

    emit(
        ctx,
        "feedback",
        ParamsView::new(params, &store),
        global.format,
        render_params_md,
        |p| format!("alpha={} beta={}", p.alpha, p.beta),
    )
}

fn run_params(global: &GlobalOpts, ctx: &LogContext) -> Result<()> {
    let config = load(global, ctx)?;
    let store = open_store(&config)?;
    emit(
        ctx,
        "params",
        ParamsView::new(store.params()?, &store),
        global.format,
        render_params_md,
        |p| format!("alpha={} beta={} mean={:.4}", p.alpha, p.beta, p.mean),
    )
}

// ============================================================================
// check
// ============================================================================

#[derive(Serialize)]
struct CheckReport {
    status: &'static str,
    config: cr_config::ConfigSnapshot,
    state_path: String,
    state_source: String,
    checks: Vec<CheckItem>,
}

#[derive(Serialize)]
struct CheckItem {
    check: &'static str,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl CheckItem {
    fn from_result<T>(check: &'static str, result: &Result<T>) -> Self {
        match result {
            Ok(_) => CheckItem {
                check,
                status: "ok",
                detail: None,
            },
            Err(err) => CheckItem {
                check,
                status: "error",
                detail: Some(err.to_string()),
            },
        }
    }
}

fn run_check(global: &GlobalOpts, ctx: &LogContext) -> Result<()> {
    let config = load(global, ctx)?;

    let reference = build_reference_network(&config.model);
    let store = open_store(&config);
    let learned = match &store {
        Ok(store) => NetworkCache::new(config.model.clone())
            .snapshot(store)
            .map(|_| ()),
        Err(_) => Ok(()),
    };

    let checks = vec![
        CheckItem {
            check: "config",
            status: "ok",
            detail: None,
        },
        CheckItem::from_result("reference_network", &reference),
        CheckItem::from_result("learning_state", &store),
        CheckItem::from_result("learned_network", &learned),
    ];
    let all_ok = checks.iter().all(|c| c.status == "ok");

    let report = CheckReport {
        status: if all_ok { "ok" } else { "error" },
        config: config.snapshot(),
        state_path: config.paths.state.display().to_string(),
        state_source: config.paths.state_source.to_string(),
        checks,
    };

    emit(
        ctx,
        "check",
        &report,
        global.format,
        |r| {
            let mut out = String::from("# crisk check\n\n");
            for c in &r.checks {
                let symbol = if c.status == "ok" { "✓" } else { "✗" };
                out.push_str(&format!("{} {}: {}\n", symbol, c.check, c.status));
                if let Some(detail) = &c.detail {
                    out.push_str(&format!("  Error: {}\n", detail));
                }
            }
            out.push_str(&format!("\nConfig: {}\n", r.config.short_id()));
            out
        },
        |r| format!("{} config={}", r.status.to_uppercase(), r.config.short_id()),
    )?;

    // First failure decides the exit code.
    reference?;
    store?;
    learned
}

// ============================================================================
// map
// ============================================================================

#[derive(Serialize)]
struct MapView {
    value: f64,
    mean: f64,
    std: f64,
    probability: f64,
    observed: bool,
}

fn run_map(global: &GlobalOpts, ctx: &LogContext, args: &MapArgs) -> Result<()> {
    let probability = survival_probability(args.value, args.mean, args.std)?;
    let observed = map_continuous(args.value, args.mean, args.std)?;
    cr_core::log_event!(
        ctx,
        DEBUG,
        event_names::EVIDENCE_RESOLVED,
        Stage::Evidence,
        "measurement mapped",
        probability = probability,
        observed = observed
    );

    emit(
        ctx,
        "map",
        MapView {
            value: args.value,
            mean: args.mean,
            std: args.std,
            probability,
            observed,
        },
        global.format,
        |m| {
            format!(
                "# Measurement mapping\n\nP(X > {}) = {:.4} -> {}\n",
                m.value,
                m.probability,
                if m.observed { "yes" } else { "no" }
            )
        },
        |m| format!("{} p={:.4}", if m.observed { "yes" } else { "no" }, m.probability),
    )
}
