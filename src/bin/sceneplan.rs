use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sceneplan::{
    GeminiConfig, ManimScriptRenderer, Renderer as _, SynthConfig, synthesize_with_gemini,
    validate_and_fill,
};

#[derive(Parser, Debug)]
#[command(name = "sceneplan", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Synthesize a scene plan for a request (requires `GEMINI_API_KEY`).
    Plan(PlanArgs),
    /// Validate and normalize a plan JSON file.
    Validate(ValidateArgs),
    /// Generate a Manim CE script from a plan JSON file.
    Script(ScriptArgs),
}

#[derive(Parser, Debug)]
struct PlanArgs {
    /// Request text; multiple words are joined with spaces.
    #[arg(required = true)]
    query: Vec<String>,

    /// Model id (legacy PaLM names map to the default Gemini model).
    #[arg(long)]
    model: Option<String>,

    /// Maximum number of attempts.
    #[arg(long)]
    attempts: Option<u32>,

    /// JSON config file; flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for the attempt log and saved plans.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Do not write the accepted plan to disk.
    #[arg(long)]
    no_save: bool,
}

#[derive(Parser, Debug)]
struct ValidateArgs {
    /// Input plan JSON.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Parser, Debug)]
struct ScriptArgs {
    /// Input plan JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output directory for the generated script.
    #[arg(long)]
    out_dir: PathBuf,
}

fn main() -> anyhow::Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Plan(args) => cmd_plan(args),
        Command::Validate(args) => cmd_validate(args),
        Command::Script(args) => cmd_script(args),
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sceneplan=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn read_json(path: &Path) -> anyhow::Result<serde_json::Value> {
    let f = File::open(path).with_context(|| format!("open plan '{}'", path.display()))?;
    let v = serde_json::from_reader(BufReader::new(f))
        .with_context(|| format!("parse plan JSON '{}'", path.display()))?;
    Ok(v)
}

fn load_config(args: &PlanArgs) -> anyhow::Result<SynthConfig> {
    let mut cfg = match &args.config {
        Some(path) => SynthConfig::from_json_file(path)?,
        None => SynthConfig::default(),
    };
    if let Some(model) = &args.model {
        cfg.model = model.clone();
    }
    if let Some(attempts) = args.attempts {
        cfg.max_attempts = attempts;
    }
    if let Some(dir) = &args.out_dir {
        cfg.output_dir = dir.clone();
    }
    if args.no_save {
        cfg.save_plans = false;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn cmd_plan(args: PlanArgs) -> anyhow::Result<ExitCode> {
    let cfg = load_config(&args)?;
    let request = args.query.join(" ");

    let out = synthesize_with_gemini(&request, cfg, GeminiConfig::from_env());
    if let Some(err) = &out.log.error {
        eprintln!("synthesis could not start: {err}");
    }
    println!("{}", serde_json::to_string_pretty(&out.plan_json())?);
    if let Some(path) = &out.log.saved_path {
        eprintln!("saved plan to {path}");
    }
    Ok(if out.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn cmd_validate(args: ValidateArgs) -> anyhow::Result<ExitCode> {
    let v = read_json(&args.in_path)?;
    let validation = validate_and_fill(v);
    let ok = validation.is_success();
    let report = serde_json::json!({
        "plan": validation.plan,
        "diagnostics": validation.diagnostics,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn cmd_script(args: ScriptArgs) -> anyhow::Result<ExitCode> {
    let v = read_json(&args.in_path)?;
    let plan = validate_and_fill(v)
        .into_plan()
        .with_context(|| format!("validate plan '{}'", args.in_path.display()))?;
    let path = ManimScriptRenderer::new(args.out_dir).render(&plan)?;
    println!("{}", path.display());
    Ok(ExitCode::SUCCESS)
}
