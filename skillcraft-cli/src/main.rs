//! # Skillcraft CLI
//!
//! Command-line interface for planning goals and running plans.
//!
//! Usage:
//!   skillcraft plan <goal> [--save <name>]
//!   skillcraft run <goal>
//!   skillcraft exec <name|file.json> [--step]
//!   skillcraft functions
//!   skillcraft plans
//!
//! Examples:
//!   skillcraft plan "create a file called notes.txt" --save notes
//!   skillcraft exec notes --step
//!   skillcraft -vv run "what year is it?"

use clap::{Parser, Subcommand};
use skillcraft_core::{
    create_provider, CancellationToken, ExecutionContext, FunctionRegistry, LlmProvider, Plan,
    PlanStore, ProviderConfig, Result, SkillCollection,
};
use skillcraft_planner::{prompt, ActionPlanner, ActionPlannerConfig, Planner};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "skillcraft")]
#[command(author, version, about = "Skillcraft - turn goals into runnable skill plans")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory where plans are saved
    #[arg(long, global = true, default_value = ".skillcraft/plans")]
    store: PathBuf,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask the model for a plan and print it as JSON
    Plan {
        /// The goal to plan for
        #[arg(trailing_var_arg = true, required = true)]
        goal: Vec<String>,

        /// Save the plan under this name
        #[arg(short, long)]
        save: Option<String>,
    },
    /// Plan a goal and run the plan right away
    Run {
        /// The goal to plan for
        #[arg(trailing_var_arg = true, required = true)]
        goal: Vec<String>,
    },
    /// Run a saved plan (by name) or a plan JSON file
    Exec {
        /// Saved plan name or path to a plan JSON file
        plan: String,

        /// Run a single step and save the progress
        #[arg(long)]
        step: bool,

        /// Initial input for the plan
        #[arg(short, long)]
        input: Option<String>,
    },
    /// List the functions the planner can choose from
    Functions {
        /// Print the catalog as JSON
        #[arg(long)]
        json: bool,
    },
    /// List saved plans
    Plans,
}

fn truncate(s: &str, max_len: usize) -> String {
    match s.char_indices().nth(max_len) {
        Some((at, _)) => format!("{}…", &s[..at]),
        None => s.to_string(),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_target(verbose >= 2)
        .with_writer(std::io::stderr)
        .init();
}

fn registry() -> Arc<SkillCollection> {
    Arc::new(SkillCollection::with_core_skills())
}

fn provider() -> Result<Arc<dyn LlmProvider>> {
    let config = ProviderConfig::from_env()?;
    debug!(provider = config.provider_type.as_str(), "using completion provider");
    create_provider(config)
}

/// Cancel the token on Ctrl-C; the running plan stops before its next step
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, stopping before the next step");
            cancel.cancel();
        }
    });
    token
}

fn print_outcome(plan: &Plan, context: &ExecutionContext) {
    println!("{}", context.result());

    if plan.state().is_empty() {
        return;
    }
    eprintln!("\n=== STATE ===");
    for (key, value) in plan.state().iter() {
        eprintln!("  {}: {}", key, truncate(value, 80));
    }
    eprintln!(
        "=== {}/{} STEPS DONE ===",
        plan.next_step_index(),
        plan.steps().len()
    );
}

async fn plan_goal(goal: &str, save: Option<&str>, store_dir: &Path) -> Result<()> {
    let functions = registry();
    let planner = ActionPlanner::new(functions, provider()?);
    let plan = planner.create_plan(goal).await?;

    if let Some(rationale) = plan.rationale() {
        eprintln!("Rationale: {}", rationale);
    }
    println!("{}", plan.to_json_pretty()?);

    if let Some(name) = save {
        let mut store = PlanStore::file(store_dir)?;
        store.save(name, &plan)?;
        eprintln!("Saved plan '{}'", name);
    }
    Ok(())
}

async fn run_goal(goal: &str) -> Result<()> {
    let functions = registry();
    let provider = provider()?;
    let planner = ActionPlanner::new(functions.clone(), provider.clone());

    let mut plan = planner.create_plan(goal).await?;
    if plan.steps().is_empty() {
        eprintln!("No function matches this goal.");
        if let Some(rationale) = plan.rationale() {
            eprintln!("Rationale: {}", rationale);
        }
        return Ok(());
    }

    let mut context = ExecutionContext::new(functions)
        .with_completion(provider)
        .with_cancellation(cancel_on_ctrl_c());
    plan.invoke(&mut context).await?;
    print_outcome(&plan, &context);
    Ok(())
}

enum PlanSource {
    File(PathBuf),
    Stored(String),
}

async fn exec_plan(target: &str, step: bool, input: Option<String>, store_dir: &Path) -> Result<()> {
    let functions = registry();
    let path = Path::new(target);

    let (mut plan, source) = if path.is_file() {
        let json = tokio::fs::read_to_string(path).await?;
        let plan = Plan::from_json(&json, Some(functions.as_ref() as &dyn FunctionRegistry))?;
        (plan, PlanSource::File(path.to_path_buf()))
    } else {
        let store = PlanStore::file(store_dir)?;
        let plan = store.load(target, Some(functions.as_ref() as &dyn FunctionRegistry))?;
        (plan, PlanSource::Stored(target.to_string()))
    };

    let unbound = plan.unbound_steps();
    if !unbound.is_empty() {
        eprintln!("Warning: unknown functions: {}", unbound.join(", "));
    }
    if plan.steps().is_empty() && !plan.is_leaf() {
        eprintln!("Plan has no steps.");
        return Ok(());
    }
    if !plan.has_next_step() && !plan.is_leaf() {
        eprintln!("Plan already complete.");
        return Ok(());
    }

    let mut context = ExecutionContext::new(functions).with_cancellation(cancel_on_ctrl_c());
    match provider() {
        Ok(provider) => context = context.with_completion(provider),
        Err(e) => debug!(error = %e, "no completion provider, semantic steps will fail"),
    }
    if let Some(input) = input {
        context.variables_mut().update(input);
    }

    if step {
        let variables = context.variables().clone();
        plan.run_next_step(&context, variables).await?;
        eprintln!(
            "Step {}/{} done: {}",
            plan.next_step_index(),
            plan.steps().len(),
            truncate(plan.state().input(), 80)
        );

        match source {
            PlanSource::File(path) => tokio::fs::write(&path, plan.to_json_pretty()?).await?,
            PlanSource::Stored(name) => PlanStore::file(store_dir)?.save(&name, &plan)?,
        }
        return Ok(());
    }

    plan.invoke(&mut context).await?;
    print_outcome(&plan, &context);
    Ok(())
}

fn list_functions(json: bool) -> Result<()> {
    let view = registry().list_all();
    if json {
        let out = serde_json::to_string_pretty(&view).map_err(|e| {
            skillcraft_core::Error::serialization_failed("failed to encode function catalog").set_source(e)
        })?;
        println!("{}", out);
    } else {
        println!("{}", prompt::function_catalog(&view, &ActionPlannerConfig::default()));
    }
    Ok(())
}

fn list_plans(store_dir: &Path) -> Result<()> {
    let store = PlanStore::file(store_dir)?;
    let names = store.list();
    if names.is_empty() {
        println!("No saved plans in {}", store_dir.display());
        return Ok(());
    }
    println!("Saved plans:");
    for name in names {
        println!("  {}", name);
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Plan { goal, save } => plan_goal(&goal.join(" "), save.as_deref(), &cli.store).await,
        Commands::Run { goal } => run_goal(&goal.join(" ")).await,
        Commands::Exec { plan, step, input } => exec_plan(&plan, step, input, &cli.store).await,
        Commands::Functions { json } => list_functions(json),
        Commands::Plans => list_plans(&cli.store),
    };

    if let Err(e) = result {
        error!(error = ?e, "command failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
