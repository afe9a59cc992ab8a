// ABOUTME: Command implementations for the recognizer CLI
// ABOUTME: Runs a workflow (streaming or collected) or checks that every job resolves

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use crate::engine::{ExecutorManager, RunSummary, TaskReturn};
use crate::parser::{JobSpec, Next, Workflow, WorkflowManager};
use crate::tasks::ExecutorRegistry;

/// Execute a workflow, printing each result when `verbose` is set.
pub async fn run_workflow(workflow: Workflow, await_all: bool, verbose: bool) -> Result<()> {
    let manager = ExecutorManager::new(WorkflowManager::from_workflow(workflow));

    let summary = if await_all {
        let summary = manager
            .await_run_all()
            .await
            .context("Workflow run failed")?;
        if verbose {
            summary.results.iter().for_each(print_result);
        }
        summary
    } else {
        let mut run = manager.run();
        while let Some(item) = run.next_result().await {
            let result = item.context("Workflow run failed")?;
            if verbose {
                print_result(&result);
            }
        }
        run.summary()
    };

    report(&summary, verbose);
    Ok(())
}

fn print_result(result: &TaskReturn) {
    println!("{}: {}", result.job, result.result);
}

fn report(summary: &RunSummary, verbose: bool) {
    info!(
        "Run {} finished in {} ms",
        summary.run_id,
        summary.duration().num_milliseconds()
    );
    if verbose {
        println!("Jobs chain: {}", summary.work_chain.join(" -> "));
    }
}

/// Resolve every job and every name they reference without running anything.
pub fn check_workflow(workflow: Workflow) -> Result<()> {
    let mut manager = WorkflowManager::from_workflow(workflow);
    let begin = manager.get_begin().context("Workflow check failed")?;
    let jobs = manager.resolve_all().context("Workflow check failed")?;

    let problems = dangling_references(&manager, &jobs);
    if !problems.is_empty() {
        for problem in &problems {
            println!("✗ {}", problem);
        }
        anyhow::bail!("Workflow check failed with {} problem(s)", problems.len());
    }

    let registry = ExecutorRegistry::global();
    for job in unsupported(&registry, &jobs) {
        warn!(
            "Job '{}' has type {} with no registered executor",
            job.name,
            job.job_type()
        );
    }

    println!("✓ Workflow is valid");
    println!("  Begin: {}", begin);
    println!("  Jobs: {}", jobs.len());
    Ok(())
}

fn referenced_names(job: &JobSpec) -> Vec<(&'static str, &str)> {
    let mut names: Vec<(&'static str, &str)> = Vec::new();
    match &job.next {
        Next::Name(name) => names.push(("next", name.as_str())),
        Next::Branch { success, failure } => {
            names.push(("next.success", success.as_str()));
            names.push(("next.failure", failure.as_str()));
        }
    }
    if let Some(exit) = job.limits.exit_target() {
        names.push(("limits.exit", exit));
    }
    if let Some(source) = job.use_job.as_deref() {
        names.push(("use", source));
    }
    names.extend(job.needs.iter().map(|n| ("needs", n.as_str())));
    names.extend(job.before.tasks.iter().map(|n| ("before.tasks", n.as_str())));
    let after = &job.after;
    for name in after.always.iter().chain(&after.success).chain(&after.failure) {
        names.push(("after", name.as_str()));
    }
    names.retain(|(_, name)| !name.is_empty());
    names
}

fn dangling_references(manager: &WorkflowManager, jobs: &[Arc<JobSpec>]) -> Vec<String> {
    jobs.iter()
        .flat_map(|job| {
            referenced_names(job)
                .into_iter()
                .filter(|(_, name)| !manager.contains(name))
                .map(|(field, name)| {
                    format!("Job '{}' {} names unknown job '{}'", job.name, field, name)
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

fn unsupported<'a>(
    registry: &ExecutorRegistry,
    jobs: &'a [Arc<JobSpec>],
) -> Vec<&'a Arc<JobSpec>> {
    jobs.iter()
        .filter(|job| !registry.supports(job.job_type()))
        .collect()
}
