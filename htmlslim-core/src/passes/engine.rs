use super::*;
use crate::classifier::TableClassifier;
use crate::config::CleaningConfig;
use crate::dom::Tree;
use crate::error::CleanResult;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// What a single pass did to the tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassOutcome {
    /// Nodes removed, unwrapped or modified
    pub changes: usize,
    /// Full scans performed; 1 for single-sweep passes
    pub iterations: usize,
}

impl PassOutcome {
    pub fn single_sweep(changes: usize) -> Self {
        Self {
            changes,
            iterations: 1,
        }
    }
}

/// One tree rewrite step
pub trait CleanPass: Send + Sync {
    fn name(&self) -> &str;

    fn apply(&self, tree: &mut Tree) -> CleanResult<PassOutcome>;
}

/// Repeat `sweep` until it reports zero changes or `max_iterations` scans
/// have run. Hitting the cap is logged, not an error.
pub fn run_to_fixed_point<F>(
    tree: &mut Tree,
    pass_name: &str,
    max_iterations: usize,
    mut sweep: F,
) -> PassOutcome
where
    F: FnMut(&mut Tree) -> usize,
{
    let mut outcome = PassOutcome::default();
    loop {
        let changes = sweep(tree);
        outcome.iterations += 1;
        outcome.changes += changes;
        if changes == 0 {
            break;
        }
        if outcome.iterations >= max_iterations {
            warn!(
                pass = pass_name,
                iterations = outcome.iterations,
                "iteration cap reached before fixed point"
            );
            break;
        }
    }
    outcome
}

/// Instantiate a pass by its pipeline name
pub fn build_pass(name: &str, config: &CleaningConfig) -> Option<Box<dyn CleanPass>> {
    let pass: Box<dyn CleanPass> = match name {
        STRIP_NOISE => Box::new(StripNoisePass::new(config.noise_tags.clone())),
        STRIP_COMMENTS => Box::new(StripCommentsPass),
        UNWRAP_WRAPPER_TABLES => Box::new(UnwrapWrapperTablesPass::new(TableClassifier::new(
            config.table_heuristics.clone(),
        ))),
        STRIP_HREF => Box::new(StripHrefPass),
        STRIP_ATTRIBUTES => Box::new(StripAttributesPass::new(
            config.preserved_attributes.clone(),
        )),
        COLLAPSE_WRAPPERS => Box::new(CollapseWrappersPass::new(
            config.preserve_table_structure,
            config.max_iterations,
        )),
        PRUNE_EMPTY => Box::new(PruneEmptyPass::new(
            config.preserve_table_structure,
            config.max_iterations,
        )),
        _ => return None,
    };
    Some(pass)
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PassStats {
    pub name: String,
    pub changes: usize,
    pub iterations: usize,
    pub duration: Duration,
}

/// Per-pass totals over all rounds of one pipeline run
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineReport {
    pub passes: Vec<PassStats>,
    /// Full pipeline rounds executed
    pub rounds: usize,
    /// False when the round cap stopped a still-changing pipeline
    pub converged: bool,
    pub wrapper_tables_removed: usize,
}

impl PipelineReport {
    pub fn total_changes(&self) -> usize {
        self.passes.iter().map(|pass| pass.changes).sum()
    }

    pub fn total_duration(&self) -> Duration {
        self.passes.iter().map(|pass| pass.duration).sum()
    }

    pub fn pass(&self, name: &str) -> Option<&PassStats> {
        self.passes.iter().find(|pass| pass.name == name)
    }

    /// Fold a later run of the same engine into this report
    pub fn absorb(&mut self, later: PipelineReport) {
        for stats in later.passes {
            match self.passes.iter_mut().find(|pass| pass.name == stats.name) {
                Some(existing) => {
                    existing.changes += stats.changes;
                    existing.iterations += stats.iterations;
                    existing.duration += stats.duration;
                }
                None => self.passes.push(stats),
            }
        }
        self.rounds += later.rounds;
        self.converged = later.converged;
        self.wrapper_tables_removed += later.wrapper_tables_removed;
    }
}

pub struct PassEngine {
    passes: Vec<Box<dyn CleanPass>>,
    converge: bool,
    max_rounds: usize,
}

impl PassEngine {
    pub fn new(config: &CleaningConfig) -> Self {
        let mut passes = Vec::new();
        for pass_config in &config.pipeline.passes {
            if !pass_config.enabled {
                debug!(pass = %pass_config.name, "skipping disabled pass");
                continue;
            }
            if pass_config.name == STRIP_ATTRIBUTES && config.keep_attr {
                debug!("keep_attr set, skipping {STRIP_ATTRIBUTES}");
                continue;
            }
            match build_pass(&pass_config.name, config) {
                Some(pass) => passes.push(pass),
                None => warn!(pass = %pass_config.name, "unknown pass, skipping"),
            }
        }

        Self {
            passes,
            converge: config.converge,
            max_rounds: config.max_iterations,
        }
    }

    /// Build an engine from explicit passes, in order
    pub fn with_passes(passes: Vec<Box<dyn CleanPass>>, converge: bool, max_rounds: usize) -> Self {
        Self {
            passes,
            converge,
            max_rounds,
        }
    }

    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(|pass| pass.name()).collect()
    }

    /// Run every pass in order. With `converge`, whole rounds repeat until
    /// one changes nothing.
    pub fn run(&self, tree: &mut Tree) -> CleanResult<PipelineReport> {
        let mut report = PipelineReport {
            passes: self
                .passes
                .iter()
                .map(|pass| PassStats {
                    name: pass.name().to_string(),
                    ..PassStats::default()
                })
                .collect(),
            ..PipelineReport::default()
        };

        loop {
            report.rounds += 1;
            let mut round_changes = 0;

            for (pass, stats) in self.passes.iter().zip(report.passes.iter_mut()) {
                let start = Instant::now();
                let outcome = pass.apply(tree)?;
                let elapsed = start.elapsed();

                debug!(
                    pass = pass.name(),
                    round = report.rounds,
                    changes = outcome.changes,
                    iterations = outcome.iterations,
                    "pass finished"
                );
                stats.changes += outcome.changes;
                stats.iterations += outcome.iterations;
                stats.duration += elapsed;
                if pass.name() == UNWRAP_WRAPPER_TABLES {
                    report.wrapper_tables_removed += outcome.changes;
                }
                round_changes += outcome.changes;
            }

            if round_changes == 0 || !self.converge {
                report.converged = round_changes == 0;
                break;
            }
            if report.rounds >= self.max_rounds {
                warn!(rounds = report.rounds, "pipeline still changing at round cap");
                break;
            }
        }

        Ok(report)
    }
}
