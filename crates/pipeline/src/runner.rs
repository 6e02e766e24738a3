//! Pipeline runners: sequential and level-parallel execution engines
//!
//! Both consume a sealed registry's orderings and stop at the first pass
//! failure. The parallel runner executes one level at a time; passes within a
//! level run as concurrent tasks against the mutex-guarded model.

use crate::error::PassFailure;
use crate::pass::{ModelHandle, Pass};
use crate::registry::PassRegistry;
use repoatlas_core::logging::ScopedLogger;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;

fn selected(filter: Option<&[String]>, name: &str) -> bool {
    match filter {
        Some(names) => names.iter().any(|n| n == name),
        None => true,
    }
}

async fn execute_one(
    pass: &Arc<dyn Pass>,
    model: &ModelHandle,
    logger: &ScopedLogger,
) -> Result<(), anyhow::Error> {
    logger.info(&format!("starting: {}", pass.description()));
    let started = Instant::now();
    match pass.execute(model, logger).await {
        Ok(()) => {
            logger.info(&format!(
                "complete in {}ms",
                started.elapsed().as_millis()
            ));
            Ok(())
        }
        Err(cause) => {
            logger.error(&format!("failed: {cause:#}"));
            Err(cause)
        }
    }
}

/// Runs every pass one after another in flat topological order.
pub struct SequentialRunner;

impl SequentialRunner {
    /// The optional `filter` restricts execution to the named passes; it is
    /// applied to the resolved order, not the dependency graph.
    pub async fn run(
        &self,
        registry: &PassRegistry,
        model: &ModelHandle,
        logger: &ScopedLogger,
        filter: Option<&[String]>,
    ) -> Result<(), PassFailure> {
        let passes: Vec<_> = registry
            .ordered()
            .into_iter()
            .filter(|pass| selected(filter, pass.name()))
            .collect();
        logger.info(&format!("{} passes planned", passes.len()));

        for pass in passes {
            let pass_logger = logger.child(pass.name());
            if let Err(cause) = execute_one(&pass, model, &pass_logger).await {
                return Err(PassFailure {
                    name: pass.name().to_string(),
                    cause,
                });
            }
        }

        logger.info("pipeline complete");
        Ok(())
    }
}

/// Runs each level's passes concurrently, waiting for the whole level before
/// advancing to the next.
///
/// On the first failure in a level the run rejects immediately and no later
/// level starts. Sibling passes in the failing level are not cancelled (there
/// is no preemption primitive), so they keep running detached and may still
/// mutate the model; the aborted run never consults their results. Callers
/// needing all-or-nothing semantics must use the sequential runner.
pub struct ParallelRunner;

impl ParallelRunner {
    pub async fn run(
        &self,
        registry: &PassRegistry,
        model: &ModelHandle,
        logger: &ScopedLogger,
        filter: Option<&[String]>,
    ) -> Result<(), PassFailure> {
        let levels: Vec<Vec<Arc<dyn Pass>>> = registry
            .levels()
            .into_iter()
            .map(|level| {
                level
                    .into_iter()
                    .filter(|pass| selected(filter, pass.name()))
                    .collect::<Vec<_>>()
            })
            .filter(|level| !level.is_empty())
            .collect();

        let planned: usize = levels.iter().map(Vec::len).sum();
        logger.info(&format!(
            "{} passes planned across {} levels",
            planned,
            levels.len()
        ));

        for (depth, level) in levels.into_iter().enumerate() {
            logger.debug(&format!("level {depth}: {} passes", level.len()));

            let mut tasks = JoinSet::new();
            let mut names: HashMap<tokio::task::Id, String> = HashMap::new();
            for pass in level {
                let model = Arc::clone(model);
                let pass_logger = logger.child(pass.name());
                let name = pass.name().to_string();
                let handle = tasks.spawn(async move {
                    execute_one(&pass, &model, &pass_logger).await
                });
                names.insert(handle.id(), name);
            }

            // Wait-all, reject on the first failure observed.
            while let Some(joined) = tasks.join_next_with_id().await {
                match joined {
                    Ok((_id, Ok(()))) => {}
                    Ok((id, Err(cause))) => {
                        // Siblings keep running in the background; they are
                        // detached, not aborted.
                        tasks.detach_all();
                        let name = names.remove(&id).unwrap_or_else(|| "unknown".to_string());
                        return Err(PassFailure { name, cause });
                    }
                    Err(join_error) => {
                        let name = names
                            .remove(&join_error.id())
                            .unwrap_or_else(|| "unknown".to_string());
                        tasks.detach_all();
                        return Err(PassFailure {
                            name,
                            cause: anyhow::Error::new(join_error),
                        });
                    }
                }
            }
        }

        logger.info("pipeline complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pass::model_handle;
    use crate::registry::RegistryBuilder;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use repoatlas_core::model::{Convention, WorkspaceModel};
    use std::time::Duration;
    use tokio::time::sleep;

    /// Test pass that records its own name into the model's conventions
    /// collection, optionally sleeping first or failing instead.
    struct ProbePass {
        name: &'static str,
        dependencies: &'static [&'static str],
        delay: Option<Duration>,
        fail: bool,
    }

    impl ProbePass {
        fn ok(name: &'static str, dependencies: &'static [&'static str]) -> Arc<dyn Pass> {
            Arc::new(Self {
                name,
                dependencies,
                delay: None,
                fail: false,
            })
        }

        fn slow(
            name: &'static str,
            dependencies: &'static [&'static str],
            delay: Duration,
        ) -> Arc<dyn Pass> {
            Arc::new(Self {
                name,
                dependencies,
                delay: Some(delay),
                fail: false,
            })
        }

        fn failing(name: &'static str, dependencies: &'static [&'static str]) -> Arc<dyn Pass> {
            Arc::new(Self {
                name,
                dependencies,
                delay: None,
                fail: true,
            })
        }
    }

    #[async_trait]
    impl Pass for ProbePass {
        fn name(&self) -> &'static str {
            self.name
        }

        fn description(&self) -> &'static str {
            "probe"
        }

        fn dependencies(&self) -> &[&'static str] {
            self.dependencies
        }

        async fn execute(&self, model: &ModelHandle, _logger: &ScopedLogger) -> Result<()> {
            if let Some(delay) = self.delay {
                sleep(delay).await;
            }
            if self.fail {
                return Err(anyhow!("probe failure"));
            }
            model.lock().await.conventions.push(Convention {
                repo: None,
                topic: "executed".to_string(),
                detail: self.name.to_string(),
            });
            Ok(())
        }
    }

    fn build(passes: Vec<Arc<dyn Pass>>) -> PassRegistry {
        let mut builder = RegistryBuilder::new();
        for pass in passes {
            builder.register(pass).unwrap();
        }
        builder.build().unwrap()
    }

    async fn executed(model: &ModelHandle) -> Vec<String> {
        model
            .lock()
            .await
            .conventions
            .iter()
            .map(|c| c.detail.clone())
            .collect()
    }

    fn logger() -> ScopedLogger {
        ScopedLogger::new("test")
    }

    #[tokio::test]
    async fn test_sequential_runs_in_dependency_order() {
        let registry = build(vec![
            ProbePass::ok("link", &["scan"]),
            ProbePass::ok("scan", &[]),
            ProbePass::ok("assemble", &["link"]),
        ]);
        let model = model_handle(WorkspaceModel::new("test"));

        SequentialRunner
            .run(&registry, &model, &logger(), None)
            .await
            .unwrap();

        assert_eq!(executed(&model).await, vec!["scan", "link", "assemble"]);
    }

    #[tokio::test]
    async fn test_sequential_stops_at_first_failure() {
        let registry = build(vec![
            ProbePass::ok("scan", &[]),
            ProbePass::failing("link", &["scan"]),
            ProbePass::ok("assemble", &["link"]),
        ]);
        let model = model_handle(WorkspaceModel::new("test"));

        let err = SequentialRunner
            .run(&registry, &model, &logger(), None)
            .await
            .unwrap_err();

        assert_eq!(err.name, "link");
        assert_eq!(executed(&model).await, vec!["scan"]);
    }

    #[tokio::test]
    async fn test_parallel_respects_level_barrier() {
        // "late" sits at level 0 but sleeps; "after" at level 1 must still
        // observe its write because the level waits for every member.
        let registry = build(vec![
            ProbePass::slow("late", &[], Duration::from_millis(50)),
            ProbePass::ok("early", &[]),
            ProbePass::ok("after", &["late", "early"]),
        ]);
        let model = model_handle(WorkspaceModel::new("test"));

        ParallelRunner
            .run(&registry, &model, &logger(), None)
            .await
            .unwrap();

        let order = executed(&model).await;
        assert_eq!(order.len(), 3);
        let pos = |name: &str| order.iter().position(|n| n == name).unwrap();
        assert!(pos("late") < pos("after"));
        assert!(pos("early") < pos("after"));
    }

    #[tokio::test]
    async fn test_parallel_failure_names_pass_and_blocks_next_level() {
        // Registry: a (no deps), b (dep a, fails), c (dep a). The run rejects
        // naming b; nothing past level 1 ever starts.
        let registry = build(vec![
            ProbePass::ok("a", &[]),
            ProbePass::failing("b", &["a"]),
            ProbePass::ok("c", &["a"]),
            ProbePass::ok("d", &["b", "c"]),
        ]);
        let model = model_handle(WorkspaceModel::new("test"));

        let err = ParallelRunner
            .run(&registry, &model, &logger(), None)
            .await
            .unwrap_err();

        assert_eq!(err.name, "b");
        let order = executed(&model).await;
        assert!(order.contains(&"a".to_string()));
        assert!(!order.contains(&"d".to_string()));
    }

    #[tokio::test]
    async fn test_parallel_failure_does_not_cancel_siblings() {
        let registry = build(vec![
            ProbePass::failing("fail-fast", &[]),
            ProbePass::slow("straggler", &[], Duration::from_millis(50)),
        ]);
        let model = model_handle(WorkspaceModel::new("test"));

        let err = ParallelRunner
            .run(&registry, &model, &logger(), None)
            .await
            .unwrap_err();
        assert_eq!(err.name, "fail-fast");

        // The straggler was not aborted: give it time to finish and observe
        // its (unconsulted) mutation.
        sleep(Duration::from_millis(100)).await;
        assert!(executed(&model).await.contains(&"straggler".to_string()));
    }

    #[tokio::test]
    async fn test_runners_produce_equivalent_models() {
        fn passes() -> Vec<Arc<dyn Pass>> {
            vec![
                ProbePass::ok("scan", &[]),
                ProbePass::ok("env", &["scan"]),
                ProbePass::ok("conventions", &["scan"]),
                ProbePass::ok("link", &["env", "conventions"]),
            ]
        }

        let sequential = model_handle(WorkspaceModel::new("test"));
        SequentialRunner
            .run(&build(passes()), &sequential, &logger(), None)
            .await
            .unwrap();

        let parallel = model_handle(WorkspaceModel::new("test"));
        ParallelRunner
            .run(&build(passes()), &parallel, &logger(), None)
            .await
            .unwrap();

        let mut left = executed(&sequential).await;
        let mut right = executed(&parallel).await;
        left.sort();
        right.sort();
        assert_eq!(left, right);
    }

    #[tokio::test]
    async fn test_name_filter_applies_to_resolved_order() {
        let registry = build(vec![
            ProbePass::ok("scan", &[]),
            ProbePass::ok("env", &["scan"]),
            ProbePass::ok("link", &["env"]),
        ]);

        let model = model_handle(WorkspaceModel::new("test"));
        let filter = vec!["scan".to_string(), "link".to_string()];
        SequentialRunner
            .run(&registry, &model, &logger(), Some(&filter))
            .await
            .unwrap();
        assert_eq!(executed(&model).await, vec!["scan", "link"]);

        let model = model_handle(WorkspaceModel::new("test"));
        ParallelRunner
            .run(&registry, &model, &logger(), Some(&filter))
            .await
            .unwrap();
        assert_eq!(executed(&model).await, vec!["scan", "link"]);
    }

    #[tokio::test]
    async fn test_parallel_wraps_panics_as_pass_failures() {
        struct PanickingPass;

        #[async_trait]
        impl Pass for PanickingPass {
            fn name(&self) -> &'static str {
                "panics"
            }

            fn description(&self) -> &'static str {
                "panics"
            }

            async fn execute(&self, _model: &ModelHandle, _logger: &ScopedLogger) -> Result<()> {
                panic!("boom");
            }
        }

        let registry = build(vec![Arc::new(PanickingPass)]);
        let model = model_handle(WorkspaceModel::new("test"));

        let err = ParallelRunner
            .run(&registry, &model, &logger(), None)
            .await
            .unwrap_err();
        assert_eq!(err.name, "panics");
    }
}
