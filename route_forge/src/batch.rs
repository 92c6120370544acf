//! Concurrent compilation of many module definitions.

use crate::compiler::Compiler;
use crate::error::{Error, Result};
use crate::route::RouteTable;
use crate::schema::ModuleDefinition;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::info;

/// Worker count used when none is configured: the available cores.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Compiles `defs` with the default compiler. See [`compile_all_with`].
pub async fn compile_all(defs: Vec<ModuleDefinition>, workers: Option<usize>) -> Vec<Result<RouteTable>> {
    compile_all_with(Compiler::default(), defs, workers).await
}

/// Compiles every definition on the blocking pool, at most `workers` at a
/// time. Results come back in input order, one per definition; a failing
/// module does not stop the others.
pub async fn compile_all_with(
    compiler: Compiler,
    defs: Vec<ModuleDefinition>,
    workers: Option<usize>,
) -> Vec<Result<RouteTable>> {
    let width = workers.filter(|n| *n > 0).unwrap_or_else(default_workers);
    let semaphore = Arc::new(Semaphore::new(width));
    let compiler = Arc::new(compiler);
    let total = defs.len();

    let mut tasks = Vec::with_capacity(total);
    for def in defs {
        let semaphore = semaphore.clone();
        let compiler = compiler.clone();
        tasks.push(tokio::spawn(async move {
            let module_id = def.module_id.clone();
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| Error::Task(e.to_string()))?;
            tokio::task::spawn_blocking(move || compiler.compile(&def))
                .await
                .unwrap_or_else(|e| Err(Error::Task(e.to_string()).in_module(module_id)))
        }));
    }

    let mut results = Vec::with_capacity(total);
    for task in tasks {
        results.push(task.await.unwrap_or_else(|e| Err(Error::Task(e.to_string()))));
    }

    let failed = results.iter().filter(|r| r.is_err()).count();
    info!(modules = total, failed, workers = width, "batch compile finished");
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{SectionSlot, MODULE_ROUTE_COUNT};

    fn defs() -> Vec<ModuleDefinition> {
        (0..12)
            .map(|i| ModuleDefinition::series_template(format!("tool-{i}"), "items", "rules", "logs"))
            .collect()
    }

    #[tokio::test]
    async fn test_results_keep_input_order() {
        let results = compile_all(defs(), Some(3)).await;
        assert_eq!(results.len(), 12);
        for (i, result) in results.iter().enumerate() {
            let table = result.as_ref().unwrap();
            assert_eq!(table.module_id, format!("tool-{i}"));
            assert_eq!(table.len(), MODULE_ROUTE_COUNT);
        }
    }

    #[tokio::test]
    async fn test_one_failure_does_not_abort_the_batch() {
        let mut defs = defs();
        defs[4].sections.retain(|s| s.kind != SectionSlot::Utilities);
        let results = compile_all_with(Compiler::with_api_prefix("/v1"), defs, None).await;

        assert!(results[3].is_ok());
        match &results[4] {
            Err(Error::Compile { module_id, source }) => {
                assert_eq!(module_id, "tool-4");
                assert!(matches!(**source, Error::MissingSection(SectionSlot::Utilities)));
            }
            other => panic!("expected compile error, got {other:?}"),
        }
        assert_eq!(results[5].as_ref().unwrap().mount, "/v1/tool-5");
    }

    #[tokio::test]
    async fn test_matches_sequential_compile() {
        let compiler = Compiler::default();
        let sequential: Vec<_> = defs().iter().map(|d| compiler.compile(d).unwrap()).collect();
        let concurrent: Vec<_> = compile_all(defs(), Some(1))
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(sequential, concurrent);
    }
}
