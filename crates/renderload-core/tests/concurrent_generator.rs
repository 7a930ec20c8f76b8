//! Concurrency tests for the cyclic query generator
//!
//! These tests hammer one generator from many threads and check that the
//! round-robin stays fair and every query stays inside the catalog.

use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Barrier};
use std::thread;

use renderload_core::prelude::*;
use renderload_core::{SeededOffsets, DAY_RANGE_SECS};

fn spawn_callers<T, F>(callers: usize, work: F) -> Vec<T>
where
    T: Send + 'static,
    F: Fn() -> T + Send + Sync + 'static,
{
    let work = Arc::new(work);
    let barrier = Arc::new(Barrier::new(callers));

    let handles: Vec<_> = (0..callers)
        .map(|_| {
            let work = work.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                work()
            })
        })
        .collect();

    handles
        .into_iter()
        .map(|h| h.join().expect("caller panicked"))
        .collect()
}

mod fairness_tests {
    use super::*;

    #[test]
    fn test_fifty_callers_seven_targets() {
        let catalog = TargetCatalog::new((0..7).map(|i| format!("metric.{i}")));
        let generator = Arc::new(CyclicQueryGenerator::new(catalog, 3_600).unwrap());

        let per_caller = {
            let generator = generator.clone();
            spawn_callers(50, move || {
                let mut counts = [0usize; 7];
                for _ in 0..700 {
                    counts[generator.next_slot()] += 1;
                }
                counts
            })
        };

        let mut totals = [0usize; 7];
        for counts in per_caller {
            for (slot, n) in counts.iter().enumerate() {
                totals[slot] += n;
            }
        }

        // 35_000 draws are exactly 5_000 full cycles
        assert_eq!(totals.iter().sum::<usize>(), 35_000);
        assert!(totals.iter().all(|n| *n == 5_000), "{totals:?}");
    }

    #[test]
    fn test_partial_cycle_deviation() {
        let catalog = TargetCatalog::new((0..5).map(|i| format!("m{i}")));
        let generator = Arc::new(CyclicQueryGenerator::new(catalog, 60).unwrap());

        let per_caller = {
            let generator = generator.clone();
            spawn_callers(8, move || {
                (0..333).map(|_| generator.next_slot()).collect::<Vec<_>>()
            })
        };

        let mut totals = [0usize; 5];
        for slots in per_caller {
            for slot in slots {
                totals[slot] += 1;
            }
        }

        // 2_664 draws: 532 full cycles plus slots 0..4 of a partial one
        assert_eq!(totals, [533, 533, 533, 533, 532]);
    }

    #[test]
    fn test_sequence_continues_after_contention() {
        let catalog = TargetCatalog::new(["a", "b", "c"]);
        let generator = Arc::new(CyclicQueryGenerator::new(catalog, 60).unwrap());

        {
            let generator = generator.clone();
            spawn_callers(16, move || {
                // 16 * 30 = 480 draws, a whole number of cycles
                for _ in 0..30 {
                    generator.next_slot();
                }
            });
        }

        let next: Vec<usize> = (0..6).map(|_| generator.next_slot()).collect();
        assert_eq!(next, vec![0, 1, 2, 0, 1, 2]);
    }
}

mod query_tests {
    use super::*;

    #[test]
    fn test_concurrent_queries_stay_in_catalog() {
        let targets: Vec<String> = (0..11).map(|i| format!("servers.web{i:02}.cpu")).collect();
        let catalog = TargetCatalog::new(targets.clone());
        let generator = Arc::new(
            CyclicQueryGenerator::with_offsets(
                catalog,
                604_800,
                RenderFormat::Protobuf,
                Arc::new(SeededOffsets::new(99)),
            )
            .unwrap(),
        );

        let per_caller = {
            let generator = generator.clone();
            spawn_callers(12, move || {
                (0..500).map(|_| generator.next_query()).collect::<Vec<_>>()
            })
        };

        let mut seen: HashMap<String, usize> = HashMap::new();
        for query in per_caller.into_iter().flatten() {
            assert_eq!(query.method, QueryMethod::Get);
            assert!(query.until_secs < DAY_RANGE_SECS);
            assert_eq!(query.from_secs, query.until_secs + 604_800);

            let target = targets
                .iter()
                .find(|t| query.url.contains(&format!("target={t}&")))
                .unwrap_or_else(|| panic!("query outside catalog: {}", query.url));
            *seen.entry(target.clone()).or_default() += 1;
        }

        // 6_000 draws over 11 targets: counts differ by at most one
        let min = seen.values().min().copied().unwrap_or_default();
        let max = seen.values().max().copied().unwrap_or_default();
        assert_eq!(seen.len(), 11);
        assert!(max - min <= 1, "{seen:?}");
    }
}

mod catalog_tests {
    use super::*;

    #[test]
    fn test_plan_from_catalog_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# exported from carbon").unwrap();
        writeln!(file, "target").unwrap();
        writeln!(file, "a.metric").unwrap();
        writeln!(file, "b.metric").unwrap();
        file.flush().unwrap();

        let catalog = TargetCatalog::from_path(file.path()).unwrap();
        let plan = RunPlan::from_config(&RunConfig::default(), &catalog).unwrap();

        assert_eq!(plan.groups.len(), 5);
        let q = plan.group("1 Hour").unwrap().generator().next_query();
        assert!(q.url.contains("target=a.metric&"));
    }

    #[test]
    fn test_header_only_file_fails_plan() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "target").unwrap();
        file.flush().unwrap();

        let catalog = TargetCatalog::from_path(file.path()).unwrap();
        let err = RunPlan::from_config(&RunConfig::default(), &catalog).unwrap_err();
        assert!(matches!(err, RenderLoadError::EmptyCatalog));
    }
}
