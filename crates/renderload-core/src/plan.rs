//! Query groups and run plan assembly

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::catalog::TargetCatalog;
use crate::config::{RunConfig, WindowSpec};
use crate::error::{RenderLoadError, Result};
use crate::generator::CyclicQueryGenerator;
use crate::offsets::{OffsetSource, SeededOffsets, ThreadRngOffsets};
use crate::query::RenderFormat;

/// A named cohort of simulated clients sharing one window profile.
///
/// Each group owns its generator; generators are never shared between groups.
#[derive(Debug, Clone)]
pub struct QueryGroup {
    pub name: String,
    pub concurrency: usize,
    pub delay: Duration,
    generator: Arc<CyclicQueryGenerator>,
}

impl QueryGroup {
    pub fn new(
        name: impl Into<String>,
        concurrency: usize,
        delay: Duration,
        generator: CyclicQueryGenerator,
    ) -> Self {
        Self {
            name: name.into(),
            concurrency,
            delay,
            generator: Arc::new(generator),
        }
    }

    /// Handle on the group's generator, for its workers
    pub fn generator(&self) -> &Arc<CyclicQueryGenerator> {
        &self.generator
    }

    pub fn window_secs(&self) -> u64 {
        self.generator.window_secs()
    }

    /// Whether the group spawns no workers
    pub fn is_inert(&self) -> bool {
        self.concurrency == 0
    }
}

/// Everything the load engine needs for one run
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub base_url: String,
    pub duration: Duration,
    pub groups: Vec<QueryGroup>,
}

impl RunPlan {
    /// Assemble one group per window over a shared catalog.
    ///
    /// Fails if the catalog is empty or two windows share a name. Groups keep
    /// the order of `windows`, inert ones included.
    pub fn assemble(
        base_url: impl Into<String>,
        duration: Duration,
        delay: Duration,
        format: RenderFormat,
        windows: &[WindowSpec],
        catalog: &TargetCatalog,
        mut offsets: impl FnMut(usize) -> Arc<dyn OffsetSource>,
    ) -> Result<Self> {
        let mut groups: Vec<QueryGroup> = Vec::with_capacity(windows.len());

        for (position, window) in windows.iter().enumerate() {
            if groups.iter().any(|g| g.name == window.name) {
                return Err(RenderLoadError::DuplicateGroup(window.name.clone()));
            }

            let generator = CyclicQueryGenerator::with_offsets(
                catalog.clone(),
                window.window_secs,
                format,
                offsets(position),
            )
            .ok_or(RenderLoadError::EmptyCatalog)?;

            debug!(
                "Group '{}': window {}s, {} workers",
                window.name, window.window_secs, window.concurrency
            );
            groups.push(QueryGroup::new(
                window.name.clone(),
                window.concurrency,
                delay,
                generator,
            ));
        }

        let plan = Self {
            base_url: base_url.into(),
            duration,
            groups,
        };

        info!(
            "Run plan ready: {} groups, {} workers, {} targets",
            plan.groups.len(),
            plan.total_concurrency(),
            catalog.len()
        );
        Ok(plan)
    }

    /// Assemble a plan from a run configuration.
    ///
    /// With a configured seed every group gets its own `SeededOffsets`
    /// (seed + group position); otherwise groups draw from thread-local RNGs.
    pub fn from_config(config: &RunConfig, catalog: &TargetCatalog) -> Result<Self> {
        config.validate()?;

        let seed = config.seed;
        Self::assemble(
            config.base_url.clone(),
            config.duration,
            config.delay,
            config.format,
            &config.groups,
            catalog,
            |position| -> Arc<dyn OffsetSource> {
                match seed {
                    Some(seed) => {
                        Arc::new(SeededOffsets::new(seed.wrapping_add(position as u64)))
                    }
                    None => Arc::new(ThreadRngOffsets),
                }
            },
        )
    }

    /// Group called `name`
    pub fn group(&self, name: &str) -> Option<&QueryGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Total workers across all groups
    pub fn total_concurrency(&self) -> usize {
        self.groups.iter().map(|g| g.concurrency).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Preset;

    fn catalog() -> TargetCatalog {
        TargetCatalog::new(["a.metric", "b.metric", "c.metric"])
    }

    #[test]
    fn test_plan_from_default_config() {
        let plan = RunPlan::from_config(&RunConfig::default(), &catalog()).unwrap();

        let names: Vec<&str> = plan.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["1 Hour", "1 Day", "1 Week", "3 Month", "1 Year"]);
        assert_eq!(plan.total_concurrency(), 15);
        assert_eq!(plan.duration, Duration::from_secs(60));
        assert!(plan.group("1 Year").unwrap().is_inert());
        assert!(plan.groups.iter().all(|g| g.delay == Duration::from_millis(100)));
    }

    #[test]
    fn test_empty_catalog_fails_assembly() {
        let empty = TargetCatalog::new(Vec::<String>::new());
        let err = RunPlan::from_config(&RunConfig::default(), &empty).unwrap_err();

        assert!(matches!(err, RenderLoadError::EmptyCatalog));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let windows = vec![
            WindowSpec::new("1 Hour", 3_600, 1),
            WindowSpec::new("1 Hour", 7_200, 1),
        ];
        let err = RunPlan::assemble(
            "http://localhost",
            Duration::from_secs(1),
            Duration::ZERO,
            RenderFormat::Protobuf,
            &windows,
            &catalog(),
            |_| -> Arc<dyn OffsetSource> { Arc::new(ThreadRngOffsets) },
        )
        .unwrap_err();

        assert!(matches!(err, RenderLoadError::DuplicateGroup(_)));
    }

    #[test]
    fn test_generators_are_not_shared() {
        let windows = vec![
            WindowSpec::new("first", 3_600, 1),
            WindowSpec::new("second", 3_600, 1),
        ];
        let plan = RunPlan::assemble(
            "http://localhost",
            Duration::from_secs(1),
            Duration::ZERO,
            RenderFormat::Protobuf,
            &windows,
            &catalog(),
            |_| -> Arc<dyn OffsetSource> { Arc::new(ThreadRngOffsets) },
        )
        .unwrap();

        let first = plan.groups[0].generator();
        let second = plan.groups[1].generator();
        assert!(!Arc::ptr_eq(first, second));

        // advancing one cursor leaves the other untouched
        first.next_slot();
        first.next_slot();
        assert_eq!(second.next_slot(), 0);
    }

    #[test]
    fn test_assembly_is_idempotent() {
        let config = RunConfig::from_preset(Preset::Days);
        let a = RunPlan::from_config(&config, &catalog()).unwrap();
        let b = RunPlan::from_config(&config, &catalog()).unwrap();

        let shape = |plan: &RunPlan| {
            plan.groups
                .iter()
                .map(|g| (g.name.clone(), g.concurrency, g.window_secs()))
                .collect::<Vec<_>>()
        };
        assert_eq!(shape(&a), shape(&b));
        assert_eq!(a.base_url, b.base_url);
    }

    #[test]
    fn test_seeded_plans_repeat_queries() {
        let config = RunConfig {
            seed: Some(1234),
            ..Default::default()
        };
        let a = RunPlan::from_config(&config, &catalog()).unwrap();
        let b = RunPlan::from_config(&config, &catalog()).unwrap();

        for (ga, gb) in a.groups.iter().zip(&b.groups) {
            for _ in 0..5 {
                assert_eq!(ga.generator().next_query(), gb.generator().next_query());
            }
        }
    }
}
