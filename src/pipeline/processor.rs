//! Change detection and incremental processing.
//!
//! Once per run, every deduplicated candidate model is classified against
//! the previously persisted catalog and hash map:
//!
//! - previously known ids absent from the candidates are retained with
//!   `deprecated = true` and skip enrichment entirely,
//! - candidates whose content hash matches the stored hash are UNCHANGED:
//!   the prior record is reused verbatim, or passed through the configured
//!   lightweight steps,
//! - everything else is NEW_OR_CHANGED and runs the full per-model chain,
//!   followed by the batch steps over the whole NEW_OR_CHANGED set.
//!
//! The stored hash map is treated as a read-only snapshot; a fresh
//! write-back map is assembled alongside the output and committed with it,
//! so a failed run never leaves partially updated state.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use super::error::RunError;
use super::hash::content_hash;
use crate::{
    catalog::CanonicalModel,
    config::RunConfig,
    enrich::{self, BatchEnrichStep, ModelEnrichStep, StepContext},
};

/// Counts reported in the run summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounts {
    pub new_or_changed: usize,
    pub unchanged: usize,
    pub deprecated: usize,
    /// Previously known records carried through by the safety net.
    pub carried: usize,
}

/// Assembled catalog plus the hash map to persist alongside it.
#[derive(Debug)]
pub struct ProcessOutput {
    pub models: Vec<CanonicalModel>,
    pub hashes: BTreeMap<String, String>,
    pub counts: RunCounts,
}

/// Drives enrichment for one run.
pub struct Processor<'a> {
    config: &'a RunConfig,
    model_steps: Vec<Box<dyn ModelEnrichStep>>,
    lightweight_steps: Vec<Box<dyn ModelEnrichStep>>,
    batch_steps: Vec<Box<dyn BatchEnrichStep>>,
}

impl<'a> Processor<'a> {
    /// Build a processor with the steps the configuration enables.
    pub fn from_config(config: &'a RunConfig) -> Self {
        Self::with_steps(
            config,
            enrich::model_steps(config),
            enrich::lightweight_steps(config),
            enrich::batch_steps(config),
        )
    }

    /// Build a processor with explicit steps.
    pub fn with_steps(
        config: &'a RunConfig,
        model_steps: Vec<Box<dyn ModelEnrichStep>>,
        lightweight_steps: Vec<Box<dyn ModelEnrichStep>>,
        batch_steps: Vec<Box<dyn BatchEnrichStep>>,
    ) -> Self {
        Self {
            config,
            model_steps,
            lightweight_steps,
            batch_steps,
        }
    }

    /// Reconcile the candidates against the persisted state and produce the
    /// next catalog, sorted by id.
    pub async fn process(
        &self,
        candidates: Vec<CanonicalModel>,
        previous: &[CanonicalModel],
        stored_hashes: &BTreeMap<String, String>,
        now: DateTime<Utc>,
    ) -> Result<ProcessOutput, RunError> {
        let prev_by_id: BTreeMap<&str, &CanonicalModel> =
            previous.iter().map(|m| (m.id.as_str(), m)).collect();
        let candidate_ids: BTreeSet<&str> =
            candidates.iter().map(|m| m.id.as_str()).collect();

        let mut hashes: BTreeMap<String, String> = BTreeMap::new();
        let mut counts = RunCounts::default();

        // Previously known models gone from every source: flag and retain.
        let mut retained: Vec<CanonicalModel> = Vec::new();
        for model in previous {
            if candidate_ids.contains(model.id.as_str()) {
                continue;
            }
            let mut kept = model.clone();
            if !kept.deprecated {
                tracing::info!(model_id = %kept.id, "Model absent from all sources, deprecating");
                kept.deprecated = true;
            }
            if let Some(hash) = stored_hashes.get(&kept.id) {
                hashes.insert(kept.id.clone(), hash.clone());
            }
            counts.deprecated += 1;
            retained.push(kept);
        }

        let mut unchanged: Vec<CanonicalModel> = Vec::new();
        let mut changed: Vec<CanonicalModel> = Vec::new();

        for candidate in candidates {
            let hash = content_hash(&candidate);
            let prev = prev_by_id.get(candidate.id.as_str()).copied();
            let unchanged_prev = prev.filter(|_| {
                stored_hashes
                    .get(&candidate.id)
                    .is_some_and(|stored| *stored == hash)
            });

            hashes.insert(candidate.id.clone(), hash);

            if let Some(prev_model) = unchanged_prev {
                let mut wip = prev_model.clone();
                // A model can resurface after a deprecation with content
                // identical to its last import; it is current again.
                wip.deprecated = false;
                for step in &self.lightweight_steps {
                    let ctx = StepContext {
                        source: &candidate,
                        previous: Some(prev_model),
                        config: self.config,
                    };
                    wip = step
                        .apply(ctx, wip)
                        .await
                        .map_err(|source| RunError::ModelEnrichment {
                            step: step.name(),
                            model_id: candidate.id.clone(),
                            source,
                        })?;
                }
                counts.unchanged += 1;
                unchanged.push(wip);
            } else {
                let mut wip = candidate.clone();
                wip.deprecated = false;
                wip.last_imported_at = Some(now);
                for step in &self.model_steps {
                    let ctx = StepContext {
                        source: &candidate,
                        previous: prev,
                        config: self.config,
                    };
                    wip = step
                        .apply(ctx, wip)
                        .await
                        .map_err(|source| RunError::ModelEnrichment {
                            step: step.name(),
                            model_id: candidate.id.clone(),
                            source,
                        })?;
                }
                counts.new_or_changed += 1;
                changed.push(wip);
            }
        }

        // Batch steps are a synchronization barrier: they see every
        // NEW_OR_CHANGED output and nothing runs downstream until they
        // return. UNCHANGED models never enter them.
        for step in &self.batch_steps {
            changed = step
                .apply(changed, self.config)
                .await
                .map_err(|source| RunError::BatchEnrichment {
                    step: step.name(),
                    source,
                })?;
        }

        let mut models = changed;
        models.extend(unchanged);
        models.extend(retained);

        // Safety net: any previously known id not re-encountered above is
        // carried through untouched rather than dropped.
        let present: BTreeSet<&str> = models.iter().map(|m| m.id.as_str()).collect();
        let mut carried: Vec<CanonicalModel> = Vec::new();
        for model in previous {
            if present.contains(model.id.as_str()) {
                continue;
            }
            if let Some(hash) = stored_hashes.get(&model.id) {
                hashes.insert(model.id.clone(), hash.clone());
            }
            counts.carried += 1;
            carried.push(model.clone());
        }
        models.extend(carried);

        models.sort_by(|a, b| a.id.cmp(&b.id));

        Ok(ProcessOutput {
            models,
            hashes,
            counts,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use async_trait::async_trait;
    use chrono::TimeZone;

    use super::*;
    use crate::enrich::EnrichmentError;

    struct CountingStep {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ModelEnrichStep for CountingStep {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn apply(
            &self,
            _ctx: StepContext<'_>,
            wip: CanonicalModel,
        ) -> Result<CanonicalModel, EnrichmentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(wip)
        }
    }

    struct FailingStep;

    #[async_trait]
    impl ModelEnrichStep for FailingStep {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn apply(
            &self,
            _ctx: StepContext<'_>,
            _wip: CanonicalModel,
        ) -> Result<CanonicalModel, EnrichmentError> {
            Err(EnrichmentError::new("boom"))
        }
    }

    struct RecordingBatch {
        seen: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl BatchEnrichStep for RecordingBatch {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn apply(
            &self,
            models: Vec<CanonicalModel>,
            _config: &RunConfig,
        ) -> Result<Vec<CanonicalModel>, EnrichmentError> {
            let mut seen = self.seen.lock().unwrap();
            seen.extend(models.iter().map(|m| m.id.clone()));
            Ok(models)
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 7, 12, 0, 0).unwrap()
    }

    fn later() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 8, 12, 0, 0).unwrap()
    }

    fn candidates() -> Vec<CanonicalModel> {
        let mut a = CanonicalModel::new("alpha");
        a.description = Some("Model alpha.".to_string());
        let b = CanonicalModel::new("beta");
        vec![a, b]
    }

    #[tokio::test]
    async fn test_first_run_processes_everything() {
        let config = RunConfig::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let processor = Processor::with_steps(
            &config,
            vec![Box::new(CountingStep {
                calls: Arc::clone(&calls),
            })],
            Vec::new(),
            Vec::new(),
        );

        let out = processor
            .process(candidates(), &[], &BTreeMap::new(), now())
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(out.counts.new_or_changed, 2);
        assert_eq!(out.counts.unchanged, 0);
        assert_eq!(out.models.len(), 2);
        assert!(out.models.iter().all(|m| m.last_imported_at == Some(now())));
        assert_eq!(out.hashes.len(), 2);
    }

    #[tokio::test]
    async fn test_unchanged_models_skip_heavy_steps_and_keep_timestamps() {
        let config = RunConfig::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let processor = Processor::with_steps(
            &config,
            vec![Box::new(CountingStep {
                calls: Arc::clone(&calls),
            })],
            Vec::new(),
            Vec::new(),
        );

        let first = processor
            .process(candidates(), &[], &BTreeMap::new(), now())
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let second = processor
            .process(candidates(), &first.models, &first.hashes, later())
            .await
            .unwrap();

        // No heavy step ran for either model on the second run.
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(second.counts.unchanged, 2);
        assert_eq!(second.counts.new_or_changed, 0);
        // The prior records were reused verbatim, timestamps included.
        assert_eq!(second.models, first.models);
        assert_eq!(second.hashes, first.hashes);
    }

    #[tokio::test]
    async fn test_changed_model_is_reprocessed() {
        let config = RunConfig::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let processor = Processor::with_steps(
            &config,
            vec![Box::new(CountingStep {
                calls: Arc::clone(&calls),
            })],
            Vec::new(),
            Vec::new(),
        );

        let first = processor
            .process(candidates(), &[], &BTreeMap::new(), now())
            .await
            .unwrap();

        let mut next = candidates();
        next[0].description = Some("Model alpha, updated.".to_string());

        let second = processor
            .process(next, &first.models, &first.hashes, later())
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(second.counts.new_or_changed, 1);
        assert_eq!(second.counts.unchanged, 1);
        assert_ne!(second.hashes["alpha"], first.hashes["alpha"]);
        assert_eq!(second.hashes["beta"], first.hashes["beta"]);

        let alpha = second.models.iter().find(|m| m.id == "alpha").unwrap();
        let beta = second.models.iter().find(|m| m.id == "beta").unwrap();
        assert_eq!(alpha.last_imported_at, Some(later()));
        assert_eq!(beta.last_imported_at, Some(now()));
    }

    #[tokio::test]
    async fn test_missing_model_is_deprecated_untouched() {
        let config = RunConfig::default();
        let processor = Processor::with_steps(&config, Vec::new(), Vec::new(), Vec::new());

        let first = processor
            .process(candidates(), &[], &BTreeMap::new(), now())
            .await
            .unwrap();

        let only_beta: Vec<CanonicalModel> = candidates()
            .into_iter()
            .filter(|m| m.id == "beta")
            .collect();
        let second = processor
            .process(only_beta, &first.models, &first.hashes, later())
            .await
            .unwrap();

        assert_eq!(second.counts.deprecated, 1);
        let alpha = second.models.iter().find(|m| m.id == "alpha").unwrap();
        assert!(alpha.deprecated);
        // Prior fields are otherwise untouched.
        assert_eq!(alpha.description.as_deref(), Some("Model alpha."));
        assert_eq!(alpha.last_imported_at, Some(now()));
        // Its hash entry is carried so a later reappearance diffs correctly.
        assert_eq!(second.hashes["alpha"], first.hashes["alpha"]);
    }

    #[tokio::test]
    async fn test_reappearing_model_is_undeprecated() {
        let config = RunConfig::default();
        let processor = Processor::with_steps(&config, Vec::new(), Vec::new(), Vec::new());

        let first = processor
            .process(candidates(), &[], &BTreeMap::new(), now())
            .await
            .unwrap();
        let second = processor
            .process(Vec::new(), &first.models, &first.hashes, later())
            .await
            .unwrap();
        assert!(second.models.iter().all(|m| m.deprecated));

        let third = processor
            .process(candidates(), &second.models, &second.hashes, later())
            .await
            .unwrap();
        assert!(third.models.iter().all(|m| !m.deprecated));
        assert_eq!(third.counts.unchanged, 2);
    }

    #[tokio::test]
    async fn test_batch_step_sees_only_new_or_changed() {
        let config = RunConfig::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let processor = Processor::with_steps(
            &config,
            Vec::new(),
            Vec::new(),
            vec![Box::new(RecordingBatch {
                seen: Arc::clone(&seen),
            })],
        );

        let first = processor
            .process(candidates(), &[], &BTreeMap::new(), now())
            .await
            .unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["alpha", "beta"]);

        let mut next = candidates();
        next[1].name = Some("Beta".to_string());
        processor
            .process(next, &first.models, &first.hashes, later())
            .await
            .unwrap();
        // Only the changed model entered the second batch.
        assert_eq!(*seen.lock().unwrap(), vec!["alpha", "beta", "beta"]);
    }

    #[tokio::test]
    async fn test_lightweight_step_runs_on_unchanged_models() {
        let config = RunConfig::default();
        let heavy = Arc::new(AtomicUsize::new(0));
        let light = Arc::new(AtomicUsize::new(0));
        let processor = Processor::with_steps(
            &config,
            vec![Box::new(CountingStep {
                calls: Arc::clone(&heavy),
            })],
            vec![Box::new(CountingStep {
                calls: Arc::clone(&light),
            })],
            Vec::new(),
        );

        let first = processor
            .process(candidates(), &[], &BTreeMap::new(), now())
            .await
            .unwrap();
        assert_eq!(heavy.load(Ordering::SeqCst), 2);
        assert_eq!(light.load(Ordering::SeqCst), 0);

        processor
            .process(candidates(), &first.models, &first.hashes, later())
            .await
            .unwrap();
        assert_eq!(heavy.load(Ordering::SeqCst), 2);
        assert_eq!(light.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_output_is_sorted_by_id() {
        let config = RunConfig::default();
        let processor = Processor::with_steps(&config, Vec::new(), Vec::new(), Vec::new());

        let models = vec![
            CanonicalModel::new("zeta"),
            CanonicalModel::new("alpha"),
            CanonicalModel::new("mu"),
        ];
        let out = processor
            .process(models, &[], &BTreeMap::new(), now())
            .await
            .unwrap();
        let ids: Vec<&str> = out.models.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "mu", "zeta"]);
    }

    #[tokio::test]
    async fn test_step_failure_names_the_model() {
        let config = RunConfig::default();
        let processor = Processor::with_steps(
            &config,
            vec![Box::new(FailingStep)],
            Vec::new(),
            Vec::new(),
        );

        let err = processor
            .process(
                vec![CanonicalModel::new("alpha")],
                &[],
                &BTreeMap::new(),
                now(),
            )
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("failing"));
        assert!(message.contains("alpha"));
    }
}
