use crate::error::HarvestError;
use crate::models::{HarvestRecord, PagedKind, well_formed_listing};
use crate::traits::{PetitionApi, RecordSink};

/// Tuning knobs for a harvest run.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// Flush the full result table after this many committed records.
    pub checkpoint_every: usize,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self { checkpoint_every: 25 }
    }
}

/// Orchestrates the per-petition pipeline:
/// resolve → collect reasons → collect updates → snapshot → validate → commit.
///
/// Generic over the API client and the sink via traits, enabling
/// dependency injection and testability without real HTTP or disk I/O.
///
/// Strictly sequential: one URL is carried through all four fetch stages
/// before the next begins. Any upstream failure skips that URL — a skip
/// is permanent for the run and leaves no record. Only a sink write
/// failure aborts the whole run.
pub struct HarvestService<A, S>
where
    A: PetitionApi,
    S: RecordSink,
{
    api: A,
    sink: S,
    config: HarvestConfig,
}

impl<A, S> HarvestService<A, S>
where
    A: PetitionApi,
    S: RecordSink,
{
    pub fn new(api: A, sink: S) -> Self {
        Self::with_config(api, sink, HarvestConfig::default())
    }

    pub fn with_config(api: A, sink: S, config: HarvestConfig) -> Self {
        Self { api, sink, config }
    }

    /// Run the full harvest over a URL list.
    ///
    /// Records land in the returned table in input order; skipped URLs
    /// leave gaps rather than reordering. The table is flushed to the
    /// sink at every checkpoint boundary and once more after the last
    /// URL, regardless of where it fell.
    pub async fn run(&self, urls: &[String]) -> Result<Vec<HarvestRecord>, HarvestError> {
        let mut table: Vec<HarvestRecord> = Vec::new();
        let mut skipped = 0usize;

        for url in urls {
            match self.harvest_one(url).await {
                Ok(record) => {
                    table.push(record);
                    if self.config.checkpoint_every > 0
                        && table.len() % self.config.checkpoint_every == 0
                    {
                        self.sink.flush(&table)?;
                        tracing::info!(committed = table.len(), "Checkpoint flushed");
                    }
                }
                Err(e) => {
                    skipped += 1;
                    tracing::warn!(url = %url.trim(), error = %e, "Skipping petition");
                }
            }
        }

        self.sink.flush(&table)?;

        // Skips are silent in the exit status; the counts here are how
        // operators detect attrition.
        tracing::info!(committed = table.len(), skipped, "Harvest complete");

        Ok(table)
    }

    /// Carry one petition through all four fetch stages and validation.
    async fn harvest_one(&self, url: &str) -> Result<HarvestRecord, HarvestError> {
        tracing::info!(url = %url.trim(), "Resolving petition id");
        let petition_id = self.api.resolve_id(url).await?;

        tracing::info!(petition_id, "Collecting reasons");
        let reasons = self.api.collect(petition_id, PagedKind::Reasons).await?;

        tracing::info!(petition_id, "Collecting updates");
        let updates = self.api.collect(petition_id, PagedKind::Updates).await?;

        tracing::info!(petition_id, "Fetching petition data");
        let data = self.api.snapshot(petition_id).await?;

        for (kind, blob) in [(PagedKind::Reasons, &reasons), (PagedKind::Updates, &updates)] {
            if !well_formed_listing(blob) {
                return Err(HarvestError::Validation(format!(
                    "{kind} blob for petition {petition_id} is not a JSON array"
                )));
            }
        }

        Ok(HarvestRecord {
            petition_id,
            reasons,
            updates,
            data,
        })
    }
}
