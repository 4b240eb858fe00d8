//! One store's worker: a browser session, the store context, then each
//! category in turn.

use anyhow::Context;
use lowes_core::{CategoryTarget, StoreTarget};
use lowes_scraper::{
    scrape_category, set_store_context, BrowserSession, CategoryReport, JsonlSink,
};
use serde::Serialize;

use super::checkpoint;
use super::RunContext;

/// What happened at one store.
#[derive(Debug, Clone, Serialize)]
pub(super) struct StoreSummary {
    pub store_id: String,
    pub store_name: String,
    pub store_context_set: bool,
    pub session_rotations: u32,
    /// Remaining categories were skipped after repeated blocks.
    pub abandoned: bool,
    /// Categories skipped because a checkpoint marked them done.
    pub resumed_skipped: usize,
    pub records: usize,
    pub categories: Vec<CategoryReport>,
    pub error: Option<String>,
}

impl StoreSummary {
    pub(super) fn new(store: &StoreTarget) -> Self {
        Self {
            store_id: store.store_id.clone(),
            store_name: store.name.clone(),
            store_context_set: false,
            session_rotations: 0,
            abandoned: false,
            resumed_skipped: 0,
            records: 0,
            categories: Vec::new(),
            error: None,
        }
    }

    pub(super) fn failed(store: &StoreTarget, error: &anyhow::Error) -> Self {
        Self {
            error: Some(format!("{error:#}")),
            ..Self::new(store)
        }
    }
}

/// Block bookkeeping across one store's categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum BlockAction {
    Continue,
    Rotate,
    Abandon,
}

#[derive(Debug, Default)]
pub(super) struct BlockTracker {
    consecutive: u32,
    rotations: u32,
}

impl BlockTracker {
    /// Records one category's blocked flag and says what the worker should
    /// do before the next category.
    pub(super) fn observe(
        &mut self,
        blocked: bool,
        max_consecutive: u32,
        max_rotations: u32,
    ) -> BlockAction {
        if !blocked {
            self.consecutive = 0;
            return BlockAction::Continue;
        }
        self.consecutive += 1;
        if self.consecutive < max_consecutive.max(1) {
            return BlockAction::Continue;
        }
        if self.rotations < max_rotations {
            self.rotations += 1;
            self.consecutive = 0;
            BlockAction::Rotate
        } else {
            BlockAction::Abandon
        }
    }

    pub(super) fn rotations(&self) -> u32 {
        self.rotations
    }
}

/// Scrapes `categories` at `store`, appending to `<output>/<store_id>.jsonl`.
///
/// # Errors
///
/// Returns an error if the browser cannot be launched, the output file
/// cannot be written, or a checkpoint cannot be read or written. Category
/// level failures are recorded in the summary instead.
pub(super) async fn run_store(
    ctx: &RunContext<'_>,
    store: &StoreTarget,
    categories: &[CategoryTarget],
) -> anyhow::Result<StoreSummary> {
    let mut summary = StoreSummary::new(store);

    let done = if ctx.resume {
        checkpoint::load_completed(&ctx.output_dir, &store.store_id).await?
    } else {
        Default::default()
    };
    let pending: Vec<&CategoryTarget> = categories
        .iter()
        .filter(|c| !done.contains(&c.name))
        .collect();
    summary.resumed_skipped = categories.len() - pending.len();
    if pending.is_empty() {
        tracing::info!(store_id = %store.store_id, "every category already completed, skipping store");
        return Ok(summary);
    }

    let sink_path = ctx.output_dir.join(format!("{}.jsonl", store.store_id));
    let mut sink = JsonlSink::create(&sink_path)
        .await
        .with_context(|| format!("failed to prepare {}", sink_path.display()))?;

    let mut session = BrowserSession::launch(&ctx.session, &store.store_id)
        .await
        .with_context(|| format!("failed to launch browser for store {}", store.store_id))?;
    summary.store_context_set = set_store_context(session.page(), store, &ctx.settings).await;

    let result = walk_categories(ctx, store, &pending, &mut session, &mut sink, &mut summary).await;
    session.close().await;
    result?;

    summary.records = sink.written();
    Ok(summary)
}

async fn walk_categories(
    ctx: &RunContext<'_>,
    store: &StoreTarget,
    pending: &[&CategoryTarget],
    session: &mut BrowserSession,
    sink: &mut JsonlSink,
    summary: &mut StoreSummary,
) -> anyhow::Result<()> {
    let mut blocks = BlockTracker::default();

    for (i, category) in pending.iter().enumerate() {
        if *ctx.abort.borrow() {
            tracing::info!(store_id = %store.store_id, "abort requested, stopping store");
            break;
        }

        let report = scrape_category(
            session.page(),
            store,
            category,
            &ctx.settings,
            sink,
            Some(&ctx.abort),
        )
        .await
        .with_context(|| {
            format!(
                "category '{}' failed at store {}",
                category.name, store.store_id
            )
        })?;

        if report.outcome == lowes_scraper::CategoryOutcome::Completed {
            checkpoint::mark_completed(&ctx.output_dir, &store.store_id, &category.name).await?;
        }
        let blocked = report.is_blocked();
        summary.categories.push(report);

        match blocks.observe(
            blocked,
            ctx.config.max_consecutive_blocks,
            ctx.config.max_session_rotations,
        ) {
            BlockAction::Continue => {}
            BlockAction::Rotate => {
                tracing::warn!(
                    store_id = %store.store_id,
                    rotation = blocks.rotations(),
                    "repeated blocks, relaunching browser with a fresh fingerprint"
                );
                let fresh = BrowserSession::launch(&ctx.session, &store.store_id)
                    .await
                    .with_context(|| {
                        format!("failed to relaunch browser for store {}", store.store_id)
                    })?;
                std::mem::replace(session, fresh).close().await;
                summary.store_context_set =
                    set_store_context(session.page(), store, &ctx.settings).await;
                summary.session_rotations = blocks.rotations();
            }
            BlockAction::Abandon => {
                let remaining = pending.len() - i - 1;
                tracing::error!(
                    store_id = %store.store_id,
                    remaining,
                    "store keeps blocking after session rotation, abandoning remaining categories"
                );
                summary.abandoned = true;
                break;
            }
        }
    }
    Ok(())
}
