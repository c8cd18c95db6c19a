use chrono::NaiveDate;
use serde::Serialize;

use crate::row::ImportedTransaction;
use crate::util::name_similarity;

/// Confidence assigned to every stage-1 (exact amount + date window) hit.
/// Doubles as the default auto-link threshold.
pub const EXACT_MATCH_CONFIDENCE: f32 = 0.95;

/// A rental payment pulled from storage as a potential match target.
#[derive(Debug, Clone)]
pub struct PaymentCandidate {
    pub payment_id: i64,
    pub tenant_name: String,
    pub amount_cents: i64,
    pub paid_on: NaiveDate,
}

/// A scored match for one imported transaction. Zero, one or many per
/// transaction; persisted only when linked.
#[derive(Debug, Clone, Serialize)]
pub struct MatchCandidate {
    pub payment_id: i64,
    pub confidence: f32,
    pub reason: String,
}

/// Candidate queries the matcher delegates to storage. The matcher owns
/// scoring and ranking; it never writes.
#[allow(async_fn_in_trait)]
pub trait PaymentLookup {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Unlinked payments with this exact amount whose date falls within
    /// `window_days` of `date` (inclusive, either direction).
    async fn find_by_amount_and_date_window(
        &self,
        amount_cents: i64,
        date: NaiveDate,
        window_days: i64,
    ) -> Result<Vec<PaymentCandidate>, Self::Error>;

    /// Unlinked payments within `tolerance_cents` of the amount, any date.
    async fn find_by_fuzzy_amount(
        &self,
        amount_cents: i64,
        tolerance_cents: i64,
    ) -> Result<Vec<PaymentCandidate>, Self::Error>;
}

/// Two-stage matcher for imported bank transactions: exact amount within a
/// date window first, then fuzzy amount plus tenant-name similarity. A
/// non-empty stage 1 short-circuits stage 2.
pub struct MatchEngine {
    pub date_window_days: i64,
    pub amount_tolerance_cents: i64,
    pub fuzzy_threshold: f32,
    pub auto_link_threshold: f32,
}

impl Default for MatchEngine {
    fn default() -> Self {
        Self {
            date_window_days: 7,
            amount_tolerance_cents: 1000,
            fuzzy_threshold: 0.5,
            auto_link_threshold: EXACT_MATCH_CONFIDENCE,
        }
    }
}

impl MatchEngine {
    pub fn new(
        date_window_days: i64,
        amount_tolerance_cents: i64,
        fuzzy_threshold: f32,
        auto_link_threshold: f32,
    ) -> Self {
        Self {
            date_window_days,
            amount_tolerance_cents,
            fuzzy_threshold,
            auto_link_threshold,
        }
    }

    /// Candidates for one transaction, sorted by confidence descending.
    /// The fuzzy query is only issued when stage 1 comes back empty and the
    /// transaction carries a usable description.
    pub async fn find_matches<R: PaymentLookup>(
        &self,
        tx: &ImportedTransaction,
        repo: &R,
    ) -> Result<Vec<MatchCandidate>, R::Error> {
        let exact = repo
            .find_by_amount_and_date_window(tx.amount_cents, tx.date, self.date_window_days)
            .await?;
        let mut candidates = self.stage_exact(&exact);

        if candidates.is_empty() && !tx.description.trim().is_empty() {
            let near = repo
                .find_by_fuzzy_amount(tx.amount_cents, self.amount_tolerance_cents)
                .await?;
            candidates = self.stage_fuzzy(&tx.description, &near);
        }

        Ok(candidates)
    }

    pub fn stage_exact(&self, hits: &[PaymentCandidate]) -> Vec<MatchCandidate> {
        let mut candidates: Vec<MatchCandidate> = hits
            .iter()
            .map(|p| MatchCandidate {
                payment_id: p.payment_id,
                confidence: EXACT_MATCH_CONFIDENCE,
                reason: "exact amount + date match".to_string(),
            })
            .collect();
        sort_candidates(&mut candidates);
        candidates
    }

    pub fn stage_fuzzy(
        &self,
        description: &str,
        near: &[PaymentCandidate],
    ) -> Vec<MatchCandidate> {
        let mut candidates: Vec<MatchCandidate> = near
            .iter()
            .filter_map(|p| {
                let score = name_similarity(description, &p.tenant_name);
                if score <= self.fuzzy_threshold {
                    return None;
                }
                let confidence = round2(score);
                Some(MatchCandidate {
                    payment_id: p.payment_id,
                    confidence,
                    reason: format!("description similarity {:.0}%", score * 100.0),
                })
            })
            .collect();
        sort_candidates(&mut candidates);
        candidates
    }

    /// The auto-link rule: fires only for exactly one candidate at or above
    /// the threshold. Anything else goes to manual review.
    pub fn auto_link_candidate<'a>(
        &self,
        candidates: &'a [MatchCandidate],
    ) -> Option<&'a MatchCandidate> {
        match candidates {
            [single] if single.confidence >= self.auto_link_threshold => Some(single),
            _ => None,
        }
    }
}

/// Confidence descending; ties broken by ascending payment id so a given
/// input always ranks the same way.
fn sort_candidates(candidates: &mut [MatchCandidate]) {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.payment_id.cmp(&b.payment_id))
    });
}

fn round2(x: f32) -> f32 {
    (x * 100.0).round() / 100.0
}
