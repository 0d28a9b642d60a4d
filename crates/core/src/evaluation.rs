//! Pure bid ranking for a single BOQ. Evaluation never mutates state and
//! is safe to re-run at any time; its result is a recommendation until a
//! selection commits.

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::bid::Bid;
use crate::domain::boq::BoqId;
use crate::errors::DomainError;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationCriteria {
    pub required_qualifications: Vec<String>,
    pub required_quality_certificates: Vec<String>,
    pub max_price_per_unit: Option<Decimal>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub winner: Bid,
    pub submitted_count: usize,
    pub qualifying_count: usize,
}

/// Ranks `bids` and returns the winner: lowest unit price, ties broken by
/// earliest submission, then by bid id so the order is total. Fails with
/// `NoBids` when the ledger is empty and `NoQualifyingBid` when the
/// criteria filter out every candidate; callers surface those separately.
pub fn evaluate(
    boq_id: &BoqId,
    bids: &[Bid],
    criteria: &EvaluationCriteria,
) -> Result<EvaluationReport, DomainError> {
    if bids.is_empty() {
        return Err(DomainError::NoBids(boq_id.0.clone()));
    }

    let required_qualifications = normalize_terms(&criteria.required_qualifications);
    let required_certificates = normalize_terms(&criteria.required_quality_certificates);

    let qualifying: Vec<&Bid> = bids
        .iter()
        .filter(|bid| {
            satisfies_terms(&bid.qualifications, &required_qualifications)
                && satisfies_terms(&bid.quality_certificates, &required_certificates)
                && within_ceiling(bid.price_per_unit, criteria.max_price_per_unit)
        })
        .collect();

    let qualifying_count = qualifying.len();
    let winner = qualifying
        .into_iter()
        .min_by(|a, b| {
            a.price_per_unit
                .cmp(&b.price_per_unit)
                .then_with(|| a.submitted_at.cmp(&b.submitted_at))
                .then_with(|| a.id.0.cmp(&b.id.0))
        })
        .cloned();

    match winner {
        Some(winner) => Ok(EvaluationReport {
            winner,
            submitted_count: bids.len(),
            qualifying_count,
        }),
        None => Err(DomainError::NoQualifyingBid(boq_id.0.clone())),
    }
}

fn normalize_terms(values: &[String]) -> HashSet<String> {
    values
        .iter()
        .map(|value| value.trim().to_ascii_lowercase())
        .filter(|value| !value.is_empty())
        .collect()
}

fn satisfies_terms(held: &[String], required: &HashSet<String>) -> bool {
    if required.is_empty() {
        return true;
    }
    let held = normalize_terms(held);
    required.is_subset(&held)
}

fn within_ceiling(price: Decimal, ceiling: Option<Decimal>) -> bool {
    match ceiling {
        Some(limit) => price <= limit,
        None => true,
    }
}
