use std::collections::HashSet;

use tally_core::{fields, Bills, ImportSettings};

use crate::error::ImportError;
use crate::warning::{ImportWarning, Warnings};

const REFUND_SEPARATORS: [char; 2] = ['_', '*'];

/// Id of the transaction a refund record points at, or `None` for an
/// ordinary record. Refund ids are non-numeric and carry `_` or `*`; the
/// original id is everything before the first separator.
pub fn original_id(id: &str) -> Option<&str> {
    if id.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    REFUND_SEPARATORS
        .iter()
        .find_map(|sep| id.split_once(*sep).map(|(head, _)| head))
}

/// Folds refund records into their originals.
///
/// Ordinary records pass through. Each refund reduces its original by the
/// refunded amount; a refund that zeroes the original (within `min_amount`)
/// removes it, and one that overshoots fails the whole import. Refunds are
/// never kept on their own, and an original absorbs at most one refund:
/// later refunds against it are treated as orphans.
pub fn reconcile(
    bills: Bills,
    settings: &ImportSettings,
    warnings: &mut Warnings,
) -> Result<Bills, ImportError> {
    let epsilon = settings.min_amount;
    let (refunds, mut kept): (Bills, Bills) = bills
        .into_iter()
        .partition(|(id, _)| original_id(id).is_some());

    let mut consumed: HashSet<String> = HashSet::new();

    for (refund_id, refund) in &refunds {
        let Some(orig_id) = original_id(refund_id) else {
            continue;
        };

        let original = match kept.get_mut(orig_id) {
            Some(original) if !consumed.contains(orig_id) => original,
            _ => {
                let classification = refund.field(fields::CLASSIFICATION).unwrap_or_default();
                if classification != settings.alipay.income_classification {
                    warnings.push(ImportWarning::OrphanRefund {
                        refund_id: refund_id.clone(),
                        original_id: orig_id.to_string(),
                    });
                }
                continue;
            }
        };

        let real_amount = original.amount - refund.amount;
        if real_amount.decimal() < -epsilon.decimal() {
            return Err(ImportError::Refund(refund_id.clone()));
        }

        consumed.insert(orig_id.to_string());
        if real_amount.decimal() <= epsilon.decimal() {
            tracing::debug!("{orig_id} fully refunded by {refund_id}");
            kept.remove(orig_id);
        } else {
            tracing::debug!("{orig_id} partially refunded by {refund_id}: {real_amount}");
            original.amount = real_amount;
        }
    }

    Ok(kept)
}
