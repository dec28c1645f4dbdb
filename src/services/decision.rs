use crate::models::decision::FALLBACK_QUESTION;
use crate::models::{CatalogEntry, ModelDecision, ValidatedDecision};
use crate::services::ai::invoker::strip_vendor_prefix;
use crate::services::prompt::MAX_RECOMMENDATIONS;

/// Grounds a decision in the catalog snapshot. Never fails: a recommendation
/// left with no known ids is downgraded to the canned clarification.
pub fn validate(decision: ModelDecision, catalog: &[CatalogEntry]) -> ValidatedDecision {
    match decision {
        ModelDecision::Recommend {
            message,
            service_ids,
        } => {
            let mut grounded: Vec<String> = Vec::with_capacity(MAX_RECOMMENDATIONS);
            for id in service_ids {
                let Some(entry) = ground(&id, catalog) else {
                    tracing::warn!(service_id = %id, "model returned id not in catalog");
                    continue;
                };
                if grounded.contains(&entry.id) {
                    continue;
                }
                if grounded.len() == MAX_RECOMMENDATIONS {
                    tracing::warn!(service_id = %id, "dropping recommendation beyond limit");
                    continue;
                }
                grounded.push(entry.id.clone());
            }

            if grounded.is_empty() {
                tracing::warn!("recommend decision has no grounded services, downgrading");
                return ValidatedDecision::fallback();
            }

            ValidatedDecision::Recommend {
                message,
                service_ids: grounded,
            }
        }
        ModelDecision::Clarify {
            message,
            clarification_question,
        } => ValidatedDecision::Clarify {
            message,
            clarification_question: clarification_question
                .filter(|q| !q.trim().is_empty())
                .unwrap_or_else(|| FALLBACK_QUESTION.to_string()),
        },
    }
}

/// Exact id first, then the id without a vendor prefix.
fn ground<'a>(id: &str, catalog: &'a [CatalogEntry]) -> Option<&'a CatalogEntry> {
    catalog.iter().find(|entry| entry.id == id).or_else(|| {
        let stripped = strip_vendor_prefix(id);
        catalog.iter().find(|entry| entry.id == stripped)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(ids: &[&str]) -> Vec<CatalogEntry> {
        ids.iter()
            .map(|id| CatalogEntry {
                id: id.to_string(),
                title: format!("Service {id}"),
                description: None,
                price: 10.0,
                duration: 30,
                category: None,
                subcategory: None,
                provider_id: "p1".to_string(),
                provider_display_name: Some("Pro".to_string()),
            })
            .collect()
    }

    fn recommend(ids: &[&str]) -> ModelDecision {
        ModelDecision::Recommend {
            message: "Found some!".to_string(),
            service_ids: ids.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_grounded_recommend_passes_through() {
        let validated = validate(recommend(&["S1"]), &catalog(&["S1", "S2"]));
        assert_eq!(
            validated,
            ValidatedDecision::Recommend {
                message: "Found some!".to_string(),
                service_ids: vec!["S1".to_string()],
            }
        );
    }

    #[test]
    fn test_fabricated_ids_are_removed() {
        let validated = validate(recommend(&["S9", "S2"]), &catalog(&["S1", "S2"]));
        match validated {
            ValidatedDecision::Recommend { service_ids, .. } => assert_eq!(service_ids, vec!["S2"]),
            other => panic!("expected recommend, got {other:?}"),
        }
    }

    #[test]
    fn test_only_fabricated_ids_downgrades() {
        let validated = validate(recommend(&["S9"]), &catalog(&["S1"]));
        assert_eq!(validated, ValidatedDecision::fallback());
    }

    #[test]
    fn test_empty_catalog_always_downgrades() {
        let validated = validate(recommend(&["S1"]), &[]);
        assert!(matches!(validated, ValidatedDecision::Clarify { .. }));
    }

    #[test]
    fn test_empty_recommend_downgrades() {
        let validated = validate(recommend(&[]), &catalog(&["S1"]));
        assert_eq!(validated, ValidatedDecision::fallback());
    }

    #[test]
    fn test_recommendations_capped_at_three() {
        let validated = validate(
            recommend(&["a", "b", "c", "d"]),
            &catalog(&["a", "b", "c", "d"]),
        );
        match validated {
            ValidatedDecision::Recommend { service_ids, .. } => {
                assert_eq!(service_ids, vec!["a", "b", "c"])
            }
            other => panic!("expected recommend, got {other:?}"),
        }
    }

    #[test]
    fn test_prefixed_catalog_id_is_matched_as_given() {
        let validated = validate(recommend(&["svc_S1"]), &catalog(&["svc_S1", "S1"]));
        match validated {
            ValidatedDecision::Recommend { service_ids, .. } => assert_eq!(service_ids, vec!["svc_S1"]),
            other => panic!("expected recommend, got {other:?}"),
        }
    }

    #[test]
    fn test_vendor_prefix_is_stripped_when_needed() {
        let validated = validate(
            recommend(&["svc_S1", "id:S2", "S1"]),
            &catalog(&["S1", "S2"]),
        );
        match validated {
            ValidatedDecision::Recommend { service_ids, .. } => assert_eq!(service_ids, vec!["S1", "S2"]),
            other => panic!("expected recommend, got {other:?}"),
        }
    }

    #[test]
    fn test_clarify_without_question_gets_generic_question() {
        let validated = validate(
            ModelDecision::Clarify {
                message: "Which room?".to_string(),
                clarification_question: None,
            },
            &catalog(&["S1"]),
        );
        assert_eq!(
            validated,
            ValidatedDecision::Clarify {
                message: "Which room?".to_string(),
                clarification_question: FALLBACK_QUESTION.to_string(),
            }
        );
    }
}
