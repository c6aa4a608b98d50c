//! Review decisions and result materialization
//!
//! A reviewer accepts or rejects each annotation item, may add items of
//! their own, judges the observation, confirms or replaces the implicit
//! intent, and confirms or overrides the safety label. [`ReviewDecisions`]
//! captures that state and turns it into a [`ValidationResult`].
//!
//! [`validate_submission`] is the check the submit endpoint applies to any
//! result, however it was built.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use hhv_common::config::FolderLayout;
use hhv_common::model::{Ofnr, Safety, SafetyLabel, ValidatedOfnr};
use hhv_common::{time, DataRow, Error, Result, ReviewerCategory, ValidationResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObservationDecision {
    NonJudgmental,
    Judgmental,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemDecision {
    Accept,
    Reject,
}

/// Decisions for one list field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChipDecisions {
    pub decisions: HashMap<String, ItemDecision>,
    pub added_items: Vec<String>,
}

impl ChipDecisions {
    pub fn decide(&mut self, item: impl Into<String>, decision: ItemDecision) -> &mut Self {
        self.decisions.insert(item.into(), decision);
        self
    }

    /// Add a reviewer item; it still needs its own decision
    pub fn add(&mut self, item: impl Into<String>) -> &mut Self {
        let item = item.into();
        if !self.added_items.contains(&item) {
            self.added_items.push(item);
        }
        self
    }

    /// Original items followed by added ones, first occurrence wins
    fn all_items<'a>(&'a self, original: &'a [String]) -> Vec<&'a str> {
        let mut seen = HashSet::new();
        original
            .iter()
            .chain(self.added_items.iter())
            .map(String::as_str)
            .filter(|item| seen.insert(*item))
            .collect()
    }

    /// Every item has a decision; an empty field is complete
    pub fn is_complete(&self, original: &[String]) -> bool {
        self.all_items(original)
            .iter()
            .all(|item| self.decisions.contains_key(*item))
    }

    /// Accepted items in display order
    pub fn accepted(&self, original: &[String]) -> Vec<String> {
        self.all_items(original)
            .into_iter()
            .filter(|item| self.decisions.get(*item) == Some(&ItemDecision::Accept))
            .map(str::to_string)
            .collect()
    }
}

/// Everything a reviewer decides about one row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewDecisions {
    pub observation: Option<ObservationDecision>,
    pub feeling: ChipDecisions,
    pub need: ChipDecisions,
    pub explicit_need: ChipDecisions,
    pub implicit_need: ChipDecisions,
    pub explicit_request: ChipDecisions,
    pub implicit_request: ChipDecisions,
    pub implicit_intent: Option<ItemDecision>,
    /// Replacement text used when the implicit intent is rejected
    pub implicit_intent_custom: String,
    pub safety_label: Option<SafetyLabel>,
    pub safety_reason: String,
    /// Required when the label differs from the source label
    pub safety_change_reason: String,
}

impl ReviewDecisions {
    /// Fresh decisions for `row`, with safety pre-filled from the source
    pub fn for_row(row: &DataRow) -> Self {
        Self {
            safety_label: row.safety.as_ref().map(|s| s.label),
            safety_reason: row
                .safety
                .as_ref()
                .map(|s| s.reason.clone())
                .unwrap_or_default(),
            ..Self::default()
        }
    }

    fn chip_fields<'a>(&'a self, ofnr: &'a Ofnr) -> [(&'static str, &'a ChipDecisions, &'a [String]); 6] {
        [
            ("feeling", &self.feeling, ofnr.feeling.as_slice()),
            ("need", &self.need, ofnr.need.as_slice()),
            ("explicit_need", &self.explicit_need, ofnr.explicit_need.as_slice()),
            ("implicit_need", &self.implicit_need, ofnr.implicit_need.as_slice()),
            ("explicit_request", &self.explicit_request, ofnr.explicit_request.as_slice()),
            ("implicit_request", &self.implicit_request, ofnr.implicit_request.as_slice()),
        ]
    }

    /// The reviewer picked a label different from the source label
    pub fn safety_changed(&self, row: &DataRow) -> bool {
        match (row.safety.as_ref(), self.safety_label) {
            (Some(source), Some(chosen)) => source.label != chosen,
            _ => false,
        }
    }

    /// Names of the decisions still outstanding
    pub fn missing(&self, row: &DataRow) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.observation.is_none() {
            missing.push("observation");
        }
        for (name, decisions, original) in self.chip_fields(&row.ofnr) {
            if !decisions.is_complete(original) {
                missing.push(name);
            }
        }
        match self.implicit_intent {
            None => missing.push("implicit_intent"),
            Some(ItemDecision::Reject) if self.implicit_intent_custom.trim().is_empty() => {
                missing.push("implicit_intent")
            }
            _ => {}
        }
        if self.safety_label.is_none() {
            missing.push("safety_label");
        } else if self.safety_changed(row) && self.safety_change_reason.trim().is_empty() {
            missing.push("safety_change_reason");
        }
        missing
    }

    pub fn is_complete(&self, row: &DataRow) -> bool {
        self.missing(row).is_empty()
    }

    /// Build the result to submit for `row`
    ///
    /// Fails with `InvalidInput` naming the outstanding decisions when the
    /// review is incomplete.
    pub fn materialize(
        &self,
        row: &DataRow,
        folder: &str,
        category: ReviewerCategory,
        validated_at: DateTime<Utc>,
    ) -> Result<ValidationResult> {
        let missing = self.missing(row);
        if !missing.is_empty() {
            return Err(Error::InvalidInput(format!(
                "Incomplete review for {}: {}",
                row.id,
                missing.join(", ")
            )));
        }

        let label = self
            .safety_label
            .ok_or_else(|| Error::InvalidInput("Safety label not chosen".to_string()))?;
        let reason = if self.safety_changed(row) {
            self.safety_change_reason.trim().to_string()
        } else {
            self.safety_reason.clone()
        };

        let implicit_intent = match self.implicit_intent {
            Some(ItemDecision::Accept) => row.ofnr.implicit_intent.clone(),
            _ => self.implicit_intent_custom.trim().to_string(),
        };

        Ok(ValidationResult {
            id: row.id.clone(),
            folder: folder.to_string(),
            validated_at: time::to_rfc3339(validated_at),
            validator_type: category,
            prompt: row.prompt.clone(),
            context: row.context.clone(),
            human_chosen_response: row.human_chosen_response.clone(),
            human_rejected_response: row.human_rejected_response.clone(),
            ofnr: ValidatedOfnr {
                observation: row.ofnr.observation.clone(),
                observation_is_judgmental: self.observation == Some(ObservationDecision::Judgmental),
                feeling: self.feeling.accepted(&row.ofnr.feeling),
                need: self.need.accepted(&row.ofnr.need),
                explicit_need: self.explicit_need.accepted(&row.ofnr.explicit_need),
                implicit_need: self.implicit_need.accepted(&row.ofnr.implicit_need),
                explicit_request: self.explicit_request.accepted(&row.ofnr.explicit_request),
                implicit_request: self.implicit_request.accepted(&row.ofnr.implicit_request),
                implicit_intent,
                pseudo_feelings_detected: row.ofnr.pseudo_feelings_detected.clone(),
            },
            metadata: row.metadata.clone(),
            safety: Safety { label, reason },
            quality: row.quality.clone(),
            flags: row.flags.clone(),
        })
    }
}

/// Checks a submitted result must pass before it reaches the engine
///
/// - id is non-empty
/// - `folder` is one of the folders configured for the result's category
///   and matches the folder recorded in the result
/// - if the source row is known and the label was overridden, the reason
///   is non-blank
pub fn validate_submission(
    result: &ValidationResult,
    folder: &str,
    layout: &FolderLayout,
    source: Option<&DataRow>,
) -> Result<()> {
    if result.id.trim().is_empty() {
        return Err(Error::InvalidInput("Result id is empty".to_string()));
    }
    if !layout.contains(result.validator_type, folder) {
        return Err(Error::InvalidInput(format!(
            "Folder '{}' is not configured for {} reviewers",
            folder, result.validator_type
        )));
    }
    if result.folder != folder {
        return Err(Error::InvalidInput(format!(
            "Result folder '{}' does not match submitted folder '{}'",
            result.folder, folder
        )));
    }

    let source_label = source.and_then(|row| row.safety.as_ref()).map(|s| s.label);
    if let Some(source_label) = source_label {
        if source_label != result.safety.label && result.safety.reason.trim().is_empty() {
            return Err(Error::InvalidInput(format!(
                "Safety label for {} changed without a reason",
                result.id
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use hhv_common::model::Quality;

    fn row() -> DataRow {
        serde_json::from_value(serde_json::json!({
            "id": "a",
            "prompt": "prompt text",
            "context": "ctx",
            "human_chosen_response": "chosen",
            "human_rejected_response": "rejected",
            "ofnr": {
                "observation": "They arrived at 9.",
                "feeling": ["frustrated", "tired"],
                "need": ["rest"],
                "explicit_need": [],
                "implicit_need": [],
                "explicit_request": [],
                "implicit_request": ["be on time"],
                "implicit_intent": "wants punctuality",
                "pseudo_feelings_detected": ["disrespected"]
            },
            "safety": {"label": "allowed", "reason": "benign"},
            "quality": {"observation_is_nonjudgmental": 1.0, "needs_list_match": 0.5, "overall_confidence": 0.8}
        }))
        .unwrap()
    }

    fn complete_decisions(row: &DataRow) -> ReviewDecisions {
        let mut d = ReviewDecisions::for_row(row);
        d.observation = Some(ObservationDecision::NonJudgmental);
        d.feeling
            .decide("frustrated", ItemDecision::Accept)
            .decide("tired", ItemDecision::Reject)
            .add("annoyed")
            .decide("annoyed", ItemDecision::Accept);
        d.need.decide("rest", ItemDecision::Accept);
        d.implicit_request.decide("be on time", ItemDecision::Reject);
        d.implicit_intent = Some(ItemDecision::Accept);
        d
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_for_row_prefills_safety() {
        let d = ReviewDecisions::for_row(&row());
        assert_eq!(d.safety_label, Some(SafetyLabel::Allowed));
        assert_eq!(d.safety_reason, "benign");
        assert!(!d.safety_changed(&row()));
    }

    #[test]
    fn test_missing_lists_outstanding_decisions() {
        let d = ReviewDecisions::for_row(&row());
        let missing = d.missing(&row());
        assert!(missing.contains(&"observation"));
        assert!(missing.contains(&"feeling"));
        assert!(missing.contains(&"need"));
        assert!(missing.contains(&"implicit_request"));
        assert!(missing.contains(&"implicit_intent"));
        // Empty fields need no decisions
        assert!(!missing.contains(&"explicit_need"));
    }

    #[test]
    fn test_added_item_needs_a_decision() {
        let row = row();
        let mut d = complete_decisions(&row);
        d.need.add("safety");
        assert_eq!(d.missing(&row), vec!["need"]);
    }

    #[test]
    fn test_materialize_keeps_only_accepted_items() {
        let row = row();
        let result = complete_decisions(&row)
            .materialize(&row, "helpful-base", ReviewerCategory::General, at())
            .unwrap();

        assert_eq!(result.id, "a");
        assert_eq!(result.folder, "helpful-base");
        assert_eq!(result.validated_at, "2025-06-01T12:00:00.000Z");
        assert_eq!(result.ofnr.feeling, vec!["frustrated", "annoyed"]);
        assert_eq!(result.ofnr.need, vec!["rest"]);
        assert!(result.ofnr.implicit_request.is_empty());
        assert_eq!(result.ofnr.implicit_intent, "wants punctuality");
        assert!(!result.ofnr.observation_is_judgmental);
        assert_eq!(result.ofnr.pseudo_feelings_detected, vec!["disrespected"]);
        assert_eq!(result.prompt, "prompt text");
        assert_eq!(result.safety.reason, "benign");
        assert_eq!(
            result.quality,
            Some(Quality {
                observation_is_nonjudgmental: 1.0,
                needs_list_match: 0.5,
                overall_confidence: 0.8,
            })
        );
    }

    #[test]
    fn test_rejected_intent_uses_custom_text() {
        let row = row();
        let mut d = complete_decisions(&row);
        d.implicit_intent = Some(ItemDecision::Reject);
        assert_eq!(d.missing(&row), vec!["implicit_intent"]);

        d.implicit_intent_custom = "  wants an apology ".to_string();
        let result = d
            .materialize(&row, "f", ReviewerCategory::General, at())
            .unwrap();
        assert_eq!(result.ofnr.implicit_intent, "wants an apology");
    }

    #[test]
    fn test_changed_label_requires_change_reason() {
        let row = row();
        let mut d = complete_decisions(&row);
        d.safety_label = Some(SafetyLabel::Disallowed);

        assert!(d.safety_changed(&row));
        assert_eq!(d.missing(&row), vec!["safety_change_reason"]);
        let err = d
            .materialize(&row, "f", ReviewerCategory::General, at())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_changed_label_stores_change_reason_not_original() {
        let row = row();
        let mut d = complete_decisions(&row);
        d.safety_label = Some(SafetyLabel::Disallowed);
        d.safety_change_reason = "asks for weapon instructions".to_string();

        let result = d
            .materialize(&row, "f", ReviewerCategory::Lawyers, at())
            .unwrap();
        assert_eq!(result.safety.label, SafetyLabel::Disallowed);
        assert_eq!(result.safety.reason, "asks for weapon instructions");
        assert_eq!(result.validator_type, ReviewerCategory::Lawyers);
    }

    #[test]
    fn test_judgmental_observation() {
        let row = row();
        let mut d = complete_decisions(&row);
        d.observation = Some(ObservationDecision::Judgmental);
        let result = d
            .materialize(&row, "f", ReviewerCategory::General, at())
            .unwrap();
        assert!(result.ofnr.observation_is_judgmental);
    }

    #[test]
    fn test_validate_submission_rules() {
        let row = row();
        let layout = FolderLayout::default();
        let mut result = complete_decisions(&row)
            .materialize(&row, "helpful-base", ReviewerCategory::General, at())
            .unwrap();

        assert!(validate_submission(&result, "helpful-base", &layout, Some(&row)).is_ok());

        // Folder not configured for the category
        assert!(validate_submission(&result, "red-team-attempts", &layout, Some(&row)).is_err());
        // Folder mismatch between body and result
        assert!(validate_submission(&result, "harmless-base", &layout, Some(&row)).is_err());

        // Label changed with blank reason
        result.safety = Safety {
            label: SafetyLabel::Disallowed,
            reason: "   ".to_string(),
        };
        assert!(validate_submission(&result, "helpful-base", &layout, Some(&row)).is_err());
        // Unknown source row cannot be compared
        assert!(validate_submission(&result, "helpful-base", &layout, None).is_ok());

        result.safety.reason = "contains a threat".to_string();
        assert!(validate_submission(&result, "helpful-base", &layout, Some(&row)).is_ok());

        result.id = String::new();
        assert!(validate_submission(&result, "helpful-base", &layout, Some(&row)).is_err());
    }
}
