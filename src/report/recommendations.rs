use crate::events::Category;
use crate::thresholds::Violation;
use serde::{Deserialize, Serialize};

/// Kind of a recommendation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendationKind {
    /// Every threshold was met
    Success,
    Performance,
    Reliability,
    Functionality,
}

impl From<Category> for RecommendationKind {
    fn from(category: Category) -> Self {
        match category {
            Category::Performance => RecommendationKind::Performance,
            Category::Reliability => RecommendationKind::Reliability,
            Category::Functionality => RecommendationKind::Functionality,
        }
    }
}

/// Remediation advice attached to a report
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: RecommendationKind,
    pub message: String,
}

impl Recommendation {
    /// The single recommendation for a run without violations
    pub fn success() -> Self {
        Self {
            kind: RecommendationKind::Success,
            message: "All performance thresholds met! 🎉".to_string(),
        }
    }

    /// Static advice for a violation category
    pub fn for_category(category: Category) -> Self {
        let message = match category {
            Category::Performance => {
                "Consider optimizing API endpoints or increasing server resources to improve response times."
            }
            Category::Reliability => {
                "Investigate API errors and improve error handling to reduce failure rates."
            }
            Category::Functionality => {
                "Review test assertions and ensure API endpoints are working correctly."
            }
        };

        Self {
            kind: category.into(),
            message: message.to_string(),
        }
    }

    /// Whether this is the success recommendation
    pub fn is_success(&self) -> bool {
        self.kind == RecommendationKind::Success
    }
}

/// Derive recommendations from an ordered violation list
///
/// Emits one recommendation per distinct category, in the order categories
/// first appear, or a single success recommendation when there are no
/// violations.
pub fn recommend(violations: &[Violation]) -> Vec<Recommendation> {
    if violations.is_empty() {
        return vec![Recommendation::success()];
    }

    let mut seen: Vec<Category> = Vec::with_capacity(3);
    for violation in violations {
        if !seen.contains(&violation.category) {
            seen.push(violation.category);
        }
    }

    seen.into_iter().map(Recommendation::for_category).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violation(category: Category) -> Violation {
        Violation {
            category,
            metric: "m".to_string(),
            actual: 1.0,
            threshold: 0.0,
            message: "failed".to_string(),
        }
    }

    #[test]
    fn test_success_when_no_violations() {
        let recommendations = recommend(&[]);
        assert_eq!(recommendations.len(), 1);
        assert!(recommendations[0].is_success());
        assert_eq!(
            recommendations[0].message,
            "All performance thresholds met! 🎉"
        );
    }

    #[test]
    fn test_one_per_distinct_category_in_first_seen_order() {
        let violations = vec![
            violation(Category::Reliability),
            violation(Category::Performance),
            violation(Category::Reliability),
        ];
        let kinds: Vec<RecommendationKind> =
            recommend(&violations).into_iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![RecommendationKind::Reliability, RecommendationKind::Performance]
        );
    }

    #[test]
    fn test_category_messages() {
        assert!(Recommendation::for_category(Category::Performance)
            .message
            .contains("optimizing API endpoints"));
        assert!(Recommendation::for_category(Category::Reliability)
            .message
            .contains("Investigate API errors"));
        assert!(Recommendation::for_category(Category::Functionality)
            .message
            .contains("Review test assertions"));
    }

    #[test]
    fn test_recommendation_serialization() {
        let json = serde_json::to_value(Recommendation::success()).unwrap();
        assert_eq!(json["type"], "SUCCESS");

        let json = serde_json::to_value(Recommendation::for_category(Category::Functionality)).unwrap();
        assert_eq!(json["type"], "FUNCTIONALITY");
    }
}
