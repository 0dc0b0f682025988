//! Red flag analysis types.
//!
//! A submission is classified into a [`ContentCategory`], analyzed by the
//! model, and the parsed answer is an [`AnalysisResult`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The everyday context a submission comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentCategory {
    DatingProfile,
    Conversation,
    JobPosting,
    HousingListing,
    MarketplaceListing,
}

impl ContentCategory {
    /// All categories in tie-break order.
    pub const ALL: [ContentCategory; 5] = [
        ContentCategory::DatingProfile,
        ContentCategory::Conversation,
        ContentCategory::JobPosting,
        ContentCategory::HousingListing,
        ContentCategory::MarketplaceListing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentCategory::DatingProfile => "dating_profile",
            ContentCategory::Conversation => "conversation",
            ContentCategory::JobPosting => "job_posting",
            ContentCategory::HousingListing => "housing_listing",
            ContentCategory::MarketplaceListing => "marketplace_listing",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            ContentCategory::DatingProfile => "Dating profile",
            ContentCategory::Conversation => "Conversation",
            ContentCategory::JobPosting => "Job posting",
            ContentCategory::HousingListing => "Housing listing",
            ContentCategory::MarketplaceListing => "Marketplace listing",
        }
    }
}

impl fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "dating_profile" | "dating" | "profile" => Ok(ContentCategory::DatingProfile),
            "conversation" | "chat" | "messages" | "text_conversation" => {
                Ok(ContentCategory::Conversation)
            }
            "job_posting" | "job" | "job_offer" | "job_listing" => Ok(ContentCategory::JobPosting),
            "housing_listing" | "housing" | "rental" | "apartment" | "rental_listing" => {
                Ok(ContentCategory::HousingListing)
            }
            "marketplace_listing" | "marketplace" | "listing" | "product_listing" => {
                Ok(ContentCategory::MarketplaceListing)
            }
            other => Err(format!("invalid content category: '{other}'")),
        }
    }
}

/// Severity of a single red flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" | "minor" | "mild" => Ok(Severity::Low),
            "medium" | "moderate" | "med" => Ok(Severity::Medium),
            "high" | "severe" | "critical" | "major" => Ok(Severity::High),
            other => Err(format!("invalid severity: '{other}'")),
        }
    }
}

/// Overall risk bucket, always derived from the numeric score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=24 => RiskLevel::Low,
            25..=49 => RiskLevel::Medium,
            50..=74 => RiskLevel::High,
            _ => RiskLevel::Critical,
        }
    }

    /// Representative score used when the model gives a level but no score.
    pub fn representative_score(&self) -> u8 {
        match self {
            RiskLevel::Low => 15,
            RiskLevel::Medium => 40,
            RiskLevel::High => 65,
            RiskLevel::Critical => 90,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
            RiskLevel::Critical => write!(f, "critical"),
        }
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" | "minimal" | "safe" => Ok(RiskLevel::Low),
            "medium" | "moderate" => Ok(RiskLevel::Medium),
            "high" | "elevated" => Ok(RiskLevel::High),
            "critical" | "severe" | "very_high" | "very high" => Ok(RiskLevel::Critical),
            other => Err(format!("invalid risk level: '{other}'")),
        }
    }
}

/// A single warning sign found in the submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedFlag {
    pub title: String,
    pub description: String,
    pub severity: Severity,
    /// Quoted text from the submission supporting the flag, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
}

/// The validated, normalized analysis returned to users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub category: ContentCategory,
    /// 0 (no concern) to 100 (almost certainly a scam or unsafe).
    pub risk_score: u8,
    pub risk_level: RiskLevel,
    pub summary: String,
    pub red_flags: Vec<RedFlag>,
    pub green_flags: Vec<String>,
    pub recommendations: Vec<String>,
}

impl AnalysisResult {
    /// Highest severity among the flags, if there are any.
    pub fn max_severity(&self) -> Option<Severity> {
        self.red_flags.iter().map(|f| f.severity).max()
    }
}

/// Output of the keyword classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub category: ContentCategory,
    /// 0.0 when nothing matched, 1.0 for an explicit user choice.
    pub confidence: f32,
    /// Raw score per category, in [`ContentCategory::ALL`] order.
    pub scores: Vec<(ContentCategory, u32)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse_variants() {
        assert_eq!("dating-profile".parse::<ContentCategory>().unwrap(), ContentCategory::DatingProfile);
        assert_eq!("Job Posting".parse::<ContentCategory>().unwrap(), ContentCategory::JobPosting);
        assert_eq!("rental".parse::<ContentCategory>().unwrap(), ContentCategory::HousingListing);
        assert_eq!("chat".parse::<ContentCategory>().unwrap(), ContentCategory::Conversation);
        assert!("recipe".parse::<ContentCategory>().is_err());
    }

    #[test]
    fn test_category_serde() {
        let json = serde_json::to_string(&ContentCategory::MarketplaceListing).unwrap();
        assert_eq!(json, "\"marketplace_listing\"");
    }

    #[test]
    fn test_risk_level_boundaries() {
        assert_eq!(RiskLevel::from_score(0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(24), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(25), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(50), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(74), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(75), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_score(100), RiskLevel::Critical);
    }

    #[test]
    fn test_representative_score_maps_back() {
        for level in [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High, RiskLevel::Critical] {
            assert_eq!(RiskLevel::from_score(level.representative_score()), level);
        }
    }

    #[test]
    fn test_severity_synonyms() {
        assert_eq!("Moderate".parse::<Severity>().unwrap(), Severity::Medium);
        assert_eq!("SEVERE".parse::<Severity>().unwrap(), Severity::High);
        assert_eq!("minor".parse::<Severity>().unwrap(), Severity::Low);
    }

    #[test]
    fn test_max_severity() {
        let result = AnalysisResult {
            category: ContentCategory::JobPosting,
            risk_score: 60,
            risk_level: RiskLevel::High,
            summary: String::new(),
            red_flags: vec![
                RedFlag {
                    title: "Upfront fee".to_string(),
                    description: String::new(),
                    severity: Severity::High,
                    evidence: None,
                },
                RedFlag {
                    title: "Vague role".to_string(),
                    description: String::new(),
                    severity: Severity::Low,
                    evidence: None,
                },
            ],
            green_flags: vec![],
            recommendations: vec![],
        };
        assert_eq!(result.max_severity(), Some(Severity::High));
    }
}
