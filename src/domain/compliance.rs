use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComplianceStandard {
    #[serde(rename = "fda")]
    Fda,
    #[serde(rename = "iec62304")]
    Iec62304,
    #[serde(rename = "iso13485")]
    Iso13485,
    #[serde(rename = "gdpr")]
    Gdpr,
}

impl ComplianceStandard {
    pub const ALL: [ComplianceStandard; 4] = [
        ComplianceStandard::Fda,
        ComplianceStandard::Iec62304,
        ComplianceStandard::Iso13485,
        ComplianceStandard::Gdpr,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            ComplianceStandard::Fda => "fda",
            ComplianceStandard::Iec62304 => "iec62304",
            ComplianceStandard::Iso13485 => "iso13485",
            ComplianceStandard::Gdpr => "gdpr",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ComplianceStandard::Fda => "FDA",
            ComplianceStandard::Iec62304 => "IEC 62304",
            ComplianceStandard::Iso13485 => "ISO 13485",
            ComplianceStandard::Gdpr => "GDPR",
        }
    }

    /// Accepts the spellings models tend to produce ("IEC 62304", "iec", "ISO-13485").
    pub fn parse(value: &str) -> Option<Self> {
        let key: String = value
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "fda" | "fda21cfr" | "fda21cfrpart11" | "21cfrpart11" => Some(ComplianceStandard::Fda),
            "iec" | "iec62304" => Some(ComplianceStandard::Iec62304),
            "iso" | "iso13485" => Some(ComplianceStandard::Iso13485),
            "gdpr" => Some(ComplianceStandard::Gdpr),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardInfo {
    pub id: String,
    pub name: String,
}

pub fn recognized_standards() -> Vec<StandardInfo> {
    ComplianceStandard::ALL
        .iter()
        .map(|standard| StandardInfo {
            id: standard.id().to_string(),
            name: standard.name().to_string(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceIssue {
    pub test_case_id: String,
    pub standard_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceReport {
    #[serde(default)]
    pub issues: Vec<ComplianceIssue>,
}

impl ComplianceReport {
    /// One status per (test case, standard) pair, in test-case order.
    pub fn matrix(&self, test_case_ids: &[String]) -> Vec<ComplianceResult> {
        let mut results = Vec::with_capacity(test_case_ids.len() * ComplianceStandard::ALL.len());
        for test_case_id in test_case_ids {
            for standard in ComplianceStandard::ALL {
                let reasons: Vec<&str> = self
                    .issues
                    .iter()
                    .filter(|issue| {
                        issue.test_case_id == *test_case_id && issue.standard_id == standard.id()
                    })
                    .map(|issue| issue.reason.as_str())
                    .collect();
                let (status, feedback) = if reasons.is_empty() {
                    (ComplianceStatus::Passed, None)
                } else {
                    (ComplianceStatus::Failed, Some(reasons.join("\n")))
                };
                results.push(ComplianceResult {
                    test_case_id: test_case_id.clone(),
                    standard_id: standard.id().to_string(),
                    status,
                    feedback,
                });
            }
        }
        results
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplianceStatus {
    Passed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceResult {
    pub test_case_id: String,
    pub standard_id: String,
    pub status: ComplianceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}
