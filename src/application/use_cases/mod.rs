pub mod compliance_check;
pub mod document_ingestion;
pub mod grounding;
pub mod jira_export;
pub mod prompts;
pub mod test_case_splitter;
pub mod test_generation;
pub mod workflow;
