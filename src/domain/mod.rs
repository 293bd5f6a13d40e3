pub mod compliance;
pub mod document;
pub mod error;
pub mod jira;
pub mod llm_config;
pub mod test_case;
pub mod workflow;
