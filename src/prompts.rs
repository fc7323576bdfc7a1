//! The audit instruction sent ahead of the data room.
//!
//! The instruction is the first element of every model input list. Keeping it
//! here, rather than inline in the request code, means a prompt change never
//! touches upload or rendering logic, and tests can inspect it directly.
//!
//! Callers can override it via [`crate::config::AuditConfig::instruction`];
//! this constant is used only when no override is provided.

/// Default instruction for a multimodal due-diligence audit.
pub const AUDIT_INSTRUCTION: &str = r#"You are a Senior M&A Legal Auditor. Analyze the provided documents as a single 'Data Room'.
1. Find conflicting clauses (e.g., Change of Control terms).
2. Match visual evidence (images) with text descriptions in contracts.
3. Highlight 'Invisible Risks' like handwritten notes or missing signatures.
4. Provide a 'Liability Heatmap' and cite page numbers/file names."#;
