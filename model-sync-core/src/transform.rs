//! Prompt contract for the transformation service.
//!
//! Adapters implementing [`crate::contract::Transformer`] build their request from
//! [`SYSTEM_ROLE`] and [`user_message`], and pass the raw completion through
//! [`clean_completion`] so every adapter enforces the same output contract.

use crate::contract::TransformRequest;
use crate::error::SyncError;

/// Fixed role given to the transformation service.
pub const SYSTEM_ROLE: &str = "You are an expert client application developer. \
Update the client-side data structures so they match the new server-side schema exactly. \
Preserve the existing formatting, naming and coding style of the client file.";

const OUTPUT_ONLY: &str = "Return only the complete, updated client file. \
Do not add explanations, comments about the change, or markdown code fences. \
Your entire reply is written to disk as the new file content.";

/// Builds the user payload: both file bodies, optional style hints, and the output-only rule.
pub fn user_message(request: &TransformRequest<'_>) -> String {
    let mut message = format!(
        "Here is the new server model definition:\n\n{}\n\n\
         Here is the current client model file:\n\n{}\n\n\
         Update the client model so it fully matches the server model.",
        request.server_model, request.client_model
    );
    if let Some(style) = request.style_instructions.filter(|s| !s.trim().is_empty()) {
        message.push_str("\n\nAdditional style instructions:\n");
        message.push_str(style.trim());
    }
    message.push_str("\n\n");
    message.push_str(OUTPUT_ONLY);
    message
}

/// Trim the completion and reject empty output.
pub fn clean_completion(raw: &str) -> Result<String, SyncError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SyncError::TransformationService(
            "service returned an empty completion".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request<'a>(style: Option<&'a str>) -> TransformRequest<'a> {
        TransformRequest {
            server_model: "class User:\n    id: int\n    email: str",
            client_model: "struct User: Codable { let id: Int }",
            style_instructions: style,
        }
    }

    #[test]
    fn user_message_contains_both_files_and_output_rule() {
        let msg = user_message(&request(None));
        assert!(msg.contains("email: str"));
        assert!(msg.contains("struct User: Codable"));
        assert!(msg.contains("Return only the complete, updated client file"));
        assert!(!msg.contains("Additional style instructions"));
    }

    #[test]
    fn user_message_includes_style_hints() {
        let msg = user_message(&request(Some("  Use camelCase CodingKeys. ")));
        assert!(msg.contains("Additional style instructions:\nUse camelCase CodingKeys."));
    }

    #[test]
    fn clean_completion_trims_whitespace() {
        assert_eq!(
            clean_completion("\n\n  struct User {}\n  ").unwrap(),
            "struct User {}"
        );
    }

    #[test]
    fn clean_completion_rejects_blank_output() {
        let err = clean_completion(" \n\t ").unwrap_err();
        assert!(matches!(err, SyncError::TransformationService(_)));
    }
}
