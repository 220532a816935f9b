// User-facing messages for parse failures. Shown verbatim on the intake screen.

/// Non-2xx reply that carried no `message` of its own.
pub const REJECTED_FALLBACK: &str =
    "Failed to parse job description. Please try again or skip this step.";

/// The request went out but nothing came back.
pub const NO_RESPONSE: &str = "No response from server. Please try again later.";

/// The request could not be built or sent.
pub const GENERIC_FAILURE: &str =
    "An error occurred while processing the job description. Please try again.";
