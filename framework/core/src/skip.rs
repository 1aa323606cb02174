/// Return this error from per-element work to indicate that the element is being skipped.
///
/// This should be used when a single interactive element cannot be measured but the run as a
/// whole is still meaningful. For example, if the element never becomes selectable or its trace
/// artifact cannot be parsed, then that element is reported as skipped and the run continues with
/// the remaining elements.
#[derive(derive_more::Error, derive_more::Display, Debug, Clone, PartialEq)]
#[display("Skipping element [{element}]: {reason}")]
pub struct SkipElementError {
    element: String,
    reason: String,
}

impl SkipElementError {
    pub fn new(element: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            element: element.into(),
            reason: reason.into(),
        }
    }

    pub fn element(&self) -> &str {
        &self.element
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}
