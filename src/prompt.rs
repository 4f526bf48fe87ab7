use crate::diagnostics::ErrorRecord;
use crate::snippet::Snippet;

/// Build the fix-request prompt for one diagnostic.
///
/// The error line and the snippet are substituted into a fixed template; an
/// empty snippet leaves an empty code block.
pub fn build_prompt(error: &ErrorRecord, snippet: &Snippet) -> String {
    render(&error.to_string(), &snippet.to_string())
}

/// Substitute raw text into the template
pub fn render(error: &str, code: &str) -> String {
    format!(
        "**Error:** {error}\n\
         **Code Snippet:**\n\
         ```typescript\n\
         {code}\n\
         ```\n\
         **Instruction:** How can I resolve this error?\n"
    )
}
