//! SOAP report prompt.

const SOAP_TEMPLATE: &str = "\
You are an expert medical assistant. Based on the following patient data and retrieved medical documents, generate a detailed, structured medical report in SOAP format.

Patient Input:
{patient_input}

Relevant Medical Information:
{retrieved_context_1}
{retrieved_context_2}

Please provide the report with these sections:

Subjective:
- Patient's symptoms and complaints

Assessment:
- Possible diagnoses or clinical impressions

Plan:
- Recommended tests, treatments, and next steps

Write clearly and professionally.
";

/// Values substituted into the SOAP template.
#[derive(Debug, Clone, Copy)]
pub struct PromptInputs<'a> {
    /// Text extracted from the patient's document.
    pub patient_input: &'a str,
    /// Rendered lab-test context.
    pub retrieved_context_1: &'a str,
    /// Rendered chatbot-transcript context.
    pub retrieved_context_2: &'a str,
}

/// Render the SOAP prompt.
///
/// Substitution is single-pass so braces inside patient text are never re-expanded.
pub fn render_prompt(inputs: PromptInputs<'_>) -> String {
    let mut output = String::with_capacity(
        SOAP_TEMPLATE.len()
            + inputs.patient_input.len()
            + inputs.retrieved_context_1.len()
            + inputs.retrieved_context_2.len(),
    );
    let mut rest = SOAP_TEMPLATE;
    while let Some(start) = rest.find('{') {
        output.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            output.push_str(&rest[start..]);
            return output;
        };
        match &after[..end] {
            "patient_input" => output.push_str(inputs.patient_input),
            "retrieved_context_1" => output.push_str(inputs.retrieved_context_1),
            "retrieved_context_2" => output.push_str(inputs.retrieved_context_2),
            other => {
                output.push('{');
                output.push_str(other);
                output.push('}');
            }
        }
        rest = &after[end + 1..];
    }
    output.push_str(rest);
    output
}
