// Prompt constants for the Comparison module.

/// Label shown for the first upload slot; the template treats it as the proposal form.
pub const DOC1_LABEL: &str = "Proposal Form";

/// Label shown for the second upload slot; the template treats it as the policy schedule.
pub const DOC2_LABEL: &str = "Policy Schedule";

/// Document comparison prompt. Replace `{doc1}` and `{doc2}` with [`fill_slots`].
///
/// This text is the wire contract with the model provider. Keep it byte-for-byte
/// stable so results stay comparable with earlier transcripts.
pub const COMPARISON_PROMPT_TEMPLATE: &str = r#"Compare the following two documents and provide a detailed analysis:

        Document 1:
        {doc1}

        Document 2:
        {doc2}

        Please perform the following tasks:

        **Document Summaries:**
        1. Provide a summary of each document.

        **Key Differences:**
        1. Identify and list all the key differences between the two documents.

        **Proposal Form Verification:**
        1. Check if the proposal form is fully completed.
        2. Check if the proposal form is signed and dated.
        3. Verify if the date on the proposal form is prior to 30 days of the quotation.
        4. Determine if the business description provided is meaningful and compare if it matches or is similar to the Policy Schedule.
        5. Verify if turnover values for the current year, estimated next year, and previous year are declared. Display these values if present.

        For each of the above checks, indicate:
        - Yes/No for each point based on the content of the proposal form.

        **Risk Location Verification:**
        1. Verify if the proposal form contains a valid address.
        2. Check if the policy schedule shows the same address as the proposal form.
        3. Ensure that risk location details including factors like the location of properties, the policyholder’s usual residence, and the domicile of the company registration are accurately reflected.

        Provide the results in a clear and structured format, including a summary, a comparison section, and specific details for each verification point."#;

/// Substitutes `{name}` slots in a single left-to-right pass.
///
/// Substituted text is never rescanned, so a document that itself contains
/// `{doc2}` is passed through verbatim. Unknown `{...}` sequences are kept as is.
pub fn fill_slots(template: &str, slots: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(
        template.len() + slots.iter().map(|(_, value)| value.len()).sum::<usize>(),
    );
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replaced = after.find('}').and_then(|close| {
            let name = &after[..close];
            slots
                .iter()
                .find(|(slot, _)| *slot == name)
                .map(|(_, value)| (*value, close))
        });
        match replaced {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Fills the comparison template with the two extracted texts.
pub fn render_comparison_prompt(doc1: &str, doc2: &str) -> String {
    fill_slots(COMPARISON_PROMPT_TEMPLATE, &[("doc1", doc1), ("doc2", doc2)])
}
