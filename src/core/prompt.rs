use crate::domain::model::FIXED_FIELDS;

pub const SYSTEM_INSTRUCTION: &str = "You are a data extraction assistant. Always respond with a single valid JSON object. Do not include markdown, text, or explanations.";

const FIELD_GUIDANCE: &str = "'CDMO Requirement' should state whether the company is likely to require CDMO services (Yes/No).\n\
'CDMO Use Case' should describe how the company could potentially use CDMO services (e.g., for drug development, manufacturing, scaling production, etc.).\n\
'Company Contacts' should provide a list of relevant contact persons in the company with their designations, names, and email IDs. Use realistic placeholders if actual data is not available.\n\n\
Respond strictly in JSON format without any additional explanation or markdown formatting.";

/// Field list plus output rules shared by every workflow prompt.
///
/// Extra fields keep caller order and are not deduplicated.
pub fn build_prompt(extra_fields: &[String]) -> String {
    let mut fields: Vec<&str> = FIXED_FIELDS.to_vec();
    fields.extend(extra_fields.iter().map(String::as_str));

    let mut prompt = String::new();
    prompt.push('[');
    prompt.push_str(&fields.join(", "));
    prompt.push_str("].\n\n");
    prompt.push_str(FIELD_GUIDANCE);
    prompt
}

pub fn company_prompt(company: &str, extra_fields: &[String]) -> String {
    format!(
        "Provide a structured JSON for the company '{}' with the following keys:\n{}",
        company,
        build_prompt(extra_fields)
    )
}

pub fn market_search_prompt(market_filter: &str, extra_fields: &[String]) -> String {
    format!(
        "Identify global pharma or biotech companies that are working on: {}.\n\n\
         For each company found, provide a structured JSON with the following keys:\n{}",
        market_filter.trim(),
        build_prompt(extra_fields)
    )
}

/// 逗號分隔的自由輸入：去除空白並略過空項目
pub fn parse_extra_fields(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .map(str::to_string)
        .collect()
}
