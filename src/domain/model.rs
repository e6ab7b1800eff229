use crate::utils::error::{IntelError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub const COMPANY_NAME: &str = "Company Name";
pub const COMPANY_CONTACTS: &str = "Company Contacts";
pub const FUNDING: &str = "Funding / Financials";
const FUNDING_ALIAS: &str = "Funding/Financials";

/// 固定欄位，順序即輸出表頭順序
pub const FIXED_FIELDS: [&str; 14] = [
    COMPANY_NAME,
    "Type",
    "Assets",
    "City",
    "State",
    "Country",
    "Region",
    "Website",
    "Latest Update",
    FUNDING,
    "Company Type",
    "CDMO Requirement",
    "CDMO Use Case",
    COMPANY_CONTACTS,
];

/// One company profile as returned by the model.
///
/// Fixed fields are typed; anything else the caller asked for lands in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CompanyRecord {
    #[serde(rename = "Company Name", default, deserialize_with = "display_text")]
    pub company_name: String,
    #[serde(rename = "Type", default, deserialize_with = "display_text")]
    pub company_category: String,
    #[serde(rename = "Assets", default, deserialize_with = "display_text")]
    pub assets: String,
    #[serde(rename = "City", default, deserialize_with = "display_text")]
    pub city: String,
    #[serde(rename = "State", default, deserialize_with = "display_text")]
    pub state: String,
    #[serde(rename = "Country", default, deserialize_with = "display_text")]
    pub country: String,
    #[serde(rename = "Region", default, deserialize_with = "display_text")]
    pub region: String,
    #[serde(rename = "Website", default, deserialize_with = "display_text")]
    pub website: String,
    #[serde(rename = "Latest Update", default, deserialize_with = "display_text")]
    pub latest_update: String,
    #[serde(
        rename = "Funding / Financials",
        default,
        deserialize_with = "display_text"
    )]
    pub funding: String,
    #[serde(rename = "Company Type", default, deserialize_with = "display_text")]
    pub company_type: String,
    #[serde(
        rename = "CDMO Requirement",
        default,
        deserialize_with = "display_text"
    )]
    pub cdmo_requirement: String,
    #[serde(rename = "CDMO Use Case", default, deserialize_with = "display_text")]
    pub cdmo_use_case: String,
    #[serde(rename = "Company Contacts", default)]
    pub contacts: Contacts,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CompanyRecord {
    pub fn from_value(value: Value) -> Result<Self> {
        let mut map = match value {
            Value::Object(map) => map,
            other => {
                return Err(IntelError::UnexpectedShape {
                    expected: "a JSON object describing one company".to_string(),
                    found: value_kind(&other).to_string(),
                })
            }
        };
        // 沒有正式鍵時才採用無空格寫法；兩者並存時正式鍵優先，另一個留在 extra
        if !map.contains_key(FUNDING) {
            if let Some(funding) = map.remove(FUNDING_ALIAS) {
                map.insert(FUNDING.to_string(), funding);
            }
        }
        Ok(serde_json::from_value(Value::Object(map))?)
    }

    /// 依欄位名稱取得固定欄位的顯示字串
    pub fn fixed_field(&self, field: &str) -> Option<String> {
        let value = match field {
            COMPANY_NAME => &self.company_name,
            "Type" => &self.company_category,
            "Assets" => &self.assets,
            "City" => &self.city,
            "State" => &self.state,
            "Country" => &self.country,
            "Region" => &self.region,
            "Website" => &self.website,
            "Latest Update" => &self.latest_update,
            FUNDING => &self.funding,
            "Company Type" => &self.company_type,
            "CDMO Requirement" => &self.cdmo_requirement,
            "CDMO Use Case" => &self.cdmo_use_case,
            COMPANY_CONTACTS => return Some(self.contacts.render()),
            _ => return None,
        };
        Some(value.clone())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Contacts {
    #[default]
    Absent,
    List(Vec<Contact>),
    Other(String),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Contact {
    #[serde(rename = "Designation", default, deserialize_with = "display_text")]
    pub designation: String,
    #[serde(rename = "Name", default, deserialize_with = "display_text")]
    pub name: String,
    #[serde(rename = "Email", default, deserialize_with = "display_text")]
    pub email: String,
}

impl Contact {
    pub fn render(&self) -> String {
        format!("{} - {} ({})", self.designation, self.name, self.email)
    }
}

impl Contacts {
    /// `"Designation - Name (Email)"` entries joined by `"; "`.
    pub fn render(&self) -> String {
        match self {
            Contacts::Absent => String::new(),
            Contacts::List(contacts) => contacts
                .iter()
                .map(Contact::render)
                .collect::<Vec<_>>()
                .join("; "),
            Contacts::Other(text) => text.clone(),
        }
    }
}

impl<'de> Deserialize<'de> for Contacts {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::Null => Contacts::Absent,
            Value::Array(items) => {
                let mut contacts = Vec::with_capacity(items.len());
                for item in items {
                    if !item.is_object() {
                        tracing::debug!("Ignoring non-object contact entry: {}", item);
                        continue;
                    }
                    contacts.push(
                        serde_json::from_value(item)
                            .map_err(<D::Error as serde::de::Error>::custom)?,
                    );
                }
                Contacts::List(contacts)
            }
            other => Contacts::Other(display_string(&other)),
        })
    }
}

/// 把任意 JSON 值轉成表格顯示用字串：字串原樣、null 為空、其他為 JSON 文字
pub fn display_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

fn display_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(display_string(&value))
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// One spreadsheet row: ordered `(column, value)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlatRow {
    cells: Vec<(String, String)>,
}

impl FlatRow {
    pub fn new(cells: Vec<(String, String)>) -> Self {
        Self { cells }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    pub fn company_name(&self) -> &str {
        self.get(COMPANY_NAME).unwrap_or_default()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// The unit handed to the exporter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultTable {
    pub sheet_name: String,
    pub columns: Vec<String>,
    pub rows: Vec<FlatRow>,
}

impl ResultTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A company whose lookup failed during batch extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedCompany {
    pub company: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub records: Vec<CompanyRecord>,
    pub skipped: Vec<SkippedCompany>,
    /// 上傳清單中的公司名稱，只有比對流程會填入
    pub known_companies: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub table: ResultTable,
    pub skipped: Vec<SkippedCompany>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Workflow {
    BatchExtraction,
    MarketSearch,
    SearchAndDiff,
}

impl Workflow {
    pub fn file_stem(&self) -> &'static str {
        match self {
            Workflow::BatchExtraction => "company_info_excel_extraction",
            Workflow::MarketSearch => "global_market_search",
            Workflow::SearchAndDiff => "new_companies_global_search",
        }
    }

    pub fn sheet_name(&self) -> &'static str {
        match self {
            Workflow::BatchExtraction => "Company Info",
            Workflow::MarketSearch => "Global Search",
            Workflow::SearchAndDiff => "New Companies",
        }
    }
}

impl std::fmt::Display for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Workflow::BatchExtraction => "batch extraction",
            Workflow::MarketSearch => "global market search",
            Workflow::SearchAndDiff => "search & diff",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub workflow: Workflow,
    /// `None` when there was nothing to export.
    pub output_path: Option<String>,
    pub rows_written: usize,
    pub skipped: Vec<SkippedCompany>,
}
