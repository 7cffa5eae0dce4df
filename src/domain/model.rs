use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use self::Source::{ComposedAddress, Path, ProvinceCode, Timestamp};

/// One way to pull a cell out of a raw company record.
#[derive(Debug, Clone, Copy)]
pub enum Source {
    /// Null-safe nested lookup.
    Path(&'static [&'static str]),
    /// Value that is either a bare province code or an object carrying one
    /// under `code`.
    ProvinceCode(&'static [&'static str]),
    /// Registered-office object whose toponym/street/number get joined into
    /// a single line.
    ComposedAddress(&'static [&'static str]),
    /// Timestamp string, reformatted when it parses as a date.
    Timestamp(&'static [&'static str]),
}

/// A column of the export: header name plus the lookup chain tried in
/// order. The first source that resolves wins.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub sources: &'static [Source],
}

const fn field(name: &'static str, sources: &'static [Source]) -> FieldSpec {
    FieldSpec { name, sources }
}

/// The flat export schema. Order here is the column order of the sheet;
/// fallback paths cover both the enriched and the plain record layouts the
/// upstream is known to return.
pub const FIELDS: &[FieldSpec] = &[
    field("id", &[Path(&["id"]), Path(&["companyDetails", "openapiNumber"])]),
    field("company_name", &[Path(&["companyDetails", "companyName"]), Path(&["companyName"])]),
    field("vat_code", &[Path(&["companyDetails", "vatCode"]), Path(&["vatCode"])]),
    field("tax_code", &[Path(&["companyDetails", "taxCode"]), Path(&["taxCode"])]),
    field("ateco_code", &[Path(&["atecoClassification", "ateco", "code"]), Path(&["atecoCode"])]),
    field("ateco_description", &[Path(&["atecoClassification", "ateco", "description"])]),
    field("ateco_secondary", &[Path(&["atecoClassification", "secondaryAteco"])]),
    field("province", &[ProvinceCode(&["address", "registeredOffice", "province"])]),
    field("town", &[Path(&["address", "registeredOffice", "town"]), Path(&["address", "town"])]),
    field(
        "zip_code",
        &[Path(&["address", "registeredOffice", "zipCode"]), Path(&["address", "zipCode"])],
    ),
    field(
        "address",
        &[ComposedAddress(&["address", "registeredOffice"]), Path(&["address", "streetName"])],
    ),
    field("phone", &[Path(&["contacts", "telephoneNumber"])]),
    field("fax", &[Path(&["contacts", "fax"])]),
    field("email", &[Path(&["mail", "email"])]),
    field("pec", &[Path(&["pec", "pec"])]),
    field("website", &[Path(&["webAndSocial", "website"])]),
    field("linkedin", &[Path(&["webAndSocial", "linkedin"])]),
    field("facebook", &[Path(&["webAndSocial", "facebook"])]),
    field("turnover", &[Path(&["ecofin", "turnover"])]),
    field("turnover_year", &[Path(&["ecofin", "turnoverYear"])]),
    field("turnover_range", &[Path(&["ecofin", "turnoverRange", "description"])]),
    field("share_capital", &[Path(&["ecofin", "shareCapital"])]),
    field("net_worth", &[Path(&["ecofin", "netWorth"])]),
    field("employees", &[Path(&["employees", "employee"])]),
    field("employees_range", &[Path(&["employees", "employeeRange", "description"])]),
    field("employees_trend", &[Path(&["employees", "employeeTrend"])]),
    field("enterprise_size", &[Path(&["ecofin", "enterpriseSize", "description"])]),
    field("nace_code", &[Path(&["internationalClassification", "nace", "code"])]),
    field("nace_description", &[Path(&["internationalClassification", "nace", "description"])]),
    field("primary_sic", &[Path(&["internationalClassification", "primarySic", "code"])]),
    field(
        "primary_sic_description",
        &[Path(&["internationalClassification", "primarySic", "description"])],
    ),
    field(
        "last_update",
        &[Timestamp(&["companyDetails", "lastUpdateDate"]), Timestamp(&["lastUpdateDate"])],
    ),
];

/// Column headers in sheet order.
pub fn headers() -> impl Iterator<Item = &'static str> {
    FIELDS.iter().map(|field| field.name)
}

/// One flattened company, cell-aligned with [`FIELDS`]. Unresolved fields
/// stay `None` and render as empty cells.
#[derive(Debug, Clone)]
pub struct CompanyRow {
    pub cells: Vec<Option<Value>>,
}

impl CompanyRow {
    /// Cell lookup by header name, mostly for assertions and debugging.
    pub fn get(&self, name: &str) -> Option<&Value> {
        let index = FIELDS.iter().position(|field| field.name == name)?;
        self.cells.get(index)?.as_ref()
    }
}

/// Export request as it arrives from a caller: untrusted, loosely typed,
/// with the field aliases the old callers used.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    #[serde(default)]
    pub token: String,

    #[serde(default, alias = "ateco")]
    pub ateco_code: String,

    #[serde(default, alias = "provincia")]
    pub province: String,

    /// Page size per upstream call; numbers and numeric strings both count.
    #[serde(default)]
    pub limit: Option<Value>,

    /// Hard cap on exported records.
    #[serde(default, alias = "max_results")]
    pub max_results: Option<Value>,

    #[serde(default)]
    pub sandbox: bool,
}

/// Search filters after normalization, ready to become query parameters.
#[derive(Debug, Clone)]
pub struct SearchParams {
    pub ateco_code: String,
    pub province: String,
    pub limit: u32,
    pub max_results: u32,
    pub sandbox: bool,
}

/// A request that passed validation: the bearer token plus normalized
/// search filters.
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub token: String,
    pub params: SearchParams,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportMetadata {
    pub total_records: usize,
    pub ateco_code: String,
    pub province: String,
    pub sandbox: bool,
    pub source: String,
}

impl ExportMetadata {
    /// Label/value pairs in the order the summary sheet prints them.
    pub fn entries(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("total_records", Value::from(self.total_records as u64)),
            ("ateco_code", Value::from(self.ateco_code.as_str())),
            ("province", Value::from(self.province.as_str())),
            ("sandbox", Value::from(self.sandbox)),
            ("source", Value::from(self.source.as_str())),
        ]
    }
}

/// A finished export: the workbook bytes plus everything needed to hand
/// them over.
#[derive(Debug, Clone)]
pub struct CompletedExport {
    pub total: usize,
    pub file_name: String,
    pub artifact: Vec<u8>,
    pub metadata: ExportMetadata,
}

#[derive(Debug, Clone)]
pub enum ExportOutcome {
    /// Nothing matched the filters; no workbook was built.
    Empty,
    Completed(CompletedExport),
}

/// Boundary payload mirroring the original JSON contract. Absent fields
/// are omitted, not `null`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_content_base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ExportMetadata>,
}

impl ExportResponse {
    pub fn completed(export: &CompletedExport) -> Self {
        Self {
            success: true,
            total: Some(export.total),
            message: None,
            file_name: Some(export.file_name.clone()),
            file_content_base64: Some(BASE64.encode(&export.artifact)),
            metadata: Some(export.metadata.clone()),
        }
    }

    pub fn empty() -> Self {
        Self {
            success: true,
            total: Some(0),
            message: Some("Nessun risultato trovato.".to_string()),
            file_name: None,
            file_content_base64: None,
            metadata: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.is_empty() {
            "Errore imprevisto.".to_string()
        } else {
            message
        };
        Self {
            success: false,
            total: None,
            message: Some(message),
            file_name: None,
            file_content_base64: None,
            metadata: None,
        }
    }
}
